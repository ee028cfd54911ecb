// api/mod.rs - API 模块
//! 请求 / 响应结构，供界面与传输层使用

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;
