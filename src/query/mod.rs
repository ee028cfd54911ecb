// query/mod.rs - 查询模块
//! 检索条件、过滤构建与执行

mod engine;
mod parser;
pub mod filter;
pub mod types;

pub use engine::QueryEngine;
pub use filter::*;
pub use parser::*;
pub use types::*;
