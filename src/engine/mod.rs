// engine/mod.rs - 搜索引擎门面
//! 组装存储、索引器、查询与统计，对外提供统一入口

pub mod builder;
pub mod core;

pub use self::builder::*;
pub use self::core::*;
