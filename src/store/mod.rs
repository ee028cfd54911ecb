// store/mod.rs - 存储模块
//! 持久化层：tantivy 索引（记录 + 全文）与 sled 目录数据库

mod catalog;
mod index;

pub use catalog::Catalog;
pub use index::IndexStore;
