// schema/fields.rs - 字段名常量定义
//! 统一管理所有 Schema 字段名，避免魔法字符串

/// 记录主键（存储层分配）
pub const FIELD_ID: &str = "id";
/// 完整文件路径（唯一）
pub const FIELD_PATH: &str = "path";
/// 文件名（最后一个路径组件）
pub const FIELD_NAME: &str = "name";
/// 小写扩展名，不含点号
pub const FIELD_EXTENSION: &str = "extension";
/// 文件大小（字节）
pub const FIELD_SIZE: &str = "size_bytes";
/// 文件创建时间
pub const FIELD_CREATED_AT: &str = "created_at";
/// 文件修改时间
pub const FIELD_MODIFIED_AT: &str = "modified_at";
/// 文件属主
pub const FIELD_OWNER: &str = "owner";
/// 内容哈希
pub const FIELD_CONTENT_HASH: &str = "content_hash";
/// 是否文本文件
pub const FIELD_IS_TEXT: &str = "is_text";
/// 文本摘录（全文索引）
pub const FIELD_TEXT_EXCERPT: &str = "text_excerpt";
/// 索引时间
pub const FIELD_INDEXED_AT: &str = "indexed_at";

/// 摘录字段使用的分词器名
pub const TOKENIZER_NAME: &str = "ngram_lower";
