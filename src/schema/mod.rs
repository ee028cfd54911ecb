// schema/mod.rs - Schema 定义模块
//! 定义索引的 Schema 结构和文件记录类型

mod document;
pub mod fields;

pub use document::*;
pub use fields::*;

use tantivy::schema::{
    Field, IndexRecordOption, Schema, SchemaBuilder, TextFieldIndexing, TextOptions, Value,
    FAST, INDEXED, STORED, STRING,
};
use tantivy::tokenizer::{LowerCaser, NgramTokenizer, TextAnalyzer};
use tantivy::{Index, TantivyDocument};

use crate::error::{EngineError, EngineResult};

/// 创建文件记录 Schema
///
/// 结构化字段与全文字段放在同一个索引里，一次提交即可保持两者一致。
pub fn build_schema() -> Schema {
    let mut schema_builder = SchemaBuilder::default();

    // 摘录：按 1~2 字符切分建索引，任意子串的二元组都能在索引中找到
    let excerpt_options = TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(TOKENIZER_NAME)
                .set_index_option(IndexRecordOption::Basic)
        )
        .set_stored();

    // === 标识字段 ===
    schema_builder.add_u64_field(FIELD_ID, INDEXED | FAST | STORED);
    schema_builder.add_text_field(FIELD_PATH, STRING | STORED);
    schema_builder.add_text_field(FIELD_NAME, STRING | STORED | FAST);

    // === 过滤字段（精确匹配 / 范围） ===
    schema_builder.add_text_field(FIELD_EXTENSION, STRING | STORED | FAST);
    schema_builder.add_u64_field(FIELD_SIZE, INDEXED | FAST | STORED);
    schema_builder.add_u64_field(FIELD_CREATED_AT, STORED);
    schema_builder.add_u64_field(FIELD_MODIFIED_AT, INDEXED | FAST | STORED);
    schema_builder.add_text_field(FIELD_OWNER, STRING | STORED);
    schema_builder.add_text_field(FIELD_CONTENT_HASH, STRING | STORED | FAST);
    schema_builder.add_bool_field(FIELD_IS_TEXT, INDEXED | FAST | STORED);

    // === 全文字段 ===
    schema_builder.add_text_field(FIELD_TEXT_EXCERPT, excerpt_options);
    schema_builder.add_u64_field(FIELD_INDEXED_AT, STORED);

    schema_builder.build()
}

/// 注册摘录分词器：1~2 字符的 n-gram，统一小写
pub fn register_tokenizers(index: &Index) -> EngineResult<()> {
    let analyzer = TextAnalyzer::builder(NgramTokenizer::new(1, 2, false)?)
        .filter(LowerCaser)
        .build();
    index.tokenizers().register(TOKENIZER_NAME, analyzer);
    Ok(())
}

/// 字段句柄缓存，负责记录与 tantivy 文档之间的转换
#[derive(Debug, Clone, Copy)]
pub struct FileFields {
    pub id: Field,
    pub path: Field,
    pub name: Field,
    pub extension: Field,
    pub size: Field,
    pub created_at: Field,
    pub modified_at: Field,
    pub owner: Field,
    pub content_hash: Field,
    pub is_text: Field,
    pub text_excerpt: Field,
    pub indexed_at: Field,
}

impl FileFields {
    pub fn resolve(schema: &Schema) -> EngineResult<Self> {
        let field = |name: &str| {
            schema.get_field(name)
                .map_err(|_| EngineError::Config(format!("Missing field: {}", name)))
        };

        Ok(Self {
            id: field(FIELD_ID)?,
            path: field(FIELD_PATH)?,
            name: field(FIELD_NAME)?,
            extension: field(FIELD_EXTENSION)?,
            size: field(FIELD_SIZE)?,
            created_at: field(FIELD_CREATED_AT)?,
            modified_at: field(FIELD_MODIFIED_AT)?,
            owner: field(FIELD_OWNER)?,
            content_hash: field(FIELD_CONTENT_HASH)?,
            is_text: field(FIELD_IS_TEXT)?,
            text_excerpt: field(FIELD_TEXT_EXCERPT)?,
            indexed_at: field(FIELD_INDEXED_AT)?,
        })
    }

    pub fn to_document(&self, record: &FileRecord) -> TantivyDocument {
        let mut doc = TantivyDocument::new();

        doc.add_u64(self.id, record.id);
        doc.add_text(self.path, &record.path);
        doc.add_text(self.name, &record.name);
        doc.add_text(self.extension, &record.extension);
        doc.add_u64(self.size, record.size_bytes);
        if let Some(created) = record.created_at {
            doc.add_u64(self.created_at, to_epoch_secs(&created));
        }
        doc.add_u64(self.modified_at, to_epoch_secs(&record.modified_at));
        doc.add_text(self.owner, &record.owner);
        doc.add_text(self.content_hash, &record.content_hash);
        doc.add_bool(self.is_text, record.is_text);
        if let Some(ref excerpt) = record.text_excerpt {
            doc.add_text(self.text_excerpt, excerpt);
        }
        doc.add_u64(self.indexed_at, to_epoch_secs(&record.indexed_at));

        doc
    }

    pub fn from_document(&self, doc: &TantivyDocument) -> FileRecord {
        let text = |field: Field| {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };
        let secs = |field: Field| doc.get_first(field).and_then(|v| v.as_u64());

        let is_text = doc.get_first(self.is_text)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let text_excerpt = if is_text {
            Some(text(self.text_excerpt))
        } else {
            None
        };

        FileRecord {
            id: secs(self.id).unwrap_or(0),
            path: text(self.path),
            name: text(self.name),
            extension: text(self.extension),
            size_bytes: secs(self.size).unwrap_or(0),
            created_at: secs(self.created_at).map(from_epoch_secs),
            modified_at: from_epoch_secs(secs(self.modified_at).unwrap_or(0)),
            owner: text(self.owner),
            content_hash: text(self.content_hash),
            is_text,
            text_excerpt,
            indexed_at: from_epoch_secs(secs(self.indexed_at).unwrap_or(0)),
        }
    }
}
