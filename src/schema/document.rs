// schema/document.rs - 文件记录结构定义
//! 每个被索引文件对应一条 FileRecord

use std::collections::HashMap;
use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extract::Extraction;

/// 文件记录 - 存储层中的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// 存储层分配的主键，重新索引同一路径时保持不变
    pub id: u64,
    /// 绝对路径（唯一）
    pub path: String,
    pub name: String,
    /// 小写扩展名，不含点号，可为空
    pub extension: String,
    pub size_bytes: u64,
    /// 部分文件系统不记录创建时间
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: DateTime<Utc>,
    /// 属主用户名，无法解析时为空
    pub owner: String,
    /// 内容哈希，无法读取时为空
    pub content_hash: String,
    pub is_text: bool,
    /// 仅当 is_text 为真时存在
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_excerpt: Option<String>,
    pub indexed_at: DateTime<Utc>,
}

impl FileRecord {
    /// 组装记录；摘录只在文本文件上保留
    pub fn new(
        id: u64,
        metadata: FileMetadata,
        content_hash: String,
        extraction: Extraction,
        indexed_at: DateTime<Utc>,
    ) -> Self {
        let text_excerpt = if extraction.is_text { extraction.excerpt } else { None };

        Self {
            id,
            path: metadata.path,
            name: metadata.name,
            extension: metadata.extension,
            size_bytes: metadata.size_bytes,
            created_at: metadata.created_at,
            modified_at: metadata.modified_at,
            owner: metadata.owner,
            content_hash,
            is_text: extraction.is_text && text_excerpt.is_some(),
            text_excerpt,
            indexed_at,
        }
    }
}

/// 文件系统元数据（索引时采集）
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    pub path: String,
    pub name: String,
    pub extension: String,
    pub size_bytes: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: DateTime<Utc>,
    pub owner: String,
}

impl FileMetadata {
    /// 从路径和已获取的 Metadata 构建
    pub fn from_metadata(path: &Path, metadata: &Metadata, owners: &mut OwnerCache) -> Self {
        let name = path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            path: path.to_string_lossy().to_string(),
            name,
            extension: extension_of(path),
            size_bytes: metadata.len(),
            created_at: metadata.created().ok().map(from_system_time),
            modified_at: metadata.modified()
                .map(from_system_time)
                .unwrap_or_default(),
            owner: owners.owner_of(metadata),
        }
    }
}

/// 小写扩展名，不含点号
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

// ============== 时间转换 ==============

pub fn from_system_time(time: SystemTime) -> DateTime<Utc> {
    from_epoch_secs(
        time.duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
    )
}

pub fn from_epoch_secs(secs: u64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs.min(i64::MAX as u64) as i64, 0).unwrap_or_default()
}

/// 1970 年之前的时间按 0 处理
pub fn to_epoch_secs(time: &DateTime<Utc>) -> u64 {
    time.timestamp().max(0) as u64
}

// ============== 属主解析 ==============

/// uid -> 用户名缓存，单次遍历内复用
#[derive(Debug, Default)]
pub struct OwnerCache {
    names: HashMap<u32, String>,
}

impl OwnerCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(unix)]
    pub fn owner_of(&mut self, metadata: &Metadata) -> String {
        use std::os::unix::fs::MetadataExt;

        let uid = metadata.uid();
        self.names.entry(uid)
            .or_insert_with(|| resolve_user_name(uid).unwrap_or_default())
            .clone()
    }

    #[cfg(not(unix))]
    pub fn owner_of(&mut self, _metadata: &Metadata) -> String {
        String::new()
    }
}

#[cfg(unix)]
fn resolve_user_name(uid: u32) -> Option<String> {
    uzers::get_user_by_uid(uid).map(|user| user.name().to_string_lossy().into_owned())
}
