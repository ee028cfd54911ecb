// api/response.rs - 响应类型
//! 各操作返回给外部调用方的结构

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::schema::FileRecord;

/// 搜索响应：count 与 total_size 只统计返回的记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<FileRecord>,
    pub count: usize,
    pub total_size: u64,
}

impl SearchResponse {
    pub fn new(results: Vec<FileRecord>) -> Self {
        let total_size = results.iter().map(|r| r.size_bytes).sum();
        Self {
            count: results.len(),
            total_size,
            results,
        }
    }
}

/// 索引请求已受理（任务在后台运行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexAccepted {
    pub message: String,
    pub root_path: String,
    pub force_reindex: bool,
}

/// 文件内容响应：内容来自索引中的摘录，而非重新读盘
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileContentResponse {
    pub file_path: String,
    pub content: Option<String>,
    pub is_text_file: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FileContentResponse {
    pub fn from_record(record: FileRecord) -> Self {
        if record.is_text {
            Self {
                file_path: record.path,
                content: record.text_excerpt,
                is_text_file: true,
                message: None,
            }
        } else {
            Self {
                file_path: record.path,
                content: None,
                is_text_file: false,
                message: Some("Content preview is only available for text files".to_string()),
            }
        }
    }
}

/// 一条搜索历史
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    pub searched_at: DateTime<Utc>,
    /// 请求的 JSON 文本
    pub request: String,
    pub result_count: usize,
}

/// 错误响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误代码
    pub code: String,

    /// 错误消息
    pub message: String,

    /// 详细信息
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<&EngineError> for ErrorResponse {
    fn from(err: &EngineError) -> Self {
        let code = match err {
            EngineError::InvalidPath(_) => "invalid_path",
            EngineError::AlreadyRunning => "already_running",
            EngineError::InvalidRequest(_) => "invalid_request",
            EngineError::PermissionDenied(_) => "permission_denied",
            EngineError::Io(_) => "io_error",
            EngineError::NotIndexed(_) => "not_indexed",
            EngineError::Config(_) => "config_error",
            EngineError::Store(_) | EngineError::Tantivy(_) | EngineError::Catalog(_) => "store_error",
        };

        let response = Self::new(code, err.to_string());
        match err {
            EngineError::InvalidPath(subject)
            | EngineError::PermissionDenied(subject)
            | EngineError::NotIndexed(subject) => response.with_details(subject.clone()),
            EngineError::Io(e) => response.with_details(format!("{:?}", e.kind())),
            _ => response,
        }
    }
}

/// 人类可读的文件大小
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
