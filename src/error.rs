// error.rs - 引擎错误类型
//! 索引、查询与存储共用的错误分类

use std::io;

/// 搜索引擎错误类型
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("An indexing run is already in progress")]
    AlreadyRunning,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] sled::Error),

    #[error("File not indexed: {0}")]
    NotIndexed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// 单个文件级别的错误：记录后跳过，不中断索引
    pub fn is_per_file(&self) -> bool {
        matches!(self, EngineError::PermissionDenied(_) | EngineError::Io(_))
    }

    /// 持久化层错误：中断当前操作并返回给调用方
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            EngineError::Store(_) | EngineError::Tantivy(_) | EngineError::Catalog(_)
        )
    }

    /// 按 io 错误种类区分权限问题
    pub fn from_io(path: &std::path::Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::PermissionDenied {
            EngineError::PermissionDenied(path.display().to_string())
        } else {
            EngineError::Io(err)
        }
    }
}

impl From<bincode::Error> for EngineError {
    fn from(err: bincode::Error) -> Self {
        EngineError::Store(err.to_string())
    }
}

impl From<tantivy::directory::error::OpenDirectoryError> for EngineError {
    fn from(err: tantivy::directory::error::OpenDirectoryError) -> Self {
        EngineError::Store(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for EngineError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        EngineError::Store("lock poisoned".to_string())
    }
}
