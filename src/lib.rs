// src/lib.rs
//! 本地文件索引与检索引擎

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod indexer;
pub mod path_filter;
pub mod query;
pub mod schema;
pub mod stats;
pub mod status;
pub mod store;

pub use api::*;
pub use config::{AppConfig, CONFIG};
pub use engine::{SearchEngine, SearchEngineBuilder};
pub use error::{EngineError, EngineResult};
pub use indexer::{IndexHandle, IndexSummary};
pub use query::{MatchLogic, SearchCriteria};
pub use schema::FileRecord;
pub use stats::{DuplicateGroup, ExtensionCount, Statistics};
pub use status::IndexingStatus;
