// engine/builder.rs - 搜索引擎构建器
//! 使用 Builder 模式构建 SearchEngine

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::config::{AppConfig, CONFIG};
use crate::error::EngineResult;
use crate::extract::{Classifier, ContentExtractor};
use crate::indexer::Indexer;
use crate::query::QueryEngine;
use crate::stats::StatisticsAggregator;
use crate::status::StatusTracker;
use crate::store::IndexStore;

use super::core::SearchEngine;

/// 搜索引擎构建器
#[derive(Default)]
pub struct SearchEngineBuilder {
    config: Option<AppConfig>,
    storage_path: Option<PathBuf>,
    heap_size: Option<usize>,
    classifier: Option<Arc<dyn Classifier>>,
}

impl SearchEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置配置（默认使用全局配置）
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 设置存储路径
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// 设置 IndexWriter 堆大小
    pub fn with_heap_size(mut self, size: usize) -> Self {
        self.heap_size = Some(size);
        self
    }

    /// 替换文本判定策略
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// 构建搜索引擎
    pub fn build(self) -> EngineResult<SearchEngine> {
        let mut config = self.config.unwrap_or_else(|| CONFIG.clone());
        if let Some(path) = self.storage_path {
            config = config.with_storage_path(path);
        }
        if let Some(size) = self.heap_size {
            config.performance.index_writer_memory = size;
        }

        let store = Arc::new(IndexStore::open(&config)?);
        let status = StatusTracker::load(store.catalog().clone())?;

        let mut indexer = Indexer::new(store.clone(), status.clone(), &config);
        if let Some(classifier) = self.classifier {
            indexer = indexer.with_extractor(ContentExtractor::with_classifier(&config.content, classifier));
        }

        let query = QueryEngine::new(store.clone());
        let stats = StatisticsAggregator::new(store.clone(), config.search.top_extensions);

        tracing::debug!("搜索引擎已构建，存储目录: {:?}", config.storage_path());

        Ok(SearchEngine {
            store,
            status,
            indexer,
            query,
            stats,
            config: Arc::new(config),
            running: Mutex::new(None),
        })
    }
}
