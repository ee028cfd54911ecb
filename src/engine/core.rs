// engine/core.rs - 搜索引擎核心
//! 统一的引擎入口：搜索、索引、状态、统计、内容预览、重复分组、历史

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::api::{
    FileContentResponse, IndexAccepted, IndexRequest, SearchHistoryEntry, SearchRequest,
    SearchResponse,
};
use crate::config::AppConfig;
use crate::error::{EngineError, EngineResult};
use crate::indexer::{IndexHandle, IndexSummary, Indexer};
use crate::query::{QueryEngine, SearchCriteria};
use crate::stats::{DuplicateGroup, Statistics, StatisticsAggregator};
use crate::status::{IndexingStatus, StatusTracker};
use crate::store::IndexStore;

/// 搜索引擎
///
/// 一个长期存在的存储，被多个短请求共享，同时最多一个后台索引任务。
pub struct SearchEngine {
    pub(crate) store: Arc<IndexStore>,
    pub(crate) status: StatusTracker,
    pub(crate) indexer: Indexer,
    pub(crate) query: QueryEngine,
    pub(crate) stats: StatisticsAggregator,
    pub(crate) config: Arc<AppConfig>,
    /// 最近一次通过 `index` 启动的任务
    pub(crate) running: Mutex<Option<IndexHandle>>,
}

impl SearchEngine {
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    // ============== 搜索 ==============

    /// 执行搜索请求并记录历史
    pub fn search(&self, request: &SearchRequest) -> EngineResult<SearchResponse> {
        let criteria = request.to_criteria()?;
        let response = self.search_criteria(&criteria)?;

        self.record_history(request, response.count);
        Ok(response)
    }

    /// 以已校验的条件搜索（不记录历史）
    pub fn search_criteria(&self, criteria: &SearchCriteria) -> EngineResult<SearchResponse> {
        let results = self.query.search(criteria)?;
        tracing::debug!("搜索返回 {} 条记录", results.len());
        Ok(SearchResponse::new(results))
    }

    fn record_history(&self, request: &SearchRequest, result_count: usize) {
        let entry = match serde_json::to_string(request) {
            Ok(json) => SearchHistoryEntry {
                searched_at: Utc::now(),
                request: json,
                result_count,
            },
            Err(e) => {
                tracing::warn!("无法序列化搜索请求: {}", e);
                return;
            }
        };

        let keep = self.config.search.history_size;
        if let Err(e) = self.store.catalog().append_history(&entry, keep) {
            tracing::warn!("搜索历史写入失败: {}", e);
        }
    }

    /// 最近的搜索历史，新的在前
    pub fn search_history(&self, limit: usize) -> EngineResult<Vec<SearchHistoryEntry>> {
        self.store.catalog().recent_history(limit)
    }

    // ============== 索引 ==============

    /// 受理索引请求，任务在后台运行
    pub fn index(&self, request: &IndexRequest) -> EngineResult<IndexAccepted> {
        let handle = self.start_indexing(&request.root_path, request.force_reindex)?;
        let root_path = handle.root().to_string_lossy().to_string();

        let mut running = self.running.lock()?;
        *running = Some(handle);

        Ok(IndexAccepted {
            message: format!("Indexing started for {}", root_path),
            root_path,
            force_reindex: request.force_reindex,
        })
    }

    /// 启动索引并返回任务句柄（由调用方持有）
    pub fn start_indexing(&self, root: impl AsRef<Path>, force: bool) -> EngineResult<IndexHandle> {
        self.indexer.start(root, force)
    }

    /// 等待 `index` 启动的任务结束；没有任务时返回 None
    pub fn wait_for_indexing(&self) -> Option<EngineResult<IndexSummary>> {
        let handle = match self.running.lock() {
            Ok(mut running) => running.take(),
            Err(e) => return Some(Err(e.into())),
        };
        handle.map(IndexHandle::wait)
    }

    pub fn status(&self) -> IndexingStatus {
        self.status.snapshot()
    }

    // ============== 统计与查看 ==============

    pub fn statistics(&self) -> EngineResult<Statistics> {
        self.stats.compute()
    }

    pub fn duplicates(&self) -> EngineResult<Vec<DuplicateGroup>> {
        self.stats.duplicate_groups()
    }

    /// 返回索引中保存的摘录，不重新读取磁盘
    pub fn file_content(&self, file_path: &str) -> EngineResult<FileContentResponse> {
        let record = self.store.get_by_path(file_path)?
            .ok_or_else(|| EngineError::NotIndexed(file_path.to_string()))?;
        Ok(FileContentResponse::from_record(record))
    }

    /// 从索引中移除一条记录（不触碰文件本身）
    pub fn remove_file(&self, file_path: &str) -> EngineResult<()> {
        if self.store.get_by_path(file_path)?.is_none() {
            return Err(EngineError::NotIndexed(file_path.to_string()));
        }

        self.store.remove(file_path)?;
        self.store.commit()?;
        tracing::info!("已移除索引记录: {}", file_path);
        Ok(())
    }
}
