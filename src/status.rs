// status.rs - 索引状态
//! 单例索引状态：内存中由互斥锁保护，同时持久化到目录数据库
//!
//! `begin_run` 是唯一的检查并设置点，保证同一时刻最多一个索引任务。

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::store::Catalog;

const STATUS_KEY: &str = "indexing_status";

/// 当前或最近一次索引任务的状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexingStatus {
    pub in_progress: bool,
    /// 仅在 in_progress 时存在
    pub current_directory: Option<String>,
    /// 最近（或进行中）一次任务写入的记录数
    pub total_indexed: u64,
    /// 0.0 - 100.0，单次任务内不回退
    pub progress_percentage: f64,
    pub last_index_date: Option<DateTime<Utc>>,
}

/// 状态单元（可克隆，共享同一份状态）
#[derive(Clone)]
pub struct StatusTracker {
    inner: Arc<Mutex<IndexingStatus>>,
    catalog: Catalog,
}

impl StatusTracker {
    /// 从目录数据库恢复状态；上次进程异常退出遗留的 in_progress 会被清除
    pub fn load(catalog: Catalog) -> EngineResult<Self> {
        let mut status: IndexingStatus = catalog.load_meta(STATUS_KEY)?.unwrap_or_default();

        if status.in_progress {
            tracing::warn!("检测到未完成的索引任务，重置状态");
            status.in_progress = false;
            status.current_directory = None;
            catalog.save_meta(STATUS_KEY, &status)?;
        }

        Ok(Self {
            inner: Arc::new(Mutex::new(status)),
            catalog,
        })
    }

    pub fn snapshot(&self) -> IndexingStatus {
        self.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.lock().in_progress
    }

    /// 原子地开始一次任务；已有任务在运行时返回 AlreadyRunning
    pub fn begin_run(&self, root: &Path) -> EngineResult<RunGuard> {
        let mut status = self.lock();
        if status.in_progress {
            return Err(EngineError::AlreadyRunning);
        }

        let previous = status.clone();
        status.in_progress = true;
        status.current_directory = Some(root.to_string_lossy().to_string());
        status.total_indexed = 0;
        status.progress_percentage = 0.0;

        if let Err(e) = self.catalog.save_meta(STATUS_KEY, &*status) {
            *status = previous;
            return Err(e);
        }

        Ok(RunGuard {
            tracker: self.clone(),
            finished: false,
        })
    }

    fn lock(&self) -> MutexGuard<'_, IndexingStatus> {
        // 状态只含计数与标志，锁中毒后沿用其中的值即可
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, status: &IndexingStatus) {
        if let Err(e) = self.catalog.save_meta(STATUS_KEY, status) {
            tracing::warn!("索引状态持久化失败: {}", e);
        }
    }

    fn finish(&self, success: bool) {
        let mut status = self.lock();
        status.in_progress = false;
        status.current_directory = None;
        status.last_index_date = Some(Utc::now());
        if success {
            status.progress_percentage = 100.0;
        }
        self.persist(&status);
    }
}

/// 一次索引任务的状态句柄
///
/// 未调用 `complete` 就被丢弃（出错提前返回或线程 panic）时，以失败结束任务，
/// in_progress 总会被复位。
pub struct RunGuard {
    tracker: StatusTracker,
    finished: bool,
}

impl RunGuard {
    /// 更新进度；persist 为真时同时写入目录数据库
    pub fn progress(&self, directory: &Path, indexed: u64, processed: u64, total: u64, persist: bool) {
        let mut status = self.tracker.lock();
        status.current_directory = Some(directory.to_string_lossy().to_string());
        status.total_indexed = indexed;
        status.progress_percentage = status.progress_percentage.max(percentage(processed, total));

        if persist {
            self.tracker.persist(&status);
        }
    }

    pub fn complete(mut self, indexed: u64) {
        self.tracker.lock().total_indexed = indexed;
        self.tracker.finish(true);
        self.finished = true;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("索引任务未正常完成，复位状态");
            self.tracker.finish(false);
        }
    }
}

/// processed / total * 100，限制在 [0, 100]
fn percentage(processed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (processed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tracker(dir: &Path) -> StatusTracker {
        StatusTracker::load(Catalog::open(dir).unwrap()).unwrap()
    }

    #[test]
    fn test_single_run_at_a_time() {
        let dir = tempdir().unwrap();
        let tracker = tracker(dir.path());

        let run = tracker.begin_run(Path::new("/data")).unwrap();
        assert!(tracker.is_running());
        assert!(matches!(
            tracker.begin_run(Path::new("/other")),
            Err(EngineError::AlreadyRunning)
        ));

        run.complete(3);
        let status = tracker.snapshot();
        assert!(!status.in_progress);
        assert!(status.current_directory.is_none());
        assert_eq!(status.total_indexed, 3);
        assert_eq!(status.progress_percentage, 100.0);
        assert!(status.last_index_date.is_some());

        assert!(tracker.begin_run(Path::new("/other")).is_ok());
    }

    #[test]
    fn test_progress_never_decreases() {
        let dir = tempdir().unwrap();
        let tracker = tracker(dir.path());
        let run = tracker.begin_run(Path::new("/data")).unwrap();

        run.progress(Path::new("/data/a"), 5, 5, 10, false);
        assert_eq!(tracker.snapshot().progress_percentage, 50.0);

        // 文件数在两次遍历之间增长时，估算值不回退
        run.progress(Path::new("/data/b"), 6, 6, 20, false);
        assert_eq!(tracker.snapshot().progress_percentage, 50.0);

        run.progress(Path::new("/data/c"), 30, 30, 20, false);
        assert_eq!(tracker.snapshot().progress_percentage, 100.0);
        assert_eq!(tracker.snapshot().current_directory.as_deref(), Some("/data/c"));
    }

    #[test]
    fn test_dropped_run_resets_flag() {
        let dir = tempdir().unwrap();
        let tracker = tracker(dir.path());

        {
            let run = tracker.begin_run(Path::new("/data")).unwrap();
            run.progress(Path::new("/data"), 1, 1, 4, true);
        }

        let status = tracker.snapshot();
        assert!(!status.in_progress);
        assert_eq!(status.progress_percentage, 25.0);
        assert!(status.last_index_date.is_some());
    }

    #[test]
    fn test_stale_flag_reset_on_load() {
        let dir = tempdir().unwrap();
        {
            let catalog = Catalog::open(dir.path()).unwrap();
            let stale = IndexingStatus {
                in_progress: true,
                current_directory: Some("/data".to_string()),
                total_indexed: 7,
                ..IndexingStatus::default()
            };
            catalog.save_meta(STATUS_KEY, &stale).unwrap();
            catalog.flush().unwrap();
        }

        let status = tracker(dir.path()).snapshot();
        assert!(!status.in_progress);
        assert!(status.current_directory.is_none());
        assert_eq!(status.total_indexed, 7);
    }

    #[test]
    fn test_percentage_bounds() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(percentage(9, 4), 100.0);
    }
}
