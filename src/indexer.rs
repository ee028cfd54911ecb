// indexer.rs - 目录索引器
//! 在后台线程中遍历根目录，为每个文件采集元数据、计算哈希、判定文本并写入索引
//!
//! 进度采用两遍策略：第一遍只统计待处理文件数，第二遍按 已处理/总数 估算百分比。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::config::{AppConfig, PerformanceConfig, WalkerConfig};
use crate::error::{EngineError, EngineResult};
use crate::extract::{hash_file, ContentExtractor, Extraction};
use crate::path_filter::PathFilter;
use crate::schema::{FileMetadata, FileRecord, OwnerCache};
use crate::status::{RunGuard, StatusTracker};
use crate::store::IndexStore;

/// 一次索引任务的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub root: String,
    /// 成功写入的记录数
    pub indexed: u64,
    /// 因权限或 IO 错误跳过的文件数
    pub skipped: u64,
    /// force 模式下清除的旧记录数
    pub purged: usize,
    /// 第一遍统计到的候选文件数
    pub total_candidates: u64,
    pub elapsed_ms: u64,
}

/// 后台索引任务句柄
pub struct IndexHandle {
    root: PathBuf,
    handle: JoinHandle<EngineResult<IndexSummary>>,
}

impl IndexHandle {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// 阻塞等待任务结束
    pub fn wait(self) -> EngineResult<IndexSummary> {
        self.handle
            .join()
            .map_err(|_| EngineError::Store("indexing thread panicked".to_string()))?
    }
}

/// 索引器（可克隆，克隆体共享存储与状态）
#[derive(Clone)]
pub struct Indexer {
    store: Arc<IndexStore>,
    status: StatusTracker,
    extractor: ContentExtractor,
    filter: Arc<PathFilter>,
    walker: WalkerConfig,
    performance: PerformanceConfig,
}

impl Indexer {
    pub fn new(store: Arc<IndexStore>, status: StatusTracker, config: &AppConfig) -> Self {
        Self {
            store,
            status,
            extractor: ContentExtractor::new(&config.content),
            filter: Arc::new(PathFilter::new(&config.walker)),
            walker: config.walker.clone(),
            performance: config.performance.clone(),
        }
    }

    pub fn with_extractor(mut self, extractor: ContentExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// 校验根目录并在后台启动一次索引，立即返回
    ///
    /// 根目录不存在或不是目录时返回 InvalidPath；已有任务运行时返回 AlreadyRunning。
    pub fn start(&self, root: impl AsRef<Path>, force: bool) -> EngineResult<IndexHandle> {
        let root = validate_root(root.as_ref())?;
        let run = self.status.begin_run(&root)?;

        let indexer = self.clone();
        let thread_root = root.clone();
        let handle = thread::Builder::new()
            .name("indexer".to_string())
            .spawn(move || indexer.run(run, &thread_root, force))?;

        tracing::info!("索引任务已启动: {:?} (force={})", root, force);
        Ok(IndexHandle { root, handle })
    }

    fn run(&self, run: RunGuard, root: &Path, force: bool) -> EngineResult<IndexSummary> {
        let started = Instant::now();

        let purged = if force {
            self.store.purge_under(root)?
        } else {
            0
        };

        let total = self.count_candidates(root);
        tracing::info!("待处理文件: {}", total);

        let commit_every = self.performance.commit_interval.max(1) as u64;
        let progress_every = self.performance.progress_interval.max(1) as u64;

        let mut owners = OwnerCache::new();
        let mut guard = self.filter.guard(root);
        let mut indexed = 0u64;
        let mut skipped = 0u64;
        let mut processed = 0u64;
        let mut pending = 0u64;

        let walk = self.walk(root).filter_entry(|entry| !guard.should_skip_entry(entry));
        for entry in walk {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // 目录不可读、链接悬空等，跳过该分支
                    tracing::warn!("遍历出错，跳过: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            match self.index_file(path, &mut owners) {
                Ok(()) => {
                    indexed += 1;
                    pending += 1;
                }
                Err(e) if e.is_per_file() => {
                    tracing::warn!("跳过文件 {:?}: {}", path, e);
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
            processed += 1;

            if pending >= commit_every {
                self.store.commit()?;
                pending = 0;
            }

            let directory = path.parent().unwrap_or(root);
            run.progress(directory, indexed, processed, total, processed % progress_every == 0);
        }

        self.store.commit()?;
        run.complete(indexed);

        let summary = IndexSummary {
            root: root.to_string_lossy().to_string(),
            indexed,
            skipped,
            purged,
            total_candidates: total,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            "索引完成: {} 个文件，跳过 {} 个，耗时 {}ms",
            summary.indexed,
            summary.skipped,
            summary.elapsed_ms
        );
        Ok(summary)
    }

    fn walk(&self, root: &Path) -> walkdir::IntoIter {
        WalkDir::new(root)
            .follow_links(self.walker.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
    }

    /// 第一遍：与第二遍相同的过滤规则下统计文件数
    fn count_candidates(&self, root: &Path) -> u64 {
        let mut guard = self.filter.guard(root);
        self.walk(root)
            .filter_entry(|entry| !guard.should_skip_entry(entry))
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .count() as u64
    }

    /// 采集单个文件并写入索引（尚未提交）
    fn index_file(&self, path: &Path, owners: &mut OwnerCache) -> EngineResult<()> {
        let metadata = fs::metadata(path).map_err(|e| EngineError::from_io(path, e))?;
        let file = FileMetadata::from_metadata(path, &metadata, owners);

        let (content_hash, extraction) = match hash_file(path) {
            Ok(hash) => {
                let extraction = self.extractor.extract(path, metadata.len())
                    .unwrap_or_else(|e| {
                        tracing::debug!("内容读取失败 {:?}: {}", path, e);
                        Extraction::binary()
                    });
                (hash, extraction)
            }
            Err(e) => {
                tracing::warn!("无法读取文件内容 {:?}: {}", path, e);
                (String::new(), Extraction::binary())
            }
        };

        let record = FileRecord::new(0, file, content_hash, extraction, Utc::now());
        self.store.upsert(record)?;
        Ok(())
    }
}

/// 根目录必须存在且为目录，返回规范化后的绝对路径
fn validate_root(root: &Path) -> EngineResult<PathBuf> {
    let metadata = fs::metadata(root)
        .map_err(|e| EngineError::InvalidPath(format!("{}: {}", root.display(), e)))?;
    if !metadata.is_dir() {
        return Err(EngineError::InvalidPath(format!("{} is not a directory", root.display())));
    }
    root.canonicalize()
        .map_err(|e| EngineError::InvalidPath(format!("{}: {}", root.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentConfig;
    use crate::extract::{Classifier, HeuristicClassifier};
    use crate::store::Catalog;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _storage: TempDir,
        store: Arc<IndexStore>,
        status: StatusTracker,
        indexer: Indexer,
    }

    fn fixture() -> Fixture {
        let storage = tempdir().unwrap();
        let mut config = AppConfig::default().with_storage_path(storage.path());
        config.performance.index_writer_memory = 20_000_000;
        config.performance.commit_interval = 2;

        let store = Arc::new(IndexStore::open(&config).unwrap());
        let status = StatusTracker::load(store.catalog().clone()).unwrap();
        let indexer = Indexer::new(store.clone(), status.clone(), &config);
        Fixture { _storage: storage, store, status, indexer }
    }

    #[test]
    fn test_rejects_invalid_root() {
        let fx = fixture();
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        assert!(matches!(
            fx.indexer.start(dir.path().join("missing"), false),
            Err(EngineError::InvalidPath(_))
        ));
        assert!(matches!(fx.indexer.start(&file, false), Err(EngineError::InvalidPath(_))));
        assert!(!fx.status.is_running());
    }

    #[test]
    fn test_run_indexes_and_reports_summary() {
        let fx = fixture();
        let root = tempdir().unwrap();
        for i in 0..5 {
            fs::write(root.path().join(format!("f{}.txt", i)), format!("file {}", i)).unwrap();
        }
        fs::create_dir(root.path().join("node_modules")).unwrap();
        fs::write(root.path().join("node_modules").join("dep.js"), "x").unwrap();

        let summary = fx.indexer.start(root.path(), false).unwrap().wait().unwrap();
        assert_eq!(summary.indexed, 5);
        assert_eq!(summary.total_candidates, 5);
        assert_eq!(summary.skipped, 0);
        assert_eq!(fx.store.num_records(), 5);

        let status = fx.status.snapshot();
        assert!(!status.in_progress);
        assert_eq!(status.total_indexed, 5);
        assert_eq!(status.progress_percentage, 100.0);
    }

    #[test]
    fn test_second_start_is_rejected_while_running() {
        let fx = fixture();
        let root = tempdir().unwrap();
        fs::write(root.path().join("a.txt"), "a").unwrap();

        // 手动占用状态，模拟正在运行的任务
        let _held = fx.status.begin_run(root.path()).unwrap();
        assert!(matches!(
            fx.indexer.start(root.path(), false),
            Err(EngineError::AlreadyRunning)
        ));
    }

    #[test]
    fn test_catalog_keeps_ids_between_runs() {
        let fx = fixture();
        let root = tempdir().unwrap();
        let file = root.path().join("a.txt");
        fs::write(&file, "a").unwrap();

        fx.indexer.start(root.path(), false).unwrap().wait().unwrap();
        let key = file.canonicalize().unwrap().to_string_lossy().to_string();
        let catalog: &Catalog = fx.store.catalog();
        let first = catalog.id_for(&key).unwrap();

        fx.indexer.start(root.path(), false).unwrap().wait().unwrap();
        assert_eq!(catalog.id_for(&key).unwrap(), first);
        assert_eq!(fx.store.num_records(), 1);
    }

    /// 判定第一个文件时删除 victim，模拟遍历过程中文件消失
    struct RemoveDuringRun {
        victim: PathBuf,
        done: AtomicBool,
    }

    impl Classifier for RemoveDuringRun {
        fn is_text(&self, probe: &[u8], extension: &str) -> bool {
            if !self.done.swap(true, Ordering::SeqCst) {
                fs::remove_file(&self.victim).unwrap();
            }
            HeuristicClassifier.is_text(probe, extension)
        }

        fn decode(&self, bytes: &[u8]) -> Option<String> {
            HeuristicClassifier.decode(bytes)
        }
    }

    #[test]
    fn test_vanished_file_is_skipped() {
        let fx = fixture();
        let root = tempdir().unwrap();
        fs::write(root.path().join("a.txt"), "first").unwrap();
        let victim = root.path().join("b.txt");
        fs::write(&victim, "second").unwrap();

        let classifier = Arc::new(RemoveDuringRun { victim, done: AtomicBool::new(false) });
        let indexer = fx.indexer.clone()
            .with_extractor(ContentExtractor::with_classifier(&ContentConfig::default(), classifier));

        let summary = indexer.start(root.path(), false).unwrap().wait().unwrap();
        assert_eq!(summary.total_candidates, 2);
        assert_eq!(summary.indexed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(fx.store.num_records(), 1);

        let status = fx.status.snapshot();
        assert!(!status.in_progress);
        assert_eq!(status.progress_percentage, 100.0);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_recorded_without_hash() {
        use std::os::unix::fs::PermissionsExt;

        // root 不受文件权限限制
        if uzers::get_effective_uid() == 0 {
            return;
        }

        let fx = fixture();
        let root = tempdir().unwrap();
        fs::write(root.path().join("open.txt"), "visible").unwrap();
        let secret = root.path().join("secret.txt");
        fs::write(&secret, "hidden").unwrap();
        fs::set_permissions(&secret, fs::Permissions::from_mode(0o000)).unwrap();

        let summary = fx.indexer.start(root.path(), false).unwrap().wait().unwrap();
        assert_eq!(summary.indexed, 2);
        assert_eq!(summary.skipped, 0);

        let key = secret.canonicalize().unwrap().to_string_lossy().to_string();
        let record = fx.store.get_by_path(&key).unwrap().unwrap();
        assert!(record.content_hash.is_empty());
        assert!(!record.is_text);
        assert_eq!(record.size_bytes, 6);

        fs::set_permissions(&secret, fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directories_index_each_file_once() {
        use std::os::unix::fs::symlink;

        let fx = fixture();
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();

        fs::create_dir_all(root.join("real").join("sub")).unwrap();
        fs::write(root.join("real").join("sub").join("x.txt"), "x").unwrap();
        fs::write(outside.path().join("y.txt"), "y").unwrap();
        symlink(root.join("real"), root.join("alias")).unwrap();
        symlink(&root, root.join("real").join("sub").join("loop")).unwrap();
        symlink(outside.path(), root.join("ext")).unwrap();
        symlink(outside.path(), root.join("ext2")).unwrap();

        let summary = fx.indexer.start(&root, false).unwrap().wait().unwrap();
        assert_eq!(summary.total_candidates, 2);
        assert_eq!(summary.indexed, 2);
        assert_eq!(fx.store.num_records(), 2);

        let lookup = |path: PathBuf| fx.store.get_by_path(&path.to_string_lossy()).unwrap();
        assert!(lookup(root.join("real").join("sub").join("x.txt")).is_some());
        assert!(lookup(root.join("alias").join("sub").join("x.txt")).is_none());
        assert!(lookup(root.join("ext").join("y.txt")).is_some());
        assert!(lookup(root.join("ext2").join("y.txt")).is_none());

        // 强制重建真实子树后仍只有一份记录
        fx.indexer.start(root.join("real"), true).unwrap().wait().unwrap();
        assert_eq!(fx.store.num_records(), 2);
        assert!(lookup(root.join("real").join("sub").join("x.txt")).is_some());
    }
}
