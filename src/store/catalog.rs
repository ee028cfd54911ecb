// store/catalog.rs - 目录数据库
//! 使用 sled 保存路径 -> id 映射、索引状态和搜索历史
//!
//! 三棵树:
//! - `paths`: 绝对路径 -> id（大端 u64），保证同一路径重复索引时 id 不变
//! - `meta`: 单例记录（索引状态等），bincode 编码
//! - `history`: 自增键 -> 搜索历史条目，按时间先后排列

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Db, IVec, Tree};

use crate::error::{EngineError, EngineResult};

const TREE_PATHS: &str = "paths";
const TREE_META: &str = "meta";
const TREE_HISTORY: &str = "history";

/// 目录数据库（可廉价克隆，内部共享同一个 sled 实例）
#[derive(Clone)]
pub struct Catalog {
    db: Db,
    paths: Tree,
    meta: Tree,
    history: Tree,
}

impl Catalog {
    /// 创建或打开目录数据库
    pub fn open(path: &Path) -> EngineResult<Self> {
        let db = sled::open(path)?;
        let paths = db.open_tree(TREE_PATHS)?;
        let meta = db.open_tree(TREE_META)?;
        let history = db.open_tree(TREE_HISTORY)?;

        tracing::debug!("目录数据库已加载: {:?}（{} 条路径）", path, paths.len());
        Ok(Self { db, paths, meta, history })
    }

    // ============== 路径 -> id ==============

    pub fn id_for(&self, path: &str) -> EngineResult<Option<u64>> {
        self.paths.get(path.as_bytes())?
            .map(|raw| decode_id(&raw))
            .transpose()
    }

    /// 已有路径返回原 id，新路径分配新 id
    pub fn assign_id(&self, path: &str) -> EngineResult<u64> {
        if let Some(id) = self.id_for(path)? {
            return Ok(id);
        }

        // generate_id 从 0 开始，id 从 1 开始
        let id = self.db.generate_id()? + 1;
        let swapped = self.paths.compare_and_swap(
            path.as_bytes(),
            None::<&[u8]>,
            Some(&id.to_be_bytes()[..]),
        )?;

        match swapped {
            Ok(()) => Ok(id),
            // 并发插入了同一路径，以已有值为准
            Err(conflict) => match conflict.current {
                Some(raw) => decode_id(&raw),
                None => Ok(id),
            },
        }
    }

    pub fn remove_path(&self, path: &str) -> EngineResult<Option<u64>> {
        self.paths.remove(path.as_bytes())?
            .map(|raw| decode_id(&raw))
            .transpose()
    }

    /// 位于 root 之下的所有已登记路径（按路径组件比较，`/a/bc` 不属于 `/a/b`）
    pub fn paths_under(&self, root: &Path) -> EngineResult<Vec<String>> {
        let prefix = root.to_string_lossy();
        let mut found = Vec::new();

        for entry in self.paths.scan_prefix(prefix.as_bytes()) {
            let (key, _) = entry?;
            let path = String::from_utf8_lossy(&key).into_owned();
            if Path::new(&path).starts_with(root) {
                found.push(path);
            }
        }
        Ok(found)
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    // ============== 单例记录 ==============

    pub fn load_meta<T: DeserializeOwned>(&self, key: &str) -> EngineResult<Option<T>> {
        match self.meta.get(key.as_bytes())? {
            Some(raw) => Ok(Some(bincode::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn save_meta<T: Serialize>(&self, key: &str, value: &T) -> EngineResult<()> {
        let data = bincode::serialize(value)?;
        self.meta.insert(key.as_bytes(), data)?;
        self.meta.flush()?;
        Ok(())
    }

    // ============== 搜索历史 ==============

    /// 追加一条历史记录，超出 keep 条时丢弃最旧的
    pub fn append_history<T: Serialize>(&self, entry: &T, keep: usize) -> EngineResult<()> {
        let key = self.db.generate_id()?.to_be_bytes();
        self.history.insert(&key[..], bincode::serialize(entry)?)?;

        while self.history.len() > keep {
            if self.history.pop_min()?.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// 最近的 limit 条历史，新的在前
    pub fn recent_history<T: DeserializeOwned>(&self, limit: usize) -> EngineResult<Vec<T>> {
        let mut entries = Vec::new();
        for item in self.history.iter().rev().take(limit) {
            let (_, raw) = item?;
            entries.push(bincode::deserialize(&raw)?);
        }
        Ok(entries)
    }

    /// 将所有树写入磁盘
    pub fn flush(&self) -> EngineResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn decode_id(raw: &IVec) -> EngineResult<u64> {
    let bytes: [u8; 8] = raw.as_ref()
        .try_into()
        .map_err(|_| EngineError::Store(format!("corrupt id entry ({} bytes)", raw.len())))?;
    Ok(u64::from_be_bytes(bytes))
}
