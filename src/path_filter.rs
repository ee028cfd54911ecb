// path_filter.rs - 遍历过滤规则
//! 决定目录或文件在遍历时是否跳过
//!
//! 规则（任一命中即跳过）:
//! - 路径组件命中排除列表（版本控制、依赖、虚拟环境、构建输出、系统目录）
//! - 经由符号链接到达、真实路径在根目录内或为根目录祖先的目录（真实目录会在原位置被遍历）
//! - 目录解析后的真实路径在本次遍历中已访问过（防止符号链接循环）
//! - 路径无法访问（权限不足、悬空链接）

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::DirEntry;

use crate::config::WalkerConfig;

/// 排除规则（无状态）
#[derive(Debug, Clone)]
pub struct PathFilter {
    excluded: HashSet<String>,
    patterns: Vec<Pattern>,
    skip_hidden_dirs: bool,
}

impl PathFilter {
    pub fn new(config: &WalkerConfig) -> Self {
        let patterns = config.exclude_patterns.iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!("忽略无效的排除模式 '{}': {}", p, e);
                    None
                }
            })
            .collect();

        Self {
            excluded: config.excluded_dirs.iter().map(|d| d.to_lowercase()).collect(),
            patterns,
            skip_hidden_dirs: config.skip_hidden_dirs,
        }
    }

    /// 目录是否命中排除规则
    pub fn is_excluded_dir(&self, path: &Path) -> bool {
        let name = match path.file_name() {
            Some(n) => n.to_string_lossy().to_lowercase(),
            None => return false,
        };

        if self.excluded.contains(&name) {
            return true;
        }
        if self.skip_hidden_dirs && name.starts_with('.') {
            return true;
        }
        self.matches_pattern(path)
    }

    /// 文件是否命中排除规则（只看 glob 模式）
    pub fn is_excluded_file(&self, path: &Path) -> bool {
        self.matches_pattern(path)
    }

    fn matches_pattern(&self, path: &Path) -> bool {
        self.patterns.iter().any(|p| p.matches_path(path))
    }

    /// 为以 root 为根的一次遍历创建带访问集合的守卫
    pub fn guard(&self, root: &Path) -> WalkGuard<'_> {
        WalkGuard {
            filter: self,
            root: root.canonicalize().unwrap_or_else(|_| root.to_path_buf()),
            visited: HashSet::new(),
        }
    }
}

/// 单次遍历的状态：根目录的真实路径和已访问目录的真实路径
pub struct WalkGuard<'a> {
    filter: &'a PathFilter,
    root: PathBuf,
    visited: HashSet<PathBuf>,
}

impl WalkGuard<'_> {
    /// 判断 walkdir 条目是否跳过；根目录（depth 0）不受排除列表影响
    pub fn should_skip_entry(&mut self, entry: &DirEntry) -> bool {
        if entry.file_type().is_dir() {
            self.should_skip_dir(entry.path(), entry.depth())
        } else {
            // 文件符号链接不入索引，指向的文件会在自身位置被索引
            entry.path_is_symlink() || self.should_skip_file(entry.path(), entry.depth())
        }
    }

    pub fn should_skip_dir(&mut self, path: &Path, depth: usize) -> bool {
        if depth > 0 && self.filter.is_excluded_dir(path) {
            tracing::debug!("跳过排除目录: {:?}", path);
            return true;
        }

        match path.canonicalize() {
            Ok(real) => {
                let reenters_root = real.starts_with(&self.root) || self.root.starts_with(&real);
                if depth > 0 && real != path && reenters_root {
                    tracing::debug!("跳过回到根目录的链接: {:?} -> {:?}", path, real);
                    return true;
                }
                if !self.visited.insert(real) {
                    tracing::debug!("跳过已访问目录（符号链接循环）: {:?}", path);
                    return true;
                }
                false
            }
            Err(e) => {
                tracing::warn!("目录无法访问，跳过 {:?}: {}", path, e);
                true
            }
        }
    }

    pub fn should_skip_file(&self, path: &Path, depth: usize) -> bool {
        depth > 0 && self.filter.is_excluded_file(path)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn filter() -> PathFilter {
        PathFilter::new(&WalkerConfig::default())
    }

    #[test]
    fn test_excluded_names() {
        let filter = filter();

        assert!(filter.is_excluded_dir(Path::new("/home/u/project/.git")));
        assert!(filter.is_excluded_dir(Path::new("/home/u/project/node_modules")));
        assert!(filter.is_excluded_dir(Path::new("/home/u/project/Target")));
        assert!(filter.is_excluded_dir(Path::new("/home/u/.hidden")));
        assert!(!filter.is_excluded_dir(Path::new("/home/u/project/src")));
        assert!(!filter.is_excluded_file(Path::new("/home/u/project/.gitignore")));
    }

    #[test]
    fn test_exclude_patterns() {
        let config = WalkerConfig {
            exclude_patterns: vec!["*.log".to_string(), "[".to_string()],
            ..WalkerConfig::default()
        };
        let filter = PathFilter::new(&config);

        assert!(filter.is_excluded_file(Path::new("/var/app/server.log")));
        assert!(!filter.is_excluded_file(Path::new("/var/app/server.txt")));
    }

    #[test]
    fn test_root_is_never_excluded() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("build");
        fs::create_dir(&root).unwrap();

        let filter = filter();
        let mut guard = filter.guard(dir.path());
        assert!(!guard.should_skip_dir(&root, 0));
        assert!(guard.should_skip_dir(&root.join("build"), 1));
    }

    #[test]
    fn test_directory_visited_once() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("docs");
        fs::create_dir(&sub).unwrap();

        let filter = filter();
        let mut guard = filter.guard(dir.path());
        assert!(!guard.should_skip_dir(&sub, 1));
        assert!(guard.should_skip_dir(&sub.join("..").join("docs"), 1));
        assert_eq!(guard.visited_count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_is_skipped() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("a");
        fs::create_dir(&sub).unwrap();
        let link = sub.join("loop");
        std::os::unix::fs::symlink(dir.path(), &link).unwrap();

        let filter = filter();
        let mut guard = filter.guard(dir.path());
        assert!(!guard.should_skip_dir(dir.path(), 0));
        assert!(!guard.should_skip_dir(&sub, 1));
        assert!(guard.should_skip_dir(&link, 2));
    }

    #[cfg(unix)]
    #[test]
    fn test_link_into_root_is_skipped() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        let real = dir.path().join("real");
        fs::create_dir(&real).unwrap();
        let alias = dir.path().join("alias");
        let external = dir.path().join("external");
        std::os::unix::fs::symlink(&real, &alias).unwrap();
        std::os::unix::fs::symlink(outside.path(), &external).unwrap();

        let filter = filter();
        let mut guard = filter.guard(dir.path());
        assert!(guard.should_skip_dir(&alias, 1));
        assert!(!guard.should_skip_dir(&real, 1));
        assert!(!guard.should_skip_dir(&external, 1));
        assert!(guard.should_skip_dir(outside.path(), 1));

        let mut nested = filter.guard(&real);
        let parent_link = real.join("up");
        std::os::unix::fs::symlink(dir.path(), &parent_link).unwrap();
        assert!(nested.should_skip_dir(&parent_link, 1));
    }

    #[test]
    fn test_missing_directory_is_skipped() {
        let dir = tempdir().unwrap();
        let filter = filter();
        let mut guard = filter.guard(dir.path());
        assert!(guard.should_skip_dir(&dir.path().join("missing"), 1));
    }
}
