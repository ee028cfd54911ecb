// 配置模块 - 支持外部配置文件
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 配置文件路径
const CONFIG_FILE: &str = "./config.toml";

// ============== 配置结构体 ==============

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub walker: WalkerConfig,
    pub content: ContentConfig,
    pub performance: PerformanceConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    /// 索引与目录数据库的根目录
    pub storage_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct WalkerConfig {
    /// 按目录名排除（不区分大小写）
    pub excluded_dirs: Vec<String>,
    /// 按完整路径排除的 glob 模式
    pub exclude_patterns: Vec<String>,
    /// 是否跳过以 `.` 开头的目录
    pub skip_hidden_dirs: bool,
    /// 是否跟随目录符号链接（循环由访问集合防护）
    pub follow_symlinks: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ContentConfig {
    /// 文本/二进制判定时读取的字节数
    pub probe_size: usize,
    /// 文本摘录上限（解码后字节数）
    pub excerpt_limit: usize,
    /// 超过该大小的文件不读取内容，只做哈希
    pub max_content_size: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PerformanceConfig {
    pub index_writer_memory: usize,
    pub writer_threads: usize,
    /// 每写入多少个文件提交一次
    pub commit_interval: usize,
    /// 每处理多少个文件持久化一次进度
    pub progress_interval: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub top_extensions: usize,
    pub history_size: usize,
}

// ============== 默认配置 ==============

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            storage_path: "./storage".to_string(),
        }
    }
}

impl Default for WalkerConfig {
    fn default() -> Self {
        let excluded_dirs = [
            // 版本控制
            ".git", ".svn", ".hg",
            // 依赖目录
            "node_modules", "site-packages", "dist-packages", "bower_components",
            // 虚拟环境
            "venv", ".venv", "env", ".conda", "conda-meta", "__pycache__",
            // 构建输出
            "build", "dist", "target", "out", ".next", ".build",
            // 编辑器与缓存
            ".idea", ".vscode", ".cache",
            // 系统目录
            "proc", "sys", ".trash", ".trashes", "$recycle.bin", "system volume information",
        ];

        Self {
            excluded_dirs: excluded_dirs.iter().map(|s| s.to_string()).collect(),
            exclude_patterns: Vec::new(),
            skip_hidden_dirs: true,
            follow_symlinks: true,
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            probe_size: 2048,
            excerpt_limit: 50 * 1024,
            max_content_size: 10 * 1024 * 1024,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            index_writer_memory: 50_000_000,
            writer_threads: 1,
            commit_interval: 1000,
            progress_interval: 100,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 1000,
            top_extensions: 10,
            history_size: 100,
        }
    }
}

// ============== 配置加载 ==============

impl AppConfig {
    /// 从配置文件加载，失败则使用默认配置
    pub fn load() -> Self {
        Self::load_from_file(CONFIG_FILE).unwrap_or_else(|e| {
            tracing::warn!("无法加载配置文件 '{}': {}，使用默认配置", CONFIG_FILE, e);
            Self::default()
        })
    }

    /// 从指定文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// 生成默认配置文件
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
        let default_content = include_str!("../config.toml");
        fs::write(path, default_content)?;
        Ok(())
    }

    /// 替换存储目录（测试和命令行覆盖用）
    pub fn with_storage_path(mut self, path: impl AsRef<Path>) -> Self {
        self.paths.storage_path = path.as_ref().to_string_lossy().to_string();
        self
    }

    pub fn storage_path(&self) -> PathBuf {
        PathBuf::from(&self.paths.storage_path)
    }

    /// tantivy 索引目录
    pub fn index_dir(&self) -> PathBuf {
        self.storage_path().join("index")
    }

    /// sled 目录数据库
    pub fn catalog_dir(&self) -> PathBuf {
        self.storage_path().join("catalog")
    }
}

// ============== 全局配置实例 ==============

/// 全局配置实例 (懒加载)
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    let config = AppConfig::load();
    tracing::debug!("配置已加载，存储目录: {}", config.paths.storage_path);
    config
});
