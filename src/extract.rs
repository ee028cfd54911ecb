// extract.rs - 文本判定与内容提取
//! 判断文件是否为文本，并提取有上限的文本摘录；另提供流式内容哈希

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use chardetng::EncodingDetector;
use encoding_rs::{CoderResult, Encoding};
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};

use crate::config::ContentConfig;
use crate::error::{EngineError, EngineResult};

static BINARY_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "exe", "dll", "so", "dylib", "bin", "obj", "o", "a", "lib",
        "zip", "tar", "gz", "bz2", "xz", "7z", "rar",
        "jpg", "jpeg", "png", "gif", "bmp", "tiff", "ico", "webp",
        "mp3", "mp4", "avi", "mov", "wmv", "flv", "mkv", "wav", "flac",
        "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
        "sqlite", "db", "mdb", "accdb",
        "class", "jar", "war", "ear",
        "pyc", "pyo", "pyd", "wasm",
    ]
    .into_iter()
    .collect()
});

static TEXT_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "txt", "md", "rst", "py", "js", "ts", "jsx", "tsx",
        "html", "htm", "css", "scss", "sass", "less",
        "json", "xml", "yaml", "yml", "toml", "ini", "cfg", "conf",
        "csv", "tsv", "log", "sh", "bash", "zsh", "fish",
        "sql", "c", "cpp", "cc", "cxx", "h", "hpp", "hxx",
        "java", "kt", "scala", "go", "rs", "swift", "php",
        "rb", "pl", "r", "m", "mm", "dart",
        "vue", "svelte", "astro", "ejs", "hbs", "mustache",
        "dockerfile", "gitignore", "gitattributes", "editorconfig", "env",
    ]
    .into_iter()
    .collect()
});

/// 文本/二进制判定策略
///
/// 只接收字节缓冲区，不接触文件系统，便于单独测试和替换。
pub trait Classifier: Send + Sync {
    /// 根据文件开头的探测字节和扩展名判断是否为文本
    fn is_text(&self, probe: &[u8], extension: &str) -> bool;

    /// 将字节解码为文本，无法解码时返回 None
    fn decode(&self, bytes: &[u8]) -> Option<String>;
}

/// 默认策略：扩展名 + NUL 字节 + 编码检测
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    /// 探测字节中控制字符占比过高视为二进制
    fn looks_like_text(&self, probe: &[u8]) -> bool {
        let text = match self.decode(probe) {
            Some(t) => t,
            None => return false,
        };

        let total = text.chars().count();
        if total == 0 {
            return false;
        }
        let control = text.chars()
            .filter(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t' | '\x0c'))
            .count();
        control * 10 < total
    }
}

impl Classifier for HeuristicClassifier {
    fn is_text(&self, probe: &[u8], extension: &str) -> bool {
        if BINARY_EXTENSIONS.contains(extension) {
            return false;
        }
        // 带 BOM 的 UTF-16 文本含有 NUL，需先于 NUL 检查
        if Encoding::for_bom(probe).is_some() {
            return true;
        }
        if probe.contains(&0) {
            return false;
        }
        if TEXT_EXTENSIONS.contains(extension) {
            return true;
        }
        if probe.is_empty() {
            return false;
        }
        self.looks_like_text(probe)
    }

    fn decode(&self, bytes: &[u8]) -> Option<String> {
        if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
            return decode_prefix(encoding, &bytes[bom_len..]).map(|(text, _)| text);
        }

        match std::str::from_utf8(bytes) {
            Ok(text) => return Some(text.to_string()),
            // 缓冲区末尾截断了一个多字节字符
            Err(e) if e.error_len().is_none() => {
                return std::str::from_utf8(&bytes[..e.valid_up_to()])
                    .ok()
                    .map(str::to_string);
            }
            Err(_) => {}
        }

        // 窗口可能截断在多字节字符中间，检测和解码都按未结束的流处理
        let mut detector = EncodingDetector::new();
        detector.feed(bytes, false);
        let encoding = detector.guess(None, false);
        match decode_prefix(encoding, bytes) {
            Some((text, false)) => Some(text),
            _ => {
                tracing::debug!("使用 {} 解码时出现错误", encoding.name());
                None
            }
        }
    }
}

/// 解码文件开头的一段字节，末尾不完整的字符被丢弃；返回文本和是否出现替换字符
fn decode_prefix(encoding: &'static Encoding, bytes: &[u8]) -> Option<(String, bool)> {
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let mut text = String::with_capacity(decoder.max_utf8_buffer_length(bytes.len())?);
    let (result, _, had_errors) = decoder.decode_to_string(bytes, &mut text, false);
    match result {
        CoderResult::InputEmpty => Some((text, had_errors)),
        CoderResult::OutputFull => None,
    }
}

/// 提取结果
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extraction {
    pub is_text: bool,
    pub excerpt: Option<String>,
}

impl Extraction {
    pub fn binary() -> Self {
        Self::default()
    }
}

/// 内容提取器：按配置读取探测窗口并调用判定策略
#[derive(Clone)]
pub struct ContentExtractor {
    classifier: Arc<dyn Classifier>,
    probe_size: usize,
    excerpt_limit: usize,
    max_content_size: u64,
}

impl ContentExtractor {
    pub fn new(config: &ContentConfig) -> Self {
        Self::with_classifier(config, Arc::new(HeuristicClassifier))
    }

    pub fn with_classifier(config: &ContentConfig, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier,
            probe_size: config.probe_size.max(1),
            excerpt_limit: config.excerpt_limit,
            max_content_size: config.max_content_size,
        }
    }

    pub fn excerpt_limit(&self) -> usize {
        self.excerpt_limit
    }

    /// 读取文件开头并判定。超过大小上限的文件不读取内容。
    pub fn extract(&self, path: &Path, size: u64) -> EngineResult<Extraction> {
        if size > self.max_content_size {
            return Ok(Extraction::binary());
        }

        // 多读 4 字节，保证截断点落在完整字符上
        let window = self.probe_size.max(self.excerpt_limit + 4) as u64;
        let file = File::open(path).map_err(|e| EngineError::from_io(path, e))?;
        let mut bytes = Vec::with_capacity(window.min(size) as usize);
        file.take(window)
            .read_to_end(&mut bytes)
            .map_err(|e| EngineError::from_io(path, e))?;

        let extension = path.extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        Ok(self.classify_bytes(&bytes, &extension))
    }

    /// 对已读入的字节做判定和摘录
    pub fn classify_bytes(&self, bytes: &[u8], extension: &str) -> Extraction {
        let probe = &bytes[..bytes.len().min(self.probe_size)];
        if !self.classifier.is_text(probe, extension) {
            return Extraction::binary();
        }

        match self.classifier.decode(bytes) {
            Some(mut text) => {
                truncate_at_char_boundary(&mut text, self.excerpt_limit);
                Extraction { is_text: true, excerpt: Some(text) }
            }
            None => Extraction::binary(),
        }
    }
}

fn truncate_at_char_boundary(text: &mut String, limit: usize) {
    if text.len() <= limit {
        return;
    }
    let mut end = limit;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

/// 流式计算文件内容的 SHA-256（十六进制小写）
pub fn hash_file(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(64 * 1024, file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn extractor() -> ContentExtractor {
        ContentExtractor::new(&ContentConfig::default())
    }

    #[test]
    fn test_classifier_on_buffers() {
        let c = HeuristicClassifier;

        assert!(c.is_text(b"hello world", ""));
        assert!(c.is_text(b"fn main() {}", "rs"));
        assert!(!c.is_text(b"hello\0world", ""));
        assert!(!c.is_text(b"plain text", "png"));
        assert!(!c.is_text(b"", ""));
        assert!(c.is_text(b"", "txt"));
        assert!(!c.is_text(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08], ""));
    }

    #[test]
    fn test_decode_utf16_with_bom() {
        let c = HeuristicClassifier;
        let bytes = [0xFF, 0xFE, b'h', 0, b'i', 0];

        assert!(c.is_text(&bytes, ""));
        assert_eq!(c.decode(&bytes).as_deref(), Some("hi"));
    }

    #[test]
    fn test_decode_truncated_utf8() {
        let c = HeuristicClassifier;
        let mut bytes = "héllo".as_bytes().to_vec();
        bytes.extend_from_slice(&"é".as_bytes()[..1]);

        assert_eq!(c.decode(&bytes).as_deref(), Some("héllo"));
    }

    #[test]
    fn test_decode_legacy_encoding() {
        let c = HeuristicClassifier;
        let source = "Le café est très chaud, la crème brûlée est délicieuse et légère.";
        let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(source);
        assert!(std::str::from_utf8(&bytes).is_err());

        let text = c.decode(&bytes).unwrap();
        assert!(text.contains("chaud"));
    }

    fn gbk_file(dir: &Path, name: &str, prefix: &str) -> std::path::PathBuf {
        let sentence = "中文文本内容测试，这是一段用于检测编码的简体中文句子。";
        let text = sentence.repeat(2000);
        let (body, _, _) = encoding_rs::GBK.encode(&text);
        let mut bytes = prefix.as_bytes().to_vec();
        bytes.extend_from_slice(&body[..64_000]);

        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_gbk_window_cut_inside_character() {
        let dir = tempdir().unwrap();
        let odd = gbk_file(dir.path(), "odd.txt", "a");
        let even = gbk_file(dir.path(), "even.txt", "");

        for (path, prefix) in [(odd, "a中文文本"), (even, "中文文本")] {
            let result = extractor().extract(&path, 64_001).unwrap();
            assert!(result.is_text);
            let excerpt = result.excerpt.unwrap();
            assert!(excerpt.starts_with(prefix), "{}", excerpt.chars().take(8).collect::<String>());
            assert!(excerpt.contains("检测编码"));
            assert!(excerpt.len() <= 50 * 1024);
        }
    }

    #[test]
    fn test_gbk_probe_without_extension() {
        let c = HeuristicClassifier;
        let text = "简体中文内容，用于编码检测。".repeat(200);
        let (body, _, _) = encoding_rs::GBK.encode(&text);
        let mut probe = b"x".to_vec();
        probe.extend_from_slice(&body[..2047]);

        assert!(c.is_text(&probe, ""));
        assert!(c.decode(&probe).unwrap().starts_with("x简体中文"));
    }

    #[test]
    fn test_excerpt_is_capped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "a".repeat(200 * 1024)).unwrap();

        let result = extractor().extract(&path, 200 * 1024).unwrap();
        assert!(result.is_text);
        assert_eq!(result.excerpt.unwrap().len(), 50 * 1024);
    }

    #[test]
    fn test_excerpt_cut_on_char_boundary() {
        let config = ContentConfig { excerpt_limit: 5, ..ContentConfig::default() };
        let extractor = ContentExtractor::new(&config);

        let result = extractor.classify_bytes("aaaaé".as_bytes(), "txt");
        assert_eq!(result.excerpt.as_deref(), Some("aaaa"));
    }

    #[test]
    fn test_oversized_file_not_read() {
        let config = ContentConfig { max_content_size: 4, ..ContentConfig::default() };
        let extractor = ContentExtractor::new(&config);
        let dir = tempdir().unwrap();
        let path = dir.path().join("note.txt");
        fs::write(&path, "hello").unwrap();

        assert_eq!(extractor.extract(&path, 5).unwrap(), Extraction::binary());
    }

    #[test]
    fn test_binary_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        fs::write(&path, [0u8, 1, 2, 3, 255, 0, 7]).unwrap();

        let result = extractor().extract(&path, 7).unwrap();
        assert!(!result.is_text);
        assert!(result.excerpt.is_none());
    }

    #[test]
    fn test_custom_classifier() {
        struct Never;
        impl Classifier for Never {
            fn is_text(&self, _: &[u8], _: &str) -> bool { false }
            fn decode(&self, _: &[u8]) -> Option<String> { None }
        }

        let extractor = ContentExtractor::with_classifier(&ContentConfig::default(), Arc::new(Never));
        assert!(!extractor.classify_bytes(b"hello", "txt").is_text);
    }

    #[test]
    fn test_hash_file() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::write(&a, "hello").unwrap();
        fs::write(&b, "hello").unwrap();

        let hash = hash_file(&a).unwrap();
        assert_eq!(hash, hash_file(&b).unwrap());
        assert_eq!(hash, "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824");
        assert!(hash_file(&dir.path().join("missing")).is_err());
    }
}
