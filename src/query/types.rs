// query/types.rs - 查询相关类型定义
//! 经过校验的检索条件

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// 多个文件名片段 / 内容词之间的组合方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchLogic {
    /// 全部命中
    And,
    /// 任一命中
    #[default]
    Or,
}

impl MatchLogic {
    pub fn combine<I>(self, hits: I) -> bool
    where
        I: IntoIterator<Item = bool>,
    {
        let mut hits = hits.into_iter();
        match self {
            MatchLogic::And => hits.all(|hit| hit),
            MatchLogic::Or => hits.any(|hit| hit),
        }
    }
}

/// 检索条件
///
/// 列表字段为空表示不过滤；时间为 Unix 秒，区间两端都包含。
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
    /// 小写、无点号
    pub extensions: Vec<String>,
    pub min_size: u64,
    pub max_size: Option<u64>,
    pub min_modified: Option<u64>,
    pub max_modified: Option<u64>,
    pub partial_names: Vec<String>,
    pub search_terms: Vec<String>,
    pub match_logic: MatchLogic,
    pub case_sensitive: bool,
    pub owner: Option<String>,
    pub duplicates_only: bool,
    pub limit: usize,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            min_size: 0,
            max_size: None,
            min_modified: None,
            max_modified: None,
            partial_names: Vec::new(),
            search_terms: Vec::new(),
            match_logic: MatchLogic::Or,
            case_sensitive: false,
            owner: None,
            duplicates_only: false,
            limit: 1000,
        }
    }
}

impl SearchCriteria {
    /// 区间倒置或 limit 为 0 时返回 InvalidRequest
    pub fn validate(&self) -> EngineResult<()> {
        if self.limit == 0 {
            return Err(EngineError::InvalidRequest("limit must be positive".to_string()));
        }
        if let Some(max) = self.max_size {
            if self.min_size > max {
                return Err(EngineError::InvalidRequest(format!(
                    "min_size {} is greater than max_size {}",
                    self.min_size, max
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min_modified, self.max_modified) {
            if min > max {
                return Err(EngineError::InvalidRequest(
                    "min_date is later than max_date".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// 是否需要逐条读取文档做二次过滤
    pub fn needs_verification(&self) -> bool {
        !self.partial_names.is_empty() || !self.search_terms.is_empty() || self.duplicates_only
    }
}

/// 扩展名规范化：去空白、去前导点号、转小写；空值丢弃
pub fn normalize_extensions<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for ext in raw {
        let ext = ext.as_ref().trim().trim_start_matches('.').to_lowercase();
        if !ext.is_empty() && !out.contains(&ext) {
            out.push(ext);
        }
    }
    out
}

/// 去掉空白片段
pub fn non_blank<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_logic() {
        assert!(MatchLogic::And.combine([true, true]));
        assert!(!MatchLogic::And.combine([true, false]));
        assert!(MatchLogic::Or.combine([false, true]));
        assert!(!MatchLogic::Or.combine([false, false]));
        assert_eq!(
            serde_json::from_str::<MatchLogic>("\"and\"").unwrap(),
            MatchLogic::And
        );
    }

    #[test]
    fn test_validate_rejects_inverted_ranges() {
        let ok = SearchCriteria { min_size: 5, max_size: Some(5), ..Default::default() };
        assert!(ok.validate().is_ok());

        let sizes = SearchCriteria { min_size: 6, max_size: Some(5), ..Default::default() };
        assert!(matches!(sizes.validate(), Err(EngineError::InvalidRequest(_))));

        let dates = SearchCriteria {
            min_modified: Some(10),
            max_modified: Some(9),
            ..Default::default()
        };
        assert!(matches!(dates.validate(), Err(EngineError::InvalidRequest(_))));

        let limit = SearchCriteria { limit: 0, ..Default::default() };
        assert!(matches!(limit.validate(), Err(EngineError::InvalidRequest(_))));
    }

    #[test]
    fn test_normalize_inputs() {
        assert_eq!(normalize_extensions(&[" .TXT", "md", "", "txt"]), vec!["txt", "md"]);
        assert_eq!(non_blank(&["foo", "  ", " bar "]), vec!["foo", "bar"]);
    }
}
