// api/request.rs - 请求类型
//! 搜索与索引请求，外部调用方（界面、传输层、命令行）使用的结构

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::query::{non_blank, normalize_extensions, parse_date, DateBound, MatchLogic, SearchCriteria};

/// 搜索请求
///
/// 列表字段允许为 null 或缺省；日期为 `YYYY-MM-DD` 或 RFC 3339。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub extensions: Option<Vec<String>>,

    #[serde(default)]
    pub min_size: u64,

    #[serde(default)]
    pub max_size: Option<u64>,

    #[serde(default)]
    pub min_date: Option<String>,

    #[serde(default)]
    pub max_date: Option<String>,

    #[serde(default)]
    pub partial_names: Option<Vec<String>>,

    #[serde(default)]
    pub match_logic: MatchLogic,

    #[serde(default)]
    pub search_terms: Option<Vec<String>>,

    #[serde(default)]
    pub case_sensitive: bool,

    #[serde(default)]
    pub owner_filter: Option<String>,

    #[serde(default)]
    pub duplicates_only: bool,

    /// 返回结果数量上限，必须为正
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 { 1000 }

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            extensions: None,
            min_size: 0,
            max_size: None,
            min_date: None,
            max_date: None,
            partial_names: None,
            match_logic: MatchLogic::Or,
            search_terms: None,
            case_sensitive: false,
            owner_filter: None,
            duplicates_only: false,
            limit: default_limit(),
        }
    }
}

impl SearchRequest {
    pub fn with_extensions<S: Into<String>>(mut self, extensions: impl IntoIterator<Item = S>) -> Self {
        self.extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>, logic: MatchLogic) -> Self {
        self.partial_names = Some(names.into_iter().map(Into::into).collect());
        self.match_logic = logic;
        self
    }

    pub fn with_terms<S: Into<String>>(mut self, terms: impl IntoIterator<Item = S>) -> Self {
        self.search_terms = Some(terms.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_size_range(mut self, min: u64, max: Option<u64>) -> Self {
        self.min_size = min;
        self.max_size = max;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn duplicates(mut self) -> Self {
        self.duplicates_only = true;
        self
    }

    /// 规范化并校验，转换为内部检索条件
    pub fn to_criteria(&self) -> EngineResult<SearchCriteria> {
        if self.limit <= 0 {
            return Err(EngineError::InvalidRequest(format!(
                "limit must be positive, got {}",
                self.limit
            )));
        }

        let min_modified = self.min_date.as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_date(s, DateBound::Start))
            .transpose()?;
        let max_modified = self.max_date.as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_date(s, DateBound::End))
            .transpose()?;

        let owner = self.owner_filter.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let criteria = SearchCriteria {
            extensions: normalize_extensions(self.extensions.as_deref().unwrap_or_default()),
            min_size: self.min_size,
            max_size: self.max_size,
            min_modified,
            max_modified,
            partial_names: non_blank(self.partial_names.as_deref().unwrap_or_default()),
            search_terms: non_blank(self.search_terms.as_deref().unwrap_or_default()),
            match_logic: self.match_logic,
            case_sensitive: self.case_sensitive,
            owner,
            duplicates_only: self.duplicates_only,
            limit: usize::try_from(self.limit).unwrap_or(usize::MAX),
        };
        criteria.validate()?;
        Ok(criteria)
    }
}

/// 索引请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRequest {
    pub root_path: String,
    #[serde(default)]
    pub force_reindex: bool,
}

impl IndexRequest {
    pub fn new(root_path: impl Into<String>, force_reindex: bool) -> Self {
        Self {
            root_path: root_path.into(),
            force_reindex,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_request() {
        let request: SearchRequest = serde_json::from_str(r#"{"extensions": ["TXT"]}"#).unwrap();
        assert_eq!(request.limit, 1000);
        assert_eq!(request.match_logic, MatchLogic::Or);

        let criteria = request.to_criteria().unwrap();
        assert_eq!(criteria.extensions, vec!["txt"]);
        assert_eq!(criteria.limit, 1000);
    }

    #[test]
    fn test_null_lists_and_blank_entries() {
        let request: SearchRequest = serde_json::from_str(
            r#"{"extensions": null, "partial_names": ["", "foo"], "match_logic": "and",
                "search_terms": [" "], "owner_filter": ""}"#,
        ).unwrap();

        let criteria = request.to_criteria().unwrap();
        assert!(criteria.extensions.is_empty());
        assert_eq!(criteria.partial_names, vec!["foo"]);
        assert!(criteria.search_terms.is_empty());
        assert_eq!(criteria.match_logic, MatchLogic::And);
        assert!(criteria.owner.is_none());
    }

    #[test]
    fn test_invalid_requests() {
        let zero = SearchRequest::default().with_limit(0);
        assert!(matches!(zero.to_criteria(), Err(EngineError::InvalidRequest(_))));

        let negative = SearchRequest::default().with_limit(-3);
        assert!(matches!(negative.to_criteria(), Err(EngineError::InvalidRequest(_))));

        let inverted = SearchRequest {
            min_date: Some("2024-02-01".to_string()),
            max_date: Some("2024-01-01".to_string()),
            ..Default::default()
        };
        assert!(matches!(inverted.to_criteria(), Err(EngineError::InvalidRequest(_))));

        let bad_date = SearchRequest {
            min_date: Some("last tuesday".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad_date.to_criteria(), Err(EngineError::InvalidRequest(_))));
    }

    #[test]
    fn test_same_day_range_is_valid() {
        let request = SearchRequest {
            min_date: Some("2024-01-01".to_string()),
            max_date: Some("2024-01-01".to_string()),
            ..Default::default()
        };
        let criteria = request.to_criteria().unwrap();
        assert_eq!(criteria.max_modified.unwrap() - criteria.min_modified.unwrap(), 86_399);
    }

    #[test]
    fn test_index_request_defaults() {
        let request: IndexRequest = serde_json::from_str(r#"{"root_path": "/data"}"#).unwrap();
        assert_eq!(request, IndexRequest::new("/data", false));
    }
}
