// query/filter.rs - 过滤条件构建器
//! 将检索条件转换为 Tantivy 查询，并提供索引无法精确表达的子串匹配

use std::borrow::Cow;
use std::ops::Bound;

use tantivy::query::{AllQuery, BooleanQuery, Occur, Query, RangeQuery, TermQuery};
use tantivy::schema::IndexRecordOption;
use tantivy::tokenizer::TokenStream;
use tantivy::{Index, Term};

use super::types::{MatchLogic, SearchCriteria};
use crate::error::EngineResult;
use crate::schema::FileFields;

/// 过滤器构建器
pub struct FilterBuilder<'a> {
    index: &'a Index,
    fields: &'a FileFields,
}

impl<'a> FilterBuilder<'a> {
    pub fn new(index: &'a Index, fields: &'a FileFields) -> Self {
        Self { index, fields }
    }

    /// 构建完整的过滤查询；没有任何条件时匹配全部记录
    ///
    /// 文件名片段不进入索引查询，由 `SubstringMatcher` 二次过滤。
    /// 内容词在这里只做候选预筛，最终以子串匹配为准。
    pub fn build(&self, criteria: &SearchCriteria) -> EngineResult<Box<dyn Query>> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        if let Some(query) = self.extension_query(&criteria.extensions) {
            clauses.push((Occur::Must, query));
        }

        if let Some(query) = self.size_query(criteria.min_size, criteria.max_size) {
            clauses.push((Occur::Must, query));
        }

        if let Some(query) = self.date_query(criteria.min_modified, criteria.max_modified) {
            clauses.push((Occur::Must, query));
        }

        if let Some(ref owner) = criteria.owner {
            let term = Term::from_field_text(self.fields.owner, owner);
            clauses.push((Occur::Must, Box::new(TermQuery::new(term, IndexRecordOption::Basic))));
        }

        if !criteria.search_terms.is_empty() {
            let query = self.content_query(&criteria.search_terms, criteria.match_logic)?;
            clauses.push((Occur::Must, query));
        }

        if clauses.is_empty() {
            Ok(Box::new(AllQuery))
        } else {
            Ok(Box::new(BooleanQuery::new(clauses)))
        }
    }

    /// 扩展名集合（任一）
    fn extension_query(&self, extensions: &[String]) -> Option<Box<dyn Query>> {
        if extensions.is_empty() {
            return None;
        }

        let clauses: Vec<(Occur, Box<dyn Query>)> = extensions.iter()
            .map(|ext| {
                let term = Term::from_field_text(self.fields.extension, ext);
                let query: Box<dyn Query> = Box::new(TermQuery::new(term, IndexRecordOption::Basic));
                (Occur::Should, query)
            })
            .collect();

        Some(Box::new(BooleanQuery::new(clauses)))
    }

    /// 大小区间，两端包含
    fn size_query(&self, min: u64, max: Option<u64>) -> Option<Box<dyn Query>> {
        if min == 0 && max.is_none() {
            return None;
        }

        let field = self.fields.size;
        let lower = Bound::Included(Term::from_field_u64(field, min));
        let upper = match max {
            Some(max) => Bound::Included(Term::from_field_u64(field, max)),
            None => Bound::Unbounded,
        };
        Some(Box::new(RangeQuery::new(lower, upper)))
    }

    /// 修改时间区间，两端包含
    fn date_query(&self, min: Option<u64>, max: Option<u64>) -> Option<Box<dyn Query>> {
        if min.is_none() && max.is_none() {
            return None;
        }

        let field = self.fields.modified_at;
        let bound = |value: Option<u64>| match value {
            Some(secs) => Bound::Included(Term::from_field_u64(field, secs)),
            None => Bound::Unbounded,
        };
        Some(Box::new(RangeQuery::new(bound(min), bound(max))))
    }

    /// 内容词预筛：只看文本记录；每个词要求其全部二元组出现在摘录索引中
    ///
    /// 子串的二元组必然也是原文的二元组，预筛不会漏掉真正的匹配，最终以子串匹配为准。
    fn content_query(&self, terms: &[String], logic: MatchLogic) -> EngineResult<Box<dyn Query>> {
        let is_text = Term::from_field_bool(self.fields.is_text, true);
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![
            (Occur::Must, Box::new(TermQuery::new(is_text, IndexRecordOption::Basic))),
        ];

        let mut per_term = Vec::with_capacity(terms.len());
        for term in terms {
            per_term.push(self.grams_query(term)?);
        }

        match logic {
            MatchLogic::And => {
                clauses.extend(per_term.into_iter().map(|q| (Occur::Must, q)));
            }
            MatchLogic::Or => {
                let any: Vec<(Occur, Box<dyn Query>)> = per_term.into_iter()
                    .map(|q| (Occur::Should, q))
                    .collect();
                clauses.push((Occur::Must, Box::new(BooleanQuery::new(any))));
            }
        }

        Ok(Box::new(BooleanQuery::new(clauses)))
    }

    fn grams_query(&self, term: &str) -> EngineResult<Box<dyn Query>> {
        let clauses: Vec<(Occur, Box<dyn Query>)> = self.tokenize(term)?
            .iter()
            .map(|gram| {
                let term = Term::from_field_text(self.fields.text_excerpt, gram);
                let query: Box<dyn Query> = Box::new(TermQuery::new(term, IndexRecordOption::Basic));
                (Occur::Must, query)
            })
            .collect();

        Ok(Box::new(BooleanQuery::new(clauses)))
    }

    /// 用摘录字段的分词器切分文本，只保留最长的 n-gram（去重）
    ///
    /// 单字符的词得到它自己；更长的词得到全部二元组。
    pub fn tokenize(&self, text: &str) -> EngineResult<Vec<String>> {
        let mut analyzer = self.index.tokenizer_for_field(self.fields.text_excerpt)?;
        let mut stream = analyzer.token_stream(text);
        let mut grams: Vec<String> = Vec::new();

        while stream.advance() {
            let gram = &stream.token().text;
            if !grams.contains(gram) {
                grams.push(gram.clone());
            }
        }

        let longest = grams.iter().map(|g| g.chars().count()).max().unwrap_or(0);
        grams.retain(|g| g.chars().count() == longest);
        Ok(grams)
    }
}

/// 子串匹配器：用于文件名片段和内容词的最终判定
#[derive(Debug, Clone)]
pub struct SubstringMatcher {
    patterns: Vec<String>,
    logic: MatchLogic,
    case_sensitive: bool,
}

impl SubstringMatcher {
    pub fn new(patterns: &[String], logic: MatchLogic, case_sensitive: bool) -> Self {
        let patterns = patterns.iter()
            .map(|p| if case_sensitive { p.clone() } else { p.to_lowercase() })
            .collect();

        Self { patterns, logic, case_sensitive }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// 没有模式时视为命中
    pub fn matches(&self, haystack: &str) -> bool {
        if self.patterns.is_empty() {
            return true;
        }

        let haystack: Cow<'_, str> = if self.case_sensitive {
            Cow::Borrowed(haystack)
        } else {
            Cow::Owned(haystack.to_lowercase())
        };
        self.logic.combine(self.patterns.iter().map(|p| haystack.contains(p.as_str())))
    }
}
