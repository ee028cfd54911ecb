// query/engine.rs - 查询执行
//! 将检索条件编译为索引查询并执行
//!
//! 两条路径：
//! - 只有结构化条件时，直接按 id 快速字段排序取前 limit 条
//! - 有文件名 / 内容词 / 仅重复条件时，先用索引取候选集，在快速字段上按文件名和哈希筛选，
//!   只为内容词验证和最终返回的记录读取存储文档

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tantivy::collector::{DocSetCollector, TopDocs};
use tantivy::columnar::StrColumn;
use tantivy::{DocAddress, DocId, Order, Searcher, SegmentOrdinal, TantivyDocument};

use super::filter::{FilterBuilder, SubstringMatcher};
use super::types::SearchCriteria;
use crate::error::EngineResult;
use crate::schema::{FileRecord, FIELD_CONTENT_HASH, FIELD_ID, FIELD_NAME};
use crate::store::IndexStore;

/// 查询引擎（只读，可与索引任务并发）
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<IndexStore>,
}

/// 通过文件名筛选的候选记录
struct Candidate {
    address: DocAddress,
    id: u64,
    content_hash: String,
    /// 内容词验证时已读取的记录
    record: Option<FileRecord>,
}

impl QueryEngine {
    pub fn new(store: Arc<IndexStore>) -> Self {
        Self { store }
    }

    /// 执行检索，结果按 id 升序，最多 limit 条
    pub fn search(&self, criteria: &SearchCriteria) -> EngineResult<Vec<FileRecord>> {
        criteria.validate()?;

        let searcher = self.store.searcher();
        let query = FilterBuilder::new(self.store.index(), self.store.fields()).build(criteria)?;

        if !criteria.needs_verification() {
            // TopDocs 按 limit 预分配，上限取实际文档数
            let capacity = criteria.limit.min(searcher.num_docs() as usize).max(1);
            let collector = TopDocs::with_limit(capacity)
                .order_by_fast_field::<u64>(FIELD_ID, Order::Asc);
            let hits = searcher.search(&query, &collector)?;
            return hits.into_iter()
                .map(|(_, address)| self.load(&searcher, address))
                .collect();
        }

        let addresses = searcher.search(&query, &DocSetCollector)?;
        tracing::debug!("候选记录 {} 条，开始逐条验证", addresses.len());

        let mut by_segment: BTreeMap<SegmentOrdinal, Vec<DocId>> = BTreeMap::new();
        for address in addresses {
            by_segment.entry(address.segment_ord).or_default().push(address.doc_id);
        }

        let names = SubstringMatcher::new(
            &criteria.partial_names,
            criteria.match_logic,
            criteria.case_sensitive,
        );
        let mut candidates = Vec::new();
        let mut buf = String::new();

        for (ordinal, docs) in by_segment {
            let fast = searcher.segment_reader(ordinal).fast_fields();
            let ids = fast.u64(FIELD_ID)?;
            let name_column = fast.str(FIELD_NAME)?;
            let hash_column = fast.str(FIELD_CONTENT_HASH)?;

            for doc in docs {
                if !names.is_empty() {
                    read_str(name_column.as_ref(), doc, &mut buf)?;
                    if !names.matches(&buf) {
                        continue;
                    }
                }

                let content_hash = if criteria.duplicates_only {
                    read_str(hash_column.as_ref(), doc, &mut buf)?;
                    buf.clone()
                } else {
                    String::new()
                };

                candidates.push(Candidate {
                    address: DocAddress::new(ordinal, doc),
                    id: ids.first(doc).unwrap_or(0),
                    content_hash,
                    record: None,
                });
            }
        }

        let terms = SubstringMatcher::new(
            &criteria.search_terms,
            criteria.match_logic,
            criteria.case_sensitive,
        );
        if !terms.is_empty() {
            let mut verified = Vec::with_capacity(candidates.len());
            for mut candidate in candidates {
                let record = self.load(&searcher, candidate.address)?;
                let content_hit = record.is_text
                    && record.text_excerpt.as_deref().is_some_and(|text| terms.matches(text));
                if content_hit {
                    candidate.record = Some(record);
                    verified.push(candidate);
                }
            }
            candidates = verified;
        }

        if criteria.duplicates_only {
            retain_duplicates(&mut candidates);
        }

        candidates.sort_by_key(|c| c.id);
        candidates.truncate(criteria.limit);

        candidates.into_iter()
            .map(|candidate| match candidate.record {
                Some(record) => Ok(record),
                None => self.load(&searcher, candidate.address),
            })
            .collect()
    }

    fn load(&self, searcher: &Searcher, address: DocAddress) -> EngineResult<FileRecord> {
        let doc: TantivyDocument = searcher.doc(address)?;
        Ok(self.store.fields().from_document(&doc))
    }
}

/// 读取单值字符串快速字段到 buf；字段缺失时为空串
fn read_str(column: Option<&StrColumn>, doc: DocId, buf: &mut String) -> EngineResult<()> {
    buf.clear();
    if let Some(column) = column {
        if let Some(ord) = column.term_ords(doc).next() {
            column.ord_to_str(ord, buf)?;
        }
    }
    Ok(())
}

/// 只保留内容哈希在集合内出现至少两次的记录；空哈希不参与
fn retain_duplicates(candidates: &mut Vec<Candidate>) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for candidate in candidates.iter().filter(|c| !c.content_hash.is_empty()) {
        *counts.entry(candidate.content_hash.clone()).or_default() += 1;
    }

    candidates.retain(|c| {
        !c.content_hash.is_empty() && counts.get(&c.content_hash).copied().unwrap_or(0) >= 2
    });
}
