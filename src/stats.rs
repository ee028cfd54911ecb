// stats.rs - 统计聚合
//! 基于快速字段的一次只读扫描：总数、文本文件数、总大小、扩展名排行、重复分组

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tantivy::collector::Count;
use tantivy::query::TermQuery;
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{DocAddress, SegmentOrdinal, TantivyDocument, Term};

use crate::error::EngineResult;
use crate::schema::{FIELD_CONTENT_HASH, FIELD_EXTENSION, FIELD_SIZE};
use crate::store::IndexStore;

/// 索引统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_files: u64,
    pub text_files: u64,
    pub total_size: u64,
    /// 按数量降序，数量相同时按扩展名升序
    pub top_extensions: Vec<ExtensionCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionCount {
    pub extension: String,
    pub count: u64,
}

/// 内容相同的一组文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub content_hash: String,
    pub duplicate_count: u64,
    pub file_paths: Vec<String>,
    /// 组内文件大小之和
    pub total_size: u64,
}

/// 统计聚合器
#[derive(Clone)]
pub struct StatisticsAggregator {
    store: Arc<IndexStore>,
    top_n: usize,
}

impl StatisticsAggregator {
    pub fn new(store: Arc<IndexStore>, top_n: usize) -> Self {
        Self { store, top_n }
    }

    pub fn compute(&self) -> EngineResult<Statistics> {
        let searcher = self.store.searcher();
        let mut total_files = 0u64;
        let mut total_size = 0u64;
        let mut histogram: HashMap<String, u64> = HashMap::new();
        let mut buf = String::new();

        for segment in searcher.segment_readers() {
            let fast = segment.fast_fields();
            let sizes = fast.u64(FIELD_SIZE)?;
            let extensions = fast.str(FIELD_EXTENSION)?;

            for doc in segment.doc_ids_alive() {
                total_files += 1;
                total_size += sizes.first(doc).unwrap_or(0);

                if let Some(ref column) = extensions {
                    for ord in column.term_ords(doc) {
                        buf.clear();
                        column.ord_to_str(ord, &mut buf)?;
                        if !buf.is_empty() {
                            *histogram.entry(buf.clone()).or_default() += 1;
                        }
                    }
                }
            }
        }

        let is_text = Term::from_field_bool(self.store.fields().is_text, true);
        let text_files = searcher.search(
            &TermQuery::new(is_text, IndexRecordOption::Basic),
            &Count,
        )? as u64;

        Ok(Statistics {
            total_files,
            text_files,
            total_size,
            top_extensions: top_extensions(histogram, self.top_n),
        })
    }

    /// 全索引范围内的重复分组：按组总大小降序，其次按哈希升序
    pub fn duplicate_groups(&self) -> EngineResult<Vec<DuplicateGroup>> {
        let searcher = self.store.searcher();
        let mut groups: HashMap<String, Vec<(DocAddress, u64)>> = HashMap::new();
        let mut buf = String::new();

        for (ordinal, segment) in searcher.segment_readers().iter().enumerate() {
            let fast = segment.fast_fields();
            let sizes = fast.u64(FIELD_SIZE)?;
            let Some(hashes) = fast.str(FIELD_CONTENT_HASH)? else {
                continue;
            };

            for doc in segment.doc_ids_alive() {
                let Some(ord) = hashes.term_ords(doc).next() else {
                    continue;
                };
                buf.clear();
                hashes.ord_to_str(ord, &mut buf)?;
                if buf.is_empty() {
                    continue;
                }
                groups.entry(buf.clone())
                    .or_default()
                    .push((DocAddress::new(ordinal as SegmentOrdinal, doc), sizes.first(doc).unwrap_or(0)));
            }
        }

        let path_field = self.store.fields().path;
        let mut result = Vec::new();
        for (content_hash, members) in groups.into_iter().filter(|(_, m)| m.len() > 1) {
            let mut file_paths = Vec::with_capacity(members.len());
            for (address, _) in &members {
                let doc: TantivyDocument = searcher.doc(*address)?;
                if let Some(path) = doc.get_first(path_field).and_then(|v| v.as_str()) {
                    file_paths.push(path.to_string());
                }
            }
            file_paths.sort();

            result.push(DuplicateGroup {
                content_hash,
                duplicate_count: members.len() as u64,
                file_paths,
                total_size: members.iter().map(|(_, size)| size).sum(),
            });
        }

        result.sort_by(|a, b| {
            b.total_size.cmp(&a.total_size).then_with(|| a.content_hash.cmp(&b.content_hash))
        });
        Ok(result)
    }
}

fn top_extensions(histogram: HashMap<String, u64>, n: usize) -> Vec<ExtensionCount> {
    let mut counts: Vec<ExtensionCount> = histogram.into_iter()
        .map(|(extension, count)| ExtensionCount { extension, count })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.extension.cmp(&b.extension)));
    counts.truncate(n);
    counts
}
