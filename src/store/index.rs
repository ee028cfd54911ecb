// store/index.rs - 索引存储
//! tantivy 索引同时承担结构化记录表和全文索引
//!
//! 一条 FileRecord 对应一个 tantivy 文档；upsert = 按路径删除旧文档 + 添加新文档，
//! 两者在同一次提交中生效，结构化字段与全文字段因此不会分叉。

use std::fs;
use std::path::Path;
use std::sync::RwLock;

use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::TermQuery;
use tantivy::schema::IndexRecordOption;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term};

use crate::config::AppConfig;
use crate::error::EngineResult;
use crate::schema::{self, FileFields, FileRecord};

use super::catalog::Catalog;

/// 索引存储
pub struct IndexStore {
    index: Index,
    writer: RwLock<IndexWriter>,
    reader: IndexReader,
    fields: FileFields,
    catalog: Catalog,
}

impl IndexStore {
    /// 按配置打开（不存在则创建）索引与目录数据库
    pub fn open(config: &AppConfig) -> EngineResult<Self> {
        Self::open_in(
            &config.index_dir(),
            &config.catalog_dir(),
            config.performance.index_writer_memory,
            config.performance.writer_threads,
        )
    }

    pub fn open_in(
        index_dir: &Path,
        catalog_dir: &Path,
        heap_size: usize,
        threads: usize,
    ) -> EngineResult<Self> {
        fs::create_dir_all(index_dir)?;
        fs::create_dir_all(catalog_dir)?;

        let dir = MmapDirectory::open(index_dir)?;
        let index = Index::open_or_create(dir, schema::build_schema())?;
        schema::register_tokenizers(&index)?;

        let writer = index.writer_with_num_threads(threads.max(1), heap_size)?;

        // 手动刷新：每次提交后立即 reload，读端看到的永远是已提交状态
        let reader = index.reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        let fields = FileFields::resolve(&index.schema())?;
        let catalog = Catalog::open(catalog_dir)?;

        tracing::info!(
            "索引已打开: {:?}（{} 条记录）",
            index_dir,
            reader.searcher().num_docs()
        );

        Ok(Self {
            index,
            writer: RwLock::new(writer),
            reader,
            fields,
            catalog,
        })
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn fields(&self) -> &FileFields {
        &self.fields
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// 当前已提交状态的快照
    pub fn searcher(&self) -> Searcher {
        self.reader.searcher()
    }

    /// 已提交的记录数
    pub fn num_records(&self) -> u64 {
        self.searcher().num_docs()
    }

    // ============== 写入 ==============

    /// 写入或覆盖一条记录，返回其 id
    ///
    /// id 由目录数据库分配，同一路径始终得到同一个 id。调用 `commit` 之后可见。
    pub fn upsert(&self, mut record: FileRecord) -> EngineResult<u64> {
        record.id = self.catalog.assign_id(&record.path)?;
        let doc = self.fields.to_document(&record);

        let writer = self.writer.write()?;
        writer.delete_term(Term::from_field_text(self.fields.path, &record.path));
        writer.add_document(doc)?;

        Ok(record.id)
    }

    /// 删除一条记录，返回该路径之前是否已登记
    pub fn remove(&self, path: &str) -> EngineResult<bool> {
        let known = self.catalog.remove_path(path)?.is_some();

        let writer = self.writer.write()?;
        writer.delete_term(Term::from_field_text(self.fields.path, path));

        Ok(known)
    }

    /// 删除 root 之下的全部记录并提交
    pub fn purge_under(&self, root: &Path) -> EngineResult<usize> {
        let paths = self.catalog.paths_under(root)?;

        {
            let writer = self.writer.write()?;
            for path in &paths {
                writer.delete_term(Term::from_field_text(self.fields.path, path));
            }
        }
        for path in &paths {
            self.catalog.remove_path(path)?;
        }

        self.commit()?;
        tracing::info!("已清除 {:?} 下的 {} 条旧记录", root, paths.len());
        Ok(paths.len())
    }

    /// 提交挂起的写入并刷新读端
    pub fn commit(&self) -> EngineResult<()> {
        {
            let mut writer = self.writer.write()?;
            writer.commit()?;
        }
        self.reader.reload()?;
        self.catalog.flush()?;
        Ok(())
    }

    // ============== 读取 ==============

    pub fn get_by_path(&self, path: &str) -> EngineResult<Option<FileRecord>> {
        let searcher = self.searcher();
        let query = TermQuery::new(
            Term::from_field_text(self.fields.path, path),
            IndexRecordOption::Basic,
        );

        let hits = searcher.search(&query, &TopDocs::with_limit(1))?;
        match hits.first() {
            Some((_, address)) => {
                let doc: TantivyDocument = searcher.doc(*address)?;
                Ok(Some(self.fields.from_document(&doc)))
            }
            None => Ok(None),
        }
    }
}
