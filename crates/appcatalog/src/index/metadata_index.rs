//! Catalog operations over an [`IndexBackend`]

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::application_id::ApplicationId;
use crate::cache::{SummaryCache, SummarySource};
use crate::entities::{AppSummary, ApplicationInfo, CatalogSnapshot, Summary, SummaryFilter};

use super::aggregate::SummaryFolder;
use super::scan::scan_each;
use super::{IndexBackend, IndexError, PageToken, TermQuery};

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
pub struct IndexOptions {
    pub page_size: usize,
    pub refresh_interval: Duration,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

/// Full-catalog aggregation, used by the summary cache
struct IndexSummarySource {
    backend: Arc<dyn IndexBackend>,
    page_size: usize,
}

#[async_trait]
impl SummarySource for IndexSummarySource {
    async fn summarize(&self) -> Result<(Vec<AppSummary>, Summary), IndexError> {
        summarize(self.backend.as_ref(), &TermQuery::all(), self.page_size).await
    }
}

async fn summarize(
    backend: &dyn IndexBackend,
    query: &TermQuery,
    page_size: usize,
) -> Result<(Vec<AppSummary>, Summary), IndexError> {
    let mut folder = SummaryFolder::new();
    scan_each(backend, query, page_size, |record| folder.push(&record)).await?;
    Ok(folder.finish())
}

pub struct MetadataIndex {
    backend: Arc<dyn IndexBackend>,
    page_size: usize,
    cache: SummaryCache,
}

impl MetadataIndex {
    /// Create the index if needed and start the summary cache
    pub async fn open(
        backend: Arc<dyn IndexBackend>,
        options: IndexOptions,
    ) -> Result<Self, IndexError> {
        backend.ensure_index().await?;

        let page_size = options.page_size.max(1);
        let source = Arc::new(IndexSummarySource {
            backend: Arc::clone(&backend),
            page_size,
        });
        let cache = SummaryCache::start(source, options.refresh_interval).await?;

        info!(page_size, "metadata index opened");
        Ok(Self {
            backend,
            page_size,
            cache,
        })
    }

    pub fn backend(&self) -> &Arc<dyn IndexBackend> {
        &self.backend
    }

    /// Insert or overwrite the document for `info`'s id
    pub async fn add(&self, info: ApplicationInfo) -> Result<ApplicationInfo, IndexError> {
        let info = info.with_derived_id();
        self.backend.upsert(&info).await?;
        debug!(catalog_id = %info.catalog_id, private = info.private, "indexed application");
        self.cache.request_refresh();
        Ok(info)
    }

    pub async fn get(&self, id: &ApplicationId) -> Result<ApplicationInfo, IndexError> {
        let catalog_id = id.catalog_id();
        let page = self
            .backend
            .page_scan(&TermQuery::by_id(id), PageToken::start(), 2)
            .await?;

        let count = page.total.max(page.records.len() as u64);
        if count > 1 {
            return Err(IndexError::Duplicate { catalog_id, count });
        }
        page.records
            .into_iter()
            .next()
            .ok_or(IndexError::NotFound(catalog_id))
    }

    pub async fn exists(&self, id: &ApplicationId) -> Result<bool, IndexError> {
        match self.get(id).await {
            Ok(_) => Ok(true),
            Err(IndexError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub async fn remove(&self, id: &ApplicationId) -> Result<(), IndexError> {
        let deleted = self.backend.delete_by_query(&TermQuery::by_id(id)).await?;
        if deleted == 0 {
            return Err(IndexError::NotFound(id.catalog_id()));
        }
        debug!(catalog_id = %id, "removed application from index");
        self.cache.request_refresh();
        Ok(())
    }

    /// Delete every tag of every application in `namespace`
    pub async fn remove_namespace(&self, namespace: &str) -> Result<u64, IndexError> {
        let deleted = self
            .backend
            .delete_by_query(&TermQuery::by_namespace(namespace))
            .await?;
        info!(namespace, deleted, "removed namespace from index");
        if deleted > 0 {
            self.cache.request_refresh();
        }
        Ok(deleted)
    }

    pub async fn list(&self, namespace: &str) -> Result<Vec<ApplicationInfo>, IndexError> {
        let mut records = Vec::new();
        scan_each(
            self.backend.as_ref(),
            &TermQuery::by_namespace(namespace),
            self.page_size,
            |record| records.push(record),
        )
        .await?;
        Ok(records)
    }

    /// Summaries matching `filter`, folded from a scan of the index
    ///
    /// Always reads the index; [`MetadataIndex::list_summary`] is the cached path.
    pub async fn list_summary_with_filter(
        &self,
        filter: &SummaryFilter,
    ) -> Result<(Vec<AppSummary>, Summary), IndexError> {
        summarize(self.backend.as_ref(), &TermQuery::from(filter), self.page_size).await
    }

    pub fn list_summary(&self) -> Arc<CatalogSnapshot> {
        self.cache.snapshot()
    }

    /// Visibility shared by the application's tags, `None` when it has none
    pub async fn get_application_visibility(
        &self,
        namespace: &str,
        application_name: &str,
    ) -> Result<Option<bool>, IndexError> {
        let page = self
            .backend
            .page_scan(
                &TermQuery::by_application(namespace, application_name),
                PageToken::start(),
                1,
            )
            .await?;
        Ok(page.records.first().map(|record| record.private))
    }

    /// Set `private` on every tag of the application
    pub async fn update_application_visibility(
        &self,
        namespace: &str,
        application_name: &str,
        private: bool,
    ) -> Result<u64, IndexError> {
        let updated = self
            .backend
            .update_private_by_query(
                &TermQuery::by_application(namespace, application_name),
                private,
            )
            .await?;
        info!(namespace, application_name, private, updated, "updated visibility");
        self.cache.request_refresh();
        Ok(updated)
    }

    pub fn request_refresh(&self) {
        self.cache.request_refresh();
    }

    pub async fn shutdown(&self) {
        self.cache.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{MemoryIndex, ScanPage};
    use tokio::time;

    const METADATA: &str = "apiVersion: catalog.appcat.dev/v1alpha1\nkind: ApplicationMetadata\nname: Widgets\n";

    fn info(namespace: &str, name: &str, tag: &str, private: bool) -> ApplicationInfo {
        ApplicationInfo::new(
            &ApplicationId::new(namespace, name, tag),
            "# Widgets",
            METADATA,
            "Widgets",
            private,
        )
    }

    async fn open_memory(interval: Duration) -> (Arc<MemoryIndex>, MetadataIndex) {
        let backend = Arc::new(MemoryIndex::new());
        let index = MetadataIndex::open(
            backend.clone(),
            IndexOptions {
                page_size: 2,
                refresh_interval: interval,
            },
        )
        .await
        .unwrap();
        (backend, index)
    }

    #[tokio::test]
    async fn test_open_creates_index() {
        let (backend, index) = open_memory(Duration::from_secs(60)).await;
        assert!(backend.is_created());
        assert_eq!(index.list_summary().summary, Summary::default());
        index.shutdown().await;
    }

    #[tokio::test]
    async fn test_add_then_get() {
        let (_, index) = open_memory(Duration::from_secs(60)).await;
        let mut doc = info("acme", "widgets", "1.0", false);
        doc.catalog_id = "stale".into();

        let stored = index.add(doc).await.unwrap();
        assert_eq!(stored.catalog_id, "acme/widgets:1.0");

        let id = ApplicationId::new("acme", "widgets", "1.0");
        let fetched = index.get(&id).await.unwrap();
        assert_eq!(fetched, stored);
        assert!(index.exists(&id).await.unwrap());
        index.shutdown().await;
    }

    #[tokio::test]
    async fn test_get_and_remove_missing() {
        let (_, index) = open_memory(Duration::from_secs(60)).await;
        let id = ApplicationId::new("acme", "widgets", "1.0");

        assert!(matches!(index.get(&id).await, Err(IndexError::NotFound(_))));
        assert!(!index.exists(&id).await.unwrap());
        assert!(matches!(index.remove(&id).await, Err(IndexError::NotFound(_))));
        index.shutdown().await;
    }

    #[tokio::test]
    async fn test_list_pages_through_namespace() {
        let (_, index) = open_memory(Duration::from_secs(60)).await;
        for tag in ["1", "2", "3", "4", "5"] {
            index.add(info("acme", "widgets", tag, false)).await.unwrap();
        }
        index.add(info("globex", "gadgets", "1", false)).await.unwrap();

        let listed = index.list("acme").await.unwrap();
        let tags: Vec<_> = listed.iter().map(|r| r.tag.as_str()).collect();
        assert_eq!(tags, vec!["1", "2", "3", "4", "5"]);
        index.shutdown().await;
    }

    #[tokio::test]
    async fn test_visibility_round_trip() {
        let (_, index) = open_memory(Duration::from_secs(60)).await;
        assert_eq!(
            index.get_application_visibility("acme", "widgets").await.unwrap(),
            None
        );

        index.add(info("acme", "widgets", "1", false)).await.unwrap();
        index.add(info("acme", "widgets", "2", false)).await.unwrap();
        assert_eq!(
            index.get_application_visibility("acme", "widgets").await.unwrap(),
            Some(false)
        );

        let updated = index
            .update_application_visibility("acme", "widgets", true)
            .await
            .unwrap();
        assert_eq!(updated, 2);
        assert_eq!(
            index.get_application_visibility("acme", "widgets").await.unwrap(),
            Some(true)
        );
        index.shutdown().await;
    }

    #[tokio::test]
    async fn test_filtered_summary_hits_the_index() {
        let (_, index) = open_memory(Duration::from_secs(60)).await;
        index.add(info("acme", "widgets", "1", false)).await.unwrap();
        index.add(info("acme", "anvils", "1", true)).await.unwrap();
        index.add(info("globex", "gadgets", "1", false)).await.unwrap();

        let (apps, summary) = index
            .list_summary_with_filter(&SummaryFilter::public())
            .await
            .unwrap();
        assert_eq!(apps.len(), 2);
        assert_eq!(summary.namespace_count, 2);

        let (apps, _) = index
            .list_summary_with_filter(&SummaryFilter::namespace("acme", Some(true)))
            .await
            .unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].application_name, "anvils");
        index.shutdown().await;
    }

    #[tokio::test]
    async fn test_unfiltered_summary_reads_fresh_writes() {
        let (_, index) = open_memory(Duration::from_secs(60)).await;
        index.add(info("acme", "widgets", "1.0", false)).await.unwrap();
        index.add(info("globex", "gadgets", "1.0", false)).await.unwrap();

        let (apps, summary) = index
            .list_summary_with_filter(&SummaryFilter::all())
            .await
            .unwrap();
        assert_eq!(apps.len(), 2);
        assert_eq!(
            summary,
            Summary {
                namespace_count: 2,
                application_count: 2,
                tag_count: 2,
            }
        );
        // the cached view only catches up on the next refresh
        assert_eq!(index.list_summary().summary.tag_count, 0);
        index.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_trigger_cache_refresh() {
        let (_, index) = open_memory(Duration::from_millis(300)).await;
        time::sleep(Duration::from_millis(150)).await;

        index.add(info("acme", "widgets", "1", false)).await.unwrap();
        time::sleep(Duration::from_millis(10)).await;

        let snapshot = index.list_summary();
        assert_eq!(snapshot.summary.tag_count, 1);
        let (apps, summary) = index
            .list_summary_with_filter(&SummaryFilter::all())
            .await
            .unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(summary.application_count, 1);
        index.shutdown().await;
    }

    #[tokio::test]
    async fn test_remove_namespace() {
        let (backend, index) = open_memory(Duration::from_secs(60)).await;
        index.add(info("acme", "widgets", "1", false)).await.unwrap();
        index.add(info("acme", "anvils", "1", false)).await.unwrap();
        index.add(info("globex", "gadgets", "1", false)).await.unwrap();

        assert_eq!(index.remove_namespace("acme").await.unwrap(), 2);
        assert_eq!(backend.len(), 1);
        assert_eq!(index.remove_namespace("acme").await.unwrap(), 0);
        index.shutdown().await;
    }

    /// Reports a total that never matches what it actually returns
    struct InflatedTotal {
        inner: MemoryIndex,
    }

    #[async_trait]
    impl IndexBackend for InflatedTotal {
        async fn ensure_index(&self) -> Result<(), IndexError> {
            self.inner.ensure_index().await
        }

        async fn upsert(&self, doc: &ApplicationInfo) -> Result<(), IndexError> {
            self.inner.upsert(doc).await
        }

        async fn page_scan(
            &self,
            query: &TermQuery,
            token: PageToken,
            page_size: usize,
        ) -> Result<ScanPage, IndexError> {
            let mut page = self.inner.page_scan(query, token, page_size).await?;
            page.total += 10;
            Ok(page)
        }

        async fn delete_by_query(&self, query: &TermQuery) -> Result<u64, IndexError> {
            self.inner.delete_by_query(query).await
        }

        async fn update_private_by_query(
            &self,
            query: &TermQuery,
            private: bool,
        ) -> Result<u64, IndexError> {
            self.inner.update_private_by_query(query, private).await
        }
    }

    #[tokio::test]
    async fn test_scan_stops_on_empty_page_when_total_is_inconsistent() {
        let backend = Arc::new(InflatedTotal {
            inner: MemoryIndex::new(),
        });
        for tag in ["1", "2", "3"] {
            backend.upsert(&info("acme", "widgets", tag, false)).await.unwrap();
        }

        let index = MetadataIndex::open(
            backend,
            IndexOptions {
                page_size: 2,
                refresh_interval: Duration::from_secs(60),
            },
        )
        .await
        .unwrap();

        assert_eq!(index.list("acme").await.unwrap().len(), 3);
        assert_eq!(index.list_summary().summary.tag_count, 3);
        index.shutdown().await;
    }

    #[tokio::test]
    async fn test_get_reports_duplicates() {
        let backend = Arc::new(InflatedTotal {
            inner: MemoryIndex::new(),
        });
        backend.upsert(&info("acme", "widgets", "1", false)).await.unwrap();
        let index = MetadataIndex::open(backend, IndexOptions::default())
            .await
            .unwrap();

        let result = index.get(&ApplicationId::new("acme", "widgets", "1")).await;
        assert!(matches!(result, Err(IndexError::Duplicate { count: 11, .. })));
        index.shutdown().await;
    }
}
