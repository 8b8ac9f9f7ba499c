//! In-memory index backend for tests and embedded use
//!
//! Documents are kept as serialized JSON, keyed and therefore ordered by
//! (namespace, application name, tag).

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::entities::ApplicationInfo;

use super::{IndexBackend, IndexError, PageToken, ScanPage, TermQuery};

type DocumentKey = (String, String, String);

#[derive(Debug, Default)]
pub struct MemoryIndex {
    documents: Mutex<BTreeMap<DocumentKey, String>>,
    created: AtomicBool,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_created(&self) -> bool {
        self.created.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.documents.lock().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key(doc: &ApplicationInfo) -> DocumentKey {
        (
            doc.namespace.clone(),
            doc.application_name.clone(),
            doc.tag.clone(),
        )
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<DocumentKey, String>>, IndexError> {
        self.documents
            .lock()
            .map_err(|_| IndexError::Backend("Lock poisoned".into()))
    }

    fn matching(
        documents: &BTreeMap<DocumentKey, String>,
        query: &TermQuery,
    ) -> Result<Vec<(DocumentKey, ApplicationInfo)>, IndexError> {
        let mut hits = Vec::new();
        for (key, json) in documents {
            let doc: ApplicationInfo = serde_json::from_str(json)?;
            if query.matches(&doc) {
                hits.push((key.clone(), doc));
            }
        }
        Ok(hits)
    }
}

#[async_trait]
impl IndexBackend for MemoryIndex {
    async fn ensure_index(&self) -> Result<(), IndexError> {
        self.created.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn upsert(&self, doc: &ApplicationInfo) -> Result<(), IndexError> {
        let json = serde_json::to_string(doc)?;
        self.lock()?.insert(Self::key(doc), json);
        Ok(())
    }

    async fn page_scan(
        &self,
        query: &TermQuery,
        token: PageToken,
        page_size: usize,
    ) -> Result<ScanPage, IndexError> {
        let documents = self.lock()?;
        let hits = Self::matching(&documents, query)?;
        let total = hits.len() as u64;

        let records: Vec<ApplicationInfo> = hits
            .into_iter()
            .skip(token.offset() as usize)
            .take(page_size)
            .map(|(_, doc)| doc)
            .collect();
        let next = PageToken::at_offset(token.offset() + records.len() as u64);

        Ok(ScanPage {
            records,
            next,
            total,
        })
    }

    async fn delete_by_query(&self, query: &TermQuery) -> Result<u64, IndexError> {
        let mut documents = self.lock()?;
        let hits = Self::matching(&documents, query)?;
        for (key, _) in &hits {
            documents.remove(key);
        }
        Ok(hits.len() as u64)
    }

    async fn update_private_by_query(
        &self,
        query: &TermQuery,
        private: bool,
    ) -> Result<u64, IndexError> {
        let mut documents = self.lock()?;
        let hits = Self::matching(&documents, query)?;
        for (key, mut doc) in hits.iter().cloned() {
            doc.private = private;
            documents.insert(key, serde_json::to_string(&doc)?);
        }
        Ok(hits.len() as u64)
    }
}
