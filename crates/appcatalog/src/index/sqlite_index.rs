//! SQLite index backend
//!
//! This module provides a SQLite-based implementation of the IndexBackend trait.
//! Every application tag is one row of the `applications` table, keyed by its
//! catalog id.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool, sqlite::SqliteConnectOptions};
use std::str::FromStr;
use tracing::info;

use crate::entities::ApplicationInfo;

use super::{IndexBackend, IndexError, PageToken, ScanPage, TermQuery};

const TABLE: &str = "applications";

const COLUMNS: &str =
    "catalog_id, namespace, application_name, tag, readme, metadata, metadata_name, private";

/// SQLite-based index backend
pub struct SqliteIndex {
    pool: SqlitePool,
}

impl SqliteIndex {
    /// Connect to the database, creating the file if it does not exist
    ///
    /// Example: `sqlite:./data/catalog.db`
    pub async fn new(database_url: &str) -> Result<Self, IndexError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| IndexError::Backend(format!("Invalid database url: {}", e)))?
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| IndexError::Backend(format!("Failed to connect to SQLite: {}", e)))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn table_exists(&self) -> Result<bool, IndexError> {
        let name: Option<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(TABLE)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| IndexError::Backend(format!("Failed to inspect schema: {}", e)))?;
        Ok(name.is_some())
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, query: &TermQuery) {
    let mut clause = " WHERE ";

    if let Some(catalog_id) = &query.catalog_id {
        builder.push(clause).push("catalog_id = ").push_bind(catalog_id.clone());
        clause = " AND ";
    }
    if let Some(namespace) = &query.namespace {
        builder.push(clause).push("namespace = ").push_bind(namespace.clone());
        clause = " AND ";
    }
    if let Some(application_name) = &query.application_name {
        builder
            .push(clause)
            .push("application_name = ")
            .push_bind(application_name.clone());
        clause = " AND ";
    }
    if let Some(private) = query.private {
        builder
            .push(clause)
            .push("private = ")
            .push_bind(if private { 1i64 } else { 0i64 });
    }
}

fn row_to_info(row: &sqlx::sqlite::SqliteRow) -> ApplicationInfo {
    ApplicationInfo {
        catalog_id: row.get("catalog_id"),
        namespace: row.get("namespace"),
        application_name: row.get("application_name"),
        tag: row.get("tag"),
        readme: row.get("readme"),
        metadata: row.get("metadata"),
        metadata_name: row.get("metadata_name"),
        private: row.get::<i64, _>("private") != 0,
    }
}

#[async_trait]
impl IndexBackend for SqliteIndex {
    async fn ensure_index(&self) -> Result<(), IndexError> {
        if self.table_exists().await? {
            return Ok(());
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                catalog_id TEXT PRIMARY KEY,         -- namespace/application_name:tag
                namespace TEXT NOT NULL,
                application_name TEXT NOT NULL,
                tag TEXT NOT NULL,
                readme TEXT NOT NULL,
                metadata TEXT NOT NULL,              -- raw metadata YAML
                metadata_name TEXT NOT NULL,
                private INTEGER NOT NULL DEFAULT 0   -- SQLite boolean (0/1)
            )
        "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| IndexError::Backend(format!("Failed to create applications table: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_applications_order ON applications(namespace, application_name, tag)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| IndexError::Backend(format!("Failed to create ordering index: {}", e)))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_applications_private ON applications(private)")
            .execute(&self.pool)
            .await
            .map_err(|e| IndexError::Backend(format!("Failed to create visibility index: {}", e)))?;

        info!(table = TABLE, "created application index");
        Ok(())
    }

    async fn upsert(&self, doc: &ApplicationInfo) -> Result<(), IndexError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO applications
            (catalog_id, namespace, application_name, tag, readme, metadata, metadata_name, private)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(&doc.catalog_id)
        .bind(&doc.namespace)
        .bind(&doc.application_name)
        .bind(&doc.tag)
        .bind(&doc.readme)
        .bind(&doc.metadata)
        .bind(&doc.metadata_name)
        .bind(if doc.private { 1i64 } else { 0i64 })
        .execute(&self.pool)
        .await
        .map_err(|e| IndexError::Backend(format!("Failed to save application: {}", e)))?;

        Ok(())
    }

    async fn page_scan(
        &self,
        query: &TermQuery,
        token: PageToken,
        page_size: usize,
    ) -> Result<ScanPage, IndexError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM applications");
        push_filter(&mut count, query);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IndexError::Backend(format!("Failed to count applications: {}", e)))?;

        let mut select =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM applications", COLUMNS));
        push_filter(&mut select, query);
        select
            .push(" ORDER BY namespace, application_name, tag LIMIT ")
            .push_bind(page_size as i64)
            .push(" OFFSET ")
            .push_bind(token.offset() as i64);

        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IndexError::Backend(format!("Failed to scan applications: {}", e)))?;

        let records: Vec<ApplicationInfo> = rows.iter().map(row_to_info).collect();
        let next = PageToken::at_offset(token.offset() + records.len() as u64);

        Ok(ScanPage {
            records,
            next,
            total: total as u64,
        })
    }

    async fn delete_by_query(&self, query: &TermQuery) -> Result<u64, IndexError> {
        let mut delete = QueryBuilder::<Sqlite>::new("DELETE FROM applications");
        push_filter(&mut delete, query);

        let result = delete
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| IndexError::Backend(format!("Failed to delete applications: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn update_private_by_query(
        &self,
        query: &TermQuery,
        private: bool,
    ) -> Result<u64, IndexError> {
        let mut update = QueryBuilder::<Sqlite>::new("UPDATE applications SET private = ");
        update.push_bind(if private { 1i64 } else { 0i64 });
        push_filter(&mut update, query);

        let result = update
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| IndexError::Backend(format!("Failed to update visibility: {}", e)))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_id::ApplicationId;
    use tempfile::tempdir;

    fn doc(namespace: &str, name: &str, tag: &str, private: bool) -> ApplicationInfo {
        ApplicationInfo::new(
            &ApplicationId::new(namespace, name, tag),
            "# readme",
            "name: x",
            name,
            private,
        )
    }

    async fn open(dir: &tempfile::TempDir) -> SqliteIndex {
        let db_path = format!("sqlite:{}/index.db", dir.path().display());
        let index = SqliteIndex::new(&db_path).await.unwrap();
        index.ensure_index().await.unwrap();
        index
    }

    #[tokio::test]
    async fn test_ensure_index_is_idempotent() {
        let temp_dir = tempdir().unwrap();
        let index = open(&temp_dir).await;
        index.ensure_index().await.unwrap();
        assert!(index.table_exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_and_scan() {
        let temp_dir = tempdir().unwrap();
        let index = open(&temp_dir).await;

        index.upsert(&doc("globex", "gadgets", "1", false)).await.unwrap();
        index.upsert(&doc("acme", "widgets", "2", true)).await.unwrap();
        index.upsert(&doc("acme", "widgets", "1", true)).await.unwrap();
        index.upsert(&doc("acme", "widgets", "1", true)).await.unwrap();

        let page = index
            .page_scan(&TermQuery::all(), PageToken::start(), 2)
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        let ids: Vec<_> = page.records.iter().map(|d| d.catalog_id.as_str()).collect();
        assert_eq!(ids, vec!["acme/widgets:1", "acme/widgets:2"]);
        assert!(page.records[0].private);
        assert_eq!(page.records[0].readme, "# readme");

        let rest = index
            .page_scan(&TermQuery::all(), page.next, 2)
            .await
            .unwrap();
        assert_eq!(rest.records.len(), 1);
        assert_eq!(rest.records[0].catalog_id, "globex/gadgets:1");
    }

    #[tokio::test]
    async fn test_filters_delete_and_update() {
        let temp_dir = tempdir().unwrap();
        let index = open(&temp_dir).await;

        index.upsert(&doc("acme", "widgets", "1", false)).await.unwrap();
        index.upsert(&doc("acme", "widgets", "2", false)).await.unwrap();
        index.upsert(&doc("acme", "anvils", "1", true)).await.unwrap();

        let public = TermQuery {
            private: Some(false),
            ..TermQuery::by_namespace("acme")
        };
        let page = index.page_scan(&public, PageToken::start(), 10).await.unwrap();
        assert_eq!(page.total, 2);

        let updated = index
            .update_private_by_query(&TermQuery::by_application("acme", "widgets"), true)
            .await
            .unwrap();
        assert_eq!(updated, 2);
        let page = index.page_scan(&public, PageToken::start(), 10).await.unwrap();
        assert_eq!(page.total, 0);

        let id = ApplicationId::new("acme", "anvils", "1");
        assert_eq!(index.delete_by_query(&TermQuery::by_id(&id)).await.unwrap(), 1);
        assert_eq!(index.delete_by_query(&TermQuery::by_id(&id)).await.unwrap(), 0);
    }
}
