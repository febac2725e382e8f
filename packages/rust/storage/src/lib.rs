//! libSQL storage layer for registry records (offline, embedded).
//!
//! The [`Storage`] struct wraps a local libSQL database holding one row per
//! business in the `contractors` table. The batch runner is the sole writer.

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use serde::Serialize;

use leadscout_shared::{
    BusinessRecord, EnrichError, ProcessingStatus, Provenance, Result, ReviewStatus, WebsiteStatus,
};

const RECORD_COLUMNS: &str = "id, business_name, license_number, phone, address, principal_name, \
     city, state, website_url, website_status, website_confidence, classification_confidence, \
     confidence_score, mailer_category, residential_focus, processing_status, review_status, \
     error_message, processing_attempts, last_processed, provenance_json";

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

/// Record counts by processing and review status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: u64,
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub approved_download: u64,
    pub pending_review: u64,
    pub rejected: u64,
    pub websites_found: u64,
}

impl Storage {
    /// Open or create a database at `path`, applying pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EnrichError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| EnrichError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| EnrichError::Storage(e.to_string()))?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        EnrichError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Record operations
    // -----------------------------------------------------------------------

    /// Insert a new pending record from its identity fields. Returns its id.
    pub async fn insert_record(&self, record: &BusinessRecord) -> Result<i64> {
        if record.business_name.trim().is_empty() {
            return Err(EnrichError::validation("business name must not be empty"));
        }

        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO contractors (business_name, license_number, phone, address,
                     principal_name, city, state, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.business_name.as_str(),
                    record.license_number.as_deref(),
                    record.phone.as_deref(),
                    record.address.as_deref(),
                    record.principal_name.as_deref(),
                    record.city.as_deref(),
                    record.state.as_deref(),
                    now.as_str(),
                    now.as_str()
                ],
            )
            .await
            .map_err(|e| EnrichError::Storage(e.to_string()))?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Up to `limit` pending records, oldest first.
    pub async fn fetch_pending(&self, limit: u32) -> Result<Vec<BusinessRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM contractors
             WHERE processing_status = 'pending' ORDER BY id LIMIT ?1"
        );
        let mut rows = self
            .conn
            .query(&sql, params![limit])
            .await
            .map_err(|e| EnrichError::Storage(e.to_string()))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| EnrichError::Storage(e.to_string()))?
        {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }

    /// Get a record by id.
    pub async fn get_record(&self, id: i64) -> Result<Option<BusinessRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM contractors WHERE id = ?1");
        let mut rows = self
            .conn
            .query(&sql, params![id])
            .await
            .map_err(|e| EnrichError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_record(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(EnrichError::Storage(e.to_string())),
        }
    }

    /// Persist a record's discovery, scoring and status fields.
    pub async fn update_record(&self, record: &BusinessRecord) -> Result<()> {
        let provenance_json = if record.provenance.is_empty() {
            None
        } else {
            Some(
                serde_json::to_string(&record.provenance)
                    .map_err(|e| EnrichError::Storage(format!("provenance: {e}")))?,
            )
        };
        let content_hash = record
            .provenance
            .get(Provenance::CONTENT_HASH)
            .and_then(|v| v.as_str())
            .map(String::from);
        let now = Utc::now().to_rfc3339();

        let changed = self
            .conn
            .execute(
                "UPDATE contractors SET
                     website_url = ?1, website_status = ?2, website_confidence = ?3,
                     classification_confidence = ?4, confidence_score = ?5,
                     mailer_category = ?6, residential_focus = ?7,
                     processing_status = ?8, review_status = ?9, error_message = ?10,
                     processing_attempts = ?11, last_processed = ?12,
                     provenance_json = ?13, website_content_hash = ?14, updated_at = ?15
                 WHERE id = ?16",
                params![
                    record.website_url(),
                    record.website_status().as_str(),
                    record.website_confidence,
                    record.classification_confidence,
                    record.confidence_score,
                    record.mailer_category.as_deref(),
                    record.residential_focus.map(i64::from),
                    record.processing_status().as_str(),
                    record.review_status().map(|r| r.as_str()),
                    record.error_message.as_deref(),
                    record.processing_attempts,
                    record.last_processed.map(|t| t.to_rfc3339()),
                    provenance_json,
                    content_hash,
                    now.as_str(),
                    record.id
                ],
            )
            .await
            .map_err(|e| EnrichError::Storage(e.to_string()))?;

        if changed == 0 {
            return Err(EnrichError::Storage(format!("record {} not found", record.id)));
        }
        Ok(())
    }

    /// Put every failed record back in the queue. Returns how many moved.
    pub async fn reset_failed(&self) -> Result<u64> {
        self.requeue(ProcessingStatus::Failed).await
    }

    /// Requeue records left `processing` by an interrupted run.
    pub async fn reset_interrupted(&self) -> Result<u64> {
        self.requeue(ProcessingStatus::Processing).await
    }

    async fn requeue(&self, from: ProcessingStatus) -> Result<u64> {
        let now = Utc::now().to_rfc3339();
        let changed = self
            .conn
            .execute(
                "UPDATE contractors
                 SET processing_status = 'pending', review_status = NULL,
                     error_message = NULL, updated_at = ?1
                 WHERE processing_status = ?2",
                params![now.as_str(), from.as_str()],
            )
            .await
            .map_err(|e| EnrichError::Storage(e.to_string()))?;
        tracing::info!(count = changed, from = %from, "records requeued");
        Ok(changed)
    }

    /// Record counts by status.
    pub async fn status_counts(&self) -> Result<StatusCounts> {
        let mut counts = StatusCounts::default();

        let mut rows = self
            .conn
            .query(
                "SELECT processing_status, review_status, website_status, COUNT(*)
                 FROM contractors
                 GROUP BY processing_status, review_status, website_status",
                params![],
            )
            .await
            .map_err(|e| EnrichError::Storage(e.to_string()))?;

        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| EnrichError::Storage(e.to_string()))?
        {
            let processing: String = row
                .get(0)
                .map_err(|e| EnrichError::Storage(e.to_string()))?;
            let review: Option<String> = row.get::<String>(1).ok();
            let website: String = row
                .get(2)
                .map_err(|e| EnrichError::Storage(e.to_string()))?;
            let n = row
                .get::<i64>(3)
                .map_err(|e| EnrichError::Storage(e.to_string()))? as u64;

            counts.total += n;
            match processing.parse::<ProcessingStatus>()? {
                ProcessingStatus::Pending => counts.pending += n,
                ProcessingStatus::Processing => counts.processing += n,
                ProcessingStatus::Completed => counts.completed += n,
                ProcessingStatus::Failed => counts.failed += n,
            }
            match review.as_deref().map(str::parse::<ReviewStatus>).transpose()? {
                Some(ReviewStatus::ApprovedDownload) => counts.approved_download += n,
                Some(ReviewStatus::PendingReview) => counts.pending_review += n,
                Some(ReviewStatus::Rejected) => counts.rejected += n,
                None => {}
            }
            if website.parse::<WebsiteStatus>()? == WebsiteStatus::Found {
                counts.websites_found += n;
            }
        }

        Ok(counts)
    }
}

/// Convert a database row (selected with [`RECORD_COLUMNS`]) to a record.
fn row_to_record(row: &libsql::Row) -> Result<BusinessRecord> {
    let storage_err = |e: libsql::Error| EnrichError::Storage(e.to_string());

    let mut record = BusinessRecord::new(
        row.get::<i64>(0).map_err(storage_err)?,
        row.get::<String>(1).map_err(storage_err)?,
    );
    record.license_number = row.get::<String>(2).ok();
    record.phone = row.get::<String>(3).ok();
    record.address = row.get::<String>(4).ok();
    record.principal_name = row.get::<String>(5).ok();
    record.city = row.get::<String>(6).ok();
    record.state = row.get::<String>(7).ok();

    let website_url = row.get::<String>(8).ok();
    let website_status: WebsiteStatus = row.get::<String>(9).map_err(storage_err)?.parse()?;

    record.website_confidence = row.get::<f64>(10).ok();
    record.classification_confidence = row.get::<f64>(11).ok();
    record.confidence_score = row.get::<f64>(12).ok();
    record.mailer_category = row.get::<String>(13).ok();
    record.residential_focus = row.get::<i64>(14).ok().map(|v| v != 0);

    let processing_status: ProcessingStatus =
        row.get::<String>(15).map_err(storage_err)?.parse()?;
    let review_status = row
        .get::<String>(16)
        .ok()
        .map(|s| s.parse::<ReviewStatus>())
        .transpose()?;

    record.error_message = row.get::<String>(17).ok();
    record.processing_attempts = row.get::<i64>(18).map_err(storage_err)? as u32;
    record.last_processed = match row.get::<String>(19).ok() {
        Some(s) => Some(
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| EnrichError::Storage(format!("invalid date: {e}")))?,
        ),
        None => None,
    };
    if let Some(json) = row.get::<String>(20).ok() {
        record.provenance = serde_json::from_str(&json)
            .map_err(|e| EnrichError::Storage(format!("provenance: {e}")))?;
    }

    record.restore(website_url, website_status, processing_status, review_status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("ls_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn sample(name: &str) -> BusinessRecord {
        let mut record = BusinessRecord::new(0, name);
        record.phone = Some("(509) 555-1234".into());
        record.city = Some("Pasco".into());
        record.state = Some("WA".into());
        record
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("ls_test_{}.db", Uuid::now_v7()));
        let s1 = Storage::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn insert_and_get() {
        let storage = test_storage().await;
        let id = storage.insert_record(&sample("Acme Plumbing LLC")).await.unwrap();

        let record = storage.get_record(id).await.unwrap().expect("record");
        assert_eq!(record.id, id);
        assert_eq!(record.business_name, "Acme Plumbing LLC");
        assert_eq!(record.phone.as_deref(), Some("(509) 555-1234"));
        assert!(record.address.is_none());
        assert_eq!(record.processing_status(), ProcessingStatus::Pending);
        assert_eq!(record.website_status(), WebsiteStatus::Unattempted);
        assert!(record.review_status().is_none());

        assert!(storage.get_record(id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_name_rejected() {
        let storage = test_storage().await;
        assert!(storage.insert_record(&sample("  ")).await.is_err());
    }

    #[tokio::test]
    async fn fetch_pending_respects_limit_and_status() {
        let storage = test_storage().await;
        let first = storage.insert_record(&sample("One")).await.unwrap();
        storage.insert_record(&sample("Two")).await.unwrap();
        storage.insert_record(&sample("Three")).await.unwrap();

        let mut done = storage.get_record(first).await.unwrap().unwrap();
        done.begin_processing().unwrap();
        done.mark_not_found();
        done.complete(0.0, ReviewStatus::Rejected).unwrap();
        storage.update_record(&done).await.unwrap();

        let pending = storage.fetch_pending(10).await.unwrap();
        let names: Vec<&str> = pending.iter().map(|r| r.business_name.as_str()).collect();
        assert_eq!(names, vec!["Two", "Three"]);

        assert_eq!(storage.fetch_pending(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_roundtrips_outcome_fields() {
        let storage = test_storage().await;
        let id = storage.insert_record(&sample("5 Star Guttering")).await.unwrap();

        let mut record = storage.get_record(id).await.unwrap().unwrap();
        record.begin_processing().unwrap();
        record.mark_found("https://5starguttering.com/").unwrap();
        record.website_confidence = Some(0.75);
        record.classification_confidence = Some(0.5);
        record.mailer_category = Some("Roofing".into());
        record.residential_focus = Some(true);
        record.provenance.record(Provenance::DISCOVERY_METHOD, "web_search");
        record.provenance.record(Provenance::CONTENT_HASH, "abc123");
        record.complete(0.65, ReviewStatus::PendingReview).unwrap();
        storage.update_record(&record).await.unwrap();

        let stored = storage.get_record(id).await.unwrap().unwrap();
        assert_eq!(stored.website_url(), Some("https://5starguttering.com/"));
        assert_eq!(stored.website_status(), WebsiteStatus::Found);
        assert_eq!(stored.processing_status(), ProcessingStatus::Completed);
        assert_eq!(stored.review_status(), Some(ReviewStatus::PendingReview));
        assert_eq!(stored.confidence_score, Some(0.65));
        assert_eq!(stored.residential_focus, Some(true));
        assert_eq!(stored.processing_attempts, 1);
        assert!(stored.last_processed.is_some());
        assert_eq!(
            stored.provenance.get(Provenance::DISCOVERY_METHOD).unwrap(),
            "web_search"
        );
    }

    #[tokio::test]
    async fn update_missing_record_errors() {
        let storage = test_storage().await;
        let record = BusinessRecord::new(999, "Ghost");
        assert!(storage.update_record(&record).await.is_err());
    }

    #[tokio::test]
    async fn reset_failed_and_counts() {
        let storage = test_storage().await;
        let a = storage.insert_record(&sample("A")).await.unwrap();
        let b = storage.insert_record(&sample("B")).await.unwrap();
        storage.insert_record(&sample("C")).await.unwrap();

        let mut failed = storage.get_record(a).await.unwrap().unwrap();
        failed.begin_processing().unwrap();
        failed.fail("boom");
        storage.update_record(&failed).await.unwrap();

        let mut approved = storage.get_record(b).await.unwrap().unwrap();
        approved.begin_processing().unwrap();
        approved.mark_found("https://b.com").unwrap();
        approved.complete(0.9, ReviewStatus::ApprovedDownload).unwrap();
        storage.update_record(&approved).await.unwrap();

        let counts = storage.status_counts().await.unwrap();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.approved_download, 1);
        assert_eq!(counts.websites_found, 1);

        assert_eq!(storage.reset_failed().await.unwrap(), 1);
        let requeued = storage.get_record(a).await.unwrap().unwrap();
        assert_eq!(requeued.processing_status(), ProcessingStatus::Pending);
        assert!(requeued.error_message.is_none());
        assert_eq!(requeued.processing_attempts, 1);

        assert_eq!(storage.status_counts().await.unwrap().pending, 2);
        assert_eq!(storage.reset_failed().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn interrupted_records_requeue() {
        let storage = test_storage().await;
        let id = storage.insert_record(&sample("A")).await.unwrap();
        let mut record = storage.get_record(id).await.unwrap().unwrap();
        record.begin_processing().unwrap();
        storage.update_record(&record).await.unwrap();

        assert_eq!(storage.status_counts().await.unwrap().processing, 1);
        assert_eq!(storage.reset_interrupted().await.unwrap(), 1);
        assert_eq!(storage.fetch_pending(5).await.unwrap().len(), 1);
    }
}
