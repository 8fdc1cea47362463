//! Report storage for Noisemap.
//!
//! [`ReportStore`] is the capability the rest of the crate depends on. Two
//! implementations exist:
//!
//! - [`MemoryStore`]: an index-addressed arena, for tests and demos
//! - [`SqliteStore`]: sqlx-backed SQLite, for anything that should survive a restart
//!
//! [`Storage`] picks one at startup from a connection string and is what the
//! HTTP layer holds.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Executor, Row, Sqlite};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{Location, NewReport, NoiseCategory, NoiseReport, ReportStatus};

/// Connection string selecting the in-memory store.
pub const MEMORY_STORE_URL: &str = "memory";

/// CRUD access to the report collection.
///
/// Only `status` and `flagged` may change after a report is stored.
pub trait ReportStore: Send + Sync {
    /// Every report, in insertion order.
    fn list(&self) -> impl Future<Output = Result<Vec<NoiseReport>, StoreError>> + Send;

    fn get(&self, id: &str) -> impl Future<Output = Result<NoiseReport, StoreError>> + Send;

    /// Store a fully formed report as-is.
    fn insert(&self, report: NoiseReport) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Store several reports atomically: either all of them or none.
    fn insert_batch(
        &self,
        reports: Vec<NoiseReport>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn update_status(
        &self,
        id: &str,
        status: ReportStatus,
    ) -> impl Future<Output = Result<NoiseReport, StoreError>> + Send;

    fn set_flagged(
        &self,
        id: &str,
        flagged: bool,
    ) -> impl Future<Output = Result<NoiseReport, StoreError>> + Send;

    fn delete(&self, id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Store a public submission, assigning its id, timestamp and `pending` status.
    fn create(
        &self,
        submission: NewReport,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<NoiseReport, StoreError>> + Send {
        async move {
            let report = NoiseReport::from_submission(Uuid::new_v4().to_string(), submission, now);
            self.insert(report.clone()).await?;
            Ok(report)
        }
    }
}

// ============================================================================
// In-memory arena
// ============================================================================

#[derive(Debug, Default)]
struct Arena {
    /// Deleted reports leave a `None` behind so slot numbers stay stable.
    slots: Vec<Option<NoiseReport>>,
    index: HashMap<String, usize>,
}

impl Arena {
    fn push(&mut self, report: NoiseReport) {
        let slot = self.slots.len();
        self.index.insert(report.id.clone(), slot);
        self.slots.push(Some(report));
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut NoiseReport, StoreError> {
        let slot = *self.index.get(id).ok_or_else(|| StoreError::not_found(id))?;
        self.slots
            .get_mut(slot)
            .and_then(Option::as_mut)
            .ok_or_else(|| StoreError::not_found(id))
    }
}

/// Process-local report store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    arena: Arc<RwLock<Arena>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportStore for MemoryStore {
    async fn list(&self) -> Result<Vec<NoiseReport>, StoreError> {
        let arena = self.arena.read().await;
        Ok(arena.slots.iter().flatten().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<NoiseReport, StoreError> {
        let arena = self.arena.read().await;
        arena
            .index
            .get(id)
            .and_then(|&slot| arena.slots.get(slot))
            .and_then(Option::as_ref)
            .cloned()
            .ok_or_else(|| StoreError::not_found(id))
    }

    async fn insert(&self, report: NoiseReport) -> Result<(), StoreError> {
        let mut arena = self.arena.write().await;
        if arena.index.contains_key(&report.id) {
            return Err(StoreError::DuplicateId { id: report.id });
        }

        arena.push(report);
        Ok(())
    }

    async fn insert_batch(&self, reports: Vec<NoiseReport>) -> Result<(), StoreError> {
        let mut arena = self.arena.write().await;

        let mut incoming = HashSet::with_capacity(reports.len());
        for report in &reports {
            if arena.index.contains_key(&report.id) || !incoming.insert(report.id.as_str()) {
                return Err(StoreError::DuplicateId {
                    id: report.id.clone(),
                });
            }
        }

        for report in reports {
            arena.push(report);
        }
        Ok(())
    }

    async fn update_status(&self, id: &str, status: ReportStatus) -> Result<NoiseReport, StoreError> {
        let mut arena = self.arena.write().await;
        let report = arena.get_mut(id)?;
        report.status = status;
        Ok(report.clone())
    }

    async fn set_flagged(&self, id: &str, flagged: bool) -> Result<NoiseReport, StoreError> {
        let mut arena = self.arena.write().await;
        let report = arena.get_mut(id)?;
        report.flagged = flagged;
        Ok(report.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut arena = self.arena.write().await;
        let slot = arena.index.remove(id).ok_or_else(|| StoreError::not_found(id))?;
        if let Some(entry) = arena.slots.get_mut(slot) {
            *entry = None;
        }
        Ok(())
    }
}

// ============================================================================
// SQLite
// ============================================================================

/// SQLite-backed report store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:noisemap.db" or "sqlite::memory:")
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        // Every connection to `:memory:` is a separate database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        let store = Self { pool };
        store.initialize_schema().await?;

        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS noise_reports (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                lat REAL NOT NULL,
                lng REAL NOT NULL,
                decibel_level REAL NOT NULL,
                category TEXT NOT NULL,
                created_at TEXT NOT NULL,
                status TEXT NOT NULL,
                notes TEXT,
                address TEXT,
                reported_by TEXT,
                flagged INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_one(&self, id: &str) -> Result<NoiseReport, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, lat, lng, decibel_level, category, created_at, status,
                   notes, address, reported_by, flagged
            FROM noise_reports
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => decode_row(&row),
            None => Err(StoreError::not_found(id)),
        }
    }
}

fn decode_row(row: &SqliteRow) -> Result<NoiseReport, StoreError> {
    let id: String = row.try_get("id")?;

    let created_at: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| StoreError::Corrupt(format!("report {id}: created_at {created_at:?}: {e}")))?
        .with_timezone(&Utc);

    let status: String = row.try_get("status")?;
    let status = ReportStatus::parse(&status)
        .ok_or_else(|| StoreError::Corrupt(format!("report {id}: status {status:?}")))?;

    let category: String = row.try_get("category")?;
    let flagged: i64 = row.try_get("flagged")?;

    Ok(NoiseReport {
        location: Location {
            lat: row.try_get("lat")?,
            lng: row.try_get("lng")?,
        },
        decibel_level: row.try_get("decibel_level")?,
        category: NoiseCategory::normalize(&category),
        created_at,
        status,
        notes: row.try_get("notes")?,
        address: row.try_get("address")?,
        reported_by: row.try_get("reported_by")?,
        flagged: flagged != 0,
        id,
    })
}

async fn insert_row<'c, E>(executor: E, report: &NoiseReport) -> Result<(), StoreError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO noise_reports
            (id, lat, lng, decibel_level, category, created_at, status,
             notes, address, reported_by, flagged)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&report.id)
    .bind(report.location.lat)
    .bind(report.location.lng)
    .bind(report.decibel_level)
    .bind(report.category.as_str())
    .bind(report.created_at.to_rfc3339())
    .bind(report.status.as_str())
    .bind(&report.notes)
    .bind(&report.address)
    .bind(&report.reported_by)
    .bind(i64::from(report.flagged))
    .execute(executor)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(StoreError::DuplicateId {
                id: report.id.clone(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

impl ReportStore for SqliteStore {
    async fn list(&self) -> Result<Vec<NoiseReport>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, lat, lng, decibel_level, category, created_at, status,
                   notes, address, reported_by, flagged
            FROM noise_reports
            ORDER BY seq
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_row).collect()
    }

    async fn get(&self, id: &str) -> Result<NoiseReport, StoreError> {
        self.fetch_one(id).await
    }

    async fn insert(&self, report: NoiseReport) -> Result<(), StoreError> {
        insert_row(&self.pool, &report).await
    }

    async fn insert_batch(&self, reports: Vec<NoiseReport>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for report in &reports {
            // Dropping `tx` on error rolls the whole batch back.
            insert_row(&mut *tx, report).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn update_status(&self, id: &str, status: ReportStatus) -> Result<NoiseReport, StoreError> {
        let result = sqlx::query("UPDATE noise_reports SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(id));
        }

        self.fetch_one(id).await
    }

    async fn set_flagged(&self, id: &str, flagged: bool) -> Result<NoiseReport, StoreError> {
        let result = sqlx::query("UPDATE noise_reports SET flagged = ? WHERE id = ?")
            .bind(i64::from(flagged))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(id));
        }

        self.fetch_one(id).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM noise_reports WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(id));
        }

        Ok(())
    }
}

// ============================================================================
// Runtime selection
// ============================================================================

/// The store chosen at startup.
#[derive(Debug, Clone)]
pub enum Storage {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Storage {
    /// Open the store named by `url`: [`MEMORY_STORE_URL`] or a sqlx SQLite URL.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        if url.eq_ignore_ascii_case(MEMORY_STORE_URL) {
            Ok(Storage::Memory(MemoryStore::new()))
        } else {
            Ok(Storage::Sqlite(SqliteStore::connect(url).await?))
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Storage::Memory(_) => "memory",
            Storage::Sqlite(_) => "sqlite",
        }
    }
}

impl ReportStore for Storage {
    async fn list(&self) -> Result<Vec<NoiseReport>, StoreError> {
        match self {
            Storage::Memory(store) => store.list().await,
            Storage::Sqlite(store) => store.list().await,
        }
    }

    async fn get(&self, id: &str) -> Result<NoiseReport, StoreError> {
        match self {
            Storage::Memory(store) => store.get(id).await,
            Storage::Sqlite(store) => store.get(id).await,
        }
    }

    async fn insert(&self, report: NoiseReport) -> Result<(), StoreError> {
        match self {
            Storage::Memory(store) => store.insert(report).await,
            Storage::Sqlite(store) => store.insert(report).await,
        }
    }

    async fn insert_batch(&self, reports: Vec<NoiseReport>) -> Result<(), StoreError> {
        match self {
            Storage::Memory(store) => store.insert_batch(reports).await,
            Storage::Sqlite(store) => store.insert_batch(reports).await,
        }
    }

    async fn update_status(&self, id: &str, status: ReportStatus) -> Result<NoiseReport, StoreError> {
        match self {
            Storage::Memory(store) => store.update_status(id, status).await,
            Storage::Sqlite(store) => store.update_status(id, status).await,
        }
    }

    async fn set_flagged(&self, id: &str, flagged: bool) -> Result<NoiseReport, StoreError> {
        match self {
            Storage::Memory(store) => store.set_flagged(id, flagged).await,
            Storage::Sqlite(store) => store.set_flagged(id, flagged).await,
        }
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        match self {
            Storage::Memory(store) => store.delete(id).await,
            Storage::Sqlite(store) => store.delete(id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(decibel_level: f64, category: NoiseCategory) -> NewReport {
        NewReport {
            location: Location {
                lat: 19.1,
                lng: 72.9,
            },
            decibel_level,
            category,
            notes: Some("near the flyover".to_string()),
            address: None,
            reported_by: None,
        }
    }

    async fn exercise_crud<S: ReportStore>(store: &S) {
        let now = Utc::now();

        let first = store
            .create(submission(88.0, NoiseCategory::Traffic), now)
            .await
            .unwrap();
        let second = store
            .create(submission(72.0, NoiseCategory::Construction), now)
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.status, ReportStatus::Pending);

        let listed = store.list().await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);

        let fetched = store.get(&first.id).await.unwrap();
        assert_eq!(fetched.decibel_level, 88.0);
        assert_eq!(fetched.category, NoiseCategory::Traffic);
        assert_eq!(fetched.notes.as_deref(), Some("near the flyover"));
        assert_eq!(fetched.created_at, first.created_at);

        let updated = store
            .update_status(&first.id, ReportStatus::Resolved)
            .await
            .unwrap();
        assert_eq!(updated.status, ReportStatus::Resolved);
        assert_eq!(updated.created_at, first.created_at);

        let flagged = store.set_flagged(&second.id, true).await.unwrap();
        assert!(flagged.flagged);

        store.delete(&first.id).await.unwrap();
        assert!(matches!(
            store.get(&first.id).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete(&first.id).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.update_status(&first.id, ReportStatus::Pending).await,
            Err(StoreError::NotFound { .. })
        ));

        let remaining = store.list().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, second.id);
    }

    async fn exercise_duplicate<S: ReportStore>(store: &S) {
        let report = NoiseReport::from_submission(
            "fixed-id".to_string(),
            submission(60.0, NoiseCategory::Other),
            Utc::now(),
        );

        store.insert(report.clone()).await.unwrap();
        assert!(matches!(
            store.insert(report).await,
            Err(StoreError::DuplicateId { .. })
        ));
    }

    async fn exercise_batch<S: ReportStore>(store: &S) {
        let now = Utc::now();
        let existing = NoiseReport::from_submission(
            "existing".to_string(),
            submission(55.0, NoiseCategory::Residential),
            now,
        );
        store.insert(existing.clone()).await.unwrap();

        let fresh = |id: &str| {
            NoiseReport::from_submission(id.to_string(), submission(70.0, NoiseCategory::Traffic), now)
        };

        let result = store
            .insert_batch(vec![fresh("a"), fresh("b"), existing.clone()])
            .await;
        assert!(matches!(result, Err(StoreError::DuplicateId { .. })));

        let result = store.insert_batch(vec![fresh("c"), fresh("c")]).await;
        assert!(matches!(result, Err(StoreError::DuplicateId { .. })));

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "existing");

        store
            .insert_batch(vec![fresh("a"), fresh("b")])
            .await
            .unwrap();
        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["existing", "a", "b"]);
    }

    #[tokio::test]
    async fn test_memory_store_batch_is_all_or_nothing() {
        exercise_batch(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_sqlite_store_batch_is_all_or_nothing() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        exercise_batch(&store).await;
    }

    #[tokio::test]
    async fn test_memory_store_crud() {
        exercise_crud(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_memory_store_duplicate_id() {
        exercise_duplicate(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_memory_store_reuses_no_slots_after_delete() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let a = store.create(submission(60.0, NoiseCategory::Other), now).await.unwrap();
        store.delete(&a.id).await.unwrap();
        let b = store.create(submission(61.0, NoiseCategory::Other), now).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, b.id);
    }

    #[tokio::test]
    async fn test_sqlite_store_crud() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        exercise_crud(&store).await;
    }

    #[tokio::test]
    async fn test_sqlite_store_duplicate_id() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        exercise_duplicate(&store).await;
    }

    #[tokio::test]
    async fn test_storage_connect_selects_backend() {
        let memory = Storage::connect("memory").await.unwrap();
        assert_eq!(memory.kind(), "memory");

        let sqlite = Storage::connect("sqlite::memory:").await.unwrap();
        assert_eq!(sqlite.kind(), "sqlite");
        exercise_crud(&sqlite).await;
    }
}
