pub mod models;
pub mod schema;

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use models::{HealthRecord, NewHealthRecord};

/// Structured error type for all storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A Diesel ORM error (query failure, constraint violation, etc.)
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Failed to acquire or build a connection from the pool.
    #[error("pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    /// A `spawn_blocking` task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A database migration failed to apply.
    #[error("migration error: {0}")]
    Migration(String),
}

/// Validated create input, owned so it can move into the blocking closure.
/// `submitted_by_user_id` is the authenticated caller, never client-supplied.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub child_name: String,
    pub age: i32,
    pub gender: String,
    pub weight: f64,
    pub health_status: String,
    pub anganwadi_kendra: String,
    pub school_name: String,
    pub symptoms: String,
    pub submitted_by_user_id: String,
}

#[derive(Clone)]
pub struct Store {
    pool: Pool<ConnectionManager<SqliteConnection>>,
}

impl Store {
    pub async fn connect_sqlite(path: &str) -> Result<Self, StorageError> {
        let url = path.to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(url);
        let pool = Pool::builder().max_size(8).build(manager)?;

        // Run pending Diesel migrations on startup (auto-init empty DBs)
        {
            let pool_clone = pool.clone();
            tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
                const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
                let mut conn = pool_clone.get()?;
                configure_sqlite_conn(&mut conn)?;
                conn.run_pending_migrations(MIGRATIONS)
                    .map_err(|e| StorageError::Migration(e.to_string()))?;
                Ok(())
            })
            .await??;
        }

        Ok(Store { pool })
    }

    /// Insert one screening row; `id` and `created_at` are store-assigned.
    pub async fn insert_record(&self, rec: NewRecord) -> Result<HealthRecord, StorageError> {
        use schema::child_health_records;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<HealthRecord, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let new_row = NewHealthRecord {
                child_name: &rec.child_name,
                age: rec.age,
                gender: &rec.gender,
                weight: rec.weight,
                health_status: &rec.health_status,
                anganwadi_kendra: &rec.anganwadi_kendra,
                school_name: &rec.school_name,
                symptoms: &rec.symptoms,
                submitted_by_user_id: &rec.submitted_by_user_id,
            };
            Ok(diesel::insert_into(child_health_records::table)
                .values(&new_row)
                .get_result::<HealthRecord>(&mut conn)?)
        })
        .await?
    }

    /// All rows for one submitter. No ordering is applied; presentation order
    /// is the caller's concern.
    pub async fn list_by_submitter(
        &self,
        submitter: &str,
    ) -> Result<Vec<HealthRecord>, StorageError> {
        use schema::child_health_records::dsl as r;
        let pool = self.pool.clone();
        let submitter_owned = submitter.to_string();
        tokio::task::spawn_blocking(move || -> Result<Vec<HealthRecord>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            Ok(r::child_health_records
                .filter(r::submitted_by_user_id.eq(&submitter_owned))
                .load::<HealthRecord>(&mut conn)?)
        })
        .await?
    }

    pub async fn get_record(&self, record_id: i32) -> Result<Option<HealthRecord>, StorageError> {
        use schema::child_health_records::dsl as r;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Option<HealthRecord>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            Ok(r::child_health_records
                .filter(r::id.eq(record_id))
                .first::<HealthRecord>(&mut conn)
                .optional()?)
        })
        .await?
    }

    /// Set `health_status` on one row, touching nothing else. Returns `None`
    /// when no row matches, so the service can report not-found explicitly.
    pub async fn update_status(
        &self,
        record_id: i32,
        status: &str,
    ) -> Result<Option<HealthRecord>, StorageError> {
        use schema::child_health_records::dsl as r;
        let pool = self.pool.clone();
        let status_owned = status.to_string();
        tokio::task::spawn_blocking(move || -> Result<Option<HealthRecord>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            Ok(
                diesel::update(r::child_health_records.filter(r::id.eq(record_id)))
                    .set(r::health_status.eq(&status_owned))
                    .get_result::<HealthRecord>(&mut conn)
                    .optional()?,
            )
        })
        .await?
    }
}

fn configure_sqlite_conn(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    // Enable WAL for better read/write concurrency and set a busy timeout
    // Ignore the result rows; Diesel's execute is fine for PRAGMAs
    diesel::sql_query("PRAGMA journal_mode=WAL;").execute(conn)?;
    diesel::sql_query("PRAGMA synchronous=NORMAL;").execute(conn)?;
    diesel::sql_query("PRAGMA busy_timeout=5000;").execute(conn)?;
    Ok(())
}
