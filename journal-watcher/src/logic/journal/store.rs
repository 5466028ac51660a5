//! Journal store access
//!
//! Read-only view of the journals table. Rows are append-only and the
//! `id` column increases in insertion order, which is what the watcher
//! uses as its cursor.

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::entry::JournalEntry;

const ENTRY_COLUMNS: &str = "id, anciennete_jours, montant, heure, nouveau_beneficiaire, \
    solde_avant, nb_virements_1h, changement_mdp, minutes_depuis_chg_mdp, localisation, \
    nb_virements_vers_benef, action, utilisateur, created_at";

#[async_trait]
pub trait JournalStore: Send + Sync {
    /// Most recently inserted entry, if any
    async fn latest(&self) -> Result<Option<JournalEntry>, StoreError>;

    /// Entries with `id > cursor`, oldest first, at most `limit`
    async fn since(&self, cursor: i64, limit: i64) -> Result<Vec<JournalEntry>, StoreError>;
}

/// PostgreSQL journals table
pub struct PgJournalStore {
    pool: PgPool,
    latest_sql: String,
    since_sql: String,
}

impl PgJournalStore {
    /// Connect eagerly; an unreachable store is a startup failure
    pub async fn connect(database_url: &str, table: &str) -> Result<Self, StoreError> {
        check_table_name(table)?;

        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Self::new(pool, table)
    }

    pub fn new(pool: PgPool, table: &str) -> Result<Self, StoreError> {
        check_table_name(table)?;

        Ok(Self {
            pool,
            latest_sql: format!("SELECT {} FROM {} ORDER BY id DESC LIMIT 1", ENTRY_COLUMNS, table),
            since_sql: format!(
                "SELECT {} FROM {} WHERE id > $1 ORDER BY id ASC LIMIT $2",
                ENTRY_COLUMNS, table
            ),
        })
    }
}

#[async_trait]
impl JournalStore for PgJournalStore {
    async fn latest(&self) -> Result<Option<JournalEntry>, StoreError> {
        sqlx::query_as::<_, JournalEntry>(&self.latest_sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    async fn since(&self, cursor: i64, limit: i64) -> Result<Vec<JournalEntry>, StoreError> {
        sqlx::query_as::<_, JournalEntry>(&self.since_sql)
            .bind(cursor)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

/// Table names are spliced into SQL, so only plain identifiers pass
fn check_table_name(table: &str) -> Result<(), StoreError> {
    let mut chars = table.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidTable(table.to_string()))
    }
}

/// Journal store errors
#[derive(Debug, Clone)]
pub enum StoreError {
    Database(String),
    InvalidTable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database(e) => write!(f, "Journal store error: {}", e),
            Self::InvalidTable(t) => write!(f, "Invalid journal table name: {:?}", t),
        }
    }
}

impl std::error::Error for StoreError {}
