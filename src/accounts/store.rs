//! Credential store: persistence of account records keyed by email.
//!
//! Uniqueness of `email` is enforced by the store itself (a unique index in
//! PostgreSQL, the map key in memory), so concurrent inserts of the same email
//! resolve to exactly one `Ok` and `StoreError::Duplicate` for the rest.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgPool, Row,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::model::Account;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("an account with this email already exists")]
    Duplicate,
    #[error("account not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if is_unique_violation(&err) {
            Self::Duplicate
        } else {
            Self::Database(err)
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Insert a new account; `Duplicate` if the email is taken.
    async fn insert(&self, account: &Account) -> Result<(), StoreError>;

    /// Overwrite the mutable fields of the account with this email.
    async fn update(&self, account: &Account) -> Result<(), StoreError>;
}

/// PostgreSQL-backed store.
#[derive(Clone, Debug)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the `users` table exists.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable or the schema fails to apply.
    pub async fn connect(dsn: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Apply `sql/schema.sql`; every statement is idempotent.
    ///
    /// # Errors
    /// Returns an error if a statement fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Decode a `users` row; a column of the wrong type is an error, not a panic.
fn account_from_row(row: &PgRow) -> Result<Account, sqlx::Error> {
    Ok(Account {
        id: row.try_get::<Uuid, _>("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        confirmed_at: row.try_get::<Option<DateTime<Utc>>, _>("confirmed_at")?,
        is_enabled: row.try_get("is_enabled")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let query = r"
            SELECT id, email, password_hash, confirmed_at, is_enabled, created_at
            FROM users
            WHERE email = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.as_ref().map(account_from_row).transpose()?)
    }

    async fn insert(&self, account: &Account) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO users (id, email, password_hash, confirmed_at, is_enabled, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(account.id)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(account.confirmed_at)
            .bind(account.is_enabled)
            .bind(account.created_at)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }

    async fn update(&self, account: &Account) -> Result<(), StoreError> {
        let query = r"
            UPDATE users
            SET password_hash = $2,
                confirmed_at = $3,
                is_enabled = $4
            WHERE email = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(account.confirmed_at)
            .bind(account.is_enabled)
            .execute(&self.pool)
            .instrument(span)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// Process-local store, used by tests and single-node experiments.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    accounts: Mutex<HashMap<String, Account>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Account>>, StoreError> {
        self.accounts
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// Number of stored accounts.
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    /// # Errors
    /// Returns an error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.is_empty())
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.lock()?.get(email).cloned())
    }

    async fn insert(&self, account: &Account) -> Result<(), StoreError> {
        let mut accounts = self.lock()?;
        if accounts.contains_key(&account.email) {
            return Err(StoreError::Duplicate);
        }
        accounts.insert(account.email.clone(), account.clone());
        Ok(())
    }

    async fn update(&self, account: &Account) -> Result<(), StoreError> {
        let mut accounts = self.lock()?;
        let stored = accounts.get_mut(&account.email).ok_or(StoreError::NotFound)?;
        stored.password_hash.clone_from(&account.password_hash);
        stored.confirmed_at = account.confirmed_at;
        stored.is_enabled = account.is_enabled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryCredentialStore::new();
        let account = Account::pending("a@b.com".to_string(), "hash".to_string());
        store.insert(&account).await.unwrap();

        let found = store.find_by_email("a@b.com").await.unwrap();
        assert_eq!(found, Some(account));
        assert_eq!(store.find_by_email("A@b.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_rejects_duplicate_email() {
        let store = MemoryCredentialStore::new();
        let first = Account::pending("a@b.com".to_string(), "one".to_string());
        let second = Account::pending("a@b.com".to_string(), "two".to_string());
        store.insert(&first).await.unwrap();

        assert!(matches!(
            store.insert(&second).await,
            Err(StoreError::Duplicate)
        ));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn memory_store_update_keeps_identity() {
        let store = MemoryCredentialStore::new();
        let account = Account::pending("a@b.com".to_string(), "hash".to_string());
        store.insert(&account).await.unwrap();

        let mut changed = account.clone();
        changed.id = Uuid::new_v4();
        changed.activate(Utc::now());
        store.update(&changed).await.unwrap();

        let stored = store.find_by_email("a@b.com").await.unwrap().unwrap();
        assert_eq!(stored.id, account.id);
        assert!(stored.is_enabled);
        assert!(stored.confirmed_at.is_some());
    }

    #[tokio::test]
    async fn memory_store_update_missing_is_not_found() {
        let store = MemoryCredentialStore::new();
        let account = Account::pending("a@b.com".to_string(), "hash".to_string());
        assert!(matches!(
            store.update(&account).await,
            Err(StoreError::NotFound)
        ));
    }

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn unique_violation_maps_to_duplicate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(matches!(StoreError::from(err), StoreError::Duplicate));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(matches!(StoreError::from(err), StoreError::Database(_)));

        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Database(_)
        ));
    }

    async fn test_store() -> Option<PgCredentialStore> {
        let dsn = std::env::var("USER_MANAGER_TEST_DSN").ok()?;
        match PgCredentialStore::connect(&dsn).await {
            Ok(store) => Some(store),
            Err(err) => {
                eprintln!("Skipping postgres test: {err}");
                None
            }
        }
    }

    #[tokio::test]
    async fn postgres_store_reports_mismatched_columns() {
        let Ok(dsn) = std::env::var("USER_MANAGER_TEST_DSN") else {
            return;
        };
        // one connection, so the temporary table shadows `users` for every query
        let pool = match PgPoolOptions::new().max_connections(1).connect(&dsn).await {
            Ok(pool) => pool,
            Err(err) => {
                eprintln!("Skipping postgres test: {err}");
                return;
            }
        };
        sqlx::raw_sql(
            r"
            CREATE TEMPORARY TABLE users (
                id INTEGER,
                email TEXT,
                password_hash TEXT,
                confirmed_at TIMESTAMPTZ,
                is_enabled BOOLEAN,
                created_at TIMESTAMPTZ
            );
            INSERT INTO pg_temp.users VALUES (1, 'a@b.com', 'hash', NULL, FALSE, NOW());
            ",
        )
        .execute(&pool)
        .await
        .unwrap();

        let store = PgCredentialStore::new(pool);
        assert!(matches!(
            store.find_by_email("a@b.com").await,
            Err(StoreError::Database(sqlx::Error::ColumnDecode { .. }))
        ));
    }

    #[tokio::test]
    async fn postgres_store_enforces_unique_email() {
        let Some(store) = test_store().await else {
            return;
        };
        let email = format!("{}@example.com", Uuid::new_v4().simple());
        let first = Account::pending(email.clone(), "one".to_string());
        let second = Account::pending(email.clone(), "two".to_string());

        store.insert(&first).await.unwrap();
        assert!(matches!(
            store.insert(&second).await,
            Err(StoreError::Duplicate)
        ));

        let mut activated = first.clone();
        activated.activate(Utc::now());
        store.update(&activated).await.unwrap();
        let stored = store.find_by_email(&email).await.unwrap().unwrap();
        assert_eq!(stored.id, first.id);
        assert!(stored.is_enabled);
    }
}
