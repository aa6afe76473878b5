/// Refresh Token Store
///
/// Opaque refresh token generation plus the keyed store that persists one
/// live record per user. Refresh tokens are:
/// - Cryptographically random 64-character strings
/// - Digested with SHA-256 by the session layer before storage (the store
///   itself persists whatever opaque value it is handed)
/// - Single-use: rotated through an atomic compare-and-swap on refresh
///
/// The store is keyed by user id: a new login or rotation supersedes the
/// prior record for that user, never accumulating a second live row.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::AppError;

/// Generate a new cryptographically secure refresh token
///
/// Creates a 64-character random alphanumeric token. The plaintext is what
/// the client stores; the server persists only a digest.
pub fn generate_refresh_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// Digest a refresh token with SHA-256
///
/// Never store plaintext tokens in the database.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// One persisted refresh-token row
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: i64,
    pub refresh_token: String,
    /// Records the issuance instant. Server-side expiry of refresh tokens
    /// is deliberately not enforced by the store; access-token TTL is the
    /// temporal control.
    pub expiration_date: DateTime<Utc>,
}

/// Persistence contract for refresh-token records
///
/// At most one live record per `user_id`. `create` and `update` are
/// idempotent per user: calling either twice leaves exactly one record.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Persist a record for the user, superseding any prior one
    async fn create(&self, user_id: i64, value: &str) -> Result<RefreshTokenRecord, AppError>;

    /// Exact lookup by user id
    async fn find_by_user(&self, user_id: i64) -> Result<Option<RefreshTokenRecord>, AppError>;

    /// Unconditionally replace the stored value for the user.
    /// Returns the affected-row count; 0 means the user had no active session.
    async fn update(&self, user_id: i64, new_value: &str) -> Result<u64, AppError>;

    /// Replace the stored value only if it still equals `expected`.
    /// A single atomic write: of two concurrent rotations presenting the
    /// same expected value, exactly one observes 1 affected row.
    async fn rotate(
        &self,
        user_id: i64,
        expected: &str,
        new_value: &str,
    ) -> Result<u64, AppError>;

    /// Remove a record by its id (explicit logout/revocation)
    async fn delete(&self, id: Uuid) -> Result<u64, AppError>;
}

/// Postgres-backed store over the `users_tokens` table
#[derive(Clone)]
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn create(&self, user_id: i64, value: &str) -> Result<RefreshTokenRecord, AppError> {
        let row = sqlx::query_as::<_, (Uuid, i64, String, DateTime<Utc>)>(
            r#"
            INSERT INTO users_tokens (id, user_id, refresh_token, expiration_date)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
                SET refresh_token = EXCLUDED.refresh_token,
                    expiration_date = EXCLUDED.expiration_date
            RETURNING id, user_id, refresh_token, expiration_date
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(value)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(RefreshTokenRecord {
            id: row.0,
            user_id: row.1,
            refresh_token: row.2,
            expiration_date: row.3,
        })
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Option<RefreshTokenRecord>, AppError> {
        let row = sqlx::query_as::<_, (Uuid, i64, String, DateTime<Utc>)>(
            r#"
            SELECT id, user_id, refresh_token, expiration_date
            FROM users_tokens
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| RefreshTokenRecord {
            id: r.0,
            user_id: r.1,
            refresh_token: r.2,
            expiration_date: r.3,
        }))
    }

    async fn update(&self, user_id: i64, new_value: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users_tokens
            SET refresh_token = $1
            WHERE user_id = $2
            "#,
        )
        .bind(new_value)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn rotate(
        &self,
        user_id: i64,
        expected: &str,
        new_value: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users_tokens
            SET refresh_token = $1
            WHERE user_id = $2 AND refresh_token = $3
            "#,
        )
        .bind(new_value)
        .bind(user_id)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM users_tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// In-memory store keyed by user id
///
/// Backs the integration suite; same contract as the Postgres store with a
/// single mutex standing in for the database's atomic update.
#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    records: Mutex<HashMap<i64, RefreshTokenRecord>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn create(&self, user_id: i64, value: &str) -> Result<RefreshTokenRecord, AppError> {
        let record = RefreshTokenRecord {
            id: Uuid::new_v4(),
            user_id,
            refresh_token: value.to_string(),
            expiration_date: Utc::now(),
        };

        let mut records = self.records.lock().await;
        records.insert(user_id, record.clone());
        Ok(record)
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Option<RefreshTokenRecord>, AppError> {
        let records = self.records.lock().await;
        Ok(records.get(&user_id).cloned())
    }

    async fn update(&self, user_id: i64, new_value: &str) -> Result<u64, AppError> {
        let mut records = self.records.lock().await;
        match records.get_mut(&user_id) {
            Some(record) => {
                record.refresh_token = new_value.to_string();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn rotate(
        &self,
        user_id: i64,
        expected: &str,
        new_value: &str,
    ) -> Result<u64, AppError> {
        let mut records = self.records.lock().await;
        match records.get_mut(&user_id) {
            Some(record) if record.refresh_token == expected => {
                record.refresh_token = new_value.to_string();
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<u64, AppError> {
        let mut records = self.records.lock().await;
        let user_id = records
            .values()
            .find(|record| record.id == id)
            .map(|record| record.user_id);

        match user_id {
            Some(user_id) => {
                records.remove(&user_id);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_refresh_token() {
        let token = generate_refresh_token();

        // Token should be 64 alphanumeric characters
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_alphanumeric()));
    }

    #[test]
    fn test_token_hashing() {
        let token = generate_refresh_token();
        let hash1 = hash_token(&token);
        let hash2 = hash_token(&token);

        // Same token should produce same hash
        assert_eq!(hash1, hash2);
        // Hash should not equal plaintext
        assert_ne!(token, hash1);
        // Hash should be 64 chars (SHA-256 hex)
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_tokens_different_hashes() {
        let token1 = generate_refresh_token();
        let token2 = generate_refresh_token();

        assert_ne!(hash_token(&token1), hash_token(&token2));
    }

    #[tokio::test]
    async fn test_create_then_find_returns_stored_value() {
        let store = InMemoryRefreshTokenStore::new();

        store.create(42, "token-value").await.unwrap();

        let record = store.find_by_user(42).await.unwrap().expect("record missing");
        assert_eq!(record.user_id, 42);
        assert_eq!(record.refresh_token, "token-value");
    }

    #[tokio::test]
    async fn test_create_twice_leaves_single_record() {
        let store = InMemoryRefreshTokenStore::new();

        store.create(42, "first").await.unwrap();
        store.create(42, "second").await.unwrap();

        let record = store.find_by_user(42).await.unwrap().expect("record missing");
        assert_eq!(record.refresh_token, "second");
    }

    #[tokio::test]
    async fn test_update_replaces_value() {
        let store = InMemoryRefreshTokenStore::new();

        store.create(42, "first").await.unwrap();
        let affected = store.update(42, "second").await.unwrap();
        assert_eq!(affected, 1);

        let record = store.find_by_user(42).await.unwrap().expect("record missing");
        assert_eq!(record.refresh_token, "second");
    }

    #[tokio::test]
    async fn test_update_without_session_affects_nothing() {
        let store = InMemoryRefreshTokenStore::new();
        assert_eq!(store.update(42, "value").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rotate_requires_expected_value() {
        let store = InMemoryRefreshTokenStore::new();
        store.create(42, "current").await.unwrap();

        assert_eq!(store.rotate(42, "stale", "next").await.unwrap(), 0);
        assert_eq!(store.rotate(42, "current", "next").await.unwrap(), 1);

        let record = store.find_by_user(42).await.unwrap().expect("record missing");
        assert_eq!(record.refresh_token, "next");
    }

    #[tokio::test]
    async fn test_delete_by_record_id() {
        let store = InMemoryRefreshTokenStore::new();
        let record = store.create(42, "value").await.unwrap();

        assert_eq!(store.delete(record.id).await.unwrap(), 1);
        assert!(store.find_by_user(42).await.unwrap().is_none());
        assert_eq!(store.delete(record.id).await.unwrap(), 0);
    }
}
