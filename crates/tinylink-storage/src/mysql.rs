use async_trait::async_trait;
use jiff::Timestamp;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tinylink_core::store::{LinkStore, ReadLinkStore, Result};
use tinylink_core::{Link, ShortCode, StorageError};
use tracing::debug;

const LINKS_DDL: &str = include_str!("../ddl/mysql/links.sql");

const SELECT_COLUMNS: &str =
    "SELECT code, long_url, created_at, updated_at, hit_count, last_access_at FROM links";

/// MySQL implementation of the link store contract.
///
/// Uniqueness comes from the `uk_links_code` index, so `create` is a plain
/// `INSERT` and duplicate codes surface as unique violations. Hits are counted
/// with `hit_count = hit_count + 1` in the database, never in Rust. Deletes are
/// hard deletes.
///
/// Timestamps are stored as microseconds since the Unix epoch.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `links` table if it does not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(LINKS_DDL)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        debug!("links table is up to date");
        Ok(())
    }
}

fn parse_timestamp(column: &str, micros: i64) -> Result<Timestamp> {
    Timestamp::from_microsecond(micros).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{micros}': {e}"))
    })
}

fn row_to_link(row: &MySqlRow) -> Result<Link> {
    let code: String = row.try_get("code").map_err(map_sqlx_error)?;
    let long_url: String = row.try_get("long_url").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let updated_at: i64 = row.try_get("updated_at").map_err(map_sqlx_error)?;
    let hit_count: u64 = row.try_get("hit_count").map_err(map_sqlx_error)?;
    let last_access_at: Option<i64> = row.try_get("last_access_at").map_err(map_sqlx_error)?;

    Ok(Link {
        code: ShortCode::new(code).map_err(|e| StorageError::InvalidData(e.to_string()))?,
        long_url,
        created_at: parse_timestamp("created_at", created_at)?,
        updated_at: parse_timestamp("updated_at", updated_at)?,
        hit_count,
        last_access_at: last_access_at
            .map(|micros| parse_timestamp("last_access_at", micros))
            .transpose()?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl ReadLinkStore for MySqlStore {
    async fn get(&self, code: &ShortCode) -> Result<Option<Link>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE code = ? LIMIT 1"))
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_link).transpose()
    }

    async fn list(&self) -> Result<Vec<Link>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_link).collect()
    }
}

#[async_trait]
impl LinkStore for MySqlStore {
    async fn create(&self, link: Link) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO links (code, long_url, created_at, updated_at, hit_count, last_access_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(link.code.as_str())
        .bind(&link.long_url)
        .bind(link.created_at.as_microsecond())
        .bind(link.updated_at.as_microsecond())
        .bind(link.hit_count)
        .bind(link.last_access_at.map(|ts| ts.as_microsecond()))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(link.code.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn increment_hit(&self, code: &ShortCode, at: Timestamp) -> Result<Link> {
        let at = at.as_microsecond();
        // The UPDATE row lock is held until commit, so the re-read sees exactly
        // this increment. Dropping the transaction early rolls it back.
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            r#"
            UPDATE links
            SET hit_count = hit_count + 1,
                last_access_at = ?,
                updated_at = ?
            WHERE code = ?
            "#,
        )
        .bind(at)
        .bind(at)
        .bind(code.as_str())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(code.to_string()));
        }

        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE code = ? LIMIT 1"))
            .bind(code.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        let link = row_to_link(&row)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(link)
    }

    async fn delete(&self, code: &ShortCode) -> Result<()> {
        let result = sqlx::query("DELETE FROM links WHERE code = ?")
            .bind(code.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(code.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_are_classified() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            StorageError::Timeout(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            StorageError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            StorageError::InvalidData(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::Protocol("bad packet".into())),
            StorageError::Query(_)
        ));
    }

    #[test]
    fn rejects_out_of_range_timestamps() {
        assert!(parse_timestamp("created_at", i64::MAX).is_err());
        assert_eq!(
            parse_timestamp("created_at", 1_700_000_000_000_000).unwrap(),
            Timestamp::from_second(1_700_000_000).unwrap()
        );
    }

    #[test]
    fn ddl_declares_unique_code() {
        assert!(LINKS_DDL.contains("UNIQUE KEY uk_links_code (code)"));
    }
}
