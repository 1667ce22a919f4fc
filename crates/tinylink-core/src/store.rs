use crate::error::StorageError;
use crate::link::Link;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use std::sync::Arc;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A read-only view of a link store.
#[async_trait]
pub trait ReadLinkStore: Send + Sync + 'static {
    /// Retrieves the link for a given short code.
    /// Returns `None` if the code does not exist.
    async fn get(&self, code: &ShortCode) -> Result<Option<Link>>;

    /// Returns every stored link, in no particular order.
    async fn list(&self) -> Result<Vec<Link>>;
}

/// Durable map from short code to [`Link`].
///
/// Backends hold no business logic, but each write must be atomic with respect
/// to concurrent callers:
///
/// - `create` is a single check-and-insert, never an existence check followed
///   by an insert.
/// - `increment_hit` is an atomic read-modify-write; concurrent hits on the same
///   code are never lost.
/// - A failed or cancelled write leaves no partial record visible.
#[async_trait]
pub trait LinkStore: ReadLinkStore {
    /// Inserts a new link. Returns `Err(Conflict)` if the code already exists.
    async fn create(&self, link: Link) -> Result<()>;

    /// Increments the hit counter and sets `last_access_at` and `updated_at` to `at`.
    /// Returns the updated link, or `Err(NotFound)` if the code does not exist.
    async fn increment_hit(&self, code: &ShortCode, at: Timestamp) -> Result<Link>;

    /// Removes a link. Returns `Err(NotFound)` if the code does not exist.
    async fn delete(&self, code: &ShortCode) -> Result<()>;
}

#[async_trait]
impl<S: ReadLinkStore + ?Sized> ReadLinkStore for Arc<S> {
    async fn get(&self, code: &ShortCode) -> Result<Option<Link>> {
        (**self).get(code).await
    }

    async fn list(&self) -> Result<Vec<Link>> {
        (**self).list().await
    }
}

#[async_trait]
impl<S: LinkStore + ?Sized> LinkStore for Arc<S> {
    async fn create(&self, link: Link) -> Result<()> {
        (**self).create(link).await
    }

    async fn increment_hit(&self, code: &ShortCode, at: Timestamp) -> Result<Link> {
        (**self).increment_hit(code, at).await
    }

    async fn delete(&self, code: &ShortCode) -> Result<()> {
        (**self).delete(code).await
    }
}
