//! Object store trait and implementations.
//!
//! This module defines the [`ObjectStore`] trait, the four operations the
//! reconciler needs from a bucket: list, head, put and delete. Everything
//! else about the remote (transport, credentials, pagination) stays behind
//! the implementation.

#[cfg(feature = "mock")]
mod mock;
mod ro;
#[cfg(feature = "s3")]
mod s3;

#[cfg(feature = "mock")]
pub use self::mock::{MockStore, StoredObject};
pub use self::ro::ReadOnlyStore;
#[cfg(feature = "s3")]
pub use self::s3::S3Store;
use crate::error::Result;
use crate::object::{Headed, ObjectInfo, PutAttributes};
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;

pub type ObjectInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<ObjectInfo>> + Send + 'a>>;

/// Unified interface for remote object stores.
///
/// Keys passed to and returned from a store are relative to whatever prefix
/// the store was configured with. Implementations do not retry: retries
/// belong to the transport (the S3 backend configures the SDK's retry
/// policy), never to callers.
///
/// # Examples
///
/// ```
/// use bucketsync_storage::{ObjectStore, error::Result};
///
/// async fn etag_of(store: &dyn ObjectStore, key: &str) -> Result<Option<String>> {
///     match store.head(key).await {
///         Ok(info) => Ok(Some(info.etag.clone())),
///         Err(e) if e.is_not_found() => Ok(None),
///         Err(e) => Err(e),
///     }
/// }
/// ```
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the configured store (used for logging only).
    fn name(&self) -> &str;

    /// List all objects matching an optional prefix.
    ///
    /// Default implementation of this method is to collect all the results
    /// from [`list_stream()`](Self::list_stream) into a [`Vec`] before
    /// returning.
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<ObjectInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Stream listing-level descriptors (key + etag) for every object,
    /// fetching further pages as the stream is polled.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// # use bucketsync_storage::{ObjectStore, error::Result};
    /// # async fn example(store: &dyn ObjectStore) -> Result<()> {
    /// let mut stream = store.list_stream(None);
    /// while let Some(info) = stream.try_next().await? {
    ///     println!("{} ({})", info.key, info.etag);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> ObjectInfoStream<'a>;

    /// Fetch the full descriptor of one object.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if no object
    /// exists at `key`.
    async fn head(&self, key: &str) -> Result<ObjectInfo<Headed>>;

    /// Create or replace the object at `key`.
    ///
    /// ```no_run
    /// use bucketsync_storage::{ObjectStore, PutAttributes, error::Result};
    /// # async fn example(store: &dyn ObjectStore) -> Result<()> {
    /// let attributes = PutAttributes {
    ///     content_type: Some("text/html".to_string()),
    ///     ..PutAttributes::default()
    /// };
    /// store.put("index.html", b"<html></html>".to_vec(), &attributes).await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn put(&self, key: &str, body: Vec<u8>, attributes: &PutAttributes) -> Result<()>;

    /// Delete the object at `key`.
    async fn delete(&self, key: &str) -> Result<()>;
}
