//! Read-only object store.
//!
//! Wraps another store and prevents mutations from executing, while still
//! indicating success on return. This is what a dry run syncs against.

use async_trait::async_trait;
use std::path::Path;

use crate::backend::ObjectInfoStream;
use crate::error::Result;
use crate::object::{Headed, ObjectInfo, PutAttributes};
use crate::{ObjectStore, StoreHandle};

/// Read-only object store.
///
/// Wraps another store and silently drops all put and delete operations,
/// logging an [`info event`](tracing::Event).
#[derive(Clone)]
pub struct ReadOnlyStore {
    inner: StoreHandle,
}
impl ReadOnlyStore {
    pub fn new(inner: StoreHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ObjectStore for ReadOnlyStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> ObjectInfoStream<'a> {
        self.inner.list_stream(prefix)
    }

    async fn head(&self, key: &str) -> Result<ObjectInfo<Headed>> {
        self.inner.head(key).await
    }

    async fn put(&self, key: &str, body: Vec<u8>, _attributes: &PutAttributes) -> Result<()> {
        tracing::info!(store = self.name(), key, size = body.len(), "Read-only store; skipping put");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        tracing::info!(store = self.name(), key, "Read-only store; skipping delete");
        Ok(())
    }
}
