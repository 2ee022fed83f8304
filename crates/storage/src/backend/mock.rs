//! In-memory object store for testing.

use super::ObjectInfoStream;
use crate::ObjectStore;
use crate::error::{ErrorKind, Result};
use crate::object::{Headed, Headers, ObjectInfo, PutAttributes};
use crate::path::{validate as validate_path, validate_key};
use async_stream::stream;
use async_trait::async_trait;
use md5::{Digest, Md5};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// A stored object: body plus whatever was attached when it was written.
#[derive(Debug, Clone, Default)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub attributes: PutAttributes,
    pub redirect: Option<String>,
}
impl StoredObject {
    fn etag(&self) -> String {
        format!("{:x}", Md5::digest(&self.body))
    }
}

/// In-memory object store for testing.
///
/// Objects live in a `HashMap` behind a [`RwLock`], so all trait methods can
/// operate on `&self`. Etags are the MD5 of the body, as S3 computes them for
/// single-part uploads. Every HEAD, put and delete is counted so tests can
/// assert exactly how many requests a sync issued.
///
/// # Examples
///
/// ```
/// use bucketsync_storage::{ObjectStore, backend::MockStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MockStore::with_objects([("index.html", b"<html></html>".to_vec())]);
/// assert_eq!(store.list(None).await?.len(), 1);
/// assert_eq!(store.heads(), 0);
/// # Ok(())
/// # }
/// ```
pub struct MockStore {
    name: String,
    objects: RwLock<HashMap<String, StoredObject>>,
    failing: RwLock<HashSet<String>>,
    heads: AtomicUsize,
    puts: AtomicUsize,
    deletes: AtomicUsize,
}

impl MockStore {
    /// Create a mock store pre-populated with objects.
    ///
    /// Panics if any key fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_objects(objects: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (key, body) in objects {
            let key = key.into();
            if validate_key(&key).is_err() {
                // The panic here is DELIBERATE. MockStore is intended to be
                // used in tests; panics are expected. There is no error result.
                panic!("MockStore::with_objects: invalid key {key}");
            }
            map.insert(key, StoredObject { body: body.into(), ..StoredObject::default() });
        }
        Self {
            name: "mock".to_string(),
            objects: RwLock::new(map),
            failing: RwLock::new(HashSet::new()),
            heads: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    /// Change the name of the mock store.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Insert an object directly, bypassing the request counters.
    pub fn with_object(mut self, key: impl Into<String>, object: StoredObject) -> Self {
        self.objects.get_mut().insert(key.into(), object);
        self
    }

    /// Insert a website-redirect object.
    pub fn with_redirect(self, key: impl Into<String>, location: impl Into<String>) -> Self {
        let object = StoredObject { redirect: Some(location.into()), ..StoredObject::default() };
        self.with_object(key, object)
    }

    /// Make every request for `key` fail with a network error.
    pub async fn fail_on(&self, key: impl Into<String>) {
        self.failing.write().await.insert(key.into());
    }

    /// Snapshot of a stored object.
    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub fn heads(&self) -> usize {
        self.heads.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Total number of mutating requests (puts and deletes).
    pub fn mutations(&self) -> usize {
        self.puts() + self.deletes()
    }

    async fn check(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        if self.failing.read().await.contains(key) {
            exn::bail!(ErrorKind::Network(format!("injected failure for {key}")));
        }
        Ok(())
    }

    fn listed(key: &str, object: &StoredObject) -> Result<ObjectInfo> {
        let path = validate_path(key)?;
        Ok(ObjectInfo::new(key, path, &object.etag(), object.body.len() as u64))
    }
}
impl Default for MockStore {
    fn default() -> Self {
        let objects: [(&str, Vec<u8>); 0] = [];
        Self::with_objects(objects)
    }
}

#[async_trait]
impl ObjectStore for MockStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> ObjectInfoStream<'a> {
        let validated_prefix: Option<PathBuf> = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            // Snapshot matching entries under the read lock, then drop it
            // before yielding to avoid holding the lock across yield points.
            let entries: Vec<Result<ObjectInfo>> = {
                let guard = self.objects.read().await;
                let mut keys: Vec<&String> = guard.keys().collect();
                keys.sort();
                keys.into_iter()
                    .filter(|key| match &validated_prefix {
                        Some(pfx) => Path::new(key.as_str()).starts_with(pfx),
                        None => true,
                    })
                    .map(|key| Self::listed(key, &guard[key]))
                    .collect()
            };
            for entry in entries {
                yield entry;
            }
        })
    }

    async fn head(&self, key: &str) -> Result<ObjectInfo<Headed>> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        self.check(key).await?;
        let guard = self.objects.read().await;
        let object = guard.get(key).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key.to_string())))?;
        let headers = Headers {
            metadata: object.attributes.metadata.clone().into_iter().collect(),
            redirect: object.redirect.clone(),
            content_encoding: object.attributes.content_encoding.clone(),
        };
        Ok(Self::listed(key, object)?.with_headers(headers))
    }

    async fn put(&self, key: &str, body: Vec<u8>, attributes: &PutAttributes) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.check(key).await?;
        let object = StoredObject { body, attributes: attributes.clone(), redirect: None };
        self.objects.write().await.insert(key.to_string(), object);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check(key).await?;
        self.objects
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key.to_string())))
    }
}
