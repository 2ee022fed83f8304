//! Remote side of a resource: what the bucket holds at a logical path.
//!
//! The listing gives us the key and etag for free. Custom metadata and the
//! redirect marker need a HEAD request, which is issued at most once per
//! resource and only when classification actually needs it.

use crate::error::{ErrorKind, Result};
use bucketsync_compress::Encoding;
use bucketsync_storage::{Headed, ObjectInfo, ObjectStore};
use exn::ResultExt;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct RemoteObject {
    path: PathBuf,
    listed: Option<ObjectInfo>,
    /// `None` until fetched; `Some(None)` if the fetch found nothing.
    full: Option<Option<ObjectInfo<Headed>>>,
}

impl RemoteObject {
    pub fn new(path: impl Into<PathBuf>, listed: Option<ObjectInfo>) -> Self {
        Self { path: path.into(), listed, full: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The listing contained an object for this path.
    pub fn exists(&self) -> bool {
        self.listed.is_some()
    }

    /// Key recorded on the descriptor, which may differ from the logical path
    /// (`blog/` for the path `blog`).
    pub fn key(&self) -> Option<&str> {
        match &self.full {
            Some(Some(full)) => Some(&full.key),
            _ => self.listed.as_ref().map(|listed| listed.key.as_str()),
        }
    }

    /// Etag of the most complete descriptor held.
    pub fn body_hash(&self) -> Option<&str> {
        match &self.full {
            Some(Some(full)) => Some(&full.etag),
            _ => self.listed.as_ref().map(|listed| listed.etag.as_str()),
        }
    }

    pub fn is_fetched(&self) -> bool {
        self.full.is_some()
    }

    /// Upgrade to the full descriptor, issuing a HEAD request the first time
    /// only. Objects that were never listed are not fetched at all.
    pub async fn fetch_full(&mut self, store: &dyn ObjectStore) -> Result<Option<&ObjectInfo<Headed>>> {
        if self.full.is_none() {
            let fetched = match &self.listed {
                None => None,
                Some(listed) => {
                    tracing::debug!(store = store.name(), key = %listed.key, "Fetching full remote descriptor");
                    match store.head(&listed.key).await {
                        Ok(full) => Some(full),
                        // Gone since the listing; treat as carrying no metadata.
                        Err(e) if e.is_not_found() => None,
                        Err(e) => return Err(e).or_raise(|| ErrorKind::Fetch(self.path.clone())),
                    }
                },
            };
            self.full = Some(fetched);
        }
        Ok(self.full.as_ref().and_then(Option::as_ref))
    }

    /// Original-content hash recorded in the object's metadata at upload.
    pub async fn custom_hash(&mut self, store: &dyn ObjectStore) -> Result<Option<&str>> {
        Ok(self.fetch_full(store).await?.and_then(|full| full.content_md5()))
    }

    pub async fn is_redirect(&mut self, store: &dyn ObjectStore) -> Result<bool> {
        Ok(self.fetch_full(store).await?.is_some_and(|full| full.is_redirect()))
    }

    /// Encoding the object is currently served with. Never fetches: `None`
    /// unless the full descriptor is already held.
    pub fn stored_encoding(&self) -> Option<bucketsync_compress::error::Result<Encoding>> {
        match &self.full {
            Some(Some(full)) => Some(full.headers.content_encoding.as_deref().unwrap_or_default().parse()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bucketsync_storage::backend::MockStore;
    use bucketsync_storage::{CONTENT_MD5_KEY, PutAttributes};

    async fn listed(store: &MockStore, key: &str) -> ObjectInfo {
        store.list(None).await.unwrap().into_iter().find(|info| info.key == key).unwrap()
    }

    #[tokio::test]
    async fn test_full_descriptor_is_fetched_once() {
        let store = MockStore::default();
        let mut attributes = PutAttributes::default();
        attributes.metadata.insert(CONTENT_MD5_KEY.to_string(), "abc".to_string());
        store.put("a.html", b"body".to_vec(), &attributes).await.unwrap();
        let mut remote = RemoteObject::new("a.html", Some(listed(&store, "a.html").await));
        assert!(!remote.is_fetched());
        assert_eq!(remote.custom_hash(&store).await.unwrap(), Some("abc"));
        assert!(!remote.is_redirect(&store).await.unwrap());
        assert_eq!(remote.custom_hash(&store).await.unwrap(), Some("abc"));
        assert_eq!(store.heads(), 1);
    }

    #[tokio::test]
    async fn test_unlisted_object_is_never_fetched() {
        let store = MockStore::default();
        let mut remote = RemoteObject::new("a.html", None);
        assert!(!remote.exists());
        assert!(!remote.is_redirect(&store).await.unwrap());
        assert_eq!(remote.key(), None);
        assert_eq!(store.heads(), 0);
    }

    #[tokio::test]
    async fn test_vanished_object_has_no_metadata() {
        let store = MockStore::with_objects([("a.html", b"body".to_vec())]);
        let mut remote = RemoteObject::new("a.html", Some(listed(&store, "a.html").await));
        store.delete("a.html").await.unwrap();
        assert_eq!(remote.custom_hash(&store).await.unwrap(), None);
        // The listing-level facts are kept.
        assert_eq!(remote.key(), Some("a.html"));
        assert!(remote.body_hash().is_some());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_an_error() {
        let store = MockStore::with_objects([("a.html", b"body".to_vec())]);
        let mut remote = RemoteObject::new("a.html", Some(listed(&store, "a.html").await));
        store.fail_on("a.html").await;
        let err = remote.is_redirect(&store).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Fetch(_)));
        assert!(!remote.is_fetched());
    }

    #[tokio::test]
    async fn test_redirect() {
        let store = MockStore::default().with_redirect("old.html", "/new.html");
        let mut remote = RemoteObject::new("old.html", Some(listed(&store, "old.html").await));
        assert!(remote.is_redirect(&store).await.unwrap());
    }

    #[tokio::test]
    async fn test_stored_encoding_needs_fetch() {
        let store = MockStore::default();
        let gzip = PutAttributes { content_encoding: Some("gzip".to_string()), ..PutAttributes::default() };
        store.put("a.css", b"body".to_vec(), &gzip).await.unwrap();
        store.put("b.css", b"body".to_vec(), &PutAttributes::default()).await.unwrap();
        let brotli = PutAttributes { content_encoding: Some("br".to_string()), ..PutAttributes::default() };
        store.put("c.css", b"body".to_vec(), &brotli).await.unwrap();

        let mut a = RemoteObject::new("a.css", Some(listed(&store, "a.css").await));
        assert!(a.stored_encoding().is_none());
        a.fetch_full(&store).await.unwrap();
        assert_eq!(a.stored_encoding().unwrap().unwrap(), Encoding::Gzip);

        let mut b = RemoteObject::new("b.css", Some(listed(&store, "b.css").await));
        b.fetch_full(&store).await.unwrap();
        assert_eq!(b.stored_encoding().unwrap().unwrap(), Encoding::Identity);

        let mut c = RemoteObject::new("c.css", Some(listed(&store, "c.css").await));
        c.fetch_full(&store).await.unwrap();
        assert!(c.stored_encoding().unwrap().is_err());
        assert_eq!(store.heads(), 3);
    }
}
