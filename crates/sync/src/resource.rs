//! One logical path, seen from both sides.

use crate::error::{ErrorKind, Result};
use crate::local::LocalFile;
use crate::remote::RemoteObject;
use crate::status::{Facts, Status, classify};
use bucketsync_config::Config;
use bucketsync_storage::{ObjectInfo, StoreHandle, key_for};
use exn::ResultExt;
use std::fmt;
use std::path::{Path, PathBuf};

/// The unit of reconciliation.
///
/// A resource is owned by exactly one worker at a time; its memoized hashes,
/// remote descriptor and status are never shared.
pub struct Resource {
    path: PathBuf,
    local: LocalFile,
    remote: RemoteObject,
    /// The store classification reads from. Never wrapped read-only: a dry
    /// run still needs real HEAD responses.
    store: StoreHandle,
    status: Option<Status>,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("path", &self.path)
            .field("local", &self.local)
            .field("remote", &self.remote)
            .field("store", &self.store.name())
            .field("status", &self.status)
            .finish()
    }
}

impl Resource {
    /// Probe the build tree for `path` and pair it with the listing entry,
    /// if the listing had one.
    pub async fn new(
        path: impl Into<PathBuf>,
        listed: Option<ObjectInfo>,
        store: StoreHandle,
        config: &Config,
    ) -> Result<Self> {
        let path = path.into();
        let local = LocalFile::probe(&config.build_dir, &path, config.prefer_gzip).await?;
        Ok(Self::from_parts(local, RemoteObject::new(&path, listed), store))
    }

    pub fn from_parts(local: LocalFile, remote: RemoteObject, store: StoreHandle) -> Self {
        Self { path: local.path().to_path_buf(), local, remote, store, status: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn local(&self) -> &LocalFile {
        &self.local
    }

    pub fn local_mut(&mut self) -> &mut LocalFile {
        &mut self.local
    }

    pub fn remote(&self) -> &RemoteObject {
        &self.remote
    }

    pub fn is_gzipped(&self) -> bool {
        self.local.is_gzipped()
    }

    /// Gather the facts [`classify`] will read, and no others.
    ///
    /// Local hashes are computed only when both sides exist. The remote HEAD
    /// is issued only for a gzipped body whose bytes differ, or to check a
    /// remote-only object for a redirect.
    pub async fn facts(&mut self) -> Result<Facts> {
        let mut facts = Facts {
            local_exists: self.local.exists(),
            remote_exists: self.remote.exists(),
            is_directory: self.local.is_directory(),
            gzipped: self.local.is_gzipped(),
            ..Facts::default()
        };
        if facts.is_directory {
            return Ok(facts);
        }
        match (facts.local_exists, facts.remote_exists) {
            (true, true) => {
                let remote_hash = self.remote.body_hash().unwrap_or_default();
                facts.body_hash_match = self.local.body_hash().await? == remote_hash;
                if !facts.body_hash_match && facts.gzipped {
                    let content_hash = self.local.content_hash().await?;
                    let custom_hash = self.remote.custom_hash(self.store.as_ref()).await?;
                    facts.content_hash_match = custom_hash == Some(content_hash);
                }
            },
            (false, true) => facts.is_redirect = self.remote.is_redirect(self.store.as_ref()).await?,
            _ => {},
        }
        Ok(facts)
    }

    /// Classify this resource. Computed once; later calls return the
    /// memoized status without touching disk or network.
    #[tracing::instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub async fn status(&mut self) -> Result<Status> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        let facts = self.facts().await?;
        let status = classify(&facts);
        tracing::debug!(?facts, %status, "Classified resource");
        self.status = Some(status);
        Ok(status)
    }

    /// Status, if already classified.
    pub fn cached_status(&self) -> Option<Status> {
        self.status
    }

    /// Key of the remote object: the one recorded on its descriptor, or the
    /// key the logical path maps to if there is none.
    pub fn remote_key(&self) -> Result<String> {
        match self.remote.key() {
            Some(key) => Ok(key.to_string()),
            None => key_for(&self.path).or_raise(|| ErrorKind::InvalidPath(self.path.clone())),
        }
    }
}
