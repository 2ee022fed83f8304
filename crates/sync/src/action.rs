//! Applying a classified resource to the store.

use crate::error::{ErrorKind, Result};
use crate::resource::Resource;
use crate::status::Status;
use bucketsync_compress::Encoding;
use bucketsync_config::Config;
use bucketsync_storage::backend::ReadOnlyStore;
use bucketsync_storage::{CONTENT_MD5_KEY, PutAttributes, StoreHandle};
use derive_more::Display;
use exn::ResultExt;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Creating,
    Updating,
    Deleting,
    Ignoring,
    #[display("Skipping deletion of")]
    SkippingDeletion,
    Identical,
}

/// One line of output per resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub verb: Verb,
    pub path: PathBuf,
    pub status: Status,
    pub reason: Option<&'static str>,
    /// Hashes and the gzip flag; only collected in verbose mode.
    pub detail: Option<String>,
}

impl Report {
    fn new(verb: Verb, resource: &Resource, status: Status) -> Self {
        Self { verb, path: resource.path().to_path_buf(), status, reason: None, detail: None }
    }

    fn because(mut self, reason: &'static str) -> Self {
        self.reason = Some(reason);
        self
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.path.display())?;
        if let Some(reason) = self.reason {
            write!(f, " ({reason})")?;
        }
        if let Some(detail) = &self.detail {
            write!(f, " [{detail}]")?;
        }
        Ok(())
    }
}

/// Turns a [`Status`] into (at most) one store mutation.
///
/// With `dry_run` set, the store is wrapped in a [`ReadOnlyStore`]:
/// everything is classified and reported as usual, nothing is written.
#[derive(Clone)]
pub struct Executor {
    store: StoreHandle,
    config: Arc<Config>,
}

impl Executor {
    pub fn new(store: StoreHandle, config: Arc<Config>) -> Self {
        let store = match config.dry_run {
            true => Arc::new(ReadOnlyStore::new(store)) as StoreHandle,
            false => store,
        };
        Self { store, config }
    }

    /// Classify (if not already done) and act.
    ///
    /// Store failures are returned as [`Transport`](ErrorKind::Transport)
    /// errors naming the resource; nothing is retried here.
    pub async fn apply(&self, resource: &mut Resource) -> Result<Report> {
        let status = resource.status().await?;
        let mut report = match status {
            Status::New => self.create(resource).await?,
            Status::Updated => self.update(resource).await?,
            Status::Deleted => self.destroy(resource).await?,
            Status::Identical => Report::new(Verb::Identical, resource, status),
            Status::Ignored | Status::AlternateEncoding => self.ignore(resource, status),
        };
        report.detail = self.detail(resource);
        tracing::info!(status = %report.status, path = %report.path.display(), "{report}");
        Ok(report)
    }

    /// Upload a local-only resource under the key its path maps to.
    pub async fn create(&self, resource: &mut Resource) -> Result<Report> {
        let key = resource.remote_key()?;
        self.upload(resource, &key, Status::New).await?;
        Ok(Report::new(Verb::Creating, resource, Status::New))
    }

    /// Overwrite the existing object, under the key it was listed with.
    pub async fn update(&self, resource: &mut Resource) -> Result<Report> {
        let key = resource.remote_key()?;
        self.upload(resource, &key, Status::Updated).await?;
        Ok(Report::new(Verb::Updating, resource, Status::Updated))
    }

    /// Remove the remote object. An object that is already gone counts as
    /// removed.
    pub async fn destroy(&self, resource: &mut Resource) -> Result<Report> {
        if !self.config.delete {
            return Ok(Report::new(Verb::SkippingDeletion, resource, Status::Deleted));
        }
        let key = resource.remote_key()?;
        match self.store.delete(&key).await {
            Ok(()) => {},
            Err(e) if e.is_not_found() => tracing::debug!(key = %key, "Object already absent"),
            Err(e) => {
                return Err(e).or_raise(|| ErrorKind::Transport {
                    path: resource.path().to_path_buf(),
                    status: Status::Deleted,
                });
            },
        }
        Ok(Report::new(Verb::Deleting, resource, Status::Deleted))
    }

    /// No mutation; only produces the report.
    ///
    /// An alternate-encoding object keeps whatever headers it was uploaded
    /// with. If those no longer say gzip, the drift is logged.
    pub fn ignore(&self, resource: &Resource, status: Status) -> Report {
        let report = Report::new(Verb::Ignoring, resource, status);
        match status {
            Status::AlternateEncoding => {
                let path = resource.path().display();
                match resource.remote().stored_encoding() {
                    None | Some(Ok(Encoding::Gzip)) => {},
                    Some(Ok(stored)) => {
                        tracing::warn!(%path, %stored, "Skipped object is not served gzip-encoded");
                    },
                    Some(Err(e)) => tracing::warn!(%path, error = ?e, "Skipped object has an unknown encoding"),
                }
                report.because("alternate encoding")
            },
            _ if resource.local().is_directory() => report.because("directory"),
            _ => report.because("redirect"),
        }
    }

    async fn upload(&self, resource: &mut Resource, key: &str, status: Status) -> Result<()> {
        let body = resource.local().body().await?;
        let attributes = self.attributes(resource).await?;
        tracing::debug!(key, size = body.len(), ?attributes, "Uploading");
        self.store
            .put(key, body, &attributes)
            .await
            .or_raise(|| ErrorKind::Transport { path: resource.path().to_path_buf(), status })
    }

    /// Everything attached to an upload besides the body.
    pub async fn attributes(&self, resource: &mut Resource) -> Result<PutAttributes> {
        let content_type = self.config.content_type_for(resource.path());
        let (cache_control, expires) =
            self.config.caching_policy_for(&content_type).map(|policy| policy.headers()).unwrap_or_default();
        let content_encoding = match resource.is_gzipped() {
            true => Encoding::Gzip.content_encoding().map(str::to_string),
            false => None,
        };
        let content_hash = resource.local_mut().content_hash().await?.to_string();
        Ok(PutAttributes {
            acl: Some(self.config.acl.clone()),
            content_type: Some(content_type),
            metadata: [(CONTENT_MD5_KEY.to_string(), content_hash)].into(),
            cache_control,
            expires,
            content_encoding,
            reduced_redundancy: self.config.reduced_redundancy,
            encryption: self.config.encryption,
        })
    }

    /// Whatever hashes classification (or the upload) already computed.
    fn detail(&self, resource: &Resource) -> Option<String> {
        if !self.config.verbose {
            return None;
        }
        let (body_hash, content_hash) = resource.local().known_hashes();
        let mut parts = Vec::new();
        if let Some(hash) = body_hash {
            parts.push(format!("local {hash}"));
        }
        if let Some(hash) = resource.remote().body_hash() {
            parts.push(format!("remote {hash}"));
        }
        if let Some(hash) = content_hash {
            parts.push(format!("content {hash}"));
        }
        if resource.is_gzipped() {
            parts.push("gzip".to_string());
        }
        match resource.remote().stored_encoding() {
            Some(Ok(stored)) => parts.push(format!("stored {stored}")),
            Some(Err(_)) => parts.push("stored unknown".to_string()),
            None => {},
        }
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}
