//! S3-compatible object store.
//!
//! This module provides an [`ObjectStore`] implementation for S3-compatible
//! services including AWS S3, Backblaze B2, Tigris (Fly.io), MinIO and
//! others.
//!
//! # Credentials
//!
//! Credentials are provided explicitly via the configuration file: a
//! `key_id` and `key_secret` per bucket.

use crate::{
    ObjectStore,
    backend::ObjectInfoStream,
    error::{ErrorKind, Result},
    object::{Headed, Headers, ObjectInfo, PutAttributes, normalize_etag},
    validate_key, validate_path,
};
use async_stream::stream;
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    config::http::HttpResponse,
    error::{DisplayErrorContext, SdkError},
    primitives::{ByteStream, DateTime, DateTimeFormat},
    types::{ObjectCannedAcl, ServerSideEncryption, StorageClass},
};
use exn::{OptionExt, ResultExt};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Generous default for concurrent S3 requests.
const DEFAULT_CONCURRENT_REQUESTS: usize = 100;

/// S3-compatible object store.
///
/// Keys are relative to the configured prefix (if any).
///
/// # Examples
///
/// ```no_run
/// use bucketsync_storage::backend::S3Store;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = S3Store::new(
///     "website",
///     "www.example.com",
///     Some("site/".to_string()),
///     "us-east-1",
///     None::<String>,
///     "access_key_id",
///     "secret_access_key",
/// ).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct S3Store {
    name: String,
    client: Client,
    bucket: String,
    prefix: Option<String>,
    /// Rate limiter for concurrent S3 requests.
    rate_limiter: Arc<Semaphore>,
}

impl S3Store {
    /// Create a new S3 object store.
    ///
    /// # Arguments
    /// * `name` - A name for this store (used in logging)
    /// * `bucket` - S3 bucket name
    /// * `prefix` - Optional key prefix (acts as virtual directory)
    /// * `region` - AWS region or provider-specific region
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - AWS/provider access key ID
    /// * `key_secret` - AWS/provider secret access key
    pub async fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        prefix: Option<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self> {
        let prefix = prefix
            .map(validate_path)
            .transpose()?
            .map(|p| p.to_str().map(|s| s.to_string()).ok_or_raise(|| ErrorKind::InvalidPath(p)))
            .transpose()?;
        let credentials = Credentials::new(key_id, key_secret, None, None, "bucketsync-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.into()))
            // Exponential backoff (1 initial + 3 retries). This is the only
            // layer that retries; the executor never does.
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            // Path-style addressing for S3-compatible services (MinIO etc.)
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        Ok(Self {
            name: name.into(),
            client: Client::from_conf(config_builder.build()),
            bucket: bucket.into(),
            prefix,
            rate_limiter: Arc::new(Semaphore::new(DEFAULT_CONCURRENT_REQUESTS)),
        })
    }

    /// Construct the full S3 key from a store-relative key.
    fn full_key(&self, key: &str) -> Result<String> {
        let key = validate_key(key)?;
        Ok(join_prefix(self.prefix.as_deref(), key))
    }

    /// Acquire a rate limiter permit before making an S3 API call.
    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit> {
        self.rate_limiter
            .clone()
            .acquire_owned()
            .await
            .or_raise(|| ErrorKind::BackendError("request limiter closed".to_string()))
    }

    /// Classify an SDK failure by HTTP status. HEAD responses have no body,
    /// so the status code is the only reliable signal.
    fn map_sdk_error<E>(err: SdkError<E, HttpResponse>, key: &str) -> ErrorKind
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match err.raw_response().map(|response| response.status().as_u16()) {
            Some(404) => ErrorKind::NotFound(key.to_string()),
            Some(401 | 403) => ErrorKind::PermissionDenied(key.to_string()),
            Some(status) if status >= 500 => ErrorKind::Network(format!("{}", DisplayErrorContext(&err))),
            Some(_) => ErrorKind::BackendError(format!("{}", DisplayErrorContext(&err))),
            // No response at all: timeouts, DNS, TLS, connection resets.
            None => ErrorKind::Network(format!("{}", DisplayErrorContext(&err))),
        }
    }
}

fn join_prefix(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), key),
        None => key.to_string(),
    }
}

fn strip_prefix<'k>(prefix: Option<&str>, key: &'k str) -> &'k str {
    match prefix {
        Some(prefix) => {
            let prefix_normalized = prefix.trim_end_matches('/');
            key.strip_prefix(prefix_normalized).and_then(|s| s.strip_prefix('/')).unwrap_or(key)
        },
        None => key,
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> ObjectInfoStream<'a> {
        let list_prefix = match prefix.map(crate::key_for).transpose() {
            Ok(Some(key)) => Some(join_prefix(self.prefix.as_deref(), &key)),
            Ok(None) => self.prefix.as_deref().map(|p| format!("{}/", p.trim_end_matches('/'))),
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            let mut pages = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_prefix(list_prefix)
                .into_paginator()
                .send();
            'pages: loop {
                let page = {
                    let _permit = match self.acquire_permit().await {
                        Ok(permit) => permit,
                        Err(e) => { yield Err(e); break 'pages; },
                    };
                    pages.next().await
                };
                let page = match page {
                    Some(Ok(page)) => page,
                    Some(Err(err)) => {
                        yield Err(exn::Exn::from(Self::map_sdk_error(err, &self.bucket)));
                        break 'pages;
                    },
                    None => break 'pages,
                };
                for object in page.contents() {
                    let Some(full_key) = object.key() else { continue };
                    let key = strip_prefix(self.prefix.as_deref(), full_key);
                    // The prefix's own folder marker (or any key that cannot
                    // be a path) has no logical counterpart.
                    let Ok(path) = validate_path(key) else {
                        tracing::debug!(store = self.name(), key = full_key, "Skipping unaddressable key");
                        continue;
                    };
                    let size = object.size().and_then(|s| u64::try_from(s).ok()).unwrap_or(0);
                    yield Ok(ObjectInfo::new(key, path, object.e_tag().unwrap_or_default(), size));
                }
            }
        })
    }

    async fn head(&self, key: &str) -> Result<ObjectInfo<Headed>> {
        let full_key = self.full_key(key)?;
        let path = validate_path(key)?;
        let _permit = self.acquire_permit().await?;
        tracing::debug!(store = self.name(), key = %full_key, "HEAD object");
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|err| Self::map_sdk_error(err, key))?;
        let size = output.content_length().and_then(|s| u64::try_from(s).ok()).unwrap_or(0);
        let headers = Headers {
            metadata: output.metadata().cloned().unwrap_or_default(),
            redirect: output.website_redirect_location().map(str::to_string),
            content_encoding: output.content_encoding().map(str::to_string),
        };
        Ok(ObjectInfo::new(key, path, output.e_tag().unwrap_or_default(), size).with_headers(headers))
    }

    async fn put(&self, key: &str, body: Vec<u8>, attributes: &PutAttributes) -> Result<()> {
        let full_key = self.full_key(key)?;
        let size = body.len();
        let mut request =
            self.client.put_object().bucket(&self.bucket).key(&full_key).body(ByteStream::from(body));
        if let Some(acl) = &attributes.acl {
            request = request.acl(ObjectCannedAcl::from(acl.as_str()));
        }
        if let Some(content_type) = &attributes.content_type {
            request = request.content_type(content_type);
        }
        for (name, value) in &attributes.metadata {
            request = request.metadata(name, value);
        }
        if let Some(cache_control) = &attributes.cache_control {
            request = request.cache_control(cache_control);
        }
        if let Some(expires) = &attributes.expires {
            let expires = DateTime::from_str(expires, DateTimeFormat::HttpDate)
                .or_raise(|| ErrorKind::BackendError(format!("invalid expires date: {expires}")))?;
            request = request.expires(expires);
        }
        if let Some(content_encoding) = &attributes.content_encoding {
            request = request.content_encoding(content_encoding);
        }
        if attributes.reduced_redundancy {
            request = request.storage_class(StorageClass::ReducedRedundancy);
        }
        if attributes.encryption {
            request = request.server_side_encryption(ServerSideEncryption::Aes256);
        }
        let _permit = self.acquire_permit().await?;
        tracing::debug!(store = self.name(), key = %full_key, size, "PUT object");
        request.send().await.map_err(|err| Self::map_sdk_error(err, key))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let full_key = self.full_key(key)?;
        let _permit = self.acquire_permit().await?;
        tracing::debug!(store = self.name(), key = %full_key, "DELETE object");
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|err| Self::map_sdk_error(err, key))?;
        Ok(())
    }
}
