use crate::error::{ErrorKind, Result};
use bucketsync_config::Config;
use bucketsync_storage::StoreHandle;
use bucketsync_storage::backend::S3Store;
use exn::{OptionExt, ResultExt};
use std::sync::Arc;

/// Build the S3 store described by the `s3` section of `config`.
pub async fn connect(config: &Config) -> Result<StoreHandle> {
    let s3 = config.s3.as_ref().ok_or_raise(|| ErrorKind::Connect("no s3 section configured".to_string()))?;
    let store = S3Store::new(
        s3.bucket.clone(),
        s3.bucket.clone(),
        s3.prefix.clone(),
        s3.region.clone(),
        s3.endpoint.clone(),
        s3.key_id.clone(),
        s3.key_secret.clone(),
    )
    .await
    .or_raise(|| ErrorKind::Connect(s3.bucket.clone()))?;
    tracing::debug!(bucket = %s3.bucket, prefix = ?s3.prefix, "Connected to S3");
    Ok(Arc::new(store))
}
