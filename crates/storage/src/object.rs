//! Remote object descriptors.
//!
//! A listing only tells us a key and its etag. Anything else (user metadata,
//! redirect markers) costs a HEAD request per object, so the two levels of
//! knowledge are separate types: [`ObjectInfo<Listed>`] and
//! [`ObjectInfo<Headed>`]. Both deref to [`ObjectMeta`] so mixed code can
//! read the common fields without caring which one it holds.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::{ops::Deref, path::PathBuf};

/// User metadata key holding the MD5 of the original (uncompressed) content,
/// sent on the wire as `x-amz-meta-content-md5`.
pub const CONTENT_MD5_KEY: &str = "content-md5";

/// Fields known from a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Raw key relative to the store prefix, exactly as listed.
    pub key: String,
    /// Logical path the key resolves to.
    pub path: PathBuf,
    /// Body hash with the surrounding quotes stripped.
    pub etag: String,
    /// Object size in bytes
    pub size: u64,
}
impl ObjectMeta {
    /// Upgrade to a full descriptor with the headers returned by HEAD.
    pub fn with_headers(self, headers: Headers) -> ObjectInfo<Headed> {
        ObjectInfo { meta: self, headers }
    }
}

/// Fields only known after a HEAD request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    /// User metadata with the `x-amz-meta-` prefix removed.
    pub metadata: HashMap<String, String>,
    /// Website redirect target (`x-amz-website-redirect-location`).
    pub redirect: Option<String>,
    /// `Content-Encoding` the object is currently served with.
    pub content_encoding: Option<String>,
}

mod sealed {
    pub trait Sealed {}
}
pub trait DescriptorState: sealed::Sealed {
    type Headers: Debug + Clone + PartialEq + Eq + Send + Sync;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listed;
impl sealed::Sealed for Listed {}
impl DescriptorState for Listed {
    type Headers = ();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headed;
impl sealed::Sealed for Headed {}
impl DescriptorState for Headed {
    type Headers = Headers;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo<S: DescriptorState = Listed> {
    meta: ObjectMeta,
    pub headers: S::Headers,
}
impl<S: DescriptorState> ObjectInfo<S> {
    pub fn meta(&self) -> &ObjectMeta {
        &self.meta
    }

    pub fn into_meta(self) -> ObjectMeta {
        self.meta
    }
}
impl<S: DescriptorState> Deref for ObjectInfo<S> {
    type Target = ObjectMeta;
    fn deref(&self) -> &ObjectMeta {
        &self.meta
    }
}

impl ObjectInfo {
    /// Create a new descriptor from a listing entry (no headers yet).
    pub fn new(key: impl Into<String>, path: impl Into<PathBuf>, etag: &str, size: u64) -> Self {
        ObjectMeta {
            key: key.into(),
            path: path.into(),
            etag: normalize_etag(etag),
            size,
        }
        .into()
    }

    pub fn with_headers(self, headers: Headers) -> ObjectInfo<Headed> {
        self.meta.with_headers(headers)
    }
}
impl From<ObjectMeta> for ObjectInfo<Listed> {
    fn from(meta: ObjectMeta) -> Self {
        Self { meta, headers: () }
    }
}

impl ObjectInfo<Headed> {
    /// The original-content hash recorded at upload time, if any.
    pub fn content_md5(&self) -> Option<&str> {
        self.headers.metadata.get(CONTENT_MD5_KEY).map(String::as_str)
    }

    /// Redirect objects are managed by the bucket operator, not by sync.
    pub fn is_redirect(&self) -> bool {
        self.headers.redirect.as_deref().is_some_and(|location| !location.is_empty())
    }
}

/// Strip the quotes S3 wraps etags in.
pub fn normalize_etag(etag: &str) -> String {
    etag.trim().trim_matches('"').to_string()
}

/// Everything attached to an object when it is written.
///
/// The store applies what is set and leaves the rest to its defaults; the
/// caller decides which optional attributes apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutAttributes {
    /// Canned ACL (`public-read`, `private`, ...)
    pub acl: Option<String>,
    pub content_type: Option<String>,
    /// User metadata, without the `x-amz-meta-` prefix.
    pub metadata: BTreeMap<String, String>,
    pub cache_control: Option<String>,
    /// HTTP-date formatted expiry.
    pub expires: Option<String>,
    pub content_encoding: Option<String>,
    pub reduced_redundancy: bool,
    /// Request AES256 server-side encryption.
    pub encryption: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etag_is_normalized() {
        let info = ObjectInfo::new("a.txt", "a.txt", "\"d41d8cd98f00b204e9800998ecf8427e\"", 0);
        assert_eq!(info.etag, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(normalize_etag(" abc "), "abc");
    }

    #[test]
    fn test_upgrade_keeps_listing_fields() {
        let listed = ObjectInfo::new("blog/", "blog", "abc", 0);
        let mut headers = Headers::default();
        headers.metadata.insert(CONTENT_MD5_KEY.to_string(), "def".to_string());
        let headed = listed.clone().with_headers(headers);
        assert_eq!(headed.meta(), listed.meta());
        assert_eq!(headed.key, "blog/");
        assert_eq!(headed.content_md5(), Some("def"));
        assert!(!headed.is_redirect());
    }

    #[test]
    fn test_redirect_marker() {
        let headers = Headers { redirect: Some("/new-home".to_string()), ..Headers::default() };
        assert!(ObjectInfo::new("old", "old", "x", 0).with_headers(headers).is_redirect());
        let empty = Headers { redirect: Some(String::new()), ..Headers::default() };
        assert!(!ObjectInfo::new("old", "old", "x", 0).with_headers(empty).is_redirect());
    }
}
