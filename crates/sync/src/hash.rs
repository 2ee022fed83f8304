//! Content fingerprints.
//!
//! S3 reports the MD5 of the stored bytes as the etag of any object uploaded
//! in a single part, so MD5 is the one fingerprint a local file can be
//! compared against without downloading anything.

use md5::{Digest, Md5};

/// Lowercase hex MD5 of `bytes`.
///
/// ```
/// assert_eq!(bucketsync_sync::hash::fingerprint(b""), "d41d8cd98f00b204e9800998ecf8427e");
/// ```
pub fn fingerprint(bytes: &[u8]) -> String {
    format!("{:x}", Md5::digest(bytes))
}
