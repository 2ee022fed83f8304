//! Logical path and object key validation.
//!
//! Logical paths are what the reconciler works with (`blog/index.html`).
//! Object keys are what the store actually holds, which may carry artefacts
//! a path cannot express (a trailing `/` on a folder marker). Both must stay
//! inside the bucket prefix.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a logical path for security and correctness.
/// Ensures that paths don't escape the sync root (no `..` traversal).
///
/// > **Note:** This does **not** normalize backslashes, non-UTF8 bytes, or
/// >           platform-specific weirdness. Null bytes are explicitly rejected.
///
/// # Returns
/// Returns the normalized path if valid, or [`InvalidPath`](crate::error::ErrorKind::InvalidPath)
/// if invalid.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use bucketsync_storage::validate_path;
/// // Valid paths
/// assert!(validate_path("blog/index.html").is_ok());
/// assert!(validate_path("a/../index.html").is_ok()); // (never leaves sync root)
/// // Invalid paths
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("a/../../b").is_err());
/// assert!(validate_path("a\0b").is_err());
/// // Paths get resolved
/// assert_eq!(
///     validate_path("wrong/../still-wrong/.././correct//./index.html/").unwrap(),
///     Path::new("correct/index.html")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let mut components = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls; reject them explicitly.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

/// Validates a raw object key without rewriting it.
///
/// The key must resolve to a valid logical path (see [`validate`]) but is
/// returned byte-for-byte, so that a delete targets exactly the object that
/// was listed.
///
/// ```
/// use bucketsync_storage::validate_key;
/// assert_eq!(validate_key("blog/").unwrap(), "blog/");
/// assert!(validate_key("").is_err());
/// assert!(validate_key("../secret").is_err());
/// ```
pub fn validate_key(key: &str) -> Result<&str> {
    if key.starts_with('/') {
        exn::bail!(ErrorKind::InvalidPath(PathBuf::from(key)));
    }
    validate(key)?;
    Ok(key)
}

/// Object key for a logical path, always `/`-separated.
///
/// Returns [`InvalidPath`](crate::error::ErrorKind::InvalidPath) for
/// traversal attempts or paths that are not valid UTF-8.
pub fn key_for(path: impl AsRef<Path>) -> Result<String> {
    let validated = validate(path.as_ref())?;
    let mut parts = Vec::new();
    for component in validated.components() {
        match component.as_os_str().to_str() {
            Some(part) => parts.push(part),
            None => exn::bail!(ErrorKind::InvalidPath(validated.clone())),
        }
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        assert_eq!(validate(Path::new("blog/index.html")).unwrap(), Path::new("blog/index.html"));
        assert_eq!(validate(Path::new("a/b/c/site.css")).unwrap(), Path::new("a/b/c/site.css"));
        assert_eq!(validate(Path::new("index.html")).unwrap(), Path::new("index.html"));
    }

    #[test]
    fn test_path_normalization() {
        assert_eq!(validate(Path::new("a//b//c")).unwrap(), Path::new("a/b/c"));
        assert_eq!(validate(Path::new("a/./b/./c")).unwrap(), Path::new("a/b/c"));
        assert_eq!(validate(Path::new("/leading/slash")).unwrap(), Path::new("leading/slash"));
    }

    #[test]
    fn test_traversal_attempts() {
        assert!(validate(Path::new("../etc/passwd")).is_err());
        assert!(validate(Path::new("a/../../b")).is_err());
        assert!(validate(Path::new("..")).is_err());
        assert!(validate(Path::new("../..")).is_err());
    }

    #[test]
    fn test_invalid_characters() {
        assert!(validate(Path::new("a\0b")).is_err());
        assert!(validate(Path::new("\0")).is_err());
    }

    #[test]
    fn test_empty_paths() {
        assert!(validate(Path::new("")).is_err());
        assert!(validate(Path::new(".")).is_err());
        assert!(validate(Path::new("./.")).is_err());
        assert!(validate(Path::new("//")).is_err());
    }

    #[test]
    fn test_trailing_slashes() {
        assert_eq!(validate(Path::new("blog/")).unwrap(), Path::new("blog"));
        assert_eq!(validate(Path::new("blog///")).unwrap(), Path::new("blog"));
    }

    #[test]
    fn test_keys_are_preserved() {
        assert_eq!(validate_key("blog/").unwrap(), "blog/");
        assert_eq!(validate_key("a/b.html").unwrap(), "a/b.html");
        assert!(validate_key("/absolute").is_err());
        assert!(validate_key("a/../../b").is_err());
    }

    #[test]
    fn test_key_for() {
        assert_eq!(key_for("blog/./index.html").unwrap(), "blog/index.html");
        assert_eq!(key_for("index.html/").unwrap(), "index.html");
        assert!(key_for("../index.html").is_err());
    }
}
