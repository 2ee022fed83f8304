//! The reconciliation decision.
//!
//! [`classify`] is a pure function of a handful of booleans. Gathering those
//! booleans is where the cost is (hashing, HEAD requests), so
//! [`Resource`](crate::Resource) only gathers the ones the decision will
//! actually read; the rest stay `false`.

use derive_more::Display;

/// What needs to happen to make the remote match the local tree.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Status {
    /// Local only: upload.
    #[display("new")]
    New,
    /// Both exist and the content differs: re-upload.
    #[display("updated")]
    Updated,
    /// Both exist with the same bytes.
    #[display("identical")]
    Identical,
    /// Remote only (or shadowed by a local directory): remove.
    #[display("deleted")]
    Deleted,
    /// Never touched: directories without a remote object, redirects.
    #[display("ignored")]
    Ignored,
    /// Only the compressed bytes differ; the original content is unchanged.
    #[display("alternate encoding")]
    AlternateEncoding,
}

impl Status {
    pub fn wants_create(&self) -> bool {
        matches!(self, Status::New)
    }

    pub fn wants_update(&self) -> bool {
        matches!(self, Status::Updated)
    }

    pub fn wants_delete(&self) -> bool {
        matches!(self, Status::Deleted)
    }

    pub fn is_identical(&self) -> bool {
        matches!(self, Status::Identical)
    }

    /// True for [`Ignored`](Status::Ignored) and
    /// [`AlternateEncoding`](Status::AlternateEncoding) alike.
    pub fn is_ignored(&self) -> bool {
        matches!(self, Status::Ignored | Status::AlternateEncoding)
    }

    pub fn is_alternate_encoding(&self) -> bool {
        matches!(self, Status::AlternateEncoding)
    }

    /// Applying this status mutates the remote.
    pub fn is_mutation(&self) -> bool {
        self.wants_create() || self.wants_update() || self.wants_delete()
    }
}

/// Observations about one logical path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Facts {
    pub local_exists: bool,
    pub remote_exists: bool,
    pub is_directory: bool,
    /// Only read when the path exists remotely and not locally.
    pub is_redirect: bool,
    /// Local resolved-file hash equals the remote etag.
    pub body_hash_match: bool,
    /// The local variant in use is the gzip one.
    pub gzipped: bool,
    /// Only read when gzipped and the body hashes differ.
    pub content_hash_match: bool,
}

/// Decide the status of a path. Order matters: each branch assumes the
/// earlier ones did not match.
pub fn classify(facts: &Facts) -> Status {
    if facts.is_directory {
        // Directories are never uploaded; a same-named object is stale.
        return match facts.remote_exists {
            true => Status::Deleted,
            false => Status::Ignored,
        };
    }
    match (facts.local_exists, facts.remote_exists) {
        (true, true) if facts.body_hash_match => Status::Identical,
        (true, true) if !facts.gzipped => Status::Updated,
        (true, true) if facts.content_hash_match => Status::AlternateEncoding,
        (true, true) => Status::Updated,
        (true, false) => Status::New,
        // Redirects are managed by the bucket operator.
        (false, true) if facts.is_redirect => Status::Ignored,
        (false, true) => Status::Deleted,
        // Only reachable for a stale key; deleting is harmless.
        (false, false) => Status::Deleted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // (local, remote, directory, redirect, body match, gzipped, content match)
    #[rstest]
    #[case((false, false, true, false, false, false, false), Status::Ignored)]
    #[case((false, true, true, false, false, false, false), Status::Deleted)]
    #[case((true, true, true, false, true, false, false), Status::Deleted)]
    #[case((true, true, false, false, true, false, false), Status::Identical)]
    #[case((true, true, false, false, true, true, false), Status::Identical)]
    #[case((true, true, false, false, false, false, false), Status::Updated)]
    // Content hash match is irrelevant when the body is not gzipped.
    #[case((true, true, false, false, false, false, true), Status::Updated)]
    #[case((true, true, false, false, false, true, true), Status::AlternateEncoding)]
    #[case((true, true, false, false, false, true, false), Status::Updated)]
    #[case((true, false, false, false, false, false, false), Status::New)]
    #[case((true, false, false, false, false, true, false), Status::New)]
    #[case((false, true, false, true, false, false, false), Status::Ignored)]
    #[case((false, true, false, false, false, false, false), Status::Deleted)]
    #[case((false, false, false, false, false, false, false), Status::Deleted)]
    fn test_classify(#[case] facts: (bool, bool, bool, bool, bool, bool, bool), #[case] expected: Status) {
        let (local_exists, remote_exists, is_directory, is_redirect, body_hash_match, gzipped, content_hash_match) =
            facts;
        let facts = Facts {
            local_exists,
            remote_exists,
            is_directory,
            is_redirect,
            body_hash_match,
            gzipped,
            content_hash_match,
        };
        assert_eq!(classify(&facts), expected);
    }

    #[rstest]
    #[case(Status::New, [true, false, false, false, false, false])]
    #[case(Status::Updated, [false, true, false, false, false, false])]
    #[case(Status::Deleted, [false, false, true, false, false, false])]
    #[case(Status::Identical, [false, false, false, true, false, false])]
    #[case(Status::Ignored, [false, false, false, false, true, false])]
    #[case(Status::AlternateEncoding, [false, false, false, false, true, true])]
    fn test_predicates(#[case] status: Status, #[case] expected: [bool; 6]) {
        let actual = [
            status.wants_create(),
            status.wants_update(),
            status.wants_delete(),
            status.is_identical(),
            status.is_ignored(),
            status.is_alternate_encoding(),
        ];
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_display() {
        assert_eq!(Status::AlternateEncoding.to_string(), "alternate encoding");
        assert_eq!(Status::New.to_string(), "new");
    }
}
