//! Browser caching policies, keyed by content type.

use serde::{Deserialize, Serialize};

/// Directives for the `Cache-Control` and `Expires` headers of an upload.
///
/// ```
/// use bucketsync_config::CachingPolicy;
///
/// let policy = CachingPolicy { max_age: Some(3600), public: true, ..CachingPolicy::default() };
/// assert_eq!(policy.cache_control().as_deref(), Some("max-age=3600, public"));
/// assert_eq!(CachingPolicy::default().cache_control(), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CachingPolicy {
    pub max_age: Option<u64>,
    pub s_maxage: Option<u64>,
    pub public: bool,
    pub private: bool,
    pub no_cache: bool,
    pub no_store: bool,
    pub must_revalidate: bool,
    pub proxy_revalidate: bool,
    pub no_transform: bool,
    /// HTTP-date, e.g. `Thu, 01 Dec 2033 16:00:00 GMT`.
    pub expires: Option<String>,
}

impl CachingPolicy {
    /// Render the `Cache-Control` header value, or `None` when the policy
    /// sets no directives.
    pub fn cache_control(&self) -> Option<String> {
        let mut directives = Vec::new();
        if let Some(max_age) = self.max_age {
            directives.push(format!("max-age={max_age}"));
        }
        if let Some(s_maxage) = self.s_maxage {
            directives.push(format!("s-maxage={s_maxage}"));
        }
        let flags = [
            (self.public, "public"),
            (self.private, "private"),
            (self.no_cache, "no-cache"),
            (self.no_store, "no-store"),
            (self.must_revalidate, "must-revalidate"),
            (self.proxy_revalidate, "proxy-revalidate"),
            (self.no_transform, "no-transform"),
        ];
        directives.extend(flags.into_iter().filter(|(set, _)| *set).map(|(_, name)| name.to_string()));
        match directives.is_empty() {
            true => None,
            false => Some(directives.join(", ")),
        }
    }

    /// `(cache-control, expires)` as attached to an upload.
    pub fn headers(&self) -> (Option<String>, Option<String>) {
        (self.cache_control(), self.expires.clone())
    }
}
