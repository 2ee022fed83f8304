use crate::Encoding;
use std::ffi::OsString;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

impl Display for Encoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl Encoding {
    /// Returns the file suffix for this encoding.
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Encoding::Identity => "",
            Encoding::Gzip => ".gz",
        }
    }

    /// Returns the short name (for displaying to user).
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Identity => "identity",
            Encoding::Gzip => "gzip",
        }
    }

    /// Value for the `Content-Encoding` header, if one should be sent.
    #[inline]
    #[must_use]
    pub fn content_encoding(&self) -> Option<&'static str> {
        match self {
            Encoding::Identity => None,
            Encoding::Gzip => Some("gzip"),
        }
    }

    /// Path of this encoding's variant of a logical path.
    ///
    /// ```
    /// use bucketsync_compress::Encoding;
    /// use std::path::Path;
    ///
    /// assert_eq!(Encoding::Gzip.variant_of("index.html"), Path::new("index.html.gz"));
    /// assert_eq!(Encoding::Identity.variant_of("index.html"), Path::new("index.html"));
    /// ```
    #[must_use]
    pub fn variant_of(&self, path: impl AsRef<Path>) -> PathBuf {
        let mut name = OsString::from(path.as_ref().as_os_str());
        name.push(self.extension());
        PathBuf::from(name)
    }

    /// Split an on-disk path into its logical path and encoding.
    ///
    /// ```
    /// use bucketsync_compress::Encoding;
    /// use std::path::Path;
    ///
    /// let (logical, encoding) = Encoding::split("css/site.css.gz");
    /// assert_eq!(logical, Path::new("css/site.css"));
    /// assert_eq!(encoding, Encoding::Gzip);
    /// ```
    #[must_use]
    pub fn split(path: impl AsRef<Path>) -> (PathBuf, Encoding) {
        let path = path.as_ref();
        match Encoding::from_path(path) {
            Encoding::Gzip => (path.with_extension(""), Encoding::Gzip),
            Encoding::Identity => (path.to_path_buf(), Encoding::Identity),
        }
    }
}
