use crate::Encoding;
use crate::error::{Error, ErrorKind};
use std::{path::Path, str::FromStr};

/// Parses `Content-Encoding` header values.
impl FromStr for Encoding {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "identity" => Ok(Encoding::Identity),
            "gz" | "gzip" | "x-gzip" => Ok(Encoding::Gzip),
            _ => exn::bail!(ErrorKind::UnsupportedEncoding(s.to_string())),
        }
    }
}
impl Encoding {
    /// Detect the encoding from a file extension.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("gz") => Encoding::Gzip,
            _ => Encoding::Identity,
        }
    }
}
