//! Compression Operations

use crate::Encoding;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use flate2::{Compression as GzCompression, read::GzDecoder, write::GzEncoder};
use std::io::{Read, Write};
use tracing::instrument;

// Matches what static site generators emit by default; these bytes are served
// directly to browsers so level 9 buys very little.
const GZIP_LEVEL: GzCompression = GzCompression::new(6);

impl Encoding {
    /// Encode a byte slice in memory.
    ///
    /// # Examples
    ///
    /// ```
    /// use bucketsync_compress::Encoding;
    ///
    /// let data = b"Hello, world!";
    /// let compressed = Encoding::Gzip.compress(data).unwrap();
    /// assert_ne!(compressed, data);
    /// ```
    #[instrument(skip(input), fields(encoding = %self, input_size = input.len()))]
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        match self {
            Encoding::Identity => Ok(input.to_vec()),
            Encoding::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), GZIP_LEVEL);
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)
            },
        }
    }

    /// Decode a byte slice in memory, returning the original bytes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bucketsync_compress::Encoding;
    ///
    /// let original = b"Hello, world!";
    /// let compressed = Encoding::Gzip.compress(original).unwrap();
    /// assert_ne!(compressed, original);
    /// let decompressed = Encoding::Gzip.decompress(&compressed).unwrap();
    /// assert_eq!(decompressed, original);
    /// ```
    #[instrument(skip(input), fields(encoding = %self, input_size = input.len(), output_size))]
    pub fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let output = match self {
            Encoding::Identity => input.to_vec(),
            Encoding::Gzip => {
                let mut output = Vec::new();
                GzDecoder::new(input).read_to_end(&mut output).or_raise(|| ErrorKind::InvalidData)?;
                output
            },
        };
        tracing::Span::current().record("output_size", output.len());
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use crate::Encoding;

    #[test]
    fn test_gzip_roundtrip() {
        let original = b"<html><body>Hello, world!</body></html>";
        let compressed = Encoding::Gzip.compress(original).unwrap();
        assert_eq!(Encoding::Gzip.decompress(&compressed).unwrap(), original);
    }

    #[test]
    fn test_identity_is_passthrough() {
        assert_eq!(Encoding::Identity.compress(b"abc").unwrap(), b"abc");
        assert_eq!(Encoding::Identity.decompress(b"abc").unwrap(), b"abc");
    }

    #[test]
    fn test_invalid_gzip_data() {
        let err = Encoding::Gzip.decompress(b"This is not compressed data").unwrap_err();
        assert_eq!(*err, crate::error::ErrorKind::InvalidData);
    }

    #[test]
    fn test_different_bytes_same_content() {
        // Two encoders at different levels produce different bodies for the
        // same content: this is the "alternate encoding" situation.
        use flate2::{Compression, write::GzEncoder};
        use std::io::Write;
        let original = b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaabbbbbbbbbbbbbbbbbbbbbbbbbb".repeat(20);
        let mut fast = GzEncoder::new(Vec::new(), Compression::fast());
        fast.write_all(&original).unwrap();
        let fast = fast.finish().unwrap();
        let default = Encoding::Gzip.compress(&original).unwrap();
        assert_ne!(fast, default);
        assert_eq!(Encoding::Gzip.decompress(&fast).unwrap(), Encoding::Gzip.decompress(&default).unwrap());
    }
}
