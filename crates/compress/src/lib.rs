//! Content encodings for files in a build tree.
//!
//! A build directory may contain a pre-compressed sibling next to (or instead
//! of) a plain file: `index.html` and `index.html.gz`. This crate answers
//! three questions about such pairs:
//!
//! - **Which variant is this?** ([`Encoding::from_path`], or [`str::parse`]
//!   for a `Content-Encoding` header value)
//! - **What is its logical name?** ([`Encoding::split`] strips the suffix)
//! - **What are the original bytes?** ([`Encoding::decompress`])
//!
//! Only gzip is supported; it is the one encoding that static hosting in
//! front of S3 serves transparently via `Content-Encoding`.

mod construct;
pub mod error;
mod ops;
mod util;

/// The encoding of a file's stored bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Plain bytes, stored as-is
    #[default]
    Identity,
    /// Gzip compression (.gz)
    Gzip,
}

#[cfg(test)]
mod tests {
    use crate::Encoding;

    #[test]
    fn encoding_default() {
        assert_eq!(Encoding::default(), Encoding::Identity);
    }
}
