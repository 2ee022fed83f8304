//! Content-type lookup by file extension.
//!
//! Deliberately small: the handful of types a static site is made of. Anything
//! else can be added through the `content_types` option.

use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const BUILTIN: &[(&str, &str)] = &[
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("gif", "image/gif"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("ico", "image/vnd.microsoft.icon"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("map", "application/json"),
    ("md", "text/markdown"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("txt", "text/plain"),
    ("wasm", "application/wasm"),
    ("webp", "image/webp"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("xml", "application/xml"),
];

/// Resolve the content type of a logical path. `overrides` is keyed by
/// lowercase extension without the dot.
pub fn lookup(path: &Path, overrides: &HashMap<String, String>) -> String {
    let Some(extension) = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase) else {
        return DEFAULT_CONTENT_TYPE.to_string();
    };
    if let Some(content_type) = overrides.get(&extension) {
        return content_type.clone();
    }
    BUILTIN
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, content_type)| content_type.to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("index.html", "text/html")]
    #[case("css/site.CSS", "text/css")]
    #[case("feed.xml", "application/xml")]
    #[case("LICENSE", DEFAULT_CONTENT_TYPE)]
    #[case("archive.tar", DEFAULT_CONTENT_TYPE)]
    fn test_builtin(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(lookup(Path::new(path), &HashMap::new()), expected);
    }

    #[test]
    fn test_override_wins() {
        let overrides = HashMap::from([("html".to_string(), "text/html; charset=utf-8".to_string())]);
        assert_eq!(lookup(Path::new("index.html"), &overrides), "text/html; charset=utf-8");
    }
}
