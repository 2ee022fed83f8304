//! Local side of a resource: the build tree.
//!
//! A logical path may be backed by a plain file, a gzip sibling (`path.gz`),
//! or both. Which one gets uploaded is decided once, when the file is
//! probed; hashes are computed on first use and kept.

use crate::error::{ErrorKind, Result};
use crate::hash::fingerprint;
use async_stream::stream;
use bucketsync_compress::Encoding;
use exn::ResultExt;
use futures::Stream;
use std::collections::HashSet;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// What the build tree holds at a logical path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Presence {
    Missing,
    Directory,
    File { resolved: PathBuf, encoding: Encoding },
}

/// The local file (if any) behind one logical path.
#[derive(Debug)]
pub struct LocalFile {
    path: PathBuf,
    /// Absolute path of the uncompressed original.
    original: PathBuf,
    presence: Presence,
    body_hash: Option<String>,
    content_hash: Option<String>,
}

impl LocalFile {
    /// Inspect the build tree for `path`.
    ///
    /// With `prefer_gzip`, an existing `path.gz` wins over the plain file.
    /// Without it, only the plain file counts.
    pub async fn probe(root: &Path, path: impl Into<PathBuf>, prefer_gzip: bool) -> Result<Self> {
        let path = path.into();
        let original = root.join(&path);
        let presence = match Self::kind(&original).await? {
            Some(true) => Presence::Directory,
            plain => {
                let compressed = Encoding::Gzip.variant_of(&original);
                if prefer_gzip && Self::kind(&compressed).await? == Some(false) {
                    Presence::File { resolved: compressed, encoding: Encoding::Gzip }
                } else if plain == Some(false) {
                    Presence::File { resolved: original.clone(), encoding: Encoding::Identity }
                } else {
                    Presence::Missing
                }
            },
        };
        tracing::trace!(path = %path.display(), ?presence, "Probed local file");
        Ok(Self { path, original, presence, body_hash: None, content_hash: None })
    }

    /// `Some(true)` for a directory, `Some(false)` for a file, `None` when
    /// absent (or something that is neither, like a broken symlink).
    async fn kind(absolute: &Path) -> Result<Option<bool>> {
        match fs::metadata(absolute).await {
            Ok(meta) if meta.is_dir() => Ok(Some(true)),
            Ok(meta) if meta.is_file() => Ok(Some(false)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).or_raise(|| ErrorKind::Local(absolute.to_path_buf())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A file (plain or compressed) backs this path.
    pub fn exists(&self) -> bool {
        matches!(self.presence, Presence::File { .. })
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.presence, Presence::Directory)
    }

    /// The file that would be uploaded, and its encoding.
    ///
    /// Returns [`NotFound`](ErrorKind::NotFound) if no file backs this path.
    pub fn resolve(&self) -> Result<(&Path, Encoding)> {
        match &self.presence {
            Presence::File { resolved, encoding } => Ok((resolved, *encoding)),
            _ => exn::bail!(ErrorKind::NotFound(self.path.clone())),
        }
    }

    /// The compressed variant is the one in use.
    pub fn is_gzipped(&self) -> bool {
        matches!(self.presence, Presence::File { encoding: Encoding::Gzip, .. })
    }

    /// Bytes of the resolved file, exactly as they would be stored.
    pub async fn body(&self) -> Result<Vec<u8>> {
        let (resolved, _) = self.resolve()?;
        fs::read(resolved).await.or_raise(|| ErrorKind::Local(self.path.clone()))
    }

    /// Hash of the resolved file's bytes (compressed bytes when gzipped).
    pub async fn body_hash(&mut self) -> Result<&str> {
        if self.body_hash.is_none() {
            let body = self.body().await.or_raise(|| ErrorKind::Hash(self.path.clone()))?;
            self.body_hash = Some(fingerprint(&body));
        }
        Ok(self.body_hash.as_deref().unwrap_or_default())
    }

    /// Hash of the uncompressed original, whichever variant is resolved.
    ///
    /// Reads the plain file when it exists; a gzip-only path is decompressed
    /// in memory instead.
    pub async fn content_hash(&mut self) -> Result<&str> {
        if self.content_hash.is_none() {
            let (resolved, encoding) = self.resolve()?;
            let content = match encoding {
                Encoding::Identity => self.body().await,
                Encoding::Gzip => match fs::read(&self.original).await {
                    Ok(plain) => Ok(plain),
                    Err(e) if e.kind() == IoErrorKind::NotFound => {
                        let compressed = fs::read(resolved).await.or_raise(|| ErrorKind::Local(self.path.clone()))?;
                        Encoding::Gzip.decompress(&compressed).or_raise(|| ErrorKind::Local(self.path.clone()))
                    },
                    Err(e) => Err(e).or_raise(|| ErrorKind::Local(self.path.clone())),
                },
            }
            .or_raise(|| ErrorKind::Hash(self.path.clone()))?;
            self.content_hash = Some(fingerprint(&content));
        }
        Ok(self.content_hash.as_deref().unwrap_or_default())
    }

    /// Hashes computed so far, for reporting. Never triggers a read.
    pub fn known_hashes(&self) -> (Option<&str>, Option<&str>) {
        (self.body_hash.as_deref(), self.content_hash.as_deref())
    }
}

enum WalkEntry {
    File(PathBuf),
    Descend(PathBuf),
    Skip,
}

/// Stream the logical path of every file under `root`.
///
/// With `prefer_gzip`, `foo.gz` is reported as `foo`, so a plain file and its
/// compressed sibling collapse into one path (callers de-duplicate).
///
/// Symlinks are followed, as [`LocalFile::probe`] follows them. A directory
/// reached twice (through a link cycle) is only read once.
pub fn walk(root: &Path, prefer_gzip: bool) -> impl Stream<Item = Result<PathBuf>> + '_ {
    stream! {
        let mut stack = vec![root.to_path_buf()];
        let mut visited = HashSet::new();
        'dirs: while let Some(current) = stack.pop() {
            match fs::canonicalize(&current).await {
                Ok(real) if !visited.insert(real.clone()) => continue 'dirs,
                Ok(_) => {},
                Err(e) if e.kind() == IoErrorKind::NotFound => continue 'dirs,
                Err(e) => {
                    yield Err(e).or_raise(|| ErrorKind::Local(current.clone()));
                    continue 'dirs;
                },
            }
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                // An empty or missing build directory is an empty tree.
                Err(e) if e.kind() == IoErrorKind::NotFound => continue 'dirs,
                Err(e) => {
                    yield Err(e).or_raise(|| ErrorKind::Local(current.clone()));
                    continue 'dirs;
                },
            };
            'entries: loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break 'entries,
                    Err(e) => {
                        yield Err(e).or_raise(|| ErrorKind::Local(current.clone()));
                        continue 'entries;
                    },
                };
                match walk_entry(root, entry, prefer_gzip).await {
                    Ok(WalkEntry::File(path)) => yield Ok(path),
                    Ok(WalkEntry::Descend(dir)) => stack.push(dir),
                    Ok(WalkEntry::Skip) => {},
                    Err(e) => yield Err(e),
                }
            }
        }
    }
}

async fn walk_entry(root: &Path, entry: fs::DirEntry, prefer_gzip: bool) -> Result<WalkEntry> {
    let absolute = entry.path();
    // `DirEntry::metadata` does not traverse links; this does.
    let meta = match fs::metadata(&absolute).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == IoErrorKind::NotFound => {
            tracing::debug!(path = %absolute.display(), "Skipping dangling symlink");
            return Ok(WalkEntry::Skip);
        },
        Err(e) => return Err(e).or_raise(|| ErrorKind::Local(absolute.clone())),
    };
    if meta.is_dir() {
        return Ok(WalkEntry::Descend(absolute));
    }
    if !meta.is_file() {
        tracing::debug!(path = %absolute.display(), "Skipping special file");
        return Ok(WalkEntry::Skip);
    }
    let relative = absolute.strip_prefix(root).or_raise(|| ErrorKind::InvalidPath(absolute.clone()))?;
    let relative = bucketsync_storage::validate_path(relative).or_raise(|| ErrorKind::InvalidPath(absolute.clone()))?;
    Ok(WalkEntry::File(match prefer_gzip {
        true => Encoding::split(&relative).0,
        false => relative,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use std::collections::BTreeSet;

    fn gzip(data: &[u8]) -> Vec<u8> {
        Encoding::Gzip.compress(data).unwrap()
    }

    #[tokio::test]
    async fn test_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        let mut file = LocalFile::probe(dir.path(), "a.txt", true).await.unwrap();
        assert!(file.exists());
        assert!(!file.is_gzipped());
        assert_eq!(file.resolve().unwrap().0, dir.path().join("a.txt"));
        assert_eq!(file.body_hash().await.unwrap(), fingerprint(b"hello"));
        assert_eq!(file.content_hash().await.unwrap(), fingerprint(b"hello"));
    }

    #[tokio::test]
    async fn test_gzip_preferred() {
        let dir = tempfile::tempdir().unwrap();
        let compressed = gzip(b"<html></html>");
        std::fs::write(dir.path().join("index.html"), b"<html></html>").unwrap();
        std::fs::write(dir.path().join("index.html.gz"), &compressed).unwrap();
        let mut file = LocalFile::probe(dir.path(), "index.html", true).await.unwrap();
        assert!(file.is_gzipped());
        assert_eq!(file.resolve().unwrap(), (dir.path().join("index.html.gz").as_path(), Encoding::Gzip));
        assert_eq!(file.body_hash().await.unwrap(), fingerprint(&compressed));
        assert_eq!(file.content_hash().await.unwrap(), fingerprint(b"<html></html>"));
    }

    #[tokio::test]
    async fn test_gzip_ignored_without_preference() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), b"plain").unwrap();
        std::fs::write(dir.path().join("index.html.gz"), gzip(b"plain")).unwrap();
        let file = LocalFile::probe(dir.path(), "index.html", false).await.unwrap();
        assert!(!file.is_gzipped());
        assert_eq!(file.resolve().unwrap().1, Encoding::Identity);
    }

    #[tokio::test]
    async fn test_gzip_only_is_decompressed_for_content_hash() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js.gz"), gzip(b"console.log(1)")).unwrap();
        let mut file = LocalFile::probe(dir.path(), "app.js", true).await.unwrap();
        assert!(file.exists());
        assert_eq!(file.content_hash().await.unwrap(), fingerprint(b"console.log(1)"));
    }

    #[tokio::test]
    async fn test_corrupt_gzip_only_fails_to_hash() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js.gz"), b"not gzip").unwrap();
        let mut file = LocalFile::probe(dir.path(), "app.js", true).await.unwrap();
        let err = file.content_hash().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Hash(_)));
    }

    #[tokio::test]
    async fn test_missing_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("blog")).unwrap();
        let missing = LocalFile::probe(dir.path(), "nope.html", true).await.unwrap();
        assert!(!missing.exists() && !missing.is_directory());
        let err = missing.resolve().unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        let blog = LocalFile::probe(dir.path(), "blog", true).await.unwrap();
        assert!(blog.is_directory());
        assert!(!blog.exists());
    }

    #[tokio::test]
    async fn test_walk_collapses_gzip_siblings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("index.html"), b"a").unwrap();
        std::fs::write(dir.path().join("index.html.gz"), gzip(b"a")).unwrap();
        std::fs::write(dir.path().join("css/site.css.gz"), gzip(b"b")).unwrap();
        let paths: BTreeSet<PathBuf> = walk(dir.path(), true).try_collect().await.unwrap();
        assert_eq!(paths, BTreeSet::from([PathBuf::from("css/site.css"), PathBuf::from("index.html")]));
        let raw: BTreeSet<PathBuf> = walk(dir.path(), false).try_collect().await.unwrap();
        assert_eq!(raw.len(), 3);
        assert!(raw.contains(Path::new("index.html.gz")));
    }

    #[tokio::test]
    async fn test_walk_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = walk(&dir.path().join("build"), true).try_collect().await.unwrap();
        assert!(paths.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_walk_follows_symlinked_files() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("real.css"), b"body { }").unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path().join("real.css"), dir.path().join("site.css")).unwrap();
        std::os::unix::fs::symlink(outside.path().join("missing.css"), dir.path().join("dangling.css")).unwrap();

        let paths: Vec<PathBuf> = walk(dir.path(), true).try_collect().await.unwrap();
        assert_eq!(paths, [PathBuf::from("site.css")]);
        let mut file = LocalFile::probe(dir.path(), "site.css", true).await.unwrap();
        assert!(file.exists());
        assert_eq!(file.body_hash().await.unwrap(), fingerprint(b"body { }"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_walk_survives_directory_link_cycle() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("blog")).unwrap();
        std::fs::write(dir.path().join("blog/post.html"), b"post").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("blog/home")).unwrap();

        let paths: BTreeSet<PathBuf> = walk(dir.path(), true).try_collect().await.unwrap();
        assert_eq!(paths, BTreeSet::from([PathBuf::from("blog/post.html")]));
    }
}
