//! Configuration for a bucketsync run.
//!
//! Values are layered with [`figment`], lowest precedence first:
//!
//! 1. built-in defaults ([`Config::default`]),
//! 2. the user config file (`config.toml` in the platform config directory),
//! 3. an explicit file passed by the caller (`.toml`, `.yaml`/`.yml`, `.json`),
//! 4. `BUCKETSYNC_*` environment variables (`__` separates nested keys, so
//!    `BUCKETSYNC_S3__BUCKET` sets `s3.bucket`).

mod caching;
mod content_type;
pub mod error;

pub use crate::caching::CachingPolicy;
pub use crate::content_type::DEFAULT_CONTENT_TYPE;
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "BUCKETSYNC_";
const DEFAULT_CONCURRENCY: usize = 8;

/// Connection settings for the S3 bucket being synced to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct S3Settings {
    pub bucket: String,
    /// Key prefix inside the bucket (acts as virtual directory).
    pub prefix: Option<String>,
    pub region: String,
    /// Custom endpoint for S3-compatible services.
    pub endpoint: Option<String>,
    pub key_id: String,
    pub key_secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Local tree that the bucket should mirror.
    pub build_dir: PathBuf,
    /// Canned ACL applied to every upload.
    pub acl: String,
    /// Upload `foo.gz` in place of `foo` when both exist.
    pub prefer_gzip: bool,
    pub reduced_redundancy: bool,
    /// Request server-side encryption on upload.
    pub encryption: bool,
    /// Include hashes and encoding in action reports.
    pub verbose: bool,
    /// Report every action but mutate nothing.
    pub dry_run: bool,
    /// Delete remote objects that have no local counterpart.
    pub delete: bool,
    /// How many resources are reconciled at once.
    pub concurrency: usize,
    /// Keyed by content type, e.g. `text/html`.
    pub caching_policies: HashMap<String, CachingPolicy>,
    pub default_caching_policy: Option<CachingPolicy>,
    /// Extra extension to content-type mappings (extension without the dot).
    pub content_types: HashMap<String, String>,
    pub s3: Option<S3Settings>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            build_dir: PathBuf::from("build"),
            acl: "public-read".to_string(),
            prefer_gzip: true,
            reduced_redundancy: false,
            encryption: false,
            verbose: false,
            dry_run: false,
            delete: true,
            concurrency: DEFAULT_CONCURRENCY,
            caching_policies: HashMap::new(),
            default_caching_policy: None,
            content_types: HashMap::new(),
            s3: None,
        }
    }
}

impl Config {
    /// Default location of the user config file, if the platform has one.
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "bucketsync").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Build the layered [`Figment`] without extracting it.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(user) = Self::user_config_path() {
            // Missing user config is fine: figment treats absent files as empty.
            figment = figment.merge(Toml::file(user));
        }
        if let Some(file) = file {
            if !file.is_file() {
                exn::bail!(ErrorKind::Invalid(format!("config file not found: {}", file.display())));
            }
            figment = match file.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file(file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                Some("json") => figment.merge(Json::file(file)),
                _ => exn::bail!(ErrorKind::Invalid(format!("unsupported config format: {}", file.display()))),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load, resolve and validate the configuration.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(file)?)
    }

    /// Extract from an already-assembled [`Figment`], then resolve and
    /// validate.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let mut config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        if config.build_dir.is_relative() {
            let cwd = std::env::current_dir().or_raise(|| ErrorKind::Load)?;
            config.build_dir = cwd.join(&config.build_dir);
        }
        config.validate()?;
        tracing::debug!(build_dir = %config.build_dir.display(), dry_run = config.dry_run, "Configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("concurrency must be at least 1".to_string()));
        }
        if self.build_dir.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("build_dir must not be empty".to_string()));
        }
        if let Some(s3) = &self.s3
            && s3.bucket.is_empty()
        {
            exn::bail!(ErrorKind::Invalid("s3.bucket must not be empty".to_string()));
        }
        Ok(())
    }

    /// Caching policy for a content type, falling back to the default
    /// policy.
    pub fn caching_policy_for(&self, content_type: &str) -> Option<&CachingPolicy> {
        self.caching_policies.get(content_type).or(self.default_caching_policy.as_ref())
    }

    /// Content type of a logical path.
    pub fn content_type_for(&self, path: impl AsRef<Path>) -> String {
        content_type::lookup(path.as_ref(), &self.content_types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    fn from_toml(toml: &str) -> Result<Config> {
        Config::from_figment(Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(toml)))
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.acl, "public-read");
        assert!(config.prefer_gzip);
        assert!(config.delete);
        assert!(!config.dry_run);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_relative_build_dir_is_resolved() {
        let config = from_toml(r#"build_dir = "public""#).unwrap();
        assert!(config.build_dir.is_absolute());
        assert!(config.build_dir.ends_with("public"));
    }

    #[test]
    fn test_caching_policies() {
        let config = from_toml(
            r#"
            build_dir = "/srv/site"

            [caching_policies."text/html"]
            max_age = 300
            must_revalidate = true

            [default_caching_policy]
            max_age = 86400
            public = true
            "#,
        )
        .unwrap();
        let html = config.caching_policy_for("text/html").unwrap();
        assert_eq!(html.cache_control().as_deref(), Some("max-age=300, must-revalidate"));
        let css = config.caching_policy_for("text/css").unwrap();
        assert_eq!(css.cache_control().as_deref(), Some("max-age=86400, public"));
    }

    #[test]
    fn test_no_policy_without_default() {
        let config = from_toml(r#"build_dir = "/srv/site""#).unwrap();
        assert!(config.caching_policy_for("text/html").is_none());
    }

    #[rstest]
    #[case("concurrency = 0")]
    #[case("[s3]\nbucket = \"\"")]
    fn test_invalid(#[case] toml: &str) {
        let err = from_toml(toml).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_wrong_type_fails_to_load() {
        let err = from_toml(r#"prefer_gzip = "sometimes""#).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load));
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "build_dir: /srv/site\nprefer_gzip: false\ns3:\n  bucket: www.example.com\n  region: eu-west-1")
            .unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert!(!config.prefer_gzip);
        assert_eq!(config.s3.unwrap().bucket, "www.example.com");
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_content_type_overrides() {
        let config = from_toml("[content_types]\nwebmanifest = \"application/manifest+json\"").unwrap();
        assert_eq!(config.content_type_for("site.webmanifest"), "application/manifest+json");
        assert_eq!(config.content_type_for("index.html"), "text/html");
    }
}
