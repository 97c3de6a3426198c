//! Converter configuration.
//!
//! Settings come from four layers, later layers winning:
//!
//! ```text
//! stock defaults  →  album-convert.toml  →  environment  →  CLI flags
//! ```
//!
//! The config file is optional and sparse: it only needs the keys it wants to
//! override. Unknown keys are rejected to catch typos early.
//!
//! ```toml
//! [local]
//! albums_dir = "content/albums"
//! portfolio_dir = "content/portfolio"
//! delete_source = false
//!
//! [remote]
//! api_base = "https://api.github.com"
//! owner = "jane"
//! repo = "photo-site"
//! branch = "main"
//! albums_path = "content/albums"
//! portfolio_path = "content/portfolio"
//! delete_policy = "after-all-writes"
//! token_env = "GITHUB_TOKEN"
//! timeout_secs = 30
//! ```
//!
//! The access token is never read from the file, only from the environment
//! variable named by `token_env`.

use crate::backend::remote::DEFAULT_API_BASE;
use crate::convert::DeletePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "album-convert.toml";

pub const OWNER_ENV: &str = "ALBUM_CONVERT_OWNER";
pub const REPO_ENV: &str = "ALBUM_CONVERT_REPO";
pub const BRANCH_ENV: &str = "ALBUM_CONVERT_BRANCH";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    pub local: LocalConfig,
    pub remote: RemoteConfig,
}

/// Settings for converting albums in a local checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalConfig {
    /// Directory holding album records.
    pub albums_dir: PathBuf,
    /// Directory receiving portfolio records; created when missing.
    pub portfolio_dir: PathBuf,
    /// Remove each album file once all of its photos were written.
    pub delete_source: bool,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            albums_dir: PathBuf::from("content/albums"),
            portfolio_dir: PathBuf::from("content/portfolio"),
            delete_source: false,
        }
    }
}

impl LocalConfig {
    pub fn delete_policy(&self) -> DeletePolicy {
        if self.delete_source {
            DeletePolicy::AfterAllWrites
        } else {
            DeletePolicy::Never
        }
    }
}

/// Settings for converting albums through the GitHub contents API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    pub api_base: String,
    pub owner: Option<String>,
    pub repo: Option<String>,
    /// Target branch; the repository's default branch when absent.
    pub branch: Option<String>,
    pub albums_path: String,
    pub portfolio_path: String,
    pub delete_policy: DeletePolicy,
    /// Name of the environment variable holding the access token.
    pub token_env: String,
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            owner: None,
            repo: None,
            branch: None,
            albums_path: "content/albums".to_string(),
            portfolio_path: "content/portfolio".to_string(),
            delete_policy: DeletePolicy::AfterAllWrites,
            token_env: "GITHUB_TOKEN".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ConvertConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.local.albums_dir == self.local.portfolio_dir {
            return Err(ConfigError::Validation(
                "local.albums_dir and local.portfolio_dir must differ".into(),
            ));
        }
        let remote = &self.remote;
        if !(remote.api_base.starts_with("https://") || remote.api_base.starts_with("http://")) {
            return Err(ConfigError::Validation(
                "remote.api_base must be an http(s) URL".into(),
            ));
        }
        let albums = remote.albums_path.trim_matches('/');
        let portfolio = remote.portfolio_path.trim_matches('/');
        if albums.is_empty() || portfolio.is_empty() {
            return Err(ConfigError::Validation(
                "remote.albums_path and remote.portfolio_path must not be empty".into(),
            ));
        }
        if albums == portfolio {
            return Err(ConfigError::Validation(
                "remote.albums_path and remote.portfolio_path must differ".into(),
            ));
        }
        if remote.token_env.trim().is_empty() {
            return Err(ConfigError::Validation(
                "remote.token_env must name an environment variable".into(),
            ));
        }
        if remote.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "remote.timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Apply `ALBUM_CONVERT_*` overrides. `lookup` is `std::env::var` in
    /// production; empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(owner) = get(OWNER_ENV) {
            self.remote.owner = Some(owner);
        }
        if let Some(repo) = get(REPO_ENV) {
            self.remote.repo = Some(repo);
        }
        if let Some(branch) = get(BRANCH_ENV) {
            self.remote.branch = Some(branch);
        }
    }

    /// The access token from the environment variable named by `token_env`.
    pub fn token(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        lookup(&self.remote.token_env)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// Stock defaults as a TOML value, the base layer for merging.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ConvertConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ConvertConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ConvertConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the configuration.
///
/// With `Some(path)` the file must exist. With `None`, [`DEFAULT_CONFIG_FILE`]
/// in the working directory is used when present and stock defaults
/// otherwise.
pub fn load_config(path: Option<&Path>) -> Result<ConvertConfig, ConfigError> {
    let (path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    if !required && !path.exists() {
        return resolve_config(None);
    }
    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let overlay: toml::Value = toml::from_str(&content)?;
    resolve_config(Some(overlay))
}

/// Returns a fully-commented stock config file with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# album-convert configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.
#
# Environment variables override this file:
#   ALBUM_CONVERT_OWNER, ALBUM_CONVERT_REPO, ALBUM_CONVERT_BRANCH
# Command-line flags override both.

# ---------------------------------------------------------------------------
# Local conversion (album-convert local)
# ---------------------------------------------------------------------------
[local]
# Directory holding album records (*.md with a YAML header).
albums_dir = "content/albums"

# Directory receiving one record per photo. Created when missing.
portfolio_dir = "content/portfolio"

# Remove each album file once every one of its photos was written.
delete_source = false

# ---------------------------------------------------------------------------
# Remote conversion through the GitHub contents API (album-convert remote)
# ---------------------------------------------------------------------------
[remote]
# API root. Change for GitHub Enterprise, e.g. "https://git.example.com/api/v3".
api_base = "https://api.github.com"

# Repository owner and name. Prompted for on a terminal when unset.
# owner = "jane"
# repo = "photo-site"

# Branch to read from and commit to. Repository default branch when unset.
# branch = "main"

# Repository paths of the album and portfolio directories.
albums_path = "content/albums"
portfolio_path = "content/portfolio"

# When to delete a source album after conversion:
#   "never"            keep every album
#   "after-all-writes" delete only if every photo was written
#   "always"           delete after the write loop, even if some photos failed
delete_policy = "after-all-writes"

# Environment variable holding the access token (needs contents read/write).
token_env = "GITHUB_TOKEN"

# Per-request timeout in seconds.
timeout_secs = 30
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        ConvertConfig::default().validate().unwrap();
    }

    #[test]
    fn stock_toml_matches_defaults() {
        let value: toml::Value = toml::from_str(stock_config_toml()).unwrap();
        let config = resolve_config(Some(value)).unwrap();
        assert_eq!(config, ConvertConfig::default());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        assert!(val.get("local").is_some());
        assert!(val.get("remote").is_some());
    }

    #[test]
    fn sparse_overlay_keeps_other_defaults() {
        let overlay: toml::Value = toml::from_str(
            r#"
[remote]
owner = "jane"
delete_policy = "always"
"#,
        )
        .unwrap();
        let config = resolve_config(Some(overlay)).unwrap();
        assert_eq!(config.remote.owner.as_deref(), Some("jane"));
        assert_eq!(config.remote.delete_policy, DeletePolicy::Always);
        assert_eq!(config.remote.albums_path, "content/albums");
        assert_eq!(config.local, LocalConfig::default());
    }

    #[test]
    fn unknown_keys_rejected() {
        let overlay: toml::Value = toml::from_str("[local]\nalbum_dir = \"x\"\n").unwrap();
        assert!(matches!(
            resolve_config(Some(overlay)),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn unknown_delete_policy_rejected() {
        let overlay: toml::Value = toml::from_str("[remote]\ndelete_policy = \"sometimes\"\n").unwrap();
        assert!(resolve_config(Some(overlay)).is_err());
    }

    #[test]
    fn same_local_dirs_rejected() {
        let mut config = ConvertConfig::default();
        config.local.portfolio_dir = config.local.albums_dir.clone();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn same_remote_paths_rejected() {
        let mut config = ConvertConfig::default();
        config.remote.portfolio_path = "/content/albums/".into();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn non_http_api_base_rejected() {
        let mut config = ConvertConfig::default();
        config.remote.api_base = "ftp://example.com".into();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut config = ConvertConfig::default();
        config.remote.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = ConvertConfig::default();
        config.remote.owner = Some("from-file".into());
        config.apply_env(env(&[(OWNER_ENV, "from-env"), (REPO_ENV, "site"), (BRANCH_ENV, " ")]));
        assert_eq!(config.remote.owner.as_deref(), Some("from-env"));
        assert_eq!(config.remote.repo.as_deref(), Some("site"));
        assert_eq!(config.remote.branch, None);
    }

    #[test]
    fn token_read_from_named_variable() {
        let mut config = ConvertConfig::default();
        assert_eq!(config.token(env(&[("GITHUB_TOKEN", " ghp_x\n")])).as_deref(), Some("ghp_x"));
        assert_eq!(config.token(env(&[("GITHUB_TOKEN", "")])), None);

        config.remote.token_env = "SITE_TOKEN".into();
        assert_eq!(config.token(env(&[("GITHUB_TOKEN", "ghp_x")])), None);
        assert_eq!(config.token(env(&[("SITE_TOKEN", "ghp_y")])).as_deref(), Some("ghp_y"));
    }

    #[test]
    fn local_delete_policy() {
        let mut local = LocalConfig::default();
        assert_eq!(local.delete_policy(), DeletePolicy::Never);
        local.delete_source = true;
        assert_eq!(local.delete_policy(), DeletePolicy::AfterAllWrites);
    }

    #[test]
    fn explicit_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_config(Some(&tmp.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn loads_explicit_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("convert.toml");
        fs::write(&path, "[local]\nalbums_dir = \"in\"\nportfolio_dir = \"out\"\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.local.albums_dir, PathBuf::from("in"));
        assert_eq!(config.local.portfolio_dir, PathBuf::from("out"));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str("[remote]\nowner = \"a\"\nrepo = \"b\"\n").unwrap();
        let overlay: toml::Value = toml::from_str("[remote]\nrepo = \"c\"\n").unwrap();
        let merged = merge_toml(base, overlay);
        let remote = merged.get("remote").unwrap();
        assert_eq!(remote.get("owner").unwrap().as_str(), Some("a"));
        assert_eq!(remote.get("repo").unwrap().as_str(), Some("c"));
    }
}
