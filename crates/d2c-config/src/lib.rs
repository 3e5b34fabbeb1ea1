//! Configuration management for docs2confluence.
//!
//! Parses `d2c.toml` with serde and discovers it in the current directory or
//! its parents. CLI flags are applied on top via [`CliSettings`].
//!
//! ```toml
//! [confluence]
//! base_url = "https://example.atlassian.net/wiki"
//! space_key = "DOCS"
//! username = "me@example.com"
//! api_token = "${CONFLUENCE_TOKEN}"
//!
//! [docs]
//! source_dir = "docs"
//!
//! [sync]
//! concurrency = 4
//! failure_policy = "continue"
//!
//! [render]
//! prepend_toc = true
//! ```
//!
//! ## Environment Variable Expansion
//!
//! `${VAR}` and `${VAR:-default}` are expanded in every `[confluence]`
//! string: `base_url`, `space_key`, `parent_id`, `username`, `api_token`,
//! `consumer_key`, `access_token` and `key_file`.

mod expand;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "d2c.toml";

/// Default number of sibling pages synced in parallel.
const DEFAULT_CONCURRENCY: usize = 4;

/// CLI settings that override configuration file values.
///
/// Only `Some` values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override docs source directory.
    pub source_dir: Option<PathBuf>,
    /// Override target space key.
    pub space_key: Option<String>,
    /// Override parent page of the tree root.
    pub parent_id: Option<String>,
    /// Override sibling concurrency.
    pub concurrency: Option<usize>,
    /// Override failure policy.
    pub failure_policy: Option<FailurePolicy>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Confluence connection (optional section, required to publish).
    pub confluence: Option<ConfluenceConfig>,
    #[serde(default)]
    docs: DocsConfigRaw,
    /// Sync engine settings.
    pub sync: SyncConfig,
    /// Markdown rendering settings.
    pub render: RenderConfig,

    /// Resolved docs configuration (set after loading).
    #[serde(skip)]
    pub docs_resolved: DocsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// How credentials are presented to Confluence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Username and API token (Confluence Cloud).
    #[default]
    Basic,
    /// OAuth 1.0 RSA-SHA1 (Confluence Server/Data Center).
    OAuth,
}

/// Confluence configuration.
#[derive(Debug, Deserialize)]
pub struct ConfluenceConfig {
    /// Confluence base URL. For Cloud this includes `/wiki`.
    pub base_url: String,
    /// Target space key.
    #[serde(default)]
    pub space_key: String,
    /// Page under which the tree root is published.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Authentication method.
    #[serde(default)]
    pub auth: AuthMethod,
    /// Basic auth username (usually an email address).
    #[serde(default)]
    pub username: String,
    /// Basic auth API token.
    #[serde(default)]
    pub api_token: String,
    /// OAuth consumer key.
    #[serde(default = "default_consumer_key")]
    pub consumer_key: String,
    /// OAuth access token.
    #[serde(default)]
    pub access_token: String,
    /// PEM private key used to sign OAuth requests.
    #[serde(default)]
    pub key_file: Option<PathBuf>,
}

impl ConfluenceConfig {
    /// Validate that the fields required by the auth method are set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.base_url, "confluence.base_url")?;
        require_http_url(&self.base_url, "confluence.base_url")?;
        require_non_empty(&self.space_key, "confluence.space_key")?;
        if let Some(parent_id) = &self.parent_id {
            require_non_empty(parent_id, "confluence.parent_id")?;
        }

        match self.auth {
            AuthMethod::Basic => {
                require_non_empty(&self.username, "confluence.username")?;
                require_non_empty(&self.api_token, "confluence.api_token")?;
            }
            AuthMethod::OAuth => {
                require_non_empty(&self.consumer_key, "confluence.consumer_key")?;
                require_non_empty(&self.access_token, "confluence.access_token")?;
                if self.key_file.is_none() {
                    return Err(ConfigError::Validation(
                        "confluence.key_file is required for oauth".to_owned(),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn default_consumer_key() -> String {
    "docs2confluence".to_owned()
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DocsConfigRaw {
    source_dir: Option<String>,
}

/// Resolved documentation configuration with absolute paths.
#[derive(Debug, Default)]
pub struct DocsConfig {
    /// Root directory of the markdown tree.
    pub source_dir: PathBuf,
}

/// What to do with the rest of the run once a page fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Keep syncing unaffected subtrees.
    #[default]
    Continue,
    /// Cancel everything not yet started.
    Stop,
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "continue" => Ok(Self::Continue),
            "stop" => Ok(Self::Stop),
            other => Err(ConfigError::Validation(format!(
                "unknown failure policy '{other}' (expected 'continue' or 'stop')"
            ))),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Continue => "continue",
            Self::Stop => "stop",
        })
    }
}

/// Sync engine settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Sibling pages synced in parallel.
    pub concurrency: usize,
    /// Behaviour after a page fails.
    pub failure_policy: FailurePolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            failure_policy: FailurePolicy::Continue,
        }
    }
}

/// Markdown rendering settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Insert a table of contents macro on pages with headings.
    pub prepend_toc: bool,
    /// Enable GitHub-flavoured extensions (tables, task lists, alerts).
    pub gfm: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            prepend_toc: false,
            gfm: true,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`confluence.api_token`").
        field: String,
        /// Error message (e.g., "${`CONFLUENCE_TOKEN`} not set").
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise searches
    /// for `d2c.toml` in the current directory and its parents, falling back
    /// to defaults relative to the current directory.
    ///
    /// CLI settings are applied last and take precedence.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit `config_path` doesn't exist, or if
    /// parsing, expansion or validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| discover_config(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.docs_resolved.source_dir.clone_from(source_dir);
        }
        if let Some(concurrency) = settings.concurrency {
            self.sync.concurrency = concurrency;
        }
        if let Some(policy) = settings.failure_policy {
            self.sync.failure_policy = policy;
        }
        if let Some(confluence) = &mut self.confluence {
            if let Some(space_key) = &settings.space_key {
                confluence.space_key.clone_from(space_key);
            }
            if let Some(parent_id) = &settings.parent_id {
                confluence.parent_id = Some(parent_id.clone());
            }
        }
    }

    /// Get validated Confluence configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the section is missing or invalid.
    pub fn require_confluence(&self) -> Result<&ConfluenceConfig, ConfigError> {
        let conf = self.confluence.as_ref().ok_or_else(|| {
            ConfigError::Validation("[confluence] section required in config".into())
        })?;
        conf.validate()?;
        Ok(conf)
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    fn default_with_base(base: &Path) -> Self {
        Self {
            confluence: None,
            docs: DocsConfigRaw::default(),
            sync: SyncConfig::default(),
            render: RenderConfig::default(),
            docs_resolved: DocsConfig {
                source_dir: base.join("docs"),
            },
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate settings that apply to every command.
    ///
    /// The `[confluence]` section is checked separately by
    /// [`Config::require_confluence`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        const MAX_CONCURRENCY: usize = 64;

        if self.sync.concurrency == 0 {
            return Err(ConfigError::Validation(
                "sync.concurrency must be greater than 0".to_owned(),
            ));
        }
        if self.sync.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::Validation(format!(
                "sync.concurrency cannot exceed {MAX_CONCURRENCY}"
            )));
        }
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        let Some(confluence) = &mut self.confluence else {
            return Ok(());
        };

        for (value, field) in [
            (&mut confluence.base_url, "confluence.base_url"),
            (&mut confluence.space_key, "confluence.space_key"),
            (&mut confluence.username, "confluence.username"),
            (&mut confluence.api_token, "confluence.api_token"),
            (&mut confluence.consumer_key, "confluence.consumer_key"),
            (&mut confluence.access_token, "confluence.access_token"),
        ] {
            *value = expand::expand_env(value, field)?;
        }

        if let Some(parent_id) = &confluence.parent_id {
            confluence.parent_id = Some(expand::expand_env(parent_id, "confluence.parent_id")?);
        }
        if let Some(key_file) = confluence.key_file.as_ref().and_then(|p| p.to_str()) {
            confluence.key_file = Some(PathBuf::from(expand::expand_env(
                key_file,
                "confluence.key_file",
            )?));
        }

        Ok(())
    }

    /// Resolve relative paths against the config file directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.docs_resolved = DocsConfig {
            source_dir: config_dir.join(self.docs.source_dir.as_deref().unwrap_or("docs")),
        };
        if let Some(confluence) = &mut self.confluence
            && let Some(key_file) = &confluence.key_file
        {
            confluence.key_file = Some(config_dir.join(key_file));
        }
    }
}

/// Search for `d2c.toml` in `start` and its parents.
fn discover_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const BASIC_CONFLUENCE: &str = r#"
[confluence]
base_url = "https://example.atlassian.net/wiki"
space_key = "DOCS"
username = "me@example.com"
api_token = "token"
"#;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILENAME);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.docs_resolved.source_dir, PathBuf::from("/test/docs"));
        assert_eq!(config.sync.concurrency, 4);
        assert_eq!(config.sync.failure_policy, FailurePolicy::Continue);
        assert!(config.render.gfm);
        assert!(!config.render.prepend_toc);
        assert!(config.confluence.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.sync.concurrency, 4);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[confluence]
base_url = "https://wiki.example.com"
space_key = "ENG"
parent_id = "12345"
auth = "oauth"
consumer_key = "publisher"
access_token = "abc"
key_file = "keys/private.pem"

[docs]
source_dir = "documentation"

[sync]
concurrency = 8
failure_policy = "stop"

[render]
prepend_toc = true
gfm = false
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        let confluence = config.require_confluence().unwrap();
        assert_eq!(confluence.auth, AuthMethod::OAuth);
        assert_eq!(confluence.parent_id.as_deref(), Some("12345"));
        assert_eq!(
            confluence.key_file,
            Some(PathBuf::from("/project/keys/private.pem"))
        );
        assert_eq!(
            config.docs_resolved.source_dir,
            PathBuf::from("/project/documentation")
        );
        assert_eq!(config.sync.concurrency, 8);
        assert_eq!(config.sync.failure_policy, FailurePolicy::Stop);
        assert!(config.render.prepend_toc);
        assert!(!config.render.gfm);
    }

    #[test]
    fn test_unknown_auth_method_is_parse_error() {
        let toml = r#"
[confluence]
base_url = "https://wiki.example.com"
auth = "kerberos"
"#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_basic_auth_requires_token() {
        let toml = r#"
[confluence]
base_url = "https://wiki.example.com"
space_key = "DOCS"
username = "me"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let err = config.require_confluence().unwrap_err();
        assert!(err.to_string().contains("confluence.api_token"));
    }

    #[test]
    fn test_oauth_requires_key_file() {
        let toml = r#"
[confluence]
base_url = "https://wiki.example.com"
space_key = "DOCS"
auth = "oauth"
access_token = "abc"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let err = config.require_confluence().unwrap_err();
        assert!(err.to_string().contains("confluence.key_file"));
    }

    #[test]
    fn test_base_url_scheme_is_checked() {
        let toml = BASIC_CONFLUENCE.replace("https://", "ftp://");
        let config: Config = toml::from_str(&toml).unwrap();
        let err = config.require_confluence().unwrap_err();
        assert!(err.to_string().contains("http:// or https://"));
    }

    #[test]
    fn test_missing_confluence_section() {
        let config = Config::default_with_base(Path::new("/test"));
        let err = config.require_confluence().unwrap_err();
        assert!(err.to_string().contains("[confluence]"));
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.sync.concurrency = 0;
        assert!(config.validate().is_err());
        config.sync.concurrency = 65;
        assert!(config.validate().is_err());
        config.sync.concurrency = 1;
        config.validate().unwrap();
    }

    #[test]
    fn test_failure_policy_from_str() {
        assert_eq!(
            "continue".parse::<FailurePolicy>().unwrap(),
            FailurePolicy::Continue
        );
        assert_eq!("STOP".parse::<FailurePolicy>().unwrap(), FailurePolicy::Stop);
        assert!("halt".parse::<FailurePolicy>().is_err());
        assert_eq!(FailurePolicy::Stop.to_string(), "stop");
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config: Config = toml::from_str(BASIC_CONFLUENCE).unwrap();
        config.resolve_paths(Path::new("/project"));
        config.apply_cli_settings(&CliSettings {
            source_dir: Some(PathBuf::from("/elsewhere")),
            space_key: Some("OPS".to_owned()),
            parent_id: Some("99".to_owned()),
            concurrency: Some(1),
            failure_policy: Some(FailurePolicy::Stop),
        });

        assert_eq!(config.docs_resolved.source_dir, PathBuf::from("/elsewhere"));
        assert_eq!(config.sync.concurrency, 1);
        assert_eq!(config.sync.failure_policy, FailurePolicy::Stop);
        let confluence = config.require_confluence().unwrap();
        assert_eq!(confluence.space_key, "OPS");
        assert_eq!(confluence.parent_id.as_deref(), Some("99"));
    }

    #[test]
    fn test_apply_empty_cli_settings() {
        let mut config: Config = toml::from_str(BASIC_CONFLUENCE).unwrap();
        config.resolve_paths(Path::new("/project"));
        config.apply_cli_settings(&CliSettings::default());

        assert_eq!(config.docs_resolved.source_dir, PathBuf::from("/project/docs"));
        assert_eq!(config.require_confluence().unwrap().space_key, "DOCS");
    }

    #[test]
    fn test_expand_env_vars_confluence() {
        // SAFETY: variable names are unique to this test
        unsafe {
            std::env::set_var("D2C_TEST_WIKI_TOKEN", "from-env");
            std::env::set_var("D2C_TEST_WIKI_SPACE", "ENV");
        }
        let toml = r#"
[confluence]
base_url = "https://wiki.example.com"
space_key = "${D2C_TEST_WIKI_SPACE}"
username = "${D2C_TEST_WIKI_USER:-bot}"
api_token = "${D2C_TEST_WIKI_TOKEN}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();
        unsafe {
            std::env::remove_var("D2C_TEST_WIKI_TOKEN");
            std::env::remove_var("D2C_TEST_WIKI_SPACE");
        }

        let confluence = config.confluence.unwrap();
        assert_eq!(confluence.space_key, "ENV");
        assert_eq!(confluence.username, "bot");
        assert_eq!(confluence.api_token, "from-env");
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::remove_var("D2C_TEST_NEVER_SET");
        }
        let toml = r#"
[confluence]
base_url = "https://wiki.example.com"
api_token = "${D2C_TEST_NEVER_SET}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.expand_env_vars().unwrap_err();
        assert!(err.to_string().contains("confluence.api_token"));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), BASIC_CONFLUENCE);

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.config_path, Some(path));
        assert_eq!(config.docs_resolved.source_dir, dir.path().join("docs"));
        config.require_confluence().unwrap();
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let err = Config::load(Some(Path::new("/nonexistent/d2c.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_rejects_zero_concurrency_from_cli() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "");
        let settings = CliSettings {
            concurrency: Some(0),
            ..CliSettings::default()
        };
        let err = Config::load(Some(&path), Some(&settings)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[sync\nconcurrency = ");
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_discover_config_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "");
        let nested = dir.path().join("docs").join("guide");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(discover_config(&nested), Some(path));
    }

    #[test]
    fn test_discover_config_none() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a");
        std::fs::create_dir_all(&nested).unwrap();
        // A d2c.toml above the temp dir would be found, so only check that
        // nothing inside it is picked up.
        let found = discover_config(&nested);
        assert!(found.is_none_or(|p| !p.starts_with(dir.path())));
    }
}
