//! Server configuration.
//!
//! Sources, later ones winning:
//!
//! 1. built-in defaults ([`ServerConfig::default`])
//! 2. an optional file; format from its extension (`yaml`, `yml`, `toml`,
//!    `json`), with `${VAR}` / `$VAR` references substituted first
//! 3. `KINDSERVE_*` environment variables, `__` separating nested keys
//!    (`KINDSERVE_LISTEN_ADDRESS=127.0.0.1:9000`)

use config::{Config, Environment, File, FileFormat};
use kindserve_kernel::{GroupVersion, GroupVersionKind};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

pub const ENV_PREFIX: &str = "KINDSERVE";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("config parsing error: {0}")]
    Parse(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind.
    pub listen_address: String,
    /// Permissive CORS on every route.
    pub cors: bool,
    /// Group-versions registered in the scheme but not served.
    pub ignored_group_versions: Vec<GroupVersion>,
    /// Kinds registered in the scheme but not served.
    pub ignored_kinds: Vec<GroupVersionKind>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:8080".to_string(),
            cors: true,
            ignored_group_versions: Vec::new(),
            ignored_kinds: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load from defaults, `path` (if any) and the environment.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            let format = detect_format(path)?;
            let content = std::fs::read_to_string(path)?;
            builder = builder.add_source(File::from_str(&substitute_env_vars(&content), format));
        }
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn ignored_group_version_set(&self) -> HashSet<GroupVersion> {
        self.ignored_group_versions.iter().cloned().collect()
    }

    pub fn ignored_kind_set(&self) -> HashSet<GroupVersionKind> {
        self.ignored_kinds.iter().cloned().collect()
    }
}

pub fn detect_format(path: &Path) -> ConfigResult<FileFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;
    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Replace `${VAR}` and `$VAR` with the variable's value. Unset variables
/// are left as written.
pub fn substitute_env_vars(content: &str) -> String {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(pattern) = PATTERN
        .get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").ok())
    else {
        return content.to_string();
    };
    pattern
        .replace_all(content, |caps: &regex::Captures<'_>| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}
