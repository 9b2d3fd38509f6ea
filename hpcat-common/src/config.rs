//! Configuration loading and root folder resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: a warning is logged and defaults are
//! used. A TOML file that exists but cannot be parsed is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "HPCAT_CONFIG";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "HPCAT_ROOT_FOLDER";

/// Default metadata file name, relative to the root folder
pub const DEFAULT_METADATA_FILE: &str = "metadata.json";

/// Default description log file name, relative to the root folder
pub const DEFAULT_LOG_FILE: &str = "descripciones_imagenes.csv";

/// Bootstrap configuration loaded from the TOML file
///
/// Every key is optional; unset keys fall through to environment variables
/// and compiled defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the metadata file and the description log
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Metadata file (relative paths are joined to the root folder)
    #[serde(default)]
    pub metadata_file: Option<PathBuf>,

    /// Description log file (relative paths are joined to the root folder)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// API key for the text-generation service
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// Generation backend: "openai" (default) or "fake"
    #[serde(default)]
    pub provider: Option<String>,

    /// Generation model name
    #[serde(default)]
    pub model: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[serde(default)]
    pub base_url: Option<String>,

    /// Per-request timeout for generation calls, in seconds
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// HTTP port for `serve`
    #[serde(default)]
    pub port: Option<u16>,

    /// File overriding the archival description instructions
    #[serde(default)]
    pub description_template: Option<PathBuf>,

    /// File overriding the keyword indexing instructions
    #[serde(default)]
    pub keyword_template: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Compiled defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    /// Defaults for the current platform
    ///
    /// The archive tool historically ran from the folder holding its data
    /// files, so the default root is the working directory.
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: PathBuf::from("."),
            log_level: default_log_level(),
        }
    }
}

/// Per-user config file location (`<config_dir>/hpcat/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hpcat").join("config.toml"))
}

/// Find the config file to load
///
/// Priority: CLI argument, then `HPCAT_CONFIG`, then the per-user default
/// location (only if it exists).
pub fn locate_config_file(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|p| p.exists())
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the config file if one can be located, otherwise fall back to defaults
///
/// A located file that does not exist logs a warning and yields defaults.
pub fn load_or_default(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match locate_config_file(cli_arg) {
        Some(path) if path.exists() => {
            let config = load_toml_config(&path)?;
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        Some(path) => {
            warn!(
                "Config file not found: {} (using defaults)",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            debug!("No config file located, using defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Root folder resolution (CLI > ENV > TOML > compiled default)
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_value: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml_config: &TomlConfig) -> Self {
        Self {
            cli_arg,
            toml_value: toml_config.root_folder.clone(),
        }
    }

    /// Resolve the root folder
    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = &self.toml_value {
            return path.clone();
        }

        // Priority 4: Compiled default
        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Join `path` to `root` unless it is already absolute
pub fn resolve_relative(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
