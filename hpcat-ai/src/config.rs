//! Configuration resolution for hpcat-ai
//!
//! Every setting is resolved CLI → ENV → TOML → compiled default, the same
//! order `RootFolderResolver` uses for the root folder. File paths from the
//! TOML file are relative to the root folder unless absolute.
//!
//! The API key is resolved separately (ENV → TOML) and only when the
//! `openai` provider is actually built.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use hpcat_common::config::{
    resolve_relative, RootFolderResolver, TomlConfig, DEFAULT_LOG_FILE, DEFAULT_METADATA_FILE,
};
use hpcat_common::{Error, Result};
use tracing::{info, warn};

use crate::error::CatalogError;
use crate::services::openai_generator::{
    OpenAiGenerator, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS,
};
use crate::services::{
    Cataloger, FakeGenerator, GenerationClient, MetadataStore, PromptBuilder, PromptTemplates,
    TextGenerator,
};

pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";
pub const MODEL_ENV_VAR: &str = "HPCAT_MODEL";
pub const BASE_URL_ENV_VAR: &str = "HPCAT_BASE_URL";
pub const PORT_ENV_VAR: &str = "HPCAT_PORT";
pub const PROVIDER_ENV_VAR: &str = "HPCAT_PROVIDER";

/// Default HTTP port for `serve`
pub const DEFAULT_PORT: u16 = 5790;

/// Text-generation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions API
    OpenAi,
    /// Canned archival responses, no network
    Fake,
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "fake" => Ok(ProviderKind::Fake),
            other => Err(Error::Config(format!(
                "Unknown provider '{}' (expected 'openai' or 'fake')",
                other
            ))),
        }
    }
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub root_folder: PathBuf,
    pub metadata_path: PathBuf,
    pub log_path: PathBuf,
    pub provider: ProviderKind,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Duration,
    pub port: u16,
    pub description_template: Option<PathBuf>,
    pub keyword_template: Option<PathBuf>,
}

impl AppConfig {
    /// Resolve configuration from CLI overrides, environment and TOML
    pub fn resolve(
        cli_root_folder: Option<PathBuf>,
        cli_port: Option<u16>,
        toml_config: &TomlConfig,
    ) -> Result<Self> {
        let root_folder = RootFolderResolver::new(cli_root_folder, toml_config).resolve();

        let metadata_path = resolve_relative(
            &root_folder,
            toml_config
                .metadata_file
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_METADATA_FILE)),
        );
        let log_path = resolve_relative(
            &root_folder,
            toml_config
                .log_file
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_LOG_FILE)),
        );

        let provider = match env_value(PROVIDER_ENV_VAR).or_else(|| toml_config.provider.clone()) {
            Some(value) => value.parse()?,
            None => ProviderKind::OpenAi,
        };

        let model = env_value(MODEL_ENV_VAR)
            .or_else(|| toml_config.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let base_url = env_value(BASE_URL_ENV_VAR)
            .or_else(|| toml_config.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let port = match cli_port {
            Some(port) => port,
            None => match env_value(PORT_ENV_VAR) {
                Some(value) => value.trim().parse().map_err(|_| {
                    Error::Config(format!("{} is not a valid port: '{}'", PORT_ENV_VAR, value))
                })?,
                None => toml_config.port.unwrap_or(DEFAULT_PORT),
            },
        };

        let request_timeout = Duration::from_secs(
            toml_config
                .request_timeout_secs
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        );

        Ok(Self {
            description_template: toml_config
                .description_template
                .as_deref()
                .map(|p| resolve_relative(&root_folder, p)),
            keyword_template: toml_config
                .keyword_template
                .as_deref()
                .map(|p| resolve_relative(&root_folder, p)),
            root_folder,
            metadata_path,
            log_path,
            provider,
            model,
            base_url,
            request_timeout,
            port,
        })
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the generation API key
///
/// **Priority:** ENV → TOML
pub fn resolve_openai_api_key(toml_config: &TomlConfig) -> Result<String> {
    let env_key = std::env::var(API_KEY_ENV_VAR).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .openai_api_key
        .clone()
        .filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "API key found in multiple sources: environment, TOML. Using environment (highest priority)."
        );
    }

    if let Some(key) = env_key {
        info!("API key loaded from environment variable");
        return Ok(key);
    }

    if let Some(key) = toml_key {
        info!("API key loaded from TOML config");
        return Ok(key);
    }

    Err(Error::Config(format!(
        "API key not configured. Please configure using one of:\n\
         1. Environment: {}=your-key-here\n\
         2. TOML config: openai_api_key = \"your-key\"\n\
         \n\
         Or set provider = \"fake\" to run without the generation service.",
        API_KEY_ENV_VAR
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Build the configured text generator
pub fn build_generator(
    config: &AppConfig,
    toml_config: &TomlConfig,
) -> Result<Arc<dyn TextGenerator>> {
    match config.provider {
        ProviderKind::Fake => {
            warn!("Using fake generator: descriptions are canned, not generated");
            Ok(Arc::new(FakeGenerator::with_archive_responses()))
        }
        ProviderKind::OpenAi => {
            let api_key = resolve_openai_api_key(toml_config)?;
            let generator = OpenAiGenerator::new(
                api_key,
                config.model.clone(),
                config.base_url.clone(),
                config.request_timeout,
            )
            .map_err(|e| Error::Config(e.to_string()))?;
            info!(
                model = %config.model,
                base_url = %config.base_url,
                "Generation client configured"
            );
            Ok(Arc::new(generator))
        }
    }
}

/// Load metadata and prompt templates and wire them to `generator`
pub fn build_cataloger(
    config: &AppConfig,
    generator: Arc<dyn TextGenerator>,
) -> std::result::Result<Cataloger, CatalogError> {
    let metadata = MetadataStore::load(&config.metadata_path)?;
    let templates = PromptTemplates::load(
        config.description_template.as_deref(),
        config.keyword_template.as_deref(),
    )?;

    Ok(Cataloger::new(
        metadata,
        PromptBuilder::new(templates),
        GenerationClient::new(generator),
        config.log_path.clone(),
    ))
}
