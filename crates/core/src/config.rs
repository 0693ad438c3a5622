//! Configuration management for Reglens.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Defaults
//! - Config files (.reglens/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric, with all state stored in `.reglens/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 3] = ["ollama", "openai", "mock"];

/// Main application configuration.
///
/// This struct holds all global configuration options that affect
/// the CLI, the HTTP server and the answer pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .reglens/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active text generation provider ("ollama", "openai", "mock")
    pub provider: String,

    /// Default model identifier
    pub model: String,

    /// API key for the provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log format override ("pretty" or "json")
    pub log_format: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Answer pipeline tuning
    pub pipeline: PipelineConfig,

    /// Similarity index settings
    pub retrieval: RetrievalConfig,

    /// HTTP server settings
    pub server: ServerConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Per-stage model overrides
    #[serde(default)]
    pub roles: ModelRoles,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        timeout: Option<u64>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Model configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::OpenAI { model, .. } => model,
            ProviderConfig::Ollama { model, .. } => model,
        }
    }

    /// Custom endpoint, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenAI { endpoint, .. } => endpoint.as_deref(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }

    /// Request timeout in seconds, if configured.
    pub fn timeout(&self) -> Option<u64> {
        match self {
            ProviderConfig::OpenAI { timeout, .. } => *timeout,
            ProviderConfig::Ollama { timeout, .. } => *timeout,
        }
    }
}

/// Pipeline stages that talk to the generation capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Classifier,
    Synthesizer,
    Verifier,
}

/// Model overrides per pipeline stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelRoles {
    pub classifier: Option<String>,
    pub synthesizer: Option<String>,
    pub verifier: Option<String>,
}

impl ModelRoles {
    fn get(&self, role: ModelRole) -> Option<&str> {
        match role {
            ModelRole::Classifier => self.classifier.as_deref(),
            ModelRole::Synthesizer => self.synthesizer.as_deref(),
            ModelRole::Verifier => self.verifier.as_deref(),
        }
    }
}

/// Answer pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Verification confidence below which retrieval is retried
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Retries continue while the retry counter is at or below this value
    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: u32,

    /// Characters of passage text kept in response previews
    #[serde(default = "default_preview_length")]
    pub preview_length: usize,

    /// Upper bound for any single generation or search call
    #[serde(default = "default_capability_timeout_secs")]
    pub capability_timeout_secs: u64,
}

fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_max_retry_count() -> u32 {
    2
}

fn default_preview_length() -> usize {
    300
}

fn default_capability_timeout_secs() -> u64 {
    60
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            max_retry_count: default_max_retry_count(),
            preview_length: default_preview_length(),
            capability_timeout_secs: default_capability_timeout_secs(),
        }
    }
}

/// Similarity index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfig {
    /// Embedding provider: "trigram" or "ollama"
    #[serde(default = "default_embedding_provider")]
    pub embedding_provider: String,

    /// Embedding model (provider-specific)
    #[serde(default)]
    pub embedding_model: Option<String>,

    /// Embedding vector dimension
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_embedding_provider() -> String {
    "trigram".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_chunk_size() -> usize {
    800
}

fn default_chunk_overlap() -> usize {
    200
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            embedding_provider: default_embedding_provider(),
            embedding_model: None,
            dimensions: default_dimensions(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Socket address to bind
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Allowed CORS origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    pipeline: Option<PipelineConfig>,
    retrieval: Option<RetrievalConfig>,
    server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            log_format: None,
            verbose: false,
            no_color: false,
            llm: None,
            pipeline: PipelineConfig::default(),
            retrieval: RetrievalConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML config file and environment variables.
    ///
    /// Environment variables:
    /// - `REGLENS_WORKSPACE`: Override workspace path
    /// - `REGLENS_CONFIG`: Path to config file
    /// - `REGLENS_PROVIDER`: Generation provider
    /// - `REGLENS_MODEL`: Model identifier
    /// - `REGLENS_API_KEY`: API key
    /// - `REGLENS_BIND`: HTTP bind address
    /// - `REGLENS_CORS_ORIGINS`: Comma-separated CORS origins
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use reglens_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration for an explicit workspace and config file.
    ///
    /// `None` falls back to `REGLENS_WORKSPACE` / `REGLENS_CONFIG`, then to
    /// the current directory and `.reglens/config.yaml`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace
            .or_else(|| std::env::var("REGLENS_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var("REGLENS_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.workspace.join(".reglens/config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("REGLENS_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("REGLENS_MODEL") {
            config.model = model;
        }

        if let Ok(bind) = std::env::var("REGLENS_BIND") {
            config.server.bind = bind;
        }

        if let Ok(origins) = std::env::var("REGLENS_CORS_ORIGINS") {
            config.server.cors_origins = parse_origins(&origins);
        }

        config.api_key = std::env::var("REGLENS_API_KEY").ok();
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_format = Some(format);
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        if let Some(pipeline) = config_file.pipeline {
            result.pipeline = pipeline;
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(server) = config_file.server {
            result.server = server;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and
    /// the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        log_format: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if let Some(log_format) = log_format {
            self.log_format = Some(log_format);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .reglens directory.
    pub fn reglens_dir(&self) -> PathBuf {
        self.workspace.join(".reglens")
    }

    /// Ensure the .reglens directory exists.
    pub fn ensure_reglens_dir(&self) -> AppResult<()> {
        let dir = self.reglens_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .reglens directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Path of the SQLite similarity index.
    pub fn index_path(&self) -> PathBuf {
        self.reglens_dir().join("index.sqlite")
    }

    /// Path of the workspace regulation catalog override.
    pub fn catalog_path(&self) -> PathBuf {
        self.reglens_dir().join("catalog.yaml")
    }

    /// Get the configuration block for a provider.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Custom endpoint for the active provider, if configured.
    pub fn provider_endpoint(&self) -> Option<&str> {
        self.get_provider_config(&self.provider)
            .and_then(ProviderConfig::endpoint)
    }

    /// Request timeout (seconds) for the active provider.
    ///
    /// Falls back to the pipeline capability timeout.
    pub fn provider_timeout_secs(&self) -> u64 {
        self.get_provider_config(&self.provider)
            .and_then(ProviderConfig::timeout)
            .unwrap_or(self.pipeline.capability_timeout_secs)
    }

    /// Embedding model configured on the active Ollama provider, if any.
    pub fn provider_embedding_model(&self) -> Option<&str> {
        match self.get_provider_config(&self.provider)? {
            ProviderConfig::Ollama {
                embedding_model, ..
            } => embedding_model.as_deref(),
            ProviderConfig::OpenAI { .. } => None,
        }
    }

    /// Model to use for a pipeline stage.
    pub fn model_for(&self, role: ModelRole) -> &str {
        self.llm
            .as_ref()
            .and_then(|llm| llm.roles.get(role))
            .unwrap_or(&self.model)
    }

    /// Resolve the API key for a provider.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        // Explicit REGLENS_API_KEY wins
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider)? {
            ProviderConfig::OpenAI { api_key_env, .. } => std::env::var(api_key_env).ok(),
            ProviderConfig::Ollama { .. } => None,
        }
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.as_str();

        if !KNOWN_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if provider == "openai" && self.resolve_api_key(provider).is_none() {
            return Err(AppError::Config(
                "OpenAI provider requires an API key (REGLENS_API_KEY or apiKeyEnv)".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.pipeline.confidence_threshold) {
            return Err(AppError::Config(format!(
                "confidenceThreshold must be within [0, 1], got {}",
                self.pipeline.confidence_threshold
            )));
        }

        if self.pipeline.capability_timeout_secs == 0 {
            return Err(AppError::Config(
                "capabilityTimeoutSecs must be greater than zero".to_string(),
            ));
        }

        if self.retrieval.chunk_overlap >= self.retrieval.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                self.retrieval.chunk_overlap, self.retrieval.chunk_size
            )));
        }

        Ok(())
    }
}

/// Split a comma-separated origin list.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}
