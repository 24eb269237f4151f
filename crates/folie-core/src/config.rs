//! Experiment configuration
//!
//! Loaded from environment variables, optionally overridden by the CLI, and
//! validated once before a run starts. Out-of-range values are rejected, never
//! clamped.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Parse { key: String, value: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// How much search effort the optimizer spends per call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerMode {
    #[default]
    Light,
    Medium,
    Heavy,
}

impl OptimizerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizerMode::Light => "light",
            OptimizerMode::Medium => "medium",
            OptimizerMode::Heavy => "heavy",
        }
    }
}

impl fmt::Display for OptimizerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizerMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(OptimizerMode::Light),
            "medium" => Ok(OptimizerMode::Medium),
            "heavy" => Ok(OptimizerMode::Heavy),
            _ => Err(ConfigError::Parse {
                key: "AUTO_MODE".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

pub const DEFAULT_MODEL: &str = "ollama_chat/llama3.1:8b";
pub const DEFAULT_API_BASE: &str = "http://localhost:11434";

/// Configuration for a co-training experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Model identifier, optionally prefixed with a provider (env: MODEL)
    pub model: String,
    /// Provider base URL (env: API_BASE)
    pub api_base: String,
    /// Provider API key (env: API_KEY)
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Sampling temperature, >= 0 (env: TEMPERATURE)
    pub temperature: f64,
    /// Completion budget, >= 1 (env: MAX_TOKENS)
    pub max_tokens: u32,
    /// Truth anchoring weight in [0, 1] (env: ALPHA)
    pub alpha: f64,
    /// Number of co-training rounds, >= 1 (env: ROUNDS)
    pub rounds: u32,
    /// Use chain-of-thought prompting (env: USE_COT)
    pub use_cot: bool,
    /// Optimizer search effort (env: AUTO_MODE)
    pub auto_mode: OptimizerMode,
    /// Persist provider responses on disk (env: ENABLE_DISK_CACHE)
    pub enable_disk_cache: bool,
    /// Keep provider responses in memory (env: ENABLE_MEMORY_CACHE)
    pub enable_memory_cache: bool,
    /// Per-request timeout in seconds, >= 1 (env: REQUEST_TIMEOUT_SECS)
    pub request_timeout_secs: u64,
    /// Seed for shuffling, tie-breaks and optimizer sampling (env: SEED)
    pub seed: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: String::new(),
            temperature: 0.5,
            max_tokens: 512,
            alpha: 0.0,
            rounds: 6,
            use_cot: false,
            auto_mode: OptimizerMode::Light,
            enable_disk_cache: false,
            enable_memory_cache: false,
            request_timeout_secs: 120,
            seed: None,
        }
    }
}

fn parse_key<T: FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Parse {
        key: key.to_string(),
        value,
    })
}

fn parse_flag(value: &str) -> bool {
    value.trim().to_lowercase() == "true"
}

impl ExperimentConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Missing keys keep
    /// their defaults; present but unparsable values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("MODEL") {
            config.model = v;
        }
        if let Some(v) = lookup("API_BASE") {
            config.api_base = v;
        }
        if let Some(v) = lookup("API_KEY") {
            config.api_key = v;
        }
        if let Some(v) = lookup("TEMPERATURE") {
            config.temperature = parse_key("TEMPERATURE", v)?;
        }
        if let Some(v) = lookup("MAX_TOKENS") {
            config.max_tokens = parse_key("MAX_TOKENS", v)?;
        }
        if let Some(v) = lookup("ALPHA") {
            config.alpha = parse_key("ALPHA", v)?;
        }
        if let Some(v) = lookup("ROUNDS") {
            config.rounds = parse_key("ROUNDS", v)?;
        }
        if let Some(v) = lookup("USE_COT") {
            config.use_cot = parse_flag(&v);
        }
        if let Some(v) = lookup("AUTO_MODE") {
            config.auto_mode = v.parse()?;
        }
        if let Some(v) = lookup("ENABLE_DISK_CACHE") {
            config.enable_disk_cache = parse_flag(&v);
        }
        if let Some(v) = lookup("ENABLE_MEMORY_CACHE") {
            config.enable_memory_cache = parse_flag(&v);
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = parse_key("REQUEST_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = lookup("SEED") {
            config.seed = Some(parse_key("SEED", v)?);
        }

        Ok(config)
    }

    /// Copy of this configuration with a different truth anchoring weight
    pub fn with_alpha(&self, alpha: f64) -> Self {
        Self {
            alpha,
            ..self.clone()
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(ConfigError::Invalid(format!(
                "Alpha must be between 0.0 and 1.0, got {}",
                self.alpha
            )));
        }
        if self.rounds < 1 {
            return Err(ConfigError::Invalid(format!(
                "Rounds must be >= 1, got {}",
                self.rounds
            )));
        }
        if self.temperature.is_nan() || self.temperature < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "Temperature must be >= 0, got {}",
                self.temperature
            )));
        }
        if self.max_tokens < 1 {
            return Err(ConfigError::Invalid(format!(
                "Max tokens must be >= 1, got {}",
                self.max_tokens
            )));
        }
        if self.request_timeout_secs < 1 {
            return Err(ConfigError::Invalid(format!(
                "Request timeout must be >= 1 second, got {}",
                self.request_timeout_secs
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("Model must not be empty".to_string()));
        }

        tracing::info!(
            model = %self.model,
            alpha = self.alpha,
            rounds = self.rounds,
            use_cot = self.use_cot,
            auto_mode = %self.auto_mode,
            "Configuration validated"
        );
        Ok(())
    }
}
