//! Configuration loading for the chainreq service.
//!
//! Configuration files may be TOML, JSON or YAML (picked by extension).
//! `${VAR}` placeholders are replaced from the environment before parsing,
//! a few settings can be overridden with `CHAINREQ_*` variables, and the
//! result is validated before it is handed to the service.

use regex::Regex;
use std::collections::HashSet;
use std::env;
use std::path::Path;
use thiserror::Error;

mod serde_helpers;
pub mod types;

pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
	Toml,
	Json,
	Yaml,
}

impl Format {
	fn from_path(path: &str) -> Self {
		match Path::new(path).extension().and_then(|s| s.to_str()) {
			Some("json") => Format::Json,
			Some("yaml") | Some("yml") => Format::Yaml,
			_ => Format::Toml,
		}
	}
}

/// Configuration loader with environment variable substitution
#[derive(Default)]
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "CHAINREQ_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<Config, ConfigError> {
		let mut config = if let Some(file_path) = &self.file_path {
			self.load_from_file(file_path).await?
		} else {
			return Err(ConfigError::FileNotFound(
				"No configuration file specified".to_string(),
			));
		};

		self.apply_env_overrides(&mut config)?;
		self.validate_config(&config)?;

		Ok(config)
	}

	async fn load_from_file(&self, file_path: &str) -> Result<Config, ConfigError> {
		if !Path::new(file_path).exists() {
			return Err(ConfigError::FileNotFound(file_path.to_string()));
		}

		let content = tokio::fs::read_to_string(file_path).await?;
		let substituted_content = self.substitute_env_vars(&content)?;

		tracing::debug!(path = %file_path, "Parsing configuration file");

		match Format::from_path(file_path) {
			Format::Toml => toml::from_str(&substituted_content)
				.map_err(|e| ConfigError::ParseError(e.to_string())),
			Format::Json => serde_json::from_str(&substituted_content)
				.map_err(|e| ConfigError::ParseError(e.to_string())),
			Format::Yaml => serde_yaml::from_str(&substituted_content)
				.map_err(|e| ConfigError::ParseError(e.to_string())),
		}
	}

	fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
		let mut result = content.to_string();

		// Find and replace ${VAR_NAME} patterns
		let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
			.map_err(|e| ConfigError::ParseError(e.to_string()))?;

		for cap in re.captures_iter(content) {
			let full_match = &cap[0];
			let var_name = &cap[1];

			let env_value = env::var(var_name)
				.map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

			result = result.replace(full_match, &env_value);
		}

		Ok(result)
	}

	fn apply_env_overrides(&self, config: &mut Config) -> Result<(), ConfigError> {
		if let Ok(log_level) = env::var(format!("{}LOG_LEVEL", self.env_prefix)) {
			config.service.log_level = log_level;
		}

		if let Ok(http_host) = env::var(format!("{}HTTP_HOST", self.env_prefix)) {
			config.service.http_host = http_host;
		}

		if let Ok(http_port) = env::var(format!("{}HTTP_PORT", self.env_prefix)) {
			config.service.http_port = http_port
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid HTTP port: {}", e)))?;
		}

		Ok(())
	}

	fn validate_config(&self, config: &Config) -> Result<(), ConfigError> {
		if config.chains.is_empty() {
			return Err(ConfigError::ValidationError(
				"At least one chain must be configured".to_string(),
			));
		}

		for (chain_id, chain) in &config.chains {
			if !is_http_url(&chain.rpc_url) {
				return Err(ConfigError::ValidationError(format!(
					"RPC URL of chain {} must start with http:// or https://",
					chain_id
				)));
			}
		}

		let mut api_keys = HashSet::new();

		for project in &config.projects {
			if !config.chains.contains_key(&project.chain_id) {
				return Err(ConfigError::ValidationError(format!(
					"Project {} uses chain {} which is not configured",
					project.id, project.chain_id
				)));
			}

			if project.api_key.is_empty() || !api_keys.insert(project.api_key.as_str()) {
				return Err(ConfigError::ValidationError(format!(
					"Project {} must have a unique, non-empty API key",
					project.id
				)));
			}

			if let Some(url) = &project.custom_rpc_url {
				if !is_http_url(url) {
					return Err(ConfigError::ValidationError(format!(
						"Custom RPC URL of project {} must start with http:// or https://",
						project.id
					)));
				}
			}
		}

		if !matches!(config.storage.backend.as_str(), "memory" | "file") {
			return Err(ConfigError::ValidationError(format!(
				"Unknown storage backend: {}",
				config.storage.backend
			)));
		}

		Ok(())
	}
}

fn is_http_url(url: &str) -> bool {
	url.starts_with("http://") || url.starts_with("https://")
}
