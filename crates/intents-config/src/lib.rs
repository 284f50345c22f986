//! Configuration loading for the intents SDK.
//!
//! Files may be TOML, JSON or YAML. `${VAR}` and `${VAR:-default}`
//! occurrences are substituted from the environment before parsing, each
//! `[chains.<name>]` table is schema-checked for its chain family, and
//! `<PREFIX>SOLVER_API_ENDPOINT` / `<PREFIX>LOG_LEVEL` override the file.

pub mod types;

pub use types::*;

use intents_types::validation::{ChainTableSchema, ConfigSchema, ValidationError};
use intents_types::{ChainName, ChainType};
use regex::Regex;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Invalid chain '{chain}': {source}")]
	Chain {
		chain: String,
		#[source]
		source: ValidationError,
	},

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Configuration loader with environment variable substitution.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
	file_path: Option<PathBuf>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "INTENTS_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_path_buf());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub fn load(&self) -> Result<IntentsConfig, ConfigError> {
		let path = self.file_path.as_ref().ok_or_else(|| {
			ConfigError::FileNotFound("No configuration file specified".to_string())
		})?;
		if !path.exists() {
			return Err(ConfigError::FileNotFound(path.display().to_string()));
		}
		info!("Loading configuration from {:?}", path);

		let content = std::fs::read_to_string(path)?;
		let substituted = substitute_env_vars(&content)?;
		let format = path.extension().and_then(|s| s.to_str()).unwrap_or_default();
		let mut config = self.load_from_str(&substituted, format)?;
		self.apply_env_overrides(&mut config);
		validate_config(&config)?;
		Ok(config)
	}

	/// Parses already substituted `content` in the given format
	/// (`toml`, `json`, `yaml` or `yml`) and schema-checks the chain tables.
	pub fn load_from_str(&self, content: &str, format: &str) -> Result<IntentsConfig, ConfigError> {
		let mut raw: toml::Value = match format {
			"toml" => toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?,
			"json" => {
				serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?
			}
			"yaml" | "yml" => {
				serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?
			}
			other => {
				return Err(ConfigError::ParseError(format!(
					"Unsupported config format: {:?}",
					other
				)))
			}
		};

		if let Some(chains) = raw.get_mut("chains").and_then(|c| c.as_table_mut()) {
			for (key, table) in chains.iter_mut() {
				check_chain_table(key, table)?;
			}
		}

		raw.try_into()
			.map_err(|e: toml::de::Error| ConfigError::ParseError(e.to_string()))
	}

	fn apply_env_overrides(&self, config: &mut IntentsConfig) {
		if let Ok(endpoint) = env::var(format!("{}SOLVER_API_ENDPOINT", self.env_prefix)) {
			debug!("Overriding solver endpoint from environment");
			config.solver.api_endpoint = endpoint;
		}
		if let Ok(level) = env::var(format!("{}LOG_LEVEL", self.env_prefix)) {
			debug!("Overriding log level from environment");
			config.logging.level = level;
		}
	}
}

/// Checks one `[chains.<key>]` table and fills `chain` from the key.
fn check_chain_table(key: &str, table: &mut toml::Value) -> Result<(), ConfigError> {
	let chain: ChainName = key
		.parse()
		.map_err(|e| ConfigError::ValidationError(format!("{}", e)))?;
	if chain.as_str() != key {
		return Err(ConfigError::ValidationError(format!(
			"chain table '{}' must be named '{}'",
			key, chain
		)));
	}
	let chain_type = match table.get("type").and_then(|t| t.as_str()) {
		Some("evm") => ChainType::Evm,
		Some("sui") => ChainType::Sui,
		Some("icon") => ChainType::Icon,
		Some(other) => {
			return Err(ConfigError::ValidationError(format!(
				"chain '{}' has unknown type '{}'",
				key, other
			)))
		}
		None => chain.chain_type(),
	};
	if chain_type != chain.chain_type() {
		return Err(ConfigError::ValidationError(format!(
			"chain '{}' is a {} chain, not {}",
			key,
			chain.chain_type(),
			chain_type
		)));
	}

	ChainTableSchema::new(chain_type)
		.validate(table)
		.map_err(|source| ConfigError::Chain {
			chain: key.to_string(),
			source,
		})?;

	if let Some(fields) = table.as_table_mut() {
		if !fields.contains_key("type") {
			fields.insert("type".into(), toml::Value::String(chain_type.to_string()));
		}
		fields.insert("chain".into(), toml::Value::String(chain.as_str().to_string()));
	}
	Ok(())
}

/// Replaces `${VAR}` with the value of `VAR`, or with `default` for
/// `${VAR:-default}` when `VAR` is unset.
pub fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
		.map_err(|e| ConfigError::ParseError(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(content.len());
	let mut last = 0;
	for cap in re.captures_iter(content) {
		let Some(full) = cap.get(0) else { continue };
		let name = &cap[1];
		let value = match (env::var(name), cap.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => return Err(ConfigError::EnvVarNotFound(name.to_string())),
		};
		result.push_str(&content[last..full.start()]);
		result.push_str(&value);
		last = full.end();
	}
	result.push_str(&content[last..]);
	Ok(result)
}

fn validate_config(config: &IntentsConfig) -> Result<(), ConfigError> {
	let endpoint = &config.solver.api_endpoint;
	if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
		return Err(ConfigError::ValidationError(format!(
			"solver.api_endpoint must be an http(s) URL, got '{}'",
			endpoint
		)));
	}
	if config.solver.timeout_seconds == 0 {
		return Err(ConfigError::ValidationError(
			"solver.timeout_seconds must be positive".to_string(),
		));
	}

	let lifecycle = &config.lifecycle;
	if lifecycle.poll_interval_ms == 0 || lifecycle.poll_interval() >= lifecycle.timeout() {
		return Err(ConfigError::ValidationError(format!(
			"lifecycle.poll_interval_ms ({}) must be positive and below the timeout ({}s)",
			lifecycle.poll_interval_ms, lifecycle.timeout_seconds
		)));
	}
	if lifecycle.receipt_timeout_seconds == 0 {
		return Err(ConfigError::ValidationError(
			"lifecycle.receipt_timeout_seconds must be positive".to_string(),
		));
	}

	for (name, entry) in &config.chains {
		if entry.config.chain() != *name {
			return Err(ConfigError::ValidationError(format!(
				"chain table '{}' describes {}",
				name,
				entry.config.chain()
			)));
		}
	}
	Ok(())
}
