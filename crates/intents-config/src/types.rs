//! Configuration file shape.

use intents_types::{ChainConfig, ChainName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentsConfig {
	pub solver: SolverSection,
	#[serde(default)]
	pub lifecycle: LifecycleSection,
	#[serde(default)]
	pub logging: LoggingSection,
	/// Chains keyed by name, e.g. `[chains.arb]`.
	#[serde(default)]
	pub chains: BTreeMap<ChainName, ChainEntry>,
}

impl IntentsConfig {
	pub fn chain(&self, name: ChainName) -> Option<&ChainEntry> {
		self.chains.get(&name)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverSection {
	pub api_endpoint: String,
	#[serde(default = "default_solver_timeout")]
	pub timeout_seconds: u64,
	/// Extra headers sent to the solver API, e.g. an API key.
	#[serde(default)]
	pub headers: BTreeMap<String, String>,
}

impl SolverSection {
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_seconds)
	}
}

fn default_solver_timeout() -> u64 {
	30
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleSection {
	/// Delay between solver status reads.
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	/// Overall time to wait for a terminal solver status.
	#[serde(default = "default_lifecycle_timeout")]
	pub timeout_seconds: u64,
	/// Time to wait for a transaction receipt in order lookups.
	#[serde(default = "default_receipt_timeout")]
	pub receipt_timeout_seconds: u64,
}

impl LifecycleSection {
	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}

	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_seconds)
	}

	pub fn receipt_timeout(&self) -> Duration {
		Duration::from_secs(self.receipt_timeout_seconds)
	}
}

impl Default for LifecycleSection {
	fn default() -> Self {
		Self {
			poll_interval_ms: default_poll_interval_ms(),
			timeout_seconds: default_lifecycle_timeout(),
			receipt_timeout_seconds: default_receipt_timeout(),
		}
	}
}

fn default_poll_interval_ms() -> u64 {
	2000
}

fn default_lifecycle_timeout() -> u64 {
	300
}

fn default_receipt_timeout() -> u64 {
	120
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
	#[serde(default = "default_log_level")]
	pub level: String,
}

impl Default for LoggingSection {
	fn default() -> Self {
		Self {
			level: default_log_level(),
		}
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

/// A configured chain: its static configuration plus node endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEntry {
	#[serde(flatten)]
	pub config: ChainConfig,
	pub rpc_url: String,
	/// ICON debug endpoint; derived from `rpc_url` when absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub debug_rpc_url: Option<String>,
}

impl ChainEntry {
	/// ICON debug endpoint, `/api/v3d` next to the main `/api/v3`.
	pub fn debug_rpc_url(&self) -> String {
		match &self.debug_rpc_url {
			Some(url) => url.clone(),
			None => match self.rpc_url.strip_suffix("/api/v3") {
				Some(base) => format!("{}/api/v3d", base),
				None => self.rpc_url.clone(),
			},
		}
	}
}
