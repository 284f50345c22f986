//! Out-of-band signing through an external wallet connector.
//!
//! An address-only wallet cannot sign locally. Transactions for it are
//! forwarded to a connector (browser extension bridge, hardware wallet
//! daemon, custody API) as JSON-RPC style requests, and the connector
//! answers with the broadcast transaction hash.

use async_trait::async_trait;
use intents_types::IntentError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default time a user gets to approve a request in their wallet.
pub const DEFAULT_SIGNING_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
	/// The user or the wallet declined the request.
	#[error("rejected: {0}")]
	Rejected(String),
	/// The connector itself failed.
	#[error("connector failure: {0}")]
	Failed(String),
}

/// A request forwarded to the wallet connector.
#[derive(Debug, Clone, PartialEq)]
pub struct SigningRequest {
	pub method: String,
	pub params: serde_json::Value,
}

/// Wallet connector able to sign and broadcast on behalf of an address.
#[async_trait]
pub trait ExternalSigner: Send + Sync {
	/// Forwards `request` and returns the connector's `result` value.
	async fn request(&self, request: SigningRequest) -> Result<serde_json::Value, ConnectorError>;
}

/// An address whose signing happens out-of-band.
#[derive(Clone)]
pub struct ExternalSignerHandle {
	address: String,
	connector: Arc<dyn ExternalSigner>,
	timeout: Duration,
}

impl fmt::Debug for ExternalSignerHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ExternalSignerHandle")
			.field("address", &self.address)
			.field("timeout", &self.timeout)
			.finish()
	}
}

impl ExternalSignerHandle {
	pub fn new(address: impl Into<String>, connector: Arc<dyn ExternalSigner>) -> Self {
		Self {
			address: address.into(),
			connector,
			timeout: DEFAULT_SIGNING_TIMEOUT,
		}
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn address(&self) -> &str {
		&self.address
	}

	/// Sends `method` to the connector and waits at most the configured
	/// timeout for the transaction hash it returns.
	pub async fn send(&self, method: &str, params: serde_json::Value) -> Result<String, IntentError> {
		tracing::info!(address = %self.address, method, "Requesting external signature");
		let request = SigningRequest {
			method: method.to_string(),
			params,
		};

		let result = tokio::time::timeout(self.timeout, self.connector.request(request))
			.await
			.map_err(|_| IntentError::SigningTimedOut(self.timeout.as_secs()))?
			.map_err(|e| match e {
				ConnectorError::Rejected(reason) => IntentError::SigningRejected(reason),
				ConnectorError::Failed(reason) => IntentError::Unknown(reason),
			})?;

		extract_hash(&result).ok_or_else(|| {
			IntentError::Unknown(format!("connector returned no transaction hash: {}", result))
		})
	}
}

/// Accepts either a bare hash string or an object carrying one.
fn extract_hash(result: &serde_json::Value) -> Option<String> {
	if let Some(hash) = result.as_str() {
		return Some(hash.to_string());
	}
	["txHash", "digest", "hash", "result"]
		.iter()
		.find_map(|key| result.get(key).and_then(|v| v.as_str()))
		.map(str::to_string)
}
