//! Minimal JSON-RPC 2.0 client over HTTP.

use intents_types::IntentError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Failure of a single JSON-RPC call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcFailure {
	/// The endpoint could not be reached or answered with garbage.
	#[error("{method}: {message}")]
	Transport { method: String, message: String },
	/// The node answered with a JSON-RPC error object.
	#[error("{method} failed ({code}): {message}")]
	Node {
		method: String,
		code: i64,
		message: String,
	},
}

impl From<RpcFailure> for IntentError {
	fn from(failure: RpcFailure) -> Self {
		match failure {
			RpcFailure::Transport { .. } => IntentError::Rpc(failure.to_string()),
			RpcFailure::Node {
				method,
				code,
				message,
			} => IntentError::RpcRejected {
				method,
				code,
				message,
			},
		}
	}
}

impl RpcFailure {
	/// Maps a failed submission: a node error means the chain rejected the
	/// transaction before it got a hash.
	pub fn into_rejection(self) -> IntentError {
		match self {
			RpcFailure::Node { message, .. } => IntentError::TransactionFailed {
				tx_hash: None,
				reason: message,
			},
			transport => transport.into(),
		}
	}
}

#[derive(Deserialize)]
struct RpcResponse<T> {
	result: Option<T>,
	error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
	code: i64,
	#[serde(default)]
	message: String,
}

#[derive(Debug)]
pub struct JsonRpcClient {
	http: reqwest::Client,
	url: String,
	next_id: AtomicU64,
}

impl JsonRpcClient {
	pub fn new(url: impl Into<String>) -> Result<Self, IntentError> {
		let url = url.into();
		if !(url.starts_with("http://") || url.starts_with("https://")) {
			return Err(IntentError::InvalidConfiguration(format!(
				"RPC URL must start with http:// or https://: {}",
				url
			)));
		}
		let http = reqwest::Client::builder()
			.timeout(Duration::from_secs(30))
			.build()
			.map_err(|e| IntentError::InvalidConfiguration(format!("HTTP client: {}", e)))?;
		Ok(Self {
			http,
			url,
			next_id: AtomicU64::new(1),
		})
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	/// Calls `method` and deserializes its `result`.
	pub async fn call<T: DeserializeOwned>(
		&self,
		method: &str,
		params: serde_json::Value,
	) -> Result<T, RpcFailure> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let transport = |message: String| RpcFailure::Transport {
			method: method.to_string(),
			message,
		};

		tracing::debug!(method, id, url = %self.url, "JSON-RPC request");
		let response = self
			.http
			.post(&self.url)
			.json(&serde_json::json!({
				"jsonrpc": "2.0",
				"id": id,
				"method": method,
				"params": params,
			}))
			.send()
			.await
			.map_err(|e| transport(format!("request failed: {}", e)))?;

		// Nodes commonly return error objects with non-2xx statuses, so the
		// body is parsed before the status is considered.
		let status = response.status();
		let body: RpcResponse<T> = response
			.json()
			.await
			.map_err(|e| transport(format!("invalid response (HTTP {}): {}", status, e)))?;

		if let Some(error) = body.error {
			return Err(RpcFailure::Node {
				method: method.to_string(),
				code: error.code,
				message: error.message,
			});
		}
		body.result
			.ok_or_else(|| transport("response carries neither result nor error".to_string()))
	}
}
