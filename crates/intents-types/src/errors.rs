//! Error taxonomy shared by every SDK operation.
//!
//! Underlying chain-client, HTTP and codec failures are converted into an
//! [`IntentError`] at each service boundary, so callers branch on a typed
//! value rather than on panics or stringly errors.

use thiserror::Error;

use crate::{ChainType, SolverErrorCode};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentError {
	/// A provider or chain configuration payload is malformed.
	#[error("Invalid configuration: {0}")]
	InvalidConfiguration(String),
	/// A signing capability was requested on a read-only provider.
	#[error("{0} wallet not initialized")]
	WalletNotInitialized(ChainType),
	/// No swap order event exists in the inspected transaction.
	#[error("Swap order not found in transaction {tx_hash}")]
	OrderNotFound { tx_hash: String },
	/// A swap order event exists but its fields fail to parse.
	#[error("Malformed swap order data: {0}")]
	MalformedOrderData(String),
	/// The receipt was not available before the wait deadline.
	#[error("Transaction {tx_hash} not finalized after {waited_secs}s")]
	TransactionNotFinalized { tx_hash: String, waited_secs: u64 },
	/// The chain rejected or reverted the transaction.
	#[error("Transaction {} rejected by chain: {reason}", .tx_hash.as_deref().unwrap_or("<unsent>"))]
	TransactionFailed {
		tx_hash: Option<String>,
		reason: String,
	},
	/// The solver answered with one of its structured error codes.
	#[error("Solver error {code} ({}): {message}", .code.code())]
	Quote {
		code: SolverErrorCode,
		message: String,
	},
	/// The external wallet declined the signing request.
	#[error("Signing request rejected: {0}")]
	SigningRejected(String),
	/// The external wallet did not answer in time.
	#[error("Signing request timed out after {0}s")]
	SigningTimedOut(u64),
	/// A chain node could not be reached or answered with garbage.
	#[error("RPC error: {0}")]
	Rpc(String),
	/// A chain node answered with a JSON-RPC error object.
	#[error("RPC call {method} rejected ({code}): {message}")]
	RpcRejected {
		method: String,
		code: i64,
		message: String,
	},
	/// The solver HTTP API could not be reached or answered unexpectedly.
	#[error("HTTP error{}: {message}", .status.map(|s| format!(" {}", s)).unwrap_or_default())]
	Http {
		status: Option<u16>,
		message: String,
	},
	/// The intent is on chain but the solver was not told about it.
	///
	/// Retry the notification with `intent_tx_hash` instead of submitting
	/// again; the source funds are already locked.
	#[error("Intent {intent_tx_hash} submitted but solver notification failed: {source}")]
	NotifyFailed {
		intent_tx_hash: String,
		#[source]
		source: Box<IntentError>,
	},
	#[error("Unknown error: {0}")]
	Unknown(String),
}

impl IntentError {
	pub fn rpc(err: impl std::fmt::Display) -> Self {
		IntentError::Rpc(err.to_string())
	}

	pub fn malformed(err: impl std::fmt::Display) -> Self {
		IntentError::MalformedOrderData(err.to_string())
	}

	/// Whether retrying the same call later may succeed.
	///
	/// Network level failures and server side (5xx, 429) HTTP answers are
	/// transient. Node error objects, structured solver errors and chain
	/// rejections are not. A failed notification is as retryable as its
	/// cause.
	pub fn is_retryable(&self) -> bool {
		match self {
			IntentError::Rpc(_) => true,
			IntentError::NotifyFailed { source, .. } => source.is_retryable(),
			IntentError::Http { status: None, .. } => true,
			IntentError::Http {
				status: Some(status),
				..
			} => *status == 429 || *status >= 500,
			_ => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_retry_classification() {
		assert!(IntentError::Rpc("connection reset".into()).is_retryable());
		assert!(IntentError::Http {
			status: None,
			message: "timeout".into()
		}
		.is_retryable());
		assert!(IntentError::Http {
			status: Some(503),
			message: "unavailable".into()
		}
		.is_retryable());
		assert!(!IntentError::Http {
			status: Some(400),
			message: "bad request".into()
		}
		.is_retryable());
		assert!(!IntentError::Quote {
			code: SolverErrorCode::NoPathFound,
			message: "no path".into()
		}
		.is_retryable());
		assert!(!IntentError::WalletNotInitialized(ChainType::Evm).is_retryable());
		assert!(!IntentError::RpcRejected {
			method: "icx_getTransactionResult".into(),
			code: -32602,
			message: "Invalid params".into()
		}
		.is_retryable());
	}

	#[test]
	fn test_notify_failure_keeps_tx_hash() {
		let busy = IntentError::NotifyFailed {
			intent_tx_hash: "0xabc".into(),
			source: Box::new(IntentError::Http {
				status: Some(503),
				message: "busy".into(),
			}),
		};
		assert!(busy.is_retryable());
		assert_eq!(
			busy.to_string(),
			"Intent 0xabc submitted but solver notification failed: HTTP error 503: busy"
		);
		assert!(std::error::Error::source(&busy).is_some());

		let expired = IntentError::NotifyFailed {
			intent_tx_hash: "0xabc".into(),
			source: Box::new(IntentError::Quote {
				code: SolverErrorCode::QuoteNotFound,
				message: "quote expired".into(),
			}),
		};
		assert!(!expired.is_retryable());
	}

	#[test]
	fn test_error_messages() {
		let err = IntentError::TransactionFailed {
			tx_hash: None,
			reason: "execution reverted".into(),
		};
		assert_eq!(
			err.to_string(),
			"Transaction <unsent> rejected by chain: execution reverted"
		);

		let err = IntentError::Quote {
			code: SolverErrorCode::NoPathFound,
			message: "no path".into(),
		};
		assert_eq!(err.to_string(), "Solver error NO_PATH_FOUND (-4): no path");

		let err = IntentError::Http {
			status: Some(502),
			message: "bad gateway".into(),
		};
		assert_eq!(err.to_string(), "HTTP error 502: bad gateway");
		assert_eq!(
			IntentError::WalletNotInitialized(ChainType::Icon).to_string(),
			"icon wallet not initialized"
		);
	}
}
