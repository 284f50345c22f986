//! Request and response types of the solver HTTP API.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::serde_helpers::amount_string;
use crate::Amount;

/// Whether the quoted amount is the output for a fixed input or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteType {
	ExactInput,
	ExactOutput,
}

/// Body of `POST /quote`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
	pub token_src: String,
	pub token_src_blockchain_id: String,
	pub token_dst: String,
	pub token_dst_blockchain_id: String,
	#[serde(with = "amount_string")]
	pub amount: Amount,
	pub quote_type: QuoteType,
}

/// A price quote and its correlation id.
///
/// The `uuid` must be embedded unmodified into the intent's auxiliary data
/// so the solver can match the execution to this quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
	#[serde(with = "amount_string")]
	pub quoted_amount: Amount,
	pub uuid: String,
}

/// Body of `POST /execute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
	pub intent_tx_hash: String,
	pub quote_uuid: String,
}

/// Successful answer of `POST /execute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResponse {
	pub answer: String,
	pub task_id: String,
}

/// Raw answer of `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
	pub status: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tx_hash: Option<String>,
}

/// Numeric status codes reported by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentStatusCode {
	NotFound = -1,
	NotStarted = 1,
	StartedNotFinished = 2,
	Solved = 3,
	Failed = 4,
}

impl IntentStatusCode {
	pub fn from_code(code: i64) -> Option<Self> {
		match code {
			-1 => Some(IntentStatusCode::NotFound),
			1 => Some(IntentStatusCode::NotStarted),
			2 => Some(IntentStatusCode::StartedNotFinished),
			3 => Some(IntentStatusCode::Solved),
			4 => Some(IntentStatusCode::Failed),
			_ => None,
		}
	}

	pub fn code(&self) -> i64 {
		*self as i64
	}
}

/// Solver-side state of an intent task.
///
/// Only [`IntentStatus::Solved`] carries the settlement transaction hash on
/// the destination chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentStatus {
	NotFound,
	NotStarted,
	StartedNotFinished,
	Solved { tx_hash: String },
	Failed,
}

impl IntentStatus {
	pub fn code(&self) -> IntentStatusCode {
		match self {
			IntentStatus::NotFound => IntentStatusCode::NotFound,
			IntentStatus::NotStarted => IntentStatusCode::NotStarted,
			IntentStatus::StartedNotFinished => IntentStatusCode::StartedNotFinished,
			IntentStatus::Solved { .. } => IntentStatusCode::Solved,
			IntentStatus::Failed => IntentStatusCode::Failed,
		}
	}

	/// SOLVED, FAILED and NOT_FOUND admit no further transitions.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			IntentStatus::Solved { .. } | IntentStatus::Failed | IntentStatus::NotFound
		)
	}

	pub fn is_success(&self) -> bool {
		matches!(self, IntentStatus::Solved { .. })
	}

	pub fn settlement_tx_hash(&self) -> Option<&str> {
		match self {
			IntentStatus::Solved { tx_hash } => Some(tx_hash),
			_ => None,
		}
	}
}

impl fmt::Display for IntentStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			IntentStatus::NotFound => f.write_str("NOT_FOUND"),
			IntentStatus::NotStarted => f.write_str("NOT_STARTED"),
			IntentStatus::StartedNotFinished => f.write_str("STARTED_NOT_FINISHED"),
			IntentStatus::Solved { tx_hash } => write!(f, "SOLVED ({})", tx_hash),
			IntentStatus::Failed => f.write_str("FAILED"),
		}
	}
}

/// Structured error codes returned by the solver.
///
/// The solver documents `-8` for both `NOT_ENOUGH_PRIVATE_LIQUIDITY` and
/// `QUOTE_NOT_FOUND`. Here `NOT_ENOUGH_PRIVATE_LIQUIDITY` owns `-6`, and a
/// wire `-8` is resolved by the endpoint that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverErrorCode {
	NoPathFound,
	NoPrivateLiquidity,
	NotEnoughPrivateLiquidity,
	NoExecutionModuleFound,
	QuoteNotFound,
	CreateIntentOrderFailed,
	Unknown,
}

/// Endpoint that produced a solver error, used to resolve the `-8` collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverEndpoint {
	Quote,
	Execute,
	Status,
}

impl SolverErrorCode {
	pub fn code(&self) -> i64 {
		match self {
			SolverErrorCode::NoPathFound => -4,
			SolverErrorCode::NoPrivateLiquidity => -5,
			SolverErrorCode::NotEnoughPrivateLiquidity => -6,
			SolverErrorCode::NoExecutionModuleFound => -7,
			SolverErrorCode::QuoteNotFound => -8,
			SolverErrorCode::CreateIntentOrderFailed => -998,
			SolverErrorCode::Unknown => -999,
		}
	}

	/// Maps a wire code to an error code in the context of `endpoint`.
	///
	/// A quote cannot reference an unknown quote uuid, so `-8` from
	/// `/quote` is a liquidity shortfall; everywhere else it is
	/// `QUOTE_NOT_FOUND`. Unrecognised codes map to `UNKNOWN`.
	pub fn from_wire(code: i64, endpoint: SolverEndpoint) -> Self {
		match code {
			-4 => SolverErrorCode::NoPathFound,
			-5 => SolverErrorCode::NoPrivateLiquidity,
			-6 => SolverErrorCode::NotEnoughPrivateLiquidity,
			-7 => SolverErrorCode::NoExecutionModuleFound,
			-8 if endpoint == SolverEndpoint::Quote => {
				tracing::warn!(
					"Solver returned ambiguous code -8 on /quote, treating as NOT_ENOUGH_PRIVATE_LIQUIDITY"
				);
				SolverErrorCode::NotEnoughPrivateLiquidity
			}
			-8 => SolverErrorCode::QuoteNotFound,
			-998 => SolverErrorCode::CreateIntentOrderFailed,
			_ => SolverErrorCode::Unknown,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			SolverErrorCode::NoPathFound => "NO_PATH_FOUND",
			SolverErrorCode::NoPrivateLiquidity => "NO_PRIVATE_LIQUIDITY",
			SolverErrorCode::NotEnoughPrivateLiquidity => "NOT_ENOUGH_PRIVATE_LIQUIDITY",
			SolverErrorCode::NoExecutionModuleFound => "NO_EXECUTION_MODULE_FOUND",
			SolverErrorCode::QuoteNotFound => "QUOTE_NOT_FOUND",
			SolverErrorCode::CreateIntentOrderFailed => "CREATE_INTENT_ORDER_FAILED",
			SolverErrorCode::Unknown => "UNKNOWN",
		}
	}
}

impl fmt::Display for SolverErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error body returned by the solver: `{"detail": {"code": .., "message": ..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverErrorResponse {
	pub detail: SolverErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverErrorDetail {
	pub code: i64,
	#[serde(default)]
	pub message: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_quote_request_wire_format() {
		let request = QuoteRequest {
			token_src: "0x0000000000000000000000000000000000000000".into(),
			token_src_blockchain_id: "0xa4b1.arbitrum".into(),
			token_dst: "0x0000000000000000000000000000000000000000".into(),
			token_dst_blockchain_id: "0x89.polygon".into(),
			amount: Amount::from(10u64).pow(Amount::from(18u64)),
			quote_type: QuoteType::ExactInput,
		};
		let json = serde_json::to_value(&request).unwrap();
		assert_eq!(json["amount"], "1000000000000000000");
		assert_eq!(json["quote_type"], "exact_input");
	}

	#[test]
	fn test_quote_parses_large_amounts() {
		let quote: Quote = serde_json::from_str(
			r#"{"quoted_amount":"340282366920938463463374607431768211455","uuid":"abc"}"#,
		)
		.unwrap();
		assert_eq!(quote.quoted_amount, Amount::from(u128::MAX));
		assert_eq!(quote.uuid, "abc");
	}

	#[test]
	fn test_status_codes() {
		assert_eq!(IntentStatusCode::from_code(-1), Some(IntentStatusCode::NotFound));
		assert_eq!(IntentStatusCode::from_code(3), Some(IntentStatusCode::Solved));
		assert_eq!(IntentStatusCode::from_code(0), None);
		assert_eq!(IntentStatusCode::Failed.code(), 4);

		assert!(IntentStatus::NotFound.is_terminal());
		assert!(IntentStatus::Failed.is_terminal());
		assert!(IntentStatus::Solved {
			tx_hash: "0x1".into()
		}
		.is_terminal());
		assert!(!IntentStatus::NotStarted.is_terminal());
		assert!(!IntentStatus::StartedNotFinished.is_terminal());
		assert!(!IntentStatus::NotFound.is_success());
	}

	#[test]
	fn test_duplicate_error_code_resolution() {
		assert_eq!(
			SolverErrorCode::from_wire(-8, SolverEndpoint::Quote),
			SolverErrorCode::NotEnoughPrivateLiquidity
		);
		assert_eq!(
			SolverErrorCode::from_wire(-8, SolverEndpoint::Execute),
			SolverErrorCode::QuoteNotFound
		);
		assert_eq!(
			SolverErrorCode::from_wire(-6, SolverEndpoint::Execute),
			SolverErrorCode::NotEnoughPrivateLiquidity
		);
		assert_eq!(
			SolverErrorCode::from_wire(-42, SolverEndpoint::Status),
			SolverErrorCode::Unknown
		);

		let codes = [
			SolverErrorCode::NoPathFound,
			SolverErrorCode::NoPrivateLiquidity,
			SolverErrorCode::NotEnoughPrivateLiquidity,
			SolverErrorCode::NoExecutionModuleFound,
			SolverErrorCode::QuoteNotFound,
			SolverErrorCode::CreateIntentOrderFailed,
			SolverErrorCode::Unknown,
		];
		let mut numeric: Vec<i64> = codes.iter().map(|c| c.code()).collect();
		numeric.sort();
		numeric.dedup();
		assert_eq!(numeric.len(), codes.len());
	}
}
