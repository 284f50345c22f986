//! Order lifecycle state machine.
//!
//! ```text
//! Quoted -> Submitted -> {NotStarted, StartedNotFinished} -> {Solved | Failed}
//!                    \______________________________________/ NotFound
//! ```
//!
//! NotFound, Solved and Failed are terminal. A status read that would move
//! the order backwards is ignored, so a flapping solver never regresses a
//! tracked order.

use intents_types::IntentStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
	Quoted,
	Submitted,
	NotStarted,
	StartedNotFinished,
	Solved,
	Failed,
	NotFound,
}

impl OrderState {
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Solved | Self::Failed | Self::NotFound)
	}

	/// Progress order used to detect regressions among live states.
	fn rank(&self) -> u8 {
		match self {
			Self::Quoted => 0,
			Self::Submitted => 1,
			Self::NotStarted => 2,
			Self::StartedNotFinished => 3,
			Self::Solved | Self::Failed | Self::NotFound => 4,
		}
	}
}

impl From<&IntentStatus> for OrderState {
	fn from(status: &IntentStatus) -> Self {
		match status {
			IntentStatus::NotFound => Self::NotFound,
			IntentStatus::NotStarted => Self::NotStarted,
			IntentStatus::StartedNotFinished => Self::StartedNotFinished,
			IntentStatus::Solved { .. } => Self::Solved,
			IntentStatus::Failed => Self::Failed,
		}
	}
}

impl fmt::Display for OrderState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Quoted => write!(f, "QUOTED"),
			Self::Submitted => write!(f, "SUBMITTED"),
			Self::NotStarted => write!(f, "NOT_STARTED"),
			Self::StartedNotFinished => write!(f, "STARTED_NOT_FINISHED"),
			Self::Solved => write!(f, "SOLVED"),
			Self::Failed => write!(f, "FAILED"),
			Self::NotFound => write!(f, "NOT_FOUND"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
	#[error("Invalid order transition from {from} to {to}")]
	InvalidTransition { from: OrderState, to: OrderState },
	#[error("Order is {0}; submission details are only set once")]
	AlreadySubmitted(OrderState),
}

/// Tracks one order from its quote to a terminal solver status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLifecycle {
	state: OrderState,
	quote_uuid: String,
	intent_tx_hash: Option<String>,
	task_id: Option<String>,
	settlement_tx_hash: Option<String>,
}

impl OrderLifecycle {
	pub fn quoted(quote_uuid: impl Into<String>) -> Self {
		Self {
			state: OrderState::Quoted,
			quote_uuid: quote_uuid.into(),
			intent_tx_hash: None,
			task_id: None,
			settlement_tx_hash: None,
		}
	}

	/// Resumes tracking of a task that was submitted elsewhere.
	pub fn resume(task_id: impl Into<String>) -> Self {
		Self {
			state: OrderState::Submitted,
			quote_uuid: String::new(),
			intent_tx_hash: None,
			task_id: Some(task_id.into()),
			settlement_tx_hash: None,
		}
	}

	pub fn state(&self) -> OrderState {
		self.state
	}

	pub fn quote_uuid(&self) -> &str {
		&self.quote_uuid
	}

	pub fn intent_tx_hash(&self) -> Option<&str> {
		self.intent_tx_hash.as_deref()
	}

	pub fn task_id(&self) -> Option<&str> {
		self.task_id.as_deref()
	}

	pub fn settlement_tx_hash(&self) -> Option<&str> {
		self.settlement_tx_hash.as_deref()
	}

	/// Records the source-chain submission and the solver's task id.
	pub fn submitted(
		&mut self,
		intent_tx_hash: impl Into<String>,
		task_id: impl Into<String>,
	) -> Result<(), LifecycleError> {
		if self.state != OrderState::Quoted {
			return Err(LifecycleError::AlreadySubmitted(self.state));
		}
		self.intent_tx_hash = Some(intent_tx_hash.into());
		self.task_id = Some(task_id.into());
		self.set_state(OrderState::Submitted)
	}

	/// Applies a status read. Returns whether the state changed.
	pub fn observe(&mut self, status: &IntentStatus) -> Result<bool, LifecycleError> {
		let next = OrderState::from(status);
		if next == self.state {
			return Ok(false);
		}
		if !self.state.is_terminal() && !next.is_terminal() && next.rank() < self.state.rank() {
			debug!(current = %self.state, reported = %next, "Ignoring status regression");
			return Ok(false);
		}
		self.set_state(next)?;
		if let Some(hash) = status.settlement_tx_hash() {
			self.settlement_tx_hash = Some(hash.to_string());
		}
		Ok(true)
	}

	fn set_state(&mut self, to: OrderState) -> Result<(), LifecycleError> {
		let from = self.state;
		if !is_valid_transition(from, to) {
			return Err(LifecycleError::InvalidTransition { from, to });
		}
		self.state = to;
		info!(task_id = ?self.task_id, "Order state changed: {} -> {}", from, to);
		Ok(())
	}
}

fn is_valid_transition(from: OrderState, to: OrderState) -> bool {
	use OrderState::*;

	match (from, to) {
		(Quoted, Submitted) => true,
		(Submitted, NotStarted | StartedNotFinished) => true,
		(NotStarted, StartedNotFinished) => true,
		(Submitted | NotStarted | StartedNotFinished, Solved | Failed | NotFound) => true,
		_ => false,
	}
}
