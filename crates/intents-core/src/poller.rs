//! Polling of solver task status.

use async_trait::async_trait;
use intents_solver::SolverApiClient;
use intents_types::{IntentError, IntentStatus};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::lifecycle::OrderLifecycle;

/// Anything able to read the status of a solver task.
#[async_trait]
pub trait StatusSource: Send + Sync {
	async fn get_status(&self, task_id: &str) -> Result<IntentStatus, IntentError>;
}

#[async_trait]
impl StatusSource for SolverApiClient {
	async fn get_status(&self, task_id: &str) -> Result<IntentStatus, IntentError> {
		SolverApiClient::get_status(self, task_id).await
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
	pub interval: Duration,
	pub timeout: Duration,
}

impl Default for PollPolicy {
	fn default() -> Self {
		Self {
			interval: Duration::from_secs(2),
			timeout: Duration::from_secs(300),
		}
	}
}

/// How a watch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult {
	/// The task reached SOLVED, FAILED or NOT_FOUND.
	Terminal(IntentStatus),
	/// The deadline passed first; `last` is the last status read, if any.
	TimedOut { last: Option<IntentStatus> },
}

#[derive(Debug, Clone, Default)]
pub struct StatusPoller {
	policy: PollPolicy,
}

impl StatusPoller {
	pub fn new(policy: PollPolicy) -> Self {
		Self { policy }
	}

	pub fn policy(&self) -> PollPolicy {
		self.policy
	}

	/// Polls the lifecycle's task until it is terminal or the timeout expires.
	///
	/// Retryable errors are logged and polled through without touching the
	/// lifecycle. Any other error ends the watch.
	pub async fn watch<S>(&self, source: &S, lifecycle: &mut OrderLifecycle) -> Result<PollResult, IntentError>
	where
		S: StatusSource + ?Sized,
	{
		let task_id = lifecycle
			.task_id()
			.ok_or_else(|| IntentError::Unknown("order has no solver task id yet".to_string()))?
			.to_string();
		let started = Instant::now();
		let mut last = None;

		loop {
			match source.get_status(&task_id).await {
				Ok(status) => {
					lifecycle
						.observe(&status)
						.map_err(|e| IntentError::Unknown(e.to_string()))?;
					if status.is_terminal() {
						info!(task_id = %task_id, %status, "Intent reached terminal status");
						return Ok(PollResult::Terminal(status));
					}
					debug!(task_id = %task_id, state = %lifecycle.state(), "Intent still in progress");
					last = Some(status);
				}
				Err(e) if e.is_retryable() => {
					warn!(task_id = %task_id, "Status read failed, retrying: {}", e);
				}
				Err(e) => return Err(e),
			}

			if started.elapsed() + self.policy.interval > self.policy.timeout {
				warn!(
					task_id = %task_id,
					state = %lifecycle.state(),
					"Gave up waiting after {}s",
					started.elapsed().as_secs()
				);
				return Ok(PollResult::TimedOut { last });
			}
			tokio::time::sleep(self.policy.interval).await;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lifecycle::OrderState;
	use std::collections::VecDeque;
	use std::sync::Mutex;

	/// Answers status reads from a script, repeating the last entry.
	struct Scripted(Mutex<VecDeque<Result<IntentStatus, IntentError>>>);

	impl Scripted {
		fn new(script: Vec<Result<IntentStatus, IntentError>>) -> Self {
			Self(Mutex::new(script.into()))
		}
	}

	#[async_trait]
	impl StatusSource for Scripted {
		async fn get_status(&self, _task_id: &str) -> Result<IntentStatus, IntentError> {
			let mut script = self.0.lock().unwrap();
			if script.len() > 1 {
				script.pop_front().unwrap()
			} else {
				script.front().cloned().unwrap()
			}
		}
	}

	fn policy() -> PollPolicy {
		PollPolicy {
			interval: Duration::from_secs(2),
			timeout: Duration::from_secs(30),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_transient_errors_do_not_regress() {
		let source = Scripted::new(vec![
			Ok(IntentStatus::NotStarted),
			Ok(IntentStatus::StartedNotFinished),
			Err(IntentError::Http {
				status: Some(502),
				message: "bad gateway".into(),
			}),
			Ok(IntentStatus::NotStarted),
			Ok(IntentStatus::Solved {
				tx_hash: "0xsettled".into(),
			}),
		]);
		let mut lifecycle = OrderLifecycle::resume("task-1");
		let result = StatusPoller::new(policy())
			.watch(&source, &mut lifecycle)
			.await
			.unwrap();

		assert_eq!(
			result,
			PollResult::Terminal(IntentStatus::Solved {
				tx_hash: "0xsettled".into()
			})
		);
		assert_eq!(lifecycle.state(), OrderState::Solved);
	}

	#[tokio::test(start_paused = true)]
	async fn test_not_found_stops_polling() {
		let source = Scripted::new(vec![Ok(IntentStatus::NotFound)]);
		let mut lifecycle = OrderLifecycle::resume("expired");
		let result = StatusPoller::new(policy())
			.watch(&source, &mut lifecycle)
			.await
			.unwrap();
		assert_eq!(result, PollResult::Terminal(IntentStatus::NotFound));
		assert_eq!(lifecycle.state(), OrderState::NotFound);
	}

	#[tokio::test(start_paused = true)]
	async fn test_times_out_with_last_status() {
		let source = Scripted::new(vec![Ok(IntentStatus::StartedNotFinished)]);
		let mut lifecycle = OrderLifecycle::resume("slow");
		let result = StatusPoller::new(policy())
			.watch(&source, &mut lifecycle)
			.await
			.unwrap();
		assert_eq!(
			result,
			PollResult::TimedOut {
				last: Some(IntentStatus::StartedNotFinished)
			}
		);
		assert_eq!(lifecycle.state(), OrderState::StartedNotFinished);
	}

	#[tokio::test(start_paused = true)]
	async fn test_permanent_error_is_returned() {
		let source = Scripted::new(vec![Err(IntentError::Http {
			status: Some(401),
			message: "unauthorized".into(),
		})]);
		let mut lifecycle = OrderLifecycle::resume("t");
		let err = StatusPoller::new(policy())
			.watch(&source, &mut lifecycle)
			.await
			.unwrap_err();
		assert!(matches!(err, IntentError::Http { status: Some(401), .. }));
	}

	#[tokio::test]
	async fn test_requires_task_id() {
		let source = Scripted::new(vec![Ok(IntentStatus::NotStarted)]);
		let mut lifecycle = OrderLifecycle::quoted("q");
		assert!(StatusPoller::default()
			.watch(&source, &mut lifecycle)
			.await
			.is_err());
	}
}
