//! Bounded waiting for transaction finality.

use intents_types::IntentError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// How long and how often to poll for a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
	pub timeout: Duration,
	pub interval: Duration,
}

impl Default for WaitPolicy {
	fn default() -> Self {
		Self {
			timeout: Duration::from_secs(120),
			interval: Duration::from_secs(2),
		}
	}
}

impl WaitPolicy {
	pub fn new(timeout: Duration, interval: Duration) -> Self {
		Self { timeout, interval }
	}
}

/// Shortens a hash for log output.
pub(crate) fn truncate_hash(hash: &str) -> String {
	match hash.char_indices().nth(12) {
		Some((end, _)) => format!("{}..", &hash[..end]),
		None => hash.to_string(),
	}
}

/// Polls `fetch` until it yields a value or the policy's timeout expires.
///
/// `Ok(None)` means "not available yet". Retryable errors, which are
/// transport failures, are logged and polled through. Any other error,
/// including a node error object, ends the wait at once. Expiry is
/// reported as `TransactionNotFinalized`.
pub async fn wait_for<T, F, Fut>(tx_hash: &str, policy: WaitPolicy, mut fetch: F) -> Result<T, IntentError>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<Option<T>, IntentError>>,
{
	let started = Instant::now();
	let mut attempts = 0u32;
	loop {
		attempts += 1;
		match fetch().await {
			Ok(Some(value)) => {
				debug!(
					tx_hash = %truncate_hash(tx_hash),
					attempts,
					"Transaction finalized after {}ms",
					started.elapsed().as_millis()
				);
				return Ok(value);
			}
			Ok(None) => debug!(tx_hash = %truncate_hash(tx_hash), attempts, "Transaction not final yet"),
			Err(e) if e.is_retryable() => {
				warn!(tx_hash = %truncate_hash(tx_hash), attempts, "Receipt lookup failed, retrying: {}", e)
			}
			Err(e) => return Err(e),
		}

		if started.elapsed() + policy.interval > policy.timeout {
			return Err(IntentError::TransactionNotFinalized {
				tx_hash: tx_hash.to_string(),
				waited_secs: started.elapsed().as_secs(),
			});
		}
		tokio::time::sleep(policy.interval).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};

	#[tokio::test(start_paused = true)]
	async fn test_returns_once_available() {
		let calls = AtomicU32::new(0);
		let value = wait_for("0xabc", WaitPolicy::default(), || async {
			let n = calls.fetch_add(1, Ordering::SeqCst);
			match n {
				0 => Ok(None),
				1 => Err(IntentError::Rpc("connection reset".into())),
				_ => Ok(Some(n)),
			}
		})
		.await
		.unwrap();
		assert_eq!(value, 2);
	}

	#[tokio::test(start_paused = true)]
	async fn test_times_out_with_distinct_error() {
		let policy = WaitPolicy::new(Duration::from_secs(10), Duration::from_secs(3));
		let err = wait_for::<(), _, _>("0xabc", policy, || async { Ok(None) })
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			IntentError::TransactionNotFinalized { ref tx_hash, waited_secs } if tx_hash == "0xabc" && waited_secs <= 10
		));
	}

	#[tokio::test(start_paused = true)]
	async fn test_permanent_error_stops_waiting() {
		let err = wait_for::<(), _, _>("0xabc", WaitPolicy::default(), || async {
			Err(IntentError::MalformedOrderData("bad".into()))
		})
		.await
		.unwrap_err();
		assert_eq!(err, IntentError::MalformedOrderData("bad".into()));
	}

	#[test]
	fn test_truncate_hash() {
		assert_eq!(truncate_hash("0xabc"), "0xabc");
		assert_eq!(
			truncate_hash("0x0123456789abcdef0123456789abcdef"),
			"0x0123456789.."
		);
		assert_eq!(truncate_hash("0x1ééééééé"), "0x1ééééééé");
		assert_eq!(truncate_hash("0x1éééééééééééé"), "0x1ééééééééé..");
	}

	#[tokio::test(start_paused = true)]
	async fn test_node_rejection_stops_waiting() {
		let calls = AtomicU32::new(0);
		let err = wait_for::<(), _, _>("0x1234", WaitPolicy::default(), || async {
			calls.fetch_add(1, Ordering::SeqCst);
			Err(IntentError::RpcRejected {
				method: "icx_getTransactionResult".into(),
				code: -32602,
				message: "Invalid params".into(),
			})
		})
		.await
		.unwrap_err();
		assert!(matches!(err, IntentError::RpcRejected { code: -32602, .. }));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}
}
