//! Per-chain intent services.
//!
//! Each chain family builds and submits the transaction that carries an
//! encoded swap intent, cancels orders by id, and reads orders back from
//! receipts. All three families sit behind [`IntentChainService`], and
//! [`ChainServices`] dispatches on the chain type of the configuration.
//!
//! Every failure of the underlying clients or of the codec is returned as an
//! [`IntentError`]; nothing here panics on chain errors.

pub mod finality;
pub mod implementations;
pub mod services;

pub use finality::WaitPolicy;
pub use implementations::evm::EvmIntentService;
pub use implementations::icon::IconIntentService;
pub use implementations::sui::SuiIntentService;
pub use services::ChainServices;

use async_trait::async_trait;
use intents_providers::ChainProvider;
use intents_types::{Amount, ChainConfig, ChainType, CreateIntentOrderPayload, IntentError, SwapOrder};

/// Operations every chain family supports.
#[async_trait]
pub trait IntentChainService: Send + Sync {
	fn chain_type(&self) -> ChainType;

	/// Submits the intent described by `payload` on the source chain and
	/// returns the transaction hash (digest on Sui).
	async fn create_intent_order(
		&self,
		payload: &CreateIntentOrderPayload,
		source: &ChainConfig,
		destination: &ChainConfig,
		provider: &ChainProvider,
	) -> Result<String, IntentError>;

	/// Cancels an outstanding order by its chain-assigned id.
	async fn cancel_intent_order(
		&self,
		order_id: Amount,
		config: &ChainConfig,
		provider: &ChainProvider,
	) -> Result<String, IntentError>;

	/// Waits for `tx_hash` to finalize and decodes the order it emitted.
	async fn get_order(
		&self,
		tx_hash: &str,
		config: &ChainConfig,
		provider: &ChainProvider,
	) -> Result<SwapOrder, IntentError>;
}

pub(crate) fn mismatch(expected: ChainType, what: &str, actual: ChainType) -> IntentError {
	IntentError::InvalidConfiguration(format!(
		"{} service received a {} {}",
		expected, actual, what
	))
}
