//! Dispatch over the chain family implementations.

use intents_providers::ChainProvider;
use intents_types::{Amount, ChainConfig, ChainType, CreateIntentOrderPayload, IntentError, SwapOrder};
use tracing::instrument;

use crate::{EvmIntentService, IconIntentService, IntentChainService, SuiIntentService, WaitPolicy};

/// Routes each call to the service of the configuration's chain family.
#[derive(Debug, Clone, Default)]
pub struct ChainServices {
	evm: EvmIntentService,
	sui: SuiIntentService,
	icon: IconIntentService,
}

impl ChainServices {
	/// Services sharing one receipt wait policy.
	pub fn new(wait: WaitPolicy) -> Self {
		Self {
			evm: EvmIntentService::new(wait),
			sui: SuiIntentService::new(wait),
			icon: IconIntentService::new(wait),
		}
	}

	pub fn for_chain(&self, chain_type: ChainType) -> &dyn IntentChainService {
		match chain_type {
			ChainType::Evm => &self.evm,
			ChainType::Sui => &self.sui,
			ChainType::Icon => &self.icon,
		}
	}

	/// Resolves the service for `config` after checking that `provider`
	/// belongs to the same family.
	fn route(&self, config: &ChainConfig, provider: &ChainProvider) -> Result<&dyn IntentChainService, IntentError> {
		if config.chain_type() != provider.chain_type() {
			return Err(IntentError::InvalidConfiguration(format!(
				"{} provider cannot serve {} chain {}",
				provider.chain_type(),
				config.chain_type(),
				config.chain()
			)));
		}
		Ok(self.for_chain(config.chain_type()))
	}

	#[instrument(skip_all, fields(from = %source.chain(), to = %destination.chain()))]
	pub async fn create_intent_order(
		&self,
		payload: &CreateIntentOrderPayload,
		source: &ChainConfig,
		destination: &ChainConfig,
		provider: &ChainProvider,
	) -> Result<String, IntentError> {
		self.route(source, provider)?
			.create_intent_order(payload, source, destination, provider)
			.await
	}

	#[instrument(skip_all, fields(chain = %config.chain(), %order_id))]
	pub async fn cancel_intent_order(
		&self,
		order_id: Amount,
		config: &ChainConfig,
		provider: &ChainProvider,
	) -> Result<String, IntentError> {
		self.route(config, provider)?
			.cancel_intent_order(order_id, config, provider)
			.await
	}

	#[instrument(skip_all, fields(chain = %config.chain()))]
	pub async fn get_order(
		&self,
		tx_hash: &str,
		config: &ChainConfig,
		provider: &ChainProvider,
	) -> Result<SwapOrder, IntentError> {
		self.route(config, provider)?
			.get_order(tx_hash, config, provider)
			.await
	}
}
