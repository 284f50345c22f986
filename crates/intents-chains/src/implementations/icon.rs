//! ICON intent service.
//!
//! Orders are created through the token fallback of the intent SCORE: the
//! wallet calls `transfer` on the token (on the wrapped native token for
//! ICX, with the amount attached as value), passing the intent contract as
//! recipient and the RLP envelope of the order as `_data`.

use alloy::primitives::U256;
use async_trait::async_trait;
use intents_codec::icon::{self as codec, TokenFallbackData};
use intents_providers::icon::{network_id, IconTransactionResult};
use intents_providers::{ChainProvider, IconProvider, IconTransaction};
use intents_types::{
	Amount, ChainConfig, ChainType, CreateIntentOrderPayload, IconChainConfig, IntentError, SwapOrder,
};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::finality::{truncate_hash, wait_for, WaitPolicy};
use crate::{mismatch, IntentChainService};

#[derive(Debug, Clone, Default)]
pub struct IconIntentService {
	wait: WaitPolicy,
}

fn icon_config(config: &ChainConfig) -> Result<&IconChainConfig, IntentError> {
	match config {
		ChainConfig::Icon(c) => Ok(c),
		other => Err(mismatch(ChainType::Icon, "chain config", other.chain_type())),
	}
}

fn icon_provider(provider: &ChainProvider) -> Result<&IconProvider, IntentError> {
	match provider {
		ChainProvider::Icon(p) => Ok(p),
		other => Err(mismatch(ChainType::Icon, "provider", other.chain_type())),
	}
}

fn hex_amount(value: U256) -> String {
	format!("0x{:x}", value)
}

impl IconIntentService {
	pub fn new(wait: WaitPolicy) -> Self {
		Self { wait }
	}

	/// Builds the `transfer` call carrying `order` to the intent contract.
	pub fn intent_transaction(
		order: &SwapOrder,
		config: &IconChainConfig,
		from: &str,
		native: bool,
	) -> IconTransaction {
		let fallback = TokenFallbackData::for_swap(codec::encode_order(order));
		let mut params = Map::new();
		params.insert("_to".into(), json!(config.intent_contract));
		params.insert("_value".into(), json!(hex_amount(order.amount)));
		params.insert("_data".into(), json!(fallback.to_hex()));

		let token = if native {
			config.native_token.as_str()
		} else {
			order.token.as_str()
		};
		let tx = IconTransaction::call(
			from,
			token,
			network_id(&config.base.nid),
			"transfer",
			params,
		);
		if native {
			tx.with_value(order.amount)
		} else {
			tx
		}
	}

	/// Applies the node's step estimate and broadcasts the transaction.
	async fn submit(&self, provider: &IconProvider, tx: IconTransaction) -> Result<String, IntentError> {
		let steps = provider.client().estimate_step(&tx).await?;
		debug!(%steps, "Estimated steps");
		provider.send_transaction(&tx.with_step_limit(steps)).await
	}

	async fn wait_for_result(
		&self,
		provider: &IconProvider,
		tx_hash: &str,
	) -> Result<IconTransactionResult, IntentError> {
		let client = provider.client();
		let result = wait_for(tx_hash, self.wait, || client.get_transaction_result(tx_hash)).await?;
		if !result.is_success() {
			let reason = result
				.failure
				.as_ref()
				.map(|f| f.message.clone())
				.unwrap_or_else(|| format!("status {}", result.status));
			return Err(IntentError::TransactionFailed {
				tx_hash: Some(tx_hash.to_string()),
				reason,
			});
		}
		Ok(result)
	}
}

#[async_trait]
impl IntentChainService for IconIntentService {
	fn chain_type(&self) -> ChainType {
		ChainType::Icon
	}

	async fn create_intent_order(
		&self,
		payload: &CreateIntentOrderPayload,
		source: &ChainConfig,
		destination: &ChainConfig,
		provider: &ChainProvider,
	) -> Result<String, IntentError> {
		let config = icon_config(source)?;
		let provider = icon_provider(provider)?;
		let from = provider.address()?;

		let order = payload.to_swap_order(source, destination)?;
		let native = source.is_native_token(&payload.token);
		let tx = Self::intent_transaction(&order, config, from, native);

		let tx_hash = self.submit(provider, tx).await?;
		info!(
			tx_hash = %truncate_hash(&tx_hash),
			native,
			"Created intent order"
		);
		Ok(tx_hash)
	}

	async fn cancel_intent_order(
		&self,
		order_id: Amount,
		config: &ChainConfig,
		provider: &ChainProvider,
	) -> Result<String, IntentError> {
		let icon = icon_config(config)?;
		let provider = icon_provider(provider)?;

		let mut params = Map::new();
		params.insert("id".into(), Value::String(hex_amount(order_id)));
		let tx = IconTransaction::call(
			provider.address()?,
			icon.intent_contract.as_str(),
			network_id(&icon.base.nid),
			"cancel",
			params,
		);
		let tx_hash = self.submit(provider, tx).await?;
		info!(tx_hash = %truncate_hash(&tx_hash), %order_id, "Cancelled intent order");
		Ok(tx_hash)
	}

	async fn get_order(
		&self,
		tx_hash: &str,
		config: &ChainConfig,
		provider: &ChainProvider,
	) -> Result<SwapOrder, IntentError> {
		let icon = icon_config(config)?;
		let provider = icon_provider(provider)?;
		let result = self.wait_for_result(provider, tx_hash).await?;
		codec::find_swap_order(&result.event_logs, &icon.intent_contract, tx_hash)
	}
}
