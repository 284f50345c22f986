//! Sui intent service.
//!
//! The intent is a single programmable transaction block: obtain a coin
//! holding exactly the order amount, then call `swap` on the intent module
//! with the shared storage object. The block is described as JSON and
//! handed to the wallet, which resolves object versions, signs and executes
//! it.

use async_trait::async_trait;
use intents_codec::sui as codec;
use intents_providers::sui::SuiTransactionBlock;
use intents_providers::{ChainProvider, SuiProvider};
use intents_types::{
	Amount, ChainConfig, ChainType, CreateIntentOrderPayload, IntentError, SuiChainConfig, SwapOrder,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::finality::{truncate_hash, wait_for, WaitPolicy};
use crate::{mismatch, IntentChainService};

/// Gas units budgeted per transaction, priced at the reference gas price.
pub const GAS_BUDGET_UNITS: u64 = 20_000;

/// An input of a programmable transaction block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CallArg {
	#[serde(rename_all = "camelCase")]
	Object { object_id: String },
	#[serde(rename_all = "camelCase")]
	Pure { value_type: String, value: Value },
}

impl CallArg {
	fn pure(value_type: &str, value: Value) -> Self {
		CallArg::Pure {
			value_type: value_type.to_string(),
			value,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Argument {
	GasCoin,
	Input(u16),
	Result(u16),
	NestedResult(u16, u16),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Command {
	SplitCoins {
		coin: Argument,
		amounts: Vec<Argument>,
	},
	MergeCoins {
		destination: Argument,
		sources: Vec<Argument>,
	},
	#[serde(rename_all = "camelCase")]
	MoveCall {
		target: String,
		type_arguments: Vec<String>,
		arguments: Vec<Argument>,
	},
}

/// Description of a programmable transaction block for the wallet.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgrammableTransaction {
	pub sender: String,
	/// In MIST, serialized as a decimal string.
	#[serde(serialize_with = "as_decimal")]
	pub gas_budget: u64,
	#[serde(serialize_with = "as_decimal")]
	pub gas_price: u64,
	pub inputs: Vec<CallArg>,
	pub commands: Vec<Command>,
}

fn as_decimal<S: serde::Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
	serializer.serialize_str(&value.to_string())
}

impl ProgrammableTransaction {
	pub fn new(sender: impl Into<String>) -> Self {
		Self {
			sender: sender.into(),
			..Default::default()
		}
	}

	pub fn input(&mut self, arg: CallArg) -> Argument {
		self.inputs.push(arg);
		Argument::Input((self.inputs.len() - 1) as u16)
	}

	pub fn command(&mut self, command: Command) -> Argument {
		self.commands.push(command);
		Argument::Result((self.commands.len() - 1) as u16)
	}

	/// Splits `amount` off `coin` and returns the new coin.
	///
	/// Coin balances are `u64`; a larger amount is rejected before any
	/// input is added.
	pub fn split(&mut self, coin: Argument, amount: Amount) -> Result<Argument, IntentError> {
		if amount > Amount::from(u64::MAX) {
			return Err(IntentError::InvalidConfiguration(format!(
				"amount {} exceeds the u64 range of a Sui coin",
				amount
			)));
		}
		let amount = self.input(CallArg::pure("u64", json!(amount.to_string())));
		let split = match self.command(Command::SplitCoins {
			coin,
			amounts: vec![amount],
		}) {
			Argument::Result(index) => Argument::NestedResult(index, 0),
			other => other,
		};
		Ok(split)
	}

	pub fn to_value(&self) -> Result<Value, IntentError> {
		serde_json::to_value(self)
			.map_err(|e| IntentError::Unknown(format!("failed to describe transaction: {}", e)))
	}
}

#[derive(Debug, Clone, Default)]
pub struct SuiIntentService {
	wait: WaitPolicy,
}

fn sui_config(config: &ChainConfig) -> Result<&SuiChainConfig, IntentError> {
	match config {
		ChainConfig::Sui(c) => Ok(c),
		other => Err(mismatch(ChainType::Sui, "chain config", other.chain_type())),
	}
}

fn sui_provider(provider: &ChainProvider) -> Result<&SuiProvider, IntentError> {
	match provider {
		ChainProvider::Sui(p) => Ok(p),
		other => Err(mismatch(ChainType::Sui, "provider", other.chain_type())),
	}
}

impl SuiIntentService {
	pub fn new(wait: WaitPolicy) -> Self {
		Self { wait }
	}

	async fn priced(
		&self,
		provider: &SuiProvider,
		mut tx: ProgrammableTransaction,
	) -> Result<ProgrammableTransaction, IntentError> {
		let price = provider.client().get_reference_gas_price().await?;
		tx.gas_price = price;
		tx.gas_budget = price.saturating_mul(GAS_BUDGET_UNITS);
		debug!(gas_price = price, gas_budget = tx.gas_budget, "Priced Sui transaction");
		Ok(tx)
	}

	/// Produces a coin of `coin_type` worth exactly `amount`.
	///
	/// Native SUI is split from the gas coin. Other coin types are merged
	/// from every coin object the owner holds before splitting.
	async fn order_coin(
		&self,
		provider: &SuiProvider,
		tx: &mut ProgrammableTransaction,
		config: &ChainConfig,
		coin_type: &str,
		amount: Amount,
	) -> Result<Argument, IntentError> {
		if config.is_native_token(coin_type) {
			return tx.split(Argument::GasCoin, amount);
		}

		let owner = provider.account()?;
		let coins = provider.client().get_coins(owner, coin_type).await?;
		let balance = coins.iter().fold(Amount::ZERO, |acc, coin| acc + coin.balance);
		if coins.is_empty() || balance < amount {
			return Err(IntentError::TransactionFailed {
				tx_hash: None,
				reason: format!(
					"insufficient {} balance: have {}, need {}",
					coin_type, balance, amount
				),
			});
		}

		let mut objects = coins
			.iter()
			.map(|coin| tx.input(CallArg::Object {
				object_id: coin.coin_object_id.clone(),
			}))
			.collect::<Vec<_>>();
		let primary = objects.remove(0);
		if !objects.is_empty() {
			tx.command(Command::MergeCoins {
				destination: primary,
				sources: objects,
			});
		}
		tx.split(primary, amount)
	}

	/// Builds the block that creates `order`.
	pub async fn intent_transaction(
		&self,
		order: &SwapOrder,
		config: &ChainConfig,
		provider: &SuiProvider,
	) -> Result<ProgrammableTransaction, IntentError> {
		let sui = sui_config(config)?;
		let mut tx = ProgrammableTransaction::new(provider.account()?);
		let coin = self
			.order_coin(provider, &mut tx, config, &order.token, order.amount)
			.await?;

		let storage = tx.input(CallArg::Object {
			object_id: sui.storage_id.clone(),
		});
		let dst_nid = tx.input(CallArg::pure("string", json!(order.dst_nid)));
		let destination = tx.input(CallArg::pure("string", json!(order.destination_address)));
		let to_token = tx.input(CallArg::pure("string", json!(order.to_token)));
		let to_amount = tx.input(CallArg::pure("u128", json!(order.to_amount.to_string())));
		let data = tx.input(CallArg::pure("vector<u8>", json!(order.data)));

		tx.command(Command::MoveCall {
			target: format!("{}::{}::swap", sui.package_id, sui.intent_module),
			type_arguments: vec![order.token.clone()],
			arguments: vec![storage, coin, dst_nid, destination, to_token, to_amount, data],
		});
		self.priced(provider, tx).await
	}

	async fn wait_for_block(
		&self,
		provider: &SuiProvider,
		digest: &str,
	) -> Result<SuiTransactionBlock, IntentError> {
		let client = provider.client();
		let block = wait_for(digest, self.wait, || client.get_transaction_block(digest)).await?;
		if let Some(reason) = block.failure_reason() {
			return Err(IntentError::TransactionFailed {
				tx_hash: Some(digest.to_string()),
				reason,
			});
		}
		Ok(block)
	}
}

#[async_trait]
impl IntentChainService for SuiIntentService {
	fn chain_type(&self) -> ChainType {
		ChainType::Sui
	}

	async fn create_intent_order(
		&self,
		payload: &CreateIntentOrderPayload,
		source: &ChainConfig,
		destination: &ChainConfig,
		provider: &ChainProvider,
	) -> Result<String, IntentError> {
		sui_config(source)?;
		let provider = sui_provider(provider)?;
		provider.wallet()?;

		let order = payload.to_swap_order(source, destination)?;
		let tx = self.intent_transaction(&order, source, provider).await?;
		let digest = provider.sign_and_execute(tx.to_value()?).await?;
		info!(digest = %truncate_hash(&digest), "Created intent order");
		Ok(digest)
	}

	async fn cancel_intent_order(
		&self,
		order_id: Amount,
		config: &ChainConfig,
		provider: &ChainProvider,
	) -> Result<String, IntentError> {
		let sui = sui_config(config)?;
		let provider = sui_provider(provider)?;
		provider.wallet()?;

		let mut tx = ProgrammableTransaction::new(provider.account()?);
		let storage = tx.input(CallArg::Object {
			object_id: sui.storage_id.clone(),
		});
		let id = tx.input(CallArg::pure("u128", json!(order_id.to_string())));
		tx.command(Command::MoveCall {
			target: format!("{}::{}::cancel", sui.package_id, sui.intent_module),
			type_arguments: Vec::new(),
			arguments: vec![storage, id],
		});
		let tx = self.priced(provider, tx).await?;

		let digest = provider.sign_and_execute(tx.to_value()?).await?;
		info!(digest = %truncate_hash(&digest), %order_id, "Cancelled intent order");
		Ok(digest)
	}

	async fn get_order(
		&self,
		tx_hash: &str,
		config: &ChainConfig,
		provider: &ChainProvider,
	) -> Result<SwapOrder, IntentError> {
		let sui = sui_config(config)?;
		let provider = sui_provider(provider)?;
		let block = self.wait_for_block(provider, tx_hash).await?;
		codec::find_swap_order(&block.events, &sui.package_id, &sui.intent_module, tx_hash)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use intents_providers::{
		ConnectorError, ExternalSigner, ExternalSignerHandle, SigningRequest, SuiProviderConfig,
	};
	use intents_types::ChainName;
	use std::sync::{Arc, Mutex};
	use std::time::Duration;
	use wiremock::matchers::{body_partial_json, method};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	const OWNER: &str = "0x7a5c0b7a5f1e4c7d8f9a0b1c2d3e4f5a6b7c8d9e0f1a2b3c4d5e6f708192a3b4";
	const USDC: &str = "0xdba34672e30cb065b1f93e3ab55318768fd6fef66c15942c9f7cb846e2f900e7::usdc::USDC";
	const DIGEST: &str = "9fQxM2n7tG4qkYc3vW8bZ1aD6eR5sU0hJ";

	#[derive(Default)]
	struct RecordingWallet {
		requests: Mutex<Vec<SigningRequest>>,
	}

	#[async_trait]
	impl ExternalSigner for RecordingWallet {
		async fn request(&self, request: SigningRequest) -> Result<Value, ConnectorError> {
			self.requests.lock().unwrap().push(request);
			Ok(json!({ "digest": DIGEST }))
		}
	}

	fn service() -> SuiIntentService {
		SuiIntentService::new(WaitPolicy::new(Duration::from_secs(2), Duration::from_millis(10)))
	}

	fn provider(server: &MockServer, wallet: Option<Arc<RecordingWallet>>) -> ChainProvider {
		SuiProvider::new(SuiProviderConfig::Uninitialized {
			rpc_url: server.uri(),
			account: None,
			wallet: wallet.map(|w| ExternalSignerHandle::new(OWNER, w)),
		})
		.unwrap()
		.into()
	}

	async fn mount_gas_price(server: &MockServer) {
		Mock::given(method("POST"))
			.and(body_partial_json(json!({"method": "suix_getReferenceGasPrice"})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"jsonrpc": "2.0", "id": 1, "result": "750"
			})))
			.mount(server)
			.await;
	}

	fn payload(token: &str, amount: u64) -> CreateIntentOrderPayload {
		CreateIntentOrderPayload {
			quote_uuid: "quote-s".into(),
			from_address: OWNER.into(),
			to_address: "hx601020c5797cdd34f64476b9bf887a353150cb9a".into(),
			from_chain: ChainName::Sui,
			to_chain: ChainName::Icon,
			token: token.into(),
			amount: Amount::from(amount),
			to_token: "cx88fd7df7ddff82f7cc735c871dc519838cb235bb".into(),
			to_amount: Amount::from(7u64),
		}
	}

	fn described(wallet: &RecordingWallet) -> Value {
		let requests = wallet.requests.lock().unwrap();
		assert_eq!(requests.len(), 1);
		assert_eq!(requests[0].method, "sui_signAndExecuteTransaction");
		requests[0].params["transaction"].clone()
	}

	#[tokio::test]
	async fn test_native_order_splits_gas_coin() {
		let server = MockServer::start().await;
		mount_gas_price(&server).await;
		let wallet = Arc::new(RecordingWallet::default());

		let source = ChainConfig::default_for(ChainName::Sui);
		let destination = ChainConfig::default_for(ChainName::Icon);
		let digest = service()
			.create_intent_order(
				&payload("0x2::sui::SUI", 1_000_000),
				&source,
				&destination,
				&provider(&server, Some(wallet.clone())),
			)
			.await
			.unwrap();
		assert_eq!(digest, DIGEST);

		let tx = described(&wallet);
		assert_eq!(tx["sender"], OWNER);
		assert_eq!(tx["gasPrice"], "750");
		assert_eq!(tx["gasBudget"], (750 * GAS_BUDGET_UNITS).to_string());
		assert_eq!(tx["commands"][0]["SplitCoins"]["coin"], "GasCoin");
		assert_eq!(tx["inputs"][0]["value"], "1000000");
		let call = &tx["commands"][1]["MoveCall"];
		assert_eq!(
			call["target"],
			format!("{}::main::swap", source.emitter())
		);
		assert_eq!(call["typeArguments"][0], "0x2::sui::SUI");
		assert_eq!(call["arguments"][1]["NestedResult"], json!([0, 0]));
	}

	#[tokio::test]
	async fn test_token_order_merges_coins() {
		let server = MockServer::start().await;
		mount_gas_price(&server).await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({"method": "suix_getCoins"})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"jsonrpc": "2.0", "id": 2,
				"result": {
					"data": [
						{"coinType": USDC, "coinObjectId": "0xa1", "balance": "400"},
						{"coinType": USDC, "coinObjectId": "0xa2", "balance": "700"}
					],
					"nextCursor": null,
					"hasNextPage": false
				}
			})))
			.mount(&server)
			.await;
		let wallet = Arc::new(RecordingWallet::default());

		service()
			.create_intent_order(
				&payload(USDC, 1_000),
				&ChainConfig::default_for(ChainName::Sui),
				&ChainConfig::default_for(ChainName::Icon),
				&provider(&server, Some(wallet.clone())),
			)
			.await
			.unwrap();

		let tx = described(&wallet);
		assert_eq!(tx["inputs"][0]["objectId"], "0xa1");
		assert_eq!(tx["inputs"][1]["objectId"], "0xa2");
		assert_eq!(tx["commands"][0]["MergeCoins"]["destination"], json!({"Input": 0}));
		assert_eq!(tx["commands"][1]["SplitCoins"]["coin"], json!({"Input": 0}));
	}

	#[tokio::test]
	async fn test_insufficient_token_balance() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({"method": "suix_getCoins"})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"jsonrpc": "2.0", "id": 2,
				"result": {"data": [{"coinType": USDC, "coinObjectId": "0xa1", "balance": "10"}], "hasNextPage": false}
			})))
			.mount(&server)
			.await;
		let wallet = Arc::new(RecordingWallet::default());

		let err = service()
			.create_intent_order(
				&payload(USDC, 1_000),
				&ChainConfig::default_for(ChainName::Sui),
				&ChainConfig::default_for(ChainName::Icon),
				&provider(&server, Some(wallet.clone())),
			)
			.await
			.unwrap_err();
		assert!(matches!(err, IntentError::TransactionFailed { tx_hash: None, .. }));
		assert!(wallet.requests.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_amount_beyond_coin_range() {
		let server = MockServer::start().await;
		mount_gas_price(&server).await;
		let wallet = Arc::new(RecordingWallet::default());
		let mut oversized = payload("0x2::sui::SUI", 1);
		oversized.amount = Amount::from(u64::MAX) + Amount::from(1u64);

		let err = service()
			.create_intent_order(
				&oversized,
				&ChainConfig::default_for(ChainName::Sui),
				&ChainConfig::default_for(ChainName::Icon),
				&provider(&server, Some(wallet.clone())),
			)
			.await
			.unwrap_err();
		assert!(matches!(err, IntentError::InvalidConfiguration(ref msg) if msg.contains("u64")));
		assert!(wallet.requests.lock().unwrap().is_empty());

		let mut tx = ProgrammableTransaction::new(OWNER);
		assert!(tx.split(Argument::GasCoin, Amount::from(u64::MAX)).is_ok());
		assert!(tx.split(Argument::GasCoin, oversized.amount).is_err());
		assert_eq!(tx.inputs.len(), 1);
	}

	#[tokio::test]
	async fn test_get_order_from_events() {
		let server = MockServer::start().await;
		let config = ChainConfig::default_for(ChainName::Sui);
		let destination = ChainConfig::default_for(ChainName::Icon);
		let mut original = payload("0x2::sui::SUI", 5).to_swap_order(&config, &destination).unwrap();
		original.id = Amount::from(31u64);
		let event = codec::encode_event(&original, config.emitter(), "main");

		Mock::given(method("POST"))
			.and(body_partial_json(json!({"method": "sui_getTransactionBlock"})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"jsonrpc": "2.0", "id": 1,
				"result": {
					"digest": DIGEST,
					"effects": {"status": {"status": "success"}},
					"events": [event]
				}
			})))
			.mount(&server)
			.await;

		let order = service()
			.get_order(DIGEST, &config, &provider(&server, None))
			.await
			.unwrap();
		assert_eq!(order, original);
	}

	#[tokio::test]
	async fn test_cancel_requires_wallet() {
		let server = MockServer::start().await;
		let err = service()
			.cancel_intent_order(
				Amount::from(3u64),
				&ChainConfig::default_for(ChainName::Sui),
				&provider(&server, None),
			)
			.await
			.unwrap_err();
		assert_eq!(err, IntentError::WalletNotInitialized(ChainType::Sui));
	}
}
