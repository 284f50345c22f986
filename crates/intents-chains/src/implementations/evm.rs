//! EVM intent service.
//!
//! Native intents call `swap` with the amount attached as value. Token
//! intents first raise the ERC-20 allowance of the intent contract when it
//! is short, wait for that approval to land, and then call `swap` without
//! value. Gas is estimated against the read client and set on the request
//! before it reaches the wallet.

use alloy::primitives::{Address, B256, U256};
use alloy::providers::Provider;
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use async_trait::async_trait;
use intents_codec::evm as codec;
use intents_providers::evm::rpc_error;
use intents_providers::{ChainProvider, EvmProvider, EvmWallet};
use intents_types::{
	Amount, ChainConfig, ChainType, CreateIntentOrderPayload, EvmChainConfig, IntentError, SwapOrder,
};
use tracing::{debug, info};

use crate::finality::{truncate_hash, wait_for, WaitPolicy};
use crate::{mismatch, IntentChainService};

#[derive(Debug, Clone, Default)]
pub struct EvmIntentService {
	wait: WaitPolicy,
}

fn evm_config(config: &ChainConfig) -> Result<&EvmChainConfig, IntentError> {
	match config {
		ChainConfig::Evm(c) => Ok(c),
		other => Err(mismatch(ChainType::Evm, "chain config", other.chain_type())),
	}
}

fn evm_provider(provider: &ChainProvider) -> Result<&EvmProvider, IntentError> {
	match provider {
		ChainProvider::Evm(p) => Ok(p),
		other => Err(mismatch(ChainType::Evm, "provider", other.chain_type())),
	}
}

fn parse_hash(tx_hash: &str) -> Result<B256, IntentError> {
	tx_hash
		.parse()
		.map_err(|e| IntentError::InvalidConfiguration(format!("invalid transaction hash '{}': {}", tx_hash, e)))
}

impl EvmIntentService {
	pub fn new(wait: WaitPolicy) -> Self {
		Self { wait }
	}

	/// Estimates gas for `request` and applies it.
	///
	/// A failed estimate means the call would revert, which is reported as
	/// the chain rejecting the transaction.
	async fn with_estimated_gas(
		&self,
		provider: &EvmProvider,
		request: TransactionRequest,
	) -> Result<TransactionRequest, IntentError> {
		let gas = provider
			.read()
			.estimate_gas(request.clone())
			.await
			.map_err(|e| IntentError::TransactionFailed {
				tx_hash: None,
				reason: e.to_string(),
			})?;
		debug!(gas, "Estimated gas");
		Ok(request.gas_limit(gas))
	}

	async fn submit(
		&self,
		provider: &EvmProvider,
		wallet: &EvmWallet,
		request: TransactionRequest,
	) -> Result<String, IntentError> {
		let request = self.with_estimated_gas(provider, request).await?;
		wallet.send_transaction(request).await
	}

	async fn wait_for_receipt(
		&self,
		provider: &EvmProvider,
		tx_hash: &str,
	) -> Result<TransactionReceipt, IntentError> {
		let hash = parse_hash(tx_hash)?;
		let receipt = wait_for(tx_hash, self.wait, || async move {
			provider
				.read()
				.get_transaction_receipt(hash)
				.await
				.map_err(|e| rpc_error("eth_getTransactionReceipt", e))
		})
		.await?;
		if !receipt.status() {
			return Err(IntentError::TransactionFailed {
				tx_hash: Some(tx_hash.to_string()),
				reason: "transaction reverted".to_string(),
			});
		}
		Ok(receipt)
	}

	/// Raises the intent contract's allowance to `amount` when it is short.
	async fn ensure_allowance(
		&self,
		provider: &EvmProvider,
		wallet: &EvmWallet,
		owner: Address,
		token: Address,
		spender: Address,
		amount: U256,
	) -> Result<(), IntentError> {
		let query = TransactionRequest::default()
			.to(token)
			.input(codec::allowance_calldata(owner, spender).into());
		let output = provider
			.read()
			.call(query)
			.await
			.map_err(|e| rpc_error("eth_call", e))?;
		let allowance = codec::decode_allowance(&output)?;
		if allowance >= amount {
			debug!(%allowance, "Allowance sufficient");
			return Ok(());
		}

		info!(%token, %amount, "Approving intent contract");
		let approve = TransactionRequest::default()
			.from(owner)
			.to(token)
			.input(codec::approve_calldata(spender, amount).into());
		let approve_hash = self.submit(provider, wallet, approve).await?;
		self.wait_for_receipt(provider, &approve_hash).await?;
		Ok(())
	}
}

#[async_trait]
impl IntentChainService for EvmIntentService {
	fn chain_type(&self) -> ChainType {
		ChainType::Evm
	}

	async fn create_intent_order(
		&self,
		payload: &CreateIntentOrderPayload,
		source: &ChainConfig,
		destination: &ChainConfig,
		provider: &ChainProvider,
	) -> Result<String, IntentError> {
		let config = evm_config(source)?;
		let provider = evm_provider(provider)?;
		let wallet = provider.wallet()?;

		let order = payload.to_swap_order(source, destination)?;
		let contract = codec::parse_address(&config.intent_contract)?;
		let from = wallet.address()?;

		let mut request = TransactionRequest::default()
			.from(from)
			.to(contract)
			.input(codec::swap_calldata(&order).into());
		if source.is_native_token(&payload.token) {
			request = request.value(order.amount);
		} else {
			let token = codec::parse_address(&payload.token)?;
			self.ensure_allowance(provider, wallet, from, token, contract, order.amount)
				.await?;
		}

		let tx_hash = self.submit(provider, wallet, request).await?;
		info!(
			tx_hash = %truncate_hash(&tx_hash),
			chain = %source.chain(),
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
		let evm = evm_config(config)?;
		let provider = evm_provider(provider)?;
		let wallet = provider.wallet()?;

		let request = TransactionRequest::default()
			.from(wallet.address()?)
			.to(codec::parse_address(&evm.intent_contract)?)
			.input(codec::cancel_calldata(order_id).into());
		let tx_hash = self.submit(provider, wallet, request).await?;
		info!(tx_hash = %truncate_hash(&tx_hash), %order_id, "Cancelled intent order");
		Ok(tx_hash)
	}

	async fn get_order(
		&self,
		tx_hash: &str,
		config: &ChainConfig,
		provider: &ChainProvider,
	) -> Result<SwapOrder, IntentError> {
		let evm = evm_config(config)?;
		let provider = evm_provider(provider)?;
		let contract = codec::parse_address(&evm.intent_contract)?;

		let receipt = self.wait_for_receipt(provider, tx_hash).await?;
		codec::find_swap_order(
			receipt.inner.logs().iter().map(|log| &log.inner),
			contract,
			tx_hash,
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::consensus::{Transaction, TxEnvelope};
	use alloy::eips::eip2718::Decodable2718;
	use alloy::primitives::hex;
	use intents_providers::{EvmProviderConfig, EvmUninitializedConfig};
	use intents_types::{ChainName, IntentData};
	use serde_json::{json, Value};
	use std::time::Duration;
	use wiremock::matchers::{body_partial_json, method};
	use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

	const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
	const TX_HASH: &str = "0x5f1b0a3c9e2d4f6a8b0c1d2e3f405162738495a6b7c8d9e0f1a2b3c4d5e6f708";

	fn service() -> EvmIntentService {
		EvmIntentService::new(WaitPolicy::new(Duration::from_secs(2), Duration::from_millis(10)))
	}

	fn provider(server: &MockServer, private_key: Option<&str>) -> ChainProvider {
		EvmProvider::new(EvmProviderConfig::Uninitialized(
			EvmUninitializedConfig::PrivateKey {
				chain: ChainName::Arb,
				rpc_url: server.uri(),
				private_key: private_key.map(str::to_string),
			},
		))
		.unwrap()
		.into()
	}

	/// Answers with a fixed JSON-RPC payload under the request's own id.
	struct RpcReply(Value);

	impl Respond for RpcReply {
		fn respond(&self, request: &Request) -> ResponseTemplate {
			let id = serde_json::from_slice::<Value>(&request.body)
				.map(|body| body["id"].clone())
				.unwrap_or(Value::Null);
			let mut body = self.0.clone();
			body["jsonrpc"] = json!("2.0");
			body["id"] = id;
			ResponseTemplate::new(200).set_body_json(body)
		}
	}

	fn rpc_result(result: Value) -> RpcReply {
		RpcReply(json!({ "result": result }))
	}

	const GAS_ESTIMATE: u64 = 100_000;
	const USDC: &str = "0xaf88d065e77c8cC2239327C5EDb3A432268e5831";

	/// Answers every call a local wallet makes while creating an order;
	/// any `eth_call` reports `allowance`.
	struct EvmNode {
		allowance: U256,
	}

	impl Respond for EvmNode {
		fn respond(&self, request: &Request) -> ResponseTemplate {
			let body = serde_json::from_slice::<Value>(&request.body).unwrap_or(Value::Null);
			let result = match body["method"].as_str().unwrap_or_default() {
				"eth_chainId" => json!("0xa4b1"),
				"eth_getTransactionCount" => json!("0x7"),
				"eth_estimateGas" => json!(format!("0x{:x}", GAS_ESTIMATE)),
				"eth_call" => json!(format!("0x{}", hex::encode(self.allowance.to_be_bytes::<32>()))),
				"eth_gasPrice" | "eth_maxPriorityFeePerGas" => json!("0x3b9aca00"),
				"eth_feeHistory" => json!({
					"oldestBlock": "0xf",
					"baseFeePerGas": ["0x3b9aca00", "0x3b9aca00"],
					"gasUsedRatio": [0.5],
					"reward": [["0x3b9aca00"]]
				}),
				"eth_sendRawTransaction" => json!(TX_HASH),
				"eth_getTransactionReceipt" => receipt_json("0x1", vec![]),
				other => {
					return ResponseTemplate::new(200).set_body_json(json!({
						"jsonrpc": "2.0",
						"id": body["id"],
						"error": {"code": -32601, "message": format!("method {} not available", other)}
					}))
				}
			};
			ResponseTemplate::new(200).set_body_json(json!({
				"jsonrpc": "2.0",
				"id": body["id"],
				"result": result
			}))
		}
	}

	/// Methods called on `server`, in arrival order.
	async fn methods(server: &MockServer) -> Vec<String> {
		server
			.received_requests()
			.await
			.unwrap()
			.iter()
			.map(|r| {
				let body = serde_json::from_slice::<Value>(&r.body).unwrap();
				body["method"].as_str().unwrap().to_string()
			})
			.collect()
	}

	/// Signed transactions broadcast to `server`, in arrival order.
	async fn broadcast(server: &MockServer) -> Vec<TxEnvelope> {
		server
			.received_requests()
			.await
			.unwrap()
			.iter()
			.map(|r| serde_json::from_slice::<Value>(&r.body).unwrap())
			.filter(|body| body["method"] == "eth_sendRawTransaction")
			.map(|body| {
				let raw = hex::decode(body["params"][0].as_str().unwrap()).unwrap();
				TxEnvelope::decode_2718(&mut raw.as_slice()).unwrap()
			})
			.collect()
	}

	fn create_payload(token: &str) -> CreateIntentOrderPayload {
		CreateIntentOrderPayload {
			quote_uuid: "quote-1".into(),
			from_address: "0x601020c5797Cdd34f64476b9bf887a353150Cb9a".into(),
			to_address: "hx601020c5797cdd34f64476b9bf887a353150cb9a".into(),
			from_chain: ChainName::Arb,
			to_chain: ChainName::Icon,
			token: token.into(),
			amount: Amount::from(2_500_000u64),
			to_token: "cx88fd7df7ddff82f7cc735c871dc519838cb235bb".into(),
			to_amount: Amount::from(1u64),
		}
	}

	fn receipt_json(status: &str, logs: Vec<Value>) -> Value {
		json!({
			"transactionHash": TX_HASH,
			"transactionIndex": "0x0",
			"blockHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
			"blockNumber": "0x10",
			"from": "0x601020c5797cdd34f64476b9bf887a353150cb9a",
			"to": "0x53e4f8ef6d7cdbf3b3c5d0e16b2d8bd3f4a8cb5d",
			"cumulativeGasUsed": "0x5208",
			"gasUsed": "0x5208",
			"effectiveGasPrice": "0x1",
			"contractAddress": null,
			"logs": logs,
			"logsBloom": format!("0x{}", "00".repeat(256)),
			"status": status,
			"type": "0x2"
		})
	}

	fn log_json(log: &alloy::primitives::Log) -> Value {
		json!({
			"address": format!("{:#x}", log.address),
			"topics": log.data.topics().iter().map(|t| format!("{:#x}", t)).collect::<Vec<_>>(),
			"data": format!("0x{}", hex::encode(&log.data.data)),
			"blockHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
			"blockNumber": "0x10",
			"transactionHash": TX_HASH,
			"transactionIndex": "0x0",
			"logIndex": "0x0",
			"removed": false
		})
	}

	fn order(config: &ChainConfig) -> SwapOrder {
		SwapOrder {
			id: Amount::from(42u64),
			emitter: config.emitter().to_string(),
			src_nid: config.nid().to_string(),
			dst_nid: "0x1.icon".into(),
			creator: "0x601020c5797Cdd34f64476b9bf887a353150Cb9a".into(),
			destination_address: "hx601020c5797cdd34f64476b9bf887a353150cb9a".into(),
			token: "0x0000000000000000000000000000000000000000".into(),
			amount: Amount::from(10u64).pow(Amount::from(18u64)),
			to_token: "cx88fd7df7ddff82f7cc735c871dc519838cb235bb".into(),
			to_amount: Amount::from(5u64),
			data: IntentData::new("quote-1").to_bytes(),
		}
	}

	#[tokio::test]
	async fn test_get_order_decodes_receipt() {
		let server = MockServer::start().await;
		let config = ChainConfig::default_for(ChainName::Arb);
		let original = order(&config);
		let contract = codec::parse_address(config.emitter()).unwrap();
		let log = codec::encode_event(&original, contract);

		Mock::given(method("POST"))
			.and(body_partial_json(json!({"method": "eth_getTransactionReceipt"})))
			.respond_with(rpc_result(receipt_json("0x1", vec![log_json(&log)])))
			.mount(&server)
			.await;

		let decoded = service()
			.get_order(TX_HASH, &config, &provider(&server, None))
			.await
			.unwrap();
		assert_eq!(decoded, original);
		assert_eq!(decoded.quote_uuid().as_deref(), Some("quote-1"));
	}

	#[tokio::test]
	async fn test_get_order_without_event() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({"method": "eth_getTransactionReceipt"})))
			.respond_with(rpc_result(receipt_json("0x1", vec![])))
			.mount(&server)
			.await;

		let config = ChainConfig::default_for(ChainName::Arb);
		let err = service()
			.get_order(TX_HASH, &config, &provider(&server, None))
			.await
			.unwrap_err();
		assert!(matches!(err, IntentError::OrderNotFound { .. }));
	}

	#[tokio::test]
	async fn test_get_order_times_out() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({"method": "eth_getTransactionReceipt"})))
			.respond_with(rpc_result(Value::Null))
			.mount(&server)
			.await;

		let config = ChainConfig::default_for(ChainName::Arb);
		let service = EvmIntentService::new(WaitPolicy::new(
			Duration::from_millis(100),
			Duration::from_millis(20),
		));
		let err = service
			.get_order(TX_HASH, &config, &provider(&server, None))
			.await
			.unwrap_err();
		assert!(matches!(err, IntentError::TransactionNotFinalized { .. }));
	}

	#[tokio::test]
	async fn test_cancel_rejected_by_chain() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({"method": "eth_estimateGas"})))
			.respond_with(RpcReply(json!({
				"error": {"code": 3, "message": "execution reverted: order already settled", "data": "0x"}
			})))
			.mount(&server)
			.await;

		let config = ChainConfig::default_for(ChainName::Arb);
		let err = service()
			.cancel_intent_order(Amount::from(42u64), &config, &provider(&server, Some(KEY)))
			.await
			.unwrap_err();
		match err {
			IntentError::TransactionFailed { tx_hash, reason } => {
				assert!(tx_hash.is_none());
				assert!(reason.contains("already settled"));
			}
			other => panic!("unexpected error: {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_native_order_attaches_value() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(EvmNode { allowance: U256::ZERO })
			.mount(&server)
			.await;

		let source = ChainConfig::default_for(ChainName::Arb);
		let destination = ChainConfig::default_for(ChainName::Icon);
		let payload = create_payload("0x0000000000000000000000000000000000000000");
		let tx_hash = service()
			.create_intent_order(&payload, &source, &destination, &provider(&server, Some(KEY)))
			.await
			.unwrap();
		assert_eq!(tx_hash, TX_HASH);

		let sent = broadcast(&server).await;
		assert_eq!(sent.len(), 1);
		let swap = &sent[0];
		let order = payload.to_swap_order(&source, &destination).unwrap();
		assert_eq!(swap.to(), Some(codec::parse_address(source.emitter()).unwrap()));
		assert_eq!(swap.value(), payload.amount);
		assert_eq!(swap.gas_limit(), GAS_ESTIMATE);
		assert_eq!(swap.input(), &codec::swap_calldata(&order));
		assert!(!methods(&server).await.iter().any(|m| m == "eth_call"));
	}

	#[tokio::test]
	async fn test_token_order_approves_short_allowance() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(EvmNode {
				allowance: U256::from(1_000u64),
			})
			.mount(&server)
			.await;

		let source = ChainConfig::default_for(ChainName::Arb);
		let destination = ChainConfig::default_for(ChainName::Icon);
		let payload = create_payload(USDC);
		service()
			.create_intent_order(&payload, &source, &destination, &provider(&server, Some(KEY)))
			.await
			.unwrap();

		let contract = codec::parse_address(source.emitter()).unwrap();
		let sent = broadcast(&server).await;
		assert_eq!(sent.len(), 2);
		let (approve, swap) = (&sent[0], &sent[1]);
		assert_eq!(approve.to(), Some(codec::parse_address(USDC).unwrap()));
		assert_eq!(approve.input(), &codec::approve_calldata(contract, payload.amount));
		assert_eq!(approve.value(), U256::ZERO);
		assert_eq!(approve.gas_limit(), GAS_ESTIMATE);
		assert_eq!(swap.to(), Some(contract));
		assert_eq!(swap.value(), U256::ZERO);
		assert_eq!(swap.gas_limit(), GAS_ESTIMATE);

		// The swap is only broadcast once the approval has a receipt.
		let methods = methods(&server).await;
		let receipt = methods.iter().position(|m| m == "eth_getTransactionReceipt").unwrap();
		let last_send = methods.iter().rposition(|m| m == "eth_sendRawTransaction").unwrap();
		assert!(receipt < last_send);
	}

	#[tokio::test]
	async fn test_token_order_skips_sufficient_allowance() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(EvmNode {
				allowance: Amount::from(2_500_000u64),
			})
			.mount(&server)
			.await;

		let source = ChainConfig::default_for(ChainName::Arb);
		let destination = ChainConfig::default_for(ChainName::Icon);
		service()
			.create_intent_order(&create_payload(USDC), &source, &destination, &provider(&server, Some(KEY)))
			.await
			.unwrap();

		let sent = broadcast(&server).await;
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].to(), Some(codec::parse_address(source.emitter()).unwrap()));
		assert_eq!(sent[0].value(), U256::ZERO);
		assert_eq!(sent[0].gas_limit(), GAS_ESTIMATE);
		let methods = methods(&server).await;
		assert!(methods.iter().any(|m| m == "eth_call"));
		assert!(!methods.iter().any(|m| m == "eth_getTransactionReceipt"));
	}

	#[tokio::test]
	async fn test_invalid_receipt_request_is_not_polled() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({"method": "eth_getTransactionReceipt"})))
			.respond_with(RpcReply(json!({
				"error": {"code": -32602, "message": "invalid argument 0"}
			})))
			.mount(&server)
			.await;

		let config = ChainConfig::default_for(ChainName::Arb);
		let err = service()
			.get_order(TX_HASH, &config, &provider(&server, None))
			.await
			.unwrap_err();
		assert!(matches!(err, IntentError::RpcRejected { code: -32602, .. }));
		assert_eq!(server.received_requests().await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_create_requires_wallet() {
		let server = MockServer::start().await;
		let source = ChainConfig::default_for(ChainName::Arb);
		let destination = ChainConfig::default_for(ChainName::Icon);
		let payload = CreateIntentOrderPayload {
			quote_uuid: "quote-1".into(),
			from_address: "0x601020c5797Cdd34f64476b9bf887a353150Cb9a".into(),
			to_address: "hx601020c5797cdd34f64476b9bf887a353150cb9a".into(),
			from_chain: ChainName::Arb,
			to_chain: ChainName::Icon,
			token: "0x0000000000000000000000000000000000000000".into(),
			amount: Amount::from(1u64),
			to_token: "cx88fd7df7ddff82f7cc735c871dc519838cb235bb".into(),
			to_amount: Amount::from(1u64),
		};
		let err = service()
			.create_intent_order(&payload, &source, &destination, &provider(&server, None))
			.await
			.unwrap_err();
		assert_eq!(err, IntentError::WalletNotInitialized(ChainType::Evm));
	}

	#[tokio::test]
	async fn test_rejects_foreign_config() {
		let server = MockServer::start().await;
		let icon = ChainConfig::default_for(ChainName::Icon);
		let err = service()
			.get_order(TX_HASH, &icon, &provider(&server, None))
			.await
			.unwrap_err();
		assert!(matches!(err, IntentError::InvalidConfiguration(_)));
	}
}
