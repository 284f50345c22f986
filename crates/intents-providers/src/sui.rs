//! Sui connection provider.
//!
//! Reads go through the fullnode JSON-RPC API. Transactions are described as
//! programmable transaction blocks and handed to the wallet, which builds,
//! signs and executes them.

use intents_codec::sui::SuiEvent;
use intents_types::serde_helpers::amount_string;
use intents_types::{Amount, ChainType, IntentError};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::rpc::{JsonRpcClient, RpcFailure};
use crate::signer::ExternalSignerHandle;

/// A coin object owned by an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiCoin {
	pub coin_type: String,
	pub coin_object_id: String,
	#[serde(with = "amount_string")]
	pub balance: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoinPage {
	data: Vec<SuiCoin>,
	#[serde(default)]
	next_cursor: Option<String>,
	#[serde(default)]
	has_next_page: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiExecutionStatus {
	/// `success` or `failure`.
	pub status: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiEffects {
	pub status: SuiExecutionStatus,
}

/// Transaction block as returned with `showEffects` and `showEvents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiTransactionBlock {
	pub digest: String,
	#[serde(default)]
	pub effects: Option<SuiEffects>,
	#[serde(default)]
	pub events: Vec<SuiEvent>,
}

impl SuiTransactionBlock {
	pub fn is_success(&self) -> bool {
		self.effects
			.as_ref()
			.is_some_and(|effects| effects.status.status == "success")
	}

	pub fn failure_reason(&self) -> Option<String> {
		let status = &self.effects.as_ref()?.status;
		(status.status != "success")
			.then(|| status.error.clone().unwrap_or_else(|| status.status.clone()))
	}
}

/// Read client for a Sui fullnode.
#[derive(Debug)]
pub struct SuiClient {
	rpc: JsonRpcClient,
}

impl SuiClient {
	pub fn new(rpc_url: &str) -> Result<Self, IntentError> {
		Ok(Self {
			rpc: JsonRpcClient::new(rpc_url)?,
		})
	}

	pub async fn get_reference_gas_price(&self) -> Result<u64, IntentError> {
		let price: String = self
			.rpc
			.call("suix_getReferenceGasPrice", json!([]))
			.await?;
		price
			.parse()
			.map_err(|e| IntentError::Rpc(format!("invalid reference gas price '{}': {}", price, e)))
	}

	/// Every coin of `coin_type` owned by `owner`, following pagination.
	pub async fn get_coins(&self, owner: &str, coin_type: &str) -> Result<Vec<SuiCoin>, IntentError> {
		let mut coins = Vec::new();
		let mut cursor: Option<String> = None;
		loop {
			let page: CoinPage = self
				.rpc
				.call("suix_getCoins", json!([owner, coin_type, cursor, null]))
				.await?;
			coins.extend(page.data);
			match page.next_cursor {
				Some(next) if page.has_next_page => cursor = Some(next),
				_ => return Ok(coins),
			}
		}
	}

	/// The transaction block, or `None` while the node does not know it yet.
	pub async fn get_transaction_block(
		&self,
		digest: &str,
	) -> Result<Option<SuiTransactionBlock>, IntentError> {
		let params = json!([digest, { "showEffects": true, "showEvents": true }]);
		match self.rpc.call("sui_getTransactionBlock", params).await {
			Ok(block) => Ok(Some(block)),
			Err(RpcFailure::Node { message, .. }) if message.contains("Could not find") => Ok(None),
			Err(failure) => Err(failure.into()),
		}
	}
}

#[derive(Debug)]
pub enum SuiProviderConfig {
	Uninitialized {
		rpc_url: String,
		/// Owner address of the connected account.
		account: Option<String>,
		wallet: Option<ExternalSignerHandle>,
	},
	Initialized {
		client: SuiClient,
		account: Option<String>,
		wallet: Option<ExternalSignerHandle>,
	},
}

#[derive(Debug)]
pub struct SuiProvider {
	wallet: Option<ExternalSignerHandle>,
	account: Option<String>,
	client: SuiClient,
}

impl SuiProvider {
	pub fn new(config: SuiProviderConfig) -> Result<Self, IntentError> {
		let (client, account, wallet) = match config {
			SuiProviderConfig::Uninitialized {
				rpc_url,
				account,
				wallet,
			} => (SuiClient::new(&rpc_url)?, account, wallet),
			SuiProviderConfig::Initialized {
				client,
				account,
				wallet,
			} => (client, account, wallet),
		};
		if let Some(account) = &account {
			if !intents_types::validation::is_valid_address(ChainType::Sui, account)
				|| account.contains("::")
			{
				return Err(IntentError::InvalidConfiguration(format!(
					"'{}' is not a Sui address",
					account
				)));
			}
		}
		// The wallet signs for its own address when no account is given.
		let account = account.or_else(|| wallet.as_ref().map(|w| w.address().to_string()));
		Ok(Self {
			wallet,
			account,
			client,
		})
	}

	pub fn client(&self) -> &SuiClient {
		&self.client
	}

	pub fn can_sign(&self) -> bool {
		self.wallet.is_some()
	}

	pub fn wallet(&self) -> Result<&ExternalSignerHandle, IntentError> {
		self.wallet
			.as_ref()
			.ok_or(IntentError::WalletNotInitialized(ChainType::Sui))
	}

	pub fn account(&self) -> Result<&str, IntentError> {
		self.account
			.as_deref()
			.ok_or(IntentError::WalletNotInitialized(ChainType::Sui))
	}

	/// Hands a described transaction block to the wallet and returns its digest.
	pub async fn sign_and_execute(&self, transaction: serde_json::Value) -> Result<String, IntentError> {
		let wallet = self.wallet()?;
		let params = json!({
			"account": self.account()?,
			"transaction": transaction,
			"options": { "showEffects": true, "showEvents": true },
		});
		wallet.send("sui_signAndExecuteTransaction", params).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::signer::testing::ScriptedSigner;
	use wiremock::matchers::{body_partial_json, method};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	const OWNER: &str = "0x7a5c0b7a5f1e4c7d8f9a0b1c2d3e4f5a6b7c8d9e0f1a2b3c4d5e6f708192a3b4";

	fn read_only(url: String) -> SuiProvider {
		SuiProvider::new(SuiProviderConfig::Uninitialized {
			rpc_url: url,
			account: None,
			wallet: None,
		})
		.unwrap()
	}

	#[test]
	fn test_wallet_and_account_are_optional() {
		let provider = read_only("https://fullnode.mainnet.sui.io".into());
		assert!(!provider.can_sign());
		assert_eq!(
			provider.wallet().unwrap_err(),
			IntentError::WalletNotInitialized(ChainType::Sui)
		);
		assert!(provider.account().is_err());

		let signer = ScriptedSigner::answering(Ok(json!("digest")));
		let provider = SuiProvider::new(SuiProviderConfig::Uninitialized {
			rpc_url: "https://fullnode.mainnet.sui.io".into(),
			account: None,
			wallet: Some(ExternalSignerHandle::new(OWNER, signer)),
		})
		.unwrap();
		assert!(provider.can_sign());
		assert_eq!(provider.account().unwrap(), OWNER);
	}

	#[test]
	fn test_invalid_configurations() {
		let bad_url = SuiProvider::new(SuiProviderConfig::Uninitialized {
			rpc_url: "fullnode".into(),
			account: None,
			wallet: None,
		});
		assert!(matches!(bad_url, Err(IntentError::InvalidConfiguration(_))));

		let bad_account = SuiProvider::new(SuiProviderConfig::Uninitialized {
			rpc_url: "https://fullnode.mainnet.sui.io".into(),
			account: Some("hx01".into()),
			wallet: None,
		});
		assert!(matches!(bad_account, Err(IntentError::InvalidConfiguration(_))));
	}

	#[tokio::test]
	async fn test_coins_follow_pagination() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({"method": "suix_getCoins", "params": [OWNER, "0x2::sui::SUI", null, null]})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"jsonrpc": "2.0", "id": 1,
				"result": {
					"data": [{"coinType": "0x2::sui::SUI", "coinObjectId": "0xa", "balance": "100", "version": "1", "digest": "x", "previousTransaction": "y"}],
					"nextCursor": "0xa",
					"hasNextPage": true
				}
			})))
			.mount(&server)
			.await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({"method": "suix_getCoins", "params": [OWNER, "0x2::sui::SUI", "0xa", null]})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"jsonrpc": "2.0", "id": 2,
				"result": {
					"data": [{"coinType": "0x2::sui::SUI", "coinObjectId": "0xb", "balance": "250"}],
					"nextCursor": null,
					"hasNextPage": false
				}
			})))
			.mount(&server)
			.await;

		let provider = read_only(server.uri());
		let coins = provider.client().get_coins(OWNER, "0x2::sui::SUI").await.unwrap();
		assert_eq!(coins.len(), 2);
		assert_eq!(coins[1].balance, Amount::from(250u64));
	}

	#[tokio::test]
	async fn test_gas_price_and_unknown_digest() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({"method": "suix_getReferenceGasPrice"})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"jsonrpc": "2.0", "id": 1, "result": "750"
			})))
			.mount(&server)
			.await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({"method": "sui_getTransactionBlock"})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"jsonrpc": "2.0", "id": 2,
				"error": {"code": -32602, "message": "Could not find the referenced transaction [TransactionDigest(9fQ)]."}
			})))
			.mount(&server)
			.await;

		let provider = read_only(server.uri());
		assert_eq!(provider.client().get_reference_gas_price().await.unwrap(), 750);
		assert!(provider
			.client()
			.get_transaction_block("9fQ")
			.await
			.unwrap()
			.is_none());
	}

	#[tokio::test]
	async fn test_sign_and_execute_uses_wallet() {
		let signer = ScriptedSigner::answering(Ok(json!({"digest": "9fQ"})));
		let provider = SuiProvider::new(SuiProviderConfig::Uninitialized {
			rpc_url: "https://fullnode.mainnet.sui.io".into(),
			account: Some(OWNER.into()),
			wallet: Some(ExternalSignerHandle::new(OWNER, signer.clone())),
		})
		.unwrap();
		let digest = provider
			.sign_and_execute(json!({"commands": []}))
			.await
			.unwrap();
		assert_eq!(digest, "9fQ");
		let requests = signer.requests.lock().unwrap();
		assert_eq!(requests[0].params["account"], OWNER);
	}
}
