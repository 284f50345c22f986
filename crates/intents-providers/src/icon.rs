//! ICON connection provider.
//!
//! Holds an optional wallet, which is either a local keypair or an address
//! whose signing happens through an external connector, plus clients for
//! the main and debug JSON-RPC endpoints.

use alloy::primitives::{B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use base64::Engine;
use intents_codec::icon::IconEventLog;
use intents_types::{ChainType, IntentError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::rpc::{JsonRpcClient, RpcFailure};
use crate::signer::ExternalSignerHandle;

/// ICON error codes meaning the transaction result is not available yet.
const RESULT_PENDING_CODES: [i64; 3] = [-31002, -31003, -31004];

/// A secp256k1 keypair signing ICON transactions locally.
#[derive(Clone)]
pub struct IconKeyPair {
	signer: PrivateKeySigner,
	address: String,
}

impl fmt::Debug for IconKeyPair {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("IconKeyPair")
			.field("address", &self.address)
			.finish_non_exhaustive()
	}
}

impl IconKeyPair {
	pub fn from_private_key(private_key: &str) -> Result<Self, IntentError> {
		let signer = private_key
			.trim_start_matches("0x")
			.parse::<PrivateKeySigner>()
			.map_err(|e| IntentError::InvalidConfiguration(format!("Invalid ICON private key: {}", e)))?;
		let public_key = signer.credential().verifying_key().to_encoded_point(false);
		let address = address_from_public_key(public_key.as_bytes());
		Ok(Self { signer, address })
	}

	/// The `hx` address of this keypair.
	pub fn address(&self) -> &str {
		&self.address
	}

	/// Base64 of `r || s || recovery id` over the transaction hash.
	pub fn sign(&self, params: &Map<String, Value>) -> Result<String, IntentError> {
		let hash = B256::from_slice(&transaction_hash(params));
		let signature = self
			.signer
			.sign_hash_sync(&hash)
			.map_err(|e| IntentError::Unknown(format!("ICON signing failed: {}", e)))?;

		let mut bytes = Vec::with_capacity(65);
		bytes.extend_from_slice(&signature.r().to_be_bytes::<32>());
		bytes.extend_from_slice(&signature.s().to_be_bytes::<32>());
		bytes.push(u8::from(signature.v()));
		Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
	}
}

/// `hx` followed by the last 20 bytes of `sha3_256` of the uncompressed
/// public key without its `0x04` prefix.
fn address_from_public_key(uncompressed: &[u8]) -> String {
	let key = uncompressed.strip_prefix(&[0x04]).unwrap_or(uncompressed);
	let digest = Sha3_256::digest(key);
	format!("hx{}", hex::encode(&digest[12..]))
}

fn escape(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for c in text.chars() {
		if matches!(c, '\\' | '.' | '{' | '}' | '[' | ']') {
			out.push('\\');
		}
		out.push(c);
	}
	out
}

fn serialize_value(value: &Value) -> String {
	match value {
		Value::Null => "\\0".to_string(),
		Value::String(s) => escape(s),
		Value::Bool(b) => b.to_string(),
		Value::Number(n) => n.to_string(),
		Value::Array(items) => format!(
			"[{}]",
			items.iter().map(serialize_value).collect::<Vec<_>>().join(".")
		),
		Value::Object(map) => format!("{{{}}}", serialize_map(map)),
	}
}

fn serialize_map(map: &Map<String, Value>) -> String {
	let mut keys: Vec<&String> = map.keys().collect();
	keys.sort();
	keys.iter()
		.map(|key| format!("{}.{}", key, serialize_value(&map[key.as_str()])))
		.collect::<Vec<_>>()
		.join(".")
}

/// Canonical string ICON nodes hash to verify a signature.
pub fn serialize_transaction(params: &Map<String, Value>) -> String {
	let unsigned: Map<String, Value> = params
		.iter()
		.filter(|(k, _)| k.as_str() != "signature" && k.as_str() != "txHash")
		.map(|(k, v)| (k.clone(), v.clone()))
		.collect();
	format!("icx_sendTransaction.{}", serialize_map(&unsigned))
}

/// `sha3_256` of the canonical transaction string.
pub fn transaction_hash(params: &Map<String, Value>) -> [u8; 32] {
	Sha3_256::digest(serialize_transaction(params).as_bytes()).into()
}

fn hex_int(value: U256) -> String {
	format!("0x{:x}", value)
}

/// A SCORE call transaction before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconTransaction {
	pub from: String,
	pub to: String,
	/// ICX attached to the call, in loop.
	pub value: Option<U256>,
	pub step_limit: Option<U256>,
	/// Network id, e.g. `0x1` for mainnet.
	pub nid: String,
	pub method: String,
	pub params: Map<String, Value>,
	/// Microseconds since the epoch.
	pub timestamp: u64,
}

impl IconTransaction {
	pub fn call(
		from: impl Into<String>,
		to: impl Into<String>,
		nid: impl Into<String>,
		method: impl Into<String>,
		params: Map<String, Value>,
	) -> Self {
		let timestamp = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_micros() as u64)
			.unwrap_or_default();
		Self {
			from: from.into(),
			to: to.into(),
			value: None,
			step_limit: None,
			nid: nid.into(),
			method: method.into(),
			params,
			timestamp,
		}
	}

	pub fn with_value(mut self, value: U256) -> Self {
		self.value = Some(value);
		self
	}

	pub fn with_step_limit(mut self, step_limit: U256) -> Self {
		self.step_limit = Some(step_limit);
		self
	}

	/// JSON-RPC params of `icx_sendTransaction`, without a signature.
	pub fn to_params(&self) -> Map<String, Value> {
		let mut params = Map::new();
		params.insert("version".into(), json!("0x3"));
		params.insert("from".into(), json!(self.from));
		params.insert("to".into(), json!(self.to));
		if let Some(value) = self.value {
			params.insert("value".into(), json!(hex_int(value)));
		}
		if let Some(step_limit) = self.step_limit {
			params.insert("stepLimit".into(), json!(hex_int(step_limit)));
		}
		params.insert("timestamp".into(), json!(format!("0x{:x}", self.timestamp)));
		params.insert("nid".into(), json!(self.nid));
		params.insert("dataType".into(), json!("call"));
		params.insert(
			"data".into(),
			json!({ "method": self.method, "params": Value::Object(self.params.clone()) }),
		);
		params
	}
}

/// Network id part of a protocol nid such as `0x1.icon`.
pub fn network_id(nid: &str) -> &str {
	nid.split('.').next().unwrap_or(nid)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconFailure {
	#[serde(default)]
	pub code: Value,
	#[serde(default)]
	pub message: String,
}

/// Result of `icx_getTransactionResult`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconTransactionResult {
	pub tx_hash: String,
	/// `0x1` on success, `0x0` on failure.
	pub status: String,
	#[serde(default)]
	pub block_height: Option<String>,
	#[serde(default)]
	pub step_used: Option<String>,
	#[serde(default)]
	pub event_logs: Vec<IconEventLog>,
	#[serde(default)]
	pub failure: Option<IconFailure>,
}

impl IconTransactionResult {
	pub fn is_success(&self) -> bool {
		self.status == "0x1"
	}
}

/// Clients for the main and debug ICON JSON-RPC endpoints.
#[derive(Debug)]
pub struct IconClient {
	rpc: JsonRpcClient,
	debug: JsonRpcClient,
}

impl IconClient {
	pub fn new(rpc_url: &str, debug_rpc_url: &str) -> Result<Self, IntentError> {
		Ok(Self {
			rpc: JsonRpcClient::new(rpc_url)?,
			debug: JsonRpcClient::new(debug_rpc_url)?,
		})
	}

	/// Steps the node expects the transaction to consume.
	///
	/// The estimate executes the call, so a revert surfaces here as
	/// `TransactionFailed`.
	pub async fn estimate_step(&self, tx: &IconTransaction) -> Result<U256, IntentError> {
		let mut params = tx.to_params();
		params.remove("stepLimit");
		let estimate: String = self
			.debug
			.call("debug_estimateStep", Value::Object(params))
			.await
			.map_err(RpcFailure::into_rejection)?;
		U256::from_str_radix(estimate.trim_start_matches("0x"), 16)
			.map_err(|e| IntentError::Rpc(format!("invalid step estimate '{}': {}", estimate, e)))
	}

	/// Broadcasts a signed transaction.
	pub async fn send_transaction(&self, signed: Map<String, Value>) -> Result<String, IntentError> {
		self.rpc
			.call("icx_sendTransaction", Value::Object(signed))
			.await
			.map_err(RpcFailure::into_rejection)
	}

	/// Transaction result, or `None` while it is pending or unknown.
	pub async fn get_transaction_result(
		&self,
		tx_hash: &str,
	) -> Result<Option<IconTransactionResult>, IntentError> {
		match self
			.rpc
			.call("icx_getTransactionResult", json!({ "txHash": tx_hash }))
			.await
		{
			Ok(result) => Ok(Some(result)),
			Err(RpcFailure::Node { code, .. }) if RESULT_PENDING_CODES.contains(&code) => Ok(None),
			Err(failure) => Err(failure.into()),
		}
	}
}

/// Signing identity of an ICON provider.
#[derive(Debug, Clone)]
pub enum IconWallet {
	LocalSigner(IconKeyPair),
	ExternalSignerHandle(ExternalSignerHandle),
}

impl IconWallet {
	pub fn address(&self) -> &str {
		match self {
			IconWallet::LocalSigner(keypair) => keypair.address(),
			IconWallet::ExternalSignerHandle(handle) => handle.address(),
		}
	}
}

/// How the wallet of an uninitialized provider is supplied.
#[derive(Debug, Clone)]
pub enum IconWalletInit {
	PrivateKey(String),
	Address(ExternalSignerHandle),
}

#[derive(Debug)]
pub enum IconProviderConfig {
	/// Endpoints and optional credentials.
	Uninitialized {
		rpc_url: String,
		debug_rpc_url: String,
		wallet: Option<IconWalletInit>,
	},
	/// Clients built by the caller.
	Initialized {
		client: IconClient,
		wallet: Option<IconWallet>,
	},
}

#[derive(Debug)]
pub struct IconProvider {
	wallet: Option<IconWallet>,
	client: IconClient,
}

impl IconProvider {
	pub fn new(config: IconProviderConfig) -> Result<Self, IntentError> {
		match config {
			IconProviderConfig::Uninitialized {
				rpc_url,
				debug_rpc_url,
				wallet,
			} => {
				let wallet = match wallet {
					Some(IconWalletInit::PrivateKey(key)) => {
						Some(IconWallet::LocalSigner(IconKeyPair::from_private_key(&key)?))
					}
					Some(IconWalletInit::Address(handle)) => {
						validate_address(handle.address())?;
						Some(IconWallet::ExternalSignerHandle(handle))
					}
					None => None,
				};
				Ok(Self {
					wallet,
					client: IconClient::new(&rpc_url, &debug_rpc_url)?,
				})
			}
			IconProviderConfig::Initialized { client, wallet } => Ok(Self { wallet, client }),
		}
	}

	pub fn client(&self) -> &IconClient {
		&self.client
	}

	pub fn can_sign(&self) -> bool {
		self.wallet.is_some()
	}

	pub fn wallet(&self) -> Result<&IconWallet, IntentError> {
		self.wallet
			.as_ref()
			.ok_or(IntentError::WalletNotInitialized(ChainType::Icon))
	}

	pub fn address(&self) -> Result<&str, IntentError> {
		Ok(self.wallet()?.address())
	}

	/// Signs and broadcasts `tx`, locally or through the external signer.
	pub async fn send_transaction(&self, tx: &IconTransaction) -> Result<String, IntentError> {
		let params = tx.to_params();
		match self.wallet()? {
			IconWallet::LocalSigner(keypair) => {
				let signature = keypair.sign(&params)?;
				let mut signed = params;
				signed.insert("signature".into(), json!(signature));
				let hash = self.client.send_transaction(signed).await?;
				tracing::info!(tx_hash = %hash, "Submitted ICON transaction");
				Ok(hash)
			}
			IconWallet::ExternalSignerHandle(handle) => {
				handle.send("icx_sendTransaction", Value::Object(params)).await
			}
		}
	}
}

fn validate_address(address: &str) -> Result<(), IntentError> {
	if intents_types::validation::is_valid_address(ChainType::Icon, address) && address.starts_with("hx") {
		Ok(())
	} else {
		Err(IntentError::InvalidConfiguration(format!(
			"'{}' is not an ICON wallet address",
			address
		)))
	}
}
