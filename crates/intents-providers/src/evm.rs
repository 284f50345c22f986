//! EVM connection provider built on alloy.

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::TransportError;
use intents_types::{ChainName, ChainType, IntentError};

use crate::signer::ExternalSignerHandle;

/// Signing capability of an EVM provider.
#[derive(Clone)]
pub enum EvmWallet {
	/// A private key held in process; `client` signs and fills requests.
	Local { address: Address, client: DynProvider },
	/// An injected wallet reached through an external connector.
	External(ExternalSignerHandle),
}

impl std::fmt::Debug for EvmWallet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			EvmWallet::Local { address, .. } => f.debug_struct("Local").field("address", address).finish(),
			EvmWallet::External(handle) => f.debug_tuple("External").field(handle).finish(),
		}
	}
}

impl EvmWallet {
	pub fn address(&self) -> Result<Address, IntentError> {
		match self {
			EvmWallet::Local { address, .. } => Ok(*address),
			EvmWallet::External(handle) => handle.address().parse().map_err(|e| {
				IntentError::InvalidConfiguration(format!(
					"invalid EVM address '{}': {}",
					handle.address(),
					e
				))
			}),
		}
	}

	/// Signs and broadcasts `request`, returning the transaction hash.
	pub async fn send_transaction(&self, request: TransactionRequest) -> Result<String, IntentError> {
		match self {
			EvmWallet::Local { client, .. } => {
				let pending = client.send_transaction(request).await.map_err(|e| {
					IntentError::TransactionFailed {
						tx_hash: None,
						reason: e.to_string(),
					}
				})?;
				let hash = format!("{:#x}", pending.tx_hash());
				tracing::info!(tx_hash = %hash, "Submitted EVM transaction");
				Ok(hash)
			}
			EvmWallet::External(handle) => {
				let params = serde_json::to_value(&request).map_err(IntentError::rpc)?;
				handle
					.send("eth_sendTransaction", serde_json::Value::Array(vec![params]))
					.await
			}
		}
	}
}

/// Converts a failed read call, keeping node error objects apart from
/// transport failures.
pub fn rpc_error(method: &str, err: TransportError) -> IntentError {
	match err.as_error_resp() {
		Some(payload) => IntentError::RpcRejected {
			method: method.to_string(),
			code: payload.code,
			message: payload.message.to_string(),
		},
		None => IntentError::Rpc(format!("{}: {}", method, err)),
	}
}

#[derive(Debug)]
pub enum EvmUninitializedConfig {
	/// An injected wallet account; reads go to `rpc_url`.
	BrowserInjected {
		chain: ChainName,
		rpc_url: String,
		wallet: ExternalSignerHandle,
	},
	/// A private key, if any, and the RPC endpoint.
	PrivateKey {
		chain: ChainName,
		rpc_url: String,
		private_key: Option<String>,
	},
}

pub enum EvmProviderConfig {
	Uninitialized(EvmUninitializedConfig),
	/// Clients built by the caller.
	Initialized {
		read: DynProvider,
		wallet: Option<EvmWallet>,
	},
}

#[derive(Clone)]
pub struct EvmProvider {
	read: DynProvider,
	wallet: Option<EvmWallet>,
}

impl std::fmt::Debug for EvmProvider {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EvmProvider")
			.field("wallet", &self.wallet)
			.finish_non_exhaustive()
	}
}

fn parse_url(rpc_url: &str) -> Result<reqwest::Url, IntentError> {
	let url: reqwest::Url = rpc_url
		.parse()
		.map_err(|e| IntentError::InvalidConfiguration(format!("Invalid RPC URL '{}': {}", rpc_url, e)))?;
	if !matches!(url.scheme(), "http" | "https") {
		return Err(IntentError::InvalidConfiguration(format!(
			"RPC URL must be http(s): {}",
			rpc_url
		)));
	}
	Ok(url)
}

fn ensure_evm(chain: ChainName) -> Result<(), IntentError> {
	if chain.chain_type() == ChainType::Evm {
		Ok(())
	} else {
		Err(IntentError::InvalidConfiguration(format!(
			"{} is not an EVM chain",
			chain
		)))
	}
}

impl EvmProvider {
	pub fn new(config: EvmProviderConfig) -> Result<Self, IntentError> {
		match config {
			EvmProviderConfig::Uninitialized(EvmUninitializedConfig::BrowserInjected {
				chain,
				rpc_url,
				wallet,
			}) => {
				ensure_evm(chain)?;
				let url = parse_url(&rpc_url)?;
				let wallet = EvmWallet::External(wallet);
				wallet.address()?;
				Ok(Self {
					read: ProviderBuilder::new().connect_http(url).erased(),
					wallet: Some(wallet),
				})
			}
			EvmProviderConfig::Uninitialized(EvmUninitializedConfig::PrivateKey {
				chain,
				rpc_url,
				private_key,
			}) => {
				ensure_evm(chain)?;
				let url = parse_url(&rpc_url)?;
				let read = ProviderBuilder::new().connect_http(url.clone()).erased();
				let wallet = match private_key {
					Some(key) => {
						let signer: PrivateKeySigner = key.parse().map_err(|e| {
							IntentError::InvalidConfiguration(format!("Invalid private key: {}", e))
						})?;
						let address = signer.address();
						let client = ProviderBuilder::new()
							.wallet(EthereumWallet::from(signer))
							.connect_http(url)
							.erased();
						Some(EvmWallet::Local { address, client })
					}
					None => None,
				};
				Ok(Self { read, wallet })
			}
			EvmProviderConfig::Initialized { read, wallet } => Ok(Self { read, wallet }),
		}
	}

	/// Read-only client, always present.
	pub fn read(&self) -> &DynProvider {
		&self.read
	}

	pub fn can_sign(&self) -> bool {
		self.wallet.is_some()
	}

	pub fn wallet(&self) -> Result<&EvmWallet, IntentError> {
		self.wallet
			.as_ref()
			.ok_or(IntentError::WalletNotInitialized(ChainType::Evm))
	}
}
