//! Chain connection providers.
//!
//! Each provider pairs a read client, which is always present, with an
//! optional signing identity. Constructors take an explicit
//! initialized/uninitialized configuration and fail with
//! `InvalidConfiguration` on malformed input; asking a read-only provider
//! for its wallet fails with `WalletNotInitialized`.

pub mod evm;
pub mod icon;
pub mod rpc;
pub mod signer;
pub mod sui;

pub use evm::{EvmProvider, EvmProviderConfig, EvmUninitializedConfig, EvmWallet};
pub use icon::{IconClient, IconProvider, IconProviderConfig, IconTransaction, IconWallet, IconWalletInit};
pub use signer::{ConnectorError, ExternalSigner, ExternalSignerHandle, SigningRequest};
pub use sui::{SuiClient, SuiProvider, SuiProviderConfig};

use intents_types::ChainType;

/// A provider for any supported chain family.
#[derive(Debug)]
pub enum ChainProvider {
	Evm(EvmProvider),
	Sui(SuiProvider),
	Icon(IconProvider),
}

impl ChainProvider {
	pub fn chain_type(&self) -> ChainType {
		match self {
			ChainProvider::Evm(_) => ChainType::Evm,
			ChainProvider::Sui(_) => ChainType::Sui,
			ChainProvider::Icon(_) => ChainType::Icon,
		}
	}

	/// Whether a signing identity is available, without erroring.
	pub fn can_sign(&self) -> bool {
		match self {
			ChainProvider::Evm(p) => p.can_sign(),
			ChainProvider::Sui(p) => p.can_sign(),
			ChainProvider::Icon(p) => p.can_sign(),
		}
	}
}

impl From<EvmProvider> for ChainProvider {
	fn from(provider: EvmProvider) -> Self {
		ChainProvider::Evm(provider)
	}
}

impl From<SuiProvider> for ChainProvider {
	fn from(provider: SuiProvider) -> Self {
		ChainProvider::Sui(provider)
	}
}

impl From<IconProvider> for ChainProvider {
	fn from(provider: IconProvider) -> Self {
		ChainProvider::Icon(provider)
	}
}
