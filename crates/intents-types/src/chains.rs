//! Chain identifiers and per-chain static configuration.
//!
//! A [`ChainConfig`] is loaded once when the embedding application is
//! configured and shared read-only by every service touching that chain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::IntentError;

/// Chain family, which selects the encoding and submission path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainType {
	Evm,
	Sui,
	Icon,
}

impl fmt::Display for ChainType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			ChainType::Evm => "evm",
			ChainType::Sui => "sui",
			ChainType::Icon => "icon",
		};
		f.write_str(name)
	}
}

/// Chains supported by the intent protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainName {
	Sui,
	Arb,
	Pol,
	Icon,
}

impl ChainName {
	pub const ALL: [ChainName; 4] = [ChainName::Sui, ChainName::Arb, ChainName::Pol, ChainName::Icon];

	/// Returns the family this chain belongs to.
	pub fn chain_type(&self) -> ChainType {
		match self {
			ChainName::Arb | ChainName::Pol => ChainType::Evm,
			ChainName::Sui => ChainType::Sui,
			ChainName::Icon => ChainType::Icon,
		}
	}

	/// EVM chain id used for replay protection, if this is an EVM chain.
	pub fn evm_chain_id(&self) -> Option<u64> {
		match self {
			ChainName::Arb => Some(42161),
			ChainName::Pol => Some(137),
			_ => None,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			ChainName::Sui => "sui",
			ChainName::Arb => "arb",
			ChainName::Pol => "pol",
			ChainName::Icon => "icon",
		}
	}
}

impl fmt::Display for ChainName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ChainName {
	type Err = IntentError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"sui" => Ok(ChainName::Sui),
			"arb" | "arbitrum" => Ok(ChainName::Arb),
			"pol" | "polygon" => Ok(ChainName::Pol),
			"icon" => Ok(ChainName::Icon),
			other => Err(IntentError::InvalidConfiguration(format!(
				"Unknown chain name: {}",
				other
			))),
		}
	}
}

/// A token the intent contract accepts on a given chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	pub symbol: String,
	#[serde(default)]
	pub name: String,
	pub decimals: u8,
	pub address: String,
}

/// Fields shared by every chain family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseChainConfig {
	pub chain: ChainName,
	/// Protocol level network id, e.g. `0xa4b1.arbitrum`.
	pub nid: String,
	#[serde(default)]
	pub supported_tokens: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmChainConfig {
	#[serde(flatten)]
	pub base: BaseChainConfig,
	pub intent_contract: String,
	pub native_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiChainConfig {
	#[serde(flatten)]
	pub base: BaseChainConfig,
	pub package_id: String,
	pub storage_id: String,
	pub native_token: String,
	/// Move module exposing the swap/cancel entry points and the order event.
	#[serde(default = "default_sui_module")]
	pub intent_module: String,
}

fn default_sui_module() -> String {
	"main".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconChainConfig {
	#[serde(flatten)]
	pub base: BaseChainConfig,
	pub intent_contract: String,
	pub native_token: String,
}

/// Static configuration of one chain, tagged by family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChainConfig {
	Evm(EvmChainConfig),
	Sui(SuiChainConfig),
	Icon(IconChainConfig),
}

/// Zero address sentinel for native EVM value transfers.
pub const EVM_NATIVE_SENTINEL: &str = "0x0000000000000000000000000000000000000000";
/// Zero address sentinel for native ICX transfers.
pub const ICON_NATIVE_SENTINEL: &str = "cx0000000000000000000000000000000000000000";
/// Fully qualified coin type of native SUI.
pub const SUI_NATIVE_SENTINEL: &str = "0x2::sui::SUI";

impl ChainConfig {
	fn base(&self) -> &BaseChainConfig {
		match self {
			ChainConfig::Evm(c) => &c.base,
			ChainConfig::Sui(c) => &c.base,
			ChainConfig::Icon(c) => &c.base,
		}
	}

	pub fn chain(&self) -> ChainName {
		self.base().chain
	}

	pub fn chain_type(&self) -> ChainType {
		match self {
			ChainConfig::Evm(_) => ChainType::Evm,
			ChainConfig::Sui(_) => ChainType::Sui,
			ChainConfig::Icon(_) => ChainType::Icon,
		}
	}

	pub fn nid(&self) -> &str {
		&self.base().nid
	}

	pub fn native_token(&self) -> &str {
		match self {
			ChainConfig::Evm(c) => &c.native_token,
			ChainConfig::Sui(c) => &c.native_token,
			ChainConfig::Icon(c) => &c.native_token,
		}
	}

	pub fn supported_tokens(&self) -> &[Token] {
		&self.base().supported_tokens
	}

	/// Address that emits swap orders on this chain (package id on Sui).
	pub fn emitter(&self) -> &str {
		match self {
			ChainConfig::Evm(c) => &c.intent_contract,
			ChainConfig::Sui(c) => &c.package_id,
			ChainConfig::Icon(c) => &c.intent_contract,
		}
	}

	/// Finds a supported token by address, ignoring case.
	pub fn find_token(&self, address: &str) -> Option<&Token> {
		self.supported_tokens()
			.iter()
			.find(|t| t.address.eq_ignore_ascii_case(address))
	}

	/// Whether `token` is this chain's native asset.
	///
	/// Matches the configured native token and the family's zero address
	/// sentinel, both case-insensitively.
	pub fn is_native_token(&self, token: &str) -> bool {
		let sentinel = match self.chain_type() {
			ChainType::Evm => EVM_NATIVE_SENTINEL,
			ChainType::Sui => SUI_NATIVE_SENTINEL,
			ChainType::Icon => ICON_NATIVE_SENTINEL,
		};
		token.eq_ignore_ascii_case(self.native_token()) || token.eq_ignore_ascii_case(sentinel)
	}

	/// Built-in production configuration for a chain.
	pub fn default_for(chain: ChainName) -> ChainConfig {
		match chain {
			ChainName::Arb => ChainConfig::Evm(EvmChainConfig {
				base: BaseChainConfig {
					chain,
					nid: "0xa4b1.arbitrum".to_string(),
					supported_tokens: vec![
						token("ETH", "Ethereum", 18, EVM_NATIVE_SENTINEL),
						token(
							"WETH",
							"Wrapped Ether",
							18,
							"0x82aF49447D8a07e3bd95BD0d56f35241523fBab1",
						),
						token(
							"USDC",
							"USD Coin",
							6,
							"0xaf88d065e77c8cC2239327C5EDb3A432268e5831",
						),
					],
				},
				intent_contract: "0x53E4f8Ef6D7cDbf3b3c5d0E16B2d8bd3F4A8cB5D".to_string(),
				native_token: EVM_NATIVE_SENTINEL.to_string(),
			}),
			ChainName::Pol => ChainConfig::Evm(EvmChainConfig {
				base: BaseChainConfig {
					chain,
					nid: "0x89.polygon".to_string(),
					supported_tokens: vec![token("POL", "Polygon", 18, EVM_NATIVE_SENTINEL)],
				},
				intent_contract: "0x53E4f8Ef6D7cDbf3b3c5d0E16B2d8bd3F4A8cB5D".to_string(),
				native_token: EVM_NATIVE_SENTINEL.to_string(),
			}),
			ChainName::Sui => ChainConfig::Sui(SuiChainConfig {
				base: BaseChainConfig {
					chain,
					nid: "sui".to_string(),
					supported_tokens: vec![token("SUI", "Sui", 9, SUI_NATIVE_SENTINEL)],
				},
				package_id: "0xbf8044a8f498b43e48ad9ad8a7d23027a45255903e8b4765dda38da2d1b89ed1"
					.to_string(),
				storage_id: "0x78e96d3cdf1a0ffd2b3a4a4f3f12fa1b2fcf2f0d6ef21cd44ee0d7c20fbfb0ef"
					.to_string(),
				native_token: SUI_NATIVE_SENTINEL.to_string(),
				intent_module: default_sui_module(),
			}),
			ChainName::Icon => ChainConfig::Icon(IconChainConfig {
				base: BaseChainConfig {
					chain,
					nid: "0x1.icon".to_string(),
					supported_tokens: vec![
						token("ICX", "ICON", 18, ICON_NATIVE_SENTINEL),
						token(
							"bnUSD",
							"Balanced Network USD",
							18,
							"cx88fd7df7ddff82f7cc735c871dc519838cb235bb",
						),
					],
				},
				intent_contract: "cxdc30a0d3a1f131565c071272a20bc0b06fd4c17b".to_string(),
				native_token: "cx3975b43d260fb8ec802cef6e60c2f4d07486f11d".to_string(),
			}),
		}
	}
}

fn token(symbol: &str, name: &str, decimals: u8, address: &str) -> Token {
	Token {
		symbol: symbol.to_string(),
		name: name.to_string(),
		decimals,
		address: address.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_chain_name_round_trip() {
		for chain in ChainName::ALL {
			assert_eq!(chain.as_str().parse::<ChainName>().unwrap(), chain);
		}
		assert!(matches!(
			"solana".parse::<ChainName>(),
			Err(IntentError::InvalidConfiguration(_))
		));
	}

	#[test]
	fn test_chain_types() {
		assert_eq!(ChainName::Arb.chain_type(), ChainType::Evm);
		assert_eq!(ChainName::Pol.chain_type(), ChainType::Evm);
		assert_eq!(ChainName::Sui.chain_type(), ChainType::Sui);
		assert_eq!(ChainName::Icon.chain_type(), ChainType::Icon);
		for chain in ChainName::ALL {
			assert_eq!(ChainConfig::default_for(chain).chain_type(), chain.chain_type());
		}
	}

	#[test]
	fn test_native_token_detection_is_case_insensitive() {
		let icon = ChainConfig::default_for(ChainName::Icon);
		assert!(icon.is_native_token("CX3975B43D260FB8EC802CEF6E60C2F4D07486F11D"));
		assert!(icon.is_native_token("cx0000000000000000000000000000000000000000"));
		assert!(icon.is_native_token("CX0000000000000000000000000000000000000000"));
		assert!(!icon.is_native_token("cx88fd7df7ddff82f7cc735c871dc519838cb235bb"));

		let arb = ChainConfig::default_for(ChainName::Arb);
		assert!(arb.is_native_token("0x0000000000000000000000000000000000000000"));
		assert!(!arb.is_native_token("0x82aF49447D8a07e3bd95BD0d56f35241523fBab1"));

		let sui = ChainConfig::default_for(ChainName::Sui);
		assert!(sui.is_native_token("0x2::SUI::SUI"));
	}

	#[test]
	fn test_find_token_ignores_case() {
		let arb = ChainConfig::default_for(ChainName::Arb);
		let weth = arb
			.find_token("0x82af49447d8a07e3bd95bd0d56f35241523fbab1")
			.unwrap();
		assert_eq!(weth.symbol, "WETH");
		assert!(arb.find_token("0xdead").is_none());
	}

	#[test]
	fn test_chain_config_tagged_serde() {
		let json = serde_json::json!({
			"type": "icon",
			"chain": "icon",
			"nid": "0x2.icon",
			"intent_contract": "cx1111111111111111111111111111111111111111",
			"native_token": "cx2222222222222222222222222222222222222222"
		});
		let config: ChainConfig = serde_json::from_value(json).unwrap();
		assert_eq!(config.chain_type(), ChainType::Icon);
		assert_eq!(config.nid(), "0x2.icon");
		assert!(config.supported_tokens().is_empty());
		assert_eq!(config.emitter(), "cx1111111111111111111111111111111111111111");
	}
}
