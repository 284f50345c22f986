//! The canonical swap intent record.

use serde::{Deserialize, Serialize};

use crate::serde_helpers::amount_string;
use crate::{Amount, IntentError};

/// A swap intent as recorded by an intent contract.
///
/// `id` is zero until the source chain's contract assigns it at inclusion.
/// Addresses are opaque strings whose format depends on the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOrder {
	#[serde(with = "amount_string")]
	pub id: Amount,
	pub emitter: String,
	pub src_nid: String,
	pub dst_nid: String,
	pub creator: String,
	pub destination_address: String,
	pub token: String,
	#[serde(with = "amount_string")]
	pub amount: Amount,
	pub to_token: String,
	#[serde(with = "amount_string")]
	pub to_amount: Amount,
	#[serde(with = "hex_bytes")]
	pub data: Vec<u8>,
}

/// Auxiliary metadata carried in [`SwapOrder::data`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentData {
	pub quote_uuid: String,
}

impl IntentData {
	pub fn new(quote_uuid: impl Into<String>) -> Self {
		Self {
			quote_uuid: quote_uuid.into(),
		}
	}

	/// UTF-8 JSON bytes embedded into the on-chain order.
	pub fn to_bytes(&self) -> Vec<u8> {
		// Serializing a struct of strings cannot fail.
		serde_json::to_vec(self).unwrap_or_default()
	}
}

impl SwapOrder {
	/// Parses the auxiliary JSON payload.
	pub fn intent_data(&self) -> Result<IntentData, IntentError> {
		serde_json::from_slice(&self.data)
			.map_err(|e| IntentError::malformed(format!("invalid intent data: {}", e)))
	}

	/// Quote correlation id embedded in the order, if present.
	pub fn quote_uuid(&self) -> Option<String> {
		self.intent_data().ok().map(|d| d.quote_uuid)
	}

	/// Whether the source chain has assigned an id yet.
	pub fn is_assigned(&self) -> bool {
		!self.id.is_zero()
	}
}

mod hex_bytes {
	use serde::{de, Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&format!("0x{}", alloy::primitives::hex::encode(bytes)))
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let text = String::deserialize(deserializer)?;
		alloy::primitives::hex::decode(text.trim_start_matches("0x")).map_err(de::Error::custom)
	}
}
