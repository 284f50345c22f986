//! Caller input for creating an intent order.

use serde::{Deserialize, Serialize};

use crate::serde_helpers::amount_string;
use crate::{Amount, ChainConfig, ChainName, IntentData, IntentError, SwapOrder};

/// Everything needed to submit an intent on the source chain.
///
/// Amounts are expressed in each token's own decimal scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIntentOrderPayload {
	pub quote_uuid: String,
	pub from_address: String,
	pub to_address: String,
	pub from_chain: ChainName,
	pub to_chain: ChainName,
	pub token: String,
	#[serde(with = "amount_string")]
	pub amount: Amount,
	pub to_token: String,
	#[serde(with = "amount_string")]
	pub to_amount: Amount,
}

impl CreateIntentOrderPayload {
	/// Builds the unassigned swap order this payload describes.
	///
	/// The quote uuid is embedded unmodified into the order's data field.
	pub fn to_swap_order(
		&self,
		source: &ChainConfig,
		destination: &ChainConfig,
	) -> Result<SwapOrder, IntentError> {
		if source.chain() != self.from_chain {
			return Err(IntentError::InvalidConfiguration(format!(
				"source config is for {} but payload originates on {}",
				source.chain(),
				self.from_chain
			)));
		}
		if destination.chain() != self.to_chain {
			return Err(IntentError::InvalidConfiguration(format!(
				"destination config is for {} but payload targets {}",
				destination.chain(),
				self.to_chain
			)));
		}
		if self.quote_uuid.is_empty() {
			return Err(IntentError::InvalidConfiguration(
				"quote uuid must not be empty".to_string(),
			));
		}

		Ok(SwapOrder {
			id: Amount::ZERO,
			emitter: source.emitter().to_string(),
			src_nid: source.nid().to_string(),
			dst_nid: destination.nid().to_string(),
			creator: self.from_address.clone(),
			destination_address: self.to_address.clone(),
			token: self.token.clone(),
			amount: self.amount,
			to_token: self.to_token.clone(),
			to_amount: self.to_amount,
			data: IntentData::new(self.quote_uuid.clone()).to_bytes(),
		})
	}
}
