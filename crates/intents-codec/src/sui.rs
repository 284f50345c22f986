//! Sui encoding of swap orders.
//!
//! On Sui the order is passed as Move call arguments and emitted as a
//! `SwapIntent` event whose `parsedJson` mirrors the Move struct layout:
//! integers as decimal strings and `data` as an array of bytes.

use intents_types::serde_helpers::amount_string;
use intents_types::{Amount, IntentError, SwapOrder};
use serde::{Deserialize, Serialize};

use crate::SWAP_INTENT_EVENT;

/// An event as returned by `sui_getTransactionBlock` with `showEvents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiEvent {
	#[serde(rename = "type")]
	pub type_: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub package_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub transaction_module: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sender: Option<String>,
	pub parsed_json: serde_json::Value,
}

/// Move layout of the `SwapIntent` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SwapIntentFields {
	#[serde(with = "amount_string")]
	id: Amount,
	emitter: String,
	src_nid: String,
	dst_nid: String,
	creator: String,
	destination_address: String,
	token: String,
	#[serde(with = "amount_string")]
	amount: Amount,
	to_token: String,
	#[serde(with = "amount_string")]
	to_amount: Amount,
	data: Vec<u8>,
}

/// Fully qualified event type emitted by `package::module`.
pub fn event_type(package_id: &str, module: &str) -> String {
	format!("{}::{}::{}", package_id, module, SWAP_INTENT_EVENT)
}

/// Normalizes the address part of a Move type tag so `0x02::m::T` and
/// `0x2::m::T` compare equal.
fn normalize_type(type_tag: &str) -> String {
	let (address, rest) = type_tag.split_once("::").unwrap_or((type_tag, ""));
	let digits = address.trim_start_matches("0x").trim_start_matches('0');
	format!("0x{}::{}", digits.to_ascii_lowercase(), rest)
}

/// Builds the event the intent module emits for `order`.
pub fn encode_event(order: &SwapOrder, package_id: &str, module: &str) -> SuiEvent {
	let fields = SwapIntentFields {
		id: order.id,
		emitter: order.emitter.clone(),
		src_nid: order.src_nid.clone(),
		dst_nid: order.dst_nid.clone(),
		creator: order.creator.clone(),
		destination_address: order.destination_address.clone(),
		token: order.token.clone(),
		amount: order.amount,
		to_token: order.to_token.clone(),
		to_amount: order.to_amount,
		data: order.data.clone(),
	};
	SuiEvent {
		type_: event_type(package_id, module),
		package_id: Some(package_id.to_string()),
		transaction_module: Some(module.to_string()),
		sender: Some(order.creator.clone()),
		parsed_json: serde_json::to_value(fields).unwrap_or_default(),
	}
}

/// Decodes the `parsedJson` body of a `SwapIntent` event.
pub fn decode_event(event: &SuiEvent) -> Result<SwapOrder, IntentError> {
	let fields: SwapIntentFields = serde_json::from_value(event.parsed_json.clone())
		.map_err(|e| IntentError::malformed(format!("invalid SwapIntent event: {}", e)))?;
	Ok(SwapOrder {
		id: fields.id,
		emitter: fields.emitter,
		src_nid: fields.src_nid,
		dst_nid: fields.dst_nid,
		creator: fields.creator,
		destination_address: fields.destination_address,
		token: fields.token,
		amount: fields.amount,
		to_token: fields.to_token,
		to_amount: fields.to_amount,
		data: fields.data,
	})
}

/// Whether `event` is the `SwapIntent` of `package_id::module`.
pub fn is_swap_intent(event: &SuiEvent, package_id: &str, module: &str) -> bool {
	normalize_type(&event.type_) == normalize_type(&event_type(package_id, module))
}

/// Locates and decodes the swap order among a transaction's events.
pub fn find_swap_order(
	events: &[SuiEvent],
	package_id: &str,
	module: &str,
	digest: &str,
) -> Result<SwapOrder, IntentError> {
	let event = events
		.iter()
		.find(|event| is_swap_intent(event, package_id, module))
		.ok_or_else(|| IntentError::OrderNotFound {
			tx_hash: digest.to_string(),
		})?;
	decode_event(event)
}
