//! ICON encoding of swap orders.
//!
//! The intent SCORE receives the order as an RLP list wrapped in a
//! token-fallback envelope, and reports it back through a `SwapIntent`
//! event log whose integers are `0x` hex strings.

use alloy::primitives::U256;
use alloy::rlp::{Encodable, Header};
use intents_types::{IntentError, SwapOrder};
use serde::{Deserialize, Serialize};

/// Signature of the order event as it appears in `indexed[0]`.
pub const SWAP_INTENT_SIGNATURE: &str = "SwapIntent(int,str,str,str,str,str,str,int,str,int,bytes)";

/// Method tag carried by the fallback envelope for new orders.
pub const SWAP_METHOD: &str = "swap";

const DATA_FIELDS: usize = 10;

/// Minimal two's complement big-endian bytes of a non-negative integer.
///
/// Zero is a single `0x00` byte and a leading `0x00` is kept whenever the
/// top bit is set, so the value never reads back as negative.
pub fn signed_bytes(value: U256) -> Vec<u8> {
	let bytes = value.to_be_bytes_trimmed_vec();
	match bytes.first() {
		None => vec![0],
		Some(first) if first & 0x80 != 0 => {
			let mut padded = Vec::with_capacity(bytes.len() + 1);
			padded.push(0);
			padded.extend_from_slice(&bytes);
			padded
		}
		Some(_) => bytes,
	}
}

fn unsigned_from_signed(bytes: &[u8]) -> Result<U256, IntentError> {
	if bytes.first().is_some_and(|b| b & 0x80 != 0) {
		return Err(IntentError::malformed("negative integer in order"));
	}
	U256::try_from_be_slice(bytes).ok_or_else(|| IntentError::malformed("integer exceeds 256 bits"))
}

fn encode_list(items: &[&[u8]]) -> Vec<u8> {
	let mut payload = Vec::new();
	for item in items {
		item.encode(&mut payload);
	}
	let mut out = Vec::with_capacity(payload.len() + 9);
	Header {
		list: true,
		payload_length: payload.len(),
	}
	.encode(&mut out);
	out.extend_from_slice(&payload);
	out
}

fn decode_list(bytes: &[u8]) -> Result<Vec<&[u8]>, IntentError> {
	let mut buf = bytes;
	let mut payload = Header::decode_bytes(&mut buf, true).map_err(IntentError::malformed)?;
	if !buf.is_empty() {
		return Err(IntentError::malformed("trailing bytes after RLP list"));
	}
	let mut items = Vec::new();
	while !payload.is_empty() {
		items.push(Header::decode_bytes(&mut payload, false).map_err(IntentError::malformed)?);
	}
	Ok(items)
}

fn utf8(bytes: &[u8]) -> Result<String, IntentError> {
	String::from_utf8(bytes.to_vec()).map_err(IntentError::malformed)
}

/// RLP-encodes the order in field order.
pub fn encode_order(order: &SwapOrder) -> Vec<u8> {
	let id = signed_bytes(order.id);
	let amount = signed_bytes(order.amount);
	let to_amount = signed_bytes(order.to_amount);
	encode_list(&[
		id.as_slice(),
		order.emitter.as_bytes(),
		order.src_nid.as_bytes(),
		order.dst_nid.as_bytes(),
		order.creator.as_bytes(),
		order.destination_address.as_bytes(),
		order.token.as_bytes(),
		amount.as_slice(),
		order.to_token.as_bytes(),
		to_amount.as_slice(),
		order.data.as_slice(),
	])
}

/// Decodes an RLP-encoded order.
pub fn decode_order(bytes: &[u8]) -> Result<SwapOrder, IntentError> {
	let items = decode_list(bytes)?;
	if items.len() != DATA_FIELDS + 1 {
		return Err(IntentError::malformed(format!(
			"expected {} order fields, got {}",
			DATA_FIELDS + 1,
			items.len()
		)));
	}
	Ok(SwapOrder {
		id: unsigned_from_signed(items[0])?,
		emitter: utf8(items[1])?,
		src_nid: utf8(items[2])?,
		dst_nid: utf8(items[3])?,
		creator: utf8(items[4])?,
		destination_address: utf8(items[5])?,
		token: utf8(items[6])?,
		amount: unsigned_from_signed(items[7])?,
		to_token: utf8(items[8])?,
		to_amount: unsigned_from_signed(items[9])?,
		data: items[10].to_vec(),
	})
}

/// Envelope passed as `_data` to a token `transfer` so the intent SCORE's
/// token fallback knows which action to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFallbackData {
	pub swap_order: Vec<u8>,
	pub method: String,
	pub solver: Vec<u8>,
}

impl TokenFallbackData {
	/// Envelope for a new order, with no solver assigned.
	pub fn for_swap(swap_order: Vec<u8>) -> Self {
		Self {
			swap_order,
			method: SWAP_METHOD.to_string(),
			solver: Vec::new(),
		}
	}

	pub fn to_bytes(&self) -> Vec<u8> {
		encode_list(&[
			self.swap_order.as_slice(),
			self.method.as_bytes(),
			self.solver.as_slice(),
		])
	}

	/// `0x`-prefixed hex form expected by the `_data` parameter.
	pub fn to_hex(&self) -> String {
		format!("0x{}", hex::encode(self.to_bytes()))
	}

	pub fn from_bytes(bytes: &[u8]) -> Result<Self, IntentError> {
		let items = decode_list(bytes)?;
		if items.len() != 3 {
			return Err(IntentError::malformed(format!(
				"expected 3 fallback fields, got {}",
				items.len()
			)));
		}
		Ok(Self {
			swap_order: items[0].to_vec(),
			method: utf8(items[1])?,
			solver: items[2].to_vec(),
		})
	}

	pub fn from_hex(text: &str) -> Result<Self, IntentError> {
		let bytes = hex::decode(text.trim_start_matches("0x")).map_err(IntentError::malformed)?;
		Self::from_bytes(&bytes)
	}
}

/// An event log entry of an ICON transaction result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconEventLog {
	#[serde(rename = "scoreAddress")]
	pub score_address: String,
	pub indexed: Vec<String>,
	#[serde(default)]
	pub data: Vec<String>,
}

fn int_hex(value: U256) -> String {
	format!("0x{:x}", value)
}

fn parse_int_hex(field: &str, text: &str) -> Result<U256, IntentError> {
	let digits = text
		.strip_prefix("0x")
		.ok_or_else(|| IntentError::malformed(format!("{} is not a hex integer: {}", field, text)))?;
	U256::from_str_radix(digits, 16)
		.map_err(|e| IntentError::malformed(format!("{} is not a hex integer: {}", field, e)))
}

/// Builds the log the intent SCORE emits for `order`.
pub fn encode_event(order: &SwapOrder, score_address: &str) -> IconEventLog {
	IconEventLog {
		score_address: score_address.to_string(),
		indexed: vec![SWAP_INTENT_SIGNATURE.to_string(), int_hex(order.id)],
		data: vec![
			order.emitter.clone(),
			order.src_nid.clone(),
			order.dst_nid.clone(),
			order.creator.clone(),
			order.destination_address.clone(),
			order.token.clone(),
			int_hex(order.amount),
			order.to_token.clone(),
			int_hex(order.to_amount),
			format!("0x{}", hex::encode(&order.data)),
		],
	}
}

/// Decodes a `SwapIntent` log, checking its arity.
pub fn decode_event(log: &IconEventLog) -> Result<SwapOrder, IntentError> {
	if log.indexed.len() != 2 || log.data.len() != DATA_FIELDS {
		return Err(IntentError::malformed(format!(
			"SwapIntent log has {} indexed and {} data fields",
			log.indexed.len(),
			log.data.len()
		)));
	}
	let d = &log.data;
	let data = hex::decode(d[9].trim_start_matches("0x")).map_err(IntentError::malformed)?;
	Ok(SwapOrder {
		id: parse_int_hex("id", &log.indexed[1])?,
		emitter: d[0].clone(),
		src_nid: d[1].clone(),
		dst_nid: d[2].clone(),
		creator: d[3].clone(),
		destination_address: d[4].clone(),
		token: d[5].clone(),
		amount: parse_int_hex("amount", &d[6])?,
		to_token: d[7].clone(),
		to_amount: parse_int_hex("toAmount", &d[8])?,
		data,
	})
}

/// Whether `log` is a `SwapIntent` emitted by `score_address`.
pub fn is_swap_intent(log: &IconEventLog, score_address: &str) -> bool {
	log.score_address.eq_ignore_ascii_case(score_address)
		&& log.indexed.first().map(String::as_str) == Some(SWAP_INTENT_SIGNATURE)
}

/// Locates and decodes the swap order in a transaction result's event logs.
pub fn find_swap_order(
	logs: &[IconEventLog],
	score_address: &str,
	tx_hash: &str,
) -> Result<SwapOrder, IntentError> {
	let log = logs
		.iter()
		.find(|log| is_swap_intent(log, score_address))
		.ok_or_else(|| IntentError::OrderNotFound {
			tx_hash: tx_hash.to_string(),
		})?;
	decode_event(log)
}
