//! EVM encoding of swap orders.
//!
//! The intent contract takes the order as an ABI tuple in `swap` and emits
//! it back, with the assigned id, in the `SwapIntent` event.

use alloy::primitives::{Address, Bytes, Log, LogData, U256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolEvent, SolValue};
use intents_types::{IntentError, SwapOrder};

// Solidity definitions matching the deployed intent contract ABI.
sol! {
	/// Swap order tuple accepted by `swap`.
	struct SwapOrderData {
		uint256 id;
		string emitter;
		string srcNID;
		string dstNID;
		string creator;
		string destinationAddress;
		string token;
		uint256 amount;
		string toToken;
		uint256 toAmount;
		bytes data;
	}

	/// Intent contract entry points and events.
	interface IIntents {
		function swap(SwapOrderData order) external payable;
		function cancel(uint256 id) external;

		event SwapIntent(
			uint256 indexed id,
			string emitter,
			string srcNID,
			string dstNID,
			string creator,
			string destinationAddress,
			string token,
			uint256 amount,
			string toToken,
			uint256 toAmount,
			bytes data
		);
	}

	/// ERC-20 subset used before a non-native swap.
	interface IERC20 {
		function allowance(address owner, address spender) external view returns (uint256);
		function approve(address spender, uint256 amount) external returns (bool);
	}
}

impl From<&SwapOrder> for SwapOrderData {
	fn from(order: &SwapOrder) -> Self {
		SwapOrderData {
			id: order.id,
			emitter: order.emitter.clone(),
			srcNID: order.src_nid.clone(),
			dstNID: order.dst_nid.clone(),
			creator: order.creator.clone(),
			destinationAddress: order.destination_address.clone(),
			token: order.token.clone(),
			amount: order.amount,
			toToken: order.to_token.clone(),
			toAmount: order.to_amount,
			data: Bytes::from(order.data.clone()),
		}
	}
}

impl From<SwapOrderData> for SwapOrder {
	fn from(data: SwapOrderData) -> Self {
		SwapOrder {
			id: data.id,
			emitter: data.emitter,
			src_nid: data.srcNID,
			dst_nid: data.dstNID,
			creator: data.creator,
			destination_address: data.destinationAddress,
			token: data.token,
			amount: data.amount,
			to_token: data.toToken,
			to_amount: data.toAmount,
			data: data.data.to_vec(),
		}
	}
}

/// ABI-encodes the order tuple.
pub fn encode_order(order: &SwapOrder) -> Vec<u8> {
	SwapOrderData::from(order).abi_encode()
}

/// Decodes an ABI-encoded order tuple.
pub fn decode_order(bytes: &[u8]) -> Result<SwapOrder, IntentError> {
	SwapOrderData::abi_decode(bytes)
		.map(SwapOrder::from)
		.map_err(IntentError::malformed)
}

/// Calldata for `swap(order)`.
pub fn swap_calldata(order: &SwapOrder) -> Bytes {
	IIntents::swapCall {
		order: SwapOrderData::from(order),
	}
	.abi_encode()
	.into()
}

/// Calldata for `cancel(id)`.
pub fn cancel_calldata(order_id: U256) -> Bytes {
	IIntents::cancelCall { id: order_id }.abi_encode().into()
}

/// Calldata for `allowance(owner, spender)`.
pub fn allowance_calldata(owner: Address, spender: Address) -> Bytes {
	IERC20::allowanceCall { owner, spender }.abi_encode().into()
}

/// Decodes the return data of `allowance`.
pub fn decode_allowance(output: &[u8]) -> Result<U256, IntentError> {
	IERC20::allowanceCall::abi_decode_returns(output).map_err(IntentError::rpc)
}

/// Calldata for `approve(spender, amount)`.
pub fn approve_calldata(spender: Address, amount: U256) -> Bytes {
	IERC20::approveCall { spender, amount }.abi_encode().into()
}

/// Builds the `SwapIntent` log the contract emits for `order`.
pub fn encode_event(order: &SwapOrder, contract: Address) -> Log {
	let event = IIntents::SwapIntent {
		id: order.id,
		emitter: order.emitter.clone(),
		srcNID: order.src_nid.clone(),
		dstNID: order.dst_nid.clone(),
		creator: order.creator.clone(),
		destinationAddress: order.destination_address.clone(),
		token: order.token.clone(),
		amount: order.amount,
		toToken: order.to_token.clone(),
		toAmount: order.to_amount,
		data: Bytes::from(order.data.clone()),
	};
	Log {
		address: contract,
		data: event.encode_log_data(),
	}
}

/// Decodes a single `SwapIntent` log body.
pub fn decode_event(data: &LogData) -> Result<SwapOrder, IntentError> {
	let event = IIntents::SwapIntent::decode_log_data(data).map_err(IntentError::malformed)?;
	Ok(SwapOrder {
		id: event.id,
		emitter: event.emitter,
		src_nid: event.srcNID,
		dst_nid: event.dstNID,
		creator: event.creator,
		destination_address: event.destinationAddress,
		token: event.token,
		amount: event.amount,
		to_token: event.toToken,
		to_amount: event.toAmount,
		data: event.data.to_vec(),
	})
}

/// Whether `log` is a `SwapIntent` emitted by `contract`.
pub fn is_swap_intent(log: &Log, contract: Address) -> bool {
	log.address == contract
		&& log.data.topics().first() == Some(&IIntents::SwapIntent::SIGNATURE_HASH)
}

/// Locates and decodes the swap order emitted by `contract` in a receipt.
///
/// Fails with `OrderNotFound` when no matching log exists and with
/// `MalformedOrderData` when the matching log does not decode.
pub fn find_swap_order<'a>(
	logs: impl IntoIterator<Item = &'a Log>,
	contract: Address,
	tx_hash: &str,
) -> Result<SwapOrder, IntentError> {
	let log = logs
		.into_iter()
		.find(|log| is_swap_intent(log, contract))
		.ok_or_else(|| IntentError::OrderNotFound {
			tx_hash: tx_hash.to_string(),
		})?;
	decode_event(&log.data)
}

/// Parses an EVM address from configuration or user input.
pub fn parse_address(value: &str) -> Result<Address, IntentError> {
	value
		.parse::<Address>()
		.map_err(|e| IntentError::InvalidConfiguration(format!("invalid EVM address '{}': {}", value, e)))
}
