//! Intent payload codec.
//!
//! Serializes a [`SwapOrder`](intents_types::SwapOrder) into each chain
//! family's native representation and decodes the swap order event a chain
//! emits back into the canonical record. Every implementation keeps amounts
//! in the shared integer type; no path goes through floating point.
//!
//! - [`evm`]: Solidity ABI tuple, `swap`/`cancel` calldata and the
//!   `SwapIntent` log.
//! - [`icon`]: RLP list with signed big-endian integers, the token fallback
//!   envelope and ICON event logs.
//! - [`sui`]: Move event field layout as returned by the Sui JSON-RPC API.

pub mod evm;
pub mod icon;
pub mod sui;

/// Event name emitted by every intent contract when an order is created.
pub const SWAP_INTENT_EVENT: &str = "SwapIntent";
