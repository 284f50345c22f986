//! Shared types for the cross-chain intent SDK.
//!
//! This crate holds the value objects exchanged between the chain adapters,
//! the payload codec and the solver API client: swap orders, quotes, intent
//! status codes, per-chain configuration and the common error taxonomy.

pub mod chains;
pub mod errors;
pub mod order;
pub mod payload;
pub mod serde_helpers;
pub mod solver;
pub mod validation;

pub use chains::*;
pub use errors::*;
pub use order::*;
pub use payload::*;
pub use solver::*;

/// Token amounts in the token's native decimal scale.
///
/// Every chain adapter and the solver client share this single integer type.
pub type Amount = alloy::primitives::U256;

/// Result alias used by every public SDK operation.
pub type IntentResult<T> = Result<T, IntentError>;
