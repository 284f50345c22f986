//! Chain family implementations of [`IntentChainService`](crate::IntentChainService).

pub mod evm;
pub mod icon;
pub mod sui;
