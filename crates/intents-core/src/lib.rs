//! Order lifecycle orchestration.
//!
//! Ties quoting, source-chain submission, solver notification and status
//! polling together. The pieces are usable on their own: [`OrderLifecycle`]
//! is the state machine, [`StatusPoller`] the polling discipline on top of
//! any [`StatusSource`], and [`IntentOrchestrator`] the end-to-end flow.

pub mod lifecycle;
pub mod orchestrator;
pub mod poller;

pub use lifecycle::{LifecycleError, OrderLifecycle, OrderState};
pub use orchestrator::{ChainContext, IntentOrchestrator, OrderOutcome};
pub use poller::{PollPolicy, PollResult, StatusPoller, StatusSource};
