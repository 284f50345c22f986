//! End-to-end execution of a quoted intent.
//!
//! Each step is exposed on its own so callers can persist progress between
//! them; [`IntentOrchestrator::execute`] runs them in order:
//! submit on the source chain, notify the solver, watch the task, and on
//! success read the settled order from the destination chain.

use intents_chains::ChainServices;
use intents_providers::ChainProvider;
use intents_solver::SolverApiClient;
use intents_types::{
	Amount, ChainConfig, CreateIntentOrderPayload, IntentError, Quote, QuoteRequest, SwapOrder,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::lifecycle::{OrderLifecycle, OrderState};
use crate::poller::{PollResult, StatusPoller};

/// One side of a swap: its static configuration and a connected provider.
#[derive(Debug, Clone, Copy)]
pub struct ChainContext<'a> {
	pub config: &'a ChainConfig,
	pub provider: &'a ChainProvider,
}

impl<'a> ChainContext<'a> {
	pub fn new(config: &'a ChainConfig, provider: &'a ChainProvider) -> Self {
		Self { config, provider }
	}
}

/// Final report of [`IntentOrchestrator::execute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderOutcome {
	pub lifecycle: OrderLifecycle,
	/// Set when the watch ended before a terminal status.
	pub timed_out: bool,
	/// The order read back from the settlement transaction when SOLVED.
	pub settled_order: Option<SwapOrder>,
}

impl OrderOutcome {
	pub fn state(&self) -> OrderState {
		self.lifecycle.state()
	}

	pub fn is_success(&self) -> bool {
		self.state() == OrderState::Solved && self.settled_order.is_some()
	}
}

pub struct IntentOrchestrator {
	solver: SolverApiClient,
	chains: ChainServices,
	poller: StatusPoller,
}

impl IntentOrchestrator {
	pub fn new(solver: SolverApiClient, chains: ChainServices, poller: StatusPoller) -> Self {
		Self {
			solver,
			chains,
			poller,
		}
	}

	pub fn solver(&self) -> &SolverApiClient {
		&self.solver
	}

	pub fn chains(&self) -> &ChainServices {
		&self.chains
	}

	pub async fn quote(&self, request: &QuoteRequest) -> Result<Quote, IntentError> {
		self.solver.get_quote(request).await
	}

	/// Submits the intent with the quote's uuid embedded and notifies the
	/// solver. Returns the lifecycle in the SUBMITTED state.
	///
	/// When the transaction lands but the notification fails, the error is
	/// `NotifyFailed` carrying the intent tx hash; pass it to
	/// [`IntentOrchestrator::notify`] to resume.
	#[instrument(skip_all, fields(quote = %quote.uuid))]
	pub async fn submit(
		&self,
		quote: &Quote,
		payload: &CreateIntentOrderPayload,
		source: ChainContext<'_>,
		destination: &ChainConfig,
	) -> Result<OrderLifecycle, IntentError> {
		let mut payload = payload.clone();
		if payload.quote_uuid != quote.uuid {
			if !payload.quote_uuid.is_empty() {
				warn!(
					payload_uuid = %payload.quote_uuid,
					"Payload carries a different quote uuid, using the quote's"
				);
			}
			payload.quote_uuid = quote.uuid.clone();
		}

		let tx_hash = self
			.chains
			.create_intent_order(&payload, source.config, destination, source.provider)
			.await?;
		self.notify(quote, &tx_hash).await
	}

	/// Tells the solver about an intent already on chain and returns the
	/// lifecycle in the SUBMITTED state.
	pub async fn notify(&self, quote: &Quote, intent_tx_hash: &str) -> Result<OrderLifecycle, IntentError> {
		let task_id = match self.solver.notify_execution(intent_tx_hash, &quote.uuid).await {
			Ok(task_id) => task_id,
			Err(e) => {
				warn!(intent_tx_hash, "Solver notification failed: {}", e);
				return Err(IntentError::NotifyFailed {
					intent_tx_hash: intent_tx_hash.to_string(),
					source: Box::new(e),
				});
			}
		};
		let mut lifecycle = OrderLifecycle::quoted(quote.uuid.clone());
		lifecycle
			.submitted(intent_tx_hash.to_string(), task_id)
			.map_err(|e| IntentError::Unknown(e.to_string()))?;
		Ok(lifecycle)
	}

	/// Polls the solver until the order is terminal or the poll timeout hits.
	pub async fn watch(&self, lifecycle: &mut OrderLifecycle) -> Result<PollResult, IntentError> {
		self.poller.watch(&self.solver, lifecycle).await
	}

	/// Reads the order emitted by a transaction on `chain`.
	pub async fn order(&self, tx_hash: &str, chain: ChainContext<'_>) -> Result<SwapOrder, IntentError> {
		self.chains.get_order(tx_hash, chain.config, chain.provider).await
	}

	/// Cancels an outstanding order on its source chain.
	pub async fn cancel(&self, order_id: Amount, source: ChainContext<'_>) -> Result<String, IntentError> {
		self.chains
			.cancel_intent_order(order_id, source.config, source.provider)
			.await
	}

	/// Runs submission, notification, status watching and settlement lookup.
	pub async fn execute(
		&self,
		quote: &Quote,
		payload: &CreateIntentOrderPayload,
		source: ChainContext<'_>,
		destination: ChainContext<'_>,
	) -> Result<OrderOutcome, IntentError> {
		let mut lifecycle = self.submit(quote, payload, source, destination.config).await?;

		let timed_out = match self.watch(&mut lifecycle).await? {
			PollResult::Terminal(_) => false,
			PollResult::TimedOut { .. } => true,
		};

		let settled_order = match lifecycle.settlement_tx_hash() {
			Some(hash) => {
				let order = self.order(hash, destination).await?;
				if order.quote_uuid().as_deref() != Some(quote.uuid.as_str()) {
					warn!(
						expected = %quote.uuid,
						found = ?order.quote_uuid(),
						"Settled order carries a different quote uuid"
					);
				}
				Some(order)
			}
			None => None,
		};

		info!(
			state = %lifecycle.state(),
			timed_out,
			settled = settled_order.is_some(),
			"Intent execution finished"
		);
		Ok(OrderOutcome {
			lifecycle,
			timed_out,
			settled_order,
		})
	}
}
