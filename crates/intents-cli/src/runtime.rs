//! Wiring of configuration, providers and the orchestrator.

use anyhow::{anyhow, Context, Result};
use intents_chains::{ChainServices, WaitPolicy};
use intents_config::{ChainEntry, IntentsConfig};
use intents_core::{IntentOrchestrator, PollPolicy, StatusPoller};
use intents_providers::{
	ChainProvider, EvmProvider, EvmProviderConfig, EvmUninitializedConfig, IconProvider,
	IconProviderConfig, IconWalletInit, SuiProvider, SuiProviderConfig,
};
use intents_solver::{SolverApiClient, SolverApiConfig};
use intents_types::{Amount, ChainConfig, ChainName, CreateIntentOrderPayload, Quote, QuoteType};

use crate::cli::{Keys, SwapArgs};

pub fn orchestrator(config: &IntentsConfig) -> Result<IntentOrchestrator> {
	let mut solver = SolverApiConfig::new(config.solver.api_endpoint.clone())
		.with_timeout(config.solver.timeout());
	solver.headers = config
		.solver
		.headers
		.iter()
		.map(|(k, v)| (k.clone(), v.clone()))
		.collect();
	let solver = SolverApiClient::new(solver).context("Failed to create solver client")?;

	let lifecycle = &config.lifecycle;
	let chains = ChainServices::new(WaitPolicy::new(
		lifecycle.receipt_timeout(),
		lifecycle.poll_interval(),
	));
	let poller = StatusPoller::new(PollPolicy {
		interval: lifecycle.poll_interval(),
		timeout: lifecycle.timeout(),
	});
	Ok(IntentOrchestrator::new(solver, chains, poller))
}

pub fn chain_entry(config: &IntentsConfig, chain: ChainName) -> Result<&ChainEntry> {
	config
		.chain(chain)
		.ok_or_else(|| anyhow!("Chain '{}' is not configured", chain))
}

/// Connects to the chain's node, with a signer when a key is available.
pub fn connect(entry: &ChainEntry, keys: &Keys) -> Result<ChainProvider> {
	let rpc_url = entry.rpc_url.clone();
	let provider: ChainProvider = match &entry.config {
		ChainConfig::Evm(evm) => EvmProvider::new(EvmProviderConfig::Uninitialized(
			EvmUninitializedConfig::PrivateKey {
				chain: evm.base.chain,
				rpc_url,
				private_key: keys.evm_private_key.clone(),
			},
		))?
		.into(),
		ChainConfig::Icon(_) => IconProvider::new(IconProviderConfig::Uninitialized {
			rpc_url,
			debug_rpc_url: entry.debug_rpc_url(),
			wallet: keys.icon_private_key.clone().map(IconWalletInit::PrivateKey),
		})?
		.into(),
		ChainConfig::Sui(_) => SuiProvider::new(SuiProviderConfig::Uninitialized {
			rpc_url,
			account: keys.sui_account.clone(),
			wallet: None,
		})?
		.into(),
	};
	Ok(provider)
}

/// Address that signs on behalf of `provider`.
pub fn signer_address(provider: &ChainProvider) -> Result<String> {
	let address = match provider {
		ChainProvider::Evm(p) => p.wallet()?.address()?.to_string(),
		ChainProvider::Icon(p) => p.address()?.to_string(),
		ChainProvider::Sui(p) => p.wallet()?.address().to_string(),
	};
	Ok(address)
}

/// Builds the intent payload for a quoted swap.
///
/// For an exact-input quote the quoted amount is what the recipient gets;
/// for exact-output it is what the sender pays.
pub fn payload(
	swap: &SwapArgs,
	quote: &Quote,
	from_address: String,
	to_address: String,
) -> CreateIntentOrderPayload {
	let (amount, to_amount): (Amount, Amount) = match swap.quote_type() {
		QuoteType::ExactInput => (swap.amount, quote.quoted_amount),
		QuoteType::ExactOutput => (quote.quoted_amount, swap.amount),
	};
	CreateIntentOrderPayload {
		quote_uuid: quote.uuid.clone(),
		from_address,
		to_address,
		from_chain: swap.from,
		to_chain: swap.to,
		token: swap.token_src.clone(),
		amount,
		to_token: swap.token_dst.clone(),
		to_amount,
	}
}
