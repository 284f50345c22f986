use anyhow::{bail, Context, Result};
use clap::Parser;
use intents_config::{ConfigLoader, IntentsConfig};
use intents_core::{ChainContext, OrderLifecycle, PollResult};
use intents_types::QuoteRequest;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod runtime;

use cli::{Args, Command, Keys, SwapArgs};

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config = ConfigLoader::new()
		.with_file(&args.config)
		.load()
		.with_context(|| format!("Failed to load configuration from {:?}", args.config))?;

	let log_level = args.log_level.as_deref().unwrap_or(&config.logging.level);
	setup_tracing(log_level)?;

	match args.command {
		Command::Quote(swap) => quote(&config, &swap).await,
		Command::Execute { swap, to_address } => execute(&config, &args.keys, &swap, to_address).await,
		Command::Status { task_id } => status(&config, &task_id).await,
		Command::Watch { task_id } => watch(&config, task_id).await,
		Command::Order { chain, tx_hash } => {
			let orchestrator = runtime::orchestrator(&config)?;
			let entry = runtime::chain_entry(&config, chain)?;
			let provider = runtime::connect(entry, &args.keys)?;
			let order = orchestrator
				.order(&tx_hash, ChainContext::new(&entry.config, &provider))
				.await
				.context("Failed to read order")?;
			print_json(&order)
		}
		Command::Cancel { chain, order_id } => {
			let orchestrator = runtime::orchestrator(&config)?;
			let entry = runtime::chain_entry(&config, chain)?;
			let provider = runtime::connect(entry, &args.keys)?;
			let tx_hash = orchestrator
				.cancel(order_id, ChainContext::new(&entry.config, &provider))
				.await
				.context("Failed to cancel order")?;
			info!(order_id = %order_id, "Cancellation submitted");
			println!("{}", tx_hash);
			Ok(())
		}
		Command::Validate => validate(&config),
	}
}

fn quote_request(config: &IntentsConfig, swap: &SwapArgs) -> Result<QuoteRequest> {
	let source = runtime::chain_entry(config, swap.from)?;
	let destination = runtime::chain_entry(config, swap.to)?;
	Ok(QuoteRequest {
		token_src: swap.token_src.clone(),
		token_src_blockchain_id: source.config.nid().to_string(),
		token_dst: swap.token_dst.clone(),
		token_dst_blockchain_id: destination.config.nid().to_string(),
		amount: swap.amount,
		quote_type: swap.quote_type(),
	})
}

async fn quote(config: &IntentsConfig, swap: &SwapArgs) -> Result<()> {
	let orchestrator = runtime::orchestrator(config)?;
	let quote = orchestrator
		.quote(&quote_request(config, swap)?)
		.await
		.context("Quote request failed")?;
	print_json(&quote)
}

async fn execute(config: &IntentsConfig, keys: &Keys, swap: &SwapArgs, to_address: String) -> Result<()> {
	let orchestrator = runtime::orchestrator(config)?;
	let source = runtime::chain_entry(config, swap.from)?;
	let destination = runtime::chain_entry(config, swap.to)?;
	let source_provider = runtime::connect(source, keys)?;
	let destination_provider = runtime::connect(destination, keys)?;
	let from_address = runtime::signer_address(&source_provider)
		.with_context(|| format!("No signer available for {}", swap.from))?;

	let quote = orchestrator
		.quote(&quote_request(config, swap)?)
		.await
		.context("Quote request failed")?;
	info!(uuid = %quote.uuid, quoted_amount = %quote.quoted_amount, "Quote received");

	let payload = runtime::payload(swap, &quote, from_address, to_address);
	let outcome = orchestrator
		.execute(
			&quote,
			&payload,
			ChainContext::new(&source.config, &source_provider),
			ChainContext::new(&destination.config, &destination_provider),
		)
		.await
		.context("Intent execution failed")?;

	print_json(&outcome)?;
	if outcome.timed_out {
		warn!("Solver did not finish within the lifecycle timeout; resume with `intents watch`");
	}
	if !outcome.is_success() {
		bail!("Intent ended in state {}", outcome.state());
	}
	Ok(())
}

async fn status(config: &IntentsConfig, task_id: &str) -> Result<()> {
	let orchestrator = runtime::orchestrator(config)?;
	let status = orchestrator
		.solver()
		.get_status(task_id)
		.await
		.context("Status request failed")?;
	print_json(&status)
}

async fn watch(config: &IntentsConfig, task_id: String) -> Result<()> {
	let orchestrator = runtime::orchestrator(config)?;
	let mut lifecycle = OrderLifecycle::resume(task_id);
	let result = orchestrator
		.watch(&mut lifecycle)
		.await
		.context("Watching task failed")?;
	print_json(&lifecycle)?;
	if let PollResult::TimedOut { last } = result {
		bail!("Timed out waiting for the solver, last status: {:?}", last);
	}
	Ok(())
}

fn validate(config: &IntentsConfig) -> Result<()> {
	info!("Configuration is valid");
	info!("Solver endpoint: {}", config.solver.api_endpoint);
	for (name, entry) in &config.chains {
		info!(
			"  Chain: {} ({}, nid {}, {} tokens)",
			name,
			entry.config.chain_type(),
			entry.config.nid(),
			entry.config.supported_tokens().len()
		);
	}
	Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.try_init()?;

	Ok(())
}
