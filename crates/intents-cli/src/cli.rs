//! Command-line interface definitions.

use clap::{Args as ClapArgs, Parser, Subcommand};
use intents_types::serde_helpers::parse_amount;
use intents_types::{Amount, ChainName, QuoteType};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "intents")]
#[command(about = "Cross-chain intent swaps through the solver API", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
	/// Path to configuration file
	#[arg(short, long, env = "INTENTS_CONFIG", default_value = "config/intents.toml")]
	pub config: PathBuf,

	/// Log level override (trace, debug, info, warn, error)
	#[arg(short, long)]
	pub log_level: Option<String>,

	#[command(flatten)]
	pub keys: Keys,

	#[command(subcommand)]
	pub command: Command,
}

/// Signing material, taken from the environment unless passed explicitly.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct Keys {
	/// Private key for EVM chains
	#[arg(long, env = "INTENTS_EVM_PRIVATE_KEY", hide_env_values = true)]
	pub evm_private_key: Option<String>,

	/// Private key for ICON
	#[arg(long, env = "INTENTS_ICON_PRIVATE_KEY", hide_env_values = true)]
	pub icon_private_key: Option<String>,

	/// Sui account used for coin lookups; Sui signing needs a wallet connector
	#[arg(long, env = "INTENTS_SUI_ACCOUNT")]
	pub sui_account: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Ask the solver for a quote
	Quote(SwapArgs),

	/// Quote, submit the intent, and follow it to settlement
	Execute {
		#[command(flatten)]
		swap: SwapArgs,

		/// Recipient on the destination chain
		#[arg(long)]
		to_address: String,
	},

	/// Read the solver status of a task once
	Status {
		task_id: String,
	},

	/// Poll a task until it settles, fails or the lifecycle timeout expires
	Watch {
		task_id: String,
	},

	/// Decode the swap order emitted by a transaction
	Order {
		#[arg(long)]
		chain: ChainName,

		tx_hash: String,
	},

	/// Cancel an outstanding order on its source chain
	Cancel {
		#[arg(long)]
		chain: ChainName,

		#[arg(value_parser = parse_amount)]
		order_id: Amount,
	},

	/// Validate the configuration file
	Validate,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SwapArgs {
	/// Source chain
	#[arg(long)]
	pub from: ChainName,

	/// Destination chain
	#[arg(long)]
	pub to: ChainName,

	/// Token address on the source chain
	#[arg(long)]
	pub token_src: String,

	/// Token address on the destination chain
	#[arg(long)]
	pub token_dst: String,

	/// Amount in the token's smallest unit
	#[arg(long, value_parser = parse_amount)]
	pub amount: Amount,

	/// Treat `amount` as the desired output instead of the input
	#[arg(long)]
	pub exact_output: bool,
}

impl SwapArgs {
	pub fn quote_type(&self) -> QuoteType {
		if self.exact_output {
			QuoteType::ExactOutput
		} else {
			QuoteType::ExactInput
		}
	}
}
