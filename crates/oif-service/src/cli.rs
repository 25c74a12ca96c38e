//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use oif_types::{parse_bytes32, Bytes32, Timestamp};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "oif")]
#[command(about = "OIF output settlement and attestation tools", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
	/// Path to configuration file
	#[arg(short, long, value_name = "FILE", env = "OIF_CONFIG", default_value = "config/local.toml")]
	pub config: PathBuf,

	/// Log level override (trace, debug, info, warn, error)
	#[arg(short, long, env = "OIF_LOG_LEVEL")]
	pub log_level: Option<String>,

	#[command(subcommand)]
	pub command: Command,
}

fn bytes32_arg(value: &str) -> Result<Bytes32, String> {
	parse_bytes32(value).map_err(|e| e.to_string())
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Validate the configuration file
	Validate,

	/// Encode a mandate output (JSON file) and print its hash
	EncodeOutput {
		/// JSON file holding a MandateOutput
		file: PathBuf,
	},

	/// Encode the fill description of a mandate output
	EncodeFill {
		/// JSON file holding a MandateOutput
		file: PathBuf,
		#[arg(long, value_parser = bytes32_arg)]
		solver: Bytes32,
		#[arg(long, value_parser = bytes32_arg)]
		order_id: Bytes32,
		/// Fill timestamp; defaults to now
		#[arg(long)]
		timestamp: Option<Timestamp>,
	},

	/// Resolve the solver and amount of an output for its order type
	Resolve {
		/// JSON file holding a MandateOutput
		file: PathBuf,
		#[arg(long, value_parser = bytes32_arg)]
		solver: Bytes32,
		/// Evaluation time; defaults to now
		#[arg(long)]
		timestamp: Option<Timestamp>,
	},

	/// Pack payloads into a cross-chain message
	EncodeMessage {
		#[arg(long, value_parser = bytes32_arg)]
		application: Bytes32,
		/// Hex-encoded payloads
		payloads: Vec<String>,
	},

	/// Unpack a message into its application and payload hashes
	DecodeMessage {
		/// Hex-encoded message
		message: String,
	},

	/// Build ABI calldata for filling an output on an EVM output settler
	Calldata {
		/// JSON file holding a MandateOutput
		file: PathBuf,
		#[arg(long, value_parser = bytes32_arg)]
		order_id: Bytes32,
		#[arg(long, value_parser = bytes32_arg)]
		solver: Bytes32,
		#[arg(long)]
		fill_deadline: Timestamp,
	},

	/// Run a local fill and proof scenario
	Simulate {
		/// TOML scenario file
		scenario: PathBuf,
	},
}

impl Command {
	/// Whether the command runs against the configuration file.
	pub fn needs_config(&self) -> bool {
		matches!(self, Command::Validate | Command::Simulate { .. })
	}
}
