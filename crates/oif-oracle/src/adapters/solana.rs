//! Solana program log adapter.
//!
//! Solana output oracles announce payloads with `msg!` instead of a packed
//! message:
//!
//! ```text
//! Program log: PayloadBroadcast: application=<hex>, payload=<hex>
//! ```
//!
//! This adapter parses those lines into the same (application, payload hash)
//! pairs the binary batching path yields and records them on an input oracle.
//! Fetching the logs and checking they come from a finalized transaction of
//! the expected program is left to the caller.

use crate::attestation::AttestationKey;
use crate::oracle::InputOracle;
use crate::OracleError;
use oif_encoding::keccak256;
use oif_types::Bytes32;

const LOG_PREFIX: &str = "Program log: ";
const EVENT_NAME: &str = "PayloadBroadcast:";

/// One payload announced in a program log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadBroadcast {
	pub application: Bytes32,
	pub payload_hash: Bytes32,
}

/// Formats the log line a Solana output oracle emits for `payload`.
pub fn format_payload_broadcast(application: &Bytes32, payload: &[u8]) -> String {
	format!(
		"{}{} application={}, payload={}",
		LOG_PREFIX,
		EVENT_NAME,
		hex::encode(application),
		hex::encode(payload)
	)
}

fn hex_field(field: &str, name: &str, line: &str) -> Result<Vec<u8>, OracleError> {
	let value = field
		.trim()
		.strip_prefix(name)
		.and_then(|rest| rest.strip_prefix('='))
		.ok_or_else(|| OracleError::MalformedLog(line.to_string()))?;
	hex::decode(value.trim_start_matches("0x"))
		.map_err(|_| OracleError::MalformedLog(line.to_string()))
}

/// Parses one log line.
///
/// Lines that are not payload broadcasts yield `None`; a broadcast line that
/// cannot be parsed is an error.
pub fn parse_payload_broadcast(line: &str) -> Result<Option<PayloadBroadcast>, OracleError> {
	let Some(body) = line
		.strip_prefix(LOG_PREFIX)
		.and_then(|rest| rest.strip_prefix(EVENT_NAME))
	else {
		return Ok(None);
	};

	let (application, payload) = body
		.split_once(',')
		.ok_or_else(|| OracleError::MalformedLog(line.to_string()))?;

	let application = hex_field(application, "application", line)?;
	if application.len() != 32 {
		return Err(OracleError::MalformedLog(line.to_string()));
	}
	let payload = hex_field(payload, "payload", line)?;

	Ok(Some(PayloadBroadcast {
		application: Bytes32::from_slice(&application),
		payload_hash: keccak256(payload),
	}))
}

/// Parses every payload broadcast in a transaction's logs, in order.
pub fn parse_logs<S: AsRef<str>>(logs: &[S]) -> Result<Vec<PayloadBroadcast>, OracleError> {
	let mut broadcasts = Vec::new();
	for line in logs {
		if let Some(broadcast) = parse_payload_broadcast(line.as_ref())? {
			broadcasts.push(broadcast);
		}
	}
	Ok(broadcasts)
}

/// Records payload broadcasts of one Solana program on an input oracle.
pub struct SolanaLogAdapter {
	/// Protocol identifier of the Solana cluster in the oracle's chain map.
	source_chain: u64,
	/// Program id of the output oracle, as bytes32.
	program: Bytes32,
}

impl SolanaLogAdapter {
	pub fn new(source_chain: u64, program: Bytes32) -> Self {
		Self {
			source_chain,
			program,
		}
	}

	/// Parses `logs` and attests every announced payload.
	///
	/// All lines are parsed and the source chain resolved before anything
	/// is recorded.
	pub fn record<S: AsRef<str>>(
		&self,
		oracle: &InputOracle,
		logs: &[S],
	) -> Result<Vec<AttestationKey>, OracleError> {
		let broadcasts = parse_logs(logs)?;
		oracle.chain_map().get_chain_id(self.source_chain)?;
		tracing::debug!(
			program = %self.program,
			broadcasts = broadcasts.len(),
			"Parsed program logs"
		);

		let mut added = Vec::with_capacity(broadcasts.len());
		for broadcast in broadcasts {
			added.extend(oracle.attest(
				self.source_chain,
				self.program,
				broadcast.application,
				[broadcast.payload_hash],
			)?);
		}
		Ok(added)
	}
}
