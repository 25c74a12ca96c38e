//! Primitive identifiers used throughout the settlement core.
//!
//! Every participant (oracle, settler, token, recipient, solver) is a
//! chain-agnostic 32-byte identifier. EVM addresses are left-padded with
//! zeros so that the low 20 bytes hold the address.

pub use alloy_primitives::{B256 as Bytes32, U256};
use thiserror::Error;

/// Unix timestamp in seconds, as carried on the wire.
pub type Timestamp = u32;

/// Errors raised when parsing identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
	/// A hex string could not be parsed as a 32-byte identifier.
	#[error("Invalid bytes32 hex '{0}'")]
	InvalidHex(String),
}

/// Parse a hex identifier.
///
/// Accepts an optional `0x` prefix. Inputs shorter than 32 bytes are
/// left-padded, so a 20-byte address parses into its bytes32 form.
pub fn parse_bytes32(value: &str) -> Result<Bytes32, IdentifierError> {
	let stripped = value.trim().trim_start_matches("0x");
	let raw = hex::decode(stripped).map_err(|_| IdentifierError::InvalidHex(value.to_string()))?;
	if raw.len() > 32 {
		return Err(IdentifierError::InvalidHex(value.to_string()));
	}
	let mut bytes = [0u8; 32];
	bytes[32 - raw.len()..].copy_from_slice(&raw);
	Ok(Bytes32::from(bytes))
}

/// Widen a native chain id into the 256-bit wire representation.
pub fn chain_id(id: u64) -> U256 {
	U256::from(id)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_bytes32_pads_addresses() {
		let parsed = parse_bytes32("0x000000000000000000000000000000000000dEaD").unwrap();
		assert_eq!(parsed[30], 0xde);
		assert_eq!(parsed[31], 0xad);
		assert!(parsed[..30].iter().all(|&b| b == 0));

		assert!(parse_bytes32("0xzz").is_err());
		assert!(parse_bytes32(&format!("0x{}", "11".repeat(33))).is_err());
	}
}
