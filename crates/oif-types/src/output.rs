//! Output and fill data model.
//!
//! A [`MandateOutput`] is one desired payment (plus optional call) on a
//! destination chain. A [`FillDescription`] is the witness of how that output
//! was actually filled; its hash is what oracles attest to across chains.

use crate::primitives::{Bytes32, Timestamp, U256};
use crate::serde_helpers::{hex_bytes, u256_string};
use serde::{Deserialize, Serialize};

/// MandateOutput struct of an OIF order.
///
/// IMPORTANT: field order matches the canonical wire layout. Reordering
/// breaks compatibility with deployed remote verifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MandateOutput {
	/// Oracle verifying this output, as bytes32.
	pub oracle: Bytes32,
	/// Output settler allowed to fill this output, as bytes32.
	pub settler: Bytes32,
	/// Destination chain id.
	#[serde(with = "u256_string")]
	pub chain_id: U256,
	/// Token identifier as bytes32.
	pub token: Bytes32,
	/// Base amount before order-type resolution.
	#[serde(with = "u256_string")]
	pub amount: U256,
	/// Recipient identifier as bytes32.
	pub recipient: Bytes32,
	/// Data passed to the recipient callback after the fill.
	#[serde(default, with = "hex_bytes")]
	pub callback_data: Vec<u8>,
	/// Order-type context (tag byte followed by its parameters).
	#[serde(default, with = "hex_bytes")]
	pub context: Vec<u8>,
}

/// A mandate output together with the deadline a solver must respect.
///
/// The deadline is a solver-side constraint and is not part of the output's
/// cross-chain identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillableOutput {
	/// Last timestamp (inclusive) at which the output may be filled.
	pub fill_deadline: Timestamp,
	#[serde(flatten)]
	pub output: MandateOutput,
}

impl FillableOutput {
	pub fn new(output: MandateOutput, fill_deadline: Timestamp) -> Self {
		Self {
			fill_deadline,
			output,
		}
	}
}

/// Record of how an output was filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillDescription {
	pub solver: Bytes32,
	pub order_id: Bytes32,
	pub timestamp: Timestamp,
	pub token: Bytes32,
	#[serde(with = "u256_string")]
	pub amount: U256,
	pub recipient: Bytes32,
	#[serde(default, with = "hex_bytes")]
	pub callback_data: Vec<u8>,
	#[serde(default, with = "hex_bytes")]
	pub context: Vec<u8>,
}

impl FillDescription {
	/// Builds the description of a fill of `output`.
	///
	/// The common payload carries the output's own amount so the origin
	/// side can recompute the output hash from the payload.
	pub fn from_output(
		solver: Bytes32,
		order_id: Bytes32,
		timestamp: Timestamp,
		output: &MandateOutput,
	) -> Self {
		Self {
			solver,
			order_id,
			timestamp,
			token: output.token,
			amount: output.amount,
			recipient: output.recipient,
			callback_data: output.callback_data.clone(),
			context: output.context.clone(),
		}
	}
}

/// Environment of a single call: who calls and at what time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
	/// Immediate caller; pays the tokens of a fill.
	pub caller: Bytes32,
	/// Current block timestamp.
	pub timestamp: Timestamp,
}

impl CallContext {
	pub fn new(caller: Bytes32, timestamp: Timestamp) -> Self {
		Self { caller, timestamp }
	}
}
