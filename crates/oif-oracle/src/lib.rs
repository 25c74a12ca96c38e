//! Oracles for the OIF settlement core.
//!
//! An output oracle on the destination chain collects fill descriptions
//! vouched for by the output settler and hands them to a messaging adapter.
//! The input oracle on the origin chain receives the message, records one
//! attestation per payload hash and answers proof queries for input
//! settlers.
//!
//! Messaging protocols plug in through [`MessagingAdapter`]. The verification
//! an adapter performs before delivering (signatures, light clients, VAAs) is
//! its own business; the input oracle trusts what it is handed.

use async_trait::async_trait;
use oif_encoding::EncodingError;
use oif_types::Bytes32;
use thiserror::Error;

pub mod attestation;
pub mod chain_map;
pub mod oracle;

pub mod implementations {
	pub mod direct;
}

pub mod adapters {
	pub mod solana;
}

pub use attestation::{AttestationKey, AttestationStore, PROOF_TUPLE_LENGTH};
pub use chain_map::ChainMap;
pub use oracle::{InputOracle, OutputOracle};

/// Errors raised by oracles and messaging adapters.
#[derive(Debug, Error)]
pub enum OracleError {
	/// A proof series length is not a multiple of the tuple length.
	#[error("Proof series of {0} bytes is not a multiple of 128")]
	NotDivisible(usize),
	/// At least one tuple of a proof series is not attested.
	#[error("Not proven")]
	NotProven,
	/// The payload creator refused to vouch for the payloads.
	#[error("Not all payloads are valid")]
	NotAllPayloadsValid,
	/// A chain mapping was already set in one of its directions.
	#[error("Chain mapping already set")]
	AlreadySet,
	/// A zero chain identifier was supplied.
	#[error("Zero value")]
	ZeroValue,
	/// No canonical chain id is known for a protocol chain identifier.
	#[error("No chain id mapping for protocol chain {0}")]
	NoChainIdMapping(u64),
	/// No receiver is registered for a destination.
	#[error("Unknown destination chain {0}")]
	UnknownDestination(u64),
	/// A log line announced a payload broadcast but could not be parsed.
	#[error("Malformed log line: {0}")]
	MalformedLog(String),
	#[error("Dispatch failed: {0}")]
	Dispatch(String),
	#[error(transparent)]
	Encoding(#[from] EncodingError),
}

/// A packed message on its way to another chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
	/// Protocol identifier of the destination chain.
	pub destination_chain: u64,
	/// Oracle that sent the message.
	pub source_oracle: Bytes32,
	/// Message encoded with the batching format.
	pub payload: Vec<u8>,
}

/// Transport used by output oracles to send packed messages.
#[async_trait]
pub trait MessagingAdapter: Send + Sync {
	/// Short protocol name, used in logs.
	fn name(&self) -> &str;

	/// Sends `message` toward its destination.
	async fn dispatch(&self, message: OutboundMessage) -> Result<(), OracleError>;
}
