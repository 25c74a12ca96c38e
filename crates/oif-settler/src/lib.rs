//! Output settlement for the OIF settlement core.
//!
//! The [`OutputSettler`] lets solvers fill mandate outputs on the destination
//! chain. Each (order id, output hash) pair is filled at most once; the
//! resulting fill record is what oracles later prove to the origin chain.
//!
//! Token movements and recipient callbacks go through the [`TokenLedger`]
//! and [`OutputCallback`] collaborators. Every public operation is one
//! atomic transaction: on failure, fill records written so far are removed
//! and the ledger is reverted to the checkpoint taken when it started.

use alloy_primitives::U256;
use oif_encoding::EncodingError;
use oif_types::{Bytes32, Timestamp};
use thiserror::Error;

pub mod callback;
pub mod journal;
pub mod ledger;
pub mod order_type;
pub mod settler;

pub use callback::{CallbackError, OutputCallback};
pub use ledger::{InMemoryLedger, LedgerCheckpoint, LedgerError, TokenLedger};
pub use order_type::{resolve_output, OrderType};
pub use settler::{fill_record_hash, proposed_solver, FillRecordEntry, OutputSettler};

/// Errors raised while filling outputs.
#[derive(Debug, Error)]
pub enum SettlerError {
	#[error("Fill deadline {deadline} passed at {now}")]
	FillDeadline { deadline: Timestamp, now: Timestamp },
	/// The output is exclusive to another solver until its start time.
	#[error("Exclusive to {0}")]
	ExclusiveTo(Bytes32),
	/// The first output of a batch was filled by someone else.
	#[error("Already filled")]
	AlreadyFilled,
	#[error("Zero value")]
	ZeroValue,
	/// Filler data must start with a 32-byte solver identifier.
	#[error("Invalid filler data: {0} bytes")]
	InvalidFillerData(usize),
	#[error("Wrong chain: output is for chain {actual}, settler is on {expected}")]
	WrongChain { expected: U256, actual: U256 },
	#[error("Wrong output settler: {0}")]
	WrongOutputSettler(Bytes32),
	/// Unknown order type tag.
	#[error("Order type 0x{0:02x} not implemented")]
	NotImplemented(u8),
	#[error("Invalid context length {length} for order type 0x{tag:02x}")]
	InvalidContextDataLength { tag: u8, length: usize },
	#[error("Amount overflow")]
	AmountOverflow,
	#[error("No outputs to fill")]
	NoOutputs,
	#[error("Transfer failed: {0}")]
	Transfer(#[from] LedgerError),
	#[error("Callback failed: {0}")]
	Callback(#[from] CallbackError),
	#[error(transparent)]
	Encoding(#[from] EncodingError),
}
