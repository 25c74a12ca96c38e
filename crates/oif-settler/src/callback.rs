//! Recipient callbacks.

use alloy_primitives::U256;
use oif_types::Bytes32;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallbackError {
	/// The output carries callback data but its recipient has no callback.
	#[error("Recipient {0} has no callback")]
	NotRegistered(Bytes32),
	/// The callback itself rejected the fill.
	#[error("{0}")]
	Rejected(String),
}

/// Invoked on an output's recipient after it was paid, when the output
/// carries callback data.
///
/// A callback may call back into the settler on the same thread. Returning
/// an error reverts the whole fill.
pub trait OutputCallback: Send + Sync {
	fn output_filled(
		&self,
		token: Bytes32,
		amount: U256,
		callback_data: &[u8],
	) -> Result<(), CallbackError>;
}
