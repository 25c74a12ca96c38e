//! Payload-creator seam between applications and oracle adapters.

use crate::Bytes32;

/// Implemented by any application (an output settler, an input settler)
/// that produces payloads oracles may broadcast.
///
/// Oracles call this before sending: only payloads the application vouches
/// for are ever packed into a cross-chain message.
pub trait PayloadCreator: Send + Sync {
	/// Identifier of the application, used as the message `application`.
	fn application(&self) -> Bytes32;

	/// Returns true when every payload corresponds to recorded state.
	///
	/// `oracle` is the identifier of the calling oracle; applications that
	/// bind payloads to a specific oracle use it to rebuild their keys.
	fn has_attested(&self, oracle: Bytes32, payloads: &[Vec<u8>]) -> bool;
}
