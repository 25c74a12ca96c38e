//! Canonical wire encodings of the OIF settlement core.
//!
//! Two layouts live here:
//!
//! - [`output`]: the packed encoding of a `MandateOutput` and of a
//!   `FillDescription`, plus helpers that read single fields straight out of
//!   an encoded fill description.
//! - [`message`]: the batching format oracles use to carry many payloads in a
//!   single cross-chain message.
//!
//! Both layouts are bit-exact across every chain that takes part in the
//! protocol. Nothing here pads, reorders or widens a field.

use oif_types::Bytes32;
use sha3::{Digest, Keccak256};
use thiserror::Error;

pub mod message;
pub mod output;

pub use message::{decode_message, encode_message};
pub use output::*;

/// Largest length representable by a 2-byte length prefix.
pub const MAX_VARIABLE_LENGTH: usize = u16::MAX as usize;

/// Errors that can occur while encoding or decoding wire formats.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
	/// `callbackData` does not fit a 2-byte length prefix.
	#[error("Remote call out of range: {0} bytes")]
	RemoteCallOutOfRange(usize),
	/// `context` does not fit a 2-byte length prefix.
	#[error("Fulfillment context out of range: {0} bytes")]
	FulfillmentContextCallOutOfRange(usize),
	/// More payloads than a 2-byte count can describe.
	#[error("Too many payloads: {0}")]
	TooManyPayloads(usize),
	/// A single payload does not fit a 2-byte length prefix.
	#[error("Payload too large: {0} bytes")]
	TooLargePayload(usize),
	/// An encoded output or fill description is truncated or has trailing bytes.
	#[error("Malformed encoding: {0}")]
	MalformedEncoding(String),
	/// An encoded message is truncated or has trailing bytes.
	#[error("Malformed message: {0}")]
	MalformedMessage(String),
}

/// Keccak-256 of `data`.
pub fn keccak256(data: impl AsRef<[u8]>) -> Bytes32 {
	let mut hasher = Keccak256::new();
	hasher.update(data.as_ref());
	Bytes32::from_slice(&hasher.finalize())
}

/// Sequential big-endian reader over an encoded buffer.
pub(crate) struct Reader<'a> {
	data: &'a [u8],
	offset: usize,
}

impl<'a> Reader<'a> {
	pub(crate) fn new(data: &'a [u8]) -> Self {
		Self { data, offset: 0 }
	}

	pub(crate) fn take(&mut self, len: usize) -> Option<&'a [u8]> {
		let end = self.offset.checked_add(len)?;
		let slice = self.data.get(self.offset..end)?;
		self.offset = end;
		Some(slice)
	}

	pub(crate) fn bytes32(&mut self) -> Option<Bytes32> {
		self.take(32).map(Bytes32::from_slice)
	}

	pub(crate) fn u16(&mut self) -> Option<u16> {
		self.take(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
	}

	pub(crate) fn u32(&mut self) -> Option<u32> {
		self.take(4).map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
	}

	/// A 2-byte length prefix followed by that many bytes.
	pub(crate) fn prefixed(&mut self) -> Option<&'a [u8]> {
		let len = self.u16()? as usize;
		self.take(len)
	}

	pub(crate) fn remaining(&self) -> usize {
		self.data.len() - self.offset
	}
}
