//! Message batching format.
//!
//! A message carries any number of payloads from one application:
//! - application (32 bytes)
//! - payload count (2 bytes)
//! - for each payload: length (2 bytes) + payload bytes
//!
//! Receivers never keep payload contents, only their hashes.

use crate::{keccak256, EncodingError, Reader, MAX_VARIABLE_LENGTH};
use oif_types::Bytes32;

/// Packs `payloads` from `application` into one message.
pub fn encode_message<P: AsRef<[u8]>>(
	application: &Bytes32,
	payloads: &[P],
) -> Result<Vec<u8>, EncodingError> {
	if payloads.len() > MAX_VARIABLE_LENGTH {
		return Err(EncodingError::TooManyPayloads(payloads.len()));
	}

	let mut size = 32 + 2;
	for payload in payloads {
		let len = payload.as_ref().len();
		if len > MAX_VARIABLE_LENGTH {
			return Err(EncodingError::TooLargePayload(len));
		}
		size += 2 + len;
	}

	let mut message = Vec::with_capacity(size);
	message.extend_from_slice(application.as_slice());
	message.extend_from_slice(&(payloads.len() as u16).to_be_bytes());
	for payload in payloads {
		let payload = payload.as_ref();
		message.extend_from_slice(&(payload.len() as u16).to_be_bytes());
		message.extend_from_slice(payload);
	}
	Ok(message)
}

/// Unpacks a message into its application and the hashes of its payloads,
/// in order.
pub fn decode_message(message: &[u8]) -> Result<(Bytes32, Vec<Bytes32>), EncodingError> {
	let mut reader = Reader::new(message);
	let application = reader
		.bytes32()
		.ok_or_else(|| EncodingError::MalformedMessage("missing application".to_string()))?;
	let count = reader
		.u16()
		.ok_or_else(|| EncodingError::MalformedMessage("missing payload count".to_string()))?;

	let mut hashes = Vec::with_capacity(count as usize);
	for index in 0..count {
		let payload = reader.prefixed().ok_or_else(|| {
			EncodingError::MalformedMessage(format!("payload {} is truncated", index))
		})?;
		hashes.push(keccak256(payload));
	}

	if reader.remaining() != 0 {
		return Err(EncodingError::MalformedMessage(format!(
			"{} trailing bytes after {} payloads",
			reader.remaining(),
			count
		)));
	}

	Ok((application, hashes))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn application() -> Bytes32 {
		keccak256(b"application")
	}

	#[test]
	fn test_encode_message_matches_fixture() {
		let payloads: Vec<Vec<u8>> = vec![vec![1, 2, 3], vec![]];
		let message = encode_message(&application(), &payloads).unwrap();

		assert_eq!(
			hex::encode(&message),
			"86576f22de91845d636c37f985620b756ac2b6311aa5e79b4b1601c6d5b24822\
			0002\
			0003010203\
			0000"
		);
	}

	#[test]
	fn test_decode_message_returns_payload_hashes_in_order() {
		let payloads: Vec<Vec<u8>> = vec![vec![1, 2, 3], vec![]];
		let message = encode_message(&application(), &payloads).unwrap();

		let (app, hashes) = decode_message(&message).unwrap();
		assert_eq!(app, application());
		assert_eq!(
			hashes
				.iter()
				.map(hex::encode)
				.collect::<Vec<_>>(),
			vec![
				"f1885eda54b7a053318cd41e2093220dab15d65381b1157a3633a83bfd5c9239",
				"c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470",
			]
		);
	}

	#[test]
	fn test_empty_batch() {
		let message = encode_message::<Vec<u8>>(&application(), &[]).unwrap();
		assert_eq!(message.len(), 34);

		let (_, hashes) = decode_message(&message).unwrap();
		assert!(hashes.is_empty());
	}

	#[test]
	fn test_payload_limits() {
		let largest = vec![0u8; MAX_VARIABLE_LENGTH];
		assert!(encode_message(&application(), &[largest]).is_ok());

		let too_large = vec![0u8; MAX_VARIABLE_LENGTH + 1];
		assert_eq!(
			encode_message(&application(), &[too_large]),
			Err(EncodingError::TooLargePayload(MAX_VARIABLE_LENGTH + 1))
		);

		let too_many = vec![Vec::<u8>::new(); MAX_VARIABLE_LENGTH + 1];
		assert_eq!(
			encode_message(&application(), &too_many),
			Err(EncodingError::TooManyPayloads(MAX_VARIABLE_LENGTH + 1))
		);
	}

	#[test]
	fn test_malformed_messages_are_rejected() {
		let payloads: Vec<Vec<u8>> = vec![vec![1, 2, 3]];
		let message = encode_message(&application(), &payloads).unwrap();

		assert!(matches!(
			decode_message(&message[..20]),
			Err(EncodingError::MalformedMessage(_))
		));
		assert!(matches!(
			decode_message(&message[..message.len() - 1]),
			Err(EncodingError::MalformedMessage(_))
		));

		let mut trailing = message.clone();
		trailing.push(0xff);
		assert!(matches!(
			decode_message(&trailing),
			Err(EncodingError::MalformedMessage(_))
		));
	}
}
