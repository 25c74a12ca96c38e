//! Encoding of mandate outputs and fill descriptions.
//!
//! MandateOutput layout:
//! - oracle (32 bytes)
//! - settler (32 bytes)
//! - chainId (32 bytes)
//! - token (32 bytes)
//! - amount (32 bytes)
//! - recipient (32 bytes)
//! - callbackData length (2 bytes) + callbackData
//! - context length (2 bytes) + context
//!
//! FillDescription layout:
//! - solver (32 bytes)
//! - orderId (32 bytes)
//! - timestamp (4 bytes)
//! - common payload: token, amount, recipient, callbackData, context as above
//!
//! The common payload is the shared tail of both layouts, which is what lets
//! a verifier rebuild an output hash from a fill description alone.

use crate::{keccak256, EncodingError, Reader, MAX_VARIABLE_LENGTH};
use oif_types::{Bytes32, FillDescription, MandateOutput, Timestamp, U256};

/// Length of the fixed prefix of a fill description (solver, orderId, timestamp).
pub const FILL_DESCRIPTION_HEADER_LENGTH: usize = 32 + 32 + 4;

/// Smallest possible common payload: three words and two empty length prefixes.
pub const COMMON_PAYLOAD_MIN_LENGTH: usize = 32 * 3 + 2 + 2;

/// Smallest possible mandate output encoding.
pub const MANDATE_OUTPUT_MIN_LENGTH: usize = 32 * 3 + COMMON_PAYLOAD_MIN_LENGTH;

const SOLVER_OFFSET: usize = 0;
const ORDER_ID_OFFSET: usize = 32;
const TIMESTAMP_OFFSET: usize = 64;

fn check_variable_lengths(callback_data: &[u8], context: &[u8]) -> Result<(), EncodingError> {
	if callback_data.len() > MAX_VARIABLE_LENGTH {
		return Err(EncodingError::RemoteCallOutOfRange(callback_data.len()));
	}
	if context.len() > MAX_VARIABLE_LENGTH {
		return Err(EncodingError::FulfillmentContextCallOutOfRange(context.len()));
	}
	Ok(())
}

fn push_common_payload(
	buffer: &mut Vec<u8>,
	token: &Bytes32,
	amount: &U256,
	recipient: &Bytes32,
	callback_data: &[u8],
	context: &[u8],
) {
	buffer.extend_from_slice(token.as_slice());
	buffer.extend_from_slice(&amount.to_be_bytes::<32>());
	buffer.extend_from_slice(recipient.as_slice());
	buffer.extend_from_slice(&(callback_data.len() as u16).to_be_bytes());
	buffer.extend_from_slice(callback_data);
	buffer.extend_from_slice(&(context.len() as u16).to_be_bytes());
	buffer.extend_from_slice(context);
}

/// Encodes the common payload shared by outputs and fill descriptions.
pub fn encode_common_payload(
	token: &Bytes32,
	amount: &U256,
	recipient: &Bytes32,
	callback_data: &[u8],
	context: &[u8],
) -> Result<Vec<u8>, EncodingError> {
	check_variable_lengths(callback_data, context)?;

	let mut payload =
		Vec::with_capacity(COMMON_PAYLOAD_MIN_LENGTH + callback_data.len() + context.len());
	push_common_payload(&mut payload, token, amount, recipient, callback_data, context);
	Ok(payload)
}

/// Encodes a mandate output in its canonical packed form.
pub fn encode_mandate_output(output: &MandateOutput) -> Result<Vec<u8>, EncodingError> {
	check_variable_lengths(&output.callback_data, &output.context)?;

	let mut encoded = Vec::with_capacity(
		MANDATE_OUTPUT_MIN_LENGTH + output.callback_data.len() + output.context.len(),
	);
	encoded.extend_from_slice(output.oracle.as_slice());
	encoded.extend_from_slice(output.settler.as_slice());
	encoded.extend_from_slice(&output.chain_id.to_be_bytes::<32>());
	push_common_payload(
		&mut encoded,
		&output.token,
		&output.amount,
		&output.recipient,
		&output.callback_data,
		&output.context,
	);
	Ok(encoded)
}

/// Content key of a mandate output: keccak256 of its canonical encoding.
pub fn hash_mandate_output(output: &MandateOutput) -> Result<Bytes32, EncodingError> {
	encode_mandate_output(output).map(keccak256)
}

/// Rebuilds an output hash from a common payload and the fields a fill
/// description does not carry.
///
/// For a well-formed common payload this equals [`hash_mandate_output`] of
/// the corresponding output.
pub fn mandate_output_hash_from_common_payload(
	oracle: &Bytes32,
	settler: &Bytes32,
	chain_id: &U256,
	common_payload: &[u8],
) -> Bytes32 {
	let mut encoded = Vec::with_capacity(96 + common_payload.len());
	encoded.extend_from_slice(oracle.as_slice());
	encoded.extend_from_slice(settler.as_slice());
	encoded.extend_from_slice(&chain_id.to_be_bytes::<32>());
	encoded.extend_from_slice(common_payload);
	keccak256(encoded)
}

/// Encodes a fill description from its individual fields.
#[allow(clippy::too_many_arguments)]
pub fn encode_fill_description(
	solver: &Bytes32,
	order_id: &Bytes32,
	timestamp: Timestamp,
	token: &Bytes32,
	amount: &U256,
	recipient: &Bytes32,
	callback_data: &[u8],
	context: &[u8],
) -> Result<Vec<u8>, EncodingError> {
	check_variable_lengths(callback_data, context)?;

	let mut payload = Vec::with_capacity(
		FILL_DESCRIPTION_HEADER_LENGTH
			+ COMMON_PAYLOAD_MIN_LENGTH
			+ callback_data.len()
			+ context.len(),
	);
	payload.extend_from_slice(solver.as_slice());
	payload.extend_from_slice(order_id.as_slice());
	payload.extend_from_slice(&timestamp.to_be_bytes());
	push_common_payload(&mut payload, token, amount, recipient, callback_data, context);
	Ok(payload)
}

/// Encodes the fill description of `output` filled by `solver` at `timestamp`.
pub fn encode_fill_description_from_output(
	solver: &Bytes32,
	order_id: &Bytes32,
	timestamp: Timestamp,
	output: &MandateOutput,
) -> Result<Vec<u8>, EncodingError> {
	encode_fill_description(
		solver,
		order_id,
		timestamp,
		&output.token,
		&output.amount,
		&output.recipient,
		&output.callback_data,
		&output.context,
	)
}

/// Encodes a [`FillDescription`] value.
pub fn encode_fill(fill: &FillDescription) -> Result<Vec<u8>, EncodingError> {
	encode_fill_description(
		&fill.solver,
		&fill.order_id,
		fill.timestamp,
		&fill.token,
		&fill.amount,
		&fill.recipient,
		&fill.callback_data,
		&fill.context,
	)
}

fn header(payload: &[u8]) -> Result<&[u8], EncodingError> {
	payload.get(..FILL_DESCRIPTION_HEADER_LENGTH).ok_or_else(|| {
		EncodingError::MalformedEncoding(format!(
			"fill description of {} bytes is shorter than its {} byte header",
			payload.len(),
			FILL_DESCRIPTION_HEADER_LENGTH
		))
	})
}

/// Reads the solver of an encoded fill description.
pub fn fill_description_solver(payload: &[u8]) -> Result<Bytes32, EncodingError> {
	let header = header(payload)?;
	Ok(Bytes32::from_slice(&header[SOLVER_OFFSET..SOLVER_OFFSET + 32]))
}

/// Reads the order id of an encoded fill description.
pub fn fill_description_order_id(payload: &[u8]) -> Result<Bytes32, EncodingError> {
	let header = header(payload)?;
	Ok(Bytes32::from_slice(&header[ORDER_ID_OFFSET..ORDER_ID_OFFSET + 32]))
}

/// Reads the fill timestamp of an encoded fill description.
pub fn fill_description_timestamp(payload: &[u8]) -> Result<Timestamp, EncodingError> {
	let header = header(payload)?;
	let bytes = &header[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 4];
	Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Returns the common payload slice of an encoded fill description.
///
/// The slice is not validated; rebuilding an output hash from a malformed
/// tail simply yields a hash no output has.
pub fn fill_description_common_payload(payload: &[u8]) -> Result<&[u8], EncodingError> {
	header(payload)?;
	Ok(&payload[FILL_DESCRIPTION_HEADER_LENGTH..])
}

struct CommonPayload {
	token: Bytes32,
	amount: U256,
	recipient: Bytes32,
	callback_data: Vec<u8>,
	context: Vec<u8>,
}

fn malformed(what: &str) -> EncodingError {
	EncodingError::MalformedEncoding(format!("truncated {}", what))
}

fn read_common_payload(reader: &mut Reader<'_>) -> Result<CommonPayload, EncodingError> {
	let token = reader.bytes32().ok_or_else(|| malformed("token"))?;
	let amount = reader
		.take(32)
		.map(U256::from_be_slice)
		.ok_or_else(|| malformed("amount"))?;
	let recipient = reader.bytes32().ok_or_else(|| malformed("recipient"))?;
	let callback_data = reader
		.prefixed()
		.ok_or_else(|| malformed("callbackData"))?
		.to_vec();
	let context = reader
		.prefixed()
		.ok_or_else(|| malformed("context"))?
		.to_vec();

	if reader.remaining() != 0 {
		return Err(EncodingError::MalformedEncoding(format!(
			"{} trailing bytes",
			reader.remaining()
		)));
	}

	Ok(CommonPayload {
		token,
		amount,
		recipient,
		callback_data,
		context,
	})
}

/// Decodes a canonical mandate output encoding.
pub fn decode_mandate_output(encoded: &[u8]) -> Result<MandateOutput, EncodingError> {
	let mut reader = Reader::new(encoded);
	let oracle = reader.bytes32().ok_or_else(|| malformed("oracle"))?;
	let settler = reader.bytes32().ok_or_else(|| malformed("settler"))?;
	let chain_id = reader
		.take(32)
		.map(U256::from_be_slice)
		.ok_or_else(|| malformed("chainId"))?;
	let common = read_common_payload(&mut reader)?;

	Ok(MandateOutput {
		oracle,
		settler,
		chain_id,
		token: common.token,
		amount: common.amount,
		recipient: common.recipient,
		callback_data: common.callback_data,
		context: common.context,
	})
}

/// Decodes a canonical fill description encoding.
pub fn decode_fill_description(encoded: &[u8]) -> Result<FillDescription, EncodingError> {
	let mut reader = Reader::new(encoded);
	let solver = reader.bytes32().ok_or_else(|| malformed("solver"))?;
	let order_id = reader.bytes32().ok_or_else(|| malformed("orderId"))?;
	let timestamp = reader.u32().ok_or_else(|| malformed("timestamp"))?;
	let common = read_common_payload(&mut reader)?;

	Ok(FillDescription {
		solver,
		order_id,
		timestamp,
		token: common.token,
		amount: common.amount,
		recipient: common.recipient,
		callback_data: common.callback_data,
		context: common.context,
	})
}
