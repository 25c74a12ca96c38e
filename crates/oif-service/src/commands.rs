//! Offline commands: encoding, hashing and order-type resolution.
//!
//! Every command returns a JSON value that `main` prints.

use alloy_sol_types::SolCall;
use anyhow::{Context, Result};
use oif_encoding::{
	decode_message as unpack_message, encode_fill_description_from_output, encode_mandate_output,
	encode_message as pack_message, hash_mandate_output, keccak256,
};
use oif_settler::resolve_output;
use oif_types::abi::{self, IOutputSettler};
use oif_types::{Bytes32, Config, MandateOutput, Timestamp};
use serde_json::{json, Value};
use std::path::Path;

fn to_hex(bytes: impl AsRef<[u8]>) -> String {
	format!("0x{}", hex::encode(bytes))
}

fn from_hex(value: &str) -> Result<Vec<u8>> {
	hex::decode(value.trim().trim_start_matches("0x"))
		.with_context(|| format!("Invalid hex '{}'", value))
}

/// Reads a mandate output from a JSON file.
pub async fn read_output(path: &Path) -> Result<MandateOutput> {
	let content = tokio::fs::read_to_string(path)
		.await
		.with_context(|| format!("Failed to read {}", path.display()))?;
	serde_json::from_str(&content).with_context(|| format!("Invalid output in {}", path.display()))
}

pub fn validate(config: &Config) -> Value {
	json!({
		"service": config.service.name,
		"settler": {
			"chainId": config.settler.chain_id,
			"address": config.settler.address.to_string(),
		},
		"oracle": {
			"address": config.oracle.address.to_string(),
			"chainMappings": config.oracle.chain_map.len(),
		},
		"storage": config.storage.backend,
	})
}

pub fn encode_output(output: &MandateOutput) -> Result<Value> {
	Ok(json!({
		"encoded": to_hex(encode_mandate_output(output)?),
		"hash": hash_mandate_output(output)?.to_string(),
	}))
}

pub fn encode_fill(
	output: &MandateOutput,
	solver: Bytes32,
	order_id: Bytes32,
	timestamp: Timestamp,
) -> Result<Value> {
	let payload = encode_fill_description_from_output(&solver, &order_id, timestamp, output)?;
	Ok(json!({
		"payload": to_hex(&payload),
		"payloadHash": keccak256(&payload).to_string(),
		"outputHash": hash_mandate_output(output)?.to_string(),
	}))
}

pub fn resolve(output: &MandateOutput, solver: Bytes32, now: Timestamp) -> Result<Value> {
	let (solver, amount) = resolve_output(output, solver, now)?;
	Ok(json!({
		"solver": solver.to_string(),
		"amount": amount.to_string(),
		"timestamp": now,
	}))
}

pub fn encode_message(application: Bytes32, payloads: &[String]) -> Result<Value> {
	let payloads = payloads
		.iter()
		.map(|payload| from_hex(payload))
		.collect::<Result<Vec<_>>>()?;
	let message = pack_message(&application, &payloads)?;
	Ok(json!({
		"message": to_hex(message),
		"payloadHashes": payloads
			.iter()
			.map(|payload| keccak256(payload).to_string())
			.collect::<Vec<_>>(),
	}))
}

pub fn decode_message(message: &str) -> Result<Value> {
	let (application, hashes) = unpack_message(&from_hex(message)?)?;
	Ok(json!({
		"application": application.to_string(),
		"payloadHashes": hashes.iter().map(|hash| hash.to_string()).collect::<Vec<_>>(),
	}))
}

/// ABI calldata of `fill` on an EVM output settler, with `solver` as the
/// filler data.
pub fn calldata(
	output: &MandateOutput,
	order_id: Bytes32,
	solver: Bytes32,
	fill_deadline: Timestamp,
) -> Value {
	let call = IOutputSettler::fillCall {
		orderId: order_id,
		output: abi::MandateOutput::from(output),
		fillDeadline: abi::U48::from(fill_deadline),
		fillerData: solver.to_vec().into(),
	};
	json!({
		"to": output.settler.to_string(),
		"data": to_hex(call.abi_encode()),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use oif_types::U256;

	fn output(context: Vec<u8>) -> MandateOutput {
		MandateOutput {
			oracle: Bytes32::repeat_byte(0x0b),
			settler: Bytes32::repeat_byte(0x5e),
			chain_id: U256::from(10),
			token: Bytes32::repeat_byte(0x70),
			amount: U256::from(100),
			recipient: Bytes32::repeat_byte(0x4e),
			callback_data: Vec::new(),
			context,
		}
	}

	#[test]
	fn test_encode_output_reports_hash() {
		let output = output(Vec::new());
		let value = encode_output(&output).unwrap();

		assert_eq!(
			value["hash"],
			hash_mandate_output(&output).unwrap().to_string()
		);
		assert_eq!(
			value["encoded"],
			to_hex(encode_mandate_output(&output).unwrap())
		);
	}

	#[test]
	fn test_encode_fill_hashes_payload() {
		let output = output(Vec::new());
		let solver = Bytes32::repeat_byte(0x50);
		let order_id = Bytes32::repeat_byte(0x01);
		let value = encode_fill(&output, solver, order_id, 1000).unwrap();

		let payload = from_hex(value["payload"].as_str().unwrap()).unwrap();
		assert_eq!(&payload[..32], solver.as_slice());
		assert_eq!(&payload[32..64], order_id.as_slice());
		assert_eq!(value["payloadHash"], keccak256(&payload).to_string());
	}

	#[test]
	fn test_resolve_dutch_auction() {
		let mut context = vec![0x01];
		context.extend_from_slice(&1000u32.to_be_bytes());
		context.extend_from_slice(&1010u32.to_be_bytes());
		context.extend_from_slice(&U256::from(2).to_be_bytes::<32>());
		let solver = Bytes32::repeat_byte(0x50);

		let value = resolve(&output(context), solver, 1004).unwrap();
		assert_eq!(value["amount"], "112");
		assert_eq!(value["solver"], solver.to_string());
	}

	#[test]
	fn test_resolve_rejects_unknown_tag() {
		assert!(resolve(&output(vec![0x02]), Bytes32::repeat_byte(0x50), 0).is_err());
	}

	#[test]
	fn test_message_commands_agree() {
		let application = Bytes32::repeat_byte(0xaa);
		let packed = encode_message(application, &["0x0102".to_string(), "03".to_string()]).unwrap();
		let unpacked = decode_message(packed["message"].as_str().unwrap()).unwrap();

		assert_eq!(unpacked["application"], application.to_string());
		assert_eq!(unpacked["payloadHashes"], packed["payloadHashes"]);
		assert!(decode_message("0x00").is_err());
		assert!(encode_message(application, &["zz".to_string()]).is_err());
	}

	#[test]
	fn test_calldata_uses_fill_selector() {
		let output = output(Vec::new());
		let value = calldata(&output, Bytes32::repeat_byte(1), Bytes32::repeat_byte(0x50), 2000);

		let data = from_hex(value["data"].as_str().unwrap()).unwrap();
		assert_eq!(&data[..4], IOutputSettler::fillCall::SELECTOR.as_slice());
		let decoded = IOutputSettler::fillCall::abi_decode(&data).unwrap();
		assert_eq!(decoded.fillDeadline, abi::U48::from(2000u32));
		assert_eq!(decoded.output.amount, U256::from(100));
		assert_eq!(value["to"], output.settler.to_string());
	}
}
