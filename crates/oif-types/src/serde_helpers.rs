//! Serde helpers for human-edited JSON and TOML documents.

/// `U256` as a decimal string; deserializes decimal or `0x` hex strings and
/// plain integers.
pub mod u256_string {
	use alloy_primitives::U256;
	use serde::{Deserialize, Deserializer, Serializer};

	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Repr {
		Text(String),
		Number(u64),
	}

	pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&value.to_string())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
	where
		D: Deserializer<'de>,
	{
		match Repr::deserialize(deserializer)? {
			Repr::Text(s) => s
				.parse::<U256>()
				.map_err(|_| serde::de::Error::custom(format!("Failed to parse U256: {}", s))),
			Repr::Number(n) => Ok(U256::from(n)),
		}
	}
}

/// `Vec<u8>` as a `0x`-prefixed hex string. An empty string or `"0x"` is
/// the empty byte array.
pub mod hex_bytes {
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&format!("0x{}", hex::encode(value)))
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		hex::decode(s.trim_start_matches("0x"))
			.map_err(|e| serde::de::Error::custom(format!("Invalid hex bytes: {}", e)))
	}
}

/// `Bytes32` accepting short hex (left-padded), so EVM addresses can be
/// written as-is.
pub mod padded_bytes32 {
	use crate::primitives::{parse_bytes32, Bytes32};
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(value: &Bytes32, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&value.to_string())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Bytes32, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		parse_bytes32(&s).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use alloy_primitives::U256;
	use serde::{Deserialize, Serialize};

	#[derive(Debug, Serialize, Deserialize)]
	struct Sample {
		#[serde(with = "super::u256_string")]
		amount: U256,
		#[serde(with = "super::hex_bytes")]
		data: Vec<u8>,
	}

	#[test]
	fn test_accepts_decimal_hex_and_integers() {
		let decimal: Sample = serde_json::from_str(r#"{"amount":"1000","data":"0x0102"}"#).unwrap();
		assert_eq!(decimal.amount, U256::from(1000));
		assert_eq!(decimal.data, vec![1, 2]);

		let hex: Sample = serde_json::from_str(r#"{"amount":"0x10","data":""}"#).unwrap();
		assert_eq!(hex.amount, U256::from(16));
		assert!(hex.data.is_empty());

		let number: Sample = serde_json::from_str(r#"{"amount":7,"data":"0x"}"#).unwrap();
		assert_eq!(number.amount, U256::from(7));
	}

	#[test]
	fn test_serializes_decimal_and_prefixed_hex() {
		let sample = Sample {
			amount: U256::from(42),
			data: vec![0xab],
		};
		let json = serde_json::to_string(&sample).unwrap();
		assert_eq!(json, r#"{"amount":"42","data":"0xab"}"#);
	}
}
