//! Attestation store.
//!
//! Keys are the full (remote chain id, remote oracle, application, data hash)
//! tuple in a single map, so a lookup is a single hash access regardless of how
//! many chains or applications are known. Attestations are never removed.

use crate::OracleError;
use alloy_primitives::U256;
use dashmap::DashSet;
use oif_encoding::decode_message;
use oif_types::Bytes32;
use serde::{Deserialize, Serialize};

/// Length of one tuple of a proof series.
pub const PROOF_TUPLE_LENGTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationKey {
	pub remote_chain_id: U256,
	pub remote_oracle: Bytes32,
	pub application: Bytes32,
	pub data_hash: Bytes32,
}

impl AttestationKey {
	pub fn new(
		remote_chain_id: U256,
		remote_oracle: Bytes32,
		application: Bytes32,
		data_hash: Bytes32,
	) -> Self {
		Self {
			remote_chain_id,
			remote_oracle,
			application,
			data_hash,
		}
	}

	fn from_tuple(tuple: &[u8]) -> Self {
		Self {
			remote_chain_id: U256::from_be_slice(&tuple[0..32]),
			remote_oracle: Bytes32::from_slice(&tuple[32..64]),
			application: Bytes32::from_slice(&tuple[64..96]),
			data_hash: Bytes32::from_slice(&tuple[96..128]),
		}
	}

	/// Packs the key into a proof series tuple.
	pub fn to_tuple(&self) -> [u8; PROOF_TUPLE_LENGTH] {
		let mut tuple = [0u8; PROOF_TUPLE_LENGTH];
		tuple[0..32].copy_from_slice(&self.remote_chain_id.to_be_bytes::<32>());
		tuple[32..64].copy_from_slice(self.remote_oracle.as_slice());
		tuple[64..96].copy_from_slice(self.application.as_slice());
		tuple[96..128].copy_from_slice(self.data_hash.as_slice());
		tuple
	}
}

/// Concatenates keys into a proof series.
pub fn encode_proof_series<'a>(keys: impl IntoIterator<Item = &'a AttestationKey>) -> Vec<u8> {
	keys.into_iter().flat_map(|key| key.to_tuple()).collect()
}

#[derive(Debug, Default)]
pub struct AttestationStore {
	proven: DashSet<AttestationKey>,
}

impl AttestationStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_proven(
		&self,
		remote_chain_id: U256,
		remote_oracle: Bytes32,
		application: Bytes32,
		data_hash: Bytes32,
	) -> bool {
		self.proven.contains(&AttestationKey::new(
			remote_chain_id,
			remote_oracle,
			application,
			data_hash,
		))
	}

	/// Records an attestation. Returns false if it was already present.
	pub fn set_attestation(&self, key: AttestationKey) -> bool {
		self.proven.insert(key)
	}

	/// Checks a packed series of 128-byte tuples in one call.
	///
	/// An empty series is trivially proven. The error does not say which
	/// tuple failed.
	pub fn efficient_require_proven(&self, proof_series: &[u8]) -> Result<(), OracleError> {
		if proof_series.len() % PROOF_TUPLE_LENGTH != 0 {
			return Err(OracleError::NotDivisible(proof_series.len()));
		}

		let all_proven = proof_series
			.chunks_exact(PROOF_TUPLE_LENGTH)
			.all(|tuple| self.proven.contains(&AttestationKey::from_tuple(tuple)));

		if all_proven {
			Ok(())
		} else {
			Err(OracleError::NotProven)
		}
	}

	/// Decodes a batched message and attests every payload hash it carries.
	///
	/// Decoding happens before any write, so a malformed message attests
	/// nothing. Returns the keys that were not attested before.
	pub fn receive_message(
		&self,
		remote_chain_id: U256,
		remote_oracle: Bytes32,
		message: &[u8],
	) -> Result<Vec<AttestationKey>, OracleError> {
		let (application, hashes) = decode_message(message)?;
		Ok(self.attest_all(remote_chain_id, remote_oracle, application, hashes))
	}

	pub(crate) fn attest_all(
		&self,
		remote_chain_id: U256,
		remote_oracle: Bytes32,
		application: Bytes32,
		hashes: impl IntoIterator<Item = Bytes32>,
	) -> Vec<AttestationKey> {
		hashes
			.into_iter()
			.map(|hash| AttestationKey::new(remote_chain_id, remote_oracle, application, hash))
			.filter(|key| self.set_attestation(*key))
			.collect()
	}

	pub fn len(&self) -> usize {
		self.proven.len()
	}

	pub fn is_empty(&self) -> bool {
		self.proven.is_empty()
	}

	/// All attestations, sorted.
	pub fn snapshot(&self) -> Vec<AttestationKey> {
		let mut keys: Vec<_> = self.proven.iter().map(|key| *key).collect();
		keys.sort();
		keys
	}

	/// Adds previously persisted attestations.
	pub fn restore(&self, keys: impl IntoIterator<Item = AttestationKey>) {
		for key in keys {
			self.proven.insert(key);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use oif_encoding::{encode_message, keccak256};

	fn key(n: u8) -> AttestationKey {
		AttestationKey::new(
			U256::from(n),
			Bytes32::repeat_byte(0x10 + n),
			Bytes32::repeat_byte(0x20 + n),
			Bytes32::repeat_byte(0x30 + n),
		)
	}

	#[test]
	fn test_set_attestation_is_idempotent() {
		let store = AttestationStore::new();
		assert!(store.set_attestation(key(1)));
		assert!(!store.set_attestation(key(1)));
		assert_eq!(store.len(), 1);
	}

	#[test]
	fn test_is_proven_uses_the_whole_key() {
		let store = AttestationStore::new();
		let k = key(1);
		store.set_attestation(k);

		assert!(store.is_proven(k.remote_chain_id, k.remote_oracle, k.application, k.data_hash));
		assert!(!store.is_proven(U256::from(2), k.remote_oracle, k.application, k.data_hash));
		assert!(!store.is_proven(
			k.remote_chain_id,
			k.remote_oracle,
			Bytes32::ZERO,
			k.data_hash
		));
	}

	#[test]
	fn test_efficient_require_proven() {
		let store = AttestationStore::new();
		store.set_attestation(key(1));
		store.set_attestation(key(2));

		assert!(store.efficient_require_proven(&[]).is_ok());
		assert!(store
			.efficient_require_proven(&encode_proof_series(&[key(1), key(2)]))
			.is_ok());

		// An unproven tuple fails the series wherever it sits.
		for series in [
			[key(3), key(1), key(2)],
			[key(1), key(3), key(2)],
			[key(1), key(2), key(3)],
		] {
			assert!(matches!(
				store.efficient_require_proven(&encode_proof_series(&series)),
				Err(OracleError::NotProven)
			));
		}

		let mut misaligned = encode_proof_series(&[key(1)]);
		misaligned.push(0);
		assert!(matches!(
			store.efficient_require_proven(&misaligned),
			Err(OracleError::NotDivisible(129))
		));
	}

	#[test]
	fn test_receive_message_attests_every_payload() {
		let store = AttestationStore::new();
		let application = Bytes32::repeat_byte(0xaa);
		let oracle = Bytes32::repeat_byte(0xbb);
		let payloads = vec![b"first".to_vec(), b"second".to_vec()];
		let message = encode_message(&application, &payloads).unwrap();

		let added = store.receive_message(U256::from(10), oracle, &message).unwrap();
		assert_eq!(added.len(), 2);
		for payload in &payloads {
			assert!(store.is_proven(U256::from(10), oracle, application, keccak256(payload)));
		}

		// Replaying the same message adds nothing new.
		assert!(store
			.receive_message(U256::from(10), oracle, &message)
			.unwrap()
			.is_empty());
	}

	#[test]
	fn test_malformed_message_attests_nothing() {
		let store = AttestationStore::new();
		let message = encode_message(&Bytes32::ZERO, &[vec![1u8, 2, 3]]).unwrap();

		assert!(matches!(
			store.receive_message(U256::from(1), Bytes32::ZERO, &message[..message.len() - 1]),
			Err(OracleError::Encoding(_))
		));
		assert!(store.is_empty());
	}

	#[test]
	fn test_snapshot_and_restore() {
		let store = AttestationStore::new();
		store.set_attestation(key(2));
		store.set_attestation(key(1));

		let snapshot = store.snapshot();
		assert_eq!(snapshot, vec![key(1), key(2)]);

		let restored = AttestationStore::new();
		restored.restore(snapshot);
		assert!(restored
			.efficient_require_proven(&encode_proof_series(&[key(1), key(2)]))
			.is_ok());
	}
}
