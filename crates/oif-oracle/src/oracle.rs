//! Input and output oracles.

use crate::attestation::{AttestationKey, AttestationStore};
use crate::chain_map::ChainMap;
use crate::{MessagingAdapter, OracleError, OutboundMessage};
use alloy_primitives::U256;
use oif_encoding::encode_message;
use oif_types::{Bytes32, EventBus, OracleEvent, PayloadCreator};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Origin-side oracle: records attestations delivered by messaging adapters
/// and answers proof queries.
pub struct InputOracle {
	address: Bytes32,
	chain_map: ChainMap,
	store: AttestationStore,
	events: EventBus,
}

impl InputOracle {
	pub fn new(address: Bytes32, chain_map: ChainMap, events: EventBus) -> Self {
		Self {
			address,
			chain_map,
			store: AttestationStore::new(),
			events,
		}
	}

	pub fn address(&self) -> Bytes32 {
		self.address
	}

	pub fn chain_map(&self) -> &ChainMap {
		&self.chain_map
	}

	pub fn attestations(&self) -> &AttestationStore {
		&self.store
	}

	pub fn is_proven(
		&self,
		remote_chain_id: U256,
		remote_oracle: Bytes32,
		application: Bytes32,
		data_hash: Bytes32,
	) -> bool {
		self.store
			.is_proven(remote_chain_id, remote_oracle, application, data_hash)
	}

	pub fn efficient_require_proven(&self, proof_series: &[u8]) -> Result<(), OracleError> {
		self.store.efficient_require_proven(proof_series)
	}

	/// Handles a batched message that arrived from `source_protocol_id`.
	///
	/// Called by adapters once they have authenticated the message.
	#[instrument(skip(self, message), fields(oracle = %self.address))]
	pub fn receive_message(
		&self,
		source_protocol_id: u64,
		remote_oracle: Bytes32,
		message: &[u8],
	) -> Result<Vec<AttestationKey>, OracleError> {
		let chain_id = self.chain_map.get_chain_id(source_protocol_id)?;
		let added = self
			.store
			.receive_message(U256::from(chain_id), remote_oracle, message)?;
		self.announce(&added);
		Ok(added)
	}

	/// Attests payload hashes already extracted by an adapter.
	pub fn attest(
		&self,
		source_protocol_id: u64,
		remote_oracle: Bytes32,
		application: Bytes32,
		hashes: impl IntoIterator<Item = Bytes32>,
	) -> Result<Vec<AttestationKey>, OracleError> {
		let chain_id = self.chain_map.get_chain_id(source_protocol_id)?;
		let added =
			self.store
				.attest_all(U256::from(chain_id), remote_oracle, application, hashes);
		self.announce(&added);
		Ok(added)
	}

	fn announce(&self, added: &[AttestationKey]) {
		for key in added {
			info!(
				remote_chain_id = %key.remote_chain_id,
				remote_oracle = %key.remote_oracle,
				application = %key.application,
				payload_hash = %key.data_hash,
				"Output proven"
			);
			self.events.publish(OracleEvent::OutputProven {
				remote_chain_id: key.remote_chain_id,
				remote_oracle: key.remote_oracle,
				application: key.application,
				payload_hash: key.data_hash,
			});
		}
	}
}

/// Destination-side oracle: packs payloads vouched for by an application
/// and dispatches them through a messaging adapter.
pub struct OutputOracle {
	address: Bytes32,
	adapter: Arc<dyn MessagingAdapter>,
	events: EventBus,
}

impl OutputOracle {
	pub fn new(address: Bytes32, adapter: Arc<dyn MessagingAdapter>, events: EventBus) -> Self {
		Self {
			address,
			adapter,
			events,
		}
	}

	pub fn address(&self) -> Bytes32 {
		self.address
	}

	/// Sends `payloads` created by `source` to `destination_chain`.
	///
	/// Nothing is sent unless `source` confirms every payload for this
	/// oracle.
	pub async fn submit(
		&self,
		destination_chain: u64,
		source: &dyn PayloadCreator,
		payloads: &[Vec<u8>],
	) -> Result<(), OracleError> {
		let application = source.application();
		if !source.has_attested(self.address, payloads) {
			warn!(%application, payloads = payloads.len(), "Payloads not attested by application");
			return Err(OracleError::NotAllPayloadsValid);
		}

		let payload = encode_message(&application, payloads)?;
		debug!(
			adapter = self.adapter.name(),
			destination_chain,
			bytes = payload.len(),
			"Dispatching message"
		);

		self.adapter
			.dispatch(OutboundMessage {
				destination_chain,
				source_oracle: self.address,
				payload,
			})
			.await?;

		self.events.publish(OracleEvent::MessageSubmitted {
			destination_chain,
			application,
			payloads: payloads.len(),
		});
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use oif_encoding::{decode_message, keccak256};
	use oif_types::ProtocolEvent;
	use parking_lot::Mutex;

	struct Vouching(bool);

	impl PayloadCreator for Vouching {
		fn application(&self) -> Bytes32 {
			Bytes32::repeat_byte(0xa1)
		}

		fn has_attested(&self, _oracle: Bytes32, _payloads: &[Vec<u8>]) -> bool {
			self.0
		}
	}

	#[derive(Default)]
	struct Recording {
		sent: Mutex<Vec<OutboundMessage>>,
	}

	#[async_trait]
	impl MessagingAdapter for Recording {
		fn name(&self) -> &str {
			"recording"
		}

		async fn dispatch(&self, message: OutboundMessage) -> Result<(), OracleError> {
			self.sent.lock().push(message);
			Ok(())
		}
	}

	fn input_oracle(events: EventBus) -> InputOracle {
		let chain_map = ChainMap::new();
		chain_map.set_chain_map(2, 10).unwrap();
		InputOracle::new(Bytes32::repeat_byte(0x01), chain_map, events)
	}

	#[tokio::test]
	async fn test_submit_dispatches_packed_message() {
		let adapter = Arc::new(Recording::default());
		let events = EventBus::default();
		let mut receiver = events.subscribe();
		let oracle = OutputOracle::new(Bytes32::repeat_byte(0x0f), adapter.clone(), events);

		let payloads = vec![vec![1u8, 2], vec![3u8]];
		oracle.submit(7, &Vouching(true), &payloads).await.unwrap();

		let sent = adapter.sent.lock().clone();
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].destination_chain, 7);
		assert_eq!(sent[0].source_oracle, Bytes32::repeat_byte(0x0f));

		let (application, hashes) = decode_message(&sent[0].payload).unwrap();
		assert_eq!(application, Bytes32::repeat_byte(0xa1));
		assert_eq!(hashes, vec![keccak256([1u8, 2]), keccak256([3u8])]);

		assert!(matches!(
			receiver.try_recv().unwrap(),
			ProtocolEvent::Oracle(OracleEvent::MessageSubmitted { payloads: 2, .. })
		));
	}

	#[tokio::test]
	async fn test_submit_refuses_unattested_payloads() {
		let adapter = Arc::new(Recording::default());
		let oracle = OutputOracle::new(Bytes32::ZERO, adapter.clone(), EventBus::default());

		let result = oracle.submit(7, &Vouching(false), &[vec![1u8]]).await;
		assert!(matches!(result, Err(OracleError::NotAllPayloadsValid)));
		assert!(adapter.sent.lock().is_empty());
	}

	#[test]
	fn test_receive_message_translates_chain_and_emits_events() {
		let events = EventBus::default();
		let mut receiver = events.subscribe();
		let oracle = input_oracle(events);

		let application = Bytes32::repeat_byte(0xa1);
		let remote = Bytes32::repeat_byte(0x0f);
		let message = encode_message(&application, &[b"fill".to_vec()]).unwrap();

		oracle.receive_message(2, remote, &message).unwrap();
		assert!(oracle.is_proven(U256::from(10), remote, application, keccak256(b"fill")));
		// The protocol id itself is not a canonical chain id.
		assert!(!oracle.is_proven(U256::from(2), remote, application, keccak256(b"fill")));

		match receiver.try_recv().unwrap() {
			ProtocolEvent::Oracle(OracleEvent::OutputProven {
				remote_chain_id,
				payload_hash,
				..
			}) => {
				assert_eq!(remote_chain_id, U256::from(10));
				assert_eq!(payload_hash, keccak256(b"fill"));
			}
			other => panic!("unexpected event {:?}", other),
		}

		// A replay proves nothing new and emits nothing.
		assert!(oracle.receive_message(2, remote, &message).unwrap().is_empty());
		assert!(receiver.try_recv().is_err());
	}

	#[test]
	fn test_unmapped_source_chain_is_rejected() {
		let oracle = input_oracle(EventBus::default());
		let message = encode_message(&Bytes32::ZERO, &[vec![0u8]]).unwrap();

		assert!(matches!(
			oracle.receive_message(99, Bytes32::ZERO, &message),
			Err(OracleError::NoChainIdMapping(99))
		));
		assert!(oracle.attestations().is_empty());
	}
}
