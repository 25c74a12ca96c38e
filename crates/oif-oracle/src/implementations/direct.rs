//! Direct messaging implementation for local simulation and testing.
//!
//! Delivers messages in-process to registered input oracles, without any
//! external transport or verification.

use crate::oracle::InputOracle;
use crate::{MessagingAdapter, OracleError, OutboundMessage};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Loopback adapter.
pub struct DirectAdapter {
	/// Protocol identifier of the sending chain, as receivers know it.
	source_chain: u64,
	receivers: RwLock<HashMap<u64, Arc<InputOracle>>>,
}

impl DirectAdapter {
	pub fn new(source_chain: u64) -> Self {
		Self {
			source_chain,
			receivers: RwLock::new(HashMap::new()),
		}
	}

	/// Routes messages for `destination_chain` to `oracle`.
	pub fn register(&self, destination_chain: u64, oracle: Arc<InputOracle>) {
		self.receivers.write().insert(destination_chain, oracle);
	}
}

#[async_trait]
impl MessagingAdapter for DirectAdapter {
	fn name(&self) -> &str {
		"direct"
	}

	async fn dispatch(&self, message: OutboundMessage) -> Result<(), OracleError> {
		let receiver = self
			.receivers
			.read()
			.get(&message.destination_chain)
			.cloned()
			.ok_or(OracleError::UnknownDestination(message.destination_chain))?;

		receiver.receive_message(self.source_chain, message.source_oracle, &message.payload)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::chain_map::ChainMap;
	use crate::oracle::OutputOracle;
	use alloy_primitives::U256;
	use oif_encoding::keccak256;
	use oif_types::{Bytes32, EventBus, PayloadCreator};

	struct AlwaysValid;

	impl PayloadCreator for AlwaysValid {
		fn application(&self) -> Bytes32 {
			Bytes32::repeat_byte(0x5e)
		}

		fn has_attested(&self, _oracle: Bytes32, _payloads: &[Vec<u8>]) -> bool {
			true
		}
	}

	#[tokio::test]
	async fn test_loopback_delivery_attests_payloads() {
		let chain_map = ChainMap::new();
		chain_map.set_chain_map(2, 10).unwrap();
		let input = Arc::new(InputOracle::new(
			Bytes32::repeat_byte(0x01),
			chain_map,
			EventBus::default(),
		));

		let adapter = Arc::new(DirectAdapter::new(2));
		adapter.register(1, input.clone());

		let output_oracle = Bytes32::repeat_byte(0x02);
		let output = OutputOracle::new(output_oracle, adapter, EventBus::default());
		output
			.submit(1, &AlwaysValid, &[b"payload".to_vec()])
			.await
			.unwrap();

		assert!(input.is_proven(
			U256::from(10),
			output_oracle,
			Bytes32::repeat_byte(0x5e),
			keccak256(b"payload")
		));
	}

	#[tokio::test]
	async fn test_unknown_destination() {
		let adapter = DirectAdapter::new(2);
		let result = adapter
			.dispatch(OutboundMessage {
				destination_chain: 5,
				source_oracle: Bytes32::ZERO,
				payload: vec![],
			})
			.await;

		assert!(matches!(result, Err(OracleError::UnknownDestination(5))));
	}
}
