//! Events emitted by the settler and the oracles.
//!
//! Events are published on an [`EventBus`] only once the transaction that
//! produced them has committed; a reverted fill emits nothing.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{Bytes32, MandateOutput, Timestamp, U256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolEvent {
	Settler(SettlerEvent),
	Oracle(OracleEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlerEvent {
	/// An output was filled for the first time.
	OutputFilled {
		order_id: Bytes32,
		solver: Bytes32,
		timestamp: Timestamp,
		output: MandateOutput,
		final_amount: U256,
	},
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OracleEvent {
	/// A payload hash became attested.
	OutputProven {
		remote_chain_id: U256,
		remote_oracle: Bytes32,
		application: Bytes32,
		payload_hash: Bytes32,
	},
	/// A batch of payloads was handed to a messaging adapter.
	MessageSubmitted {
		/// Protocol-specific identifier of the destination chain.
		destination_chain: u64,
		application: Bytes32,
		payloads: usize,
	},
}

impl From<SettlerEvent> for ProtocolEvent {
	fn from(event: SettlerEvent) -> Self {
		ProtocolEvent::Settler(event)
	}
}

impl From<OracleEvent> for ProtocolEvent {
	fn from(event: OracleEvent) -> Self {
		ProtocolEvent::Oracle(event)
	}
}

pub struct EventBus {
	sender: broadcast::Sender<ProtocolEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<ProtocolEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to every current subscriber.
	///
	/// Having no subscriber is not an error; the event is dropped.
	pub fn publish(&self, event: impl Into<ProtocolEvent>) {
		let _ = self.sender.send(event.into());
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(1024)
	}
}

impl Clone for EventBus {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}
