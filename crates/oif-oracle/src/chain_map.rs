//! Translation between protocol-specific chain identifiers and canonical
//! chain ids.
//!
//! Messaging protocols number chains their own way (Wormhole ids, LayerZero
//! endpoint ids, Hyperlane domains). Attestations are always keyed by the
//! canonical chain id, so every adapter translates through this map.

use crate::OracleError;
use oif_types::ChainMapping;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Tables {
	to_chain_id: HashMap<u64, u64>,
	to_protocol_id: HashMap<u64, u64>,
}

/// Bidirectional chain identifier map.
///
/// Each mapping is written once; neither direction can be overwritten.
#[derive(Debug, Default)]
pub struct ChainMap {
	tables: RwLock<Tables>,
}

impl ChainMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a map from configured mappings.
	pub fn from_mappings(mappings: &[ChainMapping]) -> Result<Self, OracleError> {
		let map = Self::new();
		for mapping in mappings {
			map.set_chain_map(mapping.protocol_id, mapping.chain_id)?;
		}
		Ok(map)
	}

	pub fn set_chain_map(&self, protocol_id: u64, chain_id: u64) -> Result<(), OracleError> {
		if protocol_id == 0 || chain_id == 0 {
			return Err(OracleError::ZeroValue);
		}

		let mut tables = self.tables.write();
		if tables.to_chain_id.contains_key(&protocol_id)
			|| tables.to_protocol_id.contains_key(&chain_id)
		{
			return Err(OracleError::AlreadySet);
		}
		tables.to_chain_id.insert(protocol_id, chain_id);
		tables.to_protocol_id.insert(chain_id, protocol_id);

		tracing::info!(protocol_id, chain_id, "Chain mapping set");
		Ok(())
	}

	pub fn get_chain_id(&self, protocol_id: u64) -> Result<u64, OracleError> {
		self.tables
			.read()
			.to_chain_id
			.get(&protocol_id)
			.copied()
			.ok_or(OracleError::NoChainIdMapping(protocol_id))
	}

	pub fn get_protocol_id(&self, chain_id: u64) -> Result<u64, OracleError> {
		self.tables
			.read()
			.to_protocol_id
			.get(&chain_id)
			.copied()
			.ok_or(OracleError::NoChainIdMapping(chain_id))
	}
}
