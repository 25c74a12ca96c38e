//! # Configuration Types
//!
//! Configuration structures for the settlement service: the service itself,
//! the local output settler, the local oracle and the storage backend.

use crate::serde_helpers::padded_bytes32;
use crate::validation::{ConfigSchema, Field, FieldType, Schema, ValidationError};
use crate::Bytes32;
use serde::{Deserialize, Serialize};

/// Root configuration object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	pub service: ServiceSettings,
	pub settler: SettlerSettings,
	pub oracle: OracleSettings,
	#[serde(default)]
	pub storage: StorageSettings,
}

/// Service identification and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
	pub name: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

fn default_log_level() -> String {
	"info".to_string()
}

/// Identity of the local output settler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlerSettings {
	/// Chain the settler is deployed on.
	pub chain_id: u64,
	/// Settler identifier as bytes32.
	#[serde(with = "padded_bytes32")]
	pub address: Bytes32,
}

/// Identity and chain translation table of the local oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSettings {
	#[serde(with = "padded_bytes32")]
	pub address: Bytes32,
	#[serde(default)]
	pub chain_map: Vec<ChainMapping>,
}

/// One protocol-specific chain identifier and the canonical chain id it
/// stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainMapping {
	pub protocol_id: u64,
	pub chain_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
	#[default]
	Memory,
	File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
	#[serde(default)]
	pub backend: StorageBackend,
	#[serde(default = "default_storage_path")]
	pub path: String,
}

fn default_storage_path() -> String {
	"./data/storage".to_string()
}

impl Default for StorageSettings {
	fn default() -> Self {
		Self {
			backend: StorageBackend::default(),
			path: default_storage_path(),
		}
	}
}

fn positive_integer() -> FieldType {
	FieldType::Integer {
		min: Some(1),
		max: None,
	}
}

/// Schema of the whole configuration file.
pub struct ConfigFileSchema;

impl ConfigSchema for ConfigFileSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new(
					"service",
					FieldType::Table(Schema::new(
						vec![Field::new("name", FieldType::String).with_validator(|value| {
							match value.as_str() {
								Some(name) if !name.trim().is_empty() => Ok(()),
								_ => Err("service name must not be empty".to_string()),
							}
						})],
						vec![Field::new(
							"log_level",
							FieldType::OneOf(vec!["trace", "debug", "info", "warn", "error"]),
						)],
					)),
				),
				Field::new(
					"settler",
					FieldType::Table(Schema::new(
						vec![
							Field::new("chain_id", positive_integer()),
							Field::new("address", FieldType::Bytes32),
						],
						vec![],
					)),
				),
				Field::new(
					"oracle",
					FieldType::Table(Schema::new(
						vec![Field::new("address", FieldType::Bytes32)],
						vec![Field::new(
							"chain_map",
							FieldType::Array(Box::new(FieldType::Table(Schema::new(
								vec![
									Field::new("protocol_id", positive_integer()),
									Field::new("chain_id", positive_integer()),
								],
								vec![],
							)))),
						)],
					)),
				),
			],
			vec![Field::new(
				"storage",
				FieldType::Table(Schema::new(
					vec![],
					vec![
						Field::new("backend", FieldType::OneOf(vec!["memory", "file"])),
						Field::new("path", FieldType::String),
					],
				)),
			)],
		);

		schema.validate(config)
	}
}
