//! Configuration validation for the settlement services.
//!
//! Configuration is validated as a raw TOML tree before it is deserialized,
//! so errors point at the offending field path (`oracle.chain_map[1].chain_id`)
//! rather than at a serde position.

use crate::primitives::parse_bytes32;
use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// A required field is missing.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// A field has an invalid value.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// A field has the wrong type.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// Type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
	/// Hex string of at most 32 bytes, `0x` prefix optional.
	Bytes32,
	/// String restricted to a fixed set of values.
	OneOf(Vec<&'static str>),
	Array(Box<FieldType>),
	Table(Schema),
}

/// Type alias for field validator functions.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A field definition with name and type.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Adds a custom validator run after the type check.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}
}

/// Schema definition with required and optional fields.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML value against this schema.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			validate_field(field, value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				validate_field(field, value)?;
			}
		}

		Ok(())
	}
}

fn validate_field(field: &Field, value: &toml::Value) -> Result<(), ValidationError> {
	validate_field_type(&field.name, value, &field.field_type)?;

	if let Some(validator) = &field.validator {
		validator(value).map_err(|message| ValidationError::InvalidValue {
			field: field.name.clone(),
			message,
		})?;
	}

	Ok(())
}

fn type_mismatch(field_name: &str, expected: &str, value: &toml::Value) -> ValidationError {
	ValidationError::TypeMismatch {
		field: field_name.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	}
}

/// Validates that a value matches the expected field type.
fn validate_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	match expected_type {
		FieldType::String => {
			if !value.is_str() {
				return Err(type_mismatch(field_name, "string", value));
			}
		}
		FieldType::Integer { min, max } => {
			let int_val = value
				.as_integer()
				.ok_or_else(|| type_mismatch(field_name, "integer", value))?;

			if let Some(min_val) = min {
				if int_val < *min_val {
					return Err(ValidationError::InvalidValue {
						field: field_name.to_string(),
						message: format!("Value {} is less than minimum {}", int_val, min_val),
					});
				}
			}

			if let Some(max_val) = max {
				if int_val > *max_val {
					return Err(ValidationError::InvalidValue {
						field: field_name.to_string(),
						message: format!("Value {} is greater than maximum {}", int_val, max_val),
					});
				}
			}
		}
		FieldType::Boolean => {
			if !value.is_bool() {
				return Err(type_mismatch(field_name, "boolean", value));
			}
		}
		FieldType::Bytes32 => {
			let s = value
				.as_str()
				.ok_or_else(|| type_mismatch(field_name, "bytes32 hex string", value))?;
			parse_bytes32(s).map_err(|e| ValidationError::InvalidValue {
				field: field_name.to_string(),
				message: e.to_string(),
			})?;
		}
		FieldType::OneOf(allowed) => {
			let s = value
				.as_str()
				.ok_or_else(|| type_mismatch(field_name, "string", value))?;
			if !allowed.contains(&s) {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("'{}' is not one of {:?}", s, allowed),
				});
			}
		}
		FieldType::Array(inner_type) => {
			let array = value
				.as_array()
				.ok_or_else(|| type_mismatch(field_name, "array", value))?;

			for (i, item) in array.iter().enumerate() {
				validate_field_type(&format!("{}[{}]", field_name, i), item, inner_type)?;
			}
		}
		FieldType::Table(schema) => {
			schema.validate(value).map_err(|e| match e {
				ValidationError::MissingField(f) => {
					ValidationError::MissingField(format!("{}.{}", field_name, f))
				}
				ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
					field: format!("{}.{}", field_name, field),
					message,
				},
				ValidationError::TypeMismatch {
					field,
					expected,
					actual,
				} => ValidationError::TypeMismatch {
					field: format!("{}.{}", field_name, field),
					expected,
					actual,
				},
			})?;
		}
	}

	Ok(())
}

/// A configuration section that can validate its raw TOML form.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn oracle_schema() -> Schema {
		Schema::new(
			vec![Field::new("address", FieldType::Bytes32)],
			vec![Field::new(
				"chain_map",
				FieldType::Array(Box::new(FieldType::Table(Schema::new(
					vec![
						Field::new(
							"protocol_id",
							FieldType::Integer {
								min: Some(1),
								max: None,
							},
						),
						Field::new(
							"chain_id",
							FieldType::Integer {
								min: Some(1),
								max: None,
							},
						),
					],
					vec![],
				)))),
			)],
		)
	}

	#[test]
	fn test_valid_table_passes() {
		let value: toml::Value = toml::from_str(
			r#"
			address = "0x1111111111111111111111111111111111111111"
			chain_map = [{ protocol_id = 30110, chain_id = 42161 }]
			"#,
		)
		.unwrap();
		assert!(oracle_schema().validate(&value).is_ok());
	}

	#[test]
	fn test_nested_errors_carry_the_field_path() {
		let value: toml::Value = toml::from_str(
			r#"
			address = "0x11"
			chain_map = [{ protocol_id = 1, chain_id = 1 }, { protocol_id = 2, chain_id = 0 }]
			"#,
		)
		.unwrap();

		match oracle_schema().validate(&value) {
			Err(ValidationError::InvalidValue { field, .. }) => {
				assert_eq!(field, "chain_map[1].chain_id")
			}
			other => panic!("unexpected result {:?}", other),
		}
	}

	#[test]
	fn test_bytes32_and_one_of() {
		let schema = Schema::new(
			vec![
				Field::new("address", FieldType::Bytes32),
				Field::new("backend", FieldType::OneOf(vec!["memory", "file"])),
			],
			vec![],
		);

		let bad_hex: toml::Value =
			toml::from_str("address = \"0xnothex\"\nbackend = \"file\"").unwrap();
		assert!(matches!(
			schema.validate(&bad_hex),
			Err(ValidationError::InvalidValue { .. })
		));

		let bad_backend: toml::Value =
			toml::from_str("address = \"0x01\"\nbackend = \"redis\"").unwrap();
		assert!(matches!(
			schema.validate(&bad_backend),
			Err(ValidationError::InvalidValue { .. })
		));

		let missing: toml::Value = toml::from_str("backend = \"file\"").unwrap();
		assert!(matches!(
			schema.validate(&missing),
			Err(ValidationError::MissingField(f)) if f == "address"
		));
	}
}
