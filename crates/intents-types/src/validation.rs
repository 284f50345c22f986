//! Schema checks for raw TOML configuration tables.
//!
//! Chain tables are validated here before they are deserialized into a
//! [`ChainConfig`](crate::ChainConfig), so that a typo in an address is
//! reported with the offending field path instead of a serde message.

use thiserror::Error;

use crate::ChainType;

#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

impl ValidationError {
	/// Prefixes the field path with `parent`.
	fn nested(self, parent: &str) -> Self {
		match self {
			ValidationError::MissingField(f) => ValidationError::MissingField(format!("{}.{}", parent, f)),
			ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
				field: format!("{}.{}", parent, field),
				message,
			},
			ValidationError::TypeMismatch {
				field,
				expected,
				actual,
			} => ValidationError::TypeMismatch {
				field: format!("{}.{}", parent, field),
				expected,
				actual,
			},
		}
	}
}

#[derive(Debug)]
pub enum FieldType {
	String,
	Integer { min: Option<i64>, max: Option<i64> },
	/// A string holding an address in the given family's format.
	Address(ChainType),
	Array(Box<FieldType>),
	Table(Schema),
}

pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

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

	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		check_type(&self.name, value, &self.field_type)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}
		Ok(())
	}
}

#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| mismatch("root", "table", config))?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}
		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}
		Ok(())
	}
}

fn mismatch(field: &str, expected: &str, value: &toml::Value) -> ValidationError {
	ValidationError::TypeMismatch {
		field: field.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	}
}

fn check_type(name: &str, value: &toml::Value, expected: &FieldType) -> Result<(), ValidationError> {
	match expected {
		FieldType::String => {
			value.as_str().ok_or_else(|| mismatch(name, "string", value))?;
		}
		FieldType::Integer { min, max } => {
			let int = value
				.as_integer()
				.ok_or_else(|| mismatch(name, "integer", value))?;
			if let Some(min) = min {
				if int < *min {
					return Err(ValidationError::InvalidValue {
						field: name.to_string(),
						message: format!("Value {} is less than minimum {}", int, min),
					});
				}
			}
			if let Some(max) = max {
				if int > *max {
					return Err(ValidationError::InvalidValue {
						field: name.to_string(),
						message: format!("Value {} is greater than maximum {}", int, max),
					});
				}
			}
		}
		FieldType::Address(chain_type) => {
			let text = value.as_str().ok_or_else(|| mismatch(name, "string", value))?;
			if !is_valid_address(*chain_type, text) {
				return Err(ValidationError::InvalidValue {
					field: name.to_string(),
					message: format!("'{}' is not a valid {} address", text, chain_type),
				});
			}
		}
		FieldType::Array(inner) => {
			let items = value.as_array().ok_or_else(|| mismatch(name, "array", value))?;
			for (i, item) in items.iter().enumerate() {
				check_type(&format!("{}[{}]", name, i), item, inner)?;
			}
		}
		FieldType::Table(schema) => {
			schema.validate(value).map_err(|e| e.nested(name))?;
		}
	}
	Ok(())
}

fn is_hex(text: &str) -> bool {
	!text.is_empty() && text.chars().all(|c| c.is_ascii_hexdigit())
}

/// Whether `address` is well formed for `chain_type`.
///
/// EVM: `0x` followed by 40 hex digits. ICON: `hx` (wallet) or `cx`
/// (contract) followed by 40 hex digits. Sui: `0x` followed by hex, or a
/// fully qualified coin type `0x..::module::NAME`.
pub fn is_valid_address(chain_type: ChainType, address: &str) -> bool {
	match chain_type {
		ChainType::Evm => address
			.strip_prefix("0x")
			.is_some_and(|rest| rest.len() == 40 && is_hex(rest)),
		ChainType::Icon => address
			.strip_prefix("hx")
			.or_else(|| address.strip_prefix("cx"))
			.is_some_and(|rest| rest.len() == 40 && is_hex(rest)),
		ChainType::Sui => {
			let object = address.split("::").next().unwrap_or_default();
			let parts = address.split("::").count();
			(parts == 1 || parts == 3)
				&& object
					.strip_prefix("0x")
					.is_some_and(|rest| rest.len() <= 64 && is_hex(rest))
		}
	}
}

/// A configuration section that knows how to validate its raw TOML.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

/// Schema of a `[chains.<name>]` table for one chain family.
pub struct ChainTableSchema {
	pub chain_type: ChainType,
}

impl ChainTableSchema {
	pub fn new(chain_type: ChainType) -> Self {
		Self { chain_type }
	}

	fn schema(&self) -> Schema {
		let non_empty = |value: &toml::Value| match value.as_str() {
			Some(s) if !s.trim().is_empty() => Ok(()),
			_ => Err("must not be empty".to_string()),
		};
		let token = Schema::new(
			vec![
				Field::new("symbol", FieldType::String),
				Field::new(
					"decimals",
					FieldType::Integer {
						min: Some(0),
						max: Some(77),
					},
				),
				Field::new("address", FieldType::Address(self.chain_type)),
			],
			vec![Field::new("name", FieldType::String)],
		);

		let mut required = vec![
			Field::new("nid", FieldType::String).with_validator(non_empty),
			Field::new("rpc_url", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
					_ => Err("must be an http(s) URL".to_string()),
				}
			}),
		];
		match self.chain_type {
			ChainType::Evm | ChainType::Icon => {
				required.push(Field::new(
					"intent_contract",
					FieldType::Address(self.chain_type),
				));
				required.push(Field::new("native_token", FieldType::Address(self.chain_type)));
			}
			ChainType::Sui => {
				required.push(Field::new("package_id", FieldType::Address(ChainType::Sui)));
				required.push(Field::new("storage_id", FieldType::Address(ChainType::Sui)));
				required.push(Field::new("native_token", FieldType::Address(ChainType::Sui)));
			}
		}

		let mut optional = vec![Field::new(
			"supported_tokens",
			FieldType::Array(Box::new(FieldType::Table(token))),
		)];
		match self.chain_type {
			ChainType::Icon => optional.push(Field::new("debug_rpc_url", FieldType::String)),
			ChainType::Sui => optional.push(Field::new("intent_module", FieldType::String)),
			ChainType::Evm => {}
		}

		Schema::new(required, optional)
	}
}

impl ConfigSchema for ChainTableSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		self.schema().validate(config)
	}
}
