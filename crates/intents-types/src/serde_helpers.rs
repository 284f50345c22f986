//! Serde helpers for integer amounts carried as strings.

use crate::Amount;
use serde::{de, Deserialize, Deserializer, Serializer};

/// Parses an amount from a decimal string or a `0x`-prefixed hex string.
///
/// Fractional or signed inputs are rejected; amounts never go through a
/// floating point representation.
pub fn parse_amount(value: &str) -> Result<Amount, String> {
	let trimmed = value.trim();
	if trimmed.is_empty() {
		return Err("empty amount".to_string());
	}

	let parsed = match trimmed
		.strip_prefix("0x")
		.or_else(|| trimmed.strip_prefix("0X"))
	{
		Some(hex_digits) if !hex_digits.is_empty() => Amount::from_str_radix(hex_digits, 16),
		Some(_) => return Err(format!("invalid hex amount: {}", value)),
		None => Amount::from_str_radix(trimmed, 10),
	};

	parsed.map_err(|e| format!("invalid amount '{}': {}", value, e))
}

/// Serializes an [`Amount`] as a base-10 string and accepts either a string
/// or an unsigned JSON integer when deserializing.
pub mod amount_string {
	use super::*;

	pub fn serialize<S>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&amount.to_string())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Amount, D::Error>
	where
		D: Deserializer<'de>,
	{
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Raw {
			Text(String),
			Number(u64),
		}

		match Raw::deserialize(deserializer)? {
			Raw::Text(text) => parse_amount(&text).map_err(de::Error::custom),
			Raw::Number(number) => Ok(Amount::from(number)),
		}
	}
}
