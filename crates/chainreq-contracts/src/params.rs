//! Conversions between decorator parameters, JSON arguments and ABI values.
//!
//! Arguments arrive as `[{ "type": "<solidity type>", "value": <json> }]`.
//! Tuples use the type `tuple` (or `struct`) with a list of nested
//! `{type, value}` objects as value; arrays of tuples use `tuple[]` with a
//! list of such lists.

use crate::ContractError;
use alloy::dyn_abi::{DynSolType, DynSolValue};
use chainreq_types::api::FunctionArgument;
use chainreq_types::{address_hex, ContractParameter, B256};
use serde_json::{json, Value};

/// Splits `name(a,b)` into the name and its top level parameter types.
pub fn split_signature(signature: &str) -> Result<(&str, Vec<&str>), ContractError> {
	let open = signature
		.find('(')
		.ok_or_else(|| ContractError::InvalidDecorator(format!("Invalid signature: {}", signature)))?;
	let inner = signature[open + 1..]
		.strip_suffix(')')
		.ok_or_else(|| ContractError::InvalidDecorator(format!("Invalid signature: {}", signature)))?;

	Ok((&signature[..open], split_top_level(inner)))
}

/// Splits a comma separated type list, ignoring commas inside parentheses.
pub fn split_top_level(list: &str) -> Vec<&str> {
	let mut parts = Vec::new();
	let mut depth = 0usize;
	let mut start = 0;

	for (index, c) in list.char_indices() {
		match c {
			'(' => depth += 1,
			')' => depth = depth.saturating_sub(1),
			',' if depth == 0 => {
				parts.push(list[start..index].trim());
				start = index + 1;
			}
			_ => {}
		}
	}

	let last = list[start..].trim();
	if !last.is_empty() || !parts.is_empty() {
		parts.push(last);
	}
	parts
}

/// Resolves the ABI type of a decorator parameter. Tuple types take their
/// components from `components`.
pub fn parameter_sol_type(
	solidity_type: &str,
	components: Option<&[ContractParameter]>,
) -> Result<DynSolType, ContractError> {
	if let Some(suffix) = solidity_type.strip_prefix("tuple") {
		let components = components
			.unwrap_or(&[])
			.iter()
			.map(|p| parameter_sol_type(&p.solidity_type, p.parameters.as_deref()))
			.collect::<Result<Vec<_>, _>>()?;

		return apply_array_suffix(DynSolType::Tuple(components), suffix);
	}

	DynSolType::parse(solidity_type).map_err(|e| {
		ContractError::InvalidDecorator(format!("Unsupported type {}: {}", solidity_type, e))
	})
}

fn apply_array_suffix(base: DynSolType, suffix: &str) -> Result<DynSolType, ContractError> {
	let mut sol_type = base;
	let mut rest = suffix;

	while !rest.is_empty() {
		let (size, remaining) = rest
			.strip_prefix('[')
			.and_then(|r| r.find(']').map(|end| (&r[..end], &r[end + 1..])))
			.ok_or_else(|| {
				ContractError::InvalidDecorator(format!("Invalid array suffix: {}", suffix))
			})?;

		sol_type = if size.is_empty() {
			DynSolType::Array(Box::new(sol_type))
		} else {
			let length = size.parse::<usize>().map_err(|_| {
				ContractError::InvalidDecorator(format!("Invalid array size: {}", size))
			})?;
			DynSolType::FixedArray(Box::new(sol_type), length)
		};
		rest = remaining;
	}

	Ok(sol_type)
}

/// Parses JSON arguments into ABI types and values, in order.
pub fn parse_arguments(
	arguments: &[FunctionArgument],
) -> Result<(Vec<DynSolType>, Vec<DynSolValue>), ContractError> {
	let parsed = arguments
		.iter()
		.map(|argument| parse_argument(&argument.argument_type, &argument.value))
		.collect::<Result<Vec<_>, _>>()?;

	Ok(parsed.into_iter().unzip())
}

/// Parses a single `{type, value}` argument.
pub fn parse_argument(
	argument_type: &str,
	value: &Value,
) -> Result<(DynSolType, DynSolValue), ContractError> {
	if let Some(stripped) = argument_type.strip_suffix(']') {
		return parse_array(argument_type, stripped, value);
	}

	if argument_type == "tuple" || argument_type == "struct" {
		return parse_tuple(value);
	}

	let sol_type = DynSolType::parse(argument_type)
		.map_err(|_| ContractError::InvalidArguments(format!("Unknown type: {}", argument_type)))?;
	let sol_value = coerce_value(&sol_type, value)?;
	Ok((sol_type, sol_value))
}

fn parse_array(
	argument_type: &str,
	stripped: &str,
	value: &Value,
) -> Result<(DynSolType, DynSolValue), ContractError> {
	let open = stripped
		.rfind('[')
		.ok_or_else(|| ContractError::InvalidArguments(format!("Unknown type: {}", argument_type)))?;
	let element_type = &stripped[..open];
	let length = match &stripped[open + 1..] {
		"" => None,
		size => Some(size.parse::<usize>().map_err(|_| {
			ContractError::InvalidArguments(format!("Invalid array size in {}", argument_type))
		})?),
	};

	let items = value.as_array().ok_or_else(|| {
		ContractError::InvalidArguments(format!("Expected array value for {}", argument_type))
	})?;
	if length.is_some_and(|length| length != items.len()) {
		return Err(ContractError::InvalidArguments(format!(
			"Invalid array length for {}",
			argument_type
		)));
	}

	let parsed = items
		.iter()
		.map(|item| parse_argument(element_type, item))
		.collect::<Result<Vec<_>, _>>()?;

	let element_sol_type = match parsed.first() {
		Some((sol_type, _)) => sol_type.clone(),
		None => declared_type(element_type)?,
	};
	if parsed.iter().any(|(sol_type, _)| *sol_type != element_sol_type) {
		return Err(ContractError::InvalidArguments(format!(
			"Mismatching element types in {}",
			argument_type
		)));
	}

	let values = parsed.into_iter().map(|(_, v)| v).collect();
	Ok(match length {
		Some(length) => (
			DynSolType::FixedArray(Box::new(element_sol_type), length),
			DynSolValue::FixedArray(values),
		),
		None => (
			DynSolType::Array(Box::new(element_sol_type)),
			DynSolValue::Array(values),
		),
	})
}

fn parse_tuple(value: &Value) -> Result<(DynSolType, DynSolValue), ContractError> {
	let items = value
		.as_array()
		.ok_or_else(|| ContractError::InvalidArguments("Expected array value for tuple".into()))?;
	if items.is_empty() {
		return Err(ContractError::InvalidArguments(
			"Tuples cannot be empty".into(),
		));
	}

	let (types, values): (Vec<_>, Vec<_>) = items
		.iter()
		.map(|item| {
			let argument: FunctionArgument = serde_json::from_value(item.clone()).map_err(|e| {
				ContractError::InvalidArguments(format!("Invalid tuple element: {}", e))
			})?;
			parse_argument(&argument.argument_type, &argument.value)
		})
		.collect::<Result<Vec<_>, _>>()?
		.into_iter()
		.unzip();

	Ok((DynSolType::Tuple(types), DynSolValue::Tuple(values)))
}

/// Type of an array element when the array itself is empty.
fn declared_type(argument_type: &str) -> Result<DynSolType, ContractError> {
	if let Some(stripped) = argument_type.strip_suffix(']') {
		let open = stripped.rfind('[').ok_or_else(|| {
			ContractError::InvalidArguments(format!("Unknown type: {}", argument_type))
		})?;
		let element = Box::new(declared_type(&stripped[..open])?);
		return match &stripped[open + 1..] {
			"" => Ok(DynSolType::Array(element)),
			size => size
				.parse::<usize>()
				.map(|length| DynSolType::FixedArray(element, length))
				.map_err(|_| {
					ContractError::InvalidArguments(format!("Invalid array size in {}", argument_type))
				}),
		};
	}

	if argument_type == "tuple" || argument_type == "struct" {
		return Ok(DynSolType::Tuple(Vec::new()));
	}

	DynSolType::parse(argument_type)
		.map_err(|_| ContractError::InvalidArguments(format!("Unknown type: {}", argument_type)))
}

fn coerce_value(sol_type: &DynSolType, value: &Value) -> Result<DynSolValue, ContractError> {
	let invalid = || {
		ContractError::InvalidArguments(format!(
			"Invalid value {} for type {}",
			value,
			sol_type.sol_type_name()
		))
	};

	match (sol_type, value) {
		(DynSolType::Bool, Value::Bool(b)) => Ok(DynSolValue::Bool(*b)),
		(DynSolType::Bytes, Value::Array(items)) => Ok(DynSolValue::Bytes(byte_list(items)?)),
		(DynSolType::FixedBytes(size), Value::Array(items)) => {
			let bytes = byte_list(items)?;
			if bytes.len() != *size {
				return Err(invalid());
			}
			Ok(DynSolValue::FixedBytes(B256::right_padding_from(&bytes), *size))
		}
		(_, Value::String(s)) => sol_type.coerce_str(s).map_err(|_| invalid()),
		(_, Value::Number(n)) => sol_type.coerce_str(&n.to_string()).map_err(|_| invalid()),
		_ => Err(invalid()),
	}
}

fn byte_list(items: &[Value]) -> Result<Vec<u8>, ContractError> {
	items
		.iter()
		.map(|item| {
			item.as_i64()
				.and_then(|b| u8::try_from(b).ok().or_else(|| i8::try_from(b).ok().map(|b| b as u8)))
				.ok_or_else(|| ContractError::InvalidArguments(format!("Invalid byte value: {}", item)))
		})
		.collect()
}

/// Whether an indexed event argument of this type is stored as a hash.
pub fn is_reference_type(sol_type: &DynSolType) -> bool {
	matches!(
		sol_type,
		DynSolType::String
			| DynSolType::Bytes
			| DynSolType::Array(_)
			| DynSolType::FixedArray(..)
			| DynSolType::Tuple(_)
	)
}

/// JSON rendering of a decoded value.
pub fn value_to_json(value: &DynSolValue) -> Value {
	match value {
		DynSolValue::Address(address) => Value::String(address_hex(address)),
		DynSolValue::Bool(b) => Value::Bool(*b),
		DynSolValue::Int(i, _) => Value::String(i.to_string()),
		DynSolValue::Uint(u, _) => Value::String(u.to_string()),
		DynSolValue::FixedBytes(word, size) => Value::Array(
			word.as_slice()[..*size]
				.iter()
				.map(|b| Value::from(*b))
				.collect(),
		),
		DynSolValue::Bytes(bytes) => Value::String(format!("0x{}", hex::encode(bytes))),
		DynSolValue::String(s) => Value::String(s.clone()),
		DynSolValue::Function(function) => {
			Value::String(format!("0x{}", hex::encode(function.as_slice())))
		}
		DynSolValue::Array(values) | DynSolValue::FixedArray(values) | DynSolValue::Tuple(values) => {
			Value::Array(values.iter().map(value_to_json).collect())
		}
		#[allow(unreachable_patterns)]
		_ => Value::Null,
	}
}

/// Type name in the form arguments are accepted in: tuples are `tuple`.
pub fn type_label(sol_type: &DynSolType) -> String {
	match sol_type {
		DynSolType::Tuple(_) => "tuple".to_string(),
		DynSolType::Array(inner) => format!("{}[]", type_label(inner)),
		DynSolType::FixedArray(inner, length) => format!("{}[{}]", type_label(inner), length),
		other => other.sol_type_name().into_owned(),
	}
}

/// Renders decoded values as `[{type, value}]`, the shape arguments are
/// accepted in.
pub fn typed_arguments_json(types: &[DynSolType], values: &[DynSolValue]) -> Value {
	Value::Array(
		types
			.iter()
			.zip(values)
			.map(|(sol_type, value)| {
				json!({
					"type": type_label(sol_type),
					"value": typed_value(sol_type, value),
				})
			})
			.collect(),
	)
}

fn typed_value(sol_type: &DynSolType, value: &DynSolValue) -> Value {
	match (sol_type, value) {
		(DynSolType::Tuple(types), DynSolValue::Tuple(values)) => typed_arguments_json(types, values),
		(DynSolType::Array(inner), DynSolValue::Array(values))
		| (DynSolType::FixedArray(inner, _), DynSolValue::FixedArray(values)) => {
			Value::Array(values.iter().map(|v| typed_value(inner, v)).collect())
		}
		_ => value_to_json(value),
	}
}
