//! Call data encoding for deployments and function calls.

use crate::params::{parameter_sol_type, parse_arguments, typed_arguments_json};
use crate::ContractError;
use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::keccak256;
use chainreq_types::api::FunctionArgument;
use chainreq_types::{canonical_signature, Bytes, ContractParameter, B256};

/// Four byte selector of a function signature.
pub fn function_selector(signature: &str) -> [u8; 4] {
	let hash = keccak256(canonical_signature(signature).as_bytes());
	[hash[0], hash[1], hash[2], hash[3]]
}

/// Topic zero of an event signature.
pub fn event_topic(signature: &str) -> B256 {
	keccak256(canonical_signature(signature).as_bytes())
}

/// Encodes `function_name(arguments)` call data. The selector is derived from
/// the argument types.
pub fn encode_function_call(
	function_name: &str,
	arguments: &[FunctionArgument],
) -> Result<Bytes, ContractError> {
	let (types, values) = parse_arguments(arguments)?;
	let signature = format!(
		"{}({})",
		function_name,
		types
			.iter()
			.map(|t| t.sol_type_name().into_owned())
			.collect::<Vec<_>>()
			.join(",")
	);

	let mut data = function_selector(&signature).to_vec();
	data.extend(DynSolValue::Tuple(values).abi_encode_params());
	Ok(data.into())
}

/// Creation data of a deployment: the contract binary followed by the
/// encoded constructor arguments.
pub fn encode_constructor(
	binary: &Bytes,
	arguments: &[FunctionArgument],
) -> Result<Bytes, ContractError> {
	let (_, values) = parse_arguments(arguments)?;

	let mut data = binary.to_vec();
	if !values.is_empty() {
		data.extend(DynSolValue::Tuple(values).abi_encode_params());
	}
	Ok(data.into())
}

/// Decodes encoded constructor arguments against the constructor inputs and
/// renders them as `[{type, value}]`.
pub fn decode_constructor_params(
	inputs: &[ContractParameter],
	data: &[u8],
) -> Result<serde_json::Value, ContractError> {
	let types = inputs
		.iter()
		.map(|input| parameter_sol_type(&input.solidity_type, input.parameters.as_deref()))
		.collect::<Result<Vec<_>, _>>()?;

	if types.is_empty() {
		return Ok(serde_json::Value::Array(Vec::new()));
	}

	let decoded = DynSolType::Tuple(types.clone())
		.abi_decode_params(data)
		.map_err(|e| {
			ContractError::Decoding(format!("Failed to decode constructor params: {}", e))
		})?;

	match decoded {
		DynSolValue::Tuple(values) => Ok(typed_arguments_json(&types, &values)),
		other => Err(ContractError::Decoding(format!(
			"Unexpected constructor params: {:?}",
			other
		))),
	}
}

/// Renders raw constructor argument bytes of an unknown constructor as a
/// list of `bytes32` words.
pub fn raw_constructor_params(data: &[u8]) -> serde_json::Value {
	let (types, values): (Vec<_>, Vec<_>) = data
		.chunks(32)
		.map(|chunk| {
			(
				DynSolType::FixedBytes(32),
				DynSolValue::FixedBytes(B256::right_padding_from(chunk), 32),
			)
		})
		.unzip();

	typed_arguments_json(&types, &values)
}
