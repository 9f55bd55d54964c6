//! Contract decorators and the on-disk manifest formats they are built from.
//!
//! A decorator is the merged view of a compiled artifact (ABI and bytecode)
//! and a human-written manifest describing constructors, functions and events.
//! Interface manifests describe reusable sets of function and event
//! signatures a decorator can implement.

use crate::{Bytes, ContractId, ContractTag, InterfaceId};
use serde::{Deserialize, Serialize};

/// ABI parameter with its human description. Tuples carry their components
/// in `parameters`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractParameter {
	pub name: String,
	pub description: String,
	pub solidity_name: String,
	pub solidity_type: String,
	#[serde(default)]
	pub recommended_types: Vec<String>,
	#[serde(default)]
	pub parameters: Option<Vec<ContractParameter>>,
	#[serde(default)]
	pub hints: Option<Vec<serde_json::Value>>,
}

/// Event parameter; `indexed` parameters are carried in log topics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventParameter {
	pub name: String,
	pub description: String,
	pub indexed: bool,
	pub solidity_name: String,
	pub solidity_type: String,
	#[serde(default)]
	pub recommended_types: Vec<String>,
	#[serde(default)]
	pub parameters: Option<Vec<ContractParameter>>,
	#[serde(default)]
	pub hints: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractConstructor {
	pub inputs: Vec<ContractParameter>,
	pub description: String,
	pub payable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractFunction {
	pub name: String,
	pub description: String,
	pub solidity_name: String,
	pub signature: String,
	pub inputs: Vec<ContractParameter>,
	pub outputs: Vec<ContractParameter>,
	pub emittable_events: Vec<String>,
	pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractEvent {
	pub name: String,
	pub description: String,
	pub solidity_name: String,
	pub signature: String,
	pub inputs: Vec<EventParameter>,
}

/// Full description of a deployable or imported contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDecorator {
	pub id: ContractId,
	pub name: Option<String>,
	pub description: Option<String>,
	/// Creation bytecode, without constructor arguments.
	pub binary: Bytes,
	pub tags: Vec<ContractTag>,
	pub implements: Vec<InterfaceId>,
	pub constructors: Vec<ContractConstructor>,
	pub functions: Vec<ContractFunction>,
	pub events: Vec<ContractEvent>,
}

/// Hardhat style compilation artifact (`artifact.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactJson {
	#[serde(default)]
	pub contract_name: Option<String>,
	pub abi: alloy::json_abi::JsonAbi,
	pub bytecode: String,
	#[serde(default)]
	pub deployed_bytecode: Option<String>,
}

/// Human description of an ABI parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDecorator {
	pub name: String,
	pub description: String,
	#[serde(default)]
	pub recommended_types: Vec<String>,
	#[serde(default)]
	pub parameters: Option<Vec<TypeDecorator>>,
	#[serde(default)]
	pub hints: Option<Vec<serde_json::Value>>,
	/// Parameter name used when no artifact describes the item.
	#[serde(default)]
	pub solidity_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTypeDecorator {
	pub name: String,
	pub description: String,
	#[serde(default)]
	pub indexed: bool,
	#[serde(default)]
	pub recommended_types: Vec<String>,
	#[serde(default)]
	pub parameters: Option<Vec<TypeDecorator>>,
	#[serde(default)]
	pub hints: Option<Vec<serde_json::Value>>,
	#[serde(default)]
	pub solidity_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorDecorator {
	pub signature: String,
	pub description: String,
	#[serde(default)]
	pub parameter_decorators: Vec<TypeDecorator>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDecorator {
	pub signature: String,
	pub name: String,
	pub description: String,
	#[serde(default)]
	pub parameter_decorators: Vec<TypeDecorator>,
	#[serde(default)]
	pub return_decorators: Vec<TypeDecorator>,
	#[serde(default)]
	pub emittable_events: Vec<String>,
	#[serde(default)]
	pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDecorator {
	pub signature: String,
	pub name: String,
	pub description: String,
	#[serde(default)]
	pub parameter_decorators: Vec<EventTypeDecorator>,
}

/// Contract manifest (`manifest.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestJson {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default)]
	pub implements: Vec<String>,
	#[serde(default)]
	pub event_decorators: Vec<EventDecorator>,
	#[serde(default)]
	pub constructor_decorators: Vec<ConstructorDecorator>,
	#[serde(default)]
	pub function_decorators: Vec<FunctionDecorator>,
}

/// Interface manifest (`<interface-id>.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceManifestJson {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default)]
	pub event_decorators: Vec<EventDecorator>,
	#[serde(default)]
	pub function_decorators: Vec<FunctionDecorator>,
}

/// Interface manifest together with its id, as exposed over the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractInterface {
	pub id: InterfaceId,
	pub name: Option<String>,
	pub description: Option<String>,
	pub tags: Vec<String>,
	pub function_signatures: Vec<String>,
	pub event_signatures: Vec<String>,
}

/// Decorator synthesized for an imported contract, persisted per project.
///
/// The manifest it was built from is kept so that interface changes can
/// rebuild the decorator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedDecorator {
	pub project_id: crate::ProjectId,
	pub manifest: ManifestJson,
	pub decorator: ContractDecorator,
}

/// Writes Solidity tuple types the way the ABI hashes them:
/// `Event(tuple(address),uint256)` becomes `Event((address),uint256)`.
pub fn canonical_signature(signature: &str) -> String {
	signature.replace("tuple(", "(")
}
