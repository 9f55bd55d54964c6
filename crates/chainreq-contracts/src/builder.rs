//! Builds contract decorators from artifacts, manifests and interfaces.
//!
//! Functions and events of a decorator are the manifest items followed by the
//! items of every implemented interface (interface items first for imported
//! contracts), deduplicated by signature. Items are matched to the artifact
//! ABI by signature; tuple parameters are written `tuple(...)` followed by
//! their array suffix, as in `batch(tuple(uint256,address)[])`.
//!
//! Imported contracts have no artifact. Their items take parameter types from
//! the signature itself, and entries without a known signature are kept
//! nameless under their selector.

use crate::encoding::function_selector;
use crate::params::split_top_level;
use crate::ContractError;
use alloy::json_abi::{EventParam, JsonAbi, Param, StateMutability};
use chainreq_types::{
	ArtifactJson, Bytes, ContractConstructor, ContractDecorator, ContractEvent, ContractFunction,
	ContractId, ContractParameter, ContractTag, EventDecorator, EventParameter, EventTypeDecorator,
	FunctionDecorator, InterfaceId, InterfaceManifestJson, ManifestJson, TypeDecorator,
};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Parameter shape shared by artifact ABI entries and signature types.
#[derive(Debug, Clone)]
struct AbiParam {
	name: String,
	ty: String,
	indexed: bool,
	components: Vec<AbiParam>,
}

impl AbiParam {
	fn from_param(param: &Param) -> Self {
		Self {
			name: param.name.clone(),
			ty: param.ty.clone(),
			indexed: false,
			components: param.components.iter().map(Self::from_param).collect(),
		}
	}

	fn from_event_param(param: &EventParam) -> Self {
		Self {
			name: param.name.clone(),
			ty: param.ty.clone(),
			indexed: param.indexed,
			components: param.components.iter().map(Self::from_param).collect(),
		}
	}

	/// Parses a signature type such as `tuple(address,uint256)[]`.
	fn from_signature_type(ty: &str) -> Result<Self, ContractError> {
		let ty = ty.trim();
		let open = if ty.starts_with("tuple(") {
			Some(5)
		} else if ty.starts_with('(') {
			Some(0)
		} else {
			None
		};

		let Some(open) = open else {
			return Ok(Self {
				name: String::new(),
				ty: ty.to_string(),
				indexed: false,
				components: Vec::new(),
			});
		};

		let close = matching_paren(ty, open)
			.ok_or_else(|| ContractError::InvalidDecorator(format!("Unbalanced type: {}", ty)))?;
		let components = split_top_level(&ty[open + 1..close])
			.into_iter()
			.map(Self::from_signature_type)
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self {
			name: String::new(),
			ty: format!("tuple{}", &ty[close + 1..]),
			indexed: false,
			components,
		})
	}

	fn signature_type(&self) -> String {
		match self.ty.strip_prefix("tuple") {
			Some(suffix) => format!("tuple({}){}", type_list(&self.components), suffix),
			None => self.ty.clone(),
		}
	}
}

fn matching_paren(value: &str, open: usize) -> Option<usize> {
	let mut depth = 0usize;
	for (index, c) in value.char_indices().skip(open) {
		match c {
			'(' => depth += 1,
			')' => {
				depth -= 1;
				if depth == 0 {
					return Some(index);
				}
			}
			_ => {}
		}
	}
	None
}

fn type_list(params: &[AbiParam]) -> String {
	params
		.iter()
		.map(AbiParam::signature_type)
		.collect::<Vec<_>>()
		.join(",")
}

fn signature_params(signature: &str) -> Result<(String, Vec<AbiParam>), ContractError> {
	let (name, types) = crate::params::split_signature(signature)?;
	let params = types
		.into_iter()
		.map(AbiParam::from_signature_type)
		.collect::<Result<Vec<_>, _>>()?;
	Ok((name.to_string(), params))
}

/// Whether the signature names a function or event, as opposed to a bare
/// selector of an imported contract.
fn is_named(signature: &str) -> bool {
	signature.contains('(')
}

fn dedup_by_signature<'a, T>(items: Vec<&'a T>, signature: impl Fn(&T) -> &str) -> Vec<&'a T> {
	let mut seen = HashSet::new();
	items
		.into_iter()
		.filter(|item| seen.insert(signature(item).to_string()))
		.collect()
}

/// Builds decorators against a fixed set of interface manifests.
pub struct DecoratorBuilder<'a> {
	interfaces: &'a BTreeMap<InterfaceId, InterfaceManifestJson>,
}

impl<'a> DecoratorBuilder<'a> {
	pub fn new(interfaces: &'a BTreeMap<InterfaceId, InterfaceManifestJson>) -> Self {
		Self { interfaces }
	}

	/// Builds the decorator of a deployable contract.
	pub fn build(
		&self,
		id: ContractId,
		artifact: &ArtifactJson,
		manifest: &ManifestJson,
	) -> Result<ContractDecorator, ContractError> {
		let binary = artifact.bytecode.parse::<Bytes>().map_err(|e| {
			ContractError::InvalidDecorator(format!("Invalid bytecode for {}: {}", id, e))
		})?;

		self.decorate(id, binary, Some(&artifact.abi), manifest, false)
	}

	/// Builds the decorator of an imported contract from its synthesized
	/// manifest.
	pub fn build_imported(
		&self,
		id: ContractId,
		binary: Bytes,
		manifest: &ManifestJson,
	) -> Result<ContractDecorator, ContractError> {
		self.decorate(id, binary, None, manifest, true)
	}

	fn decorate(
		&self,
		id: ContractId,
		binary: Bytes,
		abi: Option<&JsonAbi>,
		manifest: &ManifestJson,
		imported: bool,
	) -> Result<ContractDecorator, ContractError> {
		let interfaces = manifest
			.implements
			.iter()
			.map(|interface_id| {
				self.interfaces
					.get(&InterfaceId::new(interface_id.as_str()))
					.ok_or_else(|| ContractError::InterfaceNotFound(interface_id.clone()))
			})
			.collect::<Result<Vec<_>, _>>()?;

		let mut tags: Vec<ContractTag> = Vec::new();
		for tag in manifest
			.tags
			.iter()
			.chain(interfaces.iter().flat_map(|i| i.tags.iter()))
		{
			let tag = ContractTag::new(tag.as_str());
			if !tags.contains(&tag) {
				tags.push(tag);
			}
		}

		let interface_functions = interfaces.iter().flat_map(|i| i.function_decorators.iter());
		let interface_events = interfaces.iter().flat_map(|i| i.event_decorators.iter());
		let (function_decorators, event_decorators): (Vec<_>, Vec<_>) = if imported {
			(
				interface_functions
					.chain(manifest.function_decorators.iter())
					.collect(),
				interface_events.chain(manifest.event_decorators.iter()).collect(),
			)
		} else {
			(
				manifest
					.function_decorators
					.iter()
					.chain(interface_functions)
					.collect(),
				manifest.event_decorators.iter().chain(interface_events).collect(),
			)
		};

		let function_decorators = dedup_by_signature(function_decorators, |f| f.signature.as_str());
		let event_decorators = dedup_by_signature(event_decorators, |e| e.signature.as_str());

		let (constructors, functions, events) = match abi {
			Some(abi) => (
				artifact_constructors(abi, manifest)?,
				artifact_functions(abi, &function_decorators)?,
				artifact_events(abi, &event_decorators)?,
			),
			None => (
				signature_constructors(manifest)?,
				signature_functions(&function_decorators)?,
				signature_events(&event_decorators)?,
			),
		};

		Ok(ContractDecorator {
			id,
			name: manifest.name.clone(),
			description: manifest.description.clone(),
			binary,
			tags,
			implements: manifest
				.implements
				.iter()
				.map(|i| InterfaceId::new(i.as_str()))
				.collect(),
			constructors,
			functions,
			events,
		})
	}
}

fn artifact_constructors(
	abi: &JsonAbi,
	manifest: &ManifestJson,
) -> Result<Vec<ContractConstructor>, ContractError> {
	let constructor = abi.constructor.as_ref().map(|c| {
		let inputs: Vec<AbiParam> = c.inputs.iter().map(AbiParam::from_param).collect();
		(
			format!("constructor({})", type_list(&inputs)),
			inputs,
			c.state_mutability == StateMutability::Payable,
		)
	});

	manifest
		.constructor_decorators
		.iter()
		.map(|decorator| match &constructor {
			Some((signature, inputs, payable)) if *signature == decorator.signature => {
				Ok(ContractConstructor {
					inputs: contract_parameters(&decorator.parameter_decorators, inputs),
					description: decorator.description.clone(),
					payable: *payable,
				})
			}
			_ => Err(ContractError::InvalidDecorator(format!(
				"Decorator signature {} not found in artifact",
				decorator.signature
			))),
		})
		.collect()
}

fn artifact_functions(
	abi: &JsonAbi,
	decorators: &[&FunctionDecorator],
) -> Result<Vec<ContractFunction>, ContractError> {
	let functions: HashMap<String, _> = abi
		.functions()
		.map(|f| {
			let inputs: Vec<AbiParam> = f.inputs.iter().map(AbiParam::from_param).collect();
			(format!("{}({})", f.name, type_list(&inputs)), (f, inputs))
		})
		.collect();

	decorators
		.iter()
		.map(|decorator| {
			let (function, inputs) = functions.get(&decorator.signature).ok_or_else(|| {
				ContractError::InvalidDecorator(format!(
					"Decorator signature {} not found in artifact",
					decorator.signature
				))
			})?;
			let outputs: Vec<AbiParam> = function.outputs.iter().map(AbiParam::from_param).collect();

			Ok(ContractFunction {
				name: decorator.name.clone(),
				description: decorator.description.clone(),
				solidity_name: function.name.clone(),
				signature: decorator.signature.clone(),
				inputs: contract_parameters(&decorator.parameter_decorators, inputs),
				outputs: contract_parameters(&decorator.return_decorators, &outputs),
				emittable_events: decorator.emittable_events.clone(),
				read_only: decorator.read_only
					|| matches!(
						function.state_mutability,
						StateMutability::View | StateMutability::Pure
					),
			})
		})
		.collect()
}

fn artifact_events(
	abi: &JsonAbi,
	decorators: &[&EventDecorator],
) -> Result<Vec<ContractEvent>, ContractError> {
	let events: HashMap<String, _> = abi
		.events()
		.map(|e| {
			let inputs: Vec<AbiParam> = e.inputs.iter().map(AbiParam::from_event_param).collect();
			(format!("{}({})", e.name, type_list(&inputs)), (e, inputs))
		})
		.collect();

	Ok(decorators
		.iter()
		.filter_map(|decorator| {
			let Some((event, inputs)) = events.get(&decorator.signature) else {
				tracing::debug!(signature = %decorator.signature, "Event not in artifact, dropping");
				return None;
			};

			Some(ContractEvent {
				name: decorator.name.clone(),
				description: decorator.description.clone(),
				solidity_name: event.name.clone(),
				signature: decorator.signature.clone(),
				inputs: event_parameters(&decorator.parameter_decorators, inputs),
			})
		})
		.collect())
}

fn signature_constructors(manifest: &ManifestJson) -> Result<Vec<ContractConstructor>, ContractError> {
	manifest
		.constructor_decorators
		.iter()
		.map(|decorator| {
			let (_, inputs) = signature_params(&decorator.signature)?;
			Ok(ContractConstructor {
				inputs: contract_parameters(&decorator.parameter_decorators, &inputs),
				description: decorator.description.clone(),
				payable: false,
			})
		})
		.collect()
}

fn signature_functions(decorators: &[&FunctionDecorator]) -> Result<Vec<ContractFunction>, ContractError> {
	let named_selectors: HashSet<String> = decorators
		.iter()
		.filter(|d| is_named(&d.signature))
		.map(|d| format!("0x{}", hex::encode(function_selector(&d.signature))))
		.collect();

	let mut functions = Vec::with_capacity(decorators.len());
	for decorator in decorators {
		if !is_named(&decorator.signature) {
			if named_selectors.contains(&decorator.signature.to_lowercase()) {
				continue;
			}
			functions.push(ContractFunction {
				name: decorator.name.clone(),
				description: decorator.description.clone(),
				solidity_name: String::new(),
				signature: decorator.signature.clone(),
				inputs: Vec::new(),
				outputs: Vec::new(),
				emittable_events: decorator.emittable_events.clone(),
				read_only: decorator.read_only,
			});
			continue;
		}

		let (solidity_name, inputs) = signature_params(&decorator.signature)?;
		functions.push(ContractFunction {
			name: decorator.name.clone(),
			description: decorator.description.clone(),
			solidity_name,
			signature: decorator.signature.clone(),
			inputs: contract_parameters(&decorator.parameter_decorators, &inputs),
			outputs: Vec::new(),
			emittable_events: decorator.emittable_events.clone(),
			read_only: decorator.read_only,
		});
	}

	Ok(functions)
}

fn signature_events(decorators: &[&EventDecorator]) -> Result<Vec<ContractEvent>, ContractError> {
	decorators
		.iter()
		.filter(|d| is_named(&d.signature))
		.map(|decorator| {
			let (solidity_name, mut inputs) = signature_params(&decorator.signature)?;
			for (input, parameter) in inputs.iter_mut().zip(&decorator.parameter_decorators) {
				input.indexed = parameter.indexed;
			}

			Ok(ContractEvent {
				name: decorator.name.clone(),
				description: decorator.description.clone(),
				solidity_name,
				signature: decorator.signature.clone(),
				inputs: event_parameters(&decorator.parameter_decorators, &inputs),
			})
		})
		.collect()
}

fn contract_parameters(decorators: &[TypeDecorator], params: &[AbiParam]) -> Vec<ContractParameter> {
	params
		.iter()
		.enumerate()
		.map(|(index, param)| contract_parameter(decorators.get(index), param))
		.collect()
}

fn tuple_components(
	decorators: Option<&Vec<TypeDecorator>>,
	param: &AbiParam,
) -> Option<Vec<ContractParameter>> {
	param
		.ty
		.starts_with("tuple")
		.then(|| contract_parameters(decorators.map(Vec::as_slice).unwrap_or(&[]), &param.components))
}

fn contract_parameter(decorator: Option<&TypeDecorator>, param: &AbiParam) -> ContractParameter {
	ContractParameter {
		name: decorator.map_or_else(|| param.name.clone(), |d| d.name.clone()),
		description: decorator.map(|d| d.description.clone()).unwrap_or_default(),
		solidity_name: decorator
			.and_then(|d| d.solidity_name.clone())
			.filter(|_| param.name.is_empty())
			.unwrap_or_else(|| param.name.clone()),
		solidity_type: param.ty.clone(),
		recommended_types: decorator
			.map(|d| d.recommended_types.clone())
			.unwrap_or_default(),
		parameters: tuple_components(decorator.and_then(|d| d.parameters.as_ref()), param),
		hints: decorator.and_then(|d| d.hints.clone()),
	}
}

fn event_parameters(decorators: &[EventTypeDecorator], params: &[AbiParam]) -> Vec<EventParameter> {
	params
		.iter()
		.enumerate()
		.map(|(index, param)| {
			let decorator = decorators.get(index);
			EventParameter {
				name: decorator.map_or_else(|| param.name.clone(), |d| d.name.clone()),
				description: decorator.map(|d| d.description.clone()).unwrap_or_default(),
				indexed: param.indexed,
				solidity_name: decorator
					.and_then(|d| d.solidity_name.clone())
					.filter(|_| param.name.is_empty())
					.unwrap_or_else(|| param.name.clone()),
				solidity_type: param.ty.clone(),
				recommended_types: decorator
					.map(|d| d.recommended_types.clone())
					.unwrap_or_default(),
				parameters: tuple_components(decorator.and_then(|d| d.parameters.as_ref()), param),
				hints: decorator.and_then(|d| d.hints.clone()),
			}
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn artifact() -> ArtifactJson {
		serde_json::from_value(json!({
			"contractName": "ExampleContract",
			"bytecode": "0x6080",
			"abi": [
				{
					"type": "constructor",
					"stateMutability": "payable",
					"inputs": [{ "name": "owner", "type": "address", "internalType": "address" }]
				},
				{
					"type": "function",
					"name": "getOwner",
					"stateMutability": "view",
					"inputs": [],
					"outputs": [{ "name": "", "type": "address", "internalType": "address" }]
				},
				{
					"type": "function",
					"name": "transfer",
					"stateMutability": "nonpayable",
					"inputs": [
						{ "name": "to", "type": "address", "internalType": "address" },
						{ "name": "amount", "type": "uint256", "internalType": "uint256" }
					],
					"outputs": [{ "name": "", "type": "bool", "internalType": "bool" }]
				},
				{
					"type": "function",
					"name": "batch",
					"stateMutability": "nonpayable",
					"inputs": [{
						"name": "items",
						"type": "tuple[]",
						"internalType": "struct Item[]",
						"components": [
							{ "name": "id", "type": "uint256", "internalType": "uint256" },
							{ "name": "flag", "type": "bool", "internalType": "bool" }
						]
					}],
					"outputs": []
				},
				{
					"type": "event",
					"name": "Transfer",
					"anonymous": false,
					"inputs": [
						{ "name": "from", "type": "address", "indexed": true, "internalType": "address" },
						{ "name": "to", "type": "address", "indexed": true, "internalType": "address" },
						{ "name": "value", "type": "uint256", "indexed": false, "internalType": "uint256" }
					]
				}
			]
		}))
		.unwrap()
	}

	fn interfaces() -> BTreeMap<InterfaceId, InterfaceManifestJson> {
		let transferable: InterfaceManifestJson = serde_json::from_value(json!({
			"name": "Transferable",
			"tags": ["tokens"],
			"functionDecorators": [{
				"signature": "transfer(address,uint256)",
				"name": "Transfer",
				"description": "Transfers tokens",
				"parameterDecorators": [
					{ "name": "Recipient", "description": "Receiver" },
					{ "name": "Amount", "description": "Amount to send" }
				]
			}],
			"eventDecorators": [{
				"signature": "Transfer(address,address,uint256)",
				"name": "Transfer",
				"description": "Tokens moved",
				"parameterDecorators": [
					{ "name": "From", "description": "", "indexed": true },
					{ "name": "To", "description": "", "indexed": true },
					{ "name": "Value", "description": "" }
				]
			}]
		}))
		.unwrap();

		let mut interfaces = BTreeMap::new();
		interfaces.insert(InterfaceId::new("example.transferable"), transferable);
		interfaces
	}

	fn manifest() -> ManifestJson {
		serde_json::from_value(json!({
			"name": "Example",
			"description": "Example contract",
			"tags": ["example", "tokens"],
			"implements": ["example.transferable"],
			"constructorDecorators": [{
				"signature": "constructor(address)",
				"description": "Main constructor",
				"parameterDecorators": [{ "name": "Owner", "description": "Contract owner" }]
			}],
			"functionDecorators": [
				{ "signature": "getOwner()", "name": "Get owner", "description": "Returns the owner" },
				{
					"signature": "batch(tuple(uint256,bool)[])",
					"name": "Batch",
					"description": "Processes items",
					"parameterDecorators": [{
						"name": "Items",
						"description": "Items",
						"parameters": [
							{ "name": "Id", "description": "Item id" },
							{ "name": "Flag", "description": "Item flag" }
						]
					}]
				}
			]
		}))
		.unwrap()
	}

	#[test]
	fn test_build_from_artifact() {
		let interfaces = interfaces();
		let decorator = DecoratorBuilder::new(&interfaces)
			.build(ContractId::new("examples.exampleContract"), &artifact(), &manifest())
			.unwrap();

		assert_eq!(decorator.binary, Bytes::from(vec![0x60, 0x80]));
		assert_eq!(
			decorator.tags,
			vec![ContractTag::new("example"), ContractTag::new("tokens")]
		);
		assert_eq!(decorator.implements, vec![InterfaceId::new("example.transferable")]);

		assert_eq!(decorator.constructors.len(), 1);
		assert!(decorator.constructors[0].payable);
		assert_eq!(decorator.constructors[0].inputs[0].name, "Owner");
		assert_eq!(decorator.constructors[0].inputs[0].solidity_name, "owner");

		let signatures: Vec<_> = decorator.functions.iter().map(|f| f.signature.as_str()).collect();
		assert_eq!(
			signatures,
			vec!["getOwner()", "batch(tuple(uint256,bool)[])", "transfer(address,uint256)"]
		);
		assert!(decorator.functions[0].read_only);
		assert!(!decorator.functions[2].read_only);
		assert_eq!(decorator.functions[2].inputs[1].name, "Amount");

		let batch = &decorator.functions[1].inputs[0];
		assert_eq!(batch.solidity_type, "tuple[]");
		let components = batch.parameters.as_ref().unwrap();
		assert_eq!(components[1].name, "Flag");
		assert_eq!(components[1].solidity_type, "bool");

		assert_eq!(decorator.events.len(), 1);
		assert!(decorator.events[0].inputs[0].indexed);
		assert!(!decorator.events[0].inputs[2].indexed);
	}

	#[test]
	fn test_unknown_interface_is_rejected() {
		let interfaces = BTreeMap::new();
		let result = DecoratorBuilder::new(&interfaces).build(
			ContractId::new("examples.exampleContract"),
			&artifact(),
			&manifest(),
		);
		assert!(matches!(result, Err(ContractError::InterfaceNotFound(_))));
	}

	#[test]
	fn test_function_missing_from_artifact_is_rejected() {
		let interfaces = interfaces();
		let mut manifest = manifest();
		manifest.function_decorators.push(FunctionDecorator {
			signature: "missing(uint256)".to_string(),
			name: "Missing".to_string(),
			description: String::new(),
			parameter_decorators: vec![],
			return_decorators: vec![],
			emittable_events: vec![],
			read_only: false,
		});

		let result = DecoratorBuilder::new(&interfaces).build(
			ContractId::new("examples.exampleContract"),
			&artifact(),
			&manifest,
		);
		assert!(matches!(result, Err(ContractError::InvalidDecorator(_))));
	}

	#[test]
	fn test_missing_events_are_dropped() {
		let interfaces = interfaces();
		let mut manifest = manifest();
		manifest.event_decorators.push(EventDecorator {
			signature: "Missing(uint256)".to_string(),
			name: "Missing".to_string(),
			description: String::new(),
			parameter_decorators: vec![],
		});

		let decorator = DecoratorBuilder::new(&interfaces)
			.build(ContractId::new("examples.exampleContract"), &artifact(), &manifest)
			.unwrap();
		assert_eq!(decorator.events.len(), 1);
	}

	#[test]
	fn test_build_imported_from_signatures() {
		let interfaces = interfaces();
		let manifest = ManifestJson {
			implements: vec!["example.transferable".to_string()],
			function_decorators: vec![
				FunctionDecorator {
					signature: "0xa9059cbb".to_string(),
					name: String::new(),
					description: String::new(),
					parameter_decorators: vec![],
					return_decorators: vec![],
					emittable_events: vec![],
					read_only: false,
				},
				FunctionDecorator {
					signature: "0x12345678".to_string(),
					name: String::new(),
					description: String::new(),
					parameter_decorators: vec![],
					return_decorators: vec![],
					emittable_events: vec![],
					read_only: false,
				},
			],
			..ManifestJson::default()
		};

		let decorator = DecoratorBuilder::new(&interfaces)
			.build_imported(
				ContractId::new("imported-0x0a-1"),
				Bytes::from(vec![0x60]),
				&manifest,
			)
			.unwrap();

		let signatures: Vec<_> = decorator.functions.iter().map(|f| f.signature.as_str()).collect();
		assert_eq!(signatures, vec!["transfer(address,uint256)", "0x12345678"]);
		assert_eq!(decorator.functions[0].solidity_name, "transfer");
		assert_eq!(decorator.functions[0].inputs[0].solidity_type, "address");
		assert_eq!(decorator.functions[0].inputs[0].name, "Recipient");
		assert_eq!(decorator.tags, vec![ContractTag::new("tokens")]);

		assert_eq!(decorator.events.len(), 1);
		assert!(decorator.events[0].inputs[1].indexed);
		assert!(!decorator.events[0].inputs[2].indexed);
	}

	#[test]
	fn test_signature_types_with_tuples() {
		let (name, params) = signature_params("batch(tuple(uint256,(bool,address))[],bytes)").unwrap();
		assert_eq!(name, "batch");
		assert_eq!(params[0].ty, "tuple[]");
		assert_eq!(params[0].components[1].ty, "tuple");
		assert_eq!(params[0].components[1].components[1].ty, "address");
		assert_eq!(
			type_list(&params),
			"tuple(uint256,tuple(bool,address))[],bytes"
		);
	}
}
