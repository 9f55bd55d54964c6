//! Decorator synthesis from runtime bytecode.
//!
//! Solidity dispatchers compare the call selector against `PUSH4` constants
//! and emit events with their topic pushed by `PUSH32`. Scanning the code for
//! those operands gives the selectors and topics a contract knows about,
//! which are then matched against the known interfaces.

use crate::encoding::{event_topic, function_selector};
use chainreq_types::{
	EventDecorator, FunctionDecorator, InterfaceId, InterfaceManifestJson, ManifestJson, B256,
};
use std::collections::{BTreeMap, BTreeSet, HashSet};

const PUSH1: u8 = 0x60;
const PUSH4: u8 = 0x63;
const PUSH32: u8 = 0x7f;

/// Function selectors and event topics found in runtime code.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BytecodeSymbols {
	pub selectors: BTreeSet<[u8; 4]>,
	pub topics: HashSet<B256>,
}

/// Collects `PUSH4` and `PUSH32` operands, skipping the immediate data of
/// every other push.
pub fn scan_bytecode(code: &[u8]) -> BytecodeSymbols {
	let mut symbols = BytecodeSymbols::default();
	let mut position = 0;

	while position < code.len() {
		let opcode = code[position];
		if !(PUSH1..=PUSH32).contains(&opcode) {
			position += 1;
			continue;
		}

		let start = position + 1;
		let end = start + usize::from(opcode - PUSH1 + 1);
		if end > code.len() {
			break;
		}

		match opcode {
			PUSH4 => {
				let mut selector = [0u8; 4];
				selector.copy_from_slice(&code[start..end]);
				symbols.selectors.insert(selector);
			}
			PUSH32 => {
				symbols.topics.insert(B256::from_slice(&code[start..end]));
			}
			_ => {}
		}
		position = end;
	}

	symbols
}

fn nameless_function(selector: &[u8; 4]) -> FunctionDecorator {
	FunctionDecorator {
		signature: format!("0x{}", hex::encode(selector)),
		name: String::new(),
		description: String::new(),
		parameter_decorators: Vec::new(),
		return_decorators: Vec::new(),
		emittable_events: Vec::new(),
		read_only: false,
	}
}

/// Synthesizes the manifest of a contract imported without a decorator.
///
/// Interface functions and events found in the code are included with their
/// full description; remaining selectors become nameless entries. Interfaces
/// whose functions and events were all found are listed as implemented.
pub fn synthesize_manifest(
	runtime_code: &[u8],
	interfaces: &BTreeMap<InterfaceId, InterfaceManifestJson>,
) -> ManifestJson {
	let symbols = scan_bytecode(runtime_code);

	let mut functions: Vec<FunctionDecorator> = Vec::new();
	let mut events: Vec<EventDecorator> = Vec::new();
	let mut covered: HashSet<[u8; 4]> = HashSet::new();
	let mut implements = Vec::new();

	for (id, interface) in interfaces {
		let mut complete = !interface.function_decorators.is_empty();

		for function in &interface.function_decorators {
			let selector = function_selector(&function.signature);
			if !symbols.selectors.contains(&selector) {
				complete = false;
				continue;
			}
			if covered.insert(selector) {
				functions.push(function.clone());
			}
		}

		for event in &interface.event_decorators {
			if !symbols.topics.contains(&event_topic(&event.signature)) {
				complete = false;
				continue;
			}
			if !events.iter().any(|e| e.signature == event.signature) {
				events.push(event.clone());
			}
		}

		if complete {
			implements.push(id.to_string());
		}
	}

	functions.extend(
		symbols
			.selectors
			.iter()
			.filter(|selector| !covered.contains(*selector))
			.map(nameless_function),
	);

	tracing::debug!(
		selectors = symbols.selectors.len(),
		topics = symbols.topics.len(),
		implements = ?implements,
		"Synthesized manifest from bytecode"
	);

	ManifestJson {
		name: None,
		description: None,
		tags: Vec::new(),
		implements,
		event_decorators: events,
		constructor_decorators: Vec::new(),
		function_decorators: functions,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn push4(selector: [u8; 4]) -> Vec<u8> {
		let mut code = vec![PUSH4];
		code.extend(selector);
		code
	}

	fn push32(word: B256) -> Vec<u8> {
		let mut code = vec![PUSH32];
		code.extend(word.as_slice());
		code
	}

	fn erc20_like() -> BTreeMap<InterfaceId, InterfaceManifestJson> {
		let manifest: InterfaceManifestJson = serde_json::from_value(json!({
			"name": "Transfers",
			"functionDecorators": [
				{ "signature": "transfer(address,uint256)", "name": "Transfer", "description": "" },
				{ "signature": "balanceOf(address)", "name": "Balance", "description": "" }
			],
			"eventDecorators": [
				{ "signature": "Transfer(address,address,uint256)", "name": "Transfer", "description": "" }
			]
		}))
		.unwrap();

		let mut interfaces = BTreeMap::new();
		interfaces.insert(InterfaceId::new("example.transfers"), manifest);
		interfaces
	}

	#[test]
	fn test_scan_skips_push_data() {
		// PUSH2 whose data looks like a PUSH4 opcode must not be read as one
		let mut code = vec![0x61, PUSH4, 0x00];
		code.extend(push4([0xa9, 0x05, 0x9c, 0xbb]));
		code.push(0x14);
		code.extend(push32(B256::repeat_byte(0x11)));

		let symbols = scan_bytecode(&code);
		assert_eq!(
			symbols.selectors.into_iter().collect::<Vec<_>>(),
			vec![[0xa9, 0x05, 0x9c, 0xbb]]
		);
		assert!(symbols.topics.contains(&B256::repeat_byte(0x11)));
	}

	#[test]
	fn test_scan_truncated_push() {
		let symbols = scan_bytecode(&[PUSH4, 0x01, 0x02]);
		assert!(symbols.selectors.is_empty());
	}

	#[test]
	fn test_synthesize_full_match() {
		let mut code = Vec::new();
		code.extend(push4(function_selector("transfer(address,uint256)")));
		code.extend(push4(function_selector("balanceOf(address)")));
		code.extend(push4([0xde, 0xad, 0xbe, 0xef]));
		code.extend(push32(event_topic("Transfer(address,address,uint256)")));

		let manifest = synthesize_manifest(&code, &erc20_like());

		assert_eq!(manifest.implements, vec!["example.transfers".to_string()]);
		let signatures: Vec<_> = manifest
			.function_decorators
			.iter()
			.map(|f| f.signature.as_str())
			.collect();
		assert_eq!(
			signatures,
			vec!["transfer(address,uint256)", "balanceOf(address)", "0xdeadbeef"]
		);
		assert_eq!(manifest.event_decorators.len(), 1);
	}

	#[test]
	fn test_synthesize_partial_match() {
		let code = push4(function_selector("transfer(address,uint256)"));

		let manifest = synthesize_manifest(&code, &erc20_like());

		assert!(manifest.implements.is_empty());
		assert_eq!(manifest.function_decorators.len(), 1);
		assert_eq!(manifest.function_decorators[0].name, "Transfer");
		assert!(manifest.event_decorators.is_empty());
	}
}
