//! Interface matching for decorators and imported contracts.

use crate::encoding::function_selector;
use chainreq_types::api::SuggestedInterfacesResponse;
use chainreq_types::{ContractInterface, InterfaceId, InterfaceManifestJson, ManifestJson};
use std::collections::{BTreeMap, HashSet};

/// API view of an interface manifest.
pub fn contract_interface(id: &InterfaceId, manifest: &InterfaceManifestJson) -> ContractInterface {
	ContractInterface {
		id: id.clone(),
		name: manifest.name.clone(),
		description: manifest.description.clone(),
		tags: manifest.tags.clone(),
		function_signatures: manifest
			.function_decorators
			.iter()
			.map(|f| f.signature.clone())
			.collect(),
		event_signatures: manifest
			.event_decorators
			.iter()
			.map(|e| e.signature.clone())
			.collect(),
	}
}

/// Interface whose functions and events are all present in a contract.
#[derive(Debug, Clone)]
pub struct InterfaceMatch {
	pub interface: ContractInterface,
	/// Number of matching functions and events.
	pub matches: usize,
}

/// Returns the interfaces all of whose function and event signatures are
/// contained in the given signature sets, in interface id order.
pub fn partially_matching(
	interfaces: &BTreeMap<InterfaceId, InterfaceManifestJson>,
	function_signatures: &HashSet<String>,
	event_signatures: &HashSet<String>,
) -> Vec<InterfaceMatch> {
	interfaces
		.iter()
		.map(|(id, manifest)| contract_interface(id, manifest))
		.filter(|interface| {
			interface
				.function_signatures
				.iter()
				.all(|s| function_signatures.contains(s))
				&& interface
					.event_signatures
					.iter()
					.all(|s| event_signatures.contains(s))
		})
		.map(|interface| InterfaceMatch {
			matches: interface.function_signatures.len() + interface.event_signatures.len(),
			interface,
		})
		.collect()
}

/// Suggests interfaces for an imported contract.
///
/// Every partially matching interface that is not implemented yet is listed,
/// most matches first. The best matching set is picked greedily in that order,
/// taking an interface only if none of its functions were claimed by an
/// interface taken before it.
pub fn suggest(
	interfaces: &BTreeMap<InterfaceId, InterfaceManifestJson>,
	manifest: &ManifestJson,
) -> SuggestedInterfacesResponse {
	let function_signatures: HashSet<String> = manifest
		.function_decorators
		.iter()
		.map(|f| f.signature.clone())
		.collect();
	let event_signatures: HashSet<String> = manifest
		.event_decorators
		.iter()
		.map(|e| e.signature.clone())
		.collect();

	let mut candidates = partially_matching(interfaces, &function_signatures, &event_signatures);
	candidates.retain(|c| !manifest.implements.contains(&c.interface.id.0));
	candidates.sort_by(|a, b| b.matches.cmp(&a.matches));

	let best_matching_interfaces = take_without_overlaps(
		candidates.iter().filter(|c| c.matches > 0),
		function_signatures,
	);

	SuggestedInterfacesResponse {
		manifests: candidates.into_iter().map(|c| c.interface).collect(),
		best_matching_interfaces,
	}
}

fn take_without_overlaps<'a>(
	candidates: impl Iterator<Item = &'a InterfaceMatch>,
	mut remaining: HashSet<String>,
) -> Vec<InterfaceId> {
	let mut taken = Vec::new();

	for candidate in candidates {
		let signatures = &candidate.interface.function_signatures;
		if signatures.iter().all(|s| remaining.contains(s)) {
			for signature in signatures {
				remaining.remove(signature);
			}
			taken.push(candidate.interface.id.clone());
		}
	}

	taken
}

/// Selectors of the functions a manifest describes. Nameless entries carry
/// their selector as signature.
fn manifest_selectors(manifest: &ManifestJson) -> HashSet<[u8; 4]> {
	manifest
		.function_decorators
		.iter()
		.filter_map(|f| match f.signature.strip_prefix("0x") {
			Some(selector) if !f.signature.contains('(') => {
				let bytes = hex::decode(selector).ok()?;
				<[u8; 4]>::try_from(bytes.as_slice()).ok()
			}
			_ => Some(function_selector(&f.signature)),
		})
		.collect()
}

/// Whether every function of `interface` exists in the imported contract
/// described by `manifest`.
pub fn is_compatible(interface: &InterfaceManifestJson, manifest: &ManifestJson) -> bool {
	let selectors = manifest_selectors(manifest);
	interface
		.function_decorators
		.iter()
		.all(|f| selectors.contains(&function_selector(&f.signature)))
}
