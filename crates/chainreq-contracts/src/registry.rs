//! Registry of contract decorators and interfaces.
//!
//! Deployable decorators and interfaces are loaded once at start from the
//! configured directories:
//!
//! ```text
//! decorators_dir/<contract-id>/artifact.json
//! decorators_dir/<contract-id>/manifest.json
//! interfaces_dir/<interface-id>.json
//! ```
//!
//! Decorators synthesized on import live in storage, scoped to the project
//! that imported them.

use crate::builder::DecoratorBuilder;
use crate::interfaces::{self, contract_interface};
use crate::introspection::synthesize_manifest;
use crate::ContractError;
use chainreq_config::ContractsConfig;
use chainreq_storage::ImportedDecoratorStore;
use chainreq_types::api::SuggestedInterfacesResponse;
use chainreq_types::{
	ArtifactJson, Bytes, ContractDecorator, ContractDecoratorFilters, ContractId,
	ContractInterface, ImportedDecorator, InterfaceId, InterfaceManifestJson, ManifestJson,
	ProjectId,
};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

const ARTIFACT_FILE: &str = "artifact.json";
const MANIFEST_FILE: &str = "manifest.json";

/// Known contract decorators and interfaces.
pub struct ContractDecoderRegistry {
	decorators: BTreeMap<ContractId, ContractDecorator>,
	interfaces: BTreeMap<InterfaceId, InterfaceManifestJson>,
	imported: ImportedDecoratorStore,
}

impl ContractDecoderRegistry {
	/// Creates an empty registry.
	pub fn new(imported: ImportedDecoratorStore) -> Self {
		Self {
			decorators: BTreeMap::new(),
			interfaces: BTreeMap::new(),
			imported,
		}
	}

	/// Loads interfaces and decorators from the configured directories.
	/// Interfaces are loaded first so decorators can implement them.
	pub async fn load(
		config: &ContractsConfig,
		imported: ImportedDecoratorStore,
	) -> Result<Self, ContractError> {
		let mut registry = Self::new(imported);

		if let Some(dir) = &config.interfaces_dir {
			registry.load_interfaces(dir).await?;
		}
		if let Some(dir) = &config.decorators_dir {
			registry.load_decorators(dir).await?;
		}

		tracing::info!(
			decorators = registry.decorators.len(),
			interfaces = registry.interfaces.len(),
			"Loaded contract registry"
		);
		Ok(registry)
	}

	async fn load_interfaces(&mut self, dir: &Path) -> Result<(), ContractError> {
		let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
			ContractError::Io(format!("Failed to read {}: {}", dir.display(), e))
		})?;

		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| ContractError::Io(e.to_string()))?
		{
			let path = entry.path();
			if path.extension().and_then(|e| e.to_str()) != Some("json") {
				continue;
			}
			let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
				continue;
			};

			let manifest: InterfaceManifestJson = read_json(&path).await?;
			tracing::debug!(interface_id = %id, "Loaded contract interface");
			self.add_interface(InterfaceId::new(id), manifest);
		}

		Ok(())
	}

	async fn load_decorators(&mut self, dir: &Path) -> Result<(), ContractError> {
		let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
			ContractError::Io(format!("Failed to read {}: {}", dir.display(), e))
		})?;

		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| ContractError::Io(e.to_string()))?
		{
			let path = entry.path();
			let (artifact_path, manifest_path) = (path.join(ARTIFACT_FILE), path.join(MANIFEST_FILE));
			if !artifact_path.is_file() || !manifest_path.is_file() {
				tracing::warn!(path = %path.display(), "Skipping directory without artifact and manifest");
				continue;
			}
			let Some(id) = path.file_name().and_then(|s| s.to_str()) else {
				continue;
			};

			let artifact: ArtifactJson = read_json(&artifact_path).await?;
			let manifest: ManifestJson = read_json(&manifest_path).await?;
			self.add_decorator(ContractId::new(id), &artifact, &manifest)?;
			tracing::debug!(contract_id = %id, "Loaded contract decorator");
		}

		Ok(())
	}

	pub fn add_interface(&mut self, id: InterfaceId, manifest: InterfaceManifestJson) {
		self.interfaces.insert(id, manifest);
	}

	/// Builds and registers a deployable decorator.
	pub fn add_decorator(
		&mut self,
		id: ContractId,
		artifact: &ArtifactJson,
		manifest: &ManifestJson,
	) -> Result<(), ContractError> {
		let decorator = DecoratorBuilder::new(&self.interfaces).build(id.clone(), artifact, manifest)?;
		self.decorators.insert(id, decorator);
		Ok(())
	}

	pub fn get_decorator(&self, id: &ContractId) -> Option<ContractDecorator> {
		self.decorators.get(id).cloned()
	}

	/// Imported decorator together with the manifest it was built from.
	pub async fn get_imported(
		&self,
		id: &ContractId,
		project_id: &ProjectId,
	) -> Result<Option<ImportedDecorator>, ContractError> {
		Ok(self.imported.get(project_id, id).await?)
	}

	pub async fn get_imported_decorator(
		&self,
		id: &ContractId,
		project_id: &ProjectId,
	) -> Result<Option<ContractDecorator>, ContractError> {
		Ok(self
			.get_imported(id, project_id)
			.await?
			.map(|imported| imported.decorator))
	}

	/// Looks the decorator up among deployable contracts first, then among
	/// the project's imported ones.
	pub async fn resolve(
		&self,
		id: &ContractId,
		project_id: &ProjectId,
	) -> Result<Option<ContractDecorator>, ContractError> {
		match self.get_decorator(id) {
			Some(decorator) => Ok(Some(decorator)),
			None => self.get_imported_decorator(id, project_id).await,
		}
	}

	/// Deployable decorators matching the tag and interface filters.
	pub fn list(&self, filters: &ContractDecoratorFilters) -> Vec<ContractDecorator> {
		self.decorators
			.values()
			.filter(|d| {
				filters.contract_tags.matches_all_of_any(&d.tags)
					&& filters.contract_implements.matches_all_of_any(&d.implements)
			})
			.cloned()
			.collect()
	}

	pub fn get_interface(&self, id: &InterfaceId) -> Option<ContractInterface> {
		self.interfaces
			.get(id)
			.map(|manifest| contract_interface(id, manifest))
	}

	pub fn list_interfaces(&self) -> Vec<ContractInterface> {
		self.interfaces
			.iter()
			.map(|(id, manifest)| contract_interface(id, manifest))
			.collect()
	}

	/// Interfaces whose function and event signatures are all present in the
	/// decorator.
	pub fn matching_interfaces(&self, decorator: &ContractDecorator) -> Vec<ContractInterface> {
		let functions: HashSet<String> = decorator.functions.iter().map(|f| f.signature.clone()).collect();
		let events: HashSet<String> = decorator.events.iter().map(|e| e.signature.clone()).collect();

		interfaces::partially_matching(&self.interfaces, &functions, &events)
			.into_iter()
			.map(|m| m.interface)
			.collect()
	}

	/// Synthesizes the manifest of a contract imported without a decorator.
	pub fn synthesize_manifest(&self, runtime_code: &[u8]) -> ManifestJson {
		synthesize_manifest(runtime_code, &self.interfaces)
	}

	pub fn build_imported(
		&self,
		id: ContractId,
		binary: Bytes,
		manifest: &ManifestJson,
	) -> Result<ContractDecorator, ContractError> {
		DecoratorBuilder::new(&self.interfaces).build_imported(id, binary, manifest)
	}

	/// Rebuilds an imported decorator with a new set of implemented
	/// interfaces. Every interface must exist and be compatible with the
	/// contract.
	pub fn rebuild_imported(
		&self,
		imported: &ImportedDecorator,
		implements: Vec<InterfaceId>,
	) -> Result<ImportedDecorator, ContractError> {
		for id in &implements {
			let interface = self
				.interfaces
				.get(id)
				.ok_or_else(|| ContractError::InterfaceNotFound(id.to_string()))?;

			if !interfaces::is_compatible(interface, &imported.manifest) {
				return Err(ContractError::Incompatible(format!(
					"Contract {} does not implement interface {}",
					imported.decorator.id, id
				)));
			}
		}

		let manifest = ManifestJson {
			implements: implements.iter().map(ToString::to_string).collect(),
			..imported.manifest.clone()
		};
		let decorator = self.build_imported(
			imported.decorator.id.clone(),
			imported.decorator.binary.clone(),
			&manifest,
		)?;

		Ok(ImportedDecorator {
			project_id: imported.project_id,
			manifest,
			decorator,
		})
	}

	pub async fn store_imported(&self, imported: &ImportedDecorator) -> Result<(), ContractError> {
		Ok(self.imported.store(imported).await?)
	}

	pub fn suggest_interfaces(&self, manifest: &ManifestJson) -> SuggestedInterfacesResponse {
		interfaces::suggest(&self.interfaces, manifest)
	}
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ContractError> {
	let content = tokio::fs::read_to_string(path)
		.await
		.map_err(|e| ContractError::Io(format!("Failed to read {}: {}", path.display(), e)))?;

	serde_json::from_str(&content).map_err(|e| {
		ContractError::InvalidDecorator(format!("Failed to parse {}: {}", path.display(), e))
	})
}
