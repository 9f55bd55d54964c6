//! Wiring of storage, chain access, the contract registry and the request
//! services into one engine shared by the HTTP layer.

use crate::projects::ProjectRegistry;
use crate::reconciler::StatusReconciler;
use crate::services::catalog::CatalogService;
use crate::services::deployment::DeploymentService;
use crate::services::function_call::FunctionCallService;
use crate::services::import::ImportService;
use crate::services::interfaces::InterfacesService;
use crate::services::lock::LockService;
use crate::services::multi_send::MultiSendService;
use crate::services::send::SendService;
use chainreq_chain::{AlloyChainReader, ChainReaderInterface, ChainReaderService};
use chainreq_config::Config;
use chainreq_contracts::ContractDecoderRegistry;
use chainreq_storage::{
	implementations, ImportedDecoratorStore, RequestStore, StorageInterface, StorageService,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Service error: {0}")]
	Service(String),
}

/// Every request service over one storage backend and chain reader.
pub struct RequestEngine {
	config: Config,
	projects: Arc<ProjectRegistry>,
	deployments: DeploymentService,
	function_calls: FunctionCallService,
	locks: LockService,
	sends: SendService,
	multi_sends: MultiSendService,
	imports: ImportService,
	interfaces: InterfacesService,
	catalog: CatalogService,
}

impl RequestEngine {
	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn projects(&self) -> &ProjectRegistry {
		&self.projects
	}

	pub fn deployments(&self) -> &DeploymentService {
		&self.deployments
	}

	pub fn function_calls(&self) -> &FunctionCallService {
		&self.function_calls
	}

	pub fn locks(&self) -> &LockService {
		&self.locks
	}

	pub fn sends(&self) -> &SendService {
		&self.sends
	}

	pub fn multi_sends(&self) -> &MultiSendService {
		&self.multi_sends
	}

	pub fn imports(&self) -> &ImportService {
		&self.imports
	}

	pub fn interfaces(&self) -> &InterfacesService {
		&self.interfaces
	}

	pub fn catalog(&self) -> &CatalogService {
		&self.catalog
	}
}

type StorageFactory = Box<dyn Fn(&toml::Value) -> Box<dyn StorageInterface> + Send>;

/// Builds a `RequestEngine` from configuration. Storage backends are picked by
/// name from the registered factories; `memory` and `file` are registered by
/// default.
pub struct EngineBuilder {
	config: Config,
	storage_factories: HashMap<String, StorageFactory>,
	chain_reader: Option<Box<dyn ChainReaderInterface>>,
}

impl EngineBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			storage_factories: HashMap::new(),
			chain_reader: None,
		}
		.with_storage_factory("memory", implementations::memory::create_storage)
		.with_storage_factory("file", implementations::file::create_storage)
	}

	pub fn with_storage_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Box<dyn StorageInterface> + Send + 'static,
	{
		self.storage_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	/// Replaces the alloy chain reader built from `[chains]`.
	pub fn with_chain_reader(mut self, reader: Box<dyn ChainReaderInterface>) -> Self {
		self.chain_reader = Some(reader);
		self
	}

	pub async fn build(self) -> Result<RequestEngine, EngineError> {
		let storage_config = &self.config.storage;
		let backend = self
			.storage_factories
			.get(&storage_config.backend)
			.ok_or_else(|| {
				EngineError::Config(format!(
					"Unknown storage backend: {}",
					storage_config.backend
				))
			})?(&storage_config.config);
		let storage = Arc::new(StorageService::new(backend));

		let chain_reader = self
			.chain_reader
			.unwrap_or_else(|| Box::new(AlloyChainReader::new(&self.config.chains)));
		let reconciler = Arc::new(StatusReconciler::new(Arc::new(ChainReaderService::new(
			chain_reader,
		))));

		let registry = Arc::new(
			ContractDecoderRegistry::load(
				&self.config.contracts,
				ImportedDecoratorStore::new(storage.clone()),
			)
			.await
			.map_err(|e| EngineError::Service(e.to_string()))?,
		);

		let projects = Arc::new(ProjectRegistry::new(&self.config.projects));
		tracing::info!(
			projects = projects.len(),
			backend = %storage_config.backend,
			"Built request engine"
		);

		Ok(RequestEngine {
			deployments: DeploymentService::new(
				RequestStore::new(storage.clone()),
				registry.clone(),
				reconciler.clone(),
				projects.clone(),
			),
			function_calls: FunctionCallService::new(
				RequestStore::new(storage.clone()),
				RequestStore::new(storage.clone()),
				registry.clone(),
				reconciler.clone(),
				projects.clone(),
			),
			locks: LockService::new(
				RequestStore::new(storage.clone()),
				reconciler.clone(),
				projects.clone(),
			),
			sends: SendService::new(
				RequestStore::new(storage.clone()),
				reconciler.clone(),
				projects.clone(),
			),
			multi_sends: MultiSendService::new(
				RequestStore::new(storage.clone()),
				reconciler.clone(),
				projects.clone(),
			),
			imports: ImportService::new(
				RequestStore::new(storage.clone()),
				registry.clone(),
				reconciler,
			),
			interfaces: InterfacesService::new(RequestStore::new(storage), registry.clone()),
			catalog: CatalogService::new(registry),
			projects,
			config: self.config,
		})
	}
}
