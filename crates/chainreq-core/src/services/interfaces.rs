//! Interfaces of imported contracts.
//!
//! Interface edits rebuild the project's imported decorator from its stored
//! manifest and mirror the resulting implements and tags onto the deployment
//! request.

use chainreq_contracts::ContractDecoderRegistry;
use chainreq_storage::RequestStore;
use chainreq_types::api::{ImportedContractInterfacesRequest, SuggestedInterfacesResponse};
use chainreq_types::{
	ApiError, ContractDeploymentRequest, ImportedDecorator, InterfaceId, Project, RequestId,
};
use std::sync::Arc;

pub struct InterfacesService {
	store: RequestStore<ContractDeploymentRequest>,
	registry: Arc<ContractDecoderRegistry>,
}

impl InterfacesService {
	pub fn new(
		store: RequestStore<ContractDeploymentRequest>,
		registry: Arc<ContractDecoderRegistry>,
	) -> Self {
		Self { store, registry }
	}

	/// Interfaces partially matching an imported contract, plus the best
	/// non-overlapping selection among them.
	pub async fn suggested(&self, id: &RequestId) -> Result<SuggestedInterfacesResponse, ApiError> {
		tracing::debug!(request_id = %id, "Fetching suggested interfaces");

		let request = self
			.store
			.get_by_id(id)
			.await?
			.filter(|request| request.imported)
			.ok_or_else(|| not_found(id))?;
		let imported = self.imported_decorator(&request).await?;

		Ok(self.registry.suggest_interfaces(&imported.manifest))
	}

	pub async fn add(
		&self,
		id: &RequestId,
		project: &Project,
		body: ImportedContractInterfacesRequest,
	) -> Result<(), ApiError> {
		self.update(id, project, |current| {
			let mut implements = current;
			for interface in body.interfaces {
				if !implements.contains(&interface) {
					implements.push(interface);
				}
			}
			implements
		})
		.await
	}

	pub async fn remove(
		&self,
		id: &RequestId,
		project: &Project,
		body: ImportedContractInterfacesRequest,
	) -> Result<(), ApiError> {
		self.update(id, project, |current| {
			current
				.into_iter()
				.filter(|interface| !body.interfaces.contains(interface))
				.collect()
		})
		.await
	}

	pub async fn set(
		&self,
		id: &RequestId,
		project: &Project,
		body: ImportedContractInterfacesRequest,
	) -> Result<(), ApiError> {
		self.update(id, project, |_| {
			let mut implements: Vec<InterfaceId> = Vec::new();
			for interface in body.interfaces {
				if !implements.contains(&interface) {
					implements.push(interface);
				}
			}
			implements
		})
		.await
	}

	async fn update<F>(&self, id: &RequestId, project: &Project, change: F) -> Result<(), ApiError>
	where
		F: FnOnce(Vec<InterfaceId>) -> Vec<InterfaceId>,
	{
		let request = self
			.store
			.get_by_id(id)
			.await?
			.filter(|request| request.imported && request.project_id == project.id)
			.ok_or_else(|| {
				tracing::warn!(request_id = %id, project_id = %project.id, "Rejected interface update");
				not_found(id)
			})?;
		let imported = self.imported_decorator(&request).await?;

		let current = imported
			.manifest
			.implements
			.iter()
			.map(|interface| InterfaceId::new(interface.as_str()))
			.collect();
		let implements = change(current);

		let rebuilt = self.registry.rebuild_imported(&imported, implements)?;
		self.registry.store_imported(&rebuilt).await?;
		self.store
			.update_interfaces(
				id,
				rebuilt.decorator.implements.clone(),
				rebuilt.decorator.tags.clone(),
			)
			.await?;

		tracing::info!(
			request_id = %id,
			contract_id = %request.contract_id,
			interfaces = ?rebuilt.decorator.implements,
			"Updated imported contract interfaces"
		);
		Ok(())
	}

	async fn imported_decorator(
		&self,
		request: &ContractDeploymentRequest,
	) -> Result<ImportedDecorator, ApiError> {
		self.registry
			.get_imported(&request.contract_id, &request.project_id)
			.await?
			.ok_or_else(|| {
				ApiError::not_found(format!(
					"Imported decorator {} not found for project {}",
					request.contract_id, request.project_id
				))
			})
	}
}

fn not_found(id: &RequestId) -> ApiError {
	ApiError::not_found(format!("Imported contract deployment request {} not found", id))
}
