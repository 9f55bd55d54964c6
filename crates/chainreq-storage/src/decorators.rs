//! Persistence for decorators synthesized when a contract is imported.

use crate::{StorageError, StorageService};
use chainreq_types::{ContractId, ImportedDecorator, ProjectId};
use std::sync::Arc;

const NAMESPACE: &str = "imported-decorator";

/// Stores imported decorators scoped to the project that imported them.
#[derive(Clone)]
pub struct ImportedDecoratorStore {
	storage: Arc<StorageService>,
}

impl ImportedDecoratorStore {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	fn key(project_id: &ProjectId, contract_id: &ContractId) -> String {
		format!("{}:{}", project_id, contract_id)
	}

	pub async fn get(
		&self,
		project_id: &ProjectId,
		contract_id: &ContractId,
	) -> Result<Option<ImportedDecorator>, StorageError> {
		self.storage
			.find(NAMESPACE, &Self::key(project_id, contract_id))
			.await
	}

	/// Stores the decorator, replacing an earlier import of the same contract.
	pub async fn store(&self, imported: &ImportedDecorator) -> Result<(), StorageError> {
		self.storage
			.store(
				NAMESPACE,
				&Self::key(&imported.project_id, &imported.decorator.id),
				imported,
			)
			.await?;

		tracing::debug!(
			project_id = %imported.project_id,
			contract_id = %imported.decorator.id,
			"Stored imported decorator"
		);
		Ok(())
	}

	pub async fn list(&self, project_id: &ProjectId) -> Result<Vec<ImportedDecorator>, StorageError> {
		Ok(self
			.storage
			.list::<ImportedDecorator>(NAMESPACE)
			.await?
			.into_iter()
			.filter(|imported| imported.project_id == *project_id)
			.collect())
	}
}
