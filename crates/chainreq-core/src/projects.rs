//! Configured projects and their API keys.

use chainreq_config::ProjectConfig;
use chainreq_types::{ApiError, ChainId, ChainSpec, ErrorCode, Project, ProjectId};
use std::collections::HashMap;

/// Projects known to the service, addressable by id and by API key.
#[derive(Debug, Default)]
pub struct ProjectRegistry {
	projects: HashMap<ProjectId, Project>,
	api_keys: HashMap<String, ProjectId>,
}

impl ProjectRegistry {
	pub fn new(configs: &[ProjectConfig]) -> Self {
		let mut registry = Self::default();
		for config in configs {
			registry.insert(config.api_key.clone(), config.to_project());
		}
		registry
	}

	pub fn insert(&mut self, api_key: String, project: Project) {
		self.api_keys.insert(api_key, project.id);
		self.projects.insert(project.id, project);
	}

	pub fn get(&self, id: &ProjectId) -> Option<&Project> {
		self.projects.get(id)
	}

	/// Resolves the project owning `api_key`.
	pub fn by_api_key(&self, api_key: &str) -> Result<&Project, ApiError> {
		self.api_keys
			.get(api_key)
			.and_then(|id| self.projects.get(id))
			.ok_or_else(|| ApiError::new(ErrorCode::NonExistentApiKey, "Non existent API key provided"))
	}

	/// Routing for reads made on behalf of a request: the owning project's
	/// custom RPC applies only on the project's own chain.
	pub fn chain_spec(&self, project_id: &ProjectId, chain_id: ChainId) -> ChainSpec {
		match self.projects.get(project_id) {
			Some(project) if project.chain_id == chain_id => project.chain_spec(),
			_ => ChainSpec::new(chain_id),
		}
	}

	pub fn len(&self) -> usize {
		self.projects.len()
	}

	pub fn is_empty(&self) -> bool {
		self.projects.is_empty()
	}
}
