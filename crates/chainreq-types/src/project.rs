//! Project (tenant) description and chain routing.

use crate::{ChainId, ProjectId, RequestId};
use serde::{Deserialize, Serialize};

/// Placeholder substituted with the request id in redirect URL templates.
pub const ID_PLACEHOLDER: &str = "${id}";

/// A project owning requests, as configured for the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
	pub id: ProjectId,
	pub chain_id: ChainId,
	pub base_redirect_url: String,
	pub custom_rpc_url: Option<String>,
}

impl Project {
	/// Chain routing key for reads made on behalf of this project.
	pub fn chain_spec(&self) -> ChainSpec {
		ChainSpec {
			chain_id: self.chain_id,
			custom_rpc_url: self.custom_rpc_url.clone(),
		}
	}

	/// Resolves the redirect URL of a new request.
	///
	/// A caller supplied template has `${id}` replaced with the request id.
	/// Without a template, `path` (which itself contains `${id}`) is appended
	/// to the project's base redirect URL.
	pub fn create_redirect_url(&self, template: Option<&str>, id: RequestId, path: &str) -> String {
		let template = match template {
			Some(template) => template.to_string(),
			None => format!("{}{}", self.base_redirect_url, path),
		};

		template.replace(ID_PLACEHOLDER, &id.to_string())
	}
}

/// Routing key for a chain read: the chain and an optional RPC override.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainSpec {
	pub chain_id: ChainId,
	pub custom_rpc_url: Option<String>,
}

impl ChainSpec {
	pub fn new(chain_id: ChainId) -> Self {
		Self {
			chain_id,
			custom_rpc_url: None,
		}
	}
}
