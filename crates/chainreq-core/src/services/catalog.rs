//! Read-only catalog of deployable contracts and known interfaces.

use chainreq_contracts::{ContractDecoderRegistry, ContractError};
use chainreq_types::{
	ApiError, ContractDecorator, ContractDecoratorFilters, ContractId, ContractInterface,
	InterfaceId,
};
use std::sync::Arc;

pub struct CatalogService {
	registry: Arc<ContractDecoderRegistry>,
}

impl CatalogService {
	pub fn new(registry: Arc<ContractDecoderRegistry>) -> Self {
		Self { registry }
	}

	pub fn list_decorators(&self, filters: &ContractDecoratorFilters) -> Vec<ContractDecorator> {
		self.registry.list(filters)
	}

	pub fn get_decorator(&self, id: &ContractId) -> Result<ContractDecorator, ApiError> {
		self.registry
			.get_decorator(id)
			.ok_or_else(|| ContractError::NotFound(id.to_string()).into())
	}

	pub fn list_interfaces(&self) -> Vec<ContractInterface> {
		self.registry.list_interfaces()
	}

	pub fn get_interface(&self, id: &InterfaceId) -> Result<ContractInterface, ApiError> {
		self.registry
			.get_interface(id)
			.ok_or_else(|| ContractError::InterfaceNotFound(id.to_string()).into())
	}
}
