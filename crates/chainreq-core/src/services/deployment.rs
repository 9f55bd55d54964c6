//! Contract deployment requests.
//!
//! A deployment request stores the creation data (decorator binary plus
//! encoded constructor arguments) the wallet is asked to send. The address of
//! the created contract is persisted the first time a successful creation is
//! observed, so later reads and function calls can rely on it.

use crate::projector::{deployment_response, DEPLOY_REDIRECT_PATH};
use crate::projects::ProjectRegistry;
use crate::reconciler::{ExpectedTarget, StatusReconciler, TransactionExpectation};
use crate::utils::validate_body;
use chainreq_contracts::encoding::encode_constructor;
use chainreq_contracts::{ContractDecoderRegistry, ContractError};
use chainreq_storage::RequestStore;
use chainreq_types::api::{
	AttachTransactionInfoRequest, ContractDeploymentRequestResponse,
	CreateContractDeploymentRequest,
};
use chainreq_types::{
	ApiError, ContractDeploymentRequest, ContractDeploymentRequestFilters, ContractEvent,
	ContractId, Project, ProjectId, RequestId, Status,
};
use chrono::Utc;
use futures::future::try_join_all;
use std::sync::Arc;
use uuid::Uuid;

pub struct DeploymentService {
	store: RequestStore<ContractDeploymentRequest>,
	registry: Arc<ContractDecoderRegistry>,
	reconciler: Arc<StatusReconciler>,
	projects: Arc<ProjectRegistry>,
}

impl DeploymentService {
	pub fn new(
		store: RequestStore<ContractDeploymentRequest>,
		registry: Arc<ContractDecoderRegistry>,
		reconciler: Arc<StatusReconciler>,
		projects: Arc<ProjectRegistry>,
	) -> Self {
		Self {
			store,
			registry,
			reconciler,
			projects,
		}
	}

	/// Creates a deployment request for a deployable or previously imported
	/// contract.
	pub async fn create(
		&self,
		project: &Project,
		body: CreateContractDeploymentRequest,
	) -> Result<ContractDeploymentRequestResponse, ApiError> {
		validate_body(&body)?;

		let contract_id = ContractId::new(body.contract_id);
		let decorator = self
			.registry
			.resolve(&contract_id, &project.id)
			.await?
			.ok_or_else(|| ContractError::NotFound(contract_id.to_string()))?;

		let expected_arguments = decorator.constructors.first().map_or(0, |c| c.inputs.len());
		if expected_arguments != body.constructor_params.len() {
			return Err(ApiError::invalid_request(format!(
				"Contract {} expects {} constructor arguments, got {}",
				contract_id,
				expected_arguments,
				body.constructor_params.len()
			)));
		}

		let contract_data = encode_constructor(&decorator.binary, &body.constructor_params)?;
		let constructor_params = serde_json::to_value(&body.constructor_params)
			.map_err(|e| ApiError::invalid_request(e.to_string()))?;

		let id = Uuid::new_v4();
		let request = ContractDeploymentRequest {
			id,
			alias: body.alias,
			name: decorator.name,
			description: decorator.description,
			contract_id,
			contract_data,
			constructor_params,
			contract_tags: decorator.tags,
			contract_implements: decorator.implements,
			initial_eth_amount: body.initial_eth_amount,
			chain_id: project.chain_id,
			redirect_url: project.create_redirect_url(
				body.redirect_url.as_deref(),
				id,
				DEPLOY_REDIRECT_PATH,
			),
			project_id: project.id,
			created_at: Utc::now(),
			arbitrary_data: body.arbitrary_data,
			screen_config: body.screen_config.unwrap_or_default(),
			contract_address: None,
			deployer_address: body.deployer_address,
			tx_hash: None,
			imported: false,
		};

		let request = self.store.store(request).await?;
		self.respond(request).await
	}

	pub async fn get(&self, id: &RequestId) -> Result<ContractDeploymentRequestResponse, ApiError> {
		let request = self
			.store
			.get_by_id(id)
			.await?
			.ok_or_else(|| ApiError::not_found(format!("Deployment request {} not found", id)))?;

		self.respond(request).await
	}

	pub async fn get_by_alias(
		&self,
		project_id: &ProjectId,
		alias: &str,
	) -> Result<ContractDeploymentRequestResponse, ApiError> {
		let request = self
			.store
			.get_by_alias(project_id, alias)
			.await?
			.ok_or_else(|| {
				ApiError::not_found(format!("Deployment request with alias {} not found", alias))
			})?;

		self.respond(request).await
	}

	/// Lists the project's deployment requests matching `filters`.
	///
	/// `deployed_only` keeps the requests whose contract address is known
	/// after reconciliation.
	pub async fn list(
		&self,
		project_id: &ProjectId,
		filters: &ContractDeploymentRequestFilters,
	) -> Result<Vec<ContractDeploymentRequestResponse>, ApiError> {
		let requests = self
			.store
			.get_all_by_project_id(project_id, |request| {
				filters.contract_ids.matches(&request.contract_id)
					&& filters
						.contract_tags
						.matches_all_of_any(&request.contract_tags)
					&& filters
						.contract_implements
						.matches_all_of_any(&request.contract_implements)
			})
			.await?;

		let responses = try_join_all(requests.into_iter().map(|r| self.respond(r))).await?;

		Ok(responses
			.into_iter()
			.filter(|response| !filters.deployed_only || response.contract_address.is_some())
			.collect())
	}

	/// Records the hash of the creation transaction sent by the wallet.
	pub async fn attach_tx_info(
		&self,
		id: &RequestId,
		body: AttachTransactionInfoRequest,
	) -> Result<ContractDeploymentRequestResponse, ApiError> {
		let request = self
			.store
			.set_tx_info(id, body.tx_hash, body.caller_address)
			.await?;

		self.respond(request).await
	}

	/// Deletes a request owned by `project`. Requests of other projects are
	/// reported as missing.
	pub async fn delete(&self, id: &RequestId, project: &Project) -> Result<(), ApiError> {
		if self.store.delete(id, &project.id).await? {
			Ok(())
		} else {
			tracing::warn!(request_id = %id, project_id = %project.id, "Rejected deployment delete");
			Err(ApiError::not_found(format!("Deployment request {} not found", id)))
		}
	}

	pub fn expectation(request: &ContractDeploymentRequest) -> TransactionExpectation {
		TransactionExpectation {
			tx_hash: request.tx_hash,
			from: request.deployer_address,
			target: ExpectedTarget::Deployment {
				contract_address: request.contract_address,
			},
			data: request.contract_data.clone(),
			value: request.initial_eth_amount,
		}
	}

	async fn respond(
		&self,
		mut request: ContractDeploymentRequest,
	) -> Result<ContractDeploymentRequestResponse, ApiError> {
		let chain = self.projects.chain_spec(&request.project_id, request.chain_id);
		let info = self
			.reconciler
			.fetch_transaction_info(&chain, request.tx_hash)
			.await?;

		// Imported contracts exist on chain by construction
		let status = if request.imported {
			Status::Success
		} else {
			StatusReconciler::determine_status(info.as_ref(), &Self::expectation(&request))
		};

		if status == Status::Success && request.contract_address.is_none() {
			if let Some(address) = info.as_ref().and_then(|i| i.deployed_contract_address) {
				request = self.store.set_contract_address(&request.id, address).await?;
				tracing::info!(request_id = %request.id, contract_address = %address, "Recorded deployed contract address");
			}
		}

		let events = match (&info, status) {
			(Some(_), Status::Success) => self.decorator_events(&request).await?,
			_ => Vec::new(),
		};
		let reconciled =
			StatusReconciler::assemble(info, status, &Self::expectation(&request), &events);

		Ok(deployment_response(request, reconciled))
	}

	async fn decorator_events(
		&self,
		request: &ContractDeploymentRequest,
	) -> Result<Vec<ContractEvent>, ApiError> {
		Ok(self
			.registry
			.resolve(&request.contract_id, &request.project_id)
			.await?
			.map(|decorator| decorator.events)
			.unwrap_or_default())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{Fixture, EXAMPLE_BINARY, EXAMPLE_CONTRACT};
	use chainreq_chain::testing::FakeTransaction;
	use chainreq_contracts::encoding::event_topic;
	use chainreq_types::api::FunctionArgument;
	use chainreq_types::{Address, Bytes, ErrorCode, EventArgumentType, RawLog, U256};
	use serde_json::json;

	fn service(fixture: &Fixture) -> DeploymentService {
		DeploymentService::new(
			fixture.store(),
			fixture.registry.clone(),
			fixture.reconciler.clone(),
			fixture.projects.clone(),
		)
	}

	fn body(alias: &str) -> CreateContractDeploymentRequest {
		CreateContractDeploymentRequest {
			alias: alias.to_string(),
			contract_id: EXAMPLE_CONTRACT.to_string(),
			constructor_params: vec![FunctionArgument {
				argument_type: "address".to_string(),
				value: json!("0x000000000000000000000000000000000000000a"),
			}],
			deployer_address: None,
			initial_eth_amount: U256::ZERO,
			redirect_url: None,
			arbitrary_data: Some(json!({ "campaign": "test" })),
			screen_config: None,
		}
	}

	fn owner_changed_log(contract: Address) -> RawLog {
		RawLog {
			address: contract,
			topics: vec![
				event_topic("OwnerChanged(address,address)"),
				Address::ZERO.into_word(),
			],
			data: Bytes::from(Address::repeat_byte(0x0a).into_word().to_vec()),
		}
	}

	#[tokio::test]
	async fn test_create_builds_creation_data() {
		let fixture = Fixture::new();
		let response = service(&fixture)
			.create(&fixture.project, body("first"))
			.await
			.unwrap();

		assert_eq!(response.status, Status::Pending);
		assert_eq!(&response.contract_deployment_data[..5], &EXAMPLE_BINARY);
		assert_eq!(response.contract_deployment_data.len(), 5 + 32);
		assert_eq!(response.deploy_tx.to, Address::ZERO);
		assert!(response.deploy_tx.tx_hash.is_none());
		assert_eq!(response.contract_tags, vec!["example", "access"]);
		assert_eq!(response.contract_implements, vec!["example.ownable"]);
		assert_eq!(
			response.redirect_url,
			format!("https://example.com/request-deploy/{}/action", response.id)
		);
		assert!(!response.imported);
		assert!(response.events.is_none());
	}

	#[tokio::test]
	async fn test_create_rejects_bad_input() {
		let fixture = Fixture::new();
		let service = service(&fixture);

		let unknown = CreateContractDeploymentRequest {
			contract_id: "examples.unknown".to_string(),
			..body("a")
		};
		assert_eq!(
			service.create(&fixture.project, unknown).await.unwrap_err().code,
			ErrorCode::ContractNotFound
		);

		let missing_argument = CreateContractDeploymentRequest {
			constructor_params: vec![],
			..body("b")
		};
		assert_eq!(
			service
				.create(&fixture.project, missing_argument)
				.await
				.unwrap_err()
				.code,
			ErrorCode::InvalidRequestBody
		);

		assert_eq!(
			service.create(&fixture.project, body("")).await.unwrap_err().code,
			ErrorCode::InvalidRequestBody
		);
	}

	#[tokio::test]
	async fn test_alias_is_unique_per_project() {
		let fixture = Fixture::new();
		let service = service(&fixture);

		service.create(&fixture.project, body("alias")).await.unwrap();
		assert_eq!(
			service
				.create(&fixture.project, body("alias"))
				.await
				.unwrap_err()
				.code,
			ErrorCode::AliasAlreadyInUse
		);
		service
			.create(&fixture.other_project, body("alias"))
			.await
			.unwrap();

		let found = service
			.get_by_alias(&fixture.project.id, "alias")
			.await
			.unwrap();
		assert_eq!(found.project_id, fixture.project.id);
	}

	#[tokio::test]
	async fn test_successful_deployment_records_address_and_events() {
		let fixture = Fixture::new();
		let service = service(&fixture);
		let created = service.create(&fixture.project, body("deploy")).await.unwrap();
		let deployer = Address::repeat_byte(0x11);
		let contract = Address::repeat_byte(0xc0);

		let tx_hash = fixture.chain.mine_transaction(
			FakeTransaction::new(deployer, None, created.contract_deployment_data.clone())
				.creating(contract, Bytes::from(vec![0x60, 0x80]))
				.with_logs(vec![owner_changed_log(contract)]),
		);
		let attached = service
			.attach_tx_info(
				&created.id,
				AttachTransactionInfoRequest {
					tx_hash,
					caller_address: deployer,
				},
			)
			.await
			.unwrap();

		assert_eq!(attached.status, Status::Success);
		assert_eq!(attached.contract_address, Some(contract));
		assert_eq!(attached.deployer_address, Some(deployer));
		assert_eq!(attached.deploy_tx.tx_hash, Some(tx_hash));
		assert_eq!(attached.deploy_tx.block_confirmations, Some(0));

		let events = attached.events.unwrap();
		assert_eq!(events.len(), 1);
		assert_eq!(events[0].signature, "OwnerChanged(address,address)");
		assert_eq!(events[0].arguments[0].argument_type, EventArgumentType::Value);

		fixture.chain.mine_empty_block();
		let again = service.get(&created.id).await.unwrap();
		assert_eq!(again.status, Status::Success);
		assert_eq!(again.deploy_tx.block_confirmations, Some(1));
	}

	#[tokio::test]
	async fn test_attach_is_at_most_once() {
		let fixture = Fixture::new();
		let service = service(&fixture);
		let created = service.create(&fixture.project, body("once")).await.unwrap();
		let attach = |byte| AttachTransactionInfoRequest {
			tx_hash: fixture.chain.next_transaction_hash(),
			caller_address: Address::repeat_byte(byte),
		};

		let (first, second) = futures::join!(
			service.attach_tx_info(&created.id, attach(1)),
			service.attach_tx_info(&created.id, attach(2))
		);
		assert!(first.is_ok() != second.is_ok());
		let error = first.err().or(second.err()).unwrap();
		assert_eq!(error.code, ErrorCode::TxInfoAlreadySet);

		assert_eq!(
			service
				.attach_tx_info(&Uuid::new_v4(), attach(3))
				.await
				.unwrap_err()
				.code,
			ErrorCode::ResourceNotFound
		);
	}

	#[tokio::test]
	async fn test_mismatched_creation_fails() {
		let fixture = Fixture::new();
		let service = service(&fixture);
		let created = service.create(&fixture.project, body("bad")).await.unwrap();
		let contract = Address::repeat_byte(0xc1);

		let tx_hash = fixture.chain.mine_transaction(
			FakeTransaction::new(Address::repeat_byte(1), None, Bytes::from(vec![0x60]))
				.creating(contract, Bytes::from(vec![0x60, 0x80])),
		);
		let response = service
			.attach_tx_info(
				&created.id,
				AttachTransactionInfoRequest {
					tx_hash,
					caller_address: Address::repeat_byte(1),
				},
			)
			.await
			.unwrap();

		assert_eq!(response.status, Status::Failed);
		assert!(response.contract_address.is_none());
		assert!(response.events.is_none());
	}

	#[tokio::test]
	async fn test_list_filters_and_delete_masking() {
		let fixture = Fixture::new();
		let service = service(&fixture);
		let first = service.create(&fixture.project, body("one")).await.unwrap();
		service.create(&fixture.project, body("two")).await.unwrap();
		service.create(&fixture.other_project, body("three")).await.unwrap();

		let all = service
			.list(&fixture.project.id, &ContractDeploymentRequestFilters::default())
			.await
			.unwrap();
		assert_eq!(all.len(), 2);

		let tagged = ContractDeploymentRequestFilters::parse(None, Some("example AND access"), None, false);
		assert_eq!(service.list(&fixture.project.id, &tagged).await.unwrap().len(), 2);

		let other_tag = ContractDeploymentRequestFilters::parse(None, Some("other"), None, false);
		assert!(service.list(&fixture.project.id, &other_tag).await.unwrap().is_empty());

		let deployed = ContractDeploymentRequestFilters::parse(None, None, None, true);
		assert!(service.list(&fixture.project.id, &deployed).await.unwrap().is_empty());

		assert!(service
			.list(&Uuid::new_v4(), &ContractDeploymentRequestFilters::default())
			.await
			.unwrap()
			.is_empty());

		let error = service
			.delete(&first.id, &fixture.other_project)
			.await
			.unwrap_err();
		assert_eq!(error.code, ErrorCode::ResourceNotFound);
		assert!(service.get(&first.id).await.is_ok());

		service.delete(&first.id, &fixture.project).await.unwrap();
		assert_eq!(
			service.get(&first.id).await.unwrap_err().code,
			ErrorCode::ResourceNotFound
		);
		service.create(&fixture.project, body("one")).await.unwrap();
	}
}
