//! Function call requests against deployed or imported contracts.

use crate::projector::{function_call_response, FUNCTION_CALL_REDIRECT_PATH};
use crate::projects::ProjectRegistry;
use crate::reconciler::{ExpectedTarget, StatusReconciler, TransactionExpectation};
use crate::utils::validate_body;
use chainreq_contracts::encoding::encode_function_call;
use chainreq_contracts::ContractDecoderRegistry;
use chainreq_storage::RequestStore;
use chainreq_types::api::{
	AttachTransactionInfoRequest, ContractFunctionCallRequestResponse,
	CreateContractFunctionCallRequest,
};
use chainreq_types::{
	Address, ApiError, ContractDeploymentRequest, ContractEvent, ContractFunctionCallRequest,
	ErrorCode, Project, ProjectId, RequestId, Status,
};
use chrono::Utc;
use futures::future::try_join_all;
use std::sync::Arc;
use uuid::Uuid;

pub struct FunctionCallService {
	store: RequestStore<ContractFunctionCallRequest>,
	deployments: RequestStore<ContractDeploymentRequest>,
	registry: Arc<ContractDecoderRegistry>,
	reconciler: Arc<StatusReconciler>,
	projects: Arc<ProjectRegistry>,
}

impl FunctionCallService {
	pub fn new(
		store: RequestStore<ContractFunctionCallRequest>,
		deployments: RequestStore<ContractDeploymentRequest>,
		registry: Arc<ContractDecoderRegistry>,
		reconciler: Arc<StatusReconciler>,
		projects: Arc<ProjectRegistry>,
	) -> Self {
		Self {
			store,
			deployments,
			registry,
			reconciler,
			projects,
		}
	}

	/// Creates a function call request. The target is given by exactly one
	/// of deployment id, deployment alias or contract address.
	pub async fn create(
		&self,
		project: &Project,
		body: CreateContractFunctionCallRequest,
	) -> Result<ContractFunctionCallRequestResponse, ApiError> {
		validate_body(&body)?;

		let identifiers = [
			body.deployed_contract_id.is_some(),
			body.deployed_contract_alias.is_some(),
			body.contract_address.is_some(),
		];
		if identifiers.iter().filter(|present| **present).count() != 1 {
			return Err(ApiError::invalid_request(
				"Exactly one of deployed_contract_id, deployed_contract_alias or contract_address must be provided",
			));
		}

		let (deployed_contract_id, contract_address) = match body.contract_address {
			Some(address) => (None, address),
			None => {
				let deployment = self
					.target_deployment(
						project,
						body.deployed_contract_id,
						body.deployed_contract_alias.as_deref(),
					)
					.await?;
				(Some(deployment.id), self.deployed_address(&deployment).await?)
			}
		};

		let function_call_data = encode_function_call(&body.function_name, &body.function_params)?;
		let function_params = serde_json::to_value(&body.function_params)
			.map_err(|e| ApiError::invalid_request(e.to_string()))?;

		let id = Uuid::new_v4();
		let request = ContractFunctionCallRequest {
			id,
			deployed_contract_id,
			contract_address,
			function_name: body.function_name,
			function_params,
			function_call_data,
			eth_amount: body.eth_amount,
			chain_id: project.chain_id,
			redirect_url: project.create_redirect_url(
				body.redirect_url.as_deref(),
				id,
				FUNCTION_CALL_REDIRECT_PATH,
			),
			project_id: project.id,
			created_at: Utc::now(),
			arbitrary_data: body.arbitrary_data,
			screen_config: body.screen_config.unwrap_or_default(),
			caller_address: body.caller_address,
			tx_hash: None,
		};

		let request = self.store.store(request).await?;
		self.respond(request).await
	}

	/// Deployment of the caller's project named by id or alias.
	async fn target_deployment(
		&self,
		project: &Project,
		id: Option<RequestId>,
		alias: Option<&str>,
	) -> Result<ContractDeploymentRequest, ApiError> {
		match (id, alias) {
			(Some(id), _) => self
				.deployments
				.get_by_id(&id)
				.await?
				.filter(|d| d.project_id == project.id)
				.ok_or_else(|| ApiError::not_found(format!("Deployment request {} not found", id))),
			(None, Some(alias)) => self
				.deployments
				.get_by_alias(&project.id, alias)
				.await?
				.ok_or_else(|| {
					ApiError::not_found(format!("Deployment request with alias {} not found", alias))
				}),
			(None, None) => Err(ApiError::invalid_request("Missing contract identifier")),
		}
	}

	/// Address of a deployment's contract, taken from the creation
	/// transaction when the deployment has not been read since it was mined.
	async fn deployed_address(
		&self,
		deployment: &ContractDeploymentRequest,
	) -> Result<Address, ApiError> {
		if let Some(address) = deployment.contract_address {
			return Ok(address);
		}

		let chain = self
			.projects
			.chain_spec(&deployment.project_id, deployment.chain_id);
		self.reconciler
			.fetch_transaction_info(&chain, deployment.tx_hash)
			.await?
			.and_then(|info| info.deployed_contract_address)
			.ok_or_else(|| {
				ApiError::new(
					ErrorCode::ContractNotDeployed,
					format!("Contract of deployment request {} is not deployed", deployment.id),
				)
			})
	}

	pub async fn get(&self, id: &RequestId) -> Result<ContractFunctionCallRequestResponse, ApiError> {
		let request = self
			.store
			.get_by_id(id)
			.await?
			.ok_or_else(|| ApiError::not_found(format!("Function call request {} not found", id)))?;

		self.respond(request).await
	}

	pub async fn list(
		&self,
		project_id: &ProjectId,
		deployed_contract_id: Option<RequestId>,
		contract_address: Option<Address>,
	) -> Result<Vec<ContractFunctionCallRequestResponse>, ApiError> {
		let requests = self
			.store
			.get_all_by_project_id(project_id, |request| {
				deployed_contract_id.map_or(true, |id| request.deployed_contract_id == Some(id))
					&& contract_address.map_or(true, |address| request.contract_address == address)
			})
			.await?;

		try_join_all(requests.into_iter().map(|r| self.respond(r))).await
	}

	pub async fn attach_tx_info(
		&self,
		id: &RequestId,
		body: AttachTransactionInfoRequest,
	) -> Result<ContractFunctionCallRequestResponse, ApiError> {
		let request = self
			.store
			.set_tx_info(id, body.tx_hash, body.caller_address)
			.await?;

		self.respond(request).await
	}

	pub fn expectation(request: &ContractFunctionCallRequest) -> TransactionExpectation {
		TransactionExpectation {
			tx_hash: request.tx_hash,
			from: request.caller_address,
			target: ExpectedTarget::Call(request.contract_address),
			data: request.function_call_data.clone(),
			value: request.eth_amount,
		}
	}

	async fn respond(
		&self,
		request: ContractFunctionCallRequest,
	) -> Result<ContractFunctionCallRequestResponse, ApiError> {
		let chain = self.projects.chain_spec(&request.project_id, request.chain_id);
		let expectation = Self::expectation(&request);
		let info = self
			.reconciler
			.fetch_transaction_info(&chain, expectation.tx_hash)
			.await?;
		let status = StatusReconciler::determine_status(info.as_ref(), &expectation);

		let events = match (&info, status) {
			(Some(_), Status::Success) => self.contract_events(&request).await?,
			_ => Vec::new(),
		};

		Ok(function_call_response(
			request,
			StatusReconciler::assemble(info, status, &expectation, &events),
		))
	}

	/// Events of the decorator behind the called deployment; calls made by
	/// address alone have no decorator.
	async fn contract_events(
		&self,
		request: &ContractFunctionCallRequest,
	) -> Result<Vec<ContractEvent>, ApiError> {
		let Some(deployment_id) = request.deployed_contract_id else {
			return Ok(Vec::new());
		};
		let Some(deployment) = self.deployments.get_by_id(&deployment_id).await? else {
			return Ok(Vec::new());
		};

		Ok(self
			.registry
			.resolve(&deployment.contract_id, &deployment.project_id)
			.await?
			.map(|decorator| decorator.events)
			.unwrap_or_default())
	}
}
