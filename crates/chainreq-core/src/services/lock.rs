//! ERC20 lock requests.

use crate::projector::{lock_response, LOCK_REDIRECT_PATH};
use crate::projects::ProjectRegistry;
use crate::reconciler::{ExpectedTarget, StatusReconciler, TransactionExpectation};
use crate::utils::validate_body;
use chainreq_contracts::predefined::{lock_call_data, transfer_event};
use chainreq_storage::RequestStore;
use chainreq_types::api::{
	AttachTransactionInfoRequest, CreateErc20LockRequest, Erc20LockRequestResponse,
};
use chainreq_types::{ApiError, Erc20LockRequest, Project, ProjectId, RequestId, U256};
use chrono::Utc;
use futures::future::try_join_all;
use std::sync::Arc;
use uuid::Uuid;

pub struct LockService {
	store: RequestStore<Erc20LockRequest>,
	reconciler: Arc<StatusReconciler>,
	projects: Arc<ProjectRegistry>,
}

impl LockService {
	pub fn new(
		store: RequestStore<Erc20LockRequest>,
		reconciler: Arc<StatusReconciler>,
		projects: Arc<ProjectRegistry>,
	) -> Self {
		Self {
			store,
			reconciler,
			projects,
		}
	}

	pub async fn create(
		&self,
		project: &Project,
		body: CreateErc20LockRequest,
	) -> Result<Erc20LockRequestResponse, ApiError> {
		validate_body(&body)?;

		let id = Uuid::new_v4();
		let request = Erc20LockRequest {
			id,
			project_id: project.id,
			chain_id: project.chain_id,
			redirect_url: project.create_redirect_url(
				body.redirect_url.as_deref(),
				id,
				LOCK_REDIRECT_PATH,
			),
			token_address: body.token_address,
			token_amount: body.amount,
			lock_duration_seconds: body.lock_duration_in_seconds,
			lock_contract_address: body.lock_contract_address,
			token_sender_address: body.sender_address,
			arbitrary_data: body.arbitrary_data,
			screen_config: body.screen_config.unwrap_or_default(),
			created_at: Utc::now(),
			tx_hash: None,
		};

		let request = self.store.store(request).await?;
		self.respond(request).await
	}

	pub async fn get(&self, id: &RequestId) -> Result<Erc20LockRequestResponse, ApiError> {
		let request = self
			.store
			.get_by_id(id)
			.await?
			.ok_or_else(|| ApiError::not_found(format!("Lock request {} not found", id)))?;

		self.respond(request).await
	}

	pub async fn list(&self, project_id: &ProjectId) -> Result<Vec<Erc20LockRequestResponse>, ApiError> {
		let requests = self.store.get_all_by_project_id(project_id, |_| true).await?;
		try_join_all(requests.into_iter().map(|r| self.respond(r))).await
	}

	pub async fn attach_tx_info(
		&self,
		id: &RequestId,
		body: AttachTransactionInfoRequest,
	) -> Result<Erc20LockRequestResponse, ApiError> {
		let request = self
			.store
			.set_tx_info(id, body.tx_hash, body.caller_address)
			.await?;

		self.respond(request).await
	}

	/// The lock call carries the request id as its info string.
	pub fn expectation(request: &Erc20LockRequest) -> TransactionExpectation {
		TransactionExpectation {
			tx_hash: request.tx_hash,
			from: request.token_sender_address,
			target: ExpectedTarget::Call(request.lock_contract_address),
			data: lock_call_data(
				request.token_address,
				request.token_amount,
				request.lock_duration_seconds,
				request.id.to_string(),
			),
			value: U256::ZERO,
		}
	}

	async fn respond(&self, request: Erc20LockRequest) -> Result<Erc20LockRequestResponse, ApiError> {
		let chain = self.projects.chain_spec(&request.project_id, request.chain_id);
		let reconciled = self
			.reconciler
			.reconcile(&chain, &Self::expectation(&request), &[transfer_event()])
			.await?;

		Ok(lock_response(request, reconciled))
	}
}
