//! Single-recipient asset send requests.
//!
//! A token send is an ERC20 `transfer` call on the token. A native send is a
//! plain value transfer to the recipient with empty call data.

use crate::projector::{send_response, SEND_REDIRECT_PATH};
use crate::projects::ProjectRegistry;
use crate::reconciler::{ExpectedTarget, StatusReconciler, TransactionExpectation};
use crate::utils::validate_body;
use chainreq_contracts::predefined::{transfer_call_data, transfer_event};
use chainreq_storage::RequestStore;
use chainreq_types::api::{
	AssetSendRequestResponse, AssetType, AttachTransactionInfoRequest, CreateAssetSendRequest,
};
use chainreq_types::{
	Address, ApiError, AssetSendRequest, Bytes, Project, ProjectId, RequestId, U256,
};
use chrono::Utc;
use futures::future::try_join_all;
use std::sync::Arc;
use uuid::Uuid;

pub struct SendService {
	store: RequestStore<AssetSendRequest>,
	reconciler: Arc<StatusReconciler>,
	projects: Arc<ProjectRegistry>,
}

impl SendService {
	pub fn new(
		store: RequestStore<AssetSendRequest>,
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
		body: CreateAssetSendRequest,
	) -> Result<AssetSendRequestResponse, ApiError> {
		validate_body(&body)?;

		match (body.asset_type, body.token_address) {
			(AssetType::Token, None) => {
				return Err(ApiError::invalid_request(
					"token_address is required for TOKEN sends",
				))
			}
			(AssetType::Native, Some(_)) => {
				return Err(ApiError::invalid_request(
					"token_address must not be set for NATIVE sends",
				))
			}
			_ => {}
		}

		let id = Uuid::new_v4();
		let request = AssetSendRequest {
			id,
			project_id: project.id,
			chain_id: project.chain_id,
			redirect_url: project.create_redirect_url(
				body.redirect_url.as_deref(),
				id,
				SEND_REDIRECT_PATH,
			),
			token_address: body.token_address,
			asset_amount: body.amount,
			asset_sender_address: body.sender_address,
			asset_recipient_address: body.recipient_address,
			arbitrary_data: body.arbitrary_data,
			screen_config: body.screen_config.unwrap_or_default(),
			created_at: Utc::now(),
			tx_hash: None,
		};

		let request = self.store.store(request).await?;
		self.respond(request).await
	}

	pub async fn get(&self, id: &RequestId) -> Result<AssetSendRequestResponse, ApiError> {
		let request = self
			.store
			.get_by_id(id)
			.await?
			.ok_or_else(|| ApiError::not_found(format!("Send request {} not found", id)))?;

		self.respond(request).await
	}

	pub async fn list(&self, project_id: &ProjectId) -> Result<Vec<AssetSendRequestResponse>, ApiError> {
		let requests = self.store.get_all_by_project_id(project_id, |_| true).await?;
		try_join_all(requests.into_iter().map(|r| self.respond(r))).await
	}

	/// Requests sent from `sender`, across all projects.
	pub async fn list_by_sender(
		&self,
		sender: &Address,
	) -> Result<Vec<AssetSendRequestResponse>, ApiError> {
		let requests = self.store.get_all_by_sender(sender).await?;
		try_join_all(requests.into_iter().map(|r| self.respond(r))).await
	}

	/// Requests paying `recipient`, across all projects.
	pub async fn list_by_recipient(
		&self,
		recipient: &Address,
	) -> Result<Vec<AssetSendRequestResponse>, ApiError> {
		let requests = self.store.get_all_by_recipient(recipient).await?;
		try_join_all(requests.into_iter().map(|r| self.respond(r))).await
	}

	pub async fn attach_tx_info(
		&self,
		id: &RequestId,
		body: AttachTransactionInfoRequest,
	) -> Result<AssetSendRequestResponse, ApiError> {
		let request = self
			.store
			.set_tx_info(id, body.tx_hash, body.caller_address)
			.await?;

		self.respond(request).await
	}

	pub fn expectation(request: &AssetSendRequest) -> TransactionExpectation {
		let (target, data, value) = match request.token_address {
			Some(token) => (
				token,
				transfer_call_data(request.asset_recipient_address, request.asset_amount),
				U256::ZERO,
			),
			None => (
				request.asset_recipient_address,
				Bytes::new(),
				request.asset_amount,
			),
		};

		TransactionExpectation {
			tx_hash: request.tx_hash,
			from: request.asset_sender_address,
			target: ExpectedTarget::Call(target),
			data,
			value,
		}
	}

	async fn respond(&self, request: AssetSendRequest) -> Result<AssetSendRequestResponse, ApiError> {
		let chain = self.projects.chain_spec(&request.project_id, request.chain_id);
		let reconciled = self
			.reconciler
			.reconcile(&chain, &Self::expectation(&request), &[transfer_event()])
			.await?;

		Ok(send_response(request, reconciled))
	}
}
