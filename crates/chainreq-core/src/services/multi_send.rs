//! Asset multi-send requests.
//!
//! Native sends are a single `disperseEther` call carrying the total as
//! value. Token sends first approve the disperse contract for the total and
//! then call `disperseToken`; the disperse leg is only reported once the
//! approve leg has succeeded.

use crate::projector::{multi_send_response, MULTI_SEND_REDIRECT_PATH};
use crate::projects::ProjectRegistry;
use crate::reconciler::{ExpectedTarget, StatusReconciler, TransactionExpectation};
use crate::utils::validate_body;
use chainreq_contracts::predefined::{
	approval_event, approve_call_data, disperse_ether_call_data, disperse_token_call_data,
	transfer_event,
};
use chainreq_storage::{RequestStore, StorageError};
use chainreq_types::api::{
	AssetMultiSendRequestResponse, AssetType, AttachTransactionInfoRequest,
	CreateAssetMultiSendRequest,
};
use chainreq_types::{
	Address, ApiError, AssetMultiSendRequest, MultiSendItem, Project, ProjectId, RequestId,
	Status, U256,
};
use chrono::Utc;
use futures::future::try_join_all;
use std::sync::Arc;
use uuid::Uuid;

pub struct MultiSendService {
	store: RequestStore<AssetMultiSendRequest>,
	reconciler: Arc<StatusReconciler>,
	projects: Arc<ProjectRegistry>,
}

impl MultiSendService {
	pub fn new(
		store: RequestStore<AssetMultiSendRequest>,
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
		body: CreateAssetMultiSendRequest,
	) -> Result<AssetMultiSendRequestResponse, ApiError> {
		validate_body(&body)?;

		match (body.asset_type, body.token_address) {
			(AssetType::Token, None) => {
				return Err(ApiError::invalid_request(
					"token_address is required for TOKEN multi-sends",
				))
			}
			(AssetType::Native, Some(_)) => {
				return Err(ApiError::invalid_request(
					"token_address must not be set for NATIVE multi-sends",
				))
			}
			_ => {}
		}

		let id = Uuid::new_v4();
		let request = AssetMultiSendRequest {
			id,
			project_id: project.id,
			chain_id: project.chain_id,
			redirect_url: project.create_redirect_url(
				body.redirect_url.as_deref(),
				id,
				MULTI_SEND_REDIRECT_PATH,
			),
			token_address: body.token_address,
			disperse_contract_address: body.disperse_contract_address,
			items: body
				.assets
				.into_iter()
				.map(|item| MultiSendItem {
					wallet_address: item.wallet_address,
					amount: item.amount,
					item_name: item.item_name,
				})
				.collect(),
			asset_sender_address: body.sender_address,
			approve_tx_hash: None,
			disperse_tx_hash: None,
			arbitrary_data: body.arbitrary_data,
			approve_screen_config: body.approve_screen_config.unwrap_or_default(),
			disperse_screen_config: body.disperse_screen_config.unwrap_or_default(),
			created_at: Utc::now(),
		};

		if request.checked_total_amount().is_none() {
			return Err(ApiError::invalid_request(
				"Sum of multi-send amounts exceeds uint256",
			));
		}

		let request = self.store.store(request).await?;
		self.respond(request).await
	}

	pub async fn get(&self, id: &RequestId) -> Result<AssetMultiSendRequestResponse, ApiError> {
		let request = self
			.store
			.get_by_id(id)
			.await?
			.ok_or_else(|| ApiError::not_found(format!("Multi-send request {} not found", id)))?;

		self.respond(request).await
	}

	pub async fn list(
		&self,
		project_id: &ProjectId,
	) -> Result<Vec<AssetMultiSendRequestResponse>, ApiError> {
		let requests = self.store.get_all_by_project_id(project_id, |_| true).await?;
		try_join_all(requests.into_iter().map(|r| self.respond(r))).await
	}

	/// Requests whose sender is `sender`, across all projects.
	pub async fn list_by_sender(
		&self,
		sender: &Address,
	) -> Result<Vec<AssetMultiSendRequestResponse>, ApiError> {
		let requests = self.store.get_all_by_sender(sender).await?;
		try_join_all(requests.into_iter().map(|r| self.respond(r))).await
	}

	/// Attaches the approve transaction of a token multi-send.
	pub async fn attach_approve_tx_info(
		&self,
		id: &RequestId,
		body: AttachTransactionInfoRequest,
	) -> Result<AssetMultiSendRequestResponse, ApiError> {
		let request = self
			.store
			.set_approve_tx_info(id, body.tx_hash, body.caller_address)
			.await
			.map_err(|e| rejected(id, "approve", e))?;

		self.respond(request).await
	}

	/// Attaches the disperse transaction. Token multi-sends accept it only
	/// after the approve transaction.
	pub async fn attach_disperse_tx_info(
		&self,
		id: &RequestId,
		body: AttachTransactionInfoRequest,
	) -> Result<AssetMultiSendRequestResponse, ApiError> {
		let request = self
			.store
			.set_disperse_tx_info(id, body.tx_hash, body.caller_address)
			.await
			.map_err(|e| rejected(id, "disperse", e))?;

		self.respond(request).await
	}

	/// Approve leg of a token multi-send; `None` for native sends.
	pub fn approve_expectation(request: &AssetMultiSendRequest) -> Option<TransactionExpectation> {
		let token = request.token_address?;

		Some(TransactionExpectation {
			tx_hash: request.approve_tx_hash,
			from: request.asset_sender_address,
			target: ExpectedTarget::Call(token),
			data: approve_call_data(request.disperse_contract_address, request.total_amount()),
			value: U256::ZERO,
		})
	}

	pub fn disperse_expectation(request: &AssetMultiSendRequest) -> TransactionExpectation {
		let (recipients, amounts): (Vec<Address>, Vec<U256>) = request
			.items
			.iter()
			.map(|item| (item.wallet_address, item.amount))
			.unzip();

		let (data, value) = match request.token_address {
			Some(token) => (
				disperse_token_call_data(token, recipients, amounts),
				U256::ZERO,
			),
			None => (
				disperse_ether_call_data(recipients, amounts),
				request.total_amount(),
			),
		};

		TransactionExpectation {
			tx_hash: request.disperse_tx_hash,
			from: request.asset_sender_address,
			target: ExpectedTarget::Call(request.disperse_contract_address),
			data,
			value,
		}
	}

	async fn respond(
		&self,
		request: AssetMultiSendRequest,
	) -> Result<AssetMultiSendRequestResponse, ApiError> {
		let chain = self.projects.chain_spec(&request.project_id, request.chain_id);

		let approve = match Self::approve_expectation(&request) {
			Some(expectation) => Some(
				self.reconciler
					.reconcile(&chain, &expectation, &[approval_event()])
					.await?,
			),
			None => None,
		};

		let disperse = match approve.as_ref().map(|leg| leg.status) {
			None | Some(Status::Success) => Some(
				self.reconciler
					.reconcile(&chain, &Self::disperse_expectation(&request), &[transfer_event()])
					.await?,
			),
			Some(_) => None,
		};

		Ok(multi_send_response(request, approve, disperse))
	}
}

fn rejected(id: &RequestId, leg: &str, error: StorageError) -> ApiError {
	if let StorageError::InvalidState(reason) = &error {
		tracing::warn!(request_id = %id, leg, reason = %reason, "Rejected multi-send transaction");
	}
	error.into()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::Fixture;
	use chainreq_chain::testing::FakeTransaction;
	use chainreq_contracts::encoding::event_topic;
	use chainreq_types::api::MultiSendItemRequest;
	use chainreq_types::{Bytes, ErrorCode, RawLog};

	const TOKEN: Address = Address::repeat_byte(0x70);
	const DISPERSE: Address = Address::repeat_byte(0xd1);
	const SENDER: Address = Address::repeat_byte(0x55);

	fn service(fixture: &Fixture) -> MultiSendService {
		MultiSendService::new(
			fixture.store(),
			fixture.reconciler.clone(),
			fixture.projects.clone(),
		)
	}

	fn item(byte: u8, amount: u64) -> MultiSendItemRequest {
		MultiSendItemRequest {
			wallet_address: Address::repeat_byte(byte),
			amount: U256::from(amount),
			item_name: Some(format!("item-{}", byte)),
		}
	}

	fn body(asset_type: AssetType, token_address: Option<Address>) -> CreateAssetMultiSendRequest {
		CreateAssetMultiSendRequest {
			asset_type,
			token_address,
			disperse_contract_address: DISPERSE,
			assets: vec![item(1, 10), item(2, 20)],
			sender_address: None,
			redirect_url: None,
			arbitrary_data: None,
			approve_screen_config: None,
			disperse_screen_config: None,
		}
	}

	fn erc20_log(signature: &str, from: Address, to: Address, amount: u64) -> RawLog {
		RawLog {
			address: TOKEN,
			topics: vec![event_topic(signature), from.into_word(), to.into_word()],
			data: Bytes::from(U256::from(amount).to_be_bytes::<32>().to_vec()),
		}
	}

	fn attach(tx_hash: chainreq_types::B256) -> AttachTransactionInfoRequest {
		AttachTransactionInfoRequest {
			tx_hash,
			caller_address: SENDER,
		}
	}

	#[tokio::test]
	async fn test_token_multi_send_end_to_end() {
		let fixture = Fixture::new();
		let service = service(&fixture);

		let created = service
			.create(&fixture.project, body(AssetType::Token, Some(TOKEN)))
			.await
			.unwrap();
		assert_eq!(created.asset_type, AssetType::Token);
		assert_eq!(created.approve_status, Some(Status::Pending));
		assert_eq!(created.approve_tx.as_ref().unwrap().to, TOKEN);
		assert!(created.disperse_status.is_none());
		assert!(created.disperse_tx.is_none());

		let approve_hash = fixture.chain.mine_transaction(
			FakeTransaction::new(
				SENDER,
				Some(TOKEN),
				approve_call_data(DISPERSE, U256::from(30)),
			)
			.with_logs(vec![erc20_log(
				"Approval(address,address,uint256)",
				SENDER,
				DISPERSE,
				30,
			)]),
		);
		let approved = service
			.attach_approve_tx_info(&created.id, attach(approve_hash))
			.await
			.unwrap();
		assert_eq!(approved.approve_status, Some(Status::Success));
		assert_eq!(approved.approve_events.as_ref().unwrap().len(), 1);
		assert_eq!(approved.disperse_status, Some(Status::Pending));
		assert_eq!(approved.disperse_tx.as_ref().unwrap().to, DISPERSE);
		assert_eq!(approved.sender_address, Some(SENDER));

		let disperse_data = approved.disperse_tx.as_ref().unwrap().data.clone().unwrap();
		let disperse_hash = fixture.chain.mine_transaction(
			FakeTransaction::new(SENDER, Some(DISPERSE), disperse_data).with_logs(vec![
				erc20_log("Transfer(address,address,uint256)", SENDER, Address::repeat_byte(1), 10),
				erc20_log("Transfer(address,address,uint256)", SENDER, Address::repeat_byte(2), 20),
			]),
		);
		let done = service
			.attach_disperse_tx_info(&created.id, attach(disperse_hash))
			.await
			.unwrap();

		assert_eq!(done.approve_status, Some(Status::Success));
		assert_eq!(done.disperse_status, Some(Status::Success));
		let approve_events = done.approve_events.unwrap();
		assert_eq!(approve_events.len(), 1);
		assert_eq!(approve_events[0].signature, "Approval(address,address,uint256)");
		let disperse_events = done.disperse_events.unwrap();
		assert_eq!(disperse_events.len(), 2);
		assert!(disperse_events
			.iter()
			.all(|e| e.signature == "Transfer(address,address,uint256)"));

		assert_eq!(service.list_by_sender(&SENDER).await.unwrap().len(), 1);
		assert!(service
			.list_by_sender(&Address::repeat_byte(0x99))
			.await
			.unwrap()
			.is_empty());
	}

	#[tokio::test]
	async fn test_failed_approve_hides_disperse() {
		let fixture = Fixture::new();
		let service = service(&fixture);
		let created = service
			.create(&fixture.project, body(AssetType::Token, Some(TOKEN)))
			.await
			.unwrap();

		let approve_hash = fixture.chain.mine_transaction(FakeTransaction::new(
			SENDER,
			Some(TOKEN),
			approve_call_data(DISPERSE, U256::from(29)),
		));
		let response = service
			.attach_approve_tx_info(&created.id, attach(approve_hash))
			.await
			.unwrap();

		assert_eq!(response.approve_status, Some(Status::Failed));
		assert!(response.approve_events.is_none());
		assert!(response.disperse_status.is_none());
		assert!(response.disperse_events.is_none());
	}

	#[tokio::test]
	async fn test_native_multi_send() {
		let fixture = Fixture::new();
		let service = service(&fixture);

		let created = service
			.create(&fixture.project, body(AssetType::Native, None))
			.await
			.unwrap();
		assert_eq!(created.asset_type, AssetType::Native);
		assert!(created.approve_status.is_none());
		assert!(created.approve_tx.is_none());
		assert_eq!(created.disperse_status, Some(Status::Pending));
		assert_eq!(created.disperse_tx.as_ref().unwrap().value, U256::from(30));

		let error = service
			.attach_approve_tx_info(&created.id, attach(fixture.chain.next_transaction_hash()))
			.await
			.unwrap_err();
		assert_eq!(error.code, ErrorCode::InvalidRequestBody);

		let data = created.disperse_tx.as_ref().unwrap().data.clone().unwrap();
		let tx_hash = fixture.chain.mine_transaction(
			FakeTransaction::new(SENDER, Some(DISPERSE), data).with_value(U256::from(30)),
		);
		let done = service
			.attach_disperse_tx_info(&created.id, attach(tx_hash))
			.await
			.unwrap();
		assert_eq!(done.disperse_status, Some(Status::Success));
		assert_eq!(done.disperse_events, Some(vec![]));
	}

	#[tokio::test]
	async fn test_asset_type_cross_check() {
		let fixture = Fixture::new();
		let service = service(&fixture);

		let error = service
			.create(&fixture.project, body(AssetType::Token, None))
			.await
			.unwrap_err();
		assert_eq!(error.code, ErrorCode::InvalidRequestBody);

		let error = service
			.create(&fixture.project, body(AssetType::Native, Some(TOKEN)))
			.await
			.unwrap_err();
		assert_eq!(error.code, ErrorCode::InvalidRequestBody);

		let empty = CreateAssetMultiSendRequest {
			assets: vec![],
			..body(AssetType::Native, None)
		};
		let error = service.create(&fixture.project, empty).await.unwrap_err();
		assert_eq!(error.code, ErrorCode::InvalidRequestBody);
	}

	#[tokio::test]
	async fn test_disperse_from_other_wallet_keeps_approve_leg() {
		let fixture = Fixture::new();
		let service = service(&fixture);
		let other = Address::repeat_byte(0xbb);

		let created = service
			.create(&fixture.project, body(AssetType::Token, Some(TOKEN)))
			.await
			.unwrap();
		let approve_hash = fixture.chain.mine_transaction(FakeTransaction::new(
			SENDER,
			Some(TOKEN),
			approve_call_data(DISPERSE, U256::from(30)),
		));
		let approved = service
			.attach_approve_tx_info(&created.id, attach(approve_hash))
			.await
			.unwrap();
		assert_eq!(approved.approve_status, Some(Status::Success));

		let disperse_data = approved.disperse_tx.as_ref().unwrap().data.clone().unwrap();
		let disperse_hash = fixture.chain.mine_transaction(FakeTransaction::new(
			other,
			Some(DISPERSE),
			disperse_data,
		));
		let response = service
			.attach_disperse_tx_info(
				&created.id,
				AttachTransactionInfoRequest {
					tx_hash: disperse_hash,
					caller_address: other,
				},
			)
			.await
			.unwrap();

		assert_eq!(response.sender_address, Some(SENDER));
		assert_eq!(response.approve_status, Some(Status::Success));
		assert_eq!(response.disperse_status, Some(Status::Failed));
	}

	#[tokio::test]
	async fn test_disperse_requires_approve_first() {
		let fixture = Fixture::new();
		let service = service(&fixture);
		let created = service
			.create(&fixture.project, body(AssetType::Token, Some(TOKEN)))
			.await
			.unwrap();

		let error = service
			.attach_disperse_tx_info(&created.id, attach(fixture.chain.next_transaction_hash()))
			.await
			.unwrap_err();
		assert_eq!(error.code, ErrorCode::InvalidRequestBody);

		let response = service.get(&created.id).await.unwrap();
		assert!(response.disperse_tx.is_none());
		assert!(response.sender_address.is_none());
	}

	#[tokio::test]
	async fn test_total_overflow_is_rejected() {
		let fixture = Fixture::new();
		let service = service(&fixture);

		let mut huge = item(1, 0);
		huge.amount = U256::MAX;
		let overflowing = CreateAssetMultiSendRequest {
			assets: vec![huge.clone(), huge],
			..body(AssetType::Token, Some(TOKEN))
		};
		let error = service
			.create(&fixture.project, overflowing)
			.await
			.unwrap_err();
		assert_eq!(error.code, ErrorCode::InvalidRequestBody);
		assert!(service.list(&fixture.project.id).await.unwrap().is_empty());
	}
}
