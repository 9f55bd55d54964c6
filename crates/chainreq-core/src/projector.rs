//! Rendering of stored requests and their reconciled legs into API responses.

use crate::reconciler::{ReconciledTransaction, TransactionExpectation};
use chainreq_types::api::{
	AssetMultiSendRequestResponse, AssetSendRequestResponse, AssetType,
	ContractDeploymentRequestResponse,
	ContractFunctionCallRequestResponse, Erc20LockRequestResponse, MultiSendItemRequest,
	TransactionResponse,
};
use chainreq_types::{
	Address, AssetMultiSendRequest, AssetSendRequest, BlockchainTransactionInfo, ContractDeploymentRequest,
	ContractFunctionCallRequest, Erc20LockRequest, EventInfo, Status,
};
use chrono::{DateTime, Duration, Utc};

/// Redirect paths appended to a project's base URL when the caller did not
/// supply a template.
pub const DEPLOY_REDIRECT_PATH: &str = "/request-deploy/${id}/action";
pub const FUNCTION_CALL_REDIRECT_PATH: &str = "/request-function-call/${id}/action";
pub const SEND_REDIRECT_PATH: &str = "/request-send/${id}/action";
pub const LOCK_REDIRECT_PATH: &str = "/request-lock/${id}/action";
pub const MULTI_SEND_REDIRECT_PATH: &str = "/request-multi-send/${id}/action";

/// Transaction sub-object: the intent until the transaction is observed,
/// the observed fields afterwards.
pub fn transaction_response(
	expectation: &TransactionExpectation,
	info: Option<&BlockchainTransactionInfo>,
) -> TransactionResponse {
	match info {
		Some(info) => TransactionResponse {
			tx_hash: Some(info.hash),
			from: Some(info.from),
			to: info.to,
			data: Some(info.data.clone()),
			value: info.value,
			block_confirmations: Some(info.block_confirmations),
			timestamp: Some(info.timestamp),
		},
		None => TransactionResponse {
			tx_hash: expectation.tx_hash,
			from: expectation.from,
			to: expectation.target.to(),
			data: Some(expectation.data.clone()),
			value: expectation.value,
			block_confirmations: None,
			timestamp: None,
		},
	}
}

pub fn deployment_response(
	request: ContractDeploymentRequest,
	reconciled: ReconciledTransaction,
) -> ContractDeploymentRequestResponse {
	ContractDeploymentRequestResponse {
		id: request.id,
		alias: request.alias,
		name: request.name,
		description: request.description,
		status: reconciled.status,
		contract_id: request.contract_id.0,
		contract_deployment_data: request.contract_data,
		constructor_params: request.constructor_params,
		contract_tags: request.contract_tags.into_iter().map(|t| t.0).collect(),
		contract_implements: request.contract_implements.into_iter().map(|i| i.0).collect(),
		initial_eth_amount: request.initial_eth_amount,
		chain_id: request.chain_id,
		redirect_url: request.redirect_url,
		project_id: request.project_id,
		created_at: request.created_at,
		arbitrary_data: request.arbitrary_data,
		screen_config: request.screen_config,
		contract_address: request.contract_address,
		deployer_address: request.deployer_address,
		deploy_tx: reconciled.transaction,
		imported: request.imported,
		events: reconciled.events,
	}
}

pub fn function_call_response(
	request: ContractFunctionCallRequest,
	reconciled: ReconciledTransaction,
) -> ContractFunctionCallRequestResponse {
	ContractFunctionCallRequestResponse {
		id: request.id,
		status: reconciled.status,
		deployed_contract_id: request.deployed_contract_id,
		contract_address: request.contract_address,
		function_name: request.function_name,
		function_params: request.function_params,
		function_call_data: request.function_call_data,
		eth_amount: request.eth_amount,
		chain_id: request.chain_id,
		redirect_url: request.redirect_url,
		project_id: request.project_id,
		created_at: request.created_at,
		arbitrary_data: request.arbitrary_data,
		screen_config: request.screen_config,
		caller_address: request.caller_address,
		function_call_tx: reconciled.transaction,
		events: reconciled.events,
	}
}

/// Time at which tokens locked in a mined transaction become free.
pub fn unlocks_at(timestamp: DateTime<Utc>, duration_seconds: u64) -> Option<DateTime<Utc>> {
	let seconds = i64::try_from(duration_seconds).ok()?;
	timestamp.checked_add_signed(Duration::try_seconds(seconds)?)
}

pub fn lock_response(
	request: Erc20LockRequest,
	reconciled: ReconciledTransaction,
) -> Erc20LockRequestResponse {
	Erc20LockRequestResponse {
		id: request.id,
		project_id: request.project_id,
		status: reconciled.status,
		chain_id: request.chain_id,
		token_address: request.token_address,
		amount: request.token_amount,
		lock_duration_in_seconds: request.lock_duration_seconds,
		unlocks_at: reconciled
			.info
			.as_ref()
			.and_then(|info| unlocks_at(info.timestamp, request.lock_duration_seconds)),
		lock_contract_address: request.lock_contract_address,
		sender_address: request.token_sender_address,
		arbitrary_data: request.arbitrary_data,
		screen_config: request.screen_config,
		redirect_url: request.redirect_url,
		lock_tx: reconciled.transaction,
		created_at: request.created_at,
		events: reconciled.events,
	}
}

fn asset_type(token_address: Option<&Address>) -> AssetType {
	match token_address {
		Some(_) => AssetType::Token,
		None => AssetType::Native,
	}
}

pub fn send_response(
	request: AssetSendRequest,
	reconciled: ReconciledTransaction,
) -> AssetSendRequestResponse {
	AssetSendRequestResponse {
		id: request.id,
		project_id: request.project_id,
		status: reconciled.status,
		chain_id: request.chain_id,
		asset_type: asset_type(request.token_address.as_ref()),
		token_address: request.token_address,
		amount: request.asset_amount,
		sender_address: request.asset_sender_address,
		recipient_address: request.asset_recipient_address,
		arbitrary_data: request.arbitrary_data,
		screen_config: request.screen_config,
		redirect_url: request.redirect_url,
		send_tx: reconciled.transaction,
		created_at: request.created_at,
		events: reconciled.events,
	}
}

/// Multi-send response; a leg that does not apply (no approve for native
/// sends, no disperse before the approve succeeded) is rendered as nulls.
pub fn multi_send_response(
	request: AssetMultiSendRequest,
	approve: Option<ReconciledTransaction>,
	disperse: Option<ReconciledTransaction>,
) -> AssetMultiSendRequestResponse {
	let (approve_status, approve_tx, approve_events) = split_leg(approve);
	let (disperse_status, disperse_tx, disperse_events) = split_leg(disperse);

	AssetMultiSendRequestResponse {
		id: request.id,
		project_id: request.project_id,
		approve_status,
		disperse_status,
		chain_id: request.chain_id,
		token_address: request.token_address,
		disperse_contract_address: request.disperse_contract_address,
		asset_type: asset_type(request.token_address.as_ref()),
		items: request
			.items
			.into_iter()
			.map(|item| MultiSendItemRequest {
				wallet_address: item.wallet_address,
				amount: item.amount,
				item_name: item.item_name,
			})
			.collect(),
		sender_address: request.asset_sender_address,
		arbitrary_data: request.arbitrary_data,
		approve_screen_config: request.approve_screen_config,
		disperse_screen_config: request.disperse_screen_config,
		redirect_url: request.redirect_url,
		approve_tx,
		disperse_tx,
		created_at: request.created_at,
		approve_events,
		disperse_events,
	}
}

type LegFields = (
	Option<Status>,
	Option<TransactionResponse>,
	Option<Vec<EventInfo>>,
);

fn split_leg(leg: Option<ReconciledTransaction>) -> LegFields {
	match leg {
		Some(leg) => (Some(leg.status), Some(leg.transaction), leg.events),
		None => (None, None, None),
	}
}
