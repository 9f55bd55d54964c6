//! API types for the chainreq HTTP API.
//!
//! Request bodies and responses use snake_case keys. Amounts travel as
//! decimal strings.

use crate::{
	Address, Bytes, ChainId, ContractDecorator, ContractInterface, ErrorCode, EventInfo,
	InterfaceId, ProjectId, RequestId, ScreenConfig, Status, B256, U256,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Function or constructor argument: a Solidity type and a JSON value.
/// Tuples carry a list of nested arguments as their value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionArgument {
	#[serde(rename = "type")]
	pub argument_type: String,
	pub value: serde_json::Value,
}

/// Body of `POST /v1/deploy`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateContractDeploymentRequest {
	#[validate(length(min = 1, max = 256))]
	pub alias: String,
	#[validate(length(min = 1, max = 256))]
	pub contract_id: String,
	#[serde(default)]
	pub constructor_params: Vec<FunctionArgument>,
	pub deployer_address: Option<Address>,
	#[serde(default, with = "u256_serde")]
	pub initial_eth_amount: U256,
	#[validate(length(max = 4096))]
	pub redirect_url: Option<String>,
	pub arbitrary_data: Option<serde_json::Value>,
	pub screen_config: Option<ScreenConfig>,
}

/// Body of `POST /v1/function-call`. Exactly one of the three contract
/// identifiers must be present.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateContractFunctionCallRequest {
	pub deployed_contract_id: Option<RequestId>,
	pub deployed_contract_alias: Option<String>,
	pub contract_address: Option<Address>,
	#[validate(length(min = 1, max = 256))]
	pub function_name: String,
	#[serde(default)]
	pub function_params: Vec<FunctionArgument>,
	#[serde(default, with = "u256_serde")]
	pub eth_amount: U256,
	pub caller_address: Option<Address>,
	#[validate(length(max = 4096))]
	pub redirect_url: Option<String>,
	pub arbitrary_data: Option<serde_json::Value>,
	pub screen_config: Option<ScreenConfig>,
}

/// Body of `POST /v1/lock`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateErc20LockRequest {
	pub token_address: Address,
	#[serde(with = "u256_serde")]
	pub amount: U256,
	pub lock_duration_in_seconds: u64,
	pub lock_contract_address: Address,
	pub sender_address: Option<Address>,
	#[validate(length(max = 4096))]
	pub redirect_url: Option<String>,
	pub arbitrary_data: Option<serde_json::Value>,
	pub screen_config: Option<ScreenConfig>,
}

/// Body of `POST /v1/send`. `token_address` is required for `TOKEN`
/// sends and forbidden for `NATIVE` ones.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAssetSendRequest {
	pub asset_type: AssetType,
	pub token_address: Option<Address>,
	#[serde(with = "u256_serde")]
	pub amount: U256,
	pub sender_address: Option<Address>,
	pub recipient_address: Address,
	#[validate(length(max = 4096))]
	pub redirect_url: Option<String>,
	pub arbitrary_data: Option<serde_json::Value>,
	pub screen_config: Option<ScreenConfig>,
}

/// Asset sent by a send or multi-send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetType {
	Native,
	Token,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiSendItemRequest {
	pub wallet_address: Address,
	#[serde(with = "u256_serde")]
	pub amount: U256,
	pub item_name: Option<String>,
}

/// Body of `POST /v1/multi-send`. `token_address` is required for
/// `TOKEN` sends and forbidden for `NATIVE` ones.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAssetMultiSendRequest {
	pub asset_type: AssetType,
	pub token_address: Option<Address>,
	pub disperse_contract_address: Address,
	#[validate(length(min = 1))]
	pub assets: Vec<MultiSendItemRequest>,
	pub sender_address: Option<Address>,
	#[validate(length(max = 4096))]
	pub redirect_url: Option<String>,
	pub arbitrary_data: Option<serde_json::Value>,
	pub approve_screen_config: Option<ScreenConfig>,
	pub disperse_screen_config: Option<ScreenConfig>,
}

/// Body of the attach transaction info endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachTransactionInfoRequest {
	pub tx_hash: B256,
	pub caller_address: Address,
}

/// Body of `POST /v1/import-smart-contract`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ImportContractRequest {
	#[validate(length(min = 1, max = 256))]
	pub alias: String,
	pub contract_id: Option<String>,
	pub contract_address: Address,
	#[validate(length(max = 4096))]
	pub redirect_url: Option<String>,
	pub arbitrary_data: Option<serde_json::Value>,
	pub screen_config: Option<ScreenConfig>,
}

/// Body of the add/remove/set interfaces endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportedContractInterfacesRequest {
	pub interfaces: Vec<InterfaceId>,
}

/// Transaction sub-object of a request response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionResponse {
	pub tx_hash: Option<B256>,
	pub from: Option<Address>,
	pub to: Address,
	pub data: Option<Bytes>,
	#[serde(with = "u256_serde")]
	pub value: U256,
	pub block_confirmations: Option<u64>,
	pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDeploymentRequestResponse {
	pub id: RequestId,
	pub alias: String,
	pub name: Option<String>,
	pub description: Option<String>,
	pub status: Status,
	pub contract_id: String,
	pub contract_deployment_data: Bytes,
	pub constructor_params: serde_json::Value,
	pub contract_tags: Vec<String>,
	pub contract_implements: Vec<String>,
	#[serde(with = "u256_serde")]
	pub initial_eth_amount: U256,
	pub chain_id: ChainId,
	pub redirect_url: String,
	pub project_id: ProjectId,
	pub created_at: DateTime<Utc>,
	pub arbitrary_data: Option<serde_json::Value>,
	pub screen_config: ScreenConfig,
	pub contract_address: Option<Address>,
	pub deployer_address: Option<Address>,
	pub deploy_tx: TransactionResponse,
	pub imported: bool,
	pub events: Option<Vec<EventInfo>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractFunctionCallRequestResponse {
	pub id: RequestId,
	pub status: Status,
	pub deployed_contract_id: Option<RequestId>,
	pub contract_address: Address,
	pub function_name: String,
	pub function_params: serde_json::Value,
	pub function_call_data: Bytes,
	#[serde(with = "u256_serde")]
	pub eth_amount: U256,
	pub chain_id: ChainId,
	pub redirect_url: String,
	pub project_id: ProjectId,
	pub created_at: DateTime<Utc>,
	pub arbitrary_data: Option<serde_json::Value>,
	pub screen_config: ScreenConfig,
	pub caller_address: Option<Address>,
	pub function_call_tx: TransactionResponse,
	pub events: Option<Vec<EventInfo>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Erc20LockRequestResponse {
	pub id: RequestId,
	pub project_id: ProjectId,
	pub status: Status,
	pub chain_id: ChainId,
	pub token_address: Address,
	#[serde(with = "u256_serde")]
	pub amount: U256,
	pub lock_duration_in_seconds: u64,
	pub unlocks_at: Option<DateTime<Utc>>,
	pub lock_contract_address: Address,
	pub sender_address: Option<Address>,
	pub arbitrary_data: Option<serde_json::Value>,
	pub screen_config: ScreenConfig,
	pub redirect_url: String,
	pub lock_tx: TransactionResponse,
	pub created_at: DateTime<Utc>,
	pub events: Option<Vec<EventInfo>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSendRequestResponse {
	pub id: RequestId,
	pub project_id: ProjectId,
	pub status: Status,
	pub chain_id: ChainId,
	pub token_address: Option<Address>,
	pub asset_type: AssetType,
	#[serde(with = "u256_serde")]
	pub amount: U256,
	pub sender_address: Option<Address>,
	pub recipient_address: Address,
	pub arbitrary_data: Option<serde_json::Value>,
	pub screen_config: ScreenConfig,
	pub redirect_url: String,
	pub send_tx: TransactionResponse,
	pub created_at: DateTime<Utc>,
	pub events: Option<Vec<EventInfo>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMultiSendRequestResponse {
	pub id: RequestId,
	pub project_id: ProjectId,
	pub approve_status: Option<Status>,
	pub disperse_status: Option<Status>,
	pub chain_id: ChainId,
	pub token_address: Option<Address>,
	pub disperse_contract_address: Address,
	pub asset_type: AssetType,
	pub items: Vec<MultiSendItemRequest>,
	pub sender_address: Option<Address>,
	pub arbitrary_data: Option<serde_json::Value>,
	pub approve_screen_config: ScreenConfig,
	pub disperse_screen_config: ScreenConfig,
	pub redirect_url: String,
	pub approve_tx: Option<TransactionResponse>,
	pub disperse_tx: Option<TransactionResponse>,
	pub created_at: DateTime<Utc>,
	pub approve_events: Option<Vec<EventInfo>>,
	pub disperse_events: Option<Vec<EventInfo>>,
}

/// List wrapper shared by the by-project and by-sender endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestsResponse<T> {
	pub requests: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportPreviewResponse {
	pub decorator: ContractDecorator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedInterfacesResponse {
	pub manifests: Vec<ContractInterface>,
	pub best_matching_interfaces: Vec<InterfaceId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractInterfacesResponse {
	pub interfaces: Vec<ContractInterface>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDecoratorsResponse {
	pub decorators: Vec<ContractDecorator>,
}

/// API error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error_code: ErrorCode,
	/// Human-readable description
	pub message: String,
}

/// Serde helper for U256 as decimal strings. Deserialization also accepts
/// `0x` hex strings and plain JSON integers.
pub mod u256_serde {
	use alloy::primitives::U256;
	use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Text(String),
		Number(u64),
	}

	pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		value.to_string().serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
	where
		D: Deserializer<'de>,
	{
		match Raw::deserialize(deserializer)? {
			Raw::Text(s) => s.trim().parse::<U256>().map_err(D::Error::custom),
			Raw::Number(n) => Ok(U256::from(n)),
		}
	}
}
