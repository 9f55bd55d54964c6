//! Stored request records.
//!
//! Every request kind carries the same base fields (id, project, chain,
//! redirect URL, arbitrary data, screen config, creation time) next to its
//! kind-specific intent. Transaction hash fields start empty and are set at
//! most once by the attach operations of the request store.

use crate::api::u256_serde;
use crate::{
	Address, Bytes, ChainId, ContractId, ContractTag, InterfaceId, ProjectId, RequestId,
	ScreenConfig, B256, U256,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to deploy (or a record of an imported) contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDeploymentRequest {
	pub id: RequestId,
	pub alias: String,
	pub name: Option<String>,
	pub description: Option<String>,
	pub contract_id: ContractId,
	/// Creation bytecode followed by the encoded constructor arguments.
	pub contract_data: Bytes,
	pub constructor_params: serde_json::Value,
	pub contract_tags: Vec<ContractTag>,
	pub contract_implements: Vec<InterfaceId>,
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
	pub tx_hash: Option<B256>,
	pub imported: bool,
}

/// Request to call a function on an already deployed contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractFunctionCallRequest {
	pub id: RequestId,
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
	pub tx_hash: Option<B256>,
}

/// Request to lock ERC20 tokens in a lock contract for a duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Erc20LockRequest {
	pub id: RequestId,
	pub project_id: ProjectId,
	pub chain_id: ChainId,
	pub redirect_url: String,
	pub token_address: Address,
	#[serde(with = "u256_serde")]
	pub token_amount: U256,
	pub lock_duration_seconds: u64,
	pub lock_contract_address: Address,
	pub token_sender_address: Option<Address>,
	pub arbitrary_data: Option<serde_json::Value>,
	pub screen_config: ScreenConfig,
	pub created_at: DateTime<Utc>,
	pub tx_hash: Option<B256>,
}

/// Request to send native or token assets to a single recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSendRequest {
	pub id: RequestId,
	pub project_id: ProjectId,
	pub chain_id: ChainId,
	pub redirect_url: String,
	/// Token to send; `None` sends the native asset.
	pub token_address: Option<Address>,
	#[serde(with = "u256_serde")]
	pub asset_amount: U256,
	pub asset_sender_address: Option<Address>,
	pub asset_recipient_address: Address,
	pub arbitrary_data: Option<serde_json::Value>,
	pub screen_config: ScreenConfig,
	pub created_at: DateTime<Utc>,
	pub tx_hash: Option<B256>,
}

/// Single recipient of a multi-send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiSendItem {
	pub wallet_address: Address,
	#[serde(with = "u256_serde")]
	pub amount: U256,
	pub item_name: Option<String>,
}

/// Request to send native or token assets to several recipients through a
/// disperse contract. Token sends have two legs (approve, then disperse).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMultiSendRequest {
	pub id: RequestId,
	pub project_id: ProjectId,
	pub chain_id: ChainId,
	pub redirect_url: String,
	/// Token to send; `None` sends the native asset.
	pub token_address: Option<Address>,
	pub disperse_contract_address: Address,
	pub items: Vec<MultiSendItem>,
	pub asset_sender_address: Option<Address>,
	pub approve_tx_hash: Option<B256>,
	pub disperse_tx_hash: Option<B256>,
	pub arbitrary_data: Option<serde_json::Value>,
	pub approve_screen_config: ScreenConfig,
	pub disperse_screen_config: ScreenConfig,
	pub created_at: DateTime<Utc>,
}

impl AssetMultiSendRequest {
	/// Sum of all item amounts, `None` when it does not fit in 256 bits.
	pub fn checked_total_amount(&self) -> Option<U256> {
		self.items
			.iter()
			.try_fold(U256::ZERO, |total, item| total.checked_add(item.amount))
	}

	/// Sum of all item amounts. Stored requests were checked at creation,
	/// so this only saturates for hand-built records.
	pub fn total_amount(&self) -> U256 {
		self.checked_total_amount().unwrap_or(U256::MAX)
	}
}

/// Discriminant of the request kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
	ContractDeployment,
	ContractFunctionCall,
	Erc20Lock,
	AssetSend,
	AssetMultiSend,
}

impl RequestKind {
	/// Storage namespace holding records of this kind.
	pub fn namespace(&self) -> &'static str {
		match self {
			RequestKind::ContractDeployment => "contract-deployment",
			RequestKind::ContractFunctionCall => "contract-function-call",
			RequestKind::Erc20Lock => "erc20-lock",
			RequestKind::AssetSend => "asset-send",
			RequestKind::AssetMultiSend => "asset-multi-send",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use uuid::Uuid;

	fn multi_send(amounts: &[u64]) -> AssetMultiSendRequest {
		AssetMultiSendRequest {
			id: Uuid::new_v4(),
			project_id: Uuid::new_v4(),
			chain_id: 1,
			redirect_url: "https://example.com".to_string(),
			token_address: None,
			disperse_contract_address: Address::repeat_byte(1),
			items: amounts
				.iter()
				.map(|amount| MultiSendItem {
					wallet_address: Address::repeat_byte(2),
					amount: U256::from(*amount),
					item_name: None,
				})
				.collect(),
			asset_sender_address: None,
			approve_tx_hash: None,
			disperse_tx_hash: None,
			arbitrary_data: None,
			approve_screen_config: ScreenConfig::default(),
			disperse_screen_config: ScreenConfig::default(),
			created_at: Utc::now(),
		}
	}

	#[test]
	fn test_total_amount() {
		assert_eq!(multi_send(&[10, 20, 30]).total_amount(), U256::from(60));
		assert_eq!(multi_send(&[]).total_amount(), U256::ZERO);

		let mut overflowing = multi_send(&[1]);
		overflowing.items[0].amount = U256::MAX;
		overflowing.items.push(overflowing.items[0].clone());
		assert_eq!(overflowing.checked_total_amount(), None);
		assert_eq!(multi_send(&[10, 20]).checked_total_amount(), Some(U256::from(30)));
	}

	#[test]
	fn test_amounts_serialize_as_strings() {
		let json = serde_json::to_value(multi_send(&[1])).unwrap();
		assert_eq!(json["items"][0]["amount"], "1");

		let parsed: AssetMultiSendRequest = serde_json::from_value(json).unwrap();
		assert_eq!(parsed.total_amount(), U256::from(1));
	}

	#[test]
	fn test_namespaces_are_distinct() {
		let kinds = [
			RequestKind::ContractDeployment,
			RequestKind::ContractFunctionCall,
			RequestKind::Erc20Lock,
			RequestKind::AssetSend,
			RequestKind::AssetMultiSend,
		];
		let namespaces: std::collections::HashSet<_> =
			kinds.iter().map(|kind| kind.namespace()).collect();
		assert_eq!(namespaces.len(), kinds.len());
	}
}
