//! Observed on-chain transaction state.

use crate::{Address, Bytes, RawLog, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mined transaction as seen by the chain reader, combined from the
/// transaction, its receipt and the including block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockchainTransactionInfo {
	pub hash: B256,
	pub from: Address,
	/// Call target; the zero address for contract creations.
	pub to: Address,
	pub deployed_contract_address: Option<Address>,
	pub data: Bytes,
	pub value: U256,
	pub block_number: u64,
	pub block_confirmations: u64,
	pub timestamp: DateTime<Utc>,
	pub success: bool,
	pub logs: Vec<RawLog>,
}

impl BlockchainTransactionInfo {
	pub fn hash_matches(&self, expected: &B256) -> bool {
		&self.hash == expected
	}

	/// A missing expected sender matches any sender.
	pub fn from_matches(&self, expected: Option<&Address>) -> bool {
		expected.map_or(true, |address| &self.from == address)
	}

	pub fn to_matches(&self, expected: &Address) -> bool {
		&self.to == expected
	}

	pub fn data_matches(&self, expected: &Bytes) -> bool {
		&self.data == expected
	}

	pub fn value_matches(&self, expected: &U256) -> bool {
		&self.value == expected
	}
}
