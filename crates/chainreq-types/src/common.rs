//! Common identifiers and value types shared by every request kind.

use serde::{Deserialize, Serialize};
use std::fmt;

pub use alloy::primitives::{Address, Bytes, B256, U256};

/// Identifier of a stored request, generated at creation.
pub type RequestId = uuid::Uuid;

/// Identifier of the project (tenant) owning a request.
pub type ProjectId = uuid::Uuid;

/// Numeric EVM chain identifier.
pub type ChainId = u64;

macro_rules! string_id {
	($(#[$meta:meta])* $name:ident) => {
		$(#[$meta])*
		#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(pub String);

		impl $name {
			pub fn new(value: impl Into<String>) -> Self {
				Self(value.into())
			}

			pub fn as_str(&self) -> &str {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(&self.0)
			}
		}

		impl From<&str> for $name {
			fn from(value: &str) -> Self {
				Self(value.to_string())
			}
		}
	};
}

string_id!(
	/// Identifier of a contract decorator, e.g. `examples.exampleContract`.
	ContractId
);

string_id!(
	/// Free-form tag attached to a contract decorator.
	ContractTag
);

string_id!(
	/// Identifier of a contract interface, e.g. `openzeppelin.erc20`.
	InterfaceId
);

impl ContractId {
	/// Contract id assigned to contracts imported without a known decorator.
	pub fn imported(address: &Address, chain_id: ChainId) -> Self {
		Self(format!("imported-{}-{}", address_hex(address), chain_id))
	}

	pub fn is_imported(&self) -> bool {
		self.0.starts_with("imported-")
	}
}

/// Caller-visible status of a transaction leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
	Pending,
	Success,
	Failed,
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Status::Pending => write!(f, "PENDING"),
			Status::Success => write!(f, "SUCCESS"),
			Status::Failed => write!(f, "FAILED"),
		}
	}
}

/// Messages shown to the wallet user before and after the action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenConfig {
	pub before_action_message: Option<String>,
	pub after_action_message: Option<String>,
}

/// Lowercase `0x`-prefixed hex rendering of an address.
pub fn address_hex(address: &Address) -> String {
	format!("0x{}", hex::encode(address.as_slice()))
}
