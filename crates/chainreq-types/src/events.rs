//! Raw and decoded event logs.

use crate::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};

/// Log entry as emitted in a transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLog {
	pub address: Address,
	pub topics: Vec<B256>,
	pub data: Bytes,
}

/// Whether an argument carries its decoded value or only a topic hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventArgumentType {
	Value,
	Hash,
}

/// Decoded event argument.
///
/// Indexed arguments of dynamic or reference type are only available as the
/// keccak hash stored in the topic; those are reported with `type = HASH`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventArgument {
	pub name: String,
	#[serde(rename = "type")]
	pub argument_type: EventArgumentType,
	pub value: Option<serde_json::Value>,
	pub hash: Option<B256>,
}

impl EventArgument {
	pub fn value(name: impl Into<String>, value: serde_json::Value) -> Self {
		Self {
			name: name.into(),
			argument_type: EventArgumentType::Value,
			value: Some(value),
			hash: None,
		}
	}

	pub fn hash(name: impl Into<String>, hash: B256) -> Self {
		Self {
			name: name.into(),
			argument_type: EventArgumentType::Hash,
			value: None,
			hash: Some(hash),
		}
	}
}

/// Decoded event with arguments in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
	pub signature: String,
	pub arguments: Vec<EventArgument>,
}
