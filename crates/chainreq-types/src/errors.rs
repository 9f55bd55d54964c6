//! Error taxonomy exposed to API clients.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Machine readable error codes. The set is closed; the HTTP status of a
/// response is derived from the code alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	ResourceNotFound,
	TxInfoAlreadySet,
	InvalidRequestBody,
	ContractNotFound,
	ContractNotDeployed,
	ContractBinaryMismatch,
	ContractInterfaceNotFound,
	ContractDecoratorIncompatible,
	AliasAlreadyInUse,
	AbiDecodingFailed,
	NonExistentApiKey,
	BlockchainReadError,
	InvalidChainId,
	StorageError,
}

impl ErrorCode {
	pub fn http_status(&self) -> u16 {
		match self {
			ErrorCode::ResourceNotFound
			| ErrorCode::ContractNotFound
			| ErrorCode::ContractInterfaceNotFound => 404,
			ErrorCode::TxInfoAlreadySet
			| ErrorCode::InvalidRequestBody
			| ErrorCode::ContractNotDeployed
			| ErrorCode::ContractBinaryMismatch
			| ErrorCode::ContractDecoratorIncompatible
			| ErrorCode::AliasAlreadyInUse
			| ErrorCode::AbiDecodingFailed
			| ErrorCode::InvalidChainId => 400,
			ErrorCode::NonExistentApiKey => 401,
			ErrorCode::BlockchainReadError => 502,
			ErrorCode::StorageError => 500,
		}
	}

	/// Whether the caller may retry the same call later.
	pub fn is_retryable(&self) -> bool {
		matches!(self, ErrorCode::BlockchainReadError)
	}
}

impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let value = serde_json::to_value(self).map_err(|_| fmt::Error)?;
		f.write_str(value.as_str().unwrap_or_default())
	}
}

/// Error returned by request services, carrying a code and a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
	pub code: ErrorCode,
	pub message: String,
}

impl ApiError {
	pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
		Self {
			code,
			message: message.into(),
		}
	}

	pub fn not_found(message: impl Into<String>) -> Self {
		Self::new(ErrorCode::ResourceNotFound, message)
	}

	pub fn invalid_request(message: impl Into<String>) -> Self {
		Self::new(ErrorCode::InvalidRequestBody, message)
	}

	pub fn tx_info_already_set(message: impl Into<String>) -> Self {
		Self::new(ErrorCode::TxInfoAlreadySet, message)
	}
}
