//! Contract knowledge for the chainreq service.
//!
//! This crate turns compiled artifacts and human-written manifests into
//! contract decorators, keeps the registry of deployable contracts and
//! interfaces, encodes call data from JSON arguments and decodes event logs
//! emitted by reconciled transactions. Contracts imported from the chain get
//! decorators synthesized from their runtime bytecode.

use chainreq_storage::StorageError;
use chainreq_types::{ApiError, ErrorCode};
use thiserror::Error;

pub mod builder;
pub mod encoding;
pub mod events;
pub mod interfaces;
pub mod introspection;
pub mod params;
pub mod predefined;
pub mod registry;

pub use builder::DecoratorBuilder;
pub use events::EventLogDecoder;
pub use registry::ContractDecoderRegistry;

/// Errors that can occur while building decorators or handling ABI data.
#[derive(Debug, Error)]
pub enum ContractError {
	#[error("Contract not found: {0}")]
	NotFound(String),
	#[error("Contract interface not found: {0}")]
	InterfaceNotFound(String),
	#[error("Contract decorator incompatible: {0}")]
	Incompatible(String),
	#[error("Contract binary mismatch: {0}")]
	BinaryMismatch(String),
	/// Artifact and manifest do not describe the same contract.
	#[error("Invalid decorator: {0}")]
	InvalidDecorator(String),
	#[error("Invalid arguments: {0}")]
	InvalidArguments(String),
	#[error("ABI decoding failed: {0}")]
	Decoding(String),
	#[error("IO error: {0}")]
	Io(String),
	#[error(transparent)]
	Storage(#[from] StorageError),
}

impl From<ContractError> for ApiError {
	fn from(error: ContractError) -> Self {
		if let ContractError::Storage(inner) = error {
			return inner.into();
		}

		let code = match &error {
			ContractError::NotFound(_) => ErrorCode::ContractNotFound,
			ContractError::InterfaceNotFound(_) => ErrorCode::ContractInterfaceNotFound,
			ContractError::Incompatible(_) | ContractError::InvalidDecorator(_) => {
				ErrorCode::ContractDecoratorIncompatible
			}
			ContractError::BinaryMismatch(_) => ErrorCode::ContractBinaryMismatch,
			ContractError::InvalidArguments(_) => ErrorCode::InvalidRequestBody,
			ContractError::Decoding(_) => ErrorCode::AbiDecodingFailed,
			ContractError::Io(_) | ContractError::Storage(_) => ErrorCode::StorageError,
		};
		ApiError::new(code, error.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_error_codes() {
		let cases = [
			(
				ContractError::NotFound("x".into()),
				ErrorCode::ContractNotFound,
			),
			(
				ContractError::InterfaceNotFound("x".into()),
				ErrorCode::ContractInterfaceNotFound,
			),
			(
				ContractError::BinaryMismatch("x".into()),
				ErrorCode::ContractBinaryMismatch,
			),
			(
				ContractError::InvalidArguments("x".into()),
				ErrorCode::InvalidRequestBody,
			),
			(
				ContractError::Storage(StorageError::AlreadyInUse("alias".into())),
				ErrorCode::AliasAlreadyInUse,
			),
		];

		for (error, code) in cases {
			assert_eq!(ApiError::from(error).code, code);
		}
	}
}
