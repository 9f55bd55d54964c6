//! Storage module for the chainreq service.
//!
//! This module provides a key-value storage abstraction with pluggable
//! backends (in-memory or file based) and the typed stores built on top of
//! it: the per-kind request store and the imported decorator store.
//!
//! Backends expose a compare-and-swap primitive. Every mutation that must
//! happen at most once (attaching a transaction hash, reserving an alias)
//! goes through it, so concurrent writers cannot overwrite each other.

use async_trait::async_trait;
use chainreq_types::ApiError;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub mod decorators;
pub mod requests;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

pub use decorators::ImportedDecoratorStore;
pub use requests::{RequestRecord, RequestStore, SingleTransactionRecord};

/// Number of read-modify-write rounds attempted before giving up on a key
/// under heavy contention.
const MAX_UPDATE_ATTEMPTS: usize = 16;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// A transaction hash field that may only be set once is already set.
	#[error("Transaction info already set: {0}")]
	TxInfoAlreadySet(String),
	/// The record is not in a state that allows the requested change.
	#[error("Invalid state: {0}")]
	InvalidState(String),
	/// A unique key (such as a deployment alias) is already taken.
	#[error("Already in use: {0}")]
	AlreadyInUse(String),
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
}

impl From<StorageError> for ApiError {
	fn from(error: StorageError) -> Self {
		use chainreq_types::ErrorCode;

		match error {
			StorageError::NotFound => ApiError::not_found("Resource not found"),
			StorageError::TxInfoAlreadySet(message) => ApiError::tx_info_already_set(message),
			StorageError::InvalidState(message) => ApiError::invalid_request(message),
			StorageError::AlreadyInUse(message) => {
				ApiError::new(ErrorCode::AliasAlreadyInUse, message)
			}
			StorageError::Serialization(message) | StorageError::Backend(message) => {
				ApiError::new(ErrorCode::StorageError, message)
			}
		}
	}
}

/// Trait defining the low-level interface for storage backends.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes, replacing any previous value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Atomically replaces the value of `key` with `value` if its current
	/// value equals `expected` (`None` meaning the key is absent).
	///
	/// Returns whether the swap happened.
	async fn compare_and_swap(
		&self,
		key: &str,
		expected: Option<&[u8]>,
		value: Vec<u8>,
	) -> Result<bool, StorageError>;

	/// Lists all keys starting with `prefix`.
	async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// High-level storage service that provides typed operations.
///
/// Values are stored as JSON under `namespace:id` keys.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	/// Stores a serializable value, replacing any previous one.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend
			.set_bytes(&Self::key(namespace, id), bytes)
			.await
	}

	/// Stores a value only if nothing is stored under the key yet.
	///
	/// Returns whether the value was stored.
	pub async fn insert_if_absent<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<bool, StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend
			.compare_and_swap(&Self::key(namespace, id), None, bytes)
			.await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Retrieves a value, mapping a missing key to `None`.
	pub async fn find<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Option<T>, StorageError> {
		match self.retrieve(namespace, id).await {
			Ok(value) => Ok(Some(value)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Applies `apply` to the stored value and writes the result back with a
	/// compare-and-swap, retrying when another writer got in between.
	///
	/// If `apply` fails nothing is written and its error is returned.
	pub async fn update<T, F>(&self, namespace: &str, id: &str, mut apply: F) -> Result<T, StorageError>
	where
		T: Serialize + DeserializeOwned + Send,
		F: FnMut(&mut T) -> Result<(), StorageError> + Send,
	{
		let key = Self::key(namespace, id);

		for _ in 0..MAX_UPDATE_ATTEMPTS {
			let current = self.backend.get_bytes(&key).await?;
			let mut value: T = serde_json::from_slice(&current)
				.map_err(|e| StorageError::Serialization(e.to_string()))?;

			apply(&mut value)?;

			let updated =
				serde_json::to_vec(&value).map_err(|e| StorageError::Serialization(e.to_string()))?;

			if self
				.backend
				.compare_and_swap(&key, Some(&current), updated)
				.await?
			{
				return Ok(value);
			}

			tracing::debug!(key = %key, "Concurrent update detected, retrying");
		}

		Err(StorageError::Backend(format!(
			"Gave up updating {} after {} attempts",
			key, MAX_UPDATE_ATTEMPTS
		)))
	}

	/// Lists every value stored in a namespace.
	pub async fn list<T: DeserializeOwned>(&self, namespace: &str) -> Result<Vec<T>, StorageError> {
		let prefix = Self::key(namespace, "");
		let mut values = Vec::new();

		for key in self.backend.keys(&prefix).await? {
			match self.backend.get_bytes(&key).await {
				Ok(bytes) => values.push(
					serde_json::from_slice(&bytes)
						.map_err(|e| StorageError::Serialization(e.to_string()))?,
				),
				// Removed between listing and reading
				Err(StorageError::NotFound) => continue,
				Err(e) => return Err(e),
			}
		}

		Ok(values)
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	/// Checks whether a value is stored under the key.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}
}
