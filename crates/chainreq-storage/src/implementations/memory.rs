//! In-memory storage implementation.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};

/// In-memory storage backed by a concurrent hash map.
///
/// Contents are lost when the process exits.
#[derive(Clone, Default)]
pub struct MemoryStorage {
	data: DashMap<String, Vec<u8>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self {
			data: DashMap::new(),
		}
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.data
			.get(key)
			.map(|entry| entry.value().clone())
			.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.data.insert(key.to_string(), value);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.data.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(self.data.contains_key(key))
	}

	async fn compare_and_swap(
		&self,
		key: &str,
		expected: Option<&[u8]>,
		value: Vec<u8>,
	) -> Result<bool, StorageError> {
		// The entry guard holds the shard lock until the swap is done
		match (self.data.entry(key.to_string()), expected) {
			(Entry::Vacant(entry), None) => {
				entry.insert(value);
				Ok(true)
			}
			(Entry::Occupied(mut entry), Some(expected)) if entry.get().as_slice() == expected => {
				entry.insert(value);
				Ok(true)
			}
			_ => Ok(false),
		}
	}

	async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		Ok(self
			.data
			.iter()
			.filter(|entry| entry.key().starts_with(prefix))
			.map(|entry| entry.key().clone())
			.collect())
	}
}

/// Factory function to create an in-memory storage backend.
///
/// The memory backend takes no configuration.
pub fn create_storage(_config: &toml::Value) -> Box<dyn StorageInterface> {
	Box::new(MemoryStorage::new())
}
