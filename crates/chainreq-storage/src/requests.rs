//! Typed request store.
//!
//! One `RequestStore<T>` exists per request kind, each backed by its own
//! namespace in the shared `StorageService`. Transaction hash fields are
//! written through `StorageService::update`, whose compare-and-swap loop
//! guarantees that of two concurrent attach calls exactly one succeeds.

use crate::{StorageError, StorageService};
use chainreq_types::{
	Address, AssetMultiSendRequest, AssetSendRequest, ContractDeploymentRequest, ContractFunctionCallRequest,
	ContractTag, Erc20LockRequest, InterfaceId, ProjectId, RequestId, RequestKind, B256,
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;

/// A request kind that can be kept in a `RequestStore`.
pub trait RequestRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
	const KIND: RequestKind;

	fn id(&self) -> RequestId;

	fn project_id(&self) -> ProjectId;

	fn created_at(&self) -> DateTime<Utc>;

	/// Key that must be unique among all records of this kind, if any.
	fn unique_key(&self) -> Option<String> {
		None
	}
}

/// A request kind with a single transaction leg.
pub trait SingleTransactionRecord: RequestRecord {
	fn tx_hash(&self) -> Option<B256>;

	/// Records the submitted hash. The caller becomes the expected sender
	/// only when none was declared at creation.
	fn attach_tx_info(&mut self, tx_hash: B256, caller: Address);
}

/// Persists request intent and the transaction hashes attached later on.
pub struct RequestStore<T> {
	storage: Arc<StorageService>,
	_kind: PhantomData<fn() -> T>,
}

impl<T> Clone for RequestStore<T> {
	fn clone(&self) -> Self {
		Self {
			storage: self.storage.clone(),
			_kind: PhantomData,
		}
	}
}

impl<T: RequestRecord> RequestStore<T> {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			_kind: PhantomData,
		}
	}

	fn namespace() -> &'static str {
		T::KIND.namespace()
	}

	fn unique_namespace() -> String {
		format!("{}-unique", T::KIND.namespace())
	}

	/// Persists a new request.
	///
	/// A record with a unique key first reserves that key; if another record
	/// already holds it the store fails with `AlreadyInUse`.
	pub async fn store(&self, request: T) -> Result<T, StorageError> {
		let id = request.id().to_string();
		let unique_key = request.unique_key();

		if let Some(key) = &unique_key {
			let reserved = self
				.storage
				.insert_if_absent(&Self::unique_namespace(), key, &request.id())
				.await?;
			if !reserved {
				return Err(StorageError::AlreadyInUse(key.clone()));
			}
		}

		let inserted = match self
			.storage
			.insert_if_absent(Self::namespace(), &id, &request)
			.await
		{
			Ok(inserted) => inserted,
			Err(e) => {
				self.release_unique_key(unique_key.as_deref()).await;
				return Err(e);
			}
		};

		if !inserted {
			self.release_unique_key(unique_key.as_deref()).await;
			return Err(StorageError::Backend(format!(
				"Request id {} is already taken",
				id
			)));
		}

		tracing::info!(
			request_id = %id,
			kind = Self::namespace(),
			"Stored request"
		);

		Ok(request)
	}

	async fn release_unique_key(&self, key: Option<&str>) {
		if let Some(key) = key {
			if let Err(e) = self.storage.remove(&Self::unique_namespace(), key).await {
				tracing::warn!(key = %key, error = %e, "Failed to release unique key");
			}
		}
	}

	pub async fn get_by_id(&self, id: &RequestId) -> Result<Option<T>, StorageError> {
		self.storage.find(Self::namespace(), &id.to_string()).await
	}

	/// Looks a record up by the key returned from `RequestRecord::unique_key`.
	pub async fn get_by_unique_key(&self, key: &str) -> Result<Option<T>, StorageError> {
		match self
			.storage
			.find::<RequestId>(&Self::unique_namespace(), key)
			.await?
		{
			Some(id) => self.get_by_id(&id).await,
			None => Ok(None),
		}
	}

	/// Returns the project's requests matching `predicate`, oldest first.
	pub async fn get_all_by_project_id<F>(
		&self,
		project_id: &ProjectId,
		predicate: F,
	) -> Result<Vec<T>, StorageError>
	where
		F: Fn(&T) -> bool,
	{
		self.get_all(|request| request.project_id() == *project_id && predicate(request))
			.await
	}

	/// Returns every request matching `predicate`, oldest first.
	pub async fn get_all<F>(&self, predicate: F) -> Result<Vec<T>, StorageError>
	where
		F: Fn(&T) -> bool,
	{
		let mut requests: Vec<T> = self
			.storage
			.list::<T>(Self::namespace())
			.await?
			.into_iter()
			.filter(|request| predicate(request))
			.collect();

		requests.sort_by_key(|request| request.created_at());
		Ok(requests)
	}

	/// Applies `apply` to the stored record with compare-and-swap semantics.
	///
	/// An unknown id fails with `NotFound`; an error returned by `apply`
	/// leaves the record untouched.
	pub async fn modify<F>(&self, id: &RequestId, apply: F) -> Result<T, StorageError>
	where
		F: FnMut(&mut T) -> Result<(), StorageError> + Send,
	{
		self.storage
			.update(Self::namespace(), &id.to_string(), apply)
			.await
	}

	/// Deletes the request if it belongs to `project_id`.
	///
	/// Returns `false` both for unknown ids and for requests owned by another
	/// project.
	pub async fn delete(&self, id: &RequestId, project_id: &ProjectId) -> Result<bool, StorageError> {
		let request = match self.get_by_id(id).await? {
			Some(request) if request.project_id() == *project_id => request,
			_ => return Ok(false),
		};

		self.storage
			.remove(Self::namespace(), &id.to_string())
			.await?;
		self.release_unique_key(request.unique_key().as_deref()).await;

		tracing::info!(request_id = %id, kind = Self::namespace(), "Deleted request");
		Ok(true)
	}
}

impl<T: SingleTransactionRecord> RequestStore<T> {
	/// Attaches the transaction hash and caller address at most once.
	pub async fn set_tx_info(
		&self,
		id: &RequestId,
		tx_hash: B256,
		caller: Address,
	) -> Result<T, StorageError> {
		let updated = self
			.modify(id, |request: &mut T| {
				if request.tx_hash().is_some() {
					return Err(StorageError::TxInfoAlreadySet(format!(
						"Transaction info is already set for request {}",
						request.id()
					)));
				}
				request.attach_tx_info(tx_hash, caller);
				Ok(())
			})
			.await?;

		tracing::info!(request_id = %id, tx_hash = %tx_hash, "Attached transaction info");
		Ok(updated)
	}
}

impl RequestStore<ContractDeploymentRequest> {
	/// Records the address of the deployed contract. Setting the same address
	/// twice is a no-op; a different address is rejected.
	pub async fn set_contract_address(
		&self,
		id: &RequestId,
		address: Address,
	) -> Result<ContractDeploymentRequest, StorageError> {
		self.modify(id, |request: &mut ContractDeploymentRequest| {
			match request.contract_address {
				Some(existing) if existing == address => Ok(()),
				Some(_) => Err(StorageError::TxInfoAlreadySet(format!(
					"Contract address is already set for request {}",
					request.id
				))),
				None => {
					request.contract_address = Some(address);
					Ok(())
				}
			}
		})
		.await
	}

	/// Replaces the implemented interfaces and tags of a deployment.
	pub async fn update_interfaces(
		&self,
		id: &RequestId,
		implements: Vec<InterfaceId>,
		tags: Vec<ContractTag>,
	) -> Result<ContractDeploymentRequest, StorageError> {
		self.modify(id, |request: &mut ContractDeploymentRequest| {
			request.contract_implements = implements.clone();
			request.contract_tags = tags.clone();
			Ok(())
		})
		.await
	}

	pub async fn get_by_alias(
		&self,
		project_id: &ProjectId,
		alias: &str,
	) -> Result<Option<ContractDeploymentRequest>, StorageError> {
		self.get_by_unique_key(&alias_key(project_id, alias)).await
	}
}

impl RequestStore<AssetMultiSendRequest> {
	/// Attaches the approve leg hash of a token multi-send at most once.
	pub async fn set_approve_tx_info(
		&self,
		id: &RequestId,
		tx_hash: B256,
		sender: Address,
	) -> Result<AssetMultiSendRequest, StorageError> {
		let updated = self
			.modify(id, |request: &mut AssetMultiSendRequest| {
				if request.token_address.is_none() {
					return Err(StorageError::InvalidState(format!(
						"Native multi-send {} has no approve transaction",
						request.id
					)));
				}
				if request.approve_tx_hash.is_some() {
					return Err(StorageError::TxInfoAlreadySet(format!(
						"Approve transaction info is already set for request {}",
						request.id
					)));
				}
				request.approve_tx_hash = Some(tx_hash);
				request.asset_sender_address.get_or_insert(sender);
				Ok(())
			})
			.await?;

		tracing::info!(request_id = %id, tx_hash = %tx_hash, "Attached approve transaction info");
		Ok(updated)
	}

	/// Attaches the disperse leg hash at most once. Token multi-sends need
	/// their approve hash first.
	pub async fn set_disperse_tx_info(
		&self,
		id: &RequestId,
		tx_hash: B256,
		sender: Address,
	) -> Result<AssetMultiSendRequest, StorageError> {
		let updated = self
			.modify(id, |request: &mut AssetMultiSendRequest| {
				if request.disperse_tx_hash.is_some() {
					return Err(StorageError::TxInfoAlreadySet(format!(
						"Disperse transaction info is already set for request {}",
						request.id
					)));
				}
				if request.token_address.is_some() && request.approve_tx_hash.is_none() {
					return Err(StorageError::InvalidState(format!(
						"Approve transaction info must be set before disperse for request {}",
						request.id
					)));
				}
				request.disperse_tx_hash = Some(tx_hash);
				request.asset_sender_address.get_or_insert(sender);
				Ok(())
			})
			.await?;

		tracing::info!(request_id = %id, tx_hash = %tx_hash, "Attached disperse transaction info");
		Ok(updated)
	}

	pub async fn get_all_by_sender(
		&self,
		sender: &Address,
	) -> Result<Vec<AssetMultiSendRequest>, StorageError> {
		self.get_all(|request| request.asset_sender_address.as_ref() == Some(sender))
			.await
	}
}

impl RequestStore<AssetSendRequest> {
	pub async fn get_all_by_sender(
		&self,
		sender: &Address,
	) -> Result<Vec<AssetSendRequest>, StorageError> {
		self.get_all(|request| request.asset_sender_address.as_ref() == Some(sender))
			.await
	}

	pub async fn get_all_by_recipient(
		&self,
		recipient: &Address,
	) -> Result<Vec<AssetSendRequest>, StorageError> {
		self.get_all(|request| &request.asset_recipient_address == recipient)
			.await
	}
}

fn alias_key(project_id: &ProjectId, alias: &str) -> String {
	format!("{}:{}", project_id, alias)
}

impl RequestRecord for ContractDeploymentRequest {
	const KIND: RequestKind = RequestKind::ContractDeployment;

	fn id(&self) -> RequestId {
		self.id
	}

	fn project_id(&self) -> ProjectId {
		self.project_id
	}

	fn created_at(&self) -> DateTime<Utc> {
		self.created_at
	}

	fn unique_key(&self) -> Option<String> {
		Some(alias_key(&self.project_id, &self.alias))
	}
}

impl SingleTransactionRecord for ContractDeploymentRequest {
	fn tx_hash(&self) -> Option<B256> {
		self.tx_hash
	}

	fn attach_tx_info(&mut self, tx_hash: B256, caller: Address) {
		self.tx_hash = Some(tx_hash);
		self.deployer_address.get_or_insert(caller);
	}
}

impl RequestRecord for ContractFunctionCallRequest {
	const KIND: RequestKind = RequestKind::ContractFunctionCall;

	fn id(&self) -> RequestId {
		self.id
	}

	fn project_id(&self) -> ProjectId {
		self.project_id
	}

	fn created_at(&self) -> DateTime<Utc> {
		self.created_at
	}
}

impl SingleTransactionRecord for ContractFunctionCallRequest {
	fn tx_hash(&self) -> Option<B256> {
		self.tx_hash
	}

	fn attach_tx_info(&mut self, tx_hash: B256, caller: Address) {
		self.tx_hash = Some(tx_hash);
		self.caller_address.get_or_insert(caller);
	}
}

impl RequestRecord for Erc20LockRequest {
	const KIND: RequestKind = RequestKind::Erc20Lock;

	fn id(&self) -> RequestId {
		self.id
	}

	fn project_id(&self) -> ProjectId {
		self.project_id
	}

	fn created_at(&self) -> DateTime<Utc> {
		self.created_at
	}
}

impl SingleTransactionRecord for Erc20LockRequest {
	fn tx_hash(&self) -> Option<B256> {
		self.tx_hash
	}

	fn attach_tx_info(&mut self, tx_hash: B256, caller: Address) {
		self.tx_hash = Some(tx_hash);
		self.token_sender_address.get_or_insert(caller);
	}
}

impl RequestRecord for AssetSendRequest {
	const KIND: RequestKind = RequestKind::AssetSend;

	fn id(&self) -> RequestId {
		self.id
	}

	fn project_id(&self) -> ProjectId {
		self.project_id
	}

	fn created_at(&self) -> DateTime<Utc> {
		self.created_at
	}
}

impl SingleTransactionRecord for AssetSendRequest {
	fn tx_hash(&self) -> Option<B256> {
		self.tx_hash
	}

	fn attach_tx_info(&mut self, tx_hash: B256, caller: Address) {
		self.tx_hash = Some(tx_hash);
		self.asset_sender_address.get_or_insert(caller);
	}
}

impl RequestRecord for AssetMultiSendRequest {
	const KIND: RequestKind = RequestKind::AssetMultiSend;

	fn id(&self) -> RequestId {
		self.id
	}

	fn project_id(&self) -> ProjectId {
		self.project_id
	}

	fn created_at(&self) -> DateTime<Utc> {
		self.created_at
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::memory::MemoryStorage;
	use chainreq_types::{Bytes, ContractId, MultiSendItem, ScreenConfig, U256};
	use uuid::Uuid;

	fn storage() -> Arc<StorageService> {
		Arc::new(StorageService::new(Box::new(MemoryStorage::new())))
	}

	fn function_call(project_id: ProjectId) -> ContractFunctionCallRequest {
		ContractFunctionCallRequest {
			id: Uuid::new_v4(),
			deployed_contract_id: None,
			contract_address: Address::repeat_byte(0x11),
			function_name: "set".to_string(),
			function_params: serde_json::json!([]),
			function_call_data: Bytes::from(vec![0x60, 0xfe, 0x47, 0xb1]),
			eth_amount: U256::ZERO,
			chain_id: 31337,
			redirect_url: "https://example.com".to_string(),
			project_id,
			created_at: Utc::now(),
			arbitrary_data: None,
			screen_config: ScreenConfig::default(),
			caller_address: None,
			tx_hash: None,
		}
	}

	fn deployment(project_id: ProjectId, alias: &str) -> ContractDeploymentRequest {
		ContractDeploymentRequest {
			id: Uuid::new_v4(),
			alias: alias.to_string(),
			name: None,
			description: None,
			contract_id: ContractId::new("examples.exampleContract"),
			contract_data: Bytes::from(vec![0x60, 0x80]),
			constructor_params: serde_json::json!([]),
			contract_tags: vec![],
			contract_implements: vec![],
			initial_eth_amount: U256::ZERO,
			chain_id: 31337,
			redirect_url: "https://example.com".to_string(),
			project_id,
			created_at: Utc::now(),
			arbitrary_data: None,
			screen_config: ScreenConfig::default(),
			contract_address: None,
			deployer_address: None,
			tx_hash: None,
			imported: false,
		}
	}

	fn multi_send(project_id: ProjectId) -> AssetMultiSendRequest {
		AssetMultiSendRequest {
			id: Uuid::new_v4(),
			project_id,
			chain_id: 31337,
			redirect_url: "https://example.com".to_string(),
			token_address: Some(Address::repeat_byte(0x22)),
			disperse_contract_address: Address::repeat_byte(0x33),
			items: vec![MultiSendItem {
				wallet_address: Address::repeat_byte(0x44),
				amount: U256::from(10),
				item_name: None,
			}],
			asset_sender_address: None,
			approve_tx_hash: None,
			disperse_tx_hash: None,
			arbitrary_data: None,
			approve_screen_config: ScreenConfig::default(),
			disperse_screen_config: ScreenConfig::default(),
			created_at: Utc::now(),
		}
	}

	#[tokio::test]
	async fn test_set_tx_info_at_most_once() {
		let store = RequestStore::<ContractFunctionCallRequest>::new(storage());
		let request = store.store(function_call(Uuid::new_v4())).await.unwrap();

		let first = B256::repeat_byte(1);
		let second = B256::repeat_byte(2);
		let caller = Address::repeat_byte(0xaa);

		store.set_tx_info(&request.id, first, caller).await.unwrap();
		let result = store.set_tx_info(&request.id, second, caller).await;
		assert!(matches!(result, Err(StorageError::TxInfoAlreadySet(_))));

		// Same hash again is still a conflict
		let result = store.set_tx_info(&request.id, first, caller).await;
		assert!(matches!(result, Err(StorageError::TxInfoAlreadySet(_))));

		let stored = store.get_by_id(&request.id).await.unwrap().unwrap();
		assert_eq!(stored.tx_hash, Some(first));
		assert_eq!(stored.caller_address, Some(caller));
	}

	#[tokio::test]
	async fn test_concurrent_set_tx_info_has_one_winner() {
		let store = RequestStore::<ContractFunctionCallRequest>::new(storage());
		let request = store.store(function_call(Uuid::new_v4())).await.unwrap();

		let attempts = (1..=8u8).map(|i| {
			let store = store.clone();
			let id = request.id;
			async move {
				store
					.set_tx_info(&id, B256::repeat_byte(i), Address::repeat_byte(i))
					.await
			}
		});
		let results = futures::future::join_all(attempts).await;

		let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
		assert_eq!(winners.len(), 1);
		assert!(results
			.iter()
			.filter(|r| r.is_err())
			.all(|r| matches!(r, Err(StorageError::TxInfoAlreadySet(_)))));

		let stored = store.get_by_id(&request.id).await.unwrap().unwrap();
		assert_eq!(stored.tx_hash, winners[0].tx_hash);
	}

	#[tokio::test]
	async fn test_set_tx_info_unknown_id() {
		let store = RequestStore::<Erc20LockRequest>::new(storage());
		let result = store
			.set_tx_info(&Uuid::new_v4(), B256::ZERO, Address::ZERO)
			.await;
		assert!(matches!(result, Err(StorageError::NotFound)));
	}

	#[tokio::test]
	async fn test_alias_is_unique_per_project() {
		let store = RequestStore::<ContractDeploymentRequest>::new(storage());
		let project = Uuid::new_v4();

		let first = store.store(deployment(project, "token")).await.unwrap();
		let result = store.store(deployment(project, "token")).await;
		assert!(matches!(result, Err(StorageError::AlreadyInUse(_))));

		// Other projects may reuse the alias
		store
			.store(deployment(Uuid::new_v4(), "token"))
			.await
			.unwrap();

		let found = store.get_by_alias(&project, "token").await.unwrap().unwrap();
		assert_eq!(found.id, first.id);

		// Deleting releases the alias
		assert!(store.delete(&first.id, &project).await.unwrap());
		assert!(store.get_by_alias(&project, "token").await.unwrap().is_none());
		store.store(deployment(project, "token")).await.unwrap();
	}

	#[tokio::test]
	async fn test_delete_masks_other_projects() {
		let store = RequestStore::<ContractFunctionCallRequest>::new(storage());
		let owner = Uuid::new_v4();
		let request = store.store(function_call(owner)).await.unwrap();

		assert!(!store.delete(&request.id, &Uuid::new_v4()).await.unwrap());
		assert!(store.get_by_id(&request.id).await.unwrap().is_some());

		assert!(store.delete(&request.id, &owner).await.unwrap());
		assert!(store.get_by_id(&request.id).await.unwrap().is_none());
		assert!(!store.delete(&request.id, &owner).await.unwrap());
	}

	#[tokio::test]
	async fn test_get_all_by_project_is_ordered_and_filtered() {
		let store = RequestStore::<ContractFunctionCallRequest>::new(storage());
		let project = Uuid::new_v4();

		let mut older = function_call(project);
		older.created_at = Utc::now() - chrono::Duration::seconds(60);
		older.function_name = "older".to_string();
		let newer = function_call(project);

		store.store(newer.clone()).await.unwrap();
		store.store(older.clone()).await.unwrap();
		store.store(function_call(Uuid::new_v4())).await.unwrap();

		let all = store.get_all_by_project_id(&project, |_| true).await.unwrap();
		assert_eq!(
			all.iter().map(|r| r.id).collect::<Vec<_>>(),
			vec![older.id, newer.id]
		);

		let filtered = store
			.get_all_by_project_id(&project, |r| r.function_name == "older")
			.await
			.unwrap();
		assert_eq!(filtered.len(), 1);
	}

	#[tokio::test]
	async fn test_contract_address_set_once() {
		let store = RequestStore::<ContractDeploymentRequest>::new(storage());
		let request = store
			.store(deployment(Uuid::new_v4(), "alias"))
			.await
			.unwrap();
		let address = Address::repeat_byte(0x55);

		store.set_contract_address(&request.id, address).await.unwrap();
		store.set_contract_address(&request.id, address).await.unwrap();
		let result = store
			.set_contract_address(&request.id, Address::repeat_byte(0x66))
			.await;
		assert!(matches!(result, Err(StorageError::TxInfoAlreadySet(_))));
	}

	#[tokio::test]
	async fn test_multi_send_legs_are_independent() {
		let store = RequestStore::<AssetMultiSendRequest>::new(storage());
		let request = store.store(multi_send(Uuid::new_v4())).await.unwrap();
		let sender = Address::repeat_byte(0x77);

		store
			.set_approve_tx_info(&request.id, B256::repeat_byte(1), sender)
			.await
			.unwrap();
		assert!(matches!(
			store
				.set_approve_tx_info(&request.id, B256::repeat_byte(2), sender)
				.await,
			Err(StorageError::TxInfoAlreadySet(_))
		));

		let updated = store
			.set_disperse_tx_info(&request.id, B256::repeat_byte(3), sender)
			.await
			.unwrap();
		assert_eq!(updated.approve_tx_hash, Some(B256::repeat_byte(1)));
		assert_eq!(updated.disperse_tx_hash, Some(B256::repeat_byte(3)));

		let by_sender = store.get_all_by_sender(&sender).await.unwrap();
		assert_eq!(by_sender.len(), 1);
		assert!(store
			.get_all_by_sender(&Address::repeat_byte(0x78))
			.await
			.unwrap()
			.is_empty());
	}

	#[tokio::test]
	async fn test_attach_keeps_declared_sender() {
		let store = RequestStore::<ContractFunctionCallRequest>::new(storage());
		let declared = Address::repeat_byte(0x55);
		let request = store
			.store(ContractFunctionCallRequest {
				caller_address: Some(declared),
				..function_call(Uuid::new_v4())
			})
			.await
			.unwrap();

		let updated = store
			.set_tx_info(&request.id, B256::repeat_byte(1), Address::repeat_byte(0x66))
			.await
			.unwrap();
		assert_eq!(updated.tx_hash, Some(B256::repeat_byte(1)));
		assert_eq!(updated.caller_address, Some(declared));

		// Without a declared sender the attach caller is recorded
		let deployments = RequestStore::<ContractDeploymentRequest>::new(storage());
		let deployment = deployments
			.store(deployment(Uuid::new_v4(), "declared"))
			.await
			.unwrap();
		let first = Address::repeat_byte(0x77);
		let updated = deployments
			.set_tx_info(&deployment.id, B256::repeat_byte(2), first)
			.await
			.unwrap();
		assert_eq!(updated.deployer_address, Some(first));
	}

	#[tokio::test]
	async fn test_multi_send_sender_is_fixed_by_first_leg() {
		let store = RequestStore::<AssetMultiSendRequest>::new(storage());
		let request = store.store(multi_send(Uuid::new_v4())).await.unwrap();
		let approver = Address::repeat_byte(0xaa);

		store
			.set_approve_tx_info(&request.id, B256::repeat_byte(1), approver)
			.await
			.unwrap();
		let updated = store
			.set_disperse_tx_info(&request.id, B256::repeat_byte(2), Address::repeat_byte(0xbb))
			.await
			.unwrap();
		assert_eq!(updated.asset_sender_address, Some(approver));
		assert_eq!(store.get_all_by_sender(&approver).await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_multi_send_leg_order() {
		let store = RequestStore::<AssetMultiSendRequest>::new(storage());
		let token = store.store(multi_send(Uuid::new_v4())).await.unwrap();
		let sender = Address::repeat_byte(0x77);

		let result = store
			.set_disperse_tx_info(&token.id, B256::repeat_byte(1), sender)
			.await;
		assert!(matches!(result, Err(StorageError::InvalidState(_))));
		let stored = store.get_by_id(&token.id).await.unwrap().unwrap();
		assert!(stored.disperse_tx_hash.is_none());
		assert!(stored.asset_sender_address.is_none());

		let native = store
			.store(AssetMultiSendRequest {
				token_address: None,
				..multi_send(Uuid::new_v4())
			})
			.await
			.unwrap();
		let result = store
			.set_approve_tx_info(&native.id, B256::repeat_byte(2), sender)
			.await;
		assert!(matches!(result, Err(StorageError::InvalidState(_))));
		store
			.set_disperse_tx_info(&native.id, B256::repeat_byte(3), sender)
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn test_send_lookup_by_sender_and_recipient() {
		let store = RequestStore::<AssetSendRequest>::new(storage());
		let recipient = Address::repeat_byte(0x44);
		let send = |sender: Option<Address>| AssetSendRequest {
			id: Uuid::new_v4(),
			project_id: Uuid::new_v4(),
			chain_id: 31337,
			redirect_url: "https://example.com".to_string(),
			token_address: None,
			asset_amount: U256::from(10),
			asset_sender_address: sender,
			asset_recipient_address: recipient,
			arbitrary_data: None,
			screen_config: ScreenConfig::default(),
			created_at: Utc::now(),
			tx_hash: None,
		};

		let declared = Address::repeat_byte(0x55);
		store.store(send(Some(declared))).await.unwrap();
		let open = store.store(send(None)).await.unwrap();

		let caller = Address::repeat_byte(0x66);
		let updated = store
			.set_tx_info(&open.id, B256::repeat_byte(1), caller)
			.await
			.unwrap();
		assert_eq!(updated.asset_sender_address, Some(caller));

		assert_eq!(store.get_all_by_sender(&declared).await.unwrap().len(), 1);
		assert_eq!(store.get_all_by_sender(&caller).await.unwrap().len(), 1);
		assert_eq!(store.get_all_by_recipient(&recipient).await.unwrap().len(), 2);
		assert!(store
			.get_all_by_recipient(&declared)
			.await
			.unwrap()
			.is_empty());
	}
}
