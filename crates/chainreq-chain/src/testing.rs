//! In-memory chain used to drive services in tests without a node.
//!
//! Every mined transaction gets a block of its own. Block timestamps are the
//! wall clock time at which the block was mined.

use crate::{ChainError, ChainReaderInterface, ChainTransaction, TransactionReceipt};
use async_trait::async_trait;
use chainreq_types::{Address, Bytes, ChainId, ChainSpec, RawLog, B256, U256};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Transaction to be mined by `FakeChainReader::mine_transaction`.
#[derive(Debug, Clone)]
pub struct FakeTransaction {
	pub from: Address,
	pub to: Option<Address>,
	pub input: Bytes,
	pub value: U256,
	pub success: bool,
	pub logs: Vec<RawLog>,
	/// Contract created by the transaction and its runtime code.
	pub created: Option<(Address, Bytes)>,
}

impl FakeTransaction {
	pub fn new(from: Address, to: Option<Address>, input: Bytes) -> Self {
		Self {
			from,
			to,
			input,
			value: U256::ZERO,
			success: true,
			logs: Vec::new(),
			created: None,
		}
	}

	pub fn with_value(mut self, value: U256) -> Self {
		self.value = value;
		self
	}

	pub fn with_logs(mut self, logs: Vec<RawLog>) -> Self {
		self.logs = logs;
		self
	}

	pub fn reverted(mut self) -> Self {
		self.success = false;
		self
	}

	pub fn creating(mut self, address: Address, runtime_code: Bytes) -> Self {
		self.created = Some((address, runtime_code));
		self
	}
}

/// Scripted chain state implementing `ChainReaderInterface`.
///
/// Clones share the same chain, so a test can keep a handle for mining while
/// the service under test owns another.
#[derive(Clone)]
pub struct FakeChainReader {
	state: Arc<FakeChainState>,
}

pub struct FakeChainState {
	chain_ids: HashSet<ChainId>,
	block_number: AtomicU64,
	next_hash: AtomicU64,
	unavailable: AtomicBool,
	block_timestamps: DashMap<u64, DateTime<Utc>>,
	transactions: DashMap<B256, ChainTransaction>,
	receipts: DashMap<B256, TransactionReceipt>,
	codes: DashMap<Address, Bytes>,
	created_at_block: DashMap<Address, u64>,
}

impl FakeChainReader {
	pub fn new(chain_ids: &[ChainId]) -> Self {
		let block_timestamps = DashMap::new();
		block_timestamps.insert(0, Utc::now());

		let state = FakeChainState {
			chain_ids: chain_ids.iter().copied().collect(),
			block_number: AtomicU64::new(0),
			next_hash: AtomicU64::new(1),
			unavailable: AtomicBool::new(false),
			block_timestamps,
			transactions: DashMap::new(),
			receipts: DashMap::new(),
			codes: DashMap::new(),
			created_at_block: DashMap::new(),
		};

		Self {
			state: Arc::new(state),
		}
	}

	/// Mines a block without transactions and returns its number.
	pub fn mine_empty_block(&self) -> u64 {
		let block = self.block_number.fetch_add(1, Ordering::SeqCst) + 1;
		self.block_timestamps.insert(block, Utc::now());
		block
	}

	/// Mines `transaction` in a new block and returns its hash.
	pub fn mine_transaction(&self, transaction: FakeTransaction) -> B256 {
		let hash = self.next_transaction_hash();
		self.mine_transaction_with_hash(hash, transaction);
		hash
	}

	/// Mines `transaction` under a caller chosen hash.
	pub fn mine_transaction_with_hash(&self, hash: B256, transaction: FakeTransaction) -> u64 {
		let block = self.mine_empty_block();

		let contract_address = match (&transaction.created, transaction.success) {
			(Some((address, code)), true) => {
				self.codes.insert(*address, code.clone());
				self.created_at_block.insert(*address, block);
				Some(*address)
			}
			_ => None,
		};

		self.transactions.insert(
			hash,
			ChainTransaction {
				hash,
				from: transaction.from,
				to: transaction.to,
				input: transaction.input,
				value: transaction.value,
				block_number: Some(block),
			},
		);
		self.receipts.insert(
			hash,
			TransactionReceipt {
				tx_hash: hash,
				success: transaction.success,
				block_number: block,
				contract_address,
				gas_used: 21_000,
				logs: if transaction.success {
					transaction.logs
				} else {
					Vec::new()
				},
			},
		);

		block
	}

	/// Returns a fresh hash that no mined transaction uses.
	pub fn next_transaction_hash(&self) -> B256 {
		let counter = self.next_hash.fetch_add(1, Ordering::SeqCst);
		B256::left_padding_from(&counter.to_be_bytes())
	}

	/// Places code at an address without a creating transaction, as a
	/// contract deployed by another contract would appear.
	pub fn set_code(&self, address: Address, code: Bytes) {
		self.codes.insert(address, code);
	}

	/// Makes every read fail with a network error while `true`.
	pub fn set_unavailable(&self, unavailable: bool) {
		self.unavailable.store(unavailable, Ordering::SeqCst);
	}

	fn check(&self, chain: &ChainSpec) -> Result<(), ChainError> {
		if !self.chain_ids.contains(&chain.chain_id) {
			return Err(ChainError::InvalidChainId(chain.chain_id));
		}
		if self.unavailable.load(Ordering::SeqCst) {
			return Err(ChainError::Network("connection refused".to_string()));
		}
		Ok(())
	}
}

impl Deref for FakeChainReader {
	type Target = FakeChainState;

	fn deref(&self) -> &Self::Target {
		&self.state
	}
}

#[async_trait]
impl ChainReaderInterface for FakeChainReader {
	async fn get_transaction_receipt(
		&self,
		chain: &ChainSpec,
		tx_hash: B256,
	) -> Result<Option<TransactionReceipt>, ChainError> {
		self.check(chain)?;
		Ok(self.receipts.get(&tx_hash).map(|r| r.value().clone()))
	}

	async fn get_transaction(
		&self,
		chain: &ChainSpec,
		tx_hash: B256,
	) -> Result<Option<ChainTransaction>, ChainError> {
		self.check(chain)?;
		Ok(self.transactions.get(&tx_hash).map(|t| t.value().clone()))
	}

	async fn get_current_block_number(&self, chain: &ChainSpec) -> Result<u64, ChainError> {
		self.check(chain)?;
		Ok(self.block_number.load(Ordering::SeqCst))
	}

	async fn get_block_timestamp(
		&self,
		chain: &ChainSpec,
		block_number: u64,
	) -> Result<DateTime<Utc>, ChainError> {
		self.check(chain)?;
		self.block_timestamps
			.get(&block_number)
			.map(|t| *t.value())
			.ok_or_else(|| ChainError::InvalidResponse(format!("Unknown block {}", block_number)))
	}

	async fn get_code(&self, chain: &ChainSpec, address: Address) -> Result<Bytes, ChainError> {
		self.check(chain)?;
		Ok(self
			.codes
			.get(&address)
			.map(|c| c.value().clone())
			.unwrap_or_default())
	}

	async fn get_transaction_count(
		&self,
		chain: &ChainSpec,
		address: Address,
		block_number: u64,
	) -> Result<u64, ChainError> {
		self.check(chain)?;
		Ok(self
			.created_at_block
			.get(&address)
			.map_or(0, |created| u64::from(*created.value() <= block_number)))
	}

	async fn get_block_transactions(
		&self,
		chain: &ChainSpec,
		block_number: u64,
	) -> Result<Vec<ChainTransaction>, ChainError> {
		self.check(chain)?;
		Ok(self
			.transactions
			.iter()
			.filter(|t| t.block_number == Some(block_number))
			.map(|t| t.value().clone())
			.collect())
	}
}
