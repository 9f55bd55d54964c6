//! Read-only blockchain access for the chainreq service.
//!
//! Every read is parameterized by a `ChainSpec`, so the RPC endpoint is
//! chosen per call: a project's custom RPC URL when it has one, the chain's
//! configured default otherwise. Reads never mutate anything and are safe to
//! repeat.

use async_trait::async_trait;
use chainreq_types::{
	Address, ApiError, Bytes, ChainId, ChainSpec, ErrorCode, RawLog, B256, U256,
};
use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod implementations {
	pub mod alloy;
}

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use implementations::alloy::AlloyChainReader;

/// Errors that can occur while reading chain state.
#[derive(Debug, Error)]
pub enum ChainError {
	/// The chain is not configured. Not retryable.
	#[error("Invalid chain id: {0}")]
	InvalidChainId(ChainId),
	/// Transport or RPC level failure.
	#[error("Network error: {0}")]
	Network(String),
	/// The RPC endpoint did not answer in time.
	#[error("Timeout: {0}")]
	Timeout(String),
	/// The node returned data that could not be interpreted.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
}

impl From<ChainError> for ApiError {
	fn from(error: ChainError) -> Self {
		let code = match error {
			ChainError::InvalidChainId(_) => ErrorCode::InvalidChainId,
			_ => ErrorCode::BlockchainReadError,
		};
		ApiError::new(code, error.to_string())
	}
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
	pub tx_hash: B256,
	pub success: bool,
	pub block_number: u64,
	/// Address of the contract created by the transaction, if any.
	pub contract_address: Option<Address>,
	pub gas_used: u64,
	pub logs: Vec<RawLog>,
}

/// Transaction as submitted to the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTransaction {
	pub hash: B256,
	pub from: Address,
	/// `None` for contract creations.
	pub to: Option<Address>,
	pub input: Bytes,
	pub value: U256,
	pub block_number: Option<u64>,
}

impl ChainTransaction {
	pub fn is_contract_creation(&self) -> bool {
		self.to.map_or(true, |to| to == Address::ZERO)
	}
}

/// Where and how a contract found on-chain was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractDeployment {
	/// Created by a top-level transaction.
	Full {
		tx_hash: B256,
		from: Address,
		/// Creation bytecode followed by the encoded constructor arguments.
		data: Bytes,
		value: U256,
		/// Runtime bytecode currently stored at the address.
		binary: Bytes,
		block_number: u64,
	},
	/// Created by another contract; only the runtime code is known.
	BinaryOnly { binary: Bytes },
}

impl ContractDeployment {
	/// Runtime bytecode of the contract.
	pub fn binary(&self) -> &Bytes {
		match self {
			ContractDeployment::Full { binary, .. } => binary,
			ContractDeployment::BinaryOnly { binary } => binary,
		}
	}
}

/// Trait defining the read operations needed from a chain.
#[async_trait]
pub trait ChainReaderInterface: Send + Sync {
	/// Returns `None` while the transaction is not mined.
	async fn get_transaction_receipt(
		&self,
		chain: &ChainSpec,
		tx_hash: B256,
	) -> Result<Option<TransactionReceipt>, ChainError>;

	async fn get_transaction(
		&self,
		chain: &ChainSpec,
		tx_hash: B256,
	) -> Result<Option<ChainTransaction>, ChainError>;

	async fn get_current_block_number(&self, chain: &ChainSpec) -> Result<u64, ChainError>;

	async fn get_block_timestamp(
		&self,
		chain: &ChainSpec,
		block_number: u64,
	) -> Result<DateTime<Utc>, ChainError>;

	/// Runtime code at `address`; empty for accounts without code.
	async fn get_code(&self, chain: &ChainSpec, address: Address) -> Result<Bytes, ChainError>;

	/// Account nonce of `address` after `block_number` was applied.
	async fn get_transaction_count(
		&self,
		chain: &ChainSpec,
		address: Address,
		block_number: u64,
	) -> Result<u64, ChainError>;

	async fn get_block_transactions(
		&self,
		chain: &ChainSpec,
		block_number: u64,
	) -> Result<Vec<ChainTransaction>, ChainError>;
}

/// Service wrapping a chain reader implementation.
pub struct ChainReaderService {
	implementation: Box<dyn ChainReaderInterface>,
}

impl ChainReaderService {
	pub fn new(implementation: Box<dyn ChainReaderInterface>) -> Self {
		Self { implementation }
	}

	pub async fn get_transaction_receipt(
		&self,
		chain: &ChainSpec,
		tx_hash: B256,
	) -> Result<Option<TransactionReceipt>, ChainError> {
		self.implementation
			.get_transaction_receipt(chain, tx_hash)
			.await
	}

	pub async fn get_transaction(
		&self,
		chain: &ChainSpec,
		tx_hash: B256,
	) -> Result<Option<ChainTransaction>, ChainError> {
		self.implementation.get_transaction(chain, tx_hash).await
	}

	pub async fn get_current_block_number(&self, chain: &ChainSpec) -> Result<u64, ChainError> {
		self.implementation.get_current_block_number(chain).await
	}

	pub async fn get_block_timestamp(
		&self,
		chain: &ChainSpec,
		block_number: u64,
	) -> Result<DateTime<Utc>, ChainError> {
		self.implementation
			.get_block_timestamp(chain, block_number)
			.await
	}

	pub async fn get_code(&self, chain: &ChainSpec, address: Address) -> Result<Bytes, ChainError> {
		self.implementation.get_code(chain, address).await
	}

	/// Locates the transaction that created the contract at `address`.
	///
	/// The creation block is the first block after which the contract's
	/// nonce is non-zero, found by binary search. That block's creation
	/// transactions are then checked for a receipt with a matching contract
	/// address. Returns `None` when there is no code at the address.
	pub async fn find_contract_deployment(
		&self,
		chain: &ChainSpec,
		address: Address,
	) -> Result<Option<ContractDeployment>, ChainError> {
		let binary = self.implementation.get_code(chain, address).await?;
		if binary.is_empty() {
			return Ok(None);
		}

		let current_block = self.implementation.get_current_block_number(chain).await?;
		let creation_block = match self
			.find_first_block_with_nonce(chain, address, current_block)
			.await?
		{
			Some(block) => block,
			None => return Ok(Some(ContractDeployment::BinaryOnly { binary })),
		};

		tracing::debug!(
			address = %address,
			block = creation_block,
			"Located contract creation block"
		);

		// The creation may be reported one block late by some nodes
		for block in [creation_block, creation_block + 1] {
			if block > current_block {
				break;
			}

			if let Some(deployment) = self
				.find_creation_in_block(chain, address, block, &binary)
				.await?
			{
				return Ok(Some(deployment));
			}
		}

		Ok(Some(ContractDeployment::BinaryOnly { binary }))
	}

	async fn find_first_block_with_nonce(
		&self,
		chain: &ChainSpec,
		address: Address,
		current_block: u64,
	) -> Result<Option<u64>, ChainError> {
		if self
			.implementation
			.get_transaction_count(chain, address, current_block)
			.await?
			== 0
		{
			return Ok(None);
		}

		let (mut low, mut high) = (0u64, current_block);
		while low < high {
			let middle = low + (high - low) / 2;
			let nonce = self
				.implementation
				.get_transaction_count(chain, address, middle)
				.await?;

			if nonce > 0 {
				high = middle;
			} else {
				low = middle + 1;
			}
		}

		Ok(Some(low))
	}

	async fn find_creation_in_block(
		&self,
		chain: &ChainSpec,
		address: Address,
		block_number: u64,
		binary: &Bytes,
	) -> Result<Option<ContractDeployment>, ChainError> {
		let transactions = self
			.implementation
			.get_block_transactions(chain, block_number)
			.await?;

		for transaction in transactions
			.into_iter()
			.filter(ChainTransaction::is_contract_creation)
		{
			let receipt = match self
				.implementation
				.get_transaction_receipt(chain, transaction.hash)
				.await?
			{
				Some(receipt) => receipt,
				None => continue,
			};

			if receipt.success && receipt.contract_address == Some(address) {
				return Ok(Some(ContractDeployment::Full {
					tx_hash: transaction.hash,
					from: transaction.from,
					data: transaction.input,
					value: transaction.value,
					binary: binary.clone(),
					block_number,
				}));
			}
		}

		Ok(None)
	}
}
