//! Reconciliation of stored intent against observed chain state.
//!
//! Status is never stored. Every read fetches the transaction behind the
//! attached hash and compares it with the intent the request was created
//! with; the result is derived again on the next read.

use crate::projector::transaction_response;
use crate::utils::truncate_hash;
use chainreq_chain::ChainReaderService;
use chainreq_contracts::EventLogDecoder;
use chainreq_types::api::TransactionResponse;
use chainreq_types::{
	Address, ApiError, BlockchainTransactionInfo, Bytes, ChainSpec, ContractEvent, EventInfo,
	Status, B256, U256,
};
use std::sync::Arc;

/// Where a transaction is expected to go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedTarget {
	/// Call to an existing contract; creating a contract fails the check.
	Call(Address),
	/// Contract creation, optionally at an already known address.
	Deployment { contract_address: Option<Address> },
}

impl ExpectedTarget {
	/// `to` as sent: the zero address for deployments.
	pub fn to(&self) -> Address {
		match self {
			ExpectedTarget::Call(address) => *address,
			ExpectedTarget::Deployment { .. } => Address::ZERO,
		}
	}
}

/// Stored intent of one transaction leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionExpectation {
	pub tx_hash: Option<B256>,
	/// `None` accepts any sender.
	pub from: Option<Address>,
	pub target: ExpectedTarget,
	pub data: Bytes,
	pub value: U256,
}

/// Outcome of reconciling a leg.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledTransaction {
	pub status: Status,
	pub info: Option<BlockchainTransactionInfo>,
	pub transaction: TransactionResponse,
	pub events: Option<Vec<EventInfo>>,
}

pub struct StatusReconciler {
	chain: Arc<ChainReaderService>,
}

impl StatusReconciler {
	pub fn new(chain: Arc<ChainReaderService>) -> Self {
		Self { chain }
	}

	pub fn chain(&self) -> &ChainReaderService {
		&self.chain
	}

	/// Combines receipt, transaction, current block and block timestamp.
	///
	/// Returns `None` when there is no hash or the transaction is not mined
	/// yet. Read failures are returned as errors and never reported as a
	/// pending transaction.
	pub async fn fetch_transaction_info(
		&self,
		chain: &ChainSpec,
		tx_hash: Option<B256>,
	) -> Result<Option<BlockchainTransactionInfo>, ApiError> {
		let Some(tx_hash) = tx_hash else {
			return Ok(None);
		};

		let Some(receipt) = self.chain.get_transaction_receipt(chain, tx_hash).await? else {
			tracing::debug!(tx_hash = %truncate_hash(&tx_hash.to_string()), "Transaction not mined yet");
			return Ok(None);
		};
		let Some(transaction) = self.chain.get_transaction(chain, tx_hash).await? else {
			return Ok(None);
		};

		let current_block = self.chain.get_current_block_number(chain).await?;
		let timestamp = self
			.chain
			.get_block_timestamp(chain, receipt.block_number)
			.await?;

		Ok(Some(BlockchainTransactionInfo {
			hash: tx_hash,
			from: transaction.from,
			to: transaction.to.unwrap_or(Address::ZERO),
			deployed_contract_address: receipt.contract_address,
			data: transaction.input,
			value: transaction.value,
			block_number: receipt.block_number,
			block_confirmations: current_block.saturating_sub(receipt.block_number),
			timestamp,
			success: receipt.success,
			logs: receipt.logs,
		}))
	}

	/// `PENDING` until mined; afterwards `SUCCESS` only if the receipt
	/// succeeded and every observed field matches the expectation.
	pub fn determine_status(
		info: Option<&BlockchainTransactionInfo>,
		expectation: &TransactionExpectation,
	) -> Status {
		let Some(info) = info else {
			return Status::Pending;
		};

		let target_matches = match &expectation.target {
			ExpectedTarget::Call(to) => {
				info.to_matches(to) && info.deployed_contract_address.is_none()
			}
			ExpectedTarget::Deployment { contract_address } => {
				info.to_matches(&Address::ZERO)
					&& match (info.deployed_contract_address, contract_address) {
						(Some(deployed), Some(expected)) => deployed == *expected,
						(Some(_), None) => true,
						(None, _) => false,
					}
			}
		};

		let matches = info.success
			&& expectation
				.tx_hash
				.is_some_and(|hash| info.hash_matches(&hash))
			&& info.from_matches(expectation.from.as_ref())
			&& target_matches
			&& info.data_matches(&expectation.data)
			&& info.value_matches(&expectation.value);

		if matches {
			Status::Success
		} else {
			Status::Failed
		}
	}

	/// Decoded events, available once the transaction is mined and
	/// successful.
	pub fn events(
		info: Option<&BlockchainTransactionInfo>,
		status: Status,
		events: &[ContractEvent],
	) -> Option<Vec<EventInfo>> {
		match (info, status) {
			(Some(info), Status::Success) => Some(EventLogDecoder::new(events).decode(&info.logs)),
			_ => None,
		}
	}

	/// Fetches, checks and decodes one leg.
	pub async fn reconcile(
		&self,
		chain: &ChainSpec,
		expectation: &TransactionExpectation,
		events: &[ContractEvent],
	) -> Result<ReconciledTransaction, ApiError> {
		let info = self
			.fetch_transaction_info(chain, expectation.tx_hash)
			.await?;
		let status = Self::determine_status(info.as_ref(), expectation);

		Ok(Self::assemble(info, status, expectation, events))
	}

	/// Builds the reconciled view for an already decided status.
	pub fn assemble(
		info: Option<BlockchainTransactionInfo>,
		status: Status,
		expectation: &TransactionExpectation,
		events: &[ContractEvent],
	) -> ReconciledTransaction {
		ReconciledTransaction {
			status,
			transaction: transaction_response(expectation, info.as_ref()),
			events: Self::events(info.as_ref(), status, events),
			info,
		}
	}
}
