//! Chain reader backed by alloy JSON-RPC providers.
//!
//! One provider is kept per RPC URL and reused by every project routed to
//! it. Each call runs under the chain's RPC timeout, and the latest block
//! number can be cached for a short, configurable time.

use crate::{ChainError, ChainReaderInterface, ChainTransaction, TransactionReceipt};
use alloy::eips::{BlockId, BlockNumberOrTag};
use alloy::network::{ReceiptResponse, TransactionResponse};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::transports::TransportResult;
use async_trait::async_trait;
use chainreq_config::ChainConfig;
use chainreq_types::{Address, Bytes, ChainId, ChainSpec, RawLog, B256};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::future::IntoFuture;
use std::time::{Duration, Instant};

/// Per chain RPC settings.
#[derive(Debug, Clone)]
struct ChainEndpoint {
	rpc_url: String,
	rpc_timeout: Duration,
	latest_block_cache: Duration,
}

/// Alloy based implementation of `ChainReaderInterface`.
pub struct AlloyChainReader {
	chains: HashMap<ChainId, ChainEndpoint>,
	/// Providers keyed by RPC URL.
	providers: DashMap<String, DynProvider>,
	/// Latest block number and when it was fetched, keyed by RPC URL.
	latest_blocks: DashMap<String, (u64, Instant)>,
}

impl AlloyChainReader {
	pub fn new(chains: &HashMap<ChainId, ChainConfig>) -> Self {
		let chains = chains
			.iter()
			.map(|(chain_id, config)| {
				(
					*chain_id,
					ChainEndpoint {
						rpc_url: config.rpc_url.clone(),
						rpc_timeout: Duration::from_millis(config.rpc_timeout_ms),
						latest_block_cache: Duration::from_millis(config.latest_block_cache_ms),
					},
				)
			})
			.collect();

		Self {
			chains,
			providers: DashMap::new(),
			latest_blocks: DashMap::new(),
		}
	}

	/// Resolves the endpoint settings and RPC URL a read is routed to.
	fn route<'a>(&'a self, chain: &'a ChainSpec) -> Result<(&'a ChainEndpoint, &'a str), ChainError> {
		let endpoint = self
			.chains
			.get(&chain.chain_id)
			.ok_or(ChainError::InvalidChainId(chain.chain_id))?;

		let url = chain
			.custom_rpc_url
			.as_deref()
			.unwrap_or(endpoint.rpc_url.as_str());

		Ok((endpoint, url))
	}

	fn provider(&self, url: &str) -> Result<DynProvider, ChainError> {
		if let Some(provider) = self.providers.get(url) {
			return Ok(provider.value().clone());
		}

		let parsed: reqwest::Url = url
			.parse()
			.map_err(|e| ChainError::Network(format!("Invalid RPC URL {}: {}", url, e)))?;
		let provider = ProviderBuilder::new().connect_http(parsed).erased();

		tracing::debug!(rpc_url = %url, "Created RPC provider");
		self.providers.insert(url.to_string(), provider.clone());
		Ok(provider)
	}

	async fn call<T, F>(&self, endpoint: &ChainEndpoint, method: &str, request: F) -> Result<T, ChainError>
	where
		F: IntoFuture<Output = TransportResult<T>>,
	{
		match tokio::time::timeout(endpoint.rpc_timeout, request).await {
			Ok(Ok(value)) => Ok(value),
			Ok(Err(e)) => Err(ChainError::Network(format!("{} failed: {}", method, e))),
			Err(_) => Err(ChainError::Timeout(format!(
				"{} did not answer within {}ms",
				method,
				endpoint.rpc_timeout.as_millis()
			))),
		}
	}
}

fn convert_transaction(transaction: &alloy::rpc::types::Transaction) -> ChainTransaction {
	ChainTransaction {
		hash: TransactionResponse::tx_hash(transaction),
		from: TransactionResponse::from(transaction),
		to: alloy::consensus::Transaction::to(transaction),
		input: alloy::consensus::Transaction::input(transaction).clone(),
		value: alloy::consensus::Transaction::value(transaction),
		block_number: TransactionResponse::block_number(transaction),
	}
}

fn convert_receipt(
	receipt: &alloy::rpc::types::TransactionReceipt,
) -> Result<TransactionReceipt, ChainError> {
	let block_number = ReceiptResponse::block_number(receipt).ok_or_else(|| {
		ChainError::InvalidResponse("Receipt without block number".to_string())
	})?;

	let logs = receipt
		.inner
		.logs()
		.iter()
		.map(|log| RawLog {
			address: log.address(),
			topics: log.topics().to_vec(),
			data: log.data().data.clone(),
		})
		.collect();

	Ok(TransactionReceipt {
		tx_hash: receipt.transaction_hash,
		success: ReceiptResponse::status(receipt),
		block_number,
		contract_address: ReceiptResponse::contract_address(receipt),
		gas_used: ReceiptResponse::gas_used(receipt),
		logs,
	})
}

#[async_trait]
impl ChainReaderInterface for AlloyChainReader {
	async fn get_transaction_receipt(
		&self,
		chain: &ChainSpec,
		tx_hash: B256,
	) -> Result<Option<TransactionReceipt>, ChainError> {
		let (endpoint, url) = self.route(chain)?;
		let provider = self.provider(url)?;

		let receipt = self
			.call(
				endpoint,
				"eth_getTransactionReceipt",
				provider.get_transaction_receipt(tx_hash),
			)
			.await?;

		tracing::debug!(tx_hash = %tx_hash, mined = receipt.is_some(), "Fetched receipt");
		receipt.as_ref().map(convert_receipt).transpose()
	}

	async fn get_transaction(
		&self,
		chain: &ChainSpec,
		tx_hash: B256,
	) -> Result<Option<ChainTransaction>, ChainError> {
		let (endpoint, url) = self.route(chain)?;
		let provider = self.provider(url)?;

		let transaction = self
			.call(
				endpoint,
				"eth_getTransactionByHash",
				provider.get_transaction_by_hash(tx_hash),
			)
			.await?;

		Ok(transaction.as_ref().map(convert_transaction))
	}

	async fn get_current_block_number(&self, chain: &ChainSpec) -> Result<u64, ChainError> {
		let (endpoint, url) = self.route(chain)?;

		if !endpoint.latest_block_cache.is_zero() {
			if let Some(cached) = self.latest_blocks.get(url) {
				let (block, fetched_at) = *cached.value();
				if fetched_at.elapsed() < endpoint.latest_block_cache {
					return Ok(block);
				}
			}
		}

		let provider = self.provider(url)?;
		let block = self
			.call(endpoint, "eth_blockNumber", provider.get_block_number())
			.await?;

		if !endpoint.latest_block_cache.is_zero() {
			self.latest_blocks
				.insert(url.to_string(), (block, Instant::now()));
		}

		Ok(block)
	}

	async fn get_block_timestamp(
		&self,
		chain: &ChainSpec,
		block_number: u64,
	) -> Result<DateTime<Utc>, ChainError> {
		let (endpoint, url) = self.route(chain)?;
		let provider = self.provider(url)?;

		let block = self
			.call(
				endpoint,
				"eth_getBlockByNumber",
				provider.get_block_by_number(BlockNumberOrTag::Number(block_number)),
			)
			.await?
			.ok_or_else(|| {
				ChainError::InvalidResponse(format!("Block {} not found", block_number))
			})?;

		let timestamp = i64::try_from(block.header.timestamp).map_err(|_| {
			ChainError::InvalidResponse(format!("Block {} timestamp out of range", block_number))
		})?;

		DateTime::from_timestamp(timestamp, 0).ok_or_else(|| {
			ChainError::InvalidResponse(format!("Block {} timestamp out of range", block_number))
		})
	}

	async fn get_code(&self, chain: &ChainSpec, address: Address) -> Result<Bytes, ChainError> {
		let (endpoint, url) = self.route(chain)?;
		let provider = self.provider(url)?;

		self.call(endpoint, "eth_getCode", provider.get_code_at(address))
			.await
	}

	async fn get_transaction_count(
		&self,
		chain: &ChainSpec,
		address: Address,
		block_number: u64,
	) -> Result<u64, ChainError> {
		let (endpoint, url) = self.route(chain)?;
		let provider = self.provider(url)?;

		self.call(
			endpoint,
			"eth_getTransactionCount",
			provider
				.get_transaction_count(address)
				.block_id(BlockId::number(block_number)),
		)
		.await
	}

	async fn get_block_transactions(
		&self,
		chain: &ChainSpec,
		block_number: u64,
	) -> Result<Vec<ChainTransaction>, ChainError> {
		let (endpoint, url) = self.route(chain)?;
		let provider = self.provider(url)?;

		let block = self
			.call(
				endpoint,
				"eth_getBlockByNumber",
				provider
					.get_block_by_number(BlockNumberOrTag::Number(block_number))
					.full(),
			)
			.await?
			.ok_or_else(|| {
				ChainError::InvalidResponse(format!("Block {} not found", block_number))
			})?;

		Ok(block.transactions.txns().map(convert_transaction).collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn reader() -> AlloyChainReader {
		let mut chains = HashMap::new();
		chains.insert(
			31337,
			ChainConfig {
				name: None,
				rpc_url: "http://localhost:8545".to_string(),
				latest_block_cache_ms: 0,
				rpc_timeout_ms: 1_000,
			},
		);
		AlloyChainReader::new(&chains)
	}

	#[test]
	fn test_route_prefers_custom_rpc_url() {
		let reader = reader();

		let default = ChainSpec::new(31337);
		let (_, url) = reader.route(&default).unwrap();
		assert_eq!(url, "http://localhost:8545");

		let custom = ChainSpec {
			chain_id: 31337,
			custom_rpc_url: Some("http://custom:8545".to_string()),
		};
		let (_, url) = reader.route(&custom).unwrap();
		assert_eq!(url, "http://custom:8545");
	}

	#[tokio::test]
	async fn test_unknown_chain_is_rejected() {
		let result = reader()
			.get_current_block_number(&ChainSpec::new(1))
			.await;
		assert!(matches!(result, Err(ChainError::InvalidChainId(1))));
	}

	#[test]
	fn test_providers_are_cached_per_url() {
		let reader = reader();
		reader.provider("http://localhost:8545").unwrap();
		reader.provider("http://localhost:8545").unwrap();
		reader.provider("http://other:8545").unwrap();
		assert_eq!(reader.providers.len(), 2);
	}
}
