//! Configuration types for the service.

use crate::serde_helpers::{deserialize_chain_id_map, serialize_chain_id_map};
use chainreq_types::{ChainId, Project, ProjectId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Complete service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Service identity and HTTP settings
	pub service: ServiceSettings,
	/// Chain configurations keyed by chain id
	#[serde(
		deserialize_with = "deserialize_chain_id_map",
		serialize_with = "serialize_chain_id_map"
	)]
	pub chains: HashMap<ChainId, ChainConfig>,
	/// Projects allowed to create requests
	#[serde(default)]
	pub projects: Vec<ProjectConfig>,
	/// Contract decorator and interface sources
	#[serde(default)]
	pub contracts: ContractsConfig,
	/// Storage backend
	#[serde(default)]
	pub storage: StorageConfig,
}

/// Service identity and HTTP settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceSettings {
	/// Service name used in logs
	#[serde(default = "default_service_name")]
	pub name: String,
	/// Default log level when RUST_LOG is not set
	#[serde(default = "default_log_level")]
	pub log_level: String,
	/// HTTP bind address
	#[serde(default = "default_http_host")]
	pub http_host: String,
	/// HTTP port
	#[serde(default = "default_http_port")]
	pub http_port: u16,
}

/// Chain-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
	/// Chain name for logging
	pub name: Option<String>,
	/// Default RPC endpoint URL
	pub rpc_url: String,
	/// How long the latest block number is cached, zero disables caching
	#[serde(default)]
	pub latest_block_cache_ms: u64,
	/// Timeout applied to every RPC call
	#[serde(default = "default_rpc_timeout_ms")]
	pub rpc_timeout_ms: u64,
}

/// Project credentials and defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectConfig {
	pub id: ProjectId,
	/// Key expected in the X-API-KEY header
	pub api_key: String,
	pub chain_id: ChainId,
	pub base_redirect_url: String,
	/// RPC endpoint overriding the chain default for this project
	pub custom_rpc_url: Option<String>,
}

impl ProjectConfig {
	pub fn to_project(&self) -> Project {
		Project {
			id: self.id,
			chain_id: self.chain_id,
			base_redirect_url: self.base_redirect_url.clone(),
			custom_rpc_url: self.custom_rpc_url.clone(),
		}
	}
}

/// Where contract decorators and interface manifests are read from
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContractsConfig {
	/// Directory with one `<contract-id>/` folder per decorator
	pub decorators_dir: Option<PathBuf>,
	/// Directory with one `<interface-id>.json` file per interface
	pub interfaces_dir: Option<PathBuf>,
}

/// Storage backend selection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Backend name: `memory` or `file`
	#[serde(default = "default_storage_backend")]
	pub backend: String,
	/// Backend specific settings passed to the storage factory
	#[serde(default = "default_storage_settings")]
	pub config: toml::Value,
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			backend: default_storage_backend(),
			config: default_storage_settings(),
		}
	}
}

fn default_service_name() -> String {
	"chainreq".to_string()
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_http_host() -> String {
	"0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
	8080
}

fn default_rpc_timeout_ms() -> u64 {
	10_000
}

fn default_storage_backend() -> String {
	"memory".to_string()
}

fn default_storage_settings() -> toml::Value {
	toml::Value::Table(toml::map::Map::new())
}
