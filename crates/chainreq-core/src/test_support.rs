//! Shared fixtures for service tests: an in-memory store, a scripted chain
//! and a registry holding one example contract.

use crate::projects::ProjectRegistry;
use crate::reconciler::StatusReconciler;
use chainreq_chain::testing::FakeChainReader;
use chainreq_chain::ChainReaderService;
use chainreq_contracts::ContractDecoderRegistry;
use chainreq_storage::implementations::memory::MemoryStorage;
use chainreq_storage::{ImportedDecoratorStore, RequestRecord, RequestStore, StorageService};
use chainreq_types::{ChainId, ContractId, InterfaceId, Project};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub const CHAIN_ID: ChainId = 31337;
pub const EXAMPLE_CONTRACT: &str = "examples.exampleContract";
pub const EXAMPLE_BINARY: [u8; 5] = [0x60, 0x80, 0x60, 0x40, 0x52];

pub struct Fixture {
	pub chain: FakeChainReader,
	pub storage: Arc<StorageService>,
	pub registry: Arc<ContractDecoderRegistry>,
	pub reconciler: Arc<StatusReconciler>,
	pub projects: Arc<ProjectRegistry>,
	pub project: Project,
	pub other_project: Project,
}

fn project() -> Project {
	Project {
		id: Uuid::new_v4(),
		chain_id: CHAIN_ID,
		base_redirect_url: "https://example.com".to_string(),
		custom_rpc_url: None,
	}
}

impl Fixture {
	pub fn new() -> Self {
		let chain = FakeChainReader::new(&[CHAIN_ID]);
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));

		let mut registry = ContractDecoderRegistry::new(ImportedDecoratorStore::new(storage.clone()));
		registry.add_interface(
			InterfaceId::new("example.ownable"),
			serde_json::from_value(json!({
				"name": "Ownable",
				"tags": ["access"],
				"functionDecorators": [
					{ "signature": "getOwner()", "name": "Get owner", "description": "", "readOnly": true }
				]
			}))
			.unwrap(),
		);
		registry
			.add_decorator(
				ContractId::new(EXAMPLE_CONTRACT),
				&serde_json::from_value(example_artifact()).unwrap(),
				&serde_json::from_value(example_manifest()).unwrap(),
			)
			.unwrap();

		let (project, other_project) = (project(), project());
		let mut projects = ProjectRegistry::default();
		projects.insert("project-key".to_string(), project.clone());
		projects.insert("other-key".to_string(), other_project.clone());

		Self {
			reconciler: Arc::new(StatusReconciler::new(Arc::new(ChainReaderService::new(
				Box::new(chain.clone()),
			)))),
			chain,
			registry: Arc::new(registry),
			projects: Arc::new(projects),
			storage,
			project,
			other_project,
		}
	}

	pub fn store<T: RequestRecord>(&self) -> RequestStore<T> {
		RequestStore::new(self.storage.clone())
	}
}

fn example_artifact() -> serde_json::Value {
	json!({
		"contractName": "ExampleContract",
		"bytecode": format!("0x{}", hex_binary()),
		"abi": [
			{
				"type": "constructor",
				"stateMutability": "nonpayable",
				"inputs": [{ "name": "owner", "type": "address", "internalType": "address" }]
			},
			{
				"type": "function",
				"name": "getOwner",
				"stateMutability": "view",
				"inputs": [],
				"outputs": [{ "name": "", "type": "address", "internalType": "address" }]
			},
			{
				"type": "function",
				"name": "setOwner",
				"stateMutability": "nonpayable",
				"inputs": [{ "name": "newOwner", "type": "address", "internalType": "address" }],
				"outputs": []
			},
			{
				"type": "event",
				"name": "OwnerChanged",
				"anonymous": false,
				"inputs": [
					{ "name": "previousOwner", "type": "address", "indexed": true, "internalType": "address" },
					{ "name": "newOwner", "type": "address", "indexed": false, "internalType": "address" }
				]
			}
		]
	})
}

fn example_manifest() -> serde_json::Value {
	json!({
		"name": "Example contract",
		"description": "Ownable example",
		"tags": ["example"],
		"implements": ["example.ownable"],
		"constructorDecorators": [
			{
				"signature": "constructor(address)",
				"description": "Creates the contract",
				"parameterDecorators": [{ "name": "Owner", "description": "Initial owner" }]
			}
		],
		"functionDecorators": [
			{
				"signature": "setOwner(address)",
				"name": "Set owner",
				"description": "Transfers ownership",
				"parameterDecorators": [{ "name": "New owner", "description": "" }],
				"emittableEvents": ["OwnerChanged(address,address)"]
			}
		],
		"eventDecorators": [
			{
				"signature": "OwnerChanged(address,address)",
				"name": "Owner changed",
				"description": "",
				"parameterDecorators": [
					{ "name": "Previous owner", "description": "", "indexed": true },
					{ "name": "New owner", "description": "" }
				]
			}
		]
	})
}

fn hex_binary() -> String {
	EXAMPLE_BINARY.iter().map(|b| format!("{:02x}", b)).collect()
}
