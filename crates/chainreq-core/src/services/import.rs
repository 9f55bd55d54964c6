//! Importing contracts that were deployed outside of this service.
//!
//! An import produces a deployment request that is `SUCCESS` from the start.
//! Three sources are tried in order:
//!
//! 1. a deployment request of any project already tracking the address on the
//!    same chain, which is copied into the importing project;
//! 2. an explicit deployable contract id, whose binary must prefix the
//!    on-chain creation data;
//! 3. a decorator synthesized from the runtime bytecode, stored for the
//!    importing project under `imported-<address>-<chain id>`.

use crate::projector::DEPLOY_REDIRECT_PATH;
use crate::reconciler::StatusReconciler;
use crate::utils::validate_body;
use chainreq_chain::ContractDeployment;
use chainreq_contracts::encoding::{decode_constructor_params, raw_constructor_params};
use chainreq_contracts::{ContractDecoderRegistry, ContractError};
use chainreq_storage::RequestStore;
use chainreq_types::api::ImportContractRequest;
use chainreq_types::{
	Address, ApiError, Bytes, ChainId, ChainSpec, ContractDecorator, ContractDeploymentRequest,
	ContractId, ImportedDecorator, ManifestJson, Project, RequestId, U256,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct ImportService {
	store: RequestStore<ContractDeploymentRequest>,
	registry: Arc<ContractDecoderRegistry>,
	reconciler: Arc<StatusReconciler>,
}

/// Decorator and creation details derived from on-chain data.
struct ImportedContract {
	contract_id: ContractId,
	decorator: ContractDecorator,
	contract_data: Bytes,
	constructor_params: serde_json::Value,
	deployment: ContractDeployment,
}

impl ImportService {
	pub fn new(
		store: RequestStore<ContractDeploymentRequest>,
		registry: Arc<ContractDecoderRegistry>,
		reconciler: Arc<StatusReconciler>,
	) -> Self {
		Self {
			store,
			registry,
			reconciler,
		}
	}

	/// Decorator the contract at `address` would be imported with. Nothing is
	/// stored.
	pub async fn preview(
		&self,
		chain_id: ChainId,
		address: Address,
	) -> Result<ContractDecorator, ApiError> {
		if let Some(existing) = self.find_existing(chain_id, address).await? {
			let decorator = if existing.imported {
				self.registry
					.get_imported_decorator(&existing.contract_id, &existing.project_id)
					.await?
			} else {
				self.registry.get_decorator(&existing.contract_id)
			};

			return Ok(decorator
				.ok_or_else(|| ContractError::NotFound(existing.contract_id.to_string()))?);
		}

		let deployment = self.locate(&ChainSpec::new(chain_id), address).await?;
		let (_, decorator) = self.synthesize(chain_id, address, &deployment)?;
		Ok(decorator)
	}

	pub async fn import(
		&self,
		project: &Project,
		body: ImportContractRequest,
	) -> Result<RequestId, ApiError> {
		validate_body(&body)?;

		let address = body.contract_address;
		let id = Uuid::new_v4();

		let request = match self.find_existing(project.chain_id, address).await? {
			Some(existing) => self.copy_existing(project, id, existing, &body).await?,
			None => {
				let contract = match body.contract_id.as_deref() {
					Some(contract_id) => {
						self.with_known_decorator(project, address, ContractId::new(contract_id))
							.await?
					}
					None => self.with_synthesized_decorator(project, address).await?,
				};
				self.new_request(project, id, contract, address, &body)
			}
		};

		let request = self.store.store(request).await?;
		tracing::info!(
			request_id = %request.id,
			project_id = %project.id,
			contract_id = %request.contract_id,
			contract_address = %address,
			"Imported contract"
		);

		Ok(request.id)
	}

	async fn find_existing(
		&self,
		chain_id: ChainId,
		address: Address,
	) -> Result<Option<ContractDeploymentRequest>, ApiError> {
		let existing = self
			.store
			.get_all(|request| {
				request.chain_id == chain_id && request.contract_address == Some(address)
			})
			.await?;

		Ok(existing.into_iter().next())
	}

	async fn copy_existing(
		&self,
		project: &Project,
		id: Uuid,
		existing: ContractDeploymentRequest,
		body: &ImportContractRequest,
	) -> Result<ContractDeploymentRequest, ApiError> {
		if existing.imported && existing.project_id != project.id {
			self.copy_imported_decorator(&existing, project).await?;
		}

		tracing::debug!(
			source_request_id = %existing.id,
			contract_address = %body.contract_address,
			"Copying existing deployment into project"
		);

		Ok(ContractDeploymentRequest {
			id,
			alias: body.alias.clone(),
			redirect_url: project.create_redirect_url(
				body.redirect_url.as_deref(),
				id,
				DEPLOY_REDIRECT_PATH,
			),
			project_id: project.id,
			created_at: Utc::now(),
			arbitrary_data: body.arbitrary_data.clone(),
			screen_config: body.screen_config.clone().unwrap_or_default(),
			..existing
		})
	}

	async fn copy_imported_decorator(
		&self,
		existing: &ContractDeploymentRequest,
		project: &Project,
	) -> Result<(), ApiError> {
		if self
			.registry
			.get_imported(&existing.contract_id, &project.id)
			.await?
			.is_some()
		{
			return Ok(());
		}

		let source = self
			.registry
			.get_imported(&existing.contract_id, &existing.project_id)
			.await?
			.ok_or_else(|| ContractError::NotFound(existing.contract_id.to_string()))?;

		self.registry
			.store_imported(&ImportedDecorator {
				project_id: project.id,
				..source
			})
			.await?;
		Ok(())
	}

	async fn with_known_decorator(
		&self,
		project: &Project,
		address: Address,
		contract_id: ContractId,
	) -> Result<ImportedContract, ApiError> {
		let decorator = self
			.registry
			.resolve(&contract_id, &project.id)
			.await?
			.ok_or_else(|| {
				ApiError::not_found(format!("Contract decorator {} not found", contract_id))
			})?;

		let deployment = self.locate(&project.chain_spec(), address).await?;
		let deployed = creation_code(&deployment);

		let Some(encoded_params) = deployed.strip_prefix(&decorator.binary[..]) else {
			tracing::warn!(
				contract_id = %contract_id,
				contract_address = %address,
				"Deployed binary does not match decorator"
			);
			return Err(ContractError::BinaryMismatch(format!(
				"Contract at {} was not created from {}",
				address, contract_id
			))
			.into());
		};

		let inputs = decorator
			.constructors
			.first()
			.map(|c| c.inputs.as_slice())
			.unwrap_or_default();
		let constructor_params = decode_constructor_params(inputs, encoded_params)?;

		Ok(ImportedContract {
			contract_id,
			contract_data: Bytes::copy_from_slice(deployed),
			decorator,
			constructor_params,
			deployment,
		})
	}

	async fn with_synthesized_decorator(
		&self,
		project: &Project,
		address: Address,
	) -> Result<ImportedContract, ApiError> {
		let deployment = self.locate(&project.chain_spec(), address).await?;
		let (manifest, decorator) = self.synthesize(project.chain_id, address, &deployment)?;

		self.registry
			.store_imported(&ImportedDecorator {
				project_id: project.id,
				manifest,
				decorator: decorator.clone(),
			})
			.await?;

		let deployed = creation_code(&deployment);
		let constructor_params = raw_constructor_params(&deployed[decorator.binary.len()..]);

		Ok(ImportedContract {
			contract_id: decorator.id.clone(),
			contract_data: Bytes::copy_from_slice(deployed),
			decorator,
			constructor_params,
			deployment,
		})
	}

	async fn locate(
		&self,
		chain: &ChainSpec,
		address: Address,
	) -> Result<ContractDeployment, ApiError> {
		self.reconciler
			.chain()
			.find_contract_deployment(chain, address)
			.await?
			.ok_or_else(|| {
				ContractError::NotFound(format!("No contract deployed at {}", address)).into()
			})
	}

	/// Builds a decorator from the runtime bytecode. The decorator binary is
	/// the creation code up to and including the runtime code; anything after
	/// it is treated as constructor arguments.
	fn synthesize(
		&self,
		chain_id: ChainId,
		address: Address,
		deployment: &ContractDeployment,
	) -> Result<(ManifestJson, ContractDecorator), ApiError> {
		let runtime = deployment.binary();
		let deployed = creation_code(deployment);
		let binary_end = deployed
			.windows(runtime.len())
			.position(|window| window == &runtime[..])
			.map_or(deployed.len(), |start| start + runtime.len());

		let manifest = self.registry.synthesize_manifest(runtime);
		let decorator = self.registry.build_imported(
			ContractId::imported(&address, chain_id),
			Bytes::copy_from_slice(&deployed[..binary_end]),
			&manifest,
		)?;

		Ok((manifest, decorator))
	}

	fn new_request(
		&self,
		project: &Project,
		id: Uuid,
		contract: ImportedContract,
		address: Address,
		body: &ImportContractRequest,
	) -> ContractDeploymentRequest {
		let (tx_hash, deployer_address, initial_eth_amount) = match contract.deployment {
			ContractDeployment::Full {
				tx_hash,
				from,
				value,
				..
			} => (Some(tx_hash), Some(from), value),
			ContractDeployment::BinaryOnly { .. } => (None, None, U256::ZERO),
		};

		ContractDeploymentRequest {
			id,
			alias: body.alias.clone(),
			name: contract.decorator.name,
			description: contract.decorator.description,
			contract_id: contract.contract_id,
			contract_data: contract.contract_data,
			constructor_params: contract.constructor_params,
			contract_tags: contract.decorator.tags,
			contract_implements: contract.decorator.implements,
			initial_eth_amount,
			chain_id: project.chain_id,
			redirect_url: project.create_redirect_url(
				body.redirect_url.as_deref(),
				id,
				DEPLOY_REDIRECT_PATH,
			),
			project_id: project.id,
			created_at: Utc::now(),
			arbitrary_data: body.arbitrary_data.clone(),
			screen_config: body.screen_config.clone().unwrap_or_default(),
			contract_address: Some(address),
			deployer_address,
			tx_hash,
			imported: true,
		}
	}
}

/// Creation input when the creating transaction is known, else runtime code.
fn creation_code(deployment: &ContractDeployment) -> &[u8] {
	match deployment {
		ContractDeployment::Full { data, .. } => &data[..],
		ContractDeployment::BinaryOnly { binary } => &binary[..],
	}
}
