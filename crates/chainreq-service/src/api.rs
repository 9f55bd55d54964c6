//! HTTP API over the request engine.
//!
//! Create, delete, import and interface-editing endpoints resolve the calling
//! project from the `X-API-KEY` header. Reads and the transaction attach
//! endpoints are public.

use axum::{
	extract::{rejection::JsonRejection, Path, Query, State},
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Json, Response},
	routing::{get, patch, post, put},
	Router,
};
use chainreq_core::RequestEngine;
use chainreq_types::api::{
	AssetMultiSendRequestResponse, AssetSendRequestResponse, AttachTransactionInfoRequest,
	ContractDecoratorsResponse, ContractDeploymentRequestResponse,
	ContractFunctionCallRequestResponse, ContractInterfacesResponse, CreateAssetMultiSendRequest,
	CreateAssetSendRequest, CreateContractDeploymentRequest,
	CreateContractFunctionCallRequest, CreateErc20LockRequest, Erc20LockRequestResponse,
	ErrorResponse, ImportContractRequest, ImportPreviewResponse,
	ImportedContractInterfacesRequest, RequestsResponse, SuggestedInterfacesResponse,
};
use chainreq_types::{
	Address, ApiError, ChainId, ContractDecorator, ContractDecoratorFilters,
	ContractDeploymentRequestFilters, ContractId, ContractInterface, InterfaceId, Project,
	ProjectId, RequestId,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

const API_KEY_HEADER: &str = "X-API-KEY";

/// HTTP server bound to the configured host and port.
pub struct ApiServer {
	host: String,
	port: u16,
	engine: Arc<RequestEngine>,
}

impl ApiServer {
	pub fn new(host: String, port: u16, engine: Arc<RequestEngine>) -> Self {
		Self { host, port, engine }
	}

	pub async fn run(self) -> anyhow::Result<()> {
		let app = router(self.engine);
		let address = format!("{}:{}", self.host, self.port);
		let listener = tokio::net::TcpListener::bind(&address).await?;

		info!("API server listening on {}", address);

		axum::serve(listener, app).await?;

		Ok(())
	}
}

#[derive(Clone)]
struct AppState {
	engine: Arc<RequestEngine>,
}

pub fn router(engine: Arc<RequestEngine>) -> Router {
	Router::new()
		.route("/health", get(health_check))
		// Contract deployments
		.route("/v1/deploy", post(create_deployment))
		.route(
			"/v1/deploy/{id}",
			get(get_deployment)
				.put(attach_deployment_tx)
				.delete(delete_deployment),
		)
		.route("/v1/deploy/by-project/{project_id}", get(list_deployments))
		.route(
			"/v1/deploy/by-project/{project_id}/by-alias/{alias}",
			get(get_deployment_by_alias),
		)
		// Function calls
		.route("/v1/function-call", post(create_function_call))
		.route(
			"/v1/function-call/{id}",
			get(get_function_call).put(attach_function_call_tx),
		)
		.route(
			"/v1/function-call/by-project/{project_id}",
			get(list_function_calls),
		)
		// ERC20 locks
		.route("/v1/lock", post(create_lock))
		.route("/v1/lock/{id}", get(get_lock).put(attach_lock_tx))
		.route("/v1/lock/by-project/{project_id}", get(list_locks))
		// Asset sends
		.route("/v1/send", post(create_send))
		.route("/v1/send/{id}", get(get_send).put(attach_send_tx))
		.route("/v1/send/by-project/{project_id}", get(list_sends))
		.route("/v1/send/by-sender/{sender}", get(list_sends_by_sender))
		.route("/v1/send/by-recipient/{recipient}", get(list_sends_by_recipient))
		// Multi-sends
		.route("/v1/multi-send", post(create_multi_send))
		.route("/v1/multi-send/{id}", get(get_multi_send))
		.route("/v1/multi-send/{id}/approve", put(attach_approve_tx))
		.route("/v1/multi-send/{id}/disperse", put(attach_disperse_tx))
		.route("/v1/multi-send/by-project/{project_id}", get(list_multi_sends))
		.route("/v1/multi-send/by-sender/{sender}", get(list_multi_sends_by_sender))
		// Contract import
		.route(
			"/v1/import-smart-contract/preview/{chain_id}/contract/{address}",
			get(preview_import),
		)
		.route("/v1/import-smart-contract", post(import_contract))
		.route(
			"/v1/import-smart-contract/{id}/suggested-interfaces",
			get(suggested_interfaces),
		)
		.route(
			"/v1/import-smart-contract/{id}/add-interfaces",
			patch(add_interfaces),
		)
		.route(
			"/v1/import-smart-contract/{id}/remove-interfaces",
			patch(remove_interfaces),
		)
		.route(
			"/v1/import-smart-contract/{id}/set-interfaces",
			patch(set_interfaces),
		)
		// Catalog
		.route("/v1/deployable-contracts", get(list_decorators))
		.route("/v1/deployable-contracts/{id}", get(get_decorator))
		.route("/v1/contract-interfaces", get(list_interfaces))
		.route("/v1/contract-interfaces/{id}", get(get_interface))
		.with_state(AppState { engine })
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
}

/// `ApiError` rendered as `{"error_code", "message"}` with the code's status.
struct HttpError(ApiError);

impl From<ApiError> for HttpError {
	fn from(error: ApiError) -> Self {
		Self(error)
	}
}

impl IntoResponse for HttpError {
	fn into_response(self) -> Response {
		let status = StatusCode::from_u16(self.0.code.http_status())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		if status.is_server_error() {
			tracing::warn!(error_code = %self.0.code, message = %self.0.message, "Request failed");
		}

		(
			status,
			Json(ErrorResponse {
				error_code: self.0.code,
				message: self.0.message,
			}),
		)
			.into_response()
	}
}

type ApiResult<T> = Result<Json<T>, HttpError>;

fn project<'a>(state: &'a AppState, headers: &HeaderMap) -> Result<&'a Project, HttpError> {
	let api_key = headers
		.get(API_KEY_HEADER)
		.and_then(|value| value.to_str().ok())
		.unwrap_or_default();

	Ok(state.engine.projects().by_api_key(api_key)?)
}

fn body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, HttpError> {
	body.map(|Json(body)| body)
		.map_err(|rejection| HttpError(ApiError::invalid_request(rejection.body_text())))
}

async fn health_check() -> StatusCode {
	StatusCode::OK
}

// Contract deployments

#[derive(Debug, Default, Deserialize)]
struct DeploymentListQuery {
	contract_ids: Option<String>,
	contract_tags: Option<String>,
	contract_implements: Option<String>,
	#[serde(default)]
	deployed_only: bool,
}

async fn create_deployment(
	State(state): State<AppState>,
	headers: HeaderMap,
	request: Result<Json<CreateContractDeploymentRequest>, JsonRejection>,
) -> ApiResult<ContractDeploymentRequestResponse> {
	let project = project(&state, &headers)?;
	let response = state
		.engine
		.deployments()
		.create(project, body(request)?)
		.await?;
	Ok(Json(response))
}

async fn get_deployment(
	State(state): State<AppState>,
	Path(id): Path<RequestId>,
) -> ApiResult<ContractDeploymentRequestResponse> {
	Ok(Json(state.engine.deployments().get(&id).await?))
}

async fn list_deployments(
	State(state): State<AppState>,
	Path(project_id): Path<ProjectId>,
	Query(query): Query<DeploymentListQuery>,
) -> ApiResult<RequestsResponse<ContractDeploymentRequestResponse>> {
	let filters = ContractDeploymentRequestFilters::parse(
		query.contract_ids.as_deref(),
		query.contract_tags.as_deref(),
		query.contract_implements.as_deref(),
		query.deployed_only,
	);
	let requests = state
		.engine
		.deployments()
		.list(&project_id, &filters)
		.await?;
	Ok(Json(RequestsResponse { requests }))
}

async fn get_deployment_by_alias(
	State(state): State<AppState>,
	Path((project_id, alias)): Path<(ProjectId, String)>,
) -> ApiResult<ContractDeploymentRequestResponse> {
	Ok(Json(
		state
			.engine
			.deployments()
			.get_by_alias(&project_id, &alias)
			.await?,
	))
}

async fn attach_deployment_tx(
	State(state): State<AppState>,
	Path(id): Path<RequestId>,
	request: Result<Json<AttachTransactionInfoRequest>, JsonRejection>,
) -> ApiResult<ContractDeploymentRequestResponse> {
	let response = state
		.engine
		.deployments()
		.attach_tx_info(&id, body(request)?)
		.await?;
	Ok(Json(response))
}

async fn delete_deployment(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<RequestId>,
) -> Result<StatusCode, HttpError> {
	let project = project(&state, &headers)?;
	state.engine.deployments().delete(&id, project).await?;
	Ok(StatusCode::OK)
}

// Function calls

#[derive(Debug, Default, Deserialize)]
struct FunctionCallListQuery {
	deployed_contract_id: Option<RequestId>,
	contract_address: Option<Address>,
}

async fn create_function_call(
	State(state): State<AppState>,
	headers: HeaderMap,
	request: Result<Json<CreateContractFunctionCallRequest>, JsonRejection>,
) -> ApiResult<ContractFunctionCallRequestResponse> {
	let project = project(&state, &headers)?;
	let response = state
		.engine
		.function_calls()
		.create(project, body(request)?)
		.await?;
	Ok(Json(response))
}

async fn get_function_call(
	State(state): State<AppState>,
	Path(id): Path<RequestId>,
) -> ApiResult<ContractFunctionCallRequestResponse> {
	Ok(Json(state.engine.function_calls().get(&id).await?))
}

async fn list_function_calls(
	State(state): State<AppState>,
	Path(project_id): Path<ProjectId>,
	Query(query): Query<FunctionCallListQuery>,
) -> ApiResult<RequestsResponse<ContractFunctionCallRequestResponse>> {
	let requests = state
		.engine
		.function_calls()
		.list(&project_id, query.deployed_contract_id, query.contract_address)
		.await?;
	Ok(Json(RequestsResponse { requests }))
}

async fn attach_function_call_tx(
	State(state): State<AppState>,
	Path(id): Path<RequestId>,
	request: Result<Json<AttachTransactionInfoRequest>, JsonRejection>,
) -> ApiResult<ContractFunctionCallRequestResponse> {
	let response = state
		.engine
		.function_calls()
		.attach_tx_info(&id, body(request)?)
		.await?;
	Ok(Json(response))
}

// ERC20 locks

async fn create_lock(
	State(state): State<AppState>,
	headers: HeaderMap,
	request: Result<Json<CreateErc20LockRequest>, JsonRejection>,
) -> ApiResult<Erc20LockRequestResponse> {
	let project = project(&state, &headers)?;
	let response = state.engine.locks().create(project, body(request)?).await?;
	Ok(Json(response))
}

async fn get_lock(
	State(state): State<AppState>,
	Path(id): Path<RequestId>,
) -> ApiResult<Erc20LockRequestResponse> {
	Ok(Json(state.engine.locks().get(&id).await?))
}

async fn list_locks(
	State(state): State<AppState>,
	Path(project_id): Path<ProjectId>,
) -> ApiResult<RequestsResponse<Erc20LockRequestResponse>> {
	let requests = state.engine.locks().list(&project_id).await?;
	Ok(Json(RequestsResponse { requests }))
}

async fn attach_lock_tx(
	State(state): State<AppState>,
	Path(id): Path<RequestId>,
	request: Result<Json<AttachTransactionInfoRequest>, JsonRejection>,
) -> ApiResult<Erc20LockRequestResponse> {
	let response = state
		.engine
		.locks()
		.attach_tx_info(&id, body(request)?)
		.await?;
	Ok(Json(response))
}

// Asset sends

async fn create_send(
	State(state): State<AppState>,
	headers: HeaderMap,
	request: Result<Json<CreateAssetSendRequest>, JsonRejection>,
) -> ApiResult<AssetSendRequestResponse> {
	let project = project(&state, &headers)?;
	let response = state.engine.sends().create(project, body(request)?).await?;
	Ok(Json(response))
}

async fn get_send(
	State(state): State<AppState>,
	Path(id): Path<RequestId>,
) -> ApiResult<AssetSendRequestResponse> {
	Ok(Json(state.engine.sends().get(&id).await?))
}

async fn list_sends(
	State(state): State<AppState>,
	Path(project_id): Path<ProjectId>,
) -> ApiResult<RequestsResponse<AssetSendRequestResponse>> {
	let requests = state.engine.sends().list(&project_id).await?;
	Ok(Json(RequestsResponse { requests }))
}

async fn list_sends_by_sender(
	State(state): State<AppState>,
	Path(sender): Path<Address>,
) -> ApiResult<RequestsResponse<AssetSendRequestResponse>> {
	let requests = state.engine.sends().list_by_sender(&sender).await?;
	Ok(Json(RequestsResponse { requests }))
}

async fn list_sends_by_recipient(
	State(state): State<AppState>,
	Path(recipient): Path<Address>,
) -> ApiResult<RequestsResponse<AssetSendRequestResponse>> {
	let requests = state.engine.sends().list_by_recipient(&recipient).await?;
	Ok(Json(RequestsResponse { requests }))
}

async fn attach_send_tx(
	State(state): State<AppState>,
	Path(id): Path<RequestId>,
	request: Result<Json<AttachTransactionInfoRequest>, JsonRejection>,
) -> ApiResult<AssetSendRequestResponse> {
	let response = state
		.engine
		.sends()
		.attach_tx_info(&id, body(request)?)
		.await?;
	Ok(Json(response))
}

// Multi-sends

async fn create_multi_send(
	State(state): State<AppState>,
	headers: HeaderMap,
	request: Result<Json<CreateAssetMultiSendRequest>, JsonRejection>,
) -> ApiResult<AssetMultiSendRequestResponse> {
	let project = project(&state, &headers)?;
	let response = state
		.engine
		.multi_sends()
		.create(project, body(request)?)
		.await?;
	Ok(Json(response))
}

async fn get_multi_send(
	State(state): State<AppState>,
	Path(id): Path<RequestId>,
) -> ApiResult<AssetMultiSendRequestResponse> {
	Ok(Json(state.engine.multi_sends().get(&id).await?))
}

async fn list_multi_sends(
	State(state): State<AppState>,
	Path(project_id): Path<ProjectId>,
) -> ApiResult<RequestsResponse<AssetMultiSendRequestResponse>> {
	let requests = state.engine.multi_sends().list(&project_id).await?;
	Ok(Json(RequestsResponse { requests }))
}

async fn list_multi_sends_by_sender(
	State(state): State<AppState>,
	Path(sender): Path<Address>,
) -> ApiResult<RequestsResponse<AssetMultiSendRequestResponse>> {
	let requests = state.engine.multi_sends().list_by_sender(&sender).await?;
	Ok(Json(RequestsResponse { requests }))
}

async fn attach_approve_tx(
	State(state): State<AppState>,
	Path(id): Path<RequestId>,
	request: Result<Json<AttachTransactionInfoRequest>, JsonRejection>,
) -> ApiResult<AssetMultiSendRequestResponse> {
	let response = state
		.engine
		.multi_sends()
		.attach_approve_tx_info(&id, body(request)?)
		.await?;
	Ok(Json(response))
}

async fn attach_disperse_tx(
	State(state): State<AppState>,
	Path(id): Path<RequestId>,
	request: Result<Json<AttachTransactionInfoRequest>, JsonRejection>,
) -> ApiResult<AssetMultiSendRequestResponse> {
	let response = state
		.engine
		.multi_sends()
		.attach_disperse_tx_info(&id, body(request)?)
		.await?;
	Ok(Json(response))
}

// Contract import

async fn preview_import(
	State(state): State<AppState>,
	Path((chain_id, address)): Path<(ChainId, Address)>,
) -> ApiResult<ImportPreviewResponse> {
	let decorator = state.engine.imports().preview(chain_id, address).await?;
	Ok(Json(ImportPreviewResponse { decorator }))
}

async fn import_contract(
	State(state): State<AppState>,
	headers: HeaderMap,
	request: Result<Json<ImportContractRequest>, JsonRejection>,
) -> ApiResult<ContractDeploymentRequestResponse> {
	let project = project(&state, &headers)?;
	let id = state
		.engine
		.imports()
		.import(project, body(request)?)
		.await?;
	Ok(Json(state.engine.deployments().get(&id).await?))
}

async fn suggested_interfaces(
	State(state): State<AppState>,
	Path(id): Path<RequestId>,
) -> ApiResult<SuggestedInterfacesResponse> {
	Ok(Json(state.engine.interfaces().suggested(&id).await?))
}

async fn add_interfaces(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<RequestId>,
	request: Result<Json<ImportedContractInterfacesRequest>, JsonRejection>,
) -> ApiResult<ContractDeploymentRequestResponse> {
	let project = project(&state, &headers)?;
	state
		.engine
		.interfaces()
		.add(&id, project, body(request)?)
		.await?;
	Ok(Json(state.engine.deployments().get(&id).await?))
}

async fn remove_interfaces(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<RequestId>,
	request: Result<Json<ImportedContractInterfacesRequest>, JsonRejection>,
) -> ApiResult<ContractDeploymentRequestResponse> {
	let project = project(&state, &headers)?;
	state
		.engine
		.interfaces()
		.remove(&id, project, body(request)?)
		.await?;
	Ok(Json(state.engine.deployments().get(&id).await?))
}

async fn set_interfaces(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<RequestId>,
	request: Result<Json<ImportedContractInterfacesRequest>, JsonRejection>,
) -> ApiResult<ContractDeploymentRequestResponse> {
	let project = project(&state, &headers)?;
	state
		.engine
		.interfaces()
		.set(&id, project, body(request)?)
		.await?;
	Ok(Json(state.engine.deployments().get(&id).await?))
}

// Catalog

#[derive(Debug, Default, Deserialize)]
struct DecoratorListQuery {
	tags: Option<String>,
	implements: Option<String>,
}

async fn list_decorators(
	State(state): State<AppState>,
	Query(query): Query<DecoratorListQuery>,
) -> Json<ContractDecoratorsResponse> {
	let filters =
		ContractDecoratorFilters::parse(query.tags.as_deref(), query.implements.as_deref());
	Json(ContractDecoratorsResponse {
		decorators: state.engine.catalog().list_decorators(&filters),
	})
}

async fn get_decorator(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> ApiResult<ContractDecorator> {
	Ok(Json(
		state.engine.catalog().get_decorator(&ContractId::new(id))?,
	))
}

async fn list_interfaces(State(state): State<AppState>) -> Json<ContractInterfacesResponse> {
	Json(ContractInterfacesResponse {
		interfaces: state.engine.catalog().list_interfaces(),
	})
}

async fn get_interface(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> ApiResult<ContractInterface> {
	Ok(Json(
		state.engine.catalog().get_interface(&InterfaceId::new(id))?,
	))
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::body::Body;
	use axum::http::Request;
	use chainreq_chain::testing::{FakeChainReader, FakeTransaction};
	use chainreq_contracts::predefined::lock_call_data;
	use chainreq_core::EngineBuilder;
	use chainreq_types::{Bytes, Status, U256};
	use serde_json::{json, Value};
	use tower::ServiceExt;

	const PROJECT_ID: &str = "3f0c2a7e-5b7a-4d4f-9a57-2f1c0c7c2b11";
	const API_KEY: &str = "test-key";

	async fn app() -> (Router, FakeChainReader) {
		let config = toml::from_str(&format!(
			r#"
[service]
name = "chainreq-test"

[chains.31337]
rpc_url = "http://localhost:8545"

[[projects]]
id = "{}"
api_key = "{}"
chain_id = 31337
base_redirect_url = "https://example.com"
"#,
			PROJECT_ID, API_KEY
		))
		.unwrap();

		let chain = FakeChainReader::new(&[31337]);
		let engine = EngineBuilder::new(config)
			.with_chain_reader(Box::new(chain.clone()))
			.build()
			.await
			.unwrap();

		(router(Arc::new(engine)), chain)
	}

	async fn send(
		app: &Router,
		method: &str,
		uri: &str,
		api_key: Option<&str>,
		body: Option<Value>,
	) -> (StatusCode, Value) {
		let mut request = Request::builder().method(method).uri(uri);
		if let Some(api_key) = api_key {
			request = request.header(API_KEY_HEADER, api_key);
		}
		let request = match body {
			Some(body) => request
				.header("content-type", "application/json")
				.body(Body::from(body.to_string()))
				.unwrap(),
			None => request.body(Body::empty()).unwrap(),
		};

		let response = app.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		let value = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).unwrap()
		};
		(status, value)
	}

	fn lock_body() -> Value {
		json!({
			"token_address": "0x7070707070707070707070707070707070707070",
			"amount": "1000",
			"lock_duration_in_seconds": 3600,
			"lock_contract_address": "0x1010101010101010101010101010101010101010",
			"sender_address": null,
		})
	}

	#[tokio::test]
	async fn test_health() {
		let (app, _) = app().await;
		let (status, _) = send(&app, "GET", "/health", None, None).await;
		assert_eq!(status, StatusCode::OK);
	}

	#[tokio::test]
	async fn test_create_requires_api_key() {
		let (app, _) = app().await;

		let (status, body) = send(&app, "POST", "/v1/lock", None, Some(lock_body())).await;
		assert_eq!(status, StatusCode::UNAUTHORIZED);
		assert_eq!(body["error_code"], "NON_EXISTENT_API_KEY");

		let (status, _) = send(&app, "POST", "/v1/lock", Some("wrong"), Some(lock_body())).await;
		assert_eq!(status, StatusCode::UNAUTHORIZED);
	}

	#[tokio::test]
	async fn test_lock_over_http() {
		let (app, chain) = app().await;

		let (status, created) =
			send(&app, "POST", "/v1/lock", Some(API_KEY), Some(lock_body())).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(created["status"], "PENDING");
		let id = created["id"].as_str().unwrap().to_string();

		let sender = Address::repeat_byte(0x55);
		let tx_hash = chain.mine_transaction(FakeTransaction::new(
			sender,
			Some(Address::repeat_byte(0x10)),
			lock_call_data(
				Address::repeat_byte(0x70),
				U256::from(1000),
				3600,
				id.clone(),
			),
		));

		let attach = json!({ "tx_hash": tx_hash, "caller_address": sender });
		let (status, attached) = send(
			&app,
			"PUT",
			&format!("/v1/lock/{}", id),
			None,
			Some(attach.clone()),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(attached["status"], serde_json::to_value(Status::Success).unwrap());
		assert!(attached["unlocks_at"].is_string());

		let (status, error) =
			send(&app, "PUT", &format!("/v1/lock/{}", id), None, Some(attach)).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(error["error_code"], "TX_INFO_ALREADY_SET");

		let (status, listed) = send(
			&app,
			"GET",
			&format!("/v1/lock/by-project/{}", PROJECT_ID),
			None,
			None,
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(listed["requests"].as_array().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_errors_are_rendered() {
		let (app, _) = app().await;

		let (status, body) = send(
			&app,
			"GET",
			"/v1/deploy/6a1f5d5e-4a5b-4b5e-8f1e-0c9d3b2a1f00",
			None,
			None,
		)
		.await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body["error_code"], "RESOURCE_NOT_FOUND");

		let (status, body) = send(
			&app,
			"POST",
			"/v1/multi-send",
			Some(API_KEY),
			Some(json!({ "asset_type": "NATIVE" })),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error_code"], "INVALID_REQUEST_BODY");

		let (status, body) =
			send(&app, "GET", "/v1/contract-interfaces/missing.interface", None, None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body["error_code"], "CONTRACT_INTERFACE_NOT_FOUND");
	}

	#[tokio::test]
	async fn test_multi_send_by_sender() {
		let (app, _) = app().await;
		let sender = "0x5555555555555555555555555555555555555555";

		let (status, _) = send(
			&app,
			"POST",
			"/v1/multi-send",
			Some(API_KEY),
			Some(json!({
				"asset_type": "NATIVE",
				"token_address": null,
				"disperse_contract_address": "0xd1d1d1d1d1d1d1d1d1d1d1d1d1d1d1d1d1d1d1d1",
				"assets": [
					{ "wallet_address": "0x0101010101010101010101010101010101010101", "amount": "5", "item_name": null }
				],
				"sender_address": sender,
			})),
		)
		.await;
		assert_eq!(status, StatusCode::OK);

		let (status, listed) = send(
			&app,
			"GET",
			&format!("/v1/multi-send/by-sender/{}", sender),
			None,
			None,
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(listed["requests"].as_array().unwrap().len(), 1);
		assert_eq!(listed["requests"][0]["disperse_status"], "PENDING");
		assert!(listed["requests"][0]["approve_status"].is_null());
	}

	#[tokio::test]
	async fn test_native_send_over_http() {
		let (app, chain) = app().await;
		let recipient = Address::repeat_byte(0x44);

		let (status, created) = send(
			&app,
			"POST",
			"/v1/send",
			Some(API_KEY),
			Some(json!({
				"asset_type": "NATIVE",
				"token_address": null,
				"amount": "500",
				"sender_address": null,
				"recipient_address": recipient,
			})),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(created["status"], "PENDING");
		assert_eq!(created["asset_type"], "NATIVE");
		assert!(created["events"].is_null());
		let id = created["id"].as_str().unwrap().to_string();

		let sender = Address::repeat_byte(0x55);
		let tx_hash = chain.mine_transaction(
			FakeTransaction::new(sender, Some(recipient), Bytes::new()).with_value(U256::from(500)),
		);
		let (status, attached) = send(
			&app,
			"PUT",
			&format!("/v1/send/{}", id),
			None,
			Some(json!({ "tx_hash": tx_hash, "caller_address": sender })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(attached["status"], "SUCCESS");
		assert_eq!(attached["events"], json!([]));

		for uri in [
			format!("/v1/send/by-project/{}", PROJECT_ID),
			format!("/v1/send/by-sender/{}", sender),
			format!("/v1/send/by-recipient/{}", recipient),
		] {
			let (status, listed) = send(&app, "GET", &uri, None, None).await;
			assert_eq!(status, StatusCode::OK);
			assert_eq!(listed["requests"].as_array().unwrap().len(), 1);
		}
	}
}
