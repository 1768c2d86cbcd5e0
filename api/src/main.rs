use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use meridian_adapters::{prefetch_token_state, AdapterError, BlockSource, BlockTranslator, SolanaAdapter};
use meridian_core::config::Settings;
use meridian_core::models::Block;
use meridian_core::network::{NetworkIdentifier, HISTORICAL_BALANCE_SUPPORTED};
use meridian_core::taxonomy::StatusDescriptor;
use meridian_core::{MeridianError, Network, OperationType, Taxonomy};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

struct AppState {
    adapter: SolanaAdapter,
    taxonomy: Taxonomy,
    settings: Settings,
}

impl AppState {
    /// Rejects requests addressed to any network other than the one served.
    fn network(&self, requested: &NetworkIdentifier) -> Result<Network, ApiError> {
        let network = requested.resolve()?;
        if network != self.settings.network {
            return Err(MeridianError::UnsupportedNetwork(network.to_string()).into());
        }
        Ok(network)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    let adapter = SolanaAdapter::new(&settings.rpc_url);
    info!(network = %settings.network, rpc = %adapter.url(), "serving");

    let addr = settings.listen_addr;
    let shared_state = Arc::new(AppState {
        adapter,
        taxonomy: Taxonomy::solana(),
        settings,
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/network/list", post(network_list))
        .route("/network/options", post(network_options))
        .route("/block", post(block))
        .route("/call", post(call))
        .with_state(shared_state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

// Errors

enum ApiError {
    Rejected(MeridianError),
    NotFound(u64),
    Upstream(String),
    Internal(String),
}

impl From<MeridianError> for ApiError {
    fn from(err: MeridianError) -> Self {
        ApiError::Rejected(err)
    }
}

impl From<AdapterError> for ApiError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Rejected(err) => ApiError::Rejected(err),
            AdapterError::BlockNotFound(slot) => ApiError::NotFound(slot),
            AdapterError::Upstream(err) => ApiError::Upstream(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Rejected(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::NotFound(slot) => (StatusCode::NOT_FOUND, format!("block not found at slot {slot}")),
            ApiError::Upstream(message) => {
                warn!(%message, "upstream failure");
                (StatusCode::BAD_GATEWAY, message)
            }
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

// Request / Response Models

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkRequest {
    network_identifier: NetworkIdentifier,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockRequest {
    network_identifier: NetworkIdentifier,
    /// Native slot to fetch.
    index: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallRequest {
    network_identifier: NetworkIdentifier,
    method: String,
    #[serde(default)]
    parameters: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NetworkListResponse {
    network_identifiers: Vec<NetworkIdentifier>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Allow {
    operation_types: Vec<OperationType>,
    operation_statuses: Vec<StatusDescriptor>,
    call_methods: Vec<&'static str>,
    historical_balance_lookup: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NetworkOptionsResponse {
    genesis_block_identifier: meridian_core::models::BlockIdentifier,
    allow: Allow,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BlockResponse {
    block: Block,
    /// Slot the block was fetched at. `block.blockIdentifier.index` is the
    /// parent slot, so the two differ.
    slot: u64,
}

#[derive(Serialize)]
struct CallResponse {
    result: Value,
    idempotent: bool,
}

// Handlers

async fn network_list(State(state): State<Arc<AppState>>) -> Json<NetworkListResponse> {
    Json(NetworkListResponse {
        network_identifiers: vec![state.settings.network.into()],
    })
}

async fn network_options(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NetworkRequest>,
) -> Result<Json<NetworkOptionsResponse>, ApiError> {
    let network = state.network(&payload.network_identifier)?;
    let taxonomy = &state.taxonomy;

    Ok(Json(NetworkOptionsResponse {
        genesis_block_identifier: network.genesis().block_identifier,
        allow: Allow {
            operation_types: taxonomy.operation_types().to_vec(),
            operation_statuses: taxonomy.status_descriptors(),
            call_methods: taxonomy.call_methods().to_vec(),
            historical_balance_lookup: HISTORICAL_BALANCE_SUPPORTED,
        },
    }))
}

/// Fetches the block at native slot `index` and translates it.
///
/// The returned `blockIdentifier.index` is the block's `parentSlot`, not the
/// requested slot; the requested slot is echoed back as `slot`.
async fn block(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BlockRequest>,
) -> Result<Json<BlockResponse>, ApiError> {
    let network = state.network(&payload.network_identifier)?;

    let raw = state.adapter.get_confirmed_block(payload.index).await?;
    let accounts =
        prefetch_token_state(&state.adapter, &raw, state.settings.fetch_concurrency).await?;
    let block = BlockTranslator::new(network, &state.taxonomy)
        .with_account_state(&accounts)
        .translate(&raw);

    info!(
        slot = payload.index,
        transactions = block.transactions.len(),
        "translated block"
    );
    Ok(Json(BlockResponse {
        block,
        slot: payload.index,
    }))
}

async fn call(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CallRequest>,
) -> Result<Json<CallResponse>, ApiError> {
    state.network(&payload.network_identifier)?;

    let result = state
        .adapter
        .call(&state.taxonomy, &payload.method, payload.parameters)
        .await?;
    Ok(Json(CallResponse {
        result,
        idempotent: false,
    }))
}
