use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use sentra_core::auth::Authenticator;
use sentra_core::db::{
    AnalyticsReader, BranchReader, Database, SecretScope, SecretStore, SyncLogStore,
    SyncReconciler,
};
use sentra_core::models::{
    BranchSnapshot, BranchSummary, BreakdownSlice, MonthlyPoint, SyncLogEntry,
};
use sentra_core::BranchBatch;

use crate::auth::{self, require_executive};
use crate::config::AppConfig;
use crate::error::ApiError;

/// How many audit entries the log listing returns
const SYNC_LOG_LIMIT: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<Database>,
    pub authenticator: Arc<Authenticator>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, db: Arc<Database>) -> Self {
        let authenticator = Arc::new(Authenticator::new(config.executive_master_key.clone()));
        Self {
            config,
            db,
            authenticator,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let executive_routes = Router::new()
        .route("/dashboard/branches-summary", get(branches_summary))
        .route("/dashboard/income-over-time", get(income_over_time))
        .route("/dashboard/customers-over-time", get(customers_over_time))
        .route(
            "/dashboard/income-over-time-cumulative",
            get(income_over_time_cumulative),
        )
        .route(
            "/dashboard/customers-over-time-cumulative",
            get(customers_over_time_cumulative),
        )
        .route(
            "/dashboard/on-time-payment-ratio",
            get(on_time_payment_ratio),
        )
        .route("/secrets", post(upsert_secret))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_executive,
        ));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/sync/branch-data", post(push_branch_data))
        .route("/sync/branch-data/{branch_id}", get(pull_branch_data))
        // Audit listing carries no credentials
        .route("/sync/logs", get(sync_logs))
        .merge(executive_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    success: bool,
    message: &'static str,
}

#[derive(Debug, Deserialize)]
struct SyncRequest {
    branch_id: Option<i64>,
    #[serde(flatten)]
    batch: BranchBatch,
}

async fn push_branch_data(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SyncRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let conn = state.db.acquire().await?;
    let branch_id = state
        .authenticator
        .authorize_branch(&conn, request.branch_id, auth::api_key(&headers))
        .await?;

    let receipt = SyncReconciler::new(&conn)
        .reconcile(branch_id, &request.batch)
        .await
        .map_err(|error| {
            tracing::error!(branch_id, "branch sync failed: {error}");
            ApiError::internal("Sync failed")
        })?;

    tracing::info!(
        branch_id,
        records = receipt.records_synced,
        "branch batch reconciled"
    );
    Ok(Json(StatusResponse {
        success: true,
        message: "Sync successful",
    }))
}

async fn pull_branch_data(
    State(state): State<AppState>,
    Path(branch_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<BranchSnapshot>, ApiError> {
    let conn = state.db.acquire().await?;
    let branch_id = state
        .authenticator
        .authorize_branch(&conn, Some(branch_id), auth::api_key(&headers))
        .await?;

    let snapshot = BranchReader::new(&conn)
        .fetch_branch(branch_id)
        .await
        .map_err(|error| {
            tracing::error!(branch_id, "branch fetch failed: {error}");
            ApiError::internal("Failed to fetch branch data")
        })?;
    Ok(Json(snapshot))
}

async fn sync_logs(State(state): State<AppState>) -> Result<Json<Vec<SyncLogEntry>>, ApiError> {
    let conn = state.db.acquire().await?;
    let entries = SyncLogStore::new(&conn)
        .recent(SYNC_LOG_LIMIT)
        .await
        .map_err(|error| {
            tracing::error!("sync log listing failed: {error}");
            ApiError::internal("Failed to retrieve logs")
        })?;
    Ok(Json(entries))
}

async fn branches_summary(
    State(state): State<AppState>,
) -> Result<Json<Vec<BranchSummary>>, ApiError> {
    let conn = state.db.acquire().await?;
    let rows = AnalyticsReader::new(&conn)
        .branches_summary()
        .await
        .map_err(|error| {
            tracing::error!("branches summary failed: {error}");
            ApiError::internal("Error fetching summary")
        })?;
    Ok(Json(rows))
}

async fn income_over_time(
    State(state): State<AppState>,
) -> Result<Json<Vec<MonthlyPoint>>, ApiError> {
    let conn = state.db.acquire().await?;
    let points = AnalyticsReader::new(&conn)
        .income_over_time()
        .await
        .map_err(|error| {
            tracing::error!("income over time failed: {error}");
            ApiError::internal("Failed to retrieve income over time")
        })?;
    Ok(Json(points))
}

async fn customers_over_time(
    State(state): State<AppState>,
) -> Result<Json<Vec<MonthlyPoint>>, ApiError> {
    let conn = state.db.acquire().await?;
    let points = AnalyticsReader::new(&conn)
        .customers_over_time()
        .await
        .map_err(|error| {
            tracing::error!("customers over time failed: {error}");
            ApiError::internal("Failed to retrieve customer count by time")
        })?;
    Ok(Json(points))
}

async fn income_over_time_cumulative(
    State(state): State<AppState>,
) -> Result<Json<Vec<MonthlyPoint>>, ApiError> {
    let conn = state.db.acquire().await?;
    let points = AnalyticsReader::new(&conn)
        .income_over_time_cumulative()
        .await
        .map_err(|error| {
            tracing::error!("cumulative income failed: {error}");
            ApiError::internal("Failed to retrieve cumulative income over time")
        })?;
    Ok(Json(points))
}

async fn customers_over_time_cumulative(
    State(state): State<AppState>,
) -> Result<Json<Vec<MonthlyPoint>>, ApiError> {
    let conn = state.db.acquire().await?;
    let points = AnalyticsReader::new(&conn)
        .customers_over_time_cumulative()
        .await
        .map_err(|error| {
            tracing::error!("cumulative customers failed: {error}");
            ApiError::internal("Failed to retrieve cumulative customer count over time")
        })?;
    Ok(Json(points))
}

async fn on_time_payment_ratio(
    State(state): State<AppState>,
) -> Result<Json<Vec<BreakdownSlice>>, ApiError> {
    let conn = state.db.acquire().await?;
    let slices = AnalyticsReader::new(&conn)
        .on_time_payment_breakdown()
        .await
        .map_err(|error| {
            tracing::error!("on-time breakdown failed: {error}");
            ApiError::internal("Failed to retrieve on time payment ratio")
        })?;
    Ok(Json(slices))
}

#[derive(Debug, Deserialize)]
struct SecretRequest {
    user_id: Option<i64>,
    branch_id: Option<i64>,
    #[serde(alias = "newKey")]
    new_key: String,
}

async fn upsert_secret(
    State(state): State<AppState>,
    Json(request): Json<SecretRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let scope = match (request.branch_id, request.user_id) {
        (Some(branch_id), None) => SecretScope::Branch(branch_id),
        (None, Some(user_id)) => SecretScope::User(user_id),
        _ => {
            return Err(ApiError::bad_request(
                "exactly one of branch_id or user_id must be set",
            ))
        }
    };
    if request.new_key.trim().is_empty() {
        return Err(ApiError::bad_request("new_key must not be empty"));
    }

    let conn = state.db.acquire().await?;
    SecretStore::new(&conn)
        .upsert(scope, request.new_key.trim())
        .await
        .map_err(|error| {
            tracing::error!("secret rotation failed: {error}");
            ApiError::internal("Add secrets failed")
        })?;

    tracing::info!(?scope, "credential rotated");
    Ok(Json(StatusResponse {
        success: true,
        message: "Secret stored",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_request_tolerates_missing_collections_and_branch_id() {
        let request: SyncRequest = serde_json::from_str(r#"{"customers": []}"#).unwrap();
        assert_eq!(request.branch_id, None);
        assert!(request.batch.is_empty());
    }

    #[test]
    fn sync_request_flattens_entity_collections() {
        let request: SyncRequest = serde_json::from_str(
            r#"{
                "branch_id": 1,
                "customers": [{
                    "customer_id": 1, "name": "A", "nik": "1", "address": "x",
                    "phone_number": "0", "registration_date": "2024-01-01"
                }],
                "loans": [], "payments": [], "employees": [], "income": []
            }"#,
        )
        .unwrap();
        assert_eq!(request.branch_id, Some(1));
        assert_eq!(request.batch.customers.len(), 1);
        assert_eq!(request.batch.logged_record_count(), 1);
    }

    #[test]
    fn secret_request_accepts_the_legacy_key_name() {
        let request: SecretRequest =
            serde_json::from_str(r#"{"branch_id": 2, "newKey": "rotated"}"#).unwrap();
        assert_eq!(request.branch_id, Some(2));
        assert_eq!(request.new_key, "rotated");
    }
}
