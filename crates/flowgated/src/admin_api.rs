//! Admin API for Flowgate
//!
//! Operational surface over the gateway, orchestrator, and monitor:
//! endpoint management, request routing, queue operations, dead-letter
//! recovery, alerts, metrics, and health.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use flowgate_adapters::HealthReport;
use flowgate_core::prelude::*;
use flowgate_gateway::{AuditEntry, IntegrationGateway};
use flowgate_monitor::{Alert, AlertRule, HealthDashboard, IntegrationMetrics, MonitorCore};
use flowgate_orchestrator::{MessageOrchestrator, PayloadFormat, QueueStatus};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Admin API state
#[derive(Clone)]
pub struct AdminState {
    pub gateway: Arc<IntegrationGateway>,
    pub orchestrator: Arc<MessageOrchestrator>,
    pub monitor: Arc<MonitorCore>,
    pub tenants: Arc<dyn TenantProvider>,
    pub prometheus: PrometheusHandle,
}

/// Error body for failed operations
#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn to_http(error: FlowgateError) -> ApiError {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorBody {
            error: error.to_string(),
        }),
    )
}

// ============================================================================
// Health & metrics
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn ready() -> &'static str {
    "OK"
}

async fn prometheus_metrics(State(state): State<AdminState>) -> String {
    state.prometheus.render()
}

#[derive(Deserialize)]
struct MetricsQuery {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

async fn metrics_query(
    State(state): State<AdminState>,
    Query(range): Query<MetricsQuery>,
) -> Json<IntegrationMetrics> {
    let tenant = state.tenants.current_tenant();
    Json(state.monitor.get_metrics(&tenant, range.from, range.to))
}

async fn dashboard(State(state): State<AdminState>) -> Json<HealthDashboard> {
    let tenant = state.tenants.current_tenant();
    Json(state.monitor.health_dashboard(&tenant))
}

// ============================================================================
// Endpoints
// ============================================================================

#[derive(Deserialize)]
struct RegisterEndpointBody {
    name: String,
    base_url: String,
    protocol: Protocol,
    #[serde(default)]
    default_headers: HashMap<String, String>,
    #[serde(default)]
    auth: AuthConfig,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

#[derive(Serialize)]
struct IdResponse {
    id: Uuid,
}

async fn register_endpoint(
    State(state): State<AdminState>,
    Json(body): Json<RegisterEndpointBody>,
) -> Result<Json<IdResponse>, ApiError> {
    let mut endpoint = Endpoint::new(TenantId::new(""), body.name, body.base_url, body.protocol)
        .with_auth(body.auth);
    endpoint.default_headers = body.default_headers;
    if let Some(secs) = body.timeout_seconds {
        endpoint.timeout = Duration::from_secs(secs);
    }

    let id = state
        .gateway
        .register_endpoint(endpoint)
        .await
        .map_err(to_http)?;
    Ok(Json(IdResponse { id }))
}

async fn list_endpoints(State(state): State<AdminState>) -> Json<Vec<Endpoint>> {
    Json(state.gateway.list_endpoints())
}

async fn unregister_endpoint(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.gateway.unregister_endpoint(id).map_err(to_http)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn endpoint_health(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HealthReport>, ApiError> {
    state
        .gateway
        .check_endpoint_health(id)
        .await
        .map(Json)
        .map_err(to_http)
}

// ============================================================================
// Routing
// ============================================================================

#[derive(Deserialize)]
struct RouteRequestBody {
    endpoint_id: Uuid,
    method: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    parameters: HashMap<String, serde_json::Value>,
    #[serde(default)]
    timeout_seconds: Option<u64>,
    #[serde(default)]
    correlation_id: Option<String>,
}

async fn route_request(
    State(state): State<AdminState>,
    Json(body): Json<RouteRequestBody>,
) -> Json<OutboundResponse> {
    let mut request = OutboundRequest::new(body.endpoint_id, body.method, body.path);
    request.headers = body.headers;
    request.body = body.body;
    request.parameters = body.parameters;
    request.correlation_id = body.correlation_id;
    if let Some(secs) = body.timeout_seconds {
        request.timeout = Duration::from_secs(secs);
    }

    Json(state.gateway.route_request(request).await)
}

#[derive(Deserialize)]
struct LogQuery {
    #[serde(default)]
    from: Option<DateTime<Utc>>,
    #[serde(default)]
    to: Option<DateTime<Utc>>,
}

async fn audit_logs(
    State(state): State<AdminState>,
    Query(range): Query<LogQuery>,
) -> Json<Vec<AuditEntry>> {
    Json(state.gateway.get_logs(range.from, range.to).await)
}

// ============================================================================
// Messages & queues
// ============================================================================

#[derive(Deserialize)]
struct EnqueueBody {
    queue: String,
    payload: String,
    #[serde(default = "default_content_type")]
    content_type: String,
    #[serde(default = "default_priority")]
    priority: MessagePriority,
    #[serde(default)]
    max_retries: Option<u32>,
}

fn default_content_type() -> String {
    "application/json".to_string()
}

fn default_priority() -> MessagePriority {
    MessagePriority::Normal
}

async fn enqueue_message(
    State(state): State<AdminState>,
    Json(body): Json<EnqueueBody>,
) -> Result<Json<IdResponse>, ApiError> {
    let mut message = Message::new(TenantId::new(""), body.queue, body.payload, body.content_type);
    if let Some(max_retries) = body.max_retries {
        message = message.with_max_retries(max_retries);
    }

    let id = state
        .orchestrator
        .enqueue(message, body.priority)
        .await
        .map_err(to_http)?;
    Ok(Json(IdResponse { id }))
}

async fn queue_status(State(state): State<AdminState>) -> Json<Vec<QueueStatus>> {
    Json(state.orchestrator.queue_status().await)
}

async fn dead_letters(State(state): State<AdminState>) -> Json<Vec<Message>> {
    Json(state.orchestrator.dead_letter_messages())
}

async fn retry_dead_letter(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.retry_failed(id).await.map_err(to_http)?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Deserialize)]
struct TransformBody {
    payload: String,
    target: PayloadFormat,
}

#[derive(Serialize)]
struct TransformResponse {
    payload: String,
    source: PayloadFormat,
    target: PayloadFormat,
    success: bool,
}

async fn transform_payload(
    State(state): State<AdminState>,
    Json(body): Json<TransformBody>,
) -> Json<TransformResponse> {
    let tenant = state.tenants.current_tenant();
    let message = Message::new(tenant, "transform", body.payload, "text/plain");
    let result = state.orchestrator.transform(&message, body.target);
    Json(TransformResponse {
        success: result.succeeded(),
        payload: result.payload,
        source: result.source,
        target: result.target,
    })
}

// ============================================================================
// Alerts & rules
// ============================================================================

async fn active_alerts(State(state): State<AdminState>) -> Json<Vec<Alert>> {
    let tenant = state.tenants.current_tenant();
    Json(state.monitor.active_alerts(Some(&tenant)))
}

async fn resolve_alert(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.monitor.resolve_alert(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(to_http(FlowgateError::not_found("alert")))
    }
}

async fn list_rules(State(state): State<AdminState>) -> Json<Vec<AlertRule>> {
    Json(state.monitor.rules())
}

async fn add_rule(
    State(state): State<AdminState>,
    Json(rule): Json<AlertRule>,
) -> StatusCode {
    state.monitor.add_rule(rule);
    StatusCode::CREATED
}

// ============================================================================
// Router
// ============================================================================

/// Build the admin router
pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/live", get(ready))
        .route("/health/ready", get(ready))
        .route("/metrics", get(prometheus_metrics))
        .route("/metrics/query", get(metrics_query))
        .route("/dashboard", get(dashboard))
        .route("/endpoints", post(register_endpoint).get(list_endpoints))
        .route("/endpoints/{id}", delete(unregister_endpoint))
        .route("/endpoints/{id}/health", post(endpoint_health))
        .route("/requests", post(route_request))
        .route("/logs", get(audit_logs))
        .route("/messages", post(enqueue_message))
        .route("/messages/transform", post(transform_payload))
        .route("/queues", get(queue_status))
        .route("/dead-letters", get(dead_letters))
        .route("/dead-letters/{id}/retry", post(retry_dead_letter))
        .route("/alerts", get(active_alerts))
        .route("/alerts/{id}/resolve", post(resolve_alert))
        .route("/rules", get(list_rules).post(add_rule))
        .with_state(state)
}

/// Run the admin server until the process shuts down
pub async fn run_admin_server(listen: String, state: AdminState) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&listen).await?;
    info!(listen, "Admin API started");
    axum::serve(listener, app).await?;
    Ok(())
}
