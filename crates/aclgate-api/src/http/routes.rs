//! HTTP route definitions and handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRequest, Path, Query, Request, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info};

use aclgate_domain::error::DomainError;
use aclgate_domain::model::{AclDocument, Node, ObjectRef};
use aclgate_domain::resolver::SubtreeQuery;
use aclgate_server::{DocumentLoad, LoadReport};
use aclgate_storage::{ObjectReference, RelationshipStore, StorageError, StoredTuple, TupleFilter};

use super::state::AppState;
use crate::middleware::{
    cors_layer, MetricsLayer, RequestIdLayer, RequestLoggingLayer, RequestMetrics,
};
use crate::observability::{metrics_handler, record_token_request, MetricsState};

/// JSON extractor that returns 400 Bad Request instead of 422 for
/// deserialization errors.
///
/// Preserves 413 Payload Too Large for body limit errors.
pub struct JsonBadRequest<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBadRequest<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiError>);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBadRequest(value)),
            Err(rejection) => {
                use axum::extract::rejection::JsonRejection;

                // Body limit errors arrive wrapped in a BytesRejection
                let status = match &rejection {
                    JsonRejection::BytesRejection(_)
                        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE =>
                    {
                        StatusCode::PAYLOAD_TOO_LARGE
                    }
                    _ => StatusCode::BAD_REQUEST,
                };

                let message = rejection.body_text();
                let error = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    ApiError::new(error_codes::PAYLOAD_TOO_LARGE, message)
                } else {
                    ApiError::validation_error(message)
                };

                Err((status, Json(error)))
            }
        }
    }
}

/// Default request body size limit (16MB). Configuration documents are large.
pub const DEFAULT_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Options for the observability-enabled router.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Maximum request body size in bytes.
    pub body_limit: usize,
    /// Path of the Prometheus endpoint.
    pub metrics_path: String,
    /// Per-request timeout; requests exceeding it get 408.
    pub request_timeout: Duration,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            body_limit: DEFAULT_BODY_LIMIT,
            metrics_path: "/metrics".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

fn api_routes<S: RelationshipStore + ?Sized>() -> Router<Arc<AppState<S>>> {
    Router::new()
        // Loading
        .route("/init", post(init_document::<S>))
        .route("/add", post(add_document::<S>))
        .route("/relationships", post(load_relationships::<S>))
        .route("/assign", post(assign::<S>))
        // Queries
        .route("/check", post(check::<S>))
        .route(
            "/lookup/:resource_type/:permission/:subject_type/:subject_id",
            get(lookup::<S>),
        )
        .route("/subtree/:root_type/:root_id/:permission", get(subtree::<S>))
        .route("/authz/token/:sso_user_id", get(authorization_token::<S>))
        .route("/authz/direct-subjects", get(direct_subjects::<S>))
        .route("/authz/effective-subjects", get(effective_subjects::<S>))
        .route("/ready", get(readiness_check::<S>))
}

/// Creates the HTTP router with the default body size limit.
pub fn create_router<S: RelationshipStore + ?Sized>(state: AppState<S>) -> Router {
    create_router_with_body_limit(state, DEFAULT_BODY_LIMIT)
}

/// Creates the HTTP router with a custom body size limit.
pub fn create_router_with_body_limit<S: RelationshipStore + ?Sized>(
    state: AppState<S>,
    body_limit: usize,
) -> Router {
    api_routes::<S>()
        .route("/health", get(health_check))
        .with_state(Arc::new(state))
        .layer(RequestBodyLimitLayer::new(body_limit))
}

/// Creates the HTTP router with the Prometheus endpoint and the request
/// middleware stack (request id, metrics, logging, timeout, CORS).
pub fn create_router_with_observability<S: RelationshipStore + ?Sized>(
    state: AppState<S>,
    metrics_state: MetricsState,
    options: &RouterOptions,
) -> Router {
    let api_router = api_routes::<S>()
        .with_state(Arc::new(state))
        .layer(RequestBodyLimitLayer::new(options.body_limit));

    let observability_router = Router::new()
        .route(&options.metrics_path, get(metrics_handler))
        .route("/health", get(health_check))
        .with_state(metrics_state);

    with_middleware(api_router.merge(observability_router), options.request_timeout)
}

/// Wraps `router` in the request middleware stack.
///
/// Layers run bottom-to-top, so the request id exists before metrics and
/// logging see the request.
pub fn with_middleware(router: Router, request_timeout: Duration) -> Router {
    router
        .layer(TimeoutLayer::new(request_timeout))
        .layer(RequestLoggingLayer::new())
        .layer(MetricsLayer::new(Arc::new(RequestMetrics::new())))
        .layer(RequestIdLayer::new())
        .layer(cors_layer())
}

// ============================================================
// Error Handling
// ============================================================

/// Error codes carried in [`ApiError`] bodies.
///
/// Each code maps to one HTTP status in [`ApiError::into_response`].
pub mod error_codes {
    /// Input validation failure (400).
    pub const VALIDATION_ERROR: &str = "validation_error";
    /// No partner, role or matching resource for the subject (404).
    pub const NOT_FOUND: &str = "not_found";
    /// Request body exceeds the configured limit (413).
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
    /// Unexpected failure, including store errors with an answer (500).
    pub const INTERNAL_ERROR: &str = "internal_error";
    /// The relationship store could not be reached (503).
    pub const SERVICE_UNAVAILABLE: &str = "service_unavailable";
    /// The relationship store did not answer in time (504).
    pub const TIMEOUT: &str = "timeout";
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a validation error (400).
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::VALIDATION_ERROR, message)
    }

    /// Creates a not found error (404).
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(error_codes::NOT_FOUND, message)
    }

    /// Creates an internal error (500).
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, message)
    }

    /// Creates a service unavailable error (503).
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(error_codes::SERVICE_UNAVAILABLE, message)
    }

    /// Creates a timeout error (504).
    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self::new(error_codes::TIMEOUT, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use error_codes::*;

        let status = match self.code.as_str() {
            VALIDATION_ERROR => StatusCode::BAD_REQUEST,
            NOT_FOUND => StatusCode::NOT_FOUND,
            PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            SERVICE_UNAVAILABLE => StatusCode::SERVICE_UNAVAILABLE,
            TIMEOUT => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::InvalidInput { message } => ApiError::validation_error(message.clone()),
            StorageError::ConnectionError { .. } => {
                error!("Storage unavailable: {}", err);
                ApiError::service_unavailable("relationship store unavailable")
            }
            StorageError::QueryTimeout { .. } => {
                error!("Query timeout: {}", err);
                ApiError::gateway_timeout("relationship store timed out")
            }
            _ => {
                error!("Storage error: {}", err);
                ApiError::internal_error(err.to_string())
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match &err {
            DomainError::NotFound { .. } => ApiError::not_found(err.to_string()),
            DomainError::InvalidParameter { .. } => ApiError::validation_error(err.to_string()),
            DomainError::StoreUnavailable { .. } => {
                ApiError::service_unavailable("relationship store unavailable")
            }
            DomainError::StorageOperationFailed { reason } => {
                error!("Storage operation failed: {}", reason);
                ApiError::internal_error("storage operation failed")
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Rejects a missing or empty required value.
fn required(value: Option<String>, name: &str) -> ApiResult<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::validation_error(format!(
            "missing required parameter '{name}'"
        ))),
    }
}

fn non_empty(value: String, name: &str) -> ApiResult<String> {
    required(Some(value), name)
}

// ============================================================
// Health
// ============================================================

/// Liveness probe.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Readiness probe: 200 when the relationship store answers, 503 otherwise.
///
/// Error details are logged, not returned.
async fn readiness_check<S: RelationshipStore + ?Sized>(
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    let unavailable = |reason: String| {
        error!("Readiness check failed: storage unavailable: {}", reason);
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "not_ready",
                "checks": { "storage": "unavailable" }
            })),
        )
    };

    match state.storage.health_check().await {
        Ok(status) if status.healthy => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "checks": { "storage": "ok" }
            })),
        ),
        Ok(status) => unavailable(status.message.unwrap_or_default()),
        Err(e) => unavailable(e.to_string()),
    }
}

// ============================================================
// Loading
// ============================================================

/// `/init` answer: the translated relationships plus the load counts.
#[derive(Debug, Serialize)]
pub struct InitResponse {
    pub loaded: Vec<String>,
    pub accepted: usize,
    pub dropped: usize,
}

impl From<DocumentLoad> for InitResponse {
    fn from(load: DocumentLoad) -> Self {
        Self {
            loaded: load.relationships,
            accepted: load.report.accepted,
            dropped: load.report.dropped,
        }
    }
}

/// `/add` answer; same as [`InitResponse`] under the `added` key.
#[derive(Debug, Serialize)]
pub struct AddResponse {
    pub added: Vec<String>,
    pub accepted: usize,
    pub dropped: usize,
}

impl From<DocumentLoad> for AddResponse {
    fn from(load: DocumentLoad) -> Self {
        Self {
            added: load.relationships,
            accepted: load.report.accepted,
            dropped: load.report.dropped,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RelationshipsRequest {
    pub relationships: Vec<String>,
}

async fn init_document<S: RelationshipStore + ?Sized>(
    State(state): State<Arc<AppState<S>>>,
    JsonBadRequest(document): JsonBadRequest<AclDocument>,
) -> ApiResult<Json<InitResponse>> {
    let load = state.loader.load_document(&document).await?;
    Ok(Json(load.into()))
}

async fn add_document<S: RelationshipStore + ?Sized>(
    State(state): State<Arc<AppState<S>>>,
    JsonBadRequest(document): JsonBadRequest<AclDocument>,
) -> ApiResult<Json<AddResponse>> {
    let load = state.loader.load_document(&document).await?;
    Ok(Json(load.into()))
}

async fn load_relationships<S: RelationshipStore + ?Sized>(
    State(state): State<Arc<AppState<S>>>,
    JsonBadRequest(body): JsonBadRequest<RelationshipsRequest>,
) -> ApiResult<Json<LoadReport>> {
    let report = state.loader.load_relationships(&body.relationships).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub user: String,
    pub object_type: String,
    pub object_id: String,
    pub relation: String,
}

/// Grants `relation` on one object to one user.
async fn assign<S: RelationshipStore + ?Sized>(
    State(state): State<Arc<AppState<S>>>,
    JsonBadRequest(body): JsonBadRequest<AssignRequest>,
) -> ApiResult<impl IntoResponse> {
    let tuple = StoredTuple::new(
        non_empty(body.object_type, "object_type")?,
        non_empty(body.object_id, "object_id")?,
        non_empty(body.relation, "relation")?,
        state.subject_type.clone(),
        non_empty(body.user, "user")?,
    );
    info!(
        resource = %tuple.resource(),
        relation = %tuple.relation,
        user = %tuple.subject_id,
        "assigning relation"
    );
    state.storage.write_tuples(vec![tuple]).await?;
    Ok(Json(serde_json::json!({ "status": "assigned" })))
}

// ============================================================
// Queries
// ============================================================

#[derive(Debug, Deserialize)]
pub struct CheckRequestBody {
    pub user: String,
    pub object_type: String,
    pub object_id: String,
    pub permission: String,
}

#[derive(Debug, Serialize)]
pub struct CheckResponseBody {
    pub allowed: bool,
}

async fn check<S: RelationshipStore + ?Sized>(
    State(state): State<Arc<AppState<S>>>,
    JsonBadRequest(body): JsonBadRequest<CheckRequestBody>,
) -> ApiResult<Json<CheckResponseBody>> {
    let resource = ObjectReference::new(
        non_empty(body.object_type, "object_type")?,
        non_empty(body.object_id, "object_id")?,
    );
    let subject = ObjectReference::new(&state.subject_type, non_empty(body.user, "user")?);
    let permission = non_empty(body.permission, "permission")?;

    let allowed = state
        .storage
        .check_permission(&resource, &permission, &subject)
        .await?;
    Ok(Json(CheckResponseBody { allowed }))
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub subject: ObjectRef,
    pub resource: String,
    pub permission: String,
    pub tree: Node,
}

async fn lookup<S: RelationshipStore + ?Sized>(
    State(state): State<Arc<AppState<S>>>,
    Path((resource_type, permission, subject_type, subject_id)): Path<(
        String,
        String,
        String,
        String,
    )>,
) -> ApiResult<Json<LookupResponse>> {
    let subject = ObjectRef::new(subject_type, subject_id);
    let tree = state
        .hierarchy
        .resolve(&resource_type, &permission, &subject)
        .await?;
    Ok(Json(LookupResponse {
        subject,
        resource: resource_type,
        permission,
        tree,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct SubtreeParams {
    #[serde(rename = "subjectType")]
    pub subject_type: Option<String>,
    #[serde(rename = "subjectID")]
    pub subject_id: Option<String>,
    #[serde(rename = "targetType")]
    pub target_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubtreeResponse {
    pub root: String,
    pub permission: String,
    pub subject: Option<ObjectRef>,
    #[serde(rename = "targetType")]
    pub target_type: Option<String>,
    pub tree: Node,
}

async fn subtree<S: RelationshipStore + ?Sized>(
    State(state): State<Arc<AppState<S>>>,
    Path((root_type, root_id, permission)): Path<(String, String, String)>,
    Query(params): Query<SubtreeParams>,
) -> ApiResult<Json<SubtreeResponse>> {
    let subject_type = params.subject_type.filter(|s| !s.is_empty());
    let subject_id = params.subject_id.filter(|s| !s.is_empty());
    let subject = match (subject_type, subject_id) {
        (Some(t), Some(id)) => Some(ObjectRef::new(t, id)),
        (None, None) => None,
        _ => {
            return Err(ApiError::validation_error(
                "subjectType and subjectID must be given together",
            ))
        }
    };

    let mut query = SubtreeQuery::new(ObjectRef::new(root_type, root_id), permission);
    if let Some(subject) = subject {
        query = query.with_subject(subject);
    }
    if let Some(target_type) = params.target_type.filter(|t| !t.is_empty()) {
        query = query.with_target_type(target_type);
    }

    let tree = state.subtree.resolve(&query).await?;
    Ok(Json(SubtreeResponse {
        root: query.root.key(),
        permission: query.permission,
        subject: query.subject,
        target_type: query.target_type,
        tree,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenParams {
    #[serde(rename = "partnerID")]
    pub partner_id: Option<String>,
}

async fn authorization_token<S: RelationshipStore + ?Sized>(
    State(state): State<Arc<AppState<S>>>,
    Path(sso_user_id): Path<String>,
    Query(params): Query<TokenParams>,
) -> ApiResult<impl IntoResponse> {
    let Ok(sso_user_id) = sso_user_id.parse::<i64>() else {
        record_token_request("invalid");
        return Err(ApiError::validation_error("invalid ssoUserId"));
    };
    let partner_filter = match params.partner_id.filter(|p| !p.is_empty()) {
        Some(raw) => match raw.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                record_token_request("invalid");
                return Err(ApiError::validation_error("invalid partnerID"));
            }
        },
        None => None,
    };

    match state.tokens.assemble(sso_user_id, partner_filter).await {
        Ok(token) => {
            record_token_request("issued");
            Ok(Json(token))
        }
        Err(err) => {
            record_token_request(if matches!(err, DomainError::NotFound { .. }) {
                "not_found"
            } else {
                "error"
            });
            Err(err.into())
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DirectSubjectsParams {
    #[serde(rename = "resourceType")]
    pub resource_type: Option<String>,
    #[serde(rename = "resourceId")]
    pub resource_id: Option<String>,
    pub relation: Option<String>,
    #[serde(rename = "subjectType")]
    pub subject_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EffectiveSubjectsParams {
    #[serde(rename = "resourceType")]
    pub resource_type: Option<String>,
    #[serde(rename = "resourceId")]
    pub resource_id: Option<String>,
    pub permission: Option<String>,
    #[serde(rename = "subjectType")]
    pub subject_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubjectsResponse {
    pub subjects: Vec<String>,
}

/// Subjects holding `relation` on a resource through a stored tuple.
async fn direct_subjects<S: RelationshipStore + ?Sized>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<DirectSubjectsParams>,
) -> ApiResult<Json<SubjectsResponse>> {
    let filter = TupleFilter {
        resource_type: Some(required(params.resource_type, "resourceType")?),
        resource_id: Some(required(params.resource_id, "resourceId")?),
        relation: Some(required(params.relation, "relation")?),
        subject_type: Some(required(params.subject_type, "subjectType")?),
    };
    let subjects = state
        .storage
        .read_tuples(&filter)
        .await?
        .into_iter()
        .map(|t| t.subject_id)
        .collect();
    Ok(Json(SubjectsResponse { subjects }))
}

/// Subjects holding `permission` on a resource after store evaluation.
async fn effective_subjects<S: RelationshipStore + ?Sized>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<EffectiveSubjectsParams>,
) -> ApiResult<Json<SubjectsResponse>> {
    let resource = ObjectReference::new(
        required(params.resource_type, "resourceType")?,
        required(params.resource_id, "resourceId")?,
    );
    let permission = required(params.permission, "permission")?;
    let subject_type = required(params.subject_type, "subjectType")?;

    let subjects = state
        .storage
        .lookup_subjects(&resource, &permission, &subject_type)
        .await?;
    Ok(Json(SubjectsResponse { subjects }))
}
