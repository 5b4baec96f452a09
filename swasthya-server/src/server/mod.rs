mod acl;
pub mod auth;
mod config;

use crate::server::auth::AuthCtx;
use crate::storage::{self, NewRecord};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware;
use axum::response::Response as AxumResponse;
use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State},
    http::{Method, StatusCode, header},
    routing::{get, post, put},
};
use bcrypt::verify;
pub use config::{AppConfig, ConfigError, UserConfig};
use serde::Deserialize;
use swasthya_shared::api::{self, ApiResponse, RecordDto};
use swasthya_shared::auth::Role;
use swasthya_shared::domain::{Gender, HealthStatus};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Span, info_span};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: storage::Store,
}

impl AppState {
    pub fn new(config: AppConfig, store: storage::Store) -> Self {
        Self { config, store }
    }
}

#[derive(Clone, Debug)]
struct ReqId(pub String);

pub fn router(state: AppState) -> Router {
    let private = Router::new()
        .route("/api/v1/records", post(api_create_record))
        .route("/api/v1/records", get(api_list_records))
        .route("/api/v1/records/{id}", get(api_get_record))
        .route("/api/v1/records/{id}/status", put(api_update_status))
        .with_state(state.clone())
        .layer(middleware::from_fn(acl::enforce_acl))
        // Span enrichment must sit inside the auth layer: it reads the
        // AuthCtx extension that require_bearer inserts.
        .layer(middleware::from_fn(set_auth_span_fields))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    // Trace with request context (method, path, request_id)
    let trace = TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
        let request_id = req
            .extensions()
            .get::<ReqId>()
            .map(|r| r.0.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        info_span!(
            "request",
            method = %req.method(),
            path = %req.uri().path(),
            request_id = %request_id,
            username = tracing::field::Empty,
            role = tracing::field::Empty,
        )
    });

    let app = Router::new()
        .route("/healthz", get(health))
        .route("/api/v1/auth/login", post(api_auth_login))
        .merge(private)
        .with_state(state.clone())
        .layer(trace)
        .layer(middleware::from_fn(add_request_id));

    // Optionally add CORS for a browser dashboard served from a dev origin

    if let Some(origin) = &state.config.dev_cors_origin {
        let hv = header::HeaderValue::from_str(origin)
            .unwrap_or(header::HeaderValue::from_static("http://localhost:5173"));
        let cors = CorsLayer::new()
            .allow_origin(hv)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
        app.layer(cors)
    } else {
        app
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn add_request_id(
    mut req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    let hdr = HeaderName::from_static("x-request-id");
    // Use provided x-request-id if present, else generate
    let rid = req
        .headers()
        .get(&hdr)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(ReqId(rid.clone()));
    let mut resp = next.run(req).await;
    if let Ok(hv) = HeaderValue::from_str(&rid) {
        resp.headers_mut().insert(hdr, hv);
    }
    Ok(resp)
}

async fn set_auth_span_fields(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    if let Some(auth) = req.extensions().get::<AuthCtx>() {
        let span = Span::current();
        span.record("username", tracing::field::display(&auth.claims.sub));
        span.record("role", tracing::field::debug(&auth.claims.role));
    }
    Ok(next.run(req).await)
}

async fn api_auth_login(
    State(state): State<AppState>,
    Json(body): Json<api::AuthReq>,
) -> Result<Json<ApiResponse<api::AuthResp>>, AppError> {
    let user = state.config.find_user(&body.username).ok_or_else(|| {
        tracing::warn!(username=%body.username, "login: unknown username");
        AppError::unauthorized()
    })?;
    if !verify(&body.password, &user.password_hash).map_err(|e| {
        tracing::error!(username=%body.username, error=%e, "login: bcrypt verify failed");
        AppError::internal(e)
    })? {
        tracing::warn!(username=%body.username, "login: invalid password");
        return Err(AppError::unauthorized());
    }
    let token = auth::issue_jwt_for_user(&state, &user.username, user.role)?;
    Ok(Json(ApiResponse::ok(api::AuthResp { token })))
}

fn require<T>(value: Option<T>, field: &'static str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::bad_request(format!("{field} is required.")))
}

fn require_text(value: Option<String>, field: &'static str) -> Result<String, AppError> {
    let v = require(value, field)?;
    if v.trim().is_empty() {
        return Err(AppError::bad_request(format!("{field} is required.")));
    }
    Ok(v)
}

async fn api_create_record(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Json(body): Json<api::NewRecordReq>,
) -> Result<(StatusCode, Json<ApiResponse<RecordDto>>), AppError> {
    let child_name = require_text(body.child_name, "child_name")?;
    let age = require(body.age, "age")?;
    if age <= 0 {
        return Err(AppError::bad_request("age must be positive"));
    }
    let gender: Gender = require_text(body.gender, "gender")?
        .parse()
        .map_err(AppError::bad_request)?;
    let weight = require(body.weight, "weight")?;
    if weight <= 0.0 {
        return Err(AppError::bad_request("weight must be positive"));
    }
    let health_status: HealthStatus = require_text(body.health_status, "health_status")?
        .parse()
        .map_err(AppError::bad_request)?;
    let anganwadi_kendra = require_text(body.anganwadi_kendra, "anganwadi_kendra")?;
    let school_name = require_text(body.school_name, "school_name")?;

    let rec = NewRecord {
        child_name,
        age,
        gender: gender.to_string(),
        weight,
        health_status: health_status.to_string(),
        anganwadi_kendra,
        school_name,
        symptoms: body.symptoms.unwrap_or_default(),
        // Submitter identity comes from the verified token, not the body.
        submitted_by_user_id: auth.claims.sub.clone(),
    };
    let row = state
        .store
        .insert_record(rec)
        .await
        .map_err(AppError::internal)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(record_dto(row))),
    ))
}

#[derive(Deserialize)]
struct ListQuery {
    submitted_by_user_id: Option<String>,
}

async fn api_list_records(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<RecordDto>>>, AppError> {
    let submitter = require_text(query.submitted_by_user_id, "submitted_by_user_id")?;
    if auth.claims.role == Role::Worker && submitter != auth.claims.sub {
        return Err(AppError::forbidden());
    }
    let rows = state
        .store
        .list_by_submitter(&submitter)
        .await
        .map_err(AppError::internal)?;
    let items = rows.into_iter().map(record_dto).collect();
    Ok(Json(ApiResponse::ok(items)))
}

async fn api_get_record(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<RecordDto>>, AppError> {
    let row = state
        .store
        .get_record(id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("record not found: {}", id)))?;
    if auth.claims.role == Role::Worker && row.submitted_by_user_id != auth.claims.sub {
        return Err(AppError::forbidden());
    }
    Ok(Json(ApiResponse::ok(record_dto(row))))
}

async fn api_update_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<i32>,
    Json(body): Json<api::StatusUpdateReq>,
) -> Result<Json<ApiResponse<RecordDto>>, AppError> {
    let status: HealthStatus = require_text(body.health_status, "health_status")?
        .parse()
        .map_err(AppError::bad_request)?;

    if auth.claims.role == Role::Worker {
        let existing = state
            .store
            .get_record(id)
            .await
            .map_err(AppError::internal)?
            .ok_or_else(|| AppError::not_found(format!("record not found: {}", id)))?;
        if existing.submitted_by_user_id != auth.claims.sub {
            return Err(AppError::forbidden());
        }
    }

    let row = state
        .store
        .update_status(id, status.as_str())
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("record not found: {}", id)))?;
    Ok(Json(ApiResponse::ok(record_dto(row))))
}

fn record_dto(row: crate::storage::models::HealthRecord) -> RecordDto {
    RecordDto {
        id: row.id,
        child_name: row.child_name,
        age: row.age,
        gender: row.gender,
        weight: row.weight,
        health_status: row.health_status,
        anganwadi_kendra: row.anganwadi_kendra,
        school_name: row.school_name,
        symptoms: row.symptoms,
        submitted_by_user_id: row.submitted_by_user_id,
        created_at: chrono::DateTime::<chrono::Utc>::from_naive_utc_and_offset(
            row.created_at,
            chrono::Utc,
        )
        .to_rfc3339(),
    }
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized,
    Forbidden,
    NotFound(String),
    Internal(String),
}

impl AppError {
    fn bad_request<T: ToString>(msg: T) -> Self {
        Self::BadRequest(msg.to_string())
    }
    fn unauthorized() -> Self {
        Self::Unauthorized
    }
    fn forbidden() -> Self {
        Self::Forbidden
    }
    fn not_found<T: Into<String>>(msg: T) -> Self {
        Self::NotFound(msg.into())
    }
    fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, msg, kind, detail) = match self {
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m, "bad_request", None),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized".into(),
                "unauthorized",
                None,
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden".into(), "forbidden", None),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, m, "not_found", None),
            // Do not leak internal error details to clients, but log them
            AppError::Internal(m) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".into(),
                "internal",
                Some(m),
            ),
        };
        if let Some(detail) = detail {
            tracing::error!(status = %status, kind = kind, message = %msg, detail = %detail, "request failed");
        } else {
            tracing::error!(status = %status, kind = kind, message = %msg, "request failed");
        }
        let body = axum::Json(api::ErrorBody {
            success: false,
            message: msg,
        });
        (status, body).into_response()
    }
}
