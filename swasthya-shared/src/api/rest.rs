//! Minimal REST client helpers for consumers (dashboard client, tests).

use super::endpoints as ep;
use super::*;
use once_cell::sync::Lazy;
use std::time::Duration;

pub use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("http: {0}")]
    Http(String),
    #[error("status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("serde: {0}")]
    Serde(String),
}

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .tcp_keepalive(Some(Duration::from_secs(180)))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(180))
        .timeout(Duration::from_secs(30))
        .build()
        .expect("failed to build HTTP client")
});

fn mk_client() -> reqwest::Client {
    HTTP_CLIENT.clone()
}

/// Unwrap the `{success, data}` envelope, or turn an error response into
/// `RestError::Status` carrying the server's `message` when one is present.
async fn handle_envelope<T: for<'de> serde::Deserialize<'de>>(
    res: reqwest::Response,
) -> Result<T, RestError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        return Err(RestError::Status {
            status: status.as_u16(),
            message,
        });
    }
    let envelope = res
        .json::<ApiResponse<T>>()
        .await
        .map_err(|e| RestError::Serde(e.to_string()))?;
    Ok(envelope.data)
}

pub async fn login(base: &str, req: &AuthReq) -> Result<AuthResp, RestError> {
    let res = mk_client()
        .post(ep::auth_login(base))
        .json(req)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_envelope(res).await
}

pub async fn create_record(
    base: &str,
    bearer: &str,
    req: &NewRecordReq,
) -> Result<RecordDto, RestError> {
    let res = mk_client()
        .post(ep::records(base))
        .bearer_auth(bearer)
        .json(req)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_envelope(res).await
}

pub async fn list_records(
    base: &str,
    bearer: &str,
    submitted_by_user_id: &str,
) -> Result<Vec<RecordDto>, RestError> {
    let res = mk_client()
        .get(ep::records(base))
        .query(&[("submitted_by_user_id", submitted_by_user_id)])
        .bearer_auth(bearer)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_envelope(res).await
}

pub async fn get_record(base: &str, bearer: &str, id: i32) -> Result<RecordDto, RestError> {
    let res = mk_client()
        .get(ep::record(base, id))
        .bearer_auth(bearer)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_envelope(res).await
}

pub async fn update_status(
    base: &str,
    bearer: &str,
    id: i32,
    health_status: &str,
) -> Result<RecordDto, RestError> {
    let body = StatusUpdateReq {
        health_status: Some(health_status.to_string()),
    };
    let res = mk_client()
        .put(ep::record_status(base, id))
        .bearer_auth(bearer)
        .json(&body)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_envelope(res).await
}
