use serde::{Deserialize, Serialize};

pub mod endpoints;
#[cfg(feature = "rest-client")]
pub mod rest;

pub const API_V1_PREFIX: &str = "/api/v1";

/// Success envelope for every record-service response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Failure envelope; `message` is client-safe (storage faults are logged
/// server-side and surfaced only as a generic failure).
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

// Auth
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthReq {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResp {
    pub token: String,
}

/// One screening record as persisted. `created_at` is RFC3339 UTC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordDto {
    pub id: i32,
    pub child_name: String,
    pub age: i32,
    pub gender: String,
    pub weight: f64,
    pub health_status: String,
    pub anganwadi_kendra: String,
    pub school_name: String,
    pub symptoms: String,
    pub submitted_by_user_id: String,
    pub created_at: String,
}

/// Create-record body. Every field is optional on the wire so the service can
/// report which required field is missing instead of failing deserialization;
/// the submitter identity comes from the bearer token, not the body.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NewRecordReq {
    pub child_name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub weight: Option<f64>,
    pub health_status: Option<String>,
    pub anganwadi_kendra: Option<String>,
    pub school_name: Option<String>,
    pub symptoms: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusUpdateReq {
    pub health_status: Option<String>,
}
