//! Request-scoped context extracted from HTTP requests.
//!
//! Callers authenticate through a gateway that injects a base64
//! encoded JSON identity header. Only the account number is consumed
//! here.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;

pub const IDENTITY_HEADER: &str = "x-rh-identity";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub account_id: i64,
}

#[derive(Debug, Deserialize)]
struct IdentityEnvelope {
    identity: IdentityRecord,
}

#[derive(Debug, Deserialize)]
struct IdentityRecord {
    account_number: String,
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Decode the identity header into an account id.
fn account_from_header(value: &str) -> Result<i64, String> {
    let decoded = STANDARD
        .decode(value)
        .map_err(|e| format!("identity header is not valid base64: {e}"))?;
    let envelope: IdentityEnvelope = serde_json::from_slice(&decoded)
        .map_err(|e| format!("identity header is not valid JSON: {e}"))?;
    envelope
        .identity
        .account_number
        .parse()
        .map_err(|_| "account number is not numeric".to_string())
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = header_string(&parts.headers, REQUEST_ID_HEADER)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let Some(identity) = header_string(&parts.headers, IDENTITY_HEADER) else {
            return Err(
                ApiError::bad_request("missing_identity", "Identity header is required")
                    .with_request_id(request_id),
            );
        };

        let account_id = account_from_header(&identity)
            .map_err(|msg| ApiError::bad_request("invalid_identity", msg).with_request_id(request_id.clone()))?;

        Ok(Self {
            request_id,
            account_id,
        })
    }
}
