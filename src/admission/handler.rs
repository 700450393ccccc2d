//! Mutating admission endpoint
//!
//! Turns the HTTP body into an `AdmissionRequest`, asks the mutator for a
//! decision against one snapshot of the desired DNS configuration, and wraps
//! the result back into an `AdmissionReview` carrying the request UID.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use tracing::{debug, error, info, info_span, warn};

use super::mutator;
use super::patch::{admission_error, PatchResult};
use super::review::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use crate::api::metrics::ADMISSIONS_TOTAL;
use crate::api::AppState;
use crate::dns::DnsConfigStore;
use crate::error::{WebhookError, WebhookResult};

const JSON_MEDIA_TYPE: &str = "application/json";

/// Body cap for `/mutate`. An UPDATE review carries both `object` and
/// `oldObject`, each of which the API server allows up to 3 MiB.
pub const MAX_REVIEW_BYTES: usize = 7 * 1024 * 1024;

/// Handle `POST /mutate`
pub async fn mutate_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WebhookError> {
    check_content_type(&headers).map_err(|e| {
        error!("{}", e);
        e
    })?;

    let (api_version, request) = decode_review(&body).map_err(|e| {
        error!("{}", e);
        e
    })?;

    let response = review(&state.dns, &request)?;
    let reply = AdmissionReview::reply(api_version, response);

    let body = serde_json::to_vec(&reply).map_err(|e| {
        error!(uid = %request.uid, "Failed to marshal response: {}", e);
        WebhookError::from(e)
    })?;

    Ok(([(header::CONTENT_TYPE, JSON_MEDIA_TYPE)], body).into_response())
}

/// Reject anything that does not declare a JSON body
pub fn check_content_type(headers: &HeaderMap) -> WebhookResult<()> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    let media_type = content_type.split(';').next().unwrap_or("").trim();
    if media_type.eq_ignore_ascii_case(JSON_MEDIA_TYPE) {
        Ok(())
    } else {
        Err(WebhookError::InvalidContentType(content_type.to_string()))
    }
}

/// Decode the envelope, returning its apiVersion and request
pub fn decode_review(body: &[u8]) -> WebhookResult<(String, AdmissionRequest)> {
    let review: AdmissionReview = serde_json::from_slice(body)
        .map_err(|e| WebhookError::InvalidReview(format!("failed to unmarshal request: {}", e)))?;

    let request = review
        .request
        .ok_or_else(|| WebhookError::InvalidReview("review has no request".to_string()))?;

    Ok((review.api_version, request))
}

/// Decide on one admission request and stamp the response with its UID
pub fn review(store: &DnsConfigStore, request: &AdmissionRequest) -> WebhookResult<AdmissionResponse> {
    let span = info_span!(
        "admission",
        uid = %request.uid,
        namespace = %request.namespace,
        operation = %request.operation,
    );
    let _guard = span.enter();

    debug!(
        kind = %request.kind,
        resource = %request.resource.resource,
        name = %request.name,
        user = %request.user_info.username,
        dry_run = ?request.dry_run,
        "Admission request received"
    );

    let mut response = match request.object_bytes() {
        Some(raw_pod) => {
            let desired = store.get();
            let result = mutator::decide(raw_pod, &desired);
            let outcome = result.outcome();
            metrics::increment_counter!(ADMISSIONS_TOTAL, "outcome" => outcome);

            match &result {
                PatchResult::Patch(op) => {
                    info!(op = op.op(), path = op.path(), "Mutating pod DNS config");
                }
                PatchResult::Deny(message) => warn!("Admission denied: {}", message),
            }

            result.into_response().map_err(|e| {
                error!("Failed to marshal patch: {}", e);
                WebhookError::from(e)
            })?
        }
        None => {
            metrics::increment_counter!(ADMISSIONS_TOTAL, "outcome" => "denied");
            warn!("Admission request carries no object");
            admission_error("admission request carries no object")
        }
    };

    response.uid = request.uid.clone();
    Ok(response)
}
