//! JSON patch vocabulary and response helpers

use serde::{Deserialize, Serialize};

use super::review::{AdmissionResponse, AdmissionStatus, PatchType};
use crate::dns::DnsConfig;

/// JSON pointer to the Pod DNS configuration
pub const DNS_CONFIG_PATH: &str = "/spec/dnsConfig";

/// HTTP-style code attached to denials
const DENIAL_CODE: u16 = 400;

/// A single JSON patch operation on the Pod DNS configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Add { path: String, value: DnsConfig },
    Replace { path: String, value: DnsConfig },
}

impl PatchOperation {
    pub fn add(value: DnsConfig) -> Self {
        PatchOperation::Add {
            path: DNS_CONFIG_PATH.to_string(),
            value,
        }
    }

    pub fn replace(value: DnsConfig) -> Self {
        PatchOperation::Replace {
            path: DNS_CONFIG_PATH.to_string(),
            value,
        }
    }

    pub fn op(&self) -> &'static str {
        match self {
            PatchOperation::Add { .. } => "add",
            PatchOperation::Replace { .. } => "replace",
        }
    }

    pub fn path(&self) -> &str {
        match self {
            PatchOperation::Add { path, .. } | PatchOperation::Replace { path, .. } => path,
        }
    }

    pub fn value(&self) -> &DnsConfig {
        match self {
            PatchOperation::Add { value, .. } | PatchOperation::Replace { value, .. } => value,
        }
    }
}

/// Outcome of a mutation decision, before it is put on the wire
#[derive(Debug, Clone, PartialEq)]
pub enum PatchResult {
    /// Allow the Pod with this patch
    Patch(PatchOperation),
    /// Deny the Pod with this message
    Deny(String),
}

impl PatchResult {
    /// Label used for logs and counters
    pub fn outcome(&self) -> &'static str {
        match self {
            PatchResult::Patch(op) => op.op(),
            PatchResult::Deny(_) => "denied",
        }
    }

    pub fn into_response(self) -> Result<AdmissionResponse, serde_json::Error> {
        match self {
            PatchResult::Patch(op) => admission_success(&[op]),
            PatchResult::Deny(message) => Ok(admission_error(message)),
        }
    }
}

/// Allow with `patches` as a JSON patch document
pub fn admission_success(patches: &[PatchOperation]) -> Result<AdmissionResponse, serde_json::Error> {
    let patch = serde_json::to_vec(patches)?;

    Ok(AdmissionResponse {
        allowed: true,
        patch: Some(patch),
        patch_type: Some(PatchType::JsonPatch),
        ..Default::default()
    })
}

/// Deny with `message`
pub fn admission_error(message: impl Into<String>) -> AdmissionResponse {
    AdmissionResponse {
        allowed: false,
        status: Some(AdmissionStatus {
            message: message.into(),
            code: Some(DENIAL_CODE),
        }),
        ..Default::default()
    }
}
