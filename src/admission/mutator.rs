//! Pod DNS configuration mutation
//!
//! Decides between adding and replacing `spec.dnsConfig`. Any existing value
//! is overwritten wholesale; its contents never influence the decision.

use k8s_openapi::api::core::v1::Pod;
use tracing::debug;

use super::patch::{PatchOperation, PatchResult};
use crate::dns::DnsConfig;

/// Name shown for pods that only carry a `generateName`
const GENERATING_NAME: &str = "<generating>";

/// Decide the patch for the serialized Pod in `raw_pod`.
///
/// `desired` is a snapshot taken by the caller for this one decision.
pub fn decide(raw_pod: &[u8], desired: &DnsConfig) -> PatchResult {
    let pod: Pod = match serde_json::from_slice(raw_pod) {
        Ok(pod) => pod,
        Err(e) => {
            debug!("Failed to unmarshal pod: {}", e);
            return PatchResult::Deny(format!("could not unmarshal pod object: {}", e));
        }
    };

    let pod_name = pod
        .metadata
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(GENERATING_NAME);

    let existing = pod.spec.as_ref().and_then(|spec| spec.dns_config.as_ref());

    let op = match existing {
        None => {
            debug!(pod = %pod_name, "No existing DNS config, adding");
            PatchOperation::add(desired.clone())
        }
        Some(current) => {
            debug!(pod = %pod_name, current = ?current, "Replacing existing DNS config");
            PatchOperation::replace(desired.clone())
        }
    };

    PatchResult::Patch(op)
}
