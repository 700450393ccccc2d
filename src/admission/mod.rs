//! Pod admission: wire types, patch model, mutation decision and HTTP handler

pub mod handler;
pub mod mutator;
pub mod patch;
pub mod review;

pub use handler::{mutate_handler, MAX_REVIEW_BYTES};
pub use mutator::decide;
pub use patch::{admission_error, admission_success, PatchOperation, PatchResult, DNS_CONFIG_PATH};
pub use review::{AdmissionRequest, AdmissionResponse, AdmissionReview};
