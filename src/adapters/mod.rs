//! Modality adapters: one request/response translator per artifact kind.
//!
//! Each adapter owns its modality's wire format end to end: how the
//! outbound multipart body is built (the three services disagree on field
//! names and encodings, deliberately; nothing here tries to unify them)
//! and how the inbound body is decoded. Inbound bodies have been observed
//! both as plain JSON objects and as JSON-encoded strings that need a
//! second decode pass; [`decode_relaxed`] accepts either and reports
//! `Malformed` only when neither form decodes.

pub mod document;
pub mod image;
pub mod signal;

pub use document::DocumentAdapter;
pub use image::ImageAdapter;
pub use signal::SignalAdapter;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::composite::RecordFragment;
use crate::registry::Modality;

/// Typed per-modality failure. Local to one modality's call; never aborts
/// the aggregation run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("Analysis service unreachable: {0}")]
    Unreachable(String),

    #[error("Analysis call exceeded {0}s timeout")]
    Timeout(u64),

    #[error("Malformed analysis response: {0}")]
    Malformed(String),
}

/// What one dispatched call produced: a record fragment or a typed failure.
pub type ModalityOutcome = Result<RecordFragment, AdapterError>;

/// Seam between the orchestrator and the external analysis services
/// (allows mocking, like the stub services used in tests).
#[async_trait]
pub trait ModalityAdapter: Send + Sync {
    /// The modality this adapter serves.
    fn modality(&self) -> Modality;

    /// Submit an artifact payload and decode the service's response into
    /// this modality's record fragment.
    async fn submit(&self, file_name: &str, payload: Vec<u8>) -> ModalityOutcome;
}

/// Decode a response body that may be plain JSON or a JSON-encoded string
/// wrapping JSON (one or two decode passes, never more).
pub(crate) fn decode_relaxed(body: &str) -> Result<Value, AdapterError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| AdapterError::Malformed(format!("body is not JSON: {e}")))?;

    if let Value::String(inner) = &value {
        return serde_json::from_str(inner).map_err(|e| {
            AdapterError::Malformed(format!("string-wrapped body is not JSON: {e}"))
        });
    }

    Ok(value)
}

/// Coerce a numeric sub-field the adapter owns. A missing, non-numeric or
/// unparseable value means "the service said nothing meaningful" and
/// becomes 0. This is the only defaulting site in the whole pipeline.
pub(crate) fn coerce_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Coerce a categorical sub-field, failing open to the given category.
pub(crate) fn coerce_category(value: Option<&Value>, fallback: &str) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => fallback.to_string(),
    }
}

/// Build the multipart file part for an outbound submission, with the MIME
/// type guessed from the file name.
pub(crate) fn file_part(
    file_name: &str,
    payload: Vec<u8>,
) -> Result<reqwest::multipart::Part, AdapterError> {
    let mime = mime_guess::from_path(file_name).first_or_octet_stream();
    reqwest::multipart::Part::bytes(payload)
        .file_name(file_name.to_string())
        .mime_str(mime.essence_str())
        .map_err(|e| AdapterError::Malformed(format!("invalid MIME for request part: {e}")))
}

/// Map a reqwest transport failure onto the adapter error taxonomy.
pub(crate) fn map_transport_error(error: reqwest::Error, timeout_secs: u64) -> AdapterError {
    if error.is_timeout() {
        AdapterError::Timeout(timeout_secs)
    } else if error.is_connect() {
        AdapterError::Unreachable(format!("connection failed: {error}"))
    } else {
        AdapterError::Unreachable(error.to_string())
    }
}

/// Read a response body, mapping non-2xx statuses onto `Unreachable`.
pub(crate) async fn read_body(
    response: reqwest::Response,
    timeout_secs: u64,
) -> Result<String, AdapterError> {
    let status = response.status();
    if !status.is_success() {
        return Err(AdapterError::Unreachable(format!(
            "service returned status {status}"
        )));
    }
    response
        .text()
        .await
        .map_err(|e| map_transport_error(e, timeout_secs))
}

/// Mock adapter for orchestrator and session tests. Returns a configured
/// outcome, optionally after a delay.
pub struct MockAdapter {
    modality: Modality,
    outcome: ModalityOutcome,
    delay: Option<std::time::Duration>,
}

impl MockAdapter {
    pub fn new(modality: Modality, outcome: ModalityOutcome) -> Self {
        Self {
            modality,
            outcome,
            delay: None,
        }
    }

    /// Delay the outcome, for timeout-path tests.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl ModalityAdapter for MockAdapter {
    fn modality(&self) -> Modality {
        self.modality
    }

    async fn submit(&self, _file_name: &str, _payload: Vec<u8>) -> ModalityOutcome {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}
