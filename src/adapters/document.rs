//! Medical-history (NLP) adapter.
//!
//! Submits the history document under a multipart field named `file` and
//! consumes the service's IDSA/ATS report. The `IDSA ATS patterns` field
//! arrives either as a structured mapping or as a string of single-quoted
//! pseudo-JSON (`{'Infiltrates': 'POSITIVE', ...}`); an unparseable pattern
//! string is discarded without failing the call.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    coerce_number, decode_relaxed, file_part, map_transport_error, read_body, AdapterError,
    ModalityAdapter, ModalityOutcome,
};
use crate::composite::{DocumentFindings, RecordFragment};
use crate::registry::Modality;

/// HTTP client for the medical-history analysis service.
pub struct DocumentAdapter {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl DocumentAdapter {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        }
    }
}

#[async_trait]
impl ModalityAdapter for DocumentAdapter {
    fn modality(&self) -> Modality {
        Modality::Document
    }

    async fn submit(&self, file_name: &str, payload: Vec<u8>) -> ModalityOutcome {
        let url = format!("{}/nlp/report/", self.base_url);
        let part = file_part(file_name, payload)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout_secs))?;

        let body = read_body(response, self.timeout_secs).await?;
        let findings = parse_document_response(&body)?;
        Ok(RecordFragment::Document(findings))
    }
}

fn parse_document_response(body: &str) -> Result<DocumentFindings, AdapterError> {
    let value = decode_relaxed(body)?;
    let obj = value
        .as_object()
        .ok_or_else(|| AdapterError::Malformed("expected a JSON object".to_string()))?;

    Ok(DocumentFindings {
        patient_age: coerce_number(obj.get("Patient age")),
        severity_score: coerce_number(obj.get("IDSA ATS score")),
        patterns: parse_patterns(obj.get("IDSA ATS patterns")),
    })
}

/// Decode the pattern field: a structured mapping is taken as-is, a string
/// goes through the pseudo-JSON scanner, anything else yields an empty
/// mapping.
fn parse_patterns(value: Option<&Value>) -> BTreeMap<String, String> {
    match value {
        Some(Value::Object(map)) => mapping_to_strings(map),
        Some(Value::String(raw)) => parse_pseudo_json(raw).unwrap_or_default(),
        _ => BTreeMap::new(),
    }
}

/// Parse a single-quoted pseudo-JSON mapping. Tries the raw string first
/// (it may already be valid JSON), then a quote-normalized form. `None`
/// when neither attempt yields an object.
fn parse_pseudo_json(raw: &str) -> Option<BTreeMap<String, String>> {
    let candidate = raw.trim();
    let attempts = [candidate.to_string(), candidate.replace('\'', "\"")];
    for attempt in attempts {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&attempt) {
            return Some(mapping_to_strings(&map));
        }
    }
    None
}

fn mapping_to_strings(map: &serde_json::Map<String, Value>) -> BTreeMap<String, String> {
    map.iter()
        .map(|(key, value)| {
            let observed = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), observed)
        })
        .collect()
}
