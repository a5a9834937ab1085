//! Biosignal (ECG) adapter.
//!
//! Submits the recording under a multipart field named `signal`, with the
//! sampling rate as a fixed query parameter. The service answers with a
//! per-subject mapping; the first subject's `PLETH` entry is the rhythm
//! status this modality contributes.

use async_trait::async_trait;

use super::{
    coerce_category, decode_relaxed, file_part, map_transport_error, read_body, AdapterError,
    ModalityAdapter, ModalityOutcome,
};
use crate::composite::{rhythm, RecordFragment, SignalFindings};
use crate::registry::Modality;

/// HTTP client for the biosignal analysis service.
pub struct SignalAdapter {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
    sampling_rate_hz: u32,
}

impl SignalAdapter {
    pub fn new(base_url: &str, timeout_secs: u64, sampling_rate_hz: u32) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
            sampling_rate_hz,
        }
    }
}

#[async_trait]
impl ModalityAdapter for SignalAdapter {
    fn modality(&self) -> Modality {
        Modality::Signal
    }

    async fn submit(&self, file_name: &str, payload: Vec<u8>) -> ModalityOutcome {
        let url = format!("{}/biosignals/analyze/", self.base_url);
        let part = file_part(file_name, payload)?;
        let form = reqwest::multipart::Form::new().part("signal", part);

        let response = self
            .client
            .post(&url)
            .query(&[("sr", self.sampling_rate_hz)])
            .multipart(form)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout_secs))?;

        let body = read_body(response, self.timeout_secs).await?;
        let findings = parse_signal_response(&body)?;
        Ok(RecordFragment::Signal(findings))
    }
}

fn parse_signal_response(body: &str) -> Result<SignalFindings, AdapterError> {
    let value = decode_relaxed(body)?;
    let subjects = value
        .as_object()
        .ok_or_else(|| AdapterError::Malformed("expected a per-subject mapping".to_string()))?;

    // First subject in the decoded mapping (serde_json maps iterate in key
    // order, so "first" is deterministic across runs).
    let status = subjects
        .values()
        .next()
        .map(|subject| coerce_category(subject.get("PLETH"), rhythm::INDETERMINATE))
        .unwrap_or_else(|| rhythm::INDETERMINATE.to_string());

    Ok(SignalFindings {
        rhythm_status: status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_subject_pleth() {
        let body = r#"{"subject_0": {"PLETH": "Taquicardia", "ECG": "Noisy"}}"#;
        let findings = parse_signal_response(body).unwrap();
        assert_eq!(findings.rhythm_status, rhythm::TACHYCARDIA);
    }

    #[test]
    fn first_subject_is_first_key_in_order() {
        let body = r#"{"b_subject": {"PLETH": "Bradicardia"}, "a_subject": {"PLETH": "Normal"}}"#;
        let findings = parse_signal_response(body).unwrap();
        assert_eq!(findings.rhythm_status, rhythm::NORMAL);
    }

    #[test]
    fn missing_pleth_fails_open() {
        let body = r#"{"subject_0": {"ECG": "Normal"}}"#;
        let findings = parse_signal_response(body).unwrap();
        assert_eq!(findings.rhythm_status, rhythm::INDETERMINATE);
    }

    #[test]
    fn empty_subject_mapping_fails_open() {
        let findings = parse_signal_response("{}").unwrap();
        assert_eq!(findings.rhythm_status, rhythm::INDETERMINATE);
    }

    #[test]
    fn double_encoded_mapping_parses_like_plain() {
        let plain = r#"{"subject_0": {"PLETH": "Normal"}}"#;
        let double = serde_json::to_string(plain).unwrap();
        assert_eq!(
            parse_signal_response(plain).unwrap(),
            parse_signal_response(&double).unwrap()
        );
    }

    #[test]
    fn non_mapping_body_is_malformed() {
        assert!(matches!(
            parse_signal_response(r#"["subject_0"]"#),
            Err(AdapterError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn submits_with_sampling_rate_parameter() {
        use axum::extract::Query;
        use axum::{routing::post, Router};
        use std::collections::HashMap;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route(
            "/biosignals/analyze/",
            post(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("sr").map(String::as_str), Some("125"));
                r#"{"subject_0": {"PLETH": "Bradicardia"}}"#
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let adapter = SignalAdapter::new(&format!("http://{addr}"), 5, 125);
        let outcome = adapter.submit("ecg.csv", vec![1, 2]).await.unwrap();
        match outcome {
            RecordFragment::Signal(findings) => {
                assert_eq!(findings.rhythm_status, rhythm::BRADYCARDIA);
            }
            other => panic!("unexpected fragment: {other:?}"),
        }
    }
}
