//! Radiograph analysis adapter.
//!
//! Submits the X-ray under a multipart field named `image` and consumes the
//! service's infection-ratio report. The service has been observed returning
//! confidence on both 0–1 and 0–100 scales, and wrapping the whole body in
//! a JSON-encoded string; both quirks are normalized here.

use async_trait::async_trait;
use serde_json::Value;

use super::{
    coerce_category, coerce_number, decode_relaxed, file_part, map_transport_error, read_body,
    AdapterError, ModalityAdapter, ModalityOutcome,
};
use crate::composite::{labels, ImageFindings, QuadrantRatios, RecordFragment};
use crate::registry::Modality;

/// HTTP client for the radiograph analysis service.
pub struct ImageAdapter {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl ImageAdapter {
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
impl ModalityAdapter for ImageAdapter {
    fn modality(&self) -> Modality {
        Modality::Image
    }

    async fn submit(&self, file_name: &str, payload: Vec<u8>) -> ModalityOutcome {
        let url = format!("{}/images/Curie_v1/", self.base_url);
        let part = file_part(file_name, payload)?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout_secs))?;

        let body = read_body(response, self.timeout_secs).await?;
        let findings = parse_image_response(&body)?;
        Ok(RecordFragment::Image(findings))
    }
}

/// Map a raw service label onto the canonical category set, failing open
/// to `OTROS`.
fn normalize_label(raw: &str) -> String {
    match raw.trim().to_uppercase().as_str() {
        "SANO" | "HEALTHY" => labels::HEALTHY,
        "NEUMONIA" | "PNEUMONIA" => labels::PNEUMONIA,
        "OTROS" | "OTHER" | "OTHERS" => labels::OTHER,
        _ => labels::OTHER,
    }
    .to_string()
}

fn quadrants(value: Option<&Value>) -> QuadrantRatios {
    let empty = serde_json::Map::new();
    let obj = value.and_then(|v| v.as_object()).unwrap_or(&empty);
    QuadrantRatios {
        lt: coerce_number(obj.get("lt")),
        rt: coerce_number(obj.get("rt")),
        rb: coerce_number(obj.get("rb")),
        lb: coerce_number(obj.get("lb")),
    }
}

fn parse_image_response(body: &str) -> Result<ImageFindings, AdapterError> {
    let value = decode_relaxed(body)?;
    let obj = value
        .as_object()
        .ok_or_else(|| AdapterError::Malformed("expected a JSON object".to_string()))?;

    let label = normalize_label(&coerce_category(obj.get("label"), labels::OTHER));

    let mut confidence = coerce_number(obj.get("confidence"));
    if confidence <= 1.0 {
        confidence *= 100.0;
    }

    // Ratio fields only carry meaning for a pneumonia finding; the service
    // emits residual noise for the other labels.
    let (total_ratio, right_ratio, left_ratio) = if label == labels::PNEUMONIA {
        (
            coerce_number(obj.get("total_ratio")),
            quadrants(obj.get("right_ratio")),
            quadrants(obj.get("left_ratio")),
        )
    } else {
        (0.0, QuadrantRatios::default(), QuadrantRatios::default())
    };

    Ok(ImageFindings {
        total_ratio,
        right_ratio,
        left_ratio,
        label,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNEUMONIA_BODY: &str = r#"{
        "total_ratio": 43.89,
        "right_ratio": {"lt": 99.44, "rt": 100.0, "rb": 39.56, "lb": 94.3},
        "left_ratio": {"lt": 0.0, "rt": 0.0, "rb": 19.24, "lb": 0.0},
        "label": "NEUMONIA",
        "confidence": 0.5045164823532104
    }"#;

    #[test]
    fn parses_pneumonia_report() {
        let findings = parse_image_response(PNEUMONIA_BODY).unwrap();
        assert_eq!(findings.label, labels::PNEUMONIA);
        assert_eq!(findings.total_ratio, 43.89);
        assert_eq!(findings.right_ratio.rt, 100.0);
        assert_eq!(findings.left_ratio.rb, 19.24);
    }

    #[test]
    fn unit_scale_confidence_is_normalized() {
        let findings = parse_image_response(PNEUMONIA_BODY).unwrap();
        assert!((findings.confidence - 50.45164823532104).abs() < 1e-9);
    }

    #[test]
    fn percent_scale_confidence_is_kept() {
        let findings =
            parse_image_response(r#"{"label": "NEUMONIA", "confidence": 87.5}"#).unwrap();
        assert_eq!(findings.confidence, 87.5);
    }

    #[test]
    fn healthy_label_zeroes_ratios() {
        let body = r#"{
            "total_ratio": 12.0,
            "right_ratio": {"lt": 3.0, "rt": 1.0, "rb": 0.5, "lb": 2.0},
            "left_ratio": {"lt": 1.0, "rt": 1.0, "rb": 1.0, "lb": 1.0},
            "label": "SANO",
            "confidence": 91.0
        }"#;
        let findings = parse_image_response(body).unwrap();
        assert_eq!(findings.label, labels::HEALTHY);
        assert_eq!(findings.total_ratio, 0.0);
        assert_eq!(findings.right_ratio, QuadrantRatios::default());
        assert_eq!(findings.left_ratio, QuadrantRatios::default());
    }

    #[test]
    fn english_synonyms_map_to_canonical_labels() {
        assert_eq!(normalize_label("healthy"), labels::HEALTHY);
        assert_eq!(normalize_label("Pneumonia"), labels::PNEUMONIA);
        assert_eq!(normalize_label("others"), labels::OTHER);
    }

    #[test]
    fn unknown_label_fails_open_to_other() {
        let findings = parse_image_response(r#"{"label": "??", "confidence": 50}"#).unwrap();
        assert_eq!(findings.label, labels::OTHER);
    }

    #[test]
    fn double_encoded_body_parses_like_plain() {
        let double = serde_json::to_string(PNEUMONIA_BODY).unwrap();
        assert_eq!(
            parse_image_response(&double).unwrap(),
            parse_image_response(PNEUMONIA_BODY).unwrap()
        );
    }

    #[test]
    fn missing_numeric_fields_default_to_zero() {
        let findings = parse_image_response(r#"{"label": "NEUMONIA"}"#).unwrap();
        assert_eq!(findings.confidence, 0.0);
        assert_eq!(findings.total_ratio, 0.0);
        assert_eq!(findings.right_ratio.lt, 0.0);
    }

    #[test]
    fn non_object_body_is_malformed() {
        assert!(matches!(
            parse_image_response("[1, 2, 3]"),
            Err(AdapterError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn submits_over_http_and_decodes_stringified_body() {
        use axum::{routing::post, Router};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route(
            "/images/Curie_v1/",
            post(|| async {
                // The real service double-encodes: a JSON string wrapping JSON.
                serde_json::to_string(r#"{"label": "SANO", "confidence": 0.9}"#).unwrap()
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let adapter = ImageAdapter::new(&format!("http://{addr}"), 5);
        let outcome = adapter.submit("chest.png", vec![0xFF, 0xD8]).await.unwrap();
        match outcome {
            RecordFragment::Image(findings) => {
                assert_eq!(findings.label, labels::HEALTHY);
                assert_eq!(findings.confidence, 90.0);
            }
            other => panic!("unexpected fragment: {other:?}"),
        }
    }

    #[tokio::test]
    async fn connection_refused_maps_to_unreachable() {
        // Bind then drop to get a port nobody is listening on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let adapter = ImageAdapter::new(&format!("http://{addr}"), 5);
        let err = adapter.submit("chest.png", vec![]).await.unwrap_err();
        assert!(matches!(err, AdapterError::Unreachable(_)));
    }
}
