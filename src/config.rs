use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Consilium";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default per-dispatch timeout (seconds). A call that has not settled
/// within this bound is cancelled and reported as a timeout for that
/// modality only.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default sampling rate forwarded to the biosignal service (Hz).
pub const DEFAULT_SAMPLING_RATE_HZ: u32 = 500;

/// Base URLs of the three analysis services.
///
/// Supplied at session construction so tests can substitute stub services.
/// Trailing slashes are trimmed; adapters append their own route suffixes.
#[derive(Debug, Clone)]
pub struct ServiceEndpoints {
    pub image_base_url: String,
    pub document_base_url: String,
    pub signal_base_url: String,
}

impl ServiceEndpoints {
    pub fn new(image_base_url: &str, document_base_url: &str, signal_base_url: &str) -> Self {
        Self {
            image_base_url: image_base_url.trim_end_matches('/').to_string(),
            document_base_url: document_base_url.trim_end_matches('/').to_string(),
            signal_base_url: signal_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Read endpoints from `CONSILIUM_IMAGE_URL`, `CONSILIUM_DOCUMENT_URL`
    /// and `CONSILIUM_SIGNAL_URL`, falling back to localhost defaults.
    pub fn from_env() -> Self {
        let image = std::env::var("CONSILIUM_IMAGE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        let document = std::env::var("CONSILIUM_DOCUMENT_URL")
            .unwrap_or_else(|_| "http://localhost:8001".to_string());
        let signal = std::env::var("CONSILIUM_SIGNAL_URL")
            .unwrap_or_else(|_| "http://localhost:8002".to_string());
        Self::new(&image, &document, &signal)
    }
}

/// Tuning for one analysis session.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub endpoints: ServiceEndpoints,
    /// Per-dispatch timeout in seconds (each modality's call is bounded
    /// independently).
    pub timeout_secs: u64,
    /// Sampling rate the biosignal adapter attaches to every submission.
    pub sampling_rate_hz: u32,
}

impl AnalysisConfig {
    pub fn new(endpoints: ServiceEndpoints) -> Self {
        Self {
            endpoints,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            sampling_rate_hz: DEFAULT_SAMPLING_RATE_HZ,
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_sampling_rate_hz(mut self, hz: u32) -> Self {
        self.sampling_rate_hz = hz;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
