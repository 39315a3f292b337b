use crate::config::CaptchaConfig;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::observability::TracedClientExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Error code reported for a blank token, matching the upstream vocabulary.
pub const MISSING_INPUT_RESPONSE: &str = "missing-input-response";

#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaVerdict {
    pub success: bool,
    pub error_codes: Vec<String>,
}

impl CaptchaVerdict {
    pub fn passed() -> Self {
        Self {
            success: true,
            error_codes: Vec::new(),
        }
    }

    pub fn rejected(error_codes: Vec<String>) -> Self {
        Self {
            success: false,
            error_codes,
        }
    }
}

#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// Check a single-use token. Each token is sent upstream at most once.
    async fn verify(&self, token: &str) -> Result<CaptchaVerdict, CaptchaError>;
}

/// reCAPTCHA `siteverify` client.
pub struct RecaptchaVerifier {
    config: CaptchaConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct SiteVerifyRequest<'a> {
    secret: &'a str,
    response: &'a str,
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

impl RecaptchaVerifier {
    pub fn new(config: CaptchaConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(&self, token: &str) -> Result<CaptchaVerdict, CaptchaError> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(CaptchaVerdict::rejected(vec![
                MISSING_INPUT_RESPONSE.to_string(),
            ]));
        }

        let form = SiteVerifyRequest {
            secret: self.config.secret_key.expose_secret(),
            response: token,
        };

        let response = self
            .client
            .traced_post(&self.config.verify_url)
            .form(&form)
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .send()
            .await
            .map_err(|e| {
                CaptchaError::Connection(format!("Failed to reach CAPTCHA verifier: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CaptchaError::Upstream(format!(
                "CAPTCHA verifier returned error status {}: {}",
                status, body
            )));
        }

        let body: SiteVerifyResponse = response.json().await.map_err(|e| {
            CaptchaError::MalformedResponse(format!("Failed to parse verifier response: {}", e))
        })?;

        if body.success {
            Ok(CaptchaVerdict::passed())
        } else {
            tracing::info!(error_codes = ?body.error_codes, "CAPTCHA token rejected");
            Ok(CaptchaVerdict::rejected(body.error_codes))
        }
    }
}

/// Mock verifier for testing
pub struct MockCaptchaVerifier {
    outcome: MockOutcome,
    verify_count: AtomicU64,
}

enum MockOutcome {
    Pass,
    Reject(Vec<String>),
    Unavailable,
}

impl MockCaptchaVerifier {
    pub fn passing() -> Self {
        Self::with_outcome(MockOutcome::Pass)
    }

    pub fn rejecting(error_code: &str) -> Self {
        Self::with_outcome(MockOutcome::Reject(vec![error_code.to_string()]))
    }

    /// Every call fails as if the upstream were unreachable.
    pub fn unavailable() -> Self {
        Self::with_outcome(MockOutcome::Unavailable)
    }

    fn with_outcome(outcome: MockOutcome) -> Self {
        Self {
            outcome,
            verify_count: AtomicU64::new(0),
        }
    }

    pub fn verify_count(&self) -> u64 {
        self.verify_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptchaVerifier for MockCaptchaVerifier {
    async fn verify(&self, token: &str) -> Result<CaptchaVerdict, CaptchaError> {
        self.verify_count.fetch_add(1, Ordering::SeqCst);

        if token.trim().is_empty() {
            return Ok(CaptchaVerdict::rejected(vec![
                MISSING_INPUT_RESPONSE.to_string(),
            ]));
        }

        tracing::debug!("[MOCK] CAPTCHA token would be verified");

        match &self.outcome {
            MockOutcome::Pass => Ok(CaptchaVerdict::passed()),
            MockOutcome::Reject(codes) => Ok(CaptchaVerdict::rejected(codes.clone())),
            MockOutcome::Unavailable => Err(CaptchaError::Connection(
                "Mock CAPTCHA verifier is unavailable".to_string(),
            )),
        }
    }
}
