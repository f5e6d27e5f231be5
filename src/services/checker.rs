//! Pluggable health checks behind `execute` and the monitor test endpoint.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use std::error::Error as _;
use std::time::Duration;
use tracing::debug;

use crate::db::models::{Monitor, MonitorConfig, Selectors};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

static CSS_SELECTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[.#]?[A-Za-z0-9_-]+(\.[A-Za-z0-9_-]+)*$")
        .expect("css selector pattern should compile")
});

/// What a checker needs to know about a monitor.
#[derive(Debug, Clone)]
pub struct CheckTarget {
    pub url: String,
    pub timeout_ms: u64,
    pub selectors: Selectors,
}

impl CheckTarget {
    pub fn new(url: impl Into<String>, config: &MonitorConfig) -> Self {
        Self {
            url: url.into(),
            timeout_ms: config.timeout_ms,
            selectors: config.selectors.clone(),
        }
    }
}

impl From<&Monitor> for CheckTarget {
    fn from(monitor: &Monitor) -> Self {
        Self::new(monitor.target_url.clone(), &monitor.config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub success: bool,
    pub detail: String,
}

impl CheckOutcome {
    pub fn passed(detail: impl Into<String>) -> Self {
        Self { success: true, detail: detail.into() }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self { success: false, detail: detail.into() }
    }
}

#[async_trait]
pub trait Checker: Send + Sync {
    /// Never fails: every problem is folded into an unsuccessful outcome.
    async fn check(&self, target: &CheckTarget) -> CheckOutcome;
}

/// Simulated check: succeeds with the configured probability.
pub struct RandomChecker {
    success_rate: f64,
}

impl RandomChecker {
    pub fn new(success_rate: f64) -> Self {
        Self {
            success_rate: success_rate.clamp(0.0, 1.0),
        }
    }
}

impl Default for RandomChecker {
    fn default() -> Self {
        Self::new(0.5)
    }
}

#[async_trait]
impl Checker for RandomChecker {
    async fn check(&self, _target: &CheckTarget) -> CheckOutcome {
        if rand::rng().random_bool(self.success_rate) {
            CheckOutcome::passed("Simulated check passed")
        } else {
            CheckOutcome::failed("Simulated check failed")
        }
    }
}

/// Selectors that fail the shallow syntax check, in input order. Blank entries are skipped.
pub fn invalid_selectors(selectors: &Selectors) -> Vec<String> {
    let css = selectors
        .css
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && !CSS_SELECTOR.is_match(s));
    let xpath = selectors
        .xpath
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && !(s.starts_with("//") || s.starts_with("./")));
    css.chain(xpath).map(str::to_string).collect()
}

/// Fetches the target URL and validates the monitor's selectors.
pub struct HttpChecker {
    client: reqwest::Client,
}

impl HttpChecker {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }
}

fn describe_request_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        return "Request timeout. The server took too long to respond.".to_string();
    }
    if err.is_connect() {
        let mut source = err.source();
        while let Some(cause) = source {
            if let Some(io) = cause.downcast_ref::<std::io::Error>() {
                if io.kind() == std::io::ErrorKind::ConnectionRefused {
                    return "Connection refused. Please check the URL and try again.".to_string();
                }
            }
            if cause.to_string().to_lowercase().contains("dns") {
                return "Domain not found. Please check the URL and try again.".to_string();
            }
            source = cause.source();
        }
    }
    format!("Request failed: {err}")
}

#[async_trait]
impl Checker for HttpChecker {
    async fn check(&self, target: &CheckTarget) -> CheckOutcome {
        let response = self
            .client
            .get(&target.url)
            .timeout(Duration::from_millis(target.timeout_ms.max(1)))
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %target.url, error = %e, "HTTP check request failed.");
                return CheckOutcome::failed(describe_request_error(&e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return CheckOutcome::failed(format!("HTTP {status}"));
        }

        let invalid = invalid_selectors(&target.selectors);
        if !invalid.is_empty() {
            return CheckOutcome::failed(format!(
                "Invalid selectors found: {}",
                invalid.join(", ")
            ));
        }

        CheckOutcome::passed(format!("HTTP {status}"))
    }
}
