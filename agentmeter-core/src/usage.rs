//! Usage oracle client
//!
//! Fetches the Codex rate-limit snapshot (`GET <base_url>/wham/usage`) using
//! the access token that the Codex CLI stores in `<codex_home>/auth.json`.
//! The aggregation engine never calls this; the caller attaches the snapshot
//! to [`crate::analytics::DashboardData`].

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::config::UsageConfig;
use crate::error::{Error, Result};
use crate::types::lenient;

/// One rate-limit window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageWindow {
    pub used_percent: f64,
    pub window_seconds: i64,
    pub reset_after_seconds: i64,
    /// Epoch seconds
    pub reset_at: i64,
}

/// A named secondary limit (e.g. a per-model cap).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalLimit {
    pub limit_name: String,
    pub allowed: bool,
    pub limit_reached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_window: Option<UsageWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_window: Option<UsageWindow>,
}

/// Rate-limit state at `fetched_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub plan_type: String,
    pub allowed: bool,
    pub limit_reached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_window: Option<UsageWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_window: Option<UsageWindow>,
    pub additional_limits: Vec<AdditionalLimit>,
    /// Epoch millis
    pub fetched_at: i64,
}

// Wire format of /wham/usage. Wrong-shaped or null fields fall back to
// defaults rather than failing the whole payload.

#[derive(Debug, Default, Deserialize)]
struct RawWindow {
    #[serde(default, deserialize_with = "lenient::or_default")]
    used_percent: f64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    limit_window_seconds: i64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    reset_after_seconds: i64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    reset_at: i64,
}

#[derive(Debug, Default, Deserialize)]
struct RawRateLimit {
    /// Missing means allowed
    #[serde(default, deserialize_with = "lenient::or_default")]
    allowed: Option<bool>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    limit_reached: bool,
    #[serde(default, deserialize_with = "lenient::or_default")]
    primary_window: Option<RawWindow>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    secondary_window: Option<RawWindow>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAdditional {
    #[serde(default, deserialize_with = "lenient::or_default")]
    limit_name: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    rate_limit: RawRateLimit,
}

#[derive(Debug, Deserialize)]
struct RawPayload {
    #[serde(default, deserialize_with = "lenient::or_default")]
    plan_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    rate_limit: Option<RawRateLimit>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    additional_rate_limits: Option<Vec<RawAdditional>>,
}

#[derive(Debug, Deserialize)]
struct AuthFile {
    #[serde(default)]
    tokens: Option<AuthTokens>,
}

#[derive(Debug, Deserialize)]
struct AuthTokens {
    #[serde(default)]
    access_token: Option<String>,
}

fn map_window(raw: Option<RawWindow>) -> Option<UsageWindow> {
    raw.map(|w| UsageWindow {
        used_percent: w.used_percent,
        window_seconds: w.limit_window_seconds,
        reset_after_seconds: w.reset_after_seconds,
        reset_at: w.reset_at,
    })
}

fn from_payload(payload: RawPayload, fetched_at: i64) -> UsageSnapshot {
    let (allowed, limit_reached, primary_window, secondary_window) = match payload.rate_limit {
        Some(rl) => (
            rl.allowed.unwrap_or(true),
            rl.limit_reached,
            map_window(rl.primary_window),
            map_window(rl.secondary_window),
        ),
        None => (true, false, None, None),
    };

    let additional_limits = payload
        .additional_rate_limits
        .unwrap_or_default()
        .into_iter()
        .map(|a| AdditionalLimit {
            limit_name: a.limit_name,
            allowed: a.rate_limit.allowed.unwrap_or(true),
            limit_reached: a.rate_limit.limit_reached,
            primary_window: map_window(a.rate_limit.primary_window),
            secondary_window: map_window(a.rate_limit.secondary_window),
        })
        .collect();

    UsageSnapshot {
        plan_type: payload
            .plan_type
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "unknown".to_string()),
        allowed,
        limit_reached,
        primary_window,
        secondary_window,
        additional_limits,
        fetched_at,
    }
}

/// Parse a `/wham/usage` response body. The body must be a JSON object.
pub fn parse_usage_payload(body: &str, fetched_at: i64) -> Result<UsageSnapshot> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    if !value.is_object() {
        return Err(Error::Usage("usage payload is not a JSON object".to_string()));
    }
    let payload: RawPayload = serde_json::from_value(value)?;
    Ok(from_payload(payload, fetched_at))
}

/// Read the Codex access token from `<codex_home>/auth.json`.
pub fn read_access_token(codex_home: &Path) -> Option<String> {
    let path = codex_home.join("auth.json");
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "No Codex auth file");
            return None;
        }
    };
    match serde_json::from_str::<AuthFile>(&content) {
        Ok(auth) => auth
            .tokens
            .and_then(|t| t.access_token)
            .filter(|t| !t.is_empty()),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unreadable Codex auth file");
            None
        }
    }
}

/// HTTP client for the usage endpoint
pub struct UsageClient {
    http_client: reqwest::Client,
    base_url: String,
    codex_home: std::path::PathBuf,
}

impl UsageClient {
    /// Create a new usage client from configuration
    pub fn new(config: &UsageConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url(),
            codex_home: config.codex_home(),
        })
    }

    /// Fetch the current snapshot.
    pub async fn fetch(&self) -> Result<UsageSnapshot> {
        let token = read_access_token(&self.codex_home)
            .ok_or_else(|| Error::Usage("no Codex access token found".to_string()))?;
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| Error::Usage(format!("invalid access token: {}", e)))?;

        let url = format!("{}/wham/usage", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .header(AUTHORIZATION, auth_value)
            .send()
            .await
            .map_err(|e| Error::Usage(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Usage(format!("API error ({})", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Usage(format!("failed to read response: {}", e)))?;
        let snapshot = parse_usage_payload(&body, Utc::now().timestamp_millis())?;

        tracing::info!(
            plan_type = %snapshot.plan_type,
            limit_reached = snapshot.limit_reached,
            "Fetched usage snapshot"
        );
        Ok(snapshot)
    }

    /// Fetch the current snapshot, or `None` on any failure.
    pub async fn fetch_snapshot(&self) -> Option<UsageSnapshot> {
        match self.fetch().await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(error = %e, "Usage snapshot unavailable");
                None
            }
        }
    }
}
