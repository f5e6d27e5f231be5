use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::enums::FixStatus;
use crate::db::models::AiFix;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(alias = "monitorId")]
    pub monitor_id: i32,
    #[serde(alias = "originalCode")]
    pub original_code: String,
}

/// The fields a generator reply is expected to carry.
///
/// `fixed_code` is absent when the generator judges the code to be working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixSuggestion {
    #[serde(default)]
    pub fixed_code: Option<String>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default = "default_verdict")]
    pub status: String,
}

fn default_verdict() -> String {
    "analyzed".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub id: i32,
    pub monitor_id: i32,
    pub original_code: String,
    pub fixed_code: String,
    pub explanation: String,
    /// Verdict reported by the generator.
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<AiFix> for AnalyzeResponse {
    fn from(fix: AiFix) -> Self {
        Self {
            id: fix.id,
            monitor_id: fix.monitor_id,
            original_code: fix.original_code,
            fixed_code: fix.fixed_code,
            explanation: fix.explanation,
            status: fix.analysis,
            created_at: fix.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiFixView {
    pub id: i32,
    pub monitor_id: i32,
    pub original_code: String,
    pub fixed_code: String,
    pub explanation: String,
    pub analysis: String,
    pub status: FixStatus,
    pub created_at: DateTime<Utc>,
    pub applied_at: Option<DateTime<Utc>>,
}

impl From<AiFix> for AiFixView {
    fn from(fix: AiFix) -> Self {
        Self {
            id: fix.id,
            monitor_id: fix.monitor_id,
            original_code: fix.original_code,
            fixed_code: fix.fixed_code,
            explanation: fix.explanation,
            analysis: fix.analysis,
            status: fix.status,
            created_at: fix.created_at,
            applied_at: fix.applied_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyFixResponse {
    pub monitor_id: i32,
    pub fix_id: i32,
    pub status: FixStatus,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct TestUrlRequest {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlAnalysis {
    #[serde(default)]
    pub accessible: bool,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}
