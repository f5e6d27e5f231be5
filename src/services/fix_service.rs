use chrono::Utc;
use serde::de::DeserializeOwned;
use tracing::{error, info, warn};

use crate::db::Storage;
use crate::db::models::{AiFix, NewAiFix, ScraperSource};
use crate::services::fix_generator::{CompletionOptions, FixGenerator};
use crate::services::monitor_service::{self, validate_http_url};
use crate::web::error::AppError;
use crate::web::models::AuthenticatedUser;
use crate::web::models::ai_models::{
    AnalyzeRequest, ApplyFixResponse, FixSuggestion, TestUrlRequest, UrlAnalysis,
};

const FIX_SYSTEM_PROMPT: &str =
    "You are an expert JavaScript web scraping developer. Always respond with valid JSON.";
const URL_SYSTEM_PROMPT: &str =
    "You are an expert web scraping developer. Analyze URL accessibility and provide recommendations.";

fn fix_prompt(original_code: &str, target_url: &str) -> String {
    format!(
        r#"You are an expert web scraping developer. Analyze the following JavaScript scraper code and provide a fixed version if there are any issues.

Original Code:
{original_code}

Target URL: {target_url}

Please analyze the code and provide:
1. A fixed version of the code if there are issues
2. A brief explanation of what was wrong and how you fixed it
3. If the code looks correct, confirm it's working properly

Respond in JSON format:
{{
  "fixedCode": "the fixed JavaScript code",
  "explanation": "explanation of changes made",
  "status": "fixed" or "working"
}}
"#
    )
}

fn url_prompt(url: &str) -> String {
    format!(
        r#"Test the accessibility of this URL: {url}

Please analyze if this URL is accessible and provide:
1. Whether the URL is accessible
2. Any potential issues that might affect web scraping
3. Recommendations for scraping this URL

Respond in JSON format:
{{
  "accessible": true/false,
  "issues": ["list of potential issues"],
  "recommendations": ["list of recommendations"]
}}
"#
    )
}

/// Parses a model reply as JSON, also accepting a fenced ```json block.
fn parse_reply<T: DeserializeOwned>(raw: &str) -> Option<T> {
    let trimmed = raw.trim();
    if let Ok(parsed) = serde_json::from_str(trimmed) {
        return Some(parsed);
    }
    let start = trimmed.find("```")?;
    let body = &trimmed[start + 3..];
    let body = body.strip_prefix("json").unwrap_or(body);
    let end = body.find("```")?;
    serde_json::from_str(body[..end].trim()).ok()
}

fn suggestion_from_reply(raw: String) -> FixSuggestion {
    parse_reply(&raw).unwrap_or_else(|| {
        warn!("AI reply was not valid JSON, storing it verbatim.");
        FixSuggestion {
            fixed_code: Some(raw),
            explanation: "AI provided code analysis".to_string(),
            status: "analyzed".to_string(),
        }
    })
}

/// Asks the generator for a fix and stores it as a pending suggestion.
///
/// Nothing is persisted when the generator fails.
pub async fn generate(
    store: &dyn Storage,
    generator: &dyn FixGenerator,
    user: &AuthenticatedUser,
    req: AnalyzeRequest,
) -> Result<AiFix, AppError> {
    if req.original_code.trim().is_empty() {
        return Err(AppError::Validation("Original code is required".to_string()));
    }
    let monitor = monitor_service::get(store, user, req.monitor_id).await?;

    let reply = generator
        .complete(
            FIX_SYSTEM_PROMPT,
            &fix_prompt(&req.original_code, &monitor.target_url),
            CompletionOptions::default(),
        )
        .await
        .map_err(|e| {
            error!(monitor_id = monitor.id, error = %e, "AI fix generation failed.");
            AppError::AiService("Failed to analyze code with AI service".to_string())
        })?;
    let suggestion = suggestion_from_reply(reply);

    let fix = store
        .create_fix(NewAiFix {
            monitor_id: monitor.id,
            fixed_code: suggestion.fixed_code.unwrap_or_else(|| req.original_code.clone()),
            original_code: req.original_code,
            explanation: suggestion.explanation,
            analysis: suggestion.status,
        })
        .await?;
    info!(fix_id = fix.id, monitor_id = monitor.id, user_id = user.id, "AI fix generated.");
    Ok(fix)
}

pub async fn list(
    store: &dyn Storage,
    user: &AuthenticatedUser,
    monitor_id: i32,
) -> Result<Vec<AiFix>, AppError> {
    monitor_service::get(store, user, monitor_id).await?;
    Ok(store.list_fixes(monitor_id).await?)
}

/// Replaces the monitor's scraper with the fix and marks the fix applied.
///
/// Applying an already applied fix rewrites the same code again and refreshes `applied_at`.
pub async fn apply(
    store: &dyn Storage,
    user: &AuthenticatedUser,
    fix_id: i32,
) -> Result<ApplyFixResponse, AppError> {
    let fix = store
        .find_fix(fix_id)
        .await?
        .ok_or(AppError::NotFound("AI fix"))?;
    match store.monitor_owner(fix.monitor_id).await? {
        Some(owner) if owner == user.id => {}
        Some(_) => {
            return Err(AppError::Forbidden(
                "You do not have access to this AI fix".to_string(),
            ));
        }
        None => return Err(AppError::NotFound("Monitor")),
    }

    store
        .set_monitor_source(
            fix.monitor_id,
            ScraperSource::Inline {
                code: fix.fixed_code.clone(),
            },
        )
        .await?;
    let applied = store.mark_fix_applied(fix.id, Utc::now()).await?;
    info!(fix_id = fix.id, monitor_id = fix.monitor_id, user_id = user.id, "AI fix applied.");

    Ok(ApplyFixResponse {
        monitor_id: applied.monitor_id,
        fix_id: applied.id,
        status: applied.status,
        applied_at: applied.applied_at.unwrap_or_else(Utc::now),
    })
}

pub async fn analyze_url(
    generator: &dyn FixGenerator,
    req: TestUrlRequest,
) -> Result<UrlAnalysis, AppError> {
    let url = validate_http_url(&req.url)?;
    let reply = generator
        .complete(
            URL_SYSTEM_PROMPT,
            &url_prompt(&url),
            CompletionOptions {
                max_tokens: 1000,
                ..Default::default()
            },
        )
        .await
        .map_err(|e| {
            error!(url = %url, error = %e, "AI URL analysis failed.");
            AppError::AiService("Failed to analyze URL with AI service".to_string())
        })?;

    Ok(parse_reply(&reply).unwrap_or_else(|| UrlAnalysis {
        accessible: true,
        issues: vec!["Unable to parse AI response".to_string()],
        recommendations: vec!["Check URL manually".to_string()],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::db::enums::FixStatus;
    use crate::services::fix_generator::GeneratorError;
    use crate::web::models::monitor_models::{CreateMonitorRequest, UpdateMonitorRequest};
    use async_trait::async_trait;

    struct CannedGenerator(&'static str);

    #[async_trait]
    impl FixGenerator for CannedGenerator {
        async fn complete(
            &self,
            _system: &str,
            _prompt: &str,
            _options: CompletionOptions,
        ) -> Result<String, GeneratorError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl FixGenerator for FailingGenerator {
        async fn complete(
            &self,
            _system: &str,
            _prompt: &str,
            _options: CompletionOptions,
        ) -> Result<String, GeneratorError> {
            Err(GeneratorError::BadStatus {
                status: 503,
                body: "down".to_string(),
            })
        }
    }

    fn user(id: i32) -> AuthenticatedUser {
        AuthenticatedUser {
            id,
            email: format!("user{id}@example.com"),
            name: format!("User {id}"),
        }
    }

    async fn monitor_for(store: &MemoryStore, owner: &AuthenticatedUser) -> i32 {
        monitor_service::create(
            store,
            owner,
            CreateMonitorRequest {
                name: "Prices".to_string(),
                target_url: "https://shop.example".to_string(),
                scraper_source: None,
                scraper_code: Some("old()".to_string()),
                config: None,
                repository_id: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    fn analyze(monitor_id: i32) -> AnalyzeRequest {
        AnalyzeRequest {
            monitor_id,
            original_code: "old()".to_string(),
        }
    }

    #[test]
    fn replies_are_parsed_leniently() {
        let plain: FixSuggestion =
            parse_reply(r#"{"fixedCode":"a()","explanation":"e","status":"fixed"}"#).unwrap();
        assert_eq!(plain.status, "fixed");

        let fenced: FixSuggestion =
            parse_reply("Here you go:\n```json\n{\"fixedCode\":\"b()\"}\n```").unwrap();
        assert_eq!(fenced.fixed_code.as_deref(), Some("b()"));
        assert_eq!(fenced.status, "analyzed");

        let fallback = suggestion_from_reply("just some prose".to_string());
        assert_eq!(fallback.fixed_code.as_deref(), Some("just some prose"));
        assert_eq!(fallback.explanation, "AI provided code analysis");
    }

    #[tokio::test]
    async fn generate_then_apply_rewrites_source() {
        let store = MemoryStore::new();
        let owner = user(1);
        let monitor_id = monitor_for(&store, &owner).await;
        let generator =
            CannedGenerator(r#"{"fixedCode":"fixed()","explanation":"selector moved","status":"fixed"}"#);

        let fix = generate(&store, &generator, &owner, analyze(monitor_id)).await.unwrap();
        assert_eq!(fix.status, FixStatus::Pending);
        assert_eq!(fix.analysis, "fixed");

        let applied = apply(&store, &owner, fix.id).await.unwrap();
        assert_eq!(applied.status, FixStatus::Applied);

        let monitor = monitor_service::get(&store, &owner, monitor_id).await.unwrap();
        assert_eq!(
            monitor.scraper_source,
            Some(ScraperSource::Inline { code: "fixed()".to_string() })
        );
        let fixes = list(&store, &owner, monitor_id).await.unwrap();
        assert_eq!(fixes.len(), 1);
        assert!(fixes[0].applied_at.is_some());
    }

    #[tokio::test]
    async fn verdict_without_code_keeps_the_original() {
        let store = MemoryStore::new();
        let owner = user(1);
        let monitor_id = monitor_for(&store, &owner).await;
        let generator = CannedGenerator(r#"{"explanation":"The code is correct","status":"working"}"#);

        let fix = generate(&store, &generator, &owner, analyze(monitor_id)).await.unwrap();
        assert_eq!(fix.fixed_code, "old()");
        assert_eq!(fix.explanation, "The code is correct");
        assert_eq!(fix.analysis, "working");

        apply(&store, &owner, fix.id).await.unwrap();
        let monitor = monitor_service::get(&store, &owner, monitor_id).await.unwrap();
        assert_eq!(
            monitor.scraper_source,
            Some(ScraperSource::Inline { code: "old()".to_string() })
        );
    }

    #[tokio::test]
    async fn reapplying_restores_code_and_refreshes_timestamp() {
        let store = MemoryStore::new();
        let owner = user(1);
        let monitor_id = monitor_for(&store, &owner).await;
        let generator = CannedGenerator(r#"{"fixedCode":"fixed()","status":"fixed"}"#);
        let fix = generate(&store, &generator, &owner, analyze(monitor_id)).await.unwrap();

        let first = apply(&store, &owner, fix.id).await.unwrap();
        monitor_service::update(
            &store,
            &owner,
            monitor_id,
            UpdateMonitorRequest {
                scraper_code: Some("edited()".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let second = apply(&store, &owner, fix.id).await.unwrap();
        assert_eq!(second.status, FixStatus::Applied);
        assert!(second.applied_at > first.applied_at);

        let monitor = monitor_service::get(&store, &owner, monitor_id).await.unwrap();
        assert_eq!(
            monitor.scraper_source,
            Some(ScraperSource::Inline { code: "fixed()".to_string() })
        );
        let fixes = list(&store, &owner, monitor_id).await.unwrap();
        assert_eq!(fixes[0].applied_at, Some(second.applied_at));
    }

    #[tokio::test]
    async fn generator_failure_persists_nothing() {
        let store = MemoryStore::new();
        let owner = user(1);
        let monitor_id = monitor_for(&store, &owner).await;

        let err = generate(&store, &FailingGenerator, &owner, analyze(monitor_id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AiService(_)));
        assert!(list(&store, &owner, monitor_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn generate_for_foreign_monitor_is_not_found() {
        let store = MemoryStore::new();
        let monitor_id = monitor_for(&store, &user(1)).await;
        let err = generate(&store, &CannedGenerator("{}"), &user(2), analyze(monitor_id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("Monitor")));
    }

    #[tokio::test]
    async fn apply_checks_ownership() {
        let store = MemoryStore::new();
        let owner = user(1);
        let monitor_id = monitor_for(&store, &owner).await;
        let fix = generate(&store, &CannedGenerator("fixed()"), &owner, analyze(monitor_id))
            .await
            .unwrap();

        let err = apply(&store, &user(2), fix.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let monitor = monitor_service::get(&store, &owner, monitor_id).await.unwrap();
        assert_eq!(
            monitor.scraper_source,
            Some(ScraperSource::Inline { code: "old()".to_string() })
        );

        let err = apply(&store, &owner, 9_999).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("AI fix")));
    }

    #[tokio::test]
    async fn url_analysis_falls_back_on_prose() {
        let analysis = analyze_url(
            &CannedGenerator("Looks fine to me"),
            TestUrlRequest { url: "https://shop.example".to_string() },
        )
        .await
        .unwrap();
        assert!(analysis.accessible);
        assert_eq!(analysis.issues, vec!["Unable to parse AI response"]);

        let err = analyze_url(
            &CannedGenerator("{}"),
            TestUrlRequest { url: "nope".to_string() },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
