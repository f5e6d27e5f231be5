use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, header};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::db::Storage;
use crate::db::enums::{RepositoryProvider, SyncStatus};
use crate::db::models::{NewRepository, Repository, RepositoryChanges};
use crate::services::encryption_service::TokenCipher;
use crate::web::error::AppError;
use crate::web::models::AuthenticatedUser;
use crate::web::models::repository_models::{
    ConnectionTestResponse, CreateRepositoryRequest, UpdateRepositoryRequest,
};

const GITHUB_API: &str = "https://api.github.com";
const GITLAB_API: &str = "https://gitlab.com/api/v4";
const PROBE_USER_AGENT: &str = "scrapewatch";

static PATH_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_.-]+$").expect("repository segment pattern should compile")
});

/// Verifies that a token can read a hosted repository.
#[async_trait]
pub trait RepositoryProbe: Send + Sync {
    async fn probe(
        &self,
        provider: RepositoryProvider,
        owner: &str,
        repo: &str,
        token: &str,
    ) -> ConnectionTestResponse;
}

pub struct HttpRepositoryProbe {
    client: Client,
    github_api: String,
    gitlab_api: String,
}

impl HttpRepositoryProbe {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_endpoints(GITHUB_API, GITLAB_API)
    }

    pub fn with_endpoints(
        github_api: impl Into<String>,
        gitlab_api: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(PROBE_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            github_api: github_api.into().trim_end_matches('/').to_string(),
            gitlab_api: gitlab_api.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RepositoryProbe for HttpRepositoryProbe {
    async fn probe(
        &self,
        provider: RepositoryProvider,
        owner: &str,
        repo: &str,
        token: &str,
    ) -> ConnectionTestResponse {
        let request = match provider {
            RepositoryProvider::Github => self
                .client
                .get(format!("{}/repos/{owner}/{repo}", self.github_api))
                .header(header::AUTHORIZATION, format!("token {token}"))
                .header(header::ACCEPT, "application/vnd.github.v3+json"),
            RepositoryProvider::Gitlab => {
                let project = urlencoding::encode(&format!("{owner}/{repo}")).into_owned();
                self.client
                    .get(format!("{}/projects/{project}", self.gitlab_api))
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
            }
        };

        match request.send().await {
            Ok(response) if response.status().is_success() => ConnectionTestResponse {
                success: true,
                status: Some(response.status().as_u16()),
                error: None,
            },
            Ok(response) => {
                let status = response.status();
                ConnectionTestResponse {
                    success: false,
                    status: Some(status.as_u16()),
                    error: Some(format!("Request failed with status code {}", status.as_u16())),
                }
            }
            Err(e) => ConnectionTestResponse {
                success: false,
                status: None,
                error: Some(e.to_string()),
            },
        }
    }
}

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Owner and repo names end up in provider API paths.
fn path_segment(field: &str, value: &str) -> Result<String, AppError> {
    let value = required(field, value)?;
    if !PATH_SEGMENT.is_match(&value) || value == "." || value == ".." {
        return Err(AppError::Validation(format!(
            "{field} may only contain letters, digits, '_', '-' and '.'"
        )));
    }
    Ok(value)
}

fn encrypt_token(cipher: &TokenCipher, token: &str) -> Result<String, AppError> {
    cipher.encrypt(token).map_err(|e| {
        error!(error = %e, "Failed to encrypt repository token.");
        AppError::InternalServerError("Failed to store access token".to_string())
    })
}

pub async fn create(
    store: &dyn Storage,
    cipher: &TokenCipher,
    user: &AuthenticatedUser,
    req: CreateRepositoryRequest,
) -> Result<Repository, AppError> {
    let name = required("Name", &req.name)?;
    let owner = path_segment("Owner", &req.owner)?;
    let repo = path_segment("Repo", &req.repo)?;
    let default_branch = required("Default branch", &req.default_branch)?;
    let token = required("Access token", &req.access_token)?;

    let repository = store
        .create_repository(NewRepository {
            owner_id: user.id,
            name,
            provider: req.provider,
            owner,
            repo,
            default_branch,
            access_token: encrypt_token(cipher, &token)?,
            deployment: req.deployment_settings,
        })
        .await?;
    info!(repository_id = repository.id, user_id = user.id, "Repository connected.");
    Ok(repository)
}

pub async fn list(store: &dyn Storage, user: &AuthenticatedUser) -> Result<Vec<Repository>, AppError> {
    Ok(store.list_repositories(user.id).await?)
}

pub async fn get(
    store: &dyn Storage,
    user: &AuthenticatedUser,
    id: i32,
) -> Result<Repository, AppError> {
    store
        .find_repository(user.id, id)
        .await?
        .ok_or(AppError::NotFound("Repository"))
}

pub async fn update(
    store: &dyn Storage,
    cipher: &TokenCipher,
    user: &AuthenticatedUser,
    id: i32,
    req: UpdateRepositoryRequest,
) -> Result<Repository, AppError> {
    let access_token = match req.access_token.as_deref() {
        Some(token) => Some(encrypt_token(cipher, &required("Access token", token)?)?),
        None => None,
    };
    let changes = RepositoryChanges {
        name: req.name.as_deref().map(|v| required("Name", v)).transpose()?,
        owner: req.owner.as_deref().map(|v| path_segment("Owner", v)).transpose()?,
        repo: req.repo.as_deref().map(|v| path_segment("Repo", v)).transpose()?,
        default_branch: req
            .default_branch
            .as_deref()
            .map(|v| required("Default branch", v))
            .transpose()?,
        access_token,
        deployment: req.deployment_settings,
    };
    if changes.is_empty() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }
    Ok(store.update_repository(user.id, id, changes).await?)
}

/// Monitors linked to the repository are detached, not deleted.
pub async fn delete(store: &dyn Storage, user: &AuthenticatedUser, id: i32) -> Result<(), AppError> {
    store.delete_repository(user.id, id).await?;
    info!(repository_id = id, user_id = user.id, "Repository removed.");
    Ok(())
}

/// Probes the provider with the stored token and records the sync result.
///
/// Provider failures are reported in the response body, not as an error.
pub async fn test_connection(
    store: &dyn Storage,
    cipher: &TokenCipher,
    probe: &dyn RepositoryProbe,
    user: &AuthenticatedUser,
    id: i32,
) -> Result<ConnectionTestResponse, AppError> {
    let repository = get(store, user, id).await?;
    let token = cipher.decrypt(&repository.access_token).map_err(|e| {
        error!(repository_id = id, error = %e, "Failed to decrypt repository token.");
        AppError::InternalServerError("Stored access token is unreadable".to_string())
    })?;

    let result = probe
        .probe(repository.provider, &repository.owner, &repository.repo, &token)
        .await;
    let (status, error_message) = if result.success {
        (SyncStatus::Success, None)
    } else {
        warn!(repository_id = id, error = ?result.error, "Repository connection test failed.");
        (SyncStatus::Failed, result.error.clone())
    };
    store
        .record_repository_sync(id, status, error_message, Utc::now())
        .await?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::db::models::DeploymentSettings;
    use axum::{
        Router,
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::get as get_route,
    };

    const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    fn user(id: i32) -> AuthenticatedUser {
        AuthenticatedUser {
            id,
            email: format!("user{id}@example.com"),
            name: format!("User {id}"),
        }
    }

    fn create_request(provider: RepositoryProvider, token: &str) -> CreateRepositoryRequest {
        CreateRepositoryRequest {
            name: "Scrapers".to_string(),
            provider,
            owner: "acme".to_string(),
            repo: "scrapers".to_string(),
            default_branch: "main".to_string(),
            access_token: token.to_string(),
            deployment_settings: DeploymentSettings::default(),
        }
    }

    async fn serve() -> String {
        let app = Router::new()
            .route(
                "/github/repos/{owner}/{repo}",
                get_route(|headers: HeaderMap| async move {
                    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                        Some("token good") => StatusCode::OK,
                        _ => StatusCode::UNAUTHORIZED,
                    }
                }),
            )
            .route(
                "/gitlab/projects/{project}",
                get_route(|Path(project): Path<String>| async move {
                    if project == "acme/scrapers" {
                        StatusCode::OK
                    } else {
                        StatusCode::NOT_FOUND
                    }
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn token_is_stored_encrypted() {
        let store = MemoryStore::new();
        let cipher = TokenCipher::new(KEY).unwrap();
        let repository = create(&store, &cipher, &user(1), create_request(RepositoryProvider::Github, "ghp_secret"))
            .await
            .unwrap();

        assert_ne!(repository.access_token, "ghp_secret");
        assert_eq!(cipher.decrypt(&repository.access_token).unwrap(), "ghp_secret");
        assert_eq!(repository.sync_status, SyncStatus::Pending);
    }

    #[tokio::test]
    async fn blank_fields_are_rejected() {
        let store = MemoryStore::new();
        let cipher = TokenCipher::new(KEY).unwrap();
        let err = create(&store, &cipher, &user(1), create_request(RepositoryProvider::Github, "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let repository = create(&store, &cipher, &user(1), create_request(RepositoryProvider::Github, "t"))
            .await
            .unwrap();
        let err = update(&store, &cipher, &user(1), repository.id, UpdateRepositoryRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn owner_and_repo_must_be_plain_path_segments() {
        let store = MemoryStore::new();
        let cipher = TokenCipher::new(KEY).unwrap();
        for bad in ["acme/evil", "a?b", "x#y", "..", "a b"] {
            let mut req = create_request(RepositoryProvider::Github, "t");
            req.owner = bad.to_string();
            let err = create(&store, &cipher, &user(1), req).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "owner {bad}");

            let mut req = create_request(RepositoryProvider::Github, "t");
            req.repo = bad.to_string();
            let err = create(&store, &cipher, &user(1), req).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "repo {bad}");
        }

        let mut req = create_request(RepositoryProvider::Github, "t");
        req.repo = "scraper-kit_v2.0".to_string();
        let repository = create(&store, &cipher, &user(1), req).await.unwrap();

        let err = update(
            &store,
            &cipher,
            &user(1),
            repository.id,
            UpdateRepositoryRequest {
                repo: Some("../../user".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let stored = get(&store, &user(1), repository.id).await.unwrap();
        assert_eq!(stored.repo, "scraper-kit_v2.0");
    }

    #[tokio::test]
    async fn repositories_are_owner_scoped() {
        let store = MemoryStore::new();
        let cipher = TokenCipher::new(KEY).unwrap();
        let repository = create(&store, &cipher, &user(1), create_request(RepositoryProvider::Github, "t"))
            .await
            .unwrap();

        assert!(matches!(
            get(&store, &user(2), repository.id).await,
            Err(AppError::NotFound("Repository"))
        ));
        assert!(list(&store, &user(2)).await.unwrap().is_empty());
        assert!(delete(&store, &user(2), repository.id).await.is_err());
        assert!(get(&store, &user(1), repository.id).await.is_ok());
    }

    #[tokio::test]
    async fn connection_test_records_sync_status() {
        let base = serve().await;
        let probe =
            HttpRepositoryProbe::with_endpoints(format!("{base}/github"), format!("{base}/gitlab"))
                .unwrap();
        let store = MemoryStore::new();
        let cipher = TokenCipher::new(KEY).unwrap();
        let owner = user(1);

        let good = create(&store, &cipher, &owner, create_request(RepositoryProvider::Github, "good"))
            .await
            .unwrap();
        let result = test_connection(&store, &cipher, &probe, &owner, good.id).await.unwrap();
        assert!(result.success);
        assert_eq!(get(&store, &owner, good.id).await.unwrap().sync_status, SyncStatus::Success);

        let bad = create(&store, &cipher, &owner, create_request(RepositoryProvider::Github, "bad"))
            .await
            .unwrap();
        let result = test_connection(&store, &cipher, &probe, &owner, bad.id).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.status, Some(401));
        let stored = get(&store, &owner, bad.id).await.unwrap();
        assert_eq!(stored.sync_status, SyncStatus::Failed);
        assert!(stored.error_message.is_some());
        assert!(stored.last_sync.is_some());

        let lab = create(&store, &cipher, &owner, create_request(RepositoryProvider::Gitlab, "t"))
            .await
            .unwrap();
        let result = test_connection(&store, &cipher, &probe, &owner, lab.id).await.unwrap();
        assert!(result.success, "{result:?}");
    }
}
