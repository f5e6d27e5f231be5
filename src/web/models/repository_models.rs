use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::enums::{RepositoryProvider, SyncStatus};
use crate::db::models::{DeploymentSettings, Repository};

fn default_branch() -> String {
    "main".to_string()
}

#[derive(Debug, Deserialize)]
pub struct CreateRepositoryRequest {
    pub name: String,
    pub provider: RepositoryProvider,
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_branch", alias = "defaultBranch")]
    pub default_branch: String,
    #[serde(alias = "accessToken")]
    pub access_token: String,
    #[serde(default, alias = "deploymentSettings")]
    pub deployment_settings: DeploymentSettings,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRepositoryRequest {
    pub name: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    #[serde(alias = "defaultBranch")]
    pub default_branch: Option<String>,
    #[serde(alias = "accessToken")]
    pub access_token: Option<String>,
    #[serde(alias = "deploymentSettings")]
    pub deployment_settings: Option<DeploymentSettings>,
}

/// Client view of a repository. The access token is never echoed.
#[derive(Debug, Serialize)]
pub struct RepositoryView {
    pub id: i32,
    pub name: String,
    pub provider: RepositoryProvider,
    pub owner: String,
    pub repo: String,
    pub full_name: String,
    pub default_branch: String,
    pub has_access_token: bool,
    pub deployment_settings: DeploymentSettings,
    pub last_sync: Option<DateTime<Utc>>,
    pub sync_status: SyncStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Repository> for RepositoryView {
    fn from(repository: Repository) -> Self {
        Self {
            full_name: repository.full_name(),
            has_access_token: !repository.access_token.is_empty(),
            id: repository.id,
            name: repository.name,
            provider: repository.provider,
            owner: repository.owner,
            repo: repository.repo,
            default_branch: repository.default_branch,
            deployment_settings: repository.deployment,
            last_sync: repository.last_sync,
            sync_status: repository.sync_status,
            error_message: repository.error_message,
            created_at: repository.created_at,
            updated_at: repository.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionTestResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
