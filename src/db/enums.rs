use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "monitor_status_enum")]
pub enum MonitorStatus {
    #[sea_orm(string_value = "Pending")]
    #[serde(alias = "pending")]
    Pending,
    #[sea_orm(string_value = "Working")]
    #[serde(alias = "working")]
    Working,
    #[sea_orm(string_value = "Broken")]
    #[serde(alias = "broken")]
    Broken,
    #[sea_orm(string_value = "Active")]
    #[serde(alias = "active")]
    Active,
    #[sea_orm(string_value = "Inactive")]
    #[serde(alias = "inactive")]
    Inactive,
    #[sea_orm(string_value = "Maintenance")]
    #[serde(alias = "maintenance")]
    Maintenance,
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "fix_status_enum")]
pub enum FixStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Applied")]
    Applied,
}

impl fmt::Display for FixStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "repository_provider_enum")]
#[serde(rename_all = "lowercase")]
pub enum RepositoryProvider {
    #[sea_orm(string_value = "github")]
    Github,
    #[sea_orm(string_value = "gitlab")]
    Gitlab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "sync_status_enum")]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "failed")]
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_status_accepts_lowercase_aliases() {
        let status: MonitorStatus = serde_json::from_str("\"broken\"").unwrap();
        assert_eq!(status, MonitorStatus::Broken);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"Broken\"");
    }

    #[test]
    fn provider_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RepositoryProvider::Gitlab).unwrap(),
            "\"gitlab\""
        );
    }
}
