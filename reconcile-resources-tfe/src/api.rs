//! The remote API the team access adapter talks to.
//!
//! The HTTP client lives elsewhere; this module only fixes the operations the
//! adapter needs and the values they exchange. Every call receives the
//! caller's [`CallContext`] so the transport can honor its deadline.

use async_trait::async_trait;
use reconcile_resource::CallContext;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::{
    AccessType, RunsPermission, SentinelMocksPermission, StateVersionsPermission,
    VariablesPermission,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    /// External id, `ws-...`
    pub id: String,
    pub name: String,
    pub organization: String,
}

/// A team's access to a workspace, as reported by the remote.
///
/// Permissions are reported for every access level; for the presets they are
/// derived by the remote from the level. `None` means the remote left the
/// permission unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TeamAccess {
    pub id: String,
    pub access: AccessType,
    pub runs: Option<RunsPermission>,
    pub variables: Option<VariablesPermission>,
    pub state_versions: Option<StateVersionsPermission>,
    pub sentinel_mocks: Option<SentinelMocksPermission>,
    pub workspace_locking: Option<bool>,
    pub team: Option<Team>,
    pub workspace: Option<Workspace>,
}

/// Request to give a team access to a workspace.
///
/// Unset permissions are left out of the request entirely; the remote treats
/// an absent permission differently from one explicitly set to its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TeamAccessAddOptions {
    pub access: AccessType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runs: Option<RunsPermission>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<VariablesPermission>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_versions: Option<StateVersionsPermission>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentinel_mocks: Option<SentinelMocksPermission>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_locking: Option<bool>,
    pub team: Team,
    pub workspace: Workspace,
}

impl TeamAccessAddOptions {
    pub fn new(access: AccessType, team: Team, workspace: Workspace) -> Self {
        TeamAccessAddOptions {
            access,
            runs: None,
            variables: None,
            state_versions: None,
            sentinel_mocks: None,
            workspace_locking: None,
            team,
            workspace,
        }
    }
}

/// Request to change an existing team access. Only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TeamAccessUpdateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runs: Option<RunsPermission>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<VariablesPermission>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_versions: Option<StateVersionsPermission>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentinel_mocks: Option<SentinelMocksPermission>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_locking: Option<bool>,
}

impl TeamAccessUpdateOptions {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("resource not found")]
    NotFound,

    #[error("remote responded with status {status}: {message}")]
    Server { status: u16, message: String },

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

#[async_trait]
pub trait TeamAccessApi: Send + Sync {
    async fn add_team_access(
        &self,
        ctx: &CallContext,
        options: TeamAccessAddOptions,
    ) -> Result<TeamAccess, ApiError>;

    async fn read_team_access(&self, ctx: &CallContext, id: &str) -> Result<TeamAccess, ApiError>;

    async fn update_team_access(
        &self,
        ctx: &CallContext,
        id: &str,
        options: TeamAccessUpdateOptions,
    ) -> Result<TeamAccess, ApiError>;

    async fn remove_team_access(&self, ctx: &CallContext, id: &str) -> Result<(), ApiError>;

    async fn read_team(&self, ctx: &CallContext, id: &str) -> Result<Team, ApiError>;

    async fn read_workspace_by_id(&self, ctx: &CallContext, id: &str)
        -> Result<Workspace, ApiError>;

    async fn read_workspace_by_name(
        &self,
        ctx: &CallContext,
        organization: &str,
        name: &str,
    ) -> Result<Workspace, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn team() -> Team {
        Team {
            id: "team-1".to_string(),
            name: "ops".to_string(),
        }
    }

    fn workspace() -> Workspace {
        Workspace {
            id: "ws-1".to_string(),
            name: "prod".to_string(),
            organization: "acme".to_string(),
        }
    }

    #[test]
    fn add_options_omit_unset_permissions() {
        let mut options = TeamAccessAddOptions::new(AccessType::Custom, team(), workspace());
        options.state_versions = Some(StateVersionsPermission::ReadOutputs);
        options.workspace_locking = Some(false);
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["access"], json!("custom"));
        assert_eq!(value["state-versions"], json!("read-outputs"));
        assert_eq!(value["workspace-locking"], json!(false));
        assert!(value.get("runs").is_none());
        assert!(value.get("variables").is_none());
        assert!(value.get("sentinel-mocks").is_none());
    }

    #[test]
    fn update_options_emptiness() {
        let mut options = TeamAccessUpdateOptions::default();
        assert!(options.is_empty());
        assert_eq!(serde_json::to_value(&options).unwrap(), json!({}));
        options.variables = Some(VariablesPermission::None);
        assert!(!options.is_empty());
        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            json!({ "variables": "none" })
        );
    }
}
