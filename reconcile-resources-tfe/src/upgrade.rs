use std::sync::Arc;

use async_trait::async_trait;
use reconcile_resource::upgrade::StateUpgrader;
use reconcile_resource::{CallContext, Properties, ReconcileError, Result};
use serde_json::Value;
use tracing::debug;

use crate::api::{ApiError, TeamAccessApi};
use crate::schema::{is_workspace_external_id, team_access_schema_v0, WORKSPACE_ID};

/// Version 0 referenced the workspace as `<ORGANIZATION>/<WORKSPACE>`.
/// Version 1 uses the workspace's external id.
pub struct WorkspaceExternalIdUpgrader<C: ?Sized> {
    client: Arc<C>,
}

impl<C: TeamAccessApi + ?Sized> WorkspaceExternalIdUpgrader<C> {
    pub fn new(client: Arc<C>) -> Self {
        WorkspaceExternalIdUpgrader { client }
    }
}

fn fail(reason: impl Into<String>) -> ReconcileError {
    ReconcileError::upgrade(0, reason)
}

#[async_trait]
impl<C: TeamAccessApi + ?Sized> StateUpgrader for WorkspaceExternalIdUpgrader<C> {
    fn from_version(&self) -> u64 {
        0
    }

    async fn upgrade(&self, ctx: &CallContext, mut properties: Properties) -> Result<Properties> {
        team_access_schema_v0()
            .validate(&properties)
            .map_err(|e| fail(format!("not a version 0 record: {}", e)))?;

        let human_id = match properties.get(WORKSPACE_ID) {
            Some(Value::String(s)) => s.clone(),
            other => return Err(fail(format!("unexpected workspace_id: {:?}", other))),
        };
        if is_workspace_external_id(&human_id) {
            return Ok(properties);
        }

        let (organization, name) = match human_id.split_once('/') {
            Some((o, n)) if !o.is_empty() && !n.is_empty() && !n.contains('/') => (o, n),
            _ => {
                return Err(fail(format!(
                    "workspace_id {:?} is neither <ORGANIZATION>/<WORKSPACE> nor an external id",
                    human_id
                )))
            }
        };

        let workspace = self
            .client
            .read_workspace_by_name(ctx, organization, name)
            .await
            .map_err(|e| match e {
                ApiError::NotFound => fail(format!("workspace {} not found", human_id)),
                e => fail(format!("error reading workspace {}: {}", human_id, e)),
            })?;
        debug!(workspace = %human_id, external_id = %workspace.id, "resolved workspace");

        properties.insert(WORKSPACE_ID.to_string(), Value::String(workspace.id));
        Ok(properties)
    }
}
