use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use reconcile_resource::diff::{compute_changes, requires_replacement, DiffPolicy};
use reconcile_resource::schema::ResourceSchema;
use reconcile_resource::upgrade::StateUpgrader;
use reconcile_resource::{
    CallContext, Properties, ReadOutcome, ReconcileError, ResourceAdapter, ResourceRecord, Result,
};
use serde_json::Value;
use tracing::{debug, field, instrument};

use crate::access::{AccessType, UnknownValue};
use crate::api::{ApiError, TeamAccess, TeamAccessAddOptions, TeamAccessApi, TeamAccessUpdateOptions};
use crate::import::ImportId;
use crate::policy::CustomAccessBoundary;
use crate::schema::{
    team_access_schema, ACCESS, RUNS, SCHEMA_VERSION, SENTINEL_MOCKS, STATE_VERSIONS, TEAM_ID,
    VARIABLES, WORKSPACE_ID, WORKSPACE_LOCKING,
};
use crate::upgrade::WorkspaceExternalIdUpgrader;

/// The team access resource: a team's access level on a workspace.
pub struct TeamAccessResource<C: ?Sized> {
    client: Arc<C>,
    schema: ResourceSchema,
    upgraders: Vec<Box<dyn StateUpgrader>>,
}

impl<C: TeamAccessApi + ?Sized + 'static> TeamAccessResource<C> {
    pub fn new(client: Arc<C>) -> Self {
        TeamAccessResource {
            upgraders: vec![Box::new(WorkspaceExternalIdUpgrader::new(client.clone()))],
            client,
            schema: team_access_schema(),
        }
    }
}

fn parse<T: FromStr<Err = UnknownValue>>(field: &str, value: Option<&Value>) -> Result<Option<T>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|e: UnknownValue| ReconcileError::invalid_value(field, s, e.to_string())),
        Some(v) => Err(ReconcileError::invalid_value(field, v, "expected a string")),
    }
}

fn parse_bool(field: &str, value: Option<&Value>) -> Result<Option<bool>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(v) => Err(ReconcileError::invalid_value(field, v, "expected a bool")),
    }
}

fn required_str<'a>(record: &'a ResourceRecord, field: &str) -> Result<&'a str> {
    record
        .get_str(field)
        .ok_or_else(|| ReconcileError::invalid_value(field, Value::Null, "required field is not set"))
}

/// A failed lookup of something the binding refers to
fn lookup_error(kind: &str, id: &str, operation: &str, e: ApiError) -> ReconcileError {
    match e {
        ApiError::NotFound => ReconcileError::reference_not_found(kind, id),
        e => ReconcileError::remote(operation, id, e),
    }
}

/// Overwrite the permission fields with what the remote reports. Unset
/// values are removed rather than defaulted.
fn with_remote_permissions(record: ResourceRecord, remote: &TeamAccess) -> ResourceRecord {
    record
        .with_property(RUNS, remote.runs.map(|p| p.as_str()))
        .with_property(VARIABLES, remote.variables.map(|p| p.as_str()))
        .with_property(STATE_VERSIONS, remote.state_versions.map(|p| p.as_str()))
        .with_property(SENTINEL_MOCKS, remote.sentinel_mocks.map(|p| p.as_str()))
        .with_property(WORKSPACE_LOCKING, remote.workspace_locking)
}

/// Overwrite everything the remote reports: access, permissions and the team.
fn with_remote(record: ResourceRecord, remote: &TeamAccess) -> ResourceRecord {
    let record = with_remote_permissions(record, remote)
        .with_property(ACCESS, remote.access.as_str());
    match &remote.team {
        Some(team) => record.with_property(TEAM_ID, team.id.as_str()),
        None => record.without_property(TEAM_ID),
    }
}

#[async_trait]
impl<C: TeamAccessApi + ?Sized + 'static> ResourceAdapter for TeamAccessResource<C> {
    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    fn diff_policy(&self) -> &dyn DiffPolicy {
        &CustomAccessBoundary
    }

    fn state_upgraders(&self) -> &[Box<dyn StateUpgrader>] {
        &self.upgraders
    }

    #[instrument(skip_all, fields(team_id = field::Empty, workspace_id = field::Empty))]
    async fn create(&self, ctx: &CallContext, desired: &ResourceRecord) -> Result<ResourceRecord> {
        self.schema.validate(&desired.properties)?;

        let access: AccessType = parse(ACCESS, desired.get(ACCESS))?.ok_or_else(|| {
            ReconcileError::invalid_value(ACCESS, Value::Null, "required field is not set")
        })?;
        let workspace_id = required_str(desired, WORKSPACE_ID)?;
        let team_id = required_str(desired, TEAM_ID)?;
        tracing::Span::current()
            .record("team_id", team_id)
            .record("workspace_id", workspace_id);

        let workspace = self
            .client
            .read_workspace_by_id(ctx, workspace_id)
            .await
            .map_err(|e| lookup_error("workspace", workspace_id, "read workspace", e))?;
        let team = self
            .client
            .read_team(ctx, team_id)
            .await
            .map_err(|e| lookup_error("team", team_id, "read team", e))?;

        let team_name = team.name.clone();
        let workspace_name = workspace.name.clone();
        let mut options = TeamAccessAddOptions::new(access, team, workspace);
        if access.is_custom() {
            options.runs = parse(RUNS, desired.get(RUNS))?;
            options.variables = parse(VARIABLES, desired.get(VARIABLES))?;
            options.state_versions = parse(STATE_VERSIONS, desired.get(STATE_VERSIONS))?;
            options.sentinel_mocks = parse(SENTINEL_MOCKS, desired.get(SENTINEL_MOCKS))?;
            options.workspace_locking = parse_bool(WORKSPACE_LOCKING, desired.get(WORKSPACE_LOCKING))?;
        }

        debug!(
            team = %team_name,
            access = %access,
            workspace = %workspace_name,
            "giving team access to workspace"
        );
        let created = self.client.add_team_access(ctx, options).await.map_err(|e| {
            ReconcileError::remote(
                format!(
                    "giving team {} {} access to workspace {}",
                    team_name, access, workspace_name
                ),
                format!("{}/{}", team_id, workspace_id),
                e,
            )
        })?;

        Ok(with_remote(desired.clone(), &created).with_id(created.id.as_str()))
    }

    #[instrument(skip_all, fields(id = record.id().unwrap_or("")))]
    async fn read(&self, ctx: &CallContext, record: &ResourceRecord) -> Result<ReadOutcome> {
        let id = record.require_id("read team access")?;
        debug!("reading configuration of team access");
        match self.client.read_team_access(ctx, id).await {
            Ok(remote) => Ok(ReadOutcome::Present(with_remote(record.clone(), &remote))),
            Err(ApiError::NotFound) => {
                debug!("team access no longer exists");
                Ok(ReadOutcome::Absent)
            }
            Err(e) => Err(ReconcileError::remote("reading team access", id, e)),
        }
    }

    #[instrument(skip_all, fields(id = prior.id().unwrap_or("")))]
    async fn update(
        &self,
        ctx: &CallContext,
        prior: &ResourceRecord,
        desired: &ResourceRecord,
    ) -> Result<ResourceRecord> {
        let id = prior.require_id("update team access")?;
        self.schema.validate(&desired.properties)?;

        let changes = compute_changes(&self.schema, &prior.properties, &desired.properties);
        if let Some(change) = changes
            .iter()
            .find(|c| requires_replacement(&self.schema, self.diff_policy(), c))
        {
            return Err(ReconcileError::ReplacementRequired {
                field: change.field.clone(),
            });
        }

        let mut options = TeamAccessUpdateOptions::default();
        for change in &changes {
            let new = change.new.as_ref();
            match change.field.as_str() {
                ACCESS => options.access = parse(ACCESS, new)?,
                RUNS => options.runs = parse(RUNS, new)?,
                VARIABLES => options.variables = parse(VARIABLES, new)?,
                STATE_VERSIONS => options.state_versions = parse(STATE_VERSIONS, new)?,
                SENTINEL_MOCKS => options.sentinel_mocks = parse(SENTINEL_MOCKS, new)?,
                WORKSPACE_LOCKING => options.workspace_locking = parse_bool(WORKSPACE_LOCKING, new)?,
                _ => {}
            }
        }
        if options.is_empty() {
            debug!("nothing to update");
            return Ok(prior.clone());
        }

        debug!(?options, "updating team access");
        let updated = self
            .client
            .update_team_access(ctx, id, options)
            .await
            .map_err(|e| ReconcileError::remote("updating team access", id, e))?;

        Ok(with_remote_permissions(desired.clone().with_id(id), &updated))
    }

    #[instrument(skip_all, fields(id = record.id().unwrap_or("")))]
    async fn delete(&self, ctx: &CallContext, record: &ResourceRecord) -> Result<()> {
        let id = record.require_id("delete team access")?;
        debug!("deleting team access");
        match self.client.remove_team_access(ctx, id).await {
            Ok(()) => Ok(()),
            Err(ApiError::NotFound) => {
                debug!("team access was already gone");
                Ok(())
            }
            Err(e) => Err(ReconcileError::remote("deleting team access", id, e)),
        }
    }

    #[instrument(skip_all, fields(import_id = %import_id))]
    async fn import(&self, ctx: &CallContext, import_id: &str) -> Result<ResourceRecord> {
        let parsed: ImportId = import_id.parse()?;
        let human_id = format!("{}/{}", parsed.organization, parsed.workspace);
        let workspace = self
            .client
            .read_workspace_by_name(ctx, &parsed.organization, &parsed.workspace)
            .await
            .map_err(|e| lookup_error("workspace", &human_id, "read workspace", e))?;

        Ok(ResourceRecord::new(SCHEMA_VERSION, Properties::new())
            .with_property(WORKSPACE_ID, workspace.id)
            .with_id(parsed.team_access_id))
    }
}
