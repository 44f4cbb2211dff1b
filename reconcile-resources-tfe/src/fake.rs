//! In-memory stand-in for the remote API, for tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;
use async_trait::async_trait;
use reconcile_resource::CallContext;

use crate::access::{
    AccessType, RunsPermission, SentinelMocksPermission, StateVersionsPermission,
    VariablesPermission,
};
use crate::api::{
    ApiError, Team, TeamAccess, TeamAccessAddOptions, TeamAccessApi, TeamAccessUpdateOptions,
    Workspace,
};

#[derive(Default)]
struct State {
    teams: BTreeMap<String, Team>,
    workspaces: BTreeMap<String, Workspace>,
    accesses: BTreeMap<String, TeamAccess>,
    next_id: u64,
    outage: bool,
    /// Operations that fail as if the remote were down
    failing: Vec<String>,
    calls: Vec<String>,
    added: Vec<TeamAccessAddOptions>,
    updated: Vec<(String, TeamAccessUpdateOptions)>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub(crate) struct FakeTfe {
    state: Mutex<State>,
}

/// Permissions the remote derives from a preset access level
fn apply_preset(access: &mut TeamAccess) {
    use RunsPermission as R;
    use SentinelMocksPermission as M;
    use StateVersionsPermission as S;
    use VariablesPermission as V;
    let (runs, variables, state_versions, sentinel_mocks, locking) = match access.access {
        AccessType::Admin => (R::Apply, V::Write, S::Write, M::Read, true),
        AccessType::Write => (R::Apply, V::Write, S::Write, M::Read, true),
        AccessType::Plan => (R::Plan, V::Read, S::Read, M::None, false),
        AccessType::Read => (R::Read, V::Read, S::Read, M::None, false),
        AccessType::Custom => (R::Read, V::None, S::None, M::None, false),
    };
    access.runs = Some(runs);
    access.variables = Some(variables);
    access.state_versions = Some(state_versions);
    access.sentinel_mocks = Some(sentinel_mocks);
    access.workspace_locking = Some(locking);
}

impl FakeTfe {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn enter(&self, ctx: &CallContext, call: String) -> Result<MutexGuard<'_, State>, ApiError> {
        let mut state = self.lock();
        let operation = call.split(' ').next().unwrap_or_default().to_string();
        state.calls.push(call);
        if state.outage || state.failing.contains(&operation) {
            return Err(ApiError::Server {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        if ctx.is_expired() {
            return Err(ApiError::Transport(anyhow!("deadline exceeded")));
        }
        Ok(state)
    }

    pub fn add_team(&self, name: &str) -> Team {
        let mut state = self.lock();
        let team = Team {
            id: format!("team-{}", state.next_id()),
            name: name.to_string(),
        };
        state.teams.insert(team.id.clone(), team.clone());
        team
    }

    pub fn add_workspace(&self, organization: &str, name: &str) -> Workspace {
        let mut state = self.lock();
        let workspace = Workspace {
            id: format!("ws-{}", state.next_id()),
            name: name.to_string(),
            organization: organization.to_string(),
        };
        state
            .workspaces
            .insert(workspace.id.clone(), workspace.clone());
        workspace
    }

    pub fn set_outage(&self, outage: bool) {
        self.lock().outage = outage;
    }

    /// Make only `operation` (e.g. `"add_team_access"`) fail with a 503
    pub fn fail_operation(&self, operation: &str) {
        self.lock().failing.push(operation.to_string());
    }

    /// Remove a team access behind the adapter's back
    pub fn forget_access(&self, id: &str) {
        self.lock().accesses.remove(id);
    }

    /// Make the remote report a team access without its team
    pub fn detach_team(&self, id: &str) {
        if let Some(access) = self.lock().accesses.get_mut(id) {
            access.team = None;
        }
    }

    pub fn access(&self, id: &str) -> Option<TeamAccess> {
        self.lock().accesses.get(id).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn added(&self) -> Vec<TeamAccessAddOptions> {
        self.lock().added.clone()
    }

    pub fn updated(&self) -> Vec<(String, TeamAccessUpdateOptions)> {
        self.lock().updated.clone()
    }
}

#[async_trait]
impl TeamAccessApi for FakeTfe {
    async fn add_team_access(
        &self,
        ctx: &CallContext,
        options: TeamAccessAddOptions,
    ) -> Result<TeamAccess, ApiError> {
        let mut state = self.enter(ctx, format!("add_team_access {}", options.team.id))?;
        if !state.teams.contains_key(&options.team.id)
            || !state.workspaces.contains_key(&options.workspace.id)
        {
            return Err(ApiError::NotFound);
        }
        state.added.push(options.clone());
        let mut access = TeamAccess {
            id: format!("tws-{}", state.next_id()),
            access: options.access,
            runs: None,
            variables: None,
            state_versions: None,
            sentinel_mocks: None,
            workspace_locking: None,
            team: Some(options.team),
            workspace: Some(options.workspace),
        };
        apply_preset(&mut access);
        if access.access.is_custom() {
            access.runs = options.runs.or(access.runs);
            access.variables = options.variables.or(access.variables);
            access.state_versions = options.state_versions.or(access.state_versions);
            access.sentinel_mocks = options.sentinel_mocks.or(access.sentinel_mocks);
            access.workspace_locking = options.workspace_locking.or(access.workspace_locking);
        }
        state.accesses.insert(access.id.clone(), access.clone());
        Ok(access)
    }

    async fn read_team_access(&self, ctx: &CallContext, id: &str) -> Result<TeamAccess, ApiError> {
        let state = self.enter(ctx, format!("read_team_access {}", id))?;
        state.accesses.get(id).cloned().ok_or(ApiError::NotFound)
    }

    async fn update_team_access(
        &self,
        ctx: &CallContext,
        id: &str,
        options: TeamAccessUpdateOptions,
    ) -> Result<TeamAccess, ApiError> {
        let mut state = self.enter(ctx, format!("update_team_access {}", id))?;
        state.updated.push((id.to_string(), options.clone()));
        let access = state.accesses.get_mut(id).ok_or(ApiError::NotFound)?;
        if let Some(level) = options.access {
            access.access = level;
            apply_preset(access);
        }
        if access.access.is_custom() {
            access.runs = options.runs.or(access.runs);
            access.variables = options.variables.or(access.variables);
            access.state_versions = options.state_versions.or(access.state_versions);
            access.sentinel_mocks = options.sentinel_mocks.or(access.sentinel_mocks);
            access.workspace_locking = options.workspace_locking.or(access.workspace_locking);
        }
        Ok(access.clone())
    }

    async fn remove_team_access(&self, ctx: &CallContext, id: &str) -> Result<(), ApiError> {
        let mut state = self.enter(ctx, format!("remove_team_access {}", id))?;
        state.accesses.remove(id).map(|_| ()).ok_or(ApiError::NotFound)
    }

    async fn read_team(&self, ctx: &CallContext, id: &str) -> Result<Team, ApiError> {
        let state = self.enter(ctx, format!("read_team {}", id))?;
        state.teams.get(id).cloned().ok_or(ApiError::NotFound)
    }

    async fn read_workspace_by_id(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> Result<Workspace, ApiError> {
        let state = self.enter(ctx, format!("read_workspace_by_id {}", id))?;
        state.workspaces.get(id).cloned().ok_or(ApiError::NotFound)
    }

    async fn read_workspace_by_name(
        &self,
        ctx: &CallContext,
        organization: &str,
        name: &str,
    ) -> Result<Workspace, ApiError> {
        let state = self.enter(
            ctx,
            format!("read_workspace_by_name {}/{}", organization, name),
        )?;
        state
            .workspaces
            .values()
            .find(|w| w.organization == organization && w.name == name)
            .cloned()
            .ok_or(ApiError::NotFound)
    }
}
