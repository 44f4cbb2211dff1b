use reconcile_resource::schema::{FieldSchema, ResourceSchema};

use crate::access::{
    AccessType, RunsPermission, SentinelMocksPermission, StateVersionsPermission,
    VariablesPermission,
};

pub const TYPE_NAME: &str = "tfe_team_access";

/// Version of [`team_access_schema`]
pub const SCHEMA_VERSION: u64 = 1;

pub const ACCESS: &str = "access";
pub const RUNS: &str = "runs";
pub const VARIABLES: &str = "variables";
pub const STATE_VERSIONS: &str = "state_versions";
pub const SENTINEL_MOCKS: &str = "sentinel_mocks";
pub const WORKSPACE_LOCKING: &str = "workspace_locking";
pub const TEAM_ID: &str = "team_id";
pub const WORKSPACE_ID: &str = "workspace_id";

/// Fields that can only be chosen freely with custom access
pub const PERMISSIONS: [&str; 5] = [
    RUNS,
    VARIABLES,
    STATE_VERSIONS,
    SENTINEL_MOCKS,
    WORKSPACE_LOCKING,
];

/// Whether `s` looks like a workspace external id, `ws-` followed by
/// alphanumerics
pub fn is_workspace_external_id(s: &str) -> bool {
    match s.strip_prefix("ws-") {
        Some(rest) => !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()),
        None => false,
    }
}

pub fn team_access_schema() -> ResourceSchema {
    ResourceSchema::new(
        TYPE_NAME,
        SCHEMA_VERSION,
        vec![
            FieldSchema::string(ACCESS)
                .required()
                .one_of(AccessType::NAMES)
                .describe("Access level of the team on the workspace"),
            FieldSchema::string(RUNS)
                .optional()
                .computed()
                .one_of(RunsPermission::NAMES),
            FieldSchema::string(VARIABLES)
                .optional()
                .computed()
                .one_of(VariablesPermission::NAMES),
            FieldSchema::string(STATE_VERSIONS)
                .optional()
                .computed()
                .one_of(StateVersionsPermission::NAMES),
            FieldSchema::string(SENTINEL_MOCKS)
                .optional()
                .computed()
                .one_of(SentinelMocksPermission::NAMES),
            FieldSchema::bool(WORKSPACE_LOCKING).optional().computed(),
            FieldSchema::string(TEAM_ID).required().force_new(),
            FieldSchema::string(WORKSPACE_ID)
                .required()
                .force_new()
                .format(
                    "must be the workspace's external_id",
                    is_workspace_external_id,
                ),
        ],
    )
}

/// The schema before workspaces were referenced by external id. Here
/// `workspace_id` is `<ORGANIZATION>/<WORKSPACE>`, and there are no
/// individual permissions.
pub fn team_access_schema_v0() -> ResourceSchema {
    ResourceSchema::new(
        TYPE_NAME,
        0,
        vec![
            FieldSchema::string(ACCESS)
                .required()
                .one_of(["admin", "read", "plan", "write"]),
            FieldSchema::string(TEAM_ID).required().force_new(),
            FieldSchema::string(WORKSPACE_ID)
                .required()
                .force_new()
                .describe("<ORGANIZATION>/<WORKSPACE>"),
        ],
    )
}

/// The schema at `version`, if it is one this crate knows
pub fn schema_version(version: u64) -> Option<ResourceSchema> {
    match version {
        0 => Some(team_access_schema_v0()),
        SCHEMA_VERSION => Some(team_access_schema()),
        _ => None,
    }
}
