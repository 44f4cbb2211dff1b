use std::str::FromStr;

use reconcile_resource::ReconcileError;
use serde::Serialize;

pub const IMPORT_FORMAT: &str = "<ORGANIZATION>/<WORKSPACE>/<TEAM ACCESS ID>";

/// The parts of a team access import identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportId {
    pub organization: String,
    pub workspace: String,
    pub team_access_id: String,
}

impl FromStr for ImportId {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ReconcileError::InvalidImportFormat {
            id: s.to_string(),
            expected: IMPORT_FORMAT.to_string(),
        };
        match s.split('/').collect::<Vec<_>>().as_slice() {
            [organization, workspace, team_access_id]
                if !organization.is_empty()
                    && !workspace.is_empty()
                    && !team_access_id.is_empty() =>
            {
                Ok(ImportId {
                    organization: organization.to_string(),
                    workspace: workspace.to_string(),
                    team_access_id: team_access_id.to_string(),
                })
            }
            _ => Err(invalid()),
        }
    }
}
