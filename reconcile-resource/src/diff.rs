//! Change detection and the decision between in-place update and replacement.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::record::{Properties, ResourceRecord};
use crate::schema::ResourceSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Create,
    Update,
    /// Destroy, then create anew
    Replace,
    Delete,
    NoOp,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Replace => "replace",
            Action::Delete => "delete",
            Action::NoOp => "no-op",
        };
        write!(f, "{}", s)
    }
}

/// Old and new value of one field. `None` means unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

impl FieldChange {
    pub fn old_str(&self) -> Option<&str> {
        self.old.as_ref().and_then(Value::as_str)
    }

    pub fn new_str(&self) -> Option<&str> {
        self.new.as_ref().and_then(Value::as_str)
    }
}

/// Resource-specific replacement rules, on top of the schema's `force_new`
/// flags.
pub trait DiffPolicy: Send + Sync {
    fn requires_replacement(&self, _change: &FieldChange) -> bool {
        false
    }
}

/// Policy for resources whose schema flags say everything
pub struct SchemaOnly;

impl DiffPolicy for SchemaOnly {}

/// Fields whose desired value differs from the prior one, in field name order.
///
/// A computed field left unset in `desired` keeps whatever the remote
/// assigned, so it is not a change.
pub fn compute_changes(
    schema: &ResourceSchema,
    prior: &Properties,
    desired: &Properties,
) -> Vec<FieldChange> {
    schema
        .fields
        .values()
        .filter_map(|field| {
            let old = prior.get(&field.name).filter(|v| !v.is_null());
            let new = desired.get(&field.name).filter(|v| !v.is_null());
            if new.is_none() && field.computed {
                return None;
            }
            if old == new {
                return None;
            }
            Some(FieldChange {
                field: field.name.clone(),
                old: old.cloned(),
                new: new.cloned(),
            })
        })
        .collect()
}

/// Whether `change` can only be applied by destroying and recreating.
pub fn requires_replacement(
    schema: &ResourceSchema,
    policy: &dyn DiffPolicy,
    change: &FieldChange,
) -> bool {
    let force_new = schema
        .field(&change.field)
        .map(|f| f.force_new)
        .unwrap_or(false);
    force_new || policy.requires_replacement(change)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub action: Action,
    pub changes: Vec<FieldChange>,
    /// Fields that forced a replacement
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replace_reasons: Vec<String>,
}

impl Plan {
    fn new(action: Action, changes: Vec<FieldChange>) -> Self {
        Plan {
            action,
            changes,
            replace_reasons: Vec::new(),
        }
    }
}

/// Decide what to do to get from `prior` (the refreshed record, if the
/// resource exists) to `desired` (the desired properties, if it should
/// exist). The desired properties are validated first.
pub fn plan(
    schema: &ResourceSchema,
    policy: &dyn DiffPolicy,
    prior: Option<&ResourceRecord>,
    desired: Option<&Properties>,
) -> Result<Plan> {
    if let Some(desired) = desired {
        schema.validate(desired)?;
    }
    // A record that never got an id was never created.
    let prior = prior.filter(|p| p.id.is_some());

    let plan = match (prior, desired) {
        (None, None) => Plan::new(Action::NoOp, Vec::new()),
        (None, Some(desired)) => Plan::new(
            Action::Create,
            compute_changes(schema, &Properties::new(), desired),
        ),
        (Some(_), None) => Plan::new(Action::Delete, Vec::new()),
        (Some(prior), Some(desired)) => {
            let changes = compute_changes(schema, &prior.properties, desired);
            let replace_reasons: Vec<String> = changes
                .iter()
                .filter(|c| requires_replacement(schema, policy, c))
                .map(|c| c.field.clone())
                .collect();
            let action = if changes.is_empty() {
                Action::NoOp
            } else if replace_reasons.is_empty() {
                Action::Update
            } else {
                Action::Replace
            };
            Plan {
                action,
                changes,
                replace_reasons,
            }
        }
    };
    Ok(plan)
}
