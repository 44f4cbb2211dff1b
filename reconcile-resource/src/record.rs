//! The persisted record of a resource and the events that change it.
//!
//! Records are plain values. Adapter operations take a record by reference and
//! return a new one; the orchestrator decides what to keep. The difference
//! between two records is expressed as a JSON Patch, so that whoever persists
//! state can store changes rather than snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diff::Action;
use crate::error::{ReconcileError, Result};

/// Field name to value. `null` and absence both mean "unset".
pub type Properties = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    /// Remote-assigned identifier, absent until the first successful create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub schema_version: u64,
    #[serde(default)]
    pub properties: Properties,
}

impl ResourceRecord {
    pub fn new(schema_version: u64, properties: Properties) -> Self {
        ResourceRecord {
            id: None,
            schema_version,
            properties,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn without_id(mut self) -> Self {
        self.id = None;
        self
    }

    /// Set a property. Setting `null` removes it.
    pub fn with_property(mut self, name: &str, value: impl Into<Value>) -> Self {
        match value.into() {
            Value::Null => {
                self.properties.remove(name);
            }
            v => {
                self.properties.insert(name.to_string(), v);
            }
        }
        self
    }

    pub fn without_property(mut self, name: &str) -> Self {
        self.properties.remove(name);
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn require_id(&self, operation: &str) -> Result<&str> {
        self.id().ok_or_else(|| ReconcileError::MissingId {
            operation: operation.to_string(),
        })
    }

    /// The value of a property, if it is set to something other than `null`
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn to_value(&self) -> Value {
        // A struct of strings, integers and JSON values always serializes.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateEventMeta {
    pub time: DateTime<Utc>,
    pub action: Action,
}

/// A change from one persisted record to the next.
///
/// The patch applies to the JSON form of the prior record, or to `null` when
/// there was none; applying it yields the JSON form of the resulting record,
/// or `null` when the resource is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEvent {
    pub meta: StateEventMeta,
    pub patch: json_patch::Patch,
}

impl StateEvent {
    pub fn between(
        prior: Option<&ResourceRecord>,
        result: Option<&ResourceRecord>,
        action: Action,
    ) -> Self {
        let left = prior.map(ResourceRecord::to_value).unwrap_or(Value::Null);
        let right = result.map(ResourceRecord::to_value).unwrap_or(Value::Null);
        StateEvent {
            meta: StateEventMeta {
                time: Utc::now(),
                action,
            },
            patch: json_patch::diff(&left, &right),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patch.0.is_empty()
    }

    pub fn apply(&self, state: &mut Value) -> std::result::Result<(), json_patch::PatchError> {
        json_patch::patch(state, self.patch.0.as_slice())
    }
}
