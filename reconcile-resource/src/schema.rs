//! Declarative description of the fields a resource understands.
//!
//! A [`ResourceSchema`] is consulted by validation, by the diff policy and by
//! adapters when they decide which fields to send to the remote. It has no
//! behavior of its own beyond checking values against the declarations.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::{ReconcileError, Result};
use crate::record::Properties;

/// Semantic type of a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    String,
    Bool,
}

impl FieldType {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Bool => value.is_boolean(),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::String => write!(f, "string"),
            FieldType::Bool => write!(f, "bool"),
        }
    }
}

/// Restriction on the values of a string field
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Validation {
    /// Value must be one of the listed strings
    OneOf { values: Vec<String> },
    /// Value must satisfy `check`; `description` is reported on failure
    Format {
        description: String,
        #[serde(skip)]
        check: fn(&str) -> bool,
    },
}

impl Validation {
    fn check(&self, field: &str, value: &str) -> Result<()> {
        match self {
            Validation::OneOf { values } => {
                if values.iter().any(|v| v == value) {
                    Ok(())
                } else {
                    Err(ReconcileError::invalid_value(
                        field,
                        value,
                        format!("expected one of [{}]", values.join(", ")),
                    ))
                }
            }
            Validation::Format { description, check } => {
                if check(value) {
                    Ok(())
                } else {
                    Err(ReconcileError::invalid_value(
                        field,
                        value,
                        description.clone(),
                    ))
                }
            }
        }
    }
}

/// Schema for a single field
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: FieldType,
    /// Must be set in the desired properties
    pub required: bool,
    /// May be set in the desired properties
    pub optional: bool,
    /// May be assigned by the remote when left unset
    pub computed: bool,
    /// A change can only be applied by destroying and recreating the resource
    pub force_new: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSchema {
    fn new(name: &str, type_: FieldType) -> Self {
        FieldSchema {
            name: name.to_string(),
            type_,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            validation: None,
            description: None,
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn bool(name: &str) -> Self {
        Self::new(name, FieldType::Bool)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn one_of<S: AsRef<str>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.validation = Some(Validation::OneOf {
            values: values.into_iter().map(|v| v.as_ref().to_string()).collect(),
        });
        self
    }

    pub fn format(mut self, description: &str, check: fn(&str) -> bool) -> Self {
        self.validation = Some(Validation::Format {
            description: description.to_string(),
            check,
        });
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Check a single value against this field's type and validation.
    /// `null` counts as unset and is always accepted here.
    pub fn validate_value(&self, value: &Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        if !self.type_.accepts(value) {
            return Err(ReconcileError::invalid_value(
                &self.name,
                value,
                format!("expected a {}", self.type_),
            ));
        }
        match (&self.validation, value.as_str()) {
            (Some(validation), Some(s)) => validation.check(&self.name, s),
            _ => Ok(()),
        }
    }
}

/// The set of fields of a resource type, at a particular schema version
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSchema {
    #[serde(rename = "type")]
    pub type_: String,
    pub version: u64,
    pub fields: BTreeMap<String, FieldSchema>,
}

impl ResourceSchema {
    pub fn new(type_: &str, version: u64, fields: impl IntoIterator<Item = FieldSchema>) -> Self {
        ResourceSchema {
            type_: type_.to_string(),
            version,
            fields: fields
                .into_iter()
                .map(|f| (f.name.clone(), f))
                .collect(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.get(name)
    }

    pub fn force_new_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.values().filter(|f| f.force_new)
    }

    pub fn computed_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.values().filter(|f| f.computed)
    }

    /// Validate a full set of properties: every value must be declared and
    /// valid, and every required field must be set.
    pub fn validate(&self, properties: &Properties) -> Result<()> {
        for (name, value) in properties {
            let field = self.field(name).ok_or_else(|| {
                ReconcileError::invalid_value(
                    name,
                    value,
                    format!("unknown field for {} resources", self.type_),
                )
            })?;
            field.validate_value(value)?;
        }
        for field in self.fields.values().filter(|f| f.required) {
            match properties.get(&field.name) {
                None | Some(Value::Null) => {
                    return Err(ReconcileError::invalid_value(
                        &field.name,
                        Value::Null,
                        "required field is not set",
                    ))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
