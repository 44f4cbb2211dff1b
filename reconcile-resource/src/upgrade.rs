//! Migration of persisted records to the current schema version.
//!
//! Upgraders form a linear chain: a record stored at version `v` goes through
//! the upgrader for `v`, then `v + 1`, and so on, never skipping a step.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ReconcileError, Result};
use crate::framework::CallContext;
use crate::record::{Properties, ResourceRecord};
use crate::schema::ResourceSchema;

/// Turns the properties of a record at `from_version()` into properties
/// valid at `from_version() + 1`.
///
/// An upgrader must accept every record that was ever persisted at its
/// version. When it can't make sense of its input it fails with
/// [`ReconcileError::SchemaUpgradeError`].
#[async_trait]
pub trait StateUpgrader: Send + Sync {
    fn from_version(&self) -> u64;

    async fn upgrade(&self, ctx: &CallContext, properties: Properties) -> Result<Properties>;
}

pub struct UpgraderChain<'a> {
    schema: &'a ResourceSchema,
    upgraders: &'a [Box<dyn StateUpgrader>],
}

impl<'a> UpgraderChain<'a> {
    pub fn new(schema: &'a ResourceSchema, upgraders: &'a [Box<dyn StateUpgrader>]) -> Self {
        UpgraderChain { schema, upgraders }
    }

    pub fn current_version(&self) -> u64 {
        self.schema.version
    }

    pub fn needs_upgrade(&self, record: &ResourceRecord) -> bool {
        record.schema_version != self.schema.version
    }

    /// Bring `record` to the current schema version. A record that is already
    /// current is returned unchanged.
    pub async fn upgrade(&self, ctx: &CallContext, record: ResourceRecord) -> Result<ResourceRecord> {
        let stored_version = record.schema_version;
        let current = self.schema.version;
        if stored_version == current {
            return Ok(record);
        }
        if stored_version > current {
            return Err(ReconcileError::upgrade(
                stored_version,
                format!(
                    "record is newer than the current {} schema (version {})",
                    self.schema.type_, current
                ),
            ));
        }

        let mut properties = record.properties;
        for version in stored_version..current {
            let upgrader = self
                .upgraders
                .iter()
                .find(|u| u.from_version() == version)
                .ok_or_else(|| {
                    ReconcileError::upgrade(version, "no upgrader registered for this version")
                })?;
            debug!(
                id = record.id.as_deref().unwrap_or(""),
                from = version,
                to = version + 1,
                "upgrading state"
            );
            properties = upgrader
                .upgrade(ctx, properties)
                .await
                .map_err(|e| match e {
                    e @ ReconcileError::SchemaUpgradeError { .. } => e,
                    e => ReconcileError::upgrade(version, e.to_string()),
                })?;
        }

        self.schema.validate(&properties).map_err(|e| {
            ReconcileError::upgrade(stored_version, format!("upgraded state is invalid: {}", e))
        })?;

        Ok(ResourceRecord {
            id: record.id,
            schema_version: current,
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSchema;
    use serde_json::{json, Value};

    /// v2: `size` is one of small/large, `label` is required
    fn schema() -> ResourceSchema {
        ResourceSchema::new(
            "example",
            2,
            vec![
                FieldSchema::string("size").required().one_of(["small", "large"]),
                FieldSchema::string("label").required(),
            ],
        )
    }

    /// v0 stored `size` as a number of gigabytes
    struct SizeFromNumber;

    #[async_trait]
    impl StateUpgrader for SizeFromNumber {
        fn from_version(&self) -> u64 {
            0
        }

        async fn upgrade(&self, _ctx: &CallContext, mut properties: Properties) -> Result<Properties> {
            let size = match properties.get("size") {
                Some(Value::Number(n)) => match n.as_u64() {
                    Some(gb) if gb < 100 => "small",
                    Some(_) => "large",
                    None => return Err(ReconcileError::upgrade(0, "size is not a whole number")),
                },
                other => {
                    return Err(ReconcileError::upgrade(
                        0,
                        format!("unexpected size: {:?}", other),
                    ))
                }
            };
            properties.insert("size".to_string(), json!(size));
            Ok(properties)
        }
    }

    /// v1 had no `label`
    struct DefaultLabel;

    #[async_trait]
    impl StateUpgrader for DefaultLabel {
        fn from_version(&self) -> u64 {
            1
        }

        async fn upgrade(&self, _ctx: &CallContext, mut properties: Properties) -> Result<Properties> {
            properties
                .entry("label")
                .or_insert_with(|| json!("unlabeled"));
            Ok(properties)
        }
    }

    fn upgraders() -> Vec<Box<dyn StateUpgrader>> {
        vec![Box::new(DefaultLabel), Box::new(SizeFromNumber)]
    }

    fn record(version: u64, value: Value) -> ResourceRecord {
        ResourceRecord {
            id: Some("ex-1".to_string()),
            schema_version: version,
            properties: value.as_object().cloned().unwrap(),
        }
    }

    #[tokio::test]
    async fn upgrades_through_every_version() {
        let schema = schema();
        let upgraders = upgraders();
        let chain = UpgraderChain::new(&schema, &upgraders);
        let ctx = CallContext::new();

        let upgraded = chain.upgrade(&ctx, record(0, json!({ "size": 250 }))).await.unwrap();
        assert_eq!(upgraded, record(2, json!({ "size": "large", "label": "unlabeled" })));
        schema.validate(&upgraded.properties).unwrap();

        let upgraded = chain
            .upgrade(&ctx, record(1, json!({ "size": "small", "label": "db" })))
            .await
            .unwrap();
        assert_eq!(upgraded, record(2, json!({ "size": "small", "label": "db" })));
    }

    #[tokio::test]
    async fn current_record_is_left_alone() {
        let schema = schema();
        let upgraders = upgraders();
        let chain = UpgraderChain::new(&schema, &upgraders);
        let ctx = CallContext::new();

        let once = chain.upgrade(&ctx, record(0, json!({ "size": 3 }))).await.unwrap();
        assert!(!chain.needs_upgrade(&once));
        let twice = chain.upgrade(&ctx, once.clone()).await.unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn uninterpretable_input_is_fatal() {
        let schema = schema();
        let upgraders = upgraders();
        let chain = UpgraderChain::new(&schema, &upgraders);
        let err = chain
            .upgrade(&CallContext::new(), record(0, json!({ "size": "medium" })))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, ReconcileError::SchemaUpgradeError { from_version: 0, .. }));
    }

    #[tokio::test]
    async fn unknown_versions_are_rejected() {
        let schema = schema();
        let upgraders: Vec<Box<dyn StateUpgrader>> = vec![Box::new(DefaultLabel)];
        let chain = UpgraderChain::new(&schema, &upgraders);
        let ctx = CallContext::new();

        let err = chain.upgrade(&ctx, record(0, json!({ "size": 3 }))).await.unwrap_err();
        assert!(matches!(err, ReconcileError::SchemaUpgradeError { from_version: 0, .. }));

        let err = chain
            .upgrade(&ctx, record(7, json!({ "size": "small", "label": "x" })))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::SchemaUpgradeError { from_version: 7, .. }));
    }

    #[tokio::test]
    async fn upgraded_state_must_validate() {
        let schema = schema();
        let upgraders = upgraders();
        let chain = UpgraderChain::new(&schema, &upgraders);
        let err = chain
            .upgrade(&CallContext::new(), record(1, json!({ "size": "huge" })))
            .await
            .unwrap_err();
        match err {
            ReconcileError::SchemaUpgradeError {
                from_version,
                reason,
            } => {
                assert_eq!(from_version, 1);
                assert!(reason.starts_with("upgraded state is invalid"), "{}", reason);
            }
            e => panic!("unexpected error: {:?}", e),
        }
    }
}
