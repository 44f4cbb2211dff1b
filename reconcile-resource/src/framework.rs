use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::diff::{DiffPolicy, SchemaOnly};
use crate::error::Result;
use crate::record::ResourceRecord;
use crate::schema::ResourceSchema;
use crate::upgrade::StateUpgrader;

/// Per-call context, passed explicitly into every adapter and client
/// operation.
///
/// The adapter does not enforce the deadline itself; it hands it to the
/// remote client, whose transport decides how to honor it.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub deadline: Option<Instant>,
    /// Free-form label for correlating log output, e.g. the resource's
    /// address in the desired-state model
    pub label: Option<String>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        CallContext {
            deadline: Instant::now().checked_add(timeout),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Time left until the deadline, if there is one
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.remaining() == Some(Duration::ZERO)
    }
}

/// Result of refreshing a record from the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Present(ResourceRecord),
    /// The remote has no such object; the caller should forget the record.
    Absent,
}

impl ReadOutcome {
    pub fn into_record(self) -> Option<ResourceRecord> {
        match self {
            ReadOutcome::Present(r) => Some(r),
            ReadOutcome::Absent => None,
        }
    }
}

/// Maps resource records onto a remote API.
///
/// Operations never modify their arguments; they return the record the
/// orchestrator should persist.
#[async_trait]
pub trait ResourceAdapter: Send + Sync {
    /// The current schema
    fn schema(&self) -> &ResourceSchema;

    /// Replacement rules beyond the schema's `force_new` flags
    fn diff_policy(&self) -> &dyn DiffPolicy {
        &SchemaOnly
    }

    /// Upgraders for records persisted under older schema versions, one per
    /// version
    fn state_upgraders(&self) -> &[Box<dyn StateUpgrader>] {
        &[]
    }

    /// Create the remote object. The result carries the remote-assigned id
    /// and every field value the remote reported.
    async fn create(&self, ctx: &CallContext, desired: &ResourceRecord) -> Result<ResourceRecord>;

    /// Refresh a record from the remote. Remote not-found is
    /// [`ReadOutcome::Absent`], not an error.
    async fn read(&self, ctx: &CallContext, record: &ResourceRecord) -> Result<ReadOutcome>;

    /// Apply the in-place changes from `prior` (as last read) to `desired`.
    /// Changes that require replacement are rejected.
    async fn update(
        &self,
        ctx: &CallContext,
        prior: &ResourceRecord,
        desired: &ResourceRecord,
    ) -> Result<ResourceRecord>;

    /// Remove the remote object. Remote not-found counts as success.
    async fn delete(&self, ctx: &CallContext, record: &ResourceRecord) -> Result<()>;

    /// Build a skeleton record for a pre-existing remote object from an
    /// import identifier. A subsequent read fills in the rest.
    async fn import(&self, ctx: &CallContext, import_id: &str) -> Result<ResourceRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_without_deadline_never_expires() {
        let ctx = CallContext::new().with_label("team_access.dev");
        assert_eq!(ctx.remaining(), None);
        assert!(!ctx.is_expired());
        assert_eq!(ctx.label.as_deref(), Some("team_access.dev"));
    }

    #[test]
    fn context_deadline() {
        let ctx = CallContext::with_timeout(Duration::from_secs(3600));
        let remaining = ctx.remaining().unwrap();
        assert!(remaining > Duration::from_secs(3500));
        assert!(!ctx.is_expired());

        let ctx = CallContext::with_timeout(Duration::ZERO);
        assert!(ctx.is_expired());
    }
}
