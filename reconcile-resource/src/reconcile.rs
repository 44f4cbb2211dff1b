//! One reconciliation step for a single resource.
//!
//! This is the sequence an orchestrator runs per desired-state node: upgrade
//! the persisted record, refresh it, plan, and dispatch to the adapter.
//! Persisting the result is left to the caller, which receives the new record
//! together with a [`StateEvent`] describing the change.

use serde::Serialize;
use tracing::{info, instrument};

use crate::diff::{plan, Action};
use crate::error::Result;
use crate::framework::{CallContext, ReadOutcome, ResourceAdapter};
use crate::record::{Properties, ResourceRecord, StateEvent};
use crate::upgrade::UpgraderChain;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub action: Action,
    /// The record to persist; `None` when the resource no longer exists
    pub record: Option<ResourceRecord>,
    /// Change from the persisted prior record to `record`
    pub event: StateEvent,
}

/// Upgrade `record` and refresh it from the remote.
pub async fn refresh<A: ResourceAdapter + ?Sized>(
    adapter: &A,
    ctx: &CallContext,
    record: ResourceRecord,
) -> Result<Option<ResourceRecord>> {
    let chain = UpgraderChain::new(adapter.schema(), adapter.state_upgraders());
    let record = chain.upgrade(ctx, record).await?;
    match adapter.read(ctx, &record).await? {
        ReadOutcome::Present(r) => Ok(Some(r)),
        ReadOutcome::Absent => {
            info!(id = record.id.as_deref().unwrap_or(""), "resource is gone");
            Ok(None)
        }
    }
}

/// Make the remote match `desired`, starting from the persisted `prior`
/// record. `desired == None` means the resource should not exist.
#[instrument(skip_all, fields(resource_type = %adapter.schema().type_, label = ctx.label.as_deref().unwrap_or("")))]
pub async fn reconcile<A: ResourceAdapter + ?Sized>(
    adapter: &A,
    ctx: &CallContext,
    prior: Option<ResourceRecord>,
    desired: Option<Properties>,
) -> Result<Outcome> {
    let refreshed = match prior.clone() {
        Some(record) if record.id.is_some() => refresh(adapter, ctx, record).await?,
        _ => None,
    };

    let plan = plan(
        adapter.schema(),
        adapter.diff_policy(),
        refreshed.as_ref(),
        desired.as_ref(),
    )?;
    info!(
        action = %plan.action,
        changes = plan.changes.len(),
        "planned"
    );

    let schema_version = adapter.schema().version;
    let desired = desired.map(|p| ResourceRecord::new(schema_version, p));

    let record = match (plan.action, refreshed.as_ref(), desired.as_ref()) {
        (Action::Create, _, Some(desired)) => Some(adapter.create(ctx, desired).await?),
        (Action::Update, Some(prior), Some(desired)) => {
            Some(adapter.update(ctx, prior, desired).await?)
        }
        (Action::Replace, Some(prior), Some(desired)) => {
            info!(fields = ?plan.replace_reasons, "replacing");
            adapter.delete(ctx, prior).await?;
            Some(adapter.create(ctx, desired).await?)
        }
        (Action::Delete, Some(prior), _) => {
            adapter.delete(ctx, prior).await?;
            None
        }
        _ => refreshed.clone(),
    };

    let event = StateEvent::between(prior.as_ref(), record.as_ref(), plan.action);
    Ok(Outcome {
        action: plan.action,
        record,
        event,
    })
}

/// Adopt a pre-existing remote object. Returns `None` when the imported id
/// does not exist remotely.
#[instrument(skip_all, fields(resource_type = %adapter.schema().type_, import_id = %import_id))]
pub async fn import<A: ResourceAdapter + ?Sized>(
    adapter: &A,
    ctx: &CallContext,
    import_id: &str,
) -> Result<Option<ResourceRecord>> {
    let skeleton = adapter.import(ctx, import_id).await?;
    Ok(adapter.read(ctx, &skeleton).await?.into_record())
}
