//! Building blocks for declarative resource adapters.
//!
//! An adapter maps a desired-state record onto a remote stateful API. This
//! crate provides what every adapter needs besides the API calls themselves:
//!
//! - [`schema`]: field declarations and validation
//! - [`record`]: the persisted record and the JSON Patch events between records
//! - [`diff`]: change detection and the update-versus-replace decision
//! - [`upgrade`]: migration of records persisted under older schema versions
//! - [`framework`]: the [`ResourceAdapter`] interface and [`CallContext`]
//! - [`reconcile`]: a single reconciliation step driving an adapter

pub mod diff;
pub mod error;
pub mod framework;
pub mod reconcile;
pub mod record;
pub mod schema;
pub mod upgrade;

pub use error::{ReconcileError, Result};
pub use framework::{CallContext, ReadOutcome, ResourceAdapter};
pub use record::{Properties, ResourceRecord, StateEvent};
