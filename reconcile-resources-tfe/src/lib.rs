//! Team access resource adapter.
//!
//! A team access binds a team to a workspace with an access level. Preset
//! levels (`admin`, `read`, `plan`, `write`) imply a fixed set of permissions;
//! `custom` lets each permission be chosen. The adapter maps
//! [`reconcile_resource::ResourceRecord`]s onto a [`api::TeamAccessApi`]
//! client supplied by the host.

pub mod access;
pub mod api;
pub mod import;
pub mod policy;
pub mod provider;
pub mod schema;
pub mod upgrade;

#[cfg(test)]
mod fake;

pub use provider::TeamAccessResource;
