use reconcile_resource::diff::{DiffPolicy, FieldChange};

use crate::schema::ACCESS;

const CUSTOM: &str = "custom";

/// Moving into or out of custom access changes which permission fields mean
/// anything, so the binding is recreated instead of updated.
pub fn crosses_custom_boundary(old: Option<&str>, new: Option<&str>) -> bool {
    old != new && (old == Some(CUSTOM) || new == Some(CUSTOM))
}

pub struct CustomAccessBoundary;

impl DiffPolicy for CustomAccessBoundary {
    fn requires_replacement(&self, change: &FieldChange) -> bool {
        change.field == ACCESS && crosses_custom_boundary(change.old_str(), change.new_str())
    }
}
