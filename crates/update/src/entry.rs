//! Extracted change entries

use std::sync::Arc;

use crate::propagator::PropagatorResult;

/// State of a tracked entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntityState {
    /// Not tracked
    Detached,
    /// Tracked and unchanged
    #[default]
    Unchanged,
    /// New; no original values
    Added,
    /// Removed; no current values
    Deleted,
    /// Changed since it was attached
    Modified,
}

/// One tracked change with its original and current value trees
#[derive(Debug, Clone)]
pub struct ExtractedStateEntry {
    /// Entity state at extraction time
    pub state: EntityState,
    /// Values before the change (absent for `Added`)
    pub original: Option<Arc<PropagatorResult>>,
    /// Values after the change (absent for `Deleted`)
    pub current: Option<Arc<PropagatorResult>>,
}

impl ExtractedStateEntry {
    /// Entry with both value trees
    pub fn new(
        state: EntityState,
        original: Option<Arc<PropagatorResult>>,
        current: Option<Arc<PropagatorResult>>,
    ) -> Self {
        Self {
            state,
            original,
            current,
        }
    }
}
