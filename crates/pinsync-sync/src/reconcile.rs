use pinsync_types::{ContentId, ContentSet};

/// Set reconciliation between a source and a destination snapshot.
pub struct Reconciler;

impl Reconciler {
    /// Identifiers the source retains that the destination lacks.
    ///
    /// One membership test per source element; result order is unspecified.
    pub fn compute_missing(source: &ContentSet, destination: &ContentSet) -> Vec<ContentId> {
        source
            .iter()
            .filter(|id| !destination.contains(id))
            .cloned()
            .collect()
    }

    /// Identifiers retained by both sides.
    pub fn compute_present(source: &ContentSet, destination: &ContentSet) -> Vec<ContentId> {
        source
            .iter()
            .filter(|id| destination.contains(id))
            .cloned()
            .collect()
    }
}
