//! Hop-bounded ancestor walk over a parent map.

use std::collections::{HashMap, HashSet};

use crate::id::LocationNodeId;

/// Upper bound on `parent_id` hops followed from one node.
pub const MAX_ANCESTRY_HOPS: usize = 64;

/// Collect `start` and every ancestor reachable through `parents`.
///
/// Stops on a missing link, a revisited node or after
/// [`MAX_ANCESTRY_HOPS`], so a corrupted graph still terminates.
#[must_use]
pub fn ancestry(
    start: LocationNodeId,
    parents: &HashMap<LocationNodeId, Option<LocationNodeId>>,
) -> HashSet<LocationNodeId> {
    let mut seen = HashSet::new();
    let mut current = Some(start);
    while let Some(id) = current {
        if seen.len() >= MAX_ANCESTRY_HOPS || !seen.insert(id) {
            break;
        }
        current = parents.get(&id).copied().flatten();
    }
    seen
}
