//! Optional `rayon`-backed parallel narrow phase, for callers driving large
//! scenes where per-pair contact generation dominates the frame budget.
//!
//! `World::simulate` itself stays sequential end to end, so equation order
//! (and therefore solver outcome) never depends on thread scheduling.
//! This module only parallelises the embarrassingly-parallel, read-only
//! step — generating each candidate pair's manifold — and hands the caller
//! back a plain `Vec<ContactGroup>` in the same order a sequential pass
//! would produce, so it can be dropped into `World::simulate`'s place with
//! no observable difference in outcome.

use rayon::prelude::*;

use crate::body::{Body, BodyId};
use crate::collision::{broad_phase, narrow_phase, ContactGroup};

/// Runs broad phase then narrow phase over `bodies`, generating every
/// candidate pair's manifold concurrently. Requires `T: Sync` since body
/// data may be read from multiple worker threads.
pub fn generate_contacts_parallel<T: Sync>(bodies: &[Body<T>]) -> Vec<ContactGroup> {
    let pairs = broad_phase::candidate_pairs(bodies);

    pairs
        .par_iter()
        .filter_map(|&(a, b)| {
            let body1 = find(bodies, a)?;
            let body2 = find(bodies, b)?;
            narrow_phase::generate_contacts(body1, body2)
        })
        .collect()
}

fn find<T>(bodies: &[Body<T>], id: BodyId) -> Option<&Body<T>> {
    bodies.iter().find(|b| b.id() == id)
}
