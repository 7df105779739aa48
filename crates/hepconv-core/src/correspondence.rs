//! Identity correspondence between source records and the target records
//! created from them.
//!
//! One append-only table per kind. Entries are registered exactly once, at
//! conversion time, in source iteration order, and never change afterwards;
//! only the relationships on the target records they point at are filled in
//! later. Lookup is a linear scan that stops at the first match.

use crate::id::*;

/// Append-only list of `(target key, source id)` pairs for one kind.
#[derive(Debug, Clone)]
pub struct CorrespondenceTable<K> {
    entries: Vec<(K, ObjectId)>,
}

impl<K> Default for CorrespondenceTable<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: Copy> CorrespondenceTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `target` was created from `source`.
    pub fn register(&mut self, target: K, source: ObjectId) {
        self.entries.push((target, source));
    }

    /// Find the target created for `source`, if any.
    pub fn find(&self, source: ObjectId) -> Option<K> {
        self.entries
            .iter()
            .find(|(_, s)| *s == source)
            .map(|(k, _)| *k)
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (K, ObjectId)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The per-run conversion context: one table per requestable kind.
///
/// Created when a run starts, threaded by `&mut` through every converter,
/// read by the deferred relinker, and dropped when the run ends.
#[derive(Debug, Clone, Default)]
pub struct Correspondences {
    pub tracks: CorrespondenceTable<TrackKey>,
    pub calorimeter_hits: CorrespondenceTable<CalorimeterHitKey>,
    pub clusters: CorrespondenceTable<ClusterKey>,
    pub vertices: CorrespondenceTable<VertexKey>,
    pub particle_ids: CorrespondenceTable<ParticleIdKey>,
    pub reconstructed_particles: CorrespondenceTable<ReconstructedParticleKey>,
}

impl Correspondences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of registered entries across all kinds.
    pub fn total(&self) -> usize {
        self.tracks.len()
            + self.calorimeter_hits.len()
            + self.clusters.len()
            + self.vertices.len()
            + self.particle_ids.len()
            + self.reconstructed_particles.len()
    }
}
