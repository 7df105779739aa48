use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a converted track in the target event.
    pub struct TrackKey;

    /// Identifies a converted calorimeter hit in the target event.
    pub struct CalorimeterHitKey;

    /// Identifies a converted cluster in the target event.
    pub struct ClusterKey;

    /// Identifies a converted vertex in the target event.
    pub struct VertexKey;

    /// Identifies a converted particle ID in the target event. Owned copies
    /// created for reconstructed particles share this key space.
    pub struct ParticleIdKey;

    /// Identifies a converted reconstructed particle in the target event.
    pub struct ReconstructedParticleKey;
}

/// Identifies a collection in the source event. Assigned in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollectionId(pub u32);

/// Identifies a single source record: the collection it lives in and its
/// position inside that collection. Equality of two `ObjectId`s is the
/// identity relation used by every correspondence lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId {
    pub collection: CollectionId,
    pub index: u32,
}

impl ObjectId {
    pub fn new(collection: CollectionId, index: u32) -> Self {
        Self { collection, index }
    }
}
