//! The target event model: arena-owned records cross-linked by typed keys,
//! grouped into named collections.
//!
//! Records live in one `SlotMap` per kind (SoA, keyed like the rest of the
//! crate). A collection is an ordered list of keys into its kind's arena.
//! Relationships between records are keys, so a record can be linked to
//! another one after both have been handed over to the event.

use crate::id::*;
use crate::kind::EntityKind;
use slotmap::SlotMap;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("target collection already exists: {0}")]
    DuplicateCollection(String),
}

// ---------------------------------------------------------------------------
// Bit-field helpers
// ---------------------------------------------------------------------------

fn set_bit(bits: &mut u32, index: u32, value: bool) {
    debug_assert!(index < 32, "bit index out of range: {index}");
    if value {
        *bits |= 1u32 << index;
    } else {
        *bits &= !(1u32 << index);
    }
}

fn get_bit(bits: u32, index: u32) -> bool {
    index < 32 && bits & (1u32 << index) != 0
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A tracker hit owned by the track it was copied into.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerHit {
    pub cell_id0: i32,
    pub cell_id1: i32,
    pub hit_type: i32,
    pub position: [f64; 3],
    pub cov_matrix: [f32; 6],
    pub edep: f32,
    pub edep_error: f32,
    pub time: f32,
    pub(crate) quality_bits: u32,
}

impl TrackerHit {
    pub fn set_quality_bit(&mut self, index: u32, value: bool) {
        set_bit(&mut self.quality_bits, index, value);
    }

    pub fn quality_bit(&self, index: u32) -> bool {
        get_bit(self.quality_bits, index)
    }

    pub fn quality(&self) -> i32 {
        self.quality_bits as i32
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackState {
    pub location: i32,
    pub d0: f32,
    pub phi: f32,
    pub omega: f32,
    pub z0: f32,
    pub tan_lambda: f32,
    pub cov_matrix: [f32; 15],
    pub reference_point: [f32; 3],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub(crate) type_bits: u32,
    pub chi2: f32,
    pub ndf: i32,
    pub dedx: f32,
    pub dedx_error: f32,
    pub radius_of_innermost_hit: f32,
    pub subdetector_hit_numbers: Vec<i32>,
    pub hits: Vec<TrackerHit>,
    pub track_states: Vec<TrackState>,
    pub tracks: Vec<TrackKey>,
}

impl Track {
    pub fn set_type_bit(&mut self, index: u32, value: bool) {
        set_bit(&mut self.type_bits, index, value);
    }

    pub fn type_bit(&self, index: u32) -> bool {
        get_bit(self.type_bits, index)
    }

    pub fn track_type(&self) -> i32 {
        self.type_bits as i32
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalorimeterHit {
    pub cell_id0: i32,
    pub cell_id1: i32,
    pub energy: f32,
    pub energy_error: f32,
    pub time: f32,
    pub position: [f32; 3],
    pub hit_type: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cluster {
    pub(crate) type_bits: u32,
    pub energy: f32,
    pub energy_error: f32,
    pub position: [f32; 3],
    pub position_error: [f32; 6],
    pub i_theta: f32,
    pub i_phi: f32,
    pub direction_error: [f32; 3],
    pub shape: Vec<f32>,
    pub particle_ids: Vec<ParticleIdKey>,
    pub(crate) hits: Vec<CalorimeterHitKey>,
    pub(crate) hit_contributions: Vec<f32>,
    pub clusters: Vec<ClusterKey>,
}

impl Cluster {
    pub fn set_type_bit(&mut self, index: u32, value: bool) {
        set_bit(&mut self.type_bits, index, value);
    }

    pub fn type_bit(&self, index: u32) -> bool {
        get_bit(self.type_bits, index)
    }

    pub fn cluster_type(&self) -> i32 {
        self.type_bits as i32
    }

    /// Attach a calorimeter hit together with its energy contribution.
    pub fn add_hit(&mut self, hit: CalorimeterHitKey, contribution: f32) {
        self.hits.push(hit);
        self.hit_contributions.push(contribution);
    }

    pub fn calorimeter_hits(&self) -> &[CalorimeterHitKey] {
        &self.hits
    }

    pub fn hit_contributions(&self) -> &[f32] {
        &self.hit_contributions
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vertex {
    pub primary: bool,
    pub algorithm_type: String,
    pub chi2: f32,
    pub probability: f32,
    pub position: [f32; 3],
    pub cov_matrix: [f32; 6],
    pub parameters: Vec<f32>,
    pub associated_particle: Option<ReconstructedParticleKey>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleId {
    pub pid_type: i32,
    pub pdg: i32,
    pub likelihood: f32,
    pub algorithm_type: i32,
    pub parameters: Vec<f32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconstructedParticle {
    pub particle_type: i32,
    pub momentum: [f32; 3],
    pub energy: f32,
    pub cov_matrix: [f32; 10],
    pub mass: f32,
    pub charge: f32,
    pub reference_point: [f32; 3],
    pub goodness_of_pid: f32,
    /// Owned copies; these keys are not part of any collection.
    pub particle_ids: Vec<ParticleIdKey>,
    pub particle_id_used: Option<ParticleIdKey>,
    pub start_vertex: Option<VertexKey>,
    pub tracks: Vec<TrackKey>,
    pub clusters: Vec<ClusterKey>,
    pub particles: Vec<ReconstructedParticleKey>,
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// An ordered, kind-tagged list of record keys.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetCollection {
    Tracks(Vec<TrackKey>),
    CalorimeterHits(Vec<CalorimeterHitKey>),
    Clusters(Vec<ClusterKey>),
    Vertices(Vec<VertexKey>),
    ParticleIds(Vec<ParticleIdKey>),
    ReconstructedParticles(Vec<ReconstructedParticleKey>),
}

impl TargetCollection {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Tracks(_) => EntityKind::Track,
            Self::CalorimeterHits(_) => EntityKind::CalorimeterHit,
            Self::Clusters(_) => EntityKind::Cluster,
            Self::Vertices(_) => EntityKind::Vertex,
            Self::ParticleIds(_) => EntityKind::ParticleId,
            Self::ReconstructedParticles(_) => EntityKind::ReconstructedParticle,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Tracks(v) => v.len(),
            Self::CalorimeterHits(v) => v.len(),
            Self::Clusters(v) => v.len(),
            Self::Vertices(v) => v.len(),
            Self::ParticleIds(v) => v.len(),
            Self::ReconstructedParticles(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_tracks(&self) -> Option<&[TrackKey]> {
        match self {
            Self::Tracks(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_calorimeter_hits(&self) -> Option<&[CalorimeterHitKey]> {
        match self {
            Self::CalorimeterHits(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_clusters(&self) -> Option<&[ClusterKey]> {
        match self {
            Self::Clusters(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vertices(&self) -> Option<&[VertexKey]> {
        match self {
            Self::Vertices(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_particle_ids(&self) -> Option<&[ParticleIdKey]> {
        match self {
            Self::ParticleIds(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_reconstructed_particles(&self) -> Option<&[ReconstructedParticleKey]> {
        match self {
            Self::ReconstructedParticles(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// TargetEvent
// ---------------------------------------------------------------------------

/// The target event container. Owns every converted record and the named
/// collections that expose them.
#[derive(Debug, Default)]
pub struct TargetEvent {
    pub(crate) tracks: SlotMap<TrackKey, Track>,
    pub(crate) calorimeter_hits: SlotMap<CalorimeterHitKey, CalorimeterHit>,
    pub(crate) clusters: SlotMap<ClusterKey, Cluster>,
    pub(crate) vertices: SlotMap<VertexKey, Vertex>,
    pub(crate) particle_ids: SlotMap<ParticleIdKey, ParticleId>,
    pub(crate) reconstructed_particles: SlotMap<ReconstructedParticleKey, ReconstructedParticle>,

    /// Named collections in insertion order.
    collections: Vec<(String, TargetCollection)>,
}

impl TargetEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a collection with this name has already been added.
    pub fn has_collection(&self, name: &str) -> bool {
        self.collections.iter().any(|(n, _)| n == name)
    }

    pub fn collection(&self, name: &str) -> Option<&TargetCollection> {
        self.collections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    /// Collection names in the order they were added.
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.iter().map(|(n, _)| n.as_str())
    }

    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }

    /// Hand a finished collection over to the event under `name`.
    pub fn add_collection(
        &mut self,
        name: &str,
        collection: TargetCollection,
    ) -> Result<(), TargetError> {
        if self.has_collection(name) {
            return Err(TargetError::DuplicateCollection(name.to_string()));
        }
        self.collections.push((name.to_string(), collection));
        Ok(())
    }

    pub fn track(&self, key: TrackKey) -> Option<&Track> {
        self.tracks.get(key)
    }

    pub fn calorimeter_hit(&self, key: CalorimeterHitKey) -> Option<&CalorimeterHit> {
        self.calorimeter_hits.get(key)
    }

    pub fn cluster(&self, key: ClusterKey) -> Option<&Cluster> {
        self.clusters.get(key)
    }

    pub fn vertex(&self, key: VertexKey) -> Option<&Vertex> {
        self.vertices.get(key)
    }

    pub fn particle_id(&self, key: ParticleIdKey) -> Option<&ParticleId> {
        self.particle_ids.get(key)
    }

    pub fn reconstructed_particle(
        &self,
        key: ReconstructedParticleKey,
    ) -> Option<&ReconstructedParticle> {
        self.reconstructed_particles.get(key)
    }

    /// Total number of records owned by the event, including records that
    /// are only reachable through another record (owned particle IDs).
    pub fn record_count(&self) -> usize {
        self.tracks.len()
            + self.calorimeter_hits.len()
            + self.clusters.len()
            + self.vertices.len()
            + self.particle_ids.len()
            + self.reconstructed_particles.len()
    }
}
