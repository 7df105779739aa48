//! Serde data file structs for conversion configs and source-event fixtures.
//!
//! These structs define the on-disk format. They are deserialized from RON,
//! JSON, or TOML files and then resolved into core types by the loader.
//! Record references are written as `(collection_name, index)` pairs.

use hepconv_core::source::{
    CalorimeterHitRecord, ClusterRecord, ParticleIdRecord, ReconstructedParticleRecord,
    SourceRecord, TrackRecord, TrackerHitRecord, VertexRecord,
};
use serde::Deserialize;

// ===========================================================================
// Conversion config
// ===========================================================================

/// The request list of a conversion run, as flat
/// `kind, source, target` triples.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConversionConfig {
    pub requests: Vec<String>,
}

// ===========================================================================
// Source event
// ===========================================================================

/// A reference to a source record by collection name and index.
pub type RefData = (String, u32);

/// A whole source event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub collections: Vec<CollectionEntry>,
}

/// One named collection with its records.
///
/// Indices listed in `unavailable` become unavailable slots; the records
/// written at those positions are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionData<R> {
    pub name: String,
    #[serde(default)]
    pub records: Vec<R>,
    #[serde(default)]
    pub unavailable: Vec<u32>,
}

impl<R> CollectionData<R> {
    /// Number of slots, and so the upper bound for references into it.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A collection tagged by record kind.
#[derive(Debug, Clone, Deserialize)]
pub enum CollectionEntry {
    Track(CollectionData<TrackData>),
    TrackerHit(CollectionData<TrackerHitData>),
    CalorimeterHit(CollectionData<CalorimeterHitData>),
    Cluster(CollectionData<ClusterData>),
    Vertex(CollectionData<VertexData>),
    #[serde(rename = "ParticleID")]
    ParticleId(CollectionData<ParticleIdData>),
    ReconstructedParticle(CollectionData<ReconstructedParticleData>),
}

impl CollectionEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::Track(c) => &c.name,
            Self::TrackerHit(c) => &c.name,
            Self::CalorimeterHit(c) => &c.name,
            Self::Cluster(c) => &c.name,
            Self::Vertex(c) => &c.name,
            Self::ParticleId(c) => &c.name,
            Self::ReconstructedParticle(c) => &c.name,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Track(c) => c.len(),
            Self::TrackerHit(c) => c.len(),
            Self::CalorimeterHit(c) => c.len(),
            Self::Cluster(c) => c.len(),
            Self::Vertex(c) => c.len(),
            Self::ParticleId(c) => c.len(),
            Self::ReconstructedParticle(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kind name of the records this collection holds, as used by the
    /// source store.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Track(_) => TrackRecord::KIND_NAME,
            Self::TrackerHit(_) => TrackerHitRecord::KIND_NAME,
            Self::CalorimeterHit(_) => CalorimeterHitRecord::KIND_NAME,
            Self::Cluster(_) => ClusterRecord::KIND_NAME,
            Self::Vertex(_) => VertexRecord::KIND_NAME,
            Self::ParticleId(_) => ParticleIdRecord::KIND_NAME,
            Self::ReconstructedParticle(_) => ReconstructedParticleRecord::KIND_NAME,
        }
    }
}

// ===========================================================================
// Records
// ===========================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrackerHitData {
    pub cell_id: u64,
    #[serde(rename = "type")]
    pub hit_type: i32,
    pub quality: i32,
    pub time: f32,
    pub edep: f32,
    pub edep_error: f32,
    pub position: [f64; 3],
    pub cov_matrix: [f32; 6],
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrackStateData {
    pub location: i32,
    pub d0: f32,
    pub phi: f32,
    pub omega: f32,
    pub z0: f32,
    pub tan_lambda: f32,
    pub reference_point: [f32; 3],
    pub cov_matrix: [f32; 15],
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrackData {
    #[serde(rename = "type")]
    pub track_type: i32,
    pub chi2: f32,
    pub ndf: i32,
    pub dedx: f32,
    pub dedx_error: f32,
    pub radius_of_innermost_hit: f32,
    pub subdetector_hit_numbers: Vec<i32>,
    pub tracker_hits: Vec<RefData>,
    pub track_states: Vec<TrackStateData>,
    pub tracks: Vec<RefData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CalorimeterHitData {
    pub cell_id: u64,
    pub energy: f32,
    pub energy_error: f32,
    pub time: f32,
    pub position: [f32; 3],
    #[serde(rename = "type")]
    pub hit_type: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClusterData {
    #[serde(rename = "type")]
    pub cluster_type: i32,
    pub energy: f32,
    pub energy_error: f32,
    pub position: [f32; 3],
    pub position_error: [f32; 6],
    pub i_theta: f32,
    pub phi: f32,
    pub direction_error: [f32; 3],
    pub shape_parameters: Vec<f32>,
    pub clusters: Vec<RefData>,
    pub hits: Vec<RefData>,
    pub hit_contributions: Vec<f32>,
    pub particle_ids: Vec<RefData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VertexData {
    pub primary: i32,
    pub algorithm_type: i32,
    pub chi2: f32,
    pub probability: f32,
    pub position: [f32; 3],
    pub cov_matrix: [f32; 6],
    pub parameters: Vec<f32>,
    pub associated_particle: Option<RefData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParticleIdData {
    #[serde(rename = "type")]
    pub pid_type: i32,
    pub pdg: i32,
    pub algorithm_type: i32,
    pub likelihood: f32,
    pub parameters: Vec<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReconstructedParticleData {
    #[serde(rename = "type")]
    pub particle_type: i32,
    pub energy: f32,
    pub momentum: [f32; 3],
    pub reference_point: [f32; 3],
    pub charge: f32,
    pub mass: f32,
    pub goodness_of_pid: f32,
    pub cov_matrix: [f32; 10],
    pub start_vertex: Option<RefData>,
    pub particle_id_used: Option<RefData>,
    pub clusters: Vec<RefData>,
    pub tracks: Vec<RefData>,
    pub particles: Vec<RefData>,
    pub particle_ids: Vec<RefData>,
}

// ===========================================================================
// Tests
// ===========================================================================
