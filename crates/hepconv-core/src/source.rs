//! The source event model: read-only, name-addressed collections of typed
//! records.
//!
//! Every record is addressed by an [`ObjectId`] (collection + index). A slot
//! holding `None` is an *unavailable* record: it keeps its index so that
//! references to it stay well-formed, but it is never converted and never
//! resolves as a relationship target.

use crate::id::{CollectionId, ObjectId};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised while reading from or building a source event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("source collection not found: {0}")]
    MissingCollection(String),
    #[error("source collection '{name}' holds {found} records, expected {expected}")]
    KindMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("duplicate source collection name: {0}")]
    DuplicateCollection(String),
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A measured hit on a tracking detector. Only ever converted as part of a
/// track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerHitRecord {
    pub cell_id: u64,
    pub hit_type: i32,
    pub quality: i32,
    pub time: f32,
    pub edep: f32,
    pub edep_error: f32,
    pub position: [f64; 3],
    pub cov_matrix: [f32; 6],
}

/// A snapshot of the track parameters at one location along the track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackStateRecord {
    pub location: i32,
    pub d0: f32,
    pub phi: f32,
    pub omega: f32,
    pub z0: f32,
    pub tan_lambda: f32,
    pub reference_point: [f32; 3],
    pub cov_matrix: [f32; 15],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackRecord {
    pub track_type: i32,
    pub chi2: f32,
    pub ndf: i32,
    pub dedx: f32,
    pub dedx_error: f32,
    pub radius_of_innermost_hit: f32,
    pub subdetector_hit_numbers: Vec<i32>,
    /// References into a `TrackerHit` collection.
    pub tracker_hits: Vec<ObjectId>,
    pub track_states: Vec<TrackStateRecord>,
    /// Other tracks this track is linked to.
    pub tracks: Vec<ObjectId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalorimeterHitRecord {
    pub cell_id: u64,
    pub energy: f32,
    pub energy_error: f32,
    pub time: f32,
    pub position: [f32; 3],
    pub hit_type: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterRecord {
    pub cluster_type: i32,
    pub energy: f32,
    pub energy_error: f32,
    pub position: [f32; 3],
    pub position_error: [f32; 6],
    pub i_theta: f32,
    pub phi: f32,
    pub direction_error: [f32; 3],
    pub shape_parameters: Vec<f32>,
    pub clusters: Vec<ObjectId>,
    /// Calorimeter hits, parallel to `hit_contributions`.
    pub hits: Vec<ObjectId>,
    pub hit_contributions: Vec<f32>,
    pub particle_ids: Vec<ObjectId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexRecord {
    pub primary: i32,
    pub algorithm_type: i32,
    pub chi2: f32,
    pub probability: f32,
    pub position: [f32; 3],
    pub cov_matrix: [f32; 6],
    pub parameters: Vec<f32>,
    pub associated_particle: Option<ObjectId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleIdRecord {
    pub pid_type: i32,
    pub pdg: i32,
    pub algorithm_type: i32,
    pub likelihood: f32,
    pub parameters: Vec<f32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconstructedParticleRecord {
    pub particle_type: i32,
    pub energy: f32,
    pub momentum: [f32; 3],
    pub reference_point: [f32; 3],
    pub charge: f32,
    pub mass: f32,
    pub goodness_of_pid: f32,
    pub cov_matrix: [f32; 10],
    pub start_vertex: Option<ObjectId>,
    pub particle_id_used: Option<ObjectId>,
    pub clusters: Vec<ObjectId>,
    pub tracks: Vec<ObjectId>,
    pub particles: Vec<ObjectId>,
    pub particle_ids: Vec<ObjectId>,
}

// ---------------------------------------------------------------------------
// Typed collection storage
// ---------------------------------------------------------------------------

/// The records of one source collection, tagged by kind.
#[derive(Debug, Clone)]
pub enum SourceRecords {
    Track(Vec<Option<TrackRecord>>),
    TrackerHit(Vec<Option<TrackerHitRecord>>),
    CalorimeterHit(Vec<Option<CalorimeterHitRecord>>),
    Cluster(Vec<Option<ClusterRecord>>),
    Vertex(Vec<Option<VertexRecord>>),
    ParticleId(Vec<Option<ParticleIdRecord>>),
    ReconstructedParticle(Vec<Option<ReconstructedParticleRecord>>),
}

/// A record type that can be stored in a [`SourceEvent`].
pub trait SourceRecord: Sized {
    /// Human-readable kind name used in diagnostics.
    const KIND_NAME: &'static str;

    fn slice(records: &SourceRecords) -> Option<&[Option<Self>]>;

    fn wrap(records: Vec<Option<Self>>) -> SourceRecords;
}

macro_rules! impl_source_record {
    ($record:ty, $variant:ident, $name:literal) => {
        impl SourceRecord for $record {
            const KIND_NAME: &'static str = $name;

            fn slice(records: &SourceRecords) -> Option<&[Option<Self>]> {
                match records {
                    SourceRecords::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn wrap(records: Vec<Option<Self>>) -> SourceRecords {
                SourceRecords::$variant(records)
            }
        }
    };
}

impl_source_record!(TrackRecord, Track, "Track");
impl_source_record!(TrackerHitRecord, TrackerHit, "TrackerHit");
impl_source_record!(CalorimeterHitRecord, CalorimeterHit, "CalorimeterHit");
impl_source_record!(ClusterRecord, Cluster, "Cluster");
impl_source_record!(VertexRecord, Vertex, "Vertex");
impl_source_record!(ParticleIdRecord, ParticleId, "ParticleID");
impl_source_record!(
    ReconstructedParticleRecord,
    ReconstructedParticle,
    "ReconstructedParticle"
);

impl SourceRecords {
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

    pub fn len(&self) -> usize {
        match self {
            Self::Track(v) => v.len(),
            Self::TrackerHit(v) => v.len(),
            Self::CalorimeterHit(v) => v.len(),
            Self::Cluster(v) => v.len(),
            Self::Vertex(v) => v.len(),
            Self::ParticleId(v) => v.len(),
            Self::ReconstructedParticle(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the slot at `index` exists and holds a record.
    fn is_available(&self, index: usize) -> bool {
        fn slot<T>(v: &[Option<T>], index: usize) -> bool {
            matches!(v.get(index), Some(Some(_)))
        }
        match self {
            Self::Track(v) => slot(v, index),
            Self::TrackerHit(v) => slot(v, index),
            Self::CalorimeterHit(v) => slot(v, index),
            Self::Cluster(v) => slot(v, index),
            Self::Vertex(v) => slot(v, index),
            Self::ParticleId(v) => slot(v, index),
            Self::ReconstructedParticle(v) => slot(v, index),
        }
    }
}

/// A named source collection.
#[derive(Debug, Clone)]
pub struct SourceCollection {
    pub name: String,
    pub records: SourceRecords,
}

// ---------------------------------------------------------------------------
// SourceEvent
// ---------------------------------------------------------------------------

/// Read-only store of source collections for one event.
#[derive(Debug, Clone, Default)]
pub struct SourceEvent {
    collections: Vec<SourceCollection>,
    name_to_id: HashMap<String, CollectionId>,
}

impl SourceEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collection under `name`. Returns its ID; records inside it are
    /// addressed as `ObjectId { collection: id, index }`.
    pub fn add_collection<R: SourceRecord>(
        &mut self,
        name: &str,
        records: Vec<Option<R>>,
    ) -> Result<CollectionId, SourceError> {
        self.add_records(name, R::wrap(records))
    }

    /// Untyped form of [`add_collection`](Self::add_collection).
    pub fn add_records(
        &mut self,
        name: &str,
        records: SourceRecords,
    ) -> Result<CollectionId, SourceError> {
        if self.name_to_id.contains_key(name) {
            return Err(SourceError::DuplicateCollection(name.to_string()));
        }
        let id = CollectionId(self.collections.len() as u32);
        self.collections.push(SourceCollection {
            name: name.to_string(),
            records,
        });
        self.name_to_id.insert(name.to_string(), id);
        Ok(id)
    }

    /// Typed view of a collection by name.
    pub fn collection<R: SourceRecord>(
        &self,
        name: &str,
    ) -> Result<(CollectionId, &[Option<R>]), SourceError> {
        let id = self
            .collection_id(name)
            .ok_or_else(|| SourceError::MissingCollection(name.to_string()))?;
        let records = &self.collections[id.0 as usize].records;
        let slice = R::slice(records).ok_or_else(|| SourceError::KindMismatch {
            name: name.to_string(),
            expected: R::KIND_NAME,
            found: records.kind_name(),
        })?;
        Ok((id, slice))
    }

    /// Fetch an available record of kind `R`. Returns `None` for unknown
    /// collections, out-of-range indices, unavailable slots, and records of
    /// another kind.
    pub fn get<R: SourceRecord>(&self, id: ObjectId) -> Option<&R> {
        let collection = self.collections.get(id.collection.0 as usize)?;
        R::slice(&collection.records)?
            .get(id.index as usize)?
            .as_ref()
    }

    /// Whether `id` points at an available record of any kind.
    pub fn is_available(&self, id: ObjectId) -> bool {
        self.collections
            .get(id.collection.0 as usize)
            .is_some_and(|c| c.records.is_available(id.index as usize))
    }

    pub fn collection_id(&self, name: &str) -> Option<CollectionId> {
        self.name_to_id.get(name).copied()
    }

    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }
}
