//! Per-kind converters: the first pass of a conversion run.
//!
//! Each converter reads one source collection, creates one target record per
//! available source record (in source order), registers every pair in its
//! kind's correspondence table, and hands the finished collection to the
//! target event.
//!
//! Cross-kind relationships are resolved immediately against whatever the
//! referent kind's table holds at that point. A referent that has not been
//! converted yet leaves the relationship absent; the deferred relinker picks
//! it up after every request has run. List-valued cross-kind relationships
//! are filled all-or-nothing so the relinker never sees a partial list.
//!
//! Same-kind relationships (track-track, cluster-cluster,
//! particle-particle) are resolved in a second loop inside the converter,
//! after the whole collection is registered.

use crate::correspondence::{CorrespondenceTable, Correspondences};
use crate::id::*;
use crate::kind::EntityKind;
use crate::source::*;
use crate::target::*;
use crate::transcode::{bit_flags, pad_hit_numbers, split_cell_id};
use slotmap::SlotMap;
use tracing::debug;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a single collection could not be converted. Nothing is created in
/// the target event when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Target(#[from] TargetError),
}

// ---------------------------------------------------------------------------
// Relationship lookup
// ---------------------------------------------------------------------------

/// Resolve one referent. Unavailable referents and referents without a
/// registered target both resolve to `None`.
pub(crate) fn resolve<K: Copy>(
    source: &SourceEvent,
    table: &CorrespondenceTable<K>,
    referent: ObjectId,
) -> Option<K> {
    if !source.is_available(referent) {
        return None;
    }
    table.find(referent)
}

/// Resolve every available referent, skipping the ones that are not found.
pub(crate) fn resolve_found<K: Copy>(
    source: &SourceEvent,
    table: &CorrespondenceTable<K>,
    referents: &[ObjectId],
) -> Vec<K> {
    referents
        .iter()
        .filter_map(|&r| resolve(source, table, r))
        .collect()
}

/// Resolve every available referent, or nothing: returns `None` as soon as
/// one available referent has no registered target.
pub(crate) fn resolve_all<K: Copy>(
    source: &SourceEvent,
    table: &CorrespondenceTable<K>,
    referents: &[ObjectId],
) -> Option<Vec<K>> {
    referents
        .iter()
        .filter(|&&r| source.is_available(r))
        .map(|&r| table.find(r))
        .collect()
}

/// Number of referents that point at available source records. This is the
/// length a fully resolved list relationship has.
pub(crate) fn available_count(source: &SourceEvent, referents: &[ObjectId]) -> usize {
    referents
        .iter()
        .filter(|&&r| source.is_available(r))
        .count()
}

/// Field-wise equality between a converted particle ID and a source one.
/// Floats are compared exactly.
pub(crate) fn particle_id_matches(converted: &ParticleId, record: &ParticleIdRecord) -> bool {
    converted.pid_type == record.pid_type
        && converted.pdg == record.pdg
        && converted.likelihood == record.likelihood
        && converted.algorithm_type == record.algorithm_type
        && converted.parameters == record.parameters
}

/// Pick the first of `candidates` that is field-wise equal to `record`.
pub(crate) fn find_matching_particle_id(
    arena: &SlotMap<ParticleIdKey, ParticleId>,
    candidates: &[ParticleIdKey],
    record: &ParticleIdRecord,
) -> Option<ParticleIdKey> {
    candidates.iter().copied().find(|&key| {
        arena
            .get(key)
            .is_some_and(|pid| particle_id_matches(pid, record))
    })
}

fn ensure_new(target: &TargetEvent, name: &str) -> Result<(), TargetError> {
    if target.has_collection(name) {
        return Err(TargetError::DuplicateCollection(name.to_string()));
    }
    Ok(())
}

fn object_id(collection: CollectionId, index: usize) -> ObjectId {
    ObjectId::new(collection, index as u32)
}

// ---------------------------------------------------------------------------
// Record-level copies
// ---------------------------------------------------------------------------

fn tracker_hit_from(record: &TrackerHitRecord) -> TrackerHit {
    let (cell_id0, cell_id1) = split_cell_id(record.cell_id);
    let mut hit = TrackerHit {
        cell_id0,
        cell_id1,
        hit_type: record.hit_type,
        position: record.position,
        cov_matrix: record.cov_matrix,
        edep: record.edep,
        edep_error: record.edep_error,
        time: record.time,
        ..Default::default()
    };
    for (bit, set) in bit_flags(record.quality).into_iter().enumerate() {
        hit.set_quality_bit(bit as u32, set);
    }
    hit
}

fn track_state_from(record: &TrackStateRecord) -> TrackState {
    TrackState {
        location: record.location,
        d0: record.d0,
        phi: record.phi,
        omega: record.omega,
        z0: record.z0,
        tan_lambda: record.tan_lambda,
        cov_matrix: record.cov_matrix,
        reference_point: record.reference_point,
    }
}

fn track_from(source: &SourceEvent, record: &TrackRecord) -> Track {
    let mut track = Track {
        chi2: record.chi2,
        ndf: record.ndf,
        dedx: record.dedx,
        dedx_error: record.dedx_error,
        radius_of_innermost_hit: record.radius_of_innermost_hit,
        subdetector_hit_numbers: pad_hit_numbers(&record.subdetector_hit_numbers),
        hits: record
            .tracker_hits
            .iter()
            .filter_map(|&id| source.get::<TrackerHitRecord>(id))
            .map(tracker_hit_from)
            .collect(),
        track_states: record.track_states.iter().map(track_state_from).collect(),
        ..Default::default()
    };
    for (bit, set) in bit_flags(record.track_type).into_iter().enumerate() {
        track.set_type_bit(bit as u32, set);
    }
    track
}

fn calorimeter_hit_from(record: &CalorimeterHitRecord) -> CalorimeterHit {
    let (cell_id0, cell_id1) = split_cell_id(record.cell_id);
    CalorimeterHit {
        cell_id0,
        cell_id1,
        energy: record.energy,
        energy_error: record.energy_error,
        time: record.time,
        position: record.position,
        hit_type: record.hit_type,
    }
}

fn cluster_from(record: &ClusterRecord) -> Cluster {
    let mut cluster = Cluster {
        energy: record.energy,
        energy_error: record.energy_error,
        position: record.position,
        position_error: record.position_error,
        i_theta: record.i_theta,
        i_phi: record.phi,
        direction_error: record.direction_error,
        shape: record.shape_parameters.clone(),
        ..Default::default()
    };
    for (bit, set) in bit_flags(record.cluster_type).into_iter().enumerate() {
        cluster.set_type_bit(bit as u32, set);
    }
    cluster
}

fn vertex_from(record: &VertexRecord) -> Vertex {
    Vertex {
        primary: record.primary != 0,
        algorithm_type: record.algorithm_type.to_string(),
        chi2: record.chi2,
        probability: record.probability,
        position: record.position,
        cov_matrix: record.cov_matrix,
        parameters: record.parameters.clone(),
        associated_particle: None,
    }
}

pub(crate) fn particle_id_from(record: &ParticleIdRecord) -> ParticleId {
    ParticleId {
        pid_type: record.pid_type,
        pdg: record.pdg,
        likelihood: record.likelihood,
        algorithm_type: record.algorithm_type,
        parameters: record.parameters.clone(),
    }
}

fn reconstructed_particle_from(record: &ReconstructedParticleRecord) -> ReconstructedParticle {
    ReconstructedParticle {
        particle_type: record.particle_type,
        momentum: record.momentum,
        energy: record.energy,
        cov_matrix: record.cov_matrix,
        mass: record.mass,
        charge: record.charge,
        reference_point: record.reference_point,
        goodness_of_pid: record.goodness_of_pid,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Dispatch entry point
// ---------------------------------------------------------------------------

/// Convert one source collection of `kind` into a new target collection.
/// Returns the number of target records created.
pub fn convert_collection(
    kind: EntityKind,
    source: &SourceEvent,
    target: &mut TargetEvent,
    links: &mut Correspondences,
    source_name: &str,
    target_name: &str,
) -> Result<usize, CollectionError> {
    let count = match kind {
        EntityKind::Track => convert_tracks(source, target, links, source_name, target_name)?,
        EntityKind::CalorimeterHit => {
            convert_calorimeter_hits(source, target, links, source_name, target_name)?
        }
        EntityKind::Cluster => convert_clusters(source, target, links, source_name, target_name)?,
        EntityKind::Vertex => convert_vertices(source, target, links, source_name, target_name)?,
        EntityKind::ParticleId => {
            convert_particle_ids(source, target, links, source_name, target_name)?
        }
        EntityKind::ReconstructedParticle => {
            convert_reconstructed_particles(source, target, links, source_name, target_name)?
        }
    };
    debug!(
        "Converted {} {} records from '{}' into '{}'",
        count, kind, source_name, target_name
    );
    Ok(count)
}

// ---------------------------------------------------------------------------
// Tracks
// ---------------------------------------------------------------------------

pub fn convert_tracks(
    source: &SourceEvent,
    target: &mut TargetEvent,
    links: &mut Correspondences,
    source_name: &str,
    target_name: &str,
) -> Result<usize, CollectionError> {
    ensure_new(target, target_name)?;
    let (collection, records) = source.collection::<TrackRecord>(source_name)?;

    let mut converted = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let Some(record) = record else { continue };
        let key = target.tracks.insert(track_from(source, record));
        links.tracks.register(key, object_id(collection, index));
        converted.push((key, record));
    }

    // Linked tracks, once every track of this collection is registered.
    for &(key, record) in &converted {
        let linked = resolve_found(source, &links.tracks, &record.tracks);
        if let Some(track) = target.tracks.get_mut(key) {
            track.tracks.extend(linked);
        }
    }

    let keys: Vec<TrackKey> = converted.into_iter().map(|(k, _)| k).collect();
    let count = keys.len();
    target.add_collection(target_name, TargetCollection::Tracks(keys))?;
    Ok(count)
}

// ---------------------------------------------------------------------------
// Calorimeter hits
// ---------------------------------------------------------------------------

pub fn convert_calorimeter_hits(
    source: &SourceEvent,
    target: &mut TargetEvent,
    links: &mut Correspondences,
    source_name: &str,
    target_name: &str,
) -> Result<usize, CollectionError> {
    ensure_new(target, target_name)?;
    let (collection, records) = source.collection::<CalorimeterHitRecord>(source_name)?;

    let mut keys = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let Some(record) = record else { continue };
        let key = target.calorimeter_hits.insert(calorimeter_hit_from(record));
        links
            .calorimeter_hits
            .register(key, object_id(collection, index));
        keys.push(key);
    }

    let count = keys.len();
    target.add_collection(target_name, TargetCollection::CalorimeterHits(keys))?;
    Ok(count)
}

// ---------------------------------------------------------------------------
// Clusters
// ---------------------------------------------------------------------------

/// Resolve a cluster's hits with their contributions. `None` when the two
/// source sequences differ in length or an available hit is not converted.
pub(crate) fn resolve_cluster_hits(
    source: &SourceEvent,
    table: &CorrespondenceTable<CalorimeterHitKey>,
    record: &ClusterRecord,
) -> Option<Vec<(CalorimeterHitKey, f32)>> {
    if record.hits.len() != record.hit_contributions.len() {
        return None;
    }
    record
        .hits
        .iter()
        .zip(&record.hit_contributions)
        .filter(|&(&hit, _)| source.is_available(hit))
        .map(|(&hit, &contribution)| table.find(hit).map(|key| (key, contribution)))
        .collect()
}

pub fn convert_clusters(
    source: &SourceEvent,
    target: &mut TargetEvent,
    links: &mut Correspondences,
    source_name: &str,
    target_name: &str,
) -> Result<usize, CollectionError> {
    ensure_new(target, target_name)?;
    let (collection, records) = source.collection::<ClusterRecord>(source_name)?;

    let mut converted = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let Some(record) = record else { continue };
        let mut cluster = cluster_from(record);

        if let Some(pids) = resolve_all(source, &links.particle_ids, &record.particle_ids) {
            cluster.particle_ids = pids;
        }
        if let Some(hits) = resolve_cluster_hits(source, &links.calorimeter_hits, record) {
            for (hit, contribution) in hits {
                cluster.add_hit(hit, contribution);
            }
        }

        let key = target.clusters.insert(cluster);
        links.clusters.register(key, object_id(collection, index));
        converted.push((key, record));
    }

    for &(key, record) in &converted {
        let linked = resolve_found(source, &links.clusters, &record.clusters);
        if let Some(cluster) = target.clusters.get_mut(key) {
            cluster.clusters.extend(linked);
        }
    }

    let keys: Vec<ClusterKey> = converted.into_iter().map(|(k, _)| k).collect();
    let count = keys.len();
    target.add_collection(target_name, TargetCollection::Clusters(keys))?;
    Ok(count)
}

// ---------------------------------------------------------------------------
// Vertices
// ---------------------------------------------------------------------------

pub fn convert_vertices(
    source: &SourceEvent,
    target: &mut TargetEvent,
    links: &mut Correspondences,
    source_name: &str,
    target_name: &str,
) -> Result<usize, CollectionError> {
    ensure_new(target, target_name)?;
    let (collection, records) = source.collection::<VertexRecord>(source_name)?;

    let mut keys = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let Some(record) = record else { continue };
        let mut vertex = vertex_from(record);
        vertex.associated_particle = record
            .associated_particle
            .and_then(|rp| resolve(source, &links.reconstructed_particles, rp));

        let key = target.vertices.insert(vertex);
        links.vertices.register(key, object_id(collection, index));
        keys.push(key);
    }

    let count = keys.len();
    target.add_collection(target_name, TargetCollection::Vertices(keys))?;
    Ok(count)
}

// ---------------------------------------------------------------------------
// Particle IDs
// ---------------------------------------------------------------------------

pub fn convert_particle_ids(
    source: &SourceEvent,
    target: &mut TargetEvent,
    links: &mut Correspondences,
    source_name: &str,
    target_name: &str,
) -> Result<usize, CollectionError> {
    ensure_new(target, target_name)?;
    let (collection, records) = source.collection::<ParticleIdRecord>(source_name)?;

    let mut keys = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let Some(record) = record else { continue };
        let key = target.particle_ids.insert(particle_id_from(record));
        links.particle_ids.register(key, object_id(collection, index));
        keys.push(key);
    }

    let count = keys.len();
    target.add_collection(target_name, TargetCollection::ParticleIds(keys))?;
    Ok(count)
}

// ---------------------------------------------------------------------------
// Reconstructed particles
// ---------------------------------------------------------------------------

pub fn convert_reconstructed_particles(
    source: &SourceEvent,
    target: &mut TargetEvent,
    links: &mut Correspondences,
    source_name: &str,
    target_name: &str,
) -> Result<usize, CollectionError> {
    ensure_new(target, target_name)?;
    let (collection, records) = source.collection::<ReconstructedParticleRecord>(source_name)?;

    let mut converted = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let Some(record) = record else { continue };
        let mut particle = reconstructed_particle_from(record);

        // Owned copies, never looked up in the particle ID table.
        particle.particle_ids = record
            .particle_ids
            .iter()
            .filter_map(|&id| source.get::<ParticleIdRecord>(id))
            .map(|pid| target.particle_ids.insert(particle_id_from(pid)))
            .collect();

        // The used ID is one of the owned copies, chosen by content.
        particle.particle_id_used = record
            .particle_id_used
            .and_then(|id| source.get::<ParticleIdRecord>(id))
            .and_then(|used| {
                find_matching_particle_id(&target.particle_ids, &particle.particle_ids, used)
            });

        particle.start_vertex = record
            .start_vertex
            .and_then(|v| resolve(source, &links.vertices, v));
        if let Some(tracks) = resolve_all(source, &links.tracks, &record.tracks) {
            particle.tracks = tracks;
        }
        if let Some(clusters) = resolve_all(source, &links.clusters, &record.clusters) {
            particle.clusters = clusters;
        }

        let key = target.reconstructed_particles.insert(particle);
        links
            .reconstructed_particles
            .register(key, object_id(collection, index));
        converted.push((key, record));
    }

    for &(key, record) in &converted {
        let linked = resolve_found(source, &links.reconstructed_particles, &record.particles);
        if let Some(particle) = target.reconstructed_particles.get_mut(key) {
            particle.particles.extend(linked);
        }
    }

    let keys: Vec<ReconstructedParticleKey> = converted.into_iter().map(|(k, _)| k).collect();
    let count = keys.len();
    target.add_collection(target_name, TargetCollection::ReconstructedParticles(keys))?;
    Ok(count)
}

// ===========================================================================
// Tests
// ===========================================================================
