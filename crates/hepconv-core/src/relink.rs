//! Deferred relinking: the last pass of a conversion run.
//!
//! Runs exactly once, after every request has been dispatched. It walks the
//! correspondence tables and fills the cross-kind relationships that the
//! converters left absent because the referent kind had not been converted
//! yet. Relationships that are already populated are left untouched, so
//! nothing filled during the first pass is overwritten.
//!
//! A list relationship counts as populated when its length equals the number
//! of available referents on the source record. Any other non-empty length
//! is a broken invariant (converters fill lists all-or-nothing) and panics.

use crate::convert::{available_count, find_matching_particle_id, resolve, resolve_found};
use crate::correspondence::Correspondences;
use crate::source::*;
use crate::target::TargetEvent;
use tracing::debug;

/// Number of records that gained each relationship during relinking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelinkStats {
    pub particle_ids_used: usize,
    pub start_vertices: usize,
    pub particle_tracks: usize,
    pub particle_clusters: usize,
    pub associated_particles: usize,
    pub cluster_particle_ids: usize,
    pub cluster_hits: usize,
}

impl RelinkStats {
    pub fn total(&self) -> usize {
        self.particle_ids_used
            + self.start_vertices
            + self.particle_tracks
            + self.particle_clusters
            + self.associated_particles
            + self.cluster_particle_ids
            + self.cluster_hits
    }
}

/// Whether a list relationship still needs filling. Panics on a partially
/// filled list.
fn needs_fill(current: usize, expected: usize, what: &str) -> bool {
    if current == expected {
        return false;
    }
    assert!(
        current == 0,
        "{what} partially linked: {current} of {expected} referents"
    );
    true
}

/// Fill every relationship the first pass could not resolve.
pub fn relink(
    source: &SourceEvent,
    target: &mut TargetEvent,
    links: &Correspondences,
) -> RelinkStats {
    let mut stats = RelinkStats::default();

    // Reconstructed particles: used particle ID, start vertex, tracks,
    // clusters.
    for (key, id) in links.reconstructed_particles.iter() {
        let Some(record) = source.get::<ReconstructedParticleRecord>(id) else {
            continue;
        };
        let Some(particle) = target.reconstructed_particles.get_mut(key) else {
            continue;
        };

        if particle.particle_id_used.is_none() {
            // Only the particle's own copies are candidates.
            let found = record
                .particle_id_used
                .and_then(|id| source.get::<ParticleIdRecord>(id))
                .and_then(|used| {
                    find_matching_particle_id(&target.particle_ids, &particle.particle_ids, used)
                });
            if found.is_some() {
                particle.particle_id_used = found;
                stats.particle_ids_used += 1;
            }
        }

        if particle.start_vertex.is_none() {
            if let Some(vertex) = record
                .start_vertex
                .and_then(|v| resolve(source, &links.vertices, v))
            {
                particle.start_vertex = Some(vertex);
                stats.start_vertices += 1;
            }
        }

        let expected = available_count(source, &record.tracks);
        if needs_fill(particle.tracks.len(), expected, "particle tracks") {
            particle.tracks = resolve_found(source, &links.tracks, &record.tracks);
            if !particle.tracks.is_empty() {
                stats.particle_tracks += 1;
            }
        }

        let expected = available_count(source, &record.clusters);
        if needs_fill(particle.clusters.len(), expected, "particle clusters") {
            particle.clusters = resolve_found(source, &links.clusters, &record.clusters);
            if !particle.clusters.is_empty() {
                stats.particle_clusters += 1;
            }
        }
    }

    // Vertices: associated particle.
    for (key, id) in links.vertices.iter() {
        let Some(record) = source.get::<VertexRecord>(id) else {
            continue;
        };
        let Some(vertex) = target.vertices.get_mut(key) else {
            continue;
        };
        if vertex.associated_particle.is_none() {
            if let Some(rp) = record
                .associated_particle
                .and_then(|rp| resolve(source, &links.reconstructed_particles, rp))
            {
                vertex.associated_particle = Some(rp);
                stats.associated_particles += 1;
            }
        }
    }

    // Clusters: particle IDs, hits with contributions.
    for (key, id) in links.clusters.iter() {
        let Some(record) = source.get::<ClusterRecord>(id) else {
            continue;
        };
        let Some(cluster) = target.clusters.get_mut(key) else {
            continue;
        };

        let expected = available_count(source, &record.particle_ids);
        if needs_fill(cluster.particle_ids.len(), expected, "cluster particle IDs") {
            cluster.particle_ids = resolve_found(source, &links.particle_ids, &record.particle_ids);
            if !cluster.particle_ids.is_empty() {
                stats.cluster_particle_ids += 1;
            }
        }

        // Mismatched hit and contribution lengths are never linked.
        if record.hits.len() != record.hit_contributions.len() {
            continue;
        }
        let expected = available_count(source, &record.hits);
        if needs_fill(cluster.calorimeter_hits().len(), expected, "cluster hits") {
            for (&hit, &contribution) in record.hits.iter().zip(&record.hit_contributions) {
                if let Some(hit) = resolve(source, &links.calorimeter_hits, hit) {
                    cluster.add_hit(hit, contribution);
                }
            }
            if !cluster.calorimeter_hits().is_empty() {
                stats.cluster_hits += 1;
            }
        }
    }

    debug!(
        "Relinked {} relationships ({} used PIDs, {} start vertices, {} particle track lists, \
         {} particle cluster lists, {} vertex particles, {} cluster PID lists, {} cluster hit lists)",
        stats.total(),
        stats.particle_ids_used,
        stats.start_vertices,
        stats.particle_tracks,
        stats.particle_clusters,
        stats.associated_particles,
        stats.cluster_particle_ids,
        stats.cluster_hits,
    );
    stats
}
