//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::id::*;
use crate::kind::EntityKind;
use crate::source::*;
use crate::target::TargetEvent;
use std::collections::HashMap;
use std::hash::Hash;

// ===========================================================================
// Record builders
// ===========================================================================

pub fn track_record(chi2: f32) -> TrackRecord {
    TrackRecord {
        chi2,
        ndf: 10,
        subdetector_hit_numbers: vec![3, 4, 5],
        ..Default::default()
    }
}

pub fn tracker_hit_record(cell_id: u64) -> TrackerHitRecord {
    TrackerHitRecord {
        cell_id,
        edep: 0.01,
        position: [cell_id as f64, 0.0, 0.0],
        ..Default::default()
    }
}

pub fn calo_hit_record(energy: f32) -> CalorimeterHitRecord {
    CalorimeterHitRecord {
        cell_id: (energy.to_bits() as u64) << 8,
        energy,
        ..Default::default()
    }
}

pub fn cluster_record(energy: f32) -> ClusterRecord {
    ClusterRecord {
        energy,
        shape_parameters: vec![energy, 1.0],
        ..Default::default()
    }
}

pub fn pid_record(pdg: i32, likelihood: f32) -> ParticleIdRecord {
    ParticleIdRecord {
        pid_type: 1,
        pdg,
        algorithm_type: 2,
        likelihood,
        parameters: vec![likelihood],
    }
}

pub fn particle_record(energy: f32) -> ReconstructedParticleRecord {
    ReconstructedParticleRecord {
        energy,
        mass: 0.139,
        charge: 1.0,
        momentum: [energy, 0.0, 0.0],
        ..Default::default()
    }
}

fn refs(collection: CollectionId, indices: &[u32]) -> Vec<ObjectId> {
    indices.iter().map(|&i| ObjectId::new(collection, i)).collect()
}

// ===========================================================================
// Scenario events
// ===========================================================================

/// Source collection name used for each requestable kind in
/// [`linked_event`] and [`bulk_event`].
pub const LINKED_COLLECTIONS: [(EntityKind, &str); 6] = [
    (EntityKind::Track, "Tracks"),
    (EntityKind::CalorimeterHit, "CaloHits"),
    (EntityKind::ParticleId, "PIDs"),
    (EntityKind::Cluster, "Clusters"),
    (EntityKind::Vertex, "Vertices"),
    (EntityKind::ReconstructedParticle, "Particles"),
];

/// Target collection name for a source collection name.
pub fn target_name(source: &str) -> String {
    format!("EF{source}")
}

/// Flat request parameters converting every collection of
/// [`linked_event`], in the given kind order.
pub fn request_params(order: &[EntityKind]) -> Vec<String> {
    order
        .iter()
        .filter_map(|kind| LINKED_COLLECTIONS.iter().find(|(k, _)| k == kind))
        .flat_map(|(kind, name)| [kind.name().to_string(), name.to_string(), target_name(name)])
        .collect()
}

/// Request parameters for every kind, referents before referrers where
/// possible.
pub fn full_request_params() -> Vec<String> {
    let order: Vec<EntityKind> = LINKED_COLLECTIONS.iter().map(|(k, _)| *k).collect();
    request_params(&order)
}

/// A small event in which every relationship kind is used, including
/// unavailable records and references to them.
///
/// Collections, in insertion order: `TrackerHits`, `Tracks`, `CaloHits`,
/// `PIDs`, `Clusters`, `Vertices`, `Particles`.
pub fn linked_event() -> SourceEvent {
    let mut event = SourceEvent::new();
    // Collection IDs are assigned in insertion order.
    let tracker_hits = CollectionId(0);
    let tracks = CollectionId(1);
    let calo_hits = CollectionId(2);
    let pids = CollectionId(3);
    let clusters = CollectionId(4);
    let vertices = CollectionId(5);
    let particles = CollectionId(6);

    let collections: Vec<(&str, SourceRecords)> = vec![
        (
            "TrackerHits",
            SourceRecords::TrackerHit(vec![
                Some(tracker_hit_record(0x1_0000_0001)),
                Some(tracker_hit_record(0x2_0000_0002)),
                None,
            ]),
        ),
        (
            "Tracks",
            SourceRecords::Track(vec![
                Some(TrackRecord {
                    tracker_hits: refs(tracker_hits, &[0, 1]),
                    tracks: refs(tracks, &[1]),
                    track_type: 0b11,
                    ..track_record(1.0)
                }),
                Some(TrackRecord {
                    tracker_hits: refs(tracker_hits, &[2]),
                    tracks: refs(tracks, &[0, 2]),
                    ..track_record(2.0)
                }),
                None,
                Some(track_record(4.0)),
            ]),
        ),
        (
            "CaloHits",
            SourceRecords::CalorimeterHit(vec![
                Some(calo_hit_record(1.0)),
                Some(calo_hit_record(2.0)),
                Some(calo_hit_record(3.0)),
                None,
            ]),
        ),
        (
            "PIDs",
            SourceRecords::ParticleId(vec![
                Some(pid_record(211, 0.8)),
                Some(pid_record(321, 0.15)),
                Some(pid_record(2212, 0.05)),
            ]),
        ),
        (
            "Clusters",
            SourceRecords::Cluster(vec![
                Some(ClusterRecord {
                    hits: refs(calo_hits, &[0, 1, 3]),
                    hit_contributions: vec![0.5, 0.25, 0.25],
                    particle_ids: refs(pids, &[0]),
                    clusters: refs(clusters, &[1]),
                    ..cluster_record(3.0)
                }),
                Some(ClusterRecord {
                    // Mismatched lengths: never linked to hits.
                    hits: refs(calo_hits, &[2]),
                    hit_contributions: vec![],
                    particle_ids: refs(pids, &[1, 2]),
                    ..cluster_record(2.0)
                }),
            ]),
        ),
        (
            "Vertices",
            SourceRecords::Vertex(vec![
                Some(VertexRecord {
                    primary: 1,
                    algorithm_type: 7,
                    associated_particle: Some(ObjectId::new(particles, 0)),
                    ..Default::default()
                }),
                Some(VertexRecord {
                    associated_particle: Some(ObjectId::new(particles, 2)),
                    ..Default::default()
                }),
            ]),
        ),
        (
            "Particles",
            SourceRecords::ReconstructedParticle(vec![
                Some(ReconstructedParticleRecord {
                    tracks: refs(tracks, &[0, 2]),
                    clusters: refs(clusters, &[0]),
                    start_vertex: Some(ObjectId::new(vertices, 0)),
                    particle_ids: refs(pids, &[0, 1]),
                    particle_id_used: Some(ObjectId::new(pids, 0)),
                    particles: refs(particles, &[1, 2]),
                    ..particle_record(5.0)
                }),
                Some(ReconstructedParticleRecord {
                    tracks: refs(tracks, &[1, 3]),
                    clusters: refs(clusters, &[1, 0]),
                    start_vertex: Some(ObjectId::new(vertices, 1)),
                    // Used ID outside the particle's own IDs.
                    particle_id_used: Some(ObjectId::new(pids, 2)),
                    ..particle_record(3.0)
                }),
                None,
            ]),
        ),
    ];

    for (name, records) in collections {
        if let Err(e) = event.add_records(name, records) {
            panic!("linked_event: {e}");
        }
    }
    event
}

/// A larger event with `n` records per requestable kind and every
/// relationship populated, for benchmarks and scaling tests.
pub fn bulk_event(n: u32) -> SourceEvent {
    let mut event = SourceEvent::new();
    let tracks = CollectionId(0);
    let calo_hits = CollectionId(1);
    let pids = CollectionId(2);
    let clusters = CollectionId(3);
    let vertices = CollectionId(4);
    let particles = CollectionId(5);
    let next = |i: u32| (i + 1) % n.max(1);

    let records: Vec<(&str, SourceRecords)> = vec![
        (
            "Tracks",
            SourceRecords::Track(
                (0..n)
                    .map(|i| {
                        Some(TrackRecord {
                            tracks: refs(tracks, &[next(i)]),
                            ..track_record(i as f32)
                        })
                    })
                    .collect(),
            ),
        ),
        (
            "CaloHits",
            SourceRecords::CalorimeterHit((0..n).map(|i| Some(calo_hit_record(i as f32))).collect()),
        ),
        (
            "PIDs",
            SourceRecords::ParticleId((0..n).map(|i| Some(pid_record(i as i32, 0.5))).collect()),
        ),
        (
            "Clusters",
            SourceRecords::Cluster(
                (0..n)
                    .map(|i| {
                        Some(ClusterRecord {
                            hits: refs(calo_hits, &[i]),
                            hit_contributions: vec![1.0],
                            particle_ids: refs(pids, &[i]),
                            clusters: refs(clusters, &[next(i)]),
                            ..cluster_record(i as f32)
                        })
                    })
                    .collect(),
            ),
        ),
        (
            "Vertices",
            SourceRecords::Vertex(
                (0..n)
                    .map(|i| {
                        Some(VertexRecord {
                            associated_particle: Some(ObjectId::new(particles, i)),
                            ..Default::default()
                        })
                    })
                    .collect(),
            ),
        ),
        (
            "Particles",
            SourceRecords::ReconstructedParticle(
                (0..n)
                    .map(|i| {
                        Some(ReconstructedParticleRecord {
                            tracks: refs(tracks, &[i]),
                            clusters: refs(clusters, &[i]),
                            start_vertex: Some(ObjectId::new(vertices, i)),
                            particle_ids: refs(pids, &[i]),
                            particle_id_used: Some(ObjectId::new(pids, i)),
                            particles: refs(particles, &[next(i)]),
                            ..particle_record(i as f32)
                        })
                    })
                    .collect(),
            ),
        ),
    ];

    for (name, records) in records {
        if let Err(e) = event.add_records(name, records) {
            panic!("bulk_event: {e}");
        }
    }
    event
}

// ===========================================================================
// Target inspection
// ===========================================================================

fn positions<K: Copy + Eq + Hash>(
    target: &TargetEvent,
    keys_of: impl Fn(&crate::target::TargetCollection) -> Option<&[K]>,
) -> HashMap<K, String> {
    let mut out = HashMap::new();
    for name in target.collection_names() {
        if let Some(keys) = target.collection(name).and_then(|c| keys_of(c)) {
            for (i, &key) in keys.iter().enumerate() {
                out.insert(key, format!("{name}[{i}]"));
            }
        }
    }
    out
}

fn describe<K: Copy + Eq + Hash>(map: &HashMap<K, String>, keys: &[K]) -> String {
    let names: Vec<&str> = keys
        .iter()
        .map(|k| map.get(k).map_or("?", String::as_str))
        .collect();
    format!("[{}]", names.join(", "))
}

/// Render every relationship in `target` in terms of collection positions,
/// one line per record, collections sorted by name. Two targets built from
/// the same source with the same collection names render identically when
/// they are linked identically, regardless of key values.
pub fn link_snapshot(target: &TargetEvent) -> Vec<String> {
    let tracks = positions(target, |c| c.as_tracks());
    let hits = positions(target, |c| c.as_calorimeter_hits());
    let clusters = positions(target, |c| c.as_clusters());
    let vertices = positions(target, |c| c.as_vertices());
    let pids = positions(target, |c| c.as_particle_ids());
    let particles = positions(target, |c| c.as_reconstructed_particles());

    let mut names: Vec<&str> = target.collection_names().collect();
    names.sort_unstable();

    let mut lines = Vec::new();
    for name in names {
        let Some(collection) = target.collection(name) else {
            continue;
        };
        if let Some(keys) = collection.as_tracks() {
            for (i, &k) in keys.iter().enumerate() {
                if let Some(t) = target.track(k) {
                    lines.push(format!("{name}[{i}] tracks={}", describe(&tracks, &t.tracks)));
                }
            }
        } else if let Some(keys) = collection.as_clusters() {
            for (i, &k) in keys.iter().enumerate() {
                if let Some(c) = target.cluster(k) {
                    lines.push(format!(
                        "{name}[{i}] hits={} contributions={:?} pids={} clusters={}",
                        describe(&hits, c.calorimeter_hits()),
                        c.hit_contributions(),
                        describe(&pids, &c.particle_ids),
                        describe(&clusters, &c.clusters),
                    ));
                }
            }
        } else if let Some(keys) = collection.as_vertices() {
            for (i, &k) in keys.iter().enumerate() {
                if let Some(v) = target.vertex(k) {
                    let particle = v.associated_particle.map(|p| describe(&particles, &[p]));
                    lines.push(format!("{name}[{i}] particle={particle:?}"));
                }
            }
        } else if let Some(keys) = collection.as_reconstructed_particles() {
            for (i, &k) in keys.iter().enumerate() {
                let Some(p) = target.reconstructed_particle(k) else {
                    continue;
                };
                let owned: Vec<i32> = p
                    .particle_ids
                    .iter()
                    .filter_map(|&id| target.particle_id(id).map(|pid| pid.pdg))
                    .collect();
                let used = p.particle_id_used.map(|u| {
                    match p.particle_ids.iter().position(|&o| o == u) {
                        Some(pos) => format!("owned[{pos}]"),
                        None => describe(&pids, &[u]),
                    }
                });
                lines.push(format!(
                    "{name}[{i}] tracks={} clusters={} vertex={:?} owned={owned:?} used={used:?} particles={}",
                    describe(&tracks, &p.tracks),
                    describe(&clusters, &p.clusters),
                    p.start_vertex.map(|v| describe(&vertices, &[v])),
                    describe(&particles, &p.particles),
                ));
            }
        } else {
            lines.push(format!("{name} len={}", collection.len()));
        }
    }
    lines
}
