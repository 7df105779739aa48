//! Runs driven by data files: the source event and the request list are
//! both loaded from a directory, then converted.

use std::fs;
use std::path::{Path, PathBuf};

use hepconv_core::engine::{ConversionEngine, RequestOutcome};
use hepconv_core::target::TargetEvent;
use hepconv_data::{load_scenario, DataLoadError};

fn make_test_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "hepconv_integration_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn cleanup(dir: &Path) {
    let _ = fs::remove_dir_all(dir);
}

const EVENT_RON: &str = r#"(
    collections: [
        CalorimeterHit((
            name: "EcalBarrelHits",
            records: [
                (cell_id: 4294967297, energy: 1.25, type: 1),
                (cell_id: 2, energy: 0.75),
                (cell_id: 3, energy: 9.0),
            ],
            unavailable: [2],
        )),
        Cluster((
            name: "PandoraClusters",
            records: [(
                energy: 2.0,
                type: 5,
                hits: [("EcalBarrelHits", 0), ("EcalBarrelHits", 1), ("EcalBarrelHits", 2)],
                hit_contributions: [1.25, 0.75, 9.0],
            )],
        )),
        ReconstructedParticle((
            name: "PandoraPFOs",
            records: [(
                energy: 2.0,
                clusters: [("PandoraClusters", 0)],
                start_vertex: Some(("PrimaryVertex", 0)),
            )],
        )),
        Vertex((
            name: "PrimaryVertex",
            records: [(primary: 1, algorithm_type: 12, associated_particle: Some(("PandoraPFOs", 0)))],
        )),
    ],
)"#;

#[test]
fn ron_scenario_converts_and_links() {
    let dir = make_test_dir("ron_scenario");
    fs::write(dir.join("event.ron"), EVENT_RON).unwrap();
    fs::write(
        dir.join("conversion.ron"),
        r#"(requests: [
            "ReconstructedParticle", "PandoraPFOs", "EFPFOs",
            "Cluster", "PandoraClusters", "EFClusters",
            "CalorimeterHit", "EcalBarrelHits", "EFHits",
            "Vertex", "PrimaryVertex", "EFVertices",
        ])"#,
    )
    .unwrap();

    let (source, config) = load_scenario(&dir).unwrap();
    let mut target = TargetEvent::new();
    let report = ConversionEngine::new(&source)
        .run(&config.requests, &mut target)
        .unwrap();
    assert_eq!(report.converted_count(), 4);

    let hits = target.collection("EFHits").unwrap().as_calorimeter_hits().unwrap();
    assert_eq!(hits.len(), 2);
    let first_hit = target.calorimeter_hit(hits[0]).unwrap();
    assert_eq!((first_hit.cell_id0, first_hit.cell_id1), (1, 1));
    assert_eq!(first_hit.hit_type, 1);

    let cluster_key = target.collection("EFClusters").unwrap().as_clusters().unwrap()[0];
    let cluster = target.cluster(cluster_key).unwrap();
    assert_eq!(cluster.cluster_type(), 5);
    assert_eq!(cluster.calorimeter_hits(), hits);
    assert_eq!(cluster.hit_contributions(), &[1.25, 0.75]);

    let pfo = target.collection("EFPFOs").unwrap().as_reconstructed_particles().unwrap()[0];
    let vertex = target.collection("EFVertices").unwrap().as_vertices().unwrap()[0];
    let particle = target.reconstructed_particle(pfo).unwrap();
    assert_eq!(particle.clusters, vec![cluster_key]);
    assert_eq!(particle.start_vertex, Some(vertex));
    let v = target.vertex(vertex).unwrap();
    assert_eq!(v.associated_particle, Some(pfo));
    assert_eq!(v.algorithm_type, "12");

    cleanup(&dir);
}

#[test]
fn json_scenario_with_missing_collection() {
    let dir = make_test_dir("json_scenario");
    fs::write(
        dir.join("event.json"),
        r#"{"collections": [{"ParticleID": {"name": "PIDs", "records": [{"pdg": 13}]}}]}"#,
    )
    .unwrap();
    fs::write(
        dir.join("conversion.json"),
        r#"{"requests": ["ParticleID", "PIDs", "EFPIDs", "Track", "MarlinTrkTracks", "EFTracks"]}"#,
    )
    .unwrap();

    let (source, config) = load_scenario(&dir).unwrap();
    let mut target = TargetEvent::new();
    let report = ConversionEngine::new(&source)
        .run(&config.requests, &mut target)
        .unwrap();
    assert!(report.outcomes[0].is_converted());
    assert!(matches!(
        &report.outcomes[1],
        RequestOutcome::SourceUnavailable { source, .. } if source == "MarlinTrkTracks"
    ));
    assert!(!target.has_collection("EFTracks"));

    cleanup(&dir);
}

#[test]
fn toml_request_list_with_bad_length_is_fatal_at_run_time() {
    let dir = make_test_dir("toml_malformed");
    fs::write(
        dir.join("event.toml"),
        r#"collections = [{ Vertex = { name = "PV", records = [{ primary = 1 }] } }]"#,
    )
    .unwrap();
    fs::write(dir.join("conversion.toml"), r#"requests = ["Vertex", "PV"]"#).unwrap();

    let (source, config) = load_scenario(&dir).unwrap();
    let mut target = TargetEvent::new();
    let result = ConversionEngine::new(&source).run(&config.requests, &mut target);
    assert!(result.is_err());
    assert_eq!(target.collection_count(), 0);

    cleanup(&dir);
}

#[test]
fn missing_event_file_is_reported() {
    let dir = make_test_dir("no_event");
    fs::write(dir.join("conversion.ron"), "(requests: [])").unwrap();

    let result = load_scenario(&dir);
    assert!(matches!(result, Err(DataLoadError::MissingRequired { .. })));

    cleanup(&dir);
}
