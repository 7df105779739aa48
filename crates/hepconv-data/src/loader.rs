//! Loading pipeline: finds data files, deserializes them, resolves record
//! references, and builds core types.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers, plus the two entry points used by runs and
//! tests: [`load_conversion_config`] and [`load_source_event`].

use crate::schema::*;
use hepconv_core::id::{CollectionId, ObjectId};
use hepconv_core::source::*;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Base name of the request-list file.
pub const CONVERSION_FILE: &str = "conversion";

/// Base name of the source-event file.
pub const EVENT_FILE: &str = "event";

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A record reference names a collection that does not exist.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A record reference points past the end of its collection.
    #[error("index {index} out of range for collection '{collection}' ({len} records) in {file}")]
    IndexOutOfRange {
        file: PathBuf,
        collection: String,
        index: u32,
        len: usize,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The resolved event was rejected by the source store.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name.
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if none exists, or `Err(ConflictingFormats)` if more
/// than one does.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its format.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    let parse_err = |detail: String| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    };

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_err(e.to_string())),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string())),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_err(e.to_string())),
    }
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Check whether a name already exists in a map, returning a `DuplicateName`
/// error if so.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

// ===========================================================================
// Conversion config
// ===========================================================================

/// Load `conversion.{ron,json,toml}` from `dir`.
///
/// The request list is returned as written; its shape is validated by the
/// engine when the run starts.
pub fn load_conversion_config(dir: &Path) -> Result<ConversionConfig, DataLoadError> {
    let path = require_data_file(dir, CONVERSION_FILE)?;
    let config: ConversionConfig = deserialize_file(&path)?;
    debug!(
        "Loaded {} request entries from {}",
        config.requests.len(),
        path.display()
    );
    Ok(config)
}

// ===========================================================================
// Source event
// ===========================================================================

/// Resolves `(collection_name, index)` references against the collections
/// declared in one event file.
struct RefResolver<'a> {
    file: &'a Path,
    ids: HashMap<String, DeclaredCollection>,
}

/// What a reference needs to know about a declared collection.
#[derive(Debug, Clone, Copy)]
struct DeclaredCollection {
    id: CollectionId,
    len: usize,
    kind: &'static str,
}

impl RefResolver<'_> {
    /// Resolve a reference that must point at a record of kind `R`.
    fn resolve<R: SourceRecord>(
        &self,
        (collection, index): &RefData,
    ) -> Result<ObjectId, DataLoadError> {
        let declared = *resolve_name(&self.ids, collection, self.file, R::KIND_NAME)?;
        if declared.kind != R::KIND_NAME {
            return Err(DataLoadError::UnresolvedRef {
                file: self.file.to_path_buf(),
                name: collection.clone(),
                expected_kind: R::KIND_NAME,
            });
        }
        let DeclaredCollection { id, len, .. } = declared;
        if *index as usize >= len {
            return Err(DataLoadError::IndexOutOfRange {
                file: self.file.to_path_buf(),
                collection: collection.clone(),
                index: *index,
                len,
            });
        }
        Ok(ObjectId::new(id, *index))
    }

    fn resolve_all<R: SourceRecord>(
        &self,
        refs: &[RefData],
    ) -> Result<Vec<ObjectId>, DataLoadError> {
        refs.iter().map(|r| self.resolve::<R>(r)).collect()
    }

    fn resolve_opt<R: SourceRecord>(
        &self,
        r: &Option<RefData>,
    ) -> Result<Option<ObjectId>, DataLoadError> {
        r.as_ref().map(|r| self.resolve::<R>(r)).transpose()
    }

    /// Turn a collection's records into slots, marking the listed indices
    /// unavailable.
    fn slots<D, R>(
        &self,
        collection: &CollectionData<D>,
        mut convert: impl FnMut(&D) -> Result<R, DataLoadError>,
    ) -> Result<Vec<Option<R>>, DataLoadError> {
        for &index in &collection.unavailable {
            if index as usize >= collection.len() {
                return Err(DataLoadError::IndexOutOfRange {
                    file: self.file.to_path_buf(),
                    collection: collection.name.clone(),
                    index,
                    len: collection.len(),
                });
            }
        }
        collection
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                if collection.unavailable.contains(&(i as u32)) {
                    Ok(None)
                } else {
                    convert(record).map(Some)
                }
            })
            .collect()
    }

    fn records(&self, entry: &CollectionEntry) -> Result<SourceRecords, DataLoadError> {
        Ok(match entry {
            CollectionEntry::Track(c) => SourceRecords::Track(self.slots(c, |d| self.track(d))?),
            CollectionEntry::TrackerHit(c) => {
                SourceRecords::TrackerHit(self.slots(c, |d| Ok(tracker_hit(d)))?)
            }
            CollectionEntry::CalorimeterHit(c) => {
                SourceRecords::CalorimeterHit(self.slots(c, |d| Ok(calorimeter_hit(d)))?)
            }
            CollectionEntry::Cluster(c) => {
                SourceRecords::Cluster(self.slots(c, |d| self.cluster(d))?)
            }
            CollectionEntry::Vertex(c) => SourceRecords::Vertex(self.slots(c, |d| self.vertex(d))?),
            CollectionEntry::ParticleId(c) => {
                SourceRecords::ParticleId(self.slots(c, |d| Ok(particle_id(d)))?)
            }
            CollectionEntry::ReconstructedParticle(c) => {
                SourceRecords::ReconstructedParticle(self.slots(c, |d| self.particle(d))?)
            }
        })
    }

    fn track(&self, d: &TrackData) -> Result<TrackRecord, DataLoadError> {
        Ok(TrackRecord {
            track_type: d.track_type,
            chi2: d.chi2,
            ndf: d.ndf,
            dedx: d.dedx,
            dedx_error: d.dedx_error,
            radius_of_innermost_hit: d.radius_of_innermost_hit,
            subdetector_hit_numbers: d.subdetector_hit_numbers.clone(),
            tracker_hits: self.resolve_all::<TrackerHitRecord>(&d.tracker_hits)?,
            track_states: d.track_states.iter().map(track_state).collect(),
            tracks: self.resolve_all::<TrackRecord>(&d.tracks)?,
        })
    }

    fn cluster(&self, d: &ClusterData) -> Result<ClusterRecord, DataLoadError> {
        Ok(ClusterRecord {
            cluster_type: d.cluster_type,
            energy: d.energy,
            energy_error: d.energy_error,
            position: d.position,
            position_error: d.position_error,
            i_theta: d.i_theta,
            phi: d.phi,
            direction_error: d.direction_error,
            shape_parameters: d.shape_parameters.clone(),
            clusters: self.resolve_all::<ClusterRecord>(&d.clusters)?,
            hits: self.resolve_all::<CalorimeterHitRecord>(&d.hits)?,
            hit_contributions: d.hit_contributions.clone(),
            particle_ids: self.resolve_all::<ParticleIdRecord>(&d.particle_ids)?,
        })
    }

    fn vertex(&self, d: &VertexData) -> Result<VertexRecord, DataLoadError> {
        Ok(VertexRecord {
            primary: d.primary,
            algorithm_type: d.algorithm_type,
            chi2: d.chi2,
            probability: d.probability,
            position: d.position,
            cov_matrix: d.cov_matrix,
            parameters: d.parameters.clone(),
            associated_particle: self.resolve_opt::<ReconstructedParticleRecord>(&d.associated_particle)?,
        })
    }

    fn particle(
        &self,
        d: &ReconstructedParticleData,
    ) -> Result<ReconstructedParticleRecord, DataLoadError> {
        Ok(ReconstructedParticleRecord {
            particle_type: d.particle_type,
            energy: d.energy,
            momentum: d.momentum,
            reference_point: d.reference_point,
            charge: d.charge,
            mass: d.mass,
            goodness_of_pid: d.goodness_of_pid,
            cov_matrix: d.cov_matrix,
            start_vertex: self.resolve_opt::<VertexRecord>(&d.start_vertex)?,
            particle_id_used: self.resolve_opt::<ParticleIdRecord>(&d.particle_id_used)?,
            clusters: self.resolve_all::<ClusterRecord>(&d.clusters)?,
            tracks: self.resolve_all::<TrackRecord>(&d.tracks)?,
            particles: self.resolve_all::<ReconstructedParticleRecord>(&d.particles)?,
            particle_ids: self.resolve_all::<ParticleIdRecord>(&d.particle_ids)?,
        })
    }
}

fn tracker_hit(d: &TrackerHitData) -> TrackerHitRecord {
    TrackerHitRecord {
        cell_id: d.cell_id,
        hit_type: d.hit_type,
        quality: d.quality,
        time: d.time,
        edep: d.edep,
        edep_error: d.edep_error,
        position: d.position,
        cov_matrix: d.cov_matrix,
    }
}

fn track_state(d: &TrackStateData) -> TrackStateRecord {
    TrackStateRecord {
        location: d.location,
        d0: d.d0,
        phi: d.phi,
        omega: d.omega,
        z0: d.z0,
        tan_lambda: d.tan_lambda,
        reference_point: d.reference_point,
        cov_matrix: d.cov_matrix,
    }
}

fn calorimeter_hit(d: &CalorimeterHitData) -> CalorimeterHitRecord {
    CalorimeterHitRecord {
        cell_id: d.cell_id,
        energy: d.energy,
        energy_error: d.energy_error,
        time: d.time,
        position: d.position,
        hit_type: d.hit_type,
    }
}

fn particle_id(d: &ParticleIdData) -> ParticleIdRecord {
    ParticleIdRecord {
        pid_type: d.pid_type,
        pdg: d.pdg,
        algorithm_type: d.algorithm_type,
        likelihood: d.likelihood,
        parameters: d.parameters.clone(),
    }
}

/// Build a [`SourceEvent`] from deserialized event data. `file` is used in
/// error messages only.
///
/// Collections get IDs in declaration order, so references may point
/// forward to collections declared later in the file.
pub fn build_source_event(data: &EventData, file: &Path) -> Result<SourceEvent, DataLoadError> {
    let mut ids: HashMap<String, DeclaredCollection> = HashMap::new();
    for (i, entry) in data.collections.iter().enumerate() {
        check_duplicate(&ids, entry.name(), file)?;
        ids.insert(
            entry.name().to_string(),
            DeclaredCollection {
                id: CollectionId(i as u32),
                len: entry.len(),
                kind: entry.kind_name(),
            },
        );
    }

    let resolver = RefResolver { file, ids };
    let mut event = SourceEvent::new();
    for entry in &data.collections {
        let records = resolver.records(entry)?;
        event.add_records(entry.name(), records)?;
    }
    Ok(event)
}

/// Load and build a source event from one file.
pub fn load_source_event_file(path: &Path) -> Result<SourceEvent, DataLoadError> {
    let data: EventData = deserialize_file(path)?;
    let event = build_source_event(&data, path)?;
    debug!(
        "Loaded {} source collections from {}",
        event.collection_count(),
        path.display()
    );
    Ok(event)
}

/// Load `event.{ron,json,toml}` from `dir`.
pub fn load_source_event(dir: &Path) -> Result<SourceEvent, DataLoadError> {
    let path = require_data_file(dir, EVENT_FILE)?;
    load_source_event_file(&path)
}

/// Load both the source event and the request list from one directory.
pub fn load_scenario(dir: &Path) -> Result<(SourceEvent, ConversionConfig), DataLoadError> {
    Ok((load_source_event(dir)?, load_conversion_config(dir)?))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "hepconv_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Clean up a test directory.
    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    const EVENT_RON: &str = r#"(
        collections: [
            Track((
                name: "Tracks",
                records: [(chi2: 1.5, tracks: [("Tracks", 1)]), (chi2: 2.5)],
                unavailable: [1],
            )),
            ReconstructedParticle((
                name: "Particles",
                records: [(energy: 4.0, tracks: [("Tracks", 0), ("Tracks", 1)], start_vertex: Some(("Vertices", 0)))],
            )),
            Vertex((name: "Vertices", records: [(primary: 1)])),
        ],
    )"#;

    // -----------------------------------------------------------------------
    // detect_format
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("event.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("event.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("event.json")).unwrap(), Format::Json);
    }

    #[test]
    fn detect_format_unsupported() {
        for name in ["event.yaml", "event"] {
            let result = detect_format(Path::new(name));
            assert!(matches!(
                result,
                Err(DataLoadError::UnsupportedFormat { .. })
            ));
        }
    }

    // -----------------------------------------------------------------------
    // find_data_file / require_data_file
    // -----------------------------------------------------------------------

    #[test]
    fn find_data_file_found_json() {
        let dir = make_test_dir("find_json");
        fs::write(dir.join("conversion.json"), "{}").unwrap();

        let result = find_data_file(&dir, "conversion").unwrap();
        assert_eq!(result, Some(dir.join("conversion.json")));

        cleanup(&dir);
    }

    #[test]
    fn find_data_file_missing() {
        let dir = make_test_dir("find_missing");

        assert_eq!(find_data_file(&dir, "conversion").unwrap(), None);
        let result = require_data_file(&dir, "conversion");
        match result {
            Err(DataLoadError::MissingRequired { file, .. }) => assert_eq!(file, "conversion"),
            other => panic!("expected MissingRequired, got: {other:?}"),
        }

        cleanup(&dir);
    }

    #[test]
    fn find_data_file_conflict() {
        let dir = make_test_dir("find_conflict");
        fs::write(dir.join("conversion.ron"), "(requests: [])").unwrap();
        fs::write(dir.join("conversion.toml"), "requests = []").unwrap();

        let result = find_data_file(&dir, "conversion");
        assert!(matches!(
            result,
            Err(DataLoadError::ConflictingFormats { .. })
        ));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Conversion config
    // -----------------------------------------------------------------------

    #[test]
    fn load_conversion_config_toml() {
        let dir = make_test_dir("config_toml");
        fs::write(
            dir.join("conversion.toml"),
            r#"requests = ["Track", "Tracks", "EFTracks", "Vertex", "Vertices", "EFVertices"]"#,
        )
        .unwrap();

        let config = load_conversion_config(&dir).unwrap();
        assert_eq!(config.requests.len(), 6);
        assert_eq!(config.requests[3], "Vertex");

        cleanup(&dir);
    }

    #[test]
    fn load_conversion_config_keeps_malformed_length() {
        let dir = make_test_dir("config_malformed");
        fs::write(dir.join("conversion.json"), r#"{"requests": ["Track", "Tracks"]}"#).unwrap();

        let config = load_conversion_config(&dir).unwrap();
        assert_eq!(config.requests, vec!["Track", "Tracks"]);

        cleanup(&dir);
    }

    #[test]
    fn load_conversion_config_parse_error() {
        let dir = make_test_dir("config_parse_err");
        fs::write(dir.join("conversion.ron"), "this is not valid RON {{{").unwrap();

        let result = load_conversion_config(&dir);
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Source event
    // -----------------------------------------------------------------------

    #[test]
    fn load_source_event_resolves_references() {
        let dir = make_test_dir("event_ron");
        fs::write(dir.join("event.ron"), EVENT_RON).unwrap();

        let event = load_source_event(&dir).unwrap();
        assert_eq!(event.collection_count(), 3);

        let (tracks_id, tracks) = event.collection::<TrackRecord>("Tracks").unwrap();
        assert_eq!(tracks.len(), 2);
        assert!(tracks[1].is_none());
        assert_eq!(
            tracks[0].as_ref().unwrap().tracks,
            vec![ObjectId::new(tracks_id, 1)]
        );

        let vertices_id = event.collection_id("Vertices").unwrap();
        let (_, particles) = event
            .collection::<ReconstructedParticleRecord>("Particles")
            .unwrap();
        let particle = particles[0].as_ref().unwrap();
        assert_eq!(particle.start_vertex, Some(ObjectId::new(vertices_id, 0)));
        assert_eq!(particle.tracks.len(), 2);
        assert!(!event.is_available(particle.tracks[1]));

        cleanup(&dir);
    }

    #[test]
    fn unresolved_collection_reference() {
        let data: EventData = ron::from_str(
            r#"(collections: [Track((name: "T", records: [(tracks: [("Nope", 0)])]))])"#,
        )
        .unwrap();
        let result = build_source_event(&data, Path::new("event.ron"));
        match result {
            Err(DataLoadError::UnresolvedRef {
                name,
                expected_kind,
                ..
            }) => {
                assert_eq!(name, "Nope");
                assert_eq!(expected_kind, "Track");
            }
            other => panic!("expected UnresolvedRef, got: {other:?}"),
        }
    }

    #[test]
    fn reference_to_collection_of_wrong_kind() {
        let data: EventData = ron::from_str(
            r#"(collections: [
                Track((name: "Tracks", records: [()])),
                Cluster((name: "C", records: [(hits: [("Tracks", 0)], hit_contributions: [1.0])])),
            ])"#,
        )
        .unwrap();
        let result = build_source_event(&data, Path::new("event.ron"));
        match result {
            Err(DataLoadError::UnresolvedRef {
                name,
                expected_kind,
                ..
            }) => {
                assert_eq!(name, "Tracks");
                assert_eq!(expected_kind, "CalorimeterHit");
            }
            other => panic!("expected UnresolvedRef, got: {other:?}"),
        }
    }

    #[test]
    fn reference_index_out_of_range() {
        let data: EventData = serde_json::from_str(
            r#"{"collections": [
                {"ParticleID": {"name": "PIDs", "records": [{}]}},
                {"Cluster": {"name": "C", "records": [{"particle_ids": [["PIDs", 3]]}]}}
            ]}"#,
        )
        .unwrap();
        let result = build_source_event(&data, Path::new("event.json"));
        assert!(matches!(
            result,
            Err(DataLoadError::IndexOutOfRange { index: 3, len: 1, .. })
        ));
    }

    #[test]
    fn unavailable_index_out_of_range() {
        let data: EventData = ron::from_str(
            r#"(collections: [Vertex((name: "V", records: [()], unavailable: [4]))])"#,
        )
        .unwrap();
        let result = build_source_event(&data, Path::new("event.ron"));
        assert!(matches!(
            result,
            Err(DataLoadError::IndexOutOfRange { index: 4, .. })
        ));
    }

    #[test]
    fn duplicate_collection_name() {
        let data: EventData = ron::from_str(
            r#"(collections: [
                Vertex((name: "V", records: [])),
                Track((name: "V", records: [])),
            ])"#,
        )
        .unwrap();
        let result = build_source_event(&data, Path::new("event.ron"));
        assert!(matches!(result, Err(DataLoadError::DuplicateName { .. })));
    }

    #[test]
    fn load_scenario_reads_both_files() {
        let dir = make_test_dir("scenario");
        fs::write(dir.join("event.ron"), EVENT_RON).unwrap();
        fs::write(
            dir.join("conversion.ron"),
            r#"(requests: ["Track", "Tracks", "EFTracks"])"#,
        )
        .unwrap();

        let (event, config) = load_scenario(&dir).unwrap();
        assert_eq!(event.collection_count(), 3);
        assert_eq!(config.requests.len(), 3);

        cleanup(&dir);
    }
}
