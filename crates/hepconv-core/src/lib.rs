//! hepconv core -- converts reconstructed-event collections from a source
//! event model into a target event model.
//!
//! Each source collection named in a request is turned into a new target
//! collection of the same kind, record by record, and the relationships
//! between records (tracks of a particle, hits of a cluster, the vertex a
//! particle starts from, ...) are re-established between the new records.
//!
//! # Three-Phase Run
//!
//! Each call to [`engine::ConversionEngine::run`] goes through:
//!
//! 1. **Validate** -- the flat parameter list must split into
//!    `(kind, source name, target name)` triples, otherwise nothing happens.
//! 2. **Dispatch** -- requests run in order. A request whose target name is
//!    already present is skipped; an unsupported kind is logged and
//!    skipped. Otherwise the per-kind converter creates the collection,
//!    registers every `(target, source)` pair in a correspondence table and
//!    links whatever it can already resolve.
//! 3. **Relink** -- one deferred pass fills the relationships whose
//!    referents were converted by a later request.
//!
//! ```rust,ignore
//! let engine = ConversionEngine::new(&source);
//! let report = engine.run(&["Track", "Tracks", "EFTracks"], &mut target)?;
//! ```
//!
//! # Key Types
//!
//! - [`source::SourceEvent`] -- Read-only named collections of source
//!   records, addressed by [`id::ObjectId`].
//! - [`target::TargetEvent`] -- Arena-owned target records grouped into
//!   named collections.
//! - [`correspondence::Correspondences`] -- Per-run identity tables.
//! - [`engine::ConversionEngine`] -- The run driver and request dispatcher.

pub mod convert;
pub mod correspondence;
pub mod engine;
pub mod id;
pub mod kind;
pub mod relink;
pub mod request;
pub mod source;
pub mod target;
pub mod transcode;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
