//! The conversion engine: runs one request list against a source event and
//! fills a target event.
//!
//! # Architecture
//!
//! The [`ConversionEngine`] only borrows a read-only [`SourceEvent`]. Each
//! run creates its own [`Correspondences`], which live until the run returns.
//!
//! # Three-Phase Run
//!
//! Each `run()` does:
//! 1. **Validate** -- the request list must hold `kind, source, target`
//!    triples; anything else fails the whole run before any conversion
//! 2. **Dispatch** -- every request is checked for an existing target name,
//!    then for a supported kind, then converted; per-request problems become
//!    [`RequestOutcome`]s
//! 3. **Relink** -- one deferred pass fills the cross-kind links left absent
//!    by requests converted before their referents

use crate::convert::{convert_collection, CollectionError};
use crate::correspondence::Correspondences;
use crate::kind::EntityKind;
use crate::relink::{relink, RelinkStats};
use crate::request::{Request, RequestError, RequestList};
use crate::source::{SourceError, SourceEvent};
use crate::target::TargetEvent;
use tracing::{debug, error};

// ---------------------------------------------------------------------------
// Error and report types
// ---------------------------------------------------------------------------

/// Errors that abort a whole run. Per-request problems are reported as
/// [`RequestOutcome`]s instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Request(#[from] RequestError),
}

/// What happened to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A new target collection was created.
    Converted {
        kind: EntityKind,
        source: String,
        target: String,
        records: usize,
    },
    /// The target name was already taken; nothing was done.
    AlreadyPresent { target: String },
    /// The kind name is not one of [`EntityKind::SUPPORTED`].
    UnsupportedKind { kind: String },
    /// The source collection is missing or holds another kind of record.
    SourceUnavailable {
        kind: EntityKind,
        source: String,
        error: SourceError,
    },
}

impl RequestOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self, Self::Converted { .. })
    }
}

/// Summary of one run: one outcome per request, in request order, plus what
/// the deferred pass linked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub outcomes: Vec<RequestOutcome>,
    pub relink: RelinkStats,
}

impl RunReport {
    pub fn converted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_converted()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.converted_count()
    }

    /// Total target records created by collection conversions. Owned
    /// particle-ID copies are not counted.
    pub fn records_converted(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                RequestOutcome::Converted { records, .. } => *records,
                _ => 0,
            })
            .sum()
    }
}

// ---------------------------------------------------------------------------
// ConversionEngine
// ---------------------------------------------------------------------------

/// Drives conversion runs over one borrowed source event.
#[derive(Debug, Clone, Copy)]
pub struct ConversionEngine<'a> {
    source: &'a SourceEvent,
}

impl<'a> ConversionEngine<'a> {
    pub fn new(source: &'a SourceEvent) -> Self {
        Self { source }
    }

    /// Parse `params` as `kind, source, target` triples and run them.
    pub fn run<S: AsRef<str>>(
        &self,
        params: &[S],
        target: &mut TargetEvent,
    ) -> Result<RunReport, ConvertError> {
        let requests = match RequestList::parse(params) {
            Ok(requests) => requests,
            Err(e) => {
                error!("{e}");
                return Err(e.into());
            }
        };
        Ok(self.run_requests(&requests, target))
    }

    /// Run an already validated request list.
    pub fn run_requests(&self, requests: &RequestList, target: &mut TargetEvent) -> RunReport {
        let mut links = Correspondences::new();
        let outcomes = requests
            .iter()
            .map(|request| self.dispatch(request, target, &mut links))
            .collect();
        let relink = relink(self.source, target, &links);
        RunReport { outcomes, relink }
    }

    /// Handle a single request against the run's correspondence tables.
    pub fn dispatch(
        &self,
        request: &Request,
        target: &mut TargetEvent,
        links: &mut Correspondences,
    ) -> RequestOutcome {
        if target.has_collection(&request.target) {
            debug!(
                "Target collection '{}' already present, skipping",
                request.target
            );
            return RequestOutcome::AlreadyPresent {
                target: request.target.clone(),
            };
        }

        let Some(kind) = request.entity_kind() else {
            error!(
                "Unsupported conversion type '{}', supported types are: {}",
                request.kind,
                EntityKind::supported_list()
            );
            return RequestOutcome::UnsupportedKind {
                kind: request.kind.clone(),
            };
        };

        match convert_collection(
            kind,
            self.source,
            target,
            links,
            &request.source,
            &request.target,
        ) {
            Ok(records) => RequestOutcome::Converted {
                kind,
                source: request.source.clone(),
                target: request.target.clone(),
                records,
            },
            Err(CollectionError::Source(e)) => {
                error!("Cannot convert {} collection '{}': {e}", kind, request.source);
                RequestOutcome::SourceUnavailable {
                    kind,
                    source: request.source.clone(),
                    error: e,
                }
            }
            Err(CollectionError::Target(_)) => RequestOutcome::AlreadyPresent {
                target: request.target.clone(),
            },
        }
    }
}
