//! Conversion requests.
//!
//! A run is configured with a flat list of strings read three at a time:
//! `kind, source collection name, target collection name`. The list is
//! validated as a whole before anything is converted.

use crate::kind::EntityKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error(
        "malformed request list: {len} entries is not a multiple of 3 \
         (expected kind, source name, target name triples)"
    )]
    MalformedBatch { len: usize },
}

/// One `(kind, source, target)` triple. The kind is kept as written so that
/// unsupported kinds can be reported by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub kind: String,
    pub source: String,
    pub target: String,
}

impl Request {
    pub fn new(
        kind: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            source: source.into(),
            target: target.into(),
        }
    }

    /// The requested kind, or `None` if it is not a supported kind name.
    pub fn entity_kind(&self) -> Option<EntityKind> {
        EntityKind::from_name(&self.kind)
    }
}

/// An ordered, validated batch of requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestList {
    requests: Vec<Request>,
}

impl RequestList {
    /// Group a flat parameter list into triples, in order.
    pub fn parse<S: AsRef<str>>(params: &[S]) -> Result<Self, RequestError> {
        if params.len() % 3 != 0 {
            return Err(RequestError::MalformedBatch { len: params.len() });
        }
        let requests = params
            .chunks_exact(3)
            .map(|t| Request::new(t[0].as_ref(), t[1].as_ref(), t[2].as_ref()))
            .collect();
        Ok(Self { requests })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Request> {
        self.requests.iter()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

impl<'a> IntoIterator for &'a RequestList {
    type Item = &'a Request;
    type IntoIter = std::slice::Iter<'a, Request>;

    fn into_iter(self) -> Self::IntoIter {
        self.requests.iter()
    }
}
