use serde::{Deserialize, Serialize};
use std::fmt;

/// The entity kinds a conversion request may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Track,
    CalorimeterHit,
    Cluster,
    Vertex,
    ParticleId,
    ReconstructedParticle,
}

impl EntityKind {
    /// Every requestable kind, in the order reported to users.
    pub const SUPPORTED: [EntityKind; 6] = [
        EntityKind::Track,
        EntityKind::Cluster,
        EntityKind::CalorimeterHit,
        EntityKind::Vertex,
        EntityKind::ParticleId,
        EntityKind::ReconstructedParticle,
    ];

    /// Parse a request kind name. Matching is exact and case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Track" => Some(Self::Track),
            "CalorimeterHit" => Some(Self::CalorimeterHit),
            "Cluster" => Some(Self::Cluster),
            "Vertex" => Some(Self::Vertex),
            "ParticleID" => Some(Self::ParticleId),
            "ReconstructedParticle" => Some(Self::ReconstructedParticle),
            _ => None,
        }
    }

    /// The name used for this kind in request lists.
    pub fn name(self) -> &'static str {
        match self {
            Self::Track => "Track",
            Self::CalorimeterHit => "CalorimeterHit",
            Self::Cluster => "Cluster",
            Self::Vertex => "Vertex",
            Self::ParticleId => "ParticleID",
            Self::ReconstructedParticle => "ReconstructedParticle",
        }
    }

    /// Comma-separated list of supported names, for diagnostics.
    pub fn supported_list() -> String {
        Self::SUPPORTED
            .iter()
            .map(|k| k.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
