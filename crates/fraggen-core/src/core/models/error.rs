use super::bond::BondType;
use super::ids::VertexId;
use thiserror::Error;

/// Violations of the graph data-model invariants.
///
/// These indicate a caller tried an edit that would leave the graph inconsistent.
/// Operations returning this error leave their receiver unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Attachment point would drop to {result} free connections (delta {delta})")]
    ValenceUnderflow { delta: i32, result: i64 },

    #[error("Attachment point would exceed its {total} total connections (delta {delta})")]
    ValenceOverflow { delta: i32, total: u32 },

    #[error("Vertex {vertex} has no attachment point at index {index}")]
    ApIndexOutOfRange { vertex: VertexId, index: usize },

    #[error("Attachment point {index} on vertex {vertex} is not available")]
    ApUnavailable { vertex: VertexId, index: usize },

    #[error(
        "Bond {bond} needs {needed} free connections but attachment point {index} on vertex {vertex} has {available}"
    )]
    InsufficientValence {
        vertex: VertexId,
        index: usize,
        bond: BondType,
        needed: u32,
        available: u32,
    },

    #[error("Vertex {0} has no free attachment point")]
    NoFreeAttachmentPoint(VertexId),

    #[error("Vertex {0} not found in graph")]
    VertexNotFound(VertexId),

    #[error("Vertex {0} is already part of the graph")]
    DuplicateVertex(VertexId),

    #[error("No edge between vertex {0} and vertex {1}")]
    EdgeNotFound(VertexId, VertexId),

    #[error("Invalid ring: {0}")]
    InvalidRing(String),

    #[error("Graph is not connected: vertex {0} is unreachable from the root")]
    Disconnected(VertexId),

    #[error("Invalid edit: {0}")]
    InvalidEdit(String),

    #[error("Unknown building block {kind} #{index}")]
    UnknownBuildingBlock { kind: &'static str, index: usize },
}
