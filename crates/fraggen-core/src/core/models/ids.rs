use slotmap::new_key_type;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

new_key_type! {
    pub struct VertexKey;
}

/// Identifier of a vertex, unique within the graph that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub u32);

/// Identifier of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(pub u32);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VertexId {
    type Err = ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(VertexId)
    }
}

impl FromStr for GraphId {
    type Err = ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(GraphId)
    }
}

/// Issues vertex and graph identifiers.
///
/// One generator is owned by the orchestrating context (typically one per evolutionary
/// run) and shared by reference, or behind an `Arc`, with every task that creates
/// vertices or graphs. Both counters are atomic, so concurrent callers never receive the
/// same identifier.
#[derive(Debug)]
pub struct IdGenerator {
    next_vertex: AtomicU32,
    next_graph: AtomicU32,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::starting_at(1, 1)
    }
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(first_vertex: u32, first_graph: u32) -> Self {
        Self {
            next_vertex: AtomicU32::new(first_vertex),
            next_graph: AtomicU32::new(first_graph),
        }
    }

    pub fn next_vertex_id(&self) -> VertexId {
        VertexId(self.next_vertex.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_graph_id(&self) -> GraphId {
        GraphId(self.next_graph.fetch_add(1, Ordering::Relaxed))
    }

    /// Makes sure identifiers issued from now on are larger than `seen`.
    ///
    /// Used after decoding graphs whose vertex IDs were issued by another generator.
    pub fn reserve_vertex_ids_through(&self, seen: VertexId) {
        self.next_vertex
            .fetch_max(seen.0.saturating_add(1), Ordering::Relaxed);
    }

    pub fn reserve_graph_ids_through(&self, seen: GraphId) {
        self.next_graph
            .fetch_max(seen.0.saturating_add(1), Ordering::Relaxed);
    }
}
