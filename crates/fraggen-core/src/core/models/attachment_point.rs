use super::ap_class::ApClass;
use super::error::GraphError;
use super::ids::VertexId;
use crate::core::fragspace::FragmentSpace;
use nalgebra::Vector3;

/// A typed connection slot on a vertex.
///
/// The owning vertex is stored by ID only; the vertex owns the attachment point, never the
/// reverse. `free_connections` starts at `total_connections` and is consumed by edges.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentPoint {
    /// ID of the vertex holding this attachment point, if it has been placed in one.
    pub owner: Option<VertexId>,
    /// Index of the source atom inside the vertex substructure, when there is one.
    pub atom_index: Option<usize>,
    /// Compatibility class; `None` for placeholder attachment points.
    pub class: Option<ApClass>,
    /// Direction of the open valence in the fragment frame.
    pub direction: Option<Vector3<f64>>,
    total_connections: u32,
    free_connections: u32,
}

impl AttachmentPoint {
    pub fn new(
        atom_index: Option<usize>,
        class: Option<ApClass>,
        direction: Option<Vector3<f64>>,
        connections: u32,
    ) -> Self {
        Self {
            owner: None,
            atom_index,
            class,
            direction,
            total_connections: connections,
            free_connections: connections,
        }
    }

    /// Attachment point without chemical content, as used by empty vertices.
    pub fn placeholder(class: Option<ApClass>, connections: u32) -> Self {
        Self::new(None, class, None, connections)
    }

    pub fn total_connections(&self) -> u32 {
        self.total_connections
    }

    pub fn free_connections(&self) -> u32 {
        self.free_connections
    }

    pub fn is_available(&self) -> bool {
        self.free_connections > 0
    }

    /// Adds `delta` (possibly negative) to the free-connection counter.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ValenceUnderflow`] if the counter would become negative and
    /// [`GraphError::ValenceOverflow`] if it would exceed the total connection count. The
    /// counter is left untouched on error.
    pub fn update_free_connections(&mut self, delta: i32) -> Result<(), GraphError> {
        let result = self.free_connections as i64 + delta as i64;
        if result < 0 {
            return Err(GraphError::ValenceUnderflow { delta, result });
        }
        if result > self.total_connections as i64 {
            return Err(GraphError::ValenceOverflow {
                delta,
                total: self.total_connections,
            });
        }
        self.free_connections = result as u32;
        Ok(())
    }

    /// Whether the fragment space allows bonding this attachment point to `other`.
    pub fn is_class_compatible(&self, other: &AttachmentPoint, space: &FragmentSpace) -> bool {
        match (&self.class, &other.class) {
            (Some(a), Some(b)) => space.is_class_compatible(a, b),
            _ => false,
        }
    }

    /// Structural equality independent of the owning vertex: same class and same source atom.
    pub fn same_as(&self, other: &AttachmentPoint) -> bool {
        self.class == other.class && self.atom_index == other.atom_index
    }

    pub fn class_label(&self) -> String {
        self.class
            .as_ref()
            .map_or_else(|| "*".to_string(), ToString::to_string)
    }
}
