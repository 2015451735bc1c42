use super::ap_class::ApClass;
use super::attachment_point::AttachmentPoint;
use super::bond::BondType;
use super::error::GraphError;
use super::ids::VertexId;
use std::fmt;

/// Position of an attachment point: owning vertex ID and index within that vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApRef {
    pub vertex: VertexId,
    pub ap: usize,
}

impl ApRef {
    pub const fn new(vertex: VertexId, ap: usize) -> Self {
        Self { vertex, ap }
    }
}

/// A bond between two attachment points.
///
/// Source and target only record the direction in which the graph was grown; chemically
/// the edge is undirected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub src: ApRef,
    pub trg: ApRef,
    pub bond_type: BondType,
    pub src_class: Option<ApClass>,
    pub trg_class: Option<ApClass>,
}

impl Edge {
    /// Creates an edge and consumes the bond valence from both attachment points.
    ///
    /// Availability is the caller's concern (see [`super::vertex::Vertex::connect`]); this
    /// only guarantees that no counter goes negative. Both counters are checked before
    /// either is touched.
    pub fn create(
        src: ApRef,
        src_ap: &mut AttachmentPoint,
        trg: ApRef,
        trg_ap: &mut AttachmentPoint,
        bond_type: BondType,
    ) -> Result<Self, GraphError> {
        let needed = bond_type.valence();
        for (at, ap) in [(src, &*src_ap), (trg, &*trg_ap)] {
            if ap.free_connections() < needed {
                return Err(GraphError::InsufficientValence {
                    vertex: at.vertex,
                    index: at.ap,
                    bond: bond_type,
                    needed,
                    available: ap.free_connections(),
                });
            }
        }
        let delta = -(needed as i32);
        src_ap.update_free_connections(delta)?;
        trg_ap.update_free_connections(delta)?;
        Ok(Self {
            src,
            trg,
            bond_type,
            src_class: src_ap.class.clone(),
            trg_class: trg_ap.class.clone(),
        })
    }

    pub fn involves(&self, vertex: VertexId) -> bool {
        self.src.vertex == vertex || self.trg.vertex == vertex
    }

    /// The endpoint on the opposite side of `vertex`, if `vertex` is an endpoint.
    pub fn other_end(&self, vertex: VertexId) -> Option<ApRef> {
        if self.src.vertex == vertex {
            Some(self.trg)
        } else if self.trg.vertex == vertex {
            Some(self.src)
        } else {
            None
        }
    }

    /// Content equality ignoring vertex IDs: AP indices, AP classes and bond type.
    pub fn same_as(&self, other: &Edge, reason: &mut String) -> bool {
        if self.src.ap != other.src.ap {
            reason.push_str(&format!(
                "Different source AP ({}:{}); ",
                self.src.ap, other.src.ap
            ));
            return false;
        }
        if self.trg.ap != other.trg.ap {
            reason.push_str(&format!(
                "Different target AP ({}:{}); ",
                self.trg.ap, other.trg.ap
            ));
            return false;
        }
        if self.src_class != other.src_class {
            reason.push_str(&format!(
                "Different source AP class ({:?}:{:?}); ",
                self.src_class, other.src_class
            ));
            return false;
        }
        if self.trg_class != other.trg_class {
            reason.push_str(&format!(
                "Different target AP class ({:?}:{:?}); ",
                self.trg_class, other.trg_class
            ));
            return false;
        }
        if self.bond_type != other.bond_type {
            reason.push_str(&format!(
                "Different bond type ({}:{}); ",
                self.bond_type, other.bond_type
            ));
            return false;
        }
        true
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}_{}",
            self.src.vertex,
            self.src.ap,
            self.trg.vertex,
            self.trg.ap,
            self.bond_type.legacy_code()
        )?;
        if self.src_class.is_some() || self.trg_class.is_some() {
            let label = |class: &Option<ApClass>| {
                class.as_ref().map_or_else(|| "*".to_string(), ToString::to_string)
            };
            write!(f, "_{}_{}", label(&self.src_class), label(&self.trg_class))?;
        }
        Ok(())
    }
}
