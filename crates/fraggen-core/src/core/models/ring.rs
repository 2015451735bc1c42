use super::bond::BondType;
use super::error::GraphError;
use super::ids::VertexId;
use std::fmt;

/// A ring closure: the path of vertices from one ring-closing vertex to its partner.
///
/// Vertices are referenced by ID; the graph that owns the ring owns the vertices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ring {
    vertices: Vec<VertexId>,
    bond_type: BondType,
}

impl Ring {
    /// Creates a ring over `vertices`, which must hold at least two entries with distinct
    /// head and tail.
    pub fn new(vertices: Vec<VertexId>, bond_type: BondType) -> Result<Self, GraphError> {
        match (vertices.first(), vertices.last()) {
            (Some(head), Some(tail)) if vertices.len() >= 2 && head != tail => Ok(Self {
                vertices,
                bond_type,
            }),
            _ => Err(GraphError::InvalidRing(format!(
                "a ring needs distinct head and tail vertices, got {:?}",
                vertices.iter().map(|v| v.0).collect::<Vec<_>>()
            ))),
        }
    }

    pub fn head(&self) -> VertexId {
        self.vertices[0]
    }

    pub fn tail(&self) -> VertexId {
        self.vertices[self.vertices.len() - 1]
    }

    pub fn size(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    pub fn vertex_at(&self, position: usize) -> Option<VertexId> {
        self.vertices.get(position).copied()
    }

    pub fn contains(&self, vertex: VertexId) -> bool {
        self.vertices.contains(&vertex)
    }

    pub fn position_of(&self, vertex: VertexId) -> Option<usize> {
        self.vertices.iter().position(|v| *v == vertex)
    }

    pub fn bond_type(&self) -> BondType {
        self.bond_type
    }

    pub fn set_bond_type(&mut self, bond_type: BondType) {
        self.bond_type = bond_type;
    }

    pub(crate) fn remap(&mut self, f: impl Fn(VertexId) -> VertexId) {
        for v in &mut self.vertices {
            *v = f(*v);
        }
    }
}

impl fmt::Display for Ring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.vertices.iter().map(ToString::to_string).collect();
        write!(f, "{}/{}", ids.join("~"), self.bond_type.legacy_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring() -> Ring {
        Ring::new(
            vec![VertexId(4), VertexId(1), VertexId(2), VertexId(5)],
            BondType::Single,
        )
        .unwrap()
    }

    #[test]
    fn exposes_head_tail_and_membership() {
        let r = ring();
        assert_eq!(r.head(), VertexId(4));
        assert_eq!(r.tail(), VertexId(5));
        assert_eq!(r.size(), 4);
        assert!(r.contains(VertexId(2)));
        assert!(!r.contains(VertexId(3)));
        assert_eq!(r.position_of(VertexId(1)), Some(1));
        assert_eq!(r.vertex_at(3), Some(VertexId(5)));
    }

    #[test]
    fn rejects_degenerate_rings() {
        assert!(Ring::new(vec![], BondType::Single).is_err());
        assert!(Ring::new(vec![VertexId(1)], BondType::Single).is_err());
        assert!(matches!(
            Ring::new(vec![VertexId(1), VertexId(2), VertexId(1)], BondType::Single),
            Err(GraphError::InvalidRing(_))
        ));
    }

    #[test]
    fn bond_type_is_mutable() {
        let mut r = ring();
        r.set_bond_type(BondType::Double);
        assert_eq!(r.bond_type(), BondType::Double);
    }

    #[test]
    fn display_joins_ids_and_bond_code() {
        assert_eq!(ring().to_string(), "4~1~2~5/1");
    }
}
