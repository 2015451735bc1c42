use super::ap_class::ApClass;
use super::attachment_point::AttachmentPoint;
use super::bond::BondType;
use super::edge::{ApRef, Edge};
use super::error::GraphError;
use super::ids::{GraphId, VertexId};
use super::substructure::Substructure;
use super::symmetry::SymmetricSet;
use crate::core::fragspace::FragmentSpace;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Level assigned to vertices that have not been placed in a growing graph yet.
pub const UNSET_LEVEL: i32 = -99;

/// Catalog a building block is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuildingBlockType {
    Scaffold,
    Fragment,
    CappingGroup,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid building block type '{0}'")]
pub struct ParseBuildingBlockTypeError(pub String);

impl BuildingBlockType {
    /// Stable integer code used in the graph text encoding.
    pub const fn code(self) -> u8 {
        match self {
            BuildingBlockType::Scaffold => 0,
            BuildingBlockType::Fragment => 1,
            BuildingBlockType::CappingGroup => 2,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(BuildingBlockType::Scaffold),
            1 => Some(BuildingBlockType::Fragment),
            2 => Some(BuildingBlockType::CappingGroup),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            BuildingBlockType::Scaffold => "scaffold",
            BuildingBlockType::Fragment => "fragment",
            BuildingBlockType::CappingGroup => "capping group",
        }
    }
}

impl fmt::Display for BuildingBlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BuildingBlockType {
    type Err = ParseBuildingBlockTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "0" | "scaffold" => Ok(BuildingBlockType::Scaffold),
            "1" | "fragment" => Ok(BuildingBlockType::Fragment),
            "2" | "cap" | "capping" | "capping-group" | "capping group" => {
                Ok(BuildingBlockType::CappingGroup)
            }
            other => Err(ParseBuildingBlockTypeError(other.to_string())),
        }
    }
}

/// Kinds of edit an evolutionary operator may apply at a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MutationType {
    /// Grow new branches from free attachment points.
    Extend,
    /// Remove the vertex together with the branch it roots.
    Delete,
    /// Replace the vertex by another building block.
    Change,
}

impl MutationType {
    pub const ALL: [MutationType; 3] = [
        MutationType::Extend,
        MutationType::Delete,
        MutationType::Change,
    ];
}

/// Chemical content of a vertex taken from the fragment space.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Index of the building block in its catalog.
    pub building_block: usize,
    pub substructure: Substructure,
}

/// What a vertex stands for.
#[derive(Debug, Clone, PartialEq)]
pub enum VertexKind {
    Scaffold(Fragment),
    Fragment(Fragment),
    Capping(Fragment),
    /// Single-AP placeholder marking one end of a ring closure. `origin` is the catalog
    /// the building block was taken from.
    RingClosing {
        origin: BuildingBlockType,
        fragment: Fragment,
    },
    /// Vertex without chemical content; only its attachment points matter.
    Empty,
}

impl VertexKind {
    pub fn from_library(bb_type: BuildingBlockType, fragment: Fragment) -> Self {
        match bb_type {
            BuildingBlockType::Scaffold => VertexKind::Scaffold(fragment),
            BuildingBlockType::Fragment => VertexKind::Fragment(fragment),
            BuildingBlockType::CappingGroup => VertexKind::Capping(fragment),
        }
    }

    pub fn fragment(&self) -> Option<&Fragment> {
        match self {
            VertexKind::Scaffold(f) | VertexKind::Fragment(f) | VertexKind::Capping(f) => Some(f),
            VertexKind::RingClosing { fragment, .. } => Some(fragment),
            VertexKind::Empty => None,
        }
    }

    pub fn building_block_type(&self) -> Option<BuildingBlockType> {
        match self {
            VertexKind::Scaffold(_) => Some(BuildingBlockType::Scaffold),
            VertexKind::Fragment(_) => Some(BuildingBlockType::Fragment),
            VertexKind::Capping(_) => Some(BuildingBlockType::CappingGroup),
            VertexKind::RingClosing { origin, .. } => Some(*origin),
            VertexKind::Empty => None,
        }
    }
}

/// A node of a molecular graph.
///
/// A vertex exclusively owns its attachment points. It refers to its graph by ID only,
/// so vertices can be moved, cloned and compared without touching the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    id: VertexId,
    kind: VertexKind,
    aps: Vec<AttachmentPoint>,
    symmetric_sets: Vec<SymmetricSet>,
    level: i32,
    owner: Option<GraphId>,
    mutation_types: BTreeSet<MutationType>,
}

impl Vertex {
    pub fn new(id: VertexId, kind: VertexKind, aps: Vec<AttachmentPoint>) -> Self {
        let mut vertex = Self {
            id,
            kind,
            aps: Vec::new(),
            symmetric_sets: Vec::new(),
            level: UNSET_LEVEL,
            owner: None,
            mutation_types: MutationType::ALL.into_iter().collect(),
        };
        vertex.set_attachment_points(aps);
        vertex
    }

    pub fn empty(id: VertexId, aps: Vec<AttachmentPoint>) -> Self {
        Self::new(id, VertexKind::Empty, aps)
    }

    pub fn id(&self) -> VertexId {
        self.id
    }

    /// Changes the vertex ID and the back-references of its attachment points.
    pub fn set_id(&mut self, id: VertexId) {
        self.id = id;
        for ap in &mut self.aps {
            ap.owner = Some(id);
        }
    }

    pub fn kind(&self) -> &VertexKind {
        &self.kind
    }

    pub fn building_block(&self) -> Option<(BuildingBlockType, usize)> {
        let bb_type = self.kind.building_block_type()?;
        let fragment = self.kind.fragment()?;
        Some((bb_type, fragment.building_block))
    }

    pub fn substructure(&self) -> Option<&Substructure> {
        self.kind.fragment().map(|f| &f.substructure)
    }

    pub fn is_ring_closing(&self) -> bool {
        matches!(self.kind, VertexKind::RingClosing { .. })
    }

    pub fn is_empty_vertex(&self) -> bool {
        matches!(self.kind, VertexKind::Empty)
    }

    pub fn heavy_atom_count(&self) -> usize {
        self.substructure().map_or(0, Substructure::heavy_atom_count)
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn set_level(&mut self, level: i32) {
        self.level = level;
    }

    pub fn owner(&self) -> Option<GraphId> {
        self.owner
    }

    pub fn set_owner(&mut self, owner: Option<GraphId>) {
        self.owner = owner;
    }

    pub fn attachment_points(&self) -> &[AttachmentPoint] {
        &self.aps
    }

    /// Replaces the attachment-point list and claims ownership of the new entries.
    pub fn set_attachment_points(&mut self, aps: Vec<AttachmentPoint>) {
        self.aps = aps;
        for ap in &mut self.aps {
            ap.owner = Some(self.id);
        }
    }

    pub fn ap(&self, index: usize) -> Option<&AttachmentPoint> {
        self.aps.get(index)
    }

    pub(crate) fn ap_mut(&mut self, index: usize) -> Result<&mut AttachmentPoint, GraphError> {
        let vertex = self.id;
        self.aps
            .get_mut(index)
            .ok_or(GraphError::ApIndexOutOfRange { vertex, index })
    }

    /// Applies `delta` to the free connections of attachment point `index`.
    pub fn update_attachment_point(&mut self, index: usize, delta: i32) -> Result<(), GraphError> {
        self.ap_mut(index)?.update_free_connections(delta)
    }

    pub fn ap_count(&self) -> usize {
        self.aps.len()
    }

    pub fn free_ap_count(&self) -> usize {
        self.aps.iter().filter(|ap| ap.is_available()).count()
    }

    pub fn has_free_ap(&self) -> bool {
        self.aps.iter().any(AttachmentPoint::is_available)
    }

    pub fn free_ap_indices(&self) -> Vec<usize> {
        self.aps
            .iter()
            .enumerate()
            .filter(|(_, ap)| ap.is_available())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn symmetric_ap_sets(&self) -> &[SymmetricSet] {
        &self.symmetric_sets
    }

    pub fn set_symmetric_ap_sets(&mut self, sets: Vec<SymmetricSet>) {
        self.symmetric_sets = sets;
    }

    pub fn has_symmetric_aps(&self) -> bool {
        !self.symmetric_sets.is_empty()
    }

    /// The symmetric set containing attachment point `index`, if any.
    pub fn symmetric_aps(&self, index: usize) -> Option<&SymmetricSet> {
        self.symmetric_sets.iter().find(|set| set.contains(index))
    }

    pub fn mutation_types(&self) -> &BTreeSet<MutationType> {
        &self.mutation_types
    }

    pub fn set_mutation_types(&mut self, types: impl IntoIterator<Item = MutationType>) {
        self.mutation_types = types.into_iter().collect();
    }

    pub fn add_mutation_type(&mut self, mutation: MutationType) {
        self.mutation_types.insert(mutation);
    }

    pub fn remove_mutation_type(&mut self, mutation: MutationType) {
        self.mutation_types.remove(&mutation);
    }

    pub fn allows_mutation(&self, mutation: MutationType) -> bool {
        self.mutation_types.contains(&mutation)
    }

    pub fn all_ap_classes(&self) -> Vec<ApClass> {
        let mut classes: Vec<ApClass> = Vec::new();
        for class in self.aps.iter().filter_map(|ap| ap.class.as_ref()) {
            if !classes.contains(class) {
                classes.push(class.clone());
            }
        }
        classes
    }

    pub fn available_ap_classes(&self) -> Vec<ApClass> {
        let mut classes: Vec<ApClass> = Vec::new();
        for class in self
            .aps
            .iter()
            .filter(|ap| ap.is_available())
            .filter_map(|ap| ap.class.as_ref())
        {
            if !classes.contains(class) {
                classes.push(class.clone());
            }
        }
        classes
    }

    /// Indices of available attachment points carrying exactly `class`.
    pub fn compatible_ap_indices(&self, class: &ApClass) -> Vec<usize> {
        self.aps
            .iter()
            .enumerate()
            .filter(|(_, ap)| ap.is_available() && ap.class.as_ref() == Some(class))
            .map(|(i, _)| i)
            .collect()
    }

    /// Bonds attachment point `src` of this vertex to attachment point `trg` of `other`,
    /// using the classes the two attachment points carry.
    pub fn connect(
        &mut self,
        other: &mut Vertex,
        src: usize,
        trg: usize,
        space: &FragmentSpace,
    ) -> Result<Edge, GraphError> {
        let src_class = self.ap(src).and_then(|ap| ap.class.clone());
        let trg_class = other.ap(trg).and_then(|ap| ap.class.clone());
        self.connect_with_classes(other, src, trg, src_class, trg_class, space)
    }

    /// Like [`Vertex::connect`] with explicit edge classes. The bond type comes from the
    /// fragment space rule of the target class.
    pub fn connect_with_classes(
        &mut self,
        other: &mut Vertex,
        src: usize,
        trg: usize,
        src_class: Option<ApClass>,
        trg_class: Option<ApClass>,
        space: &FragmentSpace,
    ) -> Result<Edge, GraphError> {
        let bond = space.bond_type_for(trg_class.as_ref());
        let mut edge = self.connect_with_bond(other, src, trg, bond)?;
        edge.src_class = src_class;
        edge.trg_class = trg_class;
        Ok(edge)
    }

    /// Bonds two attachment points with an explicit bond type.
    ///
    /// # Errors
    ///
    /// Fails without touching either vertex if an index is out of range, if either
    /// attachment point is unavailable, or if either lacks the free connections the bond
    /// consumes.
    pub fn connect_with_bond(
        &mut self,
        other: &mut Vertex,
        src: usize,
        trg: usize,
        bond: BondType,
    ) -> Result<Edge, GraphError> {
        let (src_id, trg_id) = (self.id, other.id);
        if other.ap(trg).is_none() {
            return Err(GraphError::ApIndexOutOfRange {
                vertex: trg_id,
                index: trg,
            });
        }
        let src_ap = self.ap_mut(src)?;
        if !src_ap.is_available() {
            return Err(GraphError::ApUnavailable {
                vertex: src_id,
                index: src,
            });
        }
        let trg_ap = other.ap_mut(trg)?;
        if !trg_ap.is_available() {
            return Err(GraphError::ApUnavailable {
                vertex: trg_id,
                index: trg,
            });
        }
        Edge::create(
            ApRef::new(src_id, src),
            &mut self.aps[src],
            ApRef::new(trg_id, trg),
            &mut other.aps[trg],
            bond,
        )
    }

    /// Bonds a randomly chosen free attachment point of this vertex to a randomly chosen
    /// free attachment point of `other`, with a random bond order no larger than the free
    /// connections left on either side.
    pub fn connect_random<R: Rng + ?Sized>(
        &mut self,
        other: &mut Vertex,
        rng: &mut R,
    ) -> Result<Edge, GraphError> {
        let src = *self
            .free_ap_indices()
            .choose(rng)
            .ok_or(GraphError::NoFreeAttachmentPoint(self.id))?;
        let trg = *other
            .free_ap_indices()
            .choose(rng)
            .ok_or(GraphError::NoFreeAttachmentPoint(other.id))?;
        let max_order = self.aps[src]
            .free_connections()
            .min(other.aps[trg].free_connections())
            .min(4);
        let bond = BondType::from_order(rng.gen_range(1..=max_order)).unwrap_or(BondType::Single);
        self.connect_with_bond(other, src, trg, bond)
    }

    /// Structural equality ignoring identifiers.
    ///
    /// Requires the same number of attachment points and of free ones, and a one-to-one
    /// pairing of attachment points with equal class and source atom. The first
    /// mismatch found is appended to `reason`.
    pub fn same_as(&self, other: &Vertex, reason: &mut String) -> bool {
        if self.free_ap_count() != other.free_ap_count() {
            reason.push_str(&format!(
                "Different number of free APs ({}:{}); ",
                self.free_ap_count(),
                other.free_ap_count()
            ));
            return false;
        }
        if self.ap_count() != other.ap_count() {
            reason.push_str(&format!(
                "Different number of APs ({}:{}); ",
                self.ap_count(),
                other.ap_count()
            ));
            return false;
        }
        let mut used = vec![false; other.aps.len()];
        for (i, ap) in self.aps.iter().enumerate() {
            let matched = other
                .aps
                .iter()
                .enumerate()
                .find(|(j, candidate)| !used[*j] && ap.same_as(candidate))
                .map(|(j, _)| j);
            match matched {
                Some(j) => used[j] = true,
                None => {
                    reason.push_str(&format!(
                        "No corresponding AP for AP {} ({}) of vertex {}; ",
                        i,
                        ap.class_label(),
                        self.id
                    ));
                    return false;
                }
            }
        }
        true
    }

    /// Releases attachment points and symmetry sets at the end of the vertex's life.
    pub fn cleanup(&mut self) {
        self.aps.clear();
        self.symmetric_sets.clear();
        self.owner = None;
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.building_block() {
            Some((bb_type, index)) => write!(f, "{}_{}_{}_{}", self.id, index, bb_type.code(), self.level),
            None => write!(f, "{}_E_{}", self.id, self.level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::substructure::SubstructureAtom;
    use nalgebra::Point3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn class(s: &str) -> Option<ApClass> {
        Some(s.parse().unwrap())
    }

    fn space() -> FragmentSpace {
        let mut space = FragmentSpace::default();
        space.set_bond_order("amide", BondType::Single);
        space.set_bond_order("ene", BondType::Double);
        space
    }

    fn empty_with(classes: &[(&str, u32)]) -> Vertex {
        let aps = classes
            .iter()
            .map(|(c, n)| AttachmentPoint::placeholder(class(c), *n))
            .collect();
        Vertex::empty(VertexId(1), aps)
    }

    fn fragment_vertex(id: u32) -> Vertex {
        let mut s = Substructure::new();
        s.add_atom(SubstructureAtom::new("C", Point3::origin()));
        s.add_atom(SubstructureAtom::new("O", Point3::new(1.2, 0.0, 0.0)));
        s.add_bond(0, 1).unwrap();
        let aps = vec![
            AttachmentPoint::new(Some(0), class("amide:0"), None, 1),
            AttachmentPoint::new(Some(0), class("amide:1"), None, 1),
        ];
        Vertex::new(
            VertexId(id),
            VertexKind::Fragment(Fragment {
                building_block: 3,
                substructure: s,
            }),
            aps,
        )
    }

    mod bookkeeping {
        use super::*;

        #[test]
        fn new_vertex_owns_its_attachment_points() {
            let mut v = fragment_vertex(7);
            assert!(v.attachment_points().iter().all(|ap| ap.owner == Some(VertexId(7))));
            v.set_id(VertexId(8));
            assert!(v.attachment_points().iter().all(|ap| ap.owner == Some(VertexId(8))));
            assert_eq!(v.level(), UNSET_LEVEL);
            assert_eq!(v.building_block(), Some((BuildingBlockType::Fragment, 3)));
        }

        #[test]
        fn free_ap_queries_follow_availability() {
            let mut v = empty_with(&[("amide:0", 1), ("amide:1", 1), ("ene:0", 2)]);
            v.update_attachment_point(1, -1).unwrap();
            assert_eq!(v.ap_count(), 3);
            assert_eq!(v.free_ap_count(), 2);
            assert_eq!(v.free_ap_indices(), vec![0, 2]);
            assert!(v.has_free_ap());
            assert_eq!(v.available_ap_classes().len(), 2);
            assert_eq!(v.all_ap_classes().len(), 3);
            assert_eq!(v.compatible_ap_indices(&"ene:0".parse().unwrap()), vec![2]);
            assert!(v.compatible_ap_indices(&"amide:1".parse().unwrap()).is_empty());
        }

        #[test]
        fn symmetric_aps_returns_containing_set() {
            let mut v = empty_with(&[("amide:0", 1), ("amide:0", 1), ("ene:0", 2)]);
            v.set_symmetric_ap_sets(vec![SymmetricSet::from_members([0, 1])]);
            assert!(v.has_symmetric_aps());
            assert_eq!(v.symmetric_aps(1).unwrap().members(), &[0, 1]);
            assert!(v.symmetric_aps(2).is_none());
        }

        #[test]
        fn mutation_types_default_to_all_and_are_mutable() {
            let mut v = fragment_vertex(1);
            assert!(MutationType::ALL.iter().all(|m| v.allows_mutation(*m)));
            v.remove_mutation_type(MutationType::Delete);
            assert!(!v.allows_mutation(MutationType::Delete));
            v.set_mutation_types([MutationType::Change]);
            assert_eq!(v.mutation_types().len(), 1);
            v.add_mutation_type(MutationType::Extend);
            assert!(v.allows_mutation(MutationType::Extend));
        }

        #[test]
        fn cleanup_clears_attachment_points_and_sets() {
            let mut v = empty_with(&[("amide:0", 1), ("amide:0", 1)]);
            v.set_symmetric_ap_sets(vec![SymmetricSet::from_members([0, 1])]);
            v.set_owner(Some(GraphId(4)));
            v.cleanup();
            assert_eq!(v.ap_count(), 0);
            assert!(!v.has_symmetric_aps());
            assert!(v.owner().is_none());
        }

        #[test]
        fn building_block_type_codes_round_trip() {
            for bb in [
                BuildingBlockType::Scaffold,
                BuildingBlockType::Fragment,
                BuildingBlockType::CappingGroup,
            ] {
                assert_eq!(BuildingBlockType::from_code(bb.code()), Some(bb));
            }
            assert_eq!("cap".parse::<BuildingBlockType>(), Ok(BuildingBlockType::CappingGroup));
            assert!(BuildingBlockType::from_code(3).is_none());
        }
    }

    mod connect {
        use super::*;

        #[test]
        fn connect_consumes_bond_valence_on_both_sides() {
            let space = space();
            let mut a = empty_with(&[("ene:0", 2)]);
            let mut b = empty_with(&[("ene:1", 2), ("amide:0", 1)]);
            b.set_id(VertexId(2));
            let edge = a.connect(&mut b, 0, 0, &space).unwrap();
            assert_eq!(edge.bond_type, BondType::Double);
            assert_eq!(edge.src, ApRef::new(VertexId(1), 0));
            assert_eq!(edge.trg, ApRef::new(VertexId(2), 0));
            assert_eq!(edge.src_class, class("ene:0"));
            assert_eq!(a.ap(0).unwrap().free_connections(), 0);
            assert_eq!(b.ap(0).unwrap().free_connections(), 0);
            assert_eq!(b.ap(1).unwrap().free_connections(), 1);
        }

        #[test]
        fn bond_type_comes_from_target_class_rule() {
            let space = space();
            let mut a = empty_with(&[("ene:0", 2)]);
            let mut b = empty_with(&[("amide:0", 1)]);
            b.set_id(VertexId(2));
            let edge = a.connect(&mut b, 0, 0, &space).unwrap();
            assert_eq!(edge.bond_type, BondType::Single);
            assert_eq!(a.ap(0).unwrap().free_connections(), 1);
        }

        #[test]
        fn unavailable_ap_yields_no_edge_and_no_change() {
            let space = space();
            let mut a = empty_with(&[("amide:0", 1)]);
            let mut b = empty_with(&[("amide:1", 1)]);
            b.set_id(VertexId(2));
            b.update_attachment_point(0, -1).unwrap();
            let before = (a.clone(), b.clone());

            let err = a.connect(&mut b, 0, 0, &space).unwrap_err();
            assert!(matches!(err, GraphError::ApUnavailable { index: 0, .. }));
            assert_eq!((a.clone(), b.clone()), before);

            let err = b.connect(&mut a, 0, 0, &space).unwrap_err();
            assert!(matches!(err, GraphError::ApUnavailable { .. }));
            assert_eq!((a, b), before);
        }

        #[test]
        fn insufficient_valence_yields_no_edge_and_no_change() {
            let space = space();
            let mut a = empty_with(&[("amide:0", 1)]);
            let mut b = empty_with(&[("ene:0", 2)]);
            b.set_id(VertexId(2));
            let before = (a.clone(), b.clone());
            let err = a.connect(&mut b, 0, 0, &space).unwrap_err();
            assert!(matches!(
                err,
                GraphError::InsufficientValence { needed: 2, available: 1, .. }
            ));
            assert_eq!((a, b), before);
        }

        #[test]
        fn out_of_range_index_is_rejected() {
            let space = space();
            let mut a = empty_with(&[("amide:0", 1)]);
            let mut b = empty_with(&[("amide:1", 1)]);
            assert!(matches!(
                a.connect(&mut b, 0, 5, &space),
                Err(GraphError::ApIndexOutOfRange { index: 5, .. })
            ));
            assert!(matches!(
                a.connect(&mut b, 5, 0, &space),
                Err(GraphError::ApIndexOutOfRange { index: 5, .. })
            ));
        }

        #[test]
        fn random_connection_respects_free_connections() {
            let mut rng = StdRng::seed_from_u64(11);
            for _ in 0..50 {
                let mut a = empty_with(&[("ene:0", 2), ("amide:0", 1)]);
                let mut b = empty_with(&[("ene:1", 3)]);
                b.set_id(VertexId(2));
                let edge = a.connect_random(&mut b, &mut rng).unwrap();
                let src_ap = a.ap(edge.src.ap).unwrap();
                assert_eq!(
                    src_ap.free_connections() + edge.bond_type.valence(),
                    src_ap.total_connections()
                );
                assert_eq!(
                    b.ap(0).unwrap().free_connections(),
                    3 - edge.bond_type.valence()
                );
            }
        }

        #[test]
        fn random_connection_is_reproducible_with_same_seed() {
            let run = |seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let mut a = empty_with(&[("ene:0", 2), ("amide:0", 1), ("ene:1", 2)]);
                let mut b = empty_with(&[("ene:1", 2), ("amide:1", 1)]);
                b.set_id(VertexId(2));
                a.connect_random(&mut b, &mut rng).unwrap()
            };
            assert_eq!(run(5), run(5));
        }

        #[test]
        fn random_connection_fails_without_free_ap() {
            let mut rng = StdRng::seed_from_u64(1);
            let mut a = empty_with(&[("amide:0", 1)]);
            a.update_attachment_point(0, -1).unwrap();
            let mut b = empty_with(&[("amide:1", 1)]);
            assert!(matches!(
                a.connect_random(&mut b, &mut rng),
                Err(GraphError::NoFreeAttachmentPoint(_))
            ));
        }
    }

    mod same_as {
        use super::*;

        #[test]
        fn ignores_vertex_ids_and_ap_order() {
            let a = empty_with(&[("amide:0", 1), ("ene:0", 2)]);
            let mut b = empty_with(&[("ene:0", 2), ("amide:0", 1)]);
            b.set_id(VertexId(99));
            let mut reason = String::new();
            assert!(a.same_as(&b, &mut reason));
            assert!(reason.is_empty());
        }

        #[test]
        fn different_class_is_reported() {
            let a = empty_with(&[("amide:0", 1), ("ene:0", 2)]);
            let b = empty_with(&[("amide:1", 1), ("ene:0", 2)]);
            let mut reason = String::new();
            assert!(!a.same_as(&b, &mut reason));
            assert!(reason.contains("No corresponding AP"));
        }

        #[test]
        fn different_free_ap_count_is_reported() {
            let a = empty_with(&[("amide:0", 1)]);
            let mut b = empty_with(&[("amide:0", 1)]);
            b.update_attachment_point(0, -1).unwrap();
            let mut reason = String::new();
            assert!(!a.same_as(&b, &mut reason));
            assert!(reason.contains("free APs"));
        }

        #[test]
        fn duplicate_classes_need_a_bijection() {
            let a = empty_with(&[("amide:0", 1), ("amide:0", 1)]);
            let b = empty_with(&[("amide:0", 1), ("ene:0", 1)]);
            let mut reason = String::new();
            assert!(!a.same_as(&b, &mut reason));
        }

        #[test]
        fn origin_of_the_vertex_does_not_matter() {
            let a = fragment_vertex(1);
            let mut b = fragment_vertex(2);
            if let VertexKind::Fragment(fragment) = &mut b.kind {
                fragment.building_block = 7;
            }
            let c = Vertex::empty(
                VertexId(3),
                vec![
                    AttachmentPoint::new(Some(0), class("amide:0"), None, 1),
                    AttachmentPoint::new(Some(0), class("amide:1"), None, 1),
                ],
            );
            let mut reason = String::new();
            assert!(a.same_as(&b, &mut reason), "{reason}");
            assert!(a.same_as(&c, &mut reason), "{reason}");
            assert!(reason.is_empty());
        }
    }
}
