//! The fragment space: building-block catalogs and the rules for bonding attachment points.
//!
//! A [`FragmentSpace`] is read-only once built and may be shared freely between threads.

mod loader;

pub use loader::LibraryLoadError;

use crate::core::io::tags;
use crate::core::models::ap_class::ApClass;
use crate::core::models::attachment_point::AttachmentPoint;
use crate::core::models::bond::BondType;
use crate::core::models::error::GraphError;
use crate::core::models::ids::VertexId;
use crate::core::models::substructure::Substructure;
use crate::core::models::symmetry::{SymmetricSet, detect_symmetric_ap_sets};
use crate::core::models::vertex::{BuildingBlockType, Fragment, Vertex, VertexKind};
use std::collections::{HashMap, HashSet};

/// A catalog entry from which vertices are instantiated.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingBlock {
    pub name: String,
    pub substructure: Substructure,
    /// Template attachment points, all fully free.
    pub attachment_points: Vec<AttachmentPoint>,
    pub symmetric_sets: Vec<SymmetricSet>,
}

#[derive(Debug, Clone, Default)]
pub struct FragmentSpace {
    scaffolds: Vec<BuildingBlock>,
    fragments: Vec<BuildingBlock>,
    capping_groups: Vec<BuildingBlock>,
    /// AP-class rule to the bond type used when an AP of that rule is bonded.
    bond_orders: HashMap<String, BondType>,
    /// Source class to the set of classes it may bond to.
    compatibility: HashMap<ApClass, HashSet<ApClass>>,
}

impl FragmentSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bond_order(&mut self, rule: &str, bond: BondType) {
        self.bond_orders.insert(rule.to_string(), bond);
    }

    /// Declares that APs of class `src` may bond to APs of class `trg`.
    pub fn add_compatibility(&mut self, src: ApClass, trg: ApClass) {
        self.compatibility.entry(src).or_default().insert(trg);
    }

    /// Adds a building block to a catalog and returns its index there.
    ///
    /// Compatibility rules must be in place first: symmetric AP sets are detected here.
    pub fn add_building_block(
        &mut self,
        bb_type: BuildingBlockType,
        name: &str,
        substructure: Substructure,
        attachment_points: Vec<AttachmentPoint>,
    ) -> usize {
        let symmetric_sets = detect_symmetric_ap_sets(&attachment_points, &substructure, self);
        let block = BuildingBlock {
            name: name.to_string(),
            substructure,
            attachment_points,
            symmetric_sets,
        };
        let catalog = self.catalog_mut(bb_type);
        catalog.push(block);
        catalog.len() - 1
    }

    fn catalog(&self, bb_type: BuildingBlockType) -> &[BuildingBlock] {
        match bb_type {
            BuildingBlockType::Scaffold => &self.scaffolds,
            BuildingBlockType::Fragment => &self.fragments,
            BuildingBlockType::CappingGroup => &self.capping_groups,
        }
    }

    fn catalog_mut(&mut self, bb_type: BuildingBlockType) -> &mut Vec<BuildingBlock> {
        match bb_type {
            BuildingBlockType::Scaffold => &mut self.scaffolds,
            BuildingBlockType::Fragment => &mut self.fragments,
            BuildingBlockType::CappingGroup => &mut self.capping_groups,
        }
    }

    pub fn building_block(&self, bb_type: BuildingBlockType, index: usize) -> Option<&BuildingBlock> {
        self.catalog(bb_type).get(index)
    }

    pub fn building_block_count(&self, bb_type: BuildingBlockType) -> usize {
        self.catalog(bb_type).len()
    }

    /// Creates a fresh vertex from catalog entry `index` under the ID `id`.
    ///
    /// The vertex is a ring-closing vertex iff it has exactly one attachment point and that
    /// point carries a reserved ring-closure class.
    pub fn vertex_from_library(
        &self,
        bb_type: BuildingBlockType,
        index: usize,
        id: VertexId,
    ) -> Result<Vertex, GraphError> {
        let block = self
            .building_block(bb_type, index)
            .ok_or(GraphError::UnknownBuildingBlock {
                kind: bb_type.label(),
                index,
            })?;
        let fragment = Fragment {
            building_block: index,
            substructure: block.substructure.clone(),
        };
        let is_ring_closing = block.attachment_points.len() == 1
            && block.attachment_points[0]
                .class
                .as_ref()
                .is_some_and(tags::is_ring_closure_class);
        let kind = if is_ring_closing {
            VertexKind::RingClosing {
                origin: bb_type,
                fragment,
            }
        } else {
            VertexKind::from_library(bb_type, fragment)
        };
        let mut vertex = Vertex::new(id, kind, block.attachment_points.clone());
        vertex.set_symmetric_ap_sets(block.symmetric_sets.clone());
        Ok(vertex)
    }

    /// Bond type for APs of `class`, looked up by the class rule. Unknown rules bond with
    /// [`BondType::Single`].
    pub fn bond_order_for_ap_class(&self, class: &ApClass) -> BondType {
        self.bond_orders
            .get(class.rule())
            .copied()
            .unwrap_or(BondType::Single)
    }

    /// Like [`FragmentSpace::bond_order_for_ap_class`], with [`BondType::Single`] for
    /// attachment points without a class.
    pub fn bond_type_for(&self, class: Option<&ApClass>) -> BondType {
        class.map_or(BondType::Single, |c| self.bond_order_for_ap_class(c))
    }

    /// Free connections a new attachment point of `class` starts with.
    pub fn connections_for_class(&self, class: Option<&ApClass>) -> u32 {
        self.bond_type_for(class).valence().max(1)
    }

    pub fn is_class_compatible(&self, src: &ApClass, trg: &ApClass) -> bool {
        self.compatibility
            .get(src)
            .is_some_and(|allowed| allowed.contains(trg))
    }

    pub fn compatible_classes(&self, src: &ApClass) -> impl Iterator<Item = &ApClass> {
        self.compatibility.get(src).into_iter().flatten()
    }
}
