use super::FragmentSpace;
use crate::core::models::ap_class::{ApClass, ParseApClassError};
use crate::core::models::attachment_point::AttachmentPoint;
use crate::core::models::bond::BondType;
use crate::core::models::substructure::{Substructure, SubstructureAtom};
use crate::core::models::vertex::BuildingBlockType;
use nalgebra::{Point3, Vector3};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum LibraryLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid AP class in '{context}': {source}")]
    InvalidApClass {
        context: String,
        source: ParseApClassError,
    },
    #[error("Invalid bond order '{value}' for rule '{rule}'")]
    InvalidBondOrder { rule: String, value: String },
    #[error("Building block '{block}' references non-existent atom {atom}")]
    InvalidAtomIndex { block: String, atom: usize },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBondOrder {
    Order(u32),
    Name(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawAtom {
    element: String,
    #[serde(default)]
    position: [f64; 3],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawAttachmentPoint {
    atom: Option<usize>,
    class: String,
    direction: Option<[f64; 3]>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawBuildingBlock {
    name: String,
    #[serde(default)]
    atoms: Vec<RawAtom>,
    #[serde(default)]
    bonds: Vec<[usize; 2]>,
    #[serde(default)]
    attachment_points: Vec<RawAttachmentPoint>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct RawLibrary {
    #[serde(default)]
    bond_orders: BTreeMap<String, RawBondOrder>,
    #[serde(default)]
    compatibility: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    scaffolds: Vec<RawBuildingBlock>,
    #[serde(default)]
    fragments: Vec<RawBuildingBlock>,
    #[serde(default)]
    capping_groups: Vec<RawBuildingBlock>,
}

fn parse_class(raw: &str, context: &str) -> Result<ApClass, LibraryLoadError> {
    raw.parse().map_err(|source| LibraryLoadError::InvalidApClass {
        context: context.to_string(),
        source,
    })
}

impl FragmentSpace {
    /// Loads a fragment space from a TOML library file.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryLoadError::Io`] or [`LibraryLoadError::Toml`] when the file cannot
    /// be read or parsed, and the remaining variants for inconsistent content.
    pub fn load(path: &Path) -> Result<Self, LibraryLoadError> {
        let path_str = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| LibraryLoadError::Io {
            path: path_str.clone(),
            source: e,
        })?;
        let space = Self::from_toml_str(&content, &path_str)?;
        info!(
            path = %path_str,
            scaffolds = space.building_block_count(BuildingBlockType::Scaffold),
            fragments = space.building_block_count(BuildingBlockType::Fragment),
            capping_groups = space.building_block_count(BuildingBlockType::CappingGroup),
            "Loaded fragment space."
        );
        Ok(space)
    }

    /// Parses library content; `origin` names the source in error messages.
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, LibraryLoadError> {
        let raw: RawLibrary = toml::from_str(content).map_err(|e| LibraryLoadError::Toml {
            path: origin.to_string(),
            source: e,
        })?;

        let mut space = FragmentSpace::new();

        for (rule, order) in &raw.bond_orders {
            let bond = match order {
                RawBondOrder::Order(n) => BondType::from_order(*n),
                RawBondOrder::Name(name) => name.parse::<BondType>().ok(),
            }
            .ok_or_else(|| LibraryLoadError::InvalidBondOrder {
                rule: rule.clone(),
                value: match order {
                    RawBondOrder::Order(n) => n.to_string(),
                    RawBondOrder::Name(name) => name.clone(),
                },
            })?;
            space.set_bond_order(rule, bond);
        }

        for (src, targets) in &raw.compatibility {
            let src_class = parse_class(src, "compatibility")?;
            for trg in targets {
                let trg_class = parse_class(trg, "compatibility")?;
                space.add_compatibility(src_class.clone(), trg_class);
            }
        }

        for (bb_type, blocks) in [
            (BuildingBlockType::Scaffold, &raw.scaffolds),
            (BuildingBlockType::Fragment, &raw.fragments),
            (BuildingBlockType::CappingGroup, &raw.capping_groups),
        ] {
            for block in blocks {
                let (substructure, aps) = space.build_block(block)?;
                let index = space.add_building_block(bb_type, &block.name, substructure, aps);
                debug!(%bb_type, index, name = %block.name, "Registered building block.");
            }
        }

        Ok(space)
    }

    fn build_block(
        &self,
        block: &RawBuildingBlock,
    ) -> Result<(Substructure, Vec<AttachmentPoint>), LibraryLoadError> {
        let mut substructure = Substructure::new();
        for atom in &block.atoms {
            substructure.add_atom(SubstructureAtom::new(
                &atom.element,
                Point3::from(atom.position),
            ));
        }
        for &[a, b] in &block.bonds {
            substructure
                .add_bond(a, b)
                .ok_or_else(|| LibraryLoadError::InvalidAtomIndex {
                    block: block.name.clone(),
                    atom: a.max(b),
                })?;
        }

        let mut aps = Vec::with_capacity(block.attachment_points.len());
        for raw_ap in &block.attachment_points {
            if let Some(atom) = raw_ap.atom {
                if atom >= substructure.atom_count() {
                    return Err(LibraryLoadError::InvalidAtomIndex {
                        block: block.name.clone(),
                        atom,
                    });
                }
            }
            let class = parse_class(&raw_ap.class, &block.name)?;
            let connections = self.connections_for_class(Some(&class));
            aps.push(AttachmentPoint::new(
                raw_ap.atom,
                Some(class),
                raw_ap.direction.map(Vector3::from),
                connections,
            ));
        }
        Ok((substructure, aps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::VertexId;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    const LIBRARY: &str = r#"
[bond-orders]
amide = 1
ene = "double"

[compatibility]
"amide:0" = ["amide:1"]
"amide:1" = ["amide:0"]
"ene:0" = ["ene:0"]

[[scaffolds]]
name = "benzene-core"
atoms = [
    { element = "C", position = [0.0, 1.4, 0.0] },
    { element = "C", position = [1.2, 0.7, 0.0] },
    { element = "N", position = [1.2, -0.7, 0.0] },
]
bonds = [[0, 1], [1, 2]]
attachment-points = [
    { atom = 0, class = "amide:0", direction = [0.0, 2.4, 0.0] },
    { atom = 2, class = "amide:0" },
]

[[fragments]]
name = "vinyl"
atoms = [{ element = "C" }, { element = "C", position = [1.3, 0.0, 0.0] }]
bonds = [[0, 1]]
attachment-points = [
    { atom = 0, class = "ene:0" },
    { atom = 1, class = "amide:1" },
]

[[capping-groups]]
name = "rc-minus"
atoms = [{ element = "ATM" }]
attachment-points = [{ atom = 0, class = "ATminus:0" }]
"#;

    fn write_library(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("library.toml");
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn load_reads_catalogs_and_rules() {
        let dir = TempDir::new().unwrap();
        let space = FragmentSpace::load(&write_library(&dir, LIBRARY)).unwrap();

        assert_eq!(space.building_block_count(BuildingBlockType::Scaffold), 1);
        assert_eq!(space.building_block_count(BuildingBlockType::Fragment), 1);
        assert_eq!(space.building_block_count(BuildingBlockType::CappingGroup), 1);

        let amide0: ApClass = "amide:0".parse().unwrap();
        let amide1: ApClass = "amide:1".parse().unwrap();
        assert!(space.is_class_compatible(&amide0, &amide1));
        assert_eq!(
            space.bond_order_for_ap_class(&"ene:0".parse().unwrap()),
            BondType::Double
        );

        let vinyl = space
            .building_block(BuildingBlockType::Fragment, 0)
            .unwrap();
        assert_eq!(vinyl.attachment_points[0].total_connections(), 2);
        assert_eq!(vinyl.attachment_points[1].total_connections(), 1);
    }

    #[test]
    fn scaffold_aps_on_different_environments_are_not_symmetric() {
        let space = FragmentSpace::from_toml_str(LIBRARY, "inline").unwrap();
        let core = space.building_block(BuildingBlockType::Scaffold, 0).unwrap();
        assert!(core.symmetric_sets.is_empty());
        assert_eq!(
            core.attachment_points[0].direction,
            Some(Vector3::new(0.0, 2.4, 0.0))
        );
    }

    #[test]
    fn ring_closing_capping_group_is_detected() {
        let space = FragmentSpace::from_toml_str(LIBRARY, "inline").unwrap();
        let v = space
            .vertex_from_library(BuildingBlockType::CappingGroup, 0, VertexId(1))
            .unwrap();
        assert!(v.is_ring_closing());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = FragmentSpace::load(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(LibraryLoadError::Io { .. })));
    }

    #[test]
    fn malformed_toml_is_reported() {
        let result = FragmentSpace::from_toml_str("[[fragments]\nname=", "bad");
        assert!(matches!(result, Err(LibraryLoadError::Toml { .. })));
    }

    #[test]
    fn invalid_content_is_rejected() {
        let bad_class = "[[fragments]]\nname = \"x\"\natoms = [{ element = \"C\" }]\nattachment-points = [{ atom = 0, class = \"noseparator\" }]\n";
        assert!(matches!(
            FragmentSpace::from_toml_str(bad_class, "inline"),
            Err(LibraryLoadError::InvalidApClass { .. })
        ));

        let bad_atom = "[[fragments]]\nname = \"x\"\natoms = [{ element = \"C\" }]\nattachment-points = [{ atom = 3, class = \"a:0\" }]\n";
        assert!(matches!(
            FragmentSpace::from_toml_str(bad_atom, "inline"),
            Err(LibraryLoadError::InvalidAtomIndex { atom: 3, .. })
        ));

        let bad_bond = "[[fragments]]\nname = \"x\"\natoms = [{ element = \"C\" }]\nbonds = [[0, 1]]\n";
        assert!(matches!(
            FragmentSpace::from_toml_str(bad_bond, "inline"),
            Err(LibraryLoadError::InvalidAtomIndex { atom: 1, .. })
        ));

        let bad_order = "[bond-orders]\nx = 7\n";
        assert!(matches!(
            FragmentSpace::from_toml_str(bad_order, "inline"),
            Err(LibraryLoadError::InvalidBondOrder { .. })
        ));
    }
}
