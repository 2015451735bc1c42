use crate::core::models::ap_class::ApClass;
use phf::{Map, Set, phf_map, phf_set};

pub const TITLE: &str = "TITLE";
pub const GRAPH_ENCODING: &str = "GraphENC";
pub const GRAPH_CODE: &str = "GCODE";
pub const UID: &str = "UID";
pub const SMILES: &str = "SMILES";
pub const FITNESS: &str = "FITNESS";
pub const MOL_ERROR: &str = "MOL_ERROR";
pub const GRAPH_LEVEL: &str = "GRAPH_LEVEL";
pub const GRAPH_MESSAGE: &str = "GraphMsg";

/// Placeholder identifier for candidates whose record carries no `UID`.
pub const NO_UID: &str = "noUID";

/// Line separating the property block of a structure record from its body.
pub const STRUCTURE_MARKER: &str = "@STRUCTURE";

/// AP classes reserved for ring-closing vertices.
pub static RING_CLOSURE_AP_CLASSES: Set<&'static str> = phf_set! {
    "ATplus:0", "ATminus:0", "ATneutral:0",
};

/// Class a ring-closing AP must pair with to close a ring.
pub static RING_CLOSURE_PARTNERS: Map<&'static str, &'static str> = phf_map! {
    "ATplus:0" => "ATminus:0",
    "ATminus:0" => "ATplus:0",
    "ATneutral:0" => "ATneutral:0",
};

pub fn is_ring_closure_class(class: &ApClass) -> bool {
    RING_CLOSURE_AP_CLASSES.contains(class.to_string().as_str())
}

/// Whether two ring-closing classes may close a ring together.
pub fn ring_closure_partners(a: &ApClass, b: &ApClass) -> bool {
    RING_CLOSURE_PARTNERS
        .get(a.to_string().as_str())
        .is_some_and(|partner| *partner == b.to_string())
}
