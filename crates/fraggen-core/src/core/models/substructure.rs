use nalgebra::Point3;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct SubstructureAtom {
    pub element: String,
    pub position: Point3<f64>,
}

impl SubstructureAtom {
    pub fn new(element: &str, position: Point3<f64>) -> Self {
        Self {
            element: element.to_string(),
            position,
        }
    }

    pub fn is_hydrogen(&self) -> bool {
        self.element.eq_ignore_ascii_case("H")
    }
}

/// Chemical content carried by a building block: atoms and the bonds between them.
///
/// Only the connectivity information needed by the graph layer is kept; perception of
/// aromaticity, rings or geometry is left to the structure builder.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Substructure {
    atoms: Vec<SubstructureAtom>,
    bonds: Vec<(usize, usize)>,
}

impl Substructure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_atom(&mut self, atom: SubstructureAtom) -> usize {
        self.atoms.push(atom);
        self.atoms.len() - 1
    }

    /// Adds a bond between two existing, distinct atoms.
    ///
    /// Returns `None` if either index is out of range or both indices are equal.
    pub fn add_bond(&mut self, a: usize, b: usize) -> Option<()> {
        if a == b || a >= self.atoms.len() || b >= self.atoms.len() {
            return None;
        }
        self.bonds.push((a, b));
        Some(())
    }

    pub fn atom(&self, index: usize) -> Option<&SubstructureAtom> {
        self.atoms.get(index)
    }

    pub fn atoms(&self) -> &[SubstructureAtom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[(usize, usize)] {
        &self.bonds
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn heavy_atom_count(&self) -> usize {
        self.atoms.iter().filter(|a| !a.is_hydrogen()).count()
    }

    pub fn connected_bond_count(&self, index: usize) -> usize {
        self.bonds
            .iter()
            .filter(|(a, b)| *a == index || *b == index)
            .count()
    }

    pub fn connected_atom_count(&self, index: usize) -> usize {
        self.bonds
            .iter()
            .filter_map(|&(a, b)| match (a == index, b == index) {
                (true, false) => Some(b),
                (false, true) => Some(a),
                _ => None,
            })
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Same element symbol, same number of bonds and same number of bonded neighbours.
    pub fn has_equivalent_environment(&self, a: usize, b: usize) -> bool {
        match (self.atom(a), self.atom(b)) {
            (Some(atom_a), Some(atom_b)) => {
                atom_a.element == atom_b.element
                    && self.connected_bond_count(a) == self.connected_bond_count(b)
                    && self.connected_atom_count(a) == self.connected_atom_count(b)
            }
            _ => false,
        }
    }
}
