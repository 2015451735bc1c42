use super::attachment_point::AttachmentPoint;
use super::substructure::Substructure;
use crate::core::fragspace::FragmentSpace;
use std::collections::HashSet;
use std::hash::Hash;

/// A group of interchangeable members, kept in the order they were found.
///
/// Vertices use `SymmetricSet<usize>` for attachment-point indices; graphs use it with
/// vertex IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymmetricSet<T = usize> {
    members: Vec<T>,
}

impl<T: PartialEq + Copy> SymmetricSet<T> {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
        }
    }

    pub fn from_members(members: impl IntoIterator<Item = T>) -> Self {
        let mut set = Self::new();
        for m in members {
            set.add(m);
        }
        set
    }

    /// Adds a member; returns `false` if it was already present.
    pub fn add(&mut self, member: T) -> bool {
        if self.members.contains(&member) {
            return false;
        }
        self.members.push(member);
        true
    }

    pub fn remove(&mut self, member: T) -> bool {
        let before = self.members.len();
        self.members.retain(|m| *m != member);
        before != self.members.len()
    }

    pub fn contains(&self, member: T) -> bool {
        self.members.contains(&member)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[T] {
        &self.members
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.members.iter().copied()
    }

    pub fn map<U: PartialEq + Copy>(&self, f: impl Fn(T) -> U) -> SymmetricSet<U> {
        SymmetricSet::from_members(self.members.iter().map(|m| f(*m)))
    }
}

impl<T: PartialEq + Copy> Default for SymmetricSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash + Copy> SymmetricSet<T> {
    /// Membership comparison ignoring insertion order.
    pub fn same_members(&self, other: &SymmetricSet<T>) -> bool {
        let a: HashSet<T> = self.members.iter().copied().collect();
        let b: HashSet<T> = other.members.iter().copied().collect();
        a == b
    }
}

fn classes_allow_symmetry(a: &AttachmentPoint, b: &AttachmentPoint, space: &FragmentSpace) -> bool {
    match (&a.class, &b.class) {
        (Some(ca), Some(cb)) => space.is_class_compatible(ca, cb) && space.is_class_compatible(cb, ca),
        (None, None) => true,
        _ => false,
    }
}

/// Groups attachment points whose source atoms have an equivalent environment and whose
/// classes are mutually compatible.
///
/// The partition is greedy: each index not yet placed in an earlier set seeds a new set,
/// which collects every later index that pairs with the seed. Later indices are not checked
/// against earlier sets, so the result is not a transitive closure. Singleton sets are
/// dropped. Attachment points without a source atom never take part.
pub fn detect_symmetric_ap_sets(
    aps: &[AttachmentPoint],
    substructure: &Substructure,
    space: &FragmentSpace,
) -> Vec<SymmetricSet> {
    let mut sets: Vec<SymmetricSet> = Vec::new();
    let mut placed: HashSet<usize> = HashSet::new();

    for i in 0..aps.len() {
        if placed.contains(&i) {
            continue;
        }
        let Some(atom_i) = aps[i].atom_index else {
            continue;
        };
        let mut set = SymmetricSet::from_members([i]);
        for j in (i + 1)..aps.len() {
            let Some(atom_j) = aps[j].atom_index else {
                continue;
            };
            if substructure.has_equivalent_environment(atom_i, atom_j)
                && classes_allow_symmetry(&aps[i], &aps[j], space)
            {
                set.add(j);
            }
        }
        if set.len() > 1 {
            placed.extend(set.iter());
            sets.push(set);
        }
    }

    sets
}
