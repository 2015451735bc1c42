use super::ap_class::ApClass;
use super::bond::BondType;
use super::edge::{ApRef, Edge};
use super::error::GraphError;
use super::ids::{GraphId, IdGenerator, VertexId, VertexKey};
use super::ring::Ring;
use super::symmetry::SymmetricSet;
use super::vertex::{BuildingBlockType, MutationType, Vertex};
use crate::core::fragspace::FragmentSpace;
use crate::core::io::{graph_string, tags};
use rand::Rng;
use slotmap::SlotMap;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use tracing::debug;

/// A candidate molecule as a graph of building blocks.
///
/// The graph exclusively owns its vertices, edges and rings. Edges and rings refer to
/// vertices by [`VertexId`]. The first vertex added is the root; editing operations keep
/// every other vertex reachable from it through edges.
#[derive(Debug, Clone)]
pub struct Graph {
    id: GraphId,
    /// Vertex storage.
    vertices: SlotMap<VertexKey, Vertex>,
    /// Insertion order of vertices; the first entry is the root.
    order: Vec<VertexKey>,
    /// Lookup from vertex ID to storage key.
    id_map: HashMap<VertexId, VertexKey>,
    edges: Vec<Edge>,
    rings: Vec<Ring>,
    /// Groups of vertices grown symmetrically from symmetric attachment points.
    symmetric_sets: Vec<SymmetricSet<VertexId>>,
    message: Option<String>,
    level: Option<i32>,
}

impl Graph {
    pub fn new(id: GraphId) -> Self {
        Self {
            id,
            vertices: SlotMap::with_key(),
            order: Vec::new(),
            id_map: HashMap::new(),
            edges: Vec::new(),
            rings: Vec::new(),
            symmetric_sets: Vec::new(),
            message: None,
            level: None,
        }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn set_id(&mut self, id: GraphId) {
        self.id = id;
        for vertex in self.vertices.values_mut() {
            vertex.set_owner(Some(id));
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn set_message(&mut self, message: Option<String>) {
        self.message = message;
    }

    pub fn level(&self) -> Option<i32> {
        self.level
    }

    pub fn set_level(&mut self, level: Option<i32>) {
        self.level = level;
    }

    fn key_of(&self, id: VertexId) -> Result<VertexKey, GraphError> {
        self.id_map
            .get(&id)
            .copied()
            .ok_or(GraphError::VertexNotFound(id))
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.id_map.get(&id).and_then(|k| self.vertices.get(*k))
    }

    pub(crate) fn vertex_mut(&mut self, id: VertexId) -> Result<&mut Vertex, GraphError> {
        let key = self.key_of(id)?;
        self.vertices
            .get_mut(key)
            .ok_or(GraphError::VertexNotFound(id))
    }

    pub fn contains_vertex(&self, id: VertexId) -> bool {
        self.id_map.contains_key(&id)
    }

    /// Vertices in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.order.iter().filter_map(|k| self.vertices.get(*k))
    }

    pub fn vertex_ids(&self) -> Vec<VertexId> {
        self.vertices().map(Vertex::id).collect()
    }

    pub fn vertex_count(&self) -> usize {
        self.order.len()
    }

    pub fn vertex_position(&self, id: VertexId) -> Option<usize> {
        let key = self.id_map.get(&id)?;
        self.order.iter().position(|k| k == key)
    }

    pub fn vertex_at(&self, position: usize) -> Option<&Vertex> {
        self.order.get(position).and_then(|k| self.vertices.get(*k))
    }

    pub fn root(&self) -> Option<VertexId> {
        self.vertex_at(0).map(Vertex::id)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_between(&self, a: VertexId, b: VertexId) -> Option<&Edge> {
        self.edges.iter().find(|e| {
            (e.src.vertex == a && e.trg.vertex == b) || (e.src.vertex == b && e.trg.vertex == a)
        })
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    pub fn ring_count(&self) -> usize {
        self.rings.len()
    }

    pub fn rings_containing(&self, id: VertexId) -> impl Iterator<Item = &Ring> {
        self.rings.iter().filter(move |r| r.contains(id))
    }

    pub fn symmetric_vertex_sets(&self) -> &[SymmetricSet<VertexId>] {
        &self.symmetric_sets
    }

    pub fn symmetric_vertex_set_of(&self, id: VertexId) -> Option<&SymmetricSet<VertexId>> {
        self.symmetric_sets.iter().find(|s| s.contains(id))
    }

    /// Records a set of symmetric vertices. Every member must be in the graph and belong to
    /// no other set.
    pub fn add_symmetric_vertex_set(
        &mut self,
        set: SymmetricSet<VertexId>,
    ) -> Result<(), GraphError> {
        if set.len() < 2 {
            return Err(GraphError::InvalidEdit(
                "a symmetric set needs at least two vertices".to_string(),
            ));
        }
        for id in set.iter() {
            if !self.contains_vertex(id) {
                return Err(GraphError::VertexNotFound(id));
            }
            if self.symmetric_vertex_set_of(id).is_some() {
                return Err(GraphError::InvalidEdit(format!(
                    "vertex {id} already belongs to a symmetric set"
                )));
            }
        }
        self.symmetric_sets.push(set);
        Ok(())
    }

    /// Adds a vertex and claims ownership of it.
    pub fn add_vertex(&mut self, mut vertex: Vertex) -> Result<VertexId, GraphError> {
        let id = vertex.id();
        if self.contains_vertex(id) {
            return Err(GraphError::DuplicateVertex(id));
        }
        vertex.set_owner(Some(self.id));
        let key = self.vertices.insert(vertex);
        self.order.push(key);
        self.id_map.insert(id, key);
        Ok(id)
    }

    /// Removes a vertex with its edges, rings and symmetric-set memberships.
    ///
    /// Attachment points on the other side of removed edges get their connections back.
    /// Fails with [`GraphError::Disconnected`] when the rest of the graph would no longer
    /// hang together; use [`Graph::delete_branch`] to drop a whole subtree. The root can
    /// only go once it is the last vertex.
    pub fn remove_vertex(&mut self, id: VertexId) -> Result<(), GraphError> {
        self.key_of(id)?;
        if self.root() == Some(id) && self.vertex_count() > 1 {
            return Err(GraphError::InvalidEdit(format!(
                "cannot remove root vertex {id} while other vertices remain"
            )));
        }
        if let Some(lost) = self.first_unreachable_without(Some(id), None) {
            return Err(GraphError::Disconnected(lost));
        }
        self.detach_vertex(id)
    }

    fn detach_vertex(&mut self, id: VertexId) -> Result<(), GraphError> {
        let key = self.key_of(id)?;

        let incident: Vec<Edge> = self.edges.iter().filter(|e| e.involves(id)).cloned().collect();
        let mut restored: HashMap<ApRef, u32> = HashMap::new();
        for edge in &incident {
            if let Some(other) = edge.other_end(id) {
                *restored.entry(other).or_default() += edge.bond_type.valence();
            }
        }
        for (end, valence) in &restored {
            self.check_restorable(*end, *valence)?;
        }
        for (end, valence) in restored {
            self.vertex_mut(end.vertex)?
                .update_attachment_point(end.ap, valence as i32)?;
        }
        self.edges.retain(|e| !e.involves(id));
        self.rings.retain(|r| !r.contains(id));
        for set in &mut self.symmetric_sets {
            set.remove(id);
        }
        self.symmetric_sets.retain(|s| s.len() > 1);

        self.order.retain(|k| *k != key);
        self.id_map.remove(&id);
        if let Some(mut vertex) = self.vertices.remove(key) {
            vertex.cleanup();
        }
        debug!(vertex = %id, edges = incident.len(), "Removed vertex.");
        Ok(())
    }

    fn pair_mut(
        &mut self,
        a: VertexId,
        b: VertexId,
    ) -> Result<[&mut Vertex; 2], GraphError> {
        if a == b {
            return Err(GraphError::InvalidEdit(format!(
                "cannot bond vertex {a} to itself"
            )));
        }
        let ka = self.key_of(a)?;
        let kb = self.key_of(b)?;
        self.vertices
            .get_disjoint_mut([ka, kb])
            .ok_or(GraphError::VertexNotFound(a))
    }

    fn push_edge(&mut self, edge: Edge) -> &Edge {
        self.edges.push(edge);
        &self.edges[self.edges.len() - 1]
    }

    /// Bonds two attachment points; the bond type follows the target class.
    pub fn connect(
        &mut self,
        src: ApRef,
        trg: ApRef,
        space: &FragmentSpace,
    ) -> Result<&Edge, GraphError> {
        let [s, t] = self.pair_mut(src.vertex, trg.vertex)?;
        let edge = s.connect(t, src.ap, trg.ap, space)?;
        Ok(self.push_edge(edge))
    }

    /// Bonds two attachment points with explicit edge classes.
    pub fn connect_with_classes(
        &mut self,
        src: ApRef,
        trg: ApRef,
        src_class: Option<ApClass>,
        trg_class: Option<ApClass>,
        space: &FragmentSpace,
    ) -> Result<&Edge, GraphError> {
        let [s, t] = self.pair_mut(src.vertex, trg.vertex)?;
        let edge = s.connect_with_classes(t, src.ap, trg.ap, src_class, trg_class, space)?;
        Ok(self.push_edge(edge))
    }

    /// Bonds two attachment points with an explicit bond type and explicit edge classes,
    /// as when replaying a stored graph.
    pub fn connect_exact(
        &mut self,
        src: ApRef,
        trg: ApRef,
        bond: BondType,
        src_class: Option<ApClass>,
        trg_class: Option<ApClass>,
    ) -> Result<&Edge, GraphError> {
        let [s, t] = self.pair_mut(src.vertex, trg.vertex)?;
        let mut edge = s.connect_with_bond(t, src.ap, trg.ap, bond)?;
        edge.src_class = src_class;
        edge.trg_class = trg_class;
        Ok(self.push_edge(edge))
    }

    /// Bonds random free attachment points of two vertices.
    pub fn connect_random<R: Rng + ?Sized>(
        &mut self,
        src: VertexId,
        trg: VertexId,
        rng: &mut R,
    ) -> Result<&Edge, GraphError> {
        let [s, t] = self.pair_mut(src, trg)?;
        let edge = s.connect_random(t, rng)?;
        Ok(self.push_edge(edge))
    }

    fn check_restorable(&self, end: ApRef, valence: u32) -> Result<(), GraphError> {
        let ap = self
            .vertex(end.vertex)
            .ok_or(GraphError::VertexNotFound(end.vertex))?
            .ap(end.ap)
            .ok_or(GraphError::ApIndexOutOfRange {
                vertex: end.vertex,
                index: end.ap,
            })?;
        if ap.free_connections() + valence > ap.total_connections() {
            return Err(GraphError::ValenceOverflow {
                delta: valence as i32,
                total: ap.total_connections(),
            });
        }
        Ok(())
    }

    fn restore_edge_valence(&mut self, edge: &Edge) -> Result<(), GraphError> {
        let valence = edge.bond_type.valence();
        for end in [edge.src, edge.trg] {
            self.check_restorable(end, valence)?;
        }
        for end in [edge.src, edge.trg] {
            self.vertex_mut(end.vertex)?
                .update_attachment_point(end.ap, valence as i32)?;
        }
        Ok(())
    }

    fn edge_index(&self, a: VertexId, b: VertexId) -> Result<usize, GraphError> {
        self.edges
            .iter()
            .position(|e| {
                (e.src.vertex == a && e.trg.vertex == b)
                    || (e.src.vertex == b && e.trg.vertex == a)
            })
            .ok_or(GraphError::EdgeNotFound(a, b))
    }

    /// Removes the edge between two vertices and gives both attachment points their
    /// connections back.
    ///
    /// Only an edge on an alternative path can go: if a vertex would lose its way to the
    /// root the call fails with [`GraphError::Disconnected`] and nothing changes.
    pub fn remove_edge(&mut self, a: VertexId, b: VertexId) -> Result<Edge, GraphError> {
        let index = self.edge_index(a, b)?;
        if let Some(lost) = self.first_unreachable_without(None, Some(index)) {
            return Err(GraphError::Disconnected(lost));
        }
        self.detach_edge(index)
    }

    fn detach_edge(&mut self, index: usize) -> Result<Edge, GraphError> {
        let edge = self.edges[index].clone();
        self.restore_edge_valence(&edge)?;
        self.edges.remove(index);
        Ok(edge)
    }

    /// Adds a ring closure along `path`.
    ///
    /// Every vertex must be in the graph and consecutive vertices must share an edge. When
    /// both ends are ring-closing vertices their classes must be ring-closure partners.
    pub fn add_ring(&mut self, path: Vec<VertexId>, bond: BondType) -> Result<(), GraphError> {
        let ring = Ring::new(path, bond)?;
        for id in ring.vertices() {
            if !self.contains_vertex(*id) {
                return Err(GraphError::VertexNotFound(*id));
            }
        }
        for pair in ring.vertices().windows(2) {
            if self.edge_between(pair[0], pair[1]).is_none() {
                return Err(GraphError::InvalidRing(format!(
                    "vertices {} and {} are not bonded",
                    pair[0], pair[1]
                )));
            }
        }
        let head = self.vertex(ring.head());
        let tail = self.vertex(ring.tail());
        if let (Some(head), Some(tail)) = (head, tail) {
            if head.is_ring_closing() && tail.is_ring_closing() {
                let head_class = head.ap(0).and_then(|ap| ap.class.as_ref());
                let tail_class = tail.ap(0).and_then(|ap| ap.class.as_ref());
                let partners = matches!(
                    (head_class, tail_class),
                    (Some(h), Some(t)) if tags::ring_closure_partners(h, t)
                );
                if !partners {
                    return Err(GraphError::InvalidRing(format!(
                        "ring-closing vertices {} and {} are not compatible",
                        head.id(),
                        tail.id()
                    )));
                }
            }
        }
        if self.rings.iter().any(|r| r.vertices() == ring.vertices()) {
            return Err(GraphError::InvalidRing(format!("duplicate ring {ring}")));
        }
        self.rings.push(ring);
        Ok(())
    }

    /// The vertex this one was grown from, i.e. the source of the edge targeting it.
    pub fn parent(&self, id: VertexId) -> Option<VertexId> {
        self.edges
            .iter()
            .find(|e| e.trg.vertex == id)
            .map(|e| e.src.vertex)
    }

    pub fn children(&self, id: VertexId) -> Vec<VertexId> {
        self.edges
            .iter()
            .filter(|e| e.src.vertex == id)
            .map(|e| e.trg.vertex)
            .collect()
    }

    /// All vertices reachable from `id` through child edges, `id` included, breadth first.
    pub fn branch(&self, id: VertexId) -> Vec<VertexId> {
        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        let mut branch = Vec::new();
        while let Some(current) = queue.pop_front() {
            branch.push(current);
            for child in self.children(current) {
                if seen.insert(child) {
                    queue.push_back(child);
                }
            }
        }
        branch
    }

    /// Creates a vertex from the library and bonds its attachment point `child_ap` to
    /// `parent`. On failure the graph is left unchanged.
    pub fn append_from_library(
        &mut self,
        parent: ApRef,
        bb_type: BuildingBlockType,
        index: usize,
        child_ap: usize,
        space: &FragmentSpace,
        ids: &IdGenerator,
    ) -> Result<VertexId, GraphError> {
        let parent_vertex = self
            .vertex(parent.vertex)
            .ok_or(GraphError::VertexNotFound(parent.vertex))?;
        let parent_level = parent_vertex.level();
        let parent_class = parent_vertex
            .ap(parent.ap)
            .ok_or(GraphError::ApIndexOutOfRange {
                vertex: parent.vertex,
                index: parent.ap,
            })?
            .class
            .clone();

        let mut child = space.vertex_from_library(bb_type, index, ids.next_vertex_id())?;
        let child_class = child
            .ap(child_ap)
            .ok_or(GraphError::ApIndexOutOfRange {
                vertex: child.id(),
                index: child_ap,
            })?
            .class
            .clone();
        if let (Some(pc), Some(cc)) = (&parent_class, &child_class) {
            if !space.is_class_compatible(pc, cc) {
                return Err(GraphError::InvalidEdit(format!(
                    "AP class {pc} does not accept {cc}"
                )));
            }
        }
        child.set_level(parent_level + 1);

        let child_id = self.add_vertex(child)?;
        if let Err(e) = self.connect(parent, ApRef::new(child_id, child_ap), space) {
            self.detach_vertex(child_id)?;
            return Err(e);
        }
        debug!(parent = %parent.vertex, child = %child_id, %bb_type, index, "Appended building block.");
        Ok(child_id)
    }

    /// Removes `id` and everything grown from it. The root cannot be deleted this way.
    pub fn delete_branch(&mut self, id: VertexId) -> Result<Vec<VertexId>, GraphError> {
        if !self.contains_vertex(id) {
            return Err(GraphError::VertexNotFound(id));
        }
        if self.root() == Some(id) {
            return Err(GraphError::InvalidEdit(
                "the root vertex cannot be deleted".to_string(),
            ));
        }
        let branch = self.branch(id);
        for vertex in &branch {
            self.detach_vertex(*vertex)?;
        }
        Ok(branch)
    }

    /// Replaces vertex `id` by a fresh copy of a library building block, keeping the vertex
    /// ID and level.
    ///
    /// Every edge of the old vertex is moved onto a free attachment point of the new one,
    /// preferring the same class and otherwise a class compatible with the other end. Rings
    /// through the vertex are dropped. The edit is all-or-nothing.
    pub fn replace_vertex(
        &mut self,
        id: VertexId,
        bb_type: BuildingBlockType,
        index: usize,
        space: &FragmentSpace,
    ) -> Result<(), GraphError> {
        let key = self.key_of(id)?;
        let old = &self.vertices[key];
        let mut replacement = space.vertex_from_library(bb_type, index, id)?;
        replacement.set_level(old.level());
        replacement.set_owner(old.owner());

        let mut work = self.clone();
        let incident: Vec<Edge> = work.edges.iter().filter(|e| e.involves(id)).cloned().collect();
        for edge in &incident {
            let index = work.edge_index(edge.src.vertex, edge.trg.vertex)?;
            work.detach_edge(index)?;
        }
        work.rings.retain(|r| !r.contains(id));
        work.vertices[key] = replacement;

        for edge in incident {
            let old_is_src = edge.src.vertex == id;
            let (old_class, other) = if old_is_src {
                (edge.src_class.clone(), edge.trg)
            } else {
                (edge.trg_class.clone(), edge.src)
            };
            let other_class = work
                .vertex(other.vertex)
                .and_then(|v| v.ap(other.ap))
                .and_then(|ap| ap.class.clone());
            let new_ap = pick_replacement_ap(
                &work.vertices[key],
                old_class.as_ref(),
                other_class.as_ref(),
                old_is_src,
                edge.bond_type,
                space,
            )
            .ok_or_else(|| {
                GraphError::InvalidEdit(format!(
                    "building block {bb_type} #{index} cannot take the bond to vertex {}",
                    other.vertex
                ))
            })?;
            let new_class = work.vertices[key].ap(new_ap).and_then(|ap| ap.class.clone());
            if old_is_src {
                work.connect_exact(
                    ApRef::new(id, new_ap),
                    other,
                    edge.bond_type,
                    new_class,
                    edge.trg_class,
                )?;
            } else {
                work.connect_exact(
                    other,
                    ApRef::new(id, new_ap),
                    edge.bond_type,
                    edge.src_class,
                    new_class,
                )?;
            }
        }

        *self = work;
        debug!(vertex = %id, %bb_type, index, "Replaced vertex.");
        Ok(())
    }

    /// Whether every vertex can be reached from the root through edges.
    pub fn is_connected(&self) -> bool {
        self.first_unreachable().is_none()
    }

    fn first_unreachable(&self) -> Option<VertexId> {
        self.first_unreachable_without(None, None)
    }

    /// Reachability from the root as if `vertex` and the edge at `edge` were gone.
    fn first_unreachable_without(
        &self,
        vertex: Option<VertexId>,
        edge: Option<usize>,
    ) -> Option<VertexId> {
        let kept = |id: VertexId| Some(id) != vertex;
        let root = self.vertices().map(Vertex::id).find(|id| kept(*id))?;
        let mut adjacency: HashMap<VertexId, Vec<VertexId>> = HashMap::new();
        for (i, e) in self.edges.iter().enumerate() {
            if Some(i) == edge || !kept(e.src.vertex) || !kept(e.trg.vertex) {
                continue;
            }
            adjacency.entry(e.src.vertex).or_default().push(e.trg.vertex);
            adjacency.entry(e.trg.vertex).or_default().push(e.src.vertex);
        }
        let mut seen = HashSet::from([root]);
        let mut queue = VecDeque::from([root]);
        while let Some(current) = queue.pop_front() {
            for next in adjacency.get(&current).into_iter().flatten() {
                if seen.insert(*next) {
                    queue.push_back(*next);
                }
            }
        }
        self.vertices()
            .map(Vertex::id)
            .find(|id| kept(*id) && !seen.contains(id))
    }

    /// Checks every structural invariant of the graph.
    ///
    /// Edge and ring references must resolve, every attachment point's used connections
    /// must equal the valence of the edges on it, and the graph must be connected.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut used: HashMap<ApRef, u32> = HashMap::new();
        for edge in &self.edges {
            for end in [edge.src, edge.trg] {
                let vertex = self
                    .vertex(end.vertex)
                    .ok_or(GraphError::VertexNotFound(end.vertex))?;
                if vertex.ap(end.ap).is_none() {
                    return Err(GraphError::ApIndexOutOfRange {
                        vertex: end.vertex,
                        index: end.ap,
                    });
                }
                *used.entry(end).or_default() += edge.bond_type.valence();
            }
        }
        for vertex in self.vertices() {
            for (index, ap) in vertex.attachment_points().iter().enumerate() {
                let consumed = ap.total_connections() - ap.free_connections();
                let by_edges = used
                    .get(&ApRef::new(vertex.id(), index))
                    .copied()
                    .unwrap_or(0);
                if consumed != by_edges {
                    return Err(GraphError::InvalidEdit(format!(
                        "attachment point {index} of vertex {} has {consumed} used connections but its edges account for {by_edges}",
                        vertex.id()
                    )));
                }
            }
        }
        for ring in &self.rings {
            if let Some(missing) = ring.vertices().iter().find(|v| !self.contains_vertex(**v)) {
                return Err(GraphError::InvalidRing(format!(
                    "ring {ring} references missing vertex {missing}"
                )));
            }
        }
        for set in &self.symmetric_sets {
            if let Some(missing) = set.iter().find(|v| !self.contains_vertex(*v)) {
                return Err(GraphError::VertexNotFound(missing));
            }
        }
        match self.first_unreachable() {
            Some(id) => Err(GraphError::Disconnected(id)),
            None => Ok(()),
        }
    }

    /// Deep copy with a new graph ID and new vertex IDs; structure and AP states are kept.
    pub fn clone_with_fresh_ids(&self, ids: &IdGenerator) -> Graph {
        let mut copy = Graph::new(ids.next_graph_id());
        copy.message = self.message.clone();
        copy.level = self.level;

        let mut remap: HashMap<VertexId, VertexId> = HashMap::new();
        for vertex in self.vertices() {
            let mut v = vertex.clone();
            let new_id = ids.next_vertex_id();
            remap.insert(vertex.id(), new_id);
            v.set_id(new_id);
            v.set_owner(Some(copy.id));
            let key = copy.vertices.insert(v);
            copy.order.push(key);
            copy.id_map.insert(new_id, key);
        }
        let map = |id: VertexId| remap.get(&id).copied().unwrap_or(id);
        copy.edges = self
            .edges
            .iter()
            .map(|e| {
                let mut e = e.clone();
                e.src.vertex = map(e.src.vertex);
                e.trg.vertex = map(e.trg.vertex);
                e
            })
            .collect();
        copy.rings = self
            .rings
            .iter()
            .map(|r| {
                let mut r = r.clone();
                r.remap(map);
                r
            })
            .collect();
        copy.symmetric_sets = self.symmetric_sets.iter().map(|s| s.map(map)).collect();
        copy
    }

    /// Structural equality ignoring vertex and graph IDs.
    ///
    /// Vertices are compared position by position, edges and rings by the positions of
    /// the vertices they join. The first mismatch is appended to `reason`.
    pub fn same_as(&self, other: &Graph, reason: &mut String) -> bool {
        if self.vertex_count() != other.vertex_count() {
            reason.push_str(&format!(
                "Different number of vertices ({}:{}); ",
                self.vertex_count(),
                other.vertex_count()
            ));
            return false;
        }
        if self.edge_count() != other.edge_count() {
            reason.push_str(&format!(
                "Different number of edges ({}:{}); ",
                self.edge_count(),
                other.edge_count()
            ));
            return false;
        }
        if self.ring_count() != other.ring_count() {
            reason.push_str(&format!(
                "Different number of rings ({}:{}); ",
                self.ring_count(),
                other.ring_count()
            ));
            return false;
        }
        for (a, b) in self.vertices().zip(other.vertices()) {
            if !a.same_as(b, reason) {
                return false;
            }
        }
        for (a, b) in self.edges.iter().zip(&other.edges) {
            let ends_a = (self.vertex_position(a.src.vertex), self.vertex_position(a.trg.vertex));
            let ends_b = (
                other.vertex_position(b.src.vertex),
                other.vertex_position(b.trg.vertex),
            );
            if ends_a != ends_b {
                reason.push_str(&format!("Edges {a} and {b} join different vertices; "));
                return false;
            }
            if !a.same_as(b, reason) {
                return false;
            }
        }
        for (a, b) in self.rings.iter().zip(&other.rings) {
            let path_a: Vec<_> = a.vertices().iter().map(|v| self.vertex_position(*v)).collect();
            let path_b: Vec<_> = b.vertices().iter().map(|v| other.vertex_position(*v)).collect();
            if path_a != path_b || a.bond_type() != b.bond_type() {
                reason.push_str(&format!("Different rings ({a}:{b}); "));
                return false;
            }
        }
        let sets_a: Vec<Vec<_>> = self
            .symmetric_sets
            .iter()
            .map(|s| s.iter().map(|v| self.vertex_position(v)).collect())
            .collect();
        let sets_b: Vec<Vec<_>> = other
            .symmetric_sets
            .iter()
            .map(|s| s.iter().map(|v| other.vertex_position(v)).collect())
            .collect();
        if sets_a != sets_b {
            reason.push_str("Different symmetric vertex sets; ");
            return false;
        }
        true
    }

    /// Vertices where a mutation of the given type may be applied.
    ///
    /// The vertex must allow the mutation and be eligible for it: `Extend` needs a free
    /// attachment point, `Delete` excludes the root, `Change` needs a library building
    /// block. Ring-closing vertices are never mutation sites.
    pub fn mutation_sites(&self, mutation: MutationType) -> Vec<VertexId> {
        let root = self.root();
        self.vertices()
            .filter(|v| v.allows_mutation(mutation) && !v.is_ring_closing())
            .filter(|v| match mutation {
                MutationType::Extend => v.has_free_ap(),
                MutationType::Delete => Some(v.id()) != root,
                MutationType::Change => v.building_block().is_some(),
            })
            .map(Vertex::id)
            .collect()
    }

    /// Releases every vertex, edge, ring and symmetric set.
    pub fn cleanup(&mut self) {
        for vertex in self.vertices.values_mut() {
            vertex.cleanup();
        }
        self.vertices.clear();
        self.order.clear();
        self.id_map.clear();
        self.edges.clear();
        self.rings.clear();
        self.symmetric_sets.clear();
    }
}

fn pick_replacement_ap(
    vertex: &Vertex,
    old_class: Option<&ApClass>,
    other_class: Option<&ApClass>,
    vertex_is_src: bool,
    bond: BondType,
    space: &FragmentSpace,
) -> Option<usize> {
    let candidates: Vec<usize> = vertex
        .free_ap_indices()
        .into_iter()
        .filter(|i| {
            vertex
                .ap(*i)
                .is_some_and(|ap| ap.free_connections() >= bond.valence())
        })
        .collect();
    let class_of = |i: usize| vertex.ap(i).and_then(|ap| ap.class.as_ref());

    if let Some(i) = candidates
        .iter()
        .copied()
        .find(|i| old_class.is_some() && class_of(*i) == old_class)
    {
        return Some(i);
    }
    candidates.into_iter().find(|i| match (class_of(*i), other_class) {
        (Some(own), Some(other)) if vertex_is_src => space.is_class_compatible(own, other),
        (Some(own), Some(other)) => space.is_class_compatible(other, own),
        (None, _) | (_, None) => old_class.is_none(),
    })
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&graph_string::encode(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::attachment_point::AttachmentPoint;
    use crate::core::models::substructure::{Substructure, SubstructureAtom};
    use nalgebra::Point3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn class(s: &str) -> ApClass {
        s.parse().unwrap()
    }

    fn block(elements: &[&str], aps: &[(usize, &str)]) -> (Substructure, Vec<AttachmentPoint>) {
        let mut s = Substructure::new();
        for (i, e) in elements.iter().enumerate() {
            s.add_atom(SubstructureAtom::new(e, Point3::new(i as f64, 0.0, 0.0)));
        }
        let aps = aps
            .iter()
            .map(|(atom, c)| AttachmentPoint::new(Some(*atom), Some(class(c)), None, 1))
            .collect();
        (s, aps)
    }

    fn space() -> FragmentSpace {
        let mut space = FragmentSpace::new();
        for (a, b) in [
            ("a:0", "a:1"),
            ("a:1", "a:0"),
            ("a:0", "ATplus:0"),
            ("a:0", "ATminus:0"),
            ("a:0", "b:0"),
        ] {
            space.add_compatibility(class(a), class(b));
        }
        let (s, aps) = block(&["C", "C", "C"], &[(0, "a:0"), (1, "a:0"), (2, "a:0")]);
        space.add_building_block(BuildingBlockType::Scaffold, "tri", s, aps);
        let (s, aps) = block(&["N"], &[(0, "a:1"), (0, "a:0")]);
        space.add_building_block(BuildingBlockType::Fragment, "link", s, aps);
        let (s, aps) = block(&["O"], &[(0, "a:1")]);
        space.add_building_block(BuildingBlockType::Fragment, "cap-like", s, aps);
        let (s, aps) = block(&["S"], &[(0, "b:0"), (0, "a:0")]);
        space.add_building_block(BuildingBlockType::Fragment, "thio", s, aps);
        let (s, aps) = block(&["ATP"], &[(0, "ATplus:0")]);
        space.add_building_block(BuildingBlockType::CappingGroup, "rcp", s, aps);
        let (s, aps) = block(&["ATM"], &[(0, "ATminus:0")]);
        space.add_building_block(BuildingBlockType::CappingGroup, "rcm", s, aps);
        space
    }

    struct Fixture {
        space: FragmentSpace,
        ids: IdGenerator,
        graph: Graph,
        root: VertexId,
    }

    fn fixture() -> Fixture {
        let space = space();
        let ids = IdGenerator::new();
        let mut graph = Graph::new(ids.next_graph_id());
        let mut root = space
            .vertex_from_library(BuildingBlockType::Scaffold, 0, ids.next_vertex_id())
            .unwrap();
        root.set_level(0);
        let root = graph.add_vertex(root).unwrap();
        Fixture {
            space,
            ids,
            graph,
            root,
        }
    }

    fn append(f: &mut Fixture, parent: ApRef, index: usize) -> VertexId {
        f.graph
            .append_from_library(parent, BuildingBlockType::Fragment, index, 0, &f.space, &f.ids)
            .unwrap()
    }

    fn append_to_root(f: &mut Fixture, ap: usize, index: usize) -> VertexId {
        let root = f.root;
        append(f, ApRef::new(root, ap), index)
    }

    mod structure {
        use super::*;

        #[test]
        fn add_vertex_sets_owner_and_rejects_duplicates() {
            let mut f = fixture();
            assert_eq!(f.graph.root(), Some(f.root));
            assert_eq!(f.graph.vertex(f.root).unwrap().owner(), Some(f.graph.id()));
            let dup = f.graph.vertex(f.root).unwrap().clone();
            assert!(matches!(
                f.graph.add_vertex(dup),
                Err(GraphError::DuplicateVertex(_))
            ));
            f.graph.set_id(GraphId(77));
            assert_eq!(f.graph.vertex(f.root).unwrap().owner(), Some(GraphId(77)));
        }

        #[test]
        fn append_connects_and_sets_level() {
            let mut f = fixture();
            let child = append_to_root(&mut f, 1, 0);
            assert_eq!(f.graph.vertex_count(), 2);
            assert_eq!(f.graph.edge_count(), 1);
            assert_eq!(f.graph.vertex(child).unwrap().level(), 1);
            assert_eq!(f.graph.parent(child), Some(f.root));
            assert_eq!(f.graph.children(f.root), vec![child]);
            assert!(!f.graph.vertex(f.root).unwrap().ap(1).unwrap().is_available());
            f.graph.validate().unwrap();
        }

        #[test]
        fn append_rejects_incompatible_classes_without_changes() {
            let mut f = fixture();
            let before = f.graph.clone();
            // a:0 does not accept a:0
            let err = f
                .graph
                .append_from_library(
                    ApRef::new(f.root, 0),
                    BuildingBlockType::Fragment,
                    0,
                    1,
                    &f.space,
                    &f.ids,
                )
                .unwrap_err();
            assert!(matches!(err, GraphError::InvalidEdit(_)));
            let mut reason = String::new();
            assert!(before.same_as(&f.graph, &mut reason), "{reason}");
        }

        #[test]
        fn append_on_used_ap_leaves_graph_unchanged() {
            let mut f = fixture();
            append_to_root(&mut f, 0, 0);
            let before = f.graph.clone();
            let err = f
                .graph
                .append_from_library(
                    ApRef::new(f.root, 0),
                    BuildingBlockType::Fragment,
                    0,
                    0,
                    &f.space,
                    &f.ids,
                )
                .unwrap_err();
            assert!(matches!(err, GraphError::ApUnavailable { .. }));
            assert_eq!(f.graph.vertex_count(), before.vertex_count());
            f.graph.validate().unwrap();
        }

        #[test]
        fn connect_rejects_self_bonds_and_missing_vertices() {
            let mut f = fixture();
            assert!(matches!(
                f.graph.connect(ApRef::new(f.root, 0), ApRef::new(f.root, 1), &f.space),
                Err(GraphError::InvalidEdit(_))
            ));
            assert!(matches!(
                f.graph.connect(ApRef::new(f.root, 0), ApRef::new(VertexId(99), 0), &f.space),
                Err(GraphError::VertexNotFound(VertexId(99)))
            ));
        }

        #[test]
        fn remove_edge_restores_valence_on_a_redundant_path() {
            let mut f = fixture();
            let a = append_to_root(&mut f, 0, 0);
            let b = append_to_root(&mut f, 1, 0);
            f.graph
                .connect_exact(ApRef::new(a, 1), ApRef::new(b, 1), BondType::Single, None, None)
                .unwrap();

            let edge = f.graph.remove_edge(a, f.root).unwrap();
            assert!(edge.involves(f.root) && edge.involves(a));
            assert!(f.graph.vertex(f.root).unwrap().ap(0).unwrap().is_available());
            assert!(f.graph.vertex(a).unwrap().ap(0).unwrap().is_available());
            assert!(f.graph.is_connected());
            f.graph.validate().unwrap();
            assert!(matches!(
                f.graph.remove_edge(a, f.root),
                Err(GraphError::EdgeNotFound(_, _))
            ));
        }

        #[test]
        fn remove_edge_refuses_to_split_the_graph() {
            let mut f = fixture();
            let child = append_to_root(&mut f, 0, 0);
            let before = f.graph.clone();
            assert!(matches!(
                f.graph.remove_edge(child, f.root),
                Err(GraphError::Disconnected(v)) if v == child
            ));
            assert_eq!(f.graph.edge_count(), 1);
            assert!(!f.graph.vertex(f.root).unwrap().ap(0).unwrap().is_available());
            let mut reason = String::new();
            assert!(before.same_as(&f.graph, &mut reason), "{reason}");
            f.graph.validate().unwrap();
        }

        #[test]
        fn connect_random_joins_free_aps() {
            let mut f = fixture();
            let mut rng = StdRng::seed_from_u64(42);
            let v = f
                .graph
                .add_vertex(
                    f.space
                        .vertex_from_library(BuildingBlockType::Fragment, 0, f.ids.next_vertex_id())
                        .unwrap(),
                )
                .unwrap();
            let edge = f.graph.connect_random(f.root, v, &mut rng).unwrap().clone();
            assert_eq!(edge.bond_type, BondType::Single);
            f.graph.validate().unwrap();
        }

        #[test]
        fn validate_detects_inconsistent_valence() {
            let mut f = fixture();
            f.graph
                .vertex_mut(f.root)
                .unwrap()
                .update_attachment_point(0, -1)
                .unwrap();
            assert!(matches!(f.graph.validate(), Err(GraphError::InvalidEdit(_))));
        }
    }

    mod edits {
        use super::*;

        #[test]
        fn remove_vertex_cleans_edges_rings_and_sets() {
            let mut f = fixture();
            let a = append_to_root(&mut f, 0, 0);
            let b = append_to_root(&mut f, 1, 0);
            f.graph
                .add_symmetric_vertex_set(SymmetricSet::from_members([a, b]))
                .unwrap();
            f.graph.remove_vertex(a).unwrap();
            assert!(!f.graph.contains_vertex(a));
            assert_eq!(f.graph.edge_count(), 1);
            assert!(f.graph.symmetric_vertex_sets().is_empty());
            assert!(f.graph.vertex(f.root).unwrap().ap(0).unwrap().is_available());
            f.graph.validate().unwrap();
            assert!(matches!(f.graph.remove_vertex(a), Err(GraphError::VertexNotFound(_))));
        }

        #[test]
        fn remove_vertex_refuses_inner_vertices_and_busy_root() {
            let mut f = fixture();
            let middle = append_to_root(&mut f, 0, 0);
            let leaf = append(&mut f, ApRef::new(middle, 1), 1);
            let before = f.graph.clone();

            assert!(matches!(
                f.graph.remove_vertex(middle),
                Err(GraphError::Disconnected(v)) if v == leaf
            ));
            assert!(matches!(
                f.graph.remove_vertex(f.root),
                Err(GraphError::InvalidEdit(_))
            ));
            let mut reason = String::new();
            assert!(before.same_as(&f.graph, &mut reason), "{reason}");
            f.graph.validate().unwrap();

            f.graph.remove_vertex(leaf).unwrap();
            f.graph.remove_vertex(middle).unwrap();
            f.graph.remove_vertex(f.root).unwrap();
            assert_eq!(f.graph.vertex_count(), 0);
        }

        #[test]
        fn remove_vertex_with_overflowing_neighbour_changes_nothing() {
            let mut f = fixture();
            let a = append_to_root(&mut f, 0, 0);
            // Corrupt the root side so giving the connection back would overflow it.
            f.graph
                .vertex_mut(f.root)
                .unwrap()
                .update_attachment_point(0, 1)
                .unwrap();
            let edges = f.graph.edge_count();
            assert!(matches!(
                f.graph.remove_vertex(a),
                Err(GraphError::ValenceOverflow { .. })
            ));
            assert!(f.graph.contains_vertex(a));
            assert_eq!(f.graph.edge_count(), edges);
            assert_eq!(f.graph.vertex(f.root).unwrap().ap(0).unwrap().free_connections(), 1);
        }

        #[test]
        fn delete_branch_removes_descendants_only() {
            let mut f = fixture();
            let a = append_to_root(&mut f, 0, 0);
            let a1 = append(&mut f, ApRef::new(a, 1), 1);
            let b = append_to_root(&mut f, 1, 0);
            let removed = f.graph.delete_branch(a).unwrap();
            assert_eq!(removed, vec![a, a1]);
            assert_eq!(f.graph.vertex_ids(), vec![f.root, b]);
            f.graph.validate().unwrap();
            assert!(matches!(
                f.graph.delete_branch(f.root),
                Err(GraphError::InvalidEdit(_))
            ));
        }

        #[test]
        fn replace_vertex_keeps_id_and_rewires_edges() {
            let mut f = fixture();
            let a = append_to_root(&mut f, 0, 0);
            let leaf = append(&mut f, ApRef::new(a, 1), 1);
            // "thio" has b:0 and a:0; a:0 takes the bond to the leaf, b:0 the bond to the root.
            f.graph
                .replace_vertex(a, BuildingBlockType::Fragment, 2, &f.space)
                .unwrap();
            let replaced = f.graph.vertex(a).unwrap();
            assert_eq!(replaced.building_block(), Some((BuildingBlockType::Fragment, 2)));
            assert_eq!(replaced.level(), 1);
            assert_eq!(f.graph.parent(a), Some(f.root));
            assert_eq!(f.graph.parent(leaf), Some(a));
            assert_eq!(f.graph.edge_between(f.root, a).unwrap().trg.ap, 0);
            assert_eq!(f.graph.edge_between(a, leaf).unwrap().src.ap, 1);
            f.graph.validate().unwrap();
        }

        #[test]
        fn failed_replacement_leaves_graph_untouched() {
            let mut f = fixture();
            let a = append_to_root(&mut f, 0, 0);
            append(&mut f, ApRef::new(a, 1), 1);
            let before = f.graph.clone();
            // "cap-like" has a single AP and cannot hold two edges.
            let err = f
                .graph
                .replace_vertex(a, BuildingBlockType::Fragment, 1, &f.space)
                .unwrap_err();
            assert!(matches!(err, GraphError::InvalidEdit(_)));
            let mut reason = String::new();
            assert!(before.same_as(&f.graph, &mut reason), "{reason}");
            assert_eq!(
                f.graph.vertex(a).unwrap().building_block(),
                Some((BuildingBlockType::Fragment, 0))
            );
        }

        #[test]
        fn rings_require_bonded_path_and_partner_classes() {
            let mut f = fixture();
            let a = append_to_root(&mut f, 0, 0);
            let b = append_to_root(&mut f, 1, 0);
            let rcp = f
                .graph
                .append_from_library(ApRef::new(a, 1), BuildingBlockType::CappingGroup, 0, 0, &f.space, &f.ids)
                .unwrap();
            let rcm = f
                .graph
                .append_from_library(ApRef::new(b, 1), BuildingBlockType::CappingGroup, 1, 0, &f.space, &f.ids)
                .unwrap();

            assert!(matches!(
                f.graph.add_ring(vec![rcp, a, b, rcm], BondType::Single),
                Err(GraphError::InvalidRing(_))
            ));
            assert!(matches!(
                f.graph.add_ring(vec![rcp, a, f.root, b, VertexId(99)], BondType::Single),
                Err(GraphError::VertexNotFound(_))
            ));
            f.graph
                .add_ring(vec![rcp, a, f.root, b, rcm], BondType::Single)
                .unwrap();
            assert_eq!(f.graph.ring_count(), 1);
            assert_eq!(f.graph.rings_containing(f.root).count(), 1);
            assert!(matches!(
                f.graph.add_ring(vec![rcp, a, f.root, b, rcm], BondType::Single),
                Err(GraphError::InvalidRing(_))
            ));

            f.graph.remove_vertex(rcm).unwrap();
            assert_eq!(f.graph.ring_count(), 0);
        }

        #[test]
        fn ring_closing_vertices_of_same_polarity_cannot_close() {
            let mut f = fixture();
            let a = append_to_root(&mut f, 0, 0);
            let b = append_to_root(&mut f, 1, 0);
            let p1 = f
                .graph
                .append_from_library(ApRef::new(a, 1), BuildingBlockType::CappingGroup, 0, 0, &f.space, &f.ids)
                .unwrap();
            let p2 = f
                .graph
                .append_from_library(ApRef::new(b, 1), BuildingBlockType::CappingGroup, 0, 0, &f.space, &f.ids)
                .unwrap();
            assert!(matches!(
                f.graph.add_ring(vec![p1, a, f.root, b, p2], BondType::Single),
                Err(GraphError::InvalidRing(_))
            ));
        }
    }

    mod identity {
        use super::*;

        #[test]
        fn clone_with_fresh_ids_is_same_structure_with_new_ids() {
            let mut f = fixture();
            let a = append_to_root(&mut f, 0, 0);
            let b = append_to_root(&mut f, 1, 0);
            f.graph
                .add_symmetric_vertex_set(SymmetricSet::from_members([a, b]))
                .unwrap();
            let copy = f.graph.clone_with_fresh_ids(&f.ids);
            assert_ne!(copy.id(), f.graph.id());
            assert!(copy
                .vertex_ids()
                .iter()
                .all(|id| !f.graph.contains_vertex(*id)));
            let mut reason = String::new();
            assert!(f.graph.same_as(&copy, &mut reason), "{reason}");
            copy.validate().unwrap();
            assert!(copy
                .vertices()
                .all(|v| v.attachment_points().iter().all(|ap| ap.owner == Some(v.id()))));
        }

        #[test]
        fn same_as_detects_different_bond_structure() {
            let mut f = fixture();
            let mut other = f.graph.clone();
            append_to_root(&mut f, 0, 0);
            let mut reason = String::new();
            assert!(!f.graph.same_as(&other, &mut reason));
            assert!(reason.contains("vertices"));

            other
                .append_from_library(ApRef::new(f.root, 1), BuildingBlockType::Fragment, 0, 0, &f.space, &f.ids)
                .unwrap();
            reason.clear();
            assert!(!f.graph.same_as(&other, &mut reason));
        }

        #[test]
        fn mutation_sites_follow_eligibility() {
            let mut f = fixture();
            let a = append_to_root(&mut f, 0, 0);
            let rc = f
                .graph
                .append_from_library(ApRef::new(a, 1), BuildingBlockType::CappingGroup, 0, 0, &f.space, &f.ids)
                .unwrap();

            assert_eq!(f.graph.mutation_sites(MutationType::Extend), vec![f.root]);
            assert_eq!(f.graph.mutation_sites(MutationType::Delete), vec![a]);
            assert_eq!(f.graph.mutation_sites(MutationType::Change), vec![f.root, a]);
            assert!(!f.graph.mutation_sites(MutationType::Change).contains(&rc));

            f.graph
                .vertex_mut(a)
                .unwrap()
                .remove_mutation_type(MutationType::Change);
            assert_eq!(f.graph.mutation_sites(MutationType::Change), vec![f.root]);
        }

        #[test]
        fn cleanup_releases_everything() {
            let mut f = fixture();
            append_to_root(&mut f, 0, 0);
            f.graph.cleanup();
            assert_eq!(f.graph.vertex_count(), 0);
            assert_eq!(f.graph.edge_count(), 0);
            assert!(f.graph.root().is_none());
        }
    }
}
