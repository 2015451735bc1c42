//! Single-line text encoding of a [`Graph`].
//!
//! ```text
//! <graphId>|<vertex>{,<vertex>}|[<edge>{,<edge>}]|[<ring>{;<ring>}]|[<symset>{;<symset>}]
//! ```
//!
//! Library vertices are written `<vid>_<bbIndex>_<bbTypeCode>_<level>`, empty vertices
//! `<vid>_E_<level>{_<class>=<connections>}` with `*` for an undefined class. Edges use the
//! [`Edge`](crate::core::models::edge::Edge) text form; an edge without classes on classed
//! attachment points is written with `_*_*` so decoding does not fill them in. Rings list vertex IDs joined by `~`
//! followed by `/<bondCode>`, and symmetric vertex sets list vertex IDs joined by `~`.

use crate::core::fragspace::FragmentSpace;
use crate::core::models::ap_class::{ApClass, ParseApClassError};
use crate::core::models::attachment_point::AttachmentPoint;
use crate::core::models::bond::BondType;
use crate::core::models::edge::{ApRef, Edge};
use crate::core::models::error::GraphError;
use crate::core::models::graph::Graph;
use crate::core::models::ids::{GraphId, IdGenerator, VertexId};
use crate::core::models::symmetry::SymmetricSet;
use crate::core::models::vertex::{BuildingBlockType, Vertex};
use std::str::FromStr;
use thiserror::Error;

pub const SECTION_SEPARATOR: char = '|';
pub const VERTEX_SEPARATOR: char = ',';
pub const EDGE_SEPARATOR: char = ',';
pub const RING_SEPARATOR: char = ';';
pub const SYMMETRY_SEPARATOR: char = ';';
pub const FIELD_SEPARATOR: char = '_';
pub const MEMBER_SEPARATOR: char = '~';
pub const RING_BOND_SEPARATOR: char = '/';
pub const EMPTY_VERTEX_MARKER: &str = "E";
pub const UNDEFINED_CLASS: &str = "*";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Graph string has {found} sections, expected 5")]
    SectionCount { found: usize },

    #[error("Malformed {kind} token '{token}': {reason}")]
    Token {
        kind: &'static str,
        token: String,
        reason: String,
    },

    #[error("Cannot rebuild {kind} '{token}': {source}")]
    Graph {
        kind: &'static str,
        token: String,
        #[source]
        source: GraphError,
    },
}

fn malformed(kind: &'static str, token: &str, reason: impl Into<String>) -> DecodeError {
    DecodeError::Token {
        kind,
        token: token.to_string(),
        reason: reason.into(),
    }
}

fn field<T: FromStr>(kind: &'static str, token: &str, raw: &str, what: &str) -> Result<T, DecodeError> {
    raw.parse()
        .map_err(|_| malformed(kind, token, format!("invalid {what} '{raw}'")))
}

fn encode_vertex(vertex: &Vertex) -> String {
    match vertex.building_block() {
        Some((bb_type, index)) => format!(
            "{}_{}_{}_{}",
            vertex.id(),
            index,
            bb_type.code(),
            vertex.level()
        ),
        None => {
            let mut token = format!("{}_{}_{}", vertex.id(), EMPTY_VERTEX_MARKER, vertex.level());
            for ap in vertex.attachment_points() {
                token.push(FIELD_SEPARATOR);
                token.push_str(&ap.class_label());
                token.push('=');
                token.push_str(&ap.total_connections().to_string());
            }
            token
        }
    }
}

fn ap_class_at(graph: &Graph, at: ApRef) -> Option<ApClass> {
    graph
        .vertex(at.vertex)
        .and_then(|v| v.ap(at.ap))
        .and_then(|ap| ap.class.clone())
}

fn encode_edge(graph: &Graph, edge: &Edge) -> String {
    let classless = edge.src_class.is_none() && edge.trg_class.is_none();
    if classless && (ap_class_at(graph, edge.src).is_some() || ap_class_at(graph, edge.trg).is_some()) {
        format!("{edge}{FIELD_SEPARATOR}{UNDEFINED_CLASS}{FIELD_SEPARATOR}{UNDEFINED_CLASS}")
    } else {
        edge.to_string()
    }
}

fn join_ids(ids: impl Iterator<Item = VertexId>) -> String {
    ids.map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(&MEMBER_SEPARATOR.to_string())
}

/// Encodes a graph on a single line.
pub fn encode(graph: &Graph) -> String {
    let vertices: Vec<String> = graph.vertices().map(encode_vertex).collect();
    let edges: Vec<String> = graph.edges().iter().map(|e| encode_edge(graph, e)).collect();
    let rings: Vec<String> = graph.rings().iter().map(ToString::to_string).collect();
    let symsets: Vec<String> = graph
        .symmetric_vertex_sets()
        .iter()
        .map(|s| join_ids(s.iter()))
        .collect();
    format!(
        "{}{sep}{}{sep}{}{sep}{}{sep}{}",
        graph.id(),
        vertices.join(&VERTEX_SEPARATOR.to_string()),
        edges.join(&EDGE_SEPARATOR.to_string()),
        rings.join(&RING_SEPARATOR.to_string()),
        symsets.join(&SYMMETRY_SEPARATOR.to_string()),
        sep = SECTION_SEPARATOR
    )
}

fn split_section(section: &str, separator: char) -> impl Iterator<Item = &str> {
    section
        .split(separator)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn decode_class(kind: &'static str, token: &str, raw: &str) -> Result<Option<ApClass>, DecodeError> {
    if raw == UNDEFINED_CLASS {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|e: ParseApClassError| malformed(kind, token, e.to_string()))
}

fn decode_vertex(token: &str, space: &FragmentSpace) -> Result<Vertex, DecodeError> {
    const KIND: &str = "vertex";
    let fields: Vec<&str> = token.split(FIELD_SEPARATOR).collect();
    if fields.len() < 3 {
        return Err(malformed(KIND, token, "expected at least 3 fields"));
    }
    let id: VertexId = field(KIND, token, fields[0], "vertex ID")?;

    if fields[1] == EMPTY_VERTEX_MARKER {
        let level: i32 = field(KIND, token, fields[2], "level")?;
        let mut aps = Vec::with_capacity(fields.len() - 3);
        for raw in &fields[3..] {
            let (raw_class, raw_connections) = match raw.split_once('=') {
                Some((c, n)) => (c, Some(n)),
                None => (*raw, None),
            };
            let class = decode_class(KIND, token, raw_class)?;
            let connections = match raw_connections {
                Some(n) => field(KIND, token, n, "connection count")?,
                None => space.connections_for_class(class.as_ref()),
            };
            aps.push(AttachmentPoint::placeholder(class, connections));
        }
        let mut vertex = Vertex::empty(id, aps);
        vertex.set_level(level);
        return Ok(vertex);
    }

    if fields.len() != 4 {
        return Err(malformed(KIND, token, "expected 4 fields for a library vertex"));
    }
    let index: usize = field(KIND, token, fields[1], "building block index")?;
    let code: u8 = field(KIND, token, fields[2], "building block type")?;
    let bb_type = BuildingBlockType::from_code(code)
        .ok_or_else(|| malformed(KIND, token, format!("unknown building block type {code}")))?;
    let level: i32 = field(KIND, token, fields[3], "level")?;
    let mut vertex = space
        .vertex_from_library(bb_type, index, id)
        .map_err(|source| DecodeError::Graph {
            kind: KIND,
            token: token.to_string(),
            source,
        })?;
    vertex.set_level(level);
    Ok(vertex)
}

fn decode_edge(graph: &mut Graph, token: &str) -> Result<(), DecodeError> {
    const KIND: &str = "edge";
    let fields: Vec<&str> = token.split(FIELD_SEPARATOR).collect();
    if fields.len() != 5 && fields.len() != 7 {
        return Err(malformed(KIND, token, "expected 5 or 7 fields"));
    }
    let src = ApRef::new(
        field(KIND, token, fields[0], "source vertex")?,
        field(KIND, token, fields[1], "source AP")?,
    );
    let trg = ApRef::new(
        field(KIND, token, fields[2], "target vertex")?,
        field(KIND, token, fields[3], "target AP")?,
    );
    let bond = BondType::from_legacy_code(fields[4])
        .map_err(|e| malformed(KIND, token, e.to_string()))?;
    let (src_class, trg_class) = if fields.len() == 7 {
        (
            decode_class(KIND, token, fields[5])?,
            decode_class(KIND, token, fields[6])?,
        )
    } else {
        (ap_class_at(graph, src), ap_class_at(graph, trg))
    };
    graph
        .connect_exact(src, trg, bond, src_class, trg_class)
        .map_err(|source| DecodeError::Graph {
            kind: KIND,
            token: token.to_string(),
            source,
        })?;
    Ok(())
}

fn decode_members(kind: &'static str, token: &str, raw: &str) -> Result<Vec<VertexId>, DecodeError> {
    raw.split(MEMBER_SEPARATOR)
        .map(|id| field(kind, token, id, "vertex ID"))
        .collect()
}

/// Rebuilds a graph from its text encoding.
///
/// Library vertices are re-instantiated from `space` and edges are replayed, so attachment
/// point free connections come out as in the encoded graph. Vertex and graph IDs are kept;
/// `ids` is advanced past them so later identifiers cannot collide.
///
/// # Errors
///
/// Returns a [`DecodeError`] naming the first token that cannot be parsed or rebuilt.
pub fn decode(text: &str, space: &FragmentSpace, ids: &IdGenerator) -> Result<Graph, DecodeError> {
    let sections: Vec<&str> = text.trim().split(SECTION_SEPARATOR).collect();
    if sections.len() != 5 {
        return Err(DecodeError::SectionCount {
            found: sections.len(),
        });
    }
    let graph_id: GraphId = field("graph ID", sections[0], sections[0], "graph ID")?;
    let mut graph = Graph::new(graph_id);

    for token in split_section(sections[1], VERTEX_SEPARATOR) {
        let vertex = decode_vertex(token, space)?;
        ids.reserve_vertex_ids_through(vertex.id());
        graph
            .add_vertex(vertex)
            .map_err(|source| DecodeError::Graph {
                kind: "vertex",
                token: token.to_string(),
                source,
            })?;
    }

    for token in split_section(sections[2], EDGE_SEPARATOR) {
        decode_edge(&mut graph, token)?;
    }

    for token in split_section(sections[3], RING_SEPARATOR) {
        let (members, code) = token
            .rsplit_once(RING_BOND_SEPARATOR)
            .ok_or_else(|| malformed("ring", token, "missing bond type"))?;
        let path = decode_members("ring", token, members)?;
        let bond = BondType::from_legacy_code(code)
            .map_err(|e| malformed("ring", token, e.to_string()))?;
        graph
            .add_ring(path, bond)
            .map_err(|source| DecodeError::Graph {
                kind: "ring",
                token: token.to_string(),
                source,
            })?;
    }

    for token in split_section(sections[4], SYMMETRY_SEPARATOR) {
        let members = decode_members("symmetric set", token, token)?;
        graph
            .add_symmetric_vertex_set(SymmetricSet::from_members(members))
            .map_err(|source| DecodeError::Graph {
                kind: "symmetric set",
                token: token.to_string(),
                source,
            })?;
    }

    ids.reserve_graph_ids_through(graph_id);
    Ok(graph)
}
