//! # Core Models Module
//!
//! Fundamental data structures used to represent candidate molecules as graphs of
//! building blocks.
//!
//! ## Key Components
//!
//! - [`attachment_point`] - typed connection slots with free-valence bookkeeping
//! - [`ap_class`] - attachment-point class labels (`rule:subclass`)
//! - [`bond`] - bond types an edge can carry and their valence cost
//! - [`vertex`] - graph nodes (scaffolds, fragments, capping groups, ring-closing and empty vertices)
//! - [`edge`] - connections between two attachment points
//! - [`ring`] - ring closures across non-adjacent vertices
//! - [`graph`] - the complete candidate graph with its editing operations
//! - [`candidate`] - the scored record produced by fitness evaluation
//! - [`symmetry`] - symmetric sets and the attachment-point symmetry detection
//! - [`substructure`] - the chemical content embedded in molecular vertices
//! - [`ids`] - identifiers and the injectable identifier generator
//!
//! ## Usage
//!
//! ```ignore
//! use fraggen::core::models::{edge::ApRef, graph::Graph, ids::IdGenerator, vertex::BuildingBlockType};
//!
//! let ids = IdGenerator::new();
//! let mut graph = Graph::new(ids.next_graph_id());
//! let scaffold = space.vertex_from_library(BuildingBlockType::Scaffold, 0, ids.next_vertex_id())?;
//! let root = graph.add_vertex(scaffold)?;
//! let child = graph.append_from_library(ApRef::new(root, 0), BuildingBlockType::Fragment, 3, 0, &space, &ids)?;
//! ```

pub mod ap_class;
pub mod attachment_point;
pub mod bond;
pub mod candidate;
pub mod edge;
pub mod error;
pub mod graph;
pub mod ids;
pub mod ring;
pub mod substructure;
pub mod symmetry;
pub mod vertex;
