//! # Core Module
//!
//! Stateless building blocks of fraggen.
//!
//! - **Graph Representation** ([`models`]) - attachment points, vertices, edges, rings,
//!   graphs and scored candidates
//! - **Building-Block Catalog** ([`fragspace`]) - the fragment space consulted for library
//!   vertices, AP-class compatibility and bond orders
//! - **File I/O** ([`io`]) - property tags, structure records, the graph text codec and
//!   population reports
//!
//! Everything here is single-owner: a graph and its vertices are mutated by one thread at
//! a time, while a loaded fragment space is immutable and can be shared freely.

pub mod fragspace;
pub mod io;
pub mod models;
