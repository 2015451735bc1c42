//! # I/O Module
//!
//! Formats through which candidates leave and re-enter the library: the single-line graph
//! encoding, key/value structure records exchanged with fitness providers, the shared
//! property-tag names, and the CSV population report.

pub mod graph_string;
pub mod record;
pub mod report;
pub mod tags;
pub mod traits;
