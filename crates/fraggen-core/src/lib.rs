//! # fraggen Core Library
//!
//! Data model and evaluation engine for evolutionary de novo molecular design, where
//! each candidate molecule is a graph of reusable building blocks joined through typed
//! attachment points.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Graph data model (`Vertex`, `Edge`, `Ring`, `Graph`),
//!   the read-only `FragmentSpace` lookup service, the graph text encoding and the
//!   structure-record I/O used to talk to fitness providers.
//!
//! - **[`engine`]: The Logic Core.** The stateful pieces of an evaluation: the
//!   `FitnessTask` state machine, fitness providers, the shared population and retry
//!   counter, configuration and progress reporting.
//!
//! - **[`workflows`]: The Public API.** Runs batches of fitness tasks on a worker pool
//!   and hands back the scored candidates together with any fatal task failures.

pub mod core;
pub mod engine;
pub mod workflows;
