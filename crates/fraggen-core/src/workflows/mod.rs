//! # Workflows Module
//!
//! Top-level entry points of the library.
//!
//! - **Evaluation Workflow** ([`evaluate`]) - builds structures for a batch of candidate
//!   graphs, scores them with fitness tasks on the rayon thread pool and collects the
//!   population together with any fatal task failures.

pub mod evaluate;
