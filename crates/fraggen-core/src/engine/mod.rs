//! # Engine Module
//!
//! Stateful machinery that turns candidate graphs into scored candidates.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - evaluation settings and their builder
//! - **Fitness Providers** ([`provider`]) - external process and internal formula scorers
//!   behind one `evaluate(input) -> output` contract
//! - **Tasks** ([`task`]) - the `FitnessTask` state machine
//! - **Shared State** ([`population`]) - the population and retry counter shared by tasks
//! - **Rendering** ([`render`]) - the best-effort image renderer contract
//! - **Progress Monitoring** ([`progress`]) - callback-based progress reporting
//! - **Error Handling** ([`error`]) - fatal task errors

pub mod config;
pub mod error;
pub mod population;
pub mod progress;
pub mod provider;
pub mod render;
pub mod task;
