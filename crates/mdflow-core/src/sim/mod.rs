//! Staged simulation pipeline orchestration.
//!
//! The entry point is [`pipeline::run`], which takes a validated
//! [`config::SimulationConfig`], an engine implementing
//! [`engine::SimulationEngine`], and a set of [`reporter::Reporter`]s to attach
//! during the production phase.

pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod reporter;
