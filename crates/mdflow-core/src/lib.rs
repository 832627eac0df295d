//! # mdflow Core Library
//!
//! Orchestration logic for batch molecular-simulation workloads, split into two
//! independent components that share a design vocabulary (declarative, validated
//! configuration driving staged execution) but no runtime state.
//!
//! - **[`sim`]: The Pipeline Orchestrator.** Drives a single structural
//!   simulation through five ordered phases (build, minimize, equilibrate,
//!   produce, finalize), attaching periodic reporters during production only and
//!   emitting a final-state artifact. The numerical engine itself is an external
//!   collaborator behind the [`sim::engine::SimulationEngine`] trait.
//!
//! - **[`jobs`]: The Record Validator.** Validates heterogeneous job-description
//!   records against a declarative shape, dispatching per-input-field validators
//!   through an explicit registry. Each record is accepted or rejected as a
//!   unit; one record's failure never affects its siblings.

pub mod jobs;
pub mod sim;
