//! # Workflows Module
//!
//! End-to-end procedures built from the `core` and `engine` layers. Each
//! workflow takes a [`WorkflowContext`](crate::engine::context::WorkflowContext)
//! and validated configuration, reports its phases through the context's
//! progress reporter, and stops at the first failing external job.
//!
//! ## Architecture
//!
//! - **Equilibration** ([`equilibrate`]) - The restraint-relaxation protocol
//!   followed by production MD on a prepared topology/coordinate pair.
//! - **Preparation** ([`prepare`]) - Splitting a complex into receptor and
//!   ligand, ligand parameterization and building the solvated topology.
//! - **Binding Free Energy** ([`binding`]) - Trajectory conversion and MM-PBSA
//!   decomposition, plus the combined prepare-simulate-decompose workflow.

pub mod binding;
pub mod equilibrate;
pub mod prepare;
