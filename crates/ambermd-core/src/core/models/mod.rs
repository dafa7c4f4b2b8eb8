//! # Core Models Module
//!
//! Data structures for molecular structures handled during system preparation:
//! atoms, residues, chains, bonds and the [`system::MolecularSystem`] that owns
//! them.
//!
//! Topologies and coordinates consumed by the simulation pipeline are *not*
//! modeled here; they stay opaque files described by
//! [`crate::core::descriptor::SystemDescriptor`].
//!
//! ## Key Components
//!
//! - [`atom`] - Individual atom with name, element and position
//! - [`residue`] - Residue membership and name handling
//! - [`chain`] - Chain organization
//! - [`bond`] - Connectivity and bond orders
//! - [`system`] - Complete structure with ordered iteration and residue filtering
//! - [`ids`] - Stable identifier types for atoms, residues, and chains

pub mod atom;
pub mod bond;
pub mod chain;
pub mod ids;
pub mod residue;
pub mod system;
