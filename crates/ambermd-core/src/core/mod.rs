//! # Core Module
//!
//! Stateless building blocks: the in-memory structure model, readers and
//! writers for the files exchanged with the external toolchain, the residue
//! vocabulary, and the atom-selection logic that produces restraint masks.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, residues, chains and systems
//! - **File I/O** ([`io`]) - PDB, MOL2, Amber topology and restart files
//! - **Structural Knowledge** ([`topology`]) - Recognized residue names and atom classes
//! - **Selections** ([`selection`]) - Engine masks that can also be evaluated locally
//! - **System Description** ([`descriptor`]) - Solute size and masks of a prepared system

pub mod descriptor;
pub mod io;
pub mod models;
pub mod selection;
pub mod topology;
