//! Readers and writers for the structure files exchanged with the external
//! toolchain.
//!
//! PDB and MOL2 go through the [`traits::MolecularFile`] interface and load
//! into a [`MolecularSystem`](crate::core::models::system::MolecularSystem).
//! Amber topologies and restart files are only read, and only as far as the
//! selection and validation logic needs.

pub mod mol2;
pub mod parm7;
pub mod pdb;
pub mod rst7;
pub mod traits;
