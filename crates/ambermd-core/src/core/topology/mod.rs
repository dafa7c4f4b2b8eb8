//! Static residue and atom-name knowledge.
//!
//! The [`vocabulary`] module holds the recognized residue names of the stock
//! force fields, which decides what counts as protein, solvent or ligand.

pub mod vocabulary;
