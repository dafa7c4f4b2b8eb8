//! # ambermd
//!
//! Staged Amber molecular-dynamics workflows: preparing a protein-ligand
//! system, relaxing it through a fixed series of restrained minimization and
//! equilibration stages, running production MD, and post-processing the
//! trajectory into an MM-PBSA binding free energy.
//!
//! The physics is done by external programs (the MD engine, `tleap`,
//! `cpptraj`, `gmx_MMPBSA`, ...). This crate decides what they run on, writes
//! their inputs, launches them in order and checks what they leave behind.
//!
//! ## Layers
//!
//! - **[`core`]** - Structure models, file formats, the residue vocabulary and
//!   the atom selections restraint masks are derived from.
//!
//! - **[`engine`]** - External job execution, stage definitions and the
//!   pipeline that chains stages through their restart files.
//!
//! - **[`workflows`]** - The complete procedures a front-end calls:
//!   equilibration and the binding free-energy workflow.

pub mod core;
pub mod engine;
pub mod workflows;
