//! # Engine Module
//!
//! The execution layer: it turns stage descriptions into engine input files
//! and external jobs, and runs them in order with fail-fast semantics.
//!
//! ## Architecture
//!
//! - **Job execution** ([`runner`]) - The [`runner::Executor`] seam and the fail-fast [`runner::JobRunner`]
//! - **Tool resolution** ([`toolchain`]) - Locating external programs before any work starts
//! - **Stages** ([`stage`]) - One minimization or dynamics job and its `&cntrl` input
//! - **Pipelines** ([`pipeline`]) - An arena of stages chained through their restart files
//! - **Workflow Context** ([`context`]) - Working directory, tools, executor and reporter bundled for workflows
//! - **Configuration** ([`config`]) - Validated simulation, preparation and free-energy settings
//! - **Progress Monitoring** ([`progress`]) - Events for front-ends
//! - **Error Handling** ([`error`]) - The [`error::EngineError`] type shared by every layer

pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod runner;
pub mod stage;
pub mod toolchain;
