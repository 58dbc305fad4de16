//! Assetpipe - a front-end asset build pipeline
//!
//! Compiles stylesheets, bundles scripts, renders templates and serves the
//! result. Work is organized as a graph of named tasks in two modes,
//! `development` and `production`; running a task runs everything it depends
//! on exactly once, in declaration order.

pub mod cli;
pub mod domain;
pub mod engine;
pub mod project;

pub use domain::{Mode, PipelineComposer, TaskDefinition, TaskRegistry};
pub use engine::{ActionExecutor, Runner, Toolchain};
pub use project::{PipelineConfig, Project};
