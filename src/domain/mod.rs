//! Domain models for the asset pipeline
//!
//! Contains the task graph and its composition without any I/O concerns.

mod mode;
mod task;
mod registry;
mod composer;
mod watch;

pub use mode::{Mode, ParseModeError, RenderOptions, Step, TaskKey, TaskKind, TemplateProfile};
pub use task::{Action, StyleOptions, TaskDefinition};
pub use registry::{RegistryError, TaskRegistry};
pub use composer::PipelineComposer;
pub use watch::{Coalescer, Trigger, WatchCategory, WatchError, WatchRule, WatchTarget};
