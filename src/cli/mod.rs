//! # Command-Line Interface
//!
//! User-facing commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `run [TASK...]` | Expand tasks and run their actions in order |
//! | `plan [TASK...]` | Show the expanded sequence without running it |
//! | `tasks` | List the registered tasks |
//! | `init [PATH]` | Write a default `assetpipe.toml` |
//!
//! Without a command, `run` executes the entry task of the configured
//! `default_mode`.
//!
//! ## Output Formats
//!
//! All commands support `--format`:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! Progress is logged to stderr; `--verbose` adds the commands run and
//! `--quiet` keeps only errors.
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod logging;
mod output;
mod pipeline;
mod tasks;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
