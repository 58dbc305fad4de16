//! # Project Layer
//!
//! Locates the project root and loads `assetpipe.toml`.
//!
//! ## Project Structure
//!
//! ```text
//! my-site/
//! ├── assetpipe.toml        # Pipeline configuration (optional)
//! ├── package.json          # Banner name fallback (optional)
//! ├── src/
//! │   ├── js/               # Scripts, copied then bundled
//! │   ├── less/             # Stylesheets, compiled
//! │   └── views/            # Templates, rendered
//! └── dist/                 # Build output
//! ```
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for a pipeline project
//! - [`PipelineConfig`] - Typed configuration with defaults for every section

mod config;
mod project;

pub use config::{
    AutoprefixerConfig, BrowserConfig, ConfigError, CopyConfig, PathsConfig, PipelineConfig,
    ScriptsConfig, ServerConfig, StylesConfig, TemplatesConfig, WatchConfig, CONFIG_FILE,
};
pub use project::{Project, ProjectError};
