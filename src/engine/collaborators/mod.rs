//! External collaborators
//!
//! The compilers, server and browser the pipeline drives. Each is a narrow
//! trait; [`fs`] implements the ones that are plain file operations and
//! [`command`] delegates the rest to configured programs.

pub mod command;
pub mod fs;

use std::path::{Path, PathBuf};

use glob::Pattern;

use super::executor::ActionError;
use crate::domain::{RenderOptions, StyleOptions};

/// Compiles a stylesheet entry point to css
pub trait StyleCompiler: Send + Sync {
    fn compile(&self, source: &Path, output: &Path, options: StyleOptions) -> Result<(), ActionError>;
}

/// Adds vendor prefixes to css files in place
pub trait Autoprefixer: Send + Sync {
    fn apply(&self, css_files: &[PathBuf], browsers: &[String]) -> Result<(), ActionError>;
}

/// Produces a single script bundle
pub trait ScriptBundler: Send + Sync {
    fn concat(&self, files: &[PathBuf], output: &Path) -> Result<(), ActionError>;

    fn minify(&self, files: &[PathBuf], banner: &str, output: &Path) -> Result<(), ActionError>;
}

/// Renders a template directory to html
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, source: &Path, output: &Path, options: RenderOptions) -> Result<(), ActionError>;
}

/// Copies a source tree into the output tree
pub trait StaticCopier: Send + Sync {
    /// Returns the number of files copied
    fn copy(&self, source: &Path, exclude: &[Pattern], dest: &Path) -> Result<usize, ActionError>;
}

/// Where and how the static server listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeOptions {
    pub roots: Vec<PathBuf>,
    pub port: u16,
    pub hostname: String,
    pub livereload: bool,
}

/// Serves the output tree over HTTP
pub trait HttpStaticServer: Send + Sync {
    fn serve(&self, options: &ServeOptions) -> Result<(), ActionError>;

    /// Notifies connected browsers that files changed
    fn reload(&self, changed: &[PathBuf]) -> Result<(), ActionError>;

    /// Blocks until the server stops
    fn wait(&self) -> Result<(), ActionError>;
}

/// Opens a URL for the user
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> Result<(), ActionError>;
}
