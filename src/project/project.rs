//! Project management
//!
//! Resolves the project root and gives access to its configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use super::config::{PipelineConfig, CONFIG_FILE};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Project root does not exist: {0}")]
    MissingRoot(PathBuf),
}

/// The subset of package.json we read
#[derive(Debug, Deserialize)]
struct PackageManifest {
    name: Option<String>,
}

/// An asset pipeline project
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config: PipelineConfig,
}

impl Project {
    /// Opens the project at the given root
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ProjectError::MissingRoot(root).into());
        }

        let config = PipelineConfig::load(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project containing the current directory
    ///
    /// Without an `assetpipe.toml` above us, the current directory is the
    /// root and the defaults apply.
    pub fn open_current() -> Result<Self> {
        let root = match PipelineConfig::find_project_root() {
            Some(root) => root,
            None => std::env::current_dir().context("Failed to read current directory")?,
        };

        Self::open(root)
    }

    /// Writes a default configuration unless one exists
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create project directory: {}", root.display()))?;

        if !root.join(CONFIG_FILE).exists() {
            PipelineConfig::default().save(&root)?;
        }

        Self::open(root)
    }

    /// Creates a project from an already loaded configuration
    pub fn with_config(root: impl Into<PathBuf>, config: PipelineConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Resolves a configured path against the project root
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Returns the output directory
    pub fn output_dir(&self) -> PathBuf {
        self.path(&self.config.paths.output)
    }

    /// Name used in script banners
    pub fn package_name(&self) -> String {
        if let Some(name) = &self.config.name {
            return name.clone();
        }

        let manifest = fs::read_to_string(self.root.join("package.json"))
            .ok()
            .and_then(|content| serde_json::from_str::<PackageManifest>(&content).ok())
            .and_then(|m| m.name);

        manifest.unwrap_or_else(|| {
            self.root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "assets".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_writes_config() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert!(project.root().join(CONFIG_FILE).is_file());
        assert_eq!(project.config().server.port, 3000);
    }

    #[test]
    fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[server]\nport = 9000\n").unwrap();

        let project = Project::init(dir.path()).unwrap();
        assert_eq!(project.config().server.port, 9000);
    }

    #[test]
    fn open_missing_root_fails() {
        let dir = TempDir::new().unwrap();
        assert!(Project::open(dir.path().join("nope")).is_err());
    }

    #[test]
    fn package_name_prefers_config() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name": "from-package"}"#).unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "name = \"from-config\"\n").unwrap();

        let project = Project::open(dir.path()).unwrap();
        assert_eq!(project.package_name(), "from-config");
    }

    #[test]
    fn package_name_from_manifest() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name": "from-package", "version": "1.0.0"}"#)
            .unwrap();

        let project = Project::open(dir.path()).unwrap();
        assert_eq!(project.package_name(), "from-package");
    }

    #[test]
    fn package_name_falls_back_to_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("my-site");
        fs::create_dir(&root).unwrap();

        let project = Project::open(&root).unwrap();
        assert_eq!(project.package_name(), "my-site");
    }
}
