//! Action execution seam
//!
//! The runner and watcher only see [`ActionExecutor`]; what an action does is
//! up to the implementation behind it.

use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

use crate::domain::{Action, WatchError};

/// A failed collaborator invocation
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("File watch failed: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Rules(#[from] WatchError),

    #[error("Unsupported action: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Other(String),
}

impl ActionError {
    /// Wraps an I/O error with the path it concerns
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> ActionError {
        let path = path.into();
        move |source| ActionError::Io { path, source }
    }
}

/// Performs collaborator actions
pub trait ActionExecutor: Sync {
    fn execute(&self, action: &Action) -> Result<(), ActionError>;

    /// Signals that compiled output changed; no-op unless overridden
    fn reload(&self, _changed: &[PathBuf]) -> Result<(), ActionError> {
        Ok(())
    }
}

/// Records action labels without side effects
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    log: Mutex<Vec<String>>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels of the actions executed so far, in order
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ActionExecutor for DryRunExecutor {
    fn execute(&self, action: &Action) -> Result<(), ActionError> {
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(action.label());
        Ok(())
    }

    fn reload(&self, _changed: &[PathBuf]) -> Result<(), ActionError> {
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push("livereload".to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_records_labels() {
        let executor = DryRunExecutor::new();
        executor.execute(&Action::CleanOutput).unwrap();
        executor.execute(&Action::KeepAlive).unwrap();
        executor.reload(&[PathBuf::from("dist/index.html")]).unwrap();

        assert_eq!(executor.log(), vec!["clean", "express-keepalive", "livereload"]);
    }

    #[test]
    fn io_error_mentions_path() {
        let err = ActionError::io("dist/css")(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.to_string(), "I/O error on dist/css: gone");
    }
}
