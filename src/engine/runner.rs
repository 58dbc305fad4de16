//! Sequential task runner

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info};

use super::executor::{ActionError, ActionExecutor};
use crate::domain::TaskDefinition;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Task '{task}' failed: {source}")]
    ActionFailed {
        task: String,
        #[source]
        source: ActionError,
        /// Tasks that finished before the failure; their output stays in place
        completed: Vec<String>,
    },
}

impl RunError {
    /// Name of the task that failed
    pub fn task(&self) -> &str {
        match self {
            RunError::ActionFailed { task, .. } => task,
        }
    }

    pub fn completed(&self) -> &[String] {
        match self {
            RunError::ActionFailed { completed, .. } => completed,
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub completed: Vec<String>,
    pub elapsed: Duration,
}

/// Executes an expanded task sequence strictly in order
pub struct Runner<'a> {
    executor: &'a dyn ActionExecutor,
}

impl<'a> Runner<'a> {
    pub fn new(executor: &'a dyn ActionExecutor) -> Self {
        Self { executor }
    }

    /// Runs each task's action in order, stopping at the first failure
    pub fn run(&self, sequence: &[&TaskDefinition]) -> Result<RunReport, RunError> {
        let started = Instant::now();
        let mut completed = Vec::with_capacity(sequence.len());

        for task in sequence {
            let Some(action) = &task.action else {
                continue;
            };

            if action.is_long_running() {
                info!(task = %task.name, "Running task until stopped");
            } else {
                info!(task = %task.name, "Running task");
            }
            let task_started = Instant::now();

            if let Err(source) = self.executor.execute(action) {
                error!(task = %task.name, error = %source, "Task failed");
                return Err(RunError::ActionFailed {
                    task: task.name.clone(),
                    source,
                    completed,
                });
            }

            debug!(
                task = %task.name,
                elapsed_ms = task_started.elapsed().as_millis() as u64,
                "Task finished"
            );
            completed.push(task.name.clone());
        }

        Ok(RunReport {
            completed,
            elapsed: started.elapsed(),
        })
    }
}
