//! Pipeline commands (run, plan)

use std::sync::Arc;

use anyhow::{Context, Result};

use super::output::Output;
use crate::domain::{PipelineComposer, TaskDefinition, TaskKey, TaskRegistry};
use crate::engine::{DryRunExecutor, RunError, Runner, Toolchain};
use crate::project::Project;

/// Task names to expand; without any, the configured default mode
pub fn requested_tasks(project: &Project, tasks: Vec<String>) -> Vec<String> {
    if tasks.is_empty() {
        vec![TaskKey::Entry(project.config().default_mode).name()]
    } else {
        tasks
    }
}

pub fn registry() -> Result<TaskRegistry> {
    PipelineComposer::registry().context("Failed to compose the task graph")
}

fn expand<'r>(registry: &'r TaskRegistry, tasks: &[String]) -> Result<Vec<&'r TaskDefinition>> {
    registry
        .expand_all(tasks.iter().map(String::as_str))
        .context("Failed to expand tasks")
}

fn action_label(task: &TaskDefinition) -> String {
    task.action
        .as_ref()
        .map(|a| a.label())
        .unwrap_or_default()
}

/// Shows the action sequence a run would perform
pub fn plan(output: &Output, project: &Project, tasks: Vec<String>) -> Result<()> {
    let tasks = requested_tasks(project, tasks);
    let registry = registry()?;
    let sequence = expand(&registry, &tasks)?;

    if output.is_json() {
        let steps: Vec<_> = sequence
            .iter()
            .map(|t| {
                serde_json::json!({
                    "task": t.name,
                    "action": action_label(t),
                })
            })
            .collect();
        output.data(&serde_json::json!({
            "requested": tasks,
            "sequence": steps,
        }));
    } else {
        println!("Plan for {} ({} steps):", tasks.join(", "), sequence.len());
        let lines: Vec<String> = sequence
            .iter()
            .map(|t| format!("{:<20} {}", t.name, t.description))
            .collect();
        output.numbered(&lines);
    }

    Ok(())
}

/// Expands and runs the requested tasks
pub fn run(output: &Output, project: Project, tasks: Vec<String>, dry_run: bool) -> Result<()> {
    let tasks = requested_tasks(&project, tasks);
    let registry = Arc::new(registry()?);
    let sequence = expand(&registry, &tasks)?;

    if dry_run {
        let executor = DryRunExecutor::new();
        let report = Runner::new(&executor)
            .run(&sequence)
            .context("Dry run failed")?;

        if output.is_json() {
            output.data(&serde_json::json!({
                "success": true,
                "dry_run": true,
                "requested": tasks,
                "completed": report.completed,
                "actions": executor.log(),
            }));
        } else {
            println!("Dry run of {}:", tasks.join(", "));
            output.numbered(&executor.log());
        }
        return Ok(());
    }

    let toolchain = Toolchain::from_project(project).with_registry(Arc::clone(&registry));

    match Runner::new(&toolchain).run(&sequence) {
        Ok(report) => {
            if output.is_json() {
                output.data(&serde_json::json!({
                    "success": true,
                    "dry_run": false,
                    "requested": tasks,
                    "completed": report.completed,
                    "elapsed_ms": report.elapsed.as_millis() as u64,
                }));
            } else {
                output.success(&format!(
                    "Finished {} task(s) in {:.2}s",
                    report.completed.len(),
                    report.elapsed.as_secs_f64()
                ));
            }
            Ok(())
        }
        Err(err) => {
            if output.is_json() {
                report_failure(output, &err);
            }
            Err(anyhow::Error::new(err).context(format!("Running {} failed", tasks.join(", "))))
        }
    }
}

fn report_failure(output: &Output, err: &RunError) {
    output.data(&serde_json::json!({
        "success": false,
        "failed": err.task(),
        "completed": err.completed(),
    }));
}
