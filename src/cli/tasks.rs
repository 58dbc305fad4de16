//! Task listing

use anyhow::Result;

use super::output::Output;
use super::pipeline::registry;

/// Lists every registered task with its dependencies and dependents
pub fn list(output: &Output, entry_only: bool) -> Result<()> {
    let registry = registry()?;

    let tasks: Vec<_> = if entry_only {
        registry.entry_points()
    } else {
        registry.tasks().collect()
    };

    if output.is_json() {
        let items: Vec<_> = tasks
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "dependencies": t.dependencies,
                    "dependents": registry.dependents(&t.name),
                    "action": t.action.as_ref().map(|a| a.label()),
                })
            })
            .collect();
        output.data(&items);
        return Ok(());
    }

    println!("{:<24} {:<44} DESCRIPTION", "TASK", "RUNS");
    println!("{}", "-".repeat(100));
    for task in &tasks {
        let runs = if task.is_composite() {
            task.dependencies.join(", ")
        } else {
            "-".to_string()
        };
        println!("{:<24} {:<44} {}", task.name, runs, task.description);
    }
    output.blank();
    println!("{} task(s)", tasks.len());

    Ok(())
}
