//! Task registry
//!
//! Owns every [`TaskDefinition`] and expands a task name into the ordered
//! sequence of actionable tasks it stands for. Uses petgraph for the reverse
//! (dependent) queries.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use super::task::TaskDefinition;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Task already registered: {0}")]
    DuplicateTask(String),

    #[error("Task '{task}' depends on unregistered task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("Self-dependency not allowed: {0}")]
    SelfDependency(String),

    #[error("Task not found: {0}")]
    UnknownTask(String),
}

/// A registry of named tasks
///
/// Dependencies must be registered before their dependents, so the graph is
/// acyclic by construction.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    /// Edge direction: dependency -> dependent
    graph: DiGraph<TaskDefinition, ()>,

    /// Map from task name to node index
    node_map: HashMap<String, NodeIndex>,
}

impl TaskRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Builds a registry from a declarative list, registering in order
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = TaskDefinition>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for definition in definitions {
            registry.register(definition)?;
        }
        Ok(registry)
    }

    /// Registers a task
    ///
    /// Nothing is inserted unless every check passes.
    pub fn register(&mut self, definition: TaskDefinition) -> Result<(), RegistryError> {
        if self.node_map.contains_key(&definition.name) {
            return Err(RegistryError::DuplicateTask(definition.name));
        }

        let mut dep_indices = Vec::with_capacity(definition.dependencies.len());
        for dep in &definition.dependencies {
            if dep == &definition.name {
                return Err(RegistryError::SelfDependency(definition.name.clone()));
            }
            let idx = self
                .node_map
                .get(dep)
                .ok_or_else(|| RegistryError::UnknownDependency {
                    task: definition.name.clone(),
                    dependency: dep.clone(),
                })?;
            dep_indices.push(*idx);
        }

        let name = definition.name.clone();
        let idx = self.graph.add_node(definition);
        for dep_idx in dep_indices {
            // A task may list the same dependency twice; one edge is enough
            if self.graph.find_edge(dep_idx, idx).is_none() {
                self.graph.add_edge(dep_idx, idx, ());
            }
        }
        self.node_map.insert(name, idx);

        Ok(())
    }

    /// Looks up a task by name
    pub fn get(&self, name: &str) -> Option<&TaskDefinition> {
        self.node_map
            .get(name)
            .and_then(|idx| self.graph.node_weight(*idx))
    }

    /// Returns true if the registry contains the task
    pub fn contains(&self, name: &str) -> bool {
        self.node_map.contains_key(name)
    }

    /// Returns the number of registered tasks
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    /// Returns all tasks in registration order
    pub fn tasks(&self) -> impl Iterator<Item = &TaskDefinition> {
        // Nodes are never removed, so indices follow insertion order
        self.graph.node_weights()
    }

    /// Returns the tasks that list `name` as a direct dependency
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        let idx = match self.node_map.get(name) {
            Some(idx) => *idx,
            None => return vec![],
        };

        let mut dependents: Vec<_> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        dependents.sort();

        dependents
            .into_iter()
            .filter_map(|idx| self.graph.node_weight(idx))
            .map(|t| t.name.as_str())
            .collect()
    }

    /// Returns tasks no other task depends on, in registration order
    pub fn entry_points(&self) -> Vec<&TaskDefinition> {
        self.graph
            .node_indices()
            .filter(|idx| {
                self.graph
                    .neighbors_directed(*idx, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .filter_map(|idx| self.graph.node_weight(idx))
            .collect()
    }

    /// Expands a task into the ordered sequence of tasks with actions
    ///
    /// Dependencies are expanded depth-first in their listed order. A task
    /// already scheduled earlier is skipped, so every dependency precedes its
    /// dependent and each task appears at most once.
    pub fn expand(&self, name: &str) -> Result<Vec<&TaskDefinition>, RegistryError> {
        self.expand_all([name])
    }

    /// Expands several tasks in turn, deduplicating across all of them
    pub fn expand_all<'n>(
        &self,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<Vec<&TaskDefinition>, RegistryError> {
        let mut scheduled = HashSet::new();
        let mut sequence = Vec::new();

        for name in names {
            let idx = self
                .node_map
                .get(name)
                .ok_or_else(|| RegistryError::UnknownTask(name.to_string()))?;
            self.schedule(*idx, &mut scheduled, &mut sequence);
        }

        Ok(sequence)
    }

    fn schedule<'a>(
        &'a self,
        idx: NodeIndex,
        scheduled: &mut HashSet<NodeIndex>,
        sequence: &mut Vec<&'a TaskDefinition>,
    ) {
        if !scheduled.insert(idx) {
            return;
        }

        let task = &self.graph[idx];
        for dep in &task.dependencies {
            // Dependencies were verified at registration
            if let Some(dep_idx) = self.node_map.get(dep) {
                self.schedule(*dep_idx, scheduled, sequence);
            }
        }

        if !task.is_composite() {
            sequence.push(task);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::Action;
    use proptest::prelude::*;

    fn leaf(name: &str) -> TaskDefinition {
        TaskDefinition::leaf(name, name, Action::CopyStatic)
    }

    fn names<'a>(tasks: &[&'a TaskDefinition]) -> Vec<&'a str> {
        tasks.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn empty_registry() {
        let registry = TaskRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn register_and_get() {
        let mut registry = TaskRegistry::new();
        registry.register(leaf("a")).unwrap();

        assert!(registry.contains("a"));
        assert_eq!(registry.get("a").unwrap().name, "a");
        assert!(registry.get("b").is_none());
    }

    #[test]
    fn tasks_in_registration_order() {
        let mut registry = TaskRegistry::new();
        registry.register(leaf("b")).unwrap();
        registry.register(leaf("a")).unwrap();
        registry.register(leaf("c")).unwrap();

        let tasks: Vec<&TaskDefinition> = registry.tasks().collect();
        assert_eq!(names(&tasks), vec!["b", "a", "c"]);
    }

    #[test]
    fn duplicate_keeps_first() {
        let mut registry = TaskRegistry::new();
        registry.register(leaf("a")).unwrap();

        let second = TaskDefinition::leaf("a", "replacement", Action::Serve);
        let result = registry.register(second);

        assert_eq!(result, Err(RegistryError::DuplicateTask("a".to_string())));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").unwrap().action, Some(Action::CopyStatic));
    }

    #[test]
    fn unknown_dependency_leaves_registry_unchanged() {
        let mut registry = TaskRegistry::new();
        registry.register(leaf("a")).unwrap();

        let result = registry.register(TaskDefinition::composite("c", "", ["a", "missing"]));

        assert_eq!(
            result,
            Err(RegistryError::UnknownDependency {
                task: "c".to_string(),
                dependency: "missing".to_string(),
            })
        );
        assert!(!registry.contains("c"));
        assert_eq!(registry.len(), 1);
        assert!(registry.dependents("a").is_empty());
    }

    #[test]
    fn self_dependency_rejected() {
        let mut registry = TaskRegistry::new();
        let result = registry.register(TaskDefinition::composite("loop", "", ["loop"]));
        assert_eq!(result, Err(RegistryError::SelfDependency("loop".to_string())));
    }

    #[test]
    fn expand_unknown_task() {
        let registry = TaskRegistry::new();
        assert_eq!(
            registry.expand("nope"),
            Err(RegistryError::UnknownTask("nope".to_string()))
        );
    }

    #[test]
    fn expand_keeps_declaration_order() {
        let registry = TaskRegistry::from_definitions([
            leaf("z"),
            leaf("a"),
            leaf("m"),
            TaskDefinition::composite("all", "", ["z", "a", "m"]),
        ])
        .unwrap();

        let sequence = registry.expand("all").unwrap();
        assert_eq!(names(&sequence), vec!["z", "a", "m"]);
    }

    #[test]
    fn expand_deduplicates_shared_dependencies() {
        let registry = TaskRegistry::from_definitions([
            leaf("clean"),
            leaf("css"),
            leaf("js"),
            TaskDefinition::composite("styles", "", ["clean", "css"]),
            TaskDefinition::composite("scripts", "", ["clean", "js"]),
            TaskDefinition::composite("all", "", ["styles", "scripts", "css"]),
        ])
        .unwrap();

        let sequence = registry.expand("all").unwrap();
        assert_eq!(names(&sequence), vec!["clean", "css", "js"]);
    }

    #[test]
    fn expand_includes_leaf_with_dependencies() {
        let mut registry = TaskRegistry::new();
        registry.register(leaf("compile")).unwrap();
        let mut deploy = leaf("deploy");
        deploy.dependencies.push("compile".to_string());
        registry.register(deploy).unwrap();

        assert_eq!(names(&registry.expand("deploy").unwrap()), vec!["compile", "deploy"]);
    }

    #[test]
    fn expand_all_deduplicates_across_requests() {
        let registry = TaskRegistry::from_definitions([
            leaf("a"),
            leaf("b"),
            TaskDefinition::composite("x", "", ["a"]),
            TaskDefinition::composite("y", "", ["a", "b"]),
        ])
        .unwrap();

        let sequence = registry.expand_all(["x", "y"]).unwrap();
        assert_eq!(names(&sequence), vec!["a", "b"]);
    }

    #[test]
    fn dependents_and_entry_points() {
        let registry = TaskRegistry::from_definitions([
            leaf("a"),
            leaf("b"),
            TaskDefinition::composite("x", "", ["a"]),
            TaskDefinition::composite("y", "", ["a", "b"]),
        ])
        .unwrap();

        assert_eq!(registry.dependents("a"), vec!["x", "y"]);
        assert_eq!(registry.dependents("y"), Vec::<&str>::new());

        let entries: Vec<_> = registry.entry_points().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(entries, vec!["x", "y"]);
    }

    /// Random DAG: task `i` may depend on any task registered before it.
    fn dag_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
        (1usize..24).prop_flat_map(|n| {
            (0..n)
                .map(|i| proptest::collection::vec(0..i.max(1), 0..=i.min(4)))
                .collect::<Vec<_>>()
        })
    }

    fn build_dag(deps: &[Vec<usize>], composite_mask: u32) -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        for (i, task_deps) in deps.iter().enumerate() {
            let dependencies: Vec<String> = if i == 0 {
                vec![]
            } else {
                task_deps.iter().map(|d| format!("t{}", d)).collect()
            };
            let mut def = if composite_mask & (1 << (i % 32)) != 0 {
                TaskDefinition::composite(format!("t{}", i), "", Vec::<String>::new())
            } else {
                leaf(&format!("t{}", i))
            };
            def.dependencies = dependencies;
            registry.register(def).unwrap();
        }
        registry
    }

    proptest! {
        #[test]
        fn expansion_orders_dependencies_first(deps in dag_strategy(), mask in any::<u32>()) {
            let registry = build_dag(&deps, mask);

            for root in 0..deps.len() {
                let sequence = registry.expand(&format!("t{}", root)).unwrap();
                let order = names(&sequence);

                let unique: HashSet<_> = order.iter().collect();
                prop_assert_eq!(unique.len(), order.len());

                for (pos, task) in sequence.iter().enumerate() {
                    prop_assert!(!task.is_composite());
                    for dep in &task.dependencies {
                        if let Some(dep_pos) = order.iter().position(|n| *n == dep.as_str()) {
                            prop_assert!(dep_pos < pos);
                        } else {
                            prop_assert!(registry.get(dep).unwrap().is_composite());
                        }
                    }
                }
            }
        }
    }
}
