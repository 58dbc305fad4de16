//! Pipeline composition
//!
//! Produces the declarative task list for both modes. Nothing here touches a
//! registry until [`PipelineComposer::registry`] feeds the list into one.

use super::mode::{Mode, Step, TaskKey, TaskKind, TemplateProfile};
use super::registry::{RegistryError, TaskRegistry};
use super::task::TaskDefinition;

/// Builds the mode-specific task graph
pub struct PipelineComposer;

impl PipelineComposer {
    /// Leaf tasks shared by both modes
    pub fn leaf_tasks() -> Vec<TaskDefinition> {
        Step::all()
            .into_iter()
            .map(|step| TaskDefinition::for_step(step, Self::step_description(step)))
            .collect()
    }

    fn step_description(step: Step) -> String {
        match step {
            Step::CleanBuild => "Wipes the output directory".to_string(),
            Step::Copy => "Copies static assets into the output directory".to_string(),
            Step::Less(Mode::Development) => "Compiles stylesheets".to_string(),
            Step::Less(Mode::Production) => "Compiles and minifies stylesheets".to_string(),
            Step::Autoprefix => "Adds vendor prefixes to compiled css".to_string(),
            Step::Concat => "Concatenates scripts into a single readable bundle".to_string(),
            Step::Minify => "Concatenates and minifies scripts with a banner".to_string(),
            Step::CleanScripts => "Removes generated scripts other than the bundle".to_string(),
            Step::Jade(TemplateProfile::Debug) => {
                "Renders templates as pretty, debug-annotated html".to_string()
            }
            Step::Jade(TemplateProfile::Release) => {
                "Renders templates as compact release html".to_string()
            }
            Step::Serve => "Starts the static file server".to_string(),
            Step::Open => "Opens the site in a browser".to_string(),
            Step::Watch => "Rebuilds assets when their sources change".to_string(),
            Step::KeepAlive => "Keeps the server running".to_string(),
        }
    }

    /// The scripts step differs structurally between modes
    fn script_step(mode: Mode) -> Step {
        match mode {
            Mode::Development => Step::Concat,
            Mode::Production => Step::Minify,
        }
    }

    /// The server ends with whatever keeps the process occupied
    fn server_tail(mode: Mode) -> Step {
        match mode {
            Mode::Development => Step::Watch,
            Mode::Production => Step::KeepAlive,
        }
    }

    /// Composite tasks for one mode, dependencies first
    pub fn composites(mode: Mode) -> Vec<TaskDefinition> {
        let name = |key: TaskKey| key.name();
        let step = |s: Step| TaskKey::Step(s).name();
        let composite = |kind: TaskKind| TaskKey::Composite(kind, mode).name();

        vec![
            TaskDefinition::composite(
                composite(TaskKind::Stylesheets),
                format!("Compiles the stylesheets in {} mode", mode),
                [step(Step::Less(mode)), step(Step::Autoprefix)],
            ),
            TaskDefinition::composite(
                composite(TaskKind::Scripts),
                format!("Compiles the scripts in {} mode", mode),
                [step(Self::script_step(mode)), step(Step::CleanScripts)],
            ),
            TaskDefinition::composite(
                composite(TaskKind::Build),
                "Compiles all of the assets and copies them to the output directory",
                [
                    step(Step::CleanBuild),
                    step(Step::Copy),
                    composite(TaskKind::Stylesheets),
                    composite(TaskKind::Scripts),
                    step(Step::Jade(TemplateProfile::for_mode(mode))),
                ],
            ),
            TaskDefinition::composite(
                composite(TaskKind::Server),
                "Starts the server and opens it in a browser",
                [step(Step::Serve), step(Step::Open), step(Self::server_tail(mode))],
            ),
            TaskDefinition::composite(
                composite(TaskKind::Main),
                format!("Builds in {} mode and runs a server", mode),
                [composite(TaskKind::Build), composite(TaskKind::Server)],
            ),
            TaskDefinition::composite(
                name(TaskKey::Entry(mode)),
                format!("Alias for {}", composite(TaskKind::Main)),
                [composite(TaskKind::Main)],
            ),
        ]
    }

    /// The `default` alias, registered after both modes
    pub fn default_task() -> TaskDefinition {
        let target = TaskKey::Entry(Mode::Development).name();
        TaskDefinition::composite(
            TaskKey::Default.name(),
            format!("Alias for {}", target),
            [target],
        )
    }

    /// The full declarative task list in registration order
    pub fn definitions() -> Vec<TaskDefinition> {
        let mut definitions = Self::leaf_tasks();
        for mode in Mode::ALL {
            definitions.extend(Self::composites(mode));
        }
        definitions.push(Self::default_task());
        definitions
    }

    /// Registers the full pipeline
    pub fn registry() -> Result<TaskRegistry, RegistryError> {
        TaskRegistry::from_definitions(Self::definitions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(registry: &TaskRegistry, name: &str) -> Vec<String> {
        registry
            .expand(name)
            .unwrap()
            .iter()
            .filter_map(|t| t.action)
            .map(|a| a.label())
            .collect()
    }

    #[test]
    fn registry_builds() {
        let registry = PipelineComposer::registry().unwrap();
        assert!(registry.contains("build:development"));
        assert!(registry.contains("server:production"));
        assert!(registry.contains("default"));
    }

    #[test]
    fn scripts_branch_by_mode() {
        let registry = PipelineComposer::registry().unwrap();
        assert_eq!(labels(&registry, "scripts:development"), vec!["concat", "clean:scripts"]);
        assert_eq!(labels(&registry, "scripts:production"), vec!["minify", "clean:scripts"]);
    }

    #[test]
    fn builds_differ_only_in_mode_specific_steps() {
        let registry = PipelineComposer::registry().unwrap();
        let dev = labels(&registry, "build:development");
        let prod = labels(&registry, "build:production");

        assert_eq!(
            dev,
            vec!["clean", "copy", "less:development", "autoprefix", "concat", "clean:scripts", "jade:debug"]
        );
        assert_eq!(
            prod,
            vec!["clean", "copy", "less:production", "autoprefix", "minify", "clean:scripts", "jade:release"]
        );

        let differing: Vec<usize> = (0..dev.len()).filter(|i| dev[*i] != prod[*i]).collect();
        // stylesheet mode, scripts, templates
        assert_eq!(differing, vec![2, 4, 6]);
    }

    #[test]
    fn server_tail_by_mode() {
        let registry = PipelineComposer::registry().unwrap();
        assert_eq!(labels(&registry, "server:development"), vec!["serve", "open", "watch"]);
        assert_eq!(
            labels(&registry, "server:production"),
            vec!["serve", "open", "express-keepalive"]
        );
    }

    #[test]
    fn main_production_sequence() {
        let registry = PipelineComposer::registry().unwrap();
        assert_eq!(
            labels(&registry, "production"),
            vec![
                "clean",
                "copy",
                "less:production",
                "autoprefix",
                "minify",
                "clean:scripts",
                "jade:release",
                "serve",
                "open",
                "express-keepalive",
            ]
        );
    }

    #[test]
    fn default_aliases_development() {
        let registry = PipelineComposer::registry().unwrap();
        assert_eq!(labels(&registry, "default"), labels(&registry, "main:development"));
        assert_eq!(labels(&registry, "development"), labels(&registry, "main:development"));
    }

    #[test]
    fn entry_points_are_the_cli_tasks() {
        let registry = PipelineComposer::registry().unwrap();
        let entries: Vec<_> = registry.entry_points().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(entries, vec!["production", "default"]);
    }
}
