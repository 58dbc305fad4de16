//! Task definitions
//!
//! A task either performs one collaborator [`Action`] or, when it has no
//! action, only sequences its dependencies (a composite task).

use serde::Serialize;

use super::mode::{Mode, Step, TaskKey, TemplateProfile};

/// Options for a stylesheet compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StyleOptions {
    pub mode: Mode,
    /// Production requests minified css
    pub minify: bool,
}

/// A single invocation of an external collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    CleanOutput,
    CopyStatic,
    CompileStyles(StyleOptions),
    Autoprefix,
    ConcatScripts,
    MinifyScripts,
    CleanGeneratedScripts,
    RenderTemplates { profile: TemplateProfile },
    Serve,
    OpenBrowser,
    Watch,
    KeepAlive,
}

impl Action {
    /// Returns the label recorded in action logs
    pub fn label(&self) -> String {
        match self {
            Action::CleanOutput => "clean".to_string(),
            Action::CopyStatic => "copy".to_string(),
            Action::CompileStyles(options) => format!("less:{}", options.mode),
            Action::Autoprefix => "autoprefix".to_string(),
            Action::ConcatScripts => "concat".to_string(),
            Action::MinifyScripts => "minify".to_string(),
            Action::CleanGeneratedScripts => "clean:scripts".to_string(),
            Action::RenderTemplates { profile } => format!("jade:{}", profile.as_str()),
            Action::Serve => "serve".to_string(),
            Action::OpenBrowser => "open".to_string(),
            Action::Watch => "watch".to_string(),
            Action::KeepAlive => "express-keepalive".to_string(),
        }
    }

    /// Returns true if the action blocks for the lifetime of the process
    pub fn is_long_running(&self) -> bool {
        matches!(self, Action::Watch | Action::KeepAlive)
    }
}

impl From<Step> for Action {
    fn from(step: Step) -> Self {
        match step {
            Step::CleanBuild => Action::CleanOutput,
            Step::Copy => Action::CopyStatic,
            Step::Less(mode) => Action::CompileStyles(StyleOptions {
                mode,
                minify: mode == Mode::Production,
            }),
            Step::Autoprefix => Action::Autoprefix,
            Step::Concat => Action::ConcatScripts,
            Step::Minify => Action::MinifyScripts,
            Step::CleanScripts => Action::CleanGeneratedScripts,
            Step::Jade(profile) => Action::RenderTemplates { profile },
            Step::Serve => Action::Serve,
            Step::Open => Action::OpenBrowser,
            Step::Watch => Action::Watch,
            Step::KeepAlive => Action::KeepAlive,
        }
    }
}

/// An immutable task record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDefinition {
    pub name: String,
    pub description: String,
    /// Tasks run before this one, in the listed order
    pub dependencies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

impl TaskDefinition {
    /// Creates a task that performs an action
    pub fn leaf(name: impl Into<String>, description: impl Into<String>, action: Action) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            dependencies: Vec::new(),
            action: Some(action),
        }
    }

    /// Creates a task that only runs its dependencies
    pub fn composite<I, S>(name: impl Into<String>, description: impl Into<String>, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            description: description.into(),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            action: None,
        }
    }

    /// Creates the leaf task for a pipeline step
    pub fn for_step(step: Step, description: impl Into<String>) -> Self {
        Self::leaf(TaskKey::Step(step).name(), description, Action::from(step))
    }

    pub fn is_composite(&self) -> bool {
        self.action.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_styles_are_minified() {
        let dev = Action::from(Step::Less(Mode::Development));
        let prod = Action::from(Step::Less(Mode::Production));

        assert_eq!(
            dev,
            Action::CompileStyles(StyleOptions {
                mode: Mode::Development,
                minify: false
            })
        );
        assert_eq!(
            prod,
            Action::CompileStyles(StyleOptions {
                mode: Mode::Production,
                minify: true
            })
        );
    }

    #[test]
    fn labels_follow_steps() {
        assert_eq!(Action::from(Step::CleanBuild).label(), "clean");
        assert_eq!(Action::from(Step::Less(Mode::Production)).label(), "less:production");
        assert_eq!(Action::from(Step::Jade(TemplateProfile::Release)).label(), "jade:release");
        assert_eq!(Action::from(Step::KeepAlive).label(), "express-keepalive");
    }

    #[test]
    fn composite_has_no_action() {
        let task = TaskDefinition::composite("all", "Everything", ["a", "b"]);
        assert!(task.is_composite());
        assert_eq!(task.dependencies, vec!["a", "b"]);

        let leaf = TaskDefinition::for_step(Step::Concat, "Concatenate scripts");
        assert!(!leaf.is_composite());
        assert_eq!(leaf.name, "concat");
    }

    #[test]
    fn long_running_actions() {
        assert!(Action::Watch.is_long_running());
        assert!(Action::KeepAlive.is_long_running());
        assert!(!Action::Serve.is_long_running());
    }
}
