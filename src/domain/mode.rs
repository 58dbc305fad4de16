//! Build modes and typed task keys
//!
//! Task names are never assembled by hand. Every name in the pipeline comes
//! from [`TaskKey::name`], so a misspelled `"scripts:prodution"` cannot exist.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown mode: {0} (expected 'development' or 'production')")]
pub struct ParseModeError(String);

/// The environment a pipeline is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Readable output, debug templates, file watching
    #[default]
    Development,
    /// Minified output, release templates, no watching
    Production,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Development, Mode::Production];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Mode::Development),
            "production" | "prod" => Ok(Mode::Production),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Data handed to the template renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub pretty: bool,
    pub debug: bool,
}

/// The two template rendering configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateProfile {
    /// Pretty-printed, debug-annotated markup
    Debug,
    /// Compact, debug-stripped markup
    Release,
}

impl TemplateProfile {
    const DEBUG: RenderOptions = RenderOptions {
        pretty: true,
        debug: true,
    };

    const RELEASE: RenderOptions = RenderOptions {
        pretty: false,
        debug: false,
    };

    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Development => TemplateProfile::Debug,
            Mode::Production => TemplateProfile::Release,
        }
    }

    pub fn options(&self) -> RenderOptions {
        match self {
            TemplateProfile::Debug => Self::DEBUG,
            TemplateProfile::Release => Self::RELEASE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateProfile::Debug => "debug",
            TemplateProfile::Release => "release",
        }
    }
}

/// Kinds of mode-specific composite tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Stylesheets,
    Scripts,
    Build,
    Server,
    Main,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Stylesheets => "stylesheets",
            TaskKind::Scripts => "scripts",
            TaskKind::Build => "build",
            TaskKind::Server => "server",
            TaskKind::Main => "main",
        }
    }
}

/// Leaf tasks, each backed by exactly one collaborator action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    CleanBuild,
    Copy,
    Less(Mode),
    Autoprefix,
    Concat,
    Minify,
    CleanScripts,
    Jade(TemplateProfile),
    Serve,
    Open,
    Watch,
    KeepAlive,
}

impl Step {
    /// All leaf tasks in registration order
    pub fn all() -> Vec<Step> {
        vec![
            Step::CleanBuild,
            Step::Copy,
            Step::Less(Mode::Development),
            Step::Less(Mode::Production),
            Step::Autoprefix,
            Step::Concat,
            Step::Minify,
            Step::CleanScripts,
            Step::Jade(TemplateProfile::Debug),
            Step::Jade(TemplateProfile::Release),
            Step::Serve,
            Step::Open,
            Step::Watch,
            Step::KeepAlive,
        ]
    }
}

/// A typed task name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKey {
    Step(Step),
    Composite(TaskKind, Mode),
    /// `development` / `production`, aliases for `main:<mode>`
    Entry(Mode),
    /// `default`, alias for `development`
    Default,
}

impl TaskKey {
    pub fn name(&self) -> String {
        match self {
            TaskKey::Step(step) => match step {
                Step::CleanBuild => "clean:build".to_string(),
                Step::Copy => "copy".to_string(),
                Step::Less(mode) => format!("less:{}", mode),
                Step::Autoprefix => "autoprefix".to_string(),
                Step::Concat => "concat".to_string(),
                Step::Minify => "minify".to_string(),
                Step::CleanScripts => "clean:scripts".to_string(),
                Step::Jade(profile) => format!("jade:{}", profile.as_str()),
                Step::Serve => "serve".to_string(),
                Step::Open => "open".to_string(),
                Step::Watch => "watch".to_string(),
                Step::KeepAlive => "express-keepalive".to_string(),
            },
            TaskKey::Composite(kind, mode) => format!("{}:{}", kind.as_str(), mode),
            TaskKey::Entry(mode) => mode.as_str().to_string(),
            TaskKey::Default => "default".to_string(),
        }
    }
}

impl From<Step> for TaskKey {
    fn from(step: Step) -> Self {
        TaskKey::Step(step)
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
