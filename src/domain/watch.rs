//! Watch rules
//!
//! A watch rule maps a set of globs to the one task re-run when a matching
//! file changes. The [`Coalescer`] keeps at most one run in flight per rule.

use std::path::Path;

use glob::{MatchOptions, Pattern};
use thiserror::Error;

use super::mode::{Mode, Step, TaskKey, TaskKind, TemplateProfile};

#[derive(Debug, Error, PartialEq)]
pub enum WatchError {
    #[error("Watching is only supported in development mode (got {0})")]
    UnsupportedMode(Mode),

    #[error("Invalid watch pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// File categories with their own watch rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchCategory {
    Scripts,
    Styles,
    Templates,
    /// Compiled output; only signals live reload
    Output,
}

impl WatchCategory {
    pub const ALL: [WatchCategory; 4] = [
        WatchCategory::Scripts,
        WatchCategory::Styles,
        WatchCategory::Templates,
        WatchCategory::Output,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WatchCategory::Scripts => "scripts",
            WatchCategory::Styles => "styles",
            WatchCategory::Templates => "templates",
            WatchCategory::Output => "output",
        }
    }

    /// Returns what a change in this category triggers
    pub fn target(&self, mode: Mode) -> Result<WatchTarget, WatchError> {
        if mode != Mode::Development {
            return Err(WatchError::UnsupportedMode(mode));
        }

        let key = match self {
            WatchCategory::Scripts => TaskKey::Step(Step::Concat),
            WatchCategory::Styles => TaskKey::Composite(TaskKind::Stylesheets, Mode::Development),
            WatchCategory::Templates => TaskKey::Step(Step::Jade(TemplateProfile::Debug)),
            WatchCategory::Output => return Ok(WatchTarget::LiveReload),
        };
        Ok(WatchTarget::Task(key.name()))
    }
}

/// What a rule does when it fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchTarget {
    /// Expand and run the named task
    Task(String),
    /// Tell the server to reload connected browsers
    LiveReload,
}

/// A glob set and the target it triggers
#[derive(Debug, Clone)]
pub struct WatchRule {
    pub name: String,
    pub patterns: Vec<Pattern>,
    pub target: WatchTarget,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

impl WatchRule {
    /// Compiles a rule from glob strings
    pub fn new<S: AsRef<str>>(
        name: impl Into<String>,
        patterns: &[S],
        target: WatchTarget,
    ) -> Result<Self, WatchError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p.as_ref()).map_err(|e| WatchError::InvalidPattern {
                    pattern: p.as_ref().to_string(),
                    message: e.msg.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.into(),
            patterns,
            target,
        })
    }

    /// Tests a project-relative path; `*` does not cross directories
    pub fn matches(&self, path: &Path) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_path_with(path, MATCH_OPTIONS))
    }
}

/// Outcome of a change event for one rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Nothing in flight; start a run now
    Start,
    /// A run is in flight; a follow-up is queued
    Coalesced,
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    running: bool,
    pending: bool,
}

/// Per-rule run bookkeeping
///
/// Any number of changes that arrive while a rule is running collapse into
/// one follow-up run.
#[derive(Debug, Default)]
pub struct Coalescer {
    slots: Vec<Slot>,
}

impl Coalescer {
    pub fn new(rules: usize) -> Self {
        Self {
            slots: vec![Slot::default(); rules],
        }
    }

    /// Records a change for a rule
    pub fn on_change(&mut self, rule: usize) -> Trigger {
        let slot = &mut self.slots[rule];
        if slot.running {
            slot.pending = true;
            Trigger::Coalesced
        } else {
            slot.running = true;
            Trigger::Start
        }
    }

    /// Records the end of a run; true means run once more
    pub fn on_complete(&mut self, rule: usize) -> bool {
        let slot = &mut self.slots[rule];
        if slot.pending {
            slot.pending = false;
            true
        } else {
            slot.running = false;
            false
        }
    }

    pub fn is_running(&self, rule: usize) -> bool {
        self.slots[rule].running
    }

    pub fn any_running(&self) -> bool {
        self.slots.iter().any(|s| s.running)
    }
}
