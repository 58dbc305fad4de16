//! Watch sessions
//!
//! Re-runs the task of a watch rule whenever one of its files changes.
//! Rules run independently of each other; a rule never runs twice at once,
//! and changes that arrive during a run collapse into one follow-up run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::executor::{ActionError, ActionExecutor};
use super::runner::{RunError, RunReport, Runner};
use crate::domain::{Coalescer, RegistryError, TaskRegistry, Trigger, WatchRule, WatchTarget};

/// A triggered run that failed; the session keeps watching
#[derive(Debug, Error)]
pub enum WatchRuleFailure {
    #[error("Watch rule '{rule}' names an unknown task: {source}")]
    Expand {
        rule: String,
        #[source]
        source: RegistryError,
    },

    #[error("Watch rule '{rule}' failed: {source}")]
    Run {
        rule: String,
        #[source]
        source: RunError,
    },

    #[error("Watch rule '{rule}' could not reload: {source}")]
    Reload {
        rule: String,
        #[source]
        source: ActionError,
    },
}

/// Lifecycle of a watch session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Watching,
    /// At least one triggered task is in flight
    Running,
    Stopped,
}

/// Counters reported when a session stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    pub runs: usize,
    pub failures: usize,
}

/// Dispatches file changes to watch rules
pub struct Watcher<'a> {
    registry: &'a TaskRegistry,
    rules: &'a [WatchRule],
    executor: &'a dyn ActionExecutor,
    root: PathBuf,
    coalescer: Mutex<Coalescer>,
    phase: Mutex<WatcherState>,
    runs: AtomicUsize,
    failures: AtomicUsize,
}

impl<'a> Watcher<'a> {
    /// Creates a watcher; changed paths are matched relative to `root`
    pub fn new(
        registry: &'a TaskRegistry,
        rules: &'a [WatchRule],
        executor: &'a dyn ActionExecutor,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            rules,
            executor,
            root: root.into(),
            coalescer: Mutex::new(Coalescer::new(rules.len())),
            phase: Mutex::new(WatcherState::Idle),
            runs: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> WatcherState {
        let phase = *lock(&self.phase);
        if phase == WatcherState::Watching && lock(&self.coalescer).any_running() {
            WatcherState::Running
        } else {
            phase
        }
    }

    /// Consumes batches of changed paths until the source closes
    ///
    /// Returns once every triggered run, follow-ups included, has finished.
    pub fn run<I>(&self, events: I) -> WatchSummary
    where
        I: IntoIterator<Item = Vec<PathBuf>>,
    {
        *lock(&self.phase) = WatcherState::Watching;
        info!(rules = self.rules.len(), root = %self.root.display(), "Watching for changes");

        thread::scope(|scope| {
            for batch in events {
                for (index, paths) in self.match_rules(&batch) {
                    let rule = &self.rules[index];
                    debug!(rule = %rule.name, files = paths.len(), "Change detected");

                    match &rule.target {
                        WatchTarget::LiveReload => self.reload(rule, &paths),
                        WatchTarget::Task(task) => {
                            let trigger = lock(&self.coalescer).on_change(index);
                            match trigger {
                                Trigger::Start => {
                                    scope.spawn(move || self.drive(index, task));
                                }
                                Trigger::Coalesced => {
                                    debug!(rule = %rule.name, "Run in progress, queued a follow-up");
                                }
                            }
                        }
                    }
                }
            }
        });

        *lock(&self.phase) = WatcherState::Stopped;
        let summary = WatchSummary {
            runs: self.runs.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
        };
        info!(runs = summary.runs, failures = summary.failures, "Watch session stopped");
        summary
    }

    /// Groups changed paths by every rule they match
    fn match_rules(&self, batch: &[PathBuf]) -> BTreeMap<usize, Vec<PathBuf>> {
        let mut matched: BTreeMap<usize, Vec<PathBuf>> = BTreeMap::new();

        for path in batch {
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            for (index, rule) in self.rules.iter().enumerate() {
                if rule.matches(relative) {
                    matched.entry(index).or_default().push(path.clone());
                }
            }
        }

        matched
    }

    /// Runs a rule's task until no follow-up is queued
    fn drive(&self, index: usize, task: &str) {
        loop {
            if let Err(failure) = self.run_rule(index, task) {
                self.failures.fetch_add(1, Ordering::SeqCst);
                error!("{}", failure);
            }

            if !lock(&self.coalescer).on_complete(index) {
                break;
            }
            debug!(rule = %self.rules[index].name, "Running queued follow-up");
        }
    }

    fn run_rule(&self, index: usize, task: &str) -> Result<RunReport, WatchRuleFailure> {
        let rule = &self.rules[index];
        let sequence = self
            .registry
            .expand(task)
            .map_err(|source| WatchRuleFailure::Expand {
                rule: rule.name.clone(),
                source,
            })?;

        self.runs.fetch_add(1, Ordering::SeqCst);
        let report = Runner::new(self.executor)
            .run(&sequence)
            .map_err(|source| WatchRuleFailure::Run {
                rule: rule.name.clone(),
                source,
            })?;

        info!(rule = %rule.name, task, elapsed_ms = report.elapsed.as_millis() as u64, "Rebuilt");
        Ok(report)
    }

    fn reload(&self, rule: &WatchRule, paths: &[PathBuf]) {
        if let Err(source) = self.executor.reload(paths) {
            let failure = WatchRuleFailure::Reload {
                rule: rule.name.clone(),
                source,
            };
            self.failures.fetch_add(1, Ordering::SeqCst);
            warn!("{}", failure);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Filesystem change notifications, debounced into batches
pub struct NotifyWatchService {
    debounce: Duration,
}

impl NotifyWatchService {
    pub fn new(debounce: Duration) -> Self {
        Self { debounce }
    }

    /// Starts watching `root` recursively
    pub fn subscribe(&self, root: &Path) -> Result<WatchSubscription, ActionError> {
        let (tx, rx) = mpsc::channel();
        let mut debouncer = new_debouncer(self.debounce, tx)?;

        debouncer.watcher().watch(root, RecursiveMode::Recursive)?;

        Ok(WatchSubscription {
            _debouncer: debouncer,
            rx,
        })
    }
}

/// An active subscription; iterating yields batches of changed paths
pub struct WatchSubscription {
    _debouncer: Debouncer<RecommendedWatcher>,
    rx: Receiver<DebounceEventResult>,
}

impl Iterator for WatchSubscription {
    type Item = Vec<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.rx.recv() {
                Ok(Ok(events)) => {
                    let paths: Vec<PathBuf> = events.into_iter().map(|e| e.path).collect();
                    if !paths.is_empty() {
                        return Some(paths);
                    }
                }
                Ok(Err(error)) => {
                    warn!("Watch error: {:?}", error);
                }
                Err(_) => return None,
            }
        }
    }
}
