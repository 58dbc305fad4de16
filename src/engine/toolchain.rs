//! The production [`ActionExecutor`]
//!
//! Dispatches every [`Action`] to the collaborator that performs it, using
//! the paths and commands of a [`Project`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tracing::info;

use super::collaborators::command::{
    CommandAutoprefixer, CommandBrowserLauncher, CommandScriptBundler, CommandServer,
    CommandStyleCompiler, CommandTemplate, CommandTemplateRenderer,
};
use super::collaborators::fs::{compile_patterns, remove_path, resolve_globs, FsCopier};
use super::collaborators::{
    Autoprefixer, BrowserLauncher, HttpStaticServer, ScriptBundler, ServeOptions, StaticCopier,
    StyleCompiler, TemplateRenderer,
};
use super::executor::{ActionError, ActionExecutor};
use super::watcher::{NotifyWatchService, Watcher};
use crate::domain::{Action, Mode, TaskRegistry};
use crate::project::Project;

/// Runs actions against a project with its configured collaborators
pub struct Toolchain {
    project: Project,
    styles: Box<dyn StyleCompiler>,
    prefixer: Box<dyn Autoprefixer>,
    scripts: Box<dyn ScriptBundler>,
    templates: Box<dyn TemplateRenderer>,
    copier: Box<dyn StaticCopier>,
    server: Box<dyn HttpStaticServer>,
    browser: Box<dyn BrowserLauncher>,
    /// Needed by the `watch` action to re-run tasks
    registry: Option<Arc<TaskRegistry>>,
}

impl Toolchain {
    /// Builds the command-backed collaborators from the project configuration
    pub fn from_project(project: Project) -> Self {
        let config = project.config().clone();
        let cwd = project.root().to_path_buf();

        Self {
            styles: Box::new(CommandStyleCompiler {
                command: CommandTemplate::new(config.styles.command),
                minify_args: config.styles.minify_args,
                cwd: cwd.clone(),
            }),
            prefixer: Box::new(CommandAutoprefixer {
                command: CommandTemplate::new(config.autoprefixer.command),
                cwd: cwd.clone(),
            }),
            scripts: Box::new(CommandScriptBundler {
                minify_command: CommandTemplate::new(config.scripts.minify_command),
                cwd: cwd.clone(),
            }),
            templates: Box::new(CommandTemplateRenderer {
                command: CommandTemplate::new(config.templates.command),
                pretty_args: config.templates.pretty_args,
                cwd: cwd.clone(),
            }),
            copier: Box::new(FsCopier),
            server: Box::new(CommandServer::new(
                CommandTemplate::new(config.server.command),
                config.server.reload_command.map(CommandTemplate::new),
                cwd.clone(),
            )),
            browser: Box::new(CommandBrowserLauncher {
                command: CommandTemplate::new(config.browser.effective_command()),
                cwd,
            }),
            registry: None,
            project,
        }
    }

    /// Enables the `watch` action
    pub fn with_registry(mut self, registry: Arc<TaskRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_server(mut self, server: Box<dyn HttpStaticServer>) -> Self {
        self.server = server;
        self
    }

    pub fn with_browser(mut self, browser: Box<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }

    /// Expands the configured banner template
    pub fn banner(&self) -> String {
        self.project
            .config()
            .scripts
            .banner
            .replace("{name}", &self.project.package_name())
            .replace("{date}", &Local::now().format("%d-%m-%Y").to_string())
    }

    /// Resolves script globs, never including the bundle itself
    fn scripts_matching(&self, patterns: &[String]) -> Result<Vec<PathBuf>, ActionError> {
        let bundle = self.project.path(&self.project.config().scripts.bundle);
        let mut files = resolve_globs(self.project.root(), patterns)?;
        files.retain(|f| f != &bundle);
        Ok(files)
    }

    /// Scripts to bundle, in configured order
    fn script_sources(&self) -> Result<Vec<PathBuf>, ActionError> {
        self.scripts_matching(&self.project.config().scripts.sources)
    }

    /// Script copies left in the output tree
    fn generated_scripts(&self) -> Result<Vec<PathBuf>, ActionError> {
        self.scripts_matching(&self.project.config().scripts.generated)
    }

    fn serve_options(&self) -> ServeOptions {
        let server = &self.project.config().server;
        ServeOptions {
            roots: server.bases.iter().map(|b| self.project.path(b)).collect(),
            port: server.port,
            hostname: server.hostname.clone(),
            livereload: server.livereload,
        }
    }

    fn watch(&self) -> Result<(), ActionError> {
        let registry = self.registry.as_ref().ok_or_else(|| {
            ActionError::Unsupported("watch needs the task registry".to_string())
        })?;

        let config = self.project.config();
        let rules = config.watch.rules(Mode::Development, config.server.livereload)?;
        let root = canonical(self.project.root());

        let subscription = NotifyWatchService::new(Duration::from_millis(config.watch.debounce_ms))
            .subscribe(&root)?;

        Watcher::new(registry, &rules, self, root).run(subscription);
        Ok(())
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

impl ActionExecutor for Toolchain {
    fn execute(&self, action: &Action) -> Result<(), ActionError> {
        let config = self.project.config();

        match action {
            Action::CleanOutput => remove_path(&self.project.output_dir()),
            Action::CopyStatic => {
                let exclude = compile_patterns(&config.copy.exclude)?;
                let copied = self.copier.copy(
                    &self.project.path(&config.paths.source),
                    &exclude,
                    &self.project.output_dir(),
                )?;
                info!(files = copied, "Copied static assets");
                Ok(())
            }
            Action::CompileStyles(options) => self.styles.compile(
                &self.project.path(&config.styles.entry),
                &self.project.path(&config.styles.output),
                *options,
            ),
            Action::Autoprefix => {
                let files = resolve_globs(
                    self.project.root(),
                    std::slice::from_ref(&config.autoprefixer.files),
                )?;
                self.prefixer.apply(&files, &config.autoprefixer.browsers)
            }
            Action::ConcatScripts => {
                let files = self.script_sources()?;
                self.scripts
                    .concat(&files, &self.project.path(&config.scripts.bundle))
            }
            Action::MinifyScripts => {
                let files = self.script_sources()?;
                self.scripts.minify(
                    &files,
                    &self.banner(),
                    &self.project.path(&config.scripts.bundle),
                )
            }
            Action::CleanGeneratedScripts => {
                for file in self.generated_scripts()? {
                    remove_path(&file)?;
                }
                Ok(())
            }
            Action::RenderTemplates { profile } => self.templates.render(
                &self.project.path(&config.templates.source),
                &self.project.path(&config.templates.output),
                profile.options(),
            ),
            Action::Serve => self.server.serve(&self.serve_options()),
            Action::OpenBrowser => self.browser.open(&config.server.url()),
            Action::Watch => self.watch(),
            Action::KeepAlive => self.server.wait(),
        }
    }

    fn reload(&self, changed: &[PathBuf]) -> Result<(), ActionError> {
        self.server.reload(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::PipelineConfig;
    use std::fs;
    use tempfile::TempDir;

    fn project(dir: &TempDir) -> Project {
        let mut config = PipelineConfig::default();
        config.name = Some("site".to_string());
        Project::with_config(dir.path(), config)
    }

    fn touch(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn banner_uses_name_and_date() {
        let dir = TempDir::new().unwrap();
        let toolchain = Toolchain::from_project(project(&dir));

        let banner = toolchain.banner();
        let today = Local::now().format("%d-%m-%Y").to_string();
        assert_eq!(banner, format!("/*! site {} */\n", today));
    }

    #[test]
    fn clean_copy_concat_and_clean_scripts() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/js/b.js", "var b;");
        touch(dir.path(), "src/js/a.js", "var a;");
        touch(dir.path(), "src/less/style.less", "body {}");
        touch(dir.path(), "dist/stale.txt", "old");

        let toolchain = Toolchain::from_project(project(&dir));
        toolchain.execute(&Action::CleanOutput).unwrap();
        assert!(!dir.path().join("dist").exists());

        toolchain.execute(&Action::CopyStatic).unwrap();
        assert!(dir.path().join("dist/js/a.js").is_file());
        assert!(!dir.path().join("dist/less").exists());

        toolchain.execute(&Action::ConcatScripts).unwrap();
        let bundle = fs::read_to_string(dir.path().join("dist/js/app.js")).unwrap();
        assert_eq!(bundle, "var a;\nvar b;");

        // Re-bundling must not fold the bundle into itself
        toolchain.execute(&Action::ConcatScripts).unwrap();
        let again = fs::read_to_string(dir.path().join("dist/js/app.js")).unwrap();
        assert_eq!(again, bundle);

        toolchain.execute(&Action::CleanGeneratedScripts).unwrap();
        assert!(dir.path().join("dist/js/app.js").is_file());
        assert!(!dir.path().join("dist/js/a.js").exists());
        assert!(!dir.path().join("dist/js/b.js").exists());
    }

    #[test]
    fn script_change_rebundles_after_clean_scripts() {
        use crate::domain::{PipelineComposer, WatchCategory, WatchTarget};
        use crate::engine::Runner;

        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/js/a.js", "var a = 1;");
        touch(dir.path(), "src/js/b.js", "var b = 2;");

        let registry = PipelineComposer::registry().unwrap();
        let toolchain = Toolchain::from_project(project(&dir));
        let runner = Runner::new(&toolchain);

        for task in ["clean:build", "copy", "scripts:development"] {
            runner.run(&registry.expand(task).unwrap()).unwrap();
        }
        let bundle = dir.path().join("dist/js/app.js");
        assert_eq!(fs::read_to_string(&bundle).unwrap(), "var a = 1;\nvar b = 2;");
        assert!(!dir.path().join("dist/js/a.js").exists());

        touch(dir.path(), "src/js/a.js", "var a = 42;");
        let WatchTarget::Task(target) = WatchCategory::Scripts.target(Mode::Development).unwrap() else {
            panic!("scripts rule should run a task");
        };
        runner.run(&registry.expand(&target).unwrap()).unwrap();

        assert_eq!(fs::read_to_string(&bundle).unwrap(), "var a = 42;\nvar b = 2;");
        assert!(dir.path().join("src/js/a.js").is_file());
    }

    #[test]
    fn clean_scripts_never_touches_sources() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/js/a.js", "var a;");
        touch(dir.path(), "dist/js/a.js", "var a;");
        touch(dir.path(), "dist/js/app.js", "var a;");

        let toolchain = Toolchain::from_project(project(&dir));
        toolchain.execute(&Action::CleanGeneratedScripts).unwrap();

        assert!(dir.path().join("src/js/a.js").is_file());
        assert!(dir.path().join("dist/js/app.js").is_file());
        assert!(!dir.path().join("dist/js/a.js").exists());
    }

    #[test]
    fn watch_without_registry_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let toolchain = Toolchain::from_project(project(&dir));

        let err = toolchain.execute(&Action::Watch).unwrap_err();
        assert!(matches!(err, ActionError::Unsupported(_)));
    }

    struct NoServer;

    impl HttpStaticServer for NoServer {
        fn serve(&self, _options: &ServeOptions) -> Result<(), ActionError> {
            Err(ActionError::Other("port in use".to_string()))
        }

        fn reload(&self, _changed: &[PathBuf]) -> Result<(), ActionError> {
            Ok(())
        }

        fn wait(&self) -> Result<(), ActionError> {
            Ok(())
        }
    }

    #[test]
    fn serve_failure_surfaces() {
        let dir = TempDir::new().unwrap();
        let toolchain = Toolchain::from_project(project(&dir)).with_server(Box::new(NoServer));

        let err = toolchain.execute(&Action::Serve).unwrap_err();
        assert_eq!(err.to_string(), "port in use");
        assert!(toolchain.execute(&Action::KeepAlive).is_ok());
    }

    struct RecordingBrowser(std::sync::Mutex<Vec<String>>);

    impl BrowserLauncher for RecordingBrowser {
        fn open(&self, url: &str) -> Result<(), ActionError> {
            self.0.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    #[test]
    fn open_uses_localhost_and_port() {
        let dir = TempDir::new().unwrap();
        let mut config = PipelineConfig::default();
        config.server.port = 8080;
        let browser = Arc::new(RecordingBrowser(Default::default()));

        struct Shared(Arc<RecordingBrowser>);
        impl BrowserLauncher for Shared {
            fn open(&self, url: &str) -> Result<(), ActionError> {
                self.0.open(url)
            }
        }

        let toolchain = Toolchain::from_project(Project::with_config(dir.path(), config))
            .with_browser(Box::new(Shared(Arc::clone(&browser))));
        toolchain.execute(&Action::OpenBrowser).unwrap();

        assert_eq!(*browser.0.lock().unwrap(), vec!["http://localhost:8080"]);
    }

    #[test]
    fn serve_options_resolve_bases() {
        let dir = TempDir::new().unwrap();
        let toolchain = Toolchain::from_project(project(&dir));

        let options = toolchain.serve_options();
        assert_eq!(options.roots, vec![dir.path().join("dist")]);
        assert_eq!(options.port, 3000);
        assert!(options.livereload);
    }
}
