//! Collaborators backed by external programs
//!
//! Commands come from configuration as argument lists with `{placeholder}`
//! substitution. An argument that is exactly `{files}` expands to one
//! argument per file.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::thread;

use tracing::{debug, info, warn};

use super::fs::{concat_files, write_file};
use super::{Autoprefixer, BrowserLauncher, HttpStaticServer, ScriptBundler, ServeOptions, StyleCompiler, TemplateRenderer};
use crate::domain::{RenderOptions, StyleOptions};
use crate::engine::executor::ActionError;

/// A configured command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    argv: Vec<String>,
}

impl CommandTemplate {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    /// Substitutes placeholders; `{files}` splices in the file list
    pub fn render(&self, vars: &[(&str, String)], files: &[PathBuf]) -> Vec<String> {
        let mut args = Vec::with_capacity(self.argv.len() + files.len());

        for arg in &self.argv {
            if arg == "{files}" {
                args.extend(files.iter().map(|f| f.display().to_string()));
                continue;
            }

            let mut rendered = arg.clone();
            for (key, value) in vars {
                rendered = rendered.replace(&format!("{{{}}}", key), value);
            }
            args.push(rendered);
        }

        args
    }

    /// Builds a ready-to-run command
    pub fn command(&self, vars: &[(&str, String)], files: &[PathBuf], cwd: &Path) -> Result<Command, ActionError> {
        let args = self.render(vars, files);
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| ActionError::Other("Empty command".to_string()))?;

        let mut command = Command::new(program);
        command.args(rest).current_dir(cwd);
        Ok(command)
    }
}

fn describe(command: &Command) -> String {
    let mut parts = vec![command.get_program().to_string_lossy().into_owned()];
    parts.extend(command.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

/// Runs a command to completion, returning its stdout
pub fn run_command(mut command: Command) -> Result<Vec<u8>, ActionError> {
    let description = describe(&command);
    debug!(command = %description, "Running command");

    let output = command
        .stdin(Stdio::null())
        .output()
        .map_err(|source| ActionError::Spawn {
            program: command.get_program().to_string_lossy().into_owned(),
            source,
        })?;

    if !output.status.success() {
        return Err(ActionError::CommandFailed {
            command: description,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output.stdout)
}

fn path_var(key: &'static str, path: &Path) -> (&'static str, String) {
    (key, path.display().to_string())
}

/// Stylesheet compiler such as `lessc`
pub struct CommandStyleCompiler {
    pub command: CommandTemplate,
    pub minify_args: Vec<String>,
    pub cwd: PathBuf,
}

impl StyleCompiler for CommandStyleCompiler {
    fn compile(&self, source: &Path, output: &Path, options: StyleOptions) -> Result<(), ActionError> {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).map_err(ActionError::io(parent))?;
        }

        let vars = [path_var("input", source), path_var("output", output)];
        let mut command = self.command.command(&vars, &[], &self.cwd)?;
        if options.minify {
            command.args(&self.minify_args);
        }
        run_command(command).map(|_| ())
    }
}

/// Prefixer such as `postcss --use autoprefixer`
pub struct CommandAutoprefixer {
    pub command: CommandTemplate,
    pub cwd: PathBuf,
}

impl Autoprefixer for CommandAutoprefixer {
    fn apply(&self, css_files: &[PathBuf], browsers: &[String]) -> Result<(), ActionError> {
        if css_files.is_empty() {
            debug!("No css files to prefix");
            return Ok(());
        }

        let mut command = self.command.command(&[], css_files, &self.cwd)?;
        command.env("BROWSERSLIST", browsers.join(", "));
        run_command(command).map(|_| ())
    }
}

/// Native concatenation plus a minifier such as `uglifyjs`
pub struct CommandScriptBundler {
    pub minify_command: CommandTemplate,
    pub cwd: PathBuf,
}

impl ScriptBundler for CommandScriptBundler {
    fn concat(&self, files: &[PathBuf], output: &Path) -> Result<(), ActionError> {
        concat_files(files, output)
    }

    fn minify(&self, files: &[PathBuf], banner: &str, output: &Path) -> Result<(), ActionError> {
        let vars = [path_var("output", output)];
        let command = self.minify_command.command(&vars, files, &self.cwd)?;
        let minified = run_command(command)?;

        let mut bundle = banner.as_bytes().to_vec();
        bundle.extend_from_slice(&minified);
        write_file(output, &bundle)
    }
}

/// Template renderer such as `pug`
pub struct CommandTemplateRenderer {
    pub command: CommandTemplate,
    pub pretty_args: Vec<String>,
    pub cwd: PathBuf,
}

impl TemplateRenderer for CommandTemplateRenderer {
    fn render(&self, source: &Path, output: &Path, options: RenderOptions) -> Result<(), ActionError> {
        if !source.is_dir() {
            debug!(source = %source.display(), "No templates to render");
            return Ok(());
        }

        let data = serde_json::to_string(&options)
            .map_err(|e| ActionError::Other(format!("Failed to encode template data: {}", e)))?;
        let vars = [
            path_var("input", source),
            path_var("output", output),
            ("data", data),
        ];

        let mut command = self.command.command(&vars, &[], &self.cwd)?;
        if options.pretty {
            command.args(&self.pretty_args);
        }
        run_command(command).map(|_| ())
    }
}

/// Static server run as a child process
pub struct CommandServer {
    pub command: CommandTemplate,
    pub reload_command: Option<CommandTemplate>,
    pub cwd: PathBuf,
    child: Mutex<Option<Child>>,
}

impl CommandServer {
    pub fn new(command: CommandTemplate, reload_command: Option<CommandTemplate>, cwd: PathBuf) -> Self {
        Self {
            command,
            reload_command,
            cwd,
            child: Mutex::new(None),
        }
    }
}

impl HttpStaticServer for CommandServer {
    fn serve(&self, options: &ServeOptions) -> Result<(), ActionError> {
        let mut child = self.child.lock().unwrap_or_else(|e| e.into_inner());
        if child.is_some() {
            debug!("Server already running");
            return Ok(());
        }

        let root = options
            .roots
            .first()
            .ok_or_else(|| ActionError::Other("No directory to serve".to_string()))?;
        if options.roots.len() > 1 {
            warn!(root = %root.display(), "Serving only the first base directory");
        }

        let vars = [
            ("port", options.port.to_string()),
            ("hostname", options.hostname.clone()),
            path_var("root", root),
        ];
        let mut command = self.command.command(&vars, &[], &self.cwd)?;
        let spawned = command
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| ActionError::Spawn {
                program: command.get_program().to_string_lossy().into_owned(),
                source,
            })?;

        info!(
            port = options.port,
            hostname = %options.hostname,
            livereload = options.livereload,
            "Server started"
        );
        *child = Some(spawned);
        Ok(())
    }

    fn reload(&self, changed: &[PathBuf]) -> Result<(), ActionError> {
        match &self.reload_command {
            Some(template) => run_command(template.command(&[], changed, &self.cwd)?).map(|_| ()),
            None => {
                debug!(files = changed.len(), "Output changed");
                Ok(())
            }
        }
    }

    fn wait(&self) -> Result<(), ActionError> {
        let child = self.child.lock().unwrap_or_else(|e| e.into_inner()).take();

        let Some(mut child) = child else {
            // Nothing to wait on; stay up until the process is stopped
            loop {
                thread::park();
            }
        };

        let status = child.wait().map_err(|source| ActionError::Spawn {
            program: "server".to_string(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(ActionError::CommandFailed {
                command: "server".to_string(),
                status: status.to_string(),
                stderr: String::new(),
            })
        }
    }
}

impl Drop for CommandServer {
    fn drop(&mut self) {
        let child = self.child.get_mut().unwrap_or_else(|e| e.into_inner()).take();

        if let Some(mut child) = child {
            debug!(pid = child.id(), "Stopping server");
            if let Err(error) = child.kill() {
                warn!(%error, "Failed to stop server");
            }
            let _ = child.wait();
        }
    }
}

/// Opens URLs with a platform opener such as `xdg-open`
pub struct CommandBrowserLauncher {
    pub command: CommandTemplate,
    pub cwd: PathBuf,
}

impl BrowserLauncher for CommandBrowserLauncher {
    fn open(&self, url: &str) -> Result<(), ActionError> {
        let vars = [("url", url.to_string())];
        let mut command = self.command.command(&vars, &[], &self.cwd)?;

        let mut opener = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ActionError::Spawn {
                program: command.get_program().to_string_lossy().into_owned(),
                source,
            })?;

        // Openers may stay attached to the browser; reap them off the run
        thread::Builder::new()
            .name("browser-opener".to_string())
            .spawn(move || {
                if let Err(error) = opener.wait() {
                    debug!(%error, "Browser opener could not be reaped");
                }
            })
            .map_err(|source| ActionError::Spawn {
                program: "browser-opener thread".to_string(),
                source,
            })?;

        info!(url, "Opened browser");
        Ok(())
    }
}
