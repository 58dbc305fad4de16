//! Configuration handling for the asset pipeline
//!
//! Configuration is stored in `assetpipe.toml` at the project root. Every
//! section is optional and falls back to the layout of a classic
//! `src/` -> `dist/` front-end project.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Mode, WatchCategory, WatchError, WatchRule};

/// File name of the project configuration
pub const CONFIG_FILE: &str = "assetpipe.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Source and output directories
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory copied into the output tree
    pub source: PathBuf,

    /// Build output directory, wiped by `clean:build`
    pub output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("src"),
            output: PathBuf::from("dist"),
        }
    }
}

/// Stylesheet compilation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StylesConfig {
    pub entry: PathBuf,
    pub output: PathBuf,

    /// Compiler command (placeholders: {input}, {output})
    pub command: Vec<String>,

    /// Arguments appended in production to request minified css
    pub minify_args: Vec<String>,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            entry: PathBuf::from("src/less/style.less"),
            output: PathBuf::from("dist/css/style.css"),
            command: strings(&["lessc", "{input}", "{output}"]),
            minify_args: strings(&["--clean-css"]),
        }
    }
}

/// Vendor prefixing of compiled css
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoprefixerConfig {
    /// Target browsers, passed to the prefixer as `BROWSERSLIST`
    pub browsers: Vec<String>,

    /// Compiled css files to prefix in place
    pub files: String,

    /// Prefixer command (placeholders: {files})
    pub command: Vec<String>,
}

impl Default for AutoprefixerConfig {
    fn default() -> Self {
        Self {
            browsers: strings(&[
                "Android 2.3",
                "Android >= 4",
                "Chrome >= 20",
                "Firefox >= 24",
                "Explorer >= 8",
                "iOS >= 6",
                "Opera >= 12",
                "Safari >= 6",
            ]),
            files: "dist/css/*.css".to_string(),
            command: strings(&["postcss", "--use", "autoprefixer", "--replace", "{files}"]),
        }
    }
}

/// Script bundling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Scripts to bundle, read from the source tree; list interdependent
    /// scripts in load order
    pub sources: Vec<String>,

    /// Script copies in the output tree removed by `clean:scripts`; the
    /// bundle is always kept
    pub generated: Vec<String>,

    /// Bundle path
    pub bundle: PathBuf,

    /// Banner prepended to minified bundles (placeholders: {name}, {date})
    pub banner: String,

    /// Minifier command writing to stdout (placeholders: {files})
    pub minify_command: Vec<String>,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            sources: strings(&["src/js/*.js"]),
            generated: strings(&["dist/js/*.js"]),
            bundle: PathBuf::from("dist/js/app.js"),
            banner: "/*! {name} {date} */\n".to_string(),
            minify_command: strings(&["uglifyjs", "{files}"]),
        }
    }
}

/// Template rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    pub source: PathBuf,
    pub output: PathBuf,

    /// Renderer command (placeholders: {input}, {output}, {data})
    pub command: Vec<String>,

    /// Arguments appended when rendering pretty markup
    pub pretty_args: Vec<String>,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("src/views"),
            output: PathBuf::from("dist"),
            command: strings(&["pug", "--obj", "{data}", "--out", "{output}", "{input}"]),
            pretty_args: strings(&["--pretty"]),
        }
    }
}

/// Static asset copying
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyConfig {
    /// Globs relative to the source directory that are not copied
    pub exclude: Vec<String>,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            exclude: strings(&["**/less/**", "**/views/**"]),
        }
    }
}

/// Static file server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub hostname: String,

    /// Directories served
    pub bases: Vec<PathBuf>,

    /// Reload browsers when compiled output changes
    pub livereload: bool,

    /// Server command (placeholders: {port}, {hostname}, {root})
    pub command: Vec<String>,

    /// Command run to signal a reload (placeholders: {files})
    pub reload_command: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            hostname: "0.0.0.0".to_string(),
            bases: vec![PathBuf::from("dist")],
            livereload: true,
            command: strings(&[
                "python3",
                "-m",
                "http.server",
                "{port}",
                "--bind",
                "{hostname}",
                "--directory",
                "{root}",
            ]),
            reload_command: None,
        }
    }
}

impl ServerConfig {
    /// The address opened in the browser
    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}

/// Browser launching
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BrowserConfig {
    /// Opener command (placeholders: {url}); the platform opener when unset
    pub command: Option<Vec<String>>,
}

impl BrowserConfig {
    pub fn effective_command(&self) -> Vec<String> {
        if let Some(command) = &self.command {
            return command.clone();
        }

        if cfg!(target_os = "macos") {
            strings(&["open", "{url}"])
        } else if cfg!(windows) {
            strings(&["cmd", "/C", "start", "{url}"])
        } else {
            strings(&["xdg-open", "{url}"])
        }
    }
}

/// Watch session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiet period before a burst of changes is delivered
    pub debounce_ms: u64,

    pub scripts: Vec<String>,
    pub styles: Vec<String>,
    pub templates: Vec<String>,

    /// Compiled files whose changes trigger a live reload
    pub output: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 250,
            scripts: strings(&["src/js/*.js"]),
            styles: strings(&["src/less/*.less"]),
            templates: strings(&["src/views/*.jade"]),
            output: strings(&["dist/css/*.css", "dist/*.html", "dist/js/*.js"]),
        }
    }
}

impl WatchConfig {
    pub fn patterns(&self, category: WatchCategory) -> &[String] {
        match category {
            WatchCategory::Scripts => &self.scripts,
            WatchCategory::Styles => &self.styles,
            WatchCategory::Templates => &self.templates,
            WatchCategory::Output => &self.output,
        }
    }

    /// Builds the watch rules for a mode
    ///
    /// Categories without patterns get no rule; the output rule is dropped
    /// when live reload is off.
    pub fn rules(&self, mode: Mode, livereload: bool) -> Result<Vec<WatchRule>, WatchError> {
        let mut rules = Vec::new();
        for category in WatchCategory::ALL {
            let target = category.target(mode)?;
            let patterns = self.patterns(category);
            if patterns.is_empty() || (category == WatchCategory::Output && !livereload) {
                continue;
            }
            rules.push(WatchRule::new(category.as_str(), patterns, target)?);
        }
        Ok(rules)
    }
}

/// Project configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name used in banners; falls back to package.json
    pub name: Option<String>,

    /// Mode used by `assetpipe run` without a task
    pub default_mode: Mode,

    pub paths: PathsConfig,
    pub styles: StylesConfig,
    pub autoprefixer: AutoprefixerConfig,
    pub scripts: ScriptsConfig,
    pub templates: TemplatesConfig,
    pub copy: CopyConfig,
    pub server: ServerConfig,
    pub browser: BrowserConfig,
    pub watch: WatchConfig,
}

impl PipelineConfig {
    /// Loads the configuration of a project root; a missing file means defaults
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config: {}", config_path.display()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")?;

        config.validate()?;
        Ok(config)
    }

    /// Checks values serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        let commands = [
            ("styles.command", &self.styles.command),
            ("autoprefixer.command", &self.autoprefixer.command),
            ("scripts.minify_command", &self.scripts.minify_command),
            ("templates.command", &self.templates.command),
            ("server.command", &self.server.command),
        ];
        for (key, command) in commands {
            if command.is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", key)));
            }
        }

        if self.scripts.sources.is_empty() {
            return Err(ConfigError::Invalid(
                "scripts.sources must list at least one pattern".to_string(),
            ));
        }

        if self.paths.output.as_os_str().is_empty() || self.paths.output == Path::new(".") {
            return Err(ConfigError::Invalid(
                "paths.output must name a dedicated directory".to_string(),
            ));
        }

        Ok(())
    }

    /// Finds the project root by looking for `assetpipe.toml`
    pub fn find_project_root() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            if current.join(CONFIG_FILE).is_file() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Writes the configuration to a project root
    pub fn save(&self, project_root: &Path) -> Result<()> {
        let config_path = project_root.join(CONFIG_FILE);

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config: {}", config_path.display()))
    }
}
