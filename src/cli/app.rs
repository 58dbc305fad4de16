//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use super::output::{Output, OutputFormat};
use super::{logging, pipeline, tasks};
use crate::project::{Project, CONFIG_FILE};

#[derive(Parser)]
#[command(name = "assetpipe")]
#[command(author, version, about = "Front-end asset build pipeline")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Log every step, including the commands run
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Project directory (defaults to the nearest one containing assetpipe.toml)
    #[arg(long, short = 'C', global = true, env = "ASSETPIPE_DIR")]
    pub directory: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run tasks and everything they depend on
    Run {
        /// Tasks to run (defaults to the configured mode, e.g. `development`)
        tasks: Vec<String>,

        /// Record the actions without performing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the expanded action sequence of tasks
    Plan {
        /// Tasks to expand (defaults to the configured mode)
        tasks: Vec<String>,
    },

    /// List registered tasks
    Tasks {
        /// Only tasks no other task depends on
        #[arg(long)]
        entry: bool,
    },

    /// Write a default assetpipe.toml
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

fn open_project(directory: Option<PathBuf>) -> Result<Project> {
    match directory {
        Some(dir) => Project::open(dir),
        None => Project::open_current(),
    }
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);
    let output = Output::new(cli.format);

    let command = cli.command.unwrap_or(Commands::Run {
        tasks: Vec::new(),
        dry_run: false,
    });

    match command {
        Commands::Init { path } => {
            let path = match &cli.directory {
                Some(dir) => dir.join(path),
                None => path,
            };
            debug!(path = %path.display(), "Initializing project");
            let project = Project::init(&path)?;
            output.success(&format!(
                "Initialized {} at {}",
                CONFIG_FILE,
                project.root().display()
            ));
        }

        Commands::Run { tasks, dry_run } => {
            let project = open_project(cli.directory)?;
            debug!(root = %project.root().display(), "Opened project");
            pipeline::run(&output, project, tasks, dry_run)?
        }

        Commands::Plan { tasks } => {
            let project = open_project(cli.directory)?;
            pipeline::plan(&output, &project, tasks)?
        }

        Commands::Tasks { entry } => tasks::list(&output, entry)?,
    }

    Ok(())
}
