#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use sourcefiles_core::{Engine, EngineConfig};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is not
/// given.
const DEFAULT_CONFIG_FILE: &str = "sourcefiles.json";

#[derive(Parser, Debug)]
#[command(name = "sourcefiles")]
#[command(author, version, about = "Import maps and type maps for in-browser module sandboxes", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit a single-line JSON envelope and JSON logs
    #[arg(long, global = true)]
    json: bool,

    /// Project root (the directory holding package.json and node_modules)
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Engine configuration file (JSON)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Build the import map of one or more entry specifiers
    ImportMap {
        /// Entry specifiers, walked in order
        #[arg(required = true)]
        specifiers: Vec<String>,
    },

    /// Collect the declaration files of a package
    TypeFiles {
        /// Package specifier
        specifier: String,
    },

    /// Build the import map and collect type files for a package
    SourceFiles {
        /// Package specifier
        specifier: String,
    },

    /// Render the data module for a trigger id such as `pkg?typeFiles`
    Load {
        /// Import id with a trigger suffix
        id: String,
    },

    /// List the import references of a single file
    Scan {
        /// File to scan, relative to the project root
        file: PathBuf,
    },
}

fn load_config(explicit: Option<&Path>, cwd: &Path) -> sourcefiles_core::Result<EngineConfig> {
    if let Some(path) = explicit {
        return EngineConfig::load(&cwd.join(path));
    }
    let discovered = cwd.join(DEFAULT_CONFIG_FILE);
    if discovered.is_file() {
        return EngineConfig::load(&discovered);
    }
    Ok(EngineConfig::default())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json);

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let cwd = dunce::canonicalize(&cwd).unwrap_or(cwd);

    let config = match load_config(cli.config.as_deref(), &cwd) {
        Ok(config) => config,
        Err(e) => return commands::fail_core(&e, cli.json),
    };
    tracing::debug!(cwd = %cwd.display(), "using project root");

    let engine = Engine::new(config);

    match &cli.command {
        Commands::ImportMap { specifiers } => {
            commands::import_map::run(&engine, &cwd, specifiers, cli.json)
        }
        Commands::TypeFiles { specifier } => {
            commands::type_files::run(&engine, &cwd, specifier, cli.json)
        }
        Commands::SourceFiles { specifier } => {
            commands::source_files::run(&engine, &cwd, specifier, cli.json)
        }
        Commands::Load { id } => commands::load::run(&engine, &cwd, id, cli.json),
        Commands::Scan { file } => commands::scan::run(&engine, &cwd, file, cli.json),
    }
}
