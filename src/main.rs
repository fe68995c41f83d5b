//! Expandybird CLI
//!
//! Usage:
//!   expandybird [OPTIONS] [DOCUMENT] [IMPORT_NAME IMPORT_CONTENT]...
//!
//! Options:
//!   -c, --config <FILE>  Expansion config file (TOML format)
//!   -v, --verbose        Log expansion progress to stderr (repeat for more)
//!   -h, --help           Print help
//!
//! Environment:
//!   DEPLOYMENT_NAME  Exposed to templates as `env.deployment` (required)
//!   PROJECT          Exposed to templates as `env.project` (required)
//!   VALIDATE_SCHEMA  When set, validate template properties against schemas

use std::path::PathBuf;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use expandybird::{ExpandConfig, Expander, ExpansionError, ImportMap};

/// Position of the first import name on the command line
const FIRST_IMPORT_ARG: usize = 2;

#[derive(Parser)]
#[command(name = "expandybird")]
#[command(about = "Expand template-based resource configurations")]
struct Cli {
    /// Configuration document (YAML)
    #[arg(allow_hyphen_values = true)]
    document: Option<String>,

    /// Import artifacts as alternating name and content values
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    imports: Vec<String>,

    /// Expansion config file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log expansion progress to stderr
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(document) = cli.document else {
        eprintln!("No input specified.");
        std::process::exit(1);
    };

    let imports = match ImportMap::from_pairs(cli.imports) {
        Ok(imports) => imports,
        Err(idx) => {
            eprintln!(
                "Invalid import definition at argv pos {}",
                idx + FIRST_IMPORT_ARG
            );
            std::process::exit(1);
        }
    };

    let config = match &cli.config {
        Some(path) => match ExpandConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => ExpandConfig::default(),
    };

    let config = config
        .with_env_var("deployment", required_var("DEPLOYMENT_NAME"))
        .with_env_var("project", required_var("PROJECT"));
    let config = if std::env::var_os("VALIDATE_SCHEMA").is_some() {
        config.with_schema_validation(true)
    } else {
        config
    };

    debug!(imports = imports.len(), "starting expansion");

    match Expander::new(config).expand_to_string(&document, &imports) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) if matches!(e.error, ExpansionError::Parse { .. }) => {
            eprint!("{}", e.format(&document));
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn required_var(name: &str) -> String {
    match std::env::var(name) {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Error reading environment variable {}: {}", name, e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "expandybird=warn",
        1 => "expandybird=debug",
        _ => "expandybird=trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
