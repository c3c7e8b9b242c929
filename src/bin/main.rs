//! mbql-pql CLI - Compile MBQL queries and native templates to PQL
//!
//! Usage:
//!   mbql-pql compile <query.json> [--output sql|json]
//!   mbql-pql substitute <template.sql> [--params <params.json>] [--output sql|json]
//!
//! Table and field names come from the `[metadata]` section of the settings
//! file (see `mbql_pql::config`).
//!
//! Examples:
//!   mbql-pql compile orders_by_category.json
//!   mbql-pql substitute report.sql --params params.json --output json

use clap::{Parser, Subcommand, ValueEnum};
use mbql_pql::compile::{CompileOptions, MbqlCompiler};
use mbql_pql::config::Settings;
use mbql_pql::metadata::StaticMetadata;
use mbql_pql::native::TemplateEngine;
use mbql_pql::params::ParamMap;
use mbql_pql::telemetry;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "mbql-pql")]
#[command(about = "Compile MBQL queries and native templates to PQL")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to the standard lookup)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an MBQL query map to PQL
    Compile {
        /// Path to the JSON query map
        file: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "sql")]
        output: OutputFormat,
    },

    /// Substitute parameters into a native query template
    Substitute {
        /// Path to the template text
        file: PathBuf,

        /// Path to a JSON object of parameter values
        #[arg(short, long)]
        params: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "sql")]
        output: OutputFormat,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Output SQL only
    Sql,
    /// Output the full query value as JSON
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    telemetry::init_tracing(&settings.logging.level);

    let metadata = match StaticMetadata::from_settings(&settings.metadata) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error in metadata settings: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let options = CompileOptions::default().with_timeout(settings.query.timeout());

    match cli.command {
        Commands::Compile { file, output } => cmd_compile(&file, metadata, options, output),
        Commands::Substitute {
            file,
            params,
            output,
        } => cmd_substitute(&file, params.as_deref(), metadata, options, output),
    }
}

fn cmd_compile(
    file: &Path,
    metadata: StaticMetadata,
    options: CompileOptions,
    output: OutputFormat,
) -> ExitCode {
    let query = match read_json(file) {
        Ok(v) => v,
        Err(code) => return code,
    };

    let compiler = MbqlCompiler::new(metadata).with_options(options);
    match compiler.compile(&query) {
        Ok(native) => print_output(&native.query.sql, &native, output),
        Err(e) => {
            eprintln!("Compilation error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_substitute(
    file: &Path,
    params: Option<&Path>,
    metadata: StaticMetadata,
    options: CompileOptions,
    output: OutputFormat,
) -> ExitCode {
    let template = match fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let params = match params {
        None => ParamMap::new(),
        Some(path) => {
            let raw = match read_json(path) {
                Ok(v) => v,
                Err(code) => return code,
            };
            match ParamMap::from_json(&raw) {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("Error in parameters: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    };

    let engine = TemplateEngine::new(metadata).with_options(options);
    match engine.substitute_str(&template, &params) {
        Ok(query) => print_output(&query.query, &query, output),
        Err(e) => {
            eprintln!("Substitution error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn read_json(path: &Path) -> Result<Value, ExitCode> {
    let text = fs::read_to_string(path).map_err(|e| {
        eprintln!("Error reading file '{}': {}", path.display(), e);
        ExitCode::FAILURE
    })?;
    serde_json::from_str(&text).map_err(|e| {
        eprintln!("Invalid JSON in '{}': {}", path.display(), e);
        ExitCode::FAILURE
    })
}

fn print_output<T: Serialize>(sql: &str, value: &T, output: OutputFormat) -> ExitCode {
    match output {
        OutputFormat::Sql => {
            println!("{}", sql);
            ExitCode::SUCCESS
        }
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}
