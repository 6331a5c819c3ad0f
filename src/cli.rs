//! Command-line interface for dfgraph.

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{DfgConfig, CONFIG_FILE_NAMES};
use crate::dataflow::{register_grammars, LanguageTag, Pipeline};
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Token-level data-flow graphs from source code.
///
/// dfgraph parses source files with tree-sitter and reports, for every
/// variable definition, which earlier tokens its value comes from.
#[derive(Parser)]
#[command(name = "dfgraph")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract data-flow graphs from a file or directory
    Extract(ExtractArgs),
    /// List supported languages, aliases and file extensions
    Languages,
    /// Create a dfgraph config file from a template
    Init(InitArgs),
}

/// Arguments for the extract command.
#[derive(Parser)]
pub struct ExtractArgs {
    /// Path to extract (file or directory)
    pub path: PathBuf,

    /// Language tag; inferred from file extensions when omitted
    #[arg(short, long)]
    pub language: Option<String>,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty, json, or jsonl
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Omit the final variable state
    #[arg(long)]
    pub no_state: bool,

    /// Worker threads (default: one per core)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "dfgraph.yaml")]
    pub output: PathBuf,

    /// Template to use
    #[arg(short, long, default_value = DEFAULT_TEMPLATE)]
    pub template: String,

    /// List available templates
    #[arg(short, long)]
    pub list: bool,
}

const DEFAULT_TEMPLATE: &str = "default";

/// Available config templates.
struct Template {
    name: &'static str,
    description: &'static str,
    content: &'static str,
}

/// All available templates.
static TEMPLATES: &[Template] = &[
    Template {
        name: "default",
        description: "All languages, full output with tokens and final state",
        content: include_str!("templates/default.yaml"),
    },
    Template {
        name: "dataset",
        description: "Compact records for training data, tests and minified code skipped",
        content: include_str!("templates/dataset.yaml"),
    },
];

/// Run the extract command.
pub fn run_extract(args: &ExtractArgs) -> anyhow::Result<i32> {
    if !report::FORMATS.contains(&args.format.as_str()) {
        eprintln!(
            "Error: invalid format {:?}, must be one of {}",
            args.format,
            report::FORMATS.join(", ")
        );
        return Ok(EXIT_ERROR);
    }

    let language = match args.language.as_deref().map(str::parse::<LanguageTag>) {
        None => None,
        Some(Ok(tag)) => Some(tag),
        Some(Err(e)) => {
            eprintln!("Error: {}", e);
            eprintln!("Run 'dfgraph languages' to see supported languages");
            return Ok(EXIT_ERROR);
        }
    };

    let mut config = match DfgConfig::load(args.config.as_deref(), ".") {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: invalid config: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    if args.no_state {
        config.include_state = false;
    }
    let config_path = args
        .config
        .clone()
        .or_else(|| DfgConfig::discover("."))
        .map(|p| p.to_string_lossy().to_string());

    if !args.path.exists() {
        eprintln!("Error: cannot access path {:?}", args.path);
        return Ok(EXIT_ERROR);
    }

    register_grammars();
    let show_state = config.include_state;
    let pipeline = Pipeline::new(config)
        .language(language)
        .threads(args.threads);

    let files = pipeline.collect_files(&args.path)?;
    if files.is_empty() {
        eprintln!("Warning: no supported source files found");
        return Ok(EXIT_SUCCESS);
    }

    let batch = pipeline.run(&files);
    let path_str = args.path.to_string_lossy().to_string();

    match args.format.as_str() {
        "json" => report::write_json(&path_str, config_path.as_deref(), &batch)?,
        "jsonl" => report::write_jsonl(&batch)?,
        _ => report::write_pretty(&path_str, config_path.as_deref(), &batch, show_state),
    }

    if batch.has_failures() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the languages command.
pub fn run_languages() -> anyhow::Result<i32> {
    println!("Supported languages:");
    println!();
    println!("  {:<12} {:<24} {}", "TAG", "ALIASES", "EXTENSIONS");

    for tag in LanguageTag::ALL {
        let extensions: Vec<String> = tag
            .grammar()
            .file_extensions()
            .iter()
            .map(|e| format!(".{}", e))
            .collect();
        println!(
            "  {:<12} {:<24} {}",
            tag.as_str(),
            tag.aliases().join(", "),
            extensions.join(" ")
        );
    }

    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.list {
        list_templates();
        return Ok(EXIT_SUCCESS);
    }

    let Some(template) = TEMPLATES.iter().find(|t| t.name == args.template) else {
        eprintln!(
            "Error: unknown template {:?} (see 'dfgraph init --list')",
            args.template
        );
        return Ok(EXIT_ERROR);
    };

    if let Err(e) = write_template(template, &args.output) {
        eprintln!("Error: {:#}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {} from template '{}'", args.output.display(), template.name);
    if !CONFIG_FILE_NAMES.iter().any(|name| args.output.ends_with(name)) {
        println!(
            "Pass it with --config; only {} are discovered automatically",
            CONFIG_FILE_NAMES.join(" and ")
        );
    }

    Ok(EXIT_SUCCESS)
}

/// Write a template to `output`, creating parent directories. Never
/// overwrites an existing file.
fn write_template(template: &Template, output: &Path) -> anyhow::Result<()> {
    if output.exists() {
        anyhow::bail!("{} already exists", output.display());
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    fs::write(output, template.content)
        .with_context(|| format!("writing config {}", output.display()))
}

fn list_templates() {
    println!("  {:<12} DESCRIPTION", "TEMPLATE");
    for template in TEMPLATES {
        let marker = if template.name == DEFAULT_TEMPLATE { '*' } else { ' ' };
        println!("{} {:<12} {}", marker, template.name, template.description);
    }
    println!();
    println!("* used when --template is omitted");
}
