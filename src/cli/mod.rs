//! CLI command definitions and handlers

mod build;
mod download;
mod init;
mod preprocess;
mod profile;
mod score;
mod validate;

use crate::config::{load_config_file, load_project_config, ProjectConfig};
use crate::reporters::OutputFormat;
use crate::scoring::ModelBundle;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::ProgressStyle;
use std::path::{Path, PathBuf};

const DEFAULT_WORKERS: usize = 8;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// cardshark - find abstracts that describe new antimicrobial resistance
#[derive(Parser, Debug)]
#[command(name = "cardshark")]
#[command(
    version,
    about = "Score PubMed abstracts for novel antimicrobial-resistance findings",
    long_about = "cardshark learns word, journal and word-pair scoring matrices from a \
positive corpus of curated abstracts and a background corpus, then scores and \
classifies unseen abstracts against a median cutoff.\n\n\
Typical workflow:\n  \
cardshark download --range 2017/01/01:2017/01/31 -o corpus/\n  \
cardshark build --positive curated.json --background corpus/ -o model.json\n  \
cardshark score corpus/2017-01-01_to_2017-01-31.json --model model.json",
    after_help = "\
Examples:
  cardshark init                                   Write an example cardshark.toml
  cardshark build --positive pos.json --background bg.json -o model.json
  cardshark score abstracts.json --model model.json --format json
  cardshark validate sheets/ --predictions preds.json"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of parallel workers (1-64)
    #[arg(long, global = true, default_value = "8", value_parser = parse_workers)]
    pub workers: usize,

    /// Project config file (default: ./cardshark.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a cardshark.toml with example settings
    Init {
        /// Directory to write into
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Download abstracts from PubMed, one corpus file per date range
    #[command(after_help = "\
Examples:
  cardshark download --range 2017/06/01:2017/06/30 -o corpus/
  cardshark download --ranges-file ranges.json -o corpus/

ranges.json holds a list of [start, end] pairs:
  [[\"2017/06/01\", \"2017/06/30\"], [\"2017/07/01\", \"2017/07/31\"]]

Credentials: NCBI_EMAIL and NCBI_API_KEY, or [download] in cardshark.toml")]
    Download {
        /// Date range START:END (repeatable), e.g. 2017/06/01:2017/06/30
        #[arg(long = "range")]
        ranges: Vec<String>,

        /// JSON file with [start, end] pairs
        #[arg(long)]
        ranges_file: Option<PathBuf>,

        /// Output directory
        #[arg(long, short = 'o', default_value = ".")]
        out: PathBuf,

        /// Output format for the summary: text, json
        #[arg(long, short = 'f', value_parser = ["text", "json"])]
        format: Option<String>,
    },

    /// Stem and clean abstract texts into `processed_text`
    #[command(after_help = "\
Examples:
  cardshark preprocess corpus.json                 Rewrite corpus.json in place
  cardshark preprocess corpus.json -o clean.jsonl  Write JSON Lines elsewhere")]
    Preprocess {
        /// Corpus file (JSON, JSON Lines, column JSON or CSV)
        input: PathBuf,

        /// Output file (default: overwrite input)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Stop-word file replacing the built-in English list
        #[arg(long)]
        stoplist: Option<PathBuf>,
    },

    /// Write word and journal frequency tables for one corpus
    Profile {
        /// Corpus file or directory of corpus files
        corpus: PathBuf,

        /// Stop-word file (default: none)
        #[arg(long)]
        stoplist: Option<PathBuf>,

        /// Text field to tokenize: raw, processed
        #[arg(long, default_value = "raw")]
        field: String,

        /// Output directory for words.json and journals.json
        #[arg(long, short = 'o', default_value = ".")]
        out: PathBuf,
    },

    /// Build a scoring model from a positive and a background corpus
    #[command(after_help = "\
Examples:
  cardshark build --positive curated.json --background corpus/ -o model.json
  cardshark build --positive curated.json --background bg.json --filter")]
    Build {
        /// Positive corpus file or directory
        #[arg(long)]
        positive: PathBuf,

        /// Background corpus file or directory
        #[arg(long)]
        background: PathBuf,

        /// Stop-word file (default: none)
        #[arg(long)]
        stoplist: Option<PathBuf>,

        /// Text field to tokenize: raw, processed
        #[arg(long, default_value = "raw")]
        field: String,

        /// Drop word-matrix entries below [scoring] min_difference
        #[arg(long)]
        filter: bool,

        /// Model output path
        #[arg(long, short = 'o', default_value = ModelBundle::FILENAME)]
        output: PathBuf,
    },

    /// Score and classify abstracts with a model
    #[command(after_help = "\
Examples:
  cardshark score abstracts.json --model model.json
  cardshark score labeled.json --model model.json --format json -o report.json
  cardshark score new.json --model model.json --predictions-only --predictions-out preds.json

Labeled corpora are evaluated (confusion matrix, ROC/AUC, precision/recall)
unless --predictions-only is given.")]
    Score {
        /// Corpus file or directory
        corpus: PathBuf,

        /// Model built by `cardshark build`
        #[arg(long, short = 'm', default_value = ModelBundle::FILENAME)]
        model: PathBuf,

        /// Stop-word file (default: none)
        #[arg(long)]
        stoplist: Option<PathBuf>,

        /// Text field to tokenize: raw, processed
        #[arg(long, default_value = "raw")]
        field: String,

        /// Skip evaluation even when labels are present
        #[arg(long)]
        predictions_only: bool,

        /// Output format: text, json
        #[arg(long, short = 'f', value_parser = ["text", "json"])]
        format: Option<String>,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Also write {model: [[pmid, prediction], ...]} for `cardshark validate`
        #[arg(long)]
        predictions_out: Option<PathBuf>,

        /// Model name used in --predictions-out
        #[arg(long, default_value = "shark")]
        model_name: String,
    },

    /// Compare model predictions with reviewer validation sheets
    #[command(after_help = "\
Examples:
  cardshark validate sheets/ --predictions preds.json
  cardshark validate card/ mesh/ --predictions shark.json --predictions lr.csv --format json

Each directory is one validation set. Headers, file-name terms and the label
vocabulary come from [validation] in cardshark.toml.")]
    Validate {
        /// Directories of reviewer CSV sheets, one validation set each
        #[arg(required = true)]
        sets: Vec<PathBuf>,

        /// Prediction files (JSON or CSV)
        #[arg(long, required = true)]
        predictions: Vec<PathBuf>,

        /// Output format: text, json
        #[arg(long, short = 'f', value_parser = ["text", "json"])]
        format: Option<String>,
    },

    /// Show version info
    Version,
}

/// Project config from `--config`, or ./cardshark.toml
fn project_config(path: Option<&Path>) -> ProjectConfig {
    match path {
        Some(p) => load_config_file(p),
        None => load_project_config(Path::new(".")),
    }
}

/// `--format`, else `[defaults] format`, else text
fn resolve_format(flag: Option<&str>, config: &ProjectConfig) -> Result<OutputFormat> {
    flag.or(config.defaults.format.as_deref())
        .unwrap_or("text")
        .parse()
}

fn load_stoplist(path: Option<&Path>) -> Result<crate::text::StopList> {
    match path {
        Some(p) => crate::text::StopList::load(p)
            .with_context(|| format!("Failed to load stop-word list {}", p.display())),
        None => Ok(crate::text::StopList::default()),
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .expect("valid template")
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .expect("valid template")
        .progress_chars("█▓▒░  ")
}

/// Write `content` to `output`, or print it
fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Report written to: {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let config = project_config(cli.config.as_deref());

    // Apply project config defaults when the flag was left at its default
    let workers = if cli.workers == DEFAULT_WORKERS {
        config.defaults.workers.unwrap_or(cli.workers).clamp(1, 64)
    } else {
        cli.workers
    };

    match cli.command {
        Some(Commands::Init { path, force }) => init::run(&path, force),

        Some(Commands::Download {
            ranges,
            ranges_file,
            out,
            format,
        }) => {
            let format = resolve_format(format.as_deref(), &config)?;
            download::run(&config, &ranges, ranges_file.as_deref(), &out, format)
        }

        Some(Commands::Preprocess {
            input,
            output,
            stoplist,
        }) => preprocess::run(&input, output.as_deref(), stoplist.as_deref(), workers),

        Some(Commands::Profile {
            corpus,
            stoplist,
            field,
            out,
        }) => {
            let stoplist = load_stoplist(stoplist.as_deref())?;
            profile::run(&corpus, &stoplist, field.parse()?, &out)
        }

        Some(Commands::Build {
            positive,
            background,
            stoplist,
            field,
            filter,
            output,
        }) => {
            let stoplist = load_stoplist(stoplist.as_deref())?;
            build::run(
                &config,
                &positive,
                &background,
                &stoplist,
                field.parse()?,
                filter,
                &output,
            )
        }

        Some(Commands::Score {
            corpus,
            model,
            stoplist,
            field,
            predictions_only,
            format,
            output,
            predictions_out,
            model_name,
        }) => {
            let stoplist = load_stoplist(stoplist.as_deref())?;
            let options = score::ScoreOptions {
                field: field.parse()?,
                predictions_only,
                format: resolve_format(format.as_deref(), &config)?,
                output,
                predictions_out,
                model_name,
                workers,
            };
            score::run(&config, &corpus, &model, &stoplist, &options)
        }

        Some(Commands::Validate {
            sets,
            predictions,
            format,
        }) => {
            let format = resolve_format(format.as_deref(), &config)?;
            validate::run(&config, &sets, &predictions, format)
        }

        Some(Commands::Version) => {
            println!("cardshark {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }

        None => {
            println!("No command given. Run 'cardshark --help' for available commands.");
            Ok(())
        }
    }
}
