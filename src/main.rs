use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

use qscore::config::Config;
use qscore::output;
use qscore::scoring::ScoringEngine;
use qscore::storage;

const EXIT_SUCCESS: u8 = 0;
const EXIT_INPUT: u8 = 1;
const EXIT_CONFIG: u8 = 4;

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Format {
    /// Labelled lines for a terminal
    #[default]
    Table,
    /// Flat score record as pretty JSON (the shape `--save` writes)
    Json,
    /// One tab-separated line: score, range, risk, z, percentile
    Tsv,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the configuration and report every error and warning
    Validate,
    /// Score a response read from a JSON answers file
    Score {
        /// Path to the answers file
        answers: PathBuf,

        /// Questionnaire category for risk mapping (overrides config and answers file)
        #[arg(long)]
        category: Option<String>,

        /// JSON array of prior raw scores (overrides the answers file's "reference")
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,

        /// Atomically write the flat score record to this path
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Write a starter configuration
    Init {
        /// Where to write the config (defaults to ~/.config/qscore/config.yaml)
        path: Option<PathBuf>,

        /// Do not prompt; use defaults and overwrite an existing file
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Parser, Debug)]
#[command(name = "qscore")]
#[command(about = "Questionnaire scoring and risk classification", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/qscore/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = qscore::telemetry::init(cli.verbose) {
        eprintln!("Logging disabled: {}", e);
    }

    let code = match cli.command {
        Commands::Init { path, yes } => match qscore::config::init::run_init(path.or(cli.config), yes) {
            Ok(()) => EXIT_SUCCESS,
            Err(e) => {
                eprintln!("Init failed: {:#}", e);
                EXIT_CONFIG
            }
        },
        Commands::Validate => match load_engine(cli.config) {
            Ok((engine, _)) => {
                let configuration = engine.configuration();
                println!(
                    "Configuration OK: method {}, max score {}, {} range(s), {} adjustment(s)",
                    configuration.method(),
                    output::format_score(configuration.max_score()),
                    configuration.ranges().len(),
                    configuration.adjustments().len()
                );
                EXIT_SUCCESS
            }
            Err(code) => code,
        },
        Commands::Score {
            answers,
            category,
            reference,
            format,
            save,
        } => match load_engine(cli.config) {
            Ok((engine, config)) => run_score(&engine, &config, ScoreArgs {
                answers,
                category,
                reference,
                format,
                save,
                verbose: cli.verbose,
            }),
            Err(code) => code,
        },
    };

    ExitCode::from(code)
}

/// Load and validate the config, printing diagnostics. Err carries the exit code.
fn load_engine(path: Option<PathBuf>) -> Result<(ScoringEngine, Config), u8> {
    let use_colors = std::io::IsTerminal::is_terminal(&std::io::stderr());

    let config = match qscore::config::load_config(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            return Err(EXIT_CONFIG);
        }
    };

    match config.build_engine() {
        Ok((engine, warnings)) => {
            if !warnings.is_empty() {
                eprintln!("{}", output::format_warnings(&warnings, use_colors));
            }
            Ok((engine, config))
        }
        Err(errors) => {
            eprintln!("Scoring config errors:");
            eprintln!("{}", output::format_errors(&errors, use_colors));
            Err(EXIT_CONFIG)
        }
    }
}

struct ScoreArgs {
    answers: PathBuf,
    category: Option<String>,
    reference: Option<PathBuf>,
    format: Format,
    save: Option<PathBuf>,
    verbose: bool,
}

fn run_score(engine: &ScoringEngine, config: &Config, args: ScoreArgs) -> u8 {
    let answers_file = match storage::load_answers(&args.answers) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Input error: {:#}", e);
            return EXIT_INPUT;
        }
    };

    let reference = match &args.reference {
        Some(path) => match storage::load_reference(path) {
            Ok(r) => Some(r),
            Err(e) => {
                eprintln!("Input error: {:#}", e);
                return EXIT_INPUT;
            }
        },
        None => answers_file.reference.clone(),
    };

    let category = args
        .category
        .or(answers_file.category.clone())
        .unwrap_or_else(|| config.category().to_string());

    debug!(
        answers = answers_file.answers.len(),
        category = %category,
        reference = reference.as_ref().map_or(0, Vec::len),
        "scoring response"
    );

    let result = engine.compute(&answers_file.answers, &category, reference.as_deref());

    let use_colors = output::should_use_colors();
    match args.format {
        Format::Table => {
            println!(
                "{}",
                output::format_result(&result, engine.configuration().max_score(), use_colors)
            );
            if args.verbose {
                println!();
                println!("{}", output::format_breakdown(&result, use_colors));
            }
        }
        Format::Json => match output::format_json(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Output error: {:#}", e);
                return EXIT_INPUT;
            }
        },
        Format::Tsv => println!("{}", output::format_tsv(&result)),
    }

    if let Some(path) = &args.save {
        if let Err(e) = storage::save_record(path, &result.record()) {
            eprintln!("Failed to save result: {:#}", e);
            return EXIT_INPUT;
        }
        if args.verbose {
            eprintln!("Saved score record to {}", path.display());
        }
    }

    EXIT_SUCCESS
}
