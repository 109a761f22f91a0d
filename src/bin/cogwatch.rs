//! cogwatch CLI - Command-line interface for the cogwatch scoring engine
//!
//! Commands:
//! - assess: Score one utterance (optionally against a saved history)
//! - chat: Line-oriented conversation over stdin
//! - trend: Language decline indicators over a file of utterances
//! - progress: Severity trends over a saved history
//! - report: Narrative report for a saved assessment
//! - export: Saved history as CSV
//! - rules: Print the effective rule tables
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cogwatch::config::EngineConfig;
use cogwatch::features::FeatureExtractor;
use cogwatch::history::HistoryStore;
use cogwatch::pipeline::CareProcessor;
use cogwatch::trend::TrendAnalyzer;
use cogwatch::types::Assessment;
use cogwatch::{AssessError, COGWATCH_VERSION};

/// cogwatch - Conversational cognitive screening engine
#[derive(Parser)]
#[command(name = "cogwatch")]
#[command(version = COGWATCH_VERSION)]
#[command(about = "Score patient utterances for signs of cognitive decline", long_about = None)]
struct Cli {
    /// Config file (defaults to COGWATCH_CONFIG or ./cogwatch.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for reproducible confidence and phrase picks
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one utterance
    Assess {
        /// Utterance text (read from stdin when omitted)
        text: Option<String>,

        /// Saved history JSON to score against
        #[arg(long)]
        history: Option<PathBuf>,

        /// Include a narrative report
        #[arg(long)]
        report: bool,
    },

    /// Converse over stdin, one utterance per line
    Chat {
        /// Load history from file
        #[arg(long)]
        load_history: Option<PathBuf>,

        /// Save history to file on exit
        #[arg(long)]
        save_history: Option<PathBuf>,

        /// Flush output after each turn
        #[arg(long, default_value = "true")]
        flush: bool,
    },

    /// Language decline indicators over time-ordered utterances
    Trend {
        /// Input file, one utterance per line (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Severity and dimension trends over a saved history
    Progress {
        /// Saved history JSON
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Narrative report for a saved assessment
    Report {
        /// Assessment JSON (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Export a saved history as CSV
    Export {
        /// Saved history JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Print the effective rule tables
    Rules {
        #[arg(long, value_enum, default_value = "toml")]
        format: RulesFormat,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a saved history file
        #[arg(long)]
        history: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum RulesFormat {
    Toml,
    Json,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cogwatch=info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CogwatchCliError> {
    let config = || load_config(cli.config.as_deref(), cli.seed);

    match cli.command {
        Commands::Assess {
            text,
            history,
            report,
        } => cmd_assess(&config()?, text, history.as_deref(), report),

        Commands::Chat {
            load_history,
            save_history,
            flush,
        } => cmd_chat(
            &config()?,
            load_history.as_deref(),
            save_history.as_deref(),
            flush,
        ),

        Commands::Trend { input } => cmd_trend(&config()?, &input),

        Commands::Progress { input } => cmd_progress(&config()?, &input),

        Commands::Report { input } => cmd_report(&config()?, &input),

        Commands::Export { input, output } => cmd_export(&config()?, &input, &output),

        Commands::Rules { format } => cmd_rules(&config()?, format),

        Commands::Doctor { history, json } => {
            cmd_doctor(cli.config.as_deref(), history.as_deref(), json)
        }
    }
}

fn load_config(path: Option<&Path>, seed: Option<u64>) -> Result<EngineConfig, CogwatchCliError> {
    let mut config = match path {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::load()?,
    };
    if seed.is_some() {
        config.engine.seed = seed;
    }
    Ok(config)
}

fn read_input(path: &Path) -> Result<String, CogwatchCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn load_history_store(config: &EngineConfig, path: &Path) -> Result<HistoryStore, CogwatchCliError> {
    let json = fs::read_to_string(path)?;
    let loaded = HistoryStore::from_json(&json)?;
    Ok(HistoryStore::from_assessments(
        loaded.entries(),
        config.engine.history_window,
    ))
}

fn cmd_assess(
    config: &EngineConfig,
    text: Option<String>,
    history: Option<&Path>,
    report: bool,
) -> Result<(), CogwatchCliError> {
    let text = match text {
        Some(text) => text,
        None => read_input(Path::new("-"))?,
    };

    let mut processor = CareProcessor::from_config(config)?;
    if let Some(history_path) = history {
        processor.load_history(&fs::read_to_string(history_path)?)?;
    }

    let assessment = processor.assess(&text)?;

    if report {
        let narrative = processor.report_for(&assessment);
        let output = serde_json::json!({
            "assessment": assessment,
            "report": narrative,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
    }

    Ok(())
}

fn cmd_chat(
    config: &EngineConfig,
    load_history: Option<&Path>,
    save_history: Option<&Path>,
    flush: bool,
) -> Result<(), CogwatchCliError> {
    let mut processor = CareProcessor::from_config(config)?;

    if let Some(history_path) = load_history {
        let history_json = fs::read_to_string(history_path)?;
        processor.load_history(&history_json)?;
    }

    if atty::is(atty::Stream::Stdin) {
        tracing::info!(
            conversation_id = %processor.conversation_id(),
            "interactive session, one utterance per line, Ctrl-D to finish"
        );
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let output = processor.take_turn_json(trimmed)?;
        writeln!(stdout, "{}", output)?;
        if flush {
            stdout.flush()?;
        }
    }
    stdout.flush()?;

    if let Some(history_path) = save_history {
        let history_json = processor.save_history()?;
        fs::write(history_path, history_json)?;
    }

    Ok(())
}

fn cmd_trend(config: &EngineConfig, input: &Path) -> Result<(), CogwatchCliError> {
    let data = read_input(input)?;
    let samples: Vec<&str> = data
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let extractor = FeatureExtractor::new(Arc::new(config.lexicon.clone()))?;
    let result = TrendAnalyzer::new(extractor).compute_decline_indicators(samples.as_slice());

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn cmd_progress(config: &EngineConfig, input: &Path) -> Result<(), CogwatchCliError> {
    let store = load_history_store(config, input)?;
    let summary = TrendAnalyzer::progress(&store.entries());

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn cmd_report(config: &EngineConfig, input: &Path) -> Result<(), CogwatchCliError> {
    let assessment: Assessment = serde_json::from_str(&read_input(input)?)?;
    let mut processor = CareProcessor::from_config(config)?;

    println!("{}", processor.report_for(&assessment));
    Ok(())
}

fn cmd_export(config: &EngineConfig, input: &Path, output: &Path) -> Result<(), CogwatchCliError> {
    let store = load_history_store(config, input)?;

    if output.to_string_lossy() == "-" {
        cogwatch::export::write_csv(&store.entries(), io::stdout().lock())?;
    } else {
        let file = fs::File::create(output)?;
        cogwatch::export::write_csv(&store.entries(), file)?;
    }

    Ok(())
}

fn cmd_rules(config: &EngineConfig, format: RulesFormat) -> Result<(), CogwatchCliError> {
    match format {
        RulesFormat::Toml => print!("{}", config.to_toml_string()?),
        RulesFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}

fn cmd_doctor(
    config_path: Option<&Path>,
    history: Option<&Path>,
    json: bool,
) -> Result<(), CogwatchCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "cogwatch_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("cogwatch version {}", COGWATCH_VERSION),
    });

    // Config loads and every table validates
    let config = match load_config(config_path, None) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "{} dimensions, {} severity bins, weights sum to {:.2}",
                    config.rules.dimensions.len(),
                    config.rules.severity_bins.len(),
                    config.rules.weight_sum()
                ),
            });
            Some(config)
        }
        Err(e) => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: CliError::from(e).message,
            });
            None
        }
    };

    if let Some(config) = &config {
        let lexicon_check = match FeatureExtractor::new(Arc::new(config.lexicon.clone())) {
            Ok(_) => DoctorCheck {
                name: "lexicon".to_string(),
                status: CheckStatus::Ok,
                message: "All lexicon patterns compile".to_string(),
            },
            Err(e) => DoctorCheck {
                name: "lexicon".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        };
        checks.push(lexicon_check);
    }

    if let Some(history_path) = history {
        let history_check = if !history_path.exists() {
            DoctorCheck {
                name: "history".to_string(),
                status: CheckStatus::Warning,
                message: "History file does not exist".to_string(),
            }
        } else {
            match fs::read_to_string(history_path)
                .map_err(AssessError::from)
                .and_then(|content| HistoryStore::from_json(&content).map_err(AssessError::from))
            {
                Ok(store) => DoctorCheck {
                    name: "history".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("History file valid ({} assessments)", store.len()),
                },
                Err(e) => DoctorCheck {
                    name: "history".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                },
            }
        };
        checks.push(history_check);
    }

    // Check stdin is available (for chat mode)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive chat)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (batch chat ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        version: COGWATCH_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("cogwatch Doctor Report");
        println!("======================");
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(CogwatchCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum CogwatchCliError {
    Io(io::Error),
    Engine(AssessError),
    Json(serde_json::Error),
    DoctorFailed,
}

impl From<io::Error> for CogwatchCliError {
    fn from(e: io::Error) -> Self {
        CogwatchCliError::Io(e)
    }
}

impl From<AssessError> for CogwatchCliError {
    fn from(e: AssessError) -> Self {
        CogwatchCliError::Engine(e)
    }
}

impl From<serde_json::Error> for CogwatchCliError {
    fn from(e: serde_json::Error) -> Self {
        CogwatchCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CogwatchCliError> for CliError {
    fn from(e: CogwatchCliError) -> Self {
        match e {
            CogwatchCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CogwatchCliError::Engine(e) => {
                let (code, hint) = match &e {
                    AssessError::EmptyInput(_) => ("EMPTY_INPUT", "Provide a non-empty utterance"),
                    AssessError::InvalidRules(_) | AssessError::InvalidPattern(_) => {
                        ("INVALID_RULES", "Run 'cogwatch doctor' for details")
                    }
                    AssessError::ConfigError(_) => ("CONFIG_ERROR", "Check the TOML syntax"),
                    AssessError::JsonError(_) => ("JSON_ERROR", "Check JSON syntax"),
                    AssessError::Io(_) => ("IO_ERROR", "Check file paths and permissions"),
                    AssessError::ExportError(_) => ("EXPORT_ERROR", "Check the output path"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            CogwatchCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CogwatchCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
