//! Storyloom - Multi-agent orchestration for novel writing workflows
//!
//! Command-line front end: runs builtin workflow templates against the
//! story agent roster and prints orchestration events as they happen.

mod cmd_list;
mod cmd_run;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use storyloom_agent_roles::{SimulatedGenerator, standard_roster};
use storyloom_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use storyloom_protocols::agent::Agent;
use storyloom_workflow::Orchestrator;

/// Storyloom CLI.
#[derive(Parser)]
#[command(name = "storyloom")]
#[command(about = "Multi-agent orchestration for novel writing workflows")]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults to ./storyloom.toml, then the user config dir)
    #[arg(short, long, global = true, env = "STORYLOOM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow template to completion
    Run {
        /// Template name, e.g. ChapterCreation
        template: String,

        /// Template parameter as key=value; values are parsed as JSON when possible
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, serde_json::Value)>,

        /// Print the workflow result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the builtin workflow templates
    Templates,

    /// List the agent roster with status and capabilities
    Agents,
}

fn parse_param(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in '{}'", raw));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Default log directory when `[logging].dir` is unset.
fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("storyloom")
        .join("logs")
}

fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = logging
        .dir
        .as_deref()
        .map(|dir| PathBuf::from(ConfigLoader::expand_path(dir)))
        .unwrap_or_else(default_log_dir);
    std::fs::create_dir_all(&log_dir)?;

    let file = Path::new(&logging.file);
    let prefix = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("storyloom");
    let suffix = file.extension().and_then(|s| s.to_str()).unwrap_or("log");

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix(suffix)
        .max_log_files(14)
        .build(&log_dir)?;

    // The guard flushes the file writer; it must outlive main.
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let (json_file, text_file) = if logging.json {
        (
            Some(fmt::layer().json().with_writer(non_blocking)),
            None,
        )
    } else {
        (
            None,
            Some(fmt::layer().with_writer(non_blocking).with_ansi(false)),
        )
    };

    tracing_subscriber::registry()
        .with(env_filter)
        // Console goes to stderr; stdout carries the event stream.
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .with(json_file)
        .with(text_file)
        .init();

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let warnings = ConfigValidator::validate(config).into_result()?;
    for warning in warnings {
        warn!("Config warning at {}: {}", warning.path, warning.message);
    }
    Ok(())
}

async fn build_orchestrator(config: Config) -> Result<Orchestrator, Box<dyn std::error::Error>> {
    let generator = Arc::new(
        SimulatedGenerator::new(config.generator.latency())
            .with_model(config.generator.default_model.clone()),
    );
    let agents: Vec<Arc<dyn Agent>> = standard_roster(generator)
        .into_iter()
        .map(|agent| agent as Arc<dyn Agent>)
        .collect();
    Ok(Orchestrator::new(config, agents).await?)
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(cli.config.as_deref())?;
    init_tracing(&config.logging)?;
    info!("Starting Storyloom v{}", env!("CARGO_PKG_VERSION"));
    validate_config(&config)?;

    match cli.command {
        Commands::Templates => {
            let orchestrator = build_orchestrator(config).await?;
            cmd_list::print_templates(orchestrator.engine().templates());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Agents => {
            let orchestrator = build_orchestrator(config).await?;
            cmd_list::print_agents(&orchestrator.engine().agents().await);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run {
            template,
            params,
            json,
        } => {
            let orchestrator = build_orchestrator(config).await?;
            let params = params.into_iter().collect();
            let success = cmd_run::run_workflow(&orchestrator, &template, params, json).await?;
            Ok(if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param_json_and_text() {
        let (key, value) = parse_param("chapterNumber=3").unwrap();
        assert_eq!(key, "chapterNumber");
        assert_eq!(value, serde_json::json!(3));

        let (_, value) = parse_param("outline=The heist goes wrong").unwrap();
        assert_eq!(value, serde_json::json!("The heist goes wrong"));

        let (_, value) = parse_param("focus=a=b").unwrap();
        assert_eq!(value, serde_json::json!("a=b"));
    }

    #[test]
    fn test_parse_param_rejects_malformed() {
        assert!(parse_param("outline").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "storyloom",
            "run",
            "ChapterCreation",
            "-p",
            "chapterNumber=1",
            "--param",
            "outline=X",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                template, params, ..
            } => {
                assert_eq!(template, "ChapterCreation");
                assert_eq!(params.len(), 2);
            }
            _ => panic!("expected run"),
        }
    }
}
