use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::analyzer::{Analyzer, CausalityModel, ParadoxType, Scenario};
use crate::client::HttpClient;
use crate::config::Config;
use crate::report::{INITIAL_STATUS, analyze_time_paradox};
use crate::spinner::Spinner;

mod analyzer;
mod client;
mod config;
mod report;
mod spinner;

const ABOUT: &str = "\
Analyzes time travel scenarios for logical consistency, identifies potential
paradoxes and suggests narrative resolutions, using a remote language model.

Common paradox types:
  Grandfather Paradox                 a time traveller prevents their own existence
  Bootstrap Paradox                   information or objects with no origin
  Predestination Paradox              attempts to change the past actually cause it
  Butterfly Effect                    small changes creating massive timeline alterations
  Novikov Self-Consistency Principle  time travel is possible but paradoxes are not

The API key is read from OPENAI_API_KEY (a .env file is honoured) or from
`api_key` in the config file.";

#[derive(Parser)]
#[command(version, about = "Time travel paradox analyzer", long_about = ABOUT)]
struct Cli {
    /// Scenario text. Read from stdin when omitted or `-`.
    scenario: Option<String>,

    /// Suspected paradox type, checked by the model.
    #[arg(long, short = 't', value_enum, default_value_t = ParadoxType::OtherUnknown)]
    paradox_type: ParadoxType,

    /// Additional timeline details.
    #[arg(long, short = 'd')]
    timeline_details: Option<String>,

    /// Preferred causality model for resolutions.
    #[arg(long, short = 'c', value_enum, default_value_t = CausalityModel::Fixed)]
    causality: CausalityModel,

    /// Config file (default: $XDG_CONFIG_HOME/paradox-analyzer/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not show the progress spinner.
    #[arg(long, short)]
    quiet: bool,

    /// Exit with status 2 when any section failed.
    #[arg(long)]
    strict: bool,
}

/// Returns true when `RUST_LOG` asked for log output beyond the default.
fn init_tracing() -> bool {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new("warn"), false),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
    from_env
}

/// The spinner shares stderr with the log output, so it is only drawn when
/// nothing else is expected to write there while requests run.
fn spinner_visible(quiet: bool, stderr_is_terminal: bool, verbose_logging: bool) -> bool {
    !quiet && stderr_is_terminal && !verbose_logging
}

fn read_scenario(
    arg: Option<String>,
    mut stdin: impl Read,
    stdin_is_terminal: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    match arg {
        Some(text) if text != "-" => Ok(text),
        None if stdin_is_terminal => {
            Err("No scenario given; pass it as an argument, or pipe it in and use `-`".into())
        }
        _ => {
            let mut buffer = String::new();
            stdin.read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            return Err(err.into());
        }
    }
    let verbose_logging = init_tracing();

    let config_path = cli.config.clone().or_else(Config::default_path);
    let config = Config::load(config_path.as_deref())?;
    tracing::debug!(?config_path, provider = ?config.provider, model = %config.model, "loaded configuration");

    if !config.has_api_key() {
        tracing::warn!("OPENAI_API_KEY not found; create a .env file with your OpenAI API key");
    }

    let stdin = io::stdin();
    let stdin_is_terminal = stdin.is_terminal();
    let text = read_scenario(cli.scenario, stdin.lock(), stdin_is_terminal)?;
    if text.trim().is_empty() {
        return Err("Scenario text is empty".into());
    }

    let scenario = Scenario {
        text,
        suspected_type: cli.paradox_type,
        timeline_details: cli.timeline_details,
        causality: Some(cli.causality),
    };
    let glyphs: Vec<char> = config.spinner_glyphs.chars().collect();
    let interval = Duration::from_millis(config.spinner_interval_ms.max(1));
    let analyzer = Analyzer::new(HttpClient::new(config));

    let report = if spinner_visible(cli.quiet, io::stderr().is_terminal(), verbose_logging) {
        let spinner = Spinner::new(INITIAL_STATUS)
            .glyphs(glyphs)
            .interval(interval);
        analyze_time_paradox(&analyzer, &scenario, spinner)
    } else {
        analyze_time_paradox(
            &analyzer,
            &scenario,
            Spinner::with_writer(INITIAL_STATUS, io::sink()),
        )
    };

    let mut stdout = io::stdout().lock();
    stdout.write_all(report.render_markdown().as_bytes())?;
    stdout.flush()?;

    if cli.strict && report.failures() > 0 {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_wins_over_stdin() {
        let text = read_scenario(Some("I met myself.".to_string()), "ignored".as_bytes(), true)
            .unwrap();
        assert_eq!(text, "I met myself.");
    }

    #[test]
    fn piped_stdin_is_read_when_no_argument_is_given() {
        let text = read_scenario(None, "from a pipe".as_bytes(), false).unwrap();
        assert_eq!(text, "from a pipe");

        let text = read_scenario(Some("-".to_string()), "dash".as_bytes(), true).unwrap();
        assert_eq!(text, "dash");
    }

    #[test]
    fn interactive_stdin_without_argument_is_rejected() {
        let err = read_scenario(None, "never read".as_bytes(), true).unwrap_err();
        assert!(err.to_string().contains("No scenario given"));
    }

    #[test]
    fn spinner_is_hidden_when_logs_share_stderr() {
        assert!(spinner_visible(false, true, false));
        assert!(!spinner_visible(false, true, true));
        assert!(!spinner_visible(true, true, false));
        assert!(!spinner_visible(false, false, false));
    }
}
