use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;

use auromon_service::config::ServiceConfig;
use auromon_service::dashboard;
use auromon_service::dev_mode::{DevMode, FIXTURE_BASE_URL};
use auromon_service::ingest::fetch::{HttpTransport, Transport};
use auromon_service::logging::{self, DataSource, LogLevel};
use auromon_service::verify;

const USAGE: &str = "usage: auromon [--fixtures DIR] [snapshot | verify | probability <latitude>]";

enum Command {
    Snapshot,
    Verify,
    Probability(f64),
}

struct Args {
    command: Command,
    fixtures: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut fixtures = None;
    let mut positional = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--fixtures" => {
                let dir = args.next().ok_or("--fixtures needs a directory")?;
                fixtures = Some(PathBuf::from(dir));
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            _ => positional.push(arg),
        }
    }

    let command = match positional.first().map(String::as_str) {
        None | Some("snapshot") => Command::Snapshot,
        Some("verify") => Command::Verify,
        Some("probability") => {
            let raw = positional.get(1).ok_or("probability needs a latitude")?;
            let latitude: f64 = raw.parse().map_err(|_| format!("invalid latitude '{}'", raw))?;
            Command::Probability(latitude)
        }
        Some(other) => return Err(format!("unknown command '{}'\n{}", other, USAGE)),
    };

    Ok(Args { command, fixtures })
}

fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}", msg);
            return ExitCode::from(2);
        }
    };

    let mut config = match ServiceConfig::load_from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let level = std::env::var("AUROMON_LOG_LEVEL")
        .ok()
        .and_then(|v| LogLevel::parse(&v))
        .or_else(|| LogLevel::parse(&config.logging.level))
        .unwrap_or(LogLevel::Info);
    logging::init_logger(level, config.logging.file.as_deref(), config.logging.timestamps);

    let dev = args.fixtures.map(DevMode::new).or_else(DevMode::from_env);
    let http;
    let (transport, now): (&dyn Transport, _) = match &dev {
        Some(dev) => {
            logging::info(
                DataSource::System,
                None,
                &format!("replaying fixtures from {}", dev.fixture_dir.display()),
            );
            match dev.available_fixtures() {
                Ok(names) => logging::info(
                    DataSource::System,
                    None,
                    &format!("{}/{} feeds have fixtures", names.len(), config.feeds.len()),
                ),
                Err(e) => logging::warn(
                    DataSource::System,
                    None,
                    &format!("cannot list fixture directory: {}", e),
                ),
            }
            config = config.with_base_url(FIXTURE_BASE_URL);
            (dev as &dyn Transport, dev.simulated_now().unwrap_or_else(Utc::now))
        }
        None => {
            http = match HttpTransport::new() {
                Ok(http) => http,
                Err(e) => {
                    eprintln!("could not build HTTP client: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            (&http as &dyn Transport, Utc::now())
        }
    };

    let output = match args.command {
        Command::Snapshot => {
            let snapshot = dashboard::run_pass(&config, transport, now);
            serde_json::to_string_pretty(&snapshot)
        }
        Command::Probability(latitude) => {
            let snapshot = dashboard::run_pass(&config, transport, now);
            serde_json::to_string_pretty(&dashboard::probability_for(&snapshot, latitude))
        }
        Command::Verify => {
            let report = verify::run_full_verification(&config, transport, now);
            verify::print_summary(&report);
            if report.summary.failed > 0 {
                return ExitCode::FAILURE;
            }
            return ExitCode::SUCCESS;
        }
    };

    match output {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("could not serialize output: {}", e);
            ExitCode::FAILURE
        }
    }
}
