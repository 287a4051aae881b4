use clap::{Arg, ArgAction, ArgMatches, Command};
use log::info;
use std::time::Duration;

use crate::config::{Config, OUTPUT_FORMATS};
use crate::modbus::list_ports;
use crate::output::JsonFormatter;
use crate::services::DataService;
use crate::utils::error::TracerError;

pub fn build_cli() -> Command {
    Command::new("tracer-monitor")
        .version(crate::VERSION)
        .about("Reads status from EPsolar Tracer BN-series solar charge controllers")
        .arg(Arg::new("config").short('c').long("config").value_name("FILE").help("TOML configuration file"))
        .arg(Arg::new("port").short('p').long("port").value_name("PORT").help("Serial port, e.g. /dev/ttyUSB0"))
        .arg(Arg::new("baud").short('b').long("baud").value_name("BAUD").help("Baud rate (default 115200)"))
        .arg(Arg::new("timeout-ms").long("timeout-ms").value_name("MS").help("Per-frame response timeout"))
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_parser(OUTPUT_FORMATS)
                .help("Output format"),
        )
        .arg(Arg::new("output-file").short('o').long("output-file").value_name("FILE").help("Append snapshots to FILE"))
        .arg(Arg::new("verbose").short('v').long("verbose").action(ArgAction::SetTrue).help("Debug logging"))
        .subcommand_required(true)
        .subcommand(Command::new("status").about("Query the controller once"))
        .subcommand(
            Command::new("watch")
                .about("Poll the controller periodically")
                .arg(Arg::new("interval").short('i').long("interval").value_name("SECS").help("Seconds between queries"))
                .arg(Arg::new("count").short('n').long("count").value_name("N").help("Stop after N queries")),
        )
        .subcommand(Command::new("ports").about("List available serial ports"))
        .subcommand(
            Command::new("init-config")
                .about("Write a default configuration file")
                .arg(Arg::new("path").required(true).value_name("FILE")),
        )
}

/// Resolves the effective configuration: file (if given), then command line overrides.
pub fn load_config(matches: &ArgMatches) -> Result<Config, TracerError> {
    let base = match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    Config::from_matches(base, matches)
}

fn parse_arg<T: std::str::FromStr>(matches: &ArgMatches, name: &str) -> Result<Option<T>, TracerError>
where
    T::Err: std::fmt::Display,
{
    matches
        .get_one::<String>(name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| TracerError::ConfigError(format!("Invalid --{} '{}': {}", name, raw, e)))
        })
        .transpose()
}

pub async fn handle_subcommands(matches: &ArgMatches) -> Result<(), TracerError> {
    match matches.subcommand() {
        Some(("ports", _)) => {
            let ports = list_ports()?;
            if ports.is_empty() {
                println!("⚠️  No serial ports found");
            }
            for port in ports {
                match port.description {
                    Some(description) => println!("{}\t{}", port.name, description),
                    None => println!("{}", port.name),
                }
            }
            Ok(())
        }
        Some(("init-config", sub)) => {
            let path = sub
                .get_one::<String>("path")
                .ok_or_else(|| TracerError::ConfigError("missing path".to_string()))?;
            Config::default().save_to_file(path)?;
            println!("✅ Wrote default configuration to {}", path);
            Ok(())
        }
        Some(("status", _)) => {
            let config = load_config(matches)?;
            let mut service = service_for(config)?;
            info!("🔍 Executing status command...");
            service.read_once().await?;
            Ok(())
        }
        Some(("watch", sub)) => {
            let mut config = load_config(matches)?;
            if let Some(secs) = parse_arg::<u64>(sub, "interval")? {
                config.update_interval_seconds = secs;
            }
            let count = parse_arg::<u64>(sub, "count")?;
            let period: Duration = config.update_interval();

            let mut service = service_for(config)?;
            let summary = service.run(period, count).await;
            if summary.succeeded == 0 && summary.failed > 0 {
                return Err(TracerError::OutputError(format!("all {} queries failed", summary.failed)));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn service_for(config: Config) -> Result<DataService, TracerError> {
    let pretty = config.output.default_format == "json" && config.output.file_path.is_none();
    let mut service = DataService::new(config)?;
    if pretty {
        service.set_formatter(Box::new(JsonFormatter { pretty: true }));
    }
    Ok(service)
}
