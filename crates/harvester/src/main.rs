mod bus;
mod cancel;
mod config;
mod error;
mod fetch;
mod host;
mod model;
mod ratelimit;
mod sources;

pub use error::{Error, Result};

use clap::{Arg, Command};
use config::Config;
use std::collections::BTreeSet;
use std::env;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing_subscriber();

    let cli = Command::new(clap::crate_name!())
        .version(clap::crate_version!())
        .subcommand(Command::new("sources").about("List all data sources"))
        .subcommand(
            Command::new("collect")
                .about("Collect candidate subdomains of a target domain")
                .arg(
                    Arg::new("target")
                        .help("The apex domain to investigate")
                        .value_name("TARGET")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("timeout")
                        .short('t')
                        .long("timeout")
                        .help("Cancel the collection after this many seconds")
                        .value_name("SECONDS")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
        .arg_required_else_help(true)
        .get_matches();

    match cli.subcommand() {
        Some(("sources", _)) => sources::display_all(),
        Some(("collect", args)) => {
            if let Some(target) = args.get_one::<String>("target") {
                let mut config = Config::new(&[target.clone()])?;
                if let Ok(key) = env::var("SHODAN_API_KEY") {
                    config = config.with_api_key("Shodan", &key);
                }
                let timeout = args
                    .get_one::<u64>("timeout")
                    .map(|secs| Duration::from_secs(*secs));

                info!("Collecting subdomains of {}", target);
                let discoveries = host::collect(target, config, timeout)?;

                // sources publish duplicates; display is where they collapse
                let names: BTreeSet<String> = discoveries
                    .into_iter()
                    .map(|request| request.name)
                    .collect();

                println!("\n{} names discovered for {}", names.len(), target);
                for name in names {
                    println!("- {}", name);
                }
            }
        }

        // fallback if a cmd is not handled (should not possible)
        _ => {
            error!("{:12} - Command not handled, exit program", "CLI ERROR");
            return Err(Error::CliUsage("Command not handled".into()));
        }
    }

    Ok(())
}

fn init_tracing_subscriber() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_file(false)
        .with_target(false)
        .init();
}
