#![forbid(unsafe_code)]
#![cfg_attr(feature = "strict", deny(warnings))]

mod client_main;
mod console_view;
mod server_config;
mod server_main;

use std::path::PathBuf;

use clap::{Arg, ArgAction, Command, arg, value_parser};
use netchess::DEFAULT_PORT;
use server_config::ServerConfig;


fn log_level(verbosity: u8) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn main() -> anyhow::Result<()> {
    let matches = Command::new("netchess")
        .version(clap::crate_version!())
        .about("Two-player network chess: matchmaking server and console client")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("More logging: -v for debug, -vv for trace"),
        )
        .subcommand(
            Command::new("server")
                .about("Pair incoming players and referee their games")
                .arg(
                    arg!(--"config" <config_file> "YAML-serialized ServerConfig")
                        .required(false)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"port" <port> "Port to listen on; overrides the config file")
                        .required(false)
                        .value_parser(value_parser!(u16)),
                ),
        )
        .subcommand(
            Command::new("client")
                .about("Connect to a server and play")
                .arg(arg!(--"host" <host> "Server host").default_value("127.0.0.1"))
                .arg(
                    arg!(--"port" <port> "Server port [default: 6343]")
                        .required(false)
                        .value_parser(value_parser!(u16)),
                ),
        )
        .subcommand(Command::new("local").about("Play both sides on this terminal"))
        .get_matches();

    env_logger::Builder::new()
        .target(env_logger::Target::Stdout)
        .filter_level(log_level(matches.get_count("verbose")))
        .parse_default_env()
        .init();

    match matches.subcommand() {
        Some(("server", sub_matches)) => {
            let mut config = match sub_matches.get_one::<PathBuf>("config") {
                Some(path) => ServerConfig::load(path)?,
                None => ServerConfig::default(),
            };
            if let Some(&port) = sub_matches.get_one::<u16>("port") {
                config.port = port;
            }
            server_main::run(config)
        }
        Some(("client", sub_matches)) => client_main::run(client_main::ClientConfig {
            host: sub_matches.get_one::<String>("host").cloned().unwrap_or_default(),
            port: sub_matches.get_one::<u16>("port").copied().unwrap_or(DEFAULT_PORT),
        }),
        Some(("local", _)) => client_main::run_local(),
        _ => unreachable!("Exhausted list of subcommands and subcommand_required prevents `None`"),
    }
}
