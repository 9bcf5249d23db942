mod cli;

use std::{process, str::FromStr};

use colored::Colorize;
use log::{LevelFilter, debug};

fn main() {
    let command_line_interface = cli::CommandLineInterface::load();

    let log_level = LevelFilter::from_str(command_line_interface.log_level()).unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level: {}. Using 'warn' instead.",
            command_line_interface.log_level()
        );
        LevelFilter::Warn
    });

    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    debug!(args:? = command_line_interface; "Parsed arguments");

    if let Err(err) = command_line_interface.run() {
        eprintln!("{} {err:#}", "error:".red().bold());
        process::exit(cli::exit_code(&err));
    }
}
