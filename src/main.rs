use std::process::ExitCode;

use clap::Parser;

use blurbrush::cli::{self, CliArgs};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    cli::run(args)
}
