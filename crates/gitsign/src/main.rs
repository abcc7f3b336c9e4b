use clap::Parser;
use gitsign::commands::{execute, Options};
use gitsign::{Cli, Config, SigstoreBackend, Streams};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::load();

    let mut streams = Streams::new(config.log_path.clone()).with_log_filter(config.log_level.clone());
    let result = streams.wrap(|streams| {
        config.log_load_errors();
        let mut options = Options {
            cli: &cli,
            config: &config,
            streams,
        };
        execute(&mut options, &cli.args, SigstoreBackend::new)
    });

    // The wrapper has already reported the error on the terminal.
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
