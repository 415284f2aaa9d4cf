use std::process::ExitCode;

use clap::Parser;

use scratchfe::cli::{self, CliArgs};

fn main() -> ExitCode {
    // Initialize the session log (overwrites the previous session's log).
    scratchfe::logger::init();

    let args = CliArgs::parse();
    cli::run(args)
}
