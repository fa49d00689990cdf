use clap::Parser;
use volbreak::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
