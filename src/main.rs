use clap::Parser;
use log::error;

use transit_route::cli::{run, Cli};

fn main() {
    // Diagnostics go to stderr so piped output stays clean.
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{e:#}");
        std::process::exit(1);
    }
}
