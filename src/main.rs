mod cli;

use std::sync::Once;

use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Logs go to stderr; stdout carries the converted trees.
///
/// `UAST_LOG` takes the usual filter syntax, e.g.
/// `UAST_LOG=uast_normalizer::rules=trace`.
fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("UAST_LOG")
            .unwrap_or_else(|_| EnvFilter::new("uast_normalizer=warn"));

        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(filter)
            .init();
    });
}

fn main() {
    init_tracing();
    let command_line_interface = cli::CommandLineInterface::load();
    if let Err(error) = command_line_interface.run() {
        eprintln!("{} {error:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
