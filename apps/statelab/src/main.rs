//! # statelab
//!
//! The command-line binary for the statelab state machine editor.
//!
//! ## Usage
//!
//! ```bash
//! # Create an empty document
//! statelab init -D machine.json
//!
//! # Apply a script of intents, then print the containment tree
//! statelab -D machine.json apply -s edits.json
//! statelab -D machine.json tree
//!
//! # Convert to the interchange form
//! statelab -D machine.json export -o machine.interchange.json -t interchange
//! ```

use clap::Parser;
use statelab::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Parse first so --verbose can raise the default log level.
    let cli = cli::Cli::parse();

    // STATELAB_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("STATELAB_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let default_filter = if cli.verbose {
        "statelab=debug,statelab_core=debug"
    } else {
        "statelab=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the statelab startup banner.
fn print_banner() {
    eprintln!("statelab v{}", env!("CARGO_PKG_VERSION"));
}
