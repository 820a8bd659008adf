//! # statelab CLI Module
//!
//! This module implements the CLI interface for statelab.
//!
//! ## Available Commands
//!
//! - `init` - Create an empty document
//! - `status` - Show document summary
//! - `tree` - Print the containment tree with owned transitions
//! - `check` - Report unresolved component references
//! - `apply` - Run a JSON script of intents against the document
//! - `export` - Write the document as plain JSON, interchange or snapshot
//! - `import` - Replace the document from interchange, snapshot or JSON
//! - `copy` - Print a state subtree as a clipboard fragment
//! - `platforms` - List available platform catalogues

mod commands;

use clap::{Parser, Subcommand};
use statelab_core::StatelabError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// statelab - hierarchical state machine editor
///
/// Edits state machine documents: nested states, transitions with
/// triggers, guards and actions, notes and platform components.
#[derive(Parser, Debug)]
#[command(name = "statelab")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to statelab.toml (defaults to ./statelab.toml when present)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the document (plain JSON form)
    #[arg(short = 'D', long, global = true, default_value = "statemachine.json")]
    pub document: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new empty document
    Init {
        /// Overwrite an existing document
        #[arg(short, long)]
        force: bool,

        /// Platform of the new document (overrides the config)
        #[arg(short, long)]
        platform: Option<String>,
    },

    /// Show document summary
    Status,

    /// Print the containment tree
    Tree,

    /// Report triggers, actions and guards naming unknown components
    Check,

    /// Apply a JSON array of intents, then save
    Apply {
        /// Path to the intent script
        #[arg(short, long)]
        script: PathBuf,

        /// Undo this many commands after the script ran
        #[arg(short, long, default_value = "0")]
        undo: usize,
    },

    /// Export the document
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (json, interchange, snapshot)
        #[arg(short = 't', long, default_value = "json")]
        format: String,
    },

    /// Replace the document from another format
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Input format (interchange, snapshot, json)
        #[arg(short = 't', long, default_value = "interchange")]
        format: String,
    },

    /// Print a state and its subtree as a clipboard fragment
    Copy {
        /// State identifier
        #[arg(short, long)]
        state: String,

        /// Write the fragment to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List platform catalogues
    Platforms {
        /// Show events, actions and variables of each component type
        #[arg(short, long)]
        detailed: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), StatelabError> {
    let ctx = Context::new(cli.document, cli.config.as_deref(), cli.json_mode)?;

    match cli.command {
        Some(Commands::Init { force, platform }) => cmd_init(&ctx, force, platform.as_deref()),
        Some(Commands::Status) => cmd_status(&ctx),
        Some(Commands::Tree) => cmd_tree(&ctx),
        Some(Commands::Check) => cmd_check(&ctx),
        Some(Commands::Apply { script, undo }) => cmd_apply(&ctx, &script, undo),
        Some(Commands::Export { output, format }) => cmd_export(&ctx, &output, &format),
        Some(Commands::Import { input, format }) => cmd_import(&ctx, &input, &format),
        Some(Commands::Copy { state, output }) => cmd_copy(&ctx, &state, output.as_deref()),
        Some(Commands::Platforms { detailed }) => cmd_platforms(&ctx, detailed),
        None => {
            // No subcommand - show status by default
            cmd_status(&ctx)
        }
    }
}
