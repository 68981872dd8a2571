use anyhow::Result;
use clap::{Parser, Subcommand};
use modshim::commands::{
    history_command, init_command, inspect_command, load_command, platforms_command, InitOptions,
};
use tracing_subscriber::EnvFilter;

/// Mod compatibility loader CLI.
///
/// A thin wrapper around `modshim-core` (exposed in code as `modshim_core`).
/// All loading, rewriting and ledger logic lives in the library.
#[derive(Parser, Debug)]
#[command(
    name = "modshim",
    version,
    about = "Rewrite and load game mods against the current platform",
    long_about = None
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    /// Log at trace level, including per-module compatibility messages.
    #[arg(long, global = true, default_value_t = false)]
    trace: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize loader settings for a game directory.
    ///
    /// This will:
    /// - Create the `.modshim` metadata directory and `Mods`.
    /// - Write `.modshim/settings.json`.
    /// - Create the load ledger database.
    Init {
        /// Game directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        game_dir: String,

        /// Optional settings name. If omitted, the name is derived from the game directory.
        #[arg(long)]
        name: Option<String>,

        /// Host platform (windows, linux, mac, android).
        #[arg(long, default_value = "windows")]
        platform: String,

        /// Game framework (xna, monogame).
        #[arg(long, default_value = "monogame")]
        framework: String,

        /// Flag console, filesystem and shell access in mods.
        #[arg(long, default_value_t = false)]
        paranoid: bool,

        /// Detect incompatibilities without rewriting mod code.
        #[arg(long, default_value_t = false)]
        no_rewrite: bool,

        /// Module in the game directory whose definitions mods may reference (repeatable).
        #[arg(long = "host-module")]
        host_modules: Vec<String>,

        /// Platform profile (YAML or JSON) relative to the game directory.
        #[arg(long)]
        profile: Option<String>,
    },

    /// Load a mod module and its local dependencies.
    Load {
        /// Game directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        game_dir: String,

        /// Path to the mod's entry module.
        #[arg(long)]
        module: String,

        /// Mod id. Defaults to the module's file stem.
        #[arg(long)]
        mod_id: Option<String>,

        /// Load incompatible code with a warning instead of rejecting it.
        #[arg(long, default_value_t = false)]
        assume_compatible: bool,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Summarize a module file's references and definitions.
    Inspect {
        /// Path to the module file.
        path: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List the built-in platform profiles.
    Platforms {
        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show recorded load runs.
    History {
        /// Game directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        game_dir: String,

        /// Only show runs for this mod id.
        #[arg(long)]
        mod_id: Option<String>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn init_tracing(verbose: bool, trace: bool) {
    let level = if trace {
        "trace"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.trace);

    match cli.command {
        Command::Init {
            game_dir,
            name,
            platform,
            framework,
            paranoid,
            no_rewrite,
            host_modules,
            profile,
        } => init_command(
            &game_dir,
            InitOptions { name, platform, framework, paranoid, no_rewrite, host_modules, profile },
        ),
        Command::Load { game_dir, module, mod_id, assume_compatible, json } => {
            load_command(&game_dir, &module, mod_id, assume_compatible, json)
        }
        Command::Inspect { path, json } => inspect_command(&path, json),
        Command::Platforms { json } => platforms_command(json),
        Command::History { game_dir, mod_id, json } => history_command(&game_dir, mod_id, json),
    }
}
