//! Modinject command-line harness
//!
//! Activates an injection from the command line, reports its status and
//! tears it down again. Also packs directories into bundles and lists the
//! contents of existing ones.

mod commands;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use modinject_runtime::InjectorConfig;

use commands::{decode, pack, run};

#[derive(Parser)]
#[command(name = "modinject")]
#[command(about = "Serve modules from in-memory bundles", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: run::RunArgs,

    /// Config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Set the log level explicitly
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevel>,

    /// When to color output: auto, always, never
    #[arg(long, global = true)]
    color: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a package directory or single file as a bundle
    Pack {
        /// Directory or file to pack
        path: PathBuf,
        /// Write the bundle here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the paths a bundle contains
    Decode {
        /// Bundle text, or @FILE to read it from a file
        bundle: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.log_level);

    let config = match &cli.config {
        Some(path) => InjectorConfig::from_file(path)?,
        None => InjectorConfig::default(),
    };
    let mut out = output::StyledOutput::new(output::resolve_color_choice(cli.color.as_deref()));

    match cli.command {
        Some(Commands::Pack { path, output }) => {
            pack::execute(&path, output.as_deref(), &config, &mut out)
        }
        Some(Commands::Decode { bundle }) => decode::execute(&bundle, &config, &mut out),
        None => run::execute(cli.run, config, &mut out),
    }
}

fn setup_logging(verbose: u8, log_level: Option<LogLevel>) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if let Some(level) = log_level {
        EnvFilter::new(match level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let formatter = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_level(true);

    tracing_subscriber::registry()
        .with(formatter)
        .with(filter)
        .init();
}
