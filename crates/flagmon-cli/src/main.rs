use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;

mod commands;
mod report;
mod sink;

#[derive(Parser)]
#[command(
    name = "flagger-monitor",
    about = "Watch Flagger canaries until they succeed, fail, or time out",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Log format on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll canaries and report a single verdict.
    ///
    /// Settings are read from flagger-monitor.toml (or --config) and
    /// overridden by flags. Exit code: 0 succeeded (possibly with
    /// issues), 1 failed or timed out, 2 kubectl error, 3 usage error.
    Watch(commands::watch::WatchArgs),
    /// Generate a flagger-monitor.toml scaffold.
    Init {
        /// Canary names to watch.
        #[arg(short, long)]
        canaries: String,
        /// Namespace of the canaries.
        #[arg(short, long)]
        namespace: Option<String>,
        /// Output file.
        #[arg(short, long, default_value = "flagger-monitor.toml")]
        path: String,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let default = if verbose {
        "info,flagger_monitor=debug,flagmon_monitor=debug,flagmon_kube=debug"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let result = match cli.command {
        Commands::Watch(args) => commands::watch::watch(args).await,
        Commands::Init {
            canaries,
            namespace,
            path,
            force,
        } => commands::init::init(&canaries, namespace.as_deref(), &path, force).map(|()| 0),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(error = %format!("{e:#}"), "flagger-monitor failed");
            eprintln!("error: {e:#}");
            ExitCode::from(commands::USAGE_ERROR)
        }
    }
}
