use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, ValueEnum};
use tracing::{debug, info, warn};

use flagmon_core::config::{ClusterSection, Timing};
use flagmon_core::{parse_targets, MonitorConfig};
use flagmon_kube::{CredentialProvider, KubectlQuery};
use flagmon_monitor::{MonitorSession, ResultSink};

use crate::sink::{ConsoleSink, JsonSink, PipelineSink};

const DEFAULT_CONFIG_FILE: &str = "flagger-monitor.toml";

#[derive(Args, Debug, Default)]
pub struct WatchArgs {
    /// Config file (default: ./flagger-monitor.toml if present).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Canary names, separated by commas, spaces, or newlines.
    #[arg(long)]
    pub canaries: Option<String>,

    /// Namespace of the canaries.
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Extra arguments for `kubectl get canaries`.
    #[arg(long, allow_hyphen_values = true)]
    pub arguments: Option<String>,

    /// Seconds to wait before the first poll.
    #[arg(long)]
    pub initial_delay: Option<u64>,

    /// Seconds between polls.
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Total seconds to wait for the canaries.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Existing kubeconfig to use.
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Context to select from the kubeconfig.
    #[arg(long)]
    pub context: Option<String>,

    /// API server URL for service-account access.
    #[arg(long)]
    pub server: Option<String>,

    /// Service-account bearer token.
    #[arg(long, env = "FLAGGER_MONITOR_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// File holding the service-account bearer token.
    #[arg(long)]
    pub token_file: Option<PathBuf>,

    /// Base64 cluster CA certificate for service-account access.
    #[arg(long)]
    pub ca_data: Option<String>,

    /// kubectl binary.
    #[arg(long)]
    pub kubectl: Option<PathBuf>,

    /// How to report the result on stdout.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Summary line and status table.
    #[default]
    Text,
    /// One JSON document.
    Json,
    /// Azure Pipelines logging commands.
    Pipeline,
}

/// Flags merged over the config file.
#[derive(Debug)]
pub struct Settings {
    pub names: Vec<String>,
    pub timing: Timing,
    pub namespace: Option<String>,
    pub arguments: Option<String>,
    pub kubectl: PathBuf,
    pub credentials: Option<CredentialProvider>,
    pub output: OutputFormat,
}

impl Settings {
    pub fn resolve(args: WatchArgs) -> anyhow::Result<Self> {
        let file = load_config(args.config.as_deref())?;
        let cluster = file.cluster.clone().unwrap_or_default();

        let canaries = args
            .canaries
            .or_else(|| file.monitor.as_ref().and_then(|m| m.canaries.clone()))
            .context("no canaries given (use --canaries or [monitor].canaries)")?;
        let names = parse_targets(&canaries)?;

        let defaults = file.timing();
        let timing = Timing {
            initial_delay: args
                .initial_delay
                .map(Duration::from_secs)
                .unwrap_or(defaults.initial_delay),
            poll_interval: args
                .poll_interval
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            timeout: args
                .timeout
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        };
        if timing.poll_interval.is_zero() {
            bail!("poll interval must be greater than zero");
        }

        let credentials = credentials(
            &cluster,
            CredentialFlags {
                kubeconfig: args.kubeconfig,
                context: args.context,
                server: args.server,
                token: args.token,
                token_file: args.token_file,
                ca_data: args.ca_data,
            },
        )?;

        Ok(Self {
            names,
            timing,
            namespace: args.namespace.or(cluster.namespace),
            arguments: args.arguments.or(cluster.arguments),
            kubectl: args
                .kubectl
                .or(cluster.kubectl)
                .unwrap_or_else(|| PathBuf::from("kubectl")),
            credentials,
            output: args.output,
        })
    }
}

struct CredentialFlags {
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
    server: Option<String>,
    token: Option<String>,
    token_file: Option<PathBuf>,
    ca_data: Option<String>,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<MonitorConfig> {
    match path {
        Some(path) => MonitorConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.exists() {
                MonitorConfig::from_file(default)
                    .with_context(|| format!("failed to load {}", default.display()))
            } else {
                Ok(MonitorConfig::default())
            }
        }
    }
}

/// Pick a credential source. A server URL selects service-account
/// access; otherwise a kubeconfig path is used. With neither, kubectl
/// falls back to its own defaults.
fn credentials(
    cluster: &ClusterSection,
    flags: CredentialFlags,
) -> anyhow::Result<Option<CredentialProvider>> {
    if let Some(server) = flags.server.or_else(|| cluster.server.clone()) {
        let token = match (flags.token, flags.token_file.or_else(|| cluster.token_file.clone())) {
            (Some(token), _) => token,
            (None, Some(file)) => std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read token file {}", file.display()))?,
            (None, None) => cluster
                .token
                .clone()
                .context("service-account access needs --token or --token-file")?,
        };
        return Ok(Some(CredentialProvider::FromServiceAccount {
            server,
            certificate_authority_data: flags
                .ca_data
                .or_else(|| cluster.certificate_authority_data.clone()),
            token,
        }));
    }

    let path = flags.kubeconfig.or_else(|| cluster.kubeconfig.clone());
    Ok(path.map(|path| CredentialProvider::FromGivenConfig {
        path,
        context: flags.context.or_else(|| cluster.context.clone()),
    }))
}

fn sink(format: OutputFormat) -> Box<dyn ResultSink> {
    match format {
        OutputFormat::Text => Box::new(ConsoleSink::new(std::io::stdout())),
        OutputFormat::Json => Box::new(JsonSink::new(std::io::stdout())),
        OutputFormat::Pipeline => Box::new(PipelineSink::new(std::io::stdout())),
    }
}

pub async fn watch(args: WatchArgs) -> anyhow::Result<u8> {
    let settings = Settings::resolve(args)?;

    // Generated kubeconfigs are removed when `access` drops, on every path out.
    let access = settings
        .credentials
        .as_ref()
        .map(|provider| {
            provider
                .materialize()
                .with_context(|| format!("failed to prepare {} credentials", provider.kind()))
        })
        .transpose()?;

    info!(
        connection = settings.credentials.as_ref().map_or("ambient", |p| p.kind()),
        canaries = ?settings.names,
        namespace = ?settings.namespace,
        "flagger canary monitor"
    );

    let mut query = KubectlQuery::new(&settings.kubectl);
    if let Some(access) = &access {
        query = query.with_kubeconfig_source(access.source());
    }
    if let Some(ns) = &settings.namespace {
        query = query.with_namespace(ns);
    }
    if let Some(arguments) = &settings.arguments {
        query = query.with_arguments(arguments)?;
    }

    match query.client_version().await {
        Ok(version) => debug!(%version, "kubectl client"),
        Err(e) => warn!(error = %e, "could not determine kubectl version"),
    }

    let mut session =
        MonitorSession::new(&settings.names, settings.timing, query, sink(settings.output))?;
    let report = session.run().await?;
    drop(access);

    Ok(u8::try_from(report.outcome.exit_code()).unwrap_or(1))
}
