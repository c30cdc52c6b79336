//! `kubectl get canaries` status query.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::debug;

use flagmon_monitor::{ControllerQuery, QueryOutput};

use crate::credentials::KubeconfigSource;
use crate::error::{KubeError, KubeResult};

/// Queries Flagger canaries through the kubectl binary.
///
/// A single kubeconfig file is passed on the command line. A search path
/// of several files is set as `KUBECONFIG` on the child process only.
#[derive(Debug, Clone)]
pub struct KubectlQuery {
    kubectl: PathBuf,
    kubeconfig: Option<PathBuf>,
    search_path: Option<OsString>,
    namespace: Option<String>,
    extra_args: Vec<String>,
}

impl KubectlQuery {
    pub fn new(kubectl: impl Into<PathBuf>) -> Self {
        Self {
            kubectl: kubectl.into(),
            kubeconfig: None,
            search_path: None,
            namespace: None,
            extra_args: Vec::new(),
        }
    }

    pub fn with_kubeconfig(mut self, path: &Path) -> Self {
        self.kubeconfig = Some(path.to_path_buf());
        self
    }

    pub fn with_kubeconfig_source(self, source: &KubeconfigSource) -> Self {
        match source {
            KubeconfigSource::File(path) => self.with_kubeconfig(path),
            KubeconfigSource::SearchPath(paths) => Self {
                search_path: Some(paths.clone()),
                ..self
            },
        }
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    /// Append user-supplied arguments, split like a shell would.
    pub fn with_arguments(mut self, arguments: &str) -> KubeResult<Self> {
        self.extra_args.extend(split_arguments(arguments)?);
        Ok(self)
    }

    /// Full argument list for a status query of `names`.
    pub fn command_args(&self, names: &[String]) -> Vec<String> {
        let mut args = vec!["get".to_string(), "canaries".to_string()];
        if let Some(path) = &self.kubeconfig {
            args.push("--kubeconfig".to_string());
            args.push(path.display().to_string());
        }
        if let Some(ns) = &self.namespace {
            args.push("--namespace".to_string());
            args.push(ns.clone());
        }
        args.extend(self.extra_args.iter().cloned());
        args.extend(names.iter().cloned());
        args
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.kubectl);
        if let Some(paths) = &self.search_path {
            command.env("KUBECONFIG", paths);
        }
        command
    }

    /// `kubectl version --client`, for diagnostics.
    pub async fn client_version(&self) -> KubeResult<String> {
        let output = self
            .command()
            .arg("version")
            .arg("--client")
            .output()
            .await?;

        if !output.status.success() {
            return Err(KubeError::Kubectl(format!(
                "version check failed (exit code: {}): {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl ControllerQuery for KubectlQuery {
    async fn query_status(&self, names: &[String]) -> QueryOutput {
        let args = self.command_args(names);
        debug!(kubectl = %self.kubectl.display(), ?args, "running status query");

        match self.command().args(&args).output().await {
            Ok(output) => QueryOutput {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Err(e) => QueryOutput::failure(
                -1,
                format!("failed to execute {}: {e}", self.kubectl.display()),
            ),
        }
    }
}

/// Split an argument string on whitespace, keeping quoted runs intact.
fn split_arguments(input: &str) -> KubeResult<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(KubeError::InvalidArguments(format!(
            "unterminated {q} quote in: {input}"
        )));
    }
    if in_token {
        args.push(current);
    }
    Ok(args)
}
