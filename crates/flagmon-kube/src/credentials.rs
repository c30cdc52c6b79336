//! Cluster credentials: materializing a kubeconfig for kubectl.
//!
//! Two sources are supported:
//!
//! - an existing kubeconfig, optionally pinned to a context; a
//!   `KUBECONFIG`-style search path of several files is handed to
//!   kubectl as is
//! - a service-account endpoint (server URL, CA data, bearer token),
//!   from which a minimal kubeconfig is generated
//!
//! Generated files live in a private per-run directory that is removed
//! when the [`AccessConfig`] is dropped.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{KubeError, KubeResult};

const GENERATED_CONTEXT: &str = "flagger-monitor";
const WORK_DIR_PREFIX: &str = "flagger-monitor-";

/// Where cluster credentials come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialProvider {
    /// Use an existing kubeconfig, switching to `context` if given.
    /// `path` may also be a search path of several files.
    FromGivenConfig {
        path: PathBuf,
        context: Option<String>,
    },
    /// Build a kubeconfig from a service-account endpoint.
    FromServiceAccount {
        server: String,
        certificate_authority_data: Option<String>,
        token: String,
    },
}

/// How kubectl should find its kubeconfig.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KubeconfigSource {
    /// A single file, passed as `--kubeconfig`.
    File(PathBuf),
    /// Several files kubectl merges, passed as `KUBECONFIG` to the child.
    SearchPath(OsString),
}

/// A kubeconfig ready to hand to kubectl.
#[derive(Debug)]
pub struct AccessConfig {
    source: KubeconfigSource,
    work_dir: Option<TempDir>,
}

impl AccessConfig {
    pub fn source(&self) -> &KubeconfigSource {
        &self.source
    }

    /// The single kubeconfig file, if there is one.
    pub fn file(&self) -> Option<&Path> {
        match &self.source {
            KubeconfigSource::File(path) => Some(path),
            KubeconfigSource::SearchPath(_) => None,
        }
    }

    /// Whether the file was written by us (and will be removed on drop).
    pub fn is_generated(&self) -> bool {
        self.work_dir.is_some()
    }
}

impl Drop for AccessConfig {
    fn drop(&mut self) {
        let Some(dir) = self.work_dir.take() else {
            return;
        };
        let path = dir.path().to_path_buf();
        match dir.close() {
            Ok(()) => debug!(path = %path.display(), "removed generated kubeconfig"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove generated kubeconfig"),
        }
    }
}

impl CredentialProvider {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CredentialProvider::FromGivenConfig { .. } => "kubeconfig",
            CredentialProvider::FromServiceAccount { .. } => "service-account",
        }
    }

    /// Produce a kubeconfig, writing a private copy when one is needed.
    pub fn materialize(&self) -> KubeResult<AccessConfig> {
        match self {
            CredentialProvider::FromGivenConfig { path, context } => {
                let entries: Vec<PathBuf> = std::env::split_paths(path)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect();
                match (entries.as_slice(), context) {
                    ([single], None) => {
                        if !single.exists() {
                            return Err(missing(path));
                        }
                        Ok(AccessConfig {
                            source: KubeconfigSource::File(single.clone()),
                            work_dir: None,
                        })
                    }
                    ([single], Some(context)) => {
                        let content = std::fs::read_to_string(single).map_err(|source| {
                            KubeError::ReadConfig {
                                path: single.clone(),
                                source,
                            }
                        })?;
                        let rendered = with_current_context(&content, context)?;
                        write_config(&rendered)
                    }
                    (_, Some(context)) if entries.len() > 1 => {
                        Err(KubeError::MergedContext(context.clone()))
                    }
                    _ => {
                        // kubectl skips missing entries, but at least one must exist
                        if !entries.iter().any(|p| p.exists()) {
                            return Err(missing(path));
                        }
                        Ok(AccessConfig {
                            source: KubeconfigSource::SearchPath(path.as_os_str().to_os_string()),
                            work_dir: None,
                        })
                    }
                }
            }
            CredentialProvider::FromServiceAccount {
                server,
                certificate_authority_data,
                token,
            } => {
                let rendered = service_account_config(
                    server,
                    certificate_authority_data.as_deref(),
                    token,
                )?;
                write_config(&rendered)
            }
        }
    }
}

fn missing(given: &Path) -> KubeError {
    KubeError::ReadConfig {
        path: given.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "kubeconfig does not exist"),
    }
}

/// Rewrite `current-context`, checking the context exists when the
/// file lists any.
fn with_current_context(content: &str, context: &str) -> KubeResult<String> {
    let mut doc: serde_yaml::Value = serde_yaml::from_str(content)?;
    let Some(map) = doc.as_mapping_mut() else {
        return Err(KubeError::MalformedConfig("top level is not a mapping".to_string()));
    };

    if let Some(contexts) = map.get("contexts").and_then(|c| c.as_sequence()) {
        let known = contexts
            .iter()
            .any(|c| c.get("name").and_then(|n| n.as_str()) == Some(context));
        if !known {
            return Err(KubeError::UnknownContext(context.to_string()));
        }
    }

    map.insert(
        serde_yaml::Value::from("current-context"),
        serde_yaml::Value::from(context),
    );
    Ok(serde_yaml::to_string(&doc)?)
}

#[derive(Serialize)]
struct Kubeconfig<'a> {
    #[serde(rename = "apiVersion")]
    api_version: &'a str,
    kind: &'a str,
    clusters: Vec<Named<ClusterEntry<'a>>>,
    users: Vec<Named<UserEntry<'a>>>,
    contexts: Vec<Named<ContextEntry<'a>>>,
    #[serde(rename = "current-context")]
    current_context: &'a str,
}

#[derive(Serialize)]
struct Named<T> {
    name: &'static str,
    #[serde(flatten)]
    entry: T,
}

#[derive(Serialize)]
struct ClusterEntry<'a> {
    cluster: Cluster<'a>,
}

#[derive(Serialize)]
struct Cluster<'a> {
    server: &'a str,
    #[serde(
        rename = "certificate-authority-data",
        skip_serializing_if = "Option::is_none"
    )]
    certificate_authority_data: Option<&'a str>,
}

#[derive(Serialize)]
struct UserEntry<'a> {
    user: User<'a>,
}

#[derive(Serialize)]
struct User<'a> {
    token: &'a str,
}

#[derive(Serialize)]
struct ContextEntry<'a> {
    context: Context<'a>,
}

#[derive(Serialize)]
struct Context<'a> {
    cluster: &'a str,
    user: &'a str,
}

fn service_account_config(server: &str, ca_data: Option<&str>, token: &str) -> KubeResult<String> {
    let config = Kubeconfig {
        api_version: "v1",
        kind: "Config",
        clusters: vec![Named {
            name: GENERATED_CONTEXT,
            entry: ClusterEntry {
                cluster: Cluster {
                    server,
                    certificate_authority_data: ca_data,
                },
            },
        }],
        users: vec![Named {
            name: GENERATED_CONTEXT,
            entry: UserEntry {
                user: User {
                    token: token.trim(),
                },
            },
        }],
        contexts: vec![Named {
            name: GENERATED_CONTEXT,
            entry: ContextEntry {
                context: Context {
                    cluster: GENERATED_CONTEXT,
                    user: GENERATED_CONTEXT,
                },
            },
        }],
        current_context: GENERATED_CONTEXT,
    };
    Ok(serde_yaml::to_string(&config)?)
}

fn write_config(content: &str) -> KubeResult<AccessConfig> {
    let work_dir = tempfile::Builder::new()
        .prefix(WORK_DIR_PREFIX)
        .tempdir()?;
    let path = work_dir.path().join("config");
    let write_err = |source: std::io::Error| KubeError::WriteConfig {
        path: path.clone(),
        source,
    };

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(&path).map_err(write_err)?;
    file.write_all(content.as_bytes()).map_err(write_err)?;

    debug!(path = %path.display(), "wrote kubeconfig");
    Ok(AccessConfig {
        source: KubeconfigSource::File(path),
        work_dir: Some(work_dir),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIVEN: &str = r#"
apiVersion: v1
kind: Config
clusters:
  - name: prod
    cluster:
      server: https://prod.example.com
contexts:
  - name: prod
    context:
      cluster: prod
      user: admin
  - name: staging
    context:
      cluster: prod
      user: admin
current-context: prod
users:
  - name: admin
    user:
      token: abc
"#;

    #[cfg(unix)]
    fn assert_private(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn given_config_is_used_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kubeconfig");
        std::fs::write(&path, GIVEN).unwrap();

        let provider = CredentialProvider::FromGivenConfig {
            path: path.clone(),
            context: None,
        };
        let access = provider.materialize().unwrap();
        assert_eq!(access.source(), &KubeconfigSource::File(path.clone()));
        assert!(!access.is_generated());

        drop(access);
        assert!(path.exists());
    }

    #[test]
    fn missing_given_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CredentialProvider::FromGivenConfig {
            path: dir.path().join("nope"),
            context: None,
        };
        assert!(matches!(
            provider.materialize(),
            Err(KubeError::ReadConfig { .. })
        ));
    }

    #[test]
    fn search_path_is_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, GIVEN).unwrap();
        std::fs::write(&b, GIVEN).unwrap();
        let joined = std::env::join_paths([&a, &b]).unwrap();

        let provider = CredentialProvider::FromGivenConfig {
            path: PathBuf::from(&joined),
            context: None,
        };
        let access = provider.materialize().unwrap();
        assert_eq!(access.source(), &KubeconfigSource::SearchPath(joined));
        assert!(access.file().is_none());
        assert!(!access.is_generated());
    }

    #[test]
    fn search_path_needs_one_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let joined = std::env::join_paths([dir.path().join("a"), dir.path().join("b")]).unwrap();
        let provider = CredentialProvider::FromGivenConfig {
            path: PathBuf::from(joined),
            context: None,
        };
        assert!(matches!(
            provider.materialize(),
            Err(KubeError::ReadConfig { .. })
        ));
    }

    #[test]
    fn context_over_search_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, GIVEN).unwrap();
        std::fs::write(&b, GIVEN).unwrap();

        let provider = CredentialProvider::FromGivenConfig {
            path: PathBuf::from(std::env::join_paths([&a, &b]).unwrap()),
            context: Some("staging".to_string()),
        };
        assert!(matches!(
            provider.materialize(),
            Err(KubeError::MergedContext(c)) if c == "staging"
        ));
    }

    #[test]
    fn context_override_writes_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kubeconfig");
        std::fs::write(&path, GIVEN).unwrap();

        let provider = CredentialProvider::FromGivenConfig {
            path: path.clone(),
            context: Some("staging".to_string()),
        };
        let access = provider.materialize().unwrap();
        assert!(access.is_generated());
        let generated = access.file().unwrap().to_path_buf();
        assert_ne!(generated, path);

        let written: serde_yaml::Value =
            serde_yaml::from_str(&std::fs::read_to_string(&generated).unwrap()).unwrap();
        assert_eq!(written["current-context"].as_str(), Some("staging"));
        #[cfg(unix)]
        assert_private(&generated);

        let work_dir = generated.parent().unwrap().to_path_buf();
        drop(access);
        assert!(!generated.exists());
        assert!(!work_dir.exists());
        assert!(path.exists());
    }

    #[test]
    fn unknown_context_is_rejected() {
        assert!(matches!(
            with_current_context(GIVEN, "dev"),
            Err(KubeError::UnknownContext(c)) if c == "dev"
        ));
    }

    #[test]
    fn each_generated_config_gets_its_own_directory() {
        let provider = CredentialProvider::FromServiceAccount {
            server: "https://k8s".to_string(),
            certificate_authority_data: None,
            token: "t".to_string(),
        };
        let first = provider.materialize().unwrap();
        let second = provider.materialize().unwrap();
        let first_path = first.file().unwrap().to_path_buf();
        let second_path = second.file().unwrap().to_path_buf();
        assert_ne!(first_path.parent(), second_path.parent());

        drop(first);
        assert!(!first_path.exists());
        assert!(second_path.exists());
    }

    #[test]
    fn service_account_config_shape() {
        let provider = CredentialProvider::FromServiceAccount {
            server: "https://10.0.0.1:6443".to_string(),
            certificate_authority_data: Some("LS0tLS1CRUdJTg==".to_string()),
            token: "secret-token\n".to_string(),
        };
        assert_eq!(provider.kind(), "service-account");

        let access = provider.materialize().unwrap();
        let path = access.file().unwrap();
        let written: serde_yaml::Value =
            serde_yaml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();

        assert_eq!(written["apiVersion"].as_str(), Some("v1"));
        assert_eq!(written["kind"].as_str(), Some("Config"));
        assert_eq!(
            written["clusters"][0]["cluster"]["server"].as_str(),
            Some("https://10.0.0.1:6443")
        );
        assert_eq!(
            written["clusters"][0]["cluster"]["certificate-authority-data"].as_str(),
            Some("LS0tLS1CRUdJTg==")
        );
        assert_eq!(written["users"][0]["user"]["token"].as_str(), Some("secret-token"));
        assert_eq!(written["current-context"].as_str(), Some(GENERATED_CONTEXT));
        #[cfg(unix)]
        assert_private(path);
    }

    #[test]
    fn ca_data_is_optional() {
        let rendered = service_account_config("https://k8s", None, "t").unwrap();
        assert!(!rendered.contains("certificate-authority-data"));
    }
}
