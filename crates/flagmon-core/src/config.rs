//! flagger-monitor.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_INITIAL_DELAY_SECS: u64 = 30;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub monitor: Option<MonitorSection>,
    pub cluster: Option<ClusterSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorSection {
    /// Comma/space/newline separated canary names.
    pub canaries: Option<String>,
    pub initial_delay_secs: Option<u64>,
    pub poll_interval_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterSection {
    pub namespace: Option<String>,
    /// Extra arguments appended to `kubectl get canaries`.
    pub arguments: Option<String>,
    pub kubectl: Option<PathBuf>,
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub server: Option<String>,
    pub certificate_authority_data: Option<String>,
    pub token: Option<String>,
    pub token_file: Option<PathBuf>,
}

/// Resolved timing parameters of one monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub initial_delay: Duration,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(DEFAULT_INITIAL_DELAY_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl MonitorConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MonitorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Timing from the `[monitor]` table, falling back to defaults.
    pub fn timing(&self) -> Timing {
        let defaults = Timing::default();
        let Some(m) = &self.monitor else {
            return defaults;
        };
        Timing {
            initial_delay: m
                .initial_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.initial_delay),
            poll_interval: m
                .poll_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            timeout: m
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Scaffold a config watching the given canaries in a namespace.
    pub fn scaffold(canaries: &str, namespace: Option<&str>) -> Self {
        MonitorConfig {
            monitor: Some(MonitorSection {
                canaries: Some(canaries.to_string()),
                initial_delay_secs: Some(DEFAULT_INITIAL_DELAY_SECS),
                poll_interval_secs: Some(DEFAULT_POLL_INTERVAL_SECS),
                timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            }),
            cluster: Some(ClusterSection {
                namespace: namespace.map(str::to_string),
                ..Default::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaffold() {
        let config = MonitorConfig::scaffold("podinfo, frontend", Some("test"));
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("podinfo, frontend"));
        assert!(toml_str.contains("namespace = \"test\""));
    }

    #[test]
    fn test_parse_minimal() {
        let toml_str = r#"
[monitor]
canaries = "podinfo"
timeout_secs = 120
"#;
        let config: MonitorConfig = toml::from_str(toml_str).unwrap();
        let timing = config.timing();
        assert_eq!(timing.timeout, Duration::from_secs(120));
        assert_eq!(
            timing.poll_interval,
            Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS)
        );
        assert!(config.cluster.is_none());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flagger-monitor.toml");
        std::fs::write(
            &path,
            "[cluster]\nnamespace = \"prod\"\nkubeconfig = \"/etc/kube/config\"\n",
        )
        .unwrap();

        let config = MonitorConfig::from_file(&path).unwrap();
        assert_eq!(config.timing(), Timing::default());
        let cluster = config.cluster.unwrap();
        assert_eq!(cluster.namespace.as_deref(), Some("prod"));
        assert_eq!(cluster.kubeconfig, Some(PathBuf::from("/etc/kube/config")));
    }
}
