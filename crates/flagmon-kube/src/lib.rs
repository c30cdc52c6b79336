//! flagmon-kube — cluster access for flagger-monitor.
//!
//! - **`credentials`** — turns a kubeconfig or service-account endpoint
//!   into a kubeconfig kubectl can use (`CredentialProvider`)
//! - **`kubectl`** — `kubectl get canaries` as a `ControllerQuery`

pub mod credentials;
pub mod error;
pub mod kubectl;

pub use credentials::{AccessConfig, CredentialProvider, KubeconfigSource};
pub use error::{KubeError, KubeResult};
pub use kubectl::KubectlQuery;
