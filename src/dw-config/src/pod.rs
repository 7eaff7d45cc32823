use std::fs::read_to_string;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::trace;

const BASE_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";
const API_SERVER: &str = "https://kubernetes.default.svc";
const SERVICE_HOST: &str = "KUBERNETES_SERVICE_HOST";
const SERVICE_PORT: &str = "KUBERNETES_SERVICE_PORT";

/// Configuration as Pod
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PodConfig {
    pub namespace: String,
    pub token: String,
    pub base_dir: PathBuf,
    pub api_path: String,
}

impl PodConfig {
    /// load from service account directory, none if not running inside a pod
    pub fn load() -> Option<Self> {
        Self::load_from(BASE_DIR)
    }

    pub fn load_from(base_dir: impl AsRef<Path>) -> Option<Self> {
        let base_dir = base_dir.as_ref();
        let namespace = read_file(base_dir, "namespace")?;
        let token = read_file(base_dir, "token")?;
        debug!(%namespace, "found service account");

        Some(Self {
            namespace: namespace.trim().to_owned(),
            token: token.trim().to_owned(),
            base_dir: base_dir.to_path_buf(),
            api_path: api_path(),
        })
    }

    pub fn api_path(&self) -> &str {
        &self.api_path
    }

    /// path to ca certificate
    pub fn ca_path(&self) -> PathBuf {
        self.base_dir.join("ca.crt")
    }
}

fn read_file(base_dir: &Path, name: &str) -> Option<String> {
    let path = base_dir.join(name);
    match read_to_string(&path) {
        Ok(value) => Some(value),
        Err(err) => {
            trace!(path = %path.display(), %err, "service account file not readable");
            None
        }
    }
}

fn api_path() -> String {
    match (std::env::var(SERVICE_HOST), std::env::var(SERVICE_PORT)) {
        (Ok(host), Ok(port)) if !host.is_empty() => service_url(&host, &port),
        _ => API_SERVER.to_owned(),
    }
}

/// ipv6 literals are bracketed in urls
fn service_url(host: &str, port: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("https://[{}]:{}", host, port)
    } else {
        format!("https://{}:{}", host, port)
    }
}
