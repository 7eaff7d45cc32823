mod config;
mod dashboard;
mod error;
mod pod;

pub use config::*;
pub use dashboard::DashboardConfig;
pub use dashboard::RetrySettings;
pub use error::ConfigError;
pub use pod::PodConfig;

use tracing::debug;

const KUBECONFIG: &str = "KUBECONFIG";

/// kubeconfig with its resolved current context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeConfigContext {
    pub namespace: String,
    pub api_path: String,
    pub config: KubeConfig,
}

impl KubeConfigContext {
    pub fn new(config: KubeConfig) -> Result<Self, ConfigError> {
        let context = config
            .current_context()
            .ok_or(ConfigError::NoCurrentContext)?;
        let cluster = config.current_cluster().ok_or_else(|| {
            ConfigError::Other(format!(
                "cluster {} of current context not found",
                context.context.cluster
            ))
        })?;

        let namespace = context.context.namespace().to_owned();
        let api_path = cluster.cluster.server.trim_end_matches('/').to_owned();

        Ok(Self {
            namespace,
            api_path,
            config,
        })
    }

    /// load from KUBECONFIG or home directory
    pub fn load() -> Result<Self, ConfigError> {
        let config = match std::env::var(KUBECONFIG) {
            Ok(path) => KubeConfig::from_file(path)?,
            Err(_) => KubeConfig::from_home()?,
        };
        Self::new(config)
    }
}

/// where the api server is reached from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum K8Config {
    Pod(PodConfig),
    KubeConfig(KubeConfigContext),
}

impl K8Config {
    /// in-cluster service account first, then kubeconfig
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(pod_config) = PodConfig::load() {
            debug!("using pod config");
            Ok(K8Config::Pod(pod_config))
        } else {
            debug!("no pod config, loading kubeconfig");
            Ok(K8Config::KubeConfig(KubeConfigContext::load()?))
        }
    }

    pub fn api_path(&self) -> &str {
        match self {
            Self::Pod(pod) => pod.api_path(),
            Self::KubeConfig(context) => &context.api_path,
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            Self::Pod(pod) => &pod.namespace,
            Self::KubeConfig(context) => &context.namespace,
        }
    }
}

#[cfg(test)]
mod test {

    use super::K8Config;
    use super::KubeConfig;
    use super::KubeConfigContext;

    #[test]
    fn test_kubeconfig_context() {
        let config = KubeConfig::from_file("data/k8config.yaml").expect("read");
        let context = KubeConfigContext::new(config).expect("context");
        let k8_config = K8Config::KubeConfig(context);
        assert_eq!(k8_config.namespace(), "user-che");
        assert_eq!(k8_config.api_path(), "https://192.168.49.2:8443");
    }

    #[test]
    fn test_no_current_context() {
        let config = KubeConfig {
            current_context: "missing".to_owned(),
            ..Default::default()
        };
        assert!(matches!(
            KubeConfigContext::new(config),
            Err(super::ConfigError::NoCurrentContext)
        ));
    }
}
