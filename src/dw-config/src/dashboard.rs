//!
//! # Toolkit settings
//!
//! Read from a YAML file, then overridden by `DW_*` environment variables.
//!
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::ConfigError;

const CONFIG_PATH_ENV: &str = "DW_CONFIG";

const NAMESPACE_ENV: &str = "DW_NAMESPACE";
const MAX_ATTEMPTS_ENV: &str = "DW_RETRY_MAX_ATTEMPTS";
const DELAY_MS_ENV: &str = "DW_RETRY_DELAY_MS";
const RUNNING_LIMIT_ENV: &str = "DW_RUNNING_LIMIT";
const EDITOR_NAMESPACE_ENV: &str = "DW_EDITOR_NAMESPACE";
const TECH_PREVIEW_ENV: &str = "DW_PREFER_TECH_PREVIEW";
const ROUTING_CLASS_ENV: &str = "DW_ROUTING_CLASS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// namespace workspaces are managed in, defaults to the cluster context namespace
    pub namespace: Option<String>,
    pub retry: RetrySettings,
    /// maximum number of running workspaces per user
    pub running_limit: usize,
    /// namespace holding editor DevWorkspaceTemplates
    pub editor_namespace: Option<String>,
    pub prefer_tech_preview: bool,
    pub routing_class: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            retry: RetrySettings::default(),
            running_limit: 1,
            editor_namespace: None,
            prefer_tech_preview: false,
            routing_class: "che".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay_ms: 1000,
        }
    }
}

impl RetrySettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl DashboardConfig {
    /// file named by DW_CONFIG if set, then environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file<T: AsRef<Path>>(path: T) -> Result<Self, ConfigError> {
        debug!(path = %path.as_ref().display(), "reading dashboard config");
        let file = File::open(path.as_ref())?;
        Ok(serde_yaml::from_reader(file)?)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// apply overrides found through `lookup`
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(namespace) = lookup(NAMESPACE_ENV) {
            self.namespace = Some(namespace);
        }
        if let Some(value) = lookup(MAX_ATTEMPTS_ENV) {
            self.retry.max_attempts = parse_env(MAX_ATTEMPTS_ENV, &value)?;
        }
        if let Some(value) = lookup(DELAY_MS_ENV) {
            self.retry.delay_ms = parse_env(DELAY_MS_ENV, &value)?;
        }
        if let Some(value) = lookup(RUNNING_LIMIT_ENV) {
            self.running_limit = parse_env(RUNNING_LIMIT_ENV, &value)?;
        }
        if let Some(namespace) = lookup(EDITOR_NAMESPACE_ENV) {
            self.editor_namespace = Some(namespace);
        }
        if let Some(value) = lookup(TECH_PREVIEW_ENV) {
            self.prefer_tech_preview = parse_env(TECH_PREVIEW_ENV, &value)?;
        }
        if let Some(class) = lookup(ROUTING_CLASS_ENV) {
            self.routing_class = class;
        }
        Ok(self)
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}

#[cfg(test)]
mod test {

    use std::collections::HashMap;
    use std::time::Duration;

    use super::DashboardConfig;
    use crate::ConfigError;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::from_yaml("{}").expect("parse");
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.delay(), Duration::from_secs(1));
        assert_eq!(config.running_limit, 1);
        assert_eq!(config.routing_class, "che");
    }

    #[test]
    fn test_read_file() {
        let config = DashboardConfig::from_file("data/dashboard.yaml").expect("read");
        assert_eq!(config.namespace.as_deref(), Some("user-che"));
        assert_eq!(config.running_limit, 2);
        assert_eq!(config.editor_namespace.as_deref(), Some("eclipse-che"));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("DW_NAMESPACE", "other"),
            ("DW_RETRY_MAX_ATTEMPTS", "7"),
            ("DW_PREFER_TECH_PREVIEW", "true"),
            ("DW_ROUTING_CLASS", "basic"),
        ]
        .into_iter()
        .collect();

        let config = DashboardConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()))
            .expect("overrides");
        assert_eq!(config.namespace.as_deref(), Some("other"));
        assert_eq!(config.retry.max_attempts, 7);
        assert_eq!(config.retry.delay_ms, 1000);
        assert!(config.prefer_tech_preview);
        assert_eq!(config.routing_class, "basic");
    }

    #[test]
    fn test_invalid_override() {
        let result = DashboardConfig::default().with_overrides(|key| {
            (key == "DW_RUNNING_LIMIT").then(|| "many".to_owned())
        });
        assert!(matches!(result, Err(ConfigError::Env { key, .. }) if key == "DW_RUNNING_LIMIT"));
    }
}
