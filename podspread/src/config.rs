//! Configuration module for podspread
//!
//! Handles loading and validating configuration from YAML files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// How redundant pods are removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EvictionMode {
    /// Delete the pod
    #[default]
    Delete,
    /// Use the Eviction API (respects PodDisruptionBudgets)
    Evict,
}

/// Metrics export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether metrics are enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Port to expose metrics on
    #[serde(default = "default_metrics_port")]
    pub port: u16,

    /// Path for metrics endpoint
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
            path: default_metrics_path(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Namespace whose pods are rebalanced
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Housekeeping interval
    #[serde(with = "humantime_serde", default = "default_interval")]
    pub interval: Duration,

    /// Minimum running+ready replicas a workload needs before one is moved
    #[serde(default = "default_min_replicas")]
    pub min_replicas: usize,

    /// Deadline for the replacement pod to become ready
    #[serde(with = "humantime_serde", default = "default_pod_ready_timeout")]
    pub pod_ready_timeout: Duration,

    /// Interval between readiness checks while waiting
    #[serde(with = "humantime_serde", default = "default_ready_poll_interval")]
    pub ready_poll_interval: Duration,

    /// Eviction mode
    #[serde(default)]
    pub eviction_mode: EvictionMode,

    /// Explicit kubeconfig path
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Dry run mode - log decisions but don't evict
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            interval: default_interval(),
            min_replicas: default_min_replicas(),
            pod_ready_timeout: default_pod_ready_timeout(),
            ready_poll_interval: default_ready_poll_interval(),
            eviction_mode: EvictionMode::default(),
            kubeconfig: None,
            metrics: MetricsConfig::default(),
            dry_run: false,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            anyhow::bail!("namespace must not be empty");
        }
        if self.interval.is_zero() {
            anyhow::bail!("interval must be > 0");
        }
        if self.min_replicas == 0 {
            anyhow::bail!("min_replicas must be > 0");
        }
        if self.pod_ready_timeout.is_zero() {
            anyhow::bail!("pod_ready_timeout must be > 0");
        }
        if self.ready_poll_interval.is_zero() {
            anyhow::bail!("ready_poll_interval must be > 0");
        }
        if self.ready_poll_interval > self.pod_ready_timeout {
            anyhow::bail!("ready_poll_interval must not exceed pod_ready_timeout");
        }
        if self.metrics.enabled && self.metrics.port == 0 {
            anyhow::bail!("metrics.port must be > 0 when metrics are enabled");
        }
        Ok(())
    }
}

// Default value functions
fn default_namespace() -> String {
    "default".to_string()
}

fn default_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_min_replicas() -> usize {
    2
}

fn default_pod_ready_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_ready_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_metrics_port() -> u16 {
    9102
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_true() -> bool {
    true
}
