//! CLI argument parsing for podspread

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// podspread - evicts co-located replicas so the scheduler spreads workloads across nodes
#[derive(Debug, Parser)]
#[command(name = "podspread")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/podspread/config.yaml")]
    pub config: PathBuf,

    /// Path to a kubeconfig file (defaults to in-cluster or ~/.kube/config)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Target namespace (overrides config)
    #[arg(short, long, env = "PODSPREAD_NAMESPACE")]
    pub namespace: Option<String>,

    /// Minimum running and ready replicas before a group is touched
    #[arg(long)]
    pub min_replicas: Option<usize>,

    /// Housekeeping interval, e.g. 10s or 1m (overrides config)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// How long to wait for a replacement pod to become ready (overrides config)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub pod_ready_timeout: Option<Duration>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "PODSPREAD_LOG_LEVEL")]
    pub log_level: String,

    /// Output logs in JSON format
    #[arg(long, default_value = "false", env = "PODSPREAD_LOG_JSON")]
    pub log_json: bool,

    /// Dry run mode - log decisions but don't evict
    #[arg(long, default_value = "false")]
    pub dry_run: bool,

    /// Run a single housekeeping tick, wait for its evictions to settle, and exit
    #[arg(long)]
    pub once: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["podspread"]).unwrap();
        assert_eq!(cli.config.to_str().unwrap(), "/etc/podspread/config.yaml");
        assert_eq!(cli.log_level, "info");
        assert!(cli.kubeconfig.is_none());
        assert!(cli.min_replicas.is_none());
        assert!(cli.interval.is_none());
        assert!(!cli.log_json);
        assert!(!cli.dry_run);
        assert!(!cli.once);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "podspread",
            "-c",
            "/custom/config.yaml",
            "--kubeconfig",
            "/home/me/.kube/config",
            "--min-replicas",
            "3",
            "--interval",
            "30s",
            "--pod-ready-timeout",
            "2m",
        ])
        .unwrap();
        assert_eq!(cli.config.to_str().unwrap(), "/custom/config.yaml");
        assert_eq!(
            cli.kubeconfig.as_deref().and_then(|p| p.to_str()),
            Some("/home/me/.kube/config")
        );
        assert_eq!(cli.min_replicas, Some(3));
        assert_eq!(cli.interval, Some(Duration::from_secs(30)));
        assert_eq!(cli.pod_ready_timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_cli_rejects_bad_interval() {
        assert!(Cli::try_parse_from(["podspread", "--interval", "soon"]).is_err());
    }

    #[test]
    fn test_cli_dry_run_once() {
        let cli = Cli::try_parse_from(["podspread", "--dry-run", "--once"]).unwrap();
        assert!(cli.dry_run);
        assert!(cli.once);
    }
}
