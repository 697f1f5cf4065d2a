//! podspread Kubernetes Integration
//!
//! Provides the Kubernetes client and the `ClusterApi` implementation used by
//! the rescheduling orchestrator.

pub mod client;
pub mod cluster;
pub mod convert;

pub use client::K8sClient;
pub use cluster::{EvictionMode, KubeCluster};
