//! Rescheduling orchestrator
//!
//! Runs housekeeping ticks. Each tick, independently per workload group:
//!
//! IDLE → CANDIDATE_FOUND → TARGET_FOUND → EVICTION_ISSUED → AWAITING_READY → RESOLVED | TIMED_OUT
//!
//! - IDLE → CANDIDATE_FOUND: a co-located replica exists and the group is
//!   above the replica floor
//! - CANDIDATE_FOUND → TARGET_FOUND: some eligible node hosts no replica
//! - TARGET_FOUND → EVICTION_ISSUED: pod registered, then deleted; a failed
//!   delete unregisters it again
//! - EVICTION_ISSUED → AWAITING_READY: a spawned task polls the pod by name
//! - AWAITING_READY → RESOLVED | TIMED_OUT: the pod is unregistered either way
//!
//! Groups with an eviction still in flight are skipped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use humantime::format_duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cluster::{ClusterApi, ClusterError};
use crate::colocation::find_movable_pod;
use crate::grouping::group_pods;
use crate::metrics::MetricsRegistry;
use crate::model::Pod;
use crate::placement::find_node_for_group;
use crate::poll::{poll_until, PollOutcome, MIN_PERIOD};
use crate::registry::PendingActionRegistry;
use crate::snapshot::ClusterSnapshot;

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Housekeeping tick period
    pub interval: Duration,
    /// Minimum running+ready replicas a group needs before one is moved
    pub min_replicas: usize,
    /// How long to wait for the replacement to become ready
    pub pod_ready_timeout: Duration,
    /// How often to check the replacement while waiting
    pub ready_poll_interval: Duration,
    /// Log decisions without registering or deleting anything
    pub dry_run: bool,
}

impl OrchestratorConfig {
    /// Raise zero periods to [`MIN_PERIOD`] so the timers never panic
    fn clamped(mut self) -> Self {
        for (name, period) in [
            ("interval", &mut self.interval),
            ("ready_poll_interval", &mut self.ready_poll_interval),
        ] {
            if *period < MIN_PERIOD {
                warn!(setting = name, minimum = ?MIN_PERIOD, "Period too short, clamping");
                *period = MIN_PERIOD;
            }
        }
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            min_replicas: 2,
            pod_ready_timeout: Duration::from_secs(300),
            ready_poll_interval: Duration::from_secs(2),
            dry_run: false,
        }
    }
}

/// Outcome of evaluating one workload group in a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupDecision {
    /// An eviction for this group is still awaiting readiness
    InFlight { group: String },
    /// No movable pod, or the group is at or below the replica floor
    NoAction { group: String },
    /// A movable pod exists but every eligible node already runs the group
    NoCandidateNode { group: String, pod: String },
    /// Dry run: the pod would have been evicted
    WouldEvict {
        group: String,
        pod: String,
        source_node: String,
        target_node: String,
    },
    /// The pod was deleted and a readiness wait started
    EvictionIssued {
        group: String,
        pod: String,
        source_node: String,
        target_node: String,
    },
    /// The delete call failed; the pod was unregistered
    EvictionFailed {
        group: String,
        pod: String,
        error: String,
    },
}

impl GroupDecision {
    /// Workload group the decision applies to
    pub fn group(&self) -> &str {
        match self {
            GroupDecision::InFlight { group }
            | GroupDecision::NoAction { group }
            | GroupDecision::NoCandidateNode { group, .. }
            | GroupDecision::WouldEvict { group, .. }
            | GroupDecision::EvictionIssued { group, .. }
            | GroupDecision::EvictionFailed { group, .. } => group,
        }
    }

    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            GroupDecision::InFlight { .. } => "in_flight",
            GroupDecision::NoAction { .. } => "no_action",
            GroupDecision::NoCandidateNode { .. } => "no_candidate_node",
            GroupDecision::WouldEvict { .. } => "would_evict",
            GroupDecision::EvictionIssued { .. } => "eviction_issued",
            GroupDecision::EvictionFailed { .. } => "eviction_failed",
        }
    }
}

/// Outcome of waiting for an evicted pod's replacement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessOutcome {
    /// Replacement observed ready
    Ready { pod: String, elapsed: Duration },
    /// Deadline passed without a ready replacement
    TimedOut { pod: String },
    /// Shutdown interrupted the wait
    Abandoned { pod: String },
}

impl ReadinessOutcome {
    pub fn pod(&self) -> &str {
        match self {
            ReadinessOutcome::Ready { pod, .. }
            | ReadinessOutcome::TimedOut { pod }
            | ReadinessOutcome::Abandoned { pod } => pod,
        }
    }

    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            ReadinessOutcome::Ready { .. } => "ready",
            ReadinessOutcome::TimedOut { .. } => "timed_out",
            ReadinessOutcome::Abandoned { .. } => "abandoned",
        }
    }
}

/// Result of one housekeeping tick
pub struct TickReport {
    /// Pods on eligible nodes
    pub pods_evaluated: usize,
    /// Workload groups found
    pub groups: usize,
    /// One decision per workload group
    pub decisions: Vec<GroupDecision>,
    /// Readiness waits started by this tick; dropping detaches them
    pub waits: Vec<JoinHandle<ReadinessOutcome>>,
}

impl TickReport {
    /// Decisions that deleted a pod
    pub fn evictions(&self) -> impl Iterator<Item = &GroupDecision> {
        self.decisions
            .iter()
            .filter(|d| matches!(d, GroupDecision::EvictionIssued { .. }))
    }

    /// Wait for every readiness wait started by this tick
    pub async fn wait_all(self) -> Vec<ReadinessOutcome> {
        join_all(self.waits)
            .await
            .into_iter()
            .filter_map(|r| r.ok())
            .collect()
    }
}

/// Rescheduling orchestrator
pub struct ReschedulingOrchestrator<C: ClusterApi> {
    cluster: Arc<C>,
    registry: Arc<PendingActionRegistry>,
    metrics: Arc<MetricsRegistry>,
    config: OrchestratorConfig,
    shutdown: watch::Receiver<bool>,
}

impl<C: ClusterApi + 'static> ReschedulingOrchestrator<C> {
    /// Create a new orchestrator
    pub fn new(
        cluster: Arc<C>,
        registry: Arc<PendingActionRegistry>,
        metrics: Arc<MetricsRegistry>,
        config: OrchestratorConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            cluster,
            registry,
            metrics,
            config: config.clamped(),
            shutdown,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run housekeeping ticks until shutdown
    pub async fn run(&self) {
        info!(
            interval = %format_duration(self.config.interval),
            min_replicas = self.config.min_replicas,
            pod_ready_timeout = %format_duration(self.config.pod_ready_timeout),
            dry_run = self.config.dry_run,
            "Starting rescheduling orchestrator"
        );

        let mut shutdown = self.shutdown.clone();
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Waits are detached; they release the registry themselves.
                    let _ = self.run_tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown signal received, stopping orchestrator");
                        break;
                    }
                }
            }
        }
    }

    /// Run one tick, logging and recording metrics
    pub async fn run_tick(&self) -> Option<TickReport> {
        let start = Instant::now();
        match self.tick().await {
            Ok(report) => {
                self.metrics
                    .observe_tick(true, start.elapsed().as_secs_f64());
                debug!(
                    pods = report.pods_evaluated,
                    groups = report.groups,
                    evictions = report.evictions().count(),
                    duration = ?start.elapsed(),
                    "Housekeeping tick complete"
                );
                Some(report)
            }
            Err(e) => {
                self.metrics
                    .observe_tick(false, start.elapsed().as_secs_f64());
                error!(error = %e, "Housekeeping tick failed, retrying next tick");
                None
            }
        }
    }

    /// Evaluate every workload group once.
    ///
    /// Fails only when the snapshot cannot be built; per-group failures are
    /// reported as decisions.
    pub async fn tick(&self) -> Result<TickReport, ClusterError> {
        let snapshot = ClusterSnapshot::acquire(self.cluster.as_ref()).await?;

        for pod in snapshot.all_pods() {
            info!(
                pod = %pod.name,
                phase = %pod.phase,
                ip = pod.pod_ip.as_deref().unwrap_or(""),
                node = pod.node().unwrap_or(""),
                "Evaluated pod"
            );
        }

        let groups = group_pods(snapshot.all_pods());
        let mut keys: Vec<&String> = groups.keys().collect();
        keys.sort();

        let mut decisions = Vec::with_capacity(groups.len());
        let mut waits = Vec::new();
        for key in keys {
            let (decision, wait) = self.evaluate_group(&snapshot, key, &groups[key]).await;
            self.metrics.inc_decision(decision.label());
            decisions.push(decision);
            waits.extend(wait);
        }

        self.metrics.set_workload_groups(groups.len() as i64);
        self.metrics.set_pending_actions(self.registry.len() as i64);

        Ok(TickReport {
            pods_evaluated: snapshot.all_pods().len(),
            groups: groups.len(),
            decisions,
            waits,
        })
    }

    async fn evaluate_group(
        &self,
        snapshot: &ClusterSnapshot,
        group: &str,
        pods: &[Pod],
    ) -> (GroupDecision, Option<JoinHandle<ReadinessOutcome>>) {
        let group_name = group.to_string();

        if pods.iter().any(|p| self.registry.group_in_flight(p)) {
            info!(group = group, "Group already in flight");
            return (GroupDecision::InFlight { group: group_name }, None);
        }

        let Some(pod) = find_movable_pod(pods, self.config.min_replicas) else {
            info!(group = group, "No action");
            return (GroupDecision::NoAction { group: group_name }, None);
        };

        let Some(target) = find_node_for_group(snapshot, group) else {
            info!(group = group, pod = %pod.name, "No candidate node");
            return (
                GroupDecision::NoCandidateNode {
                    group: group_name,
                    pod: pod.name.clone(),
                },
                None,
            );
        };

        let source_node = pod.node().unwrap_or_default().to_string();
        let target_node = target.name.clone();

        if self.config.dry_run {
            info!(
                group = group,
                pod = %pod.name,
                source = %source_node,
                target = %target_node,
                "[DRY-RUN] Would evict pod"
            );
            return (
                GroupDecision::WouldEvict {
                    group: group_name,
                    pod: pod.name.clone(),
                    source_node,
                    target_node,
                },
                None,
            );
        }

        if !self.registry.add(pod) {
            info!(group = group, pod = %pod.name, "Group already in flight");
            return (GroupDecision::InFlight { group: group_name }, None);
        }

        if let Err(e) = self.cluster.delete_pod(&pod.name).await {
            self.registry.remove(pod);
            warn!(group = group, pod = %pod.name, error = %e, "Eviction failed");
            return (
                GroupDecision::EvictionFailed {
                    group: group_name,
                    pod: pod.name.clone(),
                    error: e.to_string(),
                },
                None,
            );
        }

        info!(
            group = group,
            pod = %pod.name,
            source = %source_node,
            target = %target_node,
            "Eviction issued"
        );

        let wait = self.spawn_readiness_wait(pod.clone());
        (
            GroupDecision::EvictionIssued {
                group: group_name,
                pod: pod.name.clone(),
                source_node,
                target_node,
            },
            Some(wait),
        )
    }

    /// Poll for the evicted pod's replacement and release the registry entry
    fn spawn_readiness_wait(&self, evicted: Pod) -> JoinHandle<ReadinessOutcome> {
        let cluster = self.cluster.clone();
        let registry = self.registry.clone();
        let metrics = self.metrics.clone();
        let mut shutdown = self.shutdown.clone();
        let every = self.config.ready_poll_interval;
        let timeout = self.config.pod_ready_timeout;

        tokio::spawn(async move {
            let polled = poll_until(every, timeout, &mut shutdown, || {
                let cluster = cluster.clone();
                let evicted = evicted.clone();
                async move { replacement_ready(cluster.as_ref(), &evicted).await }
            })
            .await;

            registry.remove(&evicted);
            metrics.set_pending_actions(registry.len() as i64);

            let pod = evicted.name.clone();
            let outcome = match polled {
                PollOutcome::Satisfied(elapsed) => {
                    info!(
                        pod = %pod,
                        elapsed = %format_duration(elapsed),
                        "Ready after eviction"
                    );
                    ReadinessOutcome::Ready { pod, elapsed }
                }
                PollOutcome::TimedOut => {
                    warn!(
                        pod = %pod,
                        timeout = %format_duration(timeout),
                        "Timeout waiting for readiness"
                    );
                    ReadinessOutcome::TimedOut { pod }
                }
                PollOutcome::Cancelled => {
                    debug!(pod = %pod, "Readiness wait abandoned on shutdown");
                    ReadinessOutcome::Abandoned { pod }
                }
            };
            metrics.inc_readiness_outcome(outcome.label());
            outcome
        })
    }
}

/// Whether a ready replacement for `evicted` exists. Lookup failures and a
/// missing pod are expected while the controller recreates it.
async fn replacement_ready<C: ClusterApi + ?Sized>(cluster: &C, evicted: &Pod) -> bool {
    match cluster.get_pod(&evicted.name).await {
        Ok(Some(pod)) => pod.is_replacement_of(evicted) && pod.is_running_and_ready(),
        Ok(None) => {
            debug!(pod = %evicted.name, "Replacement not found yet");
            false
        }
        Err(e) => {
            debug!(pod = %evicted.name, error = %e, "Failed to fetch pod while awaiting readiness");
            false
        }
    }
}
