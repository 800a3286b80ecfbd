//! Configuration types for Flowgate
//!
//! Uses the `config` crate for layered configuration from files and environment.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the entire gateway process
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FlowgateConfig {
    /// Integration gateway configuration
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// Message orchestrator configuration
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,

    /// Monitoring configuration
    #[serde(default)]
    pub monitor: MonitorSettings,

    /// Admin API configuration
    #[serde(default)]
    pub admin: AdminApiConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================================================
// Gateway Configuration
// ============================================================================

/// Integration gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Audit log capacity (oldest evicted past this)
    #[serde(default = "default_audit_capacity")]
    pub audit_capacity: usize,

    /// Maximum entries returned by a log query
    #[serde(default = "default_log_query_limit")]
    pub log_query_limit: usize,
}

fn default_audit_capacity() -> usize {
    10_000
}

fn default_log_query_limit() -> usize {
    1_000
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            audit_capacity: default_audit_capacity(),
            log_query_limit: default_log_query_limit(),
        }
    }
}

// ============================================================================
// Orchestrator Configuration
// ============================================================================

/// Message orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    /// Drain loop tick interval
    #[serde(with = "humantime_serde", default = "default_drain_interval")]
    pub drain_interval: Duration,

    /// Messages popped per queue per tick
    #[serde(default = "default_drain_batch")]
    pub drain_batch: usize,

    /// Worker pool size (in-flight processing cap)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Default retry budget for messages that do not set one
    #[serde(default = "default_max_retries")]
    pub default_max_retries: u32,

    /// Retry/backoff policy
    #[serde(default)]
    pub retry: RetrySettings,

    /// Simulated processing behavior
    #[serde(default)]
    pub simulation: SimulationSettings,

    /// Pending depth above which a queue reports unhealthy
    #[serde(default = "default_healthy_pending_limit")]
    pub healthy_pending_limit: usize,

    /// Dead-letter count above which a queue reports unhealthy
    #[serde(default = "default_healthy_dead_letter_limit")]
    pub healthy_dead_letter_limit: usize,
}

fn default_drain_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_drain_batch() -> usize {
    10
}

fn default_workers() -> usize {
    8
}

fn default_max_retries() -> u32 {
    3
}

fn default_healthy_pending_limit() -> usize {
    1_000
}

fn default_healthy_dead_letter_limit() -> usize {
    100
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            drain_interval: default_drain_interval(),
            drain_batch: default_drain_batch(),
            workers: default_workers(),
            default_max_retries: default_max_retries(),
            retry: RetrySettings::default(),
            simulation: SimulationSettings::default(),
            healthy_pending_limit: default_healthy_pending_limit(),
            healthy_dead_letter_limit: default_healthy_dead_letter_limit(),
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Backoff after the first failure
    #[serde(with = "humantime_serde", default = "default_initial_backoff")]
    pub initial_backoff: Duration,

    /// Maximum backoff delay
    #[serde(with = "humantime_serde", default = "default_max_backoff")]
    pub max_backoff: Duration,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub multiplier: f64,
}

fn default_initial_backoff() -> Duration {
    Duration::from_secs(2)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
            multiplier: default_backoff_multiplier(),
        }
    }
}

/// Simulated processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Probability that processing succeeds
    #[serde(default = "default_success_rate")]
    pub success_rate: f64,

    /// Lower bound of the simulated work duration
    #[serde(with = "humantime_serde", default = "default_work_min")]
    pub work_min: Duration,

    /// Upper bound of the simulated work duration
    #[serde(with = "humantime_serde", default = "default_work_max")]
    pub work_max: Duration,
}

fn default_success_rate() -> f64 {
    0.9
}

fn default_work_min() -> Duration {
    Duration::from_millis(10)
}

fn default_work_max() -> Duration {
    Duration::from_millis(100)
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            success_rate: default_success_rate(),
            work_min: default_work_min(),
            work_max: default_work_max(),
        }
    }
}

// ============================================================================
// Monitor Configuration
// ============================================================================

/// Monitoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Event log capacity (oldest evicted past this)
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Metrics gauge refresh interval
    #[serde(with = "humantime_serde", default = "default_metrics_interval")]
    pub metrics_interval: Duration,

    /// Alert expiry sweep interval
    #[serde(with = "humantime_serde", default = "default_sweep_interval")]
    pub sweep_interval: Duration,

    /// Unresolved alerts older than this are auto-resolved
    #[serde(with = "humantime_serde", default = "default_alert_ttl")]
    pub alert_ttl: Duration,

    /// Trailing window for the health dashboard
    #[serde(with = "humantime_serde", default = "default_dashboard_window")]
    pub dashboard_window: Duration,
}

fn default_event_capacity() -> usize {
    10_000
}

fn default_metrics_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_alert_ttl() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_dashboard_window() -> Duration {
    Duration::from_secs(60 * 60)
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
            metrics_interval: default_metrics_interval(),
            sweep_interval: default_sweep_interval(),
            alert_ttl: default_alert_ttl(),
            dashboard_window: default_dashboard_window(),
        }
    }
}

// ============================================================================
// Admin API Configuration
// ============================================================================

/// Admin API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminApiConfig {
    /// Enable admin API
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Listen address
    #[serde(default = "default_admin_listen")]
    pub listen: String,
}

fn default_true() -> bool {
    true
}

fn default_admin_listen() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for AdminApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: default_admin_listen(),
        }
    }
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

// ============================================================================
// Configuration Loading
// ============================================================================

impl FlowgateConfig {
    /// Load configuration from file and environment
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default values
        builder = builder.add_source(config::Config::try_from(&Self::default())?);

        // Add config file if specified
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Add environment variables with prefix FLOWGATE_
        builder = builder.add_source(
            config::Environment::with_prefix("FLOWGATE")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = FlowgateConfig::default();
        assert_eq!(cfg.gateway.audit_capacity, 10_000);
        assert_eq!(cfg.gateway.log_query_limit, 1_000);
        assert_eq!(cfg.orchestrator.drain_interval, Duration::from_secs(5));
        assert_eq!(cfg.orchestrator.drain_batch, 10);
        assert_eq!(cfg.orchestrator.retry.initial_backoff, Duration::from_secs(2));
        assert_eq!(cfg.monitor.event_capacity, 10_000);
        assert_eq!(cfg.monitor.alert_ttl, Duration::from_secs(86_400));
        assert_eq!(cfg.observability.log_format, "json");
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let cfg = FlowgateConfig::load(None).expect("defaults should load");
        assert_eq!(cfg.orchestrator.workers, 8);
        assert!(cfg.admin.enabled);
    }
}
