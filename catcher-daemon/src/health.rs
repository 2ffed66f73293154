//! Aggregated health check reporting.
//!
//! The orchestrator periodically polls each component's health and
//! produces a unified [`DaemonHealth`] report. The overall daemon status
//! is the worst status among all enabled components.
//!
//! # Aggregation Rule
//!
//! - All Healthy -> Healthy
//! - Any Degraded, none Unhealthy -> Degraded(reason)
//! - Any Unhealthy -> Unhealthy(reason)

use catcher_broker::SubscriptionInfo;
use catcher_core::pipeline::HealthStatus;

/// Aggregated health report for the entire daemon.
#[derive(Debug, Clone)]
pub struct DaemonHealth {
    /// Overall daemon health status (worst of all components).
    pub status: HealthStatus,
    /// Daemon uptime in seconds since start.
    pub uptime_secs: u64,
    /// Per-component health reports.
    pub modules: Vec<ModuleHealth>,
    /// Active broker subscriptions at the time of the check.
    pub subscriptions: Vec<SubscriptionInfo>,
}

/// Health status for a single component.
#[derive(Debug, Clone)]
pub struct ModuleHealth {
    /// Component name (e.g., "log-pipeline", "broker").
    pub name: String,
    /// Whether the component is enabled in configuration.
    pub enabled: bool,
    /// Current health status of the component.
    pub status: HealthStatus,
}

/// Fold component statuses into the daemon status.
///
/// The worst severity wins (Unhealthy > Degraded > Healthy), and the reason
/// names every enabled component at that severity.
pub fn aggregate_status(modules: &[ModuleHealth]) -> HealthStatus {
    let enabled: Vec<&ModuleHealth> = modules.iter().filter(|m| m.enabled).collect();
    let worst = enabled
        .iter()
        .map(|m| severity(&m.status))
        .max()
        .unwrap_or(0);

    let reasons = || {
        enabled
            .iter()
            .filter(|m| severity(&m.status) == worst)
            .filter_map(|m| match &m.status {
                HealthStatus::Healthy => None,
                HealthStatus::Degraded(r) | HealthStatus::Unhealthy(r) => {
                    Some(format!("{}: {}", m.name, r))
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    };

    match worst {
        0 => HealthStatus::Healthy,
        1 => HealthStatus::Degraded(reasons()),
        _ => HealthStatus::Unhealthy(reasons()),
    }
}

fn severity(status: &HealthStatus) -> u8 {
    match status {
        HealthStatus::Healthy => 0,
        HealthStatus::Degraded(_) => 1,
        HealthStatus::Unhealthy(_) => 2,
    }
}
