//! Health tracking for the feed and the stream.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Pipeline components whose health is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// Upstream event feed
    Source,
    /// Downstream Kinesis stream
    Stream,
}

impl Component {
    /// All tracked components.
    pub const ALL: [Component; 2] = [Component::Source, Component::Stream];

    /// Name used in health responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Source => "source",
            Component::Stream => "stream",
        }
    }
}

/// Health status of a component.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentStatus {
    /// Last interaction succeeded
    Healthy,
    /// Operational but impaired (e.g. throttled)
    Degraded(String),
    /// Last interaction failed
    Unhealthy(String),
    /// Not exercised yet
    Unknown,
}

/// Overall system health status.
#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Health state shared between the poll loop and the HTTP server.
///
/// A failed cycle marks its component unhealthy, but the loop keeps running;
/// the next successful cycle restores it.
pub struct HealthCheck {
    components: RwLock<HashMap<Component, ComponentStatus>>,
    polling: RwLock<bool>,
    last_cycle_at: RwLock<Option<DateTime<Utc>>>,
}

impl HealthCheck {
    /// Create a health registry with every component `Unknown`.
    pub fn new() -> Self {
        let components = Component::ALL
            .iter()
            .map(|c| (*c, ComponentStatus::Unknown))
            .collect();
        Self {
            components: RwLock::new(components),
            polling: RwLock::new(false),
            last_cycle_at: RwLock::new(None),
        }
    }

    pub fn mark_healthy(&self, component: Component) {
        self.components
            .write()
            .insert(component, ComponentStatus::Healthy);
    }

    pub fn mark_degraded(&self, component: Component, reason: &str) {
        self.components
            .write()
            .insert(component, ComponentStatus::Degraded(reason.to_string()));
    }

    pub fn mark_unhealthy(&self, component: Component, reason: &str) {
        self.components
            .write()
            .insert(component, ComponentStatus::Unhealthy(reason.to_string()));
    }

    /// Status of one component.
    pub fn status_of(&self, component: Component) -> ComponentStatus {
        self.components
            .read()
            .get(&component)
            .cloned()
            .unwrap_or(ComponentStatus::Unknown)
    }

    /// Snapshot of all component statuses keyed by name.
    pub fn get_all_statuses(&self) -> HashMap<&'static str, ComponentStatus> {
        self.components
            .read()
            .iter()
            .map(|(c, s)| (c.as_str(), s.clone()))
            .collect()
    }

    /// Worst status across components. `Unknown` counts as healthy.
    pub fn overall_status(&self) -> HealthStatus {
        let components = self.components.read();

        let mut has_degraded = false;
        for status in components.values() {
            match status {
                ComponentStatus::Unhealthy(_) => return HealthStatus::Unhealthy,
                ComponentStatus::Degraded(_) => has_degraded = true,
                _ => {}
            }
        }

        if has_degraded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    /// Ready to serve: the loop is polling and the stream is not failing.
    pub fn is_ready(&self) -> bool {
        self.is_polling()
            && !matches!(
                self.status_of(Component::Stream),
                ComponentStatus::Unhealthy(_)
            )
    }

    pub fn polling_started(&self) {
        *self.polling.write() = true;
    }

    pub fn polling_stopped(&self) {
        *self.polling.write() = false;
    }

    pub fn is_polling(&self) -> bool {
        *self.polling.read()
    }

    /// Record the end of a poll cycle, successful or not.
    pub fn record_cycle(&self, at: DateTime<Utc>) {
        *self.last_cycle_at.write() = Some(at);
    }

    pub fn last_cycle_at(&self) -> Option<DateTime<Utc>> {
        *self.last_cycle_at.read()
    }
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self::new()
    }
}
