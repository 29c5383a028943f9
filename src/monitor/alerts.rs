// src/monitor/alerts.rs
// Performance alerts with TTL-bounded lifetime and a capped history.
// Expired alerts are pruned lazily whenever the store is read or written.

use std::collections::VecDeque;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CONFIG;
use crate::monitor::BottleneckSeverity;

/// What tripped the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    SlowResponse,
    SlowGeneration,
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AlertType::SlowResponse => "slow_response",
            AlertType::SlowGeneration => "slow_generation",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceAlert {
    pub id: String,
    pub alert_type: AlertType,
    pub severity: BottleneckSeverity,
    pub message: String,
    pub context_id: String,
    pub created_at: DateTime<Utc>,
    pub active: bool,
    pub ttl_seconds: i64,
}

impl PerformanceAlert {
    pub fn new(
        alert_type: AlertType,
        severity: BottleneckSeverity,
        message: impl Into<String>,
        context_id: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            alert_type,
            severity,
            message: message.into(),
            context_id: context_id.into(),
            created_at: Utc::now(),
            active: true,
            ttl_seconds: CONFIG.alert_ttl_seconds,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.created_at + Duration::seconds(self.ttl_seconds)
    }
}

/// Bounded, thread-safe alert store. Holds at most `cap` alerts (oldest
/// dropped first) and sheds expired entries on every access.
pub struct AlertStore {
    alerts: RwLock<VecDeque<PerformanceAlert>>,
    cap: usize,
}

impl AlertStore {
    pub fn new(cap: usize) -> Self {
        Self {
            alerts: RwLock::new(VecDeque::new()),
            cap,
        }
    }

    pub fn push(&self, alert: PerformanceAlert) {
        if let Ok(mut alerts) = self.alerts.write() {
            let now = Utc::now();
            alerts.retain(|a| !a.is_expired_at(now));
            while alerts.len() >= self.cap {
                alerts.pop_front();
            }
            alerts.push_back(alert);
        }
    }

    /// Unexpired, still-active alerts, oldest first.
    pub fn active(&self) -> Vec<PerformanceAlert> {
        match self.alerts.write() {
            Ok(mut alerts) => {
                let now = Utc::now();
                alerts.retain(|a| !a.is_expired_at(now));
                alerts.iter().filter(|a| a.active).cloned().collect()
            }
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.alerts.read().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new(CONFIG.alert_history_cap)
    }
}
