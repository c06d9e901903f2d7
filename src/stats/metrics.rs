//! Statistics for chat connections and message flow

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::server::fanout::FanoutReport;

/// Live server-wide counters
///
/// Every field is an independent relaxed counter; a [`StatsSnapshot`] is
/// consistent per field only.
#[derive(Debug)]
pub struct ChatStats {
    started_at: Instant,
    connections_total: AtomicU64,
    connections_active: AtomicU64,
    auth_failures: AtomicU64,
    requests: AtomicU64,
    invalid_requests: AtomicU64,
    messages_sent: AtomicU64,
    deliveries: AtomicU64,
    notifications: AtomicU64,
    backpressure_rejections: AtomicU64,
}

/// Point-in-time copy of [`ChatStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Connections that completed authorization
    pub connections_total: u64,
    /// Connections currently registered
    pub connections_active: u64,
    /// Handshakes rejected or timed out
    pub auth_failures: u64,
    /// Requests read from connections, invalid ones included
    pub requests: u64,
    /// Requests answered with a validation error
    pub invalid_requests: u64,
    /// Messages persisted by workers
    pub messages_sent: u64,
    /// NewMessage responses queued on live connections
    pub deliveries: u64,
    /// Notifier calls for offline conversants
    pub notifications: u64,
    /// Sends refused because the worker queue stayed full
    pub backpressure_rejections: u64,
    /// Time since the stats were created
    pub uptime: Duration,
}

impl ChatStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            connections_total: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            auth_failures: AtomicU64::new(0),
            requests: AtomicU64::new(0),
            invalid_requests: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            notifications: AtomicU64::new(0),
            backpressure_rejections: AtomicU64::new(0),
        }
    }

    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        // saturating: never wrap below zero
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn auth_failed(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_received(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_invalid(&self) {
        self.invalid_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn backpressure(&self) {
        self.backpressure_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one persisted and fanned-out message
    pub fn message_sent(&self, report: &FanoutReport) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.deliveries
            .fetch_add(report.deliveries as u64, Ordering::Relaxed);
        self.notifications
            .fetch_add(report.notified as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
            invalid_requests: self.invalid_requests.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
            backpressure_rejections: self.backpressure_rejections.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for ChatStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_counters() {
        let stats = ChatStats::new();
        stats.connection_opened();
        stats.connection_opened();
        stats.connection_closed();

        let snap = stats.snapshot();
        assert_eq!(snap.connections_total, 2);
        assert_eq!(snap.connections_active, 1);
    }

    #[test]
    fn test_closed_never_underflows() {
        let stats = ChatStats::new();
        stats.connection_closed();
        assert_eq!(stats.snapshot().connections_active, 0);
    }

    #[test]
    fn test_message_sent_adds_report() {
        let stats = ChatStats::new();
        stats.message_sent(&FanoutReport {
            local_recipients: 2,
            deliveries: 3,
            notified: 1,
        });
        stats.message_sent(&FanoutReport {
            local_recipients: 0,
            deliveries: 0,
            notified: 2,
        });

        let snap = stats.snapshot();
        assert_eq!(snap.messages_sent, 2);
        assert_eq!(snap.deliveries, 3);
        assert_eq!(snap.notifications, 3);
    }

    #[test]
    fn test_snapshot_default_is_zeroed() {
        let snap = StatsSnapshot::default();
        assert_eq!(snap.requests, 0);
        assert_eq!(snap.uptime, Duration::ZERO);
    }
}
