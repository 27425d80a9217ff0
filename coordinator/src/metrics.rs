//! Metrics collection for ATM monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// ATM metrics.
pub struct Metrics {
    /// Dispense requests received.
    pub dispenses_total: AtomicU64,
    /// Dispenses that handed out cash.
    pub dispenses_succeeded: AtomicU64,
    /// Dispenses refused by the ATM or the account service.
    pub dispenses_rejected: AtomicU64,
    /// Dispenses that failed because the account service was unavailable.
    pub dispenses_unavailable: AtomicU64,
    /// Dispenses dropped before an outcome was recorded.
    pub dispenses_abandoned: AtomicU64,
    /// Dispenses in progress.
    pub dispenses_active: AtomicU64,
    /// Compensating refunds performed.
    pub refunds_total: AtomicU64,
    /// Cash handed out, in whole units.
    pub cash_dispensed: AtomicU64,
    /// Balance queries.
    pub balance_queries: AtomicU64,
}

impl Metrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            dispenses_total: AtomicU64::new(0),
            dispenses_succeeded: AtomicU64::new(0),
            dispenses_rejected: AtomicU64::new(0),
            dispenses_unavailable: AtomicU64::new(0),
            dispenses_abandoned: AtomicU64::new(0),
            dispenses_active: AtomicU64::new(0),
            refunds_total: AtomicU64::new(0),
            cash_dispensed: AtomicU64::new(0),
            balance_queries: AtomicU64::new(0),
        }
    }

    /// Record a dispense starting.
    pub fn dispense_started(&self) {
        self.dispenses_total.fetch_add(1, Ordering::Relaxed);
        self.dispenses_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dispense handing out cash.
    pub fn dispense_succeeded(&self, amount: u64) {
        self.dispenses_succeeded.fetch_add(1, Ordering::Relaxed);
        self.cash_dispensed.fetch_add(amount, Ordering::Relaxed);
        self.dispenses_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a dispense refused.
    pub fn dispense_rejected(&self) {
        self.dispenses_rejected.fetch_add(1, Ordering::Relaxed);
        self.dispenses_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a dispense lost to an unavailable account service.
    pub fn dispense_unavailable(&self) {
        self.dispenses_unavailable.fetch_add(1, Ordering::Relaxed);
        self.dispenses_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a dispense cancelled before it resolved.
    pub fn dispense_abandoned(&self) {
        self.dispenses_abandoned.fetch_add(1, Ordering::Relaxed);
        self.dispenses_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a compensating refund.
    pub fn refund_performed(&self) {
        self.refunds_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a balance query.
    pub fn balance_queried(&self) {
        self.balance_queries.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            dispenses_total: self.dispenses_total.load(Ordering::Relaxed),
            dispenses_succeeded: self.dispenses_succeeded.load(Ordering::Relaxed),
            dispenses_rejected: self.dispenses_rejected.load(Ordering::Relaxed),
            dispenses_unavailable: self.dispenses_unavailable.load(Ordering::Relaxed),
            dispenses_abandoned: self.dispenses_abandoned.load(Ordering::Relaxed),
            dispenses_active: self.dispenses_active.load(Ordering::Relaxed),
            refunds_total: self.refunds_total.load(Ordering::Relaxed),
            cash_dispensed: self.cash_dispensed.load(Ordering::Relaxed),
            balance_queries: self.balance_queries.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            r#"# HELP cashpoint_dispenses_total Total number of dispense requests
# TYPE cashpoint_dispenses_total counter
cashpoint_dispenses_total {}

# HELP cashpoint_dispenses_succeeded Total dispenses that handed out cash
# TYPE cashpoint_dispenses_succeeded counter
cashpoint_dispenses_succeeded {}

# HELP cashpoint_dispenses_rejected Total dispenses rejected
# TYPE cashpoint_dispenses_rejected counter
cashpoint_dispenses_rejected {}

# HELP cashpoint_dispenses_unavailable Total dispenses failed by an unavailable account service
# TYPE cashpoint_dispenses_unavailable counter
cashpoint_dispenses_unavailable {}

# HELP cashpoint_dispenses_abandoned Total dispenses cancelled before resolving
# TYPE cashpoint_dispenses_abandoned counter
cashpoint_dispenses_abandoned {}

# HELP cashpoint_dispenses_active Current dispenses in progress
# TYPE cashpoint_dispenses_active gauge
cashpoint_dispenses_active {}

# HELP cashpoint_refunds_total Total compensating refunds
# TYPE cashpoint_refunds_total counter
cashpoint_refunds_total {}

# HELP cashpoint_cash_dispensed Total cash handed out
# TYPE cashpoint_cash_dispensed counter
cashpoint_cash_dispensed {}

# HELP cashpoint_balance_queries Total balance queries
# TYPE cashpoint_balance_queries counter
cashpoint_balance_queries {}
"#,
            snapshot.dispenses_total,
            snapshot.dispenses_succeeded,
            snapshot.dispenses_rejected,
            snapshot.dispenses_unavailable,
            snapshot.dispenses_abandoned,
            snapshot.dispenses_active,
            snapshot.refunds_total,
            snapshot.cash_dispensed,
            snapshot.balance_queries,
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub dispenses_total: u64,
    pub dispenses_succeeded: u64,
    pub dispenses_rejected: u64,
    pub dispenses_unavailable: u64,
    pub dispenses_abandoned: u64,
    pub dispenses_active: u64,
    pub refunds_total: u64,
    pub cash_dispensed: u64,
    pub balance_queries: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<Metrics>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_increment() {
        let metrics = Metrics::new();

        metrics.dispense_started();
        metrics.dispense_started();
        metrics.dispense_succeeded(500);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.dispenses_total, 2);
        assert_eq!(snapshot.dispenses_succeeded, 1);
        assert_eq!(snapshot.dispenses_active, 1);
        assert_eq!(snapshot.cash_dispensed, 500);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();
        metrics.dispense_started();
        metrics.refund_performed();

        metrics.dispense_abandoned();

        let output = metrics.to_prometheus();
        assert!(output.contains("cashpoint_dispenses_total 1"));
        assert!(output.contains("cashpoint_refunds_total 1"));
        assert!(output.contains("cashpoint_dispenses_abandoned 1"));
        assert!(output.contains("cashpoint_dispenses_active 0"));
    }
}
