//! Simulation metrics.

use std::collections::VecDeque;

/// Simulation metrics.
#[derive(Debug, Clone)]
pub struct SimulationMetrics {
    /// Total withdrawals attempted.
    pub total_withdrawals: u64,
    /// Successful withdrawals.
    pub successful_withdrawals: u64,
    /// Failed withdrawals.
    pub failed_withdrawals: u64,
    /// Cash handed out by successful withdrawals.
    pub cash_dispensed: u64,
    /// Latency samples (ms).
    latency_samples: VecDeque<u64>,
    /// Maximum samples to keep.
    max_samples: usize,
}

impl SimulationMetrics {
    /// Create new metrics.
    pub fn new() -> Self {
        Self {
            total_withdrawals: 0,
            successful_withdrawals: 0,
            failed_withdrawals: 0,
            cash_dispensed: 0,
            latency_samples: VecDeque::with_capacity(10000),
            max_samples: 10000,
        }
    }

    /// Record a successful withdrawal.
    pub fn record_success(&mut self, amount: u64, latency_ms: u64) {
        self.total_withdrawals += 1;
        self.successful_withdrawals += 1;
        self.cash_dispensed += amount;
        self.record_latency(latency_ms);
    }

    /// Record a failed withdrawal.
    pub fn record_failure(&mut self, latency_ms: u64) {
        self.total_withdrawals += 1;
        self.failed_withdrawals += 1;
        self.record_latency(latency_ms);
    }

    /// Get average latency in ms.
    pub fn average_latency_ms(&self) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }

        let sum: u64 = self.latency_samples.iter().sum();
        sum / self.latency_samples.len() as u64
    }

    /// Get p50 latency.
    pub fn p50_latency_ms(&self) -> u64 {
        self.percentile_latency(50)
    }

    /// Get p99 latency.
    pub fn p99_latency_ms(&self) -> u64 {
        self.percentile_latency(99)
    }

    /// Get success rate.
    pub fn success_rate(&self) -> f64 {
        if self.total_withdrawals == 0 {
            return 0.0;
        }

        self.successful_withdrawals as f64 / self.total_withdrawals as f64
    }

    // --- Private methods ---

    fn record_latency(&mut self, latency_ms: u64) {
        if self.latency_samples.len() >= self.max_samples {
            self.latency_samples.pop_front();
        }
        self.latency_samples.push_back(latency_ms);
    }

    fn percentile_latency(&self, percentile: usize) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }

        let mut sorted: Vec<_> = self.latency_samples.iter().copied().collect();
        sorted.sort_unstable();

        let idx = (sorted.len() * percentile / 100).min(sorted.len() - 1);
        sorted[idx]
    }
}

impl Default for SimulationMetrics {
    fn default() -> Self {
        Self::new()
    }
}
