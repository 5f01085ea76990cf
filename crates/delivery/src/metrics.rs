//! Delivery counters for the run summary

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every caller of one `DeliveryClient`
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
    /// HTTP attempts issued
    attempts: AtomicU64,
    /// Attempts answered with a non-200 status
    rejected: AtomicU64,
    /// Attempts that failed at the transport level
    unreachable: AtomicU64,
    /// Records delivered
    delivered: AtomicU64,
    /// Records that exhausted their attempts
    failed: AtomicU64,
}

impl DeliveryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn inc_attempts(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn inc_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unreachable(&self) -> u64 {
        self.unreachable.load(Ordering::Relaxed)
    }

    pub fn inc_unreachable(&self) {
        self.unreachable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn inc_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DeliverySnapshot {
        DeliverySnapshot {
            attempts: self.attempts(),
            rejected: self.rejected(),
            unreachable: self.unreachable(),
            delivered: self.delivered(),
            failed: self.failed(),
        }
    }
}

/// Point-in-time copy of `DeliveryMetrics`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliverySnapshot {
    pub attempts: u64,
    pub rejected: u64,
    pub unreachable: u64,
    pub delivered: u64,
    pub failed: u64,
}
