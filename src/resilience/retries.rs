//! Connect retry bookkeeping.
//!
//! A failed backend connect is retried by selecting again, never by
//! reconnecting to the same backend. Backends that already failed for this
//! client are excluded from the retry's candidate set.

use crate::load_balancer::BackendRef;

/// Per-connection retry budget and the backends already tried.
#[derive(Debug)]
pub struct ConnectAttempts {
    retries_left: u32,
    failed: Vec<usize>,
}

impl ConnectAttempts {
    pub fn new(max_retries: u32) -> Self {
        Self {
            retries_left: max_retries,
            failed: Vec::new(),
        }
    }

    /// Remember a failed backend. Returns whether another attempt is allowed.
    pub fn record_failure(&mut self, backend: &BackendRef) -> bool {
        if !self.failed.contains(&backend.index()) {
            self.failed.push(backend.index());
        }
        if self.retries_left == 0 {
            return false;
        }
        self.retries_left -= 1;
        true
    }

    pub fn has_failed(&self, backend: &BackendRef) -> bool {
        self.failed.contains(&backend.index())
    }

    pub fn failures(&self) -> usize {
        self.failed.len()
    }

    /// Narrow `candidates` to backends not yet tried, keeping load order.
    pub fn exclude_failed(&self, candidates: &[BackendRef]) -> Vec<BackendRef> {
        candidates
            .iter()
            .filter(|b| !self.has_failed(b))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendDescriptor;
    use crate::load_balancer::Backend;
    use std::sync::Arc;

    fn backends(n: usize) -> Vec<BackendRef> {
        (0..n)
            .map(|i| BackendDescriptor::new("127.0.0.1", 9000 + i as u16))
            .enumerate()
            .map(|(i, descriptor)| Arc::new(Backend::new(i, descriptor)))
            .collect()
    }

    #[test]
    fn budget_is_bounded() {
        let all = backends(3);
        let mut attempts = ConnectAttempts::new(1);
        assert!(attempts.record_failure(&all[0]));
        assert!(!attempts.record_failure(&all[1]));
        assert_eq!(attempts.failures(), 2);
    }

    #[test]
    fn zero_retries_never_retries() {
        let all = backends(2);
        let mut attempts = ConnectAttempts::new(0);
        assert!(!attempts.record_failure(&all[0]));
    }

    #[test]
    fn excludes_failed_in_load_order() {
        let all = backends(4);
        let mut attempts = ConnectAttempts::new(3);
        attempts.record_failure(&all[2]);
        attempts.record_failure(&all[0]);

        let rest = attempts.exclude_failed(&all);
        let indexes: Vec<usize> = rest.iter().map(|b| b.index()).collect();
        assert_eq!(indexes, vec![1, 3]);
    }
}
