//! Serialization guard for long-running test operations.
//!
//! Each operation kind (WiFi credential test, broker connectivity test)
//! runs the tiny state machine Idle → Running → Idle. The flag is a
//! cooperative mutual-exclusion marker, not a queue: a request arriving
//! while Running is rejected immediately with a conflict, never delayed.

use std::sync::atomic::{AtomicBool, Ordering};

/// The operation kinds that may not overlap with themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    Wifi,
    Broker,
}

/// One in-flight flag per operation kind. Kinds are independent: a WiFi
/// test does not block a broker test.
#[derive(Debug, Default)]
pub struct TestGuard {
    wifi: AtomicBool,
    broker: AtomicBool,
}

impl TestGuard {
    fn flag(&self, kind: TestKind) -> &AtomicBool {
        match kind {
            TestKind::Wifi => &self.wifi,
            TestKind::Broker => &self.broker,
        }
    }

    /// Transition Idle → Running. `None` means an operation of this kind
    /// is already running and the caller must reject with a conflict.
    pub fn try_start(&self, kind: TestKind) -> Option<RunningTest<'_>> {
        self.flag(kind)
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
            .then(|| RunningTest {
                flag: self.flag(kind),
            })
    }

    pub fn is_running(&self, kind: TestKind) -> bool {
        self.flag(kind).load(Ordering::SeqCst)
    }
}

/// RAII token for the Running state; dropping it returns the kind to Idle,
/// on success, failure, and cancellation alike.
pub struct RunningTest<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RunningTest<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_start_is_rejected_while_running() {
        let guard = TestGuard::default();
        let running = guard.try_start(TestKind::Wifi);
        assert!(running.is_some());
        assert!(guard.try_start(TestKind::Wifi).is_none());
        assert!(guard.is_running(TestKind::Wifi));
    }

    #[test]
    fn drop_returns_to_idle() {
        let guard = TestGuard::default();
        drop(guard.try_start(TestKind::Broker));
        assert!(!guard.is_running(TestKind::Broker));
        assert!(guard.try_start(TestKind::Broker).is_some());
    }

    #[test]
    fn kinds_are_independent() {
        let guard = TestGuard::default();
        let _wifi = guard.try_start(TestKind::Wifi);
        assert!(guard.try_start(TestKind::Broker).is_some());
    }
}
