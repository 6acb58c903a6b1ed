//! In-memory session store with idle-timeout expiry.

use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Session token length in hex characters (16 random bytes, hex-encoded).
pub const TOKEN_LEN: usize = 32;

const TOKEN_BYTES: usize = TOKEN_LEN / 2;

/// Default idle timeout: 4 hours, matching the device firmware.
pub const DEFAULT_TIMEOUT_SECS: u64 = 4 * 3600;

/// Default sweep cadence: 5 minutes.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Time source for expiry decisions. Injectable so tests control the clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock implementation used outside tests.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone)]
struct Session {
    owner: IpAddr,
    last_activity: Instant,
    active: bool,
}

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<String, Session>,
    total_created: u64,
}

/// Read-only counters for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub active: usize,
    pub total_created: u64,
}

/// Owns the session table. All mutation goes through these methods; nothing
/// else reaches into the map.
pub struct SessionStore {
    inner: Mutex<Inner>,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(timeout: Duration) -> Self {
        Self::with_clock(timeout, Arc::new(SystemClock))
    }

    pub fn with_clock(timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            timeout,
            clock,
        }
    }

    /// Idle timeout, also used for the cookie's `Max-Age`.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Create a session for `owner` and return its token.
    ///
    /// Collisions across 128 bits of CSPRNG output are treated as
    /// negligible and not re-checked.
    pub fn create(&self, owner: IpAddr) -> String {
        let token = generate_token();
        let mut inner = self.inner.lock();
        inner.sessions.insert(
            token.clone(),
            Session {
                owner,
                last_activity: self.clock.now(),
                active: true,
            },
        );
        inner.total_created += 1;
        tracing::debug!(%owner, total = inner.total_created, "session created");
        token
    }

    /// Check whether `token` names a live session.
    ///
    /// Wrong-length tokens are rejected before any lookup. Expired entries
    /// are removed on the spot, so a second validate also fails. An owner
    /// address differing from the one recorded at creation is logged but
    /// not rejected — client identity is unreliable behind proxies.
    pub fn validate(&self, token: &str, owner: IpAddr) -> bool {
        if token.len() != TOKEN_LEN {
            return false;
        }

        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let expired = match inner.sessions.get_mut(token) {
            None => return false,
            Some(session) if !session.active => true,
            Some(session) => {
                if now.duration_since(session.last_activity) > self.timeout {
                    session.active = false;
                    true
                } else {
                    if session.owner != owner {
                        tracing::warn!(
                            recorded = %session.owner,
                            seen = %owner,
                            "session presented from a different address"
                        );
                    }
                    false
                }
            }
        };

        if expired {
            inner.sessions.remove(token);
            tracing::debug!("session expired and removed");
            return false;
        }
        true
    }

    /// Advance `last_activity` to now. No-op for unknown or inactive tokens.
    pub fn refresh(&self, token: &str) {
        if token.len() != TOKEN_LEN {
            return;
        }
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        if let Some(session) = inner.sessions.get_mut(token) {
            if session.active {
                session.last_activity = now;
            }
        }
    }

    /// Remove every expired session. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let timeout = self.timeout;
        let mut inner = self.inner.lock();
        let before = inner.sessions.len();
        inner
            .sessions
            .retain(|_, session| {
                session.active && now.duration_since(session.last_activity) <= timeout
            });
        before - inner.sessions.len()
    }

    pub fn stats(&self) -> SessionStats {
        let inner = self.inner.lock();
        SessionStats {
            active: inner.sessions.values().filter(|s| s.active).count(),
            total_created: inner.total_created,
        }
    }
}

/// Handle to the background expiry sweeper. Aborts the task when dropped.
pub struct Sweeper {
    handle: tokio::task::JoinHandle<()>,
}

impl Sweeper {
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Start the periodic sweep, independent of request traffic.
pub fn spawn_sweeper(store: Arc<SessionStore>, interval: Duration) -> Sweeper {
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so the initial sweep
        // happens one full interval after startup.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = store.sweep();
            if removed > 0 {
                tracing::debug!(removed, "swept expired sessions");
            }
        }
    });
    Sweeper { handle }
}

/// Generate a session token: 16 CSPRNG bytes, hex-encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Clock whose current time is `base + offset`, advanced manually.
    struct ManualClock {
        base: Instant,
        offset: Mutex<Duration>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
            }
        }

        fn advance(&self, by: Duration) {
            *self.offset.lock() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + *self.offset.lock()
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(100);

    fn test_store() -> (Arc<ManualClock>, SessionStore) {
        let clock = Arc::new(ManualClock::new());
        let store = SessionStore::with_clock(TIMEOUT, clock.clone());
        (clock, store)
    }

    fn addr(last: u8) -> IpAddr {
        IpAddr::from([192, 168, 1, last])
    }

    #[test]
    fn token_is_fixed_length_hex() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn create_then_validate_same_address() {
        let (_clock, store) = test_store();
        let token = store.create(addr(10));
        assert!(store.validate(&token, addr(10)));
    }

    #[test]
    fn wrong_length_token_rejected_outright() {
        let (_clock, store) = test_store();
        store.create(addr(10));
        assert!(!store.validate("short", addr(10)));
        assert!(!store.validate(&"a".repeat(TOKEN_LEN + 1), addr(10)));
    }

    #[test]
    fn unknown_token_rejected() {
        let (_clock, store) = test_store();
        assert!(!store.validate(&"0".repeat(TOKEN_LEN), addr(10)));
    }

    #[test]
    fn expired_session_is_removed_on_validate() {
        let (clock, store) = test_store();
        let token = store.create(addr(10));

        clock.advance(TIMEOUT + Duration::from_secs(1));
        assert!(!store.validate(&token, addr(10)));
        // Entry is gone, not just flagged.
        assert_eq!(store.stats().active, 0);
        assert!(!store.validate(&token, addr(10)));
    }

    #[test]
    fn validate_exactly_at_timeout_boundary_passes() {
        let (clock, store) = test_store();
        let token = store.create(addr(10));

        clock.advance(TIMEOUT);
        assert!(store.validate(&token, addr(10)));
    }

    #[test]
    fn refresh_extends_the_window() {
        let (clock, store) = test_store();
        let token = store.create(addr(10));

        clock.advance(TIMEOUT - Duration::from_secs(1));
        store.refresh(&token);
        clock.advance(TIMEOUT - Duration::from_secs(1));
        assert!(store.validate(&token, addr(10)));
    }

    #[test]
    fn refresh_after_expiry_does_not_resurrect() {
        let (clock, store) = test_store();
        let token = store.create(addr(10));

        clock.advance(TIMEOUT + Duration::from_secs(1));
        assert!(!store.validate(&token, addr(10)));
        store.refresh(&token);
        assert!(!store.validate(&token, addr(10)));
    }

    #[test]
    fn owner_mismatch_is_tolerated() {
        let (_clock, store) = test_store();
        let token = store.create(addr(10));
        assert!(store.validate(&token, addr(99)));
    }

    #[test]
    fn sweep_removes_only_expired() {
        let (clock, store) = test_store();
        let old = store.create(addr(10));
        clock.advance(TIMEOUT + Duration::from_secs(1));
        let fresh = store.create(addr(11));

        assert_eq!(store.sweep(), 1);
        assert_eq!(store.stats().active, 1);
        assert!(!store.validate(&old, addr(10)));
        assert!(store.validate(&fresh, addr(11)));
    }

    #[test]
    fn stats_track_creations_and_expiry() {
        let (clock, store) = test_store();
        store.create(addr(10));
        store.create(addr(11));
        assert_eq!(
            store.stats(),
            SessionStats {
                active: 2,
                total_created: 2
            }
        );

        clock.advance(TIMEOUT + Duration::from_secs(1));
        store.sweep();
        assert_eq!(
            store.stats(),
            SessionStats {
                active: 0,
                total_created: 2
            }
        );
    }

    #[tokio::test]
    async fn sweeper_handle_aborts_task_on_drop() {
        let store = Arc::new(SessionStore::new(TIMEOUT));
        let sweeper = spawn_sweeper(store, Duration::from_secs(3600));
        drop(sweeper);
        // Nothing to assert beyond "does not hang": the task is aborted and
        // the runtime can shut down.
    }
}
