//! Session lifecycle for the emulated device API.
//!
//! The device keeps sessions in RAM only: an opaque 32-character hex token
//! per client, expiring after a fixed idle timeout. The emulator reproduces
//! that exactly — no persistence, no cross-process sharing.
//!
//! ## Design Decisions
//! - Tokens are raw map keys, not hashed: the table lives in process memory
//!   for the lifetime of a dev run, there is no at-rest storage to protect.
//! - The store takes a [`Clock`] so tests can advance time deterministically
//!   instead of sleeping through real timeouts.
//! - The expiry sweeper is an owned, abortable task — started explicitly,
//!   stopped when its handle drops.

pub mod store;

pub use store::{spawn_sweeper, Clock, SessionStats, SessionStore, Sweeper, SystemClock, TOKEN_LEN};
