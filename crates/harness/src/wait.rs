//! Bounded waiting primitives.
//!
//! A zero bound means "wait forever".

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Shortest delay between two polls.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// The predicate passed to [`poll_until`] stayed false for the whole bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("condition still false after {waited:?}")]
pub struct PollTimeout {
	/// Time spent polling.
	pub waited: Duration,
}

/// Polls `ready` every `interval` until it returns true or `timeout` elapses.
///
/// Intervals below [`MIN_POLL_INTERVAL`] are raised to it.
///
/// The predicate is checked before the first sleep, so an already-true
/// condition resolves immediately, and a condition that turns true is observed
/// at the next tick.
pub async fn poll_until(interval: Duration, timeout: Duration, mut ready: impl FnMut() -> bool) -> Result<(), PollTimeout> {
	let interval = interval.max(MIN_POLL_INTERVAL);
	let start = Instant::now();
	loop {
		if ready() {
			return Ok(());
		}
		let waited = start.elapsed();
		if !timeout.is_zero() && waited >= timeout {
			return Err(PollTimeout { waited });
		}
		tokio::time::sleep(interval).await;
	}
}

/// Awaits `fut` for at most `limit`. Returns `None` when the bound elapsed.
pub async fn bounded<F: Future>(limit: Duration, fut: F) -> Option<F::Output> {
	if limit.is_zero() {
		return Some(fut.await);
	}
	tokio::time::timeout(limit, fut).await.ok()
}
