//! Bounded retry and best-effort polling for flaky external steps.
//!
//! Two deliberately different patterns live here. `retry` is for
//! operations that must eventually succeed (signing): failures back off
//! with doubling waits and exhaustion is an error carrying the last
//! underlying failure. `poll_until` is weaker: a short fixed-interval wait
//! for filesystem visibility that proceeds on exhaustion and lets the
//! following real operation surface any genuine problem.

use std::time::Duration;

use anyhow::Result;

/// Sleep seam so tests record waits instead of serving them.
pub trait Sleeper {
    fn sleep(&mut self, wait: Duration);
}

/// Production sleeper: blocks the (single) build thread.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, wait: Duration) {
        std::thread::sleep(wait);
    }
}

/// Retry schedule: `max_attempts` tries, waiting `initial_wait` after the
/// first failure and multiplying by `factor` after each subsequent one.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub max_attempts: u32,
    pub initial_wait: Duration,
    pub factor: u32,
}

impl Default for Backoff {
    /// The historical signing schedule: 3 attempts, 15s, doubling.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_wait: Duration::from_secs(15),
            factor: 2,
        }
    }
}

/// Retry exhaustion, carrying the last underlying failure.
#[derive(Debug, thiserror::Error)]
#[error("{label} failed after {attempts} attempts: {last_error}")]
pub struct Exhausted {
    pub label: String,
    pub attempts: u32,
    pub last_error: anyhow::Error,
}

/// Call `op` until it succeeds or the schedule is exhausted.
pub fn retry<T>(
    label: &str,
    backoff: Backoff,
    sleeper: &mut dyn Sleeper,
    mut op: impl FnMut() -> Result<T>,
) -> Result<T, Exhausted> {
    let mut wait = backoff.initial_wait;
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if attempt < backoff.max_attempts => {
                println!(
                    "{} failed (attempt {}/{}), waiting {}s before retrying: {}",
                    label,
                    attempt,
                    backoff.max_attempts,
                    wait.as_secs(),
                    err
                );
                sleeper.sleep(wait);
                wait *= backoff.factor;
            }
            Err(err) => {
                return Err(Exhausted {
                    label: label.to_string(),
                    attempts: attempt,
                    last_error: err,
                })
            }
        }
    }
}

/// Wait for `visible` to report true, checking exactly `attempts` times
/// with a fixed `wait` after each failed check.
///
/// Returns whether the condition was ever observed. Exhaustion is not an
/// error: the caller proceeds and the next real operation reports any
/// genuine failure.
pub fn poll_until(
    attempts: u32,
    wait: Duration,
    sleeper: &mut dyn Sleeper,
    mut visible: impl FnMut() -> bool,
) -> bool {
    for n in 0..attempts {
        if visible() {
            return true;
        }
        println!("  not yet visible, waiting ({}/{})...", n + 1, attempts);
        sleeper.sleep(wait);
    }
    false
}
