//! Rolling-window rate limiter for outbound fetches
//!
//! The limiter admits at most N operations per rolling period T under a
//! named scope, shared across every caller of that scope. Excess callers
//! suspend until admitted, in first-requested/first-admitted order, and
//! none are dropped. Independent scopes never interfere.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Admission history for one scope
#[derive(Debug)]
struct ScopeWindow {
    /// Start instants of admissions inside the current rolling window,
    /// oldest first
    admissions: VecDeque<Instant>,
}

impl ScopeWindow {
    fn new() -> Self {
        Self {
            admissions: VecDeque::new(),
        }
    }
}

/// Shared rate limiter keyed by scope name
///
/// Admission order is FIFO per scope: waiters queue on the scope's async
/// mutex, which hands the lock out in arrival order, and the lock is held
/// across the sleep so later callers cannot overtake.
pub struct RateLimiter {
    calls: usize,
    period: Duration,
    scopes: StdMutex<HashMap<String, Arc<Mutex<ScopeWindow>>>>,
}

impl RateLimiter {
    /// Creates a limiter admitting `calls` operations per rolling `period`
    pub fn new(calls: u32, period: Duration) -> Self {
        Self {
            calls: calls.max(1) as usize,
            period,
            scopes: StdMutex::new(HashMap::new()),
        }
    }

    /// Suspends until the named scope can admit one more operation
    ///
    /// Returns as soon as the admission is recorded; the caller performs
    /// its operation afterwards. The limiter itself never fails.
    pub async fn acquire(&self, scope: &str) {
        let window = self.scope_window(scope);
        let mut window = window.lock().await;

        loop {
            let now = Instant::now();

            // Expire admissions that have left the rolling window
            while let Some(front) = window.admissions.front() {
                if now.duration_since(*front) >= self.period {
                    window.admissions.pop_front();
                } else {
                    break;
                }
            }

            if window.admissions.len() < self.calls {
                window.admissions.push_back(now);
                return;
            }

            // Window is full: the next slot opens when the oldest
            // admission expires. Sleeping with the lock held keeps
            // admission order FIFO.
            let oldest = *window.admissions.front().expect("window is full");
            let reopen = oldest + self.period;
            tracing::trace!(
                "Scope '{}' saturated, waiting {:?}",
                scope,
                reopen.saturating_duration_since(now)
            );
            tokio::time::sleep_until(reopen).await;
        }
    }

    /// Runs an operation under the named scope
    ///
    /// Admission happens before the operation starts; the operation's own
    /// output (including errors) propagates untouched.
    pub async fn run<F, T>(&self, scope: &str, op: F) -> T
    where
        F: Future<Output = T>,
    {
        self.acquire(scope).await;
        op.await
    }

    fn scope_window(&self, scope: &str) -> Arc<Mutex<ScopeWindow>> {
        let mut scopes = self.scopes.lock().expect("scope map poisoned");
        scopes
            .entry(scope.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ScopeWindow::new())))
            .clone()
    }
}
