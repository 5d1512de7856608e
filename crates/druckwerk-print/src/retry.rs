// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cancellable fixed-interval retry loop.
//
// Used to acquire a printer's device: an attempt either yields the value,
// fails (device would not open), or reports the resource as busy (another
// job holds the device).  Failures sleep for the retry interval; busy polls
// at a short interval.  Sleeping happens in small slices so a shutdown flag
// is noticed promptly.  The first failure of a run is reported exactly once.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

/// Longest single sleep before the cancel flag is checked again.
const SLICE: Duration = Duration::from_millis(50);

/// Outcome of one attempt.
pub enum Attempt<T> {
    /// The value was obtained.
    Ready(T),
    /// The attempt failed with a diagnostic message.
    Failed(String),
    /// The resource is temporarily held elsewhere.
    Busy,
}

/// Retry configuration and cancellation flags.
#[derive(Clone)]
pub struct RetryLoop {
    /// Delay after a failed attempt.
    pub interval: Duration,
    /// Delay after a busy attempt.
    pub poll: Duration,
    cancel: Vec<Arc<AtomicBool>>,
}

impl RetryLoop {
    pub fn new(interval: Duration, poll: Duration) -> Self {
        Self {
            interval,
            poll: poll.max(Duration::from_millis(1)),
            cancel: Vec::new(),
        }
    }

    /// Stop retrying once `flag` is set.
    pub fn cancel_on(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel.push(flag);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.iter().any(|flag| flag.load(Ordering::Acquire))
    }

    /// Run `attempt` until it yields a value or the loop is cancelled.
    ///
    /// `on_first_failure` is called with the message of the first failure
    /// only; later failures retry silently.  Returns `None` on cancellation.
    pub fn run<T>(
        &self,
        mut attempt: impl FnMut() -> Attempt<T>,
        on_first_failure: impl FnOnce(&str),
    ) -> Option<T> {
        let mut on_first_failure = Some(on_first_failure);
        let mut tries = 0u32;

        loop {
            if self.is_cancelled() {
                debug!(tries, "retry loop cancelled");
                return None;
            }
            tries += 1;
            let delay = match attempt() {
                Attempt::Ready(value) => {
                    if tries > 1 {
                        debug!(tries, "retry loop succeeded");
                    }
                    return Some(value);
                }
                Attempt::Failed(message) => {
                    if let Some(report) = on_first_failure.take() {
                        report(&message);
                    } else {
                        trace!(tries, %message, "attempt failed again");
                    }
                    self.interval
                }
                Attempt::Busy => self.poll,
            };
            self.sleep(delay);
        }
    }

    fn sleep(&self, delay: Duration) {
        let deadline = Instant::now() + delay;
        loop {
            let now = Instant::now();
            if now >= deadline || self.is_cancelled() {
                return;
            }
            std::thread::sleep((deadline - now).min(SLICE));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn quick() -> RetryLoop {
        RetryLoop::new(Duration::from_millis(1), Duration::from_millis(1))
    }

    #[test]
    fn ready_on_first_attempt_never_reports() {
        let retry = quick();
        let reported = Cell::new(false);
        let value = retry.run(|| Attempt::Ready(7), |_| reported.set(true));
        assert_eq!(value, Some(7));
        assert!(!reported.get());
    }

    #[test]
    fn first_failure_is_reported_once() {
        let retry = quick();
        let calls = Cell::new(0);
        let reports = Cell::new(0);

        let value = retry.run(
            || {
                calls.set(calls.get() + 1);
                if calls.get() < 4 {
                    Attempt::Failed(format!("refused {}", calls.get()))
                } else {
                    Attempt::Ready("open")
                }
            },
            |message| {
                assert_eq!(message, "refused 1");
                reports.set(reports.get() + 1);
            },
        );

        assert_eq!(value, Some("open"));
        assert_eq!(calls.get(), 4);
        assert_eq!(reports.get(), 1);
    }

    #[test]
    fn busy_does_not_count_as_failure() {
        let retry = quick();
        let calls = Cell::new(0);
        let value = retry.run(
            || {
                calls.set(calls.get() + 1);
                if calls.get() < 3 { Attempt::Busy } else { Attempt::Ready(()) }
            },
            |_| panic!("busy must not be reported"),
        );
        assert_eq!(value, Some(()));
    }

    #[test]
    fn cancellation_stops_the_loop() {
        let idle = Arc::new(AtomicBool::new(false));
        let cancel = Arc::new(AtomicBool::new(false));
        let retry = RetryLoop::new(Duration::from_secs(60), Duration::from_millis(1))
            .cancel_on(idle)
            .cancel_on(cancel.clone());
        let flag = cancel;

        let handle = std::thread::spawn(move || {
            retry.run::<()>(|| Attempt::Failed("offline".into()), |_| {})
        });
        std::thread::sleep(Duration::from_millis(20));
        flag.store(true, Ordering::Release);

        let started = Instant::now();
        assert_eq!(handle.join().expect("join"), None);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
