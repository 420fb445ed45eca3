use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::time::{sleep_until, Instant, Sleep};

/// One-direction deadline state.
///
/// Once armed and elapsed, `poll_expired` keeps reporting ready until the
/// deadline is re-armed or cleared, so every blocked or subsequent operation
/// on that direction fails until the caller sets a new, later deadline.
pub(crate) struct Deadline {
    armed: Option<ArmedDeadline>,
}

struct ArmedDeadline {
    expired: bool,
    sleep: Pin<Box<Sleep>>,
}

impl Deadline {
    pub(crate) fn new() -> Self {
        Self { armed: None }
    }

    /// Arm at an absolute instant, or clear with `None`.
    pub(crate) fn set(&mut self, at: Option<Instant>) {
        self.armed = at.map(|at| ArmedDeadline {
            expired: false,
            sleep: Box::pin(sleep_until(at)),
        });
    }

    /// Ready when a deadline is armed and has elapsed; pending otherwise.
    /// Registers the task for wakeup at the deadline, so a blocked read or
    /// write gets re-polled the moment the deadline fires.
    pub(crate) fn poll_expired(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        let Some(armed) = self.armed.as_mut() else {
            return Poll::Pending;
        };
        if armed.expired {
            return Poll::Ready(());
        }
        match armed.sleep.as_mut().poll(cx) {
            Poll::Ready(()) => {
                armed.expired = true;
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
