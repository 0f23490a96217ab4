//! Caller-driven cancellation and deadlines for blocking operations.
//!
//! # Design
//! A `Context` is a cheap, clonable value passed to every operation. It
//! carries zero or more cancellation signals (one per `with_cancel` in its
//! ancestry) and an optional deadline. A signal fires when its
//! `CancelHandle` is cancelled or dropped, which disconnects the underlying
//! channel and wakes every waiter at once.
//!
//! `Context::wait_on` is the only suspension primitive: it races a timer
//! channel against every signal and the deadline using a crossbeam `Select`.
//! Cancellation is checked before and after the race, so a context that is
//! already done never lets the caller proceed.

use std::time::{Duration, Instant};

use crossbeam_channel::{after, at, bounded, never, Receiver, Select, Sender, TryRecvError};

use crate::error::{ApiError, CancelReason};

#[derive(Debug, Clone, Default)]
pub struct Context {
    signals: Vec<Receiver<()>>,
    deadline: Option<Instant>,
}

/// Cancels the `Context` it was created with, and every context derived
/// from it. Dropping the handle cancels as well.
#[derive(Debug)]
pub struct CancelHandle {
    _tx: Sender<()>,
}

impl CancelHandle {
    pub fn cancel(self) {}
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_cancel(&self) -> (Context, CancelHandle) {
        let (tx, rx) = bounded(0);
        let mut child = self.clone();
        child.signals.push(rx);
        (child, CancelHandle { _tx: tx })
    }

    /// Derive a context whose deadline is `timeout` from now, or the
    /// parent's deadline if that is earlier. A timeout too large to
    /// represent as an `Instant` adds no deadline.
    pub fn with_timeout(&self, timeout: Duration) -> Context {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.clone(),
        }
    }

    pub fn with_deadline(&self, deadline: Instant) -> Context {
        let mut child = self.clone();
        child.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        child
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why this context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<CancelReason> {
        let canceled = self
            .signals
            .iter()
            .any(|rx| matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));
        if canceled {
            return Some(CancelReason::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// `Err(ApiError::Cancelled)` if the context is done.
    pub fn check(&self) -> Result<(), ApiError> {
        match self.err() {
            Some(reason) => Err(ApiError::Cancelled(reason)),
            None => Ok(()),
        }
    }

    /// Block for `duration`, returning early with `ApiError::Cancelled` as
    /// soon as the context is cancelled or its deadline passes.
    pub fn sleep(&self, duration: Duration) -> Result<(), ApiError> {
        self.wait_on(&after(duration))
    }

    /// Block until `timer` delivers, racing it against cancellation and the
    /// deadline. Works with one-shot (`after`) and periodic (`tick`) timers.
    pub fn wait_on(&self, timer: &Receiver<Instant>) -> Result<(), ApiError> {
        self.check()?;

        let deadline = self.deadline.map(at).unwrap_or_else(never);

        let mut sel = Select::new();
        for rx in &self.signals {
            sel.recv(rx);
        }
        let deadline_idx = sel.recv(&deadline);
        let timer_idx = sel.recv(timer);

        let op = sel.select();
        let idx = op.index();
        if idx == timer_idx {
            let _ = op.recv(timer);
        } else if idx == deadline_idx {
            let _ = op.recv(&deadline);
            return Err(ApiError::Cancelled(CancelReason::DeadlineExceeded));
        } else {
            let _ = op.recv(&self.signals[idx]);
            return Err(ApiError::Cancelled(CancelReason::Canceled));
        }

        self.check()
    }
}
