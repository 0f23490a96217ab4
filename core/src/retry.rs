//! Bounded, fixed-delay retry of a single request.
//!
//! # Design
//! An attempt is classified into one of three outcomes. Transport failures
//! and responses with status 0 or >= 500 are retryable; every other completed
//! exchange, including all 4xx, ends the loop immediately and is handed back
//! to the caller for interpretation.
//!
//! The delay between attempts is fixed. Running out of attempts while still
//! retryable yields `ApiError::RetriesExhausted`, which keeps the last
//! underlying failure only as its `source`.

use std::time::Duration;

use tracing::{debug, warn};

use crate::context::Context;
use crate::error::{ApiError, HttpError};
use crate::http::{HttpMethod, HttpResponse, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    pub delay: Duration,
    /// Absolute cap on total attempts.
    pub ceiling: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 5,
            delay: Duration::from_secs(1),
            ceiling: 10,
        }
    }
}

/// Result of one attempt as seen by the retry loop.
#[derive(Debug)]
pub enum Attempt<T> {
    Done(T),
    Retry(ApiError),
    Fail(ApiError),
}

/// Classify a finished send. Any response that is not a server failure is
/// `Done`, whatever its status; the caller decides whether it is a success.
pub fn classify(
    method: HttpMethod,
    path: &str,
    result: Result<HttpResponse, TransportError>,
) -> Attempt<HttpResponse> {
    match result {
        Err(e) => Attempt::Retry(ApiError::Transport(e.0)),
        Ok(response) if response.status == 0 || response.status >= 500 => Attempt::Retry(
            HttpError::from_response(method, path, response.status, &response.body).into(),
        ),
        Ok(response) => Attempt::Done(response),
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1).min(self.ceiling).max(1)
    }

    /// Invoke `attempt` with a 1-based attempt number until it is `Done` or
    /// `Fail`, sleeping `delay` between retryable attempts.
    ///
    /// The sleep honours `ctx`; a cancelled context ends the loop with
    /// `ApiError::Cancelled` and no further attempts are made.
    pub fn run<T, F>(&self, ctx: &Context, mut attempt: F) -> Result<T, ApiError>
    where
        F: FnMut(u32) -> Attempt<T>,
    {
        let max_attempts = self.max_attempts();
        let mut n = 1;
        loop {
            ctx.check()?;
            match attempt(n) {
                Attempt::Done(value) => {
                    if n > 1 {
                        debug!(attempts = n, "request succeeded after retry");
                    }
                    return Ok(value);
                }
                Attempt::Fail(err) => return Err(err),
                Attempt::Retry(err) => {
                    if n >= max_attempts {
                        warn!(attempts = n, error = %err, "giving up after retries");
                        return Err(ApiError::RetriesExhausted {
                            attempts: n,
                            last: Box::new(err),
                        });
                    }
                    warn!(attempt = n, max_attempts, error = %err, delay = ?self.delay, "retrying request");
                    ctx.sleep(self.delay)?;
                    n += 1;
                }
            }
        }
    }
}
