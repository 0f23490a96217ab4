//! Polling until server-side state converges.
//!
//! # Design
//! `wait_for` is the single primitive: on a fixed-interval ticker it calls a
//! predicate until the predicate reports done or fails. Each iteration first
//! races the next tick against the context, so cancellation and deadlines
//! win as soon as they fire and the predicate is never invoked on a context
//! that is already done. No overall time limit is imposed here; callers that
//! want one derive a context with `Context::with_timeout`.
//!
//! `wait_for_task` and `wait_for_server_ready` are the two convergence waits
//! built on top of it.

use std::time::Duration;

use crossbeam_channel::tick;
use tracing::trace;

use crate::client::Client;
use crate::context::Context;
use crate::error::ApiError;
use crate::services::tasks::Task;
use crate::services::virtual_servers::{VirtualServer, VirtualServerStatus};

/// Poll `predicate` every `interval` until it returns `Ok(true)` or `Err`.
///
/// The first call happens one interval after entry. An `Err` ends the wait
/// immediately; only `Ok(false)` keeps polling.
pub fn wait_for<F>(ctx: &Context, interval: Duration, mut predicate: F) -> Result<(), ApiError>
where
    F: FnMut() -> Result<bool, ApiError>,
{
    let ticker = tick(interval);
    let mut ticks = 0u64;
    loop {
        ctx.wait_on(&ticker)?;
        ticks += 1;
        trace!(tick = ticks, "polling");
        if predicate()? {
            return Ok(());
        }
    }
}

/// Block until task `id` finishes.
///
/// A task that ends in any terminal status other than `done` becomes
/// `ApiError::TaskFailed` carrying the task's output.
pub fn wait_for_task(
    ctx: &Context,
    client: &Client,
    id: u64,
    interval: Duration,
) -> Result<Task, ApiError> {
    let mut last = None;
    wait_for(ctx, interval, || {
        let task = client.tasks().get(ctx, id)?;
        trace!(task = id, status = %task.status, progress = task.progress, "task status");
        if !task.is_finished() {
            return Ok(false);
        }
        if !task.is_successful() {
            return Err(ApiError::TaskFailed {
                id,
                status: task.status.to_string(),
                output: task.output,
            });
        }
        last = Some(task);
        Ok(true)
    })?;
    last.ok_or(ApiError::TaskWithoutId)
}

/// Block until server `id` leaves the `processing` state and is `started`.
pub fn wait_for_server_ready(
    ctx: &Context,
    client: &Client,
    id: u64,
    interval: Duration,
) -> Result<VirtualServer, ApiError> {
    let mut ready = None;
    wait_for(ctx, interval, || {
        let server = client.virtual_servers().get(ctx, id)?;
        if server.is_processing {
            return Ok(false);
        }
        if server.status != VirtualServerStatus::Started {
            return Err(ApiError::ServerNotReady {
                id,
                status: server.status.as_str().to_string(),
            });
        }
        ready = Some(server);
        Ok(true)
    })?;
    ready.ok_or(ApiError::ServerNotReady {
        id,
        status: VirtualServerStatus::Unknown.as_str().to_string(),
    })
}
