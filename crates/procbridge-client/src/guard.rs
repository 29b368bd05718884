//! Bounded-time execution of a blocking operation.
//!
//! The guard runs an operation on a worker and blocks the caller until the
//! operation delivers its result or a timer fires, whichever comes first.
//! The rendezvous channel plays the role of a single-acquire primitive that
//! both paths can release.
//!
//! The timeout cancels only the caller's wait: a worker that outlives the
//! deadline keeps running to completion in the background. Callers that
//! cannot tolerate orphaned work must make the operation itself observe a
//! deadline.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use procbridge_common::{ProcBridgeError, Result};

/// Worker supply for guarded operations. Implement this to run guard
/// workers on an existing pool instead of a fresh thread per call.
pub trait Spawn: Send + Sync {
    fn spawn(&self, job: Box<dyn FnOnce() + Send>);
}

/// Runs `op`, bounding the caller's wait to `timeout`.
///
/// A `timeout` of `None` or zero disables the guard entirely: `op` runs
/// synchronously on the calling thread with no timer and no worker.
///
/// # Errors
///
/// - [`ProcBridgeError::Timeout`] - the deadline elapsed before `op`
///   delivered a result; `op` itself is not cancelled
/// - [`ProcBridgeError::Internal`] - the worker terminated without
///   delivering a result (it panicked, or no worker could be spawned)
pub fn run_with_deadline<T, F>(
    timeout: Option<Duration>,
    pool: Option<&dyn Spawn>,
    op: F,
) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let timeout = match timeout {
        Some(t) if !t.is_zero() => t,
        _ => return Ok(op()),
    };

    let (tx, rx) = mpsc::sync_channel(1);
    let job = Box::new(move || {
        let _ = tx.send(op());
    });
    match pool {
        Some(pool) => pool.spawn(job),
        // A failed spawn leaves the channel disconnected, surfacing below.
        None => drop(
            thread::Builder::new()
                .name("procbridge-guard".to_owned())
                .spawn(job),
        ),
    }

    match rx.recv_timeout(timeout) {
        Ok(value) => Ok(value),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            Err(ProcBridgeError::Timeout(timeout.as_millis() as u64))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(ProcBridgeError::Internal(
            "guarded operation terminated without a result".to_owned(),
        )),
    }
}
