//! Scoped task groups.
//!
//! Every task is joined before the group returns, on the error path too.

use std::any::Any;
use std::thread;

use satfolio_core::{Result, SatfolioError};

/// Turns a panic payload into an engine fault for `ordinal`.
pub fn panic_fault(ordinal: usize, payload: Box<dyn Any + Send>) -> SatfolioError {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    };
    SatfolioError::engine_fault(ordinal, format!("panicked: {}", message))
}

/// Runs `task(ordinal, item)` for every item on its own scoped thread.
///
/// Blocks until all tasks finished. Returns the error of the lowest ordinal
/// that failed.
pub fn run_all<T, F>(items: &mut [T], task: F) -> Result<()>
where
    T: Send,
    F: Fn(usize, &mut T) -> Result<()> + Sync,
{
    let results: Vec<Result<()>> = thread::scope(|s| {
        let task = &task;
        let handles: Vec<_> = items
            .iter_mut()
            .enumerate()
            .map(|(ordinal, item)| s.spawn(move || task(ordinal, item)))
            .collect();
        handles
            .into_iter()
            .enumerate()
            .map(|(ordinal, handle)| {
                handle
                    .join()
                    .unwrap_or_else(|payload| Err(panic_fault(ordinal, payload)))
            })
            .collect()
    });
    results.into_iter().collect()
}
