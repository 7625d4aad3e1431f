//! Diagnostic timeout for tests that could hang.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Runs `f` on a helper thread and panics if it takes longer than `limit`.
///
/// A hung run leaks the helper thread; the panic message is the diagnostic.
/// A panic inside `f` is resumed on the calling thread with its payload.
pub fn within<T, F>(limit: Duration, f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(panic::catch_unwind(AssertUnwindSafe(f)));
    });
    match rx.recv_timeout(limit) {
        Ok(Ok(value)) => value,
        Ok(Err(payload)) => panic::resume_unwind(payload),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test run did not finish within {:?}", limit)
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            panic!("test run exited without a result")
        }
    }
}
