// Shared test helpers for driving a loader inside a LocalSet.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Lets every queued local task run, including chains of tasks that wake
/// each other (settle -> batch completion -> flushed callbacks).
#[allow(dead_code)] // Used by other test files
pub async fn drain() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Callback that increments `counter` when fired.
#[allow(dead_code)] // Used by other test files
pub fn bump(counter: &Rc<Cell<usize>>) -> impl FnOnce() + 'static {
    let counter = counter.clone();
    move || counter.set(counter.get() + 1)
}

/// Callback that appends `entry` to `log` when fired.
#[allow(dead_code)] // Used by other test files
pub fn record(log: &Rc<RefCell<Vec<String>>>, entry: &str) -> impl FnOnce() + 'static {
    let log = log.clone();
    let entry = entry.to_string();
    move || log.borrow_mut().push(entry)
}
