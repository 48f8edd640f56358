//! Round-Robin Cursor
//!
//! Cycles deterministically through a fixed list of targets.

use std::sync::{Mutex, PoisonError};

use crate::error::{CdnError, Result};

// == Round Robin ==
/// Fixed target list with a shared cursor.
///
/// Reading the current target and advancing the cursor happen under one lock, so
/// concurrent callers never observe the same position twice.
#[derive(Debug)]
pub struct RoundRobin<T> {
    targets: Vec<T>,
    cursor: Mutex<usize>,
}

impl<T: Clone> RoundRobin<T> {
    /// Creates a cursor positioned on the first target.
    ///
    /// Fails when `targets` is empty.
    pub fn new(targets: Vec<T>) -> Result<Self> {
        if targets.is_empty() {
            return Err(CdnError::Config(
                "round-robin rotation needs at least one target".to_string(),
            ));
        }
        Ok(Self {
            targets,
            cursor: Mutex::new(0),
        })
    }

    /// Returns the current target and advances the cursor.
    pub fn next(&self) -> T {
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let target = self.targets[*cursor].clone();
        *cursor = (*cursor + 1) % self.targets.len();
        target
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
