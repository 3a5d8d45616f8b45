//! Fan-out list of change observers.

use std::sync::{Arc, Mutex};

use super::ChangeCallback;

/// Registered change callbacks, shared between a gateway and its watcher.
#[derive(Clone, Default)]
pub struct Observers {
    callbacks: Arc<Mutex<Vec<ChangeCallback>>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, callback: ChangeCallback) {
        self.callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(callback);
    }

    /// Invoke every registered callback.
    ///
    /// The list is cloned first so a callback may register another observer
    /// without deadlocking.
    pub fn notify(&self) {
        let callbacks = self
            .callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        for callback in callbacks {
            callback();
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
