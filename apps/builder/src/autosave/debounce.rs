//! Debounce over a `tokio::sync::watch` channel.
//!
//! The first call to [`Debounced::settled`] yields the current value at once. After
//! that, every change restarts a timer of the configured delay; only a value that stays
//! put for the whole delay is yielded. Intermediate values of a burst are never seen.

use std::time::Duration;

use tokio::sync::watch;

pub struct Debounced<T> {
    input: watch::Receiver<T>,
    delay: Duration,
    last_emitted: Option<T>,
}

impl<T: Clone + PartialEq> Debounced<T> {
    pub fn new(input: watch::Receiver<T>, delay: Duration) -> Self {
        Self {
            input,
            delay,
            last_emitted: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Treats the current value as already emitted, so the first [`settled`] call waits
    /// for a change instead of returning at once.
    ///
    /// [`settled`]: Debounced::settled
    pub fn skip_current(mut self) -> Self {
        let current = self.input.borrow_and_update().clone();
        self.last_emitted = Some(current);
        self
    }

    /// Takes effect for the next timer that starts.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Waits for the next settled value. Returns `None` once the sender is gone and
    /// every value it sent has been settled.
    ///
    /// Cancel safe: dropping the future loses no change, the next call picks it up.
    pub async fn settled(&mut self) -> Option<T> {
        if self.last_emitted.is_none() {
            let initial = self.input.borrow_and_update().clone();
            self.last_emitted = Some(initial.clone());
            return Some(initial);
        }

        loop {
            if self.input.changed().await.is_err() {
                return self.flush();
            }

            // Restart the timer on every change until one full delay passes quietly.
            loop {
                // A zero delay still goes through the timer, so changes made before the
                // next poll are coalesced too.
                let quiet = tokio::time::sleep(self.delay);
                tokio::select! {
                    _ = quiet => break,
                    changed = self.input.changed() => {
                        if changed.is_err() {
                            return self.flush();
                        }
                    }
                }
            }

            let value = self.input.borrow_and_update().clone();
            if self.last_emitted.as_ref() != Some(&value) {
                self.last_emitted = Some(value.clone());
                return Some(value);
            }
        }
    }

    /// Final value after the sender closed, if it was never emitted.
    fn flush(&mut self) -> Option<T> {
        let value = self.input.borrow_and_update().clone();
        if self.last_emitted.as_ref() == Some(&value) {
            return None;
        }
        self.last_emitted = Some(value.clone());
        Some(value)
    }
}
