use crate::hardware::Pause;
use log::warn;

/// How often and how patiently a blocking startup step is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, or `None` to retry until success.
    pub max_attempts: Option<u32>,

    /// Busy-wait between attempts.
    pub delay_ms: u32,
}

/// A bounded retry gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaveUp<E> {
    /// Attempts made.
    pub attempts: u32,

    /// Error of the last attempt.
    pub last_error: E,
}

impl RetryPolicy {
    pub const fn bounded(max_attempts: u32, delay_ms: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            delay_ms,
        }
    }

    pub const fn unbounded(delay_ms: u32) -> Self {
        Self {
            max_attempts: None,
            delay_ms,
        }
    }

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// The caller is blocked for the whole duration; there is no cancellation.
    ///
    /// # Arguments
    /// * `what` - Name of the step, for the log.
    /// * `pause` - Busy-wait between attempts.
    /// * `op` - The step; receives the 1-based attempt number.
    ///
    /// # Returns
    /// * `Result<T, GaveUp<E>>` - The first success, or the last failure.
    pub fn run<T, E, P, F>(&self, what: &str, pause: &mut P, mut op: F) -> Result<T, GaveUp<E>>
    where
        E: core::fmt::Debug,
        P: Pause + ?Sized,
        F: FnMut(u32) -> Result<T, E>,
    {
        let mut attempt = 0u32;

        loop {
            attempt = attempt.saturating_add(1);

            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if self.max_attempts.is_some_and(|max| attempt >= max) {
                        warn!("{what} failed after {attempt} attempt(s): {error:?}");
                        return Err(GaveUp {
                            attempts: attempt,
                            last_error: error,
                        });
                    }

                    warn!(
                        "{what} failed (attempt {attempt}): {error:?}, retrying in {} ms",
                        self.delay_ms
                    );
                    pause.pause_ms(self.delay_ms);
                }
            }
        }
    }
}
