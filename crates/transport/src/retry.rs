use std::thread;
use std::time::Duration;

use crate::error::status;
use crate::{Session, SessionError, SessionResult};

/// Absolute path of the server root; a session restored to it needs no `CWD`.
pub const ROOT: &str = "/";

/// Attempt budget applied when none is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

const FIRST_RETRY_DELAY: Duration = Duration::from_millis(500);
const RETRY_DELAY: Duration = Duration::from_millis(1000);

/// How the retry loop reacts to a failed attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Disposition {
    /// The session was invalidated: reconnect and restore the working
    /// directory, then try again.
    RetryReconnect,
    /// A transient condition: try again on the same session.
    Retry,
    /// Propagate immediately.
    Fatal,
}

/// Classifies a session failure.
///
/// | failure | disposition |
/// |---|---|
/// | `530` not logged in, `421` closing, a reset socket or a disconnected session | [`Disposition::RetryReconnect`] |
/// | `450` / `550` resource unavailable, or a timeout | [`Disposition::Retry`] |
/// | anything else | [`Disposition::Fatal`] |
#[must_use]
pub fn classify(error: &SessionError) -> Disposition {
    match error {
        SessionError::Status { code, .. } => match *code {
            status::NOT_LOGGED_IN | status::SERVICE_UNAVAILABLE => Disposition::RetryReconnect,
            status::FILE_BUSY | status::FILE_UNAVAILABLE => Disposition::Retry,
            _ => Disposition::Fatal,
        },
        SessionError::Disconnected => Disposition::RetryReconnect,
        error if error.is_connection_loss() => Disposition::RetryReconnect,
        error if error.is_timeout() => Disposition::Retry,
        _ => Disposition::Fatal,
    }
}

/// Bounded retry loop wrapped around every protocol operation.
///
/// Before each attempt the policy makes sure the session is usable: when it
/// is not connected, or the previous attempt invalidated it, the session is
/// reconnected and moved back into the required working directory. Only then
/// is the operation re-run.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use transport::RetryPolicy;
///
/// let policy = RetryPolicy::new(3).with_delays(Duration::ZERO, Duration::ZERO);
/// assert_eq!(policy.max_attempts(), 3);
/// assert_eq!(policy.delay_before_retry(1), Duration::ZERO);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    first_delay: Duration,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetryPolicy {
    /// Creates a policy allowing `max_attempts` attempts (at least one).
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            first_delay: FIRST_RETRY_DELAY,
            delay: RETRY_DELAY,
        }
    }

    /// Replaces the backoff delays.
    #[must_use]
    pub const fn with_delays(mut self, first: Duration, subsequent: Duration) -> Self {
        self.first_delay = first;
        self.delay = subsequent;
        self
    }

    /// Returns the attempt budget.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the pause taken before retry number `retry` (1-based).
    #[must_use]
    pub const fn delay_before_retry(&self, retry: u32) -> Duration {
        if retry <= 1 {
            self.first_delay
        } else {
            self.delay
        }
    }

    /// Runs `operation` against `session`, retrying transient failures.
    ///
    /// `working_directory` is the absolute directory the operation expects the
    /// session to be in; it is re-entered after every reconnect unless it is
    /// [`ROOT`].
    ///
    /// # Errors
    ///
    /// Returns the first [`Disposition::Fatal`] failure, or the last failure
    /// once the attempt budget is spent. Failures while reconnecting or
    /// restoring the directory count as attempts and are classified the same
    /// way.
    pub fn call<S, T, F>(
        &self,
        session: &mut S,
        working_directory: &str,
        mut operation: F,
    ) -> SessionResult<T>
    where
        S: Session + ?Sized,
        F: FnMut(&mut S) -> SessionResult<T>,
    {
        let mut reconnect = false;
        let mut attempt = 1;
        loop {
            let result = restore(session, working_directory, reconnect)
                .and_then(|()| operation(session));
            let error = match result {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let disposition = classify(&error);
            if disposition == Disposition::Fatal || attempt >= self.max_attempts {
                if disposition != Disposition::Fatal {
                    tracing::warn!(
                        target: "ftpush::retry",
                        attempts = attempt,
                        error = %error,
                        "retry budget exhausted"
                    );
                }
                return Err(error);
            }

            reconnect = disposition == Disposition::RetryReconnect;
            let delay = self.delay_before_retry(attempt);
            tracing::debug!(
                target: "ftpush::retry",
                attempt,
                reconnect,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "retrying protocol operation"
            );
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            attempt += 1;
        }
    }
}

fn restore<S>(session: &mut S, working_directory: &str, force: bool) -> SessionResult<()>
where
    S: Session + ?Sized,
{
    if !force && session.is_connected() {
        return Ok(());
    }
    tracing::debug!(target: "ftpush::retry", directory = working_directory, "reconnecting session");
    session.connect()?;
    if working_directory != ROOT {
        session.change_working_directory(working_directory)?;
    }
    Ok(())
}
