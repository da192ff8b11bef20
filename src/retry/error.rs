//! Aggregated failure returned when the retry loop gives up.

use std::fmt;

use super::cancel::Cancelled;

/// Why the retry loop stopped without a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The cancel token fired before the first attempt or during a wait.
    Cancelled,
    /// An attempt failed with an error the retry predicate rejected.
    Unrecoverable,
    /// The global attempt budget ran out.
    Exhausted,
    /// A per-error attempt budget ran out.
    ErrorBudget,
}

/// Errors produced by the attempts of one retry invocation, in attempt order.
///
/// In last-error-only mode `errors` holds at most the final attempt's error.
/// `cancelled` is set when the loop stopped on the cancel token.
#[derive(Debug)]
pub struct RetryError<E> {
    errors: Vec<E>,
    cancelled: Option<Cancelled>,
    reason: StopReason,
    attempts: u32,
    last_error_only: bool,
}

impl<E> RetryError<E> {
    pub(crate) fn new(errors: Vec<E>, reason: StopReason, attempts: u32) -> Self {
        Self {
            errors,
            cancelled: None,
            reason,
            attempts,
            last_error_only: false,
        }
    }

    pub(crate) fn cancelled(errors: Vec<E>, cause: Cancelled, attempts: u32) -> Self {
        Self {
            errors,
            cancelled: Some(cause),
            reason: StopReason::Cancelled,
            attempts,
            last_error_only: false,
        }
    }

    pub(crate) fn last_error_only(mut self, last_error_only: bool) -> Self {
        self.last_error_only = last_error_only;
        self
    }

    pub fn errors(&self) -> &[E] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<E> {
        self.errors
    }

    pub fn last_error(&self) -> Option<&E> {
        self.errors.last()
    }

    pub fn cancellation(&self) -> Option<Cancelled> {
        self.cancelled
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.is_some()
    }

    pub fn reason(&self) -> StopReason {
        self.reason
    }

    /// Number of times the operation was invoked.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return match self.cancelled {
                Some(cause) => write!(f, "{}", cause),
                None => write!(f, "retry failed without attempts"),
            };
        }
        if self.last_error_only {
            write!(f, "{}", self.errors[self.errors.len() - 1])?;
            if let Some(cause) = self.cancelled {
                write!(f, " ({})", cause)?;
            }
            return Ok(());
        }
        write!(f, "All attempts fail:")?;
        for (i, err) in self.errors.iter().enumerate() {
            write!(f, "\n#{}: {}", i + 1, err)?;
        }
        if let Some(cause) = self.cancelled {
            write!(f, "\n#{}: {}", self.errors.len() + 1, cause)?;
        }
        Ok(())
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.errors.last() {
            Some(e) => Some(e),
            None => self
                .cancelled
                .as_ref()
                .map(|c| c as &(dyn std::error::Error + 'static)),
        }
    }
}
