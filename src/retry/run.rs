//! Retry loop: run an operation until success or the configuration says stop.

use super::classify::Attempt;
use super::error::{RetryError, StopReason};
use super::policy::Config;
use super::timer::{DefaultTimer, Timer};

/// Runs an operation with no result under retry.
///
/// See [`retry_with_data`] for the loop semantics.
pub fn retry<E, F>(op: F, config: Config<E>) -> Result<(), RetryError<E>>
where
    F: FnMut() -> Result<(), Attempt<E>>,
{
    retry_with_data(op, config)
}

/// Runs an operation until it succeeds, the attempt budget is spent, an
/// unrecoverable error is returned, or the cancel token fires.
///
/// Every failure is passed to the `on_retry` hook before the loop decides
/// whether to continue. The cancel token is checked before the first attempt
/// and while waiting between attempts; a running attempt is never interrupted.
pub fn retry_with_data<T, E, F>(mut op: F, config: Config<E>) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Result<T, Attempt<E>>,
{
    if let Some(cause) = config.cancel.cause() {
        tracing::debug!(%cause, "retry cancelled before first attempt");
        return Err(RetryError::cancelled(Vec::new(), cause, 0));
    }

    let mut budgets: Vec<u32> = config
        .attempts_for_error
        .iter()
        .map(|b| b.attempts)
        .collect();
    let mut errors: Vec<E> = Vec::new();
    let mut n: u32 = 0;

    loop {
        let failure = match op() {
            Ok(value) => return Ok(value),
            Err(failure) => failure,
        };
        let made = n.saturating_add(1);

        (config.on_retry)(made, failure.error());
        let retryable = (config.retry_if)(&failure);
        if config.last_error_only {
            errors.clear();
        }
        errors.push(failure.into_error());
        let err = &errors[errors.len() - 1];

        if !retryable {
            tracing::warn!(attempt = made, "attempt failed with unrecoverable error");
            return Err(give_up(&config, errors, StopReason::Unrecoverable, made));
        }

        let mut budget_spent = false;
        for (budget, remaining) in config.attempts_for_error.iter().zip(budgets.iter_mut()) {
            if (budget.matches)(err) {
                *remaining = remaining.saturating_sub(1);
                budget_spent |= *remaining == 0;
            }
        }
        if budget_spent {
            tracing::warn!(attempt = made, "per-error attempt budget spent");
            return Err(give_up(&config, errors, StopReason::ErrorBudget, made));
        }

        if config.attempts != 0 && made >= config.attempts {
            tracing::warn!(attempts = made, "retry attempts exhausted");
            return Err(give_up(&config, errors, StopReason::Exhausted, made));
        }

        let delay = (config.delay_type)(n, err, &config);
        tracing::debug!(
            attempt = made,
            delay_ms = delay.as_millis() as u64,
            "attempt failed; backing off"
        );
        let signal = match &config.timer {
            Some(timer) => timer.after(delay),
            None => DefaultTimer::new().after(delay),
        };
        if let Some(cause) = config.cancel.wait_until(signal.fires_at()) {
            tracing::info!(attempts = made, %cause, "retry cancelled while backing off");
            return Err(RetryError::cancelled(errors, cause, made)
                .last_error_only(config.last_error_only));
        }

        n = made;
    }
}

fn give_up<E>(config: &Config<E>, errors: Vec<E>, reason: StopReason, made: u32) -> RetryError<E> {
    RetryError::new(errors, reason, made).last_error_only(config.last_error_only)
}
