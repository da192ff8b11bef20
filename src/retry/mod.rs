//! Retry orchestration.
//!
//! This module owns the retry loop and the pieces it is driven by: error
//! classification (recoverable vs unrecoverable, per-error budgets), delay
//! strategies, the wake-up timer and cooperative cancellation. The operation
//! being retried is opaque; only its errors are inspected.

mod cancel;
mod classify;
mod delay;
mod error;
mod policy;
mod run;
mod timer;

pub use cancel::{CancelToken, Cancelled};
pub use classify::{is_recoverable, unrecoverable, Attempt};
pub use delay::{backoff_delay, capped_backoff_delay, fixed_delay};
pub use error::{RetryError, StopReason};
pub use policy::{options, Config, DelayFn, OnRetryFn, RetryIfFn, RetryOption};
pub use run::{retry, retry_with_data};
pub use timer::{DefaultTimer, Timer, TimerSignal};
