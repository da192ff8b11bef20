//! Retry configuration: attempt budgets, delays, predicates and hooks.
//!
//! A `Config` is built once per retry invocation, either with the `with_*`
//! builder methods or by applying a sequence of [`RetryOption`]s to the
//! defaults. Only the cached backoff exponent changes after that.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use super::cancel::CancelToken;
use super::classify::{is_recoverable, Attempt};
use super::delay::{backoff_delay, capped_backoff_delay, fixed_delay, max_backoff_exponent};
use super::timer::Timer;
use crate::config::{DelayKind, RetrySettings};

/// Computes the wait before the next attempt from the 0-based attempt index,
/// the error it produced and the active configuration.
pub type DelayFn<E> = Box<dyn Fn(u32, &E, &Config<E>) -> Duration + Send + Sync>;
/// Decides whether a failed attempt may be retried.
pub type RetryIfFn<E> = Box<dyn Fn(&Attempt<E>) -> bool + Send + Sync>;
/// Observes every failed attempt with its 1-based number.
pub type OnRetryFn<E> = Box<dyn Fn(u32, &E) + Send + Sync>;
/// A unary configuration mutator. Later options win over earlier ones.
pub type RetryOption<E> = Box<dyn FnOnce(Config<E>) -> Config<E>>;

pub(crate) struct ErrorBudget<E> {
    pub(crate) matches: Box<dyn Fn(&E) -> bool + Send + Sync>,
    pub(crate) attempts: u32,
}

/// Retry configuration for one invocation of [`retry`](fn@crate::retry) or
/// [`retry_with_data`](fn@crate::retry_with_data).
pub struct Config<E> {
    pub(crate) attempts: u32,
    pub(crate) attempts_for_error: Vec<ErrorBudget<E>>,
    pub(crate) delay: Duration,
    pub(crate) max_delay: Duration,
    pub(crate) delay_type: DelayFn<E>,
    pub(crate) retry_if: RetryIfFn<E>,
    pub(crate) on_retry: OnRetryFn<E>,
    pub(crate) last_error_only: bool,
    pub(crate) cancel: CancelToken,
    /// `None` arms a fresh `DefaultTimer` for every wait.
    pub(crate) timer: Option<Arc<dyn Timer>>,
    max_backoff_n: OnceLock<u32>,
}

impl<E: 'static> Default for Config<E> {
    fn default() -> Self {
        Self {
            attempts: 5,
            attempts_for_error: Vec::new(),
            delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            delay_type: Box::new(backoff_delay::<E>),
            retry_if: Box::new(is_recoverable::<E>),
            on_retry: Box::new(|_: u32, _: &E| {}),
            last_error_only: false,
            cancel: CancelToken::default(),
            timer: None,
            max_backoff_n: OnceLock::new(),
        }
    }
}

impl<E: 'static> Config<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `options`, applied in order.
    pub fn from_options<I>(options: I) -> Self
    where
        I: IntoIterator<Item = RetryOption<E>>,
    {
        options.into_iter().fold(Self::default(), |cfg, opt| opt(cfg))
    }

    /// Configuration matching persisted settings (see [`crate::config`]).
    pub fn from_settings(settings: &RetrySettings) -> Self {
        let cfg = Self::new()
            .with_attempts(settings.attempts)
            .with_delay(settings.base_delay())
            .with_max_delay(Duration::from_secs(settings.max_delay_secs))
            .with_last_error_only(settings.last_error_only);
        match settings.strategy {
            DelayKind::Backoff => cfg,
            DelayKind::Fixed => cfg.with_delay_type(fixed_delay::<E>),
            DelayKind::Capped => cfg.with_delay_type(capped_backoff_delay::<E>),
        }
    }
}

impl<E> Config<E> {
    /// Total attempts including the first; 0 retries until success,
    /// cancellation or an unrecoverable error.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Allow at most `attempts` failures equal to `err` per invocation,
    /// regardless of the global attempt count.
    pub fn with_attempts_for_error(mut self, err: E, attempts: u32) -> Self
    where
        E: PartialEq + Send + Sync + 'static,
    {
        self.attempts_for_error.push(ErrorBudget {
            matches: Box::new(move |e: &E| *e == err),
            attempts,
        });
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self.max_backoff_n = OnceLock::new();
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_delay_type<F>(mut self, delay_type: F) -> Self
    where
        F: Fn(u32, &E, &Config<E>) -> Duration + Send + Sync + 'static,
    {
        self.delay_type = Box::new(delay_type);
        self
    }

    pub fn with_retry_if<F>(mut self, retry_if: F) -> Self
    where
        F: Fn(&Attempt<E>) -> bool + Send + Sync + 'static,
    {
        self.retry_if = Box::new(retry_if);
        self
    }

    pub fn with_on_retry<F>(mut self, on_retry: F) -> Self
    where
        F: Fn(u32, &E) + Send + Sync + 'static,
    {
        self.on_retry = Box::new(on_retry);
        self
    }

    /// Return only the most recent error instead of the full history.
    pub fn with_last_error_only(mut self, last_error_only: bool) -> Self {
        self.last_error_only = last_error_only;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn last_error_only(&self) -> bool {
        self.last_error_only
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Largest backoff exponent for the base delay, computed on first use.
    pub(crate) fn max_backoff_n(&self) -> u32 {
        *self
            .max_backoff_n
            .get_or_init(|| max_backoff_exponent(self.delay))
    }
}

impl<E> fmt::Debug for Config<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("attempts", &self.attempts)
            .field("attempts_for_error", &self.attempts_for_error.len())
            .field("delay", &self.delay)
            .field("max_delay", &self.max_delay)
            .field("last_error_only", &self.last_error_only)
            .field("cancel", &self.cancel)
            .field("custom_timer", &self.timer.is_some())
            .finish_non_exhaustive()
    }
}

/// Option constructors. Each returns a [`RetryOption`] that sets one field.
pub mod options {
    use super::*;

    pub fn attempts<E: 'static>(attempts: u32) -> RetryOption<E> {
        Box::new(move |c: Config<E>| c.with_attempts(attempts))
    }

    pub fn attempts_for_error<E>(err: E, attempts: u32) -> RetryOption<E>
    where
        E: PartialEq + Send + Sync + 'static,
    {
        Box::new(move |c: Config<E>| c.with_attempts_for_error(err, attempts))
    }

    pub fn delay<E: 'static>(delay: Duration) -> RetryOption<E> {
        Box::new(move |c: Config<E>| c.with_delay(delay))
    }

    pub fn max_delay<E: 'static>(max_delay: Duration) -> RetryOption<E> {
        Box::new(move |c: Config<E>| c.with_max_delay(max_delay))
    }

    pub fn delay_type<E, F>(delay_type: F) -> RetryOption<E>
    where
        E: 'static,
        F: Fn(u32, &E, &Config<E>) -> Duration + Send + Sync + 'static,
    {
        Box::new(move |c: Config<E>| c.with_delay_type(delay_type))
    }

    pub fn retry_if<E, F>(retry_if: F) -> RetryOption<E>
    where
        E: 'static,
        F: Fn(&Attempt<E>) -> bool + Send + Sync + 'static,
    {
        Box::new(move |c: Config<E>| c.with_retry_if(retry_if))
    }

    pub fn on_retry<E, F>(on_retry: F) -> RetryOption<E>
    where
        E: 'static,
        F: Fn(u32, &E) + Send + Sync + 'static,
    {
        Box::new(move |c: Config<E>| c.with_on_retry(on_retry))
    }

    pub fn last_error_only<E: 'static>(last_error_only: bool) -> RetryOption<E> {
        Box::new(move |c: Config<E>| c.with_last_error_only(last_error_only))
    }

    pub fn cancel_token<E: 'static>(cancel: CancelToken) -> RetryOption<E> {
        Box::new(move |c: Config<E>| c.with_cancel_token(cancel))
    }

    pub fn timer<E: 'static>(timer: Arc<dyn Timer>) -> RetryOption<E> {
        Box::new(move |c: Config<E>| c.with_timer(timer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg: Config<String> = Config::new();
        assert_eq!(cfg.attempts(), 5);
        assert_eq!(cfg.delay(), Duration::from_secs(1));
        assert_eq!(cfg.max_delay(), Duration::from_secs(30));
        assert!(!cfg.last_error_only());
        assert!(!cfg.cancel_token().is_cancelled());
        assert!(cfg.timer.is_none());
        assert!(cfg.attempts_for_error.is_empty());
        assert!((cfg.retry_if)(&Attempt::Recoverable("x".to_string())));
        assert!(!(cfg.retry_if)(&Attempt::Unrecoverable("x".to_string())));
        let err = "x".to_string();
        assert_eq!((cfg.delay_type)(3, &err, &cfg), Duration::from_secs(8));
    }

    #[test]
    fn options_apply_in_order_last_wins() {
        let cfg: Config<()> = Config::from_options([
            options::attempts(3),
            options::delay(Duration::from_millis(10)),
            options::attempts(7),
            options::last_error_only(true),
        ]);
        assert_eq!(cfg.attempts(), 7);
        assert_eq!(cfg.delay(), Duration::from_millis(10));
        assert!(cfg.last_error_only());
    }

    #[test]
    fn changing_delay_resets_exponent_cache() {
        let cfg: Config<()> = Config::new();
        assert_eq!(cfg.max_backoff_n(), 33);
        let cfg = cfg.with_delay(Duration::from_nanos(1));
        assert_eq!(cfg.max_backoff_n(), 62);
    }

    #[test]
    fn error_budget_matches_by_value() {
        let cfg = Config::new().with_attempts_for_error("timeout", 2);
        assert_eq!(cfg.attempts_for_error.len(), 1);
        let budget = &cfg.attempts_for_error[0];
        assert!((budget.matches)(&"timeout"));
        assert!(!(budget.matches)(&"refused"));
        assert_eq!(budget.attempts, 2);
    }

    #[test]
    fn from_settings_selects_strategy() {
        let settings = RetrySettings {
            attempts: 2,
            base_delay_secs: 0.5,
            max_delay_secs: 1,
            last_error_only: true,
            strategy: DelayKind::Capped,
        };
        let cfg: Config<()> = Config::from_settings(&settings);
        assert_eq!(cfg.attempts(), 2);
        assert_eq!(cfg.delay(), Duration::from_millis(500));
        assert!(cfg.last_error_only());
        assert_eq!((cfg.delay_type)(5, &(), &cfg), Duration::from_secs(1));

        let fixed = RetrySettings {
            strategy: DelayKind::Fixed,
            ..settings
        };
        let cfg: Config<()> = Config::from_settings(&fixed);
        assert_eq!((cfg.delay_type)(5, &(), &cfg), Duration::from_millis(500));
    }
}
