//! Cooperative cancellation for the retry loop.
//!
//! A `CancelToken` is shared (cloned) between the retry executor and whoever
//! may want to stop it. The executor checks it before the first attempt and
//! waits on it while sleeping between attempts; a running attempt is never
//! interrupted.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Why a retry loop was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Cancelled {
    /// `CancelToken::cancel` was called.
    #[error("retry cancelled")]
    Cancelled,
    /// The token's deadline passed.
    #[error("retry deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Default)]
struct State {
    cause: Option<Cancelled>,
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<State>,
    changed: Condvar,
    deadline: Option<Instant>,
}

/// Shared cancellation signal. Clones observe the same state.
///
/// `CancelToken::default()` is the background token: it never fires unless
/// `cancel` is called on it or a clone.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that reports `DeadlineExceeded` once `deadline` has passed.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            inner: Arc::new(Inner {
                deadline: Some(deadline),
                ..Inner::default()
            }),
        }
    }

    /// Token that reports `DeadlineExceeded` after `timeout`. A timeout past
    /// the range of `Instant` never expires.
    pub fn with_timeout(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::with_deadline(deadline),
            None => Self::new(),
        }
    }

    /// Cancel every clone of this token and wake any waiting retry loop.
    /// The first cause recorded wins.
    pub fn cancel(&self) {
        let mut state = self.lock();
        if state.cause.is_none() {
            state.cause = Some(Cancelled::Cancelled);
        }
        drop(state);
        self.inner.changed.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cause().is_some()
    }

    /// The cancellation cause, if the token has fired.
    pub fn cause(&self) -> Option<Cancelled> {
        let state = self.lock();
        self.cause_locked(&state, Instant::now())
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Block until `until` or until the token fires, whichever comes first.
    /// `until = None` waits for the token alone.
    ///
    /// Returns the cause when the token fired first, `None` when `until` was
    /// reached with the token still live.
    pub fn wait_until(&self, until: Option<Instant>) -> Option<Cancelled> {
        let mut state = self.lock();
        loop {
            let now = Instant::now();
            if let Some(cause) = self.cause_locked(&state, now) {
                return Some(cause);
            }
            if until.is_some_and(|u| now >= u) {
                return None;
            }
            let wake = match (self.inner.deadline, until) {
                (Some(d), Some(u)) => Some(d.min(u)),
                (d, u) => d.or(u),
            };
            state = match wake {
                Some(wake) => match self.inner.changed.wait_timeout(state, wake - now) {
                    Ok((guard, _)) => guard,
                    Err(poisoned) => poisoned.into_inner().0,
                },
                None => self
                    .inner
                    .changed
                    .wait(state)
                    .unwrap_or_else(|poisoned| poisoned.into_inner()),
            };
        }
    }

    fn cause_locked(&self, state: &State, now: Instant) -> Option<Cancelled> {
        if state.cause.is_some() {
            return state.cause;
        }
        match self.inner.deadline {
            Some(d) if now >= d => Some(Cancelled::DeadlineExceeded),
            _ => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // State is a single Option; a panicking holder cannot leave it torn.
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn background_token_never_fires() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let until = Instant::now() + Duration::from_millis(10);
        assert_eq!(token.wait_until(Some(until)), None);
        assert!(Instant::now() >= until);
    }

    #[test]
    fn cancel_is_seen_by_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        other.cancel();
        assert_eq!(token.cause(), Some(Cancelled::Cancelled));
        assert_eq!(
            token.wait_until(Some(Instant::now() + Duration::from_secs(60))),
            Some(Cancelled::Cancelled)
        );
    }

    #[test]
    fn cancel_wakes_waiter() {
        let token = CancelToken::new();
        let remote = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });
        let start = Instant::now();
        let cause = token.wait_until(Some(start + Duration::from_secs(30)));
        handle.join().unwrap();
        assert_eq!(cause, Some(Cancelled::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(30));
    }

    #[test]
    fn deadline_fires_before_wait_ends() {
        let token = CancelToken::with_timeout(Duration::from_millis(10));
        let cause = token.wait_until(Some(Instant::now() + Duration::from_secs(30)));
        assert_eq!(cause, Some(Cancelled::DeadlineExceeded));
        assert!(token.is_cancelled());
    }

    #[test]
    fn unrepresentable_timeout_never_expires() {
        let token = CancelToken::with_timeout(Duration::MAX);
        assert_eq!(token.deadline(), None);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn open_ended_wait_returns_on_cancel() {
        let token = CancelToken::new();
        let remote = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });
        assert_eq!(token.wait_until(None), Some(Cancelled::Cancelled));
        handle.join().unwrap();
    }

    #[test]
    fn explicit_cancel_wins_over_later_deadline() {
        let token = CancelToken::with_timeout(Duration::from_secs(60));
        token.cancel();
        assert_eq!(token.cause(), Some(Cancelled::Cancelled));
    }
}
