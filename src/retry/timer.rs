//! One-shot wake-up signals used to wait out backoff delays.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Handle that becomes ready once its instant has passed.
///
/// A delay too large to represent as an `Instant` yields a signal that never
/// fires; only cancellation ends such a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSignal {
    fires_at: Option<Instant>,
}

impl TimerSignal {
    pub fn at(fires_at: Instant) -> Self {
        Self {
            fires_at: Some(fires_at),
        }
    }

    /// Signal ready `delay` from now, or never if that instant overflows.
    pub fn after_delay(delay: Duration) -> Self {
        Instant::now()
            .checked_add(delay)
            .map_or_else(Self::never, Self::at)
    }

    /// Signal that is already ready.
    pub fn fired() -> Self {
        Self::at(Instant::now())
    }

    pub fn never() -> Self {
        Self { fires_at: None }
    }

    /// When the signal becomes ready; `None` if it never does.
    pub fn fires_at(&self) -> Option<Instant> {
        self.fires_at
    }

    pub fn is_fired(&self) -> bool {
        self.fires_at.is_some_and(|at| Instant::now() >= at)
    }

    /// Block the current thread until the signal is ready.
    pub fn wait(&self) {
        let Some(at) = self.fires_at else {
            loop {
                std::thread::park();
            }
        };
        let now = Instant::now();
        if at > now {
            std::thread::sleep(at - now);
        }
    }
}

/// Source of wake-up signals. Substitute a fake in tests to make waits instant.
pub trait Timer: Send + Sync {
    fn after(&self, delay: Duration) -> TimerSignal;
}

/// Lazily armed wall-clock timer.
///
/// The first `after` call arms the timer; every later or concurrent call on
/// the same instance gets that same signal, whatever duration it asks for.
/// Build a new `DefaultTimer` to arm again.
#[derive(Debug, Default)]
pub struct DefaultTimer {
    signal: OnceLock<TimerSignal>,
}

impl DefaultTimer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Timer for DefaultTimer {
    fn after(&self, delay: Duration) -> TimerSignal {
        if let Some(signal) = self.signal.get() {
            return *signal;
        }
        // Racing callers block here until one of them has stored the signal.
        *self
            .signal
            .get_or_init(|| TimerSignal::after_delay(delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn first_call_arms_later_calls_share() {
        let timer = DefaultTimer::new();
        let first = timer.after(Duration::from_millis(5));
        let second = timer.after(Duration::from_secs(3600));
        assert_eq!(first, second);
        first.wait();
        assert!(second.is_fired());
    }

    #[test]
    fn concurrent_callers_observe_one_signal() {
        let timer = Arc::new(DefaultTimer::new());
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let timer = Arc::clone(&timer);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    timer.after(Duration::from_millis(10 + i))
                })
            })
            .collect();
        let signals: Vec<TimerSignal> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(signals.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn new_timer_rearms() {
        let a = DefaultTimer::new().after(Duration::from_secs(1));
        thread::sleep(Duration::from_millis(2));
        let b = DefaultTimer::new().after(Duration::from_secs(1));
        assert!(b.fires_at() > a.fires_at());
    }

    #[test]
    fn fired_signal_is_ready() {
        assert!(TimerSignal::fired().is_fired());
    }

    #[test]
    fn unrepresentable_delay_never_fires() {
        let signal = DefaultTimer::new().after(Duration::MAX);
        assert_eq!(signal, TimerSignal::never());
        assert_eq!(signal.fires_at(), None);
        assert!(!signal.is_fired());
    }
}
