//! Timer that fires immediately and records every delay it was asked for.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use persevere::retry::{Timer, TimerSignal};

#[derive(Debug, Default)]
pub struct FakeTimer {
    requested: Mutex<Vec<Duration>>,
}

impl FakeTimer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn requested(&self) -> Vec<Duration> {
        self.requested.lock().unwrap().clone()
    }
}

impl Timer for FakeTimer {
    fn after(&self, delay: Duration) -> TimerSignal {
        self.requested.lock().unwrap().push(delay);
        TimerSignal::fired()
    }
}
