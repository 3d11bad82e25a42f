use std::time::{Duration, Instant};

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// One-shot timer which never blocks, it only compares instants.
#[derive(Debug, Default)]
pub struct SimpleTimer {
    started: Option<Instant>,
    duration: Duration,
}

impl SimpleTimer {
    pub fn start(&mut self, now: Instant, duration: Duration) {
        self.started = Some(now);
        self.duration = duration;
    }

    pub fn stop(&mut self) {
        self.started = None;
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    pub fn is_timeout(&self, now: Instant) -> bool {
        match self.started {
            Some(started) => now.saturating_duration_since(started) >= self.duration,
            None => false,
        }
    }
}
