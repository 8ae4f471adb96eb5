use crate::bus::InputLine;
use crate::error::{AppError, EchoEdge};
use crate::sensor::Rangefinder;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Echo input that replays a fixed level sequence, repeating the last one.
pub struct ScriptedEcho {
    levels: VecDeque<bool>,
    last: bool,
}

impl ScriptedEcho {
    pub fn new(levels: impl IntoIterator<Item = bool>) -> Self {
        Self {
            levels: levels.into_iter().collect(),
            last: false,
        }
    }
}

impl InputLine for ScriptedEcho {
    fn is_high(&mut self) -> bool {
        if let Some(level) = self.levels.pop_front() {
            self.last = level;
        }
        self.last
    }
}

/// Echo input that goes high `delay` after the first poll and stays high
/// for `width`.
pub struct TimedEcho {
    delay: Duration,
    width: Duration,
    first_poll: Option<Instant>,
}

impl TimedEcho {
    pub fn new(delay: Duration, width: Duration) -> Self {
        Self {
            delay,
            width,
            first_poll: None,
        }
    }
}

impl InputLine for TimedEcho {
    fn is_high(&mut self) -> bool {
        let start = *self.first_poll.get_or_insert_with(Instant::now);
        let elapsed = start.elapsed();
        elapsed >= self.delay && elapsed < self.delay + self.width
    }
}

#[derive(Debug, Clone, Copy)]
pub enum MockEchoBehavior {
    /// Return this pulse width immediately.
    Pulse(Duration),
    /// Report a missing rising edge immediately.
    Timeout,
    /// Block for the given time, then report a missing rising edge.
    Stall(Duration),
}

/// Rangefinder that replays scripted outcomes, then repeats `fallback`.
pub struct MockRangefinder {
    behaviors: VecDeque<MockEchoBehavior>,
    fallback: MockEchoBehavior,
    triggers: Arc<AtomicUsize>,
}

impl MockRangefinder {
    pub fn new(behaviors: impl IntoIterator<Item = MockEchoBehavior>) -> Self {
        Self {
            behaviors: behaviors.into_iter().collect(),
            fallback: MockEchoBehavior::Timeout,
            triggers: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_fallback(mut self, fallback: MockEchoBehavior) -> Self {
        self.fallback = fallback;
        self
    }

    /// Shared counter of `measure` calls, readable after the mock is moved.
    pub fn trigger_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.triggers)
    }
}

impl Rangefinder for MockRangefinder {
    fn measure(&mut self) -> Result<Duration, AppError> {
        self.triggers.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behaviors.pop_front().unwrap_or(self.fallback);
        match behavior {
            MockEchoBehavior::Pulse(width) => Ok(width),
            MockEchoBehavior::Timeout => Err(AppError::SensorTimeout {
                edge: EchoEdge::Rising,
                timeout: Duration::ZERO,
            }),
            MockEchoBehavior::Stall(timeout) => {
                std::thread::sleep(timeout);
                Err(AppError::SensorTimeout {
                    edge: EchoEdge::Rising,
                    timeout,
                })
            }
        }
    }
}
