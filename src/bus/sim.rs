use crate::bus::OutputLine;
use crate::error::AppError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Ordered record of every level change across a set of lines.
pub type Journal = Arc<Mutex<Vec<(&'static str, bool)>>>;

/// In-memory output line. Clones share the same level, so a clone kept by
/// the caller observes what the owner drives.
#[derive(Debug, Clone)]
pub struct SimLine {
    label: &'static str,
    level: Arc<AtomicBool>,
    faulty: Arc<AtomicBool>,
    journal: Journal,
}

impl SimLine {
    pub fn new(label: &'static str) -> Self {
        Self::with_journal(label, Journal::default())
    }

    pub fn with_journal(label: &'static str, journal: Journal) -> Self {
        Self {
            label,
            level: Arc::new(AtomicBool::new(false)),
            faulty: Arc::new(AtomicBool::new(false)),
            journal,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn is_high(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }

    /// Make subsequent writes fail, as a shorted or unclaimed pin would.
    pub fn set_faulty(&self, faulty: bool) {
        self.faulty.store(faulty, Ordering::SeqCst);
    }

    fn drive(&mut self, high: bool) -> Result<(), AppError> {
        if self.faulty.load(Ordering::SeqCst) {
            return Err(AppError::Actuator(format!("{} line not responding", self.label)));
        }
        let previous = self.level.swap(high, Ordering::SeqCst);
        if previous != high {
            debug!(line = self.label, high, "Simulated line changed");
        }
        if let Ok(mut journal) = self.journal.lock() {
            journal.push((self.label, high));
        }
        Ok(())
    }
}

impl OutputLine for SimLine {
    fn set_high(&mut self) -> Result<(), AppError> {
        self.drive(true)
    }

    fn set_low(&mut self) -> Result<(), AppError> {
        self.drive(false)
    }
}
