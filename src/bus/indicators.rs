use crate::bus::OutputLine;
use crate::error::AppError;
use crate::estimation::ProximityBand;
use tracing::{debug, error};

/// Three indicator outputs, one per proximity band. At most one is driven
/// high at a time; all are driven low when the bank is dropped.
pub struct IndicatorBank<L: OutputLine> {
    near: L,
    mid: L,
    far: L,
    active: Option<ProximityBand>,
}

impl<L: OutputLine> IndicatorBank<L> {
    /// Take ownership of the lines and switch all of them off.
    pub fn new(near: L, mid: L, far: L) -> Result<Self, AppError> {
        let mut bank = Self {
            near,
            mid,
            far,
            active: None,
        };
        bank.all_off()?;
        Ok(bank)
    }

    pub fn active(&self) -> Option<ProximityBand> {
        self.active
    }

    /// Light the line for `band`. The other two are cleared first; if any
    /// clear fails the target is left untouched so two lines are never high.
    pub fn show(&mut self, band: ProximityBand) -> Result<(), AppError> {
        let mut first_err = None;
        for other in ProximityBand::ALL.into_iter().filter(|b| *b != band) {
            if let Err(err) = self.line_mut(other).set_low()
                && first_err.is_none()
            {
                first_err = Some(err);
            }
        }
        if let Some(err) = first_err {
            self.active = None;
            return Err(err);
        }

        if let Err(err) = self.line_mut(band).set_high() {
            self.active = None;
            return Err(err);
        }
        if self.active != Some(band) {
            debug!(%band, "Indicator switched");
        }
        self.active = Some(band);
        Ok(())
    }

    /// Drive every line low. Attempts all three and reports the first failure.
    pub fn all_off(&mut self) -> Result<(), AppError> {
        let mut first_err = None;
        for band in ProximityBand::ALL {
            if let Err(err) = self.line_mut(band).set_low()
                && first_err.is_none()
            {
                first_err = Some(err);
            }
        }
        self.active = None;
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn line_mut(&mut self, band: ProximityBand) -> &mut L {
        match band {
            ProximityBand::Near => &mut self.near,
            ProximityBand::Mid => &mut self.mid,
            ProximityBand::Far => &mut self.far,
        }
    }
}

impl<L: OutputLine> Drop for IndicatorBank<L> {
    fn drop(&mut self) {
        if let Err(err) = self.all_off() {
            error!(error = %err, "Failed to switch indicators off on release");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::sim::{Journal, SimLine};
    use std::sync::Arc;

    fn sim_bank(journal: &Journal) -> (IndicatorBank<SimLine>, [SimLine; 3]) {
        let near = SimLine::with_journal("near", Arc::clone(journal));
        let mid = SimLine::with_journal("mid", Arc::clone(journal));
        let far = SimLine::with_journal("far", Arc::clone(journal));
        let observers = [near.clone(), mid.clone(), far.clone()];
        let bank = IndicatorBank::new(near, mid, far).expect("sim lines never fail");
        (bank, observers)
    }

    fn levels(observers: &[SimLine; 3]) -> [bool; 3] {
        [
            observers[0].is_high(),
            observers[1].is_high(),
            observers[2].is_high(),
        ]
    }

    #[test]
    fn show_activates_exactly_the_target_line() -> Result<(), AppError> {
        let journal = Journal::default();
        let (mut bank, observers) = sim_bank(&journal);

        bank.show(ProximityBand::Near)?;
        assert_eq!(levels(&observers), [true, false, false]);

        bank.show(ProximityBand::Mid)?;
        assert_eq!(levels(&observers), [false, true, false]);

        bank.show(ProximityBand::Far)?;
        assert_eq!(levels(&observers), [false, false, true]);
        assert_eq!(bank.active(), Some(ProximityBand::Far));
        Ok(())
    }

    #[test]
    fn never_more_than_one_line_high_between_writes() -> Result<(), AppError> {
        let journal = Journal::default();
        let (mut bank, _observers) = sim_bank(&journal);

        for band in [
            ProximityBand::Far,
            ProximityBand::Near,
            ProximityBand::Mid,
            ProximityBand::Mid,
            ProximityBand::Near,
        ] {
            bank.show(band)?;
        }

        let entries = journal.lock().expect("journal lock").clone();
        let mut high = std::collections::HashSet::new();
        for (label, level) in entries {
            if level {
                high.insert(label);
            } else {
                high.remove(label);
            }
            assert!(high.len() <= 1, "two lines high at once: {high:?}");
        }
        Ok(())
    }

    #[test]
    fn failed_clear_leaves_target_off() -> Result<(), AppError> {
        let journal = Journal::default();
        let (mut bank, observers) = sim_bank(&journal);
        bank.show(ProximityBand::Near)?;

        observers[0].set_faulty(true);
        let result = bank.show(ProximityBand::Far);

        assert!(matches!(result, Err(AppError::Actuator(_))));
        assert!(!observers[2].is_high());
        assert_eq!(bank.active(), None);
        Ok(())
    }

    #[test]
    fn drop_switches_everything_off() -> Result<(), AppError> {
        let journal = Journal::default();
        let (mut bank, observers) = sim_bank(&journal);
        bank.show(ProximityBand::Mid)?;
        assert!(observers[1].is_high());

        drop(bank);

        assert_eq!(levels(&observers), [false, false, false]);
        Ok(())
    }

    #[test]
    fn all_off_is_idempotent() -> Result<(), AppError> {
        let journal = Journal::default();
        let (mut bank, observers) = sim_bank(&journal);
        bank.show(ProximityBand::Far)?;

        bank.all_off()?;
        bank.all_off()?;

        assert_eq!(levels(&observers), [false, false, false]);
        Ok(())
    }
}
