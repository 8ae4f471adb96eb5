use crate::error::AppError;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::warn;

pub const DEFAULT_LOG_PATH: &str = "distance_log.csv";

const RECORD_TIMESTAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Append-only record of distance samples, one `<timestamp>, <cm>` per line.
pub struct DistanceLog<W: Write> {
    sink: W,
    offset: UtcOffset,
}

impl DistanceLog<File> {
    /// Open (or create) the log file for appending. Existing records are kept.
    ///
    /// `offset` is fixed for the life of the log. The local offset can only be
    /// queried soundly before other threads exist, so a daylight-saving change
    /// is picked up on the next start.
    pub fn open(path: impl AsRef<Path>, offset: UtcOffset) -> Result<Self, AppError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file, offset))
    }
}

impl<W: Write> DistanceLog<W> {
    pub fn new(sink: W, offset: UtcOffset) -> Self {
        Self { sink, offset }
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Append one record stamped with the current local time. Failures are
    /// reported as warnings and never returned.
    pub fn record(&mut self, distance_cm: f64) {
        let now = OffsetDateTime::now_utc().to_offset(self.offset);
        if let Err(err) = self.append(now, distance_cm) {
            warn!(error = %err, distance_cm, "Failed to append distance record");
        }
    }

    pub fn append(&mut self, at: OffsetDateTime, distance_cm: f64) -> Result<(), AppError> {
        let line = format_record(at, distance_cm)?;
        self.sink.write_all(line.as_bytes())?;
        self.sink.flush()?;
        Ok(())
    }
}

pub fn format_record(at: OffsetDateTime, distance_cm: f64) -> Result<String, AppError> {
    let timestamp = at
        .format(RECORD_TIMESTAMP)
        .map_err(|err| AppError::LogWrite(std::io::Error::other(err)))?;
    Ok(format!("{timestamp}, {distance_cm:.2}\n"))
}
