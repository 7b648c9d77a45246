use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::clock::Snapshot;
use crate::error::HistoryError;

/// One finished session, as appended to the history CSV.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub finished_at: DateTime<Local>,
    pub time_limit_min: Option<u32>,
    pub elapsed_secs: f64,
    pub cycles: u32,
    pub phase_secs: f64,
}

impl SessionRecord {
    pub fn from_snapshot(snapshot: &Snapshot, finished_at: DateTime<Local>) -> Self {
        Self {
            finished_at,
            time_limit_min: snapshot
                .time_limit_secs
                .map(|secs| u32::try_from(secs / 60).unwrap_or(u32::MAX)),
            elapsed_secs: (snapshot.session_elapsed_secs * 100.0).round() / 100.0,
            cycles: snapshot.cycles_completed,
            phase_secs: snapshot.phase_duration_secs,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionLog {
    path: PathBuf,
}

impl SessionLog {
    pub fn new() -> Result<Self, HistoryError> {
        AppDirs::history_path()
            .map(Self::with_path)
            .ok_or(HistoryError::NoStateDir)
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &SessionRecord) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // If the log doesn't exist yet, we need to emit a header
        let needs_header = !self.path.exists();

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }

    pub fn records(&self) -> Result<Vec<SessionRecord>, HistoryError> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let records = reader
            .deserialize()
            .collect::<Result<Vec<SessionRecord>, _>>()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Phase;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn snapshot(limit: Option<u64>) -> Snapshot {
        Snapshot {
            phase: Phase::Exhale,
            phase_elapsed_secs: 5.5,
            phase_duration_secs: 5.5,
            session_elapsed_secs: 121.0437,
            time_limit_secs: limit,
            cycles_completed: 11,
            running: false,
            complete: true,
        }
    }

    fn finished_at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 14, 7, 30, 0).unwrap()
    }

    #[test]
    fn record_from_snapshot() {
        let record = SessionRecord::from_snapshot(&snapshot(Some(120)), finished_at());
        assert_eq!(record.time_limit_min, Some(2));
        assert_eq!(record.elapsed_secs, 121.04);
        assert_eq!(record.cycles, 11);
        assert_eq!(record.phase_secs, 5.5);
    }

    #[test]
    fn append_writes_header_once() {
        let dir = tempdir().unwrap();
        let log = SessionLog::with_path(dir.path().join("nested").join("sessions.csv"));
        let first = SessionRecord::from_snapshot(&snapshot(Some(120)), finished_at());
        let second = SessionRecord::from_snapshot(&snapshot(None), finished_at());

        log.append(&first).unwrap();
        log.append(&second).unwrap();

        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(text.matches("finished_at").count(), 1);
        assert_eq!(text.lines().count(), 3);

        let records = log.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].time_limit_min, Some(2));
        assert_eq!(records[1].time_limit_min, None);
        assert_eq!(records[1].cycles, 11);
    }
}
