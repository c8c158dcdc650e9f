//! Durable poll progress: the feed cursor, when the feed was last polled and
//! how many classification requests were spent in the current month.

use crate::path_utils::write_atomically;
use chrono::DateTime;
use chrono::Datelike;
use chrono::Local;
use chrono::NaiveDate;
use chrono::NaiveTime;
use chrono::TimeZone;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::warn;

/// A calendar month in local time, the unit the quota resets on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BillingMonth {
    pub year: i32,
    pub month: u32,
}

impl BillingMonth {
    pub fn of<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        let local = at.with_timezone(&Local);
        Self {
            year: local.year(),
            month: local.month(),
        }
    }

    pub fn next(self) -> Self {
        if self.month >= 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Local midnight on the first day of this month.
    pub fn start(self) -> DateTime<Local> {
        let date = NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default();
        let naive = date.and_time(NaiveTime::MIN);
        Local
            .from_local_datetime(&naive)
            .earliest()
            .unwrap_or_else(|| Local.from_utc_datetime(&naive))
    }
}

impl fmt::Display for BillingMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Classification requests spent in `month`. A counter without a month has
/// never been reconciled against the clock and is adopted by the current
/// month on first use instead of being reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaCounter {
    pub spent: u32,
    #[serde(default)]
    pub month: Option<BillingMonth>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistedState {
    /// Id of the newest file whose processing is complete. `None` walks the
    /// feed from the beginning.
    pub cursor: Option<String>,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub quota: QuotaCounter,
}

/// On-disk shape. Accepts the camelCase keys written by earlier releases
/// (`lastCheckedFile`, `lastChecked` in epoch millis, `requestedCount`) and
/// ignores anything it does not recognise.
#[derive(Debug, Default, Deserialize)]
struct StateFile {
    #[serde(default, alias = "lastCheckedFile")]
    cursor: Option<String>,
    #[serde(default)]
    last_polled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    quota: Option<QuotaCounter>,
    #[serde(default, rename = "lastChecked")]
    legacy_last_checked_ms: Option<i64>,
    #[serde(default, rename = "requestedCount")]
    legacy_requested_count: Option<u32>,
}

impl From<StateFile> for PersistedState {
    fn from(file: StateFile) -> Self {
        let last_polled_at = file.last_polled_at.or_else(|| {
            file.legacy_last_checked_ms
                .filter(|ms| *ms > 0)
                .and_then(DateTime::<Utc>::from_timestamp_millis)
        });
        let quota = file.quota.unwrap_or_else(|| QuotaCounter {
            spent: file.legacy_requested_count.unwrap_or(0),
            month: last_polled_at.as_ref().map(BillingMonth::of),
        });
        Self {
            cursor: file.cursor.filter(|cursor| !cursor.is_empty()),
            last_polled_at,
            quota,
        }
    }
}

/// Loads and atomically saves [`PersistedState`] at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: a missing file is a first run, and an unreadable or
    /// corrupt one is logged and treated the same way.
    pub fn load(&self) -> PersistedState {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state file, starting fresh");
                return PersistedState::default();
            }
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    "failed to read state file, starting from the beginning of the feed: {err}"
                );
                return PersistedState::default();
            }
        };

        match serde_json::from_str::<StateFile>(&raw) {
            Ok(file) => file.into(),
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    "state file is corrupt, starting from the beginning of the feed: {err}"
                );
                PersistedState::default()
            }
        }
    }

    pub fn save(&self, state: &PersistedState) -> io::Result<()> {
        let json = serde_json::to_string_pretty(state).map_err(io::Error::other)?;
        write_atomically(&self.path, &json)?;
        debug!(
            cursor = state.cursor.as_deref(),
            spent = state.quota.spent,
            "saved state"
        );
        Ok(())
    }
}
