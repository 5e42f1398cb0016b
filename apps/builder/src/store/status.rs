use chrono::{DateTime, Utc};
use serde::Serialize;

/// What the save indicator shows, derived from the store's bookkeeping flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SaveStatus {
    Idle,
    Unsaved,
    Saving,
    Saved { at: DateTime<Utc> },
}

impl SaveStatus {
    /// Precedence: saving, then unsaved edits, then last confirmed save.
    pub fn from_flags(is_saving: bool, is_dirty: bool, last_saved: Option<DateTime<Utc>>) -> Self {
        if is_saving {
            SaveStatus::Saving
        } else if is_dirty {
            SaveStatus::Unsaved
        } else if let Some(at) = last_saved {
            SaveStatus::Saved { at }
        } else {
            SaveStatus::Idle
        }
    }

    pub fn describe(&self, now: DateTime<Utc>) -> Option<String> {
        match self {
            SaveStatus::Idle => None,
            SaveStatus::Unsaved => Some("Unsaved changes".to_string()),
            SaveStatus::Saving => Some("Saving…".to_string()),
            SaveStatus::Saved { at } => Some(format!("Saved {}", relative_age(*at, now))),
        }
    }
}

fn relative_age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds().max(0);
    let (n, unit) = match secs {
        0..=59 => return "less than a minute ago".to_string(),
        60..=3_599 => (secs / 60, "minute"),
        3_600..=86_399 => (secs / 3_600, "hour"),
        _ => (secs / 86_400, "day"),
    };
    let plural = if n == 1 { "" } else { "s" };
    format!("{n} {unit}{plural} ago")
}
