//! Logged sustainability actions.

use chrono::{DateTime, Local};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::db::KeyValueStore;
use crate::db::store::{ACTIONS_KEY, BADGES_KEY, load_json, save_json};
use crate::error::{ServiceError, ServiceResult};

use super::badges::{BadgeFilter, BadgeProgress, BadgeSummary, summarize, track_badge_progress};

const MIN_ACTION_LEN: usize = 3;
const MAX_ACTION_LEN: usize = 500;

/// Largest accepted upload, 5 MiB
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

const UPLOAD_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

static SUSPICIOUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"(?i)<script", r"(?i)javascript:", r"(?i)on\w+="]
        .iter()
        .map(|p| Regex::new(p).expect("suspicious pattern is valid"))
        .collect()
});

/// One entry of the action log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEntry {
    /// HTML-escaped description
    pub text: String,
    /// Local calendar date, `M/D/YYYY`
    pub date: String,
    pub timestamp: i64,
}

/// Whether `text` is acceptable as an action description
pub fn validate_action(text: &str) -> bool {
    let len = text.encode_utf16().count();
    if !(MIN_ACTION_LEN..=MAX_ACTION_LEN).contains(&len) {
        return false;
    }
    !SUSPICIOUS_PATTERNS.iter().any(|re| re.is_match(text))
}

/// Why an upload was refused
pub fn validate_upload(mime_type: &str, size: u64) -> Result<(), &'static str> {
    if !UPLOAD_MIME_TYPES.contains(&mime_type) {
        return Err("Invalid file type");
    }
    if size > MAX_UPLOAD_BYTES {
        return Err("File too large");
    }
    Ok(())
}

/// Escape text the way a browser serializes a text node
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

fn local_date(epoch_ms: i64) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|utc| utc.with_timezone(&Local).format("%-m/%-d/%Y").to_string())
        .unwrap_or_default()
}

/// Action log and badge progress, both kept in the shared store
pub struct ActionLog {
    pub(super) store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl ActionLog {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate, escape and append an action, then credit its badges
    pub fn add_action(&self, text: &str) -> ServiceResult<ActionEntry> {
        let text = text.trim();
        if !validate_action(text) {
            warn!(len = text.len(), "Rejected action description");
            return Err(ServiceError::InvalidRequest {
                message: "Please enter a valid action".to_string(),
            });
        }

        self.append(text)
    }

    /// Log an uploaded file as an action.
    ///
    /// Only the type and size are checked; the name is escaped but otherwise
    /// taken as given, and the file contents are not kept.
    pub fn add_upload(&self, file_name: &str, mime_type: &str, size: u64) -> ServiceResult<ActionEntry> {
        if let Err(reason) = validate_upload(mime_type, size) {
            warn!(mime_type = %mime_type, size, reason, "Rejected upload");
            return Err(ServiceError::InvalidRequest {
                message: reason.to_string(),
            });
        }
        self.append(&format!("Uploaded file: {}", file_name))
    }

    fn append(&self, text: &str) -> ServiceResult<ActionEntry> {
        let _guard = self.lock();
        let now = self.clock.now_ms();
        let entry = ActionEntry {
            text: escape_html(text),
            date: local_date(now),
            timestamp: now,
        };

        let mut actions: Vec<ActionEntry> =
            load_json(self.store.as_ref(), ACTIONS_KEY)?.unwrap_or_default();
        actions.push(entry.clone());
        save_json(self.store.as_ref(), ACTIONS_KEY, &actions)?;

        // Badges see the raw text, not the escaped one
        track_badge_progress(self.store.as_ref(), text)?;

        info!(total = actions.len(), "Action logged");
        Ok(entry)
    }

    /// All logged actions, oldest first
    pub fn actions(&self) -> ServiceResult<Vec<ActionEntry>> {
        Ok(load_json(self.store.as_ref(), ACTIONS_KEY)?.unwrap_or_default())
    }

    pub fn badge_summary(&self, filter: BadgeFilter) -> ServiceResult<BadgeSummary> {
        let progress: BadgeProgress =
            load_json(self.store.as_ref(), BADGES_KEY)?.unwrap_or_default();
        Ok(summarize(&progress, filter))
    }
}
