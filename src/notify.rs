//! User-facing notifications.
//!
//! Operations report what happened (success, failure, "under computation")
//! through a [`Notifier`]. Notifications go to **stderr** so stdout stays
//! parseable for scripts.
//!
//! Severity follows the kind of operation:
//!
//! | Severity | Emitted when |
//! |----------|--------------|
//! | `info` | informational messages (logout, nothing to do) |
//! | `success` | a mutation completed |
//! | `warning` | a mutation started a long-running server job |
//! | `error` | validation failed or the server call failed |

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::sync::Mutex;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Receives notifications emitted by operations.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Human-friendly notifications on stderr: `[warning] Feature sbert under computation`.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notification: Notification) {
        let line = format!(
            "[{}] {}\n",
            notification.severity.as_str(),
            notification.message
        );
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable notifications: one JSON object per line on stderr.
pub struct JsonNotifier;

impl Notifier for JsonNotifier {
    fn notify(&self, notification: Notification) {
        let obj = serde_json::json!({
            "event": "notification",
            "severity": notification.severity,
            "message": notification.message,
            "at": notification.at.to_rfc3339(),
        });
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// Drops every notification.
pub struct NoNotifier;

impl Notifier for NoNotifier {
    fn notify(&self, _notification: Notification) {}
}

/// Keeps notifications in memory; used by tests and embedders that render
/// them themselves.
#[derive(Default)]
pub struct MemoryNotifier {
    received: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns and clears everything received so far.
    pub fn take(&self) -> Vec<Notification> {
        match self.received.lock() {
            Ok(mut received) => std::mem::take(&mut *received),
            Err(_) => Vec::new(),
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.received
            .lock()
            .map(|r| r.iter().filter(|n| n.severity == severity).count())
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.received.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        if let Ok(mut received) = self.received.lock() {
            received.push(notification);
        }
    }
}

/// Notification mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NotifyMode {
    Off,
    Human,
    Json,
}

impl NotifyMode {
    /// Human output when stderr is a TTY, JSON lines otherwise.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            NotifyMode::Human
        } else {
            NotifyMode::Json
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "off" => Some(NotifyMode::Off),
            "human" => Some(NotifyMode::Human),
            "json" => Some(NotifyMode::Json),
            _ => None,
        }
    }

    pub fn notifier(&self) -> Box<dyn Notifier> {
        match self {
            NotifyMode::Off => Box::new(NoNotifier),
            NotifyMode::Human => Box::new(StderrNotifier),
            NotifyMode::Json => Box::new(JsonNotifier),
        }
    }
}
