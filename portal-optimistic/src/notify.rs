//! User-facing notification side channel.
//!
//! The coordinator raises a [`Notification`] on remote failures and on a
//! few confirmed outcomes. What the UI does with it (toast, banner, log) is
//! up to the [`Notifier`] implementation.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

/// Visual style of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    #[default]
    Default,
    Success,
    Destructive,
    Info,
}

/// A `{title, description, variant}` payload for the notification surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: Variant,
}

impl Notification {
    pub fn new(title: impl Into<String>, description: impl Into<String>, variant: Variant) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant,
        }
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, Variant::Success)
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, Variant::Destructive)
    }

    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, Variant::Info)
    }
}

/// Receives notifications raised by the coordinator.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the tracing log. Used when no notifier is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: Notification) {
        match n.variant {
            Variant::Destructive => warn!(title = %n.title, "{}", n.description),
            _ => info!(title = %n.title, variant = ?n.variant, "{}", n.description),
        }
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    seen: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications received so far, oldest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Notifications of one variant.
    pub fn with_variant(&self, variant: Variant) -> Vec<Notification> {
        self.notifications()
            .into_iter()
            .filter(|n| n.variant == variant)
            .collect()
    }

    pub fn clear(&self) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}
