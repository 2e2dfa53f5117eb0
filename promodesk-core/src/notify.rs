// SPDX-License-Identifier: MIT

use std::sync::{Arc, Mutex};

use colored::Colorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success(message: &str) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.to_string(),
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.to_string(),
        }
    }

    pub fn interrupted() -> Self {
        Self {
            kind: NotificationKind::Interrupted,
            message: INTERRUPTED.to_string(),
        }
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            NotificationKind::Success => write!(f, "{}", self.message.green()),
            NotificationKind::Error => write!(f, "{}", self.message.red()),
            NotificationKind::Interrupted => write!(f, "{}", self.message.yellow()),
        }
    }
}

pub const INTERRUPTED: &str = "Operacja została przerwana";

pub fn deleted(count: usize) -> String {
    format!("Usunięto {count}")
}

pub fn not_deleted(count: usize) -> String {
    format!("Nie udało się usunąć {count}")
}

pub fn added(count: usize) -> String {
    format!("Dodano {count}")
}

pub fn saved() -> String {
    "Zapisano zmiany".to_string()
}

/// The toast channel of a screen.
pub trait Notifier: Send + Sync {
    fn notify(&self, n: Notification);
}

/// Keeps every notification, handy for tests and for printing a summary later.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    items: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn notifications(&self) -> Vec<Notification> {
        match self.items.lock() {
            Ok(items) => items.clone(),
            Err(e) => e.into_inner().clone(),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.notifications().into_iter().map(|n| n.message).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, n: Notification) {
        tracing::debug!(target: "notifier", kind=?n.kind, text=n.message, "Notify");
        match self.items.lock() {
            Ok(mut items) => items.push(n),
            Err(e) => e.into_inner().push(n),
        }
    }
}
