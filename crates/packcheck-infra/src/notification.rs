//! Notification sinks: console output and an in-memory recorder

use packcheck_domain::model::Notification;
use packcheck_domain::repository::NotificationSink;
use packcheck_types::Severity;

/// Prints notifications to stderr, one line each
#[derive(Debug, Default)]
pub struct ConsoleSink {
    quiet: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only warnings and errors are printed
    pub fn quiet() -> Self {
        Self { quiet: true }
    }
}

impl NotificationSink for ConsoleSink {
    fn notify(&mut self, notification: &Notification) {
        if self.quiet && matches!(notification.severity, Severity::Info | Severity::Success) {
            return;
        }
        if notification.description.is_empty() {
            eprintln!("[{}] {}", notification.severity.label(), notification.title);
        } else {
            eprintln!(
                "[{}] {}: {}",
                notification.severity.label(),
                notification.title,
                notification.description
            );
        }
    }
}

/// Keeps every notification it receives
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub received: Vec<Notification>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_key(&self, key: &str) -> usize {
        self.received.iter().filter(|n| n.dedupe_key == key).count()
    }

    pub fn with_severity(&self, severity: Severity) -> Vec<&Notification> {
        self.received.iter().filter(|n| n.severity == severity).collect()
    }
}

impl NotificationSink for MemorySink {
    fn notify(&mut self, notification: &Notification) {
        self.received.push(notification.clone());
    }
}
