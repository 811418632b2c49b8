//! Notification dedup gate
//!
//! Alerts are keyed by meaning (item, box, condition), not by text. A key
//! shown inside the cooldown window is suppressed, and an exact duplicate
//! still on screen is suppressed regardless of the cooldown.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use packcheck_domain::model::Notification;

use crate::config::millis;

#[derive(Debug)]
struct Shown {
    key: String,
    title: String,
    description: String,
    until: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NotificationGate {
    cooldown: Duration,
    last_by_key: HashMap<String, DateTime<Utc>>,
    on_screen: Vec<Shown>,
}

impl NotificationGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_by_key: HashMap::new(),
            on_screen: Vec::new(),
        }
    }

    /// Whether `notification` should be shown at `now`; admitted
    /// notifications are recorded
    pub fn admit(&mut self, notification: &Notification, now: DateTime<Utc>) -> bool {
        self.on_screen.retain(|shown| shown.until > now);

        let duplicate_on_screen = self.on_screen.iter().any(|shown| {
            shown.key == notification.dedupe_key
                && shown.title == notification.title
                && shown.description == notification.description
        });
        if duplicate_on_screen {
            return false;
        }
        if let Some(last) = self.last_by_key.get(&notification.dedupe_key) {
            if now - *last < self.cooldown {
                return false;
            }
        }

        self.last_by_key.insert(notification.dedupe_key.clone(), now);
        let timeout = millis(notification.timeout_ms);
        self.on_screen.push(Shown {
            key: notification.dedupe_key.clone(),
            title: notification.title.clone(),
            description: notification.description.clone(),
            until: now + timeout,
        });
        true
    }

    pub fn reset(&mut self) {
        self.last_by_key.clear();
        self.on_screen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use packcheck_types::Severity;

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap() + Duration::milliseconds(ms)
    }

    fn alert(key: &str, description: &str) -> Notification {
        Notification::new(Severity::Error, "Weight mismatch", description).with_key(key)
    }

    #[test]
    fn test_same_key_suppressed_inside_cooldown() {
        let mut gate = NotificationGate::new(Duration::milliseconds(3000));
        assert!(gate.admit(&alert("weight:a", "0.95 kg"), t(0)));
        // Different text, same meaning
        assert!(!gate.admit(&alert("weight:a", "0.97 kg"), t(1000)));
        assert!(gate.admit(&alert("weight:b", "0.95 kg"), t(1000)));
        assert!(gate.admit(&alert("weight:a", "0.97 kg"), t(3000)));
    }

    #[test]
    fn test_exact_duplicate_blocked_while_on_screen() {
        let mut gate = NotificationGate::new(Duration::milliseconds(100));
        let long = alert("weight:a", "0.95 kg").with_timeout_ms(5000);
        assert!(gate.admit(&long, t(0)));
        assert!(!gate.admit(&long, t(1000)));
        assert!(gate.admit(&alert("weight:a", "1.10 kg"), t(1000)));
        assert!(gate.admit(&long, t(5000)));
    }

    #[test]
    fn test_reset_forgets_history() {
        let mut gate = NotificationGate::new(Duration::milliseconds(3000));
        assert!(gate.admit(&alert("k", "x"), t(0)));
        gate.reset();
        assert!(gate.admit(&alert("k", "x"), t(10)));
    }
}
