//! Collaborators currently looking at a tournament.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Users not seen for this long drop out of the active list.
pub const PRESENCE_TIMEOUT_MINUTES: i64 = 5;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ActiveUser {
    pub name: String,
    pub last_seen: DateTime<Utc>,
}

/// Last-seen time per user name.
#[derive(Clone, Debug)]
pub struct Presence {
    last_seen: HashMap<String, DateTime<Utc>>,
    timeout: Duration,
}

impl Default for Presence {
    fn default() -> Self {
        Self::new()
    }
}

impl Presence {
    pub fn new() -> Self {
        Self::with_timeout(Duration::minutes(PRESENCE_TIMEOUT_MINUTES))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            last_seen: HashMap::new(),
            timeout,
        }
    }

    /// Record `user` as seen at `now` and forget everyone who timed out.
    pub fn see(&mut self, user: &str, now: DateTime<Utc>) {
        self.last_seen.insert(user.to_string(), now);
        self.prune(now);
    }

    pub fn prune(&mut self, now: DateTime<Utc>) {
        let timeout = self.timeout;
        self.last_seen.retain(|_, seen| now - *seen < timeout);
    }

    pub fn is_active(&self, user: &str, now: DateTime<Utc>) -> bool {
        self.last_seen
            .get(user)
            .is_some_and(|seen| now - *seen < self.timeout)
    }

    /// Users seen within the timeout, by name.
    pub fn active(&self, now: DateTime<Utc>) -> Vec<ActiveUser> {
        let mut users: Vec<ActiveUser> = self
            .last_seen
            .iter()
            .filter(|(_, seen)| now - **seen < self.timeout)
            .map(|(name, seen)| ActiveUser {
                name: name.clone(),
                last_seen: *seen,
            })
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        users
    }
}
