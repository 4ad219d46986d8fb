use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, notification::NotificationKind};

/// System-wide message published by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub kind: NotificationKind,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
}

impl Announcement {
    pub fn from_draft(draft: &AnnouncementDraft, created_by: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            title: draft.title.trim().to_string(),
            body: draft.body.trim().to_string(),
            kind: draft.kind,
            active: true,
            created_at: Utc::now(),
            expires_at: draft.expires_at,
            created_by,
        }
    }

    /// Active and not yet expired.
    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.is_none_or(|at| at > now)
    }
}

/// Admin input for creating or editing an announcement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnnouncementDraft {
    pub title: String,
    pub body: String,
    pub kind: NotificationKind,
    pub expires_at: Option<DateTime<Utc>>,
    /// Also push a notification to every account, atomically with the insert.
    #[serde(default)]
    pub broadcast: bool,
}

impl AnnouncementDraft {
    pub fn new(title: &str, body: &str, kind: NotificationKind) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            kind,
            expires_at: None,
            broadcast: false,
        }
    }

    pub fn broadcast(mut self) -> Self {
        self.broadcast = true;
        self
    }

    pub fn expiring_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("announcement title is required".to_string()));
        }
        if self.body.trim().is_empty() {
            return Err(Error::Validation("announcement body is required".to_string()));
        }
        Ok(())
    }
}
