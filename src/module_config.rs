use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Note stored when an administrator saves without a description.
pub const DEFAULT_CONFIG_NOTE: &str = "Configuration updated from the admin panel";

/// Switch and labels for the temporal reporting track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemporalModule {
    pub active: bool,
    pub title: String,
    pub description: String,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl TemporalModule {
    /// Disabled module, used until an administrator saves a configuration.
    pub fn disabled(title: &str) -> Self {
        Self {
            active: false,
            title: title.to_string(),
            description: String::new(),
            updated_by: None,
            updated_at: Utc::now(),
        }
    }
}
