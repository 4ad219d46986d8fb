use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Admin landing counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub investors: usize,
    /// Pending requests across both tracks.
    pub pending_requests: usize,
    /// Announcements currently visible to investors.
    pub active_announcements: usize,
    pub primary_principal: Decimal,
}
