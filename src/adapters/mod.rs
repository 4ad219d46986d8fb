#[cfg(feature = "postgres")]
pub mod postgres;

pub mod memory;

pub use memory::MemoryAdapter;

use async_trait::async_trait;
use ledger::{LedgerEntry, Track};
use uuid::Uuid;

use crate::{
    Error,
    announcement::Announcement,
    caller::Account,
    distribution::DistributionRun,
    module_config::TemporalModule,
    notification::Notification,
    plan::ExecutionPlan,
    request::{Request, RequestFilter},
};

/// Which ledger entries to load.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EntryFilter {
    pub account: Option<Uuid>,
    pub track: Option<Track>,
}

impl EntryFilter {
    pub fn track(track: Track) -> Self {
        Self {
            account: None,
            track: Some(track),
        }
    }

    pub fn account(account: Uuid, track: Track) -> Self {
        Self {
            account: Some(account),
            track: Some(track),
        }
    }

    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        self.account.is_none_or(|a| a == entry.account)
            && self.track.is_none_or(|t| t == entry.track)
    }
}

/// -----------------------------
/// Adapter contract
/// -----------------------------

#[async_trait]
pub trait Adapter: Send + Sync {
    /// Apply every operation of `plan` atomically.
    /// Implementors MUST:
    /// 1. BEGIN a transaction
    /// 2. Check each operation's guard (unique pending request, pending-only
    ///    transition, owner-and-pending delete, unique run id) and return
    ///    `Error::Conflict` when one fails
    /// 3. COMMIT on success, ROLLBACK on any error
    async fn execute_plan(&self, plan: &ExecutionPlan) -> Result<(), Error>;

    // ==================== Requests ====================
    async fn fetch_request(&self, id: Uuid) -> Result<Option<Request>, Error>;
    /// Newest first.
    async fn query_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, Error>;

    // ==================== Ledger ====================
    /// Oldest first.
    async fn entries(&self, filter: EntryFilter) -> Result<Vec<LedgerEntry>, Error>;

    // ==================== Notifications ====================
    /// Newest first.
    async fn notifications_for(&self, account: Uuid) -> Result<Vec<Notification>, Error>;
    async fn fetch_notification(&self, id: Uuid) -> Result<Option<Notification>, Error>;
    async fn mark_notification_read(&self, id: Uuid) -> Result<(), Error>;
    async fn delete_notification(&self, id: Uuid) -> Result<(), Error>;

    // ==================== Announcements ====================
    async fn insert_announcement(&self, announcement: Announcement) -> Result<(), Error>;
    /// Insert the announcement and one notification per account in a single
    /// transaction. Returns the number of accounts notified.
    async fn broadcast_announcement(&self, announcement: Announcement) -> Result<u64, Error>;
    async fn update_announcement(&self, announcement: Announcement) -> Result<(), Error>;
    async fn delete_announcement(&self, id: Uuid) -> Result<bool, Error>;
    async fn fetch_announcement(&self, id: Uuid) -> Result<Option<Announcement>, Error>;
    /// Newest first.
    async fn announcements(&self) -> Result<Vec<Announcement>, Error>;

    // ==================== Temporal module ====================
    async fn temporal_module(&self) -> Result<Option<TemporalModule>, Error>;
    async fn save_temporal_module(&self, module: TemporalModule) -> Result<(), Error>;

    // ==================== Accounts ====================
    async fn accounts(&self) -> Result<Vec<Account>, Error>;
    async fn upsert_account(&self, account: Account) -> Result<(), Error>;

    // ==================== Distribution runs ====================
    async fn fetch_run(&self, id: Uuid) -> Result<Option<DistributionRun>, Error>;
    /// Newest first.
    async fn runs(&self, track: Track) -> Result<Vec<DistributionRun>, Error>;
}
