//! # Capital Desk
//!
//! Back-office engine for an investor-relations capital desk. Investors file
//! deposit and withdrawal requests, administrators approve or reject them,
//! and periodic profit distributions credit every account on a track with an
//! equal share of a percentage of that track's principal.
//!
//! Balances are never stored. They are derived from the immutable ledger
//! entries in the [`ledger`] crate, so every screen reads the same numbers.
//!
//! ## Tracks
//!
//! Two independent ledgers run side by side: the primary track and the
//! temporal track. The temporal track can be switched off from the admin
//! panel, in which case investors cannot file requests against it.
//!
//! ## Atomicity
//!
//! Every multi-step write (approve, reject, withdraw, distribute) is built as
//! an [`ExecutionPlan`] in memory and handed to the adapter, which applies it
//! inside a single transaction. The plan carries its own guards: a request
//! is only resolved while it is still pending, and a distribution run id can
//! only be claimed once.
//!
//! ```rust,ignore
//! use capital_desk::{Desk, DeskConfig, adapters::postgres::PostgresAdapter};
//!
//! let config = DeskConfig::from_file("desk.toml")?.with_env_overrides()?;
//! let adapter = PostgresAdapter::from_pool(config.connect().await?);
//! adapter.init_schema().await?;
//!
//! let desk = Desk::with_config(Box::new(adapter), config);
//! let request = desk
//!     .submit_request(&investor, Track::Primary, RequestKind::Deposit, amount)
//!     .await?;
//! desk.approve(&admin, request.id).await?;
//! ```
//!
//! ## Feature flags
//!
//! | Flag       | Default | Description                 |
//! |------------|---------|-----------------------------|
//! | `postgres` | ✓       | PostgreSQL adapter via sqlx |

pub mod adapters;
pub mod announcement;
pub mod caller;
pub mod config;
pub mod distribution;
pub mod error;
pub mod module_config;
pub mod notification;
pub mod overview;
pub mod plan;
pub mod request;

pub use ledger;

use chrono::Utc;
use ledger::{
    Balance, Breakdown, LedgerEntry, MonthlyGain, Track, TrackSummary, compute_balance,
    monthly_gains,
};
use metrics::{counter, histogram};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use crate::adapters::{Adapter, EntryFilter, MemoryAdapter};
pub use crate::announcement::{Announcement, AnnouncementDraft};
pub use crate::caller::{Account, Caller, Role};
pub use crate::config::DeskConfig;
pub use crate::distribution::{
    Distribution, DistributionOutcome, DistributionPolicy, DistributionRun, plan_distribution,
    run_id_for,
};
pub use crate::error::Error;
pub use crate::module_config::{DEFAULT_CONFIG_NOTE, TemporalModule};
pub use crate::notification::{Notification, NotificationKind};
pub use crate::overview::Overview;
pub use crate::plan::{ExecutionPlan, Operation};
pub use crate::request::{
    MAX_REQUEST_AMOUNT, Request, RequestFilter, RequestKind, RequestState, Resolution,
    parse_request_amount, validate_request_amount,
};

/// The Desk is the entry point for every operation. Each call takes the
/// [`Caller`] explicitly; the desk keeps no session state.
#[derive(Clone)]
pub struct Desk {
    inner: Arc<CapitalDesk>,
}

pub struct CapitalDesk {
    adapter: Box<dyn Adapter>,
    config: DeskConfig,
}

impl Desk {
    pub fn new(adapter: Box<dyn Adapter>) -> Self {
        Self::with_config(adapter, DeskConfig::default())
    }

    pub fn with_config(adapter: Box<dyn Adapter>, config: DeskConfig) -> Self {
        Self {
            inner: Arc::new(CapitalDesk { adapter, config }),
        }
    }

    /// Connect to PostgreSQL, create the schema if needed and build a desk.
    #[cfg(feature = "postgres")]
    pub async fn connect(config: DeskConfig) -> Result<Self, Error> {
        let pool = config.connect().await?;
        let adapter = adapters::postgres::PostgresAdapter::from_pool(pool);
        adapter.init_schema().await?;
        Ok(Self::with_config(Box::new(adapter), config))
    }

    pub fn config(&self) -> &DeskConfig {
        &self.inner.config
    }

    pub fn adapter(&self) -> &dyn Adapter {
        self.inner.adapter.as_ref()
    }

    async fn execute(&self, plan: &ExecutionPlan, op: &'static str) -> Result<(), Error> {
        let result = self.inner.adapter.execute_plan(plan).await;
        counter!("desk.plan.executed",
            "op" => op,
            "status" => if result.is_ok() { "success" } else { "failed" }
        )
        .increment(1);
        result
    }

    async fn load_entries(
        &self,
        filter: EntryFilter,
        op: &'static str,
    ) -> Result<Vec<LedgerEntry>, Error> {
        let start = Instant::now();
        let entries = self.inner.adapter.entries(filter).await?;
        histogram!("desk.query.duration_ms",
            "op" => op
        )
        .record(start.elapsed().as_millis() as f64);
        Ok(entries)
    }

    async fn fetch_request_or_missing(&self, id: Uuid) -> Result<Request, Error> {
        self.inner
            .adapter
            .fetch_request(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("request {}", id)))
    }

    // ==================== Requests ====================

    /// File a deposit or withdrawal request for the caller's own account.
    ///
    /// Only one pending request per account, track and kind may exist; the
    /// adapter enforces that inside the insert.
    pub async fn submit_request(
        &self,
        caller: &Caller,
        track: Track,
        kind: RequestKind,
        amount: Decimal,
    ) -> Result<Request, Error> {
        let amount = validate_request_amount(amount)?;

        if track == Track::Temporal && !self.temporal_module().await?.active {
            return Err(Error::BusinessRule(
                "the temporal module is not active".to_string(),
            ));
        }

        if kind == RequestKind::Withdrawal {
            let entries = self
                .load_entries(EntryFilter::account(caller.id, track), "submit_request")
                .await?;
            let available = compute_balance(&entries)?;
            if amount > available {
                return Err(Error::Validation(format!(
                    "withdrawal of {} exceeds the available balance of {}",
                    amount, available
                )));
            }
        }

        let request = Request::new(caller.id, track, kind, amount);
        let mut plan = ExecutionPlan::new();
        plan.add(Operation::InsertRequest {
            request: request.clone(),
        });

        let result = self.execute(&plan, "submit_request").await;
        counter!("desk.requests.total",
            "status" => if result.is_ok() { "submitted" } else { "failed" }
        )
        .increment(1);
        result?;

        info!(
            request = %request.id,
            account = %request.account,
            track = %track,
            kind = kind.as_str(),
            amount = %amount,
            "request submitted"
        );
        Ok(request)
    }

    /// Approve a pending request: state change, ledger entry and notification
    /// commit together.
    pub async fn approve(&self, caller: &Caller, request_id: Uuid) -> Result<Request, Error> {
        caller.require_admin()?;

        let mut request = self.fetch_request_or_missing(request_id).await?;
        if !request.state.is_pending() {
            return Err(Error::Conflict(format!(
                "request {} is {}, not pending",
                request.id,
                request.state.as_str()
            )));
        }

        let resolution = Resolution::approve(caller.id);
        let entry = LedgerEntry::new(
            request.account,
            request.track,
            request.kind.entry_kind(),
            request.amount,
            format!("{} request {} approved", request.kind.title(), request.id),
        )?
        .at(resolution.at);
        let notification = Notification::request_approved(&request, &self.inner.config.currency);

        let mut plan = ExecutionPlan::new();
        plan.add(Operation::TransitionRequest {
            id: request.id,
            resolution: resolution.clone(),
        })
        .add(Operation::AppendEntry { entry })
        .add(Operation::Notify { notification });

        self.execute(&plan, "approve").await?;
        request.resolve(&resolution)?;

        counter!("desk.requests.resolved", "outcome" => "approved").increment(1);
        info!(
            request = %request.id,
            account = %request.account,
            admin = %caller.id,
            "request approved"
        );
        Ok(request)
    }

    /// Reject a pending request. The reason is required and is forwarded to
    /// the investor in the notification.
    pub async fn reject(
        &self,
        caller: &Caller,
        request_id: Uuid,
        reason: &str,
    ) -> Result<Request, Error> {
        caller.require_admin()?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(Error::Validation(
                "a rejection reason is required".to_string(),
            ));
        }

        let mut request = self.fetch_request_or_missing(request_id).await?;
        if !request.state.is_pending() {
            return Err(Error::Conflict(format!(
                "request {} is {}, not pending",
                request.id,
                request.state.as_str()
            )));
        }

        let resolution = Resolution::reject(caller.id, reason.to_string());
        let notification =
            Notification::request_rejected(&request, reason, &self.inner.config.currency);

        let mut plan = ExecutionPlan::new();
        plan.add(Operation::TransitionRequest {
            id: request.id,
            resolution: resolution.clone(),
        })
        .add(Operation::Notify { notification });

        self.execute(&plan, "reject").await?;
        request.resolve(&resolution)?;

        counter!("desk.requests.resolved", "outcome" => "rejected").increment(1);
        info!(
            request = %request.id,
            account = %request.account,
            admin = %caller.id,
            reason,
            "request rejected"
        );
        Ok(request)
    }

    /// Remove the caller's own pending request.
    pub async fn withdraw_request(&self, caller: &Caller, request_id: Uuid) -> Result<(), Error> {
        let request = self.fetch_request_or_missing(request_id).await?;
        if request.account != caller.id {
            return Err(Error::Unauthorized(format!(
                "request {} belongs to another account",
                request.id
            )));
        }
        if !request.state.is_pending() {
            return Err(Error::Conflict(format!(
                "request {} is {}, only pending requests can be withdrawn",
                request.id,
                request.state.as_str()
            )));
        }

        let mut plan = ExecutionPlan::new();
        plan.add(Operation::DeleteRequest {
            id: request.id,
            owner: caller.id,
        });
        self.execute(&plan, "withdraw_request").await?;

        counter!("desk.requests.resolved", "outcome" => "withdrawn").increment(1);
        info!(request = %request.id, account = %caller.id, "request withdrawn");
        Ok(())
    }

    /// Newest first. Investors only ever see their own requests.
    pub async fn requests(
        &self,
        caller: &Caller,
        mut filter: RequestFilter,
    ) -> Result<Vec<Request>, Error> {
        if !caller.is_admin() {
            filter.account = Some(caller.id);
        }

        let start = Instant::now();
        let requests = self.inner.adapter.query_requests(&filter).await?;
        histogram!("desk.query.duration_ms",
            "op" => "requests"
        )
        .record(start.elapsed().as_millis() as f64);
        Ok(requests)
    }

    pub async fn pending_requests(
        &self,
        caller: &Caller,
        track: Track,
    ) -> Result<Vec<Request>, Error> {
        self.requests(caller, RequestFilter::pending(track)).await
    }

    // ==================== Distribution ====================

    /// Compute a payout without writing anything.
    pub async fn preview_distribution(
        &self,
        caller: &Caller,
        track: Track,
        percentage: Decimal,
    ) -> Result<Distribution, Error> {
        caller.require_admin()?;

        let entries = self
            .load_entries(EntryFilter::track(track), "preview_distribution")
            .await?;
        let distribution =
            plan_distribution(track, percentage, &entries, &self.inner.config.policy())?;

        debug!(
            track = %track,
            percentage = %percentage,
            principal = %distribution.principal,
            per_account = %distribution.per_account,
            accounts = distribution.accounts.len(),
            "distribution planned"
        );
        Ok(distribution)
    }

    /// Credit every account on `track` with an equal share of `percentage`%
    /// of the track principal.
    ///
    /// `run_id` makes the call idempotent: gain entries, notifications and
    /// the run record commit in one plan, and calling again with a committed
    /// id returns the stored run with `replayed = true`.
    pub async fn distribute(
        &self,
        caller: &Caller,
        track: Track,
        percentage: Decimal,
        run_id: Uuid,
    ) -> Result<DistributionOutcome, Error> {
        caller.require_admin()?;

        if let Some(run) = self.inner.adapter.fetch_run(run_id).await? {
            if run.track != track || run.percentage != percentage {
                warn!(
                    run = %run_id,
                    "replayed distribution run was recorded with different parameters"
                );
            }
            info!(run = %run_id, track = %run.track, "distribution already committed");
            return Ok(DistributionOutcome {
                run,
                replayed: true,
            });
        }

        let distribution = self.preview_distribution(caller, track, percentage).await?;
        let run = DistributionRun::new(run_id, &distribution, caller.id);
        let currency = &self.inner.config.currency;

        let mut plan = ExecutionPlan::new();
        plan.add(Operation::RecordRun { run: run.clone() });
        for account in &distribution.accounts {
            let entry = LedgerEntry::new(
                *account,
                track,
                ledger::EntryKind::Gain,
                distribution.per_account,
                format!("{}% distribution", percentage.normalize()),
            )?
            .with_run(run_id)
            .at(run.executed_at);
            plan.add(Operation::AppendEntry { entry })
                .add(Operation::Notify {
                    notification: Notification::payout(
                        *account,
                        track,
                        distribution.per_account,
                        percentage,
                        currency,
                    ),
                });
        }

        self.execute(&plan, "distribute").await?;

        histogram!("desk.distribution.payout", "track" => track.as_str())
            .record(distribution.total_payout.to_f64().unwrap_or_default());
        info!(
            run = %run_id,
            track = %track,
            percentage = %percentage,
            accounts = distribution.accounts.len(),
            per_account = %distribution.per_account,
            remainder = %distribution.remainder,
            "distribution committed"
        );

        Ok(DistributionOutcome {
            run,
            replayed: false,
        })
    }

    pub async fn distribution_runs(
        &self,
        caller: &Caller,
        track: Track,
    ) -> Result<Vec<DistributionRun>, Error> {
        caller.require_admin()?;
        self.inner.adapter.runs(track).await
    }

    // ==================== Notifications ====================

    /// Newest first.
    pub async fn notifications(&self, caller: &Caller) -> Result<Vec<Notification>, Error> {
        self.inner.adapter.notifications_for(caller.id).await
    }

    pub async fn unread_count(&self, caller: &Caller) -> Result<usize, Error> {
        Ok(self
            .notifications(caller)
            .await?
            .iter()
            .filter(|n| !n.read)
            .count())
    }

    async fn owned_notification(&self, caller: &Caller, id: Uuid) -> Result<Notification, Error> {
        let notification = self
            .inner
            .adapter
            .fetch_notification(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("notification {}", id)))?;
        if notification.account != caller.id {
            return Err(Error::Unauthorized(format!(
                "notification {} belongs to another account",
                id
            )));
        }
        Ok(notification)
    }

    pub async fn mark_read(&self, caller: &Caller, id: Uuid) -> Result<(), Error> {
        let notification = self.owned_notification(caller, id).await?;
        if notification.read {
            return Ok(());
        }
        self.inner.adapter.mark_notification_read(id).await
    }

    pub async fn dismiss(&self, caller: &Caller, id: Uuid) -> Result<(), Error> {
        self.owned_notification(caller, id).await?;
        self.inner.adapter.delete_notification(id).await
    }

    // ==================== Announcements ====================

    pub async fn create_announcement(
        &self,
        caller: &Caller,
        draft: AnnouncementDraft,
    ) -> Result<Announcement, Error> {
        caller.require_admin()?;
        draft.validate()?;

        let announcement = Announcement::from_draft(&draft, caller.id);
        if draft.broadcast {
            let notified = self
                .inner
                .adapter
                .broadcast_announcement(announcement.clone())
                .await?;
            info!(announcement = %announcement.id, notified, "announcement broadcast");
        } else {
            self.inner
                .adapter
                .insert_announcement(announcement.clone())
                .await?;
            info!(announcement = %announcement.id, "announcement created");
        }
        Ok(announcement)
    }

    async fn announcement_or_missing(&self, id: Uuid) -> Result<Announcement, Error> {
        self.inner
            .adapter
            .fetch_announcement(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("announcement {}", id)))
    }

    /// Replace the text, kind and expiry. Does not re-broadcast.
    pub async fn update_announcement(
        &self,
        caller: &Caller,
        id: Uuid,
        draft: AnnouncementDraft,
    ) -> Result<Announcement, Error> {
        caller.require_admin()?;
        draft.validate()?;

        let mut announcement = self.announcement_or_missing(id).await?;
        announcement.title = draft.title.trim().to_string();
        announcement.body = draft.body.trim().to_string();
        announcement.kind = draft.kind;
        announcement.expires_at = draft.expires_at;

        self.inner
            .adapter
            .update_announcement(announcement.clone())
            .await?;
        Ok(announcement)
    }

    pub async fn set_announcement_active(
        &self,
        caller: &Caller,
        id: Uuid,
        active: bool,
    ) -> Result<Announcement, Error> {
        caller.require_admin()?;

        let mut announcement = self.announcement_or_missing(id).await?;
        announcement.active = active;
        self.inner
            .adapter
            .update_announcement(announcement.clone())
            .await?;
        Ok(announcement)
    }

    pub async fn delete_announcement(&self, caller: &Caller, id: Uuid) -> Result<(), Error> {
        caller.require_admin()?;

        if !self.inner.adapter.delete_announcement(id).await? {
            return Err(Error::NotFound(format!("announcement {}", id)));
        }
        Ok(())
    }

    /// Admins get every announcement, investors only the visible ones.
    pub async fn announcements(&self, caller: &Caller) -> Result<Vec<Announcement>, Error> {
        let announcements = self.inner.adapter.announcements().await?;
        if caller.is_admin() {
            return Ok(announcements);
        }

        let now = Utc::now();
        Ok(announcements
            .into_iter()
            .filter(|a| a.is_visible(now))
            .collect())
    }

    // ==================== Temporal module ====================

    /// Stored configuration, or a disabled module when none was ever saved.
    pub async fn temporal_module(&self) -> Result<TemporalModule, Error> {
        Ok(self
            .inner
            .adapter
            .temporal_module()
            .await?
            .unwrap_or_else(|| TemporalModule::disabled(&self.inner.config.default_temporal_title)))
    }

    pub async fn configure_temporal_module(
        &self,
        caller: &Caller,
        active: bool,
        title: &str,
        description: &str,
    ) -> Result<TemporalModule, Error> {
        caller.require_admin()?;

        let title = title.trim();
        if title.is_empty() {
            return Err(Error::Validation(
                "temporal module title is required".to_string(),
            ));
        }
        let description = match description.trim() {
            "" => DEFAULT_CONFIG_NOTE,
            d => d,
        };

        let module = TemporalModule {
            active,
            title: title.to_string(),
            description: description.to_string(),
            updated_by: Some(caller.id),
            updated_at: Utc::now(),
        };
        self.inner.adapter.save_temporal_module(module.clone()).await?;

        info!(active, title, admin = %caller.id, "temporal module configured");
        Ok(module)
    }

    /// Tracks offered in the dashboard switcher. Admins always manage both.
    pub async fn dashboard_tracks(&self, caller: &Caller) -> Result<Vec<Track>, Error> {
        if caller.is_admin() || self.temporal_module().await?.active {
            Ok(vec![Track::Primary, Track::Temporal])
        } else {
            Ok(vec![Track::Primary])
        }
    }

    // ==================== Read models ====================

    pub async fn balance(
        &self,
        caller: &Caller,
        account: Uuid,
        track: Track,
    ) -> Result<Balance, Error> {
        caller.require_access_to(account)?;
        let entries = self
            .load_entries(EntryFilter::account(account, track), "balance")
            .await?;
        Ok(Balance::from_entries(account, track, &entries)?)
    }

    pub async fn breakdown(
        &self,
        caller: &Caller,
        account: Uuid,
        track: Track,
    ) -> Result<Breakdown, Error> {
        caller.require_access_to(account)?;
        let entries = self
            .load_entries(EntryFilter::account(account, track), "breakdown")
            .await?;
        Ok(Breakdown::from_entries(&entries)?)
    }

    pub async fn monthly_gains(
        &self,
        caller: &Caller,
        account: Uuid,
        track: Track,
    ) -> Result<Vec<MonthlyGain>, Error> {
        caller.require_access_to(account)?;
        let entries = self
            .load_entries(EntryFilter::account(account, track), "monthly_gains")
            .await?;
        Ok(monthly_gains(&entries, Utc::now().date_naive())?)
    }

    /// Oldest first.
    pub async fn entries(
        &self,
        caller: &Caller,
        account: Uuid,
        track: Track,
    ) -> Result<Vec<LedgerEntry>, Error> {
        caller.require_access_to(account)?;
        self.load_entries(EntryFilter::account(account, track), "entries")
            .await
    }

    pub async fn track_summary(
        &self,
        caller: &Caller,
        track: Track,
    ) -> Result<TrackSummary, Error> {
        caller.require_admin()?;
        let entries = self
            .load_entries(EntryFilter::track(track), "track_summary")
            .await?;
        Ok(TrackSummary::from_entries(track, &entries)?)
    }

    pub async fn overview(&self, caller: &Caller) -> Result<Overview, Error> {
        caller.require_admin()?;

        let investors = self.inner.adapter.accounts().await?.len();
        let pending_requests = self
            .inner
            .adapter
            .query_requests(&RequestFilter {
                state: Some(RequestState::Pending),
                ..Default::default()
            })
            .await?
            .len();
        let now = Utc::now();
        let active_announcements = self
            .inner
            .adapter
            .announcements()
            .await?
            .iter()
            .filter(|a| a.is_visible(now))
            .count();
        let entries = self
            .load_entries(EntryFilter::track(Track::Primary), "overview")
            .await?;

        Ok(Overview {
            investors,
            pending_requests,
            active_announcements,
            primary_principal: compute_balance(&entries)?,
        })
    }
}
