use crate::{
    Error,
    adapters::{Adapter, EntryFilter},
    announcement::Announcement,
    caller::Account,
    distribution::DistributionRun,
    module_config::TemporalModule,
    notification::Notification,
    plan::{ExecutionPlan, Operation},
    request::{Request, RequestFilter},
};
use async_trait::async_trait;
use ledger::{LedgerEntry, Track};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Clone, Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    requests: HashMap<Uuid, Request>,
    entries: Vec<LedgerEntry>,
    notifications: HashMap<Uuid, Notification>,
    announcements: HashMap<Uuid, Announcement>,
    temporal_module: Option<TemporalModule>,
    runs: HashMap<Uuid, DistributionRun>,
}

impl Tables {
    fn apply(&mut self, op: &Operation) -> Result<(), Error> {
        match op {
            Operation::InsertRequest { request } => {
                let duplicate = self.requests.values().any(|r| {
                    r.account == request.account
                        && r.track == request.track
                        && r.kind == request.kind
                        && r.state.is_pending()
                });
                if duplicate {
                    return Err(Error::Conflict(format!(
                        "account {} already has a pending {} request",
                        request.account,
                        request.kind.as_str()
                    )));
                }
                self.requests.insert(request.id, request.clone());
            }
            Operation::TransitionRequest { id, resolution } => {
                let stored = self
                    .requests
                    .get_mut(id)
                    .ok_or_else(|| Error::NotFound(format!("request {}", id)))?;
                stored.resolve(resolution)?;
            }
            Operation::DeleteRequest { id, owner } => {
                let deletable = self
                    .requests
                    .get(id)
                    .is_some_and(|r| r.account == *owner && r.state.is_pending());
                if !deletable {
                    return Err(Error::Conflict(format!(
                        "request {} is not a pending request of {}",
                        id, owner
                    )));
                }
                self.requests.remove(id);
            }
            Operation::AppendEntry { entry } => {
                self.entries.push(entry.clone());
            }
            Operation::Notify { notification } => {
                self.notifications
                    .insert(notification.id, notification.clone());
            }
            Operation::RecordRun { run } => {
                if self.runs.contains_key(&run.id) {
                    return Err(Error::Conflict(format!(
                        "distribution run {} already recorded",
                        run.id
                    )));
                }
                self.runs.insert(run.id, run.clone());
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    fail_on: Arc<Mutex<Option<&'static str>>>,
}

impl MemoryStore {
    fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            fail_on: Arc::new(Mutex::new(None)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, Error> {
        self.tables
            .lock()
            .map_err(|_| Error::Storage("memory store lock poisoned".to_string()))
    }

    /// Disarms and returns the injected failure if `plan` reaches it.
    fn take_failure(&self, plan: &ExecutionPlan) -> Result<Option<&'static str>, Error> {
        let mut fail_on = self
            .fail_on
            .lock()
            .map_err(|_| Error::Storage("memory store lock poisoned".to_string()))?;
        let hit = fail_on.is_some_and(|name| plan.operations().iter().any(|op| op.name() == name));
        Ok(if hit { fail_on.take() } else { None })
    }
}

/// In-process adapter. Plans are applied to a staged copy of every table and
/// swapped in only when all operations succeed.
#[derive(Clone)]
pub struct MemoryAdapter {
    store: MemoryStore,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new(),
        }
    }

    /// Make the next plan that contains `operation` fail with a storage error
    /// when it reaches that operation.
    pub fn fail_next(&self, operation: &'static str) {
        if let Ok(mut fail_on) = self.store.fail_on.lock() {
            *fail_on = Some(operation);
        }
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn execute_plan(&self, plan: &ExecutionPlan) -> Result<(), Error> {
        let mut tables = self.store.lock()?;
        let mut staged = tables.clone();

        let fail_on = self.store.take_failure(plan)?;

        for op in plan.operations() {
            if fail_on == Some(op.name()) {
                return Err(Error::Storage(format!("injected failure at {}", op.name())));
            }
            staged.apply(op)?;
        }

        *tables = staged;
        Ok(())
    }

    async fn fetch_request(&self, id: Uuid) -> Result<Option<Request>, Error> {
        Ok(self.store.lock()?.requests.get(&id).cloned())
    }

    async fn query_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, Error> {
        let tables = self.store.lock()?;
        let mut out: Vec<Request> = tables
            .requests
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        out.sort_by(|a, b| (b.submitted_at, b.id).cmp(&(a.submitted_at, a.id)));
        Ok(out)
    }

    async fn entries(&self, filter: EntryFilter) -> Result<Vec<LedgerEntry>, Error> {
        let tables = self.store.lock()?;
        let mut out: Vec<LedgerEntry> = tables
            .entries
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        out.sort_by_key(|e| e.created_at);
        Ok(out)
    }

    async fn notifications_for(&self, account: Uuid) -> Result<Vec<Notification>, Error> {
        let tables = self.store.lock()?;
        let mut out: Vec<Notification> = tables
            .notifications
            .values()
            .filter(|n| n.account == account)
            .cloned()
            .collect();
        out.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(out)
    }

    async fn fetch_notification(&self, id: Uuid) -> Result<Option<Notification>, Error> {
        Ok(self.store.lock()?.notifications.get(&id).cloned())
    }

    async fn mark_notification_read(&self, id: Uuid) -> Result<(), Error> {
        let mut tables = self.store.lock()?;
        let notification = tables
            .notifications
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("notification {}", id)))?;
        notification.read = true;
        Ok(())
    }

    async fn delete_notification(&self, id: Uuid) -> Result<(), Error> {
        let mut tables = self.store.lock()?;
        tables
            .notifications
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("notification {}", id)))
    }

    async fn insert_announcement(&self, announcement: Announcement) -> Result<(), Error> {
        let mut tables = self.store.lock()?;
        tables.announcements.insert(announcement.id, announcement);
        Ok(())
    }

    async fn broadcast_announcement(&self, announcement: Announcement) -> Result<u64, Error> {
        let mut tables = self.store.lock()?;
        let notifications: Vec<Notification> = tables
            .accounts
            .keys()
            .map(|account| {
                Notification::new(
                    *account,
                    announcement.kind,
                    announcement.title.clone(),
                    announcement.body.clone(),
                )
            })
            .collect();
        let count = notifications.len() as u64;

        for notification in notifications {
            tables.notifications.insert(notification.id, notification);
        }
        tables.announcements.insert(announcement.id, announcement);
        Ok(count)
    }

    async fn update_announcement(&self, announcement: Announcement) -> Result<(), Error> {
        let mut tables = self.store.lock()?;
        match tables.announcements.get_mut(&announcement.id) {
            Some(stored) => {
                *stored = announcement;
                Ok(())
            }
            None => Err(Error::NotFound(format!("announcement {}", announcement.id))),
        }
    }

    async fn delete_announcement(&self, id: Uuid) -> Result<bool, Error> {
        Ok(self.store.lock()?.announcements.remove(&id).is_some())
    }

    async fn fetch_announcement(&self, id: Uuid) -> Result<Option<Announcement>, Error> {
        Ok(self.store.lock()?.announcements.get(&id).cloned())
    }

    async fn announcements(&self) -> Result<Vec<Announcement>, Error> {
        let tables = self.store.lock()?;
        let mut out: Vec<Announcement> = tables.announcements.values().cloned().collect();
        out.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(out)
    }

    async fn temporal_module(&self) -> Result<Option<TemporalModule>, Error> {
        Ok(self.store.lock()?.temporal_module.clone())
    }

    async fn save_temporal_module(&self, module: TemporalModule) -> Result<(), Error> {
        self.store.lock()?.temporal_module = Some(module);
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<Account>, Error> {
        let tables = self.store.lock()?;
        let mut out: Vec<Account> = tables.accounts.values().cloned().collect();
        out.sort_by_key(|a| a.created_at);
        Ok(out)
    }

    async fn upsert_account(&self, account: Account) -> Result<(), Error> {
        self.store.lock()?.accounts.insert(account.id, account);
        Ok(())
    }

    async fn fetch_run(&self, id: Uuid) -> Result<Option<DistributionRun>, Error> {
        Ok(self.store.lock()?.runs.get(&id).cloned())
    }

    async fn runs(&self, track: Track) -> Result<Vec<DistributionRun>, Error> {
        let tables = self.store.lock()?;
        let mut out: Vec<DistributionRun> = tables
            .runs
            .values()
            .filter(|r| r.track == track)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.executed_at.cmp(&a.executed_at));
        Ok(out)
    }
}
