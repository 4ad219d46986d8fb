use super::PostgresAdapter;
use async_trait::async_trait;
use ledger::{LedgerEntry, Track};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

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

const REQUEST_COLUMNS: &str = "id, account, track, kind, amount, state, submitted_at, resolved_at, resolved_by, rejection_reason";
const ENTRY_COLUMNS: &str = "id, account, track, kind, amount, description, created_at, run_id";
const NOTIFICATION_COLUMNS: &str = "id, account, title, body, kind, created_at, read";
const ANNOUNCEMENT_COLUMNS: &str = "id, title, body, kind, active, created_at, expires_at, created_by";
const RUN_COLUMNS: &str = "id, track, percentage, principal, total_payout, per_account, accounts, executed_by, executed_at";

impl PostgresAdapter {
    async fn apply_tx(tx: &mut Transaction<'_, Postgres>, op: &Operation) -> Result<(), Error> {
        match op {
            Operation::InsertRequest { request } => {
                sqlx::query(
                    r#"
                    INSERT INTO requests (id, account, track, kind, amount, state, submitted_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(request.id)
                .bind(request.account)
                .bind(request.track.as_str())
                .bind(request.kind.as_str())
                .bind(request.amount)
                .bind(request.state.as_str())
                .bind(request.submitted_at)
                .execute(&mut **tx)
                .await
                .map_err(|e| {
                    Self::map_write_error(e, || {
                        format!(
                            "account {} already has a pending {} request",
                            request.account,
                            request.kind.as_str()
                        )
                    })
                })?;
            }
            Operation::TransitionRequest { id, resolution } => {
                // Compare-and-set on the pending state; a concurrent resolver
                // blocks on the row lock and then matches nothing.
                let result = sqlx::query(
                    r#"
                    UPDATE requests
                    SET state = $2, resolved_at = $3, resolved_by = $4, rejection_reason = $5
                    WHERE id = $1 AND state = 'pending'
                    "#,
                )
                .bind(id)
                .bind(resolution.to.as_str())
                .bind(resolution.at)
                .bind(resolution.resolver)
                .bind(resolution.reason.as_deref())
                .execute(&mut **tx)
                .await
                .map_err(|e| Error::Storage(e.to_string()))?;

                if result.rows_affected() == 0 {
                    let state: Option<String> =
                        sqlx::query_scalar("SELECT state FROM requests WHERE id = $1")
                            .bind(id)
                            .fetch_optional(&mut **tx)
                            .await
                            .map_err(|e| Error::Storage(e.to_string()))?;
                    return Err(match state {
                        Some(state) => {
                            Error::Conflict(format!("request {} is {}, not pending", id, state))
                        }
                        None => Error::NotFound(format!("request {}", id)),
                    });
                }
            }
            Operation::DeleteRequest { id, owner } => {
                let result = sqlx::query(
                    r#"
                    DELETE FROM requests
                    WHERE id = $1 AND account = $2 AND state = 'pending'
                    "#,
                )
                .bind(id)
                .bind(owner)
                .execute(&mut **tx)
                .await
                .map_err(|e| Error::Storage(e.to_string()))?;

                if result.rows_affected() == 0 {
                    return Err(Error::Conflict(format!(
                        "request {} is not a pending request of {}",
                        id, owner
                    )));
                }
            }
            Operation::AppendEntry { entry } => {
                sqlx::query(
                    r#"
                    INSERT INTO ledger_entries (id, account, track, kind, amount, description, created_at, run_id)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    "#,
                )
                .bind(entry.id)
                .bind(entry.account)
                .bind(entry.track.as_str())
                .bind(entry.kind.as_str())
                .bind(entry.amount)
                .bind(&entry.description)
                .bind(entry.created_at)
                .bind(entry.run_id)
                .execute(&mut **tx)
                .await
                .map_err(|e| Error::Storage(e.to_string()))?;
            }
            Operation::Notify { notification } => {
                Self::insert_notification_tx(tx, notification).await?;
            }
            Operation::RecordRun { run } => {
                sqlx::query(
                    r#"
                    INSERT INTO distribution_runs
                        (id, track, percentage, principal, total_payout, per_account, accounts, executed_by, executed_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                    "#,
                )
                .bind(run.id)
                .bind(run.track.as_str())
                .bind(run.percentage)
                .bind(run.principal)
                .bind(run.total_payout)
                .bind(run.per_account)
                .bind(&run.accounts)
                .bind(run.executed_by)
                .bind(run.executed_at)
                .execute(&mut **tx)
                .await
                .map_err(|e| {
                    Self::map_write_error(e, || {
                        format!("distribution run {} already recorded", run.id)
                    })
                })?;
            }
        }
        Ok(())
    }

    async fn insert_notification_tx(
        tx: &mut Transaction<'_, Postgres>,
        notification: &Notification,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, account, title, body, kind, created_at, read)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(notification.id)
        .bind(notification.account)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(notification.kind.as_str())
        .bind(notification.created_at)
        .bind(notification.read)
        .execute(&mut **tx)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Adapter for PostgresAdapter {
    async fn execute_plan(&self, plan: &ExecutionPlan) -> Result<(), Error> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        for op in plan.operations() {
            if let Err(err) = Self::apply_tx(&mut tx, op).await {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(
                        op = op.name(),
                        error = %rollback,
                        "rollback after failed plan operation did not complete"
                    );
                }
                return Err(err);
            }
        }

        tx.commit()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(())
    }

    // ==================== Requests ====================

    async fn fetch_request(&self, id: Uuid) -> Result<Option<Request>, Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM requests WHERE id = $1",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;

        row.map(Self::map_row_to_request).transpose()
    }

    async fn query_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, Error> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM requests
            WHERE ($1::uuid IS NULL OR account = $1)
              AND ($2::text IS NULL OR track = $2)
              AND ($3::text IS NULL OR state = $3)
              AND ($4::text IS NULL OR kind = $4)
            ORDER BY submitted_at DESC, id DESC
            "#,
            REQUEST_COLUMNS
        ))
        .bind(filter.account)
        .bind(filter.track.map(|t| t.as_str()))
        .bind(filter.state.map(|s| s.as_str()))
        .bind(filter.kind.map(|k| k.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;

        rows.into_iter().map(Self::map_row_to_request).collect()
    }

    // ==================== Ledger ====================

    async fn entries(&self, filter: EntryFilter) -> Result<Vec<LedgerEntry>, Error> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM ledger_entries
            WHERE ($1::uuid IS NULL OR account = $1)
              AND ($2::text IS NULL OR track = $2)
            ORDER BY created_at ASC, id ASC
            "#,
            ENTRY_COLUMNS
        ))
        .bind(filter.account)
        .bind(filter.track.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;

        rows.into_iter().map(Self::map_row_to_entry).collect()
    }

    // ==================== Notifications ====================

    async fn notifications_for(&self, account: Uuid) -> Result<Vec<Notification>, Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM notifications WHERE account = $1 ORDER BY created_at DESC, id DESC",
            NOTIFICATION_COLUMNS
        ))
        .bind(account)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;

        rows.into_iter().map(Self::map_row_to_notification).collect()
    }

    async fn fetch_notification(&self, id: Uuid) -> Result<Option<Notification>, Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM notifications WHERE id = $1",
            NOTIFICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;

        row.map(Self::map_row_to_notification).transpose()
    }

    async fn mark_notification_read(&self, id: Uuid) -> Result<(), Error> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("notification {}", id)));
        }
        Ok(())
    }

    async fn delete_notification(&self, id: Uuid) -> Result<(), Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("notification {}", id)));
        }
        Ok(())
    }

    // ==================== Announcements ====================

    async fn insert_announcement(&self, announcement: Announcement) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO announcements (id, title, body, kind, active, created_at, expires_at, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(announcement.id)
        .bind(&announcement.title)
        .bind(&announcement.body)
        .bind(announcement.kind.as_str())
        .bind(announcement.active)
        .bind(announcement.created_at)
        .bind(announcement.expires_at)
        .bind(announcement.created_by)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(())
    }

    async fn broadcast_announcement(&self, announcement: Announcement) -> Result<u64, Error> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO announcements (id, title, body, kind, active, created_at, expires_at, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(announcement.id)
        .bind(&announcement.title)
        .bind(&announcement.body)
        .bind(announcement.kind.as_str())
        .bind(announcement.active)
        .bind(announcement.created_at)
        .bind(announcement.expires_at)
        .bind(announcement.created_by)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;

        let accounts: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM accounts")
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        for account in &accounts {
            let notification = Notification::new(
                *account,
                announcement.kind,
                announcement.title.clone(),
                announcement.body.clone(),
            );
            Self::insert_notification_tx(&mut tx, &notification).await?;
        }

        tx.commit()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(accounts.len() as u64)
    }

    async fn update_announcement(&self, announcement: Announcement) -> Result<(), Error> {
        let result = sqlx::query(
            r#"
            UPDATE announcements
            SET title = $2, body = $3, kind = $4, active = $5, expires_at = $6
            WHERE id = $1
            "#,
        )
        .bind(announcement.id)
        .bind(&announcement.title)
        .bind(&announcement.body)
        .bind(announcement.kind.as_str())
        .bind(announcement.active)
        .bind(announcement.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("announcement {}", announcement.id)));
        }
        Ok(())
    }

    async fn delete_announcement(&self, id: Uuid) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn fetch_announcement(&self, id: Uuid) -> Result<Option<Announcement>, Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM announcements WHERE id = $1",
            ANNOUNCEMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;

        row.map(Self::map_row_to_announcement).transpose()
    }

    async fn announcements(&self) -> Result<Vec<Announcement>, Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM announcements ORDER BY created_at DESC, id DESC",
            ANNOUNCEMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;

        rows.into_iter().map(Self::map_row_to_announcement).collect()
    }

    // ==================== Temporal module ====================

    async fn temporal_module(&self) -> Result<Option<TemporalModule>, Error> {
        let row = sqlx::query(
            "SELECT active, title, description, updated_by, updated_at FROM temporal_module WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;

        row.map(Self::map_row_to_module).transpose()
    }

    async fn save_temporal_module(&self, module: TemporalModule) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO temporal_module (id, active, title, description, updated_by, updated_at)
            VALUES (1, $1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET active = $1, title = $2, description = $3, updated_by = $4, updated_at = $5
            "#,
        )
        .bind(module.active)
        .bind(&module.title)
        .bind(&module.description)
        .bind(module.updated_by)
        .bind(module.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(())
    }

    // ==================== Accounts ====================

    async fn accounts(&self) -> Result<Vec<Account>, Error> {
        let rows = sqlx::query(
            "SELECT id, display_name, email, created_at FROM accounts ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;

        rows.into_iter().map(Self::map_row_to_account).collect()
    }

    async fn upsert_account(&self, account: Account) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, display_name, email, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET display_name = $2, email = $3
            "#,
        )
        .bind(account.id)
        .bind(&account.display_name)
        .bind(&account.email)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(())
    }

    // ==================== Distribution runs ====================

    async fn fetch_run(&self, id: Uuid) -> Result<Option<DistributionRun>, Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM distribution_runs WHERE id = $1",
            RUN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;

        row.map(Self::map_row_to_run).transpose()
    }

    async fn runs(&self, track: Track) -> Result<Vec<DistributionRun>, Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM distribution_runs WHERE track = $1 ORDER BY executed_at DESC",
            RUN_COLUMNS
        ))
        .bind(track.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;

        rows.into_iter().map(Self::map_row_to_run).collect()
    }
}
