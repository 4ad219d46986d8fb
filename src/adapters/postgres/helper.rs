use super::PostgresAdapter;
use ledger::{EntryKind, LedgerEntry, Track};
use sqlx::{Row, postgres::PgRow};

use crate::{
    Error,
    announcement::Announcement,
    caller::Account,
    distribution::DistributionRun,
    module_config::TemporalModule,
    notification::{Notification, NotificationKind},
    request::{Request, RequestKind, RequestState},
};

fn storage(e: sqlx::Error) -> Error {
    Error::Storage(e.to_string())
}

fn track(row: &PgRow) -> Result<Track, Error> {
    let raw: String = row.try_get("track").map_err(storage)?;
    Track::parse(&raw).ok_or_else(|| Error::Storage(format!("unknown track {:?}", raw)))
}

impl PostgresAdapter {
    /// Unique violations become conflicts, everything else is a storage error.
    pub(super) fn map_write_error(err: sqlx::Error, conflict: impl FnOnce() -> String) -> Error {
        let unique = err
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation());
        if unique {
            Error::Conflict(conflict())
        } else {
            Error::Storage(err.to_string())
        }
    }

    pub(super) fn map_row_to_request(row: PgRow) -> Result<Request, Error> {
        let kind: String = row.try_get("kind").map_err(storage)?;
        let state: String = row.try_get("state").map_err(storage)?;
        Ok(Request {
            id: row.try_get("id").map_err(storage)?,
            account: row.try_get("account").map_err(storage)?,
            track: track(&row)?,
            kind: RequestKind::parse(&kind)
                .ok_or_else(|| Error::Storage(format!("unknown request kind {:?}", kind)))?,
            amount: row.try_get("amount").map_err(storage)?,
            state: RequestState::parse(&state)
                .ok_or_else(|| Error::Storage(format!("unknown request state {:?}", state)))?,
            submitted_at: row.try_get("submitted_at").map_err(storage)?,
            resolved_at: row.try_get("resolved_at").map_err(storage)?,
            resolved_by: row.try_get("resolved_by").map_err(storage)?,
            rejection_reason: row.try_get("rejection_reason").map_err(storage)?,
        })
    }

    pub(super) fn map_row_to_entry(row: PgRow) -> Result<LedgerEntry, Error> {
        let kind: String = row.try_get("kind").map_err(storage)?;
        Ok(LedgerEntry {
            id: row.try_get("id").map_err(storage)?,
            account: row.try_get("account").map_err(storage)?,
            track: track(&row)?,
            kind: EntryKind::parse(&kind),
            amount: row.try_get("amount").map_err(storage)?,
            description: row.try_get("description").map_err(storage)?,
            created_at: row.try_get("created_at").map_err(storage)?,
            run_id: row.try_get("run_id").map_err(storage)?,
        })
    }

    pub(super) fn map_row_to_notification(row: PgRow) -> Result<Notification, Error> {
        let kind: String = row.try_get("kind").map_err(storage)?;
        Ok(Notification {
            id: row.try_get("id").map_err(storage)?,
            account: row.try_get("account").map_err(storage)?,
            title: row.try_get("title").map_err(storage)?,
            body: row.try_get("body").map_err(storage)?,
            kind: NotificationKind::parse(&kind),
            created_at: row.try_get("created_at").map_err(storage)?,
            read: row.try_get("read").map_err(storage)?,
        })
    }

    pub(super) fn map_row_to_announcement(row: PgRow) -> Result<Announcement, Error> {
        let kind: String = row.try_get("kind").map_err(storage)?;
        Ok(Announcement {
            id: row.try_get("id").map_err(storage)?,
            title: row.try_get("title").map_err(storage)?,
            body: row.try_get("body").map_err(storage)?,
            kind: NotificationKind::parse(&kind),
            active: row.try_get("active").map_err(storage)?,
            created_at: row.try_get("created_at").map_err(storage)?,
            expires_at: row.try_get("expires_at").map_err(storage)?,
            created_by: row.try_get("created_by").map_err(storage)?,
        })
    }

    pub(super) fn map_row_to_module(row: PgRow) -> Result<TemporalModule, Error> {
        Ok(TemporalModule {
            active: row.try_get("active").map_err(storage)?,
            title: row.try_get("title").map_err(storage)?,
            description: row.try_get("description").map_err(storage)?,
            updated_by: row.try_get("updated_by").map_err(storage)?,
            updated_at: row.try_get("updated_at").map_err(storage)?,
        })
    }

    pub(super) fn map_row_to_account(row: PgRow) -> Result<Account, Error> {
        Ok(Account {
            id: row.try_get("id").map_err(storage)?,
            display_name: row.try_get("display_name").map_err(storage)?,
            email: row.try_get("email").map_err(storage)?,
            created_at: row.try_get("created_at").map_err(storage)?,
        })
    }

    pub(super) fn map_row_to_run(row: PgRow) -> Result<DistributionRun, Error> {
        Ok(DistributionRun {
            id: row.try_get("id").map_err(storage)?,
            track: track(&row)?,
            percentage: row.try_get("percentage").map_err(storage)?,
            principal: row.try_get("principal").map_err(storage)?,
            total_payout: row.try_get("total_payout").map_err(storage)?,
            per_account: row.try_get("per_account").map_err(storage)?,
            accounts: row.try_get("accounts").map_err(storage)?,
            executed_by: row.try_get("executed_by").map_err(storage)?,
            executed_at: row.try_get("executed_at").map_err(storage)?,
        })
    }
}
