mod adapter_impl;
mod helper;

use sqlx::PgPool;

use crate::Error;

/// PostgreSQL adapter.
///
/// Schema:
/// ```sql
/// CREATE TABLE accounts (id uuid PRIMARY KEY, display_name TEXT, email TEXT, created_at TIMESTAMPTZ);
/// CREATE TABLE requests (
///     id uuid PRIMARY KEY,
///     account uuid NOT NULL,
///     track TEXT NOT NULL,
///     kind TEXT NOT NULL,
///     amount NUMERIC NOT NULL CHECK (amount > 0),
///     state TEXT NOT NULL CHECK (state IN ('pending', 'approved', 'rejected')),
///     ...
/// );
/// -- at most one pending request per account, track and kind
/// CREATE UNIQUE INDEX idx_requests_one_pending ON requests(account, track, kind) WHERE state = 'pending';
/// CREATE TABLE ledger_entries (... amount NUMERIC NOT NULL CHECK (amount >= 0), run_id uuid);
/// CREATE TABLE notifications (...);
/// CREATE TABLE announcements (...);
/// CREATE TABLE temporal_module (id SMALLINT PRIMARY KEY CHECK (id = 1), ...);
/// CREATE TABLE distribution_runs (id uuid PRIMARY KEY, ..., accounts uuid[] NOT NULL);
/// ```
pub struct PostgresAdapter {
    pub(crate) pool: PgPool,
}

impl PostgresAdapter {
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<(), Error> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id uuid PRIMARY KEY,
                display_name TEXT NOT NULL,
                email TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS requests (
                id uuid PRIMARY KEY,
                account uuid NOT NULL,
                track TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('deposit', 'withdrawal')),
                amount NUMERIC NOT NULL CHECK (amount > 0),
                state TEXT NOT NULL CHECK (state IN ('pending', 'approved', 'rejected')),
                submitted_at TIMESTAMPTZ NOT NULL,
                resolved_at TIMESTAMPTZ,
                resolved_by uuid,
                rejection_reason TEXT
            )
            "#,
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_requests_one_pending
                ON requests(account, track, kind)
                WHERE state = 'pending'
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_requests_track_state
                ON requests(track, state, submitted_at DESC)
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS ledger_entries (
                id uuid PRIMARY KEY,
                account uuid NOT NULL,
                track TEXT NOT NULL,
                kind TEXT NOT NULL,
                amount NUMERIC NOT NULL CHECK (amount >= 0),
                description TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                run_id uuid
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_ledger_entries_track_account
                ON ledger_entries(track, account, created_at)
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id uuid PRIMARY KEY,
                account uuid NOT NULL,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                kind TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                read BOOLEAN NOT NULL DEFAULT FALSE
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_notifications_account
                ON notifications(account, created_at DESC)
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS announcements (
                id uuid PRIMARY KEY,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                kind TEXT NOT NULL,
                active BOOLEAN NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                expires_at TIMESTAMPTZ,
                created_by uuid NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS temporal_module (
                id SMALLINT PRIMARY KEY CHECK (id = 1),
                active BOOLEAN NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                updated_by uuid,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS distribution_runs (
                id uuid PRIMARY KEY,
                track TEXT NOT NULL,
                percentage NUMERIC NOT NULL,
                principal NUMERIC NOT NULL,
                total_payout NUMERIC NOT NULL,
                per_account NUMERIC NOT NULL,
                accounts uuid[] NOT NULL,
                executed_by uuid NOT NULL,
                executed_at TIMESTAMPTZ NOT NULL
            )
            "#,
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::Storage(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        Ok(())
    }
}
