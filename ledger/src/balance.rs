// ledger/src/balance.rs
use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use uuid::Uuid;

use crate::{EntryKind, LedgerEntry, LedgerError, Track};

/// Signed sum of `entries`, floored at zero.
///
/// Deposits and gains add, withdrawals subtract. Unrecognized kinds do not
/// move the balance but are logged and counted. Fails with
/// [`LedgerError::Overflow`] when the running sum leaves the `Decimal` range.
pub fn compute_balance<'a, I>(entries: I) -> Result<Decimal, LedgerError>
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    let mut acc = Decimal::ZERO;

    for entry in entries {
        match entry.signed_amount() {
            Some(delta) => acc = checked_sum(acc, delta, "balance")?,
            None => report_unrecognized(entry),
        }
    }

    Ok(acc.max(Decimal::ZERO))
}

pub(crate) fn checked_sum(
    acc: Decimal,
    delta: Decimal,
    what: &'static str,
) -> Result<Decimal, LedgerError> {
    acc.checked_add(delta).ok_or_else(|| {
        counter!("ledger.aggregation.overflow", "sum" => what).increment(1);
        LedgerError::Overflow(what)
    })
}

fn report_unrecognized(entry: &LedgerEntry) {
    tracing::warn!(
        entry = %entry.id,
        account = %entry.account,
        kind = %entry.kind,
        "skipping ledger entry with unrecognized kind"
    );
    counter!("ledger.entries.unrecognized", "kind" => entry.kind.as_str().to_string())
        .increment(1);
}

/// Numeric parsing for loosely typed stored amounts.
/// Malformed or negative input counts as zero.
pub fn parse_amount_lenient(raw: &str) -> Decimal {
    match Decimal::from_str(raw.trim()) {
        Ok(value) if value >= Decimal::ZERO => value,
        _ => Decimal::ZERO,
    }
}

/// Balance of one account on one track at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    pub owner: Uuid,
    pub track: Track,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Balance {
    pub fn from_entries<'a, I>(owner: Uuid, track: Track, entries: I) -> Result<Self, LedgerError>
    where
        I: IntoIterator<Item = &'a LedgerEntry>,
    {
        Ok(Self {
            owner,
            track,
            amount: compute_balance(
                entries
                    .into_iter()
                    .filter(|e| e.account == owner && e.track == track),
            )?,
            timestamp: Utc::now(),
        })
    }
}

/// Per-kind totals of a set of entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub deposits: Decimal,
    pub withdrawals: Decimal,
    pub gains: Decimal,
    /// Number of entries skipped because their kind is unknown.
    pub unrecognized: usize,
}

impl Breakdown {
    /// Fails with [`LedgerError::Overflow`] when a total, or deposits plus
    /// gains, leaves the `Decimal` range.
    pub fn from_entries<'a, I>(entries: I) -> Result<Self, LedgerError>
    where
        I: IntoIterator<Item = &'a LedgerEntry>,
    {
        let mut out = Breakdown::default();

        for entry in entries {
            match &entry.kind {
                EntryKind::Deposit => {
                    out.deposits = checked_sum(out.deposits, entry.amount, "deposits")?
                }
                EntryKind::Withdrawal => {
                    out.withdrawals = checked_sum(out.withdrawals, entry.amount, "withdrawals")?
                }
                EntryKind::Gain => out.gains = checked_sum(out.gains, entry.amount, "gains")?,
                EntryKind::Unrecognized(_) => {
                    report_unrecognized(entry);
                    out.unrecognized += 1;
                }
            }
        }
        checked_sum(out.deposits, out.gains, "breakdown")?;

        Ok(out)
    }

    pub fn net(&self) -> Decimal {
        self.deposits.saturating_add(self.gains) - self.withdrawals
    }

    /// Same value `compute_balance` returns for the same entries.
    pub fn balance(&self) -> Decimal {
        self.net().max(Decimal::ZERO)
    }

    /// Non-zero (label, value) pairs in deposit, withdrawal, gain order.
    pub fn slices(&self) -> Vec<(&'static str, Decimal)> {
        [
            ("deposits", self.deposits),
            ("withdrawals", self.withdrawals),
            ("gains", self.gains),
        ]
        .into_iter()
        .filter(|(_, value)| *value > Decimal::ZERO)
        .collect()
    }
}

/// Aggregate view of a whole track across every account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub track: Track,
    pub investors: usize,
    pub principal: Decimal,
    pub total_gains: Decimal,
}

impl TrackSummary {
    pub fn from_entries(track: Track, entries: &[LedgerEntry]) -> Result<Self, LedgerError> {
        let scoped: Vec<&LedgerEntry> = entries.iter().filter(|e| e.track == track).collect();
        let investors: BTreeSet<Uuid> = scoped.iter().map(|e| e.account).collect();
        let breakdown = Breakdown::from_entries(scoped.iter().copied())?;

        Ok(Self {
            track,
            investors: investors.len(),
            principal: breakdown.balance(),
            total_gains: breakdown.gains,
        })
    }
}
