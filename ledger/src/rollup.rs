// ledger/src/rollup.rs
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::balance::checked_sum;
use crate::{EntryKind, LedgerEntry, LedgerError};

/// Number of months kept by [`monthly_gains`].
pub const ROLLUP_MONTHS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyGain {
    pub year: i32,
    pub month: u32,
    pub total: Decimal,
}

impl MonthlyGain {
    /// Short label such as `Mar 2025`.
    pub fn label(&self) -> String {
        match NaiveDate::from_ymd_opt(self.year, self.month, 1) {
            Some(date) => date.format("%b %Y").to_string(),
            None => format!("{:02}/{}", self.month, self.year),
        }
    }
}

/// Gain totals per calendar month, oldest first, limited to the most recent
/// [`ROLLUP_MONTHS`] months that have gains.
///
/// With no gain entries the result is a single zero point for `today`'s month.
pub fn monthly_gains<'a, I>(entries: I, today: NaiveDate) -> Result<Vec<MonthlyGain>, LedgerError>
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    let mut months: BTreeMap<(i32, u32), Decimal> = BTreeMap::new();

    for entry in entries.into_iter().filter(|e| e.kind == EntryKind::Gain) {
        let key = (entry.created_at.year(), entry.created_at.month());
        let total = months.entry(key).or_insert(Decimal::ZERO);
        *total = checked_sum(*total, entry.amount, "monthly gains")?;
    }

    if months.is_empty() {
        return Ok(vec![MonthlyGain {
            year: today.year(),
            month: today.month(),
            total: Decimal::ZERO,
        }]);
    }

    let mut recent: Vec<MonthlyGain> = months
        .into_iter()
        .rev()
        .take(ROLLUP_MONTHS)
        .map(|((year, month), total)| MonthlyGain {
            year,
            month,
            total: total.round_dp(2),
        })
        .collect();
    recent.reverse();
    Ok(recent)
}
