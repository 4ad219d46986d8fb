use chrono::{DateTime, Utc};
use ledger::{Currency, LedgerEntry, Track, compute_balance};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::Error;

/// Limits applied when planning a payout.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionPolicy {
    pub currency: Currency,
    pub max_percentage: Decimal,
}

impl Default for DistributionPolicy {
    fn default() -> Self {
        Self {
            currency: Currency::usd(),
            max_percentage: Decimal::ONE_HUNDRED,
        }
    }
}

/// Computed payout, before anything is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub track: Track,
    pub percentage: Decimal,
    pub principal: Decimal,
    pub total_payout: Decimal,
    /// Equal share credited to every account, truncated to the minor unit.
    pub per_account: Decimal,
    /// Part of `total_payout` lost to truncation. Not paid out.
    pub remainder: Decimal,
    pub accounts: BTreeSet<Uuid>,
}

/// Plans a payout of `percentage`% of the track's aggregate principal.
///
/// Every account holding any entry on the track receives the same share,
/// regardless of its own principal.
pub fn plan_distribution(
    track: Track,
    percentage: Decimal,
    entries: &[LedgerEntry],
    policy: &DistributionPolicy,
) -> Result<Distribution, Error> {
    if percentage <= Decimal::ZERO || percentage > policy.max_percentage {
        return Err(Error::Validation(format!(
            "percentage must be greater than 0 and at most {}, got {}",
            policy.max_percentage, percentage
        )));
    }

    let scoped: Vec<&LedgerEntry> = entries.iter().filter(|e| e.track == track).collect();
    let accounts: BTreeSet<Uuid> = scoped.iter().map(|e| e.account).collect();
    if accounts.is_empty() {
        return Err(Error::BusinessRule(format!(
            "no eligible accounts on the {} track",
            track
        )));
    }

    // A zero principal still pays every account a zero gain.
    let principal = compute_balance(scoped.iter().copied())?;
    let total_payout = (principal / Decimal::ONE_HUNDRED)
        .checked_mul(percentage)
        .ok_or_else(|| {
            Error::Validation(format!(
                "{}% of {} is out of range",
                percentage, principal
            ))
        })?;
    let count = Decimal::from(accounts.len() as u64);
    let per_account = policy.currency.truncate(total_payout / count);
    let remainder = total_payout - per_account * count;

    Ok(Distribution {
        track,
        percentage,
        principal,
        total_payout,
        per_account,
        remainder,
        accounts,
    })
}

/// Stable run id for an idempotency key such as `"temporal-2025-03"`.
pub fn run_id_for(key: &str) -> Uuid {
    let hash = blake3::hash(key.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash.as_bytes()[..16]);
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}

/// Committed payout, stored alongside its entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionRun {
    pub id: Uuid,
    pub track: Track,
    pub percentage: Decimal,
    pub principal: Decimal,
    pub total_payout: Decimal,
    pub per_account: Decimal,
    pub accounts: Vec<Uuid>,
    pub executed_by: Uuid,
    pub executed_at: DateTime<Utc>,
}

impl DistributionRun {
    pub fn new(id: Uuid, distribution: &Distribution, executed_by: Uuid) -> Self {
        Self {
            id,
            track: distribution.track,
            percentage: distribution.percentage,
            principal: distribution.principal,
            total_payout: distribution.total_payout,
            per_account: distribution.per_account,
            accounts: distribution.accounts.iter().copied().collect(),
            executed_by,
            executed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionOutcome {
    pub run: DistributionRun,
    /// The run id had already been committed; nothing was written this time.
    pub replayed: bool,
}
