// ledger/src/entry.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::LedgerError;

/// Reporting track an entry belongs to.
///
/// The temporal track is a parallel namespace with the same semantics as the
/// primary one; it is only shown to investors while the module is enabled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    Primary,
    Temporal,
}

impl Track {
    pub fn as_str(&self) -> &'static str {
        match self {
            Track::Primary => "primary",
            Track::Temporal => "temporal",
        }
    }

    pub fn parse(value: &str) -> Option<Track> {
        match value.trim().to_ascii_lowercase().as_str() {
            "primary" => Some(Track::Primary),
            "temporal" => Some(Track::Temporal),
            _ => None,
        }
    }
}

impl std::str::FromStr for Track {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Track::parse(s).ok_or_else(|| LedgerError::UnknownTrack(s.to_string()))
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of a ledger entry. The type, not the stored amount, decides the sign.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntryKind {
    Deposit,
    Withdrawal,
    Gain,
    /// A label this crate does not know. Kept verbatim so it can be reported.
    Unrecognized(String),
}

impl EntryKind {
    /// Case-insensitive parse. Never fails.
    pub fn parse(label: &str) -> EntryKind {
        match label.trim().to_ascii_lowercase().as_str() {
            "deposit" => EntryKind::Deposit,
            "withdrawal" => EntryKind::Withdrawal,
            "gain" => EntryKind::Gain,
            _ => EntryKind::Unrecognized(label.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EntryKind::Deposit => "deposit",
            EntryKind::Withdrawal => "withdrawal",
            EntryKind::Gain => "gain",
            EntryKind::Unrecognized(label) => label.as_str(),
        }
    }

    /// +1 for credits, -1 for debits, `None` when the kind is unknown.
    pub fn sign(&self) -> Option<i8> {
        match self {
            EntryKind::Deposit | EntryKind::Gain => Some(1),
            EntryKind::Withdrawal => Some(-1),
            EntryKind::Unrecognized(_) => None,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, EntryKind::Unrecognized(_))
    }
}

impl From<String> for EntryKind {
    fn from(value: String) -> Self {
        EntryKind::parse(&value)
    }
}

impl From<EntryKind> for String {
    fn from(value: EntryKind) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable monetary fact recorded against one account.
///
/// Invariants:
/// - `amount >= 0`
/// - never updated or deleted once stored
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub account: Uuid,
    pub track: Track,
    pub kind: EntryKind,
    pub amount: Decimal,
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Distribution run that produced this entry, if any.
    pub run_id: Option<Uuid>,
}

impl LedgerEntry {
    pub fn new(
        account: Uuid,
        track: Track,
        kind: EntryKind,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Result<Self, LedgerError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(LedgerError::NegativeAmount(amount));
        }

        Ok(Self {
            id: Uuid::now_v7(),
            account,
            track,
            kind,
            amount,
            description: description.into(),
            created_at: Utc::now(),
            run_id: None,
        })
    }

    pub fn with_run(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Signed effect on the balance, `None` for unrecognized kinds.
    pub fn signed_amount(&self) -> Option<Decimal> {
        match self.kind.sign()? {
            s if s > 0 => Some(self.amount),
            _ => Some(-self.amount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_is_case_insensitive() {
        assert_eq!(EntryKind::parse("Deposit"), EntryKind::Deposit);
        assert_eq!(EntryKind::parse(" WITHDRAWAL "), EntryKind::Withdrawal);
        assert_eq!(EntryKind::parse("gain"), EntryKind::Gain);
        assert_eq!(
            EntryKind::parse("bonus"),
            EntryKind::Unrecognized("bonus".to_string())
        );
    }

    #[test]
    fn test_kind_serde_uses_labels() {
        let json = serde_json::to_string(&EntryKind::Withdrawal).unwrap();
        assert_eq!(json, "\"withdrawal\"");

        let kind: EntryKind = serde_json::from_str("\"fee\"").unwrap();
        assert_eq!(kind, EntryKind::Unrecognized("fee".to_string()));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let err = LedgerEntry::new(
            Uuid::now_v7(),
            Track::Primary,
            EntryKind::Deposit,
            Decimal::from(-5),
            "bad",
        );
        assert!(matches!(err, Err(LedgerError::NegativeAmount(_))));
    }

    #[test]
    fn test_signed_amount() {
        let account = Uuid::now_v7();
        let w = LedgerEntry::new(
            account,
            Track::Temporal,
            EntryKind::Withdrawal,
            Decimal::from(40),
            "",
        )
        .unwrap();
        assert_eq!(w.signed_amount(), Some(Decimal::from(-40)));

        let odd = LedgerEntry::new(
            account,
            Track::Temporal,
            EntryKind::parse("bonus"),
            Decimal::from(40),
            "",
        )
        .unwrap();
        assert_eq!(odd.signed_amount(), None);
    }

    #[test]
    fn test_track_round_trip() {
        assert_eq!(Track::parse("Temporal"), Some(Track::Temporal));
        assert_eq!(Track::parse(Track::Primary.as_str()), Some(Track::Primary));
        assert_eq!(Track::parse("other"), None);
    }
}
