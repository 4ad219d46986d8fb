use chrono::{DateTime, Utc};
use ledger::{EntryKind, Track};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Deposit,
    Withdrawal,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Deposit => "deposit",
            RequestKind::Withdrawal => "withdrawal",
        }
    }

    pub fn parse(value: &str) -> Option<RequestKind> {
        match value {
            "deposit" => Some(RequestKind::Deposit),
            "withdrawal" => Some(RequestKind::Withdrawal),
            _ => None,
        }
    }

    pub fn entry_kind(&self) -> EntryKind {
        match self {
            RequestKind::Deposit => EntryKind::Deposit,
            RequestKind::Withdrawal => EntryKind::Withdrawal,
        }
    }

    /// Capitalised name used in notification titles.
    pub fn title(&self) -> &'static str {
        match self {
            RequestKind::Deposit => "Deposit",
            RequestKind::Withdrawal => "Withdrawal",
        }
    }
}

/// Lifecycle of a request.
/// Transitions are one-way: pending → approved | rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    Pending,
    Approved,
    Rejected,
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Pending => "pending",
            RequestState::Approved => "approved",
            RequestState::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<RequestState> {
        match value {
            "pending" => Some(RequestState::Pending),
            "approved" => Some(RequestState::Approved),
            "rejected" => Some(RequestState::Rejected),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, target: RequestState) -> bool {
        matches!(
            (self, target),
            (RequestState::Pending, RequestState::Approved)
                | (RequestState::Pending, RequestState::Rejected)
        )
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RequestState::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }
}

/// A claim by an account holder for a future ledger entry.
///
/// Invariants:
/// - `amount` is fixed at submission
/// - once not pending, exactly one of approval or rejection details is set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub id: Uuid,
    pub account: Uuid,
    pub track: Track,
    pub kind: RequestKind,
    pub amount: Decimal,
    pub state: RequestState,
    pub submitted_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
    pub rejection_reason: Option<String>,
}

impl Request {
    pub fn new(account: Uuid, track: Track, kind: RequestKind, amount: Decimal) -> Self {
        Self {
            id: Uuid::now_v7(),
            account,
            track,
            kind,
            amount,
            state: RequestState::Pending,
            submitted_at: Utc::now(),
            resolved_at: None,
            resolved_by: None,
            rejection_reason: None,
        }
    }

    /// Whole days waiting, rounded up.
    pub fn days_pending(&self, now: DateTime<Utc>) -> i64 {
        let elapsed = (now - self.submitted_at).num_seconds().abs();
        (elapsed + 86_399) / 86_400
    }

    /// Apply a resolution in memory. Used by the in-memory adapter and tests.
    pub(crate) fn resolve(&mut self, resolution: &Resolution) -> Result<(), Error> {
        if !self.state.can_transition_to(resolution.to) {
            return Err(Error::Conflict(format!(
                "request {} is {}, not pending",
                self.id,
                self.state.as_str()
            )));
        }
        self.state = resolution.to;
        self.resolved_at = Some(resolution.at);
        self.resolved_by = Some(resolution.resolver);
        self.rejection_reason = resolution.reason.clone();
        Ok(())
    }
}

/// Target state plus audit details of an approval or rejection.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub to: RequestState,
    pub resolver: Uuid,
    pub at: DateTime<Utc>,
    pub reason: Option<String>,
}

impl Resolution {
    pub fn approve(resolver: Uuid) -> Self {
        Self {
            to: RequestState::Approved,
            resolver,
            at: Utc::now(),
            reason: None,
        }
    }

    pub fn reject(resolver: Uuid, reason: String) -> Self {
        Self {
            to: RequestState::Rejected,
            resolver,
            at: Utc::now(),
            reason: Some(reason),
        }
    }
}

/// Largest amount a single request may carry.
///
/// One trillion. Keeps every stored sum far inside the `Decimal` range.
pub const MAX_REQUEST_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Boundary validation for user-typed request amounts.
///
/// Accepts only a positive whole number written with plain digits and no
/// leading zero, at most [`MAX_REQUEST_AMOUNT`].
pub fn parse_request_amount(input: &str) -> Result<Decimal, Error> {
    let trimmed = input.trim();
    let invalid = || {
        Error::Validation(format!(
            "amount must be a positive whole number: {:?}",
            input
        ))
    };

    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if trimmed.starts_with('0') {
        return Err(invalid());
    }

    let amount = Decimal::from_str(trimmed).map_err(|_| invalid())?;
    if amount <= Decimal::ZERO {
        return Err(invalid());
    }
    validate_request_amount(amount)
}

/// Checks a typed amount: strictly positive, without a fractional part and
/// no larger than [`MAX_REQUEST_AMOUNT`].
pub fn validate_request_amount(amount: Decimal) -> Result<Decimal, Error> {
    if amount <= Decimal::ZERO || amount.fract() != Decimal::ZERO {
        return Err(Error::Validation(format!(
            "amount must be a positive whole number, got {}",
            amount
        )));
    }
    if amount > MAX_REQUEST_AMOUNT {
        return Err(Error::Validation(format!(
            "amount {} exceeds the limit of {}",
            amount, MAX_REQUEST_AMOUNT
        )));
    }
    Ok(amount.normalize())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestFilter {
    pub account: Option<Uuid>,
    pub track: Option<Track>,
    pub state: Option<RequestState>,
    pub kind: Option<RequestKind>,
}

impl RequestFilter {
    pub fn pending(track: Track) -> Self {
        Self {
            track: Some(track),
            state: Some(RequestState::Pending),
            ..Default::default()
        }
    }

    pub fn for_account(mut self, account: Uuid) -> Self {
        self.account = Some(account);
        self
    }

    pub fn matches(&self, request: &Request) -> bool {
        self.account.is_none_or(|a| a == request.account)
            && self.track.is_none_or(|t| t == request.track)
            && self.state.is_none_or(|s| s == request.state)
            && self.kind.is_none_or(|k| k == request.kind)
    }
}
