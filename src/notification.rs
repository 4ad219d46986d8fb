use chrono::{DateTime, Utc};
use ledger::{Currency, Track};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::request::Request;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        }
    }

    /// Unknown labels fall back to `Info`.
    pub fn parse(value: &str) -> NotificationKind {
        match value {
            "success" => NotificationKind::Success,
            "warning" => NotificationKind::Warning,
            "error" => NotificationKind::Error,
            _ => NotificationKind::Info,
        }
    }
}

/// One-way message to an account. Only ever created as a side effect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub account: Uuid,
    pub title: String,
    pub body: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    pub fn new(account: Uuid, kind: NotificationKind, title: String, body: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            account,
            title,
            body,
            kind,
            created_at: Utc::now(),
            read: false,
        }
    }

    pub fn request_approved(request: &Request, currency: &Currency) -> Self {
        Self::new(
            request.account,
            NotificationKind::Success,
            format!("{}{} approved", track_prefix(request.track), request.kind.title()),
            format!(
                "Your {}{} request for {} has been approved and processed.",
                track_adjective(request.track),
                request.kind.as_str(),
                currency.format(request.amount)
            ),
        )
    }

    pub fn request_rejected(request: &Request, reason: &str, currency: &Currency) -> Self {
        Self::new(
            request.account,
            NotificationKind::Error,
            format!("{}{} rejected", track_prefix(request.track), request.kind.title()),
            format!(
                "Your {}{} request for {} has been rejected. Reason: {}",
                track_adjective(request.track),
                request.kind.as_str(),
                currency.format(request.amount),
                reason
            ),
        )
    }

    pub fn payout(
        account: Uuid,
        track: Track,
        amount: Decimal,
        percentage: Decimal,
        currency: &Currency,
    ) -> Self {
        Self::new(
            account,
            NotificationKind::Success,
            format!("{}Gain processed", track_prefix(track)),
            format!(
                "A {}gain of {} has been credited, corresponding to {}% on total principal.",
                track_adjective(track),
                currency.format(amount),
                percentage.normalize()
            ),
        )
    }
}

fn track_prefix(track: Track) -> &'static str {
    match track {
        Track::Primary => "",
        Track::Temporal => "Temporal ",
    }
}

fn track_adjective(track: Track) -> &'static str {
    match track {
        Track::Primary => "",
        Track::Temporal => "temporal ",
    }
}
