// ledger/src/error.rs
use rust_decimal::Decimal;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerError {
    NegativeAmount(Decimal),
    UnknownTrack(String),
    /// A sum left the range `Decimal` can represent.
    Overflow(&'static str),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeAmount(amount) => write!(f, "Negative amount: {}", amount),
            Self::UnknownTrack(track) => write!(f, "Unknown track: {}", track),
            Self::Overflow(what) => write!(f, "Arithmetic overflow in {}", what),
        }
    }
}

impl std::error::Error for LedgerError {}
