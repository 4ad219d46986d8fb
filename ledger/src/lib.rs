// ledger/src/lib.rs
//! Signed-sum ledger for investor accounts.
//!
//! Entries are immutable facts (`deposit`, `withdrawal`, `gain`) recorded
//! against an account on a [`Track`]. Balances are never stored: they are
//! derived on demand from the full entry history, so they cannot drift from
//! the entries that define them.
//!
//! ```rust,ignore
//! let balance = ledger::compute_balance(&entries)?;
//! let chart = ledger::monthly_gains(&entries, today)?;
//! ```
pub mod balance;
pub mod currency;
pub mod entry;
pub mod error;
pub mod rollup;

pub use balance::{Balance, Breakdown, TrackSummary, compute_balance, parse_amount_lenient};
pub use currency::Currency;
pub use entry::{EntryKind, LedgerEntry, Track};
pub use error::LedgerError;
pub use rollup::{MonthlyGain, ROLLUP_MONTHS, monthly_gains};
