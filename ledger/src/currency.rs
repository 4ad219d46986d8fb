// ledger/src/currency.rs
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub decimals: u32,
}

impl Currency {
    pub fn new(code: &str, decimals: u32) -> Self {
        Self {
            code: code.to_string(),
            decimals,
        }
    }

    pub fn usd() -> Self {
        Self::new("USD", 2)
    }

    /// Half-away-from-zero rounding to the minor unit.
    pub fn round(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.decimals, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Truncate to the minor unit. Used for payouts so a split never pays out
    /// more than the total.
    pub fn truncate(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.decimals, RoundingStrategy::ToZero)
    }

    /// `$1,234.50` for USD, `1,234.50 EUR` for everything else.
    pub fn format(&self, amount: Decimal) -> String {
        let rounded = self.round(amount);
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let mut fixed = rounded.abs();
        fixed.rescale(self.decimals);
        let text = fixed.to_string();

        let (int_part, frac_part) = match text.split_once('.') {
            Some((i, f)) => (i.to_string(), Some(f.to_string())),
            None => (text, None),
        };

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        if let Some(frac) = frac_part {
            grouped.push('.');
            grouped.push_str(&frac);
        }

        let sign = if negative { "-" } else { "" };
        if self.code == "USD" {
            format!("{}${}", sign, grouped)
        } else {
            format!("{}{} {}", sign, grouped, self.code)
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::usd()
    }
}
