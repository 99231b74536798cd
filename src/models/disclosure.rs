//! Disclosed-trade model representing a single congressional filing line.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Kind of transaction reported in a disclosure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Purchase,
    Sale,
    Exchange,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Purchase => "PURCHASE",
            TransactionKind::Sale => "SALE",
            TransactionKind::Exchange => "EXCHANGE",
        }
    }

    /// Parse the free-text transaction type found in filings.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "purchase" | "buy" => Ok(TransactionKind::Purchase),
            "sale" | "sell" | "sale (full)" | "sale (partial)" => Ok(TransactionKind::Sale),
            "exchange" => Ok(TransactionKind::Exchange),
            other => bail!("Unknown transaction type: {other}"),
        }
    }

    pub fn is_purchase(&self) -> bool {
        matches!(self, TransactionKind::Purchase)
    }

    pub fn is_sale(&self) -> bool {
        matches!(self, TransactionKind::Sale)
    }
}

/// A single disclosed trade as filed by a member of Congress.
///
/// Immutable once ingested; the decision pipeline only reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisclosedTrade {
    /// Filing politician's normalized name
    pub politician: String,

    /// Party affiliation (R, D, I) when known
    #[serde(default)]
    pub party: Option<String>,

    /// Stock ticker symbol
    pub ticker: String,

    /// Transaction kind
    pub kind: TransactionKind,

    /// When the trade was executed
    pub transaction_date: NaiveDate,

    /// When the trade became public. Entry decisions key off this date,
    /// not the transaction date.
    pub disclosure_date: NaiveDate,

    /// Raw amount range from the filing (e.g. "$15,001 - $50,000")
    #[serde(default)]
    pub amount_range: String,

    /// Estimated dollar amount (midpoint of the range)
    pub estimated_amount: Option<Decimal>,
}

impl DisclosedTrade {
    /// Days between execution and public disclosure.
    pub fn disclosure_lag_days(&self) -> i64 {
        (self.disclosure_date - self.transaction_date).num_days()
    }
}

/// Estimate a dollar amount from a filing's amount range.
///
/// Filings report ranges like "$1,001 - $15,000" or "Over $1,000,000".
/// Returns the midpoint for ranges, 1.5x the bound for "Over X", the value
/// itself for a plain number, and a $35,000 fallback (roughly the median
/// congressional trade) when the text is unparseable.
pub fn estimate_amount(amount_range: &str) -> Decimal {
    let cleaned = amount_range.replace('$', "").replace(',', "");
    let cleaned = cleaned.trim();

    if let Some(rest) = cleaned
        .to_lowercase()
        .strip_prefix("over")
        .map(str::to_string)
    {
        if let Ok(amount) = rest.trim().parse::<Decimal>() {
            return amount * dec!(1.5);
        }
    }

    if let Some((low, high)) = cleaned.split_once('-') {
        if let (Ok(low), Ok(high)) = (low.trim().parse::<Decimal>(), high.trim().parse::<Decimal>())
        {
            return (low + high) / dec!(2);
        }
    }

    if let Ok(amount) = cleaned.parse::<Decimal>() {
        return amount;
    }

    dec!(35000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transaction_kind() {
        assert_eq!(
            TransactionKind::parse("Purchase").unwrap(),
            TransactionKind::Purchase
        );
        assert_eq!(TransactionKind::parse("buy").unwrap(), TransactionKind::Purchase);
        assert_eq!(
            TransactionKind::parse("Sale (Partial)").unwrap(),
            TransactionKind::Sale
        );
        assert_eq!(TransactionKind::parse("sell").unwrap(), TransactionKind::Sale);
        assert!(TransactionKind::parse("gift").is_err());
    }

    #[test]
    fn test_estimate_amount_range_midpoint() {
        assert_eq!(estimate_amount("$1,001 - $15,000"), dec!(8000.5));
        assert_eq!(estimate_amount("$15,001 - $50,000"), dec!(32500.5));
    }

    #[test]
    fn test_estimate_amount_over_format() {
        assert_eq!(estimate_amount("Over $1,000,000"), dec!(1500000));
    }

    #[test]
    fn test_estimate_amount_plain_number() {
        assert_eq!(estimate_amount("$25,000"), dec!(25000));
    }

    #[test]
    fn test_estimate_amount_fallback() {
        assert_eq!(estimate_amount("undisclosed"), dec!(35000));
    }

    #[test]
    fn test_disclosure_lag() {
        let trade = DisclosedTrade {
            politician: "Jane Doe".to_string(),
            party: Some("D".to_string()),
            ticker: "AAPL".to_string(),
            kind: TransactionKind::Purchase,
            transaction_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            disclosure_date: NaiveDate::from_ymd_opt(2024, 2, 16).unwrap(),
            amount_range: "$15,001 - $50,000".to_string(),
            estimated_amount: Some(dec!(32500.5)),
        };

        assert_eq!(trade.disclosure_lag_days(), 45);
    }
}
