//! Transaction and payout records as returned by the payments backend

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::history::{RawTimestamp, TimestampedRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl TransactionStatus {
    /// Money has moved and will not change again
    pub fn is_settled(&self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Refunded)
    }
}

/// How the customer was asked to pay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Qr,
    PaymentLink,
}

/// Incoming payment shown in transaction history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    /// RFC 3339
    pub created_at: String,
    /// Minor units (cents)
    pub amount: u64,
    /// ISO 4217, lowercase as sent by the backend
    pub currency: String,
    pub status: TransactionStatus,
    #[serde(default)]
    pub description: Option<String>,
    pub payment_method: PaymentMethod,
}

impl TransactionRecord {
    pub fn formatted_amount(&self) -> String {
        format_amount(self.amount, &self.currency)
    }
}

impl TimestampedRecord for TransactionRecord {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> RawTimestamp<'_> {
        RawTimestamp::Text(&self.created_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    InTransit,
    Paid,
    Failed,
    Canceled,
}

/// Transfer from the merchant balance to their bank account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub id: String,
    /// Unix seconds
    pub arrival_date: i64,
    pub amount: u64,
    pub currency: String,
    pub status: PayoutStatus,
}

impl PayoutRecord {
    pub fn formatted_amount(&self) -> String {
        format_amount(self.amount, &self.currency)
    }
}

impl TimestampedRecord for PayoutRecord {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> RawTimestamp<'_> {
        RawTimestamp::Unix(self.arrival_date)
    }
}

/// Completed volume for one currency
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CurrencySummary {
    pub count: usize,
    pub total: u64,
}

/// Completed volume per currency; pending, failed and refunded payments are excluded
pub fn summarize<'a, I>(records: I) -> BTreeMap<String, CurrencySummary>
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    let mut summary: BTreeMap<String, CurrencySummary> = BTreeMap::new();
    for tx in records
        .into_iter()
        .filter(|tx| tx.status == TransactionStatus::Completed)
    {
        let entry = summary.entry(tx.currency.to_lowercase()).or_default();
        entry.count += 1;
        entry.total = entry.total.saturating_add(tx.amount);
    }
    summary
}

/// `1250, "usd"` -> `$12.50`
pub fn format_amount(minor_units: u64, currency: &str) -> String {
    let code = currency.to_lowercase();
    let symbol = match code.as_str() {
        "usd" => "$".to_string(),
        "jmd" => "J$".to_string(),
        "eur" => "€".to_string(),
        "gbp" => "£".to_string(),
        other => format!("{} ", other.to_uppercase()),
    };
    format!("{}{}.{:02}", symbol, minor_units / 100, minor_units % 100)
}
