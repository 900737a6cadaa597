//! Confirmation records served by the four post-payment lookup endpoints.
//!
//! The backend writes these asynchronously after the processor webhook
//! fires, so every lookup may 404 for a short while after checkout. Each
//! endpoint returns a different projection; they are merged here into one
//! permissive shape where every field except the identifiers is optional.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedTransaction {
    #[serde(default)]
    pub transaction_id: Option<i64>,
    #[serde(default, rename = "stripeTransactionId")]
    pub processor_transaction_id: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Group lookups report the member share instead of `amount`.
    #[serde(default)]
    pub assigned_amount: Option<Decimal>,
    /// `paidAt` (group), `usedAt` (one-time) or `transactionCreatedAt` (shop).
    #[serde(default, alias = "usedAt", alias = "transactionCreatedAt")]
    pub paid_at: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expire_after: Option<String>,
    #[serde(default)]
    pub member_name: Option<String>,
    #[serde(default)]
    pub bill_id: Option<i64>,
    #[serde(default)]
    pub bill_status: Option<String>,
    #[serde(default)]
    pub bill_total: Option<Decimal>,
    #[serde(default)]
    pub bill_expires_at: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub items: Vec<ConfirmedTransactionItem>,
    #[serde(default)]
    pub shop_id: Option<i64>,
    #[serde(default)]
    pub shop_name: Option<String>,
    #[serde(default)]
    pub shop_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedTransactionItem {
    pub item_name: String,
    pub quantity: u32,
    pub price: Decimal,
}

impl ConfirmedTransaction {
    /// The amount actually charged, whichever projection carried it.
    pub fn charged_amount(&self) -> Option<Decimal> {
        self.amount.or(self.assigned_amount).or(self.bill_total)
    }
}
