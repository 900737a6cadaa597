//! Shop / QR-bill shapes.
//!
//! A shop is located by the token printed in its QR code; a bill inside the
//! shop is then located by the PIN the cashier gives the payer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `GET /api/shops/qrcode/{qrCode}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    pub shop_id: i64,
    #[serde(default)]
    pub shop_name: String,
    #[serde(default)]
    pub address: Option<String>,
}

/// `GET /api/bills/{pin}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub bill_id: i64,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub total: Decimal,
    pub status: BillStatus,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub items: Vec<BillItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillItem {
    #[serde(default)]
    pub item_id: Option<i64>,
    pub item_name: String,
    pub quantity: u32,
    pub price: Decimal,
}

/// Bill settlement status as reported by the shop backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BillStatus {
    #[serde(alias = "paid")]
    Paid,
    #[serde(alias = "unpaid")]
    Unpaid,
    #[serde(alias = "pending")]
    Pending,
    #[serde(other)]
    Unknown,
}

impl BillStatus {
    pub fn is_paid(self) -> bool {
        matches!(self, BillStatus::Paid)
    }
}

impl std::fmt::Display for BillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BillStatus::Paid => write!(f, "PAID"),
            BillStatus::Unpaid => write!(f, "UNPAID"),
            BillStatus::Pending => write!(f, "PENDING"),
            BillStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl Bill {
    /// Sum of `price * quantity` over all items.
    ///
    /// The backend is authoritative for `total`; this is only used to flag a
    /// mismatch in logs.
    pub fn item_total(&self) -> Decimal {
        self.items
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum()
    }
}
