//! Request and response bodies for `POST /api/transactions/initiate`.
//!
//! All four link kinds share this one endpoint. The body is discriminated by
//! `paymentType`; each variant carries only the fields its kind needs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "paymentType",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum InitiatePayment {
    Regular {
        payment_detail_id: i64,
        user_id: i64,
        amount: Decimal,
    },
    OneTime {
        one_time_payment_details_id: i64,
        user_id: i64,
        amount: Decimal,
    },
    Group {
        group_payment_id: i64,
        member_payment_id: i64,
        amount: Decimal,
    },
    Shop {
        shop_id: i64,
        bill_id: i64,
        amount: Decimal,
    },
}

impl InitiatePayment {
    pub fn payment_type(&self) -> PaymentType {
        match self {
            InitiatePayment::Regular { .. } => PaymentType::Regular,
            InitiatePayment::OneTime { .. } => PaymentType::OneTime,
            InitiatePayment::Group { .. } => PaymentType::Group,
            InitiatePayment::Shop { .. } => PaymentType::Shop,
        }
    }

    pub fn amount(&self) -> Decimal {
        match self {
            InitiatePayment::Regular { amount, .. }
            | InitiatePayment::OneTime { amount, .. }
            | InitiatePayment::Group { amount, .. }
            | InitiatePayment::Shop { amount, .. } => *amount,
        }
    }
}

/// The `paymentType` discriminator on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentType {
    Regular,
    OneTime,
    Group,
    Shop,
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentType::Regular => write!(f, "regular"),
            PaymentType::OneTime => write!(f, "oneTime"),
            PaymentType::Group => write!(f, "group"),
            PaymentType::Shop => write!(f, "shop"),
        }
    }
}

/// Successful initiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateResponse {
    pub client_secret: String,
}

/// Body of a rejected initiation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiateError {
    #[serde(default)]
    pub error: Option<String>,
}
