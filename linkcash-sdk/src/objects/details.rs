//! Payment-link detail shapes returned by the three `/link/{linkId}/details`
//! endpoints.
//!
//! The backend keeps a separate table per link kind, so each kind has its
//! own primary-key field name. Normalization into a single view happens in
//! `linkcash-core`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `GET /api/payment-links/link/{linkId}/details`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegularLinkDetails {
    pub payment_detail_id: i64,
    pub payment_detail_user_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub expire_after: Option<String>,
}

/// `GET /api/one-time-payment-links/link/{linkId}/details`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneTimeLinkDetails {
    pub one_time_payment_details_id: i64,
    pub payment_detail_user_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub expire_after: Option<String>,
    /// Set once the single permitted payment has gone through.
    #[serde(default)]
    pub used: bool,
}

/// `GET /api/group-payment-links/link/{linkId}/details`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupLinkDetails {
    pub group_payment_id: i64,
    #[serde(default, alias = "groupPaymentUserId")]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub total_amount: Decimal,
    #[serde(default)]
    pub expire_after: Option<String>,
    #[serde(default)]
    pub members: Vec<GroupMemberEntry>,
    /// Older backend builds name this flag `completed`.
    #[serde(default, alias = "completed")]
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMemberEntry {
    pub member_payment_id: i64,
    pub member_name: String,
    pub assigned_amount: Decimal,
    #[serde(default)]
    pub paid: bool,
}
