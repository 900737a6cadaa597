//! Normalized payment details.
//!
//! The backend serves four unrelated JSON shapes for the four link kinds.
//! [`PaymentDetails`] folds them into one view; the kind-specific parts that
//! only some flows need (group members, bill lines) live in [`DetailExtras`].

use linkcash_sdk::objects::{
    Bill, BillItem, BillStatus, GroupLinkDetails, GroupMemberEntry, OneTimeLinkDetails,
    RegularLinkDetails, Shop,
};
use rust_decimal::Decimal;

use crate::kind::{PaymentFlowKind, PrimaryKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDetails {
    pub key: PrimaryKey,
    pub title: String,
    pub description: Option<String>,
    /// Full amount of the link. For group links this is the total across
    /// members; each member pays their own `assigned_amount`.
    pub amount: Decimal,
    pub expires: Option<String>,
    pub owner_user_id: Option<i64>,
    pub extras: DetailExtras,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailExtras {
    Plain,
    Group {
        members: Vec<GroupMember>,
    },
    Shop {
        shop: ShopIdentity,
        customer_name: Option<String>,
        status: BillStatus,
        items: Vec<BillItem>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub member_payment_id: i64,
    pub name: String,
    pub assigned_amount: Decimal,
    /// Flipped by the backend only.
    pub paid: bool,
}

/// A shop located through its QR code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopIdentity {
    pub shop_id: i64,
    pub name: String,
    pub address: Option<String>,
}

impl PaymentDetails {
    pub fn kind(&self) -> PaymentFlowKind {
        self.key.kind()
    }

    pub fn members(&self) -> &[GroupMember] {
        match &self.extras {
            DetailExtras::Group { members } => members,
            _ => &[],
        }
    }

    pub fn member(&self, member_payment_id: i64) -> Option<&GroupMember> {
        self.members()
            .iter()
            .find(|m| m.member_payment_id == member_payment_id)
    }

    /// Members the payer may still select.
    pub fn unpaid_members(&self) -> impl Iterator<Item = &GroupMember> {
        self.members().iter().filter(|m| !m.paid)
    }
}

impl From<RegularLinkDetails> for PaymentDetails {
    fn from(d: RegularLinkDetails) -> Self {
        Self {
            key: PrimaryKey::PaymentDetail(d.payment_detail_id),
            title: d.title,
            description: d.description,
            amount: d.amount,
            expires: d.expire_after,
            owner_user_id: Some(d.payment_detail_user_id),
            extras: DetailExtras::Plain,
        }
    }
}

impl From<OneTimeLinkDetails> for PaymentDetails {
    fn from(d: OneTimeLinkDetails) -> Self {
        Self {
            key: PrimaryKey::OneTimePaymentDetails(d.one_time_payment_details_id),
            title: d.title,
            description: d.description,
            amount: d.amount,
            expires: d.expire_after,
            owner_user_id: Some(d.payment_detail_user_id),
            extras: DetailExtras::Plain,
        }
    }
}

impl From<GroupMemberEntry> for GroupMember {
    fn from(m: GroupMemberEntry) -> Self {
        Self {
            member_payment_id: m.member_payment_id,
            name: m.member_name,
            assigned_amount: m.assigned_amount,
            paid: m.paid,
        }
    }
}

impl From<GroupLinkDetails> for PaymentDetails {
    fn from(d: GroupLinkDetails) -> Self {
        Self {
            key: PrimaryKey::GroupPayment(d.group_payment_id),
            title: d.title,
            description: d.description,
            amount: d.total_amount,
            expires: d.expire_after,
            owner_user_id: d.user_id,
            extras: DetailExtras::Group {
                members: d.members.into_iter().map(GroupMember::from).collect(),
            },
        }
    }
}

impl From<Shop> for ShopIdentity {
    fn from(s: Shop) -> Self {
        Self {
            shop_id: s.shop_id,
            name: s.shop_name,
            address: s.address,
        }
    }
}

impl PaymentDetails {
    /// Build the details of a bill found inside `shop`.
    pub fn from_bill(shop: ShopIdentity, bill: Bill) -> Self {
        let title = match &bill.customer_name {
            Some(customer) => format!("{} bill for {customer}", shop.name),
            None => format!("{} bill #{}", shop.name, bill.bill_id),
        };
        Self {
            key: PrimaryKey::Bill {
                shop_id: shop.shop_id,
                bill_id: bill.bill_id,
            },
            title,
            description: shop.address.clone(),
            amount: bill.total,
            expires: bill.expires_at,
            owner_user_id: None,
            extras: DetailExtras::Shop {
                shop,
                customer_name: bill.customer_name,
                status: bill.status,
                items: bill.items,
            },
        }
    }
}
