//! Details resolution: one read endpoint per link kind.

use kanau::processor::Processor;
use linkcash_sdk::objects::Bill;
use tracing::{info, warn};

use crate::backend::PaymentBackend;
use crate::details::{PaymentDetails, ShopIdentity};
use crate::error::{FlowError, GENERIC_LINK_ERROR};
use crate::kind::PaymentFlowKind;
use crate::route::{BillPin, LinkIdentifier};

pub const ALREADY_USED: &str = "This payment link has already been used.";
pub const ALREADY_PAID: &str = "This bill has already been paid.";
pub const GROUP_COMPLETED: &str = "This group payment has already been completed.";

/// What a details lookup produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The link can be paid; session initiation may follow.
    Payable(PaymentDetails),
    /// The link resolved but is spent. Terminal: no session is requested.
    AlreadyCompleted {
        details: PaymentDetails,
        message: String,
    },
}

impl Resolution {
    pub fn details(&self) -> &PaymentDetails {
        match self {
            Resolution::Payable(details) => details,
            Resolution::AlreadyCompleted { details, .. } => details,
        }
    }

    pub fn is_payable(&self) -> bool {
        matches!(self, Resolution::Payable(_))
    }
}

#[derive(Debug, Clone)]
pub struct DetailsResolver<B> {
    backend: B,
}

impl<B: PaymentBackend> DetailsResolver<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

/// Look up a regular, one-time or group link.
///
/// Shop links resolve in two steps, see [`ResolveShop`] and [`ResolveBill`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveLinkDetails {
    pub kind: PaymentFlowKind,
    pub link_id: LinkIdentifier,
}

/// Locate the shop behind a QR token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveShop {
    pub qr_code: LinkIdentifier,
}

/// Fetch the bill a payer identified by PIN inside an already located shop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveBill {
    pub shop: ShopIdentity,
    pub pin: BillPin,
}

impl<B: PaymentBackend> Processor<ResolveLinkDetails> for DetailsResolver<B> {
    type Output = Resolution;
    type Error = FlowError;

    #[tracing::instrument(skip_all, err, fields(kind = %req.kind, link_id = %req.link_id))]
    async fn process(&self, req: ResolveLinkDetails) -> Result<Resolution, FlowError> {
        let link_id = req.link_id.as_str();
        let resolution = match req.kind {
            PaymentFlowKind::Regular => {
                let raw = self
                    .backend
                    .regular_link_details(link_id)
                    .await
                    .map_err(|e| lookup_failed(&e))?;
                Resolution::Payable(raw.into())
            }
            PaymentFlowKind::OneTime => {
                let raw = self
                    .backend
                    .one_time_link_details(link_id)
                    .await
                    .map_err(|e| lookup_failed(&e))?;
                let used = raw.used;
                let details = PaymentDetails::from(raw);
                if used {
                    Resolution::AlreadyCompleted {
                        details,
                        message: ALREADY_USED.to_string(),
                    }
                } else {
                    Resolution::Payable(details)
                }
            }
            PaymentFlowKind::Group => {
                let raw = self
                    .backend
                    .group_link_details(link_id)
                    .await
                    .map_err(|e| lookup_failed(&e))?;
                let completed = raw.is_completed;
                let details = PaymentDetails::from(raw);
                if completed {
                    Resolution::AlreadyCompleted {
                        details,
                        message: GROUP_COMPLETED.to_string(),
                    }
                } else {
                    Resolution::Payable(details)
                }
            }
            PaymentFlowKind::Shop => {
                warn!("shop links resolve through the QR and PIN lookups");
                return Err(FlowError::new(
                    crate::error::FlowErrorKind::LinkInvalid,
                    GENERIC_LINK_ERROR,
                    false,
                ));
            }
        };
        info!(
            key = %resolution.details().key,
            payable = resolution.is_payable(),
            "Link details resolved"
        );
        Ok(resolution)
    }
}

impl<B: PaymentBackend> Processor<ResolveShop> for DetailsResolver<B> {
    type Output = ShopIdentity;
    type Error = FlowError;

    #[tracing::instrument(skip_all, err, fields(qr_code = %req.qr_code))]
    async fn process(&self, req: ResolveShop) -> Result<ShopIdentity, FlowError> {
        let shop = self
            .backend
            .shop_by_qr_code(req.qr_code.as_str())
            .await
            .map_err(|e| lookup_failed(&e))?;
        info!(shop_id = shop.shop_id, "Shop located");
        Ok(shop.into())
    }
}

impl<B: PaymentBackend> Processor<ResolveBill> for DetailsResolver<B> {
    type Output = Resolution;
    type Error = FlowError;

    #[tracing::instrument(skip_all, err, fields(shop_id = req.shop.shop_id))]
    async fn process(&self, req: ResolveBill) -> Result<Resolution, FlowError> {
        let bill = self
            .backend
            .bill_by_pin(req.pin.as_str())
            .await
            .map_err(|e| lookup_failed(&e))?;
        let paid = bill.status.is_paid();
        check_bill_total(&bill);
        let details = PaymentDetails::from_bill(req.shop, bill);
        info!(key = %details.key, paid, "Bill resolved");
        if paid {
            Ok(Resolution::AlreadyCompleted {
                details,
                message: ALREADY_PAID.to_string(),
            })
        } else {
            Ok(Resolution::Payable(details))
        }
    }
}

/// Compare the bill total with its items. The backend total stays
/// authoritative; a mismatch is only logged.
fn check_bill_total(bill: &Bill) -> bool {
    let item_total = bill.item_total();
    if item_total != bill.total {
        warn!(
            bill_id = bill.bill_id,
            total = %bill.total,
            item_total = %item_total,
            "Bill total does not match its items"
        );
        return false;
    }
    true
}

fn lookup_failed(err: &linkcash_sdk::client::ClientError) -> FlowError {
    warn!(error = %err, status = ?err.status(), "Details lookup failed");
    FlowError::link_invalid(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::error::FlowErrorKind;
    use crate::kind::PrimaryKey;
    use linkcash_sdk::objects::{
        Bill, BillItem, BillStatus, GroupLinkDetails, GroupMemberEntry, OneTimeLinkDetails,
        RegularLinkDetails, Shop,
    };
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::Arc;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn link(s: &str) -> LinkIdentifier {
        LinkIdentifier::new(s).unwrap()
    }

    fn backend() -> Arc<FakeBackend> {
        let backend = FakeBackend::default();
        backend.regular.lock().unwrap().insert(
            "abc123".into(),
            RegularLinkDetails {
                payment_detail_id: 7,
                payment_detail_user_id: 1,
                title: "Invoice".into(),
                description: None,
                amount: dec("45.00"),
                expire_after: None,
            },
        );
        backend.one_time.lock().unwrap().insert(
            "spent".into(),
            OneTimeLinkDetails {
                one_time_payment_details_id: 3,
                payment_detail_user_id: 2,
                title: "Ticket".into(),
                description: None,
                amount: dec("12.50"),
                expire_after: None,
                used: true,
            },
        );
        backend.group.lock().unwrap().insert(
            "dinner".into(),
            GroupLinkDetails {
                group_payment_id: 9,
                user_id: Some(4),
                title: "Dinner".into(),
                description: None,
                total_amount: dec("60.00"),
                expire_after: None,
                members: vec![GroupMemberEntry {
                    member_payment_id: 11,
                    member_name: "Ann".into(),
                    assigned_amount: dec("30.00"),
                    paid: false,
                }],
                is_completed: false,
            },
        );
        backend.shops.lock().unwrap().insert(
            "qr-1".into(),
            Shop {
                shop_id: 5,
                shop_name: "Corner Cafe".into(),
                address: Some("1 High St".into()),
            },
        );
        for (pin, status) in [("1234", BillStatus::Unpaid), ("9999", BillStatus::Paid)] {
            backend.bills.lock().unwrap().insert(
                pin.into(),
                Bill {
                    bill_id: if status.is_paid() { 21 } else { 20 },
                    customer_name: Some("Bo".into()),
                    total: dec("8.40"),
                    status,
                    expires_at: None,
                    items: vec![BillItem {
                        item_id: Some(1),
                        item_name: "Tea".into(),
                        quantity: 2,
                        price: dec("4.20"),
                    }],
                },
            );
        }
        Arc::new(backend)
    }

    #[tokio::test]
    async fn test_regular_details_carry_matching_key() {
        let resolver = DetailsResolver::new(backend());
        let resolution = resolver
            .process(ResolveLinkDetails {
                kind: PaymentFlowKind::Regular,
                link_id: link("abc123"),
            })
            .await
            .unwrap();
        let details = resolution.details();
        assert!(resolution.is_payable());
        assert_eq!(details.key, PrimaryKey::PaymentDetail(7));
        assert_eq!(details.kind(), PaymentFlowKind::Regular);
        assert_eq!(details.owner_user_id, Some(1));
        assert_eq!(details.amount.to_string(), "45.00");
    }

    #[tokio::test]
    async fn test_used_one_time_link_is_already_completed() {
        let resolver = DetailsResolver::new(backend());
        let resolution = resolver
            .process(ResolveLinkDetails {
                kind: PaymentFlowKind::OneTime,
                link_id: link("spent"),
            })
            .await
            .unwrap();
        match resolution {
            Resolution::AlreadyCompleted { details, message } => {
                assert_eq!(details.key, PrimaryKey::OneTimePaymentDetails(3));
                assert_eq!(message, ALREADY_USED);
            }
            other => panic!("expected already completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_group_details_keep_members() {
        let resolver = DetailsResolver::new(backend());
        let resolution = resolver
            .process(ResolveLinkDetails {
                kind: PaymentFlowKind::Group,
                link_id: link("dinner"),
            })
            .await
            .unwrap();
        assert!(resolution.is_payable());
        assert_eq!(resolution.details().key, PrimaryKey::GroupPayment(9));
        assert_eq!(resolution.details().members().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_link_keeps_backend_message() {
        let resolver = DetailsResolver::new(backend());
        let err = resolver
            .process(ResolveLinkDetails {
                kind: PaymentFlowKind::Regular,
                link_id: link("missing"),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, FlowErrorKind::LinkInvalid);
        assert_eq!(err.message, "Payment link not found");
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn test_shop_kind_is_not_a_direct_lookup() {
        let resolver = DetailsResolver::new(backend());
        let err = resolver
            .process(ResolveLinkDetails {
                kind: PaymentFlowKind::Shop,
                link_id: link("qr-1"),
            })
            .await
            .unwrap_err();
        assert_eq!(err.message, GENERIC_LINK_ERROR);
    }

    #[tokio::test]
    async fn test_shop_then_bill() {
        let resolver = DetailsResolver::new(backend());
        let shop = resolver
            .process(ResolveShop {
                qr_code: link("qr-1"),
            })
            .await
            .unwrap();
        assert_eq!(shop.shop_id, 5);

        let unpaid = resolver
            .process(ResolveBill {
                shop: shop.clone(),
                pin: crate::route::classify_pin("1234").unwrap(),
            })
            .await
            .unwrap();
        assert!(unpaid.is_payable());
        assert_eq!(
            unpaid.details().key,
            PrimaryKey::Bill {
                shop_id: 5,
                bill_id: 20
            }
        );

        let paid = resolver
            .process(ResolveBill {
                shop,
                pin: crate::route::classify_pin("9999").unwrap(),
            })
            .await
            .unwrap();
        assert!(matches!(paid, Resolution::AlreadyCompleted { .. }));
    }

    #[tokio::test]
    async fn test_bill_with_mismatched_items_keeps_backend_total() {
        let backend = backend();
        let mismatched = Bill {
            bill_id: 22,
            customer_name: None,
            total: dec("10.00"),
            status: BillStatus::Unpaid,
            expires_at: None,
            items: vec![BillItem {
                item_id: Some(1),
                item_name: "Tea".into(),
                quantity: 2,
                price: dec("4.20"),
            }],
        };
        assert!(!check_bill_total(&mismatched));
        assert!(check_bill_total(&backend.bills.lock().unwrap()["1234"]));
        backend.bills.lock().unwrap().insert("5555".into(), mismatched);

        let resolver = DetailsResolver::new(backend);
        let resolution = resolver
            .process(ResolveBill {
                shop: ShopIdentity {
                    shop_id: 5,
                    name: "Corner Cafe".into(),
                    address: None,
                },
                pin: crate::route::classify_pin("5555").unwrap(),
            })
            .await
            .unwrap();
        assert!(resolution.is_payable());
        assert_eq!(resolution.details().amount.to_string(), "10.00");
    }
}
