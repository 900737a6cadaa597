//! The four payment models a link can belong to.

/// Which payment model a flow runs under.
///
/// Chosen by the link classifier from the entry route and fixed for the
/// lifetime of the flow: it selects the details endpoint, the initiation
/// payload and the confirmation lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentFlowKind {
    Regular,
    OneTime,
    Group,
    Shop,
}

impl PaymentFlowKind {
    /// Whether the payer must pick a member before a session can be created.
    pub fn requires_member(self) -> bool {
        matches!(self, PaymentFlowKind::Group)
    }
}

impl std::fmt::Display for PaymentFlowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentFlowKind::Regular => write!(f, "regular"),
            PaymentFlowKind::OneTime => write!(f, "one-time"),
            PaymentFlowKind::Group => write!(f, "group"),
            PaymentFlowKind::Shop => write!(f, "shop"),
        }
    }
}

/// The kind-specific backend key of a resolved link.
///
/// Exactly one exists per [`PaymentDetails`](crate::details::PaymentDetails),
/// and its variant is what decides the details' kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimaryKey {
    PaymentDetail(i64),
    OneTimePaymentDetails(i64),
    GroupPayment(i64),
    Bill { shop_id: i64, bill_id: i64 },
}

impl PrimaryKey {
    pub fn kind(&self) -> PaymentFlowKind {
        match self {
            PrimaryKey::PaymentDetail(_) => PaymentFlowKind::Regular,
            PrimaryKey::OneTimePaymentDetails(_) => PaymentFlowKind::OneTime,
            PrimaryKey::GroupPayment(_) => PaymentFlowKind::Group,
            PrimaryKey::Bill { .. } => PaymentFlowKind::Shop,
        }
    }
}

impl std::fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimaryKey::PaymentDetail(id) => write!(f, "paymentDetailId={id}"),
            PrimaryKey::OneTimePaymentDetails(id) => write!(f, "oneTimePaymentDetailsId={id}"),
            PrimaryKey::GroupPayment(id) => write!(f, "groupPaymentId={id}"),
            PrimaryKey::Bill { shop_id, bill_id } => write!(f, "shopId={shop_id},billId={bill_id}"),
        }
    }
}
