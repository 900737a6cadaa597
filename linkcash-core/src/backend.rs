//! The seam between the orchestration core and the payment-link backend.
//!
//! [`PaymentBackend`] lists exactly the calls the flow makes. The production
//! implementation is the SDK's [`BackendClient`]; tests substitute in-memory
//! fakes so the state machine and the poller can be exercised without a
//! network.

use async_trait::async_trait;
use linkcash_sdk::client::{BackendClient, ClientError};
use linkcash_sdk::objects::{
    Bill, ConfirmedTransaction, GroupLinkDetails, InitiatePayment, InitiateResponse,
    OneTimeLinkDetails, RegularLinkDetails, Shop,
};

use crate::error::FlowError;
use crate::route::{LinkIdentifier, SuccessRoute};

/// Which confirmation endpoint to poll, with its correlation ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationLookup {
    Regular {
        link_id: LinkIdentifier,
        payment_intent_id: String,
    },
    OneTime {
        link_id: LinkIdentifier,
    },
    GroupMember {
        group_payment_id: i64,
        member_payment_id: i64,
    },
    ShopBill {
        bill_id: i64,
    },
}

impl TryFrom<&SuccessRoute> for ConfirmationLookup {
    type Error = FlowError;

    fn try_from(route: &SuccessRoute) -> Result<Self, FlowError> {
        match route {
            SuccessRoute::Regular {
                link_id,
                payment_intent_id: Some(pi),
            } => Ok(ConfirmationLookup::Regular {
                link_id: link_id.clone(),
                payment_intent_id: pi.clone(),
            }),
            SuccessRoute::Regular {
                payment_intent_id: None,
                ..
            } => Err(FlowError::missing_correlation("Missing Payment Intent ID.")),
            SuccessRoute::OneTime { link_id } => Ok(ConfirmationLookup::OneTime {
                link_id: link_id.clone(),
            }),
            SuccessRoute::Group {
                group_payment_id: Some(group_payment_id),
                member_payment_id: Some(member_payment_id),
            } => Ok(ConfirmationLookup::GroupMember {
                group_payment_id: *group_payment_id,
                member_payment_id: *member_payment_id,
            }),
            SuccessRoute::Group { .. } => Err(FlowError::missing_correlation("Missing identifiers")),
            SuccessRoute::Shop {
                bill_id: Some(bill_id),
            } => Ok(ConfirmationLookup::ShopBill { bill_id: *bill_id }),
            SuccessRoute::Shop { bill_id: None } => {
                Err(FlowError::missing_correlation("No bill ID provided in URL."))
            }
        }
    }
}

impl std::fmt::Display for ConfirmationLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfirmationLookup::Regular {
                link_id,
                payment_intent_id,
            } => write!(f, "regular:{link_id}:{payment_intent_id}"),
            ConfirmationLookup::OneTime { link_id } => write!(f, "one-time:{link_id}"),
            ConfirmationLookup::GroupMember {
                group_payment_id,
                member_payment_id,
            } => write!(f, "group:{group_payment_id}:{member_payment_id}"),
            ConfirmationLookup::ShopBill { bill_id } => write!(f, "shop:{bill_id}"),
        }
    }
}

#[async_trait]
pub trait PaymentBackend: Send + Sync {
    async fn regular_link_details(&self, link_id: &str) -> Result<RegularLinkDetails, ClientError>;

    async fn one_time_link_details(&self, link_id: &str)
    -> Result<OneTimeLinkDetails, ClientError>;

    async fn group_link_details(&self, link_id: &str) -> Result<GroupLinkDetails, ClientError>;

    async fn shop_by_qr_code(&self, qr_code: &str) -> Result<Shop, ClientError>;

    async fn bill_by_pin(&self, pin: &str) -> Result<Bill, ClientError>;

    async fn initiate_transaction(
        &self,
        payload: &InitiatePayment,
    ) -> Result<InitiateResponse, ClientError>;

    async fn confirmed_transaction(
        &self,
        lookup: &ConfirmationLookup,
    ) -> Result<ConfirmedTransaction, ClientError>;
}

#[async_trait]
impl PaymentBackend for BackendClient {
    async fn regular_link_details(&self, link_id: &str) -> Result<RegularLinkDetails, ClientError> {
        BackendClient::regular_link_details(self, link_id).await
    }

    async fn one_time_link_details(
        &self,
        link_id: &str,
    ) -> Result<OneTimeLinkDetails, ClientError> {
        BackendClient::one_time_link_details(self, link_id).await
    }

    async fn group_link_details(&self, link_id: &str) -> Result<GroupLinkDetails, ClientError> {
        BackendClient::group_link_details(self, link_id).await
    }

    async fn shop_by_qr_code(&self, qr_code: &str) -> Result<Shop, ClientError> {
        BackendClient::shop_by_qr_code(self, qr_code).await
    }

    async fn bill_by_pin(&self, pin: &str) -> Result<Bill, ClientError> {
        BackendClient::bill_by_pin(self, pin).await
    }

    async fn initiate_transaction(
        &self,
        payload: &InitiatePayment,
    ) -> Result<InitiateResponse, ClientError> {
        BackendClient::initiate_transaction(self, payload).await
    }

    async fn confirmed_transaction(
        &self,
        lookup: &ConfirmationLookup,
    ) -> Result<ConfirmedTransaction, ClientError> {
        match lookup {
            ConfirmationLookup::Regular {
                link_id,
                payment_intent_id,
            } => self.regular_confirmation(link_id.as_str(), payment_intent_id).await,
            ConfirmationLookup::OneTime { link_id } => {
                self.one_time_confirmation(link_id.as_str()).await
            }
            ConfirmationLookup::GroupMember {
                group_payment_id,
                member_payment_id,
            } => {
                self.group_member_confirmation(*group_payment_id, *member_payment_id)
                    .await
            }
            ConfirmationLookup::ShopBill { bill_id } => {
                self.shop_bill_confirmation(*bill_id).await
            }
        }
    }
}

#[async_trait]
impl<T: PaymentBackend + ?Sized> PaymentBackend for std::sync::Arc<T> {
    async fn regular_link_details(&self, link_id: &str) -> Result<RegularLinkDetails, ClientError> {
        (**self).regular_link_details(link_id).await
    }

    async fn one_time_link_details(
        &self,
        link_id: &str,
    ) -> Result<OneTimeLinkDetails, ClientError> {
        (**self).one_time_link_details(link_id).await
    }

    async fn group_link_details(&self, link_id: &str) -> Result<GroupLinkDetails, ClientError> {
        (**self).group_link_details(link_id).await
    }

    async fn shop_by_qr_code(&self, qr_code: &str) -> Result<Shop, ClientError> {
        (**self).shop_by_qr_code(qr_code).await
    }

    async fn bill_by_pin(&self, pin: &str) -> Result<Bill, ClientError> {
        (**self).bill_by_pin(pin).await
    }

    async fn initiate_transaction(
        &self,
        payload: &InitiatePayment,
    ) -> Result<InitiateResponse, ClientError> {
        (**self).initiate_transaction(payload).await
    }

    async fn confirmed_transaction(
        &self,
        lookup: &ConfirmationLookup,
    ) -> Result<ConfirmedTransaction, ClientError> {
        (**self).confirmed_transaction(lookup).await
    }
}
