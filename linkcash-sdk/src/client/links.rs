//! Link-detail endpoints (read-only, called before checkout).

use super::{BackendClient, ClientError, segment};
use crate::objects::details::{GroupLinkDetails, OneTimeLinkDetails, RegularLinkDetails};
use crate::objects::shop::{Bill, Shop};

impl BackendClient {
    /// `GET /api/payment-links/link/{linkId}/details`
    pub async fn regular_link_details(
        &self,
        link_id: &str,
    ) -> Result<RegularLinkDetails, ClientError> {
        let url = self.endpoint(&format!(
            "/api/payment-links/link/{}/details",
            segment(link_id)
        ))?;
        self.get_json(url).await
    }

    /// `GET /api/one-time-payment-links/link/{linkId}/details`
    pub async fn one_time_link_details(
        &self,
        link_id: &str,
    ) -> Result<OneTimeLinkDetails, ClientError> {
        let url = self.endpoint(&format!(
            "/api/one-time-payment-links/link/{}/details",
            segment(link_id)
        ))?;
        self.get_json(url).await
    }

    /// `GET /api/group-payment-links/link/{linkId}/details`
    pub async fn group_link_details(&self, link_id: &str) -> Result<GroupLinkDetails, ClientError> {
        let url = self.endpoint(&format!(
            "/api/group-payment-links/link/{}/details",
            segment(link_id)
        ))?;
        self.get_json(url).await
    }

    /// `GET /api/shops/qrcode/{qrCode}` – resolve a scanned QR token to a shop.
    pub async fn shop_by_qr_code(&self, qr_code: &str) -> Result<Shop, ClientError> {
        let url = self.endpoint(&format!("/api/shops/qrcode/{}", segment(qr_code)))?;
        self.get_json(url).await
    }

    /// `GET /api/bills/{pin}` – look up an open bill by its PIN.
    pub async fn bill_by_pin(&self, pin: &str) -> Result<Bill, ClientError> {
        let url = self.endpoint(&format!("/api/bills/{}", segment(pin)))?;
        self.get_json(url).await
    }
}
