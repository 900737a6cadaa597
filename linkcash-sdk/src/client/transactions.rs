//! Transaction endpoints: session initiation, confirmation lookups and the
//! shop receipt PDF.

use bytes::Bytes;

use super::{BackendClient, ClientError, parse_response, segment};
use crate::objects::initiate::{InitiatePayment, InitiateResponse};
use crate::objects::transaction::ConfirmedTransaction;

impl BackendClient {
    /// `POST /api/transactions/initiate` – create a processor payment intent
    /// and return its client secret.
    ///
    /// A rejected request surfaces as [`ClientError::Api`]; its body is
    /// usually an [`InitiateError`](crate::objects::InitiateError).
    pub async fn initiate_transaction(
        &self,
        payload: &InitiatePayment,
    ) -> Result<InitiateResponse, ClientError> {
        let url = self.endpoint("/api/transactions/initiate")?;
        tracing::debug!(%url, payment_type = %payload.payment_type(), "POST");

        let resp = self.http.post(url).json(payload).send().await?;

        parse_response(resp).await
    }

    /// `GET /api/payment-links/{linkId}/web?paymentIntentId=…`
    pub async fn regular_confirmation(
        &self,
        link_id: &str,
        payment_intent_id: &str,
    ) -> Result<ConfirmedTransaction, ClientError> {
        let mut url = self.endpoint(&format!("/api/payment-links/{}/web", segment(link_id)))?;
        url.query_pairs_mut()
            .append_pair("paymentIntentId", payment_intent_id);
        self.get_json(url).await
    }

    /// `GET /api/one-time-payment-links/details/{linkId}`
    pub async fn one_time_confirmation(
        &self,
        link_id: &str,
    ) -> Result<ConfirmedTransaction, ClientError> {
        let url = self.endpoint(&format!(
            "/api/one-time-payment-links/details/{}",
            segment(link_id)
        ))?;
        self.get_json(url).await
    }

    /// `GET /api/group-payment-links/{groupId}/member/{memberId}/web`
    pub async fn group_member_confirmation(
        &self,
        group_payment_id: i64,
        member_payment_id: i64,
    ) -> Result<ConfirmedTransaction, ClientError> {
        let url = self.endpoint(&format!(
            "/api/group-payment-links/{group_payment_id}/member/{member_payment_id}/web"
        ))?;
        self.get_json(url).await
    }

    /// `GET /api/shop-transactions/bill/{billId}`
    pub async fn shop_bill_confirmation(
        &self,
        bill_id: i64,
    ) -> Result<ConfirmedTransaction, ClientError> {
        let url = self.endpoint(&format!("/api/shop-transactions/bill/{bill_id}"))?;
        self.get_json(url).await
    }

    /// `GET /api/shop-transactions/bill/{billId}/pdf` – the backend-rendered
    /// receipt as raw PDF bytes.
    pub async fn shop_receipt_pdf(&self, bill_id: i64) -> Result<Bytes, ClientError> {
        let url = self.endpoint(&format!("/api/shop-transactions/bill/{bill_id}/pdf"))?;
        tracing::debug!(%url, "GET");

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, body });
        }
        Ok(resp.bytes().await?)
    }
}
