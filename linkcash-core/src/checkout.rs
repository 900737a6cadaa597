//! Seam over the hosted card-collection widget.

use async_trait::async_trait;

use crate::session::PaymentSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Succeeded,
    Failed,
}

/// Terminal result of one confirm attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReport {
    pub outcome: CheckoutOutcome,
    /// Processor-side id of the charge (`pi_...`), present on success.
    pub processor_transaction_id: Option<String>,
    pub message: Option<String>,
}

impl CheckoutReport {
    pub fn succeeded(processor_transaction_id: impl Into<String>) -> Self {
        Self {
            outcome: CheckoutOutcome::Succeeded,
            processor_transaction_id: Some(processor_transaction_id.into()),
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            outcome: CheckoutOutcome::Failed,
            processor_transaction_id: None,
            message: Some(message.into()),
        }
    }
}

/// The widget that collects card data and confirms a payment.
///
/// `mount` renders the widget for a session; implementations report
/// readiness through [`crate::flow::FlowHandle::widget_ready`] once the
/// widget can accept a confirm. `confirm` must only be called after that,
/// and is called at most once per submit.
#[async_trait]
pub trait CheckoutDelegate: Send + Sync {
    async fn mount(&self, session: &PaymentSession);

    async fn confirm(&self, session: &PaymentSession) -> CheckoutReport;
}

#[async_trait]
impl<T: CheckoutDelegate + ?Sized> CheckoutDelegate for std::sync::Arc<T> {
    async fn mount(&self, session: &PaymentSession) {
        (**self).mount(session).await
    }

    async fn confirm(&self, session: &PaymentSession) -> CheckoutReport {
        (**self).confirm(session).await
    }
}
