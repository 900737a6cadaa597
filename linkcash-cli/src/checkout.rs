//! Terminal stand-in for the hosted card widget.
//!
//! Mounting announces the session and reports readiness right away. A
//! confirm asks the operator for the processor's transaction id, which is
//! what the hosted widget hands back after a successful charge.

use std::sync::Arc;

use async_trait::async_trait;
use linkcash_core::checkout::{CheckoutDelegate, CheckoutReport};
use linkcash_core::session::PaymentSession;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::prompt::Prompt;

const CANCELLED: &str = "Payment was cancelled.";

pub struct TerminalCheckout {
    publishable_key: Option<String>,
    prompt: Arc<Prompt>,
    ready_tx: mpsc::Sender<Uuid>,
}

impl TerminalCheckout {
    /// Returns the widget and the receiver on which mounted sessions
    /// announce readiness by correlation id.
    pub fn new(
        publishable_key: Option<String>,
        prompt: Arc<Prompt>,
    ) -> (Self, mpsc::Receiver<Uuid>) {
        let (ready_tx, ready_rx) = mpsc::channel(8);
        (
            Self {
                publishable_key,
                prompt,
                ready_tx,
            },
            ready_rx,
        )
    }
}

#[async_trait]
impl CheckoutDelegate for TerminalCheckout {
    async fn mount(&self, session: &PaymentSession) {
        tracing::info!(
            correlation_id = %session.correlation_id,
            publishable_key = self.publishable_key.as_deref().unwrap_or("-"),
            "Card form mounted"
        );
        println!("Card form ready.");
        let _ = self.ready_tx.send(session.correlation_id).await;
    }

    async fn confirm(&self, session: &PaymentSession) -> CheckoutReport {
        tracing::debug!(correlation_id = %session.correlation_id, "Confirming card payment");
        match self
            .prompt
            .ask("Processor transaction id (pi_...), or `decline <reason>`:")
            .await
        {
            Some(line) => parse_confirmation(&line),
            None => CheckoutReport::failed(CANCELLED),
        }
    }
}

/// Turn one line of operator input into a widget report.
fn parse_confirmation(line: &str) -> CheckoutReport {
    let line = line.trim();
    if let Some(reason) = line.strip_prefix("decline") {
        let reason = reason.trim();
        return CheckoutReport::failed(if reason.is_empty() {
            "Your card was declined."
        } else {
            reason
        });
    }
    if line.is_empty() {
        return CheckoutReport::failed(CANCELLED);
    }
    CheckoutReport::succeeded(line)
}
