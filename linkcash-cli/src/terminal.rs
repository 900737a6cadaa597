//! Drives one payment flow from the terminal.
//!
//! Each published state is acted on once: interactive states ask the
//! operator, terminal states end the loop. Receipts are exported to disk.

use std::path::PathBuf;
use std::sync::Arc;

use linkcash_core::details::PaymentDetails;
use linkcash_core::error::{FlowError, FlowErrorKind};
use linkcash_core::flow::{FlowHandle, FlowState};
use linkcash_core::receipt::{self, format_amount};
use linkcash_core::route::SuccessRoute;
use linkcash_core::session::PaymentSession;
use linkcash_sdk::client::BackendClient;
use linkcash_sdk::objects::ConfirmedTransaction;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::prompt::Prompt;

/// How the flow ended from the operator's point of view.
#[derive(Debug)]
pub enum Finish {
    /// Payment confirmed; the text receipt was written to this path.
    Paid(PathBuf),
    AlreadyCompleted(String),
    Failed(FlowError),
    /// The operator quit, input ended, or a shutdown signal arrived.
    Abandoned,
}

pub struct Terminal {
    handle: FlowHandle,
    prompt: Arc<Prompt>,
    client: BackendClient,
    receipt_dir: PathBuf,
    max_attempts: u32,
}

impl Terminal {
    pub fn new(
        handle: FlowHandle,
        prompt: Arc<Prompt>,
        client: BackendClient,
        receipt_dir: PathBuf,
        max_attempts: u32,
    ) -> Self {
        Self {
            handle,
            prompt,
            client,
            receipt_dir,
            max_attempts,
        }
    }

    /// Follow the flow until it reaches an end the operator cares about.
    ///
    /// `ready_rx` carries widget readiness from the card form; it is
    /// forwarded to the flow as is.
    pub async fn run(
        &self,
        mut ready_rx: mpsc::Receiver<Uuid>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> anyhow::Result<Finish> {
        let mut state_rx = self.handle.subscribe();
        let mut fresh = true;

        loop {
            if fresh {
                let state = state_rx.borrow_and_update().clone();
                let step = tokio::select! {
                    biased;
                    _ = shutdown_rx.wait_for(|stop| *stop) => return Ok(Finish::Abandoned),
                    step = self.step(&state) => step?,
                };
                if let Some(finish) = step {
                    return Ok(finish);
                }
            }
            fresh = false;

            tokio::select! {
                biased;

                _ = shutdown_rx.wait_for(|stop| *stop) => return Ok(Finish::Abandoned),

                Some(correlation_id) = ready_rx.recv() => {
                    self.handle.widget_ready(correlation_id).await?;
                }

                changed = state_rx.changed() => {
                    if changed.is_err() {
                        return Ok(Finish::Abandoned);
                    }
                    fresh = true;
                }
            }
        }
    }

    async fn step(&self, state: &FlowState) -> anyhow::Result<Option<Finish>> {
        tracing::debug!(state = %state, "Flow state changed");
        match state {
            FlowState::Idle
            | FlowState::DetailsReady { .. }
            | FlowState::InitiatingSession { .. }
            | FlowState::Checkout { .. } => {}
            FlowState::ResolvingDetails { kind } => {
                println!("Loading {kind} payment...");
            }
            FlowState::AwaitingPin { shop, notice } => {
                println!("Shop: {}", shop.name);
                print_notice(notice.as_ref());
                let Some(pin) = self.prompt.ask("Bill PIN:").await else {
                    return Ok(Some(Finish::Abandoned));
                };
                self.handle.submit_pin(pin).await?;
            }
            FlowState::AwaitingMemberSelection { details, notice } => {
                print_members(details);
                print_notice(notice.as_ref());
                let Some(member) = self.ask_member().await else {
                    return Ok(Some(Finish::Abandoned));
                };
                self.handle.select_member(member).await?;
            }
            FlowState::SessionReady {
                details,
                session,
                widget_ready,
                notice,
            } => {
                if !*widget_ready {
                    print_summary(details, session);
                    return Ok(None);
                }
                if let Some(notice) = notice {
                    println!("{}", notice.message);
                    if !self.prompt.confirm("Try again?").await {
                        return Ok(Some(Finish::Abandoned));
                    }
                }
                self.handle.submit_payment().await?;
            }
            FlowState::PollingConfirmation { attempt, .. } => {
                if *attempt > 0 {
                    println!(
                        "Waiting for payment confirmation ({attempt}/{})...",
                        self.max_attempts
                    );
                }
            }
            FlowState::Confirmed { route, record } => {
                let path = self.export_receipt(route, record).await?;
                return Ok(Some(Finish::Paid(path)));
            }
            FlowState::AlreadyCompleted { message, .. } => {
                return Ok(Some(Finish::AlreadyCompleted(message.clone())));
            }
            FlowState::Failed { error, .. } => {
                if error.kind == FlowErrorKind::SessionInitFailed && error.retryable {
                    println!("{}", error.message);
                    if self.prompt.confirm("Retry?").await {
                        self.handle.retry_session().await?;
                        return Ok(None);
                    }
                }
                return Ok(Some(Finish::Failed(error.clone())));
            }
        }
        Ok(None)
    }

    async fn ask_member(&self) -> Option<i64> {
        loop {
            let answer = self.prompt.ask("Member id:").await?;
            match answer.parse::<i64>() {
                Ok(member) => return Some(member),
                Err(_) => println!("`{answer}` is not a member id."),
            }
        }
    }

    /// Print the receipt and write it under the receipt directory. Shop
    /// receipts also get the backend's PDF next to the text file.
    async fn export_receipt(
        &self,
        route: &SuccessRoute,
        record: &ConfirmedTransaction,
    ) -> anyhow::Result<PathBuf> {
        let receipt = receipt::present(route, record);
        let text = receipt.render_text();
        println!("\n{text}");

        tokio::fs::create_dir_all(&self.receipt_dir).await?;
        let path = self.receipt_dir.join(receipt.text_file_name());
        tokio::fs::write(&path, text).await?;
        tracing::info!(path = ?path, "Receipt saved");

        if let SuccessRoute::Shop {
            bill_id: Some(bill_id),
        } = route
        {
            match self.client.shop_receipt_pdf(*bill_id).await {
                Ok(pdf) => {
                    let pdf_path = self.receipt_dir.join(format!("{}.pdf", receipt.file_stem));
                    tokio::fs::write(&pdf_path, &pdf).await?;
                    tracing::info!(path = ?pdf_path, "Receipt PDF saved");
                }
                Err(e) => {
                    tracing::warn!(bill_id, "Failed to download receipt PDF: {}", e);
                }
            }
        }
        Ok(path)
    }
}

fn print_notice(notice: Option<&FlowError>) {
    if let Some(notice) = notice {
        println!("{}", notice.message);
    }
}

fn print_members(details: &PaymentDetails) {
    println!("{}", details.title);
    for member in details.unpaid_members() {
        println!(
            "  [{}] {} {}",
            member.member_payment_id,
            member.name,
            format_amount(member.assigned_amount)
        );
    }
}

fn print_summary(details: &PaymentDetails, session: &PaymentSession) {
    let amount = session
        .key
        .member
        .and_then(|member| details.member(member))
        .map(|member| member.assigned_amount)
        .unwrap_or(details.amount);
    println!("{}: {}", details.title, format_amount(amount));
    if let Some(description) = &details.description {
        println!("{description}");
    }
}
