//! Post-payment confirmation polling.
//!
//! The backend writes the confirmation record asynchronously after the
//! processor reports success, so the success page asks for it on a fixed
//! budget. Every failed attempt counts against the budget; only a 2xx with a
//! parseable record ends the loop early.

use std::convert::Infallible;
use std::time::Duration;

use kanau::processor::Processor;
use linkcash_sdk::objects::ConfirmedTransaction;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::backend::{ConfirmationLookup, PaymentBackend};
use crate::error::FlowError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 15;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    /// Wait between two attempts.
    pub interval: Duration,
    /// Wait before the first attempt.
    pub initial_delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
            initial_delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Confirmed(ConfirmedTransaction),
    Exhausted(FlowError),
    /// The flow was disposed before a result could be reported.
    Cancelled,
}

pub struct ConfirmationPoller<B> {
    backend: B,
    policy: PollPolicy,
    shutdown_rx: watch::Receiver<bool>,
}

/// Poll until the confirmation record for `lookup` exists.
#[derive(Debug, Clone)]
pub struct PollConfirmation {
    pub lookup: ConfirmationLookup,
}

impl<B: PaymentBackend> ConfirmationPoller<B> {
    pub fn new(backend: B, policy: PollPolicy, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            backend,
            policy,
            shutdown_rx,
        }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    fn is_shut_down(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Sleep for `duration`; `false` if shutdown arrived first.
    async fn pause(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.is_shut_down();
        }
        let mut shutdown_rx = self.shutdown_rx.clone();
        tokio::select! {
            biased;

            _ = shutdown_requested(&mut shutdown_rx) => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    /// Run the poll loop, calling `on_attempt` with the 1-based attempt
    /// number before each request.
    pub async fn poll_with_progress<F>(
        &self,
        lookup: &ConfirmationLookup,
        mut on_attempt: F,
    ) -> PollOutcome
    where
        F: FnMut(u32) + Send,
    {
        let max_attempts = self.policy.max_attempts.max(1);

        if !self.pause(self.policy.initial_delay).await {
            return PollOutcome::Cancelled;
        }

        for attempt in 1..=max_attempts {
            if self.is_shut_down() {
                debug!(%lookup, attempt, "Shutdown before poll attempt");
                return PollOutcome::Cancelled;
            }
            on_attempt(attempt);

            match self.backend.confirmed_transaction(lookup).await {
                Ok(record) => {
                    if self.is_shut_down() {
                        return PollOutcome::Cancelled;
                    }
                    info!(%lookup, attempt, "Confirmation record found");
                    return PollOutcome::Confirmed(record);
                }
                Err(e) => {
                    warn!(
                        %lookup,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Confirmation not available yet"
                    );
                }
            }

            if attempt < max_attempts && !self.pause(self.policy.interval).await {
                return PollOutcome::Cancelled;
            }
        }

        if self.is_shut_down() {
            return PollOutcome::Cancelled;
        }
        error!(%lookup, max_attempts, "Confirmation polling exhausted");
        PollOutcome::Exhausted(FlowError::confirmation_timeout())
    }
}

impl<B: PaymentBackend> Processor<PollConfirmation> for ConfirmationPoller<B> {
    type Output = PollOutcome;
    type Error = Infallible;

    async fn process(&self, req: PollConfirmation) -> Result<PollOutcome, Infallible> {
        Ok(self.poll_with_progress(&req.lookup, |_| {}).await)
    }
}

/// Resolves once the watch carries `true`. Never resolves if the sender is
/// gone without having asked for shutdown.
async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown_rx.borrow_and_update() {
            return;
        }
        if shutdown_rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::{FakeBackend, not_found};
    use crate::error::{CONFIRMATION_TIMEOUT, FlowErrorKind};
    use crate::route::LinkIdentifier;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::Arc;
    use tokio::time::Instant;

    fn lookup() -> ConfirmationLookup {
        ConfirmationLookup::Regular {
            link_id: LinkIdentifier::new("abc123").unwrap(),
            payment_intent_id: "pi_1".into(),
        }
    }

    fn record() -> ConfirmedTransaction {
        ConfirmedTransaction {
            transaction_id: Some(501),
            processor_transaction_id: Some("pi_1".into()),
            amount: Some(Decimal::from_str("12.50").unwrap()),
            ..Default::default()
        }
    }

    fn poller(
        backend: Arc<FakeBackend>,
    ) -> (ConfirmationPoller<Arc<FakeBackend>>, watch::Sender<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        (
            ConfirmationPoller::new(backend, PollPolicy::default(), shutdown_rx),
            shutdown_tx,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirms_on_last_attempt() {
        let backend = Arc::new(FakeBackend::default());
        for _ in 0..14 {
            backend.script_confirmation(Err(not_found()));
        }
        backend.script_confirmation(Ok(record()));
        let (poller, _shutdown_tx) = poller(backend.clone());

        let outcome = poller
            .process(PollConfirmation { lookup: lookup() })
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Confirmed(record()));
        assert_eq!(backend.confirmation_count(), 15);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_fifteen_attempts() {
        let backend = Arc::new(FakeBackend::default());
        for _ in 0..16 {
            backend.script_confirmation(Err(not_found()));
        }
        let (poller, _shutdown_tx) = poller(backend.clone());
        let start = Instant::now();

        let outcome = poller
            .process(PollConfirmation { lookup: lookup() })
            .await
            .unwrap();

        match outcome {
            PollOutcome::Exhausted(err) => {
                assert_eq!(err.kind, FlowErrorKind::ConfirmationTimeout);
                assert_eq!(err.message, CONFIRMATION_TIMEOUT);
                assert!(!err.retryable);
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(backend.confirmation_count(), 15);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(14), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(15), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_is_immediate() {
        let backend = Arc::new(FakeBackend::default());
        backend.script_confirmation(Ok(record()));
        let (poller, _shutdown_tx) = poller(backend.clone());
        let start = Instant::now();

        let mut attempts = Vec::new();
        let outcome = poller
            .poll_with_progress(&lookup(), |n| attempts.push(n))
            .await;

        assert!(matches!(outcome, PollOutcome::Confirmed(_)));
        assert_eq!(attempts, vec![1]);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_delay_is_honoured() {
        let backend = Arc::new(FakeBackend::default());
        backend.script_confirmation(Ok(record()));
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let policy = PollPolicy {
            max_attempts: 5,
            interval: Duration::from_secs(5),
            initial_delay: Duration::from_secs(5),
        };
        let poller = ConfirmationPoller::new(backend.clone(), policy, shutdown_rx);
        let start = Instant::now();

        let outcome = poller.poll_with_progress(&lookup(), |_| {}).await;

        assert!(matches!(outcome, PollOutcome::Confirmed(_)));
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_counts_every_attempt() {
        let backend = Arc::new(FakeBackend::default());
        let (poller, _shutdown_tx) = poller(backend.clone());

        let mut attempts = Vec::new();
        let outcome = poller
            .poll_with_progress(&lookup(), |n| attempts.push(n))
            .await;

        assert!(matches!(outcome, PollOutcome::Exhausted(_)));
        assert_eq!(attempts, (1..=15).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_start_issues_no_request() {
        let backend = Arc::new(FakeBackend::default());
        let (poller, shutdown_tx) = poller(backend.clone());
        shutdown_tx.send(true).unwrap();

        let outcome = poller
            .process(PollConfirmation { lookup: lookup() })
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Cancelled);
        assert_eq!(backend.confirmation_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_while_waiting_stops_polling() {
        let backend = Arc::new(FakeBackend::default());
        let (poller, shutdown_tx) = poller(backend.clone());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            let _ = shutdown_tx.send(true);
        });

        let outcome = poller
            .process(PollConfirmation { lookup: lookup() })
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Cancelled);
        assert_eq!(backend.confirmation_count(), 3);
    }
}
