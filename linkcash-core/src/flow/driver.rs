//! Runs a [`FlowMachine`] against real collaborators.
//!
//! The driver task owns the machine. It applies events in arrival order,
//! publishes the resulting state on a watch channel and executes commands.
//! Network work is spawned; each task posts its completion back as an event.
//! Once the shutdown signal is set, tasks stop reporting and the loop exits.

use std::sync::Arc;

use kanau::processor::Processor;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use super::channels::{FlowEventReceiver, FlowEventSender, flow_event_channel};
use super::events::{Command, FlowEvent};
use super::machine::FlowMachine;
use super::state::FlowState;
use crate::backend::PaymentBackend;
use crate::checkout::CheckoutDelegate;
use crate::poller::{ConfirmationPoller, PollOutcome, PollPolicy};
use crate::resolver::DetailsResolver;
use crate::route::SuccessRoute;
use crate::session::{Reservation, SessionInitiator, SessionStart};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("payment flow has stopped")]
pub struct FlowClosed;

pub struct FlowDriver<B, C> {
    machine: FlowMachine,
    resolver: Arc<DetailsResolver<B>>,
    initiator: Arc<SessionInitiator<B>>,
    poller: Arc<ConfirmationPoller<B>>,
    checkout: Arc<C>,
    events_tx: FlowEventSender,
    events_rx: FlowEventReceiver,
    state_tx: watch::Sender<FlowState>,
    navigation_tx: watch::Sender<Option<SuccessRoute>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<B, C> FlowDriver<B, C>
where
    B: PaymentBackend + Clone + 'static,
    C: CheckoutDelegate + 'static,
{
    /// Build a driver and the handle used to talk to it.
    ///
    /// # Arguments
    ///
    /// * `backend` - Backend shared by the resolver, the initiator and the poller
    /// * `checkout` - Card widget delegate
    /// * `policy` - Confirmation polling budget
    /// * `shutdown_rx` - Disposes the flow when it carries `true`
    pub fn new(
        backend: B,
        checkout: C,
        policy: PollPolicy,
        shutdown_rx: watch::Receiver<bool>,
    ) -> (Self, FlowHandle) {
        let (events_tx, events_rx) = flow_event_channel();
        let (state_tx, state_rx) = watch::channel(FlowState::Idle);
        let (navigation_tx, navigation_rx) = watch::channel(None);

        let driver = Self {
            machine: FlowMachine::new(),
            resolver: Arc::new(DetailsResolver::new(backend.clone())),
            initiator: Arc::new(SessionInitiator::new(backend.clone())),
            poller: Arc::new(ConfirmationPoller::new(
                backend,
                policy,
                shutdown_rx.clone(),
            )),
            checkout: Arc::new(checkout),
            events_tx: events_tx.clone(),
            events_rx,
            state_tx,
            navigation_tx,
            shutdown_rx,
        };
        let handle = FlowHandle {
            events_tx,
            state_rx,
            navigation_rx,
        };
        (driver, handle)
    }

    pub async fn run(mut self) {
        info!("Payment flow started");

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() {
                        info!("Shutdown sender dropped, stopping payment flow");
                        break;
                    }
                    if *self.shutdown_rx.borrow() {
                        info!("Payment flow received shutdown signal");
                        break;
                    }
                }

                Some(event) = self.events_rx.recv() => {
                    self.handle(event).await;
                }
            }
        }

        info!(state = %self.machine.state(), "Payment flow stopped");
    }

    async fn handle(&mut self, event: FlowEvent) {
        debug!(event = ?event, "Applying flow event");
        let commands = self.machine.apply(event);
        self.state_tx.send_replace(self.machine.state().clone());
        for command in commands {
            self.execute(command).await;
        }
    }

    async fn execute(&self, command: Command) {
        match command {
            Command::ResolveLink(req) => {
                let resolver = self.resolver.clone();
                self.spawn_reporting(async move {
                    Some(FlowEvent::DetailsResolved(resolver.process(req).await))
                });
            }
            Command::ResolveShop(req) => {
                let resolver = self.resolver.clone();
                self.spawn_reporting(async move {
                    Some(FlowEvent::ShopResolved(resolver.process(req).await))
                });
            }
            Command::ResolveBill(req) => {
                let resolver = self.resolver.clone();
                self.spawn_reporting(async move {
                    Some(FlowEvent::DetailsResolved(resolver.process(req).await))
                });
            }
            Command::BeginSession {
                request_id,
                request,
            } => {
                let key = request.key();
                match self.initiator.reserve(&request).await {
                    Ok(Reservation::Ticket(ticket)) => {
                        let initiator = self.initiator.clone();
                        self.spawn_reporting(async move {
                            let result = initiator
                                .fulfil(ticket)
                                .await
                                .map(SessionStart::Created);
                            Some(FlowEvent::SessionStarted {
                                request_id,
                                key,
                                result,
                            })
                        });
                    }
                    Ok(Reservation::Settled(start)) => {
                        self.report(FlowEvent::SessionStarted {
                            request_id,
                            key,
                            result: Ok(start),
                        });
                    }
                    Err(e) => {
                        self.report(FlowEvent::SessionStarted {
                            request_id,
                            key,
                            result: Err(e),
                        });
                    }
                }
            }
            Command::InvalidateSession(key) => {
                self.initiator.invalidate(&key).await;
            }
            Command::MountCheckout(session) => {
                let checkout = self.checkout.clone();
                tokio::spawn(async move {
                    checkout.mount(&session).await;
                });
            }
            Command::ConfirmCheckout(session) => {
                let checkout = self.checkout.clone();
                self.spawn_reporting(async move {
                    let report = checkout.confirm(&session).await;
                    Some(FlowEvent::CheckoutFinished {
                        correlation_id: session.correlation_id,
                        report,
                    })
                });
            }
            Command::Navigate(route) => {
                info!(path = %route.to_path(), "Navigating to success page");
                self.navigation_tx.send_replace(Some(route));
            }
            Command::StartPolling(lookup) => {
                let poller = self.poller.clone();
                let progress_tx = self.events_tx.clone();
                self.spawn_reporting(async move {
                    let outcome = poller
                        .poll_with_progress(&lookup, |attempt| {
                            let _ = progress_tx.try_send(FlowEvent::PollProgress { attempt });
                        })
                        .await;
                    match outcome {
                        PollOutcome::Cancelled => None,
                        outcome => Some(FlowEvent::PollFinished(outcome)),
                    }
                });
            }
        }
    }

    /// Post an already known completion without blocking the loop on its own
    /// channel.
    fn report(&self, event: FlowEvent) {
        self.spawn_reporting(async move { Some(event) });
    }

    /// Spawn `work` and post the event it yields, unless the flow was
    /// disposed in the meantime.
    fn spawn_reporting<F>(&self, work: F)
    where
        F: Future<Output = Option<FlowEvent>> + Send + 'static,
    {
        let events_tx = self.events_tx.clone();
        let shutdown_rx = self.shutdown_rx.clone();
        tokio::spawn(async move {
            let Some(event) = work.await else {
                return;
            };
            if *shutdown_rx.borrow() {
                debug!("Flow disposed, dropping completion");
                return;
            }
            let _ = events_tx.send(event).await;
        });
    }
}

/// Cloneable handle for posting payer intents and observing the flow.
#[derive(Debug, Clone)]
pub struct FlowHandle {
    events_tx: FlowEventSender,
    state_rx: watch::Receiver<FlowState>,
    navigation_rx: watch::Receiver<Option<SuccessRoute>>,
}

impl FlowHandle {
    async fn post(&self, event: FlowEvent) -> Result<(), FlowClosed> {
        self.events_tx.send(event).await.map_err(|_| FlowClosed)
    }

    pub async fn open(&self, target: impl Into<String>) -> Result<(), FlowClosed> {
        self.post(FlowEvent::Open(target.into())).await
    }

    pub async fn submit_pin(&self, pin: impl Into<String>) -> Result<(), FlowClosed> {
        self.post(FlowEvent::SubmitPin(pin.into())).await
    }

    pub async fn select_member(&self, member_payment_id: i64) -> Result<(), FlowClosed> {
        self.post(FlowEvent::SelectMember(member_payment_id)).await
    }

    pub async fn retry_session(&self) -> Result<(), FlowClosed> {
        self.post(FlowEvent::RetrySession).await
    }

    /// Called by the checkout delegate once the mounted widget accepts input.
    pub async fn widget_ready(&self, correlation_id: Uuid) -> Result<(), FlowClosed> {
        self.post(FlowEvent::WidgetReady { correlation_id }).await
    }

    pub async fn submit_payment(&self) -> Result<(), FlowClosed> {
        self.post(FlowEvent::SubmitPayment).await
    }

    pub fn state(&self) -> FlowState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowState> {
        self.state_rx.clone()
    }

    pub fn navigation(&self) -> watch::Receiver<Option<SuccessRoute>> {
        self.navigation_rx.clone()
    }

    /// Wait until the published state satisfies `predicate`.
    pub async fn wait_for<P>(&self, mut predicate: P) -> Result<FlowState, FlowClosed>
    where
        P: FnMut(&FlowState) -> bool,
    {
        let mut state_rx = self.state_rx.clone();
        let state = state_rx
            .wait_for(|state| predicate(state))
            .await
            .map_err(|_| FlowClosed)?;
        Ok(state.clone())
    }
}
