use tracing::{debug, error, info, warn};

use super::events::{Command, FlowEvent};
use super::state::FlowState;
use crate::backend::ConfirmationLookup;
use crate::checkout::{CheckoutOutcome, CheckoutReport};
use crate::details::{PaymentDetails, ShopIdentity};
use crate::error::{FlowError, FlowErrorKind, WIDGET_NOT_READY};
use crate::kind::{PaymentFlowKind, PrimaryKey};
use crate::poller::PollOutcome;
use crate::resolver::{ResolveBill, ResolveLinkDetails, ResolveShop, Resolution};
use crate::route::{self, LinkIdentifier, SuccessRoute};
use crate::session::{
    InitiateSession, MEMBER_ALREADY_PAID, SessionKey, SessionStart, UNKNOWN_MEMBER,
};

pub const INVALID_LINK: &str = "No payment link found at this address.";
pub const INVALID_PIN: &str = "Enter the numeric PIN printed on your bill.";
pub const PAYMENT_FAILED: &str = "Payment failed.";

/// Pure transition function of a payment flow.
///
/// Holds the current [`FlowState`] plus the context the states do not show:
/// the entry link id, the located shop, the selected member and the id of
/// the session request the machine is waiting on.
#[derive(Debug, Default)]
pub struct FlowMachine {
    state: FlowState,
    kind: Option<PaymentFlowKind>,
    link_id: Option<LinkIdentifier>,
    shop: Option<ShopIdentity>,
    details: Option<PaymentDetails>,
    member: Option<i64>,
    active_key: Option<SessionKey>,
    pending_request: Option<u64>,
    next_request: u64,
}

impl FlowMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    /// Fixed by the first `Open`.
    pub fn kind(&self) -> Option<PaymentFlowKind> {
        self.kind
    }

    pub fn selected_member(&self) -> Option<i64> {
        self.member
    }

    pub fn apply(&mut self, event: FlowEvent) -> Vec<Command> {
        let from = self.state.name();
        let commands = match event {
            FlowEvent::Open(target) => self.open(&target),
            FlowEvent::SubmitPin(input) => self.submit_pin(&input),
            FlowEvent::SelectMember(member) => self.select_member(member),
            FlowEvent::RetrySession => self.retry_session(),
            FlowEvent::BeginSession => self.begin_session(),
            FlowEvent::WidgetReady { correlation_id } => {
                match &mut self.state {
                    FlowState::SessionReady {
                        session,
                        widget_ready,
                        notice,
                        ..
                    } if session.correlation_id == correlation_id => {
                        *widget_ready = true;
                        if notice.as_ref().is_some_and(|n| n.message == WIDGET_NOT_READY) {
                            *notice = None;
                        }
                    }
                    _ => debug!(%correlation_id, "Readiness of an inactive widget ignored"),
                }
                Vec::new()
            }
            FlowEvent::SubmitPayment => self.submit_payment(),
            FlowEvent::ShopResolved(result) => self.shop_resolved(result),
            FlowEvent::DetailsResolved(result) => self.details_resolved(result),
            FlowEvent::SessionStarted {
                request_id,
                key,
                result,
            } => self.session_started(request_id, key, result),
            FlowEvent::CheckoutFinished {
                correlation_id,
                report,
            } => self.checkout_finished(correlation_id, report),
            FlowEvent::PollProgress { attempt } => {
                if let FlowState::PollingConfirmation { attempt: current, .. } = &mut self.state {
                    *current = attempt;
                }
                Vec::new()
            }
            FlowEvent::PollFinished(outcome) => self.poll_finished(outcome),
        };
        let to = self.state.name();
        if from != to {
            info!(from, to, "Flow transition");
        }
        commands
    }

    fn fail(&mut self, error: FlowError) {
        error!(kind = %error.kind, reason = %error.message, "Payment flow failed");
        self.state = FlowState::Failed {
            error,
            details: self.details.clone(),
        };
    }

    fn open(&mut self, target: &str) -> Vec<Command> {
        if self.state != FlowState::Idle {
            warn!(route = target, state = %self.state, "Flow already started, ignoring open");
            return Vec::new();
        }

        if let Some(link) = route::classify(target) {
            self.kind = Some(link.kind);
            self.state = FlowState::ResolvingDetails { kind: link.kind };
            return match link.kind {
                PaymentFlowKind::Shop => vec![Command::ResolveShop(ResolveShop {
                    qr_code: link.identifier,
                })],
                kind => {
                    self.link_id = Some(link.identifier.clone());
                    vec![Command::ResolveLink(ResolveLinkDetails {
                        kind,
                        link_id: link.identifier,
                    })]
                }
            };
        }

        if let Some(success) = route::classify_success(target) {
            self.kind = Some(success.kind());
            return self.start_polling(success, false);
        }

        warn!(route = target, "Unrecognised payment route");
        self.fail(FlowError::new(FlowErrorKind::LinkInvalid, INVALID_LINK, false));
        Vec::new()
    }

    fn shop_resolved(&mut self, result: Result<ShopIdentity, FlowError>) -> Vec<Command> {
        if self.state
            != (FlowState::ResolvingDetails {
                kind: PaymentFlowKind::Shop,
            })
            || self.shop.is_some()
        {
            debug!("Unexpected shop lookup result ignored");
            return Vec::new();
        }
        match result {
            Ok(shop) => {
                self.shop = Some(shop.clone());
                self.state = FlowState::AwaitingPin { shop, notice: None };
            }
            Err(e) => self.fail(e),
        }
        Vec::new()
    }

    fn submit_pin(&mut self, input: &str) -> Vec<Command> {
        let FlowState::AwaitingPin { shop, .. } = &self.state else {
            warn!(state = %self.state, "PIN submitted outside of the PIN step");
            return Vec::new();
        };
        let shop = shop.clone();
        match route::classify_pin(input) {
            Some(pin) => {
                self.state = FlowState::ResolvingDetails {
                    kind: PaymentFlowKind::Shop,
                };
                vec![Command::ResolveBill(ResolveBill { shop, pin })]
            }
            None => {
                self.state = FlowState::AwaitingPin {
                    shop,
                    notice: Some(FlowError::new(FlowErrorKind::LinkInvalid, INVALID_PIN, true)),
                };
                Vec::new()
            }
        }
    }

    fn details_resolved(&mut self, result: Result<Resolution, FlowError>) -> Vec<Command> {
        let FlowState::ResolvingDetails { kind } = self.state else {
            debug!("Unexpected details result ignored");
            return Vec::new();
        };

        match result {
            Err(e) => {
                if let (PaymentFlowKind::Shop, Some(shop)) = (kind, self.shop.clone()) {
                    warn!(reason = %e.message, "Bill lookup failed, asking for the PIN again");
                    self.state = FlowState::AwaitingPin {
                        shop,
                        notice: Some(FlowError { retryable: true, ..e }),
                    };
                } else {
                    self.fail(e);
                }
                Vec::new()
            }
            Ok(Resolution::AlreadyCompleted { details, message }) => {
                info!(key = %details.key, "Link already completed");
                self.details = Some(details.clone());
                self.state = FlowState::AlreadyCompleted { details, message };
                Vec::new()
            }
            Ok(Resolution::Payable(details)) => {
                self.details = Some(details.clone());
                if details.kind().requires_member() {
                    self.state = FlowState::AwaitingMemberSelection {
                        details,
                        notice: None,
                    };
                    Vec::new()
                } else {
                    self.state = FlowState::DetailsReady { details };
                    self.begin_session()
                }
            }
        }
    }

    fn begin_session(&mut self) -> Vec<Command> {
        let FlowState::DetailsReady { details } = &self.state else {
            debug!(state = %self.state, "Duplicate session trigger ignored");
            return Vec::new();
        };
        let details = details.clone();
        self.start_session(details, None)
    }

    fn start_session(&mut self, details: PaymentDetails, member: Option<i64>) -> Vec<Command> {
        let request = InitiateSession {
            details: details.clone(),
            member,
        };
        let key = request.key();
        let mut commands = Vec::new();
        if let Some(previous) = self.active_key.take() {
            if previous != key {
                commands.push(Command::InvalidateSession(previous));
            }
        }

        self.next_request += 1;
        let request_id = self.next_request;
        self.pending_request = Some(request_id);
        self.member = member;
        self.active_key = Some(key.clone());
        self.state = FlowState::InitiatingSession { details, key };
        commands.push(Command::BeginSession {
            request_id,
            request,
        });
        commands
    }

    fn select_member(&mut self, member: i64) -> Vec<Command> {
        let details = match &self.state {
            FlowState::AwaitingMemberSelection { details, .. }
            | FlowState::InitiatingSession { details, .. }
            | FlowState::SessionReady { details, .. } => details.clone(),
            FlowState::Failed {
                error,
                details: Some(details),
            } if error.kind == FlowErrorKind::SessionInitFailed => details.clone(),
            _ => {
                warn!(member, state = %self.state, "Member selection ignored");
                return Vec::new();
            }
        };
        if !details.kind().requires_member() {
            warn!(member, "Member selection on a link without members ignored");
            return Vec::new();
        }

        let in_progress = matches!(
            self.state,
            FlowState::InitiatingSession { .. } | FlowState::SessionReady { .. }
        );
        if in_progress && self.member == Some(member) {
            debug!(member, "Member already selected");
            return Vec::new();
        }

        let refusal = match details.member(member) {
            None => Some(UNKNOWN_MEMBER),
            Some(m) if m.paid => Some(MEMBER_ALREADY_PAID),
            Some(_) => None,
        };
        if let Some(message) = refusal {
            warn!(member, reason = message, "Member cannot be selected");
            let refused = FlowError::new(FlowErrorKind::SessionInitFailed, message, true);
            match &mut self.state {
                FlowState::SessionReady { notice, .. } => {
                    *notice = Some(refused);
                    return Vec::new();
                }
                FlowState::InitiatingSession { .. } => return Vec::new(),
                _ => {}
            }
            let mut commands = Vec::new();
            if let Some(previous) = self.active_key.take() {
                commands.push(Command::InvalidateSession(previous));
            }
            self.member = None;
            self.pending_request = None;
            self.state = FlowState::AwaitingMemberSelection {
                details,
                notice: Some(refused),
            };
            return commands;
        }

        info!(member, "Member selected");
        self.start_session(details, Some(member))
    }

    fn retry_session(&mut self) -> Vec<Command> {
        let details = match &self.state {
            FlowState::Failed {
                error,
                details: Some(details),
            } if error.kind == FlowErrorKind::SessionInitFailed => details.clone(),
            _ => {
                warn!(state = %self.state, "Nothing to retry");
                return Vec::new();
            }
        };
        match (details.kind().requires_member(), self.member) {
            (false, _) => self.start_session(details, None),
            (true, Some(member)) => self.start_session(details, Some(member)),
            (true, None) => {
                self.state = FlowState::AwaitingMemberSelection {
                    details,
                    notice: None,
                };
                Vec::new()
            }
        }
    }

    fn session_started(
        &mut self,
        request_id: u64,
        key: SessionKey,
        result: Result<SessionStart, FlowError>,
    ) -> Vec<Command> {
        let details = match &self.state {
            FlowState::InitiatingSession {
                details,
                key: active,
            } if *active == key && self.pending_request == Some(request_id) => details.clone(),
            _ => {
                debug!(%key, request_id, "Discarding stale session result");
                return Vec::new();
            }
        };

        match result {
            Ok(SessionStart::Created(session)) | Ok(SessionStart::Existing(session)) => {
                self.pending_request = None;
                info!(%key, correlation_id = %session.correlation_id, "Session ready");
                self.state = FlowState::SessionReady {
                    details,
                    session: session.clone(),
                    widget_ready: false,
                    notice: None,
                };
                vec![Command::MountCheckout(session)]
            }
            Ok(SessionStart::AlreadyPending) => {
                debug!(%key, "Session request already pending");
                Vec::new()
            }
            Err(e) => {
                self.pending_request = None;
                self.fail(e);
                Vec::new()
            }
        }
    }

    fn submit_payment(&mut self) -> Vec<Command> {
        let FlowState::SessionReady {
            details,
            session,
            widget_ready,
            notice,
        } = &mut self.state
        else {
            warn!(state = %self.state, "Payment submitted without a ready session");
            return Vec::new();
        };
        if !*widget_ready {
            warn!("Payment submitted before the payment form loaded");
            *notice = Some(FlowError::new(
                FlowErrorKind::CheckoutDeclined,
                WIDGET_NOT_READY,
                true,
            ));
            return Vec::new();
        }
        let details = details.clone();
        let session = session.clone();
        self.state = FlowState::Checkout {
            details,
            session: session.clone(),
        };
        vec![Command::ConfirmCheckout(session)]
    }

    fn checkout_finished(
        &mut self,
        correlation_id: uuid::Uuid,
        report: CheckoutReport,
    ) -> Vec<Command> {
        let (details, session) = match &self.state {
            FlowState::Checkout { details, session } if session.correlation_id == correlation_id => {
                (details.clone(), session.clone())
            }
            _ => {
                warn!(%correlation_id, "Discarding checkout result for an inactive session");
                return Vec::new();
            }
        };

        match report.outcome {
            CheckoutOutcome::Failed => {
                let message = report
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| PAYMENT_FAILED.to_string());
                warn!(%correlation_id, reason = %message, "Checkout declined");
                self.state = FlowState::SessionReady {
                    details,
                    session,
                    widget_ready: true,
                    notice: Some(FlowError::checkout_declined(message)),
                };
                Vec::new()
            }
            CheckoutOutcome::Succeeded => {
                match self.success_route(&details, report.processor_transaction_id) {
                    Ok(route) => {
                        info!(%correlation_id, path = %route.to_path(), "Checkout succeeded");
                        self.start_polling(route, true)
                    }
                    Err(e) => {
                        self.fail(e);
                        Vec::new()
                    }
                }
            }
        }
    }

    fn success_route(
        &self,
        details: &PaymentDetails,
        processor_transaction_id: Option<String>,
    ) -> Result<SuccessRoute, FlowError> {
        let link_id = || {
            self.link_id
                .clone()
                .ok_or_else(|| FlowError::missing_correlation("Missing link identifier."))
        };
        Ok(match &details.key {
            PrimaryKey::PaymentDetail(_) => SuccessRoute::Regular {
                link_id: link_id()?,
                payment_intent_id: processor_transaction_id,
            },
            PrimaryKey::OneTimePaymentDetails(_) => SuccessRoute::OneTime {
                link_id: link_id()?,
            },
            PrimaryKey::GroupPayment(group_payment_id) => SuccessRoute::Group {
                group_payment_id: Some(*group_payment_id),
                member_payment_id: self.member,
            },
            PrimaryKey::Bill { bill_id, .. } => SuccessRoute::Shop {
                bill_id: Some(*bill_id),
            },
        })
    }

    fn start_polling(&mut self, route: SuccessRoute, navigate: bool) -> Vec<Command> {
        match ConfirmationLookup::try_from(&route) {
            Ok(lookup) => {
                let mut commands = Vec::with_capacity(2);
                if navigate {
                    commands.push(Command::Navigate(route.clone()));
                }
                commands.push(Command::StartPolling(lookup));
                self.state = FlowState::PollingConfirmation { route, attempt: 0 };
                commands
            }
            Err(e) => {
                self.fail(e);
                Vec::new()
            }
        }
    }

    fn poll_finished(&mut self, outcome: PollOutcome) -> Vec<Command> {
        let FlowState::PollingConfirmation { route, .. } = &self.state else {
            debug!("Unexpected poll result ignored");
            return Vec::new();
        };
        let route = route.clone();
        match outcome {
            PollOutcome::Confirmed(record) => {
                self.state = FlowState::Confirmed {
                    route,
                    record: Box::new(record),
                };
            }
            PollOutcome::Exhausted(e) => self.fail(e),
            PollOutcome::Cancelled => debug!("Polling cancelled"),
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::details::{DetailExtras, GroupMember};
    use crate::session::PaymentSession;
    use linkcash_sdk::objects::{BillStatus, ConfirmedTransaction};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn regular() -> PaymentDetails {
        PaymentDetails {
            key: PrimaryKey::PaymentDetail(7),
            title: "Invoice".into(),
            description: None,
            amount: dec("45.00"),
            expires: None,
            owner_user_id: Some(1),
            extras: DetailExtras::Plain,
        }
    }

    fn group() -> PaymentDetails {
        let member = |id, name: &str, amount, paid| GroupMember {
            member_payment_id: id,
            name: name.into(),
            assigned_amount: dec(amount),
            paid,
        };
        PaymentDetails {
            key: PrimaryKey::GroupPayment(9),
            title: "Dinner".into(),
            description: None,
            amount: dec("90.00"),
            expires: None,
            owner_user_id: Some(4),
            extras: DetailExtras::Group {
                members: vec![
                    member(11, "Ann", "30.00", false),
                    member(12, "Ben", "30.00", false),
                    member(13, "Cat", "30.00", true),
                ],
            },
        }
    }

    fn session(key: SessionKey, secret: &str) -> PaymentSession {
        PaymentSession {
            key,
            client_secret: secret.into(),
            correlation_id: Uuid::now_v7(),
        }
    }

    fn begin_request(commands: &[Command]) -> (u64, InitiateSession) {
        commands
            .iter()
            .find_map(|c| match c {
                Command::BeginSession {
                    request_id,
                    request,
                } => Some((*request_id, request.clone())),
                _ => None,
            })
            .expect("no BeginSession command")
    }

    /// Drive a regular flow up to `SessionReady` with the widget loaded.
    fn ready_regular() -> (FlowMachine, PaymentSession) {
        let mut machine = FlowMachine::new();
        machine.apply(FlowEvent::Open("/link/abc123".into()));
        let commands = machine.apply(FlowEvent::DetailsResolved(Ok(Resolution::Payable(regular()))));
        let (request_id, request) = begin_request(&commands);
        let session = session(request.key(), "cs_test_1");
        machine.apply(FlowEvent::SessionStarted {
            request_id,
            key: request.key(),
            result: Ok(SessionStart::Created(session.clone())),
        });
        machine.apply(FlowEvent::WidgetReady {
            correlation_id: session.correlation_id,
        });
        (machine, session)
    }

    #[test]
    fn test_open_entry_route_resolves_details() {
        let mut machine = FlowMachine::new();
        let commands = machine.apply(FlowEvent::Open("/link/abc123".into()));
        assert_eq!(
            commands,
            vec![Command::ResolveLink(ResolveLinkDetails {
                kind: PaymentFlowKind::Regular,
                link_id: LinkIdentifier::new("abc123").unwrap(),
            })]
        );
        assert_eq!(
            machine.state(),
            &FlowState::ResolvingDetails {
                kind: PaymentFlowKind::Regular
            }
        );
        assert_eq!(machine.kind(), Some(PaymentFlowKind::Regular));
    }

    #[test]
    fn test_open_garbage_fails_as_invalid_link() {
        let mut machine = FlowMachine::new();
        assert!(machine.apply(FlowEvent::Open("/nowhere".into())).is_empty());
        assert_eq!(machine.state().error().unwrap().message, INVALID_LINK);
    }

    #[test]
    fn test_second_open_is_ignored() {
        let mut machine = FlowMachine::new();
        machine.apply(FlowEvent::Open("/link/abc123".into()));
        assert!(machine.apply(FlowEvent::Open("/link/other".into())).is_empty());
    }

    #[test]
    fn test_payable_details_begin_session_once() {
        let mut machine = FlowMachine::new();
        machine.apply(FlowEvent::Open("/link/abc123".into()));
        let commands = machine.apply(FlowEvent::DetailsResolved(Ok(Resolution::Payable(regular()))));
        let (_, request) = begin_request(&commands);
        assert_eq!(request.member, None);
        assert_eq!(machine.state().name(), "initiating_session");

        assert!(machine.apply(FlowEvent::BeginSession).is_empty());
    }

    #[test]
    fn test_already_completed_requests_no_session() {
        let mut machine = FlowMachine::new();
        machine.apply(FlowEvent::Open("/one-time/spent".into()));
        let mut details = regular();
        details.key = PrimaryKey::OneTimePaymentDetails(3);
        let commands = machine.apply(FlowEvent::DetailsResolved(Ok(
            Resolution::AlreadyCompleted {
                details,
                message: "used".into(),
            },
        )));
        assert!(commands.is_empty());
        assert!(matches!(machine.state(), FlowState::AlreadyCompleted { .. }));
        assert!(machine.apply(FlowEvent::BeginSession).is_empty());
        assert!(machine.apply(FlowEvent::RetrySession).is_empty());
    }

    #[test]
    fn test_lookup_failure_is_terminal() {
        let mut machine = FlowMachine::new();
        machine.apply(FlowEvent::Open("/link/abc123".into()));
        machine.apply(FlowEvent::DetailsResolved(Err(FlowError::new(
            FlowErrorKind::LinkInvalid,
            "Link expired",
            false,
        ))));
        let FlowState::Failed { error, details } = machine.state() else {
            panic!("expected failure");
        };
        assert_eq!(error.message, "Link expired");
        assert!(details.is_none());
    }

    #[test]
    fn test_group_waits_for_member() {
        let mut machine = FlowMachine::new();
        machine.apply(FlowEvent::Open("/group-payment/dinner".into()));
        let commands = machine.apply(FlowEvent::DetailsResolved(Ok(Resolution::Payable(group()))));
        assert!(commands.is_empty());
        assert!(matches!(
            machine.state(),
            FlowState::AwaitingMemberSelection { .. }
        ));

        let commands = machine.apply(FlowEvent::SelectMember(11));
        let (_, request) = begin_request(&commands);
        assert_eq!(request.member, Some(11));
    }

    #[test]
    fn test_paid_member_cannot_be_selected() {
        let mut machine = FlowMachine::new();
        machine.apply(FlowEvent::Open("/group-payment/dinner".into()));
        machine.apply(FlowEvent::DetailsResolved(Ok(Resolution::Payable(group()))));
        assert!(machine.apply(FlowEvent::SelectMember(13)).is_empty());
        assert_eq!(machine.state().error().unwrap().message, MEMBER_ALREADY_PAID);
        assert_eq!(machine.selected_member(), None);
    }

    #[test]
    fn test_member_switch_discards_stale_session() {
        let mut machine = FlowMachine::new();
        machine.apply(FlowEvent::Open("/group-payment/dinner".into()));
        machine.apply(FlowEvent::DetailsResolved(Ok(Resolution::Payable(group()))));

        let (a_id, a) = begin_request(&machine.apply(FlowEvent::SelectMember(11)));
        let commands = machine.apply(FlowEvent::SelectMember(12));
        assert!(commands.contains(&Command::InvalidateSession(a.key())));
        let (b_id, b) = begin_request(&commands);

        let stale = machine.apply(FlowEvent::SessionStarted {
            request_id: a_id,
            key: a.key(),
            result: Ok(SessionStart::Created(session(a.key(), "cs_a"))),
        });
        assert!(stale.is_empty());
        assert!(matches!(machine.state(), FlowState::InitiatingSession { .. }));

        let b_session = session(b.key(), "cs_b");
        let commands = machine.apply(FlowEvent::SessionStarted {
            request_id: b_id,
            key: b.key(),
            result: Ok(SessionStart::Created(b_session.clone())),
        });
        assert_eq!(commands, vec![Command::MountCheckout(b_session)]);
        assert_eq!(machine.state().session().unwrap().client_secret, "cs_b");
    }

    #[test]
    fn test_refused_member_keeps_ready_session() {
        let mut machine = FlowMachine::new();
        machine.apply(FlowEvent::Open("/group-payment/dinner".into()));
        machine.apply(FlowEvent::DetailsResolved(Ok(Resolution::Payable(group()))));
        let (request_id, request) = begin_request(&machine.apply(FlowEvent::SelectMember(11)));
        let ann = session(request.key(), "cs_a");
        machine.apply(FlowEvent::SessionStarted {
            request_id,
            key: request.key(),
            result: Ok(SessionStart::Created(ann.clone())),
        });

        assert!(machine.apply(FlowEvent::SelectMember(13)).is_empty());
        assert!(machine.apply(FlowEvent::SelectMember(99)).is_empty());
        let FlowState::SessionReady {
            session, notice, ..
        } = machine.state()
        else {
            panic!("expected the ready session to survive");
        };
        assert_eq!(session, &ann);
        assert_eq!(notice.as_ref().unwrap().message, UNKNOWN_MEMBER);
        assert_eq!(machine.selected_member(), Some(11));
    }

    #[test]
    fn test_refused_member_while_initiating_keeps_request() {
        let mut machine = FlowMachine::new();
        machine.apply(FlowEvent::Open("/group-payment/dinner".into()));
        machine.apply(FlowEvent::DetailsResolved(Ok(Resolution::Payable(group()))));
        let (request_id, request) = begin_request(&machine.apply(FlowEvent::SelectMember(11)));

        assert!(machine.apply(FlowEvent::SelectMember(13)).is_empty());
        let commands = machine.apply(FlowEvent::SessionStarted {
            request_id,
            key: request.key(),
            result: Ok(SessionStart::Created(session(request.key(), "cs_a"))),
        });
        assert!(matches!(commands.as_slice(), [Command::MountCheckout(_)]));
        assert_eq!(machine.state().session().unwrap().client_secret, "cs_a");
    }

    #[test]
    fn test_reselecting_same_member_is_noop() {
        let mut machine = FlowMachine::new();
        machine.apply(FlowEvent::Open("/group-payment/dinner".into()));
        machine.apply(FlowEvent::DetailsResolved(Ok(Resolution::Payable(group()))));
        machine.apply(FlowEvent::SelectMember(11));
        assert!(machine.apply(FlowEvent::SelectMember(11)).is_empty());
    }

    #[test]
    fn test_session_failure_allows_retry() {
        let mut machine = FlowMachine::new();
        machine.apply(FlowEvent::Open("/link/abc123".into()));
        let commands = machine.apply(FlowEvent::DetailsResolved(Ok(Resolution::Payable(regular()))));
        let (request_id, request) = begin_request(&commands);
        machine.apply(FlowEvent::SessionStarted {
            request_id,
            key: request.key(),
            result: Err(FlowError::new(
                FlowErrorKind::SessionInitFailed,
                "Failed to initiate payment",
                false,
            )),
        });
        assert_eq!(
            machine.state().error().unwrap().kind,
            FlowErrorKind::SessionInitFailed
        );
        assert!(machine.state().details().is_some());

        let (retry_id, _) = begin_request(&machine.apply(FlowEvent::RetrySession));
        assert!(retry_id > request_id);
    }

    #[test]
    fn test_submit_before_widget_ready_is_refused() {
        let mut machine = FlowMachine::new();
        machine.apply(FlowEvent::Open("/link/abc123".into()));
        let commands = machine.apply(FlowEvent::DetailsResolved(Ok(Resolution::Payable(regular()))));
        let (request_id, request) = begin_request(&commands);
        let session = session(request.key(), "cs_test_1");
        machine.apply(FlowEvent::SessionStarted {
            request_id,
            key: request.key(),
            result: Ok(SessionStart::Created(session.clone())),
        });

        assert!(machine.apply(FlowEvent::SubmitPayment).is_empty());
        assert_eq!(machine.state().error().unwrap().message, WIDGET_NOT_READY);

        machine.apply(FlowEvent::WidgetReady {
            correlation_id: session.correlation_id,
        });
        assert!(machine.state().error().is_none());
        assert_eq!(
            machine.apply(FlowEvent::SubmitPayment),
            vec![Command::ConfirmCheckout(session)]
        );
    }

    #[test]
    fn test_declined_checkout_keeps_session() {
        let (mut machine, session) = ready_regular();
        machine.apply(FlowEvent::SubmitPayment);
        machine.apply(FlowEvent::CheckoutFinished {
            correlation_id: session.correlation_id,
            report: CheckoutReport::failed("Your card was declined."),
        });
        let FlowState::SessionReady {
            session: kept,
            notice: Some(notice),
            widget_ready: true,
            ..
        } = machine.state()
        else {
            panic!("expected session ready with a notice");
        };
        assert_eq!(kept, &session);
        assert_eq!(notice.kind, FlowErrorKind::CheckoutDeclined);
        assert!(notice.retryable);

        assert_eq!(
            machine.apply(FlowEvent::SubmitPayment),
            vec![Command::ConfirmCheckout(session)]
        );
    }

    #[test]
    fn test_successful_checkout_navigates_and_polls() {
        let (mut machine, session) = ready_regular();
        machine.apply(FlowEvent::SubmitPayment);
        let commands = machine.apply(FlowEvent::CheckoutFinished {
            correlation_id: session.correlation_id,
            report: CheckoutReport::succeeded("pi_1"),
        });
        let route = route::classify_success("/regular-success/abc123?paymentIntentId=pi_1").unwrap();
        assert_eq!(
            commands,
            vec![
                Command::Navigate(route.clone()),
                Command::StartPolling(ConfirmationLookup::Regular {
                    link_id: LinkIdentifier::new("abc123").unwrap(),
                    payment_intent_id: "pi_1".into(),
                }),
            ]
        );

        machine.apply(FlowEvent::PollProgress { attempt: 3 });
        assert_eq!(
            machine.state(),
            &FlowState::PollingConfirmation {
                route: route.clone(),
                attempt: 3
            }
        );

        machine.apply(FlowEvent::PollFinished(PollOutcome::Confirmed(
            ConfirmedTransaction::default(),
        )));
        assert!(matches!(machine.state(), FlowState::Confirmed { .. }));
        assert!(machine.state().is_terminal());
    }

    #[test]
    fn test_success_without_processor_id_is_missing_correlation() {
        let (mut machine, session) = ready_regular();
        machine.apply(FlowEvent::SubmitPayment);
        let commands = machine.apply(FlowEvent::CheckoutFinished {
            correlation_id: session.correlation_id,
            report: CheckoutReport {
                outcome: CheckoutOutcome::Succeeded,
                processor_transaction_id: None,
                message: None,
            },
        });
        assert!(commands.is_empty());
        assert_eq!(
            machine.state().error().unwrap().kind,
            FlowErrorKind::MissingCorrelation
        );
    }

    #[test]
    fn test_checkout_result_for_other_session_is_ignored() {
        let (mut machine, _session) = ready_regular();
        machine.apply(FlowEvent::SubmitPayment);
        let commands = machine.apply(FlowEvent::CheckoutFinished {
            correlation_id: Uuid::now_v7(),
            report: CheckoutReport::succeeded("pi_x"),
        });
        assert!(commands.is_empty());
        assert_eq!(machine.state().name(), "checkout");
    }

    #[test]
    fn test_exhausted_polling_fails_with_timeout() {
        let (mut machine, session) = ready_regular();
        machine.apply(FlowEvent::SubmitPayment);
        machine.apply(FlowEvent::CheckoutFinished {
            correlation_id: session.correlation_id,
            report: CheckoutReport::succeeded("pi_1"),
        });
        machine.apply(FlowEvent::PollFinished(PollOutcome::Exhausted(
            FlowError::confirmation_timeout(),
        )));
        assert_eq!(
            machine.state().error().unwrap().kind,
            FlowErrorKind::ConfirmationTimeout
        );
    }

    #[test]
    fn test_open_success_route_polls_directly() {
        let mut machine = FlowMachine::new();
        let commands = machine.apply(FlowEvent::Open(
            "/group-success?groupPaymentId=9&memberPaymentId=11".into(),
        ));
        assert_eq!(
            commands,
            vec![Command::StartPolling(ConfirmationLookup::GroupMember {
                group_payment_id: 9,
                member_payment_id: 11,
            })]
        );

        let mut machine = FlowMachine::new();
        assert!(machine.apply(FlowEvent::Open("/shop-success".into())).is_empty());
        assert_eq!(
            machine.state().error().unwrap().kind,
            FlowErrorKind::MissingCorrelation
        );
    }

    #[test]
    fn test_shop_pin_flow() {
        let mut machine = FlowMachine::new();
        let commands = machine.apply(FlowEvent::Open("/bill/payment/qr-1".into()));
        assert!(matches!(commands.as_slice(), [Command::ResolveShop(_)]));

        let shop = ShopIdentity {
            shop_id: 5,
            name: "Corner Cafe".into(),
            address: None,
        };
        machine.apply(FlowEvent::ShopResolved(Ok(shop.clone())));
        assert!(matches!(machine.state(), FlowState::AwaitingPin { .. }));

        assert!(machine.apply(FlowEvent::SubmitPin("12a4".into())).is_empty());
        assert_eq!(machine.state().error().unwrap().message, INVALID_PIN);

        let commands = machine.apply(FlowEvent::SubmitPin(" 1234 ".into()));
        assert!(matches!(commands.as_slice(), [Command::ResolveBill(_)]));

        machine.apply(FlowEvent::DetailsResolved(Err(FlowError::new(
            FlowErrorKind::LinkInvalid,
            "Bill not found",
            false,
        ))));
        let FlowState::AwaitingPin {
            notice: Some(notice),
            ..
        } = machine.state()
        else {
            panic!("expected PIN prompt again");
        };
        assert_eq!(notice.message, "Bill not found");
        assert!(notice.retryable);

        machine.apply(FlowEvent::SubmitPin("1234".into()));
        let bill = linkcash_sdk::objects::Bill {
            bill_id: 20,
            customer_name: None,
            total: dec("8.40"),
            status: BillStatus::Unpaid,
            expires_at: None,
            items: vec![],
        };
        let commands = machine.apply(FlowEvent::DetailsResolved(Ok(Resolution::Payable(
            PaymentDetails::from_bill(shop, bill),
        ))));
        let (_, request) = begin_request(&commands);
        assert_eq!(
            request.details.key,
            PrimaryKey::Bill {
                shop_id: 5,
                bill_id: 20
            }
        );
    }
}
