//! Session initiation against the unified initiate endpoint.
//!
//! [`SessionInitiator`] keeps one slot per [`SessionKey`]. A trigger for a
//! key whose request is still in flight is a no-op, and a key that already
//! holds a session gets that session back without another request. Slots are
//! dropped on failure and when the caller invalidates them (member switch).

use std::collections::HashMap;

use kanau::processor::Processor;
use linkcash_sdk::objects::InitiatePayment;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::PaymentBackend;
use crate::details::PaymentDetails;
use crate::error::{FlowError, FlowErrorKind};
use crate::kind::{PaymentFlowKind, PrimaryKey};

pub const SELECT_MEMBER: &str = "Select a member to pay for.";
pub const MEMBER_ALREADY_PAID: &str = "This member has already paid.";
pub const UNKNOWN_MEMBER: &str = "Selected member is not part of this payment.";
pub const MISSING_OWNER: &str = "Payment link has no owner.";

/// Identity of a payment session: one per link, and per member for groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub primary_key: PrimaryKey,
    pub member: Option<i64>,
}

impl SessionKey {
    pub fn new(primary_key: PrimaryKey, member: Option<i64>) -> Self {
        Self {
            primary_key,
            member,
        }
    }

    pub fn kind(&self) -> PaymentFlowKind {
        self.primary_key.kind()
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.member {
            Some(member) => write!(f, "{}/member:{member}", self.primary_key),
            None => write!(f, "{}", self.primary_key),
        }
    }
}

/// Client secret handed to the card widget, plus a local id for log
/// correlation.
#[derive(Clone, PartialEq, Eq)]
pub struct PaymentSession {
    pub key: SessionKey,
    pub client_secret: String,
    pub correlation_id: Uuid,
}

impl std::fmt::Debug for PaymentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentSession")
            .field("key", &self.key)
            .field("client_secret", &"<redacted>")
            .field("correlation_id", &self.correlation_id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStart {
    /// A request was issued and succeeded.
    Created(PaymentSession),
    /// The key already had a session.
    Existing(PaymentSession),
    /// Another request for the key is still in flight.
    AlreadyPending,
}

impl SessionStart {
    pub fn session(&self) -> Option<&PaymentSession> {
        match self {
            SessionStart::Created(s) | SessionStart::Existing(s) => Some(s),
            SessionStart::AlreadyPending => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Slot {
    InFlight(u64),
    Ready(PaymentSession),
}

#[derive(Debug)]
struct Slots {
    next_ticket: u64,
    by_key: HashMap<SessionKey, Slot>,
}

pub struct SessionInitiator<B> {
    backend: B,
    slots: Mutex<Slots>,
}

impl<B: PaymentBackend> SessionInitiator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            slots: Mutex::new(Slots {
                next_ticket: 0,
                by_key: HashMap::new(),
            }),
        }
    }

    /// Forget whatever is held for `key`. An in-flight request for it still
    /// completes but its session is not kept.
    pub async fn invalidate(&self, key: &SessionKey) {
        if self.slots.lock().await.by_key.remove(key).is_some() {
            debug!(%key, "Session slot invalidated");
        }
    }
}

/// Request a payment session for `details`, for `member` when the link is a
/// group link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiateSession {
    pub details: PaymentDetails,
    pub member: Option<i64>,
}

impl InitiateSession {
    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.details.key.clone(), self.member)
    }
}

/// A reserved slot whose request has not been sent yet.
#[derive(Debug)]
pub struct SessionTicket {
    key: SessionKey,
    ticket: u64,
    payload: InitiatePayment,
}

impl SessionTicket {
    pub fn key(&self) -> &SessionKey {
        &self.key
    }
}

#[derive(Debug)]
pub enum Reservation {
    /// The slot is ours; [`SessionInitiator::fulfil`] sends the request.
    Ticket(SessionTicket),
    /// Nothing to send.
    Settled(SessionStart),
}

impl<B: PaymentBackend> SessionInitiator<B> {
    /// Claim the slot for `req` without touching the network.
    ///
    /// Splitting the claim from the request lets a caller order it against
    /// [`SessionInitiator::invalidate`] before the request runs elsewhere.
    pub async fn reserve(&self, req: &InitiateSession) -> Result<Reservation, FlowError> {
        let key = req.key();
        let payload = build_initiate(&req.details, req.member)?;

        let mut slots = self.slots.lock().await;
        match slots.by_key.get(&key) {
            Some(Slot::InFlight(_)) => {
                debug!(%key, "Initiation already in flight, ignoring duplicate trigger");
                Ok(Reservation::Settled(SessionStart::AlreadyPending))
            }
            Some(Slot::Ready(session)) => {
                debug!(%key, correlation_id = %session.correlation_id, "Reusing session");
                Ok(Reservation::Settled(SessionStart::Existing(session.clone())))
            }
            None => {
                slots.next_ticket += 1;
                let ticket = slots.next_ticket;
                slots.by_key.insert(key.clone(), Slot::InFlight(ticket));
                Ok(Reservation::Ticket(SessionTicket {
                    key,
                    ticket,
                    payload,
                }))
            }
        }
    }

    /// Send the request for a reserved slot.
    ///
    /// The session is kept for reuse only if the slot was not invalidated
    /// meanwhile; it is returned either way.
    #[tracing::instrument(skip_all, err, fields(key = %ticket.key))]
    pub async fn fulfil(&self, ticket: SessionTicket) -> Result<PaymentSession, FlowError> {
        let SessionTicket {
            key,
            ticket,
            payload,
        } = ticket;
        let result = self.backend.initiate_transaction(&payload).await;

        let mut slots = self.slots.lock().await;
        let still_wanted =
            matches!(slots.by_key.get(&key), Some(Slot::InFlight(t)) if *t == ticket);
        match result {
            Ok(response) => {
                let session = PaymentSession {
                    key: key.clone(),
                    client_secret: response.client_secret,
                    correlation_id: Uuid::now_v7(),
                };
                if still_wanted {
                    slots.by_key.insert(key, Slot::Ready(session.clone()));
                } else {
                    debug!("Slot invalidated while in flight, session not kept");
                }
                info!(
                    correlation_id = %session.correlation_id,
                    amount = %payload.amount(),
                    "Payment session created"
                );
                Ok(session)
            }
            Err(e) => {
                if still_wanted {
                    slots.by_key.remove(&key);
                }
                warn!(error = %e, status = ?e.status(), "Session initiation failed");
                Err(FlowError::session_init_failed(&e))
            }
        }
    }
}

impl<B: PaymentBackend> Processor<InitiateSession> for SessionInitiator<B> {
    type Output = SessionStart;
    type Error = FlowError;

    async fn process(&self, req: InitiateSession) -> Result<SessionStart, FlowError> {
        match self.reserve(&req).await? {
            Reservation::Settled(start) => Ok(start),
            Reservation::Ticket(ticket) => self.fulfil(ticket).await.map(SessionStart::Created),
        }
    }
}

/// Build the initiation body for `details`.
///
/// Group links charge the selected member's assigned amount; every other
/// kind charges the link amount.
pub fn build_initiate(
    details: &PaymentDetails,
    member: Option<i64>,
) -> Result<InitiatePayment, FlowError> {
    let refuse = |message: &str| {
        Err(FlowError::new(
            FlowErrorKind::SessionInitFailed,
            message,
            false,
        ))
    };
    match &details.key {
        PrimaryKey::PaymentDetail(payment_detail_id) => match details.owner_user_id {
            Some(user_id) => Ok(InitiatePayment::Regular {
                payment_detail_id: *payment_detail_id,
                user_id,
                amount: details.amount,
            }),
            None => refuse(MISSING_OWNER),
        },
        PrimaryKey::OneTimePaymentDetails(id) => match details.owner_user_id {
            Some(user_id) => Ok(InitiatePayment::OneTime {
                one_time_payment_details_id: *id,
                user_id,
                amount: details.amount,
            }),
            None => refuse(MISSING_OWNER),
        },
        PrimaryKey::GroupPayment(group_payment_id) => {
            let Some(member_id) = member else {
                return refuse(SELECT_MEMBER);
            };
            let Some(member) = details.member(member_id) else {
                return refuse(UNKNOWN_MEMBER);
            };
            if member.paid {
                return refuse(MEMBER_ALREADY_PAID);
            }
            Ok(InitiatePayment::Group {
                group_payment_id: *group_payment_id,
                member_payment_id: member.member_payment_id,
                amount: member.assigned_amount,
            })
        }
        PrimaryKey::Bill { shop_id, bill_id } => Ok(InitiatePayment::Shop {
            shop_id: *shop_id,
            bill_id: *bill_id,
            amount: details.amount,
        }),
    }
}
