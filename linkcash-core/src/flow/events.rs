//! Inputs and outputs of the flow machine.

use uuid::Uuid;

use crate::backend::ConfirmationLookup;
use crate::checkout::CheckoutReport;
use crate::details::ShopIdentity;
use crate::error::FlowError;
use crate::poller::PollOutcome;
use crate::resolver::{ResolveBill, ResolveLinkDetails, ResolveShop, Resolution};
use crate::route::SuccessRoute;
use crate::session::{InitiateSession, PaymentSession, SessionKey, SessionStart};

/// Everything the machine reacts to: payer intents first, then completions
/// posted back by the driver's tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    /// Start from an entry or success route.
    Open(String),
    SubmitPin(String),
    SelectMember(i64),
    /// Request a session again after an initiation failure.
    RetrySession,
    /// Guarded: only acts in `DetailsReady`.
    BeginSession,
    WidgetReady { correlation_id: Uuid },
    SubmitPayment,

    ShopResolved(Result<ShopIdentity, FlowError>),
    DetailsResolved(Result<Resolution, FlowError>),
    SessionStarted {
        request_id: u64,
        key: SessionKey,
        result: Result<SessionStart, FlowError>,
    },
    CheckoutFinished {
        correlation_id: Uuid,
        report: CheckoutReport,
    },
    PollProgress { attempt: u32 },
    PollFinished(PollOutcome),
}

/// Side effects requested by the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ResolveLink(ResolveLinkDetails),
    ResolveShop(ResolveShop),
    ResolveBill(ResolveBill),
    /// `request_id` comes back in the matching `SessionStarted`.
    BeginSession {
        request_id: u64,
        request: InitiateSession,
    },
    InvalidateSession(SessionKey),
    MountCheckout(PaymentSession),
    ConfirmCheckout(PaymentSession),
    Navigate(SuccessRoute),
    StartPolling(ConfirmationLookup),
}
