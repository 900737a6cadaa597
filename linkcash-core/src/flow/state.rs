use linkcash_sdk::objects::ConfirmedTransaction;

use crate::details::{PaymentDetails, ShopIdentity};
use crate::error::FlowError;
use crate::kind::PaymentFlowKind;
use crate::route::SuccessRoute;
use crate::session::{PaymentSession, SessionKey};

/// Observable state of one payment flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FlowState {
    #[default]
    Idle,
    /// A details, shop or bill lookup is in flight.
    ResolvingDetails { kind: PaymentFlowKind },
    /// Shop located; waiting for the payer to type the bill PIN.
    AwaitingPin {
        shop: ShopIdentity,
        notice: Option<FlowError>,
    },
    /// Details resolved and payable. Session initiation follows at once for
    /// every kind but group.
    DetailsReady { details: PaymentDetails },
    AwaitingMemberSelection {
        details: PaymentDetails,
        notice: Option<FlowError>,
    },
    InitiatingSession {
        details: PaymentDetails,
        key: SessionKey,
    },
    SessionReady {
        details: PaymentDetails,
        session: PaymentSession,
        widget_ready: bool,
        /// Last declined confirm, or a refused early submit.
        notice: Option<FlowError>,
    },
    /// A confirm is in progress in the widget.
    Checkout {
        details: PaymentDetails,
        session: PaymentSession,
    },
    PollingConfirmation { route: SuccessRoute, attempt: u32 },
    Confirmed {
        route: SuccessRoute,
        record: Box<ConfirmedTransaction>,
    },
    AlreadyCompleted {
        details: PaymentDetails,
        message: String,
    },
    Failed {
        error: FlowError,
        details: Option<PaymentDetails>,
    },
}

impl FlowState {
    pub fn name(&self) -> &'static str {
        match self {
            FlowState::Idle => "idle",
            FlowState::ResolvingDetails { .. } => "resolving_details",
            FlowState::AwaitingPin { .. } => "awaiting_pin",
            FlowState::DetailsReady { .. } => "details_ready",
            FlowState::AwaitingMemberSelection { .. } => "awaiting_member_selection",
            FlowState::InitiatingSession { .. } => "initiating_session",
            FlowState::SessionReady { .. } => "session_ready",
            FlowState::Checkout { .. } => "checkout",
            FlowState::PollingConfirmation { .. } => "polling_confirmation",
            FlowState::Confirmed { .. } => "confirmed",
            FlowState::AlreadyCompleted { .. } => "already_completed",
            FlowState::Failed { .. } => "failed",
        }
    }

    /// No further event moves the flow on by itself.
    ///
    /// `Failed` counts as terminal even though some failures accept a retry
    /// intent.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FlowState::Confirmed { .. } | FlowState::AlreadyCompleted { .. } | FlowState::Failed { .. }
        )
    }

    pub fn details(&self) -> Option<&PaymentDetails> {
        match self {
            FlowState::DetailsReady { details }
            | FlowState::AwaitingMemberSelection { details, .. }
            | FlowState::InitiatingSession { details, .. }
            | FlowState::SessionReady { details, .. }
            | FlowState::Checkout { details, .. }
            | FlowState::AlreadyCompleted { details, .. } => Some(details),
            FlowState::Failed { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    pub fn session(&self) -> Option<&PaymentSession> {
        match self {
            FlowState::SessionReady { session, .. } | FlowState::Checkout { session, .. } => {
                Some(session)
            }
            _ => None,
        }
    }

    /// Error or notice the payer should see in this state.
    pub fn error(&self) -> Option<&FlowError> {
        match self {
            FlowState::AwaitingPin { notice, .. }
            | FlowState::AwaitingMemberSelection { notice, .. }
            | FlowState::SessionReady { notice, .. } => notice.as_ref(),
            FlowState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
