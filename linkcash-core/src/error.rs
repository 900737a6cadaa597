//! User-facing flow errors.
//!
//! Every failure that ends a step of the payment flow is converted into a
//! [`FlowError`] before it reaches the state machine. Transport details are
//! logged where they happen and are not carried further unless the backend
//! wrote the text for the payer (link-invalidity messages).

use linkcash_sdk::client::ClientError;
use linkcash_sdk::objects::InitiateError;
use thiserror::Error;

pub const GENERIC_LINK_ERROR: &str = "Failed to load payment link.";
pub const GENERIC_INITIATE_ERROR: &str = "Failed to initiate payment";
pub const CONFIRMATION_TIMEOUT: &str = "Unable to load transaction details.";
pub const WIDGET_NOT_READY: &str = "Payment form has not loaded yet.";

/// Which step of the flow failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowErrorKind {
    /// Details lookup failed, or the link can no longer be paid.
    LinkInvalid,
    /// The backend refused to create a payment session.
    SessionInitFailed,
    /// The card widget reported a declined or failed confirmation.
    CheckoutDeclined,
    /// The confirmation record did not appear within the polling budget.
    ConfirmationTimeout,
    /// A success route was opened without the identifiers its lookup needs.
    MissingCorrelation,
}

impl std::fmt::Display for FlowErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowErrorKind::LinkInvalid => write!(f, "link_invalid"),
            FlowErrorKind::SessionInitFailed => write!(f, "session_init_failed"),
            FlowErrorKind::CheckoutDeclined => write!(f, "checkout_declined"),
            FlowErrorKind::ConfirmationTimeout => write!(f, "confirmation_timeout"),
            FlowErrorKind::MissingCorrelation => write!(f, "missing_correlation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FlowError {
    pub kind: FlowErrorKind,
    /// Text shown to the payer as-is.
    pub message: String,
    /// Whether the same step may be attempted again without new input.
    pub retryable: bool,
}

impl FlowError {
    pub fn new(kind: FlowErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    /// Details lookup failure.
    ///
    /// A non-2xx response keeps the backend's body verbatim: the backend
    /// owns the wording for expired or spent links. Anything else collapses
    /// to a generic message.
    pub fn link_invalid(err: &ClientError) -> Self {
        let message = match err {
            ClientError::Api { body, .. } if !body.trim().is_empty() => body.clone(),
            _ => GENERIC_LINK_ERROR.to_string(),
        };
        Self::new(FlowErrorKind::LinkInvalid, message, false)
    }

    /// Initiation failure; prefers the `error` field of a JSON rejection.
    pub fn session_init_failed(err: &ClientError) -> Self {
        let message = err
            .body()
            .and_then(|body| serde_json::from_str::<InitiateError>(body).ok())
            .and_then(|body| body.error)
            .filter(|msg| !msg.trim().is_empty())
            .unwrap_or_else(|| GENERIC_INITIATE_ERROR.to_string());
        Self::new(FlowErrorKind::SessionInitFailed, message, false)
    }

    /// A declined confirm keeps the session; the payer may submit again.
    pub fn checkout_declined(message: impl Into<String>) -> Self {
        Self::new(FlowErrorKind::CheckoutDeclined, message, true)
    }

    pub fn confirmation_timeout() -> Self {
        Self::new(FlowErrorKind::ConfirmationTimeout, CONFIRMATION_TIMEOUT, false)
    }

    pub fn missing_correlation(message: impl Into<String>) -> Self {
        Self::new(FlowErrorKind::MissingCorrelation, message, false)
    }
}
