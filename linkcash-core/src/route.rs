//! Link classifier.
//!
//! Turns the current navigation target into a flow kind plus the opaque
//! identifier that goes with it. Pure parsing: no I/O, and malformed input
//! yields `None` so the caller can render an empty state.
//!
//! Two families of routes are understood:
//!
//! - entry routes, which start a flow (`/link/{id}`, `/one-time/{id}`,
//!   `/group-payment/{id}`, `/bill/payment/{qrCode}`);
//! - success routes, which the flow navigates to after checkout and which
//!   carry the correlation ids the confirmation lookup needs.

use compact_str::CompactString;
use url::Url;

use crate::kind::PaymentFlowKind;

/// Opaque link token taken from the entry path (or QR code for shops).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkIdentifier(CompactString);

impl LinkIdentifier {
    /// Wrap a raw token. Returns `None` for blank input.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(CompactString::from(trimmed)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LinkIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// PIN a cashier hands out to locate a bill inside a shop.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BillPin(CompactString);

impl BillPin {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BillPin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub kind: PaymentFlowKind,
    pub identifier: LinkIdentifier,
}

/// Where the flow navigates once checkout reports success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessRoute {
    Regular {
        link_id: LinkIdentifier,
        payment_intent_id: Option<String>,
    },
    OneTime {
        link_id: LinkIdentifier,
    },
    Group {
        group_payment_id: Option<i64>,
        member_payment_id: Option<i64>,
    },
    Shop {
        bill_id: Option<i64>,
    },
}

impl SuccessRoute {
    pub fn kind(&self) -> PaymentFlowKind {
        match self {
            SuccessRoute::Regular { .. } => PaymentFlowKind::Regular,
            SuccessRoute::OneTime { .. } => PaymentFlowKind::OneTime,
            SuccessRoute::Group { .. } => PaymentFlowKind::Group,
            SuccessRoute::Shop { .. } => PaymentFlowKind::Shop,
        }
    }

    /// Render the navigation target.
    pub fn to_path(&self) -> String {
        match self {
            SuccessRoute::Regular {
                link_id,
                payment_intent_id,
            } => {
                let mut path = format!("/regular-success/{}", urlencoding::encode(link_id.as_str()));
                if let Some(pi) = payment_intent_id {
                    path.push_str("?paymentIntentId=");
                    path.push_str(&urlencoding::encode(pi));
                }
                path
            }
            SuccessRoute::OneTime { link_id } => {
                format!("/one-time-success/{}", urlencoding::encode(link_id.as_str()))
            }
            SuccessRoute::Group {
                group_payment_id,
                member_payment_id,
            } => {
                let mut query = Vec::new();
                if let Some(g) = group_payment_id {
                    query.push(format!("groupPaymentId={g}"));
                }
                if let Some(m) = member_payment_id {
                    query.push(format!("memberPaymentId={m}"));
                }
                if query.is_empty() {
                    "/group-success".to_string()
                } else {
                    format!("/group-success?{}", query.join("&"))
                }
            }
            SuccessRoute::Shop { bill_id } => match bill_id {
                Some(b) => format!("/shop-success?billId={b}"),
                None => "/shop-success".to_string(),
            },
        }
    }
}

/// Classify an entry route.
pub fn classify(target: &str) -> Option<LinkTarget> {
    let url = parse_target(target)?;
    let segments = decoded_segments(&url);
    let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

    let (kind, raw) = match segments.as_slice() {
        ["link", id] => (PaymentFlowKind::Regular, *id),
        ["one-time", id] => (PaymentFlowKind::OneTime, *id),
        ["group-payment", id] => (PaymentFlowKind::Group, *id),
        ["bill", "payment", qr] => (PaymentFlowKind::Shop, *qr),
        _ => return None,
    };

    Some(LinkTarget {
        kind,
        identifier: LinkIdentifier::new(raw)?,
    })
}

/// Classify a user-entered bill PIN. Only ASCII digits are accepted.
pub fn classify_pin(input: &str) -> Option<BillPin> {
    let pin = input.trim();
    if pin.is_empty() || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(BillPin(CompactString::from(pin)))
}

/// Classify a post-checkout success route.
///
/// Missing query parameters are kept as `None` rather than rejecting the
/// route, so the caller can tell the payer which identifier is absent.
pub fn classify_success(target: &str) -> Option<SuccessRoute> {
    let url = parse_target(target)?;
    let segments = decoded_segments(&url);
    let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
    let query = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    let numeric = |name: &str| query(name).and_then(|v| v.parse::<i64>().ok());

    match segments.as_slice() {
        ["regular-success", id] => Some(SuccessRoute::Regular {
            link_id: LinkIdentifier::new(id)?,
            payment_intent_id: query("paymentIntentId"),
        }),
        ["one-time-success", id] => Some(SuccessRoute::OneTime {
            link_id: LinkIdentifier::new(id)?,
        }),
        ["group-success"] => Some(SuccessRoute::Group {
            group_payment_id: numeric("groupPaymentId"),
            member_payment_id: numeric("memberPaymentId"),
        }),
        ["shop-success"] => Some(SuccessRoute::Shop {
            bill_id: numeric("billId"),
        }),
        _ => None,
    }
}

fn parse_target(target: &str) -> Option<Url> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }
    if target.starts_with("http://") || target.starts_with("https://") {
        return Url::parse(target).ok();
    }
    let base = Url::parse("http://entry.invalid/").ok()?;
    base.join(target).ok()
}

fn decoded_segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(|s| {
                    urlencoding::decode(s)
                        .map(|d| d.into_owned())
                        .unwrap_or_else(|_| s.to_string())
                })
                .collect()
        })
        .unwrap_or_default()
}
