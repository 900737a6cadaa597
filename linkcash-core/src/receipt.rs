//! Receipt view model for confirmed transactions.
//!
//! The presenter only formats what the confirmation lookup returned; it makes
//! no network calls. Exporting writes the plain-text rendering under the
//! per-kind file stem. Shop receipts can additionally be fetched as a PDF from
//! the backend by the caller.

use linkcash_sdk::objects::ConfirmedTransaction;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::route::SuccessRoute;

pub const HEADING: &str = "Payment Successful";
pub const NOT_AVAILABLE: &str = "N/A";

/// Render `amount` as pounds with exactly two decimals.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("£{rounded:.2}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLine {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptSection {
    pub title: &'static str,
    pub lines: Vec<ReceiptLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub heading: &'static str,
    /// Formatted amount, `None` when the record carried none.
    pub amount: Option<String>,
    pub sections: Vec<ReceiptSection>,
    pub file_stem: String,
}

impl Receipt {
    pub fn line(&self, label: &str) -> Option<&str> {
        self.sections
            .iter()
            .flat_map(|s| s.lines.iter())
            .find(|l| l.label == label)
            .map(|l| l.value.as_str())
    }

    pub fn text_file_name(&self) -> String {
        format!("{}.txt", self.file_stem)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(self.heading);
        out.push('\n');
        if let Some(amount) = &self.amount {
            out.push_str(&format!("Amount Paid: {amount}\n"));
        }
        for section in &self.sections {
            out.push('\n');
            out.push_str(&section.title.to_uppercase());
            out.push('\n');
            for line in &section.lines {
                out.push_str(&format!("  {}: {}\n", line.label, line.value));
            }
        }
        out
    }
}

fn line(label: &'static str, value: impl Into<String>) -> ReceiptLine {
    ReceiptLine {
        label,
        value: value.into(),
    }
}

fn or_na(value: Option<&str>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

/// Canonical export stem for the receipt of `route`.
pub fn file_stem(route: &SuccessRoute, record: &ConfirmedTransaction) -> String {
    let id = |v: Option<i64>| v.map_or_else(|| "unknown".to_string(), |v| v.to_string());
    match route {
        SuccessRoute::Regular { link_id, .. } => format!("receipt_regular_{link_id}"),
        SuccessRoute::OneTime { link_id } => format!("one_time_payment_{link_id}"),
        SuccessRoute::Group {
            group_payment_id,
            member_payment_id,
        } => format!(
            "receipt_group_{}_{}",
            id(*group_payment_id),
            id(*member_payment_id)
        ),
        SuccessRoute::Shop { bill_id } => {
            format!("shop_receipt_{}", id(bill_id.or(record.bill_id)))
        }
    }
}

pub fn present(route: &SuccessRoute, record: &ConfirmedTransaction) -> Receipt {
    let transaction = ReceiptSection {
        title: "Transaction Info",
        lines: {
            let mut lines = vec![line(
                "Transaction ID",
                or_na(record.processor_transaction_id.as_deref()),
            )];
            if let Some(paid_at) = &record.paid_at {
                lines.push(line("Paid At", paid_at.clone()));
            }
            lines
        },
    };

    let mut sections = Vec::new();
    match route {
        SuccessRoute::Regular { .. } | SuccessRoute::OneTime { .. } => {
            let mut lines = vec![
                line("Title", record.title.clone().unwrap_or_default()),
                line("Description", record.description.clone().unwrap_or_default()),
            ];
            if let Some(expire_after) = &record.expire_after {
                lines.push(line("Expires After", expire_after.clone()));
            }
            sections.push(ReceiptSection {
                title: "Payment Details",
                lines,
            });
        }
        SuccessRoute::Group { .. } => {
            let mut member = vec![line("Member", record.member_name.clone().unwrap_or_default())];
            if let Some(assigned) = record.assigned_amount {
                member.push(line("Assigned Amount", format_amount(assigned)));
            }
            sections.push(ReceiptSection {
                title: "Member Payment",
                lines: member,
            });
            sections.push(ReceiptSection {
                title: "Group Details",
                lines: vec![
                    line("Title", record.title.clone().unwrap_or_default()),
                    line("Description", record.description.clone().unwrap_or_default()),
                ],
            });
        }
        SuccessRoute::Shop { bill_id } => {
            let bill_id = bill_id.or(record.bill_id);
            let item_count: u32 = record.items.iter().map(|i| i.quantity).sum();
            sections.push(ReceiptSection {
                title: "Bill Details",
                lines: vec![
                    line("Bill ID", bill_id.map(|b| b.to_string()).unwrap_or_default()),
                    line("Customer", record.customer_name.clone().unwrap_or_default()),
                    line("Status", record.bill_status.clone().unwrap_or_default()),
                    line("Items", item_count.to_string()),
                    line("Expires", or_na(record.bill_expires_at.as_deref())),
                ],
            });
            if record.shop_name.is_some() || record.shop_id.is_some() {
                let name = record.shop_name.clone().unwrap_or_default();
                let shop = match record.shop_id {
                    Some(id) => format!("{name} ({id})"),
                    None => name,
                };
                sections.push(ReceiptSection {
                    title: "Shop Info",
                    lines: vec![
                        line("Shop", shop),
                        line("Address", record.shop_address.clone().unwrap_or_default()),
                    ],
                });
            }
            if !record.items.is_empty() {
                sections.push(ReceiptSection {
                    title: "Items",
                    lines: record
                        .items
                        .iter()
                        .map(|item| {
                            let total = item.price * Decimal::from(item.quantity);
                            line(
                                "Item",
                                format!(
                                    "{} x{} @ {} = {}",
                                    item.item_name,
                                    item.quantity,
                                    format_amount(item.price),
                                    format_amount(total)
                                ),
                            )
                        })
                        .collect(),
                });
            }
        }
    }
    sections.push(transaction);

    Receipt {
        heading: HEADING,
        amount: record.charged_amount().map(format_amount),
        sections,
        file_stem: file_stem(route, record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{LinkIdentifier, classify_success};
    use linkcash_sdk::objects::ConfirmedTransactionItem;
    use rstest::rstest;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[rstest]
    #[case("45.00", "£45.00")]
    #[case("12.50", "£12.50")]
    #[case("12.5", "£12.50")]
    #[case("7", "£7.00")]
    #[case("0.125", "£0.13")]
    #[case("19.994", "£19.99")]
    fn test_format_amount(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(format_amount(dec(raw)), expected);
    }

    #[test]
    fn test_regular_receipt() {
        let route = classify_success("/regular-success/abc123?paymentIntentId=pi_1").unwrap();
        let record = ConfirmedTransaction {
            processor_transaction_id: Some("pi_1".into()),
            amount: Some(dec("45.00")),
            title: Some("Invoice".into()),
            ..Default::default()
        };
        let receipt = present(&route, &record);
        assert_eq!(receipt.heading, HEADING);
        assert_eq!(receipt.amount.as_deref(), Some("£45.00"));
        assert_eq!(receipt.line("Title"), Some("Invoice"));
        assert_eq!(receipt.line("Transaction ID"), Some("pi_1"));
        assert_eq!(receipt.file_stem, "receipt_regular_abc123");
        assert!(receipt.render_text().contains("Amount Paid: £45.00"));
    }

    #[test]
    fn test_missing_processor_id_shows_na() {
        let route = SuccessRoute::OneTime {
            link_id: LinkIdentifier::new("ot-1").unwrap(),
        };
        let record = ConfirmedTransaction {
            amount: Some(dec("12.50")),
            paid_at: Some("2025-03-01T10:00:00".into()),
            ..Default::default()
        };
        let receipt = present(&route, &record);
        assert_eq!(receipt.line("Transaction ID"), Some(NOT_AVAILABLE));
        assert_eq!(receipt.line("Paid At"), Some("2025-03-01T10:00:00"));
        assert_eq!(receipt.amount.as_deref(), Some("£12.50"));
        assert_eq!(receipt.text_file_name(), "one_time_payment_ot-1.txt");
    }

    #[test]
    fn test_group_receipt_uses_assigned_amount() {
        let route = SuccessRoute::Group {
            group_payment_id: Some(9),
            member_payment_id: Some(11),
        };
        let record = ConfirmedTransaction {
            member_name: Some("Ann".into()),
            assigned_amount: Some(dec("30")),
            ..Default::default()
        };
        let receipt = present(&route, &record);
        assert_eq!(receipt.amount.as_deref(), Some("£30.00"));
        assert_eq!(receipt.line("Member"), Some("Ann"));
        assert_eq!(receipt.file_stem, "receipt_group_9_11");
    }

    #[test]
    fn test_shop_receipt_lists_items() {
        let route = SuccessRoute::Shop { bill_id: Some(20) };
        let record = ConfirmedTransaction {
            bill_total: Some(dec("8.40")),
            bill_status: Some("PAID".into()),
            shop_id: Some(5),
            shop_name: Some("Corner Cafe".into()),
            items: vec![ConfirmedTransactionItem {
                item_name: "Tea".into(),
                quantity: 2,
                price: dec("4.20"),
            }],
            ..Default::default()
        };
        let receipt = present(&route, &record);
        assert_eq!(receipt.amount.as_deref(), Some("£8.40"));
        assert_eq!(receipt.line("Items"), Some("2"));
        assert_eq!(receipt.line("Expires"), Some(NOT_AVAILABLE));
        assert_eq!(receipt.line("Shop"), Some("Corner Cafe (5)"));
        assert_eq!(receipt.line("Item"), Some("Tea x2 @ £4.20 = £8.40"));
        assert_eq!(receipt.file_stem, "shop_receipt_20");
    }
}
