pub mod details;
pub mod initiate;
pub mod shop;
pub mod transaction;

pub use details::{GroupLinkDetails, GroupMemberEntry, OneTimeLinkDetails, RegularLinkDetails};
pub use initiate::{InitiateError, InitiatePayment, InitiateResponse, PaymentType};
pub use shop::{Bill, BillItem, BillStatus, Shop};
pub use transaction::{ConfirmedTransaction, ConfirmedTransactionItem};
