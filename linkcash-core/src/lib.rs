#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod backend;
pub mod checkout;
pub mod details;
pub mod error;
pub mod flow;
pub mod kind;
pub mod poller;
pub mod receipt;
pub mod resolver;
pub mod route;
pub mod session;
