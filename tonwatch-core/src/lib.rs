#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod notify;
pub mod processors;
pub mod storage;
pub mod tonapi;
