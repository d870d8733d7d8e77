#![allow(clippy::needless_range_loop)]

pub mod common;
pub mod config;
pub mod dns;
pub mod pool;

pub use common::{Address, PoolError, PoolErrorKind, ServerSpec};
pub use dns::{DnsResolver, SrvTarget};
pub use pool::{AddressPool, Endpoint};
