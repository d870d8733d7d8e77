pub mod addr;
pub mod error;

pub use addr::{join_host_port, split_host_port, Address, ServerSpec};
pub use error::{PoolError, PoolErrorKind};
