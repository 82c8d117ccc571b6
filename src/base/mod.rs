//! Base types and error handling.
//!
//! - [`NetError`]: the error taxonomy shared by every layer
//! - [`BlockingResult`]: would-block aware byte counts

pub mod blocking;
pub mod context;
pub mod neterror;

pub use blocking::BlockingResult;
pub use neterror::NetError;
