//! **`mps-can`**, the bus layer of the MPS diagnostic poller.
//!
//! A driver implements [`CanDriver`] and produces frames implementing [`Frame`];
//! the poller only talks to these two traits, so the SocketCAN driver can be
//! swapped for a scripted one in tests.

mod constants;
pub use constants::*;
mod driver;
pub use driver::*;
mod frame;
pub use frame::*;

pub mod error;
pub use error::CanError;
pub mod utils;
