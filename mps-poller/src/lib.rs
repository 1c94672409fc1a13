//! **`mps-poller`**, polls an MPS unit over CAN and tabulates what was sent
//! against what came back.

mod catalog;
pub use catalog::*;
mod error;
pub use error::*;
mod poller;
pub use poller::*;
mod settings;
pub use settings::*;

pub mod table;
