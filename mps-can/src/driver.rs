use std::fmt::Display;
use crate::{CanError, Frame};

pub trait CanDriver: Clone {
    type Channel: Display + Clone;
    type Frame: Frame<Channel = Self::Channel>;
    #[inline]
    fn is_closed(&self) -> bool {
        self.opened_channels().is_empty()
    }
    /// get all channels that has opened
    fn opened_channels(&self) -> Vec<Self::Channel>;
    /// Transmit a CAN Frame.
    fn transmit(&self, msg: Self::Frame) -> Result<(), CanError>;
    /// Receive CAN Frames.
    ///
    /// Returns [`CanError::TimeoutError`] when nothing arrived within `timeout` milliseconds.
    fn receive(&self, channel: Self::Channel, timeout: Option<u32>) -> Result<Vec<Self::Frame>, CanError>;
    /// Close CAN device.
    fn shutdown(&mut self);
}
