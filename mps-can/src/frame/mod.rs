mod identifier;
pub use identifier::*;

use std::fmt::{Display, Formatter};
use crate::utils::hex_string;

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Direct {
    #[default]
    Transmit,
    Receive,
}

impl Display for Direct {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transmit => f.write_str("Tx"),
            Self::Receive => f.write_str("Rx"),
        }
    }
}

/// CAN 2.0 frame.
pub trait Frame: Send + Sync {
    type Channel: Display;

    /// `None` when `data` does not fit a classic frame.
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self>
    where
        Self: Sized;

    fn timestamp(&self) -> u64;

    fn set_timestamp(&mut self, value: Option<u64>) -> &mut Self
    where
        Self: Sized;

    fn id(&self) -> Id;

    fn is_remote(&self) -> bool;

    fn is_extended(&self) -> bool;

    fn direct(&self) -> Direct;

    fn set_direct(&mut self, direct: Direct) -> &mut Self
    where
        Self: Sized;

    fn is_error_frame(&self) -> bool;

    fn channel(&self) -> Self::Channel;

    fn set_channel(&mut self, value: Self::Channel) -> &mut Self
    where
        Self: Sized;

    /// ensure return the actual length of data.
    fn data(&self) -> &[u8];

    #[inline]
    fn dlc(&self) -> usize {
        self.length()
    }

    fn length(&self) -> usize;
}

impl<T: Display> Display for dyn Frame<Channel = T> + '_ {
    /// Output Frame as `asc` String.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let data_str = if self.is_remote() {
            " ".to_owned()
        } else {
            hex_string(self.data())
        };

        write!(f, "{:.3} {} {: >8x}{: <4} {} {} {: >2} {}",
               self.timestamp() as f64 / 1000.,
               self.channel(),
               self.id().into_bits(),
               if self.is_extended() { "x" } else { "" },
               self.direct(),
               if self.is_remote() { "r" } else { "d" },
               self.length(),
               data_str,
        )
    }
}
