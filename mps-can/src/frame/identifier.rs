use std::fmt::{Display, Formatter};
use bitflags::bitflags;
use crate::constants::{EFF_MASK, SFF_MASK};

bitflags! {
    /// Identifier flags for indicating various frame types.
    ///
    /// Flag values correspond to the format used by the Linux [SocketCAN][socketcan]
    /// library, so a raw 32-bit `can_id` can be built by or-ing them onto the identifier.
    ///
    /// [socketcan]: https://www.kernel.org/doc/Documentation/networking/can.txt
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IdentifierFlags: u32 {
        /// The frame is using the extended format i.e. 29-bit extended identifiers.
        const EXTENDED = 0x8000_0000;
        /// The frame is a remote transmission request.
        const REMOTE = 0x4000_0000;
        /// The frame is an error frame.
        const ERROR = 0x2000_0000;
    }
}

/// An acceptance filter: a frame passes when `received_id & can_mask == can_id & can_mask`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CanFilter {
    pub can_id: u32,
    pub can_mask: u32,
    pub extended: bool,
}

impl CanFilter {
    /// Exact match on one 11-bit identifier.
    #[inline]
    pub fn standard(id: u16) -> Self {
        Self {
            can_id: id as u32 & SFF_MASK,
            can_mask: SFF_MASK,
            extended: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Id {
    Standard(u16),
    Extended(u32),
}

impl From<u32> for Id {
    #[inline]
    fn from(bits: u32) -> Self {
        Self::from_bits(bits, false)
    }
}

impl From<Id> for u32 {
    #[inline]
    fn from(id: Id) -> Self {
        id.into_bits()
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard(v) => write!(f, "0x{:03X}", v),
            Self::Extended(v) => write!(f, "0x{:08X}", v),
        }
    }
}

impl Id {
    #[inline]
    pub fn new_standard(id: u16) -> Self {
        Self::Standard(id & SFF_MASK as u16)
    }

    /// Bits above [`SFF_MASK`] promote the id to extended.
    #[inline]
    pub fn from_bits(bits: u32, extended: bool) -> Self {
        let bits = bits & EFF_MASK;
        if extended || bits & !SFF_MASK != 0 {
            Self::Extended(bits)
        } else {
            Self::Standard(bits as u16)
        }
    }

    #[inline]
    pub fn into_bits(self) -> u32 {
        match self {
            Self::Standard(v) => v as u32,
            Self::Extended(v) => v,
        }
    }

    #[inline]
    pub fn is_extended(&self) -> bool {
        matches!(self, Self::Extended(_))
    }
}
