use std::fmt::{Display, Formatter};
use libc::can_frame;
use mps_can::{utils, CanError, Direct, Frame, Id, IdentifierFlags, EFF_MASK, MAX_FRAME_SIZE};
use crate::socket;

#[derive(Debug, Clone)]
pub struct CanMessage {
    pub(crate) timestamp: u64,
    pub(crate) arbitration_id: u32,
    pub(crate) is_extended_id: bool,
    pub(crate) is_remote_frame: bool,
    pub(crate) is_error_frame: bool,
    pub(crate) channel: String,
    pub(crate) length: usize,
    pub(crate) data: Vec<u8>,
    pub(crate) direct: Direct,
}

impl TryFrom<can_frame> for CanMessage {
    type Error = CanError;

    fn try_from(frame: can_frame) -> Result<Self, Self::Error> {
        let length = frame.can_dlc as usize;
        if length > MAX_FRAME_SIZE {
            return Err(CanError::FrameConvertFailed(format!("dlc {} out of range", length)));
        }
        let can_id = frame.can_id;
        let is_remote_frame = can_id & IdentifierFlags::REMOTE.bits() != 0;

        Ok(Self {
            timestamp: utils::system_timestamp(),
            arbitration_id: can_id & EFF_MASK,
            is_extended_id: can_id & IdentifierFlags::EXTENDED.bits() != 0,
            is_remote_frame,
            is_error_frame: can_id & IdentifierFlags::ERROR.bits() != 0,
            channel: Default::default(),
            length,
            data: if is_remote_frame { Vec::new() } else { frame.data[..length].to_vec() },
            direct: Direct::Receive,
        })
    }
}

impl From<&CanMessage> for can_frame {
    fn from(msg: &CanMessage) -> Self {
        let mut frame = socket::can_frame_default();
        let length = msg.data.len();
        frame.data[..length].copy_from_slice(&msg.data);
        frame.can_dlc = msg.length as u8;

        let mut can_id = msg.arbitration_id;
        if msg.is_extended_id {
            can_id |= IdentifierFlags::EXTENDED.bits();
        }
        if msg.is_error_frame {
            can_id |= IdentifierFlags::ERROR.bits();
        }
        if msg.is_remote_frame {
            can_id |= IdentifierFlags::REMOTE.bits();
        }
        frame.can_id = can_id;

        frame
    }
}

impl Frame for CanMessage {
    type Channel = String;

    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        let length = data.len();
        if utils::check_len(length).is_err() {
            return None;
        }

        let id: Id = id.into();
        Some(Self {
            timestamp: 0,
            arbitration_id: id.into_bits(),
            is_extended_id: id.is_extended(),
            is_remote_frame: false,
            is_error_frame: false,
            channel: Default::default(),
            length,
            data: data.to_vec(),
            direct: Default::default(),
        })
    }

    #[inline]
    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    #[inline]
    fn set_timestamp(&mut self, value: Option<u64>) -> &mut Self {
        self.timestamp = value.unwrap_or_else(utils::system_timestamp);
        self
    }

    #[inline]
    fn id(&self) -> Id {
        Id::from_bits(self.arbitration_id, self.is_extended_id)
    }

    #[inline]
    fn is_remote(&self) -> bool {
        self.is_remote_frame
    }

    #[inline]
    fn is_extended(&self) -> bool {
        self.is_extended_id
    }

    #[inline]
    fn direct(&self) -> Direct {
        self.direct
    }

    #[inline]
    fn set_direct(&mut self, direct: Direct) -> &mut Self {
        self.direct = direct;
        self
    }

    #[inline]
    fn is_error_frame(&self) -> bool {
        self.is_error_frame
    }

    #[inline]
    fn channel(&self) -> Self::Channel {
        self.channel.clone()
    }

    #[inline]
    fn set_channel(&mut self, value: Self::Channel) -> &mut Self {
        self.channel = value;
        self
    }

    #[inline]
    fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    #[inline]
    fn length(&self) -> usize {
        self.length
    }
}

impl PartialEq for CanMessage {
    fn eq(&self, other: &Self) -> bool {
        if self.length != other.length {
            return false;
        }

        if self.is_remote_frame {
            other.is_remote_frame && (self.arbitration_id == other.arbitration_id)
        }
        else {
            (self.arbitration_id == other.arbitration_id) &&
                (self.is_extended_id == other.is_extended_id) &&
                (self.is_error_frame == other.is_error_frame) &&
                (self.data == other.data)
        }
    }
}

impl Display for CanMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        <dyn Frame<Channel = String> as Display>::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_frame() {
        let data = [0x40, 0x0A, 0x20, 0x04, 0x00, 0x00, 0x00, 0x00];
        let msg = CanMessage::new(Id::new_standard(0x641), &data).unwrap();
        let raw = can_frame::from(&msg);
        assert_eq!(raw.can_id, 0x641);
        assert_eq!(raw.can_dlc, 8);
        assert_eq!(raw.data, data);
    }

    #[test]
    fn test_response_frame() {
        let mut raw = socket::can_frame_default();
        raw.can_id = 0x5C1;
        raw.can_dlc = 2;
        raw.data[0] = 0xAA;
        raw.data[1] = 0xBB;

        let msg = CanMessage::try_from(raw).unwrap();
        assert_eq!(msg.id(), Id::Standard(0x5C1));
        assert_eq!(msg.data(), &[0xAA, 0xBB]);
        assert_eq!(msg.direct(), Direct::Receive);
        assert!(!msg.is_extended());
    }

    #[test]
    fn test_oversized() {
        assert!(CanMessage::new(0x641, &[0u8; 9]).is_none());

        let mut raw = socket::can_frame_default();
        raw.can_dlc = 15;
        assert!(CanMessage::try_from(raw).is_err());
    }
}
