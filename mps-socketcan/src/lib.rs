//! Linux SocketCAN driver: one raw `PF_CAN` socket per opened channel.

mod frame;
pub use frame::*;
mod socket;
pub use socket::*;

use std::{collections::HashMap, io, mem, sync::Arc, time::Duration};
use std::os::{fd::{AsFd, AsRawFd, FromRawFd, OwnedFd}, raw::c_void};
use libc::{can_filter, can_frame, read, CAN_RAW_FILTER, SOL_CAN_RAW};
use mps_can::{CanDriver, CanError, CanFilter, Frame, IdentifierFlags};

pub(crate) const FRAME_SIZE: usize = mem::size_of::<can_frame>();

#[derive(Debug, Clone, Default)]
pub struct SocketCan {
    sockets: Arc<HashMap<String, OwnedFd>>,
}

impl SocketCan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `channel` and install `filters` in one go.
    ///
    /// An empty filter list keeps the kernel default (accept all).
    pub fn open(channel: &str, filters: &[CanFilter]) -> Result<Self, CanError> {
        let mut device = Self::new();
        device.init_channel(channel)?;
        if !filters.is_empty() {
            device.set_filters(channel, filters)?;
        }
        log::info!("MPS-CAN - channel: {} opened with {} filter(s)", channel, filters.len());

        Ok(device)
    }

    pub fn init_channel(&mut self, channel: &str) -> Result<(), CanError> {
        let addr = CanAddr::from_iface(channel)
            .map_err(|e| CanError::DeviceConfigError(format!("{}: {}", channel, e)))?;

        let fd = raw_open_socket(&addr)
            .map_err(|e| CanError::DeviceOpenFailed(e.to_string()))?;
        // take ownership first so the fd is closed on every error path below
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        Arc::get_mut(&mut self.sockets)
            .ok_or_else(|| CanError::ChannelInitializeError(channel.to_owned()))?
            .insert(channel.to_owned(), fd);
        log::debug!("MPS-CAN - channel: {} bound to {:?}", channel, addr);

        Ok(())
    }

    pub fn read(&self, channel: &str) -> Result<CanMessage, CanError> {
        match self.sockets.get(channel) {
            Some(s) => {
                let mut frame = socket::can_frame_default();

                let rd = unsafe { read(
                    s.as_raw_fd(),
                    &mut frame as *mut _ as *mut c_void,
                    FRAME_SIZE
                ) };
                match rd {
                    n if n as usize == FRAME_SIZE => {
                        let mut msg = CanMessage::try_from(frame)?;
                        msg.set_channel(channel.to_owned());
                        log::trace!("MPS-CAN - received: {}", msg);
                        Ok(msg)
                    },
                    n if n < 0 => {
                        let e = io::Error::last_os_error();
                        if e.should_retry() {
                            Err(CanError::channel_timeout(channel))
                        } else {
                            Err(CanError::OperationError(e.to_string()))
                        }
                    },
                    n => Err(CanError::FrameConvertFailed(format!("short read of {} bytes", n))),
                }
            },
            None => Err(CanError::channel_not_opened(channel))
        }
    }

    /// Blocking read a single can frame with timeout.
    pub fn read_timeout(&self, channel: &str, timeout: Duration) -> Result<CanMessage, CanError> {
        match self.sockets.get(channel) {
            Some(s) => {
                use nix::poll::{poll, PollFd, PollFlags};
                let pollfd = PollFd::new(s.as_fd(), PollFlags::POLLIN);
                let millis = timeout.as_millis().min(u16::MAX as u128) as u16;

                match poll::<u16>(&mut [pollfd], millis)
                    .map_err(|e| CanError::OperationError(e.to_string()))?
                {
                    0 => Err(CanError::channel_timeout(channel)),
                    _ => self.read(channel),
                }
            },
            None => Err(CanError::channel_not_opened(channel)),
        }
    }

    pub fn write(&self, msg: CanMessage) -> Result<(), CanError> {
        let channel = msg.channel();
        match self.sockets.get(&channel) {
            Some(s) => {
                log::trace!("MPS-CAN - transmitting: {}", msg);
                raw_write_frame(s.as_raw_fd(), &can_frame::from(&msg))
                    .map_err(|e| CanError::OperationError(e.to_string()))
            },
            None => Err(CanError::channel_not_opened(channel))
        }
    }
}

impl SocketCan {
    /// Sets CAN ID filters on the socket.
    ///
    /// Only frames matching at least one filter are delivered by the kernel.
    pub fn set_filters(&self, channel: &str, filters: &[CanFilter]) -> Result<(), CanError> {
        match self.sockets.get(channel) {
            Some(s) => {
                let filters: Vec<can_filter> = filters.iter()
                    .map(|f| {
                        let (mut can_id, mut can_mask) = (f.can_id, f.can_mask);
                        // also match the frame format (standard or extended)
                        can_mask |= IdentifierFlags::EXTENDED.bits();
                        if f.extended {
                            can_id |= IdentifierFlags::EXTENDED.bits();
                        }
                        can_filter { can_id, can_mask }
                    })
                    .collect();
                set_socket_option_mult(s.as_raw_fd(), SOL_CAN_RAW, CAN_RAW_FILTER, &filters)
                    .map_err(|e| CanError::OperationError(e.to_string()))
            },
            None => Err(CanError::channel_not_opened(channel)),
        }
    }
}

impl CanDriver for SocketCan {
    type Channel = String;
    type Frame = CanMessage;

    #[inline]
    fn opened_channels(&self) -> Vec<Self::Channel> {
        self.sockets.keys()
            .cloned()
            .collect()
    }

    #[inline]
    fn transmit(&self, msg: Self::Frame) -> Result<(), CanError> {
        self.write(msg)
    }

    #[inline]
    fn receive(&self, channel: Self::Channel, timeout: Option<u32>) -> Result<Vec<Self::Frame>, CanError> {
        let timeout = timeout.unwrap_or(0);
        let msg = self.read_timeout(&channel, Duration::from_millis(timeout as u64))?;
        Ok(vec![msg, ])
    }

    #[inline]
    fn shutdown(&mut self) {
        match Arc::get_mut(&mut self.sockets) {
            Some(s) => s.clear(),
            None => log::warn!("MPS-CAN - sockets still shared, closed on last drop"),
        }
    }
}
