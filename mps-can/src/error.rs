#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum CanError {
    #[error("MPS-CAN - device configuration error {0}")]
    DeviceConfigError(String),
    #[error("MPS-CAN - device open failed: {0}")]
    DeviceOpenFailed(String),

    #[error("MPS-CAN - data length: {0} is too large")]
    DataOutOfRange(usize),

    #[error("MPS-CAN - channel: {0} initialize failed")]
    ChannelInitializeError(String),
    #[error("MPS-CAN - channel: {0} not opened")]
    ChannelNotOpened(String),

    #[error("MPS-CAN - operation error: {0}")]
    OperationError(String),
    #[error("MPS-CAN - channel: {0} timeout error")]
    TimeoutError(String),

    #[error("MPS-CAN - frame convert failed, reason: {0}")]
    FrameConvertFailed(String),
}

impl CanError {
    #[inline]
    pub fn channel_not_opened<T: ToString>(channel: T) -> Self {
        Self::ChannelNotOpened(channel.to_string())
    }

    #[inline]
    pub fn channel_timeout<T: ToString>(channel: T) -> Self {
        Self::TimeoutError(channel.to_string())
    }

    /// Whether the error only means nothing arrived in time.
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimeoutError(_))
    }
}
