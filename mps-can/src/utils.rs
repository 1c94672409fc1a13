use std::fmt::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::{DEFAULT_PADDING, MAX_FRAME_SIZE};
use crate::error::CanError;

/// resize data with default padding.
#[inline]
pub fn data_resize(data: &mut Vec<u8>, size: usize) {
    data.resize(size, DEFAULT_PADDING);
}

/// Check a payload fits a classic CAN frame.
#[inline]
pub fn check_len(len: usize) -> Result<(), CanError> {
    match len {
        ..=MAX_FRAME_SIZE => Ok(()),
        _ => Err(CanError::DataOutOfRange(len)),
    }
}

/// Bytes as uppercase hex pairs separated by single spaces, e.g. `40 0A 20 04`.
pub fn hex_string(data: &[u8]) -> String {
    data.iter()
        .enumerate()
        .fold(String::with_capacity(data.len() * 3), |mut out, (i, b)| {
            if i > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{b:02X}");
            out
        })
}

#[inline]
pub fn system_timestamp() -> u64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(v) => v.as_millis() as u64,
        Err(e) => {
            log::warn!("MPS-CAN - SystemTimeError: {0} when conversion failed!", e);
            0
        }
    }
}
