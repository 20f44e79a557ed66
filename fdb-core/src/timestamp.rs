//! Timestamp encoding for TS records
//!
//! Stored little-endian at the configured width.

use core::fmt;

use crate::config::TimestampWidth;

/// Timestamp encoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimestampError {
    /// Value does not fit the configured width
    Overflow,
    /// Buffer shorter than the configured width
    BufferTooSmall,
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow => write!(f, "timestamp does not fit the configured width"),
            Self::BufferTooSmall => write!(f, "timestamp buffer too small"),
        }
    }
}

/// Encode `timestamp` into the front of `out`, returning the bytes used
pub fn encode(width: TimestampWidth, timestamp: i64, out: &mut [u8]) -> Result<usize, TimestampError> {
    let size = width.bytes();
    let slot = out.get_mut(..size).ok_or(TimestampError::BufferTooSmall)?;

    match width {
        TimestampWidth::Bits32 => {
            let narrow = i32::try_from(timestamp).map_err(|_| TimestampError::Overflow)?;
            slot.copy_from_slice(&narrow.to_le_bytes());
        }
        TimestampWidth::Bits64 => slot.copy_from_slice(&timestamp.to_le_bytes()),
    }
    Ok(size)
}

/// Decode a timestamp from the front of `bytes`
pub fn decode(width: TimestampWidth, bytes: &[u8]) -> Result<i64, TimestampError> {
    match width {
        TimestampWidth::Bits32 => {
            let raw: [u8; 4] = bytes
                .get(..4)
                .and_then(|b| b.try_into().ok())
                .ok_or(TimestampError::BufferTooSmall)?;
            Ok(i64::from(i32::from_le_bytes(raw)))
        }
        TimestampWidth::Bits64 => {
            let raw: [u8; 8] = bytes
                .get(..8)
                .and_then(|b| b.try_into().ok())
                .ok_or(TimestampError::BufferTooSmall)?;
            Ok(i64::from_le_bytes(raw))
        }
    }
}
