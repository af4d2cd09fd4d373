//! WAL entry framing
//!
//! Each entry is written as:
//!
//! ```text
//! +-------------+-------------+---------------------+
//! | len: u32 LE | crc: u32 LE | payload (len bytes) |
//! +-------------+-------------+---------------------+
//! ```
//!
//! The payload is the MessagePack encoding of a [`WalEntry`]; the CRC32
//! covers the payload only. Payloads are at most [`MAX_FRAME_LEN`] bytes, so a
//! larger declared length is a damaged header rather than a short read.

use crate::error::DurabilityError;
use crate::wal::WalEntry;
use byteorder::{ByteOrder, LittleEndian};

/// Bytes preceding every payload
pub const FRAME_HEADER_LEN: usize = 8;

/// Largest payload a frame may carry
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Why a frame could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes than the frame needs; a torn write at the tail
    Incomplete {
        /// Bytes available
        have: usize,
        /// Bytes the frame needs
        needed: usize,
    },
    /// Declared payload length exceeds [`MAX_FRAME_LEN`]
    BadLength {
        /// Length read from the header
        len: usize,
    },
    /// Payload present but its checksum does not match
    ChecksumMismatch {
        /// Size of the whole frame, so the reader can skip it
        frame_len: usize,
    },
    /// Checksum matched but the payload is not a valid entry
    Malformed {
        /// Size of the whole frame
        frame_len: usize,
        /// Decoder message
        reason: String,
    },
}

/// Encode one entry into a framed byte buffer
pub fn encode_entry(entry: &WalEntry) -> Result<Vec<u8>, DurabilityError> {
    let payload = rmp_serde::to_vec(entry).map_err(|e| DurabilityError::Encode(e.to_string()))?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(DurabilityError::Encode(format!(
            "entry of {} bytes exceeds the {} byte frame limit",
            payload.len(),
            MAX_FRAME_LEN
        )));
    }
    let mut buf = vec![0u8; FRAME_HEADER_LEN + payload.len()];
    LittleEndian::write_u32(&mut buf[0..4], payload.len() as u32);
    LittleEndian::write_u32(&mut buf[4..8], crc32fast::hash(&payload));
    buf[FRAME_HEADER_LEN..].copy_from_slice(&payload);
    Ok(buf)
}

/// Decode the frame at the start of `buf`
///
/// Returns the entry and the number of bytes consumed.
pub fn decode_entry(buf: &[u8]) -> Result<(WalEntry, usize), DecodeError> {
    if buf.len() < FRAME_HEADER_LEN {
        return Err(DecodeError::Incomplete {
            have: buf.len(),
            needed: FRAME_HEADER_LEN,
        });
    }
    let len = LittleEndian::read_u32(&buf[0..4]) as usize;
    if len > MAX_FRAME_LEN {
        return Err(DecodeError::BadLength { len });
    }
    let crc = LittleEndian::read_u32(&buf[4..8]);
    let frame_len = FRAME_HEADER_LEN + len;
    if buf.len() < frame_len {
        return Err(DecodeError::Incomplete {
            have: buf.len(),
            needed: frame_len,
        });
    }

    let payload = &buf[FRAME_HEADER_LEN..frame_len];
    if crc32fast::hash(payload) != crc {
        return Err(DecodeError::ChecksumMismatch { frame_len });
    }

    let entry = rmp_serde::from_slice(payload).map_err(|e| DecodeError::Malformed {
        frame_len,
        reason: e.to_string(),
    })?;
    Ok((entry, frame_len))
}
