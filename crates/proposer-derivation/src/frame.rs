//! Batch-inbox transaction calldata frames.
//!
//! Wire format (one frame per transaction, or per blob when EIP-4844 sidecars are in
//! play): a 16-byte channel id, a `u16` frame number, the frame's data length as a
//! `u32`, the data itself, and a trailing `is_last` byte.

use std::fmt;

/// Identifies the channel a frame belongs to. Channels from the same batcher epoch
/// share an id so out-of-order L1 transactions can still be grouped for reassembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(pub [u8; 16]);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// One fragment of a channel's compressed batch payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub channel_id: ChannelId,
    pub frame_number: u16,
    pub data: Vec<u8>,
    pub is_last: bool,
}

impl Frame {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + 2 + 4 + self.data.len() + 1);
        out.extend_from_slice(&self.channel_id.0);
        out.extend_from_slice(&self.frame_number.to_be_bytes());
        out.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.data);
        out.push(self.is_last as u8);
        out
    }

    /// Decodes a single frame from a transaction's calldata. Returns `None` if the
    /// bytes are too short or declare a data length that overruns the buffer — the
    /// caller treats this the same as a rejected frame (§4.2 step 3).
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 16 + 2 + 4 + 1 {
            return None;
        }
        let mut channel_id = [0u8; 16];
        channel_id.copy_from_slice(&bytes[0..16]);
        let frame_number = u16::from_be_bytes(bytes[16..18].try_into().ok()?);
        let data_len = u32::from_be_bytes(bytes[18..22].try_into().ok()?) as usize;

        let data_start = 22;
        let data_end = data_start.checked_add(data_len)?;
        if bytes.len() < data_end + 1 {
            return None;
        }

        Some(Frame {
            channel_id: ChannelId(channel_id),
            frame_number,
            data: bytes[data_start..data_end].to_vec(),
            is_last: bytes[data_end] != 0,
        })
    }
}
