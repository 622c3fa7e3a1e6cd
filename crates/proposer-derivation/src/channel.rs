//! Channel reassembly: grouping frames by channel id and concatenating them into a
//! compressed batch payload once the terminal frame arrives.

use std::collections::BTreeMap;
use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::frame::{ChannelId, Frame};

/// A channel's reassembly state. Frames are added in any order; the channel becomes
/// `ready` once the frame marked `is_last` has been seen, at which point its frames
/// tile `0..=last_frame_number` without gaps.
#[derive(Debug, Default)]
pub struct Channel {
    id: Option<ChannelId>,
    frames: BTreeMap<u16, Vec<u8>>,
    last_frame_number: Option<u16>,
    invalid_frames: bool,
}

impl Channel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalid_frames(&self) -> bool {
        self.invalid_frames
    }

    /// Adds a frame to this channel. Rejects (and marks `invalid_frames`) a frame that
    /// arrives after the channel is already `ready`, or a duplicate frame number.
    pub fn add_frame(&mut self, frame: Frame) {
        if let Some(id) = self.id {
            if id != frame.channel_id {
                self.invalid_frames = true;
                return;
            }
        } else {
            self.id = Some(frame.channel_id);
        }

        if self.is_ready() {
            self.invalid_frames = true;
            return;
        }

        if self.frames.contains_key(&frame.frame_number) {
            self.invalid_frames = true;
            return;
        }

        if frame.is_last {
            if let Some(existing_last) = self.last_frame_number {
                if existing_last != frame.frame_number {
                    self.invalid_frames = true;
                    return;
                }
            }
            self.last_frame_number = Some(frame.frame_number);
        }

        self.frames.insert(frame.frame_number, frame.data);
    }

    /// `true` once the terminal frame has arrived and every frame `0..=last` is present.
    pub fn is_ready(&self) -> bool {
        match self.last_frame_number {
            None => false,
            Some(last) => (0..=last).all(|n| self.frames.contains_key(&n)),
        }
    }

    /// Concatenates frames in order and zlib-decompresses the result. Only meaningful
    /// once [`Self::is_ready`] is `true`.
    pub fn decompress(&self) -> std::io::Result<Vec<u8>> {
        let mut compressed = Vec::new();
        for (_, data) in &self.frames {
            compressed.extend_from_slice(data);
        }
        let mut decoder = ZlibDecoder::new(compressed.as_slice());
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

/// Groups frames by channel id, feeding each channel's frames in the order given.
pub fn reassemble(frames: Vec<Frame>) -> BTreeMap<ChannelId, Channel> {
    let mut channels: BTreeMap<ChannelId, Channel> = BTreeMap::new();
    for frame in frames {
        channels.entry(frame.channel_id).or_default().add_frame(frame);
    }
    channels
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::ZlibEncoder, Compression};
    use std::io::Write;

    fn compress(payload: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(payload).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn channel_becomes_ready_once_all_frames_present() {
        let id = ChannelId([1; 16]);
        let payload = b"hello span batch world".to_vec();
        let compressed = compress(&payload);
        let mid = compressed.len() / 2;

        let mut channel = Channel::new();
        channel.add_frame(Frame {
            channel_id: id,
            frame_number: 1,
            data: compressed[mid..].to_vec(),
            is_last: true,
        });
        assert!(!channel.is_ready(), "missing frame 0");

        channel.add_frame(Frame {
            channel_id: id,
            frame_number: 0,
            data: compressed[..mid].to_vec(),
            is_last: false,
        });
        assert!(channel.is_ready());
        assert!(!channel.invalid_frames());

        let decompressed = channel.decompress().unwrap();
        assert_eq!(decompressed, payload);
    }

    #[test]
    fn frame_after_ready_is_rejected() {
        let id = ChannelId([2; 16]);
        let mut channel = Channel::new();
        channel.add_frame(Frame {
            channel_id: id,
            frame_number: 0,
            data: compress(b"x"),
            is_last: true,
        });
        assert!(channel.is_ready());

        channel.add_frame(Frame {
            channel_id: id,
            frame_number: 1,
            data: vec![1, 2, 3],
            is_last: false,
        });
        assert!(channel.invalid_frames());
    }

    #[test]
    fn reassemble_groups_by_channel_id() {
        let a = ChannelId([1; 16]);
        let b = ChannelId([2; 16]);
        let frames = vec![
            Frame { channel_id: a, frame_number: 0, data: compress(b"a"), is_last: true },
            Frame { channel_id: b, frame_number: 0, data: compress(b"b"), is_last: true },
        ];
        let channels = reassemble(frames);
        assert_eq!(channels.len(), 2);
        assert!(channels[&a].is_ready());
        assert!(channels[&b].is_ready());
    }
}
