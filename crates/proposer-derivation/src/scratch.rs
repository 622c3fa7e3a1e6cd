//! Scratch directory lifecycle for fetched frames.
//!
//! One file per fetched frame, named `<l1_block_number>-<tx_index>-<frame_index>.frame`
//! so reassembly can `read_dir` it without needing a separate index file. Owned by a
//! single derivation invocation (§4.2.1, §5) — the orchestrator must not run two
//! derivations concurrently against the same directory.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::frame::Frame;

/// Clears `dir` (if present) and recreates it empty so reassembly afterward is O(N) in
/// the number of frames actually fetched this pass.
pub fn reset(dir: &Path) -> Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    std::fs::create_dir_all(dir)?;
    Ok(())
}

fn frame_path(dir: &Path, l1_block_number: u64, tx_index: u32, frame_index: usize) -> PathBuf {
    dir.join(format!("{l1_block_number}-{tx_index}-{frame_index}.frame"))
}

/// Writes one fetched frame to scratch.
pub fn write_frame(
    dir: &Path,
    l1_block_number: u64,
    tx_index: u32,
    frame_index: usize,
    frame: &Frame,
) -> Result<()> {
    let path = frame_path(dir, l1_block_number, tx_index, frame_index);
    std::fs::write(path, frame.encode())?;
    Ok(())
}

/// Reads back every frame written to `dir` by a prior fetch pass. Files that no longer
/// decode as a valid frame are skipped — a frame-level decode failure is the same
/// "reject this frame" outcome §4.2 step 3 describes for frames rejected at reassembly
/// time, just caught one step earlier.
pub fn read_all_frames(dir: &Path) -> Result<Vec<Frame>> {
    let mut frames = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let bytes = std::fs::read(entry.path())?;
        if let Some(frame) = Frame::decode(&bytes) {
            frames.push(frame);
        }
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ChannelId;

    #[test]
    fn reset_then_write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        reset(dir.path()).unwrap();

        let frame = Frame {
            channel_id: ChannelId([9; 16]),
            frame_number: 0,
            data: b"payload".to_vec(),
            is_last: true,
        };
        write_frame(dir.path(), 100, 0, 0, &frame).unwrap();

        let frames = read_all_frames(dir.path()).unwrap();
        assert_eq!(frames, vec![frame]);
    }

    #[test]
    fn reset_clears_stale_files_from_a_previous_pass() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stale.frame"), b"garbage-from-last-run").unwrap();

        reset(dir.path()).unwrap();
        assert!(read_all_frames(dir.path()).unwrap().is_empty());
    }
}
