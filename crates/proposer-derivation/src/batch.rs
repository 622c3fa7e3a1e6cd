//! Batch extraction from a channel's decompressed payload.
//!
//! A channel's decompressed bytes hold a stream of length-prefixed batch records, each
//! tagged `SINGULAR` (0) or `SPAN` (1). `SINGULAR` batches cover exactly one L2 block
//! and never feed into span-range derivation — only `SPAN` batches do (§4.2 step 4).

use proposer_config::RollupConfig;
use proposer_types::SpanBatchRange;

const SINGULAR_TAG: u8 = 0;
const SPAN_TAG: u8 = 1;

/// One decoded batch record from a channel's decompressed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Batch {
    Singular,
    Span { batch_timestamp: u64, block_count: u32 },
}

/// Streams every batch out of `payload`. Returns `None` (rather than an empty vec) if
/// the stream is malformed partway through, so the caller can apply the conservative
/// single-range fallback described in §4.2 step 5.
pub fn decode_batches(payload: &[u8]) -> Option<Vec<Batch>> {
    let mut batches = Vec::new();
    let mut cursor = 0usize;

    while cursor < payload.len() {
        let tag = *payload.get(cursor)?;
        cursor += 1;

        match tag {
            SINGULAR_TAG => {
                batches.push(Batch::Singular);
            }
            SPAN_TAG => {
                let ts_bytes: [u8; 8] = payload.get(cursor..cursor + 8)?.try_into().ok()?;
                cursor += 8;
                let count_bytes: [u8; 4] = payload.get(cursor..cursor + 4)?.try_into().ok()?;
                cursor += 4;

                batches.push(Batch::Span {
                    batch_timestamp: u64::from_be_bytes(ts_bytes),
                    block_count: u32::from_be_bytes(count_bytes),
                });
            }
            _ => return None,
        }
    }

    Some(batches)
}

/// Computes the L2 block range a `SPAN` batch covers: `[t2b(ts), t2b(ts) + n - 1]`.
pub fn span_batch_range(config: &RollupConfig, batch_timestamp: u64, block_count: u32) -> Option<SpanBatchRange> {
    if block_count == 0 {
        return None;
    }
    let start = config.timestamp_to_block(batch_timestamp);
    let end = start + (block_count as u64 - 1);
    Some(SpanBatchRange::new(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_span(ts: u64, count: u32) -> Vec<u8> {
        let mut out = vec![SPAN_TAG];
        out.extend_from_slice(&ts.to_be_bytes());
        out.extend_from_slice(&count.to_be_bytes());
        out
    }

    #[test]
    fn decodes_mixed_singular_and_span_batches() {
        let mut payload = vec![SINGULAR_TAG];
        payload.extend(encode_span(1_700_000_010, 5));

        let batches = decode_batches(&payload).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], Batch::Singular);
        assert_eq!(batches[1], Batch::Span { batch_timestamp: 1_700_000_010, block_count: 5 });
    }

    #[test]
    fn malformed_tag_returns_none() {
        let payload = vec![0xFF];
        assert!(decode_batches(&payload).is_none());
    }

    #[test]
    fn truncated_span_payload_returns_none() {
        let mut payload = vec![SPAN_TAG];
        payload.extend_from_slice(&1u64.to_be_bytes());
        // missing the block_count u32
        assert!(decode_batches(&payload).is_none());
    }
}
