//! Row mapping and SQL for every [`crate::Ledger`] operation.
//!
//! Kept separate from `lib.rs` so the public async API (pool acquisition, `interact`
//! dispatch) stays readable next to the actual statements.

use proposer_types::{ProofRequest, RequestId, RequestStatus, RequestType};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};

fn row_to_request(row: &Row) -> rusqlite::Result<ProofRequest> {
    let kind: String = row.get("type")?;
    let status: String = row.get("status")?;
    Ok(ProofRequest {
        id: row.get("id")?,
        kind: kind.parse().map_err(|e: proposer_types::UnknownVariant| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        start_block: row.get::<_, i64>("start_block")? as u64,
        end_block: row.get::<_, i64>("end_block")? as u64,
        status: status.parse().map_err(|e: proposer_types::UnknownVariant| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        prover_request_id: row.get("prover_request_id")?,
        request_added_time: row.get::<_, i64>("request_added_time")? as u64,
        proof_request_time: row.get::<_, i64>("proof_request_time")? as u64,
        l1_block_number: row.get::<_, i64>("l1_block_number")? as u64,
        l1_block_hash: row.get("l1_block_hash")?,
        proof: row.get("proof")?,
    })
}

const SELECT_COLUMNS: &str = "id, type, start_block, end_block, status, prover_request_id, \
    request_added_time, proof_request_time, l1_block_number, l1_block_hash, proof";

pub(crate) fn insert(
    conn: &Connection,
    kind: RequestType,
    start: u64,
    end: u64,
    request_added_time: u64,
) -> Result<RequestId> {
    if start > end {
        return Err(Error::InvalidRange { start, end });
    }
    conn.execute(
        "INSERT INTO proof_requests (type, start_block, end_block, status, request_added_time) \
         VALUES (?1, ?2, ?3, 'UNREQ', ?4)",
        params![kind.as_str(), start as i64, end as i64, request_added_time as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn next_unrequested(conn: &Connection) -> Result<Option<ProofRequest>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM proof_requests WHERE status = 'UNREQ' ORDER BY id ASC LIMIT 1"
    );
    let mut stmt = conn.prepare(&sql)?;
    Ok(stmt.query_row([], row_to_request).optional()?)
}

pub(crate) fn count_by_status(conn: &Connection, status: RequestStatus) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM proof_requests WHERE status = ?1",
        params![status.as_str()],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

pub(crate) fn get_failed_on_server(conn: &Connection) -> Result<Vec<ProofRequest>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM proof_requests \
         WHERE status = 'FAILED' AND prover_request_id = '' ORDER BY id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], row_to_request)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
}

pub(crate) fn get_all_pending(conn: &Connection) -> Result<Vec<ProofRequest>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM proof_requests \
         WHERE status = 'REQ' AND prover_request_id != '' ORDER BY id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], row_to_request)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
}

fn get_by_id(conn: &Connection, id: RequestId) -> Result<ProofRequest> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM proof_requests WHERE id = ?1");
    conn.query_row(&sql, params![id], row_to_request)
        .optional()?
        .ok_or(Error::NotFound(id))
}

pub(crate) fn set_prover_request_id(conn: &Connection, id: RequestId, prover_request_id: &str) -> Result<()> {
    let changed = conn.execute(
        "UPDATE proof_requests SET prover_request_id = ?1 WHERE id = ?2",
        params![prover_request_id, id],
    )?;
    if changed == 0 {
        return Err(Error::NotFound(id));
    }
    Ok(())
}

pub(crate) fn update_status(conn: &Connection, id: RequestId, new_status: RequestStatus) -> Result<()> {
    let changed = conn.execute(
        "UPDATE proof_requests SET status = ?1 WHERE id = ?2",
        params![new_status.as_str(), id],
    )?;
    if changed == 0 {
        return Err(Error::NotFound(id));
    }
    Ok(())
}

/// `UNREQ -> REQ`, stamping `proof_request_time`. The precondition (was `UNREQ`) is
/// part of the `UPDATE`'s `WHERE` clause so it is enforced atomically against whatever
/// the row's status is *right now*, not whatever this connection last read.
pub(crate) fn mark_requested(conn: &Connection, id: RequestId, now: u64) -> Result<()> {
    let changed = conn.execute(
        "UPDATE proof_requests SET status = 'REQ', proof_request_time = ?1 \
         WHERE id = ?2 AND status = 'UNREQ'",
        params![now as i64, id],
    )?;
    if changed == 0 {
        let actual = get_by_id(conn, id)?.status;
        return Err(Error::PreconditionFailed {
            id,
            expected: "UNREQ",
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// `REQ -> COMPLETE`, only if the row is currently `REQ`.
pub(crate) fn add_proof(conn: &Connection, id: RequestId, proof: &[u8]) -> Result<()> {
    let changed = conn.execute(
        "UPDATE proof_requests SET proof = ?1, status = 'COMPLETE' WHERE id = ?2 AND status = 'REQ'",
        params![proof, id],
    )?;
    if changed == 0 {
        let actual = get_by_id(conn, id)?.status;
        return Err(Error::PreconditionFailed {
            id,
            expected: "REQ",
            actual: actual.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn attach_l1_checkpoint(
    conn: &Connection,
    start: u64,
    end: u64,
    l1_block_number: u64,
    l1_block_hash: &str,
) -> Result<ProofRequest> {
    let changed = conn.execute(
        "UPDATE proof_requests SET l1_block_number = ?1, l1_block_hash = ?2 \
         WHERE type = 'AGG' AND start_block = ?3 AND end_block = ?4",
        params![l1_block_number as i64, l1_block_hash, start as i64, end as i64],
    )?;
    if changed == 0 {
        return Err(Error::NoTilingCoverage { start, end });
    }
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM proof_requests \
         WHERE type = 'AGG' AND start_block = ?1 AND end_block = ?2"
    );
    conn.query_row(&sql, params![start as i64, end as i64], row_to_request)
        .map_err(Error::from)
}

/// Returns the ordered proof blobs for `SPAN` records in state `COMPLETE` that tile
/// `[start, end]` without gap or overlap.
pub(crate) fn get_consecutive_span_proofs(conn: &Connection, start: u64, end: u64) -> Result<Vec<Vec<u8>>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM proof_requests \
         WHERE type = 'SPAN' AND status = 'COMPLETE' AND start_block >= ?1 AND start_block <= ?2 \
         ORDER BY start_block ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![start as i64, end as i64], row_to_request)?;
    let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;

    let mut proofs = Vec::with_capacity(records.len());
    let mut cursor = start;
    for record in &records {
        if record.start_block != cursor {
            return Err(Error::NoTilingCoverage { start, end });
        }
        proofs.push(record.proof.clone());
        cursor = record.end_block + 1;
        if cursor > end {
            break;
        }
    }
    if cursor <= end {
        return Err(Error::NoTilingCoverage { start, end });
    }
    Ok(proofs)
}

/// Implements the Aggregation Planner (C5): walk completed `SPAN` records from `from`,
/// requiring each to start exactly where the previous left off, and create an `AGG`
/// record covering the contiguous run once it reaches `min_to`.
pub(crate) fn try_create_agg_from_spans(
    conn: &Connection,
    from: u64,
    min_to: u64,
    now: u64,
) -> Result<(bool, u64)> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM proof_requests \
         WHERE type = 'SPAN' AND status = 'COMPLETE' AND start_block >= ?1 \
         ORDER BY start_block ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![from as i64], row_to_request)?;
    let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;

    let mut run_end: Option<u64> = None;
    for record in &records {
        let expected_start = match run_end {
            None => from,
            Some(end) => end + 1,
        };
        if record.start_block != expected_start {
            break;
        }
        run_end = Some(record.end_block);
    }

    let Some(end) = run_end else {
        return Ok((false, 0));
    };
    if end < min_to {
        return Ok((false, 0));
    }

    insert(conn, RequestType::Agg, from, end, now)?;
    Ok((true, end))
}

/// Highest `end_block` among all `SPAN` records, regardless of status. Used by the
/// orchestrator's span-derivation pass to avoid re-deriving ranges it has already
/// turned into ledger rows (§4.4 Pass D).
pub(crate) fn max_span_end_block(conn: &Connection) -> Result<Option<u64>> {
    let end: Option<i64> = conn.query_row(
        "SELECT MAX(end_block) FROM proof_requests WHERE type = 'SPAN'",
        [],
        |row| row.get(0),
    )?;
    Ok(end.map(|e| e as u64))
}

/// Whether a `SPAN` record already covers exactly `[start, end]`, for Pass D's
/// idempotency check against double-inserting the same derived range.
pub(crate) fn span_range_exists(conn: &Connection, start: u64, end: u64) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM proof_requests WHERE type = 'SPAN' AND start_block = ?1 AND end_block = ?2",
        params![start as i64, end as i64],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
