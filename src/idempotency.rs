//! Dedicated idempotency ledger.
//!
//! Reservations are keyed (action class, target id, token) and written in the
//! same transaction as the transition they guard, so two concurrent requests
//! carrying the same token cannot both commit: the loser retries, sees the
//! reservation, and reports a replay instead of re-applying the effect.

use chrono::Utc;
use sled::transaction::TransactionalTree;

use crate::audit::ActionType;
use crate::entity::TimeStamp;
use crate::error::AdminError;
use crate::store::{self, keys, TxResult};

/// How long a token suppresses replays. Records older than this are treated
/// as absent: a very stale retry re-executes rather than silently no-ops.
pub const RETENTION_HOURS: i64 = 72;

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct IdempotencyRecord {
    #[n(0)]
    pub token: String,
    #[n(1)]
    pub class: ActionType,
    #[n(2)]
    pub target_id: String,
    #[n(3)]
    pub created_at: TimeStamp<Utc>,
}

fn is_live(record: &IdempotencyRecord, now: &TimeStamp<Utc>) -> bool {
    let age = now.to_datetime_utc() - record.created_at.to_datetime_utc();
    age <= chrono::Duration::hours(RETENTION_HOURS)
}

/// True if a live reservation for this (class, target, token) already exists.
pub fn replay_tx(
    tx: &TransactionalTree,
    class: ActionType,
    target_id: &str,
    token: &str,
    now: &TimeStamp<Utc>,
) -> TxResult<bool> {
    let key = keys::idem(class.as_str(), target_id, token);
    match tx.get(key.as_bytes())? {
        Some(bytes) => {
            let record: IdempotencyRecord = store::tx_from_cbor(&bytes)?;
            Ok(is_live(&record, now))
        }
        None => Ok(false),
    }
}

/// Reserve the token. Called only on the apply path, after the guards pass;
/// an aborted transaction rolls the reservation back with everything else.
pub fn reserve_tx(
    tx: &TransactionalTree,
    class: ActionType,
    target_id: &str,
    token: &str,
    now: TimeStamp<Utc>,
) -> TxResult<()> {
    let record = IdempotencyRecord {
        token: token.to_string(),
        class,
        target_id: target_id.to_string(),
        created_at: now,
    };
    let key = keys::idem(class.as_str(), target_id, token);
    tx.insert(key.as_bytes(), store::tx_to_cbor(&record)?)?;
    Ok(())
}

/// Physically remove expired reservations. Returns how many were dropped.
pub fn prune(db: &sled::Db, now: &TimeStamp<Utc>) -> Result<u64, AdminError> {
    let mut removed = 0;
    for item in db.scan_prefix(keys::IDEM_PREFIX) {
        let (key, bytes) = item?;
        let record: IdempotencyRecord = store::from_cbor(&bytes)?;
        if !is_live(&record, now) {
            db.remove(key)?;
            removed += 1;
        }
    }
    Ok(removed)
}
