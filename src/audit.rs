//! Append-only, hash-chained audit log.
//!
//! Every committed transition appends exactly one record, inside the same
//! transaction as the entity mutation. Each record carries the SHA-256 of the
//! previous record's CBOR bytes; `audit!head` tracks the newest (seq, hash)
//! pair so the chain can be verified end to end.

use chrono::Utc;
use sled::transaction::TransactionalTree;

use crate::entity::TimeStamp;
use crate::error::AdminError;
use crate::staff::CallerContext;
use crate::store::{self, keys, TxResult};

/// The closed vocabulary of privileged actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum ActionType {
    #[n(0)]
    OrderIntervention,
    #[n(1)]
    DisputeVerdict,
    #[n(2)]
    PayoutApprove,
    #[n(3)]
    PayoutReject,
    #[n(4)]
    AppealDecision,
    #[n(5)]
    UserStatusChange,
    #[n(6)]
    StaffActivated,
    #[n(7)]
    StaffSuspended,
    #[n(8)]
    StaffInvite,
    #[n(9)]
    KycVerification,
    #[n(10)]
    SystemConfigChange,
}

impl ActionType {
    pub const ALL: [ActionType; 11] = [
        ActionType::OrderIntervention,
        ActionType::DisputeVerdict,
        ActionType::PayoutApprove,
        ActionType::PayoutReject,
        ActionType::AppealDecision,
        ActionType::UserStatusChange,
        ActionType::StaffActivated,
        ActionType::StaffSuspended,
        ActionType::StaffInvite,
        ActionType::KycVerification,
        ActionType::SystemConfigChange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::OrderIntervention => "ORDER_INTERVENTION",
            ActionType::DisputeVerdict => "DISPUTE_VERDICT",
            ActionType::PayoutApprove => "PAYOUT_APPROVE",
            ActionType::PayoutReject => "PAYOUT_REJECT",
            ActionType::AppealDecision => "APPEAL_DECISION",
            ActionType::UserStatusChange => "USER_STATUS_CHANGE",
            ActionType::StaffActivated => "STAFF_ACTIVATED",
            ActionType::StaffSuspended => "STAFF_SUSPENDED",
            ActionType::StaffInvite => "STAFF_INVITE",
            ActionType::KycVerification => "KYC_VERIFICATION",
            ActionType::SystemConfigChange => "SYSTEM_CONFIG_CHANGE",
        }
    }

    pub fn parse(s: &str) -> Option<ActionType> {
        ActionType::ALL.into_iter().find(|a| a.as_str() == s)
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct AuditRecord {
    #[n(0)]
    pub seq: u64,
    #[n(1)]
    pub actor_id: String,
    #[n(2)]
    pub actor_email: String,
    #[n(3)]
    pub action: ActionType,
    #[n(4)]
    pub target_id: Option<String>,
    #[n(5)]
    pub details: String,
    // sha256 of the previous record's cbor bytes; None for the first record
    #[n(6)]
    pub prev_hash: Option<String>,
    #[n(7)]
    pub created_at: TimeStamp<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
struct ChainHead {
    #[n(0)]
    seq: u64,
    #[n(1)]
    hash: String,
}

/// Append one record inside the caller's transaction. The caller must not
/// report success unless the surrounding transaction commits.
pub fn append_tx(
    tx: &TransactionalTree,
    actor: &CallerContext,
    action: ActionType,
    target_id: Option<&str>,
    details: String,
    created_at: TimeStamp<Utc>,
) -> TxResult<u64> {
    let head: Option<ChainHead> = match tx.get(keys::AUDIT_HEAD)? {
        Some(bytes) => Some(store::tx_from_cbor(&bytes)?),
        None => None,
    };

    let (seq, prev_hash) = match head {
        Some(head) => (head.seq + 1, Some(head.hash)),
        None => (1, None),
    };

    let record = AuditRecord {
        seq,
        actor_id: actor.id.clone(),
        actor_email: actor.email.clone(),
        action,
        target_id: target_id.map(str::to_string),
        details,
        prev_hash,
        created_at,
    };

    let bytes = store::tx_to_cbor(&record)?;
    let hash = sha256::digest(&bytes);

    tx.insert(keys::audit(seq), bytes)?;
    tx.insert(keys::AUDIT_HEAD, store::tx_to_cbor(&ChainHead { seq, hash })?)?;

    Ok(seq)
}

/// All records in append order.
pub fn read_all(db: &sled::Db) -> Result<Vec<AuditRecord>, AdminError> {
    let mut records = Vec::new();
    for item in db.scan_prefix(keys::AUDIT_PREFIX) {
        let (_, bytes) = item?;
        records.push(store::from_cbor(&bytes)?);
    }
    Ok(records)
}

pub fn count(db: &sled::Db) -> Result<u64, AdminError> {
    let head: Option<ChainHead> = store::read(db, keys::AUDIT_HEAD)?;
    Ok(head.map(|h| h.seq).unwrap_or(0))
}

/// Walk the whole chain, re-deriving every hash. Returns the number of
/// verified records; any break (edited record, gap, stale head) is an error.
pub fn verify_chain(db: &sled::Db) -> Result<u64, AdminError> {
    let mut expected_prev: Option<String> = None;
    let mut expected_seq = 0u64;

    for item in db.scan_prefix(keys::AUDIT_PREFIX) {
        let (_, bytes) = item?;
        let record: AuditRecord = store::from_cbor(&bytes)?;

        expected_seq += 1;
        if record.seq != expected_seq {
            return Err(AdminError::internal(format!(
                "audit chain gap: expected seq {expected_seq}, found {}",
                record.seq
            )));
        }
        if record.prev_hash != expected_prev {
            return Err(AdminError::internal(format!(
                "audit chain broken at seq {}",
                record.seq
            )));
        }

        expected_prev = Some(sha256::digest(&bytes[..]));
    }

    let head: Option<ChainHead> = store::read(db, keys::AUDIT_HEAD)?;
    match (head, expected_prev) {
        (None, None) => Ok(0),
        (Some(head), Some(hash)) if head.seq == expected_seq && head.hash == hash => {
            Ok(expected_seq)
        }
        _ => Err(AdminError::internal("audit chain head does not match tail")),
    }
}
