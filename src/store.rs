//! Key layout and codec plumbing over the sled store.
//!
//! Everything lives in the default tree under prefixed keys so a single sled
//! transaction can cover an entity mutation, its dependent entity, the audit
//! append and the idempotency reservation.

use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionResult};

use crate::error::AdminError;

pub mod keys {
    pub fn staff(id: &str) -> String {
        format!("staff/{id}")
    }
    pub fn order(id: &str) -> String {
        format!("order/{id}")
    }
    pub fn dispute(id: &str) -> String {
        format!("dispute/{id}")
    }
    pub fn payout(id: &str) -> String {
        format!("payout/{id}")
    }
    pub fn appeal(id: &str) -> String {
        format!("appeal/{id}")
    }
    pub fn profile(id: &str) -> String {
        format!("profile/{id}")
    }
    pub fn verification(id: &str) -> String {
        format!("verification/{id}")
    }
    pub const SETTINGS: &str = "settings";

    pub const AUDIT_PREFIX: &[u8] = b"audit/";
    // '!' sorts below '/', so the head never shows up in an AUDIT_PREFIX scan.
    pub const AUDIT_HEAD: &[u8] = b"audit!head";

    pub fn audit(seq: u64) -> Vec<u8> {
        let mut key = AUDIT_PREFIX.to_vec();
        key.extend_from_slice(&seq.to_be_bytes());
        key
    }

    pub const IDEM_PREFIX: &str = "idem/";

    pub fn idem(class: &str, target: &str, token: &str) -> String {
        format!("idem/{class}/{target}/{token}")
    }
}

pub fn to_cbor<T: minicbor::Encode<()>>(value: &T) -> Result<Vec<u8>, AdminError> {
    minicbor::to_vec(value).map_err(AdminError::internal)
}

pub fn from_cbor<'b, T: minicbor::Decode<'b, ()>>(bytes: &'b [u8]) -> Result<T, AdminError> {
    minicbor::decode(bytes).map_err(AdminError::internal)
}

/// Result type used inside transaction closures.
pub type TxResult<T> = Result<T, ConflictableTransactionError<AdminError>>;

pub fn tx_abort<T>(err: AdminError) -> TxResult<T> {
    Err(ConflictableTransactionError::Abort(err))
}

pub fn tx_to_cbor<T: minicbor::Encode<()>>(value: &T) -> TxResult<Vec<u8>> {
    to_cbor(value).map_err(ConflictableTransactionError::Abort)
}

pub fn tx_from_cbor<'b, T: minicbor::Decode<'b, ()>>(bytes: &'b [u8]) -> TxResult<T> {
    from_cbor(bytes).map_err(ConflictableTransactionError::Abort)
}

/// Collapse a finished transaction into the caller-facing error taxonomy.
pub fn commit<T>(result: TransactionResult<T, AdminError>) -> Result<T, AdminError> {
    match result {
        Ok(value) => Ok(value),
        Err(TransactionError::Abort(err)) => Err(err),
        Err(TransactionError::Storage(err)) => Err(err.into()),
    }
}

/// Plain read of one cbor-encoded value outside a transaction.
pub fn read<T: for<'b> minicbor::Decode<'b, ()>>(
    db: &sled::Db,
    key: impl AsRef<[u8]>,
) -> Result<Option<T>, AdminError> {
    match db.get(key)? {
        Some(bytes) => Ok(Some(from_cbor(&bytes)?)),
        None => Ok(None),
    }
}

/// Plain write of one cbor-encoded value outside a transaction. Reserved for
/// out-of-scope flows (marketplace seeding, provisioning) and tests; every
/// admin transition goes through the engine's transactions instead.
pub fn write<T: minicbor::Encode<()>>(
    db: &sled::Db,
    key: impl AsRef<[u8]>,
    value: &T,
) -> Result<(), AdminError> {
    db.insert(key.as_ref(), to_cbor(value)?)?;
    Ok(())
}
