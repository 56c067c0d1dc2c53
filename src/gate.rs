//! Authorization gate: one canonical table from operation to allowed roles.
//!
//! The same table answers both "may this caller execute this action" and the
//! edge router's "may this role navigate here", so the two can never diverge.

use tracing::warn;

use crate::error::AdminError;
use crate::staff::{CallerContext, IdentityResolver, Role, StaffRecord};
use crate::store::{self, keys};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    OrderForceStatus,
    DisputeVerdict,
    PayoutDecision,
    AppealDecision,
    AccountStatusChange,
    StaffStatusChange,
    StaffInvite,
    VerificationDecision,
    SettingsChange,
    AuditExport,
}

impl Operation {
    pub const ALL: [Operation; 10] = [
        Operation::OrderForceStatus,
        Operation::DisputeVerdict,
        Operation::PayoutDecision,
        Operation::AppealDecision,
        Operation::AccountStatusChange,
        Operation::StaffStatusChange,
        Operation::StaffInvite,
        Operation::VerificationDecision,
        Operation::SettingsChange,
        Operation::AuditExport,
    ];

    /// The capability table. Immutable at runtime.
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Operation::OrderForceStatus => &[Role::SuperAdmin, Role::Finance, Role::Support],
            Operation::DisputeVerdict => &[Role::SuperAdmin, Role::Finance],
            Operation::PayoutDecision => &[Role::SuperAdmin, Role::Finance],
            Operation::AppealDecision => &[Role::SuperAdmin, Role::Moderator],
            Operation::AccountStatusChange => &[Role::SuperAdmin, Role::Moderator],
            Operation::StaffStatusChange => &[Role::SuperAdmin],
            Operation::StaffInvite => &[Role::SuperAdmin],
            Operation::VerificationDecision => &[Role::SuperAdmin, Role::Moderator],
            Operation::SettingsChange => &[Role::SuperAdmin],
            Operation::AuditExport => &[Role::SuperAdmin, Role::Analyst],
        }
    }

    /// The money/state families that must carry a client token.
    pub fn requires_idempotency_key(&self) -> bool {
        matches!(
            self,
            Operation::OrderForceStatus | Operation::DisputeVerdict | Operation::PayoutDecision
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::OrderForceStatus => "order_force_status",
            Operation::DisputeVerdict => "dispute_verdict",
            Operation::PayoutDecision => "payout_decision",
            Operation::AppealDecision => "appeal_decision",
            Operation::AccountStatusChange => "account_status_change",
            Operation::StaffStatusChange => "staff_status_change",
            Operation::StaffInvite => "staff_invite",
            Operation::VerificationDecision => "verification_decision",
            Operation::SettingsChange => "settings_change",
            Operation::AuditExport => "audit_export",
        }
    }
}

/// Read-only check for the navigation layer in front of the pages. Uses the
/// execution table verbatim.
pub fn navigation_allowed(role: Role, operation: Operation) -> bool {
    operation.allowed_roles().contains(&role)
}

/// Resolve the credential, look up the staff record, check the role.
///
/// Fails closed: any resolver or store failure on this path is reported as
/// `Unauthenticated`, never as an allow.
pub fn authorize(
    db: &sled::Db,
    resolver: &dyn IdentityResolver,
    credential: &str,
    operation: Operation,
) -> Result<CallerContext, AdminError> {
    let identity = match resolver.resolve(credential) {
        Ok(Some(identity)) => identity,
        Ok(None) | Err(_) => return Err(AdminError::Unauthenticated),
    };

    let staff: StaffRecord = match store::read(db, keys::staff(&identity.id)) {
        Ok(Some(staff)) => staff,
        Ok(None) => return Err(AdminError::Forbidden("Admin access required".into())),
        Err(_) => return Err(AdminError::Unauthenticated),
    };

    if !staff.active {
        return Err(AdminError::Forbidden("Admin access required".into()));
    }

    if !operation.allowed_roles().contains(&staff.role) {
        warn!(
            staff = %staff.id,
            role = %staff.role,
            operation = operation.as_str(),
            "denied: role not permitted"
        );
        return Err(AdminError::Forbidden("Forbidden for current role".into()));
    }

    Ok(CallerContext {
        id: staff.id,
        email: staff.email,
        role: staff.role,
    })
}
