//! Service layer: the gated admin operations.
//!
//! Each operation follows the same shape: authorize against the capability
//! table, validate the payload, then run guard + mutation + audit append +
//! idempotency reservation inside one sled transaction. A request that fails
//! before commit leaves no trace; a request that commits is fully recorded.

use std::sync::Arc;

use tracing::{debug, info};

use crate::audit::{self, ActionType, AuditRecord};
use crate::engine::{self, Guard};
use crate::entity::{
    AccountStatus, AppSettings, Appeal, AppealStatus, Dispute, DisputeStatus, Order, OrderStatus,
    Payout, PayoutStatus, Profile, RefundStatus, TimeStamp, VerificationRequest,
    VerificationRequestStatus, VerificationStatus,
};
use crate::error::AdminError;
use crate::export::{self, AuditFilter};
use crate::gate::{self, Operation};
use crate::idempotency;
use crate::staff::{CallerContext, IdentityResolver, Role, StaffRecord};
use crate::store::{self, keys};

/// How a committed request concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// State was mutated and audited.
    Applied,
    /// Target already equals current state; nothing written.
    NoOp,
    /// A live idempotency reservation matched; nothing written.
    Replayed,
}

impl ActionOutcome {
    /// The `idempotent: true` marker of the wire response.
    pub fn idempotent(self) -> bool {
        !matches!(self, ActionOutcome::Applied)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ForceOrderStatus {
    pub order_id: String,
    pub new_status: String,
    pub reason_category: String,
    pub reason: String,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DisputeVerdict {
    pub dispute_id: String,
    pub order_id: String,
    pub verdict: String,
    pub reason_category: String,
    pub reason: String,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PayoutDecision {
    pub payout_id: String,
    pub action: String,
    pub reason_category: String,
    pub reason: String,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AppealDecision {
    pub appeal_id: String,
    pub user_id: String,
    pub decision: String,
    pub admin_notes: String,
}

#[derive(Debug, Clone, Default)]
pub struct AccountStatusChange {
    pub user_id: String,
    pub account_status: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct StaffStatusChange {
    pub staff_id: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StaffInvite {
    pub email: String,
    pub full_name: String,
    pub role: String,
}

#[derive(Debug, Clone, Default)]
pub struct VerificationDecision {
    pub request_id: String,
    pub profile_id: String,
    pub decision: String,
}

pub struct AdminService {
    db: Arc<sled::Db>,
    resolver: Arc<dyn IdentityResolver>,
}

fn require_token(value: Option<&str>) -> Result<String, AdminError> {
    match value.map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(AdminError::MissingIdempotencyKey),
    }
}

impl AdminService {
    pub fn new(db: Arc<sled::Db>, resolver: Arc<dyn IdentityResolver>) -> Self {
        Self { db, resolver }
    }

    fn authorize(&self, credential: &str, op: Operation) -> Result<CallerContext, AdminError> {
        gate::authorize(&self.db, self.resolver.as_ref(), credential, op)
    }

    /// Force an order into COMPLETED or CANCELLED.
    pub fn force_order_status(
        &self,
        credential: &str,
        payload: ForceOrderStatus,
    ) -> Result<ActionOutcome, AdminError> {
        let caller = self.authorize(credential, Operation::OrderForceStatus)?;

        let order_id = payload.order_id.trim().to_string();
        let new_status = payload.new_status.trim().to_string();
        let reason_category = payload.reason_category.trim().to_string();
        let reason = payload.reason.trim().to_string();

        if order_id.is_empty() || new_status.is_empty() || reason_category.is_empty() || reason.is_empty() {
            return Err(AdminError::BadInput(
                "orderId, newStatus, reasonCategory and reason are required".into(),
            ));
        }
        engine::require_reason(&reason)?;
        let token = require_token(payload.idempotency_key.as_deref())?;
        engine::require_category(&reason_category, engine::ORDER_REASON_CATEGORIES)?;

        let target = match new_status.as_str() {
            "COMPLETED" => OrderStatus::Completed,
            "CANCELLED" => OrderStatus::Cancelled,
            _ => {
                return Err(AdminError::BadInput(
                    "newStatus must be COMPLETED or CANCELLED".into(),
                ));
            }
        };

        let order_key = keys::order(&order_id);
        let outcome = store::commit(self.db.transaction(|tx| -> store::TxResult<ActionOutcome> {
            let now = TimeStamp::now();

            if idempotency::replay_tx(tx, ActionType::OrderIntervention, &order_id, &token, &now)? {
                return Ok(ActionOutcome::Replayed);
            }

            let bytes = match tx.get(order_key.as_bytes())? {
                Some(bytes) => bytes,
                None => return store::tx_abort(AdminError::NotFound("Order")),
            };
            let mut order: Order = store::tx_from_cbor(&bytes)?;

            let previous = order.status;
            match engine::check("Order", previous, target) {
                Ok(Guard::NoOp) => return Ok(ActionOutcome::NoOp),
                Ok(Guard::Proceed) => {}
                Err(err) => return store::tx_abort(err),
            }

            order.status = target;
            order.refund = if target == OrderStatus::Cancelled {
                RefundStatus::Full
            } else {
                RefundStatus::None
            };
            tx.insert(order_key.as_bytes(), store::tx_to_cbor(&order)?)?;

            let details = format!(
                "Forced status {previous} -> {target}. Category: {reason_category}. Reason: {reason}. idem:{token}"
            );
            audit::append_tx(
                tx,
                &caller,
                ActionType::OrderIntervention,
                Some(&order_id),
                details,
                now.clone(),
            )?;
            idempotency::reserve_tx(tx, ActionType::OrderIntervention, &order_id, &token, now)?;

            Ok(ActionOutcome::Applied)
        }))?;

        self.log_outcome("order force-status", &order_id, outcome);
        Ok(outcome)
    }

    /// Resolve an open dispute and settle its linked order.
    pub fn dispute_verdict(
        &self,
        credential: &str,
        payload: DisputeVerdict,
    ) -> Result<ActionOutcome, AdminError> {
        let caller = self.authorize(credential, Operation::DisputeVerdict)?;

        let dispute_id = payload.dispute_id.trim().to_string();
        let order_id = payload.order_id.trim().to_string();
        let verdict = payload.verdict.trim().to_string();
        let reason_category = payload.reason_category.trim().to_string();
        let reason = payload.reason.trim().to_string();

        if dispute_id.is_empty()
            || order_id.is_empty()
            || verdict.is_empty()
            || reason_category.is_empty()
            || reason.is_empty()
        {
            return Err(AdminError::BadInput(
                "disputeId, orderId, verdict, reasonCategory and reason are required".into(),
            ));
        }
        engine::require_reason(&reason)?;
        let token = require_token(payload.idempotency_key.as_deref())?;
        engine::require_category(&reason_category, engine::DISPUTE_REASON_CATEGORIES)?;

        let target = match verdict.as_str() {
            "refunded_buyer" => DisputeStatus::RefundedBuyer,
            "released_seller" => DisputeStatus::ReleasedSeller,
            _ => {
                return Err(AdminError::BadInput(
                    "verdict must be refunded_buyer or released_seller".into(),
                ));
            }
        };

        let dispute_key = keys::dispute(&dispute_id);
        let order_key = keys::order(&order_id);
        let outcome = store::commit(self.db.transaction(|tx| -> store::TxResult<ActionOutcome> {
            let now = TimeStamp::now();

            if idempotency::replay_tx(tx, ActionType::DisputeVerdict, &dispute_id, &token, &now)? {
                return Ok(ActionOutcome::Replayed);
            }

            let bytes = match tx.get(dispute_key.as_bytes())? {
                Some(bytes) => bytes,
                None => return store::tx_abort(AdminError::NotFound("Dispute")),
            };
            let mut dispute: Dispute = store::tx_from_cbor(&bytes)?;

            if dispute.order_id != order_id {
                return store::tx_abort(AdminError::BadInput(
                    "orderId does not match the dispute's linked order".into(),
                ));
            }

            let previous = dispute.status;
            match engine::check("Dispute", previous, target) {
                Ok(Guard::NoOp) => return Ok(ActionOutcome::NoOp),
                Ok(Guard::Proceed) => {}
                Err(err) => return store::tx_abort(err),
            }

            let order_bytes = match tx.get(order_key.as_bytes())? {
                Some(bytes) => bytes,
                None => return store::tx_abort(AdminError::NotFound("Order")),
            };
            let mut order: Order = store::tx_from_cbor(&order_bytes)?;

            let action_label = if target == DisputeStatus::RefundedBuyer {
                "Refund Buyer"
            } else {
                "Release to Seller"
            };
            dispute.status = target;
            dispute.admin_verdict = Some(format!("Resolved via Tribunal: {action_label}"));
            dispute.resolved_at = Some(now.clone());
            tx.insert(dispute_key.as_bytes(), store::tx_to_cbor(&dispute)?)?;

            // the verdict is the authority over the linked order's settlement
            let new_order_status = if target == DisputeStatus::RefundedBuyer {
                OrderStatus::Cancelled
            } else {
                OrderStatus::Completed
            };
            order.status = new_order_status;
            order.refund = if target == DisputeStatus::RefundedBuyer {
                RefundStatus::Full
            } else {
                RefundStatus::None
            };
            tx.insert(order_key.as_bytes(), store::tx_to_cbor(&order)?)?;

            let details = format!(
                "Verdict {previous} -> {target}. Order updated to {new_order_status}. Category: {reason_category}. Reason: {reason}. idem:{token}"
            );
            audit::append_tx(
                tx,
                &caller,
                ActionType::DisputeVerdict,
                Some(&dispute_id),
                details,
                now.clone(),
            )?;
            idempotency::reserve_tx(tx, ActionType::DisputeVerdict, &dispute_id, &token, now)?;

            Ok(ActionOutcome::Applied)
        }))?;

        self.log_outcome("dispute verdict", &dispute_id, outcome);
        Ok(outcome)
    }

    /// Approve (process) or reject a pending payout.
    pub fn payout_decision(
        &self,
        credential: &str,
        payload: PayoutDecision,
    ) -> Result<ActionOutcome, AdminError> {
        let caller = self.authorize(credential, Operation::PayoutDecision)?;

        let payout_id = payload.payout_id.trim().to_string();
        let action = payload.action.trim().to_string();
        let reason_category = payload.reason_category.trim().to_string();
        let reason = payload.reason.trim().to_string();

        if payout_id.is_empty() || action.is_empty() || reason_category.is_empty() || reason.is_empty() {
            return Err(AdminError::BadInput(
                "payoutId, action, reasonCategory and reason are required".into(),
            ));
        }
        engine::require_reason(&reason)?;
        let token = require_token(payload.idempotency_key.as_deref())?;
        engine::require_category(&reason_category, engine::PAYOUT_REASON_CATEGORIES)?;

        let (target, class) = match action.as_str() {
            "approve" => (PayoutStatus::Processed, ActionType::PayoutApprove),
            "reject" => (PayoutStatus::Rejected, ActionType::PayoutReject),
            _ => {
                return Err(AdminError::BadInput(
                    "action must be approve or reject".into(),
                ));
            }
        };

        let payout_key = keys::payout(&payout_id);
        let outcome = store::commit(self.db.transaction(|tx| -> store::TxResult<ActionOutcome> {
            let now = TimeStamp::now();

            if idempotency::replay_tx(tx, class, &payout_id, &token, &now)? {
                return Ok(ActionOutcome::Replayed);
            }

            let bytes = match tx.get(payout_key.as_bytes())? {
                Some(bytes) => bytes,
                None => return store::tx_abort(AdminError::NotFound("Payout")),
            };
            let mut payout: Payout = store::tx_from_cbor(&bytes)?;

            let previous = payout.status;
            match engine::check("Payout", previous, target) {
                Ok(Guard::NoOp) => return Ok(ActionOutcome::NoOp),
                Ok(Guard::Proceed) => {}
                Err(err) => return store::tx_abort(err),
            }

            payout.status = target;
            tx.insert(payout_key.as_bytes(), store::tx_to_cbor(&payout)?)?;

            let details = format!(
                "Payout status {previous} -> {target}. Category: {reason_category}. Reason: {reason}. idem:{token}"
            );
            audit::append_tx(tx, &caller, class, Some(&payout_id), details, now.clone())?;
            idempotency::reserve_tx(tx, class, &payout_id, &token, now)?;

            Ok(ActionOutcome::Applied)
        }))?;

        self.log_outcome("payout decision", &payout_id, outcome);
        Ok(outcome)
    }

    /// Decide a suspension appeal; approval reactivates the account.
    pub fn appeal_decision(
        &self,
        credential: &str,
        payload: AppealDecision,
    ) -> Result<ActionOutcome, AdminError> {
        let caller = self.authorize(credential, Operation::AppealDecision)?;

        let appeal_id = payload.appeal_id.trim().to_string();
        let user_id = payload.user_id.trim().to_string();
        let decision = payload.decision.trim().to_string();
        let admin_notes = payload.admin_notes.trim().to_string();

        if appeal_id.is_empty() || user_id.is_empty() || decision.is_empty() {
            return Err(AdminError::BadInput(
                "appealId, userId and decision are required".into(),
            ));
        }

        let target = match decision.as_str() {
            "approve" => AppealStatus::Approved,
            "reject" => AppealStatus::Rejected,
            _ => {
                return Err(AdminError::BadInput(
                    "decision must be approve or reject".into(),
                ));
            }
        };

        if target == AppealStatus::Rejected && admin_notes.len() < engine::MIN_REASON_LEN {
            return Err(AdminError::BadInput(
                "Rejection requires admin notes (min 10 characters)".into(),
            ));
        }

        let appeal_key = keys::appeal(&appeal_id);
        let profile_key = keys::profile(&user_id);
        let outcome = store::commit(self.db.transaction(|tx| -> store::TxResult<ActionOutcome> {
            let now = TimeStamp::now();

            let bytes = match tx.get(appeal_key.as_bytes())? {
                Some(bytes) => bytes,
                None => return store::tx_abort(AdminError::NotFound("Appeal")),
            };
            let mut appeal: Appeal = store::tx_from_cbor(&bytes)?;

            if appeal.user_id != user_id {
                return store::tx_abort(AdminError::NotFound("Appeal"));
            }

            match engine::check("Appeal", appeal.current_status(), target) {
                Ok(Guard::NoOp) => return Ok(ActionOutcome::NoOp),
                Ok(Guard::Proceed) => {}
                Err(err) => return store::tx_abort(err),
            }

            appeal.status = Some(target);
            appeal.admin_notes = if admin_notes.is_empty() {
                None
            } else {
                Some(admin_notes.clone())
            };
            appeal.updated_at = Some(now.clone());
            tx.insert(appeal_key.as_bytes(), store::tx_to_cbor(&appeal)?)?;

            if target == AppealStatus::Approved {
                let profile_bytes = match tx.get(profile_key.as_bytes())? {
                    Some(bytes) => bytes,
                    None => return store::tx_abort(AdminError::NotFound("Profile")),
                };
                let mut profile: Profile = store::tx_from_cbor(&profile_bytes)?;
                profile.account_status = AccountStatus::Active;
                tx.insert(profile_key.as_bytes(), store::tx_to_cbor(&profile)?)?;
            }

            let label = if target == AppealStatus::Approved {
                "Approved"
            } else {
                "Rejected"
            };
            let notes_part = if admin_notes.is_empty() {
                String::new()
            } else {
                format!(" Notes: {admin_notes}")
            };
            let details = format!("Appeal {label}. Appeal ID: {appeal_id}.{notes_part}");
            audit::append_tx(
                tx,
                &caller,
                ActionType::AppealDecision,
                Some(&user_id),
                details,
                now,
            )?;

            Ok(ActionOutcome::Applied)
        }))?;

        self.log_outcome("appeal decision", &appeal_id, outcome);
        Ok(outcome)
    }

    /// Suspend or reactivate a marketplace account.
    pub fn account_status_change(
        &self,
        credential: &str,
        payload: AccountStatusChange,
    ) -> Result<ActionOutcome, AdminError> {
        let caller = self.authorize(credential, Operation::AccountStatusChange)?;

        let user_id = payload.user_id.trim().to_string();
        let account_status = payload.account_status.trim().to_string();
        let reason = payload.reason.trim().to_string();

        if user_id.is_empty() || account_status.is_empty() || reason.is_empty() {
            return Err(AdminError::BadInput(
                "userId, accountStatus and reason are required".into(),
            ));
        }
        engine::require_reason(&reason)?;

        let target = match account_status.as_str() {
            "active" => AccountStatus::Active,
            "suspended" => AccountStatus::Suspended,
            _ => {
                return Err(AdminError::BadInput(
                    "accountStatus must be active or suspended".into(),
                ));
            }
        };

        let profile_key = keys::profile(&user_id);
        let outcome = store::commit(self.db.transaction(|tx| -> store::TxResult<ActionOutcome> {
            let now = TimeStamp::now();

            let bytes = match tx.get(profile_key.as_bytes())? {
                Some(bytes) => bytes,
                None => return store::tx_abort(AdminError::NotFound("Profile")),
            };
            let mut profile: Profile = store::tx_from_cbor(&bytes)?;

            match engine::check("Account", profile.account_status, target) {
                Ok(Guard::NoOp) => return Ok(ActionOutcome::NoOp),
                Ok(Guard::Proceed) => {}
                Err(err) => return store::tx_abort(err),
            }

            profile.account_status = target;
            tx.insert(profile_key.as_bytes(), store::tx_to_cbor(&profile)?)?;

            let details = format!("Changed account status to {target}. Reason: {reason}");
            audit::append_tx(
                tx,
                &caller,
                ActionType::UserStatusChange,
                Some(&user_id),
                details,
                now,
            )?;

            Ok(ActionOutcome::Applied)
        }))?;

        self.log_outcome("account status change", &user_id, outcome);
        Ok(outcome)
    }

    /// Flip a staff member's access. super_admin records are immutable here.
    pub fn staff_status_change(
        &self,
        credential: &str,
        payload: StaffStatusChange,
    ) -> Result<ActionOutcome, AdminError> {
        let caller = self.authorize(credential, Operation::StaffStatusChange)?;

        let staff_id = payload.staff_id.trim().to_string();
        if staff_id.is_empty() {
            return Err(AdminError::BadInput("staffId and isActive are required".into()));
        }
        let is_active = payload.is_active;

        let staff_key = keys::staff(&staff_id);
        let outcome = store::commit(self.db.transaction(|tx| -> store::TxResult<ActionOutcome> {
            let now = TimeStamp::now();

            let bytes = match tx.get(staff_key.as_bytes())? {
                Some(bytes) => bytes,
                None => return store::tx_abort(AdminError::NotFound("Staff member")),
            };
            let mut staff: StaffRecord = store::tx_from_cbor(&bytes)?;

            if staff.role == Role::SuperAdmin {
                return store::tx_abort(AdminError::Forbidden(
                    "Cannot modify super_admin access state".into(),
                ));
            }

            if staff.active == is_active {
                return Ok(ActionOutcome::NoOp);
            }

            staff.active = is_active;
            tx.insert(staff_key.as_bytes(), store::tx_to_cbor(&staff)?)?;

            let (action, verb) = if is_active {
                (ActionType::StaffActivated, "Activated")
            } else {
                (ActionType::StaffSuspended, "Suspended")
            };
            let details = format!("{verb} access for staff: {}", staff.email);
            audit::append_tx(tx, &caller, action, Some(&staff_id), details, now)?;

            Ok(ActionOutcome::Applied)
        }))?;

        self.log_outcome("staff status change", &staff_id, outcome);
        Ok(outcome)
    }

    /// Grant an existing platform user a staff role.
    pub fn staff_invite(
        &self,
        credential: &str,
        payload: StaffInvite,
    ) -> Result<ActionOutcome, AdminError> {
        let caller = self.authorize(credential, Operation::StaffInvite)?;

        let email = payload.email.trim().to_lowercase();
        let full_name = payload.full_name.trim().to_string();
        let role_name = payload.role.trim().to_string();

        if email.is_empty() || full_name.is_empty() || role_name.is_empty() {
            return Err(AdminError::BadInput(
                "email, fullName and role are required".into(),
            ));
        }

        const INVITABLE: [Role; 4] = [Role::Moderator, Role::Finance, Role::Support, Role::Content];
        let role = match Role::parse(&role_name) {
            Some(role) if INVITABLE.contains(&role) => role,
            _ => return Err(AdminError::BadInput("Invalid role for staff invite".into())),
        };

        // the invitee must already exist in the identity system
        let user_id = match self.resolver.user_id_by_email(&email) {
            Ok(Some(id)) => id,
            Ok(None) => return Err(AdminError::NotFound("User")),
            Err(err) => return Err(err),
        };

        let staff_key = keys::staff(&user_id);
        let outcome = store::commit(self.db.transaction(|tx| -> store::TxResult<ActionOutcome> {
            let now = TimeStamp::now();

            if tx.get(staff_key.as_bytes())?.is_some() {
                return store::tx_abort(AdminError::Conflict(
                    "Staff record already exists for this user".into(),
                ));
            }

            let staff = StaffRecord {
                id: user_id.clone(),
                email: email.clone(),
                full_name: full_name.clone(),
                role,
                active: true,
            };
            tx.insert(staff_key.as_bytes(), store::tx_to_cbor(&staff)?)?;

            let details = format!("Granted {role} admin role to {email}.");
            audit::append_tx(
                tx,
                &caller,
                ActionType::StaffInvite,
                Some(&user_id),
                details,
                now,
            )?;

            Ok(ActionOutcome::Applied)
        }))?;

        self.log_outcome("staff invite", &email, outcome);
        Ok(outcome)
    }

    /// Decide a merchant verification request, mirroring the profile flags.
    pub fn verification_decision(
        &self,
        credential: &str,
        payload: VerificationDecision,
    ) -> Result<ActionOutcome, AdminError> {
        let caller = self.authorize(credential, Operation::VerificationDecision)?;

        let request_id = payload.request_id.trim().to_string();
        let profile_id = payload.profile_id.trim().to_string();
        let decision = payload.decision.trim().to_string();

        if request_id.is_empty() || profile_id.is_empty() || decision.is_empty() {
            return Err(AdminError::BadInput(
                "requestId, profileId and decision are required".into(),
            ));
        }

        let target = match decision.as_str() {
            "verified" => VerificationRequestStatus::Approved,
            "rejected" => VerificationRequestStatus::Rejected,
            _ => {
                return Err(AdminError::BadInput(
                    "decision must be verified or rejected".into(),
                ));
            }
        };

        let request_key = keys::verification(&request_id);
        let profile_key = keys::profile(&profile_id);
        let outcome = store::commit(self.db.transaction(|tx| -> store::TxResult<ActionOutcome> {
            let now = TimeStamp::now();

            let bytes = match tx.get(request_key.as_bytes())? {
                Some(bytes) => bytes,
                None => return store::tx_abort(AdminError::NotFound("Verification request")),
            };
            let mut request: VerificationRequest = store::tx_from_cbor(&bytes)?;

            if request.profile_id != profile_id {
                return store::tx_abort(AdminError::NotFound("Verification request"));
            }

            match engine::check("Verification request", request.status, target) {
                Ok(Guard::NoOp) => return Ok(ActionOutcome::NoOp),
                Ok(Guard::Proceed) => {}
                Err(err) => return store::tx_abort(err),
            }

            request.status = target;
            tx.insert(request_key.as_bytes(), store::tx_to_cbor(&request)?)?;

            // keep the profile's verification flags in sync with the request
            let profile_bytes = match tx.get(profile_key.as_bytes())? {
                Some(bytes) => bytes,
                None => return store::tx_abort(AdminError::NotFound("Profile")),
            };
            let mut profile: Profile = store::tx_from_cbor(&profile_bytes)?;
            if target == VerificationRequestStatus::Approved {
                profile.is_verified = true;
                profile.verification_status = VerificationStatus::Verified;
            } else {
                profile.verification_status = VerificationStatus::Rejected;
            }
            tx.insert(profile_key.as_bytes(), store::tx_to_cbor(&profile)?)?;

            let label = if target == VerificationRequestStatus::Approved {
                "Approved"
            } else {
                "Rejected"
            };
            let details = format!("Merchant {label}. Request ID: {request_id}");
            audit::append_tx(
                tx,
                &caller,
                ActionType::KycVerification,
                Some(&profile_id),
                details,
                now,
            )?;

            Ok(ActionOutcome::Applied)
        }))?;

        self.log_outcome("verification decision", &request_id, outcome);
        Ok(outcome)
    }

    /// Replace the platform settings singleton.
    pub fn update_settings(
        &self,
        credential: &str,
        settings: AppSettings,
    ) -> Result<ActionOutcome, AdminError> {
        let caller = self.authorize(credential, Operation::SettingsChange)?;

        if settings.min_version_ios.trim().is_empty()
            || settings.min_version_android.trim().is_empty()
            || settings.support_phone.trim().is_empty()
        {
            return Err(AdminError::BadInput("Invalid settings payload".into()));
        }

        let outcome = store::commit(self.db.transaction(|tx| -> store::TxResult<ActionOutcome> {
            let now = TimeStamp::now();

            tx.insert(keys::SETTINGS.as_bytes(), store::tx_to_cbor(&settings)?)?;

            let details = format!("Updated config. Maintenance: {}", settings.maintenance_mode);
            audit::append_tx(tx, &caller, ActionType::SystemConfigChange, None, details, now)?;

            Ok(ActionOutcome::Applied)
        }))?;

        self.log_outcome("settings change", "settings", outcome);
        Ok(outcome)
    }

    /// Query the audit trail and render it as CSV for compliance download.
    pub fn export_audit_csv(
        &self,
        credential: &str,
        filter: &AuditFilter,
    ) -> Result<String, AdminError> {
        self.authorize(credential, Operation::AuditExport)?;

        let records = export::query(&self.db, filter)?;
        Ok(export::to_csv(&records))
    }

    pub fn audit_records(&self) -> Result<Vec<AuditRecord>, AdminError> {
        audit::read_all(&self.db)
    }

    pub fn audit_count(&self) -> Result<u64, AdminError> {
        audit::count(&self.db)
    }

    pub fn verify_audit_chain(&self) -> Result<u64, AdminError> {
        audit::verify_chain(&self.db)
    }

    /// Drop idempotency reservations past the retention window.
    pub fn prune_idempotency(&self) -> Result<u64, AdminError> {
        idempotency::prune(&self.db, &TimeStamp::now())
    }

    fn log_outcome(&self, operation: &str, target: &str, outcome: ActionOutcome) {
        match outcome {
            ActionOutcome::Applied => info!(target_id = target, "{operation} applied"),
            ActionOutcome::NoOp => debug!(target_id = target, "{operation} no-op"),
            ActionOutcome::Replayed => debug!(target_id = target, "{operation} replayed"),
        }
    }

    // Reads for pages, the edge router and tests.

    pub fn get_order(&self, id: &str) -> Result<Option<Order>, AdminError> {
        store::read(&self.db, keys::order(id))
    }

    pub fn get_dispute(&self, id: &str) -> Result<Option<Dispute>, AdminError> {
        store::read(&self.db, keys::dispute(id))
    }

    pub fn get_payout(&self, id: &str) -> Result<Option<Payout>, AdminError> {
        store::read(&self.db, keys::payout(id))
    }

    pub fn get_appeal(&self, id: &str) -> Result<Option<Appeal>, AdminError> {
        store::read(&self.db, keys::appeal(id))
    }

    pub fn get_profile(&self, id: &str) -> Result<Option<Profile>, AdminError> {
        store::read(&self.db, keys::profile(id))
    }

    pub fn get_staff(&self, id: &str) -> Result<Option<StaffRecord>, AdminError> {
        store::read(&self.db, keys::staff(id))
    }

    pub fn get_verification_request(
        &self,
        id: &str,
    ) -> Result<Option<VerificationRequest>, AdminError> {
        store::read(&self.db, keys::verification(id))
    }

    pub fn get_settings(&self) -> Result<Option<AppSettings>, AdminError> {
        store::read(&self.db, keys::SETTINGS)
    }

    // Store seams for flows this crate does not own (marketplace order
    // creation, staff provisioning). Also what the tests seed through.

    pub fn insert_staff(&self, staff: &StaffRecord) -> Result<(), AdminError> {
        store::write(&self.db, keys::staff(&staff.id), staff)
    }

    pub fn insert_order(&self, order: &Order) -> Result<(), AdminError> {
        store::write(&self.db, keys::order(&order.id), order)
    }

    pub fn insert_dispute(&self, dispute: &Dispute) -> Result<(), AdminError> {
        store::write(&self.db, keys::dispute(&dispute.id), dispute)
    }

    pub fn insert_payout(&self, payout: &Payout) -> Result<(), AdminError> {
        store::write(&self.db, keys::payout(&payout.id), payout)
    }

    pub fn insert_appeal(&self, appeal: &Appeal) -> Result<(), AdminError> {
        store::write(&self.db, keys::appeal(&appeal.id), appeal)
    }

    pub fn insert_profile(&self, profile: &Profile) -> Result<(), AdminError> {
        store::write(&self.db, keys::profile(&profile.id), profile)
    }

    pub fn insert_verification_request(
        &self,
        request: &VerificationRequest,
    ) -> Result<(), AdminError> {
        store::write(&self.db, keys::verification(&request.id), request)
    }
}
