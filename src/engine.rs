//! The generalized transition guard.
//!
//! Every family runs the same check order: terminal lock first, then the
//! no-op shortcut, then the allowed-source table. Per-family input rules
//! (reason floor, category sets) live here too, so the invariants are
//! enforced in one place instead of per handler by convention.

use crate::entity::{
    AccountStatus, AppealStatus, DisputeStatus, OrderStatus, PayoutStatus,
    VerificationRequestStatus,
};
use crate::error::AdminError;

/// A finite admin-transitionable state set.
pub trait TransitionState: Copy + Eq + std::fmt::Display {
    fn is_terminal(self) -> bool;
    /// States a transition to `target` may start from. Empty for states that
    /// are never a legal admin target.
    fn allowed_sources(target: Self) -> &'static [Self];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Target equals current state: succeed without mutating or auditing.
    NoOp,
    Proceed,
}

/// Shared steps 2-4 of every transition: terminal lock, no-op, source table.
pub fn check<S: TransitionState + 'static>(entity: &str, current: S, target: S) -> Result<Guard, AdminError> {
    if current.is_terminal() {
        return Err(AdminError::Conflict(format!(
            "{entity} is terminal ({current}) and cannot transition to {target}"
        )));
    }
    if current == target {
        return Ok(Guard::NoOp);
    }
    if !S::allowed_sources(target).contains(&current) {
        return Err(AdminError::Conflict(format!(
            "{entity} status {current} cannot transition to {target}"
        )));
    }
    Ok(Guard::Proceed)
}

pub const MIN_REASON_LEN: usize = 10;

pub fn require_reason(reason: &str) -> Result<(), AdminError> {
    if reason.len() < MIN_REASON_LEN {
        return Err(AdminError::BadInput(
            "Reason must be at least 10 characters".into(),
        ));
    }
    Ok(())
}

pub fn require_category(category: &str, allowed: &'static [&'static str]) -> Result<(), AdminError> {
    if !allowed.contains(&category) {
        return Err(AdminError::BadInput("Invalid reason category".into()));
    }
    Ok(())
}

pub const ORDER_REASON_CATEGORIES: &[&str] = &[
    "fraud",
    "payment_issue",
    "customer_request",
    "fulfillment_issue",
    "compliance",
    "other",
];

pub const DISPUTE_REASON_CATEGORIES: &[&str] = &[
    "item_not_received",
    "item_not_as_described",
    "chargeback_risk",
    "policy_violation",
    "manual_exception",
    "other",
];

pub const PAYOUT_REASON_CATEGORIES: &[&str] = &[
    "kyc_issue",
    "bank_mismatch",
    "fraud_risk",
    "reserve_policy",
    "manual_approval",
    "other",
];

const MANUALLY_SETTLEABLE: &[OrderStatus] = &[
    OrderStatus::Pending,
    OrderStatus::AwaitingPayment,
    OrderStatus::Paid,
    OrderStatus::Shipped,
    OrderStatus::DisputeOpen,
];

impl TransitionState for OrderStatus {
    fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    fn allowed_sources(target: Self) -> &'static [Self] {
        match target {
            OrderStatus::Completed | OrderStatus::Cancelled => MANUALLY_SETTLEABLE,
            _ => &[],
        }
    }
}

impl TransitionState for DisputeStatus {
    fn is_terminal(self) -> bool {
        matches!(
            self,
            DisputeStatus::RefundedBuyer | DisputeStatus::ReleasedSeller
        )
    }

    fn allowed_sources(target: Self) -> &'static [Self] {
        match target {
            DisputeStatus::RefundedBuyer | DisputeStatus::ReleasedSeller => &[DisputeStatus::Open],
            DisputeStatus::Open => &[],
        }
    }
}

impl TransitionState for PayoutStatus {
    fn is_terminal(self) -> bool {
        matches!(self, PayoutStatus::Processed | PayoutStatus::Rejected)
    }

    fn allowed_sources(target: Self) -> &'static [Self] {
        match target {
            PayoutStatus::Processed | PayoutStatus::Rejected => &[PayoutStatus::Pending],
            PayoutStatus::Pending => &[],
        }
    }
}

impl TransitionState for AppealStatus {
    fn is_terminal(self) -> bool {
        matches!(self, AppealStatus::Approved | AppealStatus::Rejected)
    }

    fn allowed_sources(target: Self) -> &'static [Self] {
        match target {
            AppealStatus::Approved | AppealStatus::Rejected => &[AppealStatus::Pending],
            AppealStatus::Pending => &[],
        }
    }
}

impl TransitionState for AccountStatus {
    fn is_terminal(self) -> bool {
        false
    }

    fn allowed_sources(target: Self) -> &'static [Self] {
        match target {
            AccountStatus::Active => &[
                AccountStatus::Suspended,
                AccountStatus::Banned,
                AccountStatus::PendingAppeal,
            ],
            AccountStatus::Suspended => &[
                AccountStatus::Active,
                AccountStatus::Banned,
                AccountStatus::PendingAppeal,
            ],
            // banned / pending_appeal are set by out-of-scope flows, never an admin target
            _ => &[],
        }
    }
}

impl TransitionState for VerificationRequestStatus {
    fn is_terminal(self) -> bool {
        matches!(
            self,
            VerificationRequestStatus::Approved | VerificationRequestStatus::Rejected
        )
    }

    fn allowed_sources(target: Self) -> &'static [Self] {
        match target {
            VerificationRequestStatus::Approved | VerificationRequestStatus::Rejected => {
                &[VerificationRequestStatus::Pending]
            }
            VerificationRequestStatus::Pending => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_order_rejects_everything() {
        for current in [OrderStatus::Completed, OrderStatus::Cancelled] {
            for target in [OrderStatus::Completed, OrderStatus::Cancelled] {
                let result = check("Order", current, target);
                assert!(
                    matches!(result, Err(AdminError::Conflict(_))),
                    "{current} -> {target} should conflict"
                );
            }
        }
    }

    #[test]
    fn noop_is_shortcut_only_for_live_states() {
        assert_eq!(
            check("Payout", PayoutStatus::Pending, PayoutStatus::Pending).unwrap(),
            Guard::NoOp
        );
        assert!(check("Payout", PayoutStatus::Processed, PayoutStatus::Processed).is_err());
    }

    #[test]
    fn dispute_verdicts_only_from_open() {
        assert_eq!(
            check("Dispute", DisputeStatus::Open, DisputeStatus::ReleasedSeller).unwrap(),
            Guard::Proceed
        );
    }

    #[test]
    fn reason_floor_counts_characters() {
        assert!(require_reason("too short").is_err());
        assert!(require_reason("confirmed stolen card").is_ok());
    }

    #[test]
    fn unknown_category_is_rejected_not_coerced() {
        assert!(require_category("fraud", ORDER_REASON_CATEGORIES).is_ok());
        assert!(require_category("Fraud", ORDER_REASON_CATEGORIES).is_err());
        assert!(require_category("", DISPUTE_REASON_CATEGORIES).is_err());
    }
}
