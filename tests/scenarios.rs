use std::sync::Arc;

use admin_actions::audit::ActionType;
use admin_actions::entity::{
    AccountStatus, AppSettings, Appeal, Dispute, DisputeStatus, Order, OrderStatus, Payout,
    PayoutStatus, Profile, RefundStatus, VerificationRequest, VerificationRequestStatus,
    VerificationStatus,
};
use admin_actions::error::AdminError;
use admin_actions::export::AuditFilter;
use admin_actions::service::{
    AccountStatusChange, ActionOutcome, AdminService, AppealDecision, DisputeVerdict,
    ForceOrderStatus, PayoutDecision, StaffInvite, StaffStatusChange, VerificationDecision,
};
use admin_actions::staff::{Identity, MemoryResolver, Role, StaffRecord};

use tempfile::tempdir; // Use for test db cleanup.

// Sled uses file-based locking to prevent concurrent access, so each test
// opens its own database on temp storage.
fn open_service(
    dir: &tempfile::TempDir,
    name: &str,
) -> anyhow::Result<(AdminService, Arc<sled::Db>)> {
    let db = sled::open(dir.path().join(name))?;
    let db = Arc::new(db);
    db.clear()?;

    let resolver = Arc::new(MemoryResolver::new());
    let service = AdminService::new(db.clone(), resolver.clone());

    for (credential, id, role) in [
        ("sess-super", "staff_super", Role::SuperAdmin),
        ("sess-moderator", "staff_moderator", Role::Moderator),
        ("sess-finance", "staff_finance", Role::Finance),
        ("sess-support", "staff_support", Role::Support),
        ("sess-content", "staff_content", Role::Content),
        ("sess-analyst", "staff_analyst", Role::Analyst),
    ] {
        let email = format!("{id}@example.com");
        service.insert_staff(&StaffRecord {
            id: id.to_string(),
            email: email.clone(),
            full_name: id.to_string(),
            role,
            active: true,
        })?;
        resolver.add_session(
            credential,
            Identity {
                id: id.to_string(),
                email,
            },
        );
    }

    Ok((service, db))
}

fn paid_order(id: &str) -> Order {
    Order {
        id: id.to_string(),
        status: OrderStatus::Paid,
        refund: RefundStatus::None,
    }
}

#[test]
fn scenario_a_force_cancel_paid_order() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (service, _db) = open_service(&temp_dir, "scenario_a.db")?;

    service.insert_order(&paid_order("O1"))?;

    let outcome = service.force_order_status(
        "sess-finance",
        ForceOrderStatus {
            order_id: "O1".into(),
            new_status: "CANCELLED".into(),
            reason_category: "fraud".into(),
            reason: "confirmed stolen card".into(),
            idempotency_key: Some("tok-a-1".into()),
        },
    )?;

    assert_eq!(outcome, ActionOutcome::Applied);
    assert!(!outcome.idempotent());

    let order = service.get_order("O1")?.unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.refund, RefundStatus::Full);

    let records = service.audit_records()?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, ActionType::OrderIntervention);
    assert_eq!(records[0].target_id.as_deref(), Some("O1"));
    assert!(records[0].details.contains("PAID -> CANCELLED"));
    assert!(records[0].details.contains("idem:tok-a-1"));

    Ok(())
}

#[test]
fn scenario_b_replay_with_same_token() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (service, _db) = open_service(&temp_dir, "scenario_b.db")?;

    service.insert_order(&paid_order("O1"))?;

    let payload = ForceOrderStatus {
        order_id: "O1".into(),
        new_status: "CANCELLED".into(),
        reason_category: "fraud".into(),
        reason: "confirmed stolen card".into(),
        idempotency_key: Some("tok-b-1".into()),
    };

    let first = service.force_order_status("sess-finance", payload.clone())?;
    assert_eq!(first, ActionOutcome::Applied);

    let second = service.force_order_status("sess-finance", payload)?;
    assert_eq!(second, ActionOutcome::Replayed);
    assert!(second.idempotent());

    // one state mutation, one audit record
    assert_eq!(service.audit_count()?, 1);
    let order = service.get_order("O1")?.unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);

    Ok(())
}

#[test]
fn scenario_c_verdict_settles_linked_order() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (service, _db) = open_service(&temp_dir, "scenario_c.db")?;

    service.insert_order(&Order {
        id: "O2".into(),
        status: OrderStatus::DisputeOpen,
        refund: RefundStatus::None,
    })?;
    service.insert_dispute(&Dispute {
        id: "D1".into(),
        order_id: "O2".into(),
        status: DisputeStatus::Open,
        admin_verdict: None,
        resolved_at: None,
    })?;

    let outcome = service.dispute_verdict(
        "sess-finance",
        DisputeVerdict {
            dispute_id: "D1".into(),
            order_id: "O2".into(),
            verdict: "released_seller".into(),
            reason_category: "other".into(),
            reason: "seller provided proof".into(),
            idempotency_key: Some("tok-c-1".into()),
        },
    )?;
    assert_eq!(outcome, ActionOutcome::Applied);

    let dispute = service.get_dispute("D1")?.unwrap();
    assert_eq!(dispute.status, DisputeStatus::ReleasedSeller);
    assert_eq!(
        dispute.admin_verdict.as_deref(),
        Some("Resolved via Tribunal: Release to Seller")
    );
    assert!(dispute.resolved_at.is_some());

    let order = service.get_order("O2")?.unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(order.refund, RefundStatus::None);

    Ok(())
}

#[test]
fn refund_buyer_cancels_linked_order() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (service, _db) = open_service(&temp_dir, "refund_buyer.db")?;

    service.insert_order(&Order {
        id: "O2b".into(),
        status: OrderStatus::DisputeOpen,
        refund: RefundStatus::None,
    })?;
    service.insert_dispute(&Dispute {
        id: "D2".into(),
        order_id: "O2b".into(),
        status: DisputeStatus::Open,
        admin_verdict: None,
        resolved_at: None,
    })?;

    service.dispute_verdict(
        "sess-super",
        DisputeVerdict {
            dispute_id: "D2".into(),
            order_id: "O2b".into(),
            verdict: "refunded_buyer".into(),
            reason_category: "item_not_received".into(),
            reason: "carrier lost the parcel".into(),
            idempotency_key: Some("tok-c-2".into()),
        },
    )?;

    let order = service.get_order("O2b")?.unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.refund, RefundStatus::Full);

    Ok(())
}

#[test]
fn scenario_d_support_cannot_change_staff_status() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (service, _db) = open_service(&temp_dir, "scenario_d.db")?;

    let err = service
        .staff_status_change(
            "sess-support",
            StaffStatusChange {
                staff_id: "staff_moderator".into(),
                is_active: false,
            },
        )
        .unwrap_err();

    assert!(matches!(err, AdminError::Forbidden(_)));
    assert_eq!(err.status(), 403);

    // target untouched, nothing audited
    assert!(service.get_staff("staff_moderator")?.unwrap().active);
    assert_eq!(service.audit_count()?, 0);

    Ok(())
}

#[test]
fn scenario_e_terminal_order_conflicts() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (service, _db) = open_service(&temp_dir, "scenario_e.db")?;

    service.insert_order(&Order {
        id: "O3".into(),
        status: OrderStatus::Completed,
        refund: RefundStatus::None,
    })?;

    for target in ["CANCELLED", "COMPLETED"] {
        let err = service
            .force_order_status(
                "sess-super",
                ForceOrderStatus {
                    order_id: "O3".into(),
                    new_status: target.into(),
                    reason_category: "compliance".into(),
                    reason: "manual settlement attempt".into(),
                    idempotency_key: Some(format!("tok-e-{target}")),
                },
            )
            .unwrap_err();

        assert!(matches!(err, AdminError::Conflict(_)), "{target}");
        assert_eq!(err.status(), 409);
        assert!(err.to_string().contains("COMPLETED"));
    }

    let order = service.get_order("O3")?.unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(service.audit_count()?, 0);

    Ok(())
}

#[test]
fn missing_idempotency_key_is_rejected() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (service, _db) = open_service(&temp_dir, "missing_token.db")?;

    service.insert_order(&paid_order("O4"))?;

    let err = service
        .force_order_status(
            "sess-finance",
            ForceOrderStatus {
                order_id: "O4".into(),
                new_status: "COMPLETED".into(),
                reason_category: "customer_request".into(),
                reason: "buyer confirmed receipt".into(),
                idempotency_key: None,
            },
        )
        .unwrap_err();

    assert!(matches!(err, AdminError::MissingIdempotencyKey));
    assert_eq!(err.status(), 400);
    assert_eq!(service.get_order("O4")?.unwrap().status, OrderStatus::Paid);

    Ok(())
}

#[test]
fn short_reason_and_unknown_category_are_bad_input() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (service, _db) = open_service(&temp_dir, "bad_input.db")?;

    service.insert_order(&paid_order("O5"))?;

    let err = service
        .force_order_status(
            "sess-finance",
            ForceOrderStatus {
                order_id: "O5".into(),
                new_status: "CANCELLED".into(),
                reason_category: "fraud".into(),
                reason: "too short".into(),
                idempotency_key: Some("tok-f-1".into()),
            },
        )
        .unwrap_err();
    assert!(matches!(err, AdminError::BadInput(_)));

    let err = service
        .force_order_status(
            "sess-finance",
            ForceOrderStatus {
                order_id: "O5".into(),
                new_status: "CANCELLED".into(),
                reason_category: "suspicious".into(),
                reason: "flagged by payments review".into(),
                idempotency_key: Some("tok-f-2".into()),
            },
        )
        .unwrap_err();
    assert!(matches!(err, AdminError::BadInput(_)));
    assert_eq!(err.to_string(), "Invalid reason category");

    assert_eq!(service.audit_count()?, 0);

    Ok(())
}

#[test]
fn payout_decisions_finalize_once() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (service, _db) = open_service(&temp_dir, "payouts.db")?;

    service.insert_payout(&Payout {
        id: "P1".into(),
        status: PayoutStatus::Pending,
    })?;

    let outcome = service.payout_decision(
        "sess-finance",
        PayoutDecision {
            payout_id: "P1".into(),
            action: "approve".into(),
            reason_category: "manual_approval".into(),
            reason: "documents verified".into(),
            idempotency_key: Some("tok-p-1".into()),
        },
    )?;
    assert_eq!(outcome, ActionOutcome::Applied);
    assert_eq!(
        service.get_payout("P1")?.unwrap().status,
        PayoutStatus::Processed
    );

    // a later reject with a fresh token hits the terminal lock
    let err = service
        .payout_decision(
            "sess-finance",
            PayoutDecision {
                payout_id: "P1".into(),
                action: "reject".into(),
                reason_category: "fraud_risk".into(),
                reason: "second thoughts after approval".into(),
                idempotency_key: Some("tok-p-2".into()),
            },
        )
        .unwrap_err();
    assert!(matches!(err, AdminError::Conflict(_)));

    // the original approval token still replays cleanly
    let replay = service.payout_decision(
        "sess-finance",
        PayoutDecision {
            payout_id: "P1".into(),
            action: "approve".into(),
            reason_category: "manual_approval".into(),
            reason: "documents verified".into(),
            idempotency_key: Some("tok-p-1".into()),
        },
    )?;
    assert_eq!(replay, ActionOutcome::Replayed);
    assert_eq!(service.audit_count()?, 1);

    Ok(())
}

#[test]
fn appeal_approval_reactivates_account() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (service, _db) = open_service(&temp_dir, "appeals.db")?;

    service.insert_profile(&Profile {
        id: "U1".into(),
        account_status: AccountStatus::Suspended,
        is_verified: false,
        verification_status: VerificationStatus::Pending,
    })?;
    service.insert_appeal(&Appeal {
        id: "A1".into(),
        user_id: "U1".into(),
        status: None,
        admin_notes: None,
        updated_at: None,
    })?;

    let outcome = service.appeal_decision(
        "sess-moderator",
        AppealDecision {
            appeal_id: "A1".into(),
            user_id: "U1".into(),
            decision: "approve".into(),
            admin_notes: String::new(),
        },
    )?;
    assert_eq!(outcome, ActionOutcome::Applied);

    let profile = service.get_profile("U1")?.unwrap();
    assert_eq!(profile.account_status, AccountStatus::Active);

    // the appeal is now finalized
    let err = service
        .appeal_decision(
            "sess-moderator",
            AppealDecision {
                appeal_id: "A1".into(),
                user_id: "U1".into(),
                decision: "reject".into(),
                admin_notes: "changed our minds entirely".into(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, AdminError::Conflict(_)));

    Ok(())
}

#[test]
fn appeal_rejection_requires_notes() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (service, _db) = open_service(&temp_dir, "appeal_notes.db")?;

    service.insert_appeal(&Appeal {
        id: "A2".into(),
        user_id: "U2".into(),
        status: None,
        admin_notes: None,
        updated_at: None,
    })?;

    let err = service
        .appeal_decision(
            "sess-moderator",
            AppealDecision {
                appeal_id: "A2".into(),
                user_id: "U2".into(),
                decision: "reject".into(),
                admin_notes: "no".into(),
            },
        )
        .unwrap_err();

    assert!(matches!(err, AdminError::BadInput(_)));
    assert_eq!(
        err.to_string(),
        "Rejection requires admin notes (min 10 characters)"
    );

    Ok(())
}

#[test]
fn account_status_noop_reports_idempotent() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (service, _db) = open_service(&temp_dir, "account_noop.db")?;

    service.insert_profile(&Profile {
        id: "U3".into(),
        account_status: AccountStatus::Active,
        is_verified: false,
        verification_status: VerificationStatus::Pending,
    })?;

    let outcome = service.account_status_change(
        "sess-moderator",
        AccountStatusChange {
            user_id: "U3".into(),
            account_status: "active".into(),
            reason: "duplicate click from the console".into(),
        },
    )?;

    assert_eq!(outcome, ActionOutcome::NoOp);
    assert!(outcome.idempotent());
    assert_eq!(service.audit_count()?, 0);

    let outcome = service.account_status_change(
        "sess-moderator",
        AccountStatusChange {
            user_id: "U3".into(),
            account_status: "suspended".into(),
            reason: "repeated listing violations".into(),
        },
    )?;
    assert_eq!(outcome, ActionOutcome::Applied);
    assert_eq!(
        service.get_profile("U3")?.unwrap().account_status,
        AccountStatus::Suspended
    );

    Ok(())
}

#[test]
fn staff_lifecycle_suspend_blocks_then_reactivate() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (service, _db) = open_service(&temp_dir, "staff_lifecycle.db")?;

    service.insert_order(&paid_order("O6"))?;

    let outcome = service.staff_status_change(
        "sess-super",
        StaffStatusChange {
            staff_id: "staff_finance".into(),
            is_active: false,
        },
    )?;
    assert_eq!(outcome, ActionOutcome::Applied);

    // a suspended caller fails the gate on every operation
    let err = service
        .force_order_status(
            "sess-finance",
            ForceOrderStatus {
                order_id: "O6".into(),
                new_status: "COMPLETED".into(),
                reason_category: "customer_request".into(),
                reason: "buyer confirmed receipt".into(),
                idempotency_key: Some("tok-s-1".into()),
            },
        )
        .unwrap_err();
    assert!(matches!(err, AdminError::Forbidden(_)));

    // re-activation by a super_admin restores access
    service.staff_status_change(
        "sess-super",
        StaffStatusChange {
            staff_id: "staff_finance".into(),
            is_active: true,
        },
    )?;
    let outcome = service.force_order_status(
        "sess-finance",
        ForceOrderStatus {
            order_id: "O6".into(),
            new_status: "COMPLETED".into(),
            reason_category: "customer_request".into(),
            reason: "buyer confirmed receipt".into(),
            idempotency_key: Some("tok-s-1".into()),
        },
    )?;
    assert_eq!(outcome, ActionOutcome::Applied);

    let records = service.audit_records()?;
    let actions: Vec<_> = records.iter().map(|r| r.action).collect();
    assert_eq!(
        actions,
        vec![
            ActionType::StaffSuspended,
            ActionType::StaffActivated,
            ActionType::OrderIntervention
        ]
    );

    Ok(())
}

#[test]
fn staff_invite_grants_role_once() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = sled::open(temp_dir.path().join("invite.db"))?;
    let db = Arc::new(db);
    db.clear()?;

    let resolver = Arc::new(MemoryResolver::new());
    let service = AdminService::new(db, resolver.clone());

    service.insert_staff(&StaffRecord {
        id: "staff_super".into(),
        email: "root@example.com".into(),
        full_name: "Root".into(),
        role: Role::SuperAdmin,
        active: true,
    })?;
    resolver.add_session(
        "sess-super",
        Identity {
            id: "staff_super".into(),
            email: "root@example.com".into(),
        },
    );
    resolver.add_user("new.mod@example.com", "user_777");

    let outcome = service.staff_invite(
        "sess-super",
        StaffInvite {
            email: "New.Mod@example.com".into(),
            full_name: "New Moderator".into(),
            role: "moderator".into(),
        },
    )?;
    assert_eq!(outcome, ActionOutcome::Applied);

    let staff = service.get_staff("user_777")?.unwrap();
    assert_eq!(staff.role, Role::Moderator);
    assert_eq!(staff.email, "new.mod@example.com");
    assert!(staff.active);

    // inviting again conflicts
    let err = service
        .staff_invite(
            "sess-super",
            StaffInvite {
                email: "new.mod@example.com".into(),
                full_name: "New Moderator".into(),
                role: "moderator".into(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, AdminError::Conflict(_)));

    // super_admin is not an invitable role
    let err = service
        .staff_invite(
            "sess-super",
            StaffInvite {
                email: "new.mod@example.com".into(),
                full_name: "New Moderator".into(),
                role: "super_admin".into(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, AdminError::BadInput(_)));

    // unknown users must sign up first
    let err = service
        .staff_invite(
            "sess-super",
            StaffInvite {
                email: "ghost@example.com".into(),
                full_name: "Ghost".into(),
                role: "support".into(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, AdminError::NotFound(_)));
    assert_eq!(err.status(), 404);

    Ok(())
}

#[test]
fn verification_decision_syncs_profile() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (service, _db) = open_service(&temp_dir, "verification.db")?;

    service.insert_profile(&Profile {
        id: "U4".into(),
        account_status: AccountStatus::Active,
        is_verified: false,
        verification_status: VerificationStatus::Pending,
    })?;
    service.insert_verification_request(&VerificationRequest {
        id: "V1".into(),
        profile_id: "U4".into(),
        status: VerificationRequestStatus::Pending,
    })?;

    let outcome = service.verification_decision(
        "sess-moderator",
        VerificationDecision {
            request_id: "V1".into(),
            profile_id: "U4".into(),
            decision: "verified".into(),
        },
    )?;
    assert_eq!(outcome, ActionOutcome::Applied);

    let profile = service.get_profile("U4")?.unwrap();
    assert!(profile.is_verified);
    assert_eq!(profile.verification_status, VerificationStatus::Verified);
    assert_eq!(
        service.get_verification_request("V1")?.unwrap().status,
        VerificationRequestStatus::Approved
    );

    // deciding the same request again is a conflict
    let err = service
        .verification_decision(
            "sess-moderator",
            VerificationDecision {
                request_id: "V1".into(),
                profile_id: "U4".into(),
                decision: "rejected".into(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, AdminError::Conflict(_)));

    Ok(())
}

#[test]
fn settings_update_is_audited() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (service, _db) = open_service(&temp_dir, "settings.db")?;

    let settings = AppSettings {
        maintenance_mode: true,
        min_version_ios: "3.2.0".into(),
        min_version_android: "3.1.4".into(),
        support_phone: "+441234567890".into(),
    };
    let outcome = service.update_settings("sess-super", settings.clone())?;
    assert_eq!(outcome, ActionOutcome::Applied);
    assert_eq!(service.get_settings()?.unwrap(), settings);

    let records = service.audit_records()?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, ActionType::SystemConfigChange);
    assert!(records[0].details.contains("Maintenance: true"));

    Ok(())
}

#[test]
fn export_renders_csv_for_analyst() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (service, _db) = open_service(&temp_dir, "export.db")?;

    let order_id = admin_actions::utils::new_uuid_to_bech32("order_")?;
    service.insert_order(&paid_order(&order_id))?;
    service.force_order_status(
        "sess-finance",
        ForceOrderStatus {
            order_id: order_id.clone(),
            new_status: "CANCELLED".into(),
            reason_category: "fraud".into(),
            reason: "chargeback already filed".into(),
            idempotency_key: Some("tok-x-1".into()),
        },
    )?;

    let csv = service.export_audit_csv("sess-analyst", &AuditFilter::default())?;
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "created_at,admin_email,action_type,target_id,details"
    );
    let row = lines.next().unwrap();
    assert!(row.contains("ORDER_INTERVENTION"));
    assert!(row.contains("staff_finance@example.com"));

    // filtering by another action type leaves only the header
    let csv = service.export_audit_csv(
        "sess-analyst",
        &AuditFilter {
            action: Some(ActionType::PayoutReject),
            ..Default::default()
        },
    )?;
    assert_eq!(csv.lines().count(), 1);

    // support has no export capability
    let err = service
        .export_audit_csv("sess-support", &AuditFilter::default())
        .unwrap_err();
    assert!(matches!(err, AdminError::Forbidden(_)));

    Ok(())
}

#[test]
fn unknown_credential_is_unauthenticated() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (service, _db) = open_service(&temp_dir, "unauth.db")?;

    let err = service
        .account_status_change(
            "sess-expired",
            AccountStatusChange {
                user_id: "U5".into(),
                account_status: "suspended".into(),
                reason: "should never get this far".into(),
            },
        )
        .unwrap_err();

    assert!(matches!(err, AdminError::Unauthenticated));
    assert_eq!(err.status(), 401);

    Ok(())
}

#[test]
fn audit_chain_verifies_and_detects_tampering() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (service, db) = open_service(&temp_dir, "chain.db")?;

    service.insert_order(&paid_order("O8"))?;
    service.insert_payout(&Payout {
        id: "P2".into(),
        status: PayoutStatus::Pending,
    })?;

    service.force_order_status(
        "sess-finance",
        ForceOrderStatus {
            order_id: "O8".into(),
            new_status: "COMPLETED".into(),
            reason_category: "customer_request".into(),
            reason: "buyer confirmed receipt".into(),
            idempotency_key: Some("tok-c-8".into()),
        },
    )?;
    service.payout_decision(
        "sess-finance",
        PayoutDecision {
            payout_id: "P2".into(),
            action: "reject".into(),
            reason_category: "bank_mismatch".into(),
            reason: "IBAN does not match KYC record".into(),
            idempotency_key: Some("tok-c-9".into()),
        },
    )?;

    assert_eq!(service.verify_audit_chain()?, 2);

    // flip one byte of the first record behind the log's back
    let key = {
        let mut key = b"audit/".to_vec();
        key.extend_from_slice(&1u64.to_be_bytes());
        key
    };
    let mut bytes = db.get(&key)?.unwrap().to_vec();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    db.insert(&key[..], bytes)?;

    assert!(service.verify_audit_chain().is_err());

    Ok(())
}

#[test]
fn dispute_order_mismatch_is_rejected() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (service, _db) = open_service(&temp_dir, "dispute_mismatch.db")?;

    service.insert_order(&paid_order("O9"))?;
    service.insert_dispute(&Dispute {
        id: "D3".into(),
        order_id: "O_other".into(),
        status: DisputeStatus::Open,
        admin_verdict: None,
        resolved_at: None,
    })?;

    let err = service
        .dispute_verdict(
            "sess-finance",
            DisputeVerdict {
                dispute_id: "D3".into(),
                order_id: "O9".into(),
                verdict: "refunded_buyer".into(),
                reason_category: "policy_violation".into(),
                reason: "listing violated marketplace policy".into(),
                idempotency_key: Some("tok-m-1".into()),
            },
        )
        .unwrap_err();

    assert!(matches!(err, AdminError::BadInput(_)));
    assert_eq!(service.get_order("O9")?.unwrap().status, OrderStatus::Paid);

    Ok(())
}
