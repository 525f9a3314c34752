use chrono::{Duration, Utc};
use uuid::Uuid;

use campus_domain::id::EnrollmentId;
use campus_enrollments::domain::access::{AccessStatus, DenyReason};
use campus_enrollments::domain::types::{AccessType, Enrollment, EnrollmentStatus};
use campus_enrollments::error::EnrollmentsServiceError;
use campus_enrollments::usecase::access::{
    BlockAccessInput, BlockAccessUseCase, CheckAccessStatusUseCase, ProvisionAccessUseCase,
    ProvisionOutcome, UnblockAccessUseCase, UpdateAccessPeriodUseCase,
};

use crate::helpers::{
    MockEnrollmentRepo, MockInstitutionRepo, RacingEnrollmentRepo, test_enrollment,
    test_institution, test_policy,
};

fn institutions(access_type: AccessType, days: Option<u32>) -> MockInstitutionRepo {
    MockInstitutionRepo::new(vec![test_institution(1, test_policy(access_type, days))])
}

fn granted(outcome: ProvisionOutcome) -> Enrollment {
    match outcome {
        ProvisionOutcome::Granted(enrollment) => enrollment,
        other => panic!("expected grant, got {other:?}"),
    }
}

// ── ProvisionAccessUseCase ───────────────────────────────────────────────────

#[tokio::test]
async fn should_grant_thirty_day_window_and_keep_status() {
    let repo = MockEnrollmentRepo::new(vec![test_enrollment(1, EnrollmentStatus::Pending)]);
    let history = repo.history_handle();
    let uc = ProvisionAccessUseCase {
        enrollments: repo,
        institutions: institutions(AccessType::AfterLinkCompletion, Some(30)),
    };

    let before = Utc::now();
    let enrollment = granted(uc.execute(EnrollmentId(1), Some(Uuid::new_v4())).await.unwrap());

    let granted = enrollment.access_granted_at.unwrap();
    assert!(granted >= before);
    assert_eq!(enrollment.access_expires_at, Some(granted + Duration::days(30)));
    assert_eq!(enrollment.status, EnrollmentStatus::Pending);

    let rows = history.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].previous_status, Some(EnrollmentStatus::Pending));
    assert_eq!(rows[0].new_status, EnrollmentStatus::Pending);
    assert!(rows[0].metadata.get("accessGrantedAt").is_some());
    assert!(rows[0].metadata.get("accessExpiresAt").is_some());
}

#[tokio::test]
async fn should_grant_unlimited_access_without_period() {
    let repo = MockEnrollmentRepo::new(vec![test_enrollment(1, EnrollmentStatus::Active)]);
    let uc = ProvisionAccessUseCase {
        enrollments: repo,
        institutions: institutions(AccessType::AfterPaymentConfirmation, None),
    };

    let enrollment = granted(uc.execute(EnrollmentId(1), None).await.unwrap());
    assert!(enrollment.access_granted_at.is_some());
    assert_eq!(enrollment.access_expires_at, None);
}

#[tokio::test]
async fn should_report_already_provisioned_without_touching_window() {
    let granted_at = Utc::now() - Duration::days(3);
    let expires_at = granted_at + Duration::days(60);
    let mut enrollment = test_enrollment(1, EnrollmentStatus::Active);
    enrollment.access_granted_at = Some(granted_at);
    enrollment.access_expires_at = Some(expires_at);

    let repo = MockEnrollmentRepo::new(vec![enrollment]);
    let stored = repo.enrollments_handle();
    let history = repo.history_handle();
    let uc = ProvisionAccessUseCase {
        enrollments: repo,
        institutions: institutions(AccessType::AfterLinkCompletion, Some(30)),
    };

    let err = uc.execute(EnrollmentId(1), None).await.unwrap_err();
    match err {
        EnrollmentsServiceError::AlreadyProvisioned {
            granted_at: g,
            expires_at: e,
        } => {
            assert_eq!(g, Some(granted_at));
            assert_eq!(e, Some(expires_at));
        }
        other => panic!("expected AlreadyProvisioned, got {other:?}"),
    }

    let stored = stored.lock().unwrap();
    assert_eq!(stored[0].access_granted_at, Some(granted_at));
    assert_eq!(stored[0].access_expires_at, Some(expires_at));
    assert!(history.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_deny_waiting_payment_when_payment_required() {
    let repo = MockEnrollmentRepo::new(vec![test_enrollment(1, EnrollmentStatus::WaitingPayment)]);
    let stored = repo.enrollments_handle();
    let history = repo.history_handle();
    let uc = ProvisionAccessUseCase {
        enrollments: repo,
        institutions: institutions(AccessType::AfterPaymentConfirmation, Some(30)),
    };

    let outcome = uc.execute(EnrollmentId(1), None).await.unwrap();
    assert!(
        matches!(outcome, ProvisionOutcome::Denied(DenyReason::AwaitingPayment)),
        "got {outcome:?}"
    );
    assert!(stored.lock().unwrap()[0].access_granted_at.is_none());
    assert!(history.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_grant_waiting_payment_after_link_completion() {
    let repo = MockEnrollmentRepo::new(vec![test_enrollment(1, EnrollmentStatus::WaitingPayment)]);
    let uc = ProvisionAccessUseCase {
        enrollments: repo,
        institutions: institutions(AccessType::AfterLinkCompletion, Some(30)),
    };

    let outcome = uc.execute(EnrollmentId(1), None).await.unwrap();
    assert!(matches!(outcome, ProvisionOutcome::Granted(_)), "got {outcome:?}");
}

#[tokio::test]
async fn should_deny_blocked_and_cancelled_enrollments() {
    for (status, reason) in [
        (EnrollmentStatus::Blocked, DenyReason::Blocked),
        (EnrollmentStatus::Cancelled, DenyReason::Cancelled),
    ] {
        let uc = ProvisionAccessUseCase {
            enrollments: MockEnrollmentRepo::new(vec![test_enrollment(1, status)]),
            institutions: institutions(AccessType::AfterLinkCompletion, Some(30)),
        };
        let outcome = uc.execute(EnrollmentId(1), None).await.unwrap();
        match outcome {
            ProvisionOutcome::Denied(r) => assert_eq!(r, reason),
            other => panic!("expected denial for {status:?}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn should_return_not_found_for_unknown_enrollment() {
    let uc = ProvisionAccessUseCase {
        enrollments: MockEnrollmentRepo::empty(),
        institutions: institutions(AccessType::AfterLinkCompletion, Some(30)),
    };
    let err = uc.execute(EnrollmentId(99), None).await.unwrap_err();
    assert!(matches!(err, EnrollmentsServiceError::EnrollmentNotFound), "got {err:?}");
}

#[tokio::test]
async fn should_report_already_provisioned_when_conditional_grant_loses() {
    let uc = ProvisionAccessUseCase {
        enrollments: RacingEnrollmentRepo {
            inner: MockEnrollmentRepo::new(vec![test_enrollment(1, EnrollmentStatus::Active)]),
        },
        institutions: institutions(AccessType::AfterLinkCompletion, Some(30)),
    };
    let err = uc.execute(EnrollmentId(1), None).await.unwrap_err();
    assert!(
        matches!(err, EnrollmentsServiceError::AlreadyProvisioned { .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn should_refuse_period_beyond_calendar_without_granting() {
    let repo = MockEnrollmentRepo::new(vec![test_enrollment(1, EnrollmentStatus::Active)]);
    let stored = repo.enrollments_handle();
    let history = repo.history_handle();
    let uc = ProvisionAccessUseCase {
        enrollments: repo,
        institutions: institutions(AccessType::AfterLinkCompletion, Some(2_000_000_000)),
    };

    let err = uc.execute(EnrollmentId(1), None).await.unwrap_err();
    assert!(matches!(err, EnrollmentsServiceError::InvalidAccessPeriod), "got {err:?}");
    assert!(stored.lock().unwrap()[0].access_granted_at.is_none());
    assert!(history.lock().unwrap().is_empty());
}

// ── UpdateAccessPeriodUseCase ────────────────────────────────────────────────

fn granted_enrollment(granted_days_ago: i64) -> Enrollment {
    let mut enrollment = test_enrollment(1, EnrollmentStatus::Active);
    let granted_at = Utc::now() - Duration::days(granted_days_ago);
    enrollment.access_granted_at = Some(granted_at);
    enrollment.access_expires_at = Some(granted_at + Duration::days(30));
    enrollment
}

#[tokio::test]
async fn should_extend_access_period() {
    let enrollment = granted_enrollment(5);
    let new_expiry = enrollment.access_granted_at.unwrap() + Duration::days(90);
    let repo = MockEnrollmentRepo::new(vec![enrollment]);
    let history = repo.history_handle();
    let uc = UpdateAccessPeriodUseCase { enrollments: repo };

    let updated = uc
        .execute(EnrollmentId(1), Some(new_expiry), None)
        .await
        .unwrap();
    assert_eq!(updated.access_expires_at, Some(new_expiry));

    let rows = history.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].metadata.get("previousExpiresAt").is_some());
    assert!(rows[0].metadata.get("newExpiresAt").is_some());
}

#[tokio::test]
async fn should_make_access_unlimited_with_null_expiry() {
    let uc = UpdateAccessPeriodUseCase {
        enrollments: MockEnrollmentRepo::new(vec![granted_enrollment(5)]),
    };
    let updated = uc.execute(EnrollmentId(1), None, None).await.unwrap();
    assert_eq!(updated.access_expires_at, None);
}

#[tokio::test]
async fn should_accept_past_expiry_after_grant() {
    let enrollment = granted_enrollment(10);
    let ended = enrollment.access_granted_at.unwrap() + Duration::days(1);
    let uc = UpdateAccessPeriodUseCase {
        enrollments: MockEnrollmentRepo::new(vec![enrollment]),
    };
    let updated = uc.execute(EnrollmentId(1), Some(ended), None).await.unwrap();
    assert_eq!(updated.access_expires_at, Some(ended));
}

#[tokio::test]
async fn should_reject_expiry_before_grant() {
    let enrollment = granted_enrollment(5);
    let too_early = enrollment.access_granted_at.unwrap() - Duration::hours(1);
    let original_expiry = enrollment.access_expires_at;
    let repo = MockEnrollmentRepo::new(vec![enrollment]);
    let stored = repo.enrollments_handle();
    let history = repo.history_handle();
    let uc = UpdateAccessPeriodUseCase { enrollments: repo };

    let err = uc
        .execute(EnrollmentId(1), Some(too_early), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EnrollmentsServiceError::InvalidAccessPeriod), "got {err:?}");
    assert_eq!(stored.lock().unwrap()[0].access_expires_at, original_expiry);
    assert!(history.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_require_existing_grant_to_update_period() {
    let uc = UpdateAccessPeriodUseCase {
        enrollments: MockEnrollmentRepo::new(vec![test_enrollment(1, EnrollmentStatus::Active)]),
    };
    let err = uc
        .execute(EnrollmentId(1), Some(Utc::now() + Duration::days(5)), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EnrollmentsServiceError::NotProvisioned), "got {err:?}");
}

// ── BlockAccessUseCase / UnblockAccessUseCase ────────────────────────────────

#[tokio::test]
async fn should_block_temporarily_and_report_blocked() {
    let repo = MockEnrollmentRepo::new(vec![granted_enrollment(1)]);
    let history = repo.history_handle();
    let block = BlockAccessUseCase {
        enrollments: repo.clone(),
    };

    let before = Utc::now();
    let output = block
        .execute(
            EnrollmentId(1),
            BlockAccessInput {
                reason: "nonpayment".to_owned(),
                duration_days: Some(10),
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(output.previous_status, EnrollmentStatus::Active);
    assert!(output.is_temporary);
    let enrollment = &output.enrollment;
    assert_eq!(enrollment.status, EnrollmentStatus::Blocked);
    assert_eq!(enrollment.block_reason.as_deref(), Some("nonpayment"));
    let ends = enrollment.block_ends_at.unwrap();
    assert!(ends >= before + Duration::days(10));
    assert!(ends <= Utc::now() + Duration::days(10));
    // Access window is left alone.
    assert!(enrollment.access_granted_at.is_some());

    let rows = history.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].metadata["blockReason"], "nonpayment");
    assert_eq!(rows[0].metadata["isTemporary"], true);
    drop(rows);

    let check = CheckAccessStatusUseCase { enrollments: repo };
    let report = check.execute(EnrollmentId(1)).await.unwrap();
    assert_eq!(report.status, AccessStatus::Blocked);
}

#[tokio::test]
async fn should_block_indefinitely_without_duration() {
    let uc = BlockAccessUseCase {
        enrollments: MockEnrollmentRepo::new(vec![test_enrollment(1, EnrollmentStatus::Pending)]),
    };
    let output = uc
        .execute(
            EnrollmentId(1),
            BlockAccessInput {
                reason: "fraud review".to_owned(),
                duration_days: None,
            },
            None,
        )
        .await
        .unwrap();
    assert!(!output.is_temporary);
    assert_eq!(output.enrollment.block_ends_at, None);
}

#[tokio::test]
async fn should_reject_blocking_cancelled_or_blocked_enrollment() {
    for status in [EnrollmentStatus::Cancelled, EnrollmentStatus::Blocked] {
        let uc = BlockAccessUseCase {
            enrollments: MockEnrollmentRepo::new(vec![test_enrollment(1, status)]),
        };
        let err = uc
            .execute(
                EnrollmentId(1),
                BlockAccessInput {
                    reason: "again".to_owned(),
                    duration_days: None,
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(
            matches!(err, EnrollmentsServiceError::InvalidTransition { .. }),
            "{status:?}: got {err:?}"
        );
    }
}

#[tokio::test]
async fn should_reject_empty_reason_or_zero_duration() {
    let uc = BlockAccessUseCase {
        enrollments: MockEnrollmentRepo::new(vec![test_enrollment(1, EnrollmentStatus::Active)]),
    };
    for (reason, duration_days) in [("  ", None), ("late", Some(0))] {
        let err = uc
            .execute(
                EnrollmentId(1),
                BlockAccessInput {
                    reason: reason.to_owned(),
                    duration_days,
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollmentsServiceError::MissingData), "got {err:?}");
    }
}

#[tokio::test]
async fn should_reject_block_duration_out_of_range() {
    let repo = MockEnrollmentRepo::new(vec![test_enrollment(1, EnrollmentStatus::Active)]);
    let stored = repo.enrollments_handle();
    let uc = BlockAccessUseCase { enrollments: repo };
    for duration_days in [36_501, 4_000_000_000] {
        let err = uc
            .execute(
                EnrollmentId(1),
                BlockAccessInput {
                    reason: "nonpayment".to_owned(),
                    duration_days: Some(duration_days),
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(
            matches!(err, EnrollmentsServiceError::InvalidAccessPeriod),
            "{duration_days}: got {err:?}"
        );
    }
    assert_eq!(stored.lock().unwrap()[0].status, EnrollmentStatus::Active);
}

#[tokio::test]
async fn should_unblock_and_keep_last_block_info() {
    let repo = MockEnrollmentRepo::new(vec![test_enrollment(1, EnrollmentStatus::Active)]);
    let history = repo.history_handle();
    BlockAccessUseCase {
        enrollments: repo.clone(),
    }
    .execute(
        EnrollmentId(1),
        BlockAccessInput {
            reason: "nonpayment".to_owned(),
            duration_days: Some(10),
        },
        None,
    )
    .await
    .unwrap();

    let unblock = UnblockAccessUseCase { enrollments: repo };
    let enrollment = unblock
        .execute(EnrollmentId(1), "paid".to_owned(), None)
        .await
        .unwrap();

    assert_eq!(enrollment.status, EnrollmentStatus::Active);
    assert_eq!(enrollment.block_ends_at, None);
    assert_eq!(enrollment.block_reason.as_deref(), Some("nonpayment"));
    assert!(enrollment.block_executed_at.is_some());

    let rows = history.lock().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].reason.as_deref(), Some("paid"));
    assert_eq!(rows[1].previous_status, Some(EnrollmentStatus::Blocked));
    assert_eq!(rows[1].metadata["previousBlockReason"], "nonpayment");
}

#[tokio::test]
async fn should_refuse_unblocking_enrollment_that_is_not_blocked() {
    let repo = MockEnrollmentRepo::new(vec![test_enrollment(1, EnrollmentStatus::Active)]);
    let history = repo.history_handle();
    let uc = UnblockAccessUseCase { enrollments: repo };

    let err = uc
        .execute(EnrollmentId(1), "no reason".to_owned(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EnrollmentsServiceError::NotBlocked), "got {err:?}");
    assert!(history.lock().unwrap().is_empty());
}

// ── CheckAccessStatusUseCase ─────────────────────────────────────────────────

#[tokio::test]
async fn should_treat_lapsed_block_as_active() {
    let mut enrollment = test_enrollment(1, EnrollmentStatus::Blocked);
    enrollment.access_granted_at = Some(Utc::now() - Duration::days(20));
    enrollment.block_executed_at = Some(Utc::now() - Duration::days(12));
    enrollment.block_ends_at = Some(Utc::now() - Duration::days(2));
    let uc = CheckAccessStatusUseCase {
        enrollments: MockEnrollmentRepo::new(vec![enrollment]),
    };

    let report = uc.execute(EnrollmentId(1)).await.unwrap();
    assert_eq!(report.status, AccessStatus::Active);
}

#[tokio::test]
async fn should_report_expired_and_not_granted() {
    let mut expired = test_enrollment(1, EnrollmentStatus::Active);
    expired.access_granted_at = Some(Utc::now() - Duration::days(40));
    expired.access_expires_at = Some(Utc::now() - Duration::days(10));
    let not_granted = test_enrollment(2, EnrollmentStatus::Pending);
    let uc = CheckAccessStatusUseCase {
        enrollments: MockEnrollmentRepo::new(vec![expired, not_granted]),
    };

    assert_eq!(
        uc.execute(EnrollmentId(1)).await.unwrap().status,
        AccessStatus::Expired
    );
    assert_eq!(
        uc.execute(EnrollmentId(2)).await.unwrap().status,
        AccessStatus::NotGranted
    );
}
