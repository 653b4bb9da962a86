//! Scenario tests for the learning crate
//! Services wired to the in-memory repository, one tenant per test.

#[cfg(test)]
mod scenario_tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use kernel::error::category::Categorized;
    use kernel::id::{CourseId, EnrollmentId, TenantId, UserId};

    use crate::application::{
        CertificateService, CreateTemplateInput, LearningConfig, ProgressService,
        QuizAttemptInput, ResetPolicy, TemplateService, UpdateProgressInput, VerificationOutcome,
    };
    use crate::domain::entity::certificate::{Certificate, CertificateSubject};
    use crate::domain::entity::course_progress::CourseProgress;
    use crate::domain::value_object::{
        certificate_status::CertificateStatus, course_totals::CourseTotals, milestone::Milestone,
        progress_status::ProgressStatus,
    };
    use crate::error::{CertificateError, ProgressError};
    use crate::infra::memory::MemoryLearningRepository;

    struct Fixture {
        repo: Arc<MemoryLearningRepository>,
        progress: ProgressService<MemoryLearningRepository>,
        certificates: CertificateService<MemoryLearningRepository>,
        templates: TemplateService<MemoryLearningRepository>,
        tenant: TenantId,
        course: CourseId,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_config(LearningConfig::default())
        }

        /// Course with 2 lessons and 2 quizzes
        fn with_config(config: LearningConfig) -> Self {
            let repo = Arc::new(MemoryLearningRepository::new());
            let tenant = TenantId::new();
            let course = CourseId::new();
            repo.insert_course(tenant, course, CourseTotals::new(2, 2));

            Self {
                progress: ProgressService::new(repo.clone(), Arc::new(config)),
                certificates: CertificateService::new(repo.clone()),
                templates: TemplateService::new(repo.clone()),
                repo,
                tenant,
                course,
            }
        }

        async fn enroll(&self, user: UserId) -> CourseProgress {
            self.progress
                .initialize_progress(self.tenant, user, self.course, EnrollmentId::new())
                .await
                .unwrap()
        }

        async fn finish_all(&self, progress: &CourseProgress) -> CourseProgress {
            self.progress
                .update_progress_data(
                    self.tenant,
                    progress.id,
                    UpdateProgressInput {
                        completed_lessons: 2,
                        completed_quizzes: 2,
                        time_spent_minutes: 90,
                    },
                )
                .await
                .unwrap()
        }
    }

    fn counts(lessons: u32, quizzes: u32, minutes: u32) -> UpdateProgressInput {
        UpdateProgressInput {
            completed_lessons: lessons,
            completed_quizzes: quizzes,
            time_spent_minutes: minutes,
        }
    }

    // ========================================================================
    // Progress lifecycle
    // ========================================================================

    #[tokio::test]
    async fn test_full_course_lifecycle() {
        let fx = Fixture::new();
        let user = UserId::new();

        let p = fx.enroll(user).await;
        assert_eq!(p.status, ProgressStatus::NotStarted);
        assert_eq!((p.total_lessons, p.total_quizzes), (2, 2));
        assert_eq!(p.percentage(), 0.0);

        let p = fx
            .progress
            .update_progress_data(fx.tenant, p.id, counts(1, 0, 15))
            .await
            .unwrap();
        assert_eq!(p.status, ProgressStatus::InProgress);
        assert_eq!(p.percentage(), 25.0);

        let p = fx
            .progress
            .update_progress_data(fx.tenant, p.id, counts(2, 1, 40))
            .await
            .unwrap();
        assert_eq!(p.percentage(), 75.0);

        let err = fx
            .progress
            .mark_progress_as_completed(fx.tenant, p.id)
            .await
            .unwrap_err();
        assert!(matches!(err.root(), ProgressError::CourseNotComplete { .. }));
        assert!(err.is_business_rule());

        let attempt = fx
            .progress
            .record_quiz_result(
                fx.tenant,
                p.id,
                QuizAttemptInput {
                    points_earned: 8.0,
                    points_possible: 10.0,
                    minutes: 10,
                },
            )
            .await
            .unwrap();
        assert!(attempt.grade.passed);
        assert_eq!(attempt.progress.percentage(), 100.0);
        assert_eq!(attempt.progress.status, ProgressStatus::InProgress);

        let done = fx
            .progress
            .mark_progress_as_completed(fx.tenant, p.id)
            .await
            .unwrap();
        assert!(done.newly_issued);
        assert_eq!(done.progress.status, ProgressStatus::Completed);
        assert_eq!(done.progress.certificate_id, Some(done.certificate.id));
        assert_eq!(done.certificate.status, CertificateStatus::Issued);
        assert_eq!(done.certificate.total_time_spent, 50);
        assert!(done.certificate.is_valid());

        let history = fx
            .progress
            .progress_history(fx.tenant, user, fx.course, None, None)
            .await
            .unwrap();
        let milestones: Vec<Milestone> = history.iter().map(|s| s.milestone).collect();
        assert_eq!(
            milestones,
            vec![
                Milestone::Quarter,
                Milestone::Half,
                Milestone::ThreeQuarters,
                Milestone::Completed
            ]
        );
    }

    #[tokio::test]
    async fn test_ten_lessons_two_quizzes_course() {
        let fx = Fixture::new();
        let course = CourseId::new();
        fx.repo
            .insert_course(fx.tenant, course, CourseTotals::new(10, 2));

        let p = fx
            .progress
            .initialize_progress(fx.tenant, UserId::new(), course, EnrollmentId::new())
            .await
            .unwrap();
        let p = fx
            .progress
            .update_progress_data(fx.tenant, p.id, counts(10, 2, 240))
            .await
            .unwrap();
        assert!(p.is_complete_eligible());
        assert_eq!(p.percentage(), 100.0);

        let done = fx
            .progress
            .mark_progress_as_completed(fx.tenant, p.id)
            .await
            .unwrap();
        assert!(done.progress.is_completed());
        assert_eq!(done.certificate.course_id, course);
        assert_eq!(done.certificate.total_time_spent, 240);
    }

    #[tokio::test]
    async fn test_completion_is_idempotent() {
        let fx = Fixture::new();
        let p = fx.enroll(UserId::new()).await;
        fx.finish_all(&p).await;

        let first = fx
            .progress
            .mark_progress_as_completed(fx.tenant, p.id)
            .await
            .unwrap();
        let second = fx
            .progress
            .mark_progress_as_completed(fx.tenant, p.id)
            .await
            .unwrap();

        assert!(first.newly_issued);
        assert!(!second.newly_issued);
        assert_eq!(first.certificate.id, second.certificate.id);
        assert_eq!(
            fx.certificates
                .list_user_certificates(fx.tenant, p.user_id)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_update_is_idempotent_and_never_completes() {
        let fx = Fixture::new();
        let p = fx.enroll(UserId::new()).await;

        let first = fx.finish_all(&p).await;
        let snapshots_after_first = fx.repo.snapshot_count();
        let second = fx.finish_all(&p).await;

        assert_eq!(first, second);
        assert_eq!(fx.repo.snapshot_count(), snapshots_after_first);
        assert_eq!(second.status, ProgressStatus::InProgress);
        assert!(second.certificate_id.is_none());
    }

    #[tokio::test]
    async fn test_update_rejects_counts_above_totals() {
        let fx = Fixture::new();
        let p = fx.enroll(UserId::new()).await;

        let err = fx
            .progress
            .update_progress_data(fx.tenant, p.id, counts(3, 0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err.root(), ProgressError::InvalidProgressData(_)));
        assert!(err.is_validation());
        assert_eq!(err.operation(), Some("update_progress_data"));
    }

    #[tokio::test]
    async fn test_completed_progress_rejects_updates() {
        let fx = Fixture::new();
        let p = fx.enroll(UserId::new()).await;
        fx.finish_all(&p).await;
        fx.progress
            .mark_progress_as_completed(fx.tenant, p.id)
            .await
            .unwrap();

        let err = fx
            .progress
            .update_progress_data(fx.tenant, p.id, counts(1, 1, 5))
            .await
            .unwrap_err();
        assert!(matches!(err.root(), ProgressError::ProgressCompleted));

        let err = fx
            .progress
            .mark_progress_as_started(fx.tenant, p.id)
            .await
            .unwrap_err();
        assert!(matches!(err.root(), ProgressError::ProgressCompleted));
    }

    #[tokio::test]
    async fn test_initialize_requires_known_course_and_unique_triple() {
        let fx = Fixture::new();
        let user = UserId::new();
        fx.enroll(user).await;

        let err = fx
            .progress
            .initialize_progress(fx.tenant, user, fx.course, EnrollmentId::new())
            .await
            .unwrap_err();
        assert!(err.is_already_exists());

        let err = fx
            .progress
            .initialize_progress(fx.tenant, user, CourseId::new(), EnrollmentId::new())
            .await
            .unwrap_err();
        assert!(matches!(err.root(), ProgressError::CourseNotFound));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_foreign_tenant_never_resolves() {
        let fx = Fixture::new();
        let p = fx.enroll(UserId::new()).await;
        let other = TenantId::new();

        let err = fx.progress.get_progress(other, p.id).await.unwrap_err();
        assert!(matches!(err.root(), ProgressError::ProgressNotFound));

        let err = fx
            .progress
            .update_progress_data(other, p.id, counts(1, 0, 0))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        assert!(
            fx.progress
                .list_user_progress(other, p.user_id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_failed_quiz_does_not_count() {
        let fx = Fixture::new();
        let p = fx.enroll(UserId::new()).await;

        let attempt = fx
            .progress
            .record_quiz_result(
                fx.tenant,
                p.id,
                QuizAttemptInput {
                    points_earned: 5.0,
                    points_possible: 10.0,
                    minutes: 12,
                },
            )
            .await
            .unwrap();

        assert!(!attempt.grade.passed);
        assert_eq!(attempt.grade.percentage, 50.0);
        assert_eq!(attempt.progress.completed_quizzes, 0);
        assert_eq!(attempt.progress.time_spent_minutes, 12);
        assert_eq!(attempt.progress.status, ProgressStatus::InProgress);
    }

    #[tokio::test]
    async fn test_invalid_quiz_attempt_is_rejected() {
        let fx = Fixture::new();
        let p = fx.enroll(UserId::new()).await;

        let err = fx
            .progress
            .record_quiz_result(
                fx.tenant,
                p.id,
                QuizAttemptInput {
                    points_earned: 11.0,
                    points_possible: 10.0,
                    minutes: 0,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err.root(), ProgressError::InvalidQuizResult(_)));
    }

    #[tokio::test]
    async fn test_lessons_are_capped_at_total() {
        let fx = Fixture::new();
        let p = fx.enroll(UserId::new()).await;

        for _ in 0..3 {
            fx.progress
                .record_lesson_completion(fx.tenant, p.id, 10)
                .await
                .unwrap();
        }
        let p = fx.progress.get_progress(fx.tenant, p.id).await.unwrap();
        assert_eq!(p.completed_lessons, 2);
        assert_eq!(p.time_spent_minutes, 30);
    }

    #[tokio::test]
    async fn test_record_access_touches_timestamp() {
        let fx = Fixture::new();
        let p = fx.enroll(UserId::new()).await;
        assert!(p.last_accessed_at.is_none());

        let p = fx.progress.record_access(fx.tenant, p.id).await.unwrap();
        assert!(p.last_accessed_at.is_some());
        assert_eq!(p.status, ProgressStatus::NotStarted);
    }

    // ========================================================================
    // Reset
    // ========================================================================

    #[tokio::test]
    async fn test_reset_keeping_certificate_relinks_on_recompletion() {
        let fx = Fixture::new();
        let p = fx.enroll(UserId::new()).await;
        fx.finish_all(&p).await;
        let done = fx
            .progress
            .mark_progress_as_completed(fx.tenant, p.id)
            .await
            .unwrap();

        let reset = fx
            .progress
            .reset_progress(fx.tenant, p.id, ResetPolicy::KeepCertificate)
            .await
            .unwrap();
        assert_eq!(reset.status, ProgressStatus::NotStarted);
        assert_eq!((reset.completed_lessons, reset.completed_quizzes), (0, 0));
        assert_eq!(reset.time_spent_minutes, 0);

        let kept = fx
            .certificates
            .get_certificate(fx.tenant, done.certificate.id)
            .await
            .unwrap();
        assert_eq!(kept.status, CertificateStatus::Issued);

        fx.finish_all(&p).await;
        let again = fx
            .progress
            .mark_progress_as_completed(fx.tenant, p.id)
            .await
            .unwrap();
        assert!(!again.newly_issued);
        assert_eq!(again.certificate.id, done.certificate.id);
    }

    #[tokio::test]
    async fn test_reset_revoking_certificate_issues_fresh_one() {
        let fx = Fixture::new();
        let admin = UserId::new();
        let p = fx.enroll(UserId::new()).await;
        fx.finish_all(&p).await;
        let done = fx
            .progress
            .mark_progress_as_completed(fx.tenant, p.id)
            .await
            .unwrap();

        let reset = fx
            .progress
            .reset_progress(
                fx.tenant,
                p.id,
                ResetPolicy::RevokeCertificate {
                    revoked_by: admin,
                    reason: "Course content replaced".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(reset.certificate_id.is_none());

        let revoked = fx
            .certificates
            .get_certificate(fx.tenant, done.certificate.id)
            .await
            .unwrap();
        assert_eq!(revoked.status, CertificateStatus::Revoked);
        assert_eq!(revoked.revoked_by, Some(admin));

        // Same second as the first issue collides on the number and retries.
        fx.finish_all(&p).await;
        let again = fx
            .progress
            .mark_progress_as_completed(fx.tenant, p.id)
            .await
            .unwrap();
        assert!(again.newly_issued);
        assert_ne!(again.certificate.id, done.certificate.id);
        assert_ne!(
            again.certificate.certificate_number,
            done.certificate.certificate_number
        );
    }

    // ========================================================================
    // Issuance
    // ========================================================================

    /// Revoked certificates occupying the numbers of the next few seconds
    fn occupy_numbers(fx: &Fixture, progress: &CourseProgress, seconds: i64) {
        let start = Utc::now();
        for offset in -1..seconds {
            let mut blocker = Certificate::issue(
                CertificateSubject::from(progress),
                start,
                0,
                start + Duration::seconds(offset),
                None,
            );
            blocker.revoke(UserId::new(), "placeholder").unwrap();
            fx.repo.insert_certificate(blocker);
        }
    }

    #[tokio::test]
    async fn test_number_collision_surfaces_without_retries() {
        let fx = Fixture::with_config(LearningConfig {
            issue_max_attempts: 1,
            ..LearningConfig::default()
        });
        let p = fx.enroll(UserId::new()).await;
        fx.finish_all(&p).await;
        occupy_numbers(&fx, &p, 10);

        let err = fx
            .progress
            .mark_progress_as_completed(fx.tenant, p.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err.root(),
            ProgressError::Certificate(CertificateError::NumberCollision)
        ));
        assert!(err.is_already_exists());

        let p = fx.progress.get_progress(fx.tenant, p.id).await.unwrap();
        assert_eq!(p.status, ProgressStatus::InProgress);
    }

    #[tokio::test]
    async fn test_number_collision_is_retried() {
        let fx = Fixture::with_config(LearningConfig {
            issue_max_attempts: 30,
            ..LearningConfig::default()
        });
        let p = fx.enroll(UserId::new()).await;
        fx.finish_all(&p).await;
        occupy_numbers(&fx, &p, 10);

        let done = fx
            .progress
            .mark_progress_as_completed(fx.tenant, p.id)
            .await
            .unwrap();
        assert!(done.newly_issued);
        assert!(done.certificate.issued_at > done.certificate.completion_date);
    }

    #[tokio::test]
    async fn test_certificate_validity_from_config() {
        let fx = Fixture::with_config(LearningConfig::development());
        let p = fx.enroll(UserId::new()).await;
        fx.finish_all(&p).await;

        let done = fx
            .progress
            .mark_progress_as_completed(fx.tenant, p.id)
            .await
            .unwrap();
        let expires_at = done.certificate.expires_at.unwrap();
        assert_eq!(expires_at - done.certificate.issued_at, Duration::days(365));
    }

    #[tokio::test]
    async fn test_issue_uses_active_default_template() {
        let fx = Fixture::new();
        let template = fx
            .templates
            .create_template(
                fx.tenant,
                CreateTemplateInput {
                    name: "Classic".to_string(),
                    description: None,
                    configuration: r#"{"layout": "landscape"}"#.to_string(),
                    make_default: true,
                },
            )
            .await
            .unwrap();

        let p = fx.enroll(UserId::new()).await;
        fx.finish_all(&p).await;
        let done = fx
            .progress
            .mark_progress_as_completed(fx.tenant, p.id)
            .await
            .unwrap();
        assert_eq!(done.certificate.template_id, Some(template.id));
    }

    /// Issued certificate for the enrolled user whose expiration passed a day ago
    fn lapsed_certificate(fx: &Fixture, progress: &CourseProgress) -> Certificate {
        let issued_at = Utc::now() - Duration::days(2);
        let certificate = Certificate::issue(
            CertificateSubject::from(progress),
            issued_at,
            30,
            issued_at,
            Some(Duration::days(1)),
        );
        fx.repo.insert_certificate(certificate.clone());
        certificate
    }

    #[tokio::test]
    async fn test_lapsed_certificate_is_replaced_not_relinked() {
        let fx = Fixture::new();
        let p = fx.enroll(UserId::new()).await;
        let lapsed = lapsed_certificate(&fx, &p);
        assert_eq!(lapsed.status, CertificateStatus::Issued);

        fx.finish_all(&p).await;
        let done = fx
            .progress
            .mark_progress_as_completed(fx.tenant, p.id)
            .await
            .unwrap();
        assert!(done.newly_issued);
        assert_ne!(done.certificate.id, lapsed.id);
        assert!(done.certificate.is_valid());
        assert_eq!(done.progress.certificate_id, Some(done.certificate.id));

        let old = fx
            .certificates
            .get_certificate(fx.tenant, lapsed.id)
            .await
            .unwrap();
        assert_eq!(old.status, CertificateStatus::Expired);
    }

    #[tokio::test]
    async fn test_reinstating_expired_certificate_blocked_by_newer_one() {
        let fx = Fixture::new();
        let p = fx.enroll(UserId::new()).await;
        let lapsed = lapsed_certificate(&fx, &p);
        assert_eq!(fx.certificates.expire_overdue_certificates().await.unwrap(), 1);

        fx.finish_all(&p).await;
        let done = fx
            .progress
            .mark_progress_as_completed(fx.tenant, p.id)
            .await
            .unwrap();
        assert!(done.newly_issued);

        let err = fx
            .certificates
            .set_expiration(fx.tenant, lapsed.id, Utc::now() + Duration::days(30))
            .await
            .unwrap_err();
        assert!(matches!(err.root(), CertificateError::AlreadyCertified));
        assert!(err.is_business_rule());

        let issued: Vec<_> = fx
            .certificates
            .list_user_certificates(fx.tenant, p.user_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.status == CertificateStatus::Issued)
            .collect();
        assert_eq!(issued.len(), 1);
        assert_eq!(issued[0].id, done.certificate.id);
    }

    #[tokio::test]
    async fn test_reinstating_expired_certificate_when_it_is_the_only_one() {
        let fx = Fixture::new();
        let p = fx.enroll(UserId::new()).await;
        let lapsed = lapsed_certificate(&fx, &p);
        fx.certificates.expire_overdue_certificates().await.unwrap();

        let reinstated = fx
            .certificates
            .set_expiration(fx.tenant, lapsed.id, Utc::now() + Duration::days(30))
            .await
            .unwrap();
        assert_eq!(reinstated.status, CertificateStatus::Issued);
        assert!(reinstated.is_valid());
    }

    // ========================================================================
    // Verification and certificate edits
    // ========================================================================

    async fn issued(fx: &Fixture) -> Certificate {
        let p = fx.enroll(UserId::new()).await;
        fx.finish_all(&p).await;
        fx.progress
            .mark_progress_as_completed(fx.tenant, p.id)
            .await
            .unwrap()
            .certificate
    }

    #[tokio::test]
    async fn test_verify_certificate_outcomes() {
        let fx = Fixture::new();
        let cert = issued(&fx).await;
        let number = cert.certificate_number.as_str();
        let code = cert.verification_code.as_str();

        let outcome = fx
            .certificates
            .verify_certificate(fx.tenant, number, code)
            .await
            .unwrap();
        assert!(outcome.is_valid());
        assert_eq!(outcome.certificate().map(|c| c.id), Some(cert.id));

        let outcome = fx
            .certificates
            .verify_certificate(fx.tenant, number, "0000")
            .await
            .unwrap();
        assert!(matches!(outcome, VerificationOutcome::Mismatch));
        assert!(outcome.certificate().is_none());

        let outcome = fx
            .certificates
            .verify_certificate(fx.tenant, "CERT-0000000000000000", code)
            .await
            .unwrap();
        assert!(matches!(outcome, VerificationOutcome::Unknown));

        let outcome = fx
            .certificates
            .verify_certificate(fx.tenant, "not a number", code)
            .await
            .unwrap();
        assert!(matches!(outcome, VerificationOutcome::Unknown));

        let outcome = fx
            .certificates
            .verify_certificate(TenantId::new(), number, code)
            .await
            .unwrap();
        assert!(matches!(outcome, VerificationOutcome::Unknown));
    }

    #[tokio::test]
    async fn test_revoked_certificate_fails_verification() {
        let fx = Fixture::new();
        let cert = issued(&fx).await;
        let admin = UserId::new();

        let revoked = fx
            .certificates
            .revoke_certificate(fx.tenant, cert.id, admin, "Plagiarism")
            .await
            .unwrap();
        assert!(revoked.is_revoked());

        let again = fx
            .certificates
            .revoke_certificate(fx.tenant, cert.id, UserId::new(), "Other reason")
            .await
            .unwrap();
        assert_eq!(again.revoked_by, Some(admin));
        assert_eq!(again.revocation_reason.as_deref(), Some("Plagiarism"));

        let outcome = fx
            .certificates
            .verify_certificate(
                fx.tenant,
                cert.certificate_number.as_str(),
                cert.verification_code.as_str(),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, VerificationOutcome::Matched(_)));
        assert!(!outcome.is_valid());

        let err = fx
            .certificates
            .set_grade(fx.tenant, cert.id, 90.0)
            .await
            .unwrap_err();
        assert!(matches!(err.root(), CertificateError::CertificateRevoked));
        assert!(err.is_business_rule());
    }

    #[tokio::test]
    async fn test_revoking_again_needs_no_reason() {
        let fx = Fixture::new();
        let p = fx.enroll(UserId::new()).await;
        fx.finish_all(&p).await;
        let done = fx
            .progress
            .mark_progress_as_completed(fx.tenant, p.id)
            .await
            .unwrap();
        let admin = UserId::new();
        fx.certificates
            .revoke_certificate(fx.tenant, done.certificate.id, admin, "fraud")
            .await
            .unwrap();

        let again = fx
            .certificates
            .revoke_certificate(fx.tenant, done.certificate.id, UserId::new(), "")
            .await
            .unwrap();
        assert_eq!(again.revocation_reason.as_deref(), Some("fraud"));

        // Reset with an omitted reason on the already revoked certificate
        let reset = fx
            .progress
            .reset_progress(
                fx.tenant,
                p.id,
                ResetPolicy::RevokeCertificate {
                    revoked_by: UserId::new(),
                    reason: String::new(),
                },
            )
            .await
            .unwrap();
        assert!(reset.certificate_id.is_none());
        let stored = fx
            .certificates
            .get_certificate(fx.tenant, done.certificate.id)
            .await
            .unwrap();
        assert_eq!(stored.revoked_by, Some(admin));
    }

    #[tokio::test]
    async fn test_certificate_edits() {
        let fx = Fixture::new();
        let cert = issued(&fx).await;

        let graded = fx
            .certificates
            .set_grade(fx.tenant, cert.id, 92.5)
            .await
            .unwrap();
        assert_eq!(graded.grade.map(|g| g.value()), Some(92.5));

        let err = fx
            .certificates
            .set_grade(fx.tenant, cert.id, 101.0)
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let err = fx
            .certificates
            .set_expiration(fx.tenant, cert.id, cert.issued_at - Duration::days(1))
            .await
            .unwrap_err();
        assert!(matches!(err.root(), CertificateError::InvalidExpiration(_)));

        let expiring = fx
            .certificates
            .set_expiration(fx.tenant, cert.id, cert.issued_at + Duration::days(30))
            .await
            .unwrap();
        assert!(expiring.is_valid());

        let tagged = fx
            .certificates
            .add_metadata(fx.tenant, cert.id, "honors", serde_json::json!(true))
            .await
            .unwrap();
        assert_eq!(tagged.metadata.get("honors"), Some(&serde_json::json!(true)));

        let by_number = fx
            .certificates
            .get_by_number(fx.tenant, cert.certificate_number.as_str())
            .await
            .unwrap();
        assert_eq!(by_number.id, cert.id);
        assert_eq!(by_number.grade.map(|g| g.value()), Some(92.5));

        let err = fx
            .certificates
            .get_by_number(fx.tenant, "CERT-xyz")
            .await
            .unwrap_err();
        assert!(matches!(err.root(), CertificateError::InvalidCertificateNumber));
    }

    #[tokio::test]
    async fn test_set_template_requires_active_template() {
        let fx = Fixture::new();
        let cert = issued(&fx).await;
        let template = fx
            .templates
            .create_template(
                fx.tenant,
                CreateTemplateInput {
                    name: "Modern".to_string(),
                    description: Some("Dark theme".to_string()),
                    configuration: "{}".to_string(),
                    make_default: false,
                },
            )
            .await
            .unwrap();

        fx.templates
            .deactivate_template(fx.tenant, template.id)
            .await
            .unwrap();
        let err = fx
            .certificates
            .set_template(fx.tenant, cert.id, template.id)
            .await
            .unwrap_err();
        assert!(matches!(err.root(), CertificateError::TemplateInactive));

        fx.templates
            .activate_template(fx.tenant, template.id)
            .await
            .unwrap();
        let linked = fx
            .certificates
            .set_template(fx.tenant, cert.id, template.id)
            .await
            .unwrap();
        assert_eq!(linked.template_id, Some(template.id));

        let err = fx
            .certificates
            .set_template(TenantId::new(), cert.id, template.id)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    // ========================================================================
    // Templates
    // ========================================================================

    fn template_input(name: &str, make_default: bool) -> CreateTemplateInput {
        CreateTemplateInput {
            name: name.to_string(),
            description: None,
            configuration: "{}".to_string(),
            make_default,
        }
    }

    #[tokio::test]
    async fn test_single_default_template_per_tenant() {
        let fx = Fixture::new();
        let first = fx
            .templates
            .create_template(fx.tenant, template_input("First", true))
            .await
            .unwrap();
        let second = fx
            .templates
            .create_template(fx.tenant, template_input("Second", true))
            .await
            .unwrap();
        assert!(second.is_default);

        let templates = fx.templates.list_templates(fx.tenant).await.unwrap();
        let defaults: Vec<_> = templates.iter().filter(|t| t.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, second.id);

        fx.templates
            .set_default_template(fx.tenant, first.id)
            .await
            .unwrap();
        let default = fx.templates.get_default_template(fx.tenant).await.unwrap();
        assert_eq!(default.id, first.id);
    }

    #[tokio::test]
    async fn test_deactivating_default_clears_it() {
        let fx = Fixture::new();
        let template = fx
            .templates
            .create_template(fx.tenant, template_input("Only", true))
            .await
            .unwrap();

        let deactivated = fx
            .templates
            .deactivate_template(fx.tenant, template.id)
            .await
            .unwrap();
        assert!(!deactivated.is_default);

        let err = fx.templates.get_default_template(fx.tenant).await.unwrap_err();
        assert!(err.is_not_found());

        let err = fx
            .templates
            .set_default_template(fx.tenant, template.id)
            .await
            .unwrap_err();
        assert!(matches!(err.root(), CertificateError::TemplateInactive));
    }

    #[tokio::test]
    async fn test_template_configuration_must_be_object() {
        let fx = Fixture::new();
        let err = fx
            .templates
            .create_template(
                fx.tenant,
                CreateTemplateInput {
                    configuration: "[1, 2]".to_string(),
                    ..template_input("Broken", false)
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let template = fx
            .templates
            .create_template(fx.tenant, template_input("Plain", false))
            .await
            .unwrap();
        let updated = fx
            .templates
            .update_template_configuration(fx.tenant, template.id, r#"{"font": "serif"}"#)
            .await
            .unwrap();
        assert_eq!(
            updated.configuration.get("font"),
            Some(&serde_json::json!("serif"))
        );
    }

    // ========================================================================
    // Snapshots and statistics
    // ========================================================================

    #[tokio::test]
    async fn test_history_rejects_inverted_range() {
        let fx = Fixture::new();
        let now = Utc::now();
        let err = fx
            .progress
            .progress_history(
                fx.tenant,
                UserId::new(),
                fx.course,
                Some(now),
                Some(now - Duration::hours(1)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err.root(), ProgressError::InvalidDateRange));
    }

    #[tokio::test]
    async fn test_manual_snapshot_and_milestone_query() {
        let fx = Fixture::new();
        let p = fx.enroll(UserId::new()).await;
        fx.progress
            .update_progress_data(fx.tenant, p.id, counts(1, 1, 20))
            .await
            .unwrap();

        let manual = fx.progress.create_snapshot(fx.tenant, p.id).await.unwrap();
        assert_eq!(manual.milestone, Milestone::Manual);
        assert_eq!(manual.percentage, 50.0);

        let halves = fx
            .progress
            .snapshots_by_milestone(fx.tenant, fx.course, Milestone::Half)
            .await
            .unwrap();
        assert_eq!(halves.len(), 1);
        assert_eq!(halves[0].progress_id, p.id);
    }

    #[tokio::test]
    async fn test_course_completion_stats() {
        let fx = Fixture::new();
        let done = fx.enroll(UserId::new()).await;
        fx.finish_all(&done).await;
        fx.progress
            .mark_progress_as_completed(fx.tenant, done.id)
            .await
            .unwrap();

        let halfway = fx.enroll(UserId::new()).await;
        fx.progress
            .update_progress_data(fx.tenant, halfway.id, counts(2, 0, 30))
            .await
            .unwrap();

        fx.enroll(UserId::new()).await;

        let stats = fx
            .progress
            .course_completion_stats(fx.tenant, fx.course)
            .await
            .unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.not_started, 1);
        assert_eq!(stats.average_percentage, 50.0);
    }
}
