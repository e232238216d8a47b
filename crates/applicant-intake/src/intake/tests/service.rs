use std::sync::Arc;

use super::common::*;
use crate::intake::country::StaticCountryResolver;
use crate::intake::domain::{ApplicantId, ApplicantSubmission};
use crate::intake::repository::{RepositoryError, INITIAL_VERSION};
use crate::intake::service::{ApplicantQuery, Stage, SubmissionError};
use crate::intake::ErrorCode;

#[tokio::test]
async fn valid_submission_completes_with_an_identifier() {
    let (service, store) = build_service();

    let response = service.submit(submission()).await.expect("completed");

    assert!(!response.id.0.is_nil());
    assert_eq!(response.version, INITIAL_VERSION);
    assert_eq!(response.address.country_name.as_deref(), Some("United States"));
    assert_eq!(store.len(), 1);
    assert_eq!(store.open_sessions(), 0);
}

#[tokio::test]
async fn unresolvable_country_is_rejected_without_an_identifier() {
    let (service, store) = build_service();

    let error = service
        .submit(submission_from("ZZ"))
        .await
        .expect_err("rejected");

    assert_eq!(error.stage(), Stage::Rejected);
    assert_eq!(error.code(), ErrorCode::ValidationFailure);
    assert_eq!(error.violations().len(), 1);
    assert_eq!(error.violations()[0].field, "address.country_code");
    assert!(store.is_empty());
}

#[tokio::test]
async fn store_failure_during_persist_leaves_nothing_behind() {
    let store = InstrumentedStore::failing_persist();
    let service = service_with(Arc::new(store.clone()), Arc::new(StaticCountryResolver));

    let error = service.submit(submission()).await.expect_err("failed");

    assert_eq!(
        error,
        SubmissionError::Repository(RepositoryError::Unavailable("disk full".to_string()))
    );
    assert_eq!(error.stage(), Stage::Failed);
    assert_eq!(error.code(), ErrorCode::StoreUnavailable);
    assert!(error.is_retryable());
    assert_eq!(store.adds(), 1);
    assert!(store.inner.is_empty());
    assert_eq!(store.inner.open_sessions(), 0);
}

#[tokio::test]
async fn pipeline_output_matches_a_later_read() {
    let (service, _store) = build_service();

    let created = service.submit(submission()).await.expect("completed");
    let fetched = service.get(&created.id).await.expect("stored");

    assert_eq!(created, fetched);
}

#[tokio::test]
async fn pipeline_output_is_the_mapped_entity() {
    let (service, _store) = build_service();

    let created = service.submit(submission()).await.expect("completed");
    let expected = mapper().to_response(&stored_applicant(created.id));

    assert_eq!(created, expected);
}

#[tokio::test]
async fn missing_required_fields_never_reach_persistence() {
    let strip: [(&str, fn(&mut ApplicantSubmission)); 7] = [
        ("name", |s| s.name = None),
        ("family_name", |s| s.family_name = None),
        ("date_of_birth", |s| s.date_of_birth = None),
        ("address.street", |s| s.address.street = None),
        ("address.country_code", |s| s.address.country_code = None),
        ("email", |s| s.email = None),
        ("hired", |s| s.hired = None),
    ];

    for (field, clear) in strip {
        let store = InstrumentedStore::recording();
        let service = service_with(Arc::new(store.clone()), Arc::new(StaticCountryResolver));
        let mut submission = submission();
        clear(&mut submission);

        let error = service.submit(submission).await.expect_err("rejected");

        assert!(
            error.violations().iter().any(|violation| violation.field == field),
            "{field} missing from {error:?}"
        );
        assert_eq!(store.adds(), 0, "{field} reached persistence");
    }
}

#[tokio::test]
async fn unavailable_resolver_fails_a_valid_submission() {
    let store = InstrumentedStore::recording();
    let service = service_with(Arc::new(store.clone()), Arc::new(UnavailableResolver));

    let error = service.submit(submission()).await.expect_err("failed");

    assert!(matches!(error, SubmissionError::ResolverUnavailable(_)));
    assert_eq!(error.stage(), Stage::Failed);
    assert!(error.is_retryable());
    assert_eq!(store.adds(), 0);
}

#[tokio::test]
async fn violations_take_precedence_over_resolver_outages() {
    let service = service_with(
        Arc::new(InstrumentedStore::recording()),
        Arc::new(UnavailableResolver),
    );
    let mut submission = submission();
    submission.email = None;

    let error = service.submit(submission).await.expect_err("rejected");

    assert_eq!(error.stage(), Stage::Rejected);
}

#[tokio::test]
async fn offline_store_reports_store_unavailable() {
    let (service, store) = build_service();
    store.set_online(false);

    let error = service.submit(submission()).await.expect_err("failed");

    assert_eq!(error.code(), ErrorCode::StoreUnavailable);
    assert!(service.probe().is_err());
}

#[tokio::test]
async fn update_preserves_identity_and_bumps_the_version() {
    let (service, _store) = build_service();
    let created = service.submit(submission()).await.expect("completed");

    let mut changed = submission_from("de");
    changed.hired = Some(true);
    let updated = service
        .update(&created.id, changed, created.version)
        .await
        .expect("updated");

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.version, created.version + 1);
    assert!(updated.hired);
    assert_eq!(updated.address.country_code.as_deref(), Some("DE"));
    assert_eq!(service.get(&created.id).await.expect("stored"), updated);
}

#[tokio::test]
async fn update_with_a_stale_version_conflicts() {
    let (service, _store) = build_service();
    let created = service.submit(submission()).await.expect("completed");
    service
        .update(&created.id, submission(), created.version)
        .await
        .expect("first update");

    let error = service
        .update(&created.id, submission(), created.version)
        .await
        .expect_err("stale");

    assert_eq!(error.code(), ErrorCode::Conflict);
    assert!(!error.is_retryable());
}

#[tokio::test]
async fn update_and_delete_report_unknown_applicants() {
    let (service, _store) = build_service();
    let id = ApplicantId::generate();

    let update = service.update(&id, submission(), 1).await;
    assert_eq!(update.map(|_| ()).unwrap_err().code(), ErrorCode::NotFound);

    let delete = service.delete(&id).await;
    assert_eq!(delete.unwrap_err().code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn invalid_update_leaves_the_stored_applicant_untouched() {
    let (service, _store) = build_service();
    let created = service.submit(submission()).await.expect("completed");

    let mut invalid = submission();
    invalid.name = Some("Al".to_string());
    let error = service
        .update(&created.id, invalid, created.version)
        .await
        .expect_err("rejected");

    assert_eq!(error.stage(), Stage::Rejected);
    assert_eq!(service.get(&created.id).await.expect("stored"), created);
}

#[tokio::test]
async fn delete_removes_the_applicant() {
    let (service, store) = build_service();
    let created = service.submit(submission()).await.expect("completed");

    service.delete(&created.id).await.expect("deleted");

    assert_eq!(
        service.get(&created.id).await.unwrap_err().code(),
        ErrorCode::NotFound
    );
    assert!(store.is_empty());
}

#[tokio::test]
async fn search_combines_query_parameters() {
    let (service, _store) = build_service();
    service.submit(submission()).await.expect("us");
    service.submit(submission_from("FR")).await.expect("fr");
    let mut hired = submission_from("fr");
    hired.hired = Some(true);
    hired.date_of_birth = Some(date(1999, 9, 9));
    service.submit(hired).await.expect("fr hired");

    let french = ApplicantQuery {
        country_code: Some("fr".to_string()),
        ..ApplicantQuery::default()
    };
    assert_eq!(service.search(&french).await.expect("search").len(), 2);

    let hired_french = ApplicantQuery {
        hired: Some(true),
        ..french.clone()
    };
    assert_eq!(service.search(&hired_french).await.expect("search").len(), 1);

    let born_nineties = ApplicantQuery {
        born_after: Some(date(1990, 1, 1)),
        born_before: Some(date(1999, 12, 31)),
        family_name: Some(" Doherty ".to_string()),
        ..ApplicantQuery::default()
    };
    assert_eq!(service.search(&born_nineties).await.expect("search").len(), 3);

    let everyone = service
        .search(&ApplicantQuery::default())
        .await
        .expect("search");
    assert_eq!(everyone.len(), 3);
}

#[tokio::test]
async fn blank_search_parameters_are_ignored() {
    let (service, _store) = build_service();
    service.submit(submission()).await.expect("us");
    service.submit(submission_from("JP")).await.expect("jp");

    let blank = ApplicantQuery {
        country_code: Some(String::new()),
        family_name: Some("   ".to_string()),
        ..ApplicantQuery::default()
    };

    assert_eq!(blank.to_filter(), ApplicantQuery::default().to_filter());
    assert_eq!(service.search(&blank).await.expect("search").len(), 2);
}
