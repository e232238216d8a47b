//! End-to-end behavior of the intake pipeline through the public service
//! facade, the HTTP router and a stub country provider.

mod common {
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use applicant_intake::intake::{
        AddressSubmission, Applicant, ApplicantMapper, ApplicantService, ApplicantSubmission,
        CountryResolver, MemoryStore, ValidationPolicy, Validator,
    };
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use chrono::NaiveDate;
    use serde_json::json;

    pub(super) fn submission(country_code: &str) -> ApplicantSubmission {
        ApplicantSubmission {
            name: Some("Jane Doe".to_string()),
            family_name: Some("Doherty".to_string()),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1),
            address: AddressSubmission {
                street: Some("42 Harbour Street".to_string()),
                city: Some("Portland".to_string()),
                postal_code: None,
                country_code: Some(country_code.to_string()),
            },
            email: Some("jane.doherty@example.com".to_string()),
            phone: None,
            hired: Some(true),
        }
    }

    pub(super) fn service(
        store: MemoryStore<Applicant>,
        resolver: Arc<dyn CountryResolver>,
    ) -> ApplicantService<MemoryStore<Applicant>> {
        let policy = ValidationPolicy::default()
            .with_reference_date(NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date"));
        ApplicantService::new(
            Arc::new(store),
            Validator::new(policy),
            resolver,
            Arc::new(ApplicantMapper::compile().expect("mapping table compiles")),
        )
    }

    /// REST Countries style stub: `US` resolves, `ZZ` is unknown, `GB` answers
    /// 200 with a body that carries no country, and every other code answers
    /// 503.
    #[derive(Clone, Default)]
    pub(super) struct StubProvider {
        pub(super) hits: Arc<AtomicUsize>,
    }

    impl StubProvider {
        pub(super) async fn spawn(&self) -> SocketAddr {
            let app = Router::new()
                .route("/alpha/:code", get(alpha))
                .with_state(self.clone());
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind stub provider");
            let addr = listener.local_addr().expect("local addr");
            tokio::spawn(async move {
                axum::serve(listener, app).await.expect("stub provider runs");
            });
            addr
        }

        pub(super) fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    async fn alpha(State(stub): State<StubProvider>, Path(code): Path<String>) -> Response {
        stub.hits.fetch_add(1, Ordering::SeqCst);
        match code.as_str() {
            "US" => Json(json!([{
                "name": { "common": "United States", "official": "United States of America" },
                "region": "Americas"
            }]))
            .into_response(),
            "ZZ" => StatusCode::NOT_FOUND.into_response(),
            "GB" => Json(json!({ "message": "upstream schema changed" })).into_response(),
            _ => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        }
    }
}

use std::sync::Arc;
use std::time::Duration;

use applicant_intake::intake::{
    applicant_router, Applicant, ApplicantQuery, CountryResolver, ErrorCode, HttpCountryResolver,
    MemoryStore, ResolveError, RetryingResolver, Stage, StaticCountryResolver, SubmissionError,
};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::*;
use tower::ServiceExt;

fn remote_resolver(base: String) -> Arc<dyn CountryResolver> {
    let http = HttpCountryResolver::new(base, Duration::from_millis(500)).expect("client builds");
    Arc::new(RetryingResolver::with_defaults(Arc::new(http)))
}

#[tokio::test]
async fn recognised_country_completes_and_is_readable() {
    let store = MemoryStore::<Applicant>::new("integration");
    let service = service(store.clone(), Arc::new(StaticCountryResolver));

    let created = service.submit(submission("us")).await.expect("completed");
    let fetched = service.get(&created.id).await.expect("readable");

    assert_eq!(created, fetched);
    assert_eq!(created.address.country_code.as_deref(), Some("US"));
    assert_eq!(store.len(), 1);
    assert_eq!(store.open_sessions(), 0);
}

#[tokio::test]
async fn unrecognised_country_is_rejected_and_nothing_is_stored() {
    let store = MemoryStore::<Applicant>::new("integration");
    let service = service(store.clone(), Arc::new(StaticCountryResolver));

    let error = service.submit(submission("ZZ")).await.expect_err("rejected");

    assert_eq!(error.stage(), Stage::Rejected);
    assert_eq!(error.violations()[0].field, "address.country_code");
    assert!(store.is_empty());
    let everyone = service
        .search(&ApplicantQuery::default())
        .await
        .expect("search");
    assert!(everyone.is_empty());
}

#[tokio::test]
async fn http_provider_enriches_submissions() {
    let stub = StubProvider::default();
    let addr = stub.spawn().await;
    let store = MemoryStore::<Applicant>::new("integration");
    let service = service(store, remote_resolver(format!("http://{addr}")));

    let created = service.submit(submission("US")).await.expect("completed");

    assert_eq!(created.address.country_name.as_deref(), Some("United States"));
    assert_eq!(created.address.region.as_deref(), Some("Americas"));
    assert_eq!(stub.hits(), 1);
}

#[tokio::test]
async fn http_not_found_is_final_and_rejects() {
    let stub = StubProvider::default();
    let addr = stub.spawn().await;
    let resolver = remote_resolver(format!("http://{addr}/"));

    let result = resolver.resolve("zz").await;
    assert_eq!(result, Err(ResolveError::NotFound("ZZ".to_string())));
    assert_eq!(stub.hits(), 1);

    let service = service(MemoryStore::new("integration"), resolver);
    let error = service.submit(submission("ZZ")).await.expect_err("rejected");
    assert_eq!(error.code(), ErrorCode::ValidationFailure);
}

#[tokio::test]
async fn provider_outage_is_retried_then_surfaced() {
    let stub = StubProvider::default();
    let addr = stub.spawn().await;
    let store = MemoryStore::<Applicant>::new("integration");
    let service = service(store.clone(), remote_resolver(format!("http://{addr}")));

    let error = service.submit(submission("FR")).await.expect_err("failed");

    assert!(matches!(error, SubmissionError::ResolverUnavailable(_)));
    assert!(error.is_retryable());
    assert_eq!(stub.hits(), RetryingResolver::DEFAULT_ATTEMPTS as usize);
    assert!(store.is_empty());
}

#[tokio::test]
async fn nameless_provider_payload_is_an_outage_not_an_unknown_country() {
    let stub = StubProvider::default();
    let addr = stub.spawn().await;
    let resolver = remote_resolver(format!("http://{addr}"));

    let result = resolver.resolve("GB").await;
    assert!(matches!(result, Err(ResolveError::Unavailable(_))));
    assert_eq!(stub.hits(), RetryingResolver::DEFAULT_ATTEMPTS as usize);

    let store = MemoryStore::<Applicant>::new("integration");
    let service = service(store.clone(), resolver);
    let error = service.submit(submission("GB")).await.expect_err("failed");

    assert!(matches!(error, SubmissionError::ResolverUnavailable(_)));
    assert_eq!(error.stage(), Stage::Failed);
    assert!(error.violations().is_empty());
    assert!(store.is_empty());
}

#[tokio::test]
async fn router_serves_the_full_lifecycle() {
    let service = service(
        MemoryStore::new("integration"),
        Arc::new(StaticCountryResolver),
    );
    let app = applicant_router(Arc::new(service));

    let body = serde_json::to_vec(&submission("DE")).expect("serializes");
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/v1/applicants")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);

    let listed = app
        .oneshot(
            Request::get("/api/v1/applicants?hired=true&country_code=DE")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(listed.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(listed.into_body(), 64 * 1024)
        .await
        .expect("body");
    let listed: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert_eq!(listed[0]["address"]["region"], "Europe");
}
