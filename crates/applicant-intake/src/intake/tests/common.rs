use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::intake::country::{
    CountryInfo, CountryLookup, CountryResolver, ResolveError, StaticCountryResolver,
};
use crate::intake::domain::{AddressSubmission, Applicant, ApplicantId, ApplicantSubmission};
use crate::intake::mapping::ApplicantMapper;
use crate::intake::repository::{
    Filter, MemorySession, MemoryStore, QueryResults, Repository, RepositoryError, Store,
};
use crate::intake::service::ApplicantService;
use crate::intake::validation::{ValidationPolicy, Validator};

pub(super) fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn policy() -> ValidationPolicy {
    ValidationPolicy::default().with_reference_date(reference_date())
}

pub(super) fn validator() -> Validator {
    Validator::new(policy())
}

pub(super) fn mapper() -> Arc<ApplicantMapper> {
    Arc::new(ApplicantMapper::compile().expect("applicant mapping table compiles"))
}

pub(super) fn submission() -> ApplicantSubmission {
    ApplicantSubmission {
        name: Some("Jane Doe".to_string()),
        family_name: Some("Doherty".to_string()),
        date_of_birth: Some(date(1990, 1, 1)),
        address: AddressSubmission {
            street: Some("42 Harbour Street".to_string()),
            city: Some("Portland".to_string()),
            postal_code: Some("97201".to_string()),
            country_code: Some("US".to_string()),
        },
        email: Some("Jane.Doherty@Example.com".to_string()),
        phone: Some("+1 503 555 0100".to_string()),
        hired: Some(false),
    }
}

pub(super) fn submission_from(country_code: &str) -> ApplicantSubmission {
    let mut submission = submission();
    submission.address.country_code = Some(country_code.to_string());
    submission
}

pub(super) fn united_states() -> CountryInfo {
    StaticCountryResolver
        .lookup("US")
        .expect("US is in the static table")
}

pub(super) fn resolved_us() -> CountryLookup {
    CountryLookup::Resolved(united_states())
}

pub(super) fn service_with<S>(
    store: Arc<S>,
    resolver: Arc<dyn CountryResolver>,
) -> ApplicantService<S>
where
    S: Store<Applicant>,
{
    ApplicantService::new(store, validator(), resolver, mapper())
}

pub(super) fn build_service() -> (ApplicantService<MemoryStore<Applicant>>, MemoryStore<Applicant>) {
    let store = MemoryStore::new("test");
    let service = service_with(Arc::new(store.clone()), Arc::new(StaticCountryResolver));
    (service, store)
}

pub(super) fn stored_applicant(id: ApplicantId) -> Applicant {
    let mapper = mapper();
    let validated = validator()
        .validate(&submission(), &resolved_us())
        .into_accepted()
        .expect("fixture submission is valid");
    mapper.to_entity(&validated, Some(&united_states()), id)
}

/// Resolver whose provider is always down.
pub(super) struct UnavailableResolver;

#[async_trait]
impl CountryResolver for UnavailableResolver {
    async fn resolve(&self, _code: &str) -> Result<CountryInfo, ResolveError> {
        Err(ResolveError::Unavailable("provider offline".to_string()))
    }
}

/// Memory-backed store that counts `add` calls and can be told to fail them.
#[derive(Clone)]
pub(super) struct InstrumentedStore {
    pub(super) inner: MemoryStore<Applicant>,
    adds: Arc<AtomicUsize>,
    fail_adds: bool,
}

impl InstrumentedStore {
    pub(super) fn recording() -> Self {
        Self {
            inner: MemoryStore::new("instrumented"),
            adds: Arc::new(AtomicUsize::new(0)),
            fail_adds: false,
        }
    }

    pub(super) fn failing_persist() -> Self {
        Self {
            fail_adds: true,
            ..Self::recording()
        }
    }

    pub(super) fn adds(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
    }
}

impl Store<Applicant> for InstrumentedStore {
    type Session = InstrumentedSession;

    fn open_session(&self) -> Result<InstrumentedSession, RepositoryError> {
        Ok(InstrumentedSession {
            inner: self.inner.open_session()?,
            adds: Arc::clone(&self.adds),
            fail_adds: self.fail_adds,
        })
    }
}

pub(super) struct InstrumentedSession {
    inner: MemorySession<Applicant>,
    adds: Arc<AtomicUsize>,
    fail_adds: bool,
}

#[async_trait]
impl Repository<Applicant> for InstrumentedSession {
    async fn add(&self, entity: Applicant) -> Result<ApplicantId, RepositoryError> {
        self.adds.fetch_add(1, Ordering::SeqCst);
        if self.fail_adds {
            return Err(RepositoryError::Unavailable("disk full".to_string()));
        }
        self.inner.add(entity).await
    }

    async fn get(&self, id: &ApplicantId) -> Result<Applicant, RepositoryError> {
        self.inner.get(id).await
    }

    async fn update(&self, id: &ApplicantId, entity: Applicant) -> Result<Applicant, RepositoryError> {
        self.inner.update(id, entity).await
    }

    async fn delete(&self, id: &ApplicantId) -> Result<(), RepositoryError> {
        self.inner.delete(id).await
    }

    async fn query(&self, filter: &Filter) -> Result<QueryResults<Applicant>, RepositoryError> {
        self.inner.query(filter).await
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
