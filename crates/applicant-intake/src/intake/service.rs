use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::country::{is_well_formed_code, CountryInfo, CountryLookup, CountryResolver};
use super::domain::{Applicant, ApplicantId, ApplicantResponse, ApplicantSubmission, FieldValue};
use super::mapping::ApplicantMapper;
use super::repository::{Entity, Filter, Repository, RepositoryError, Store};
use super::validation::{ValidatedSubmission, ValidationResult, Validator, Violation};
use super::ErrorCode;

/// States a single request passes through, in traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Received,
    Validating,
    Rejected,
    Enriching,
    Mapping,
    Persisting,
    Completed,
    Failed,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Validating => "validating",
            Stage::Rejected => "rejected",
            Stage::Enriching => "enriching",
            Stage::Mapping => "mapping",
            Stage::Persisting => "persisting",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Rejected | Stage::Completed | Stage::Failed)
    }
}

/// Forward-only stage cursor for one request.
struct Progress {
    operation: &'static str,
    stage: Stage,
}

impl Progress {
    fn start(operation: &'static str) -> Self {
        debug!(operation, stage = Stage::Received.label(), "pipeline stage");
        Self {
            operation,
            stage: Stage::Received,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(
            next != self.stage && !self.stage.is_terminal(),
            "illegal transition {:?} -> {:?}",
            self.stage,
            next
        );
        self.stage = next;
        debug!(
            operation = self.operation,
            stage = next.label(),
            "pipeline stage"
        );
    }

    fn finish<T>(&mut self, outcome: &Result<T, SubmissionError>) {
        match outcome {
            Ok(_) => self.advance(Stage::Completed),
            Err(error) => {
                if error.is_retryable() {
                    warn!(operation = self.operation, error = %error, "pipeline failed");
                }
                self.advance(error.stage());
            }
        }
    }
}

/// Failure exits of the intake pipeline and the management operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("submission rejected with {} violation(s)", .0.len())]
    Rejected(Vec<Violation>),
    #[error("country resolver unavailable: {0}")]
    ResolverUnavailable(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl SubmissionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SubmissionError::Rejected(_) => ErrorCode::ValidationFailure,
            SubmissionError::ResolverUnavailable(_) => ErrorCode::ResolverUnavailable,
            SubmissionError::Repository(error) => error.code(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            SubmissionError::Rejected(violations) => violations,
            _ => &[],
        }
    }

    /// Terminal stage the pipeline stopped in.
    pub fn stage(&self) -> Stage {
        match self {
            SubmissionError::Rejected(_) => Stage::Rejected,
            _ => Stage::Failed,
        }
    }
}

/// Search parameters accepted by [`ApplicantService::search`]. Date bounds are
/// inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApplicantQuery {
    pub country_code: Option<String>,
    pub hired: Option<bool>,
    pub family_name: Option<String>,
    pub born_after: Option<NaiveDate>,
    pub born_before: Option<NaiveDate>,
}

impl ApplicantQuery {
    pub fn to_filter(&self) -> Filter {
        let mut filter = Filter::all();
        if let Some(code) = non_blank(&self.country_code) {
            filter = filter.equals("country_code", code.to_ascii_uppercase().as_str());
        }
        if let Some(hired) = self.hired {
            filter = filter.equals("hired", hired);
        }
        if let Some(family_name) = non_blank(&self.family_name) {
            let family_name = family_name.split_whitespace().collect::<Vec<_>>().join(" ");
            filter = filter.equals("family_name", family_name.as_str());
        }
        if self.born_after.is_some() || self.born_before.is_some() {
            filter = filter.range(
                "date_of_birth",
                self.born_after.map(FieldValue::Date),
                self.born_before.map(FieldValue::Date),
            );
        }
        filter
    }
}

/// Blank query parameters (`?country_code=`) place no constraint.
fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Composition root of the intake core.
///
/// The validator, resolver and mapper are shared for the process lifetime; a
/// repository session is opened at the start of each operation and released
/// when the operation returns, on every exit path.
pub struct ApplicantService<S> {
    store: Arc<S>,
    validator: Arc<Validator>,
    resolver: Arc<dyn CountryResolver>,
    mapper: Arc<ApplicantMapper>,
}

impl<S> ApplicantService<S>
where
    S: Store<Applicant>,
{
    pub fn new(
        store: Arc<S>,
        validator: Validator,
        resolver: Arc<dyn CountryResolver>,
        mapper: Arc<ApplicantMapper>,
    ) -> Self {
        Self {
            store,
            validator: Arc::new(validator),
            resolver,
            mapper,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Open and immediately release a session; used for readiness checks.
    pub fn probe(&self) -> Result<(), RepositoryError> {
        self.store.open_session().map(drop)
    }

    /// Run a new submission through validation, enrichment, mapping and
    /// persistence.
    pub async fn submit(
        &self,
        submission: ApplicantSubmission,
    ) -> Result<ApplicantResponse, SubmissionError> {
        let mut progress = Progress::start("submit");
        let outcome = self.run_submit(&mut progress, &submission).await;
        progress.finish(&outcome);

        if let Ok(response) = &outcome {
            info!(applicant_id = %response.id, "applicant stored");
        }
        outcome
    }

    async fn run_submit(
        &self,
        progress: &mut Progress,
        submission: &ApplicantSubmission,
    ) -> Result<ApplicantResponse, SubmissionError> {
        let session = self.store.open_session()?;
        let (validated, country) = self.prepare(progress, submission).await?;

        let applicant = self
            .mapper
            .to_entity(&validated, country.as_ref(), ApplicantId::generate());

        progress.advance(Stage::Persisting);
        session.add(applicant.clone()).await?;
        Ok(self.mapper.to_response(&applicant))
    }

    pub async fn get(&self, id: &ApplicantId) -> Result<ApplicantResponse, SubmissionError> {
        let session = self.store.open_session()?;
        let applicant = session.get(id).await?;
        Ok(self.mapper.to_response(&applicant))
    }

    /// Replace an applicant's data. Identity is preserved; `expected_version`
    /// must match the stored version.
    pub async fn update(
        &self,
        id: &ApplicantId,
        submission: ApplicantSubmission,
        expected_version: u64,
    ) -> Result<ApplicantResponse, SubmissionError> {
        let mut progress = Progress::start("update");
        let outcome = self
            .run_update(&mut progress, id, &submission, expected_version)
            .await;
        progress.finish(&outcome);

        if let Ok(response) = &outcome {
            info!(applicant_id = %response.id, version = response.version, "applicant updated");
        }
        outcome
    }

    async fn run_update(
        &self,
        progress: &mut Progress,
        id: &ApplicantId,
        submission: &ApplicantSubmission,
        expected_version: u64,
    ) -> Result<ApplicantResponse, SubmissionError> {
        let session = self.store.open_session()?;
        let (validated, country) = self.prepare(progress, submission).await?;

        let mut applicant = self.mapper.to_entity(&validated, country.as_ref(), *id);
        applicant.set_version(expected_version);

        progress.advance(Stage::Persisting);
        let stored = session.update(id, applicant).await?;
        Ok(self.mapper.to_response(&stored))
    }

    pub async fn delete(&self, id: &ApplicantId) -> Result<(), SubmissionError> {
        let session = self.store.open_session()?;
        session.delete(id).await?;
        info!(applicant_id = %id, "applicant deleted");
        Ok(())
    }

    pub async fn search(
        &self,
        query: &ApplicantQuery,
    ) -> Result<Vec<ApplicantResponse>, SubmissionError> {
        let session = self.store.open_session()?;
        let results = session.query(&query.to_filter()).await?;
        Ok(results
            .map(|applicant| self.mapper.to_response(&applicant))
            .collect())
    }

    /// Validating and Enriching. Leaves the cursor in Mapping.
    async fn prepare(
        &self,
        progress: &mut Progress,
        submission: &ApplicantSubmission,
    ) -> Result<(ValidatedSubmission, Option<CountryInfo>), SubmissionError> {
        progress.advance(Stage::Validating);
        let lookup = self.lookup_country(submission).await;
        let validated = match self.validator.validate(submission, &lookup) {
            ValidationResult::Accepted(validated) => validated,
            ValidationResult::Rejected(violations) => {
                return Err(SubmissionError::Rejected(violations))
            }
        };

        progress.advance(Stage::Enriching);
        let country = match lookup {
            CountryLookup::Resolved(info) => Some(info),
            CountryLookup::Skipped => None,
            CountryLookup::Unavailable(reason) => {
                return Err(SubmissionError::ResolverUnavailable(reason))
            }
            CountryLookup::NotFound => {
                return Err(SubmissionError::Rejected(vec![Violation::new(
                    "address.country_code",
                    "is not a recognised country",
                )]))
            }
        };

        progress.advance(Stage::Mapping);
        Ok((validated, country))
    }

    async fn lookup_country(&self, submission: &ApplicantSubmission) -> CountryLookup {
        let code = submission
            .address
            .country_code
            .as_deref()
            .map(str::trim)
            .filter(|code| is_well_formed_code(code));

        match code {
            Some(code) => CountryLookup::from_result(self.resolver.resolve(code).await),
            None => CountryLookup::Skipped,
        }
    }
}
