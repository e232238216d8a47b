//! Applicant intake: validation, country enrichment, mapping and persistence.
//!
//! Requests flow through [`ApplicantService`], which composes a [`Validator`],
//! a shared [`CountryResolver`], the compiled [`ApplicantMapper`] and a
//! per-request repository session opened from a [`Store`].

pub mod country;
pub mod domain;
pub mod mapping;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

pub use country::{
    CountryInfo, CountryLookup, CountryResolver, HttpCountryResolver, ResolveError,
    RetryingResolver, StaticCountryResolver,
};
pub use domain::{
    AddressSubmission, AddressView, Applicant, ApplicantId, ApplicantResponse,
    ApplicantSubmission, FieldKind, FieldValue,
};
pub use mapping::{ApplicantMapper, FieldMapping, MappingConfigError, Transform};
pub use repository::{
    Entity, Filter, MemorySession, MemoryStore, QueryResults, Repository, RepositoryError, Store,
};
pub use router::{applicant_router, UpdateRequest};
pub use service::{ApplicantQuery, ApplicantService, Stage, SubmissionError};
pub use validation::{
    ValidatedSubmission, ValidationPolicy, ValidationResult, Validator, Violation,
};

/// Classification shared by every failure the intake core reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ValidationFailure,
    NotFound,
    Conflict,
    StoreUnavailable,
    ResolverUnavailable,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ValidationFailure => "validation_failure",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Conflict => "conflict",
            ErrorCode::StoreUnavailable => "store_unavailable",
            ErrorCode::ResolverUnavailable => "resolver_unavailable",
        }
    }

    /// Transient failures a caller may retry unchanged.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorCode::StoreUnavailable | ErrorCode::ResolverUnavailable
        )
    }
}
