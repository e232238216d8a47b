//! Country reference-data lookup.
//!
//! Resolvers are shared for the process lifetime and must be safe to call
//! concurrently. `NotFound` is a statement about the code; `Unavailable` is a
//! statement about the provider.

mod http;
mod retry;
mod table;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::HttpCountryResolver;
pub use retry::RetryingResolver;
pub use table::StaticCountryResolver;

/// Canonical descriptive data for a country code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryInfo {
    pub code: String,
    pub name: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("country code '{0}' is not recognised")]
    NotFound(String),
    #[error("country resolver unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait CountryResolver: Send + Sync {
    async fn resolve(&self, code: &str) -> Result<CountryInfo, ResolveError>;
}

/// Outcome of resolving the submission's country code, consumed first by the
/// validator and then by enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountryLookup {
    /// No well-formed code to resolve.
    Skipped,
    Resolved(CountryInfo),
    NotFound,
    Unavailable(String),
}

impl CountryLookup {
    pub(crate) fn from_result(result: Result<CountryInfo, ResolveError>) -> Self {
        match result {
            Ok(info) => CountryLookup::Resolved(info),
            Err(ResolveError::NotFound(_)) => CountryLookup::NotFound,
            Err(ResolveError::Unavailable(reason)) => CountryLookup::Unavailable(reason),
        }
    }
}

/// Two ASCII letters, any case.
pub fn is_well_formed_code(code: &str) -> bool {
    let code = code.trim();
    code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic())
}

pub(crate) fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
