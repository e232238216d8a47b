mod policy;
mod rules;

pub use policy::ValidationPolicy;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use super::country::CountryLookup;
use super::domain::{schema_position, ApplicantSubmission, FieldValue, SUBMISSION_SCHEMA};
use rules::{RuleContext, RULES};

/// A single failed rule, reported against a submission field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: &'static str,
    pub reason: String,
}

impl Violation {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Submission that passed every rule. Only the validator can build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubmission {
    submission: ApplicantSubmission,
    date_of_birth: NaiveDate,
    hired: bool,
}

impl ValidatedSubmission {
    fn from_checked(submission: &ApplicantSubmission) -> Option<Self> {
        Some(Self {
            date_of_birth: submission.date_of_birth?,
            hired: submission.hired?,
            submission: submission.clone(),
        })
    }

    pub fn field(&self, path: &str) -> Option<FieldValue> {
        self.submission.field(path)
    }

    pub fn date_of_birth(&self) -> NaiveDate {
        self.date_of_birth
    }

    pub fn hired(&self) -> bool {
        self.hired
    }

    pub fn country_code(&self) -> Option<&str> {
        self.submission.address.country_code.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Accepted(ValidatedSubmission),
    Rejected(Vec<Violation>),
}

impl ValidationResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationResult::Accepted(_))
    }

    pub fn into_accepted(self) -> Option<ValidatedSubmission> {
        match self {
            ValidationResult::Accepted(validated) => Some(validated),
            ValidationResult::Rejected(_) => None,
        }
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            ValidationResult::Accepted(_) => &[],
            ValidationResult::Rejected(violations) => violations,
        }
    }
}

/// Runs every rule against a submission and collects all violations in one
/// pass, ordered by the submission schema.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    policy: ValidationPolicy,
}

impl Validator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// `country` is the outcome of resolving the submission's country code;
    /// `CountryLookup::NotFound` becomes a violation on `address.country_code`.
    pub fn validate(
        &self,
        submission: &ApplicantSubmission,
        country: &CountryLookup,
    ) -> ValidationResult {
        let context = RuleContext {
            policy: &self.policy,
            today: self.policy.today(),
            country,
        };

        let mut violations: Vec<Violation> = RULES
            .iter()
            .filter_map(|rule| {
                (rule.check)(submission, &context).err().map(|reason| {
                    debug!(field = rule.field, rule = rule.name, "validation rule failed");
                    Violation::new(rule.field, reason)
                })
            })
            .collect();
        violations.sort_by_key(|violation| {
            schema_position(SUBMISSION_SCHEMA, violation.field).unwrap_or(usize::MAX)
        });

        if !violations.is_empty() {
            return ValidationResult::Rejected(violations);
        }

        match ValidatedSubmission::from_checked(submission) {
            Some(validated) => ValidationResult::Accepted(validated),
            None => ValidationResult::Rejected(missing_required(submission)),
        }
    }
}

fn missing_required(submission: &ApplicantSubmission) -> Vec<Violation> {
    SUBMISSION_SCHEMA
        .iter()
        .filter(|field| field.required && submission.field(field.name).is_none())
        .map(|field| Violation::new(field.name, "is required"))
        .collect()
}
