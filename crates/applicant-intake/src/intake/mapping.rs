//! Table-driven conversion between submissions, applicants and responses.
//!
//! The field table is checked once by [`ApplicantMapper::compile`]; after that
//! mapping is pure and infallible.

use std::collections::{HashMap, HashSet};

use super::country::CountryInfo;
use super::domain::{
    schema_position, AddressView, Applicant, ApplicantId, ApplicantResponse, FieldKind,
    FieldValue, APPLICANT_SCHEMA, SUBMISSION_SCHEMA,
};
use super::repository::INITIAL_VERSION;
use super::validation::ValidatedSubmission;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Identity,
    Trim,
    /// Trim and fold internal runs of whitespace to a single space.
    CollapseWhitespace,
    Lowercase,
    Uppercase,
}

impl Transform {
    fn applies_to(self, kind: FieldKind) -> bool {
        self == Transform::Identity || kind == FieldKind::Text
    }

    fn apply(self, value: FieldValue) -> FieldValue {
        let FieldValue::Text(text) = value else {
            return value;
        };
        let text = match self {
            Transform::Identity => text,
            Transform::Trim => text.trim().to_string(),
            Transform::CollapseWhitespace => text.split_whitespace().collect::<Vec<_>>().join(" "),
            Transform::Lowercase => text.trim().to_lowercase(),
            Transform::Uppercase => text.trim().to_uppercase(),
        };
        FieldValue::Text(text)
    }
}

/// Source path in the submission schema to target field on the applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub source: &'static str,
    pub target: &'static str,
    pub transform: Transform,
}

const fn map(source: &'static str, target: &'static str, transform: Transform) -> FieldMapping {
    FieldMapping {
        source,
        target,
        transform,
    }
}

pub const APPLICANT_MAPPINGS: &[FieldMapping] = &[
    map("name", "name", Transform::CollapseWhitespace),
    map("family_name", "family_name", Transform::CollapseWhitespace),
    map("date_of_birth", "date_of_birth", Transform::Identity),
    map("address.street", "street", Transform::CollapseWhitespace),
    map("address.city", "city", Transform::Trim),
    map("address.postal_code", "postal_code", Transform::Uppercase),
    map("address.country_code", "country_code", Transform::Uppercase),
    map("email", "email", Transform::Lowercase),
    map("phone", "phone", Transform::Trim),
    map("hired", "hired", Transform::Identity),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingConfigError {
    #[error("mapping source '{0}' is not a submission field")]
    UnknownSource(&'static str),
    #[error("mapping target '{0}' is not an applicant field")]
    UnknownTarget(&'static str),
    #[error("applicant field '{0}' is mapped more than once")]
    DuplicateTarget(&'static str),
    #[error("applicant field '{0}' has no mapping")]
    UnmappedTarget(&'static str),
    #[error("'{from}' ({from_kind:?}) cannot feed '{to}' ({to_kind:?})")]
    KindMismatch {
        from: &'static str,
        from_kind: FieldKind,
        to: &'static str,
        to_kind: FieldKind,
    },
    #[error("transform {transform:?} cannot be applied to {kind:?} field '{to}'")]
    TransformMismatch {
        to: &'static str,
        kind: FieldKind,
        transform: Transform,
    },
    #[error("required field '{to}' is fed by optional source '{from}'")]
    OptionalSource {
        from: &'static str,
        to: &'static str,
    },
}

/// Stateless mapper, shared across requests once compiled.
#[derive(Debug, Clone)]
pub struct ApplicantMapper {
    mappings: Vec<FieldMapping>,
}

impl ApplicantMapper {
    /// Check the built-in applicant table.
    pub fn compile() -> Result<Self, MappingConfigError> {
        Self::from_table(APPLICANT_MAPPINGS)
    }

    pub fn from_table(table: &[FieldMapping]) -> Result<Self, MappingConfigError> {
        let mut targets = HashSet::new();

        for mapping in table {
            let source = schema_position(SUBMISSION_SCHEMA, mapping.source)
                .map(|position| SUBMISSION_SCHEMA[position])
                .ok_or(MappingConfigError::UnknownSource(mapping.source))?;
            let target = schema_position(APPLICANT_SCHEMA, mapping.target)
                .map(|position| APPLICANT_SCHEMA[position])
                .ok_or(MappingConfigError::UnknownTarget(mapping.target))?;

            if !targets.insert(mapping.target) {
                return Err(MappingConfigError::DuplicateTarget(mapping.target));
            }
            if source.kind != target.kind {
                return Err(MappingConfigError::KindMismatch {
                    from: source.name,
                    from_kind: source.kind,
                    to: target.name,
                    to_kind: target.kind,
                });
            }
            if !mapping.transform.applies_to(target.kind) {
                return Err(MappingConfigError::TransformMismatch {
                    to: target.name,
                    kind: target.kind,
                    transform: mapping.transform,
                });
            }
            if target.required && !source.required {
                return Err(MappingConfigError::OptionalSource {
                    from: source.name,
                    to: target.name,
                });
            }
        }

        if let Some(unmapped) = APPLICANT_SCHEMA
            .iter()
            .find(|field| !targets.contains(field.name))
        {
            return Err(MappingConfigError::UnmappedTarget(unmapped.name));
        }

        Ok(Self {
            mappings: table.to_vec(),
        })
    }

    pub fn mappings(&self) -> &[FieldMapping] {
        &self.mappings
    }

    /// Build a new applicant at [`INITIAL_VERSION`]. When enrichment is present
    /// its canonical code replaces the submitted one.
    pub fn to_entity(
        &self,
        submission: &ValidatedSubmission,
        country: Option<&CountryInfo>,
        id: ApplicantId,
    ) -> Applicant {
        let mut values: HashMap<&'static str, FieldValue> = self
            .mappings
            .iter()
            .filter_map(|mapping| {
                submission
                    .field(mapping.source)
                    .map(|value| (mapping.target, mapping.transform.apply(value)))
            })
            .collect();

        let date_of_birth = match values.remove("date_of_birth") {
            Some(FieldValue::Date(date)) => date,
            _ => submission.date_of_birth(),
        };
        let hired = match values.remove("hired") {
            Some(FieldValue::Flag(flag)) => flag,
            _ => submission.hired(),
        };
        let mapped_country = take_text(&mut values, "country_code");

        Applicant {
            id,
            version: INITIAL_VERSION,
            name: take_text(&mut values, "name").unwrap_or_default(),
            family_name: take_text(&mut values, "family_name").unwrap_or_default(),
            date_of_birth,
            street: take_text(&mut values, "street").unwrap_or_default(),
            city: take_text(&mut values, "city"),
            postal_code: take_text(&mut values, "postal_code"),
            country_code: country.map(|info| info.code.clone()).or(mapped_country),
            country: country.cloned(),
            email: take_text(&mut values, "email").unwrap_or_default(),
            phone: take_text(&mut values, "phone"),
            hired,
        }
    }

    pub fn to_response(&self, applicant: &Applicant) -> ApplicantResponse {
        ApplicantResponse {
            id: applicant.id,
            version: applicant.version,
            name: applicant.name.clone(),
            family_name: applicant.family_name.clone(),
            date_of_birth: applicant.date_of_birth,
            address: AddressView {
                street: applicant.street.clone(),
                city: applicant.city.clone(),
                postal_code: applicant.postal_code.clone(),
                country_code: applicant.country_code.clone(),
                country_name: applicant.country.as_ref().map(|info| info.name.clone()),
                region: applicant.country.as_ref().map(|info| info.region.clone()),
            },
            email: applicant.email.clone(),
            phone: applicant.phone.clone(),
            hired: applicant.hired,
        }
    }
}

fn take_text(values: &mut HashMap<&'static str, FieldValue>, target: &str) -> Option<String> {
    match values.remove(target) {
        Some(FieldValue::Text(text)) if !text.is_empty() => Some(text),
        _ => None,
    }
}
