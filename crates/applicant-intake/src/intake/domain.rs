use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::country::CountryInfo;
use super::repository::Entity;

/// Identifier assigned to an applicant when it is first stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantId(pub Uuid);

impl ApplicantId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ApplicantId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim()).map(Self)
    }
}

/// Address block of an inbound submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressSubmission {
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country_code: Option<String>,
}

/// Applicant payload as received from the transport, before any rule has run.
///
/// Every field is optional at this stage so that missing values surface as
/// violations instead of deserialization failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicantSubmission {
    pub name: Option<String>,
    pub family_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: AddressSubmission,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub hired: Option<bool>,
}

impl ApplicantSubmission {
    /// Read a field by its schema path (e.g. `address.country_code`).
    pub fn field(&self, path: &str) -> Option<FieldValue> {
        let text = |value: &Option<String>| value.clone().map(FieldValue::Text);
        match path {
            "name" => text(&self.name),
            "family_name" => text(&self.family_name),
            "date_of_birth" => self.date_of_birth.map(FieldValue::Date),
            "address.street" => text(&self.address.street),
            "address.city" => text(&self.address.city),
            "address.postal_code" => text(&self.address.postal_code),
            "address.country_code" => text(&self.address.country_code),
            "email" => text(&self.email),
            "phone" => text(&self.phone),
            "hired" => self.hired.map(FieldValue::Flag),
            _ => None,
        }
    }
}

/// Scalar value carried by a schema field; shared by mapping and query filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Date(NaiveDate),
    Text(String),
}

impl FieldValue {
    pub const fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Flag(_) => FieldKind::Flag,
            FieldValue::Date(_) => FieldKind::Date,
            FieldValue::Text(_) => FieldKind::Text,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Ordering between values of the same kind; `None` across kinds.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Flag(a), FieldValue::Flag(b)) => Some(a.cmp(b)),
            (FieldValue::Date(a), FieldValue::Date(b)) => Some(a.cmp(b)),
            (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Date,
    Flag,
}

/// Declared field of a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn field_spec(name: &'static str, kind: FieldKind, required: bool) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required,
    }
}

/// Submission schema in declaration order. Violations are reported in this order.
pub const SUBMISSION_SCHEMA: &[FieldSpec] = &[
    field_spec("name", FieldKind::Text, true),
    field_spec("family_name", FieldKind::Text, true),
    field_spec("date_of_birth", FieldKind::Date, true),
    field_spec("address.street", FieldKind::Text, true),
    field_spec("address.city", FieldKind::Text, false),
    field_spec("address.postal_code", FieldKind::Text, false),
    field_spec("address.country_code", FieldKind::Text, false),
    field_spec("email", FieldKind::Text, true),
    field_spec("phone", FieldKind::Text, false),
    field_spec("hired", FieldKind::Flag, true),
];

/// Applicant fields populated from the submission through the mapping table.
pub const APPLICANT_SCHEMA: &[FieldSpec] = &[
    field_spec("name", FieldKind::Text, true),
    field_spec("family_name", FieldKind::Text, true),
    field_spec("date_of_birth", FieldKind::Date, true),
    field_spec("street", FieldKind::Text, true),
    field_spec("city", FieldKind::Text, false),
    field_spec("postal_code", FieldKind::Text, false),
    field_spec("country_code", FieldKind::Text, false),
    field_spec("email", FieldKind::Text, true),
    field_spec("phone", FieldKind::Text, false),
    field_spec("hired", FieldKind::Flag, true),
];

pub(crate) fn schema_position(schema: &[FieldSpec], name: &str) -> Option<usize> {
    schema.iter().position(|field| field.name == name)
}

/// Persisted applicant. Identity never changes once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: ApplicantId,
    pub version: u64,
    pub name: String,
    pub family_name: String,
    pub date_of_birth: NaiveDate,
    pub street: String,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country_code: Option<String>,
    pub country: Option<CountryInfo>,
    pub email: String,
    pub phone: Option<String>,
    pub hired: bool,
}

impl Entity for Applicant {
    type Id = ApplicantId;

    const KIND: &'static str = "applicant";

    fn id(&self) -> &ApplicantId {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let text = |value: &Option<String>| value.clone().map(FieldValue::Text);
        match name {
            "name" => Some(FieldValue::Text(self.name.clone())),
            "family_name" => Some(FieldValue::Text(self.family_name.clone())),
            "date_of_birth" => Some(FieldValue::Date(self.date_of_birth)),
            "street" => Some(FieldValue::Text(self.street.clone())),
            "city" => text(&self.city),
            "postal_code" => text(&self.postal_code),
            "country_code" => text(&self.country_code),
            "region" => self
                .country
                .as_ref()
                .map(|country| FieldValue::Text(country.region.clone())),
            "email" => Some(FieldValue::Text(self.email.clone())),
            "phone" => text(&self.phone),
            "hired" => Some(FieldValue::Flag(self.hired)),
            _ => None,
        }
    }
}

/// Address section of the outward-facing applicant shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressView {
    pub street: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Response shape returned to callers; the stored entity never leaves the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantResponse {
    pub id: ApplicantId,
    pub version: u64,
    pub name: String,
    pub family_name: String,
    pub date_of_birth: NaiveDate,
    pub address: AddressView,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub hired: bool,
}
