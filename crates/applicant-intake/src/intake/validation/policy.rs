use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const DEFAULT_MIN_AGE: u32 = 20;
const DEFAULT_MAX_AGE: u32 = 60;

/// Policy dials consulted by the validation rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    pub min_age: u32,
    pub max_age: u32,
    pub require_country: bool,
    /// Date ages are measured against; `None` means the current UTC date.
    pub reference_date: Option<NaiveDate>,
}

impl ValidationPolicy {
    /// Build a policy, swapping the bounds when they are given in reverse.
    pub fn new(min_age: u32, max_age: u32) -> Self {
        let (min_age, max_age) = if min_age <= max_age {
            (min_age, max_age)
        } else {
            (max_age, min_age)
        };

        Self {
            min_age,
            max_age,
            require_country: true,
            reference_date: None,
        }
    }

    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| chrono::Utc::now().date_naive())
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_AGE, DEFAULT_MAX_AGE)
    }
}
