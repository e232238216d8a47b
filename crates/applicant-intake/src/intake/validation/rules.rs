use chrono::NaiveDate;

use super::super::country::{is_well_formed_code, normalize_code, CountryLookup};
use super::super::domain::ApplicantSubmission;
use super::policy::ValidationPolicy;

const MIN_NAME_CHARS: usize = 5;
const MIN_STREET_CHARS: usize = 10;
const MIN_PHONE_DIGITS: usize = 6;
const MAX_PHONE_DIGITS: usize = 20;

pub(crate) struct RuleContext<'a> {
    pub policy: &'a ValidationPolicy,
    pub today: NaiveDate,
    pub country: &'a CountryLookup,
}

type Check = fn(&ApplicantSubmission, &RuleContext<'_>) -> Result<(), String>;

/// One declarative check bound to the submission field it reports against.
pub(crate) struct Rule {
    pub field: &'static str,
    pub name: &'static str,
    pub check: Check,
}

const fn rule(field: &'static str, name: &'static str, check: Check) -> Rule {
    Rule { field, name, check }
}

pub(crate) const RULES: &[Rule] = &[
    rule("name", "required", name_present),
    rule("name", "min_length", name_length),
    rule("family_name", "required", family_name_present),
    rule("family_name", "min_length", family_name_length),
    rule("date_of_birth", "required", birth_date_present),
    rule("date_of_birth", "not_in_future", birth_date_not_in_future),
    rule("date_of_birth", "age_range", age_within_policy),
    rule("address.street", "required", street_present),
    rule("address.street", "min_length", street_length),
    rule("address.city", "not_blank", city_not_blank),
    rule("address.postal_code", "not_blank", postal_code_not_blank),
    rule("address.country_code", "required", country_code_present),
    rule("address.country_code", "format", country_code_format),
    rule("address.country_code", "resolves", country_code_resolves),
    rule("email", "required", email_present),
    rule("email", "format", email_format),
    rule("phone", "not_blank", phone_not_blank),
    rule("phone", "format", phone_format),
    rule("hired", "required", hired_present),
];

fn trimmed(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn required_text(value: &Option<String>) -> Result<(), String> {
    trimmed(value)
        .map(|_| ())
        .ok_or_else(|| "is required".to_string())
}

fn min_chars(value: &Option<String>, min: usize) -> Result<(), String> {
    match trimmed(value) {
        Some(text) if text.chars().count() < min => {
            Err(format!("must be at least {min} characters"))
        }
        _ => Ok(()),
    }
}

fn not_blank_when_present(value: &Option<String>) -> Result<(), String> {
    match value {
        Some(text) if text.trim().is_empty() => Err("must not be blank".to_string()),
        _ => Ok(()),
    }
}

fn name_present(s: &ApplicantSubmission, _: &RuleContext<'_>) -> Result<(), String> {
    required_text(&s.name)
}

fn name_length(s: &ApplicantSubmission, _: &RuleContext<'_>) -> Result<(), String> {
    min_chars(&s.name, MIN_NAME_CHARS)
}

fn family_name_present(s: &ApplicantSubmission, _: &RuleContext<'_>) -> Result<(), String> {
    required_text(&s.family_name)
}

fn family_name_length(s: &ApplicantSubmission, _: &RuleContext<'_>) -> Result<(), String> {
    min_chars(&s.family_name, MIN_NAME_CHARS)
}

fn birth_date_present(s: &ApplicantSubmission, _: &RuleContext<'_>) -> Result<(), String> {
    s.date_of_birth
        .map(|_| ())
        .ok_or_else(|| "is required".to_string())
}

fn street_present(s: &ApplicantSubmission, _: &RuleContext<'_>) -> Result<(), String> {
    required_text(&s.address.street)
}

fn street_length(s: &ApplicantSubmission, _: &RuleContext<'_>) -> Result<(), String> {
    min_chars(&s.address.street, MIN_STREET_CHARS)
}

fn city_not_blank(s: &ApplicantSubmission, _: &RuleContext<'_>) -> Result<(), String> {
    not_blank_when_present(&s.address.city)
}

fn postal_code_not_blank(s: &ApplicantSubmission, _: &RuleContext<'_>) -> Result<(), String> {
    not_blank_when_present(&s.address.postal_code)
}

fn country_code_present(s: &ApplicantSubmission, ctx: &RuleContext<'_>) -> Result<(), String> {
    if ctx.policy.require_country {
        required_text(&s.address.country_code)
    } else {
        not_blank_when_present(&s.address.country_code)
    }
}

fn email_present(s: &ApplicantSubmission, _: &RuleContext<'_>) -> Result<(), String> {
    required_text(&s.email)
}

fn email_format(s: &ApplicantSubmission, _: &RuleContext<'_>) -> Result<(), String> {
    match trimmed(&s.email) {
        Some(email) if !is_well_formed_email(email) => {
            Err("must be a valid e-mail address".to_string())
        }
        _ => Ok(()),
    }
}

fn phone_not_blank(s: &ApplicantSubmission, _: &RuleContext<'_>) -> Result<(), String> {
    not_blank_when_present(&s.phone)
}

fn phone_format(s: &ApplicantSubmission, _: &RuleContext<'_>) -> Result<(), String> {
    match trimmed(&s.phone) {
        Some(phone) if !is_well_formed_phone(phone) => Err(format!(
            "must contain {MIN_PHONE_DIGITS}-{MAX_PHONE_DIGITS} digits and only phone punctuation"
        )),
        _ => Ok(()),
    }
}

fn hired_present(s: &ApplicantSubmission, _: &RuleContext<'_>) -> Result<(), String> {
    s.hired
        .map(|_| ())
        .ok_or_else(|| "must be explicitly true or false".to_string())
}

fn birth_date_not_in_future(
    submission: &ApplicantSubmission,
    ctx: &RuleContext<'_>,
) -> Result<(), String> {
    match submission.date_of_birth {
        Some(date) if date > ctx.today => Err("must not be in the future".to_string()),
        _ => Ok(()),
    }
}

fn age_within_policy(
    submission: &ApplicantSubmission,
    ctx: &RuleContext<'_>,
) -> Result<(), String> {
    let Some(date) = submission.date_of_birth else {
        return Ok(());
    };
    // Future dates are reported by their own rule.
    let Some(age) = ctx.today.years_since(date) else {
        return Ok(());
    };

    if age < ctx.policy.min_age || age > ctx.policy.max_age {
        return Err(format!(
            "age {age} is outside the accepted range {}-{}",
            ctx.policy.min_age, ctx.policy.max_age
        ));
    }
    Ok(())
}

fn country_code_format(
    submission: &ApplicantSubmission,
    _ctx: &RuleContext<'_>,
) -> Result<(), String> {
    match trimmed(&submission.address.country_code) {
        Some(code) if !is_well_formed_code(code) => {
            Err("must be a two-letter ISO 3166-1 code".to_string())
        }
        _ => Ok(()),
    }
}

fn country_code_resolves(
    submission: &ApplicantSubmission,
    ctx: &RuleContext<'_>,
) -> Result<(), String> {
    match (ctx.country, trimmed(&submission.address.country_code)) {
        (CountryLookup::NotFound, Some(code)) => Err(format!(
            "'{}' is not a recognised country",
            normalize_code(code)
        )),
        _ => Ok(()),
    }
}

pub(crate) fn is_well_formed_email(value: &str) -> bool {
    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

pub(crate) fn is_well_formed_phone(value: &str) -> bool {
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')');
    if !value.chars().all(allowed) {
        return false;
    }
    let digits = value.chars().filter(char::is_ascii_digit).count();
    (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits)
}
