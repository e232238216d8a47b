use super::common::*;
use crate::intake::country::CountryLookup;
use crate::intake::domain::ApplicantId;
use crate::intake::repository::INITIAL_VERSION;

#[test]
fn to_entity_applies_field_transforms() {
    let mut submission = submission();
    submission.name = Some("  Jane   Doe ".to_string());
    submission.address.postal_code = Some(" sw1a 1aa ".to_string());
    let validated = validator()
        .validate(&submission, &resolved_us())
        .into_accepted()
        .expect("valid submission");

    let id = ApplicantId::generate();
    let applicant = mapper().to_entity(&validated, Some(&united_states()), id);

    assert_eq!(applicant.id, id);
    assert_eq!(applicant.version, INITIAL_VERSION);
    assert_eq!(applicant.name, "Jane Doe");
    assert_eq!(applicant.email, "jane.doherty@example.com");
    assert_eq!(applicant.postal_code.as_deref(), Some("SW1A 1AA"));
    assert_eq!(applicant.date_of_birth, date(1990, 1, 1));
    assert!(!applicant.hired);
}

#[test]
fn enrichment_supplies_the_canonical_country() {
    let validated = validator()
        .validate(&submission_from(" us "), &resolved_us())
        .into_accepted()
        .expect("valid submission");

    let applicant = mapper().to_entity(&validated, Some(&united_states()), ApplicantId::generate());

    assert_eq!(applicant.country_code.as_deref(), Some("US"));
    assert_eq!(applicant.country, Some(united_states()));
}

#[test]
fn response_flattens_country_details_into_the_address() {
    let applicant = stored_applicant(ApplicantId::generate());
    let response = mapper().to_response(&applicant);

    assert_eq!(response.id, applicant.id);
    assert_eq!(response.address.street, "42 Harbour Street");
    assert_eq!(response.address.country_code.as_deref(), Some("US"));
    assert_eq!(response.address.country_name.as_deref(), Some("United States"));
    assert_eq!(response.address.region.as_deref(), Some("Americas"));
}

#[test]
fn optional_fields_stay_absent_without_enrichment() {
    let mut policy = policy();
    policy.require_country = false;
    let mut submission = submission();
    submission.address.country_code = None;
    submission.address.city = None;
    submission.phone = None;

    let validated = crate::intake::validation::Validator::new(policy)
        .validate(&submission, &CountryLookup::Skipped)
        .into_accepted()
        .expect("valid submission");
    let applicant = mapper().to_entity(&validated, None, ApplicantId::generate());
    let json = serde_json::to_value(mapper().to_response(&applicant)).expect("serializes");

    assert!(applicant.country.is_none());
    assert!(json["address"].get("country_code").is_none());
    assert!(json["address"].get("city").is_none());
    assert!(json.get("phone").is_none());
}
