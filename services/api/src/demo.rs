use crate::infra::{build_service, ApplicantStore};
use applicant_intake::error::AppError;
use applicant_intake::intake::{
    AddressSubmission, ApplicantResponse, ApplicantSubmission, StaticCountryResolver,
    SubmissionError, ValidationPolicy,
};
use chrono::{Local, NaiveDate};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Date ages are measured against (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Country code used for the rejected submission.
    #[arg(long, default_value = "ZZ")]
    pub(crate) unknown_country: String,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        unknown_country,
    } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    let store = ApplicantStore::new("demo");
    let policy = ValidationPolicy::default().with_reference_date(today);
    let service = build_service(store.clone(), Arc::new(StaticCountryResolver), policy)?;

    println!("Applicant intake demo (reference date {today})");

    println!("\nSubmission with a recognised country (US)");
    let outcome = service.submit(demo_submission("US")).await;
    render_outcome(&outcome);

    println!("\nSubmission with an unrecognised country ({unknown_country})");
    let outcome = service.submit(demo_submission(&unknown_country)).await;
    render_outcome(&outcome);

    println!(
        "\nStore now holds {} applicant(s); {} session(s) open",
        store.len(),
        store.open_sessions()
    );
    Ok(())
}

fn render_outcome(outcome: &Result<ApplicantResponse, SubmissionError>) {
    match outcome {
        Ok(response) => {
            println!("- Completed: applicant {} (version {})", response.id, response.version);
            println!(
                "  Country: {} / {}",
                response.address.country_name.as_deref().unwrap_or("-"),
                response.address.region.as_deref().unwrap_or("-")
            );
        }
        Err(SubmissionError::Rejected(violations)) => {
            println!("- Rejected with {} violation(s):", violations.len());
            for violation in violations {
                println!("    - {}: {}", violation.field, violation.reason);
            }
        }
        Err(err) => {
            println!(
                "- Failed ({}): {err}{}",
                err.code().as_str(),
                if err.is_retryable() { " [retryable]" } else { "" }
            );
        }
    }
}

fn demo_submission(country_code: &str) -> ApplicantSubmission {
    ApplicantSubmission {
        name: Some("Jane Doe".to_string()),
        family_name: Some("Doherty".to_string()),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1),
        address: AddressSubmission {
            street: Some("42 Harbour Street".to_string()),
            city: Some("Portland".to_string()),
            postal_code: Some("97201".to_string()),
            country_code: Some(country_code.to_string()),
        },
        email: Some("jane.doherty@example.com".to_string()),
        phone: None,
        hired: Some(false),
    }
}
