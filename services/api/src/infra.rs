use applicant_intake::config::{AppConfig, ResolverConfig, StoreConfig, StoreTarget};
use applicant_intake::error::AppError;
use applicant_intake::intake::{
    Applicant, ApplicantMapper, ApplicantService, CountryResolver, HttpCountryResolver,
    MemoryStore, RetryingResolver, StaticCountryResolver, ValidationPolicy, Validator,
};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

pub(crate) type ApplicantStore = MemoryStore<Applicant>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) service: Arc<ApplicantService<ApplicantStore>>,
}

pub(crate) fn build_store(config: &StoreConfig) -> ApplicantStore {
    match &config.target {
        StoreTarget::Memory { name } => MemoryStore::new(name.clone()),
    }
}

/// Remote provider behind the retry wrapper when an endpoint is configured,
/// otherwise the built-in table.
pub(crate) fn build_resolver(
    config: &ResolverConfig,
) -> Result<Arc<dyn CountryResolver>, AppError> {
    let Some(endpoint) = &config.endpoint else {
        info!("country resolver: built-in table");
        return Ok(Arc::new(StaticCountryResolver));
    };

    let http = HttpCountryResolver::new(endpoint.clone(), config.timeout)?;
    info!(%endpoint, attempts = config.attempts, "country resolver: remote");
    Ok(Arc::new(RetryingResolver::new(
        Arc::new(http),
        config.attempts,
        config.timeout,
    )))
}

/// Compose the intake service. A malformed mapping table aborts startup.
pub(crate) fn build_service(
    store: ApplicantStore,
    resolver: Arc<dyn CountryResolver>,
    policy: ValidationPolicy,
) -> Result<ApplicantService<ApplicantStore>, AppError> {
    let mapper = Arc::new(ApplicantMapper::compile()?);
    Ok(ApplicantService::new(
        Arc::new(store),
        Validator::new(policy),
        resolver,
        mapper,
    ))
}

pub(crate) fn service_from_config(
    config: &AppConfig,
) -> Result<ApplicantService<ApplicantStore>, AppError> {
    let store = build_store(&config.store);
    let resolver = build_resolver(&config.resolver)?;
    build_service(store, resolver, config.intake.policy())
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
