use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use super::{is_well_formed_code, normalize_code, CountryInfo, CountryResolver, ResolveError};

/// Resolver backed by a REST Countries style endpoint (`{base}/alpha/{code}`).
///
/// Only a 404 means the code is unknown. Transport problems, other non-success
/// statuses and bodies without a country name are reported as `Unavailable`;
/// retrying is left to [`super::RetryingResolver`].
pub struct HttpCountryResolver {
    http: Client,
    base_url: String,
}

impl HttpCountryResolver {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ResolveError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("applicant-intake/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| ResolveError::Unavailable(format!("http client setup failed: {err}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, code: &str) -> String {
        format!("{}/alpha/{}", self.base_url, code)
    }
}

#[async_trait]
impl CountryResolver for HttpCountryResolver {
    async fn resolve(&self, code: &str) -> Result<CountryInfo, ResolveError> {
        let code = normalize_code(code);
        if !is_well_formed_code(&code) {
            return Err(ResolveError::NotFound(code));
        }

        let url = self.url_for(&code);
        debug!(%url, "resolving country code");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| ResolveError::Unavailable(format!("request to {url} failed: {err}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ResolveError::NotFound(code));
        }
        if !status.is_success() {
            return Err(ResolveError::Unavailable(format!(
                "country provider answered {status}"
            )));
        }

        let payload: Value = response.json().await.map_err(|err| {
            ResolveError::Unavailable(format!("unreadable country payload: {err}"))
        })?;

        parse_country_payload(&code, &payload).ok_or_else(|| {
            ResolveError::Unavailable(format!("country payload for {code} has no name"))
        })
    }
}

/// Accepts both the object shape (`{"name": "...", "region": "..."}`) and the
/// array shape with nested names (`[{"name": {"common": "..."}, ...}]`).
pub(crate) fn parse_country_payload(code: &str, payload: &Value) -> Option<CountryInfo> {
    let entry = match payload {
        Value::Array(items) => items.first()?,
        other => other,
    };

    let name = match entry.get("name")? {
        Value::String(name) => name.clone(),
        Value::Object(names) => names.get("common")?.as_str()?.to_string(),
        _ => return None,
    };
    let region = entry
        .get("region")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(CountryInfo {
        code: code.to_string(),
        name,
        region,
    })
}
