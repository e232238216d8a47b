use std::collections::HashMap;
use std::sync::OnceLock;

use async_trait::async_trait;

use super::{normalize_code, CountryInfo, CountryResolver, ResolveError};

static COUNTRY_TABLE: OnceLock<HashMap<&'static str, (&'static str, &'static str)>> =
    OnceLock::new();

fn country_table() -> &'static HashMap<&'static str, (&'static str, &'static str)> {
    COUNTRY_TABLE.get_or_init(|| {
        const COUNTRIES: &[(&str, &str, &str)] = &[
            // Americas
            ("AR", "Argentina", "Americas"),
            ("BR", "Brazil", "Americas"),
            ("CA", "Canada", "Americas"),
            ("CL", "Chile", "Americas"),
            ("CO", "Colombia", "Americas"),
            ("MX", "Mexico", "Americas"),
            ("PE", "Peru", "Americas"),
            ("US", "United States", "Americas"),
            // Europe
            ("AT", "Austria", "Europe"),
            ("BE", "Belgium", "Europe"),
            ("CH", "Switzerland", "Europe"),
            ("CZ", "Czechia", "Europe"),
            ("DE", "Germany", "Europe"),
            ("DK", "Denmark", "Europe"),
            ("ES", "Spain", "Europe"),
            ("FI", "Finland", "Europe"),
            ("FR", "France", "Europe"),
            ("GB", "United Kingdom", "Europe"),
            ("GR", "Greece", "Europe"),
            ("IE", "Ireland", "Europe"),
            ("IT", "Italy", "Europe"),
            ("NL", "Netherlands", "Europe"),
            ("NO", "Norway", "Europe"),
            ("PL", "Poland", "Europe"),
            ("PT", "Portugal", "Europe"),
            ("RO", "Romania", "Europe"),
            ("SE", "Sweden", "Europe"),
            ("UA", "Ukraine", "Europe"),
            // Asia
            ("CN", "China", "Asia"),
            ("IN", "India", "Asia"),
            ("ID", "Indonesia", "Asia"),
            ("IL", "Israel", "Asia"),
            ("JP", "Japan", "Asia"),
            ("KR", "South Korea", "Asia"),
            ("SG", "Singapore", "Asia"),
            ("TR", "Turkey", "Asia"),
            ("VN", "Vietnam", "Asia"),
            // Africa
            ("EG", "Egypt", "Africa"),
            ("KE", "Kenya", "Africa"),
            ("MA", "Morocco", "Africa"),
            ("NG", "Nigeria", "Africa"),
            ("ZA", "South Africa", "Africa"),
            // Oceania
            ("AU", "Australia", "Oceania"),
            ("NZ", "New Zealand", "Oceania"),
        ];

        COUNTRIES
            .iter()
            .map(|(code, name, region)| (*code, (*name, *region)))
            .collect()
    })
}

/// Resolver backed by a built-in ISO 3166-1 alpha-2 table. Never unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCountryResolver;

impl StaticCountryResolver {
    pub fn lookup(&self, code: &str) -> Option<CountryInfo> {
        let code = normalize_code(code);
        country_table()
            .get(code.as_str())
            .map(|(name, region)| CountryInfo {
                code,
                name: (*name).to_string(),
                region: (*region).to_string(),
            })
    }
}

#[async_trait]
impl CountryResolver for StaticCountryResolver {
    async fn resolve(&self, code: &str) -> Result<CountryInfo, ResolveError> {
        self.lookup(code)
            .ok_or_else(|| ResolveError::NotFound(normalize_code(code)))
    }
}
