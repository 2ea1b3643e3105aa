//! Primary enrichment provider (spec §4.5 tier 2): lookup by email, then
//! LinkedIn URL, then (name, company domain).

use async_trait::async_trait;
use serde::Deserialize;

use super::{EnrichmentFill, EnrichmentProvider, ProviderError};
use crate::types::lead::{ContactIdentity, Firmographics};

#[derive(Debug, Deserialize)]
struct PersonMatch {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    company_name: Option<String>,
    #[serde(default)]
    company_domain: Option<String>,
    #[serde(default)]
    industry: Option<String>,
    #[serde(default)]
    size_band: Option<String>,
    confidence: f64,
}

pub struct PrimaryProvider {
    http: reqwest::Client,
    base_url: String,
}

impl PrimaryProvider {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<PersonMatch, ProviderError> {
        let response = self
            .http
            .get(format!("{}/v1/person-match", self.base_url))
            .query(params)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NoMatch);
        }
        response.json().await.map_err(|e| ProviderError::Transport(e.to_string()))
    }
}

#[async_trait]
impl EnrichmentProvider for PrimaryProvider {
    async fn lookup(&self, partial: &ContactIdentity) -> Result<EnrichmentFill, ProviderError> {
        let found = if let Some(email) = partial.email.as_deref().filter(|e| !e.is_empty()) {
            self.query(&[("email", email)]).await
        } else if let Some(url) = partial.linkedin_url.as_deref().filter(|u| !u.is_empty()) {
            self.query(&[("linkedin_url", url)]).await
        } else if let (Some(first), Some(last)) = (&partial.first_name, &partial.last_name) {
            self.query(&[("first_name", first), ("last_name", last)]).await
        } else {
            Err(ProviderError::NoMatch)
        }?;

        Ok(EnrichmentFill {
            identity: ContactIdentity {
                email: partial.email.clone(),
                phone: found.phone,
                linkedin_url: partial.linkedin_url.clone(),
                first_name: found.first_name,
                last_name: found.last_name,
                title: found.title,
            },
            firmographics: Firmographics {
                company_name: found.company_name,
                company_domain: found.company_domain,
                industry: found.industry,
                size_band: found.size_band,
                ..Default::default()
            },
            confidence: found.confidence,
        })
    }
}
