//! Premium (deep-research) enrichment provider (spec §4.5 tier 4): invoked
//! only when tiers 2+3 land below the acceptance threshold, and subject to a
//! per-batch budget cap enforced by [`crate::engines::enrichment::BatchBudget`].

use async_trait::async_trait;
use serde::Deserialize;

use super::{EnrichmentFill, EnrichmentProvider, ProviderError};
use crate::types::lead::{ContactIdentity, Firmographics};

#[derive(Debug, Deserialize)]
struct DeepResearchResult {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    company_name: Option<String>,
    #[serde(default)]
    company_domain: Option<String>,
    #[serde(default)]
    industry: Option<String>,
    #[serde(default)]
    size_band: Option<String>,
    #[serde(default)]
    funding_signal_recency_days: Option<i64>,
    confidence: f64,
}

pub struct PremiumProvider {
    http: reqwest::Client,
    base_url: String,
}

impl PremiumProvider {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }
}

#[async_trait]
impl EnrichmentProvider for PremiumProvider {
    async fn lookup(&self, partial: &ContactIdentity) -> Result<EnrichmentFill, ProviderError> {
        let Some(email) = partial.email.as_deref().filter(|e| !e.is_empty()) else {
            return Err(ProviderError::NoMatch);
        };

        let response = self
            .http
            .post(format!("{}/v1/deep-research", self.base_url))
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NoMatch);
        }

        let found: DeepResearchResult =
            response.json().await.map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(EnrichmentFill {
            identity: ContactIdentity {
                email: partial.email.clone(),
                first_name: found.first_name,
                last_name: found.last_name,
                title: found.title,
                ..Default::default()
            },
            firmographics: Firmographics {
                company_name: found.company_name,
                company_domain: found.company_domain,
                industry: found.industry,
                size_band: found.size_band,
                funding_signal_recency_days: found.funding_signal_recency_days,
                ..Default::default()
            },
            confidence: found.confidence,
        })
    }
}
