//! Supplement enrichment provider (spec §4.5 tier 3): invoked when a
//! critical sub-domain (e.g. LinkedIn profile & posts) is missing from the
//! primary result; merges in without overwriting higher-confidence fields.

use async_trait::async_trait;
use serde::Deserialize;

use super::{EnrichmentFill, EnrichmentProvider, ProviderError};
use crate::types::lead::{ContactIdentity, Firmographics};

#[derive(Debug, Deserialize)]
struct ScrapeResult {
    #[serde(default)]
    headline: Option<String>,
    #[serde(default)]
    tech_signals: Vec<String>,
    confidence: f64,
}

pub struct SupplementProvider {
    http: reqwest::Client,
    base_url: String,
}

impl SupplementProvider {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }
}

#[async_trait]
impl EnrichmentProvider for SupplementProvider {
    async fn lookup(&self, partial: &ContactIdentity) -> Result<EnrichmentFill, ProviderError> {
        let Some(url) = partial.linkedin_url.as_deref().filter(|u| !u.is_empty()) else {
            return Err(ProviderError::NoMatch);
        };

        let response = self
            .http
            .get(format!("{}/v1/scrape", self.base_url))
            .query(&[("profile_url", url)])
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NoMatch);
        }

        let found: ScrapeResult =
            response.json().await.map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(EnrichmentFill {
            identity: ContactIdentity {
                title: found.headline,
                ..partial.clone()
            },
            firmographics: Firmographics {
                tech_signals: found.tech_signals,
                ..Default::default()
            },
            confidence: found.confidence,
        })
    }
}
