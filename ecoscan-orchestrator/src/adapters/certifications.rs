//! Certification registry adapter
//!
//! Live: `GET {endpoint}/certifications?q=[&brand=]` returning
//! `{certifications: [{name, verified}]}`. Only verified entries with a known
//! canonical id are kept.
//!
//! Fallback: certification keywords in the name/brand plus the certifications
//! of a known eco brand.

use super::http::HttpProvider;
use crate::tables;
use crate::types::{
    CertificationReport, ProductQuery, ProviderError, ProviderPayload, ScoreRole, SourceAdapter,
};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RegistryEntry {
    name: String,
    #[serde(default)]
    verified: bool,
}

#[derive(Debug, Deserialize)]
struct RegistryResponse {
    certifications: Vec<RegistryEntry>,
}

pub struct CertificationsAdapter {
    name: String,
    http: HttpProvider,
}

impl CertificationsAdapter {
    pub fn new(name: impl Into<String>, http: HttpProvider) -> Self {
        Self {
            name: name.into(),
            http,
        }
    }
}

#[async_trait]
impl SourceAdapter for CertificationsAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> ScoreRole {
        ScoreRole::Certification
    }

    async fn fetch_live(&self, query: &ProductQuery) -> Result<ProviderPayload, ProviderError> {
        let mut params = vec![("q", query.display_name.as_str())];
        if let Some(brand) = &query.brand {
            params.push(("brand", brand.as_str()));
        }

        let response: RegistryResponse = self.http.get_json("/certifications", &params).await?;
        let verified: Vec<&str> = response
            .certifications
            .iter()
            .filter(|entry| entry.verified)
            .map(|entry| entry.name.as_str())
            .collect();

        Ok(ProviderPayload::Certifications(CertificationReport {
            certifications: tables::canonical_certifications(&verified),
            verified: true,
        }))
    }

    fn estimate(&self, query: &ProductQuery) -> Option<ProviderPayload> {
        let mut certifications = tables::detect_certifications(&query.search_text());
        if let Some(brand) = tables::eco_brand_for(query) {
            for cert in brand.certifications {
                if !certifications.iter().any(|c| c == cert) {
                    certifications.push(cert.to_string());
                }
            }
        }

        if certifications.is_empty() {
            return None;
        }
        Some(ProviderPayload::Certifications(CertificationReport {
            certifications,
            verified: false,
        }))
    }
}
