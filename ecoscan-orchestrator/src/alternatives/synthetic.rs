//! Deterministic synthetic alternatives
//!
//! Used to pad the list when discovery finds fewer than the minimum number of
//! strictly better products. Templates come from the product's category,
//! then from the general profile.

use crate::tables::{CategoryProfile, SyntheticTemplate, GENERAL};
use crate::types::{normalize_text, AlternativeCandidate, DiscoveryStrategy};
use std::collections::HashSet;

/// Share of the remaining headroom (`100 - original`) granted to the first,
/// second and third padded candidate
const HEADROOM_SHARES: [f64; 3] = [0.55, 0.45, 0.35];

/// Up to `count` synthetic candidates scoring strictly between `original`
/// and 100, skipping any `(name, brand)` already in `taken`
pub fn synthetic_candidates(
    category: Option<&'static CategoryProfile>,
    original: f64,
    count: usize,
    taken: &mut HashSet<(String, String)>,
) -> Vec<AlternativeCandidate> {
    if !(0.0..100.0).contains(&original) {
        return Vec::new();
    }

    let profile = category.unwrap_or(&GENERAL);
    let templates = profile
        .synthetic
        .iter()
        .map(|t| (profile, t))
        .chain(GENERAL.synthetic.iter().map(|t| (&GENERAL, t)));

    let mut out = Vec::new();
    for (index, (source, template)) in templates.enumerate() {
        if out.len() >= count.min(HEADROOM_SHARES.len()) {
            break;
        }
        let key = (normalize_text(template.name), normalize_text(template.brand));
        if !taken.insert(key) {
            continue;
        }

        let share = HEADROOM_SHARES[out.len()];
        out.push(candidate(source, profile, template, index, original, share));
    }
    out
}

fn candidate(
    source: &CategoryProfile,
    profile: &CategoryProfile,
    template: &SyntheticTemplate,
    index: usize,
    original: f64,
    share: f64,
) -> AlternativeCandidate {
    let eco_score = original + (100.0 - original) * share;
    let gain = eco_score - original;
    AlternativeCandidate {
        id: format!("synthetic:{}:{}", source.id, index),
        name: template.name.to_string(),
        brand: template.brand.to_string(),
        category: profile.id.to_string(),
        eco_score,
        co2_impact: (profile.co2e_kg * (1.0 - share) * 100.0).round() / 100.0,
        certifications: template.certifications.iter().map(|c| c.to_string()).collect(),
        real_data: false,
        rank_score: eco_score + if gain > 20.0 { 20.0 } else { 0.0 },
        strategy: DiscoveryStrategy::Synthetic,
    }
}
