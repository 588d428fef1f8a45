//! Score Synthesizer - merges settled provider results into one score
//!
//! **Algorithm:**
//! 1. Average partial scores per role into the breakdown
//! 2. Weighted average of the breakdown over roles that scored
//!    (no scored roles → neutral score)
//! 3. Add flat certification bonuses, only when something scored; cap at 100
//! 4. Confidence from live-source priorities plus a flat amount per fallback
//!    estimate, capped at 100
//! 5. Letter grade from configured breakpoints
//!
//! Synthesis cannot fail.

use crate::fallback::round1;
use crate::types::{CompositeScore, Grade, ProviderResult, ScoreRole, SourceStatus};
use ecoscan_common::config::{GradeBreakpoints, ScoringConfig};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

impl Grade {
    /// Letter grade for a 0-100 score
    pub fn from_score(score: f64, breakpoints: &GradeBreakpoints) -> Grade {
        if score >= breakpoints.a_plus {
            Grade::APlus
        } else if score >= breakpoints.a {
            Grade::A
        } else if score >= breakpoints.b {
            Grade::B
        } else if score >= breakpoints.c {
            Grade::C
        } else if score >= breakpoints.d {
            Grade::D
        } else {
            Grade::F
        }
    }
}

pub struct ScoreSynthesizer {
    config: ScoringConfig,
    /// Source name → configured priority
    priorities: BTreeMap<String, u8>,
}

impl ScoreSynthesizer {
    pub fn new(config: ScoringConfig, priorities: BTreeMap<String, u8>) -> Self {
        Self { config, priorities }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    fn weight(&self, role: ScoreRole) -> f64 {
        let weights = &self.config.weights;
        match role {
            ScoreRole::SupplyChain => weights.supply_chain,
            ScoreRole::Carbon => weights.carbon,
            ScoreRole::Certification => weights.certification,
            ScoreRole::Secondary => weights.secondary,
            ScoreRole::Informational => 0.0,
        }
    }

    pub fn synthesize(&self, results: &[ProviderResult]) -> CompositeScore {
        // Per-role averages
        let mut buckets: BTreeMap<ScoreRole, Vec<f64>> = BTreeMap::new();
        for result in results {
            if let (Some(score), Some(_)) = (result.partial_score, result.role.breakdown_key()) {
                buckets.entry(result.role).or_default().push(score);
            }
        }
        let role_averages: Vec<(ScoreRole, f64)> = buckets
            .iter()
            .map(|(role, scores)| (*role, scores.iter().sum::<f64>() / scores.len() as f64))
            .collect();

        let certifications: BTreeSet<String> = results
            .iter()
            .flat_map(|r| r.certifications().iter().cloned())
            .collect();

        let overall = if role_averages.is_empty() {
            self.config.neutral_score
        } else {
            let total_weight: f64 = role_averages.iter().map(|(role, _)| self.weight(*role)).sum();
            let base = if total_weight > 0.0 {
                role_averages
                    .iter()
                    .map(|(role, avg)| self.weight(*role) * avg)
                    .sum::<f64>()
                    / total_weight
            } else {
                role_averages.iter().map(|(_, avg)| avg).sum::<f64>() / role_averages.len() as f64
            };
            let bonus: f64 = certifications
                .iter()
                .filter_map(|cert| self.config.certification_bonuses.get(cert))
                .sum();
            base + bonus
        };
        let overall_score = round1(overall.clamp(0.0, 100.0));

        let mut confidence = self.config.confidence_floor;
        for result in results.iter().filter(|r| r.partial_score.is_some()) {
            match result.status {
                SourceStatus::Success => {
                    let priority = self.priorities.get(&result.source_name).copied().unwrap_or(1);
                    confidence += f64::from(priority) * self.config.confidence_per_priority;
                }
                SourceStatus::FellBack => confidence += self.config.fallback_confidence,
                SourceStatus::Failed | SourceStatus::TimedOut => {}
            }
        }
        let confidence = round1(confidence.clamp(0.0, 100.0));

        let breakdown = role_averages
            .iter()
            .filter_map(|(role, avg)| role.breakdown_key().map(|key| (key.to_string(), round1(*avg))))
            .collect();

        let (used, fallback): (Vec<&ProviderResult>, Vec<&ProviderResult>) =
            results.iter().partition(|r| r.is_live());

        let score = CompositeScore {
            overall_score,
            confidence,
            breakdown,
            certifications,
            grade: Grade::from_score(overall_score, &self.config.grade_breakpoints),
            sources_used: used.iter().map(|r| r.source_name.clone()).collect(),
            sources_fallback: fallback.iter().map(|r| r.source_name.clone()).collect(),
        };

        debug!(
            overall = score.overall_score,
            confidence = score.confidence,
            grade = %score.grade,
            scored_roles = role_averages.len(),
            "Synthesized score"
        );
        score
    }
}
