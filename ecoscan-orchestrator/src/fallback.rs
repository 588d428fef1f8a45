//! Deterministic variation for fallback estimators
//!
//! Estimates carry a little "realistic variety" so that two unrelated products
//! in the same category do not get identical numbers. The variety is drawn
//! from ChaCha8 seeded by SHA-256 of the query fingerprint and the source
//! name, so the same query always yields the same estimate, across builds and
//! `rand` upgrades.

use crate::types::ProductQuery;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

/// PRNG seeded from `(query fingerprint, salt)`
pub fn seeded_rng(query: &ProductQuery, salt: &str) -> ChaCha8Rng {
    let mut hasher = Sha256::new();
    hasher.update(query.cache_key().as_bytes());
    hasher.update([0u8]);
    hasher.update(salt.as_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    ChaCha8Rng::from_seed(digest)
}

/// Symmetric jitter in `[-spread, spread]`
pub fn jitter(rng: &mut ChaCha8Rng, spread: f64) -> f64 {
    if spread <= 0.0 {
        return 0.0;
    }
    rng.gen_range(-spread..=spread)
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
