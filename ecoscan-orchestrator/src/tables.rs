//! Static reference tables for fallback estimation
//!
//! Category profiles (keywords, emission factors, supply-chain baselines,
//! price ranges, synthetic alternatives), known eco brands and certification
//! keyword patterns. Everything here is plain data; lookups are pure.

use crate::types::{normalize_text, ProductQuery};

/// Synthetic alternative template used when real candidates run short
#[derive(Debug, Clone, Copy)]
pub struct SyntheticTemplate {
    pub name: &'static str,
    pub brand: &'static str,
    pub certifications: &'static [&'static str],
}

/// Reference data for one product category
#[derive(Debug)]
pub struct CategoryProfile {
    pub id: &'static str,
    /// Whole-word keywords (matched against normalized text)
    pub keywords: &'static [&'static str],
    /// Typical kg CO2e per unit
    pub co2e_kg: f64,
    /// Typical supply-chain score for an unknown brand
    pub supply_chain_baseline: f64,
    /// Typical retail price range (USD)
    pub price_range: (f64, f64),
    pub synthetic: &'static [SyntheticTemplate],
}

/// Brand with a known sustainability track record
#[derive(Debug)]
pub struct EcoBrand {
    pub name: &'static str,
    pub category: &'static str,
    pub supply_chain_score: f64,
    pub certifications: &'static [&'static str],
}

pub static CATEGORIES: &[CategoryProfile] = &[
    CategoryProfile {
        id: "beverages",
        keywords: &[
            "beverage", "beverages", "drink", "drinks", "juice", "soda", "water", "milk",
            "coffee", "tea", "beer", "wine", "kombucha", "oat milk",
        ],
        co2e_kg: 1.2,
        supply_chain_baseline: 52.0,
        price_range: (1.5, 6.0),
        synthetic: &[
            SyntheticTemplate { name: "Organic Oat Drink", brand: "Oatly", certifications: &["carbon_neutral"] },
            SyntheticTemplate { name: "Fair Trade Cold Brew", brand: "Equal Exchange", certifications: &["fair_trade", "organic"] },
            SyntheticTemplate { name: "Refillable Sparkling Water", brand: "SodaStream", certifications: &[] },
            SyntheticTemplate { name: "Rainforest Green Tea", brand: "Pukka", certifications: &["organic", "fair_trade"] },
        ],
    },
    CategoryProfile {
        id: "food",
        keywords: &[
            "food", "snack", "snacks", "chocolate", "cereal", "bread", "pasta", "rice",
            "cookie", "cookies", "chips", "cheese", "yogurt", "meat", "beef", "chicken",
            "granola", "bar", "sauce",
        ],
        co2e_kg: 3.5,
        supply_chain_baseline: 48.0,
        price_range: (2.0, 9.0),
        synthetic: &[
            SyntheticTemplate { name: "Fair Trade Dark Chocolate", brand: "Tony's Chocolonely", certifications: &["fair_trade", "b_corp"] },
            SyntheticTemplate { name: "Organic Rolled Oats", brand: "Bob's Red Mill", certifications: &["organic"] },
            SyntheticTemplate { name: "Plant-Based Protein Bar", brand: "Clif Bar", certifications: &["organic"] },
            SyntheticTemplate { name: "Regenerative Granola", brand: "Nature's Path", certifications: &["organic", "b_corp"] },
        ],
    },
    CategoryProfile {
        id: "personal_care",
        keywords: &[
            "shampoo", "conditioner", "soap", "toothpaste", "toothbrush", "deodorant",
            "lotion", "cosmetic", "cosmetics", "razor", "sunscreen", "body wash",
        ],
        co2e_kg: 0.9,
        supply_chain_baseline: 50.0,
        price_range: (3.0, 15.0),
        synthetic: &[
            SyntheticTemplate { name: "Shampoo Bar", brand: "Ethique", certifications: &["b_corp", "carbon_neutral"] },
            SyntheticTemplate { name: "Pure-Castile Liquid Soap", brand: "Dr. Bronner's", certifications: &["organic", "fair_trade"] },
            SyntheticTemplate { name: "Bamboo Toothbrush", brand: "Brush with Bamboo", certifications: &["fsc"] },
            SyntheticTemplate { name: "Refillable Deodorant", brand: "Wild", certifications: &[] },
        ],
    },
    CategoryProfile {
        id: "cleaning",
        keywords: &[
            "detergent", "cleaner", "cleaning", "bleach", "dish", "laundry", "disinfectant",
            "spray", "wipes", "sponge",
        ],
        co2e_kg: 1.6,
        supply_chain_baseline: 45.0,
        price_range: (3.0, 12.0),
        synthetic: &[
            SyntheticTemplate { name: "Concentrated Laundry Sheets", brand: "Earth Breeze", certifications: &[] },
            SyntheticTemplate { name: "Plant-Based Dish Soap", brand: "Seventh Generation", certifications: &["b_corp"] },
            SyntheticTemplate { name: "Refill All-Purpose Cleaner", brand: "Blueland", certifications: &["cradle_to_cradle"] },
            SyntheticTemplate { name: "Eco Multi-Surface Spray", brand: "Method", certifications: &["b_corp", "cradle_to_cradle"] },
        ],
    },
    CategoryProfile {
        id: "clothing",
        keywords: &[
            "shirt", "t-shirt", "jeans", "jacket", "dress", "sweater", "hoodie", "socks",
            "shoes", "sneakers", "pants", "clothing", "apparel",
        ],
        co2e_kg: 8.0,
        supply_chain_baseline: 40.0,
        price_range: (15.0, 120.0),
        synthetic: &[
            SyntheticTemplate { name: "Recycled Fleece Jacket", brand: "Patagonia", certifications: &["fair_trade", "b_corp"] },
            SyntheticTemplate { name: "Wool Runner Sneakers", brand: "Allbirds", certifications: &["carbon_neutral", "b_corp"] },
            SyntheticTemplate { name: "Organic Cotton Tee", brand: "Pact", certifications: &["organic", "fair_trade"] },
            SyntheticTemplate { name: "Regenerative Denim", brand: "Outerknown", certifications: &["fair_trade"] },
        ],
    },
    CategoryProfile {
        id: "electronics",
        keywords: &[
            "phone", "smartphone", "laptop", "charger", "headphones", "earbuds", "tablet",
            "battery", "batteries", "cable", "speaker", "electronics",
        ],
        co2e_kg: 25.0,
        supply_chain_baseline: 38.0,
        price_range: (20.0, 600.0),
        synthetic: &[
            SyntheticTemplate { name: "Modular Smartphone", brand: "Fairphone", certifications: &["fair_trade", "b_corp"] },
            SyntheticTemplate { name: "Refurbished Laptop", brand: "Back Market", certifications: &["energy_star"] },
            SyntheticTemplate { name: "Rechargeable AA Batteries", brand: "Eneloop", certifications: &[] },
            SyntheticTemplate { name: "Repairable Headphones", brand: "Gerrard Street", certifications: &[] },
        ],
    },
    CategoryProfile {
        id: "paper",
        keywords: &[
            "paper", "toilet paper", "tissue", "tissues", "napkins", "paper towels",
            "notebook", "envelope",
        ],
        co2e_kg: 1.1,
        supply_chain_baseline: 46.0,
        price_range: (2.0, 18.0),
        synthetic: &[
            SyntheticTemplate { name: "Recycled Toilet Paper", brand: "Who Gives A Crap", certifications: &["fsc", "b_corp"] },
            SyntheticTemplate { name: "Bamboo Paper Towels", brand: "Reel", certifications: &["fsc"] },
            SyntheticTemplate { name: "Recycled Notebook", brand: "Decomposition", certifications: &["fsc"] },
            SyntheticTemplate { name: "Tree-Free Tissues", brand: "Seventh Generation", certifications: &["b_corp"] },
        ],
    },
    CategoryProfile {
        id: "household",
        keywords: &[
            "bottle", "container", "bag", "bags", "straw", "straws", "cup", "cups",
            "wrap", "foil", "candle", "towel", "household",
        ],
        co2e_kg: 2.0,
        supply_chain_baseline: 44.0,
        price_range: (3.0, 30.0),
        synthetic: &[
            SyntheticTemplate { name: "Stainless Steel Bottle", brand: "Klean Kanteen", certifications: &["b_corp", "carbon_neutral"] },
            SyntheticTemplate { name: "Beeswax Food Wraps", brand: "Bee's Wrap", certifications: &["b_corp"] },
            SyntheticTemplate { name: "Reusable Silicone Bags", brand: "Stasher", certifications: &[] },
            SyntheticTemplate { name: "Compostable Trash Bags", brand: "If You Care", certifications: &["fsc"] },
        ],
    },
];

/// Profile used when no category can be inferred
pub static GENERAL: CategoryProfile = CategoryProfile {
    id: "general",
    keywords: &[],
    co2e_kg: 3.0,
    supply_chain_baseline: 45.0,
    price_range: (5.0, 25.0),
    synthetic: &[
        SyntheticTemplate { name: "Refillable Everyday Essentials Kit", brand: "Grove Collaborative", certifications: &["b_corp"] },
        SyntheticTemplate { name: "Plastic-Free Starter Set", brand: "EarthHero", certifications: &["carbon_neutral"] },
        SyntheticTemplate { name: "Certified Sustainable Basics", brand: "Package Free", certifications: &["fair_trade"] },
        SyntheticTemplate { name: "Zero Waste Home Bundle", brand: "Life Without Plastic", certifications: &[] },
    ],
};

pub static ECO_BRANDS: &[EcoBrand] = &[
    EcoBrand { name: "patagonia", category: "clothing", supply_chain_score: 88.0, certifications: &["fair_trade", "b_corp"] },
    EcoBrand { name: "allbirds", category: "clothing", supply_chain_score: 82.0, certifications: &["carbon_neutral", "b_corp"] },
    EcoBrand { name: "pact", category: "clothing", supply_chain_score: 80.0, certifications: &["organic", "fair_trade"] },
    EcoBrand { name: "fairphone", category: "electronics", supply_chain_score: 86.0, certifications: &["fair_trade", "b_corp"] },
    EcoBrand { name: "dr. bronner's", category: "personal_care", supply_chain_score: 90.0, certifications: &["organic", "fair_trade"] },
    EcoBrand { name: "ethique", category: "personal_care", supply_chain_score: 85.0, certifications: &["b_corp", "carbon_neutral"] },
    EcoBrand { name: "seventh generation", category: "cleaning", supply_chain_score: 78.0, certifications: &["b_corp"] },
    EcoBrand { name: "method", category: "cleaning", supply_chain_score: 76.0, certifications: &["b_corp", "cradle_to_cradle"] },
    EcoBrand { name: "blueland", category: "cleaning", supply_chain_score: 80.0, certifications: &["cradle_to_cradle"] },
    EcoBrand { name: "who gives a crap", category: "paper", supply_chain_score: 84.0, certifications: &["fsc", "b_corp"] },
    EcoBrand { name: "tony's chocolonely", category: "food", supply_chain_score: 87.0, certifications: &["fair_trade", "b_corp"] },
    EcoBrand { name: "nature's path", category: "food", supply_chain_score: 79.0, certifications: &["organic", "b_corp"] },
    EcoBrand { name: "oatly", category: "beverages", supply_chain_score: 75.0, certifications: &["carbon_neutral"] },
    EcoBrand { name: "equal exchange", category: "beverages", supply_chain_score: 86.0, certifications: &["fair_trade", "organic"] },
    EcoBrand { name: "klean kanteen", category: "household", supply_chain_score: 83.0, certifications: &["b_corp", "carbon_neutral"] },
    EcoBrand { name: "bee's wrap", category: "household", supply_chain_score: 80.0, certifications: &["b_corp"] },
];

/// Canonical certification id → lowercase keyword patterns
pub static CERTIFICATION_PATTERNS: &[(&str, &[&str])] = &[
    ("fair_trade", &["fair trade", "fairtrade", "fair trade certified"]),
    ("carbon_neutral", &["carbon neutral", "climate neutral", "net zero", "climate pledge"]),
    ("organic", &["organic", "usda organic", "eu organic", "bio"]),
    ("rainforest_alliance", &["rainforest alliance"]),
    ("b_corp", &["b corp", "bcorp", "certified b corporation"]),
    ("fsc", &["fsc", "forest stewardship"]),
    ("cradle_to_cradle", &["cradle to cradle", "c2c certified"]),
    ("energy_star", &["energy star"]),
];

/// Sustainability-positive keywords for text heuristics
pub static POSITIVE_KEYWORDS: &[&str] = &[
    "organic", "recycled", "reusable", "refillable", "refill", "bamboo", "compostable",
    "biodegradable", "plant based", "vegan", "sustainable", "eco", "zero waste",
    "plastic free", "regenerative",
];

/// Sustainability-negative keywords for text heuristics
pub static NEGATIVE_KEYWORDS: &[&str] = &[
    "plastic", "disposable", "single use", "aerosol", "palm oil", "styrofoam",
    "polystyrene", "fast fashion",
];

/// Replace separators so tags like `en:fair-trade` normalize to `en fair trade`
fn keyword_text(text: &str) -> String {
    let spaced: String = text
        .chars()
        .map(|c| if matches!(c, '-' | '_' | ':' | ',' | '/' | '.') { ' ' } else { c })
        .collect();
    normalize_text(&spaced)
}

/// Whole-phrase match on normalized text
pub fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    let haystack = format!(" {} ", keyword_text(haystack));
    let phrase = keyword_text(phrase);
    !phrase.is_empty() && haystack.contains(&format!(" {} ", phrase))
}

pub fn category_by_id(id: &str) -> Option<&'static CategoryProfile> {
    let id = normalize_text(id).replace(' ', "_");
    CATEGORIES.iter().find(|c| c.id == id)
}

/// Category from free text (first keyword hit, table order)
pub fn category_from_text(text: &str) -> Option<&'static CategoryProfile> {
    CATEGORIES
        .iter()
        .find(|c| c.keywords.iter().any(|kw| contains_phrase(text, kw)))
}

/// Category from barcode-database tags such as `en:beverages`
pub fn category_from_tags(tags: &[String]) -> Option<&'static CategoryProfile> {
    tags.iter().find_map(|tag| {
        let plain = tag.rsplit(':').next().unwrap_or(tag);
        category_by_id(plain).or_else(|| category_from_text(plain))
    })
}

/// Category for a query: explicit category first, then name/brand keywords
pub fn detect_category(query: &ProductQuery) -> Option<&'static CategoryProfile> {
    if let Some(category) = &query.category {
        if let Some(profile) = category_by_id(category).or_else(|| category_from_text(category)) {
            return Some(profile);
        }
    }
    let mut text = query.display_name.clone();
    if let Some(brand) = &query.brand {
        text.push(' ');
        text.push_str(brand);
    }
    category_from_text(&text)
        .or_else(|| eco_brand_for(query).and_then(|brand| category_by_id(brand.category)))
}

/// Known eco brand named in the query brand or display name
pub fn eco_brand_for(query: &ProductQuery) -> Option<&'static EcoBrand> {
    let text = match &query.brand {
        Some(brand) => format!("{} {}", brand, query.display_name),
        None => query.display_name.clone(),
    };
    ECO_BRANDS.iter().find(|b| contains_phrase(&text, b.name))
}

/// Eco brands for a category
pub fn eco_brands_in(category: &str) -> impl Iterator<Item = &'static EcoBrand> + '_ {
    ECO_BRANDS.iter().filter(move |b| b.category == category)
}

/// Canonical certification ids detected in free text, table order, no duplicates
pub fn detect_certifications(text: &str) -> Vec<String> {
    CERTIFICATION_PATTERNS
        .iter()
        .filter(|(_, patterns)| patterns.iter().any(|p| contains_phrase(text, p)))
        .map(|(id, _)| id.to_string())
        .collect()
}

/// Canonical id for a single certification label (`"en:fair-trade"` → `fair_trade`)
pub fn canonical_certification(label: &str) -> Option<&'static str> {
    CERTIFICATION_PATTERNS
        .iter()
        .find(|(id, patterns)| {
            keyword_text(label) == keyword_text(id)
                || patterns.iter().any(|p| contains_phrase(label, p))
        })
        .map(|(id, _)| *id)
}

/// Canonicalize a list of labels, dropping unknown ones and duplicates
pub fn canonical_certifications<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for label in labels {
        if let Some(id) = canonical_certification(label.as_ref()) {
            if !out.iter().any(|existing| existing == id) {
                out.push(id.to_string());
            }
        }
    }
    out
}

/// Count (positive, negative) sustainability keywords in text
pub fn keyword_signals(text: &str) -> (usize, usize) {
    let positive = POSITIVE_KEYWORDS.iter().filter(|kw| contains_phrase(text, kw)).count();
    let negative = NEGATIVE_KEYWORDS.iter().filter(|kw| contains_phrase(text, kw)).count();
    (positive, negative)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_phrase_is_whole_word() {
        assert!(contains_phrase("Organic Oat Milk", "milk"));
        assert!(contains_phrase("organic oat milk", "oat milk"));
        assert!(!contains_phrase("buttermilkshake", "milk"));
        assert!(contains_phrase("en:fair-trade", "fair trade"));
        assert!(!contains_phrase("anything", ""));
    }

    #[test]
    fn test_detect_category() {
        let query = ProductQuery::from_name("Sparkling Water 1L").unwrap();
        assert_eq!(detect_category(&query).map(|c| c.id), Some("beverages"));

        let explicit = ProductQuery::from_name("Thing").unwrap().with_category("Personal Care");
        assert_eq!(detect_category(&explicit).map(|c| c.id), Some("personal_care"));

        let by_brand = ProductQuery::from_name("Nano Puff").unwrap().with_brand("Patagonia");
        assert_eq!(detect_category(&by_brand).map(|c| c.id), Some("clothing"));

        let unknown = ProductQuery::from_name("zzqx widget").unwrap();
        assert!(detect_category(&unknown).is_none());
    }

    #[test]
    fn test_category_from_tags() {
        let tags = vec!["en:plant-based-foods".to_string(), "en:beverages".to_string()];
        assert_eq!(category_from_tags(&tags).map(|c| c.id), Some("beverages"));
    }

    #[test]
    fn test_detect_certifications() {
        let certs = detect_certifications("USDA Organic Fair Trade coffee, Rainforest Alliance");
        assert_eq!(certs, vec!["fair_trade", "organic", "rainforest_alliance"]);
        assert!(detect_certifications("plain coffee").is_empty());
    }

    #[test]
    fn test_canonical_certifications() {
        let labels = ["en:organic", "en:fair-trade", "en:eu-organic", "en:no-gluten", "b_corp"];
        assert_eq!(
            canonical_certifications(&labels),
            vec!["organic", "fair_trade", "b_corp"]
        );
    }

    #[test]
    fn test_every_profile_has_enough_synthetic_templates() {
        for profile in CATEGORIES.iter().chain(std::iter::once(&GENERAL)) {
            assert!(profile.synthetic.len() >= 3, "{} needs 3+ templates", profile.id);
        }
    }

    #[test]
    fn test_keyword_signals() {
        assert_eq!(keyword_signals("Reusable bamboo cup"), (2, 0));
        assert_eq!(keyword_signals("Disposable plastic cups"), (0, 2));
        assert_eq!(keyword_signals("zzqx widget"), (0, 0));
    }
}
