//! Keyword classification for headlines.

/// Checked first. A headline about rates and hospitals is still "economy".
const ECONOMY_KEYWORDS: &[&str] = &[
    "economy",
    "economic",
    "inflation",
    "market",
    "stocks",
    "stock market",
    "fed",
    "federal reserve",
    "interest rate",
    "rates",
    "jobs report",
    "unemployment",
    "tariff",
    "bank",
    "gdp",
    "recession",
    "wall street",
];

const HEALTH_KEYWORDS: &[&str] = &[
    "health",
    "hospital",
    "vaccine",
    "virus",
    "disease",
    "medicare",
    "medicaid",
    "drug",
    "cdc",
    "fda",
    "outbreak",
    "cancer",
    "doctors",
];

const DEFENSE_KEYWORDS: &[&str] = &[
    "defense",
    "military",
    "pentagon",
    "war",
    "troops",
    "nato",
    "missile",
    "army",
    "navy",
    "air force",
    "weapons",
    "ceasefire",
];

pub const GENERAL: &str = "general";

/// Classify a headline from its title and description. Lists are tested in a
/// fixed priority order (economy, health, defense) and the first match wins;
/// reordering them changes results.
pub fn classify(title: &str, description: &str) -> &'static str {
    let text = format!("{} {}", title, description).to_lowercase();
    for (label, keywords) in [
        ("economy", ECONOMY_KEYWORDS),
        ("health", HEALTH_KEYWORDS),
        ("defense", DEFENSE_KEYWORDS),
    ] {
        if keywords.iter().any(|kw| text.contains(kw)) {
            return label;
        }
    }
    GENERAL
}
