//! Risk factors keyed on the disease name

/// Ordered keyword rules; the first keyword found in the name wins
pub const RISK_FACTOR_RULES: [(&str, [&str; 3]); 4] = [
    ("blight", ["High humidity", "Wet conditions", "Poor air circulation"]),
    ("rust", ["Moisture on leaves", "Cool temperatures", "Dense planting"]),
    ("spot", ["Overhead watering", "Humid conditions", "Plant stress"]),
    ("mildew", ["High humidity", "Poor ventilation", "Overcrowding"]),
];

/// Factors used when no rule matches
pub const DEFAULT_RISK_FACTORS: [&str; 3] =
    ["Environmental stress", "Poor plant health", "Weather conditions"];

/// Risk factors for a disease name. Never empty.
pub fn extract_risk_factors(disease_name: &str) -> Vec<String> {
    let lower = disease_name.to_lowercase();

    let factors = RISK_FACTOR_RULES
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, factors)| factors)
        .unwrap_or(&DEFAULT_RISK_FACTORS);

    factors.iter().map(|f| f.to_string()).collect()
}
