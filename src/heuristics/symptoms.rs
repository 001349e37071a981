//! Symptom extraction from disease descriptions

/// Case-insensitive substrings that mark a sentence as describing a symptom
pub const SYMPTOM_KEYWORDS: [&str; 9] = [
    "spot", "yellowing", "browning", "wilt", "lesion", "blight", "mildew", "rust", "scab",
];

/// Maximum number of symptoms returned
pub const MAX_SYMPTOMS: usize = 3;

/// Fragments of this many characters or fewer are never symptoms
pub const MIN_FRAGMENT_CHARS: usize = 10;

/// Pick up to three symptom sentences from a description, in order
pub fn extract_symptoms(description: &str) -> Vec<String> {
    description
        .split('.')
        .map(str::trim)
        .filter(|fragment| fragment.chars().count() > MIN_FRAGMENT_CHARS)
        .filter(|fragment| {
            let lower = fragment.to_lowercase();
            SYMPTOM_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
        })
        .take(MAX_SYMPTOMS)
        .map(String::from)
        .collect()
}
