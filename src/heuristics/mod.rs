//! Text heuristics over advisory metadata
//!
//! Pure keyword and sentence-splitting rules. Kept apart from the pipeline
//! so the rule tables can change without touching enrichment.

pub mod risk_factors;
pub mod symptoms;

pub use risk_factors::extract_risk_factors;
pub use symptoms::extract_symptoms;

/// Number of "possible steps" fragments reported as solutions
pub const SOLUTION_COUNT: usize = 3;

/// Split free text on periods into trimmed, non-empty fragments
pub fn split_fragments(text: &str) -> Vec<String> {
    text.split('.')
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(String::from)
        .collect()
}

/// Split a "possible steps" field into (solutions, prevention)
pub fn split_steps(steps: &str) -> (Vec<String>, Vec<String>) {
    let mut solutions = split_fragments(steps);
    let prevention = if solutions.len() > SOLUTION_COUNT {
        solutions.split_off(SOLUTION_COUNT)
    } else {
        Vec::new()
    };
    (solutions, prevention)
}
