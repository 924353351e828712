//! Pure predicates judging a listing's scraped text against the configured
//! requirements. None of them fail: unreadable input is simply a non-match.

use std::sync::LazyLock;

use regex::Regex;

static SALARY_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[$£€]\s*(\d[\d,]*(?:\.\d+)?)").expect("salary pattern compiles")
});

const ACCEPTED_TYPES: &[&str] = &["full-time", "part-time"];
const EXCLUDED_TYPES: &[&str] = &["contract", "temporary", "internship"];

/// First currency-prefixed figure in `text`, thousands separators stripped.
///
/// For a range such as "$18 - $20 an hour" this is the lower bound.
pub fn parse_salary_floor(text: &str) -> Option<f64> {
    let token = SALARY_TOKEN.captures(text)?.get(1)?.as_str();
    token.replace(',', "").parse().ok()
}

/// Full-time or part-time, and not contract, temporary or internship.
/// An excluded keyword wins over an accepted one.
pub fn is_acceptable_employment_type(text: &str) -> bool {
    let lower = text.to_lowercase();
    if EXCLUDED_TYPES.iter().any(|word| lower.contains(word)) {
        return false;
    }
    ACCEPTED_TYPES.iter().any(|word| lower.contains(word))
}

/// An unlisted salary never meets a floor.
pub fn meets_salary_floor(text: &str, minimum: f64) -> bool {
    parse_salary_floor(text).is_some_and(|salary| salary >= minimum)
}
