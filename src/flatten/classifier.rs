//! Location token classification

/// Decides whether a location criterion value names a country
pub trait LocationClassifier: Send + Sync {
    fn is_country_code(&self, token: &str) -> bool;
}

/// Exactly two ASCII uppercase letters, nothing else
///
/// "US" and "GB" read as countries; "usa", "us" and " US " read as cities.
/// Misfires on two-letter city abbreviations; a table-driven classifier can
/// replace this behind the trait without touching the flatten pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountryCodeHeuristic;

impl LocationClassifier for CountryCodeHeuristic {
    fn is_country_code(&self, token: &str) -> bool {
        token.len() == 2 && token.bytes().all(|b| b.is_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_codes() {
        let heuristic = CountryCodeHeuristic;
        assert!(heuristic.is_country_code("US"));
        assert!(heuristic.is_country_code("GB"));
        assert!(!heuristic.is_country_code("usa"));
        assert!(!heuristic.is_country_code("Us"));
        assert!(!heuristic.is_country_code("USA"));
        assert!(!heuristic.is_country_code(" US "));
        assert!(!heuristic.is_country_code(""));
        assert!(!heuristic.is_country_code("Berlin"));
    }
}
