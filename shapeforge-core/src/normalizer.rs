//! String normalization with ordered regex rules and a memoized cache,
//! used to compare station names and route names for routing equality.

use std::sync::Mutex;

use hashbrown::HashMap;
use regex::Regex;

/// A single `(pattern, replacement)` rule applied in order.
pub struct ReplRule {
    pattern: Regex,
    replacement: String,
}

impl ReplRule {
    #[must_use]
    pub fn new(pattern: &str, replacement: &str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("invalid normalizer rule pattern"),
            replacement: replacement.to_string(),
        }
    }
}

/// Normalizes strings through an ordered list of regex replacement rules,
/// memoizing results behind a mutex so concurrent callers share one cache.
pub struct Normalizer {
    rules: Vec<ReplRule>,
    cache: Mutex<HashMap<String, String>>,
}

impl Normalizer {
    #[must_use]
    pub fn new(rules: Vec<ReplRule>) -> Self {
        Self {
            rules,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Default rule set used for station/platform name comparison:
    /// lowercase, collapse whitespace, strip common punctuation.
    #[must_use]
    pub fn default_station() -> Self {
        Self::new(vec![
            ReplRule::new(r"[,.;:]", ""),
            ReplRule::new(r"\s+", " "),
        ])
    }

    /// Thread-safe normalize, consulting and populating the shared cache.
    #[must_use]
    pub fn normalize(&self, input: &str) -> String {
        if let Some(hit) = self.cache.lock().unwrap().get(input) {
            return hit.clone();
        }

        let mut out = input.to_lowercase();
        for rule in &self.rules {
            out = rule.pattern.replace_all(&out, rule.replacement.as_str()).into_owned();
        }
        out = out.trim().to_string();

        self.cache
            .lock()
            .unwrap()
            .insert(input.to_string(), out.clone());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_and_caches() {
        let n = Normalizer::default_station();
        assert_eq!(n.normalize("Central  Station,"), "central station");
        // second call hits the cache, same result
        assert_eq!(n.normalize("Central  Station,"), "central station");
    }
}
