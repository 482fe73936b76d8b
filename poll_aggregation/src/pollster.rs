//! Pollster classification and effective-sample adjustment.
//!
//! Membership in the gold-standard registry upweights a poll by inflating its
//! sample size before it reaches the aggregator: `n' = n * m^2`, so that the
//! sqrt-derived sample weight scales by exactly `m`. The adjustment lives
//! entirely in the input data, which keeps the adjusted `n` independently
//! auditable next to the raw `n`.

use crate::config::Poll;

/// Canonicalizes a pollster name for matching: lowercase, parenthetical
/// partisan tags removed, non-alphanumeric runs collapsed to single spaces.
///
/// Pure and total; never fails.
pub fn normalize_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut cleaned = String::with_capacity(lower.len());
    let mut depth: u32 = 0;
    for c in lower.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => cleaned.push(c),
            _ => {}
        }
    }
    let mut out = String::with_capacity(cleaned.len());
    let mut pending_space = false;
    for c in cleaned.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }
    out
}

/// A curated set of high-trust pollster names.
///
/// Matching is a substring test over normalized names, so "Emerson College
/// Polling (R)" matches a registry entry of "Emerson".
#[derive(PartialEq, Debug, Clone)]
pub struct GoldStandardRegistry {
    // Entries are stored in normalized form. Entries that normalize to the
    // empty string are dropped: an empty needle matches every name.
    entries: Vec<String>,
}

// The curated list from the methodology pages.
const CURATED_NAMES: [&str; 8] = [
    "Big Data Poll",
    "Rasmussen Reports",
    "AtlasIntel",
    "SoCalStrategies",
    "Emerson",
    "Trafalgar",
    "InsiderAdvantage",
    "Patriot Polling",
];

impl GoldStandardRegistry {
    /// The default curated registry.
    pub fn curated() -> GoldStandardRegistry {
        GoldStandardRegistry::new(&CURATED_NAMES.map(String::from))
    }

    /// A registry with caller-supplied entries.
    pub fn new(names: &[String]) -> GoldStandardRegistry {
        let entries = names
            .iter()
            .map(|n| normalize_name(n))
            .filter(|n| !n.is_empty())
            .collect();
        GoldStandardRegistry { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True iff the normalized pollster name contains any registry entry.
    pub fn is_gold_standard(&self, pollster: &str) -> bool {
        let p = normalize_name(pollster);
        self.entries.iter().any(|entry| p.contains(entry.as_str()))
    }

    /// Inflates the sample size of a gold-standard pollster by `m^2`.
    ///
    /// A sample size of zero is the "excluded from weighting" sentinel and is
    /// returned unchanged.
    pub fn effective_sample_size(&self, pollster: &str, n: u64, multiplier: f64) -> u64 {
        if n == 0 || !self.is_gold_standard(pollster) {
            return n;
        }
        (n as f64 * multiplier * multiplier).round() as u64
    }

    /// Returns an adjusted copy of the poll; the original is untouched so the
    /// raw sample size remains available for audit display.
    pub fn adjust_poll(&self, poll: &Poll, multiplier: f64) -> Poll {
        Poll {
            sample_size: self.effective_sample_size(&poll.pollster, poll.sample_size, multiplier),
            ..poll.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_tags_and_punctuation() {
        assert_eq!(normalize_name("Rasmussen Reports (R)"), "rasmussen reports");
        assert_eq!(normalize_name("I&I/TIPP"), "i i tipp");
        assert_eq!(normalize_name("RMG Research**"), "rmg research");
        assert_eq!(normalize_name("  AtlasIntel  "), "atlasintel");
    }

    #[test]
    fn normalization_is_total() {
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("((()))"), "");
        assert_eq!(normalize_name(")("), "");
    }

    #[test]
    fn membership_is_substring_based() {
        let registry = GoldStandardRegistry::curated();
        assert!(registry.is_gold_standard("Emerson"));
        assert!(registry.is_gold_standard("Emerson College Polling"));
        assert!(registry.is_gold_standard("Trafalgar Group (R)"));
        assert!(!registry.is_gold_standard("Morning Consult"));
        assert!(!registry.is_gold_standard("Economist/YouGov"));
    }

    #[test]
    fn empty_entries_never_match_everything() {
        let registry = GoldStandardRegistry::new(&["".to_string(), "  ".to_string()]);
        assert!(registry.is_empty());
        assert!(!registry.is_gold_standard("Morning Consult"));
    }

    #[test]
    fn effective_sample_scales_the_weight_by_m() {
        let registry = GoldStandardRegistry::curated();
        let eff = registry.effective_sample_size("Emerson", 1000, 2.0);
        assert_eq!(eff, 4000);
        // sqrt(n * m^2) == m * sqrt(n)
        let lhs = (eff as f64).sqrt();
        let rhs = 2.0 * 1000f64.sqrt();
        assert!((lhs - rhs).abs() < 1e-9);
    }

    #[test]
    fn effective_sample_rounds_with_odd_multipliers() {
        let registry = GoldStandardRegistry::curated();
        assert_eq!(registry.effective_sample_size("Rasmussen Reports", 1126, 3.0), 10134);
    }

    #[test]
    fn non_gold_and_excluded_samples_pass_through() {
        let registry = GoldStandardRegistry::curated();
        assert_eq!(registry.effective_sample_size("Morning Consult", 2200, 2.0), 2200);
        assert_eq!(registry.effective_sample_size("Emerson", 0, 2.0), 0);
    }

    #[test]
    fn adjust_poll_leaves_the_original_intact() {
        let results = vec![("Democrats".to_string(), 48.0)];
        let poll = Poll::new("Emerson", "2026-01-19", 1000, "LV", &results).unwrap();
        let registry = GoldStandardRegistry::curated();
        let adjusted = registry.adjust_poll(&poll, 2.0);
        assert_eq!(adjusted.sample_size, 4000);
        assert_eq!(poll.sample_size, 1000);
        assert_eq!(adjusted.results, poll.results);
    }
}
