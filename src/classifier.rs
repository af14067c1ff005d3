//! Evidence Source Classifier
//!
//! Assigns a confidence tier to a piece of evidence from its source URL:
//! - High: regulatory filings, major wire services, investor-relations pages
//! - Medium: independent analysis and aggregator sites
//! - Low: reserved; unrecognized sources currently default to Medium
//!
//! Pure and deterministic; no network access, no state.

use crate::models::Confidence;

/// Static marker lists, matched in declaration order
const HIGH_CONFIDENCE_MARKERS: &[&str] = &[
    // Regulatory filings
    "sec.gov", "edgar", "sebi.gov.in", "mca.gov.in", "xbrl",
    // Major wire services and data vendors
    "bloomberg.com", "reuters.com", "factset.com", "finance.yahoo.com",
    // Company-published material
    "company website", "investor relations", "annual report",
];

const MEDIUM_CONFIDENCE_MARKERS: &[&str] = &[
    "seekingalpha.com", "morningstar.com", "yahoo.com/finance",
    "financial times", "wall street journal", "economic times",
];

/// Source confidence classifier
pub struct SourceClassifier;

impl SourceClassifier {
    /// Classify a source URL into a confidence tier.
    ///
    /// First matching high marker wins, then first matching medium
    /// marker; anything unrecognized is Medium.
    pub fn classify(url: &str) -> Confidence {
        let url = url.to_lowercase();
        let domain = extract_domain(&url);

        if HIGH_CONFIDENCE_MARKERS
            .iter()
            .any(|m| domain.contains(m) || url.contains(m))
        {
            return Confidence::High;
        }

        if MEDIUM_CONFIDENCE_MARKERS
            .iter()
            .any(|m| domain.contains(m) || url.contains(m))
        {
            return Confidence::Medium;
        }

        Confidence::Medium
    }
}

/// Extract the host portion of a URL without pulling in a URL crate.
/// Returns an empty string when there is no recognizable authority.
pub fn extract_domain(url: &str) -> String {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    rest.split(['/', '?', '#'])
        .next()
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_confidence_sources() {
        let cases = vec![
            "https://www.sec.gov/cgi-bin/browse-edgar?company=acme",
            "https://www.bloomberg.com/news/articles/acme-q4",
            "https://www.reuters.com/markets/companies/acme",
            "https://finance.yahoo.com/quote/ACME",
        ];

        for c in cases {
            assert_eq!(SourceClassifier::classify(c), Confidence::High, "{}", c);
        }
    }

    #[test]
    fn test_medium_confidence_sources() {
        let cases = vec![
            "https://seekingalpha.com/article/acme-deep-dive",
            "https://www.morningstar.com/stocks/acme",
            "https://economictimes.indiatimes.com/acme", // unknown → medium
        ];

        for c in cases {
            assert_eq!(SourceClassifier::classify(c), Confidence::Medium, "{}", c);
        }
    }

    #[test]
    fn test_unknown_source_defaults_to_medium() {
        assert_eq!(
            SourceClassifier::classify("https://some-random-blog.example/post/1"),
            Confidence::Medium
        );
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(
            SourceClassifier::classify("HTTPS://WWW.SEC.GOV/FILING"),
            Confidence::High
        );
    }

    #[test]
    fn test_classification_is_pure() {
        let url = "https://www.reuters.com/markets/acme";
        assert_eq!(
            SourceClassifier::classify(url),
            SourceClassifier::classify(url)
        );
    }

    #[test]
    fn test_idempotent_over_url_set_in_any_order() {
        let urls: Vec<String> = (0..100)
            .map(|i| match i % 3 {
                0 => format!("https://www.sec.gov/filing/{}", i),
                1 => format!("https://seekingalpha.com/article/{}", i),
                _ => format!("https://blog-{}.example/post", i),
            })
            .collect();

        let forward: Vec<Confidence> =
            urls.iter().map(|u| SourceClassifier::classify(u)).collect();
        let mut backward: Vec<Confidence> = urls
            .iter()
            .rev()
            .map(|u| SourceClassifier::classify(u))
            .collect();
        backward.reverse();

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://www.sec.gov/cgi-bin/browse"),
            "www.sec.gov"
        );
        assert_eq!(extract_domain("http://example.com?q=1"), "example.com");
        assert_eq!(extract_domain(""), "");
    }
}
