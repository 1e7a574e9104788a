pub mod answer;
pub mod fallback;
pub mod intent;
pub mod similarity;

pub use answer::{Answer, AnswerMatcher, AnswerSource, NO_ANSWER};
pub use intent::{Intent, IntentRule, IntentTable, Question};
pub use similarity::{EditSimilarity, Similarity};

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{ClaimExtractor, FallbackConfig};

    #[test]
    fn test_extract_then_ask() {
        let config = FallbackConfig::disabled();
        let record = ClaimExtractor::default().extract(
            "DIAGNOSIS\nDiagnosis: Hypertension\nBILLING\nTotal ₦22,800.00",
            &config,
        );
        let matcher = AnswerMatcher::default();

        assert_eq!(matcher.answer(&record, "What is the diagnosis?", &config), "Hypertension");
        assert_eq!(matcher.answer(&record, "how much is the bill", &config), "₦22,800.00");
    }

    #[test]
    fn test_empty_document_gets_sentinel() {
        let config = FallbackConfig::disabled();
        let record = ClaimExtractor::default().extract("", &config);
        assert_eq!(AnswerMatcher::default().answer(&record, "anything", &config), NO_ANSWER);
    }
}
