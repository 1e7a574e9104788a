use crate::similarity::Similarity;
use serde::{Deserialize, Serialize};

/// Fuzzy matches must reach this score.
pub const FUZZY_THRESHOLD: f64 = 0.8;
/// Shorter keywords only match by prefix. One edit in six letters still
/// scores above the threshold (`change` against `charge`).
const FUZZY_MIN_LEN: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Diagnosis,
    Medication,
    Amount,
    Admission,
    Patient,
    Procedure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentRule {
    pub intent: Intent,
    pub keywords: Vec<String>,
}

impl IntentRule {
    pub fn new(intent: Intent, keywords: &[&str]) -> Self {
        Self {
            intent,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

/// A question split into lowercase word tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    tokens: Vec<String>,
}

impl Question {
    pub fn parse(text: &str) -> Self {
        let cleaned: String = text
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();
        Self {
            tokens: cleaned.split_whitespace().map(str::to_string).collect(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Whether the words of `phrase` occur consecutively.
    pub fn has_phrase(&self, phrase: &str) -> bool {
        let words: Vec<&str> = phrase.split_whitespace().collect();
        if words.is_empty() {
            return false;
        }
        self.tokens
            .windows(words.len())
            .any(|window| window.iter().zip(&words).all(|(t, w)| t == w))
    }

    pub fn has_token(&self, word: &str) -> bool {
        self.tokens.iter().any(|t| t == word)
    }

    /// Space-joined tokens, for substring checks against multi-word names.
    pub fn joined(&self) -> String {
        self.tokens.join(" ")
    }
}

/// Ordered intent rules; the first rule with a matching keyword wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentTable {
    rules: Vec<IntentRule>,
}

impl IntentTable {
    pub fn new(rules: Vec<IntentRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    pub fn classify(&self, question: &Question, similarity: &dyn Similarity) -> Option<Intent> {
        self.rules
            .iter()
            .find(|rule| {
                rule.keywords
                    .iter()
                    .any(|keyword| keyword_matches(keyword, question, similarity))
            })
            .map(|rule| rule.intent)
    }
}

impl Default for IntentTable {
    fn default() -> Self {
        use Intent::*;
        Self::new(vec![
            IntentRule::new(Diagnosis, &["diagnos", "condition", "disease"]),
            IntentRule::new(
                Medication,
                &["medication", "drug", "medicine", "dose", "dosage", "tablet", "capsule", "prescri"],
            ),
            IntentRule::new(
                Amount,
                &["total", "amount", "cost", "bill", "payable", "charge", "how much"],
            ),
            IntentRule::new(
                Admission,
                &["admit", "admission", "discharge", "inpatient", "hospitali"],
            ),
            IntentRule::new(Patient, &["name", "patient", "member", "who", "age", "how old"]),
            IntentRule::new(
                Procedure,
                &["procedure", "treatment", "test", "scan", "investigation"],
            ),
        ])
    }
}

fn keyword_matches(keyword: &str, question: &Question, similarity: &dyn Similarity) -> bool {
    if keyword.contains(' ') {
        return question.has_phrase(keyword);
    }

    let keyword_len = keyword.chars().count();
    question.tokens().iter().any(|token| {
        if token.starts_with(keyword) {
            return true;
        }
        if keyword_len < FUZZY_MIN_LEN {
            return false;
        }
        let prefix: String = token.chars().take(keyword_len).collect();
        similarity.score(keyword, token) >= FUZZY_THRESHOLD
            || similarity.score(keyword, &prefix) >= FUZZY_THRESHOLD
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::EditSimilarity;

    fn classify(text: &str) -> Option<Intent> {
        IntentTable::default().classify(&Question::parse(text), &EditSimilarity)
    }

    #[test]
    fn test_question_parse() {
        let q = Question::parse("What's the patient's  NAME?");
        assert_eq!(q.tokens(), ["what", "s", "the", "patient", "s", "name"]);
        assert!(q.has_phrase("patient s name"));
        assert!(!q.has_phrase("name patient"));
        assert!(Question::parse(" ?! ").is_empty());
    }

    #[test]
    fn test_basic_intents() {
        assert_eq!(classify("What is the diagnosis?"), Some(Intent::Diagnosis));
        assert_eq!(classify("Which drugs were given?"), Some(Intent::Medication));
        assert_eq!(classify("What is the total amount?"), Some(Intent::Amount));
        assert_eq!(classify("How much was paid?"), Some(Intent::Amount));
        assert_eq!(classify("Was the patient admitted?"), Some(Intent::Admission));
        assert_eq!(classify("When was she discharged?"), Some(Intent::Admission));
        assert_eq!(classify("What is the patient's name?"), Some(Intent::Patient));
        assert_eq!(classify("How old is the patient?"), Some(Intent::Patient));
        assert_eq!(classify("Which procedures were performed?"), Some(Intent::Procedure));
    }

    #[test]
    fn test_table_order_breaks_ties() {
        // Both diagnosis and patient keywords; diagnosis comes first.
        assert_eq!(classify("What was the patient diagnosed with?"), Some(Intent::Diagnosis));
        // Both medication and amount keywords; medication comes first.
        assert_eq!(classify("Total cost of medication?"), Some(Intent::Medication));
    }

    #[test]
    fn test_misspellings() {
        assert_eq!(classify("What is the diagnsois?"), Some(Intent::Diagnosis));
        assert_eq!(classify("list the medicaton"), Some(Intent::Medication));
        assert_eq!(classify("date of admsision"), Some(Intent::Admission));
    }

    #[test]
    fn test_short_keywords_do_not_fuzz() {
        // "cast" is one edit from "cost" but short keywords need a prefix match.
        assert_eq!(classify("cast"), None);
        assert_eq!(classify("What changed?"), None);
        assert_eq!(classify("Is this a memper?"), None);
    }

    #[test]
    fn test_unknown_intent() {
        assert_eq!(classify("anything"), None);
        assert_eq!(classify(""), None);
        assert_eq!(classify("Is it raining?"), None);
    }

    #[test]
    fn test_custom_table() {
        let table = IntentTable::new(vec![IntentRule::new(Intent::Amount, &["Invoice"])]);
        let intent = table.classify(&Question::parse("invoice value"), &EditSimilarity);
        assert_eq!(intent, Some(Intent::Amount));
    }
}
