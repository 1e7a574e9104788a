use crate::fallback;
use crate::intent::{Intent, IntentTable, Question, FUZZY_THRESHOLD};
use crate::similarity::{EditSimilarity, Similarity};
use extract::{Admission, ClaimRecord, FallbackConfig, Medication};
use serde::Serialize;
use tracing::debug;

/// Returned when nothing in the record answers the question and the QA
/// fallback is off.
pub const NO_ANSWER: &str = "No answer found in the document.";

const QUANTITY_WORDS: &[&str] = &["quantity", "qty"];
const DOSAGE_WORDS: &[&str] = &["dosage", "dose", "mg", "ml", "strength"];
const AGE_WORDS: &[&str] = &["age", "old"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "intent")]
pub enum AnswerSource {
    /// Projected from the record field(s) of this intent
    Field(Intent),
    Fallback,
    NoAnswer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub text: String,
    pub source: AnswerSource,
}

/// Answers free-text questions from a stored claim record.
pub struct AnswerMatcher {
    intents: IntentTable,
    similarity: Box<dyn Similarity>,
}

impl AnswerMatcher {
    pub fn new(intents: IntentTable, similarity: Box<dyn Similarity>) -> Self {
        Self { intents, similarity }
    }

    pub fn answer(&self, record: &ClaimRecord, question: &str, config: &FallbackConfig) -> String {
        self.respond(record, question, config).text
    }

    /// Like [`answer`](Self::answer), also reporting where the text came from.
    pub fn respond(&self, record: &ClaimRecord, question: &str, config: &FallbackConfig) -> Answer {
        let question = Question::parse(question);
        let intent = self.intents.classify(&question, self.similarity.as_ref());
        let projected = intent.and_then(|intent| Some((intent, self.project(intent, record, &question)?)));

        let answer = match projected {
            Some((intent, text)) => Answer {
                text,
                source: AnswerSource::Field(intent),
            },
            None if config.qa => Answer {
                text: fallback::summarize(record),
                source: AnswerSource::Fallback,
            },
            None => Answer {
                text: NO_ANSWER.to_string(),
                source: AnswerSource::NoAnswer,
            },
        };

        debug!(intent = ?intent, source = ?answer.source, "Matched question");
        answer
    }

    /// Render the record field(s) for `intent`, or `None` when they are empty.
    fn project(&self, intent: Intent, record: &ClaimRecord, question: &Question) -> Option<String> {
        match intent {
            Intent::Diagnosis => join_non_empty(&record.diagnoses),
            Intent::Procedure => join_non_empty(&record.procedures),
            Intent::Amount => record.total_amount.clone(),
            Intent::Admission => Some(describe_admission(&record.admission)),
            Intent::Patient => {
                let asks_age = question.has_phrase("how old")
                    || AGE_WORDS.iter().any(|w| question.has_token(w));
                if asks_age {
                    record
                        .patient
                        .age
                        .map(|age| format!("The patient is {} years old.", age))
                } else {
                    record
                        .patient
                        .name
                        .as_ref()
                        .map(|name| format!("The patient's name is {}.", name))
                }
            }
            Intent::Medication => self.describe_medications(&record.medications, question),
        }
    }

    fn describe_medications(&self, medications: &[Medication], question: &Question) -> Option<String> {
        if medications.is_empty() {
            return None;
        }

        let Some(named) = medications.iter().find(|m| self.mentions(question, &m.name)) else {
            let names: Vec<&str> = medications.iter().map(|m| m.name.as_str()).collect();
            return Some(format!("Medications mentioned: {}", names.join(", ")));
        };

        if question.has_phrase("how many") || QUANTITY_WORDS.iter().any(|w| question.has_token(w)) {
            return named.quantity.clone();
        }
        if DOSAGE_WORDS.iter().any(|w| question.has_token(w)) {
            return named.dosage.clone();
        }
        Some(match &named.dosage {
            Some(dosage) => format!("{} ({})", named.name, dosage),
            None => named.name.clone(),
        })
    }

    /// Whether the question names this medication, allowing a typo in its first word.
    fn mentions(&self, question: &Question, name: &str) -> bool {
        let name = Question::parse(name);
        if name.is_empty() {
            return false;
        }
        if format!(" {} ", question.joined()).contains(&format!(" {} ", name.joined())) {
            return true;
        }
        let first = &name.tokens()[0];
        first.chars().count() >= 5
            && question
                .tokens()
                .iter()
                .any(|token| self.similarity.score(first, token) >= FUZZY_THRESHOLD)
    }
}

impl Default for AnswerMatcher {
    fn default() -> Self {
        Self::new(IntentTable::default(), Box::new(EditSimilarity))
    }
}

fn join_non_empty(values: &[String]) -> Option<String> {
    (!values.is_empty()).then(|| values.join(", "))
}

fn describe_admission(admission: &Admission) -> String {
    if !admission.was_admitted && admission.admission_date.is_none() {
        return "No, the patient was not admitted.".to_string();
    }
    match (admission.admission_date, admission.discharge_date) {
        (Some(admitted), Some(discharged)) => {
            format!("Yes, admitted on {} and discharged on {}.", admitted, discharged)
        }
        (Some(admitted), None) => format!("Yes, admitted on {}.", admitted),
        (None, Some(discharged)) => {
            format!("Yes, the patient was admitted and discharged on {}.", discharged)
        }
        (None, None) => "Yes, the patient was admitted.".to_string(),
    }
}
