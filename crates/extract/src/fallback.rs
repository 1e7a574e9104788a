//! Deterministic stand-in for model-based extraction.
//!
//! A fixed table of cue substrings is matched against the raw text. Each
//! hit contributes one field value; fields with no hit keep fixed defaults.
//! Nothing here is called by the regular extractors.

use crate::schema::{Admission, ClaimRecord, Medication, Patient};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static AMOUNT_AFTER_CUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.?\s?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{1,2})?").unwrap());

/// Patient name used when the text carries no name cue.
pub const UNKNOWN_PATIENT: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueField {
    PatientName,
    Diagnosis,
    Medication,
    Procedure,
    Admitted,
    TotalAmount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CueValue {
    /// Fixed value for the field
    Literal(String),
    /// Rest of the line after the cue, e.g. a name after `Patient:`
    RestOfLine,
    /// Cue followed by an amount; the cue and amount are kept verbatim
    Amount,
}

#[derive(Debug, Clone)]
pub struct Cue {
    pattern: Regex,
    pub field: CueField,
    pub value: CueValue,
}

impl Cue {
    pub fn new(needle: &str, field: CueField, value: CueValue) -> Self {
        let pattern = Regex::new(&format!("(?i){}", regex::escape(needle))).unwrap();
        Self { pattern, field, value }
    }

    pub fn literal(needle: &str, field: CueField, value: &str) -> Self {
        Self::new(needle, field, CueValue::Literal(value.to_string()))
    }
}

/// Ordered cue table consulted when regex extraction comes back empty.
#[derive(Debug, Clone)]
pub struct CueTable {
    cues: Vec<Cue>,
}

struct Hit {
    at: usize,
    field: CueField,
    value: String,
}

impl CueTable {
    pub fn new(cues: Vec<Cue>) -> Self {
        Self { cues }
    }

    /// Build a record from cue hits in `raw`, in order of first appearance.
    pub fn synthesize(&self, raw: &str) -> ClaimRecord {
        let mut hits: Vec<Hit> = self
            .cues
            .iter()
            .flat_map(|cue| cue.pattern.find_iter(raw).map(move |m| (cue, m)))
            .filter_map(|(cue, m)| {
                let value = match &cue.value {
                    CueValue::Literal(value) => value.clone(),
                    CueValue::RestOfLine => rest_of_line(&raw[m.end()..])?,
                    CueValue::Amount => {
                        let amount = AMOUNT_AFTER_CUE.find(&raw[m.end()..])?;
                        format!("{}{}", m.as_str(), amount.as_str())
                    }
                };
                Some(Hit { at: m.start(), field: cue.field, value })
            })
            .collect();
        hits.sort_by_key(|hit| hit.at);

        let first = |field: CueField| {
            hits.iter()
                .find(|hit| hit.field == field)
                .map(|hit| hit.value.clone())
        };
        let all = |field: CueField| {
            let mut seen = HashSet::new();
            hits.iter()
                .filter(|hit| hit.field == field)
                .filter(|hit| seen.insert(hit.value.to_lowercase()))
                .map(|hit| hit.value.clone())
                .collect::<Vec<_>>()
        };

        ClaimRecord {
            patient: Patient {
                name: Some(first(CueField::PatientName).unwrap_or_else(|| UNKNOWN_PATIENT.to_string())),
                age: None,
            },
            diagnoses: all(CueField::Diagnosis),
            medications: all(CueField::Medication)
                .into_iter()
                .map(|name| Medication { name, dosage: None, quantity: None })
                .collect(),
            procedures: all(CueField::Procedure),
            admission: Admission {
                was_admitted: first(CueField::Admitted).is_some(),
                admission_date: None,
                discharge_date: None,
            },
            total_amount: first(CueField::TotalAmount),
        }
    }
}

impl Default for CueTable {
    fn default() -> Self {
        use CueField::*;
        Self::new(vec![
            Cue::new("patient name", PatientName, CueValue::RestOfLine),
            Cue::new("member name", PatientName, CueValue::RestOfLine),
            Cue::new("patient:", PatientName, CueValue::RestOfLine),
            Cue::new("member:", PatientName, CueValue::RestOfLine),
            Cue::literal("malaria", Diagnosis, "Malaria"),
            Cue::literal("typhoid", Diagnosis, "Typhoid Fever"),
            Cue::literal("hypertension", Diagnosis, "Hypertension"),
            Cue::literal("diabetes", Diagnosis, "Diabetes Mellitus"),
            Cue::literal("pneumonia", Diagnosis, "Pneumonia"),
            Cue::literal("asthma", Diagnosis, "Asthma"),
            Cue::literal("gastroenteritis", Diagnosis, "Gastroenteritis"),
            Cue::literal("peptic ulcer", Diagnosis, "Peptic Ulcer Disease"),
            Cue::literal("urinary tract infection", Diagnosis, "Urinary Tract Infection"),
            Cue::literal("paracetamol", Medication, "Paracetamol"),
            Cue::literal("amoxicillin", Medication, "Amoxicillin"),
            Cue::literal("artemether", Medication, "Artemether/Lumefantrine"),
            Cue::literal("coartem", Medication, "Artemether/Lumefantrine"),
            Cue::literal("metformin", Medication, "Metformin"),
            Cue::literal("amlodipine", Medication, "Amlodipine"),
            Cue::literal("ciprofloxacin", Medication, "Ciprofloxacin"),
            Cue::literal("mri", Procedure, "MRI"),
            Cue::literal("ct scan", Procedure, "CT Scan"),
            Cue::literal("x-ray", Procedure, "X-Ray"),
            Cue::literal("xray", Procedure, "X-Ray"),
            Cue::literal("ultrasound", Procedure, "Ultrasound"),
            Cue::literal("full blood count", Procedure, "Full Blood Count"),
            Cue::literal("ecg", Procedure, "ECG"),
            Cue::literal("admit", Admitted, "admitted"),
            Cue::literal("inpatient", Admitted, "admitted"),
            Cue::new("₦", TotalAmount, CueValue::Amount),
            Cue::new("NGN", TotalAmount, CueValue::Amount),
            Cue::new("$", TotalAmount, CueValue::Amount),
        ])
    }
}

fn rest_of_line(text: &str) -> Option<String> {
    let line = text.lines().next().unwrap_or("");
    let value = line
        .trim_start_matches(|c: char| c == ':' || c == '-' || c.is_whitespace())
        .trim();
    value
        .chars()
        .any(|c| c.is_alphabetic())
        .then(|| value.to_string())
}
