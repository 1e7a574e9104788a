//! Canned answer used when no field answers the question directly.

use extract::ClaimRecord;

pub const NOTHING_INFERRED: &str = "Based on available data, no relevant information could be inferred.";

/// Summarize whatever the record holds into one sentence.
pub fn summarize(record: &ClaimRecord) -> String {
    let mut facts = Vec::new();

    if let Some(name) = &record.patient.name {
        facts.push(format!("the patient was {}", name));
    }
    if !record.diagnoses.is_empty() {
        facts.push(format!("diagnosed with {}", record.diagnoses.join(", ")));
    }
    if !record.medications.is_empty() {
        let names: Vec<&str> = record.medications.iter().map(|m| m.name.as_str()).collect();
        facts.push(format!("given {}", names.join(", ")));
    }
    if !record.procedures.is_empty() {
        facts.push(format!("procedures done: {}", record.procedures.join(", ")));
    }
    if let Some(total) = &record.total_amount {
        facts.push(format!("total amount was {}", total));
    }

    if facts.is_empty() {
        return NOTHING_INFERRED.to_string();
    }
    format!("Based on the document, {}.", facts.join("; "))
}
