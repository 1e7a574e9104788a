pub mod config;
pub mod dates;
pub mod fallback;
pub mod fields;
pub mod medications;
pub mod normalizer;
pub mod schema;
pub mod sections;

pub use config::{FallbackConfig, FallbackTrigger};
pub use dates::{DateNormalizer, PatternDateNormalizer};
pub use fallback::{Cue, CueField, CueTable, CueValue};
pub use fields::{Confidence, Extracted};
pub use normalizer::{NormalizedDocument, TextNormalizer};
pub use schema::{Admission, ClaimRecord, Medication, Patient};
pub use sections::{HeadingRule, HeadingTable, Section, SectionSegmenter, SectionTag};

use fields::FieldContext;
use tracing::{debug, info};

/// Runs the normalize → segment → extract pipeline over OCR text.
///
/// Holds no per-call state, so one instance can serve concurrent requests.
pub struct ClaimExtractor {
    normalizer: TextNormalizer,
    segmenter: SectionSegmenter,
    dates: Box<dyn DateNormalizer>,
    cues: CueTable,
}

impl ClaimExtractor {
    pub fn new(
        normalizer: TextNormalizer,
        segmenter: SectionSegmenter,
        dates: Box<dyn DateNormalizer>,
        cues: CueTable,
    ) -> Self {
        Self {
            normalizer,
            segmenter,
            dates,
            cues,
        }
    }

    /// Parse OCR text into a claim record.
    pub fn extract(&self, raw_text: &str, config: &FallbackConfig) -> ClaimRecord {
        let doc = self.normalizer.normalize(raw_text);
        let sections = self.segmenter.segment(&doc);
        debug!(
            lines = doc.lines().len(),
            sections = sections.len(),
            "Segmented claim document"
        );

        let mut record = self.extract_fields(&doc, &sections);

        let fallback_wanted = match config.trigger {
            FallbackTrigger::Empty => record.is_empty(),
            FallbackTrigger::MissingKeyFields => record.is_missing_key_fields(),
        };
        let use_fallback = config.extraction && fallback_wanted;
        if use_fallback {
            let synthesized = self.cues.synthesize(raw_text);
            if record.is_empty() {
                record = synthesized;
            } else {
                record.fill_missing_from(synthesized);
            }
        }

        info!(
            patient = record.patient.name.is_some(),
            diagnoses = record.diagnoses.len(),
            medications = record.medications.len(),
            procedures = record.procedures.len(),
            total = record.total_amount.is_some(),
            fallback = use_fallback,
            "Extracted claim record"
        );

        record
    }

    /// Run every field extractor in a fixed order without any fallback.
    pub fn extract_fields(&self, doc: &NormalizedDocument, sections: &[Section]) -> ClaimRecord {
        let ctx = FieldContext::new(doc, sections);

        let patient = fields::extract_patient(&ctx);
        let diagnoses = fields::extract_diagnoses(&ctx);
        let medications = medications::extract_medications(&ctx);
        let procedures = fields::extract_procedures(&ctx);
        let admission = fields::extract_admission(&ctx, self.dates.as_ref());
        let total_amount = fields::extract_total_amount(&ctx);

        debug!(
            patient = patient.is_found(),
            diagnoses = diagnoses.is_found(),
            medications = medications.is_found(),
            procedures = procedures.is_found(),
            admission = admission.is_found(),
            total = total_amount.is_found(),
            "Field extractors finished"
        );

        ClaimRecord {
            patient: patient.value,
            diagnoses: diagnoses.value,
            medications: medications.value,
            procedures: procedures.value,
            admission: admission.value,
            total_amount: total_amount.value,
        }
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    pub fn segmenter(&self) -> &SectionSegmenter {
        &self.segmenter
    }
}

impl Default for ClaimExtractor {
    fn default() -> Self {
        Self::new(
            TextNormalizer::default(),
            SectionSegmenter::default(),
            Box::new(PatternDateNormalizer),
            CueTable::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SAMPLE_CLAIM: &str = "\
CITY GENERAL HOSPITAL
Claim Form

PATIENT INFORMATION
Patient Name: Jane Doe   Age: 34
Sex: Female

DIAGNOSIS DETAILS
Diagnosis: Hypertension
Malaria

MEDICATIONS
Item Qty Amount
Paracetamol 500mg x10 tablets
Amlodipine 5mg 30 tablets 4,500.00

PROCEDURES
2023-06-10 Full blood count 1 ₦3,500.00
Malaria parasite test ₦1,500.00

ADMISSION DETAILS
Admission Date: 10/06/2023
Discharge Date: 12/06/2023

BILLING SUMMARY
Consultation ₦5,000.00
Total ₦22,800.00
POWERED BY SMART APPLICATIONS
Page 1 of 1
";

    #[test]
    fn test_full_claim() {
        let extractor = ClaimExtractor::default();
        let record = extractor.extract(SAMPLE_CLAIM, &FallbackConfig::disabled());

        assert_eq!(record.patient.name.as_deref(), Some("Jane Doe"));
        assert_eq!(record.patient.age, Some(34));
        assert_eq!(record.diagnoses, vec!["Hypertension", "Malaria"]);
        assert_eq!(
            record.medications,
            vec![
                Medication {
                    name: "Paracetamol".to_string(),
                    dosage: Some("500mg".to_string()),
                    quantity: Some("10 tablets".to_string()),
                },
                Medication {
                    name: "Amlodipine".to_string(),
                    dosage: Some("5mg".to_string()),
                    quantity: Some("30 tablets".to_string()),
                },
            ]
        );
        assert_eq!(record.procedures, vec!["Full blood count", "Malaria parasite test"]);
        assert!(record.admission.was_admitted);
        assert_eq!(record.admission.admission_date, NaiveDate::from_ymd_opt(2023, 6, 10));
        assert_eq!(record.admission.discharge_date, NaiveDate::from_ymd_opt(2023, 6, 12));
        assert_eq!(record.total_amount.as_deref(), Some("₦22,800.00"));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let extractor = ClaimExtractor::default();
        let config = FallbackConfig::enabled();

        let first = serde_json::to_string(&extractor.extract(SAMPLE_CLAIM, &config)).unwrap();
        let second = serde_json::to_string(&extractor.extract(SAMPLE_CLAIM, &config)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_scenario_diagnosis_section() {
        let record = ClaimExtractor::default().extract(
            "DIAGNOSIS\nDiagnosis: Hypertension",
            &FallbackConfig::disabled(),
        );
        assert_eq!(record.diagnoses, vec!["Hypertension"]);
    }

    #[test]
    fn test_scenario_medication_section() {
        let record = ClaimExtractor::default().extract(
            "MEDICATION\nParacetamol 500mg x10 tablets",
            &FallbackConfig::disabled(),
        );
        assert_eq!(
            record.medications,
            vec![Medication {
                name: "Paracetamol".to_string(),
                dosage: Some("500mg".to_string()),
                quantity: Some("10 tablets".to_string()),
            }]
        );
    }

    #[test]
    fn test_scenario_total_in_billing_section() {
        let record = ClaimExtractor::default().extract(
            "BILLING\nRegistration ₦2,000.00\nTotal: ₦22,800.00",
            &FallbackConfig::disabled(),
        );
        assert_eq!(record.total_amount.as_deref(), Some("₦22,800.00"));
    }

    #[test]
    fn test_total_rows_inside_list_sections() {
        let record = ClaimExtractor::default().extract(
            "DIAGNOSIS\nMalaria\nGrand Total ₦5,000.00\nPROCEDURES\nChest X-Ray ₦3,000.00\nSub Total ₦3,000.00\nMEDICATIONS\nParacetamol 500mg x10 tablets\nTotal ₦2,000.00",
            &FallbackConfig::disabled(),
        );

        assert_eq!(record.diagnoses, vec!["Malaria"]);
        assert_eq!(record.procedures, vec!["Chest X-Ray"]);
        assert_eq!(record.medications.len(), 1);
        assert_eq!(record.medications[0].name, "Paracetamol");
        assert_eq!(record.total_amount.as_deref(), Some("₦2,000.00"));
    }

    #[test]
    fn test_empty_input_without_fallback() {
        let extractor = ClaimExtractor::default();

        for raw in ["", "   \n\t\n", "\u{000C}"] {
            let record = extractor.extract(raw, &FallbackConfig::disabled());
            assert_eq!(record, ClaimRecord::default());
        }
    }

    #[test]
    fn test_fallback_gating() {
        let extractor = ClaimExtractor::default();
        let noisy = "scanned page: pt had malaria, given coartem";

        let disabled = extractor.extract(noisy, &FallbackConfig::disabled());
        assert_eq!(disabled, ClaimRecord::default());

        let qa_only = FallbackConfig::from_flags(None, Some("true"));
        assert_eq!(extractor.extract(noisy, &qa_only), ClaimRecord::default());

        let enabled = extractor.extract(noisy, &FallbackConfig::enabled());
        assert_eq!(enabled.diagnoses, vec!["Malaria"]);
        assert_eq!(enabled.patient.name.as_deref(), Some("Unknown"));
        assert_eq!(enabled.medications.len(), 1);
    }

    #[test]
    fn test_empty_trigger_leaves_partial_results_alone() {
        let extractor = ClaimExtractor::default();
        let text = "Diagnosis: Malaria\nPaid NGN 4,000 for an xray";

        let record = extractor.extract(text, &FallbackConfig::enabled());
        assert_eq!(record.diagnoses, vec!["Malaria"]);
        assert_eq!(record.patient.name, None);
        assert!(record.procedures.is_empty());
    }

    #[test]
    fn test_missing_key_fields_trigger_fills_gaps() {
        let extractor = ClaimExtractor::default();
        let text = "Diagnosis: Typhoid\nxray done";
        let config = FallbackConfig::enabled().with_trigger(FallbackTrigger::MissingKeyFields);

        let record = extractor.extract(text, &config);
        assert_eq!(record.diagnoses, vec!["Typhoid"]);
        assert_eq!(record.patient.name.as_deref(), Some("Unknown"));
        assert_eq!(record.procedures, vec!["X-Ray"]);
    }

    #[test]
    fn test_record_shape_is_fixed_for_sparse_input() {
        let extractor = ClaimExtractor::default();
        for raw in ["", "Age: 40", "Total ₦100"] {
            let value = serde_json::to_value(extractor.extract(raw, &FallbackConfig::disabled())).unwrap();
            assert_eq!(value.as_object().unwrap().len(), 6);
            for key in ["patient", "diagnoses", "medications", "procedures", "admission", "total_amount"] {
                assert!(value.get(key).is_some(), "missing key {}", key);
            }
        }
    }
}
