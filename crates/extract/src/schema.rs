use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub name: Option<String>,
    pub age: Option<u32>,
}

impl Patient {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    pub dosage: Option<String>,
    pub quantity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub was_admitted: bool,
    pub admission_date: Option<NaiveDate>,
    pub discharge_date: Option<NaiveDate>,
}

impl Admission {
    pub fn is_empty(&self) -> bool {
        !self.was_admitted && self.admission_date.is_none() && self.discharge_date.is_none()
    }
}

/// Structured result of one claim document.
///
/// The serialized shape is fixed: all six top-level keys are always written,
/// absent values come out as `null` or `[]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    #[serde(default)]
    pub patient: Patient,
    #[serde(default)]
    pub diagnoses: Vec<String>,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub procedures: Vec<String>,
    #[serde(default)]
    pub admission: Admission,
    #[serde(default)]
    pub total_amount: Option<String>,
}

impl ClaimRecord {
    /// True when the extractors found nothing at all.
    pub fn is_empty(&self) -> bool {
        self.patient.is_empty()
            && self.diagnoses.is_empty()
            && self.medications.is_empty()
            && self.procedures.is_empty()
            && self.admission.is_empty()
            && self.total_amount.is_none()
    }

    /// True when any of the fields a reviewer needs first (patient name,
    /// diagnoses, total) is missing.
    pub fn is_missing_key_fields(&self) -> bool {
        self.patient.name.is_none() || self.diagnoses.is_empty() || self.total_amount.is_none()
    }

    /// Fill every empty field of `self` from `other`, leaving found values alone.
    pub fn fill_missing_from(&mut self, other: ClaimRecord) {
        if self.patient.name.is_none() {
            self.patient.name = other.patient.name;
        }
        if self.patient.age.is_none() {
            self.patient.age = other.patient.age;
        }
        if self.diagnoses.is_empty() {
            self.diagnoses = other.diagnoses;
        }
        if self.medications.is_empty() {
            self.medications = other.medications;
        }
        if self.procedures.is_empty() {
            self.procedures = other.procedures;
        }
        if self.admission.is_empty() {
            self.admission = other.admission;
        }
        if self.total_amount.is_none() {
            self.total_amount = other.total_amount;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record_keeps_fixed_shape() {
        let value = serde_json::to_value(ClaimRecord::default()).unwrap();
        let object = value.as_object().unwrap();

        let mut keys: Vec<&str> = object.keys().map(|k| k.as_str()).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["admission", "diagnoses", "medications", "patient", "procedures", "total_amount"]
        );
        assert_eq!(value["patient"], serde_json::json!({"name": null, "age": null}));
        assert_eq!(
            value["admission"],
            serde_json::json!({"was_admitted": false, "admission_date": null, "discharge_date": null})
        );
        assert!(value["total_amount"].is_null());
    }

    #[test]
    fn test_dates_serialize_as_iso() {
        let record = ClaimRecord {
            admission: Admission {
                was_admitted: true,
                admission_date: NaiveDate::from_ymd_opt(2023, 6, 10),
                discharge_date: None,
            },
            ..Default::default()
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["admission"]["admission_date"], "2023-06-10");
    }

    #[test]
    fn test_fill_missing_keeps_found_values() {
        let mut record = ClaimRecord {
            diagnoses: vec!["Malaria".to_string()],
            ..Default::default()
        };
        let synthesized = ClaimRecord {
            patient: Patient { name: Some("Unknown".to_string()), age: None },
            diagnoses: vec!["Typhoid".to_string()],
            total_amount: Some("₦5,000".to_string()),
            ..Default::default()
        };

        record.fill_missing_from(synthesized);

        assert_eq!(record.diagnoses, vec!["Malaria"]);
        assert_eq!(record.patient.name.as_deref(), Some("Unknown"));
        assert_eq!(record.total_amount.as_deref(), Some("₦5,000"));
    }

    #[test]
    fn test_partial_record_is_not_empty() {
        let record = ClaimRecord {
            admission: Admission { was_admitted: true, ..Default::default() },
            ..Default::default()
        };
        assert!(!record.is_empty());
        assert!(record.is_missing_key_fields());
    }
}
