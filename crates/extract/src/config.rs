use serde::{Deserialize, Serialize};

/// When the extraction fallback runs, given that it is enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackTrigger {
    /// Only when regex extraction found nothing; the synthesized record replaces it
    #[default]
    Empty,
    /// Also when patient name, diagnoses or total is missing; only empty fields are filled
    MissingKeyFields,
}

impl FallbackTrigger {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("missing_key_fields") | Some("missing-key-fields") | Some("partial") => {
                FallbackTrigger::MissingKeyFields
            }
            _ => FallbackTrigger::Empty,
        }
    }
}

/// Flags read at call time by extraction and question answering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub extraction: bool,
    pub qa: bool,
    pub trigger: FallbackTrigger,
}

impl FallbackConfig {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn enabled() -> Self {
        Self {
            extraction: true,
            qa: true,
            trigger: FallbackTrigger::Empty,
        }
    }

    /// Build from raw flag values; missing or malformed flags disable the fallback.
    pub fn from_flags(extraction: Option<&str>, qa: Option<&str>) -> Self {
        Self {
            extraction: parse_flag(extraction),
            qa: parse_flag(qa),
            trigger: FallbackTrigger::Empty,
        }
    }

    pub fn with_trigger(mut self, trigger: FallbackTrigger) -> Self {
        self.trigger = trigger;
        self
    }
}

pub fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_lowercase()).as_deref(),
        Some("1") | Some("true") | Some("yes") | Some("on")
    )
}
