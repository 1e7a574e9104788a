//! Per-field heuristics over a segmented claim document.
//!
//! Every extractor reads the sections of its own tag and falls back to the
//! whole document when those are absent or blank. Fallback scans are
//! stricter (label-prefixed lines only) so stray body text is not picked up.

use crate::dates::{date_tokens, DateNormalizer};
use crate::normalizer::NormalizedDocument;
use crate::schema::{Admission, Patient};
use crate::sections::{Section, SectionTag};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*•·>]+\s*|\(?\d{1,3}(?:[.)]\s+|\)|\.$)|\(?[a-z][.)]\s+)").unwrap()
});
static NAME_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?:patient|member|enrollee)(?:'s)?\s*name\s*[:\-]|name\s*(?:of\s+patient\s*)?[:\-]|(?:patient|member|enrollee)\s*[:\-])\s*(.+)$|^(?:patient|member|enrollee)(?:'s)?\s*name\s+((?-i:\p{Lu}).*)$",
    )
    .unwrap()
});
static NAME_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s+(?:age|sex|gender|dob|d\.o\.b|date\s+of\s+birth|id|hmo|policy|member\s*(?:no|id|number)|phone|address)\b.*$",
    )
    .unwrap()
});
static NAME_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:invoice|scheme|insurer|value|hospital|clinic)\b").unwrap());
static AGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bage\s*[:\-]?\s*(\d{1,3})\b|\b(\d{1,3})\s*(?:years?|yrs?)(?:\s*old)?\b").unwrap()
});
static DIAGNOSIS_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:final\s+|provisional\s+|clinical\s+)?diagnos[ie]s\s*(?:details?)?\s*[:\-]\s*(.*)$")
        .unwrap()
});
static DIAGNOSIS_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:icd|code|amount|invoice|partner)\b").unwrap());
static PROCEDURE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:procedures?|treatments?|investigations?)\s*(?:done|performed)?\s*[:\-]\s*(.+)$")
        .unwrap()
});
static LEADING_ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}[-:\sT\d]*").unwrap());
static ADMISSION_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:admitted|admission|inpatient|in-patient|hospitali[sz]ed)\b").unwrap()
});
static ADMISSION_DATE_CUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\badmi(?:tted|ssion)\b").unwrap());
static DISCHARGE_CUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bdischarg(?:e|ed|ing)\b").unwrap());
static CURRENCY_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[₦$€£]|\b(?:NGN|USD|EUR|GBP|N)\.?)\s?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{1,2})?")
        .unwrap()
});
static TOTAL_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:total|grand\s+total|amount\s+payable|payable|settlement|net\s+value|balance\s+due)\b").unwrap()
});
static LABELLED_TOTAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:total\s+settlement|net\s+value|total\s+amount|grand\s+total|total)\s*[:\-]?\s*(\d{1,3}(?:,\d{3})+(?:\.\d{2})?|\d+\.\d{2})\b")
        .unwrap()
});
/// A total or subtotal row: the label and at most an amount.
static TOTAL_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:sub\s*-?\s*total|grand\s+total|total\s+settlement|total\s+amount|total|amount\s+payable|net\s+value|balance\s+due)\b[\s:\-]*(?:[₦$€£]|NGN|USD|EUR|GBP|N)?\.?\s?[\d,]*(?:\.\d+)?\s*$")
        .unwrap()
});
static TRAILING_NUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\s+(?:[₦$€£]|NGN|USD|EUR|GBP|N)?\.?\s?[\d,]*\d(?:\.\d+)?|\s+[₦$€£]|\s+x\d+)+$").unwrap()
});

/// Words that only occur in table column headers.
const COLUMN_WORDS: &[&str] = &[
    "date", "description", "qty", "quantity", "amount", "balance", "price", "unit", "rate",
    "code", "item", "items", "s/n", "sn", "no", "no.", "total", "cost", "dosage", "dose", "name",
    "drug", "service", "tariff", "units",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Found,
    NotFound,
}

/// Result of one extractor together with the found/not-found signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted<T> {
    pub value: T,
    pub confidence: Confidence,
}

impl<T> Extracted<T> {
    pub(crate) fn new(value: T, found: bool) -> Self {
        let confidence = if found {
            Confidence::Found
        } else {
            Confidence::NotFound
        };
        Self { value, confidence }
    }

    pub fn is_found(&self) -> bool {
        self.confidence == Confidence::Found
    }
}

/// Where an extractor reads from.
pub enum Scope<'a> {
    /// Lines of every section with the requested tag, in document order
    Section(Vec<&'a str>),
    /// No usable section: the whole document
    Document(Vec<&'a str>),
}

impl<'a> Scope<'a> {
    pub fn lines(&self) -> &[&'a str] {
        match self {
            Scope::Section(lines) | Scope::Document(lines) => lines,
        }
    }

    pub fn is_section(&self) -> bool {
        matches!(self, Scope::Section(_))
    }
}

/// The normalized document and its sections, shared by all extractors.
pub struct FieldContext<'a> {
    doc: &'a NormalizedDocument,
    sections: &'a [Section],
}

impl<'a> FieldContext<'a> {
    pub fn new(doc: &'a NormalizedDocument, sections: &'a [Section]) -> Self {
        Self { doc, sections }
    }

    pub fn scope(&self, tag: SectionTag) -> Scope<'a> {
        let lines: Vec<&'a str> = self
            .sections
            .iter()
            .filter(|s| s.tag == tag)
            .flat_map(|s| s.lines.iter().map(|l| l.as_str()))
            .collect();

        if lines.iter().any(|l| !l.is_empty()) {
            Scope::Section(lines)
        } else {
            Scope::Document(self.document_lines())
        }
    }

    pub fn document_lines(&self) -> Vec<&'a str> {
        self.doc.lines().iter().map(|l| l.as_str()).collect()
    }
}

pub fn extract_patient(ctx: &FieldContext) -> Extracted<Patient> {
    let scope = ctx.scope(SectionTag::Patient);
    let patient = Patient {
        name: scope.lines().iter().find_map(|line| patient_name(line)),
        age: scope.lines().iter().find_map(|line| patient_age(line)),
    };
    let found = !patient.is_empty();
    Extracted::new(patient, found)
}

fn patient_name(line: &str) -> Option<String> {
    let caps = NAME_LABEL.captures(line)?;
    let value = caps.get(1).or_else(|| caps.get(2))?.as_str();
    let value = NAME_TAIL.replace(value, "");
    let value = value.trim().trim_matches(|c: char| c == ':' || c == '-' || c == ',').trim();

    let letters = value.chars().filter(|c| c.is_alphabetic()).count();
    if letters == 0 || digit_ratio(value) > 0.5 || NAME_NOISE.is_match(value) {
        return None;
    }
    Some(value.to_string())
}

fn patient_age(line: &str) -> Option<u32> {
    AGE.captures_iter(line)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .filter_map(|m| m.as_str().parse::<u32>().ok())
        .find(|age| *age <= 130)
}

pub fn extract_diagnoses(ctx: &FieldContext) -> Extracted<Vec<String>> {
    let scope = ctx.scope(SectionTag::Diagnosis);
    let candidates = scope.lines().iter().filter_map(|line| {
        let line = strip_list_marker(line);
        if is_total_row(line) {
            return None;
        }
        match DIAGNOSIS_LABEL.captures(line) {
            Some(caps) => caps.get(1).map(|m| m.as_str()),
            None if scope.is_section() => Some(line),
            None => None,
        }
    });

    let mut seen = HashSet::new();
    let mut diagnoses = Vec::new();
    for candidate in candidates {
        let candidate = candidate.trim_matches(|c: char| c == '.' || c == ':' || c.is_whitespace());
        if !is_plausible_diagnosis(candidate) {
            continue;
        }
        if seen.insert(candidate.to_lowercase()) {
            diagnoses.push(candidate.to_string());
        }
    }

    let found = !diagnoses.is_empty();
    Extracted::new(diagnoses, found)
}

fn is_plausible_diagnosis(candidate: &str) -> bool {
    candidate.chars().count() > 2
        && candidate.chars().any(|c| c.is_alphabetic())
        && candidate.split_whitespace().count() <= 8
        && !DIAGNOSIS_NOISE.is_match(candidate)
        && !is_column_header(candidate)
}

pub fn extract_procedures(ctx: &FieldContext) -> Extracted<Vec<String>> {
    let scope = ctx.scope(SectionTag::Procedure);
    let procedures: Vec<String> = scope
        .lines()
        .iter()
        .filter_map(|line| {
            let line = strip_list_marker(line);
            if is_total_row(line) {
                return None;
            }
            let text = if scope.is_section() {
                line
            } else {
                PROCEDURE_LABEL.captures(line)?.get(1)?.as_str()
            };
            if is_column_header(text) {
                return None;
            }
            let text = LEADING_ISO_DATE.replace(text, "");
            let text = strip_trailing_numbers(&text);
            let text = text.trim_matches(|c: char| c == '-' || c == ':' || c.is_whitespace());
            text.chars()
                .any(|c| c.is_alphabetic())
                .then(|| text.to_string())
        })
        .collect();

    let found = !procedures.is_empty();
    Extracted::new(procedures, found)
}

pub fn extract_admission(ctx: &FieldContext, dates: &dyn DateNormalizer) -> Extracted<Admission> {
    let was_admitted = ctx
        .document_lines()
        .iter()
        .any(|line| ADMISSION_CUE.is_match(line));

    let scope = ctx.scope(SectionTag::Admission);
    let mut admission_date = None;
    let mut discharge_date = None;
    let mut first_uncued = None;

    for line in scope.lines() {
        let tokens: Vec<(usize, NaiveDate)> = date_tokens(line)
            .into_iter()
            .filter_map(|range| dates.normalize(&line[range.clone()]).map(|d| (range.start, d)))
            .collect();
        if tokens.is_empty() {
            continue;
        }

        let admit_at = ADMISSION_DATE_CUE.find(line).map(|m| m.end());
        let discharge_at = DISCHARGE_CUE.find(line).map(|m| m.end());

        if admission_date.is_none() {
            if let Some(start) = admit_at {
                // A discharge cue after the admission cue bounds the search.
                let end = discharge_at.filter(|d| *d > start).unwrap_or(usize::MAX);
                admission_date = first_date_between(&tokens, start, end);
            }
        }
        if discharge_date.is_none() {
            if let Some(start) = discharge_at {
                let end = admit_at.filter(|a| *a > start).unwrap_or(usize::MAX);
                discharge_date = first_date_between(&tokens, start, end);
            }
        }
        if admit_at.is_none() && discharge_at.is_none() && first_uncued.is_none() {
            first_uncued = tokens.first().map(|(_, d)| *d);
        }
    }

    if admission_date.is_none() && scope.is_section() {
        admission_date = first_uncued;
    }

    let admission = Admission {
        was_admitted,
        admission_date,
        discharge_date,
    };
    let found = !admission.is_empty();
    Extracted::new(admission, found)
}

fn first_date_between(tokens: &[(usize, NaiveDate)], start: usize, end: usize) -> Option<NaiveDate> {
    tokens
        .iter()
        .find(|(at, _)| *at >= start && *at < end)
        .map(|(_, d)| *d)
}

pub fn extract_total_amount(ctx: &FieldContext) -> Extracted<Option<String>> {
    let scope = ctx.scope(SectionTag::Billing);
    let lines = scope.lines();

    let mut cued = None;
    let mut largest: Option<(f64, &str)> = None;
    for line in lines {
        let on_total_line = TOTAL_CUE.is_match(line);
        for m in CURRENCY_AMOUNT.find_iter(line) {
            let token = m.as_str().trim();
            if on_total_line {
                cued = Some(token);
            }
            let value = amount_value(token);
            // `>=` keeps the last occurrence on ties.
            if largest.is_none_or(|(best, _)| value >= best) {
                largest = Some((value, token));
            }
        }
    }

    let total = cued
        .or(largest.map(|(_, token)| token))
        .or_else(|| {
            lines
                .iter()
                .filter_map(|line| LABELLED_TOTAL.captures(line))
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str())
                .last()
        })
        .map(str::to_string);

    let found = total.is_some();
    Extracted::new(total, found)
}

fn amount_value(token: &str) -> f64 {
    let digits: String = token
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse().unwrap_or(0.0)
}

/// Remove a leading bullet or list number.
pub(crate) fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    match LIST_MARKER.find(line) {
        Some(m) => line[m.end()..].trim_start(),
        None => line,
    }
}

/// Drop invoice columns (amounts, quantities, currency) bleeding into a text cell.
pub(crate) fn strip_trailing_numbers(text: &str) -> String {
    TRAILING_NUMERIC.replace(text.trim_end(), "").trim().to_string()
}

/// Whether the line is a total row rather than a list item.
pub(crate) fn is_total_row(line: &str) -> bool {
    TOTAL_ROW.is_match(strip_list_marker(line))
}

pub(crate) fn is_column_header(line: &str) -> bool {
    let words: Vec<String> = line
        .split(|c: char| c.is_whitespace() || c == '|' || c == ',')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();
    words.len() >= 2 && words.iter().all(|w| COLUMN_WORDS.contains(&w.as_str()))
}

fn digit_ratio(text: &str) -> f64 {
    let chars: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if chars.is_empty() {
        return 0.0;
    }
    let digits = chars.iter().filter(|c| c.is_ascii_digit()).count();
    digits as f64 / chars.len() as f64
}
