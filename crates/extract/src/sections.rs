use crate::normalizer::NormalizedDocument;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static LEADING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:#+\s*|(?:\d{1,2}|[a-z])[.)]\s+)").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Headings are short; anything longer is body text.
const MAX_HEADING_LEN: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionTag {
    Patient,
    Diagnosis,
    Medication,
    Procedure,
    Admission,
    Billing,
    Unclassified,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadingRule {
    pub tag: SectionTag,
    pub variants: Vec<String>,
}

impl HeadingRule {
    pub fn new(tag: SectionTag, variants: &[&str]) -> Self {
        Self {
            tag,
            variants: variants.iter().map(|v| heading_key(v)).collect(),
        }
    }
}

/// Ordered heading variants per section tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<HeadingRule>", into = "Vec<HeadingRule>")]
pub struct HeadingTable {
    rules: Vec<HeadingRule>,
}

impl HeadingTable {
    pub fn new(rules: Vec<HeadingRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| HeadingRule {
                tag: rule.tag,
                variants: rule.variants.iter().map(|v| heading_key(v)).collect(),
            })
            .collect();
        Self { rules }
    }

    pub fn rules(&self) -> &[HeadingRule] {
        &self.rules
    }

    /// Tag of the heading `line` introduces, if it is one.
    ///
    /// When several variants match, the longest wins; on equal length the
    /// earlier rule wins.
    pub fn classify(&self, line: &str) -> Option<SectionTag> {
        if line.chars().count() > MAX_HEADING_LEN {
            return None;
        }
        let key = heading_key(line);
        if key.is_empty() {
            return None;
        }

        let mut best: Option<(usize, SectionTag)> = None;
        for rule in &self.rules {
            for variant in &rule.variants {
                if *variant == key && best.is_none_or(|(len, _)| variant.len() > len) {
                    best = Some((variant.len(), rule.tag));
                }
            }
        }
        best.map(|(_, tag)| tag)
    }
}

impl From<Vec<HeadingRule>> for HeadingTable {
    fn from(rules: Vec<HeadingRule>) -> Self {
        Self::new(rules)
    }
}

impl From<HeadingTable> for Vec<HeadingRule> {
    fn from(table: HeadingTable) -> Self {
        table.rules
    }
}

impl Default for HeadingTable {
    fn default() -> Self {
        use SectionTag::*;
        Self {
            rules: vec![
                HeadingRule::new(
                    Patient,
                    &[
                        "patient",
                        "patient information",
                        "patient info",
                        "patient details",
                        "patient data",
                        "patient bio data",
                        "member information",
                        "member details",
                        "enrollee information",
                        "enrollee details",
                        "bio data",
                        "biodata",
                    ],
                ),
                HeadingRule::new(
                    Diagnosis,
                    &[
                        "diagnosis",
                        "diagnoses",
                        "diagnosis details",
                        "diagnosis detail",
                        "clinical diagnosis",
                        "provisional diagnosis",
                        "final diagnosis",
                        "working diagnosis",
                    ],
                ),
                HeadingRule::new(
                    Medication,
                    &[
                        "medication",
                        "medications",
                        "medication details",
                        "medicines",
                        "drug",
                        "drugs",
                        "drugs dispensed",
                        "prescription",
                        "prescriptions",
                        "pharmacy",
                    ],
                ),
                HeadingRule::new(
                    Procedure,
                    &[
                        "procedure",
                        "procedures",
                        "procedures performed",
                        "treatment",
                        "treatments",
                        "investigations",
                        "services",
                        "services rendered",
                        "lab tests",
                        "laboratory",
                    ],
                ),
                HeadingRule::new(
                    Admission,
                    &[
                        "admission",
                        "admission details",
                        "admission information",
                        "admission and discharge",
                        "admission/discharge",
                        "inpatient details",
                        "hospital stay",
                    ],
                ),
                HeadingRule::new(
                    Billing,
                    &[
                        "billing",
                        "bill",
                        "billing details",
                        "billing summary",
                        "invoice",
                        "invoice summary",
                        "charges",
                        "summary of charges",
                        "payment",
                        "payment summary",
                        "totals",
                    ],
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub tag: SectionTag,
    /// Heading line that opened this section, as it appeared in the document
    pub heading: Option<String>,
    pub lines: Vec<String>,
}

impl Section {
    fn open(tag: SectionTag, heading: Option<String>) -> Self {
        Self {
            tag,
            heading,
            lines: Vec::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|l| l.is_empty())
    }
}

pub struct SectionSegmenter {
    table: HeadingTable,
}

impl SectionSegmenter {
    pub fn new(table: HeadingTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &HeadingTable {
        &self.table
    }

    /// Partition the document into sections in one pass.
    pub fn segment(&self, doc: &NormalizedDocument) -> Vec<Section> {
        let mut sections = Vec::new();
        let mut current = Section::open(SectionTag::Unclassified, None);

        for line in doc.lines() {
            match self.table.classify(line) {
                Some(tag) => {
                    let finished =
                        std::mem::replace(&mut current, Section::open(tag, Some(line.clone())));
                    push_section(&mut sections, finished);
                }
                None => current.lines.push(line.clone()),
            }
        }
        push_section(&mut sections, current);

        sections
    }
}

impl Default for SectionSegmenter {
    fn default() -> Self {
        Self::new(HeadingTable::default())
    }
}

fn push_section(sections: &mut Vec<Section>, section: Section) {
    if section.heading.is_some() || !section.lines.is_empty() {
        sections.push(section);
    }
}

/// Canonical comparison form of a heading line.
fn heading_key(line: &str) -> String {
    let lower = line.trim().to_lowercase();
    let stripped = LEADING_MARKER.replace(&lower, "");
    let collapsed = WHITESPACE.replace_all(&stripped, " ");
    collapsed
        .trim_end_matches(|c: char| c == ':' || c == '-' || c.is_whitespace())
        .trim()
        .to_string()
}
