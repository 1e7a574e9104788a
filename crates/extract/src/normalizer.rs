use anyhow::{Context, Result};
use regex::Regex;
use std::sync::LazyLock;

static INLINE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

/// Footer and header lines that carry no claim data.
pub const DEFAULT_BOILERPLATE: &[&str] = &[
    r"(?i)^powered by smart applications\b",
    r"(?i)^prepared by\b",
    r"(?i)^partner name\b",
    r"(?i)^page\s*\d+(\s*(of|/)\s*\d+)?$",
];

/// Cleaned OCR text, one entry per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedDocument {
    lines: Vec<String>,
}

impl NormalizedDocument {
    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

pub struct TextNormalizer {
    /// Trimmed lines matching any of these are dropped
    boilerplate: Vec<Regex>,
}

impl TextNormalizer {
    pub fn new(boilerplate: Vec<Regex>) -> Self {
        Self { boilerplate }
    }

    /// Build from pattern strings, e.g. a list loaded from configuration.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let boilerplate = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref())
                    .with_context(|| format!("Invalid boilerplate pattern: {}", p.as_ref()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(boilerplate))
    }

    /// Split raw text into trimmed lines, drop boilerplate and collapse blank runs.
    pub fn normalize(&self, raw: &str) -> NormalizedDocument {
        let raw = raw.replace("\r\n", "\n").replace(['\r', '\u{000C}'], "\n");

        let mut lines: Vec<String> = Vec::new();
        for line in raw.split('\n') {
            let line = clean_line(line);
            if !line.is_empty() && self.is_boilerplate(&line) {
                continue;
            }
            if line.is_empty() && lines.last().is_none_or(|prev| prev.is_empty()) {
                continue;
            }
            lines.push(line);
        }

        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }

        NormalizedDocument { lines }
    }

    fn is_boilerplate(&self, line: &str) -> bool {
        self.boilerplate.iter().any(|re| re.is_match(line))
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(
            DEFAULT_BOILERPLATE
                .iter()
                .map(|p| Regex::new(p).unwrap())
                .collect(),
        )
    }
}

/// Strip control characters, collapse inner whitespace, trim.
fn clean_line(line: &str) -> String {
    let printable: String = line
        .chars()
        .filter(|c| *c == '\t' || !c.is_control())
        .collect();
    INLINE_WHITESPACE
        .replace_all(printable.trim(), " ")
        .into_owned()
}
