use crate::fields::{is_column_header, is_total_row, strip_list_marker, strip_trailing_numbers, Extracted, FieldContext};
use crate::schema::Medication;
use crate::sections::SectionTag;
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static DOSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d+(?:\.\d+)?(?:/\d+(?:\.\d+)?)?\s?(?:mcg|mg|µg|ml|gm|iu|g)\b|\b\d+(?:\.\d+)?\s?%")
        .unwrap()
});
static COUNTED_QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:x\s?)?(\d+)\s*(tablets?|tabs?|capsules?|caps?|sachets?|vials?|bottles?|ampoules?|amps?|packs?|pcs|pieces?|doses?|units?|strips?)\b",
    )
    .unwrap()
});
static BARE_QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bx\s?(\d+)\b|\bqty\s*[:\-]?\s*(\d+)\b|\bquantity\s*[:\-]?\s*(\d+)\b").unwrap()
});
static ITEM_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4,}\s+").unwrap());
static DOSE_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:mg|mcg|ml|caps?|capsules?|tabs?|tablets?|syrup|cream|susp|suspension|inj|injection)\b|\d(?:mg|mcg|ml)\b")
        .unwrap()
});

pub fn extract_medications(ctx: &FieldContext) -> Extracted<Vec<Medication>> {
    let scope = ctx.scope(SectionTag::Medication);
    let medications: Vec<Medication> = scope
        .lines()
        .iter()
        .filter(|line| !line.is_empty() && !is_column_header(line) && !is_total_row(line))
        .filter(|line| scope.is_section() || DOSE_CUE.is_match(line))
        .filter_map(|line| parse_medication(line))
        .collect();

    let found = !medications.is_empty();
    Extracted::new(medications, found)
}

/// Split one drug line into name, dosage and quantity.
///
/// The name is whatever precedes the first dosage or quantity token; when
/// nothing does, it is the line with those tokens cut out.
pub fn parse_medication(line: &str) -> Option<Medication> {
    let line = strip_list_marker(line);
    let line = ITEM_CODE.replace(line, "");

    let dosage = DOSAGE.find(&line).map(|m| (m.range(), m.as_str().trim().to_string()));
    let quantity = counted_quantity(&line).or_else(|| bare_quantity(&line));

    let cut = [
        dosage.as_ref().map(|(r, _)| r.start),
        quantity.as_ref().map(|(r, _)| r.start),
    ]
    .into_iter()
    .flatten()
    .min();

    let mut name = clean_name(&line[..cut.unwrap_or(line.len())]);
    if !has_letters(&name) {
        let mut rest = line.to_string();
        let mut spans: Vec<Range<usize>> = dosage
            .iter()
            .map(|(r, _)| r.clone())
            .chain(quantity.iter().map(|(r, _)| r.clone()))
            .collect();
        spans.sort_by_key(|r| std::cmp::Reverse(r.start));
        let mut limit = rest.len();
        for span in spans {
            // Overlapping tokens were already cut by the later span.
            if span.end <= limit {
                limit = span.start;
                rest.replace_range(span, " ");
            }
        }
        name = clean_name(&rest);
    }

    if !has_letters(&name) {
        return None;
    }

    Some(Medication {
        name,
        dosage: dosage.map(|(_, d)| d),
        quantity: quantity.map(|(_, q)| q),
    })
}

fn counted_quantity(line: &str) -> Option<(Range<usize>, String)> {
    let caps = COUNTED_QUANTITY.captures(line)?;
    let whole = caps.get(0)?;
    let count = caps.get(1)?.as_str();
    let unit = caps.get(2)?.as_str();
    Some((whole.range(), format!("{} {}", count, unit)))
}

fn bare_quantity(line: &str) -> Option<(Range<usize>, String)> {
    let caps = BARE_QUANTITY.captures(line)?;
    let whole = caps.get(0)?;
    let count = (1..=3).find_map(|i| caps.get(i))?;
    Some((whole.range(), count.as_str().to_string()))
}

fn clean_name(text: &str) -> String {
    let text = strip_trailing_numbers(text);
    text.trim_matches(|c: char| c == '-' || c == ':' || c == ';' || c == ',' || c.is_whitespace())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn has_letters(text: &str) -> bool {
    text.chars().any(|c| c.is_alphabetic())
}
