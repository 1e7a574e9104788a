use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

/// Turns an uploaded document into raw text.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, bytes: &[u8], filename: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
    Text,
}

impl DocumentKind {
    /// Classify by extension; anything unrecognised is treated as text.
    pub fn from_filename(filename: &str) -> Self {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "pdf" => DocumentKind::Pdf,
            "jpg" | "jpeg" | "png" | "tif" | "tiff" | "bmp" | "gif" => DocumentKind::Image,
            _ => DocumentKind::Text,
        }
    }
}

/// Engine for uploads that are already text.
///
/// PDFs and images need a real OCR engine and are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextEngine;

impl OcrEngine for PlainTextEngine {
    fn recognize(&self, bytes: &[u8], filename: &str) -> Result<String> {
        let kind = DocumentKind::from_filename(filename);
        debug!(filename, ?kind, size = bytes.len(), "Recognizing upload");

        match kind {
            DocumentKind::Pdf | DocumentKind::Image => {
                anyhow::bail!("No OCR engine available for {:?} upload: {}", kind, filename)
            }
            DocumentKind::Text => decode_text(bytes).context(format!("Failed to read upload: {}", filename)),
        }
    }
}

fn decode_text(bytes: &[u8]) -> Result<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if bytes.contains(&0) {
        anyhow::bail!("Upload contains binary data");
    }
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_kind() {
        assert_eq!(DocumentKind::from_filename("claim.PDF"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_filename("scan.jpeg"), DocumentKind::Image);
        assert_eq!(DocumentKind::from_filename("notes.txt"), DocumentKind::Text);
        assert_eq!(DocumentKind::from_filename("upload"), DocumentKind::Text);
    }

    #[test]
    fn test_text_upload() {
        let text = PlainTextEngine
            .recognize("\u{FEFF}Diagnosis: Malaria\n".as_bytes(), "claim.txt")
            .unwrap();
        assert_eq!(text, "Diagnosis: Malaria\n");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let text = PlainTextEngine.recognize(b"Total \xFF 100", "claim.csv").unwrap();
        assert_eq!(text, "Total \u{FFFD} 100");
    }

    #[test]
    fn test_rejects_binary_formats() {
        let err = PlainTextEngine.recognize(b"%PDF-1.7", "claim.pdf").unwrap_err();
        assert!(err.to_string().contains("claim.pdf"));
        assert!(PlainTextEngine.recognize(b"\x89PNG", "scan.png").is_err());
        assert!(PlainTextEngine.recognize(b"ab\0cd", "upload").is_err());
    }
}
