pub mod ocr;

pub use ocr::{DocumentKind, OcrEngine, PlainTextEngine};
