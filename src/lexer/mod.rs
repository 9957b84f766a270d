//! Lexical layer: per-line classification and substitution scanning

pub mod line_classifier;
pub mod segment_scanner;

pub use line_classifier::{LineClassifier, LineKind, MACRO_NAMES};
pub use segment_scanner::{Segment, SegmentScanner};
