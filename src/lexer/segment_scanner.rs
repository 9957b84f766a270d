//! Substitution scanner for literal lines
//!
//! Decomposes one literal line into an ordered sequence of [`Segment`]s so
//! that concatenating the resolved segments reproduces the line with
//! substitutions applied. Evaluation spans and variable references are
//! matched with a single combined pattern, leftmost-first, with the
//! evaluation alternative preferred when both could start at the same
//! position (mirrors the order the delimiters are combined in).

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::DelimiterConfig;
use crate::error::{Error, Result};

/// One piece of a decomposed literal line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    /// Raw text span, emitted verbatim
    Literal(String),
    /// Inline variable reference by name
    Variable(String),
    /// Inline expression span, evaluated at execution time
    Expression(String),
}

/// Scans literal lines for variable and evaluation substitutions
#[derive(Debug)]
pub struct SegmentScanner {
    subst_re: Regex,
}

impl SegmentScanner {
    /// Builds a scanner for a validated configuration
    pub fn new(config: &DelimiterConfig) -> Result<Self> {
        config.validate()?;

        // Evaluation spans capture their interior verbatim with surrounding
        // whitespace trimmed; variable spans require an exact identifier.
        let pattern = format!(
            r"{ep}\s*(?P<eval>.*?)\s*{es}|{vp}(?P<name>[A-Za-z_][A-Za-z_0-9]*){vs}",
            ep = regex::escape(&config.evaluation_prefix),
            es = regex::escape(&config.evaluation_suffix),
            vp = regex::escape(&config.variable_prefix),
            vs = regex::escape(&config.variable_suffix),
        );
        let subst_re = Regex::new(&pattern)
            .map_err(|e| Error::InvalidConfig(format!("substitution pattern: {}", e)))?;

        Ok(SegmentScanner { subst_re })
    }

    /// Decomposes one raw (untrimmed) line into segments
    ///
    /// The trailing newline, if the line has one, ends up inside the final
    /// literal segment; lines without substitutions come back as a single
    /// literal.
    pub fn scan(&self, line: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut rest = line;

        while let Some(caps) = self.subst_re.captures(rest) {
            let Some(m) = caps.get(0) else { break };
            if m.start() > 0 {
                segments.push(Segment::Literal(rest[..m.start()].to_string()));
            }

            if let Some(name) = caps.name("name") {
                segments.push(Segment::Variable(name.as_str().to_string()));
            } else {
                let eval = caps.name("eval").map(|c| c.as_str()).unwrap_or("");
                segments.push(Segment::Expression(eval.to_string()));
            }

            rest = &rest[m.end()..];
            if rest.is_empty() {
                break;
            }
        }

        if !rest.is_empty() || segments.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        segments
    }
}
