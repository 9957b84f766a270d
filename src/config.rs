//! Delimiter configuration and language presets
//!
//! A [`DelimiterConfig`] is the set of prefix/suffix pairs that decides how a
//! source line is classified (macro, statement, comment) and how variable and
//! evaluation substitutions are recognized inside literal lines. It is
//! immutable once a compile begins, and its ten strings form the fingerprint
//! that validates cache reuse.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Prefix/suffix delimiter set for one compile run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelimiterConfig {
    /// Prefix of macro lines
    pub macro_prefix: String,
    /// Suffix of macro lines (may be empty)
    pub macro_suffix: String,
    /// Prefix of statement lines
    pub statement_prefix: String,
    /// Suffix of statement lines (may be empty)
    pub statement_suffix: String,
    /// Prefix of comment lines
    pub comment_prefix: String,
    /// Suffix of comment lines (may be empty)
    pub comment_suffix: String,
    /// Prefix of inline variable references (must be non-empty)
    pub variable_prefix: String,
    /// Suffix of inline variable references (must be non-empty)
    pub variable_suffix: String,
    /// Prefix of inline evaluation spans (must be non-empty)
    pub evaluation_prefix: String,
    /// Suffix of inline evaluation spans (must be non-empty)
    pub evaluation_suffix: String,
}

impl Default for DelimiterConfig {
    fn default() -> Self {
        DelimiterConfig {
            macro_prefix: "@".to_string(),
            macro_suffix: String::new(),
            statement_prefix: "#".to_string(),
            statement_suffix: String::new(),
            comment_prefix: "%".to_string(),
            comment_suffix: String::new(),
            variable_prefix: "${".to_string(),
            variable_suffix: "}".to_string(),
            evaluation_prefix: "$${{".to_string(),
            evaluation_suffix: "}}".to_string(),
        }
    }
}

impl DelimiterConfig {
    /// Returns the preset delimiter set for a target language
    ///
    /// Known names: `c`, `cpp`, `java`, `javascript` (`//@`-family),
    /// `perl`, `python` (`#@`-family), `html`, `markdown`
    /// (`<!-- @ ... -->`-family).
    pub fn for_language(name: &str) -> Result<Self> {
        let base = DelimiterConfig::default();
        match name {
            "c" | "cpp" | "java" | "javascript" => Ok(DelimiterConfig {
                macro_prefix: "//@".to_string(),
                statement_prefix: "//#".to_string(),
                comment_prefix: "//%".to_string(),
                ..base
            }),
            "perl" | "python" => Ok(DelimiterConfig {
                macro_prefix: "#@".to_string(),
                statement_prefix: "##".to_string(),
                comment_prefix: "#%".to_string(),
                ..base
            }),
            "html" | "markdown" => Ok(DelimiterConfig {
                macro_prefix: "<!-- @".to_string(),
                macro_suffix: "-->".to_string(),
                statement_prefix: "<!-- #".to_string(),
                statement_suffix: "-->".to_string(),
                comment_prefix: "<!-- %".to_string(),
                comment_suffix: "-->".to_string(),
                ..base
            }),
            _ => Err(Error::UnknownLanguage {
                name: name.to_string(),
            }),
        }
    }

    /// Checks the non-empty invariants on the substitution delimiters
    ///
    /// Macro/statement/comment affixes may be empty; an empty variable or
    /// evaluation affix would make the combined substitution pattern match
    /// everywhere, so those four are rejected here, before any compile.
    pub fn validate(&self) -> Result<()> {
        if self.variable_prefix.is_empty() || self.variable_suffix.is_empty() {
            return Err(Error::InvalidConfig(
                "variable_prefix and variable_suffix cannot be empty".to_string(),
            ));
        }
        if self.evaluation_prefix.is_empty() || self.evaluation_suffix.is_empty() {
            return Err(Error::InvalidConfig(
                "evaluation_prefix and evaluation_suffix cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The ten delimiter strings in cache-fingerprint order
    pub fn fingerprint(&self) -> [&str; 10] {
        [
            &self.macro_prefix,
            &self.macro_suffix,
            &self.statement_prefix,
            &self.statement_suffix,
            &self.comment_prefix,
            &self.comment_suffix,
            &self.variable_prefix,
            &self.variable_suffix,
            &self.evaluation_prefix,
            &self.evaluation_suffix,
        ]
    }
}
