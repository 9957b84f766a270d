//! Line classifier for the template compiler
//!
//! Each source line is matched against the configured delimiter pairs in a
//! fixed order: macro first, then statement, then comment; anything else is a
//! literal/substitution line. The ordering resolves ambiguity when one line
//! could satisfy several prefix/suffix pairs.

use regex::Regex;

use crate::config::DelimiterConfig;
use crate::error::{Error, Result};

/// The fixed macro registry, in classifier alternation order
///
/// `include` and `load` are reserved names: they classify as macros so the
/// block compiler can reject them with a dedicated error instead of leaking
/// them into the output as text.
pub const MACRO_NAMES: &[&str] = &[
    "if", "elif", "for", "while", "try", "except", "finally", "else", "with", "def", "class",
    "end", "divert", "undivert", "place", "include", "run", "load",
];

/// Characters stripped from both ends of a line before delimiter matching
const SPACE_CHARS: &[char] = &[' ', '\t', '\n'];

/// Classification result for one source line
///
/// Borrowed slices point into the line handed to [`LineClassifier::classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// A macro line: registry name plus raw (already trimmed) arguments
    Macro {
        /// Macro name, one of [`MACRO_NAMES`]
        name: &'a str,
        /// Argument text, empty if none given
        args: &'a str,
    },
    /// A statement line: trimmed interior, to be executed verbatim
    Statement(&'a str),
    /// A comment line; contributes one blank output line
    Comment,
    /// A literal/substitution line, untrimmed
    Text(&'a str),
}

/// Classifies source lines against one delimiter configuration
#[derive(Debug)]
pub struct LineClassifier {
    config: DelimiterConfig,
    macro_re: Regex,
}

impl LineClassifier {
    /// Builds a classifier for a validated configuration
    pub fn new(config: &DelimiterConfig) -> Result<Self> {
        config.validate()?;

        // The interior of a macro line must fully match "name [args]"; a
        // known name followed by anything other than whitespace is not a
        // macro line and falls through to the later checks.
        let pattern = format!(
            r"^\s*(?P<name>{})(?:\s+(?P<args>.*?))?\s*$",
            MACRO_NAMES.join("|")
        );
        let macro_re = Regex::new(&pattern)
            .map_err(|e| Error::InvalidConfig(format!("macro pattern: {}", e)))?;

        Ok(LineClassifier {
            config: config.clone(),
            macro_re,
        })
    }

    /// Classifies one line, in the fixed macro/statement/comment/text order
    pub fn classify<'a>(&self, line: &'a str) -> LineKind<'a> {
        let trimmed = line.trim_matches(SPACE_CHARS);

        if let Some(interior) = strip_affixes(
            trimmed,
            &self.config.macro_prefix,
            &self.config.macro_suffix,
        ) {
            if let Some(caps) = self.macro_re.captures(interior) {
                let name = caps.name("name").map(|m| m.as_str()).unwrap_or("");
                let args = caps.name("args").map(|m| m.as_str()).unwrap_or("");
                return LineKind::Macro { name, args };
            }
        }

        if let Some(interior) = strip_affixes(
            trimmed,
            &self.config.statement_prefix,
            &self.config.statement_suffix,
        ) {
            return LineKind::Statement(interior.trim_matches(SPACE_CHARS));
        }

        if strip_affixes(
            trimmed,
            &self.config.comment_prefix,
            &self.config.comment_suffix,
        )
        .is_some()
        {
            return LineKind::Comment;
        }

        LineKind::Text(line)
    }
}

/// Strips a prefix/suffix pair, requiring both and no overlap between them
fn strip_affixes<'a>(text: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    if text.len() < prefix.len() + suffix.len() {
        return None;
    }
    if !text.starts_with(prefix) || !text.ends_with(suffix) {
        return None;
    }
    Some(&text[prefix.len()..text.len() - suffix.len()])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> LineClassifier {
        LineClassifier::new(&DelimiterConfig::default()).unwrap()
    }

    #[test]
    fn test_macro_line() {
        let c = classifier();
        assert_eq!(
            c.classify("@if x > 0\n"),
            LineKind::Macro {
                name: "if",
                args: "x > 0"
            }
        );
        assert_eq!(
            c.classify("  @end  \n"),
            LineKind::Macro {
                name: "end",
                args: ""
            }
        );
        assert_eq!(
            c.classify("@end for\n"),
            LineKind::Macro {
                name: "end",
                args: "for"
            }
        );
    }

    #[test]
    fn test_partial_macro_name_is_not_a_macro() {
        let c = classifier();
        // "ifx" starts with a known name but does not fully match
        assert_eq!(c.classify("@ifx\n"), LineKind::Text("@ifx\n"));
        assert_eq!(c.classify("@ending\n"), LineKind::Text("@ending\n"));
    }

    #[test]
    fn test_unknown_macro_falls_through() {
        let c = classifier();
        assert_eq!(c.classify("@frobnicate\n"), LineKind::Text("@frobnicate\n"));
    }

    #[test]
    fn test_statement_line() {
        let c = classifier();
        assert_eq!(c.classify("# x = 1\n"), LineKind::Statement("x = 1"));
        assert_eq!(c.classify("   #x = 1   \n"), LineKind::Statement("x = 1"));
    }

    #[test]
    fn test_comment_line() {
        let c = classifier();
        assert_eq!(c.classify("% anything at all\n"), LineKind::Comment);
        assert_eq!(c.classify("%\n"), LineKind::Comment);
    }

    #[test]
    fn test_text_line_is_untrimmed() {
        let c = classifier();
        assert_eq!(c.classify("  plain text\n"), LineKind::Text("  plain text\n"));
    }

    #[test]
    fn test_ordering_macro_before_statement() {
        // With a config where the statement prefix is a prefix of the macro
        // prefix, a valid macro line must still classify as macro.
        let config = DelimiterConfig {
            macro_prefix: "#@".to_string(),
            statement_prefix: "#".to_string(),
            comment_prefix: "#%".to_string(),
            ..DelimiterConfig::default()
        };
        let c = LineClassifier::new(&config).unwrap();
        assert_eq!(
            c.classify("#@if x\n"),
            LineKind::Macro {
                name: "if",
                args: "x"
            }
        );
        // Invalid macro interior falls to the statement check
        assert_eq!(c.classify("#@ifx\n"), LineKind::Statement("@ifx"));
    }

    #[test]
    fn test_suffix_delimiters() {
        let config = DelimiterConfig::for_language("html").unwrap();
        let c = LineClassifier::new(&config).unwrap();
        assert_eq!(
            c.classify("<!-- @if x -->\n"),
            LineKind::Macro {
                name: "if",
                args: "x"
            }
        );
        // Missing suffix is not a macro line
        assert_eq!(c.classify("<!-- @if x\n"), LineKind::Text("<!-- @if x\n"));
        // Prefix and suffix may not overlap
        assert_eq!(c.classify("<!-- @\n"), LineKind::Text("<!-- @\n"));
    }

    #[test]
    fn test_reserved_names_classify_as_macros() {
        let c = classifier();
        assert_eq!(
            c.classify("@include header.txt\n"),
            LineKind::Macro {
                name: "include",
                args: "header.txt"
            }
        );
        assert_eq!(
            c.classify("@load vars.json\n"),
            LineKind::Macro {
                name: "load",
                args: "vars.json"
            }
        );
    }
}
