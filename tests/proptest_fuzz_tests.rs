//! Property-based fuzzing tests for the classifier, compiler and engine
//!
//! These tests use proptest to generate random inputs and verify that:
//! 1. The compiler never panics on arbitrary input
//! 2. Delimiter-free text round-trips byte-for-byte
//! 3. Compiled programs execute without panicking, whatever they contain

use macrot::{Compiler, DelimiterConfig, Engine, Environment, SegmentScanner, Segment};
use proptest::prelude::*;

/// Random strings that might break the line classifier or scanner
fn arbitrary_source_string() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"[ -~\t\n]{0,400}").unwrap()
}

/// Text with none of the default delimiter lead-ins
fn delimiter_free_line() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"[a-zA-Z0-9 .,;:!?()'\-]{0,80}").unwrap()
}

/// Tokens that look like template directives
fn template_token() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("@if x".to_string()),
        Just("@elif y".to_string()),
        Just("@else".to_string()),
        Just("@for i in range(3)".to_string()),
        Just("@while n > 0".to_string()),
        Just("@try".to_string()),
        Just("@except err".to_string()),
        Just("@finally".to_string()),
        Just("@end".to_string()),
        Just("@end if".to_string()),
        Just("@divert \"buf\"".to_string()),
        Just("@divert".to_string()),
        Just("@undivert \"buf\"".to_string()),
        Just("#x = 1".to_string()),
        Just("% comment".to_string()),
        Just("plain text".to_string()),
        Just("${x}".to_string()),
        Just("$${{ 1 + 1 }}".to_string()),
    ]
}

/// Random sequences of plausible template lines
fn template_like_source() -> impl Strategy<Value = String> {
    prop::collection::vec(template_token(), 0..40)
        .prop_map(|lines| lines.join("\n") + "\n")
}

proptest! {
    #[test]
    fn compiler_never_panics(source in arbitrary_source_string()) {
        let compiler = Compiler::new(&DelimiterConfig::default()).unwrap();
        let _ = compiler.compile(&source);
    }

    #[test]
    fn compiler_never_panics_on_template_like_input(source in template_like_source()) {
        let compiler = Compiler::new(&DelimiterConfig::default()).unwrap();
        let _ = compiler.compile(&source);
    }

    #[test]
    fn delimiter_free_text_round_trips(lines in prop::collection::vec(delimiter_free_line(), 0..20)) {
        // Leading #, @, % would classify the line; everything here is text
        let source: String = lines
            .iter()
            .map(|l| format!("x{}\n", l))
            .collect();

        let compiler = Compiler::new(&DelimiterConfig::default()).unwrap();
        let program = compiler.compile(&source).unwrap();

        let mut env = Environment::new();
        let mut out = Vec::new();
        Engine::new().execute(&program, &mut env, &mut out).unwrap();
        prop_assert_eq!(String::from_utf8(out).unwrap(), source);
    }

    #[test]
    fn scanner_returns_single_literal_without_delimiters(line in delimiter_free_line()) {
        let scanner = SegmentScanner::new(&DelimiterConfig::default()).unwrap();
        let segments = scanner.scan(&line);
        prop_assert_eq!(segments, vec![Segment::Literal(line)]);
    }

    #[test]
    fn execution_never_panics(source in template_like_source()) {
        let compiler = Compiler::new(&DelimiterConfig::default()).unwrap();
        if let Ok(program) = compiler.compile(&source) {
            let mut env = Environment::new();
            let mut out = Vec::new();
            // Undefined variables make this fail routinely; it must not panic
            let _ = Engine::new().execute(&program, &mut env, &mut out);
        }
    }
}
