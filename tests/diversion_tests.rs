/// Integration tests for diversion buffers, `place` and `run`
use macrot::{Compiler, DelimiterConfig, Engine, Environment, Error, Value};
use pretty_assertions::assert_eq;

fn render(source: &str, env: &mut Environment) -> macrot::Result<String> {
    let program = Compiler::new(&DelimiterConfig::default())?.compile(source)?;
    let mut output = Vec::new();
    Engine::new().execute(&program, env, &mut output)?;
    Ok(String::from_utf8(output).unwrap())
}

#[test]
fn test_diverted_output_is_withheld_until_undivert() {
    let source = "\
@divert \"notes\"
gathered later
@divert
first
@undivert \"notes\"
last
";
    let mut env = Environment::new();
    assert_eq!(
        render(source, &mut env).unwrap(),
        "first\ngathered later\nlast\n"
    );
}

#[test]
fn test_unreferenced_buffer_is_discarded() {
    let source = "\
@divert \"dropped\"
never seen
@divert
kept
";
    let mut env = Environment::new();
    assert_eq!(render(source, &mut env).unwrap(), "kept\n");
}

#[test]
fn test_undivert_copies_without_consuming() {
    let source = "\
@divert 7
once
@divert
@undivert 7
@undivert 7
";
    let mut env = Environment::new();
    assert_eq!(render(source, &mut env).unwrap(), "once\nonce\n");
}

#[test]
fn test_undivert_lands_in_current_buffer() {
    // While diverted to "outer", undiverting "inner" appends to "outer"
    let source = "\
@divert \"inner\"
inner text
@divert \"outer\"
outer:
@undivert \"inner\"
@divert
@undivert \"outer\"
";
    let mut env = Environment::new();
    assert_eq!(
        render(source, &mut env).unwrap(),
        "outer:\ninner text\n"
    );
}

#[test]
fn test_indexed_and_named_keys_are_distinct() {
    let source = "\
@divert 1
indexed
@divert \"1\"
named
@divert
@undivert 1
@undivert \"1\"
";
    let mut env = Environment::new();
    assert_eq!(render(source, &mut env).unwrap(), "indexed\nnamed\n");
}

#[test]
fn test_divert_key_from_variable() {
    let source = "\
@divert dest
away
@divert
@undivert dest
";
    let mut env = Environment::new();
    env.define("dest", Value::String("side".to_string()));
    assert_eq!(render(source, &mut env).unwrap(), "away\n");
}

#[test]
fn test_divert_null_selects_primary() {
    let source = "\
@divert null
straight through
";
    let mut env = Environment::new();
    assert_eq!(render(source, &mut env).unwrap(), "straight through\n");
}

#[test]
fn test_undivert_null_is_a_type_error() {
    // divert accepts null as "back to primary"; undivert has no such reading
    let mut env = Environment::new();
    let result = render("@undivert null\n", &mut env);
    assert!(matches!(result, Err(Error::TypeError { got, .. }) if got == "null"));
}

#[test]
fn test_run_stdin_null_is_a_type_error() {
    let mut env = Environment::new();
    let result = render("@run \"cat\", stdin=null\n", &mut env);
    assert!(matches!(result, Err(Error::TypeError { got, .. }) if got == "null"));
}

#[test]
fn test_place_reads_file_into_output() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("fragment.txt"), "from disk\n").unwrap();

    let program = Compiler::new(&DelimiterConfig::default())
        .unwrap()
        .compile("before\n@place \"fragment.txt\"\nafter\n")
        .unwrap();
    let mut env = Environment::new();
    let mut out = Vec::new();
    Engine::new()
        .with_working_dir(dir.path())
        .execute(&program, &mut env, &mut out)
        .unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "before\nfrom disk\nafter\n"
    );
}

#[test]
fn test_place_into_named_buffer() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("late.txt"), "placed\n").unwrap();

    let source = "\
@place \"late.txt\", \"held\"
early
@undivert \"held\"
";
    let program = Compiler::new(&DelimiterConfig::default())
        .unwrap()
        .compile(source)
        .unwrap();
    let mut env = Environment::new();
    let mut out = Vec::new();
    Engine::new()
        .with_working_dir(dir.path())
        .execute(&program, &mut env, &mut out)
        .unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "early\nplaced\n");
}

#[test]
fn test_place_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let program = Compiler::new(&DelimiterConfig::default())
        .unwrap()
        .compile("@place \"absent.txt\"\n")
        .unwrap();
    let mut env = Environment::new();
    let mut out = Vec::new();
    let result = Engine::new()
        .with_working_dir(dir.path())
        .execute(&program, &mut env, &mut out);

    assert!(matches!(result, Err(Error::PlaceFailed { .. })));
}

#[test]
fn test_run_feeds_buffer_and_captures_stdout() {
    let source = "\
@divert \"input\"
b
a
@divert
@run \"sort\", stdin=\"input\"
";
    let mut env = Environment::new();
    assert_eq!(render(source, &mut env).unwrap(), "a\nb\n");
}

#[test]
fn test_run_stdout_into_buffer() {
    let source = "\
@run \"printf captured\", stdout=\"cap\"
direct
@undivert \"cap\"
";
    let mut env = Environment::new();
    assert_eq!(render(source, &mut env).unwrap(), "direct\ncaptured");
}

#[test]
fn test_run_stderr_into_buffer() {
    let source = "\
@run \"printf warn >&2\", stderr=\"errs\"
[@undivert follows]
@undivert \"errs\"
";
    let mut env = Environment::new();
    assert_eq!(
        render(source, &mut env).unwrap(),
        "[@undivert follows]\nwarn"
    );
}

#[test]
fn test_run_nonzero_fails_by_default() {
    let mut env = Environment::new();
    let result = render("@run \"exit 9\"\n", &mut env);
    assert!(matches!(
        result,
        Err(Error::ProcessFailed { status: 9, .. })
    ));
}

#[test]
fn test_run_check_false_tolerates_failure() {
    let source = "\
@run \"printf partial; exit 1\", check=false
done
";
    let mut env = Environment::new();
    assert_eq!(render(source, &mut env).unwrap(), "partialdone\n");
}

#[test]
fn test_run_command_from_expression() {
    let source = "#cmd = \"printf \" + word\n@run cmd\n";
    let mut env = Environment::new();
    env.define("word", Value::String("built".to_string()));
    assert_eq!(render(source, &mut env).unwrap(), "built");
}

#[test]
fn test_run_output_ordering_with_pending_text() {
    // Text before the command reaches the sink before the command's output
    let source = "head\n@run \"printf mid\"\ntail\n";
    let mut env = Environment::new();
    assert_eq!(render(source, &mut env).unwrap(), "head\nmidtail\n");
}
