//! JSON namespace files (`<lang>/<locale>.json`).

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{
    Map,
    Value,
};

use super::CodecError;

/// Parses a JSON namespace file. The document must be an object.
pub fn parse(source: &str) -> Result<Map<String, Value>, CodecError> {
    if source.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(source) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CodecError::new(
            1,
            1,
            format!("expected a JSON object at the top level, found {}", kind_of(&other)),
        )),
        Err(e) => Err(CodecError::new(e.line(), e.column(), e.to_string())),
    }
}

/// JSON type name used in error messages.
const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Renders a flat namespace as a pretty-printed object with four-space
/// indentation and a trailing newline. Unicode is written as-is.
#[must_use]
pub fn render(translations: &Map<String, Value>) -> String {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);

    // Serializing a map of JSON values into memory cannot fail.
    if translations.serialize(&mut serializer).is_err() {
        return "{}\n".to_string();
    }

    let mut output = String::from_utf8_lossy(&buffer).into_owned();
    output.push('\n');
    output
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use serde_json::json;

    use super::*;

    #[googletest::test]
    fn parse_object() {
        let map = parse(r#"{"Hello world": "Hallo wereld", "Welcome, :name": "Welkom, :name"}"#)
            .unwrap();

        expect_that!(map.len(), eq(2));
        expect_that!(map.get("Hello world"), some(eq(&json!("Hallo wereld"))));
    }

    #[googletest::test]
    fn parse_blank_file_is_empty() {
        expect_that!(parse("  \n").unwrap().len(), eq(0));
    }

    #[googletest::test]
    fn parse_rejects_arrays() {
        let error = parse(r#"["a", "b"]"#).unwrap_err();

        expect_that!(error.message, contains_substring("found an array"));
    }

    #[googletest::test]
    fn parse_reports_position() {
        let error = parse("{\n  \"a\": \"b\",\n  oops\n}").unwrap_err();

        expect_that!(error.line, eq(3));
    }

    #[googletest::test]
    fn render_uses_four_spaces_and_keeps_unicode() {
        let mut map = Map::new();
        map.insert("Hello".to_string(), json!("Grüß dich"));
        map.insert("a/b".to_string(), json!("c/d"));

        let output = render(&map);

        expect_that!(
            output,
            eq("{\n    \"Hello\": \"Grüß dich\",\n    \"a/b\": \"c/d\"\n}\n")
        );
    }

    #[googletest::test]
    fn render_then_parse_keeps_entries() {
        let mut map = Map::new();
        map.insert("Dotted.key with spaces".to_string(), json!("Value"));
        map.insert("Quote \"here\"".to_string(), json!("Ja"));

        let reparsed = parse(&render(&map)).unwrap();

        assert_eq!(reparsed, map);
    }
}
