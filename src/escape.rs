use serde_json::Value;

/// Escapes the five characters reserved in xml attribute values.
///
/// `&` is replaced first so the references inserted for the other characters
/// are left alone. The function is not idempotent: escaping `&amp;` again
/// yields `&amp;amp;`, so only pass unescaped input.
///
/// ```
/// assert_eq!(osm_api_xml::escape("a < b & 'c'"), "a &lt; b &amp; &apos;c&apos;");
/// ```
pub fn escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Renders an untyped tag value as the string that ends up in a `v` attribute.
///
/// Strings are used as is, numbers use their json rendering, booleans become
/// `true`/`false` and null becomes `null`. Arrays are joined by `,` and
/// objects are written as compact json.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                // `[null]` renders as an empty slot, not "null".
                Value::Null => String::new(),
                item => stringify(item),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_all_reserved() {
        assert_eq!(escape(r#"<&>"'"#), "&lt;&amp;&gt;&quot;&apos;");
        assert_eq!(escape("plain text"), "plain text");
        assert_eq!(escape(""), "");
    }

    #[test]
    fn test_escape_not_idempotent() {
        let once = escape("&");
        assert_eq!(once, "&amp;");
        assert_eq!(escape(&once), "&amp;amp;");
    }

    #[test]
    fn test_stringify() {
        assert_eq!(stringify(&json!("survey")), "survey");
        assert_eq!(stringify(&json!(12)), "12");
        assert_eq!(stringify(&json!(-2.5)), "-2.5");
        assert_eq!(stringify(&json!(true)), "true");
        assert_eq!(stringify(&Value::Null), "null");
        assert_eq!(stringify(&json!(["a", 1, null, [2, 3]])), "a,1,,2,3");
        assert_eq!(stringify(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
