//! Normalizes raw nodes produced by [`parse_str`](crate::parse_str) into flat maps.
//!
//! A raw node keeps every child element in an array, even when the API only
//! ever sends one of it. Flattening hoists the attributes to the top level and
//! replaces each child array by its first item.

use serde_json::{Map, Value};

/// Key holding the attributes of a raw node.
pub const ATTRIBUTES_KEY: &str = "attributes";
/// Key holding the text content of a raw node that also has attributes or children.
pub const TEXT_KEY: &str = "#text";

/// Unwraps a child slot: the first item of an array, or the value itself.
///
/// Returns `None` for `null`, empty arrays and arrays whose first item is an
/// empty element (`<a/>` parses to `[""]`), which all mean the child is absent.
pub fn first_item(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.first().filter(|item| !is_empty_element(item)),
        Value::Null => None,
        value => Some(value),
    }
}

// An element without attributes, children or text.
fn is_empty_element(value: &Value) -> bool {
    value.as_str().map_or(false, str::is_empty)
}

/// First `key` child of `node`, see [`first_item`].
pub fn child<'a>(node: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    node.get(key).and_then(first_item)
}

/// The `attributes` object of `node`, if it has one.
pub fn attributes(node: &Map<String, Value>) -> Option<&Map<String, Value>> {
    node.get(ATTRIBUTES_KEY).and_then(Value::as_object)
}

/// Whether `value` still has the raw node shape, i.e. carries an attributes object.
pub fn is_raw_node(value: &Value) -> bool {
    value
        .as_object()
        .map_or(false, |node| attributes(node).is_some())
}

/// Flattens one level of `node`.
///
/// Children beyond the first of each name are dropped. Nested nodes are left
/// in raw shape; call `flatten` on them again where needed.
pub fn flatten(node: &Map<String, Value>) -> Map<String, Value> {
    let mut flat = attributes(node).cloned().unwrap_or_default();
    for (key, value) in node {
        if key == ATTRIBUTES_KEY {
            continue;
        }
        if let Some(first) = first_item(value) {
            flat.insert(key.clone(), first.clone());
        }
    }
    flat
}

/// [`flatten`] for objects, clone for anything else.
pub fn flatten_value(value: &Value) -> Value {
    match value {
        Value::Object(node) => Value::Object(flatten(node)),
        value => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_flatten() {
        let node = object(json!({
            "attributes": {"id": "5"},
            "name": ["Main St"],
            "tag": [],
            "nd": [{"attributes": {"ref": "1"}}, {"attributes": {"ref": "2"}}],
        }));
        assert_eq!(
            Value::Object(flatten(&node)),
            json!({"id": "5", "name": "Main St", "nd": {"attributes": {"ref": "1"}}})
        );
    }

    #[test]
    fn test_flatten_without_attributes() {
        let node = object(json!({"text": ["hi"], "missing": null, "#text": "body"}));
        assert_eq!(
            Value::Object(flatten(&node)),
            json!({"text": "hi", "#text": "body"})
        );
    }

    #[test]
    fn test_flatten_omits_empty_children() {
        let tree = crate::parse_str(r#"<note id="1"><id>1</id><closed_at/><status></status></note>"#)
            .unwrap();
        let note = tree["note"].as_object().unwrap();
        assert_eq!(Value::Object(flatten(note)), json!({"id": "1"}));
    }

    #[test]
    fn test_first_item() {
        assert_eq!(first_item(&json!([])), None);
        assert_eq!(first_item(&Value::Null), None);
        assert_eq!(first_item(&json!(["a", "b"])), Some(&json!("a")));
        assert_eq!(first_item(&json!("a")), Some(&json!("a")));
        assert_eq!(first_item(&json!([""])), None);
        assert_eq!(first_item(&json!(["", "b"])), None);
        assert_eq!(first_item(&json!([" "])), Some(&json!(" ")));
    }

    #[test]
    fn test_is_raw_node() {
        assert!(is_raw_node(&json!({"attributes": {}})));
        assert!(!is_raw_node(&json!({"attributes": "x"})));
        assert!(!is_raw_node(&json!({"lat": "1"})));
        assert!(!is_raw_node(&json!("text")));
    }
}
