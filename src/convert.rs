//! Converters from API responses to caller-facing maps.
//!
//! Every converter that takes xml text parses it with [`parse_str`] and
//! returns its error unchanged.

use crate::document::parse_str;
use crate::error::{Error, Result};
use crate::shape::{attributes, child, flatten, flatten_value, is_raw_node, ATTRIBUTES_KEY};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument, warn};

/// Key of the synthetic element id.
pub const ID_KEY: &str = "_id";
/// Key of the synthetic element type.
pub const TYPE_KEY: &str = "_type";

/// The three kinds of osm map elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Node,
    Way,
    Relation,
}

impl ElementType {
    pub const ALL: [ElementType; 3] = [ElementType::Node, ElementType::Way, ElementType::Relation];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Node => "node",
            ElementType::Way => "way",
            ElementType::Relation => "relation",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = Error;

    fn from_str(s: &str) -> Result<ElementType> {
        match s {
            "node" => Ok(ElementType::Node),
            "way" => Ok(ElementType::Way),
            "relation" => Ok(ElementType::Relation),
            other => Err(Error::UnknownElementType(other.to_string())),
        }
    }
}

// `tree["osm"]` as an object, if the document root is `<osm>` with content.
fn osm_root(tree: &Value) -> Option<&Map<String, Value>> {
    tree.get("osm").and_then(Value::as_object)
}

fn entries<'a>(tree: &'a Value, key: &str) -> &'a [Value] {
    osm_root(tree)
        .and_then(|osm| osm.get(key))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

// Object entries of `list`. Anything else is an element without attributes
// or children and is skipped.
fn objects<'a>(
    list: &'a [Value],
    kind: &'a str,
) -> impl Iterator<Item = &'a Map<String, Value>> + 'a {
    list.iter().filter_map(move |entry| match entry {
        Value::Object(node) => Some(node),
        other => {
            warn!(kind = %kind, entry = %other, "skipping entry without attributes");
            None
        }
    })
}

fn envelope(mut node: Map<String, Value>, id: Option<Value>, kind: &str) -> Map<String, Value> {
    if let Some(id) = id {
        node.insert(ID_KEY.to_string(), id);
    }
    node.insert(TYPE_KEY.to_string(), Value::String(kind.to_string()));
    node
}

fn own_id(node: &Map<String, Value>) -> Option<Value> {
    attributes(node).and_then(|attrs| attrs.get("id")).cloned()
}

/// Converts a single element response, e.g. `GET /api/0.6/node/1`.
///
/// The element stays in raw shape, `_id` and `_type` are added from the
/// arguments.
///
/// # Errors
///
/// - [`Error::NotFound`]: the response has no `osm.<element_type>[0]`.
#[instrument(skip(xml))]
pub fn element(xml: &str, element_type: ElementType, element_id: &str) -> Result<Map<String, Value>> {
    let tree = parse_str(xml)?;
    let node = entries(&tree, element_type.as_str())
        .first()
        .and_then(Value::as_object)
        .ok_or_else(|| Error::NotFound(format!("osm.{}[0]", element_type)))?;
    Ok(envelope(
        node.clone(),
        Some(Value::String(element_id.to_string())),
        element_type.as_str(),
    ))
}

/// Converts a multi-element response, e.g. `GET /api/0.6/nodes?nodes=1,2`.
///
/// Each element keeps its raw shape and gets `_id` from its own `id`
/// attribute. A response without elements of that type gives an empty vec.
#[instrument(skip(xml))]
pub fn elements(xml: &str, element_type: ElementType) -> Result<Vec<Value>> {
    let tree = parse_str(xml)?;
    let kind = element_type.as_str();
    let list: Vec<Value> = objects(entries(&tree, kind), kind)
        .map(|node| Value::Object(envelope(node.clone(), own_id(node), kind)))
        .collect();
    debug!(count = list.len(), "converted elements");
    Ok(list)
}

/// Converts an already parsed map/bounding box response.
///
/// Elements get their attributes hoisted next to their children, which are
/// kept as arrays since `nd`, `tag` and `member` repeat. Only element types
/// present in the document appear in the output, plus `bounds` when present.
pub fn map_data(tree: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    let osm = match osm_root(tree) {
        Some(osm) => osm,
        None => return out,
    };
    for element_type in ElementType::ALL.iter() {
        let kind = element_type.as_str();
        let list = match osm.get(kind).and_then(Value::as_array) {
            Some(list) => list,
            None => continue,
        };
        let converted = objects(list, kind)
            .map(|node| {
                let mut flat = attributes(node).cloned().unwrap_or_default();
                for (key, value) in node {
                    if key != ATTRIBUTES_KEY {
                        flat.insert(key.clone(), value.clone());
                    }
                }
                Value::Object(envelope(flat, own_id(node), kind))
            })
            .collect();
        out.insert(kind.to_string(), Value::Array(converted));
    }
    if let Some(bounds) = osm.get("bounds") {
        out.insert("bounds".to_string(), bounds.clone());
    }
    out
}

/// Parses a map response and converts it with [`map_data`].
pub fn parse_map_data(xml: &str) -> Result<Map<String, Value>> {
    Ok(map_data(&parse_str(xml)?))
}

// Flattens each entry of `node[outer][0][inner]`.
fn flatten_nested_list(node: &Map<String, Value>, outer: &str, inner: &str) -> Value {
    let list: Vec<Value> = child(node, outer)
        .and_then(Value::as_object)
        .and_then(|wrapper| wrapper.get(inner))
        .and_then(Value::as_array)
        .map(|items| items.iter().map(flatten_value).collect())
        .unwrap_or_default();
    Value::Array(list)
}

/// Converts a notes response.
///
/// Each note is flattened and its `comments` replaced by the list of
/// flattened comments.
#[instrument(skip(xml))]
pub fn notes(xml: &str) -> Result<Vec<Value>> {
    let tree = parse_str(xml)?;
    let list: Vec<Value> = objects(entries(&tree, "note"), "note")
        .map(|note| {
            let mut flat = flatten(note);
            flat.insert(
                "comments".to_string(),
                flatten_nested_list(note, "comments", "comment"),
            );
            Value::Object(flat)
        })
        .collect();
    debug!(count = list.len(), "converted notes");
    Ok(list)
}

/// Converts a user details response.
///
/// The user is flattened, then every field still carrying attributes
/// (`home`, `changesets`, `traces`, ...) is flattened once more, then each
/// entry of `blocks.received` is flattened.
///
/// # Errors
///
/// - [`Error::NotFound`]: the response has no `osm.user[0]`.
#[instrument(skip(xml))]
pub fn user(xml: &str) -> Result<Map<String, Value>> {
    let tree = parse_str(xml)?;
    let raw = entries(&tree, "user")
        .first()
        .and_then(Value::as_object)
        .ok_or_else(|| Error::NotFound("osm.user[0]".to_string()))?;

    let mut user = flatten(raw);
    for value in user.values_mut() {
        if is_raw_node(value) {
            *value = flatten_value(value);
        }
    }
    if let Some(Value::Object(blocks)) = user.get_mut("blocks") {
        if let Some(Value::Array(received)) = blocks.get_mut("received") {
            for entry in received.iter_mut() {
                *entry = flatten_value(entry);
            }
        }
    }
    Ok(user)
}

/// Converts a changesets response, e.g. `GET /api/0.6/changesets`.
///
/// Each changeset is flattened, its `tag` children are collected into a
/// `tags` map and its discussion comments into a flat `discussion` list.
#[instrument(skip(xml))]
pub fn changesets(xml: &str) -> Result<Vec<Value>> {
    let tree = parse_str(xml)?;
    let list: Vec<Value> = objects(entries(&tree, "changeset"), "changeset")
        .map(|raw| {
            let mut flat = attributes(raw).cloned().unwrap_or_default();
            flat.insert("tags".to_string(), Value::Object(key_values(raw, "tag")));
            if raw.contains_key("discussion") {
                flat.insert(
                    "discussion".to_string(),
                    flatten_nested_list(raw, "discussion", "comment"),
                );
            }
            Value::Object(flat)
        })
        .collect();
    debug!(count = list.len(), "converted changesets");
    Ok(list)
}

/// Converts a preferences response into a `k` to `v` map.
///
/// A missing or empty `preferences` element gives an empty map.
#[instrument(skip(xml))]
pub fn preferences(xml: &str) -> Result<Map<String, Value>> {
    let tree = parse_str(xml)?;
    let prefs = match entries(&tree, "preferences").first().and_then(Value::as_object) {
        Some(prefs) => key_values(prefs, "preference"),
        None => Map::new(),
    };
    Ok(prefs)
}

// Collects `<name k=".." v=".."/>` children of `node` into a map.
fn key_values(node: &Map<String, Value>, name: &str) -> Map<String, Value> {
    let mut out = Map::new();
    let items = node.get(name).and_then(Value::as_array);
    for item in items.into_iter().flatten() {
        let attrs = match item.as_object().and_then(attributes) {
            Some(attrs) => attrs,
            None => continue,
        };
        if let Some(key) = attrs.get("k").and_then(Value::as_str) {
            let value = attrs.get("v").cloned().unwrap_or(Value::Null);
            out.insert(key.to_string(), value);
        }
    }
    out
}
