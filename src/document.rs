//! Reading xml into raw trees and writing raw trees back out.
//!
//! A raw tree is a json object with a single key, the root element name:
//!
//! ```
//! let tree = osm_api_xml::parse_str(r#"<osm><node id="1"><tag k="a" v="b"/></node></osm>"#).unwrap();
//! assert_eq!(tree["osm"]["node"][0]["attributes"]["id"], "1");
//! assert_eq!(tree["osm"]["node"][0]["tag"][0]["attributes"]["k"], "a");
//! ```

use crate::error::Result;
use crate::escape::{escape, stringify};
use crate::parser::{ReadOptions, TreeParser};
use crate::shape::{attributes, ATTRIBUTES_KEY, TEXT_KEY};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::{Map, Value};
use std::io::{Read, Write};
use tracing::debug;

/// Options when writing xml.
///
/// `indent`: number of spaces per nesting level, `None` writes everything on one line.
/// `declaration`: write `<?xml version="1.0" encoding="UTF-8" standalone="yes"?>` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub indent: Option<usize>,
    pub declaration: bool,
}

impl Default for WriteOptions {
    fn default() -> WriteOptions {
        WriteOptions {
            indent: Some(2),
            declaration: true,
        }
    }
}

/// Parses an xml string into a raw tree.
pub fn parse_str(xml: &str) -> Result<Value> {
    parse_str_with_opts(xml, ReadOptions::default())
}

pub fn parse_str_with_opts(xml: &str, opts: ReadOptions) -> Result<Value> {
    TreeParser::parse_str(xml, opts)
}

/// Parses xml from a reader into a raw tree.
///
/// Unlike [`parse_str`], the input is decoded: a byte order mark or the
/// `encoding` of the xml declaration selects the decoder, utf-8 otherwise.
///
/// # Errors
///
/// - [`Error::CannotDecode`](crate::Error::CannotDecode): the declared encoding is unknown.
pub fn parse_reader<R: Read>(reader: R) -> Result<Value> {
    parse_reader_with_opts(reader, ReadOptions::default())
}

pub fn parse_reader_with_opts<R: Read>(reader: R, opts: ReadOptions) -> Result<Value> {
    TreeParser::parse_reader(reader, opts)
}

/// Shorthand for `parse_reader(bytes)`.
pub fn parse_bytes(bytes: &[u8]) -> Result<Value> {
    parse_reader(bytes)
}

/// Writes a raw tree as an xml document.
///
/// Objects become elements: `attributes` become attributes, `#text` the text
/// content, and every other key a child element (arrays repeat the element).
/// Strings, numbers and booleans become text-only elements. A value that is
/// not an object with exactly one key is wrapped in a `<root>` element.
pub fn build(value: &Value) -> Result<String> {
    build_with_opts(value, WriteOptions::default())
}

pub fn build_with_opts(value: &Value, opts: WriteOptions) -> Result<String> {
    let mut writer = match opts.indent {
        Some(size) => Writer::new_with_indent(Vec::new(), b' ', size),
        None => Writer::new(Vec::new()),
    };
    if opts.declaration {
        writer.write_event(Event::Decl(BytesDecl::new(
            "1.0".as_bytes(),
            Some("UTF-8".as_bytes()),
            Some("yes".as_bytes()),
        )))?;
    }
    match value {
        Value::Object(tree) if tree.len() == 1 => {
            for (name, node) in tree {
                write_element(&mut writer, name, node)?;
            }
        }
        value => write_element(&mut writer, "root", value)?,
    }
    let buf = writer.into_inner();
    debug!(bytes = buf.len(), "built xml document");
    Ok(String::from_utf8(buf)?)
}

fn write_element<W: Write>(writer: &mut Writer<W>, name: &str, value: &Value) -> Result<()> {
    match value {
        Value::Array(items) => {
            for item in items {
                write_element(writer, name, item)?;
            }
        }
        Value::Object(node) => write_node(writer, name, node)?,
        Value::Null => {
            writer.write_event(Event::Empty(BytesStart::borrowed_name(name.as_bytes())))?;
        }
        scalar => {
            let text = stringify(scalar);
            let start = BytesStart::borrowed_name(name.as_bytes());
            if text.is_empty() {
                writer.write_event(Event::Empty(start))?;
            } else {
                writer.write_event(Event::Start(start))?;
                writer.write_event(Event::Text(BytesText::from_plain_str(&text)))?;
                writer.write_event(Event::End(BytesEnd::borrowed(name.as_bytes())))?;
            }
        }
    }
    Ok(())
}

fn write_node<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    node: &Map<String, Value>,
) -> Result<()> {
    let name_bytes = name.as_bytes();
    let mut start = BytesStart::borrowed_name(name_bytes);
    if let Some(attrs) = attributes(node) {
        for (key, val) in attrs {
            start.push_attribute((key.as_bytes(), escape(&stringify(val)).as_bytes()));
        }
    }
    let text = node
        .get(TEXT_KEY)
        .map(stringify)
        .filter(|text| !text.is_empty());
    let children: Vec<(&String, &Value)> = node
        .iter()
        .filter(|(key, _)| key.as_str() != ATTRIBUTES_KEY && key.as_str() != TEXT_KEY)
        .collect();

    if text.is_none() && children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    if let Some(text) = text {
        writer.write_event(Event::Text(BytesText::from_plain_str(&text)))?;
    }
    for (child_name, child) in children {
        write_element(writer, child_name, child)?;
    }
    writer.write_event(Event::End(BytesEnd::borrowed(name_bytes)))?;
    Ok(())
}
