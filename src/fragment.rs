//! Request bodies sent to the API: changesets and user preferences.
//!
//! Values are escaped with [`escape`] after [`stringify`]. Keys are written
//! as given, callers must pass markup-safe keys.

use crate::error::Result;
use crate::escape::{escape, stringify};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use serde_json::{Map, Value};
use std::io::Write;
use tracing::debug;

/// Written as the `created_by:library` tag of every changeset.
pub const LIBRARY_IDENTIFIER: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

// `<element k=".." v=".."/>`. Attributes pushed as byte pairs are written
// verbatim, so only the value goes through `escape`.
fn write_tag<W: Write>(writer: &mut Writer<W>, element: &str, key: &str, value: &str) -> Result<()> {
    let mut tag = BytesStart::borrowed_name(element.as_bytes());
    tag.push_attribute(("k".as_bytes(), key.as_bytes()));
    tag.push_attribute(("v".as_bytes(), escape(value).as_bytes()));
    writer.write_event(Event::Empty(tag))?;
    Ok(())
}

fn write_entries<W: Write>(
    writer: &mut Writer<W>,
    element: &str,
    entries: &Map<String, Value>,
) -> Result<()> {
    for (key, value) in entries {
        write_tag(writer, element, key, &stringify(value))?;
    }
    Ok(())
}

// `<osm><container>...</container></osm>`, children written by `body`.
fn write_fragment<F>(container: &str, body: F) -> Result<String>
where
    F: FnOnce(&mut Writer<Vec<u8>>) -> Result<()>,
{
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Start(BytesStart::borrowed_name(b"osm")))?;
    writer.write_event(Event::Start(BytesStart::borrowed_name(container.as_bytes())))?;
    body(&mut writer)?;
    writer.write_event(Event::End(BytesEnd::borrowed(container.as_bytes())))?;
    writer.write_event(Event::End(BytesEnd::borrowed(b"osm")))?;
    let buf = writer.into_inner();
    debug!(container, bytes = buf.len(), "built request body");
    Ok(String::from_utf8(buf)?)
}

/// Builds the body of a changeset create request.
///
/// Tags are written in order: `created_by`, `created_by:library`, `comment`,
/// then `extra_tags` in iteration order.
///
/// Writing goes to memory, so in practice this does not fail.
pub fn changeset_xml(created_by: &str, comment: &str, extra_tags: &Map<String, Value>) -> Result<String> {
    write_fragment("changeset", |writer| {
        write_tag(writer, "tag", "created_by", created_by)?;
        write_tag(writer, "tag", "created_by:library", LIBRARY_IDENTIFIER)?;
        write_tag(writer, "tag", "comment", comment)?;
        write_entries(writer, "tag", extra_tags)
    })
}

/// Same document as [`changeset_xml`], for flows where the tags are already known.
/// Missing `created_by` or `comment` are written as empty values.
pub fn changeset_xml_from_tags(
    tags: &Map<String, Value>,
    created_by: Option<&str>,
    comment: Option<&str>,
) -> Result<String> {
    changeset_xml(created_by.unwrap_or(""), comment.unwrap_or(""), tags)
}

/// Builds the body of a bulk preferences update.
pub fn preferences_xml(prefs: &Map<String, Value>) -> Result<String> {
    write_fragment("preferences", |writer| write_entries(writer, "preference", prefs))
}
