//! Read and write the xml payloads of the OpenStreetMap editing API as json-like maps.
//!
//! Outbound, [`changeset_xml`] and [`preferences_xml`] build request bodies.
//! Inbound, [`parse_str`] turns a response into a raw tree where attributes
//! live under `attributes` and every child element is an array, and the
//! converters in [`convert`] reshape raw trees into flat maps.
//!
//! ```
//! use osm_api_xml::convert;
//!
//! let xml = r#"<osm><note lat="51.5" lon="0.1"><id>7</id><comments>
//!   <comment><uid>1</uid><text>first</text></comment>
//! </comments></note></osm>"#;
//! let notes = convert::notes(xml).unwrap();
//! assert_eq!(notes[0]["lat"], "51.5");
//! assert_eq!(notes[0]["comments"][0]["text"], "first");
//! ```

pub mod convert;
mod document;
mod error;
mod escape;
mod fragment;
mod parser;
pub mod shape;

pub use crate::convert::ElementType;
pub use crate::document::{
    build, build_with_opts, parse_bytes, parse_reader, parse_reader_with_opts, parse_str,
    parse_str_with_opts, WriteOptions,
};
pub use crate::error::{Error, Result};
pub use crate::escape::{escape, stringify};
pub use crate::fragment::{
    changeset_xml, changeset_xml_from_tags, preferences_xml, LIBRARY_IDENTIFIER,
};
pub use crate::parser::ReadOptions;
