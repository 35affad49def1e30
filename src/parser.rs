use crate::error::{Error, Result};
use crate::shape::{ATTRIBUTES_KEY, TEXT_KEY};
use encoding_rs::{CoderResult, Decoder, Encoding, UTF_16BE, UTF_16LE, UTF_8};
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use std::io::{BufRead, Read};
use tracing::trace;

// Undecoded bytes left at the end of the buffer are moved to its start
// before the next read. No encoding has a character longer than this.
const TAIL: usize = 32;

pub(crate) struct DecodeReader<R: Read> {
    decoder: Option<Decoder>,
    inner: R,
    undecoded: [u8; 4096],
    undecoded_pos: usize,
    undecoded_cap: usize,
    decoded: [u8; 12288],
    decoded_pos: usize,
    decoded_cap: usize,
    eof: bool,  // inner reader is exhausted
    done: bool, // decoder has flushed everything
}

impl<R: Read> DecodeReader<R> {
    // If Decoder is not set, don't decode.
    pub(crate) fn new(reader: R, decoder: Option<Decoder>) -> DecodeReader<R> {
        DecodeReader {
            decoder,
            inner: reader,
            undecoded: [0; 4096],
            undecoded_pos: 0,
            undecoded_cap: 0,
            decoded: [0; 12288],
            decoded_pos: 0,
            decoded_cap: 0,
            eof: false,
            done: false,
        }
    }

    pub(crate) fn set_decoder(&mut self, dec: Option<Decoder>) {
        self.decoder = dec;
        self.done = false;
    }

    fn fill_buf_decode(&mut self) -> std::io::Result<&[u8]> {
        while self.decoded_pos >= self.decoded_cap && !self.done {
            let pending = self.undecoded_cap - self.undecoded_pos;
            if pending <= TAIL && !self.eof {
                self.undecoded
                    .copy_within(self.undecoded_pos..self.undecoded_cap, 0);
                let read = self.inner.read(&mut self.undecoded[pending..])?;
                self.eof = read == 0;
                self.undecoded_pos = 0;
                self.undecoded_cap = pending + read;
            }
            let decoder = match self.decoder.as_mut() {
                Some(decoder) => decoder,
                None => break,
            };
            let (result, read, written, _replaced) = decoder.decode_to_utf8(
                &self.undecoded[self.undecoded_pos..self.undecoded_cap],
                &mut self.decoded,
                self.eof,
            );
            self.undecoded_pos += read;
            self.decoded_pos = 0;
            self.decoded_cap = written;
            self.done = self.eof && result == CoderResult::InputEmpty;
        }
        Ok(&self.decoded[self.decoded_pos..self.decoded_cap])
    }

    fn fill_buf_without_decode(&mut self) -> std::io::Result<&[u8]> {
        if self.undecoded_pos >= self.undecoded_cap {
            self.undecoded_cap = self.inner.read(&mut self.undecoded)?;
            self.undecoded_pos = 0;
        }
        Ok(&self.undecoded[self.undecoded_pos..self.undecoded_cap])
    }
}

impl<R: Read> Read for DecodeReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let available = self.fill_buf()?;
        let amt = std::cmp::min(available.len(), buf.len());
        buf[..amt].copy_from_slice(&available[..amt]);
        self.consume(amt);
        Ok(amt)
    }
}

impl<R: Read> BufRead for DecodeReader<R> {
    // Decoder may change from None to Some.
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        match &self.decoder {
            Some(_) => self.fill_buf_decode(),
            None => self.fill_buf_without_decode(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match &self.decoder {
            Some(_) => {
                self.decoded_pos = std::cmp::min(self.decoded_pos + amt, self.decoded_cap);
            }
            None => {
                self.undecoded_pos = std::cmp::min(self.undecoded_pos + amt, self.undecoded_cap);
            }
        }
    }
}

/// Options when parsing xml.
///
/// `trim_text`: strip whitespace around text content. The API pretty-prints
/// its responses, so this is on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    pub trim_text: bool,
}

impl Default for ReadOptions {
    fn default() -> ReadOptions {
        ReadOptions { trim_text: true }
    }
}

// An element whose end tag has not been read yet.
struct Frame {
    name: String,
    attributes: Map<String, Value>,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn push_child(&mut self, name: String, value: Value) {
        let slot = self
            .children
            .entry(name)
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = slot {
            items.push(value);
        }
    }

    fn finish(self) -> (String, Value) {
        if self.attributes.is_empty() && self.children.is_empty() {
            return (self.name, Value::String(self.text));
        }
        let mut node = Map::new();
        if !self.attributes.is_empty() {
            node.insert(ATTRIBUTES_KEY.to_string(), Value::Object(self.attributes));
        }
        node.extend(self.children);
        if !self.text.is_empty() {
            node.insert(TEXT_KEY.to_string(), Value::String(self.text));
        }
        (self.name, Value::Object(node))
    }
}

pub(crate) struct TreeParser {
    read_opts: ReadOptions,
    stack: Vec<Frame>,
    root: Option<(String, Value)>,
}

impl TreeParser {
    fn new(opts: ReadOptions) -> TreeParser {
        TreeParser {
            read_opts: opts,
            stack: Vec::new(),
            root: None,
        }
    }

    pub(crate) fn parse_str(xml: &str, opts: ReadOptions) -> Result<Value> {
        let mut parser = TreeParser::new(opts);
        let mut reader = Reader::from_str(xml.trim_start_matches('\u{feff}'));
        reader.trim_text(opts.trim_text);
        parser.parse_content(reader)?;
        parser.into_tree()
    }

    pub(crate) fn parse_reader<R: Read>(reader: R, opts: ReadOptions) -> Result<Value> {
        let mut parser = TreeParser::new(opts);
        parser.parse_start(reader)?;
        parser.into_tree()
    }

    fn into_tree(self) -> Result<Value> {
        let (name, value) = self
            .root
            .ok_or_else(|| Error::MalformedXML("No root element".to_string()))?;
        let mut tree = Map::new();
        tree.insert(name, value);
        Ok(Value::Object(tree))
    }

    fn open(&self, ev: &BytesStart) -> Result<Frame> {
        if self.stack.is_empty() && self.root.is_some() {
            return Err(Error::MalformedXML(
                "Document has more than one root element".to_string(),
            ));
        }
        let name = String::from_utf8(ev.name().to_vec())?;
        let mut attributes = Map::new();
        for attr in ev.attributes() {
            let attr = attr?;
            let key = String::from_utf8(attr.key.to_vec())?;
            let value = String::from_utf8(attr.unescaped_value()?.to_vec())?;
            attributes.insert(key, Value::String(value));
        }
        Ok(Frame {
            name,
            attributes,
            children: Map::new(),
            text: String::new(),
        })
    }

    fn close(&mut self, frame: Frame) {
        let (name, value) = frame.finish();
        match self.stack.last_mut() {
            Some(parent) => parent.push_child(name, value),
            None => self.root = Some((name, value)),
        }
    }

    fn push_text(&mut self, text: &str) -> Result<()> {
        let text = if self.read_opts.trim_text {
            text.trim()
        } else {
            text
        };
        match self.stack.last_mut() {
            Some(frame) => frame.text.push_str(text),
            None if text.trim().is_empty() => {}
            None => {
                return Err(Error::MalformedXML(
                    "Text outside of the root element".to_string(),
                ))
            }
        }
        Ok(())
    }

    // Look at the document decl and figure out the document encoding
    fn parse_start<B: Read>(&mut self, reader: B) -> Result<()> {
        let mut bufreader = DecodeReader::new(reader, None);

        let bytes = bufreader.fill_buf()?;
        let init_encoding = match bytes {
            [0xfe, 0xff, ..] => {
                // UTF-16 BE BOM
                bufreader.consume(2);
                Some(UTF_16BE)
            }
            [0xff, 0xfe, ..] => {
                // UTF-16 LE BOM
                bufreader.consume(2);
                Some(UTF_16LE)
            }
            [0xef, 0xbb, 0xbf, ..] => {
                // UTF-8 BOM
                bufreader.consume(3);
                None
            }
            [0x00, 0x3c, 0x00, 0x3f, ..] => Some(UTF_16BE),
            [0x3c, 0x00, 0x3f, 0x00, ..] => Some(UTF_16LE),
            _ => None,
        };
        bufreader.set_decoder(init_encoding.map(|e| e.new_decoder_without_bom_handling()));
        let mut xmlreader = Reader::from_reader(bufreader);
        xmlreader.trim_text(self.read_opts.trim_text);

        let mut buf = Vec::with_capacity(150);
        let label = match xmlreader.read_event(&mut buf)? {
            Event::Decl(ref ev) => decl_encoding(ev)?,
            ev => {
                if self.handle_event(ev)? {
                    return Ok(());
                }
                None
            }
        };
        // A byte order mark or utf-16 pattern wins over the declared encoding.
        if let (Some(label), None) = (label, init_encoding) {
            let encoding = Encoding::for_label(label.as_bytes()).ok_or(Error::CannotDecode)?;
            if encoding != UTF_8 {
                trace!(encoding = encoding.name(), "switching decoder");
                let mut decode_reader = xmlreader.into_underlying_reader();
                decode_reader.set_decoder(Some(encoding.new_decoder_without_bom_handling()));
                xmlreader = Reader::from_reader(decode_reader);
                xmlreader.trim_text(self.read_opts.trim_text);
            }
        }
        self.parse_content(xmlreader)
    }

    // Returns if document parsing is finished.
    fn handle_event(&mut self, event: Event) -> Result<bool> {
        trace!(?event);
        match event {
            Event::Start(ref ev) => {
                let frame = self.open(ev)?;
                self.stack.push(frame);
            }
            Event::End(_) => {
                // quick-xml checks if tag names match for us
                let frame = self
                    .stack
                    .pop()
                    .ok_or_else(|| Error::MalformedXML("Closing tag without opening tag".to_string()))?;
                self.close(frame);
            }
            Event::Empty(ref ev) => {
                let frame = self.open(ev)?;
                self.close(frame);
            }
            Event::Text(ev) => {
                let content = String::from_utf8(ev.unescaped()?.to_vec())?;
                self.push_text(&content)?;
            }
            // CData content is not escaped.
            Event::CData(ev) => {
                let content = String::from_utf8(ev.to_vec())?;
                self.push_text(&content)?;
            }
            Event::Comment(_) | Event::PI(_) | Event::DocType(_) | Event::Decl(_) => {}
            Event::Eof => {
                if let Some(frame) = self.stack.last() {
                    return Err(Error::MalformedXML(format!(
                        "Unclosed element: {}",
                        frame.name
                    )));
                }
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn parse_content<B: BufRead>(&mut self, mut reader: Reader<B>) -> Result<()> {
        let mut buf = Vec::with_capacity(200); // reduce time increasing capacity at start.
        loop {
            let ev = reader.read_event(&mut buf)?;
            if self.handle_event(ev)? {
                return Ok(());
            }
            buf.clear();
        }
    }
}

fn decl_encoding(ev: &BytesDecl) -> Result<Option<String>> {
    match ev.encoding() {
        Some(res) => Ok(Some(String::from_utf8(res?.to_vec())?)),
        None => Ok(None),
    }
}
