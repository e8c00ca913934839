//! Product feed XML document.
//!
//! Parses a Google-Shopping style RSS feed with `quick-xml` into a
//! [`FeedDocument`] that keeps every event it read, so writing it back
//! reproduces the input except for the fields the engine rewrote.
//!
//! Each `<item>` becomes an [`XmlItem`] implementing
//! [`feed_enrich_core::FeedItem`]. Its `id`, `title`, and `description`
//! children are matched by qualified name (`g:id`, `g:title`,
//! `g:description` with the default prefix). A missing description is
//! appended after the item's last child element.
//!
//! Feeds declared in another encoding (e.g. `ISO-8859-1`) are decoded with
//! `encoding_rs` before parsing and always written back as UTF-8, with the
//! declaration rewritten to match.

use anyhow::{anyhow, bail, Context, Result};
use encoding_rs::{Encoding, UTF_8};
use feed_enrich_core::FeedItem;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::path::Path;

use crate::config::FeedConfig;

/// Qualified element names the engine reads and writes.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNames {
    pub item: String,
    pub id: String,
    pub title: String,
    pub description: String,
}

impl FieldNames {
    pub fn new(item: &str, prefix: &str) -> Self {
        let qualify = |local: &str| {
            if prefix.is_empty() {
                local.to_string()
            } else {
                format!("{}:{}", prefix, local)
            }
        };
        Self {
            item: item.to_string(),
            id: qualify("id"),
            title: qualify("title"),
            description: qualify("description"),
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(&config.item_element, &config.namespace_prefix)
    }
}

impl Default for FieldNames {
    fn default() -> Self {
        Self::new("item", "g")
    }
}

/// A direct child element of an item.
#[derive(Debug, Clone)]
struct Field {
    name: String,
    start: BytesStart<'static>,
    /// `None` for a self-closing element.
    end: Option<BytesEnd<'static>>,
    inner: Vec<Event<'static>>,
    text: String,
    rewritten: bool,
}

impl Field {
    fn new_text(name: &str, text: &str) -> Self {
        Self {
            name: name.to_string(),
            start: BytesStart::new(name.to_string()),
            end: Some(BytesEnd::new(name.to_string())),
            inner: Vec::new(),
            text: text.to_string(),
            rewritten: true,
        }
    }

    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.rewritten = true;
    }

    fn write<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        if self.rewritten {
            writer.write_event(Event::Start(self.start.clone()))?;
            writer.write_event(Event::Text(BytesText::new(&self.text)))?;
            let end = self
                .end
                .clone()
                .unwrap_or_else(|| BytesEnd::new(self.name.clone()));
            writer.write_event(Event::End(end))?;
            return Ok(());
        }
        match &self.end {
            None => writer.write_event(Event::Empty(self.start.clone()))?,
            Some(end) => {
                writer.write_event(Event::Start(self.start.clone()))?;
                for event in &self.inner {
                    writer.write_event(event.clone())?;
                }
                writer.write_event(Event::End(end.clone()))?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum ItemPart {
    Raw(Event<'static>),
    Field(Field),
}

/// One `<item>` of the feed.
#[derive(Debug, Clone)]
pub struct XmlItem {
    names: FieldNames,
    start: BytesStart<'static>,
    end: BytesEnd<'static>,
    parts: Vec<ItemPart>,
}

impl XmlItem {
    fn field(&self, name: &str) -> Option<&Field> {
        self.parts.iter().find_map(|p| match p {
            ItemPart::Field(f) if f.name == name => Some(f),
            _ => None,
        })
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.parts.iter_mut().find_map(|p| match p {
            ItemPart::Field(f) if f.name == name => Some(f),
            _ => None,
        })
    }

    /// Trimmed text of the first child element with this qualified name.
    pub fn field_text(&self, name: &str) -> Option<&str> {
        self.field(name).map(|f| f.text.trim())
    }

    pub fn title(&self) -> Option<&str> {
        self.field(&self.names.title).map(|f| f.text.as_str())
    }

    pub fn description(&self) -> Option<&str> {
        self.field(&self.names.description).map(|f| f.text.as_str())
    }

    fn append_field(&mut self, field: Field) {
        let last_field = self
            .parts
            .iter()
            .rposition(|p| matches!(p, ItemPart::Field(_)));
        let Some(pos) = last_field else {
            self.parts.push(ItemPart::Field(field));
            return;
        };
        // Reuse the indentation that precedes the last child.
        let indent = match pos.checked_sub(1).map(|i| &self.parts[i]) {
            Some(ItemPart::Raw(Event::Text(t))) if t.iter().all(u8::is_ascii_whitespace) => {
                Some(ItemPart::Raw(Event::Text(t.clone())))
            }
            _ => None,
        };
        let mut insert_at = pos + 1;
        if let Some(indent) = indent {
            self.parts.insert(insert_at, indent);
            insert_at += 1;
        }
        self.parts.insert(insert_at, ItemPart::Field(field));
    }

    fn write<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        writer.write_event(Event::Start(self.start.clone()))?;
        for part in &self.parts {
            match part {
                ItemPart::Raw(event) => writer.write_event(event.clone())?,
                ItemPart::Field(field) => field.write(writer)?,
            }
        }
        writer.write_event(Event::End(self.end.clone()))?;
        Ok(())
    }
}

impl FeedItem for XmlItem {
    fn id(&self) -> Option<&str> {
        self.field_text(&self.names.id)
    }

    fn has_title(&self) -> bool {
        self.field(&self.names.title).is_some()
    }

    fn set_title(&mut self, title: &str) {
        let name = self.names.title.clone();
        if let Some(field) = self.field_mut(&name) {
            field.set_text(title);
        }
    }

    fn set_description(&mut self, description: &str) {
        let name = self.names.description.clone();
        match self.field_mut(&name) {
            Some(field) => field.set_text(description),
            None => self.append_field(Field::new_text(&name, description)),
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Event(Event<'static>),
    Item(usize),
}

/// A parsed feed: the surrounding document plus its items in order.
#[derive(Debug, Clone)]
pub struct FeedDocument {
    nodes: Vec<Node>,
    items: Vec<XmlItem>,
    /// Encoding the input was decoded from, when it was not UTF-8.
    source_encoding: Option<&'static Encoding>,
}

impl FeedDocument {
    /// Parse a feed, collecting every `names.item` element at any depth.
    pub fn parse(bytes: &[u8], names: &FieldNames) -> Result<Self> {
        let Some(encoding) = declared_encoding(bytes)? else {
            return Self::parse_utf8(bytes, names);
        };
        let (text, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            bail!("Feed is not valid {}", encoding.name());
        }
        let mut doc = Self::parse_utf8(text.as_bytes(), names)?;
        doc.source_encoding = Some(encoding);
        Ok(doc)
    }

    fn parse_utf8(bytes: &[u8], names: &FieldNames) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(false);
        let mut buf = Vec::new();
        let mut nodes = Vec::new();
        let mut items = Vec::new();

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .with_context(|| {
                    format!("Malformed feed XML at byte {}", reader.buffer_position())
                })?
                .into_owned();
            buf.clear();
            match event {
                Event::Eof => break,
                Event::Start(start) if start.name().as_ref() == names.item.as_bytes() => {
                    let item = read_item(&mut reader, start, names)?;
                    nodes.push(Node::Item(items.len()));
                    items.push(item);
                }
                other => nodes.push(Node::Event(other)),
            }
        }

        Ok(Self {
            nodes,
            items,
            source_encoding: None,
        })
    }

    /// Encoding the input was transcoded from, if it was not UTF-8.
    pub fn source_encoding(&self) -> Option<&'static str> {
        self.source_encoding.map(Encoding::name)
    }

    pub fn items(&self) -> &[XmlItem] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [XmlItem] {
        &mut self.items
    }

    /// Serialize back to UTF-8 XML, adding a declaration if the input had none.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        let has_decl = self
            .nodes
            .iter()
            .any(|n| matches!(n, Node::Event(Event::Decl(_))));
        if !has_decl {
            writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
            writer.write_event(Event::Text(BytesText::new("\n")))?;
        }
        for node in &self.nodes {
            match node {
                Node::Event(Event::Decl(decl)) if self.source_encoding.is_some() => {
                    writer.write_event(Event::Decl(utf8_decl(decl)?))?
                }
                Node::Event(event) => writer.write_event(event.clone())?,
                Node::Item(idx) => self.items[*idx].write(&mut writer)?,
            }
        }
        Ok(writer.into_inner())
    }

    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
        }
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write feed: {}", path.display()))?;
        Ok(())
    }
}

/// Non-UTF-8 encoding signalled by a BOM or the XML declaration.
fn declared_encoding(bytes: &[u8]) -> Result<Option<&'static Encoding>> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return Ok(Some(encoding).filter(|e| *e != UTF_8));
    }
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let Ok(Event::Decl(decl)) = reader.read_event_into(&mut buf) else {
        return Ok(None);
    };
    let Some(label) = decl.encoding() else {
        return Ok(None);
    };
    let label = label?;
    let encoding = Encoding::for_label(&label).ok_or_else(|| {
        anyhow!(
            "Unsupported feed encoding: {}",
            String::from_utf8_lossy(&label)
        )
    })?;
    Ok(Some(encoding).filter(|e| *e != UTF_8))
}

/// The same declaration, relabelled as UTF-8.
fn utf8_decl(decl: &BytesDecl<'_>) -> Result<BytesDecl<'static>> {
    let version = decl.version()?;
    let version = String::from_utf8_lossy(&version).into_owned();
    let standalone = decl
        .standalone()
        .transpose()?
        .map(|s| String::from_utf8_lossy(&s).into_owned());
    Ok(BytesDecl::new(&version, Some("UTF-8"), standalone.as_deref()))
}

fn read_item(
    reader: &mut Reader<&[u8]>,
    start: BytesStart<'static>,
    names: &FieldNames,
) -> Result<XmlItem> {
    let mut buf = Vec::new();
    let mut parts = Vec::new();
    loop {
        let event = reader.read_event_into(&mut buf)?.into_owned();
        buf.clear();
        match event {
            Event::End(end) => {
                return Ok(XmlItem {
                    names: names.clone(),
                    start,
                    end,
                    parts,
                });
            }
            Event::Start(child) => {
                let (inner, end) = read_element_body(reader)?;
                parts.push(ItemPart::Field(Field {
                    name: qualified_name(&child),
                    text: collect_text(&inner),
                    start: child,
                    end: Some(end),
                    inner,
                    rewritten: false,
                }));
            }
            Event::Empty(child) => parts.push(ItemPart::Field(Field {
                name: qualified_name(&child),
                start: child,
                end: None,
                inner: Vec::new(),
                text: String::new(),
                rewritten: false,
            })),
            Event::Eof => bail!("Unexpected end of feed inside <{}>", names.item),
            other => parts.push(ItemPart::Raw(other)),
        }
    }
}

/// Read events up to and including the end tag closing the current element.
fn read_element_body(
    reader: &mut Reader<&[u8]>,
) -> Result<(Vec<Event<'static>>, BytesEnd<'static>)> {
    let mut buf = Vec::new();
    let mut inner = Vec::new();
    let mut depth = 0usize;
    loop {
        let event = reader.read_event_into(&mut buf)?.into_owned();
        buf.clear();
        match event {
            Event::Start(_) => {
                depth += 1;
                inner.push(event);
            }
            Event::End(end) if depth == 0 => return Ok((inner, end)),
            Event::End(_) => {
                depth -= 1;
                inner.push(event);
            }
            Event::Eof => bail!("Unexpected end of feed inside an item field"),
            other => inner.push(other),
        }
    }
}

fn qualified_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn collect_text(events: &[Event<'static>]) -> String {
    let mut out = String::new();
    for event in events {
        match event {
            Event::Text(t) => match t.unescape() {
                Ok(s) => out.push_str(&s),
                Err(_) => out.push_str(&String::from_utf8_lossy(t)),
            },
            Event::CData(c) => out.push_str(&String::from_utf8_lossy(c)),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss xmlns:g="http://base.google.com/ns/1.0" version="2.0">
  <channel>
    <title>Tienda</title>
    <item>
      <g:id>1</g:id>
      <g:title>Crema X</g:title>
      <g:description><![CDATA[<p>Vieja</p>]]></g:description>
      <g:price>10.00 MXN</g:price>
    </item>
    <item>
      <g:id> 2 </g:id>
      <g:title>Gel &amp; Co</g:title>
      <g:image_link/>
    </item>
    <item>
      <g:title>Sin id</g:title>
    </item>
  </channel>
</rss>
"#;

    fn parse() -> FeedDocument {
        FeedDocument::parse(FEED.as_bytes(), &FieldNames::default()).unwrap()
    }

    #[test]
    fn reads_items_in_order() {
        let doc = parse();
        let items = doc.items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].id(), Some("1"));
        assert_eq!(items[0].description(), Some("<p>Vieja</p>"));
        assert_eq!(items[1].id(), Some("2"));
        assert_eq!(items[1].title(), Some("Gel & Co"));
        assert_eq!(items[1].description(), None);
        assert_eq!(items[2].id(), None);
        assert!(items[2].has_title());
    }

    #[test]
    fn untouched_document_round_trips() {
        let doc = parse();
        let out = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert_eq!(out, FEED);
    }

    #[test]
    fn rewrites_and_appends_fields() {
        let mut doc = parse();
        doc.items_mut()[0].set_title("Crema X | AcmeCo");
        doc.items_mut()[1].set_description("Producto: Gel <3>\n---");

        let out = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert!(out.contains("<g:title>Crema X | AcmeCo</g:title>"));
        assert!(out.contains("<g:price>10.00 MXN</g:price>"));
        assert!(out.contains(
            "<g:image_link/>\n      <g:description>Producto: Gel &lt;3&gt;\n---</g:description>"
        ));

        let reparsed = FeedDocument::parse(out.as_bytes(), &FieldNames::default()).unwrap();
        assert_eq!(
            reparsed.items()[1].description(),
            Some("Producto: Gel <3>\n---")
        );
        assert_eq!(reparsed.items()[0].title(), Some("Crema X | AcmeCo"));
    }

    #[test]
    fn unprefixed_field_names() {
        let xml = "<feed><entry><id>9</id><title>T</title></entry></feed>";
        let names = FieldNames::new("entry", "");
        let mut doc = FeedDocument::parse(xml.as_bytes(), &names).unwrap();
        assert_eq!(doc.items()[0].id(), Some("9"));
        doc.items_mut()[0].set_description("D");
        let out = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<feed>"));
        assert!(out.contains("<title>T</title><description>D</description></entry>"));
    }

    #[test]
    fn latin1_feed_is_written_back_as_utf8() {
        let mut latin1 = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<rss><channel><item><g:id>1</g:id><g:title>Ni".to_vec();
        latin1.push(0xF1);
        latin1.extend_from_slice(b"o</g:title></item></channel></rss>");

        let mut doc = FeedDocument::parse(&latin1, &FieldNames::default()).unwrap();
        assert_eq!(doc.source_encoding(), Some("windows-1252"));
        assert_eq!(doc.items()[0].title(), Some("Niño"));
        doc.items_mut()[0].set_description("Categoría: Baño");

        let out = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss>"));
        assert!(out.contains("<g:title>Niño</g:title>"));
        assert!(out.contains("<g:description>Categoría: Baño</g:description>"));
    }

    #[test]
    fn utf8_declaration_is_kept_verbatim() {
        let doc = parse();
        assert_eq!(doc.source_encoding(), None);
        let out = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert!(out.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    }

    #[test]
    fn unknown_encoding_is_an_error() {
        let xml = r#"<?xml version="1.0" encoding="x-klingon"?><rss/>"#;
        let err = FeedDocument::parse(xml.as_bytes(), &FieldNames::default()).unwrap_err();
        assert!(err.to_string().contains("Unsupported feed encoding"));
    }

    #[test]
    fn write_creates_missing_directories() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("out/nested/feed.xml");
        parse().write_to_file(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), FEED);
    }

    #[test]
    fn unwritable_output_directory_is_reported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let blocker = tmp.path().join("taken");
        std::fs::write(&blocker, b"file").unwrap();
        let err = parse()
            .write_to_file(&blocker.join("feed.xml"))
            .unwrap_err();
        assert!(
            err.to_string().contains("Failed to create output directory"),
            "{}",
            err
        );
    }

    #[test]
    fn malformed_feed_is_an_error() {
        let xml = "<rss><item><g:id>1</g:id></rss>";
        assert!(FeedDocument::parse(xml.as_bytes(), &FieldNames::default()).is_err());
    }
}
