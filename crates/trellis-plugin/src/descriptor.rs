// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming parser for the static `plugins.xml` descriptor.
//!
//! The grammar is attribute-driven:
//!
//! ```xml
//! <plugins>
//!   <plugin name="ShapeMenu" source="shapemenu.js" core="true">
//!     <property name="key" value="value"/>
//!   </plugin>
//! </plugins>
//! ```
//!
//! `plugin` elements are matched by local name at any depth. Each yields one
//! [`PluginRecord`] when it closes; `property` elements fill the map of the
//! innermost open plugin. A plugin nested inside another is a record of its
//! own and is yielded before its parent.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;
use trellis_config::TrellisConfig;
use trellis_core::{DescriptorSource, PluginRecord, TrellisError};

const PLUGIN: &[u8] = b"plugin";
const PROPERTY: &[u8] = b"property";

/// Parse the `core` attribute. Only the exact literal `"true"` is true.
pub fn parse_core_flag(value: &str) -> bool {
    value == "true"
}

/// Lazy sequence of plugin records read from a descriptor stream.
///
/// The stream is consumed once. The first structural error is yielded as an
/// `Err` item, after which the iterator is exhausted.
pub struct DescriptorParser<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    location: String,
    depth: usize,
    seen_root: bool,
    open_plugins: Vec<OpenPlugin>,
    finished: bool,
}

/// A `plugin` start tag whose end tag has not been read yet.
struct OpenPlugin {
    header: PluginHeader,
    properties: HashMap<String, String>,
    depth: usize,
}

/// Attributes of a `plugin` start tag.
struct PluginHeader {
    name: String,
    source: String,
    core: bool,
}

impl PluginHeader {
    fn into_record(self, properties: HashMap<String, String>) -> PluginRecord {
        PluginRecord {
            name: self.name,
            source: self.source,
            core: self.core,
            properties,
        }
    }
}

enum Element {
    Plugin(PluginHeader),
    /// `None` when the property lacks `name` or `value`.
    Property(Option<(String, String)>),
    Other,
}

enum Token {
    Open(Element),
    Empty(Element),
    Close,
    Eof,
    Other,
}

impl<R: BufRead> DescriptorParser<R> {
    /// Wrap a byte stream. `location` only appears in logs and errors.
    pub fn new(input: R, location: impl Into<String>) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);

        Self {
            reader,
            buf: Vec::new(),
            location: location.into(),
            depth: 0,
            seen_root: false,
            open_plugins: Vec::new(),
            finished: false,
        }
    }

    fn next_token(&mut self) -> Result<Token, TrellisError> {
        self.buf.clear();
        let event = match self.reader.read_event_into(&mut self.buf) {
            Ok(event) => event,
            Err(e) => {
                return Err(malformed(
                    &self.location,
                    format!("{e} (at byte {})", self.reader.error_position()),
                ));
            }
        };

        let token = match event {
            Event::Start(e) => Token::Open(classify(&e, &self.location)?),
            Event::Empty(e) => Token::Empty(classify(&e, &self.location)?),
            Event::End(_) => Token::Close,
            Event::Eof => Token::Eof,
            _ => Token::Other,
        };
        Ok(token)
    }

    fn next_record(&mut self) -> Result<Option<PluginRecord>, TrellisError> {
        loop {
            match self.next_token()? {
                Token::Open(element) => {
                    self.enter_element()?;
                    self.depth += 1;
                    match element {
                        Element::Plugin(header) => self.open_plugins.push(OpenPlugin {
                            header,
                            properties: HashMap::new(),
                            depth: self.depth,
                        }),
                        element => self.collect_property(element),
                    }
                }
                Token::Empty(element) => {
                    self.enter_element()?;
                    match element {
                        Element::Plugin(header) => {
                            return Ok(Some(header.into_record(HashMap::new())));
                        }
                        element => self.collect_property(element),
                    }
                }
                Token::Close => {
                    let closes_plugin = self
                        .open_plugins
                        .last()
                        .is_some_and(|open| open.depth == self.depth);
                    self.depth = self.depth.saturating_sub(1);
                    if closes_plugin && let Some(open) = self.open_plugins.pop() {
                        return Ok(Some(open.header.into_record(open.properties)));
                    }
                }
                Token::Eof => return self.check_complete().map(|()| None),
                Token::Other => {}
            }
        }
    }

    /// Track the document root; a second top-level element is malformed.
    fn enter_element(&mut self) -> Result<(), TrellisError> {
        if self.depth == 0 {
            if self.seen_root {
                return Err(malformed(&self.location, "document has more than one root element"));
            }
            self.seen_root = true;
        }
        Ok(())
    }

    /// Add a `property` to the innermost open plugin. Properties outside any
    /// plugin are ignored.
    fn collect_property(&mut self, element: Element) {
        let Some(open) = self.open_plugins.last_mut() else {
            return;
        };
        match element {
            Element::Property(Some((key, value))) => {
                open.properties.insert(key, value);
            }
            Element::Property(None) => {
                debug!(plugin = %open.header.name, "skipping property without name or value");
            }
            Element::Plugin(_) | Element::Other => {}
        }
    }

    fn check_complete(&self) -> Result<(), TrellisError> {
        if let Some(open) = self.open_plugins.last() {
            return Err(malformed(
                &self.location,
                format!("unexpected end of document inside plugin `{}`", open.header.name),
            ));
        }
        if !self.seen_root {
            return Err(malformed(&self.location, "document has no root element"));
        }
        if self.depth > 0 {
            return Err(malformed(
                &self.location,
                format!("unexpected end of document with {} unclosed element(s)", self.depth),
            ));
        }
        Ok(())
    }
}

impl<R: BufRead> Iterator for DescriptorParser<R> {
    type Item = Result<PluginRecord, TrellisError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: BufRead> FusedIterator for DescriptorParser<R> {}

fn malformed(location: &str, message: impl Into<String>) -> TrellisError {
    TrellisError::malformed(location, message)
}

fn classify(start: &BytesStart<'_>, location: &str) -> Result<Element, TrellisError> {
    match start.local_name().as_ref() {
        PLUGIN => plugin_header(start, location).map(Element::Plugin),
        PROPERTY => property_entry(start, location).map(Element::Property),
        _ => Ok(Element::Other),
    }
}

/// Iterate `(local name, unescaped value)` pairs of a start tag.
fn attributes<'a>(
    start: &'a BytesStart<'a>,
    location: &'a str,
) -> impl Iterator<Item = Result<(Vec<u8>, String), TrellisError>> + 'a {
    start.attributes().map(move |attr| -> Result<(Vec<u8>, String), TrellisError> {
        let attr = attr.map_err(|e| malformed(location, format!("invalid attribute: {e}")))?;
        let value = attr
            .unescape_value()
            .map_err(|e| malformed(location, format!("invalid attribute value: {e}")))?
            .into_owned();
        Ok((attr.key.local_name().as_ref().to_vec(), value))
    })
}

fn plugin_header(start: &BytesStart<'_>, location: &str) -> Result<PluginHeader, TrellisError> {
    let mut name = None;
    let mut source = None;
    let mut core = false;

    for attr in attributes(start, location) {
        let (key, value) = attr?;
        match key.as_slice() {
            b"name" => name = Some(value),
            b"source" => source = Some(value),
            b"core" => core = parse_core_flag(&value),
            _ => {}
        }
    }

    let name =
        name.ok_or_else(|| malformed(location, "plugin element is missing the `name` attribute"))?;
    let source = source.ok_or_else(|| {
        malformed(location, format!("plugin `{name}` is missing the `source` attribute"))
    })?;

    Ok(PluginHeader { name, source, core })
}

fn property_entry(
    start: &BytesStart<'_>,
    location: &str,
) -> Result<Option<(String, String)>, TrellisError> {
    let mut key = None;
    let mut value = None;

    for attr in attributes(start, location) {
        let (attr_key, attr_value) = attr?;
        match attr_key.as_slice() {
            b"name" => key = Some(attr_value),
            b"value" => value = Some(attr_value),
            _ => {}
        }
    }

    Ok(key.zip(value))
}

/// The descriptor file under a web application root.
///
/// Resolves to `<webapp_root>/js/Plugins/plugins.xml` unless a different
/// relative path is configured.
#[derive(Debug, Clone)]
pub struct WebappDescriptor {
    path: PathBuf,
}

impl WebappDescriptor {
    pub const DEFAULT_RELATIVE_PATH: &'static str = "js/Plugins/plugins.xml";

    pub fn new(webapp_root: impl AsRef<Path>) -> Self {
        Self::with_relative_path(webapp_root, Self::DEFAULT_RELATIVE_PATH)
    }

    pub fn with_relative_path(webapp_root: impl AsRef<Path>, relative: impl AsRef<Path>) -> Self {
        Self {
            path: webapp_root.as_ref().join(relative),
        }
    }

    pub fn from_config(config: &TrellisConfig) -> Self {
        Self {
            path: config.descriptor_path(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DescriptorSource for WebappDescriptor {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn open(&self) -> Result<Box<dyn BufRead + Send>, TrellisError> {
        let file = File::open(&self.path).map_err(|source| TrellisError::SourceUnavailable {
            path: self.path.clone(),
            source,
        })?;
        Ok(Box::new(BufReader::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Result<Vec<PluginRecord>, TrellisError> {
        DescriptorParser::new(xml.as_bytes(), "test.xml").collect()
    }

    #[test]
    fn parses_two_plugin_descriptor() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<plugins>
  <plugin name="ShapeMenu" source="shapemenu.js" core="true">
    <property name="foo" value="bar"/>
  </plugin>
  <plugin name="Undo" source="undo.js"/>
</plugins>"#;

        let records = parse(xml).expect("well-formed descriptor");
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].name, "ShapeMenu");
        assert_eq!(records[0].source, "shapemenu.js");
        assert!(records[0].core);
        assert_eq!(records[0].properties.len(), 1);
        assert_eq!(records[0].property("foo"), Some("bar"));

        assert_eq!(records[1].name, "Undo");
        assert!(!records[1].core);
        assert!(records[1].properties.is_empty());
    }

    #[test]
    fn core_flag_is_case_sensitive() {
        assert!(parse_core_flag("true"));
        assert!(!parse_core_flag("false"));
        assert!(!parse_core_flag("TRUE"));
        assert!(!parse_core_flag("True"));
        assert!(!parse_core_flag("yes"));
        assert!(!parse_core_flag(""));
    }

    #[test]
    fn core_attribute_variants() {
        let xml = r#"<plugins>
  <plugin name="a" source="a.js" core="true"/>
  <plugin name="b" source="b.js" core="false"/>
  <plugin name="c" source="c.js" core="TRUE"/>
  <plugin name="d" source="d.js"/>
</plugins>"#;

        let flags: Vec<bool> = parse(xml).unwrap().iter().map(|r| r.core).collect();
        assert_eq!(flags, vec![true, false, false, false]);
    }

    #[test]
    fn duplicate_property_last_wins() {
        let xml = r#"<plugins>
  <plugin name="a" source="a.js">
    <property name="k" value="1"/>
    <property name="k" value="2"/>
  </plugin>
</plugins>"#;

        let records = parse(xml).unwrap();
        assert_eq!(records[0].property("k"), Some("2"));
    }

    #[test]
    fn incomplete_property_is_skipped() {
        let xml = r#"<plugins>
  <plugin name="a" source="a.js">
    <property name="only-name"/>
    <property value="only-value"/>
    <property name="ok" value="yes"></property>
  </plugin>
</plugins>"#;

        let records = parse(xml).expect("incomplete properties do not abort");
        assert_eq!(records[0].properties.len(), 1);
        assert_eq!(records[0].property("ok"), Some("yes"));
    }

    #[test]
    fn properties_stop_at_plugin_close() {
        let xml = r#"<plugins>
  <plugin name="a" source="a.js">
    <group><property name="nested" value="1"/></group>
  </plugin>
  <property name="stray" value="x"/>
  <plugin name="b" source="b.js">
    <property name="own" value="2"/>
  </plugin>
</plugins>"#;

        let records = parse(xml).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].property("nested"), Some("1"));
        assert_eq!(records[0].property("stray"), None);
        assert_eq!(records[1].properties.len(), 1);
        assert_eq!(records[1].property("own"), Some("2"));
    }

    #[test]
    fn nested_plugin_is_its_own_record() {
        let xml = r#"<plugins>
  <plugin name="outer" source="outer.js">
    <property name="level" value="outer"/>
    <plugin name="inner" source="inner.js">
      <property name="level" value="inner"/>
    </plugin>
    <plugin name="leaf" source="leaf.js"/>
    <property name="after" value="yes"/>
  </plugin>
</plugins>"#;

        let records = parse(xml).unwrap();
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["inner", "leaf", "outer"]);

        assert_eq!(records[0].property("level"), Some("inner"));
        assert!(records[1].properties.is_empty());
        assert_eq!(records[2].property("level"), Some("outer"));
        assert_eq!(records[2].property("after"), Some("yes"));
        assert_eq!(records[2].properties.len(), 2);
    }

    #[test]
    fn second_root_element_is_malformed() {
        let err = parse("<plugins/><plugins/>").unwrap_err();
        assert!(err.to_string().contains("more than one root element"));

        let err = parse(r#"<plugins><plugin name="a" source="a.js"/></plugins><plugin name="b" source="b.js"/>"#)
            .unwrap_err();
        assert!(matches!(err, TrellisError::MalformedDescriptor { .. }));
    }

    #[test]
    fn attribute_values_are_unescaped() {
        let xml = r#"<plugins><plugin name="a&amp;b" source="x.js"><property name="q" value="&lt;tag&gt;"/></plugin></plugins>"#;
        let records = parse(xml).unwrap();
        assert_eq!(records[0].name, "a&b");
        assert_eq!(records[0].property("q"), Some("<tag>"));
    }

    #[test]
    fn empty_root_yields_no_records() {
        assert!(parse("<plugins/>").unwrap().is_empty());
        assert!(parse("<plugins></plugins>").unwrap().is_empty());
    }

    #[test]
    fn mismatched_end_tag_is_malformed() {
        let err = parse("<plugins><plugin name=\"a\" source=\"a.js\"></plugins>").unwrap_err();
        assert!(matches!(err, TrellisError::MalformedDescriptor { .. }));
    }

    #[test]
    fn truncated_document_is_malformed() {
        let err = parse("<plugins><plugin name=\"a\" source=\"a.js\">").unwrap_err();
        assert!(matches!(err, TrellisError::MalformedDescriptor { .. }));

        let err = parse("<plugins>").unwrap_err();
        assert!(matches!(err, TrellisError::MalformedDescriptor { .. }));
    }

    #[test]
    fn empty_document_is_malformed() {
        let err = parse("").unwrap_err();
        assert!(err.to_string().contains("no root element"));
    }

    #[test]
    fn missing_required_plugin_attributes_are_malformed() {
        let err = parse(r#"<plugins><plugin source="a.js"/></plugins>"#).unwrap_err();
        assert!(err.to_string().contains("`name`"));

        let err = parse(r#"<plugins><plugin name="a"/></plugins>"#).unwrap_err();
        assert!(err.to_string().contains("plugin `a` is missing the `source`"));
    }

    #[test]
    fn parser_is_lazy_and_fused() {
        let xml = r#"<plugins><plugin name="a" source="a.js"/><plugin name="b" source="b.js"/><broken"#;
        let mut parser = DescriptorParser::new(xml.as_bytes(), "lazy.xml");

        assert_eq!(parser.next().unwrap().unwrap().name, "a");
        assert_eq!(parser.next().unwrap().unwrap().name, "b");
        assert!(parser.next().unwrap().is_err());
        assert!(parser.next().is_none());
        assert!(parser.next().is_none());
    }

    #[test]
    fn webapp_descriptor_resolves_fixed_location() {
        let source = WebappDescriptor::new("/srv/designer");
        assert_eq!(
            source.path(),
            Path::new("/srv/designer/js/Plugins/plugins.xml")
        );
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = WebappDescriptor::new(dir.path());
        let err = source.open().err().expect("file does not exist");
        assert!(matches!(err, TrellisError::SourceUnavailable { .. }));
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        fn xml_for(plugins: &[(String, Vec<(String, String)>)]) -> String {
            let mut xml = String::from("<plugins>");
            for (name, props) in plugins {
                xml.push_str(&format!("<plugin name=\"{name}\" source=\"{name}.js\">"));
                for (k, v) in props {
                    xml.push_str(&format!("<property name=\"{k}\" value=\"{v}\"/>"));
                }
                xml.push_str("</plugin>");
            }
            xml.push_str("</plugins>");
            xml
        }

        proptest! {
            #[test]
            fn record_count_and_properties_match_input(
                plugins in prop::collection::vec(
                    ("[a-z]{1,8}", prop::collection::vec(("[a-c]", "[a-z0-9]{0,4}"), 0..6)),
                    0..8,
                )
            ) {
                let records = parse(&xml_for(&plugins)).unwrap();
                prop_assert_eq!(records.len(), plugins.len());

                for (record, (name, props)) in records.iter().zip(&plugins) {
                    let expected: HashMap<String, String> = props.iter().cloned().collect();
                    prop_assert_eq!(&record.name, name);
                    prop_assert_eq!(&record.properties, &expected);
                }
            }
        }
    }
}
