//! XML parsing utilities for the Office Open XML parts of a workbook
//! Provides an XML reader wrapper and helpers for attribute and text processing

use crate::error::SheetRowsError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute '{0}' value '{1}' failed")]
    ParseAttributeValueError(String, String),
}

/// XML reader wrapper configured for spreadsheet parts
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        // `<c r="A1"/>` must produce both a start and an end event
        config.expand_empty_elements = true;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next XML event, `None` at end of input
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, SheetRowsError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(SheetRowsError::XmlError(error)),
        }
    }
}

/// Attribute access on start tags, matched by local name so namespace prefixes are ignored
pub(crate) trait XmlNodeHelper {
    /// Gets the unescaped value of an attribute
    fn get_attribute_value(&self, name: &str) -> Result<Option<String>, SheetRowsError>;

    /// Parses an attribute value to the specified type
    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, SheetRowsError>;
}

impl XmlNodeHelper for BytesStart<'_> {
    fn get_attribute_value(&self, name: &str) -> Result<Option<String>, SheetRowsError> {
        for result in self.attributes() {
            let attribute = result?;
            if attribute.key.local_name().as_ref() == name.as_bytes() {
                return Ok(Some(attribute.unescape_value()?.into_owned()));
            }
        }
        Ok(None)
    }

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, SheetRowsError> {
        match self.get_attribute_value(name)? {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| XmlError::ParseAttributeValueError(name.to_owned(), value).into()),
            None => Ok(None),
        }
    }
}

/// Helper trait for building text content from XML events
pub(crate) trait XmlTextContextHelper {
    /// Appends an entity or character reference (`&amp;`, `&#x41;`)
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), SheetRowsError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), SheetRowsError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                number.parse::<u32>()?
            };
            if let Some(character) = char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }
        Ok(())
    }
}

/// Drives an `XmlReader` until end of input, dispatching each event to the given arms.
/// `Event` must be in scope at the call site.
#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_text(xml: &str) -> Result<String, SheetRowsError> {
        let mut reader = XmlReader::new(xml.as_bytes());
        let mut text = String::new();
        match_xml_events!(reader => {
            Event::Text(event) => text.push_str(&event.xml_content()?),
            Event::GeneralRef(event) => text.push_bytes_ref(&event)?,
        });
        Ok(text)
    }

    #[test]
    fn resolves_entities_and_character_references() {
        assert_eq!(collect_text("<t>x &amp; y &#65;&#x42;</t>").unwrap(), "x & y AB");
    }

    #[test]
    fn rejects_unknown_entity() {
        let error = collect_text("<t>&nope;</t>").unwrap_err();
        assert!(matches!(error, SheetRowsError::XmlHelperError(XmlError::ParseEntityError(_))));
    }

    #[test]
    fn reads_prefixed_attributes_by_local_name() -> Result<(), SheetRowsError> {
        let mut reader = XmlReader::new(r#"<sheet name="Data" r:id="rId2" sheetId="7"/>"#.as_bytes());
        let mut seen = None;
        match_xml_events!(reader => {
            Event::Start(event) => {
                seen = Some((
                    event.get_attribute_value("name")?,
                    event.get_attribute_value("id")?,
                    event.parse_attribute_value::<usize>("sheetId")?,
                    event.get_attribute_value("missing")?,
                ));
            }
        });
        assert_eq!(
            seen,
            Some((Some("Data".to_owned()), Some("rId2".to_owned()), Some(7), None))
        );
        Ok(())
    }

    #[test]
    fn reports_unparsable_attribute() -> Result<(), SheetRowsError> {
        let mut reader = XmlReader::new(r#"<row r="x"/>"#.as_bytes());
        let mut failed = false;
        match_xml_events!(reader => {
            Event::Start(event) => failed = event.parse_attribute_value::<usize>("r").is_err(),
        });
        assert!(failed);
        Ok(())
    }
}
