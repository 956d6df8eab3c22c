//! Small XML writing helpers shared by the feed and sitemap.

use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

/// Errors from writing an XML document.
#[derive(Debug, thiserror::Error)]
#[error("xml write error: {0}")]
pub struct XmlError(String);

fn xml_err(err: impl std::fmt::Display) -> XmlError {
    XmlError(err.to_string())
}

/// An indented UTF-8 XML document being written into memory.
pub struct XmlDoc {
    writer: Writer<Vec<u8>>,
}

impl XmlDoc {
    /// Start a document with the XML declaration.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError`] if the declaration cannot be written.
    pub fn new() -> Result<Self, XmlError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_err)?;
        Ok(Self { writer })
    }

    /// Open `name` with attributes. Attribute values are escaped.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError`] on write failure.
    pub fn open(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), XmlError> {
        let mut start = BytesStart::new(name);
        for &(key, value) in attributes {
            start.push_attribute((key, value));
        }
        self.writer.write_event(Event::Start(start)).map_err(xml_err)
    }

    /// Close `name`.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError`] on write failure.
    pub fn close(&mut self, name: &str) -> Result<(), XmlError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_err)
    }

    /// Self-closing element.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError`] on write failure.
    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), XmlError> {
        let mut start = BytesStart::new(name);
        for &(key, value) in attributes {
            start.push_attribute((key, value));
        }
        self.writer.write_event(Event::Empty(start)).map_err(xml_err)
    }

    /// `<name attrs>text</name>` with all five XML special characters
    /// escaped in `text`.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError`] on write failure.
    pub fn text(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> Result<(), XmlError> {
        self.open(name, attributes)?;
        self.writer
            .write_event(Event::Text(BytesText::from_escaped(escape(text))))
            .map_err(xml_err)?;
        self.close(name)
    }

    /// Finish and return the document.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError`] if the output is not valid UTF-8.
    pub fn finish(self) -> Result<String, XmlError> {
        String::from_utf8(self.writer.into_inner()).map_err(xml_err)
    }
}
