#![forbid(unsafe_code)]

//! Template writer used to build `<Signature>` skeletons.

use ulriksdal_core::Error;

/// Element-oriented writer over `uppsala::XmlWriter`.
///
/// Attribute values and text are escaped on the way out.
pub struct XmlWriter {
    inner: uppsala::XmlWriter,
}

impl XmlWriter {
    pub fn new() -> Self {
        Self {
            inner: uppsala::XmlWriter::new(),
        }
    }

    /// Start an element with the given name and attributes.
    pub fn start_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), Error> {
        self.inner.start_element(name, attrs);
        Ok(())
    }

    /// Write a self-closing element.
    pub fn empty_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), Error> {
        self.inner.empty_element(name, attrs);
        Ok(())
    }

    pub fn end_element(&mut self, name: &str) -> Result<(), Error> {
        self.inner.end_element(name);
        Ok(())
    }

    pub fn write_text(&mut self, text: &str) -> Result<(), Error> {
        self.inner.text(text);
        Ok(())
    }

    /// Write `<name attrs>text</name>`.
    pub fn text_element(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> Result<(), Error> {
        self.start_element(name, attrs)?;
        self.write_text(text)?;
        self.end_element(name)
    }

    pub fn into_string(self) -> Result<String, Error> {
        Ok(self.inner.into_string())
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_elements_are_escaped() {
        let mut w = XmlWriter::new();
        w.start_element("ds:Signature", &[("xmlns:ds", "urn:x")]).unwrap();
        w.empty_element("ds:Method", &[("Algorithm", "a&b")]).unwrap();
        w.text_element("ds:Name", &[], "<key>").unwrap();
        w.end_element("ds:Signature").unwrap();
        assert_eq!(
            w.into_string().unwrap(),
            r#"<ds:Signature xmlns:ds="urn:x"><ds:Method Algorithm="a&amp;b"/><ds:Name>&lt;key&gt;</ds:Name></ds:Signature>"#
        );
    }
}
