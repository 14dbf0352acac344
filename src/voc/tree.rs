//! Minimal element tree and tab-indented renderer used by the VOC writer.

use std::fmt::Write as _;

const INDENT: char = '\t';

/// An XML element with optional text and child elements.
///
/// Mixed content is not supported: an element renders either its text or
/// its children.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct XmlElement {
    tag: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    pub(crate) fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub(crate) fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((name.into(), value.into()));
    }

    /// Appends an empty child and returns it for further building.
    pub(crate) fn child(&mut self, tag: impl Into<String>) -> &mut XmlElement {
        self.children.push(XmlElement::new(tag));
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Appends a leaf child holding `text`.
    pub(crate) fn text_child(&mut self, tag: impl Into<String>, text: impl Into<String>) {
        let mut element = XmlElement::new(tag);
        element.text = Some(text.into());
        self.children.push(element);
    }

    /// Renders the tree, one element per line, one tab per nesting level.
    pub(crate) fn to_pretty_string(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        out.extend(std::iter::repeat_n(INDENT, depth));
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attributes {
            write!(out, " {}=\"{}\"", name, escape_attribute(value)).expect("write to string");
        }

        let text = self.text.as_deref().filter(|text| !text.is_empty());
        match (text, self.children.is_empty()) {
            (None, true) => out.push_str("/>\n"),
            (Some(text), _) => {
                writeln!(out, ">{}</{}>", escape_text(text), self.tag).expect("write to string");
            }
            (None, false) => {
                out.push_str(">\n");
                for child in &self.children {
                    child.render_into(out, depth + 1);
                }
                out.extend(std::iter::repeat_n(INDENT, depth));
                writeln!(out, "</{}>", self.tag).expect("write to string");
            }
        }
    }
}

/// Whether `name` is a namespace-free XML element name (an NCName).
pub(crate) fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_name_start_char(first) => chars.all(is_name_char),
        _ => false,
    }
}

/// Whether every character of `text` may appear in an XML 1.0 document.
pub(crate) fn is_xml_text(text: &str) -> bool {
    text.chars().all(|c| {
        matches!(c, '\t' | '\n' | '\r')
            || matches!(c, '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
    })
}

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        'A'..='Z'
        | '_'
        | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

fn escape_text(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(raw: &str) -> String {
    escape_text(raw).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_elements_with_tabs() {
        let mut root = XmlElement::new("annotation");
        root.set_attribute("verified", "yes");
        root.text_child("folder", "images");
        let size = root.child("size");
        size.text_child("width", "640");

        assert_eq!(
            root.to_pretty_string(),
            "<annotation verified=\"yes\">\n\t<folder>images</folder>\n\t<size>\n\t\t<width>640</width>\n\t</size>\n</annotation>\n"
        );
    }

    #[test]
    fn xml_names_follow_name_production() {
        for valid in ["occluded", "_x", "flag-2", "a.b", "été"] {
            assert!(is_xml_name(valid), "{valid} should be a valid name");
        }
        for invalid in ["", "has space", "3d", "a<b", "-x", "ns:tag", ".a"] {
            assert!(!is_xml_name(invalid), "{invalid} should be rejected");
        }
    }

    #[test]
    fn xml_text_rejects_control_characters() {
        assert!(is_xml_text("tab\tand\nnewline \u{1F600}"));
        assert!(!is_xml_text("bell\u{7}"));
        assert!(!is_xml_text("nul\0"));
        assert!(!is_xml_text("\u{FFFE}"));
    }

    #[test]
    fn empty_text_renders_self_closing() {
        let mut root = XmlElement::new("source");
        root.text_child("database", "");
        assert_eq!(root.to_pretty_string(), "<source>\n\t<database/>\n</source>\n");
    }

    #[test]
    fn text_keeps_inner_whitespace_and_is_escaped() {
        let mut root = XmlElement::new("object");
        root.text_child("name", "a  <b> & c");
        assert_eq!(
            root.to_pretty_string(),
            "<object>\n\t<name>a  &lt;b&gt; &amp; c</name>\n</object>\n"
        );
    }
}
