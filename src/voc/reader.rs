//! Pascal VOC XML reader.
//!
//! Parsing is split in two: the `parse_*` functions are strict and return
//! every failure as [`VocError::MalformedDocument`], while [`VocReader`]
//! absorbs failures, logs them, and leaves itself empty.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use super::bbox::{corners_of, BoundingBox};
use super::model::{AnnotationDocument, ImageSize, Shape};
use super::value::{AttrKind, AttrValue};
use super::{DEFAULT_DATABASE_SOURCE, VOC_XML_EXTENSION};
use crate::error::VocError;

/// Options for strict parsing.
#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// Reject documents without a `<path>` element.
    ///
    /// The writer only emits `<path>` when an image path is known, so files
    /// it wrote without one cannot be read while this is set.
    pub require_path: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { require_path: true }
    }
}

/// The strict result of parsing one VOC file.
#[derive(Clone, Debug, PartialEq)]
pub struct VocDocument {
    pub verified: bool,
    pub original_path: Option<String>,
    pub original_filename: Option<String>,
    pub folder_name: Option<String>,
    pub database_source: Option<String>,
    pub size: ImageSize,
    pub shapes: Vec<Shape>,
}

impl VocDocument {
    /// Rebuilds a writable record from the parsed document.
    ///
    /// Shape attributes are carried over verbatim, so flags folded in on
    /// read (such as `truncated`) travel with each box.
    pub fn into_annotation_document(self) -> AnnotationDocument {
        let boxes: Vec<BoundingBox> = self.shapes.iter().map(Shape::to_bounding_box).collect();
        AnnotationDocument {
            folder_name: self.folder_name.unwrap_or_default(),
            file_name: self.original_filename.unwrap_or_default(),
            local_image_path: self.original_path,
            database_source: self
                .database_source
                .unwrap_or_else(|| DEFAULT_DATABASE_SOURCE.to_string()),
            image_size: Some(self.size),
            verified: self.verified,
            boxes,
        }
    }
}

/// Parse a VOC XML file with default options.
pub fn read_voc_xml(path: &Path) -> Result<VocDocument, VocError> {
    parse_voc_file(path, &ParseOptions::default())
}

/// Parse a VOC XML file.
///
/// The path must carry an `.xml` extension and the contents must be UTF-8.
pub fn parse_voc_file(path: &Path, opts: &ParseOptions) -> Result<VocDocument, VocError> {
    if !has_xml_extension(path) {
        return Err(malformed(path, "unsupported file format; expected .xml"));
    }

    let bytes = fs::read(path).map_err(|source| malformed(path, source.to_string()))?;
    let xml = std::str::from_utf8(&bytes)
        .map_err(|source| malformed(path, format!("input is not valid UTF-8: {source}")))?;
    parse_voc_xml_str(xml, path, opts)
}

/// Parse VOC XML from a UTF-8 string.
pub fn parse_voc_str(xml: &str, opts: &ParseOptions) -> Result<VocDocument, VocError> {
    parse_voc_xml_str(xml, Path::new("<memory>"), opts)
}

/// Parse VOC XML from bytes with default options.
///
/// The input must be valid UTF-8.
pub fn from_voc_xml_slice(bytes: &[u8]) -> Result<VocDocument, VocError> {
    let path = Path::new("<memory>");
    let xml = std::str::from_utf8(bytes)
        .map_err(|source| malformed(path, format!("input is not valid UTF-8: {source}")))?;
    parse_voc_xml_str(xml, path, &ParseOptions::default())
}

/// Lenient reader: never fails, reports emptiness instead.
#[derive(Debug, Default)]
pub struct VocReader {
    file_path: PathBuf,
    document: Option<VocDocument>,
    error: Option<VocError>,
}

impl VocReader {
    /// Reads `path` with default options.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path, &ParseOptions::default())
    }

    /// Reads `path`; any failure is logged and leaves the reader empty.
    pub fn with_options(path: impl Into<PathBuf>, opts: &ParseOptions) -> Self {
        let file_path = path.into();
        match parse_voc_file(&file_path, opts) {
            Ok(document) => Self {
                file_path,
                document: Some(document),
                error: None,
            },
            Err(error) => {
                tracing::warn!(
                    path = %file_path.display(),
                    %error,
                    "failed to read VOC annotation; continuing with empty result"
                );
                Self {
                    file_path,
                    document: None,
                    error: Some(error),
                }
            }
        }
    }

    /// Wraps an already parsed document.
    pub fn from_document(file_path: impl Into<PathBuf>, document: VocDocument) -> Self {
        Self {
            file_path: file_path.into(),
            document: Some(document),
            error: None,
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Shapes in document order; empty if reading failed.
    pub fn shapes(&self) -> &[Shape] {
        self.document
            .as_ref()
            .map(|doc| doc.shapes.as_slice())
            .unwrap_or(&[])
    }

    /// Image size; `None` if reading failed.
    pub fn size(&self) -> Option<ImageSize> {
        self.document.as_ref().map(|doc| doc.size)
    }

    pub fn verified(&self) -> bool {
        self.document.as_ref().is_some_and(|doc| doc.verified)
    }

    pub fn original_path(&self) -> Option<&str> {
        self.document.as_ref()?.original_path.as_deref()
    }

    pub fn original_filename(&self) -> Option<&str> {
        self.document.as_ref()?.original_filename.as_deref()
    }

    pub fn document(&self) -> Option<&VocDocument> {
        self.document.as_ref()
    }

    /// The failure absorbed while reading, for diagnostics.
    pub fn error(&self) -> Option<&VocError> {
        self.error.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.document.is_none()
    }
}

fn parse_voc_xml_str(xml: &str, path: &Path, opts: &ParseOptions) -> Result<VocDocument, VocError> {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let document = Document::parse(xml).map_err(|source| malformed(path, source.to_string()))?;

    let annotation = document.root_element();
    if annotation.tag_name().name() != "annotation" {
        return Err(malformed(path, "missing <annotation> root element"));
    }

    let verified = annotation.attribute("verified") == Some("yes");

    let original_path = match child_element(annotation, "path") {
        Some(node) => node_text(node),
        None if opts.require_path => {
            return Err(malformed(path, "missing <path> in <annotation>"));
        }
        None => None,
    };
    let original_filename =
        node_text(required_child_element(annotation, "filename", path, "<annotation>")?);
    let folder_name = child_element(annotation, "folder").and_then(node_text);
    let database_source = child_element(annotation, "source")
        .and_then(|source| child_element(source, "database"))
        .and_then(node_text);

    let size_node = required_child_element(annotation, "size", path, "<annotation>")?;
    let width = parse_required_u32(size_node, "width", path)?;
    let height = parse_required_u32(size_node, "height", path)?;
    let depth = parse_required_u32(size_node, "depth", path)?;

    let mut shapes = Vec::new();
    for object in annotation
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == "object")
    {
        shapes.push(parse_object(object, path)?);
    }

    tracing::debug!(
        path = %path.display(),
        objects = shapes.len(),
        "parsed VOC annotation"
    );

    Ok(VocDocument {
        verified,
        original_path,
        original_filename,
        folder_name,
        database_source,
        size: ImageSize::with_depth(height, width, depth),
        shapes,
    })
}

fn parse_object(object: Node<'_, '_>, path: &Path) -> Result<Shape, VocError> {
    let mut corners: BTreeMap<&str, i64> = BTreeMap::new();
    let mut label = None;
    let mut attributes = BTreeMap::new();
    attributes.insert("difficult".to_string(), AttrValue::Bool(false));

    for elem in object.descendants().filter(Node::is_element) {
        let tag = elem.tag_name().name();
        match tag {
            "bndbox" | "object" => continue,
            "xmin" | "ymin" | "xmax" | "ymax" => {
                corners.insert(tag, parse_integer(elem, path)?);
            }
            "name" => label = Some(elem.text().unwrap_or_default().to_string()),
            _ => {
                let value = match AttrKind::for_tag(tag) {
                    AttrKind::String => AttrValue::String(elem.text().unwrap_or_default().to_string()),
                    AttrKind::Float => AttrValue::Float(parse_float(elem, path)?),
                    AttrKind::Bool => AttrValue::Bool(parse_integer(elem, path)? != 0),
                };
                attributes.insert(tag.to_string(), value);
            }
        }
    }

    let label = label.ok_or_else(|| malformed(path, "missing <name> in <object>"))?;
    let corner = |key: &str| corners.get(key).copied().unwrap_or(0);

    Ok(Shape {
        label,
        points: corners_of(corner("xmin"), corner("ymin"), corner("xmax"), corner("ymax")),
        line_color: None,
        fill_color: None,
        attributes,
    })
}

fn parse_integer(node: Node<'_, '_>, path: &Path) -> Result<i64, VocError> {
    let raw = node.text().unwrap_or_default();
    raw.trim().parse::<i64>().map_err(|_| {
        malformed(
            path,
            format!(
                "invalid <{}> value '{raw}'; expected integer",
                node.tag_name().name()
            ),
        )
    })
}

fn parse_float(node: Node<'_, '_>, path: &Path) -> Result<f64, VocError> {
    let raw = node.text().unwrap_or_default();
    raw.trim().parse::<f64>().map_err(|_| {
        malformed(
            path,
            format!(
                "invalid <{}> value '{raw}'; expected floating-point number",
                node.tag_name().name()
            ),
        )
    })
}

fn parse_required_u32(node: Node<'_, '_>, tag: &str, path: &Path) -> Result<u32, VocError> {
    let child = required_child_element(node, tag, path, "<size>")?;
    let raw = child.text().unwrap_or_default();
    raw.trim().parse::<u32>().map_err(|_| {
        malformed(
            path,
            format!("invalid <{tag}> value '{raw}' in <size>; expected u32"),
        )
    })
}

fn required_child_element<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<Node<'a, 'input>, VocError> {
    child_element(node, tag).ok_or_else(|| malformed(path, format!("missing <{tag}> in {context}")))
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

fn node_text(node: Node<'_, '_>) -> Option<String> {
    node.text()
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}

fn malformed(path: &Path, message: impl Into<String>) -> VocError {
    VocError::MalformedDocument {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

pub(crate) fn has_xml_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(VOC_XML_EXTENSION))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<annotation verified="yes">
	<folder>images</folder>
	<filename>img1.jpg</filename>
	<path>/data/images/img1.jpg</path>
	<source>
		<database>Unknown</database>
	</source>
	<size>
		<width>640</width>
		<height>480</height>
		<depth>3</depth>
	</size>
	<segmented>0</segmented>
	<object>
		<name>cat</name>
		<pose>Frontal</pose>
		<truncated>1</truncated>
		<confidence>0.75</confidence>
		<bndbox>
			<xmin>1</xmin>
			<ymin>20</ymin>
			<xmax>30</xmax>
			<ymax>40</ymax>
		</bndbox>
		<occluded>0</occluded>
	</object>
</annotation>
"#;

    #[test]
    fn parse_extracts_size_flags_and_typed_attributes() {
        let doc = parse_voc_str(SAMPLE, &ParseOptions::default()).expect("parse xml");
        assert!(doc.verified);
        assert_eq!(doc.original_path.as_deref(), Some("/data/images/img1.jpg"));
        assert_eq!(doc.original_filename.as_deref(), Some("img1.jpg"));
        assert_eq!(doc.folder_name.as_deref(), Some("images"));
        assert_eq!(doc.size, ImageSize::with_depth(480, 640, 3));
        assert_eq!(doc.shapes.len(), 1);

        let shape = &doc.shapes[0];
        assert_eq!(shape.label, "cat");
        assert_eq!(shape.points, corners_of(1, 20, 30, 40));
        assert_eq!(shape.line_color, None);
        assert_eq!(shape.fill_color, None);
        assert_eq!(shape.attributes.get("pose"), Some(&AttrValue::from("Frontal")));
        assert_eq!(shape.attributes.get("confidence"), Some(&AttrValue::Float(0.75)));
        assert_eq!(shape.attributes.get("truncated"), Some(&AttrValue::Bool(true)));
        assert_eq!(shape.attributes.get("occluded"), Some(&AttrValue::Bool(false)));
        assert_eq!(shape.attributes.get("difficult"), Some(&AttrValue::Bool(false)));
        assert!(!shape.attributes.contains_key("name"));
        assert!(!shape.attributes.contains_key("xmin"));
    }

    #[test]
    fn verified_requires_exact_yes() {
        let xml = SAMPLE.replace("verified=\"yes\"", "verified=\"no\"");
        let doc = parse_voc_str(&xml, &ParseOptions::default()).expect("parse xml");
        assert!(!doc.verified);

        let xml = SAMPLE.replace(" verified=\"yes\"", "");
        let doc = parse_voc_str(&xml, &ParseOptions::default()).expect("parse xml");
        assert!(!doc.verified);
    }

    #[test]
    fn missing_path_is_rejected_unless_allowed() {
        let xml = SAMPLE.replace("\t<path>/data/images/img1.jpg</path>\n", "");

        let err = parse_voc_str(&xml, &ParseOptions::default()).unwrap_err();
        match err {
            VocError::MalformedDocument { message, .. } => assert!(message.contains("<path>")),
            other => panic!("expected MalformedDocument, got {other:?}"),
        }

        let lenient = ParseOptions {
            require_path: false,
        };
        let doc = parse_voc_str(&xml, &lenient).expect("parse without path");
        assert_eq!(doc.original_path, None);
        assert_eq!(doc.shapes.len(), 1);
    }

    #[test]
    fn last_name_wins_and_missing_corners_default_to_zero() {
        let xml = r#"<annotation>
  <filename>a.jpg</filename>
  <path>a.jpg</path>
  <size><width>10</width><height>10</height><depth>1</depth></size>
  <object>
    <name>first</name>
    <bndbox><xmax>5</xmax><name>second</name></bndbox>
  </object>
</annotation>"#;
        let doc = parse_voc_str(xml, &ParseOptions::default()).expect("parse xml");
        let shape = &doc.shapes[0];
        assert_eq!(shape.label, "second");
        assert_eq!(shape.points, corners_of(0, 0, 5, 0));
    }

    #[test]
    fn non_integer_flag_is_malformed() {
        let xml = SAMPLE.replace("<occluded>0</occluded>", "<occluded>yes</occluded>");
        assert!(matches!(
            parse_voc_str(&xml, &ParseOptions::default()),
            Err(VocError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn missing_size_child_is_malformed() {
        let xml = SAMPLE.replace("\t\t<depth>3</depth>\n", "");
        let err = parse_voc_str(&xml, &ParseOptions::default()).unwrap_err();
        match err {
            VocError::MalformedDocument { message, .. } => assert!(message.contains("<depth>")),
            other => panic!("expected MalformedDocument, got {other:?}"),
        }
    }

    #[test]
    fn non_annotation_root_is_malformed() {
        let xml = SAMPLE
            .replace("<annotation verified=\"yes\">", "<dataset verified=\"yes\">")
            .replace("</annotation>", "</dataset>");
        let err = parse_voc_str(&xml, &ParseOptions::default()).unwrap_err();
        match err {
            VocError::MalformedDocument { message, .. } => {
                assert!(message.contains("<annotation> root"))
            }
            other => panic!("expected MalformedDocument, got {other:?}"),
        }
    }

    #[test]
    fn object_without_name_is_malformed() {
        let xml = SAMPLE.replace("\t\t<name>cat</name>\n", "");
        assert!(parse_voc_str(&xml, &ParseOptions::default()).is_err());
    }

    #[test]
    fn lenient_reader_is_empty_on_wrong_extension() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let txt = temp.path().join("img1.txt");
        fs::write(&txt, SAMPLE).expect("write sample");

        let reader = VocReader::new(&txt);
        assert!(reader.is_empty());
        assert!(reader.shapes().is_empty());
        assert_eq!(reader.size(), None);
        assert!(!reader.verified());
        assert!(matches!(
            reader.error(),
            Some(VocError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn lenient_reader_reads_valid_file() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let xml_path = temp.path().join("img1.XML");
        fs::write(&xml_path, format!("\u{feff}{SAMPLE}")).expect("write sample");

        let reader = VocReader::new(&xml_path);
        assert!(reader.error().is_none());
        assert_eq!(reader.shapes().len(), 1);
        assert_eq!(reader.size(), Some(ImageSize::with_depth(480, 640, 3)));
        assert!(reader.verified());
        assert_eq!(reader.original_filename(), Some("img1.jpg"));
    }

    #[test]
    fn parsed_document_converts_to_record() {
        let doc = parse_voc_str(SAMPLE, &ParseOptions::default()).expect("parse xml");
        let record = doc.into_annotation_document();
        assert_eq!(record.folder_name, "images");
        assert_eq!(record.file_name, "img1.jpg");
        assert_eq!(record.database_source, "Unknown");
        assert!(record.verified);
        assert_eq!(record.boxes.len(), 1);
        assert_eq!(record.boxes[0].corners(), corners_of(1, 20, 30, 40));
        assert!(!record.boxes[0].difficult());
    }
}
