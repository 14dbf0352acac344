//! Pascal VOC XML writer.
//!
//! [`VocWriter`] accumulates boxes and builds the document tree only when
//! serialized, so derived fields such as `<truncated>` always reflect the
//! final image size and merged box values.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::bbox::{is_truncated, BoundingBox};
use super::model::{AnnotationDocument, ImageSize};
use super::tree::{is_xml_name, is_xml_text, XmlElement};
use super::value::AttrValue;
use super::{DEFAULT_POSE, RESERVED_BOX_KEYS, VOC_XML_EXTENSION};
use crate::error::VocError;

/// Tags the writer always emits itself; caller attributes with these keys
/// are never rendered as extra object children.
const WRITER_OWNED_KEYS: &[&str] = &["truncated", "pose"];

/// Incremental builder for one VOC annotation file.
#[derive(Clone, Debug, PartialEq)]
pub struct VocWriter {
    document: AnnotationDocument,
}

impl VocWriter {
    /// Creates a writer with the default database source and no image path.
    ///
    /// Missing required fields are not rejected here; they surface when the
    /// document is serialized.
    pub fn new(
        folder_name: impl Into<String>,
        file_name: impl Into<String>,
        image_size: Option<ImageSize>,
    ) -> Self {
        Self {
            document: AnnotationDocument::new(folder_name, file_name, image_size),
        }
    }

    /// Wraps an existing record.
    pub fn from_document(document: AnnotationDocument) -> Self {
        Self { document }
    }

    pub fn with_database_source(mut self, source: impl Into<String>) -> Self {
        self.document.database_source = source.into();
        self
    }

    pub fn with_local_image_path(mut self, path: impl Into<String>) -> Self {
        self.document.local_image_path = Some(path.into());
        self
    }

    pub fn with_verified(mut self, verified: bool) -> Self {
        self.document.verified = verified;
        self
    }

    pub fn set_verified(&mut self, verified: bool) {
        self.document.verified = verified;
    }

    pub fn document(&self) -> &AnnotationDocument {
        &self.document
    }

    pub fn into_document(self) -> AnnotationDocument {
        self.document
    }

    /// Appends a box. No validation is performed.
    ///
    /// Keys in `attrs` that name a positional field (`xmin`, `ymin`, `xmax`,
    /// `ymax`, `name`) override that field when serialized.
    pub fn add_box(
        &mut self,
        xmin: i64,
        ymin: i64,
        xmax: i64,
        ymax: i64,
        label: impl Into<String>,
        attrs: BTreeMap<String, AttrValue>,
    ) {
        self.document
            .boxes
            .push(BoundingBox::new(xmin, ymin, xmax, ymax, label).with_attributes(attrs));
    }

    /// Serializes the document, or `None` if a required field is missing
    /// or a box cannot be resolved.
    pub fn serialize(&self) -> Option<String> {
        self.try_serialize().ok()
    }

    /// Serializes the document, reporting why it could not be built.
    pub fn try_serialize(&self) -> Result<String, VocError> {
        let root = build_voc_tree(&self.document)?;
        Ok(root.to_pretty_string())
    }

    /// `<file_name>.xml`, relative to the current directory.
    pub fn default_output_path(&self) -> PathBuf {
        PathBuf::from(format!(
            "{}.{}",
            self.document.file_name, VOC_XML_EXTENSION
        ))
    }

    /// Writes the serialized document and returns the path written.
    ///
    /// Without an explicit `path`, writes `<file_name>.xml` in the current
    /// directory.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, VocError> {
        let xml = self.try_serialize()?;
        let target = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_output_path());

        let file = File::create(&target).map_err(VocError::Io)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(xml.as_bytes()).map_err(VocError::Io)?;
        writer.flush().map_err(VocError::Io)?;

        tracing::debug!(
            path = %target.display(),
            boxes = self.document.boxes.len(),
            "wrote VOC annotation"
        );
        Ok(target)
    }
}

/// A box attribute whose value does not survive serialization.
#[derive(Clone, Debug, PartialEq)]
pub struct LossyAttribute {
    /// Index of the box in the document.
    pub box_index: usize,
    pub label: String,
    pub key: String,
    pub value: AttrValue,
    /// Text the writer emits in its place.
    pub written: String,
}

impl fmt::Display for LossyAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "object {} ({}): <{}> {} is written as {}",
            self.box_index + 1,
            self.label,
            self.key,
            self.value,
            self.written
        )
    }
}

impl VocWriter {
    /// Lists attributes the writer would not reproduce: poses other than
    /// the default, non-flag values coerced to `1`/`0`, and `truncated`
    /// flags that disagree with the box geometry.
    pub fn lossy_attributes(&self) -> Vec<LossyAttribute> {
        let size = self.document.image_size;
        let mut lossy = Vec::new();

        for (box_index, bbox) in self.document.boxes.iter().enumerate() {
            for (key, value) in &bbox.attributes {
                let written = match key.as_str() {
                    _ if RESERVED_BOX_KEYS.contains(&key.as_str()) => continue,
                    "pose" if value.as_str() == Some(DEFAULT_POSE) => continue,
                    "pose" => DEFAULT_POSE.to_string(),
                    "truncated" => match size {
                        Some(size) if value.is_truthy() != bbox.is_truncated(&size) => {
                            AttrValue::Bool(bbox.is_truncated(&size)).bool_text().to_string()
                        }
                        _ => continue,
                    },
                    _ => match value {
                        AttrValue::Bool(_) => continue,
                        AttrValue::Float(number) if *number == 0.0 || *number == 1.0 => continue,
                        _ => value.bool_text().to_string(),
                    },
                };

                lossy.push(LossyAttribute {
                    box_index,
                    label: bbox.label.clone(),
                    key: key.clone(),
                    value: value.clone(),
                    written,
                });
            }
        }

        lossy
    }
}

/// A box with its reserved keys resolved against the caller's attributes.
struct MergedBox<'a> {
    xmin: i64,
    ymin: i64,
    xmax: i64,
    ymax: i64,
    label: String,
    extras: Vec<(&'a str, &'a AttrValue)>,
}

fn merge_box(bbox: &BoundingBox) -> Result<MergedBox<'_>, VocError> {
    let coordinate = |key: &'static str, positional: i64| -> Result<i64, VocError> {
        match bbox.attributes.get(key) {
            None => Ok(positional),
            Some(value) => value.as_integer().ok_or_else(|| VocError::InvalidArgument {
                field: key,
                message: format!("attribute override '{value}' is not an integer coordinate"),
            }),
        }
    };

    let label = bbox
        .attributes
        .get("name")
        .map(ToString::to_string)
        .unwrap_or_else(|| bbox.label.clone());

    check_text("name", &label)?;

    let extras: Vec<(&str, &AttrValue)> = bbox
        .attributes
        .iter()
        .filter(|(key, _)| {
            !RESERVED_BOX_KEYS.contains(&key.as_str()) && !WRITER_OWNED_KEYS.contains(&key.as_str())
        })
        .map(|(key, value)| (key.as_str(), value))
        .collect();

    if let Some((key, _)) = extras.iter().find(|(key, _)| !is_xml_name(key)) {
        return Err(VocError::InvalidArgument {
            field: "attributes",
            message: format!("attribute key '{key}' is not a valid XML element name"),
        });
    }

    Ok(MergedBox {
        xmin: coordinate("xmin", bbox.xmin)?,
        ymin: coordinate("ymin", bbox.ymin)?,
        xmax: coordinate("xmax", bbox.xmax)?,
        ymax: coordinate("ymax", bbox.ymax)?,
        label,
        extras,
    })
}

fn build_voc_tree(document: &AnnotationDocument) -> Result<XmlElement, VocError> {
    if document.file_name.is_empty() {
        return Err(missing_field("file_name"));
    }
    if document.folder_name.is_empty() {
        return Err(missing_field("folder_name"));
    }
    let size = document
        .image_size
        .ok_or_else(|| missing_field("image_size"))?;

    check_text("folder_name", &document.folder_name)?;
    check_text("file_name", &document.file_name)?;
    check_text("database_source", &document.database_source)?;
    if let Some(local_path) = &document.local_image_path {
        check_text("local_image_path", local_path)?;
    }

    let mut root = XmlElement::new("annotation");
    if document.verified {
        root.set_attribute("verified", "yes");
    }

    root.text_child("folder", document.folder_name.as_str());
    root.text_child("filename", document.file_name.as_str());
    if let Some(local_path) = &document.local_image_path {
        root.text_child("path", local_path.as_str());
    }

    root.child("source")
        .text_child("database", document.database_source.as_str());

    let size_element = root.child("size");
    size_element.text_child("width", size.width.to_string());
    size_element.text_child("height", size.height.to_string());
    size_element.text_child("depth", size.depth_or_default().to_string());

    root.text_child("segmented", "0");

    for bbox in &document.boxes {
        append_object(&mut root, bbox, &size)?;
    }

    Ok(root)
}

fn append_object(
    root: &mut XmlElement,
    bbox: &BoundingBox,
    size: &ImageSize,
) -> Result<(), VocError> {
    let merged = merge_box(bbox)?;
    let truncated = is_truncated(merged.xmin, merged.ymin, merged.xmax, merged.ymax, size);

    let object = root.child("object");
    object.text_child("name", merged.label);
    object.text_child("pose", DEFAULT_POSE);
    object.text_child("truncated", if truncated { "1" } else { "0" });

    let bndbox = object.child("bndbox");
    bndbox.text_child("xmin", merged.xmin.to_string());
    bndbox.text_child("ymin", merged.ymin.to_string());
    bndbox.text_child("xmax", merged.xmax.to_string());
    bndbox.text_child("ymax", merged.ymax.to_string());

    for (key, value) in merged.extras {
        object.text_child(key, value.bool_text());
    }

    Ok(())
}

fn check_text(field: &'static str, text: &str) -> Result<(), VocError> {
    if is_xml_text(text) {
        Ok(())
    } else {
        Err(VocError::InvalidArgument {
            field,
            message: format!("{text:?} contains characters not allowed in XML"),
        })
    }
}

fn missing_field(field: &'static str) -> VocError {
    VocError::InvalidArgument {
        field,
        message: "required to serialize a VOC document".to_string(),
    }
}
