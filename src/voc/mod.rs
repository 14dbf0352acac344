//! Pascal VOC annotation model, reader, and writer.
//!
//! A VOC file describes one image: its folder, file name, size, and a list
//! of labelled axis-aligned boxes with per-object attributes.
//!
//! The [`writer`] turns an [`AnnotationDocument`] into tab-indented XML,
//! computing each box's `<truncated>` flag from the image size. The
//! [`reader`] turns XML back into [`Shape`]s, inferring each attribute's type
//! from its tag name.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use voclabel::voc::{parse_voc_str, AttrValue, ParseOptions, VocWriter};
//!
//! let mut writer = VocWriter::new("images", "cat.jpg", Some((50, 640, 3).into()))
//!     .with_local_image_path("images/cat.jpg");
//! writer.add_box(1, 1, 100, 50, "cat", BTreeMap::new());
//!
//! let xml = writer.serialize().expect("all required fields are set");
//! let doc = parse_voc_str(&xml, &ParseOptions::default()).unwrap();
//! assert_eq!(doc.shapes[0].label, "cat");
//! assert_eq!(doc.shapes[0].attributes["truncated"], AttrValue::Bool(true));
//! ```

mod bbox;
mod model;
pub mod reader;
mod tree;
mod value;
pub mod writer;

// Re-export core types for convenient access
pub use bbox::{BoundingBox, Point};
pub use model::{AnnotationDocument, ImageSize, Rgba, Shape};
pub use reader::{
    from_voc_xml_slice, parse_voc_file, parse_voc_str, read_voc_xml, ParseOptions, VocDocument,
    VocReader,
};
pub use value::{AttrKind, AttrValue};
pub use writer::{LossyAttribute, VocWriter};

/// File extension of VOC annotation files.
pub const VOC_XML_EXTENSION: &str = "xml";

/// Database source written when none is given.
pub const DEFAULT_DATABASE_SOURCE: &str = "Unknown";

/// Pose the writer emits for every object.
pub const DEFAULT_POSE: &str = "Unspecified";

/// Box keys that callers may override through the attribute map.
pub(crate) const RESERVED_BOX_KEYS: &[&str] = &["xmin", "ymin", "xmax", "ymax", "name"];
