//! Annotation records shared by the VOC reader and writer.

use std::collections::BTreeMap;

use serde::Serialize;

use super::bbox::{BoundingBox, Point};
use super::value::AttrValue;
use super::DEFAULT_DATABASE_SOURCE;

/// RGBA color slot reserved for caller-side styling of shapes.
pub type Rgba = [u8; 4];

/// Image dimensions in pixels.
///
/// Follows the VOC tool convention of listing height before width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ImageSize {
    pub height: u32,
    pub width: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
}

impl ImageSize {
    /// Creates a size without an explicit depth.
    pub fn new(height: u32, width: u32) -> Self {
        Self {
            height,
            width,
            depth: None,
        }
    }

    /// Creates a size with an explicit depth (channel count).
    pub fn with_depth(height: u32, width: u32, depth: u32) -> Self {
        Self {
            height,
            width,
            depth: Some(depth),
        }
    }

    /// Depth as written to `<depth>`: the explicit value, or 1.
    pub fn depth_or_default(&self) -> u32 {
        self.depth.unwrap_or(1)
    }
}

impl From<(u32, u32)> for ImageSize {
    fn from((height, width): (u32, u32)) -> Self {
        Self::new(height, width)
    }
}

impl From<(u32, u32, u32)> for ImageSize {
    fn from((height, width, depth): (u32, u32, u32)) -> Self {
        Self::with_depth(height, width, depth)
    }
}

/// A complete annotation record for one image.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnnotationDocument {
    /// Directory the source image lives in.
    pub folder_name: String,

    /// Image file name.
    pub file_name: String,

    /// Path to the image; `<path>` is omitted when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_image_path: Option<String>,

    /// Free-text provenance tag.
    pub database_source: String,

    pub image_size: Option<ImageSize>,

    /// Whether a human has confirmed the annotations.
    pub verified: bool,

    /// Boxes in serialization order.
    pub boxes: Vec<BoundingBox>,
}

impl AnnotationDocument {
    /// Creates an empty, unverified document with the default database source.
    pub fn new(
        folder_name: impl Into<String>,
        file_name: impl Into<String>,
        image_size: Option<ImageSize>,
    ) -> Self {
        Self {
            folder_name: folder_name.into(),
            file_name: file_name.into(),
            local_image_path: None,
            database_source: DEFAULT_DATABASE_SOURCE.to_string(),
            image_size,
            verified: false,
            boxes: Vec::new(),
        }
    }
}

/// A labelled shape as produced by the reader.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Shape {
    pub label: String,

    /// Top-left, top-right, bottom-right, bottom-left.
    pub points: [Point; 4],

    /// Never populated by the reader.
    pub line_color: Option<Rgba>,

    /// Never populated by the reader.
    pub fill_color: Option<Rgba>,

    pub attributes: BTreeMap<String, AttrValue>,
}

impl Shape {
    /// Rebuilds the box the shape's corner points describe.
    pub fn to_bounding_box(&self) -> BoundingBox {
        let [top_left, _, bottom_right, _] = self.points;
        BoundingBox::new(
            top_left.x,
            top_left.y,
            bottom_right.x,
            bottom_right.y,
            self.label.clone(),
        )
        .with_attributes(self.attributes.clone())
    }
}
