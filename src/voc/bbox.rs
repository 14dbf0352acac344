//! Bounding box values in VOC pixel coordinates.

use std::collections::BTreeMap;

use serde::Serialize;

use super::model::ImageSize;
use super::value::AttrValue;

/// An integer pixel position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    #[inline]
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl From<(i64, i64)> for Point {
    fn from((x, y): (i64, i64)) -> Self {
        Self::new(x, y)
    }
}

/// An axis-aligned, labelled box as handed to the writer.
///
/// Ordering of min/max is not enforced; a box with `xmin > xmax` is
/// represented and written as-is.
///
/// `attributes` is kept exactly as supplied by the caller. Keys that collide
/// with the positional fields (`xmin`, `ymin`, `xmax`, `ymax`, `name`) are
/// resolved when the box is serialized, where the attribute wins.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoundingBox {
    pub xmin: i64,
    pub ymin: i64,
    pub xmax: i64,
    pub ymax: i64,
    pub label: String,
    pub attributes: BTreeMap<String, AttrValue>,
}

impl BoundingBox {
    /// Creates a box without attributes.
    pub fn new(xmin: i64, ymin: i64, xmax: i64, ymax: i64, label: impl Into<String>) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
            label: label.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Replaces the attribute map.
    pub fn with_attributes(mut self, attributes: BTreeMap<String, AttrValue>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Adds or replaces a single attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Whether the object is marked difficult; `false` when the key is absent.
    pub fn difficult(&self) -> bool {
        self.attributes
            .get("difficult")
            .map(AttrValue::is_truthy)
            .unwrap_or(false)
    }

    /// Corner points: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Point; 4] {
        corners_of(self.xmin, self.ymin, self.xmax, self.ymax)
    }

    /// Whether the box touches the image border.
    ///
    /// Uses the 1-based convention for the near edges and the image's own
    /// width/height for the far edges. Depth is never consulted.
    pub fn is_truncated(&self, size: &ImageSize) -> bool {
        is_truncated(self.xmin, self.ymin, self.xmax, self.ymax, size)
    }
}

pub(crate) fn corners_of(xmin: i64, ymin: i64, xmax: i64, ymax: i64) -> [Point; 4] {
    [
        Point::new(xmin, ymin),
        Point::new(xmax, ymin),
        Point::new(xmax, ymax),
        Point::new(xmin, ymax),
    ]
}

pub(crate) fn is_truncated(xmin: i64, ymin: i64, xmax: i64, ymax: i64, size: &ImageSize) -> bool {
    ymax == i64::from(size.height) || xmax == i64::from(size.width) || ymin == 1 || xmin == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_are_clockwise_from_top_left() {
        let bbox = BoundingBox::new(10, 20, 100, 80, "cat");
        assert_eq!(
            bbox.corners(),
            [
                Point::new(10, 20),
                Point::new(100, 20),
                Point::new(100, 80),
                Point::new(10, 80),
            ]
        );
    }

    #[test]
    fn truncation_checks_each_edge() {
        let size = ImageSize::with_depth(480, 640, 3);
        assert!(!BoundingBox::new(10, 10, 100, 100, "a").is_truncated(&size));
        assert!(BoundingBox::new(1, 10, 100, 100, "a").is_truncated(&size));
        assert!(BoundingBox::new(10, 1, 100, 100, "a").is_truncated(&size));
        assert!(BoundingBox::new(10, 10, 640, 100, "a").is_truncated(&size));
        assert!(BoundingBox::new(10, 10, 100, 480, "a").is_truncated(&size));
        // Zero-based edges do not count.
        assert!(!BoundingBox::new(0, 0, 100, 100, "a").is_truncated(&size));
    }

    #[test]
    fn difficult_defaults_to_false() {
        let bbox = BoundingBox::new(10, 20, 30, 40, "cat");
        assert!(!bbox.difficult());
        assert!(bbox.with_attribute("difficult", true).difficult());
    }
}
