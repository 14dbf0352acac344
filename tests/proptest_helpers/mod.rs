#![allow(dead_code)]

use std::collections::BTreeMap;

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use voclabel::voc::{AnnotationDocument, AttrValue, BoundingBox, ImageSize};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Labels made of XML-safe text, including characters that need escaping.
pub fn arb_label() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z][A-Za-z0-9 _&<>-]{0,15}").expect("valid label regex")
}

pub fn arb_image_size() -> impl Strategy<Value = ImageSize> {
    (1u32..4000, 1u32..4000, proptest::option::of(1u32..5)).prop_map(|(height, width, depth)| {
        ImageSize {
            height,
            width,
            depth,
        }
    })
}

/// Custom flag attributes; keys avoid the writer's reserved and owned tags.
pub fn arb_flag_attrs() -> impl Strategy<Value = BTreeMap<String, AttrValue>> {
    proptest::collection::btree_map(
        proptest::string::string_regex("flag_[a-z]{1,6}").expect("valid key regex"),
        any::<bool>().prop_map(AttrValue::Bool),
        0..3,
    )
}

pub fn arb_box(size: ImageSize) -> impl Strategy<Value = BoundingBox> {
    let max_x = i64::from(size.width);
    let max_y = i64::from(size.height);
    (
        0..=max_x,
        0..=max_y,
        0..=max_x,
        0..=max_y,
        arb_label(),
        arb_flag_attrs(),
    )
        .prop_map(|(x1, y1, x2, y2, label, attrs)| {
            BoundingBox::new(x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2), label)
                .with_attributes(attrs)
        })
}

pub fn arb_document(max_boxes: usize) -> impl Strategy<Value = AnnotationDocument> {
    (arb_image_size(), any::<bool>())
        .prop_flat_map(move |(size, verified)| {
            (
                Just(size),
                Just(verified),
                proptest::collection::vec(arb_box(size), 0..=max_boxes),
            )
        })
        .prop_map(|(size, verified, boxes)| {
            let mut doc = AnnotationDocument::new("images", "img.jpg", Some(size));
            doc.local_image_path = Some("images/img.jpg".to_string());
            doc.verified = verified;
            doc.boxes = boxes;
            doc
        })
}
