//! Fuzz target for VOC XML parsing.
//!
//! Feeds arbitrary bytes to the strict VOC parser and, when parsing
//! succeeds, re-serializes the result through the writer.

#![no_main]

use libfuzzer_sys::fuzz_target;
use voclabel::voc::{from_voc_xml_slice, VocWriter};

fuzz_target!(|data: &[u8]| {
    // Cap input size to avoid excessive memory usage.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(doc) = from_voc_xml_slice(data) {
        let _ = VocWriter::from_document(doc.into_annotation_document()).serialize();
    }
});
