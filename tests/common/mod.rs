use std::fs;
use std::path::Path;

/// Encodes a blank 24-bit BMP; just enough for image-size probing.
pub fn blank_bmp(width: u32, height: u32) -> Vec<u8> {
    const HEADER_LEN: u32 = 54;
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_bytes = row_stride * height;
    let file_len = HEADER_LEN + pixel_bytes;

    let mut bytes = Vec::with_capacity(file_len as usize);
    // File header.
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_len.to_le_bytes());
    bytes.extend_from_slice(&[0; 4]);
    bytes.extend_from_slice(&HEADER_LEN.to_le_bytes());
    // BITMAPINFOHEADER.
    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&[0; 4]);
    bytes.extend_from_slice(&pixel_bytes.to_le_bytes());
    bytes.extend_from_slice(&[0; 16]);

    bytes.resize(file_len as usize, 0);
    bytes
}

pub fn write_image(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, blank_bmp(width, height)).expect("write image");
}
