//! Tiny content fixtures
//!
//! Just enough header bytes for signature detection and dimension parsing.
//! A `seed` byte is appended so fixtures of the same shape hash differently.

/// Baseline JPEG: SOI, APP0/JFIF, SOF0 with the given size
pub fn jpeg_image(width: u16, height: u16, seed: u8) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    bytes.extend_from_slice(b"JFIF\0");
    bytes.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
    bytes.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&[0x03, 0x01, 0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01]);
    bytes.extend_from_slice(&[0xFF, 0xD9, seed]);
    bytes
}

/// PNG signature and IHDR chunk
pub fn png_image(width: u32, height: u32, seed: u8) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&[8, 2, 0, 0, 0, seed]);
    bytes
}

/// GIF89a logical screen descriptor
pub fn gif_image(width: u16, height: u16, seed: u8) -> Vec<u8> {
    let mut bytes = b"GIF89a".to_vec();
    bytes.extend_from_slice(&width.to_le_bytes());
    bytes.extend_from_slice(&height.to_le_bytes());
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, seed]);
    bytes
}

pub fn comic_info_xml(series: &str, number: &str) -> Vec<u8> {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <ComicInfo xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\n\
         \x20 <Series>{}</Series>\n\
         \x20 <Number>{}</Number>\n\
         \x20 <Writer>Test Writer</Writer>\n\
         </ComicInfo>\n",
        series, number
    )
    .into_bytes()
}
