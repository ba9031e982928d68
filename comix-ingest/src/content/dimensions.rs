//! Image dimensions from header bytes
//!
//! Reads width/height straight from the container header of the formats
//! comic pages use, without decoding pixels.

/// (width, height) of an image, None when the header is not understood
pub fn image_dimensions(bytes: &[u8]) -> Option<(i32, i32)> {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => png_dimensions(bytes),
        [0xFF, 0xD8, ..] => jpeg_dimensions(bytes),
        [b'G', b'I', b'F', b'8', ..] => gif_dimensions(bytes),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => webp_dimensions(bytes),
        [b'B', b'M', ..] => bmp_dimensions(bytes),
        _ => None,
    }
}

fn be_u16(bytes: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_be_bytes([*bytes.get(at)?, *bytes.get(at + 1)?]))
}

fn le_u16(bytes: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_le_bytes([*bytes.get(at)?, *bytes.get(at + 1)?]))
}

fn be_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let slice = bytes.get(at..at + 4)?;
    Some(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

fn le_i32(bytes: &[u8], at: usize) -> Option<i32> {
    let slice = bytes.get(at..at + 4)?;
    Some(i32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

fn le_u24(bytes: &[u8], at: usize) -> Option<u32> {
    let slice = bytes.get(at..at + 3)?;
    Some(u32::from(slice[0]) | u32::from(slice[1]) << 8 | u32::from(slice[2]) << 16)
}

fn to_dims(width: u32, height: u32) -> Option<(i32, i32)> {
    Some((i32::try_from(width).ok()?, i32::try_from(height).ok()?))
}

fn png_dimensions(bytes: &[u8]) -> Option<(i32, i32)> {
    // Signature (8) + IHDR length (4) + "IHDR" (4), then width and height
    if bytes.get(12..16)? != b"IHDR" {
        return None;
    }
    to_dims(be_u32(bytes, 16)?, be_u32(bytes, 20)?)
}

fn gif_dimensions(bytes: &[u8]) -> Option<(i32, i32)> {
    to_dims(u32::from(le_u16(bytes, 6)?), u32::from(le_u16(bytes, 8)?))
}

fn bmp_dimensions(bytes: &[u8]) -> Option<(i32, i32)> {
    let width = le_i32(bytes, 18)?;
    // Negative height means a top-down bitmap
    let height = le_i32(bytes, 22)?.checked_abs()?;
    (width > 0).then_some((width, height))
}

fn jpeg_dimensions(bytes: &[u8]) -> Option<(i32, i32)> {
    let mut at = 2;

    while at + 1 < bytes.len() {
        if bytes[at] != 0xFF {
            return None;
        }
        let marker = bytes[at + 1];
        match marker {
            // Fill byte
            0xFF => {
                at += 1;
                continue;
            }
            // Standalone markers carry no length
            0x01 | 0xD0..=0xD9 => {
                at += 2;
                continue;
            }
            // Start of frame, excluding DHT (C4), JPG (C8) and DAC (CC)
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                let height = be_u16(bytes, at + 5)?;
                let width = be_u16(bytes, at + 7)?;
                return to_dims(u32::from(width), u32::from(height));
            }
            _ => {
                let length = be_u16(bytes, at + 2)? as usize;
                if length < 2 {
                    return None;
                }
                at += 2 + length;
            }
        }
    }

    None
}

fn webp_dimensions(bytes: &[u8]) -> Option<(i32, i32)> {
    match bytes.get(12..16)? {
        b"VP8 " => {
            let width = le_u16(bytes, 26)? & 0x3FFF;
            let height = le_u16(bytes, 28)? & 0x3FFF;
            to_dims(u32::from(width), u32::from(height))
        }
        b"VP8L" => {
            let b = bytes.get(21..25)?;
            let width = 1 + ((u32::from(b[1] & 0x3F) << 8) | u32::from(b[0]));
            let height = 1
                + ((u32::from(b[3] & 0x0F) << 10)
                    | (u32::from(b[2]) << 2)
                    | (u32::from(b[1] & 0xC0) >> 6));
            to_dims(width, height)
        }
        b"VP8X" => to_dims(1 + le_u24(bytes, 24)?, 1 + le_u24(bytes, 27)?),
        _ => None,
    }
}
