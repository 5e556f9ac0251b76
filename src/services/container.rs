//! Structural walks over image containers.
//!
//! Each walk follows the container's own framing (PNG chunks, JPEG marker
//! segments, GIF blocks) from the signature to the end marker. Bytes after
//! the end marker are ignored. Running out of input first means the file
//! was truncated.

use image::ImageFormat;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Check that `bytes` reaches the end marker of `format`.
pub fn check_complete(format: ImageFormat, bytes: &[u8]) -> Result<(), String> {
    match format {
        ImageFormat::Png => walk_png(bytes),
        ImageFormat::Jpeg => walk_jpeg(bytes),
        ImageFormat::Gif => walk_gif(bytes),
        other => Err(format!("no structural check for {:?}", other)),
    }
}

fn byte_at(bytes: &[u8], pos: usize) -> Result<u8, String> {
    bytes
        .get(pos)
        .copied()
        .ok_or_else(|| format!("truncated at offset {}", pos))
}

fn walk_png(bytes: &[u8]) -> Result<(), String> {
    if !bytes.starts_with(&PNG_SIGNATURE) {
        return Err("missing PNG signature".into());
    }

    let mut pos = PNG_SIGNATURE.len();
    loop {
        let header = bytes
            .get(pos..pos + 8)
            .ok_or_else(|| format!("truncated chunk header at offset {}", pos))?;
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let kind = &header[4..8];

        // length + type + data + crc
        let end = pos
            .checked_add(12)
            .and_then(|p| p.checked_add(len))
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| {
                format!(
                    "chunk {} at offset {} runs past end of file",
                    String::from_utf8_lossy(kind),
                    pos
                )
            })?;

        if kind == b"IEND" {
            return Ok(());
        }
        pos = end;
    }
}

fn walk_jpeg(bytes: &[u8]) -> Result<(), String> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return Err("missing JPEG start-of-image marker".into());
    }

    let mut pos = 2;
    loop {
        if byte_at(bytes, pos)? != 0xFF {
            return Err(format!("expected marker at offset {}", pos));
        }
        // Fill bytes may precede a marker.
        while byte_at(bytes, pos)? == 0xFF {
            pos += 1;
        }
        let marker = byte_at(bytes, pos)?;
        pos += 1;

        match marker {
            0xD9 => return Ok(()),
            0x01 | 0xD0..=0xD7 => continue,
            _ => {
                let len =
                    u16::from_be_bytes([byte_at(bytes, pos)?, byte_at(bytes, pos + 1)?]) as usize;
                if len < 2 {
                    return Err(format!("bad segment length at offset {}", pos));
                }
                pos += len;
                if pos > bytes.len() {
                    return Err(format!("segment {:#04x} runs past end of file", marker));
                }

                if marker == 0xDA {
                    pos = skip_entropy_data(bytes, pos)?;
                }
            }
        }
    }
}

/// Advance past entropy-coded scan data to the next real marker. Stuffed
/// `FF 00` bytes and restart markers belong to the scan.
fn skip_entropy_data(bytes: &[u8], mut pos: usize) -> Result<usize, String> {
    loop {
        if byte_at(bytes, pos)? == 0xFF {
            match byte_at(bytes, pos + 1)? {
                0x00 | 0xD0..=0xD7 => pos += 2,
                _ => return Ok(pos),
            }
        } else {
            pos += 1;
        }
    }
}

fn walk_gif(bytes: &[u8]) -> Result<(), String> {
    if !(bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a")) {
        return Err("missing GIF signature".into());
    }

    let screen_flags = byte_at(bytes, 10)?;
    let mut pos = 13 + color_table_len(screen_flags);

    loop {
        match byte_at(bytes, pos)? {
            0x3B => return Ok(()),
            0x21 => {
                // introducer + label
                pos = skip_sub_blocks(bytes, pos + 2)?;
            }
            0x2C => {
                let image_flags = byte_at(bytes, pos + 9)?;
                // descriptor, local color table, LZW minimum code size
                pos += 10 + color_table_len(image_flags) + 1;
                pos = skip_sub_blocks(bytes, pos)?;
            }
            other => return Err(format!("unexpected GIF block {:#04x} at offset {}", other, pos)),
        }
    }
}

fn color_table_len(flags: u8) -> usize {
    if flags & 0x80 != 0 {
        3 * (1 << ((flags & 0x07) + 1))
    } else {
        0
    }
}

fn skip_sub_blocks(bytes: &[u8], mut pos: usize) -> Result<usize, String> {
    loop {
        let size = byte_at(bytes, pos)? as usize;
        pos += 1;
        if size == 0 {
            return Ok(pos);
        }
        pos += size;
    }
}
