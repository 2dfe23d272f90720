// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Images: site photos, maps, scanned plans

use base64::{engine::general_purpose, Engine as _};
use std::io::Cursor;
use tracing::debug;

use super::{ContentEncoding, Encoded};

/// Formats the image crate cannot probe but the reasoning service accepts
const PASSTHROUGH: &[&str] = &["image/heic", "image/heif"];

/// Probe the image header and base64-encode the bytes
pub fn encode(media_type: &str, bytes: Vec<u8>) -> Result<Encoded, String> {
    let media_type = match image::guess_format(&bytes) {
        Ok(format) => {
            let (width, height) = image::ImageReader::with_format(Cursor::new(&bytes), format)
                .into_dimensions()
                .map_err(|e| format!("unreadable image: {}", e))?;
            debug!("Image {}x{} ({:?})", width, height, format);
            format.to_mime_type().to_string()
        }
        Err(_) if PASSTHROUGH.contains(&media_type) => media_type.to_string(),
        Err(e) => return Err(format!("not a recognised image: {}", e)),
    };

    Ok(Encoded {
        encoding: ContentEncoding::Base64,
        content: general_purpose::STANDARD.encode(&bytes),
        media_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbImage::new(2, 3);
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_png_is_base64() {
        let bytes = tiny_png();
        let encoded = encode("image/png", bytes.clone()).unwrap();

        assert_eq!(encoded.encoding, ContentEncoding::Base64);
        assert_eq!(encoded.media_type, "image/png");
        assert_eq!(general_purpose::STANDARD.decode(&encoded.content).unwrap(), bytes);
    }

    #[test]
    fn test_sniffed_type_overrides_declared() {
        let encoded = encode("image/jpeg", tiny_png()).unwrap();
        assert_eq!(encoded.media_type, "image/png");
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(encode("image/png", b"hello".to_vec()).is_err());
    }

    #[test]
    fn test_heic_passes_through() {
        let encoded = encode("image/heic", vec![0, 0, 0, 24]).unwrap();
        assert_eq!(encoded.media_type, "image/heic");
    }
}
