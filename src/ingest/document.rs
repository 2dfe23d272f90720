// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Documents: PDF reports and plain-text notes

use base64::{engine::general_purpose, Engine as _};
use tracing::debug;

use super::{utf8_text, ContentEncoding, Encoded};

pub const MEDIA_TYPES: &[&str] = &["application/pdf", "text/plain", "text/markdown"];

/// Encode a document; PDFs are checked and sent as base64
pub fn encode(media_type: &str, bytes: Vec<u8>) -> Result<Encoded, String> {
    if media_type != "application/pdf" {
        return Ok(Encoded {
            encoding: ContentEncoding::Text,
            content: utf8_text(bytes)?,
            media_type: media_type.to_string(),
        });
    }

    let doc = lopdf::Document::load_mem(&bytes)
        .map_err(|e| format!("failed to load PDF: {}", e))?;
    debug!("PDF with {} pages", doc.get_pages().len());

    Ok(Encoded {
        encoding: ContentEncoding::Base64,
        content: general_purpose::STANDARD.encode(&bytes),
        media_type: media_type.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_kept_as_text() {
        let encoded = encode("text/markdown", b"# Ward 4\nflooding".to_vec()).unwrap();
        assert_eq!(encoded.encoding, ContentEncoding::Text);
        assert_eq!(encoded.content, "# Ward 4\nflooding");
    }

    #[test]
    fn test_broken_pdf_rejected() {
        let err = encode("application/pdf", b"%PDF-1.4 truncated".to_vec()).unwrap_err();
        assert!(err.starts_with("failed to load PDF"));
    }
}
