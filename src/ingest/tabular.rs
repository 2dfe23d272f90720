// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Tabular datasets: CSV/TSV text and binary spreadsheets

use std::io::Cursor;
use tracing::debug;

use super::{utf8_text, ContentEncoding, Encoded};

pub const MEDIA_TYPES: &[&str] = &[
    "text/csv",
    "text/tab-separated-values",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "application/vnd.oasis.opendocument.spreadsheet",
];

/// Encode a tabular dataset as text
///
/// Binary spreadsheets are flattened to tab-separated text so the model
/// reads them the same way it reads CSV.
pub fn encode(media_type: &str, bytes: Vec<u8>, max_rows: usize) -> Result<Encoded, String> {
    match media_type {
        "text/csv" | "text/tab-separated-values" => Ok(Encoded {
            encoding: ContentEncoding::Text,
            content: utf8_text(bytes)?,
            media_type: media_type.to_string(),
        }),
        _ => Ok(Encoded {
            encoding: ContentEncoding::Text,
            content: flatten_spreadsheet(bytes, max_rows)?,
            media_type: "text/tab-separated-values".to_string(),
        }),
    }
}

/// Flatten the first sheet of a workbook to tab-separated rows
fn flatten_spreadsheet(bytes: Vec<u8>, max_rows: usize) -> Result<String, String> {
    use calamine::{open_workbook_auto_from_rs, Reader};

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| format!("failed to open spreadsheet: {}", e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let first = sheet_names
        .first()
        .ok_or_else(|| "spreadsheet has no sheets".to_string())?;

    let range = workbook
        .worksheet_range(first)
        .map_err(|e| format!("failed to read sheet {}: {}", first, e))?;

    let mut text = String::new();
    for (i, row) in range.rows().enumerate() {
        if i >= max_rows {
            text.push_str("...\n");
            break;
        }
        let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        text.push_str(&cells.join("\t"));
        text.push('\n');
    }

    debug!("Flattened sheet {} of workbook with sheets {:?}", first, sheet_names);
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tsv_passthrough() {
        let encoded = encode("text/tab-separated-values", b"a\tb\n".to_vec(), 10).unwrap();
        assert_eq!(encoded.encoding, ContentEncoding::Text);
        assert_eq!(encoded.content, "a\tb\n");
    }

    #[test]
    fn test_corrupt_workbook_is_an_error() {
        let result = encode(
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            b"definitely not a zip".to_vec(),
            10,
        );
        assert!(result.is_err());
    }
}
