//! Upload parsing: PDF, CSV, plain text and markdown

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::types::DocumentType;

/// Extracted text of an upload
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub document_type: DocumentType,
    /// Full text content
    pub content: String,
    /// One flattened line per record, for tabular uploads. Each row becomes
    /// its own chunk instead of going through the text chunker.
    pub rows: Option<Vec<String>>,
    /// SHA-256 of the uploaded bytes
    pub content_hash: String,
}

/// Multi-format file parser
pub struct FileParser;

impl FileParser {
    /// Parse a file based on its extension
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let document_type = DocumentType::from_filename(filename).ok_or_else(|| {
            let extension = filename.rsplit_once('.').map_or("", |(_, ext)| ext);
            Error::UnsupportedFileType(format!(
                "'{}' (supported: pdf, csv, txt, md)",
                extension
            ))
        })?;

        if data.is_empty() {
            return Err(Error::file_parse(filename, "file is empty"));
        }

        let content_hash = hash_bytes(data);
        let (content, rows) = match document_type {
            DocumentType::Pdf => (Self::parse_pdf(filename, data)?, None),
            DocumentType::Csv => {
                let rows = Self::parse_csv(filename, data)?;
                (rows.join("\n"), Some(rows))
            }
            DocumentType::Text | DocumentType::Markdown => {
                (String::from_utf8_lossy(data).into_owned(), None)
            }
        };

        if content.trim().is_empty() {
            return Err(Error::file_parse(filename, "no text content found"));
        }

        tracing::debug!(
            "Parsed {} as {} ({} chars)",
            filename,
            document_type.as_str(),
            content.len()
        );

        Ok(ParsedDocument {
            document_type,
            content,
            rows,
            content_hash,
        })
    }

    fn parse_pdf(filename: &str, data: &[u8]) -> Result<String> {
        let text = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("PDF extraction failed: {}", e)))?;
        Ok(cleanup_pdf_text(&text))
    }

    /// Each record becomes `header: value, header: value`
    fn parse_csv(filename: &str, data: &[u8]) -> Result<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(data);

        let headers = reader
            .headers()
            .map_err(|e| Error::file_parse(filename, e.to_string()))?
            .clone();

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Skipping malformed row {} in {}: {}", line + 1, filename, e);
                    continue;
                }
            };

            let row = headers
                .iter()
                .zip(record.iter())
                .map(|(header, value)| format!("{}: {}", header, value))
                .collect::<Vec<_>>()
                .join(", ");
            if !row.is_empty() {
                rows.push(row);
            }
        }

        tracing::info!("Parsed CSV {} with {} rows", filename, rows.len());
        Ok(rows)
    }
}

/// Normalise typographic characters PDF fonts commonly emit
fn cleanup_pdf_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2010}' | '\u{2011}' | '\u{2013}' => result.push('-'),
            '\u{2014}' => result.push_str("--"),
            '\u{2018}' | '\u{2019}' => result.push('\''),
            '\u{201C}' | '\u{201D}' => result.push('"'),
            '\u{2022}' => result.push_str("* "),
            '\u{2026}' => result.push_str("..."),
            '\u{00A0}' => result.push(' '),
            '\u{FB00}' => result.push_str("ff"),
            '\u{FB01}' => result.push_str("fi"),
            '\u{FB02}' => result.push_str("fl"),
            '\u{FB03}' => result.push_str("ffi"),
            '\u{FB04}' => result.push_str("ffl"),
            other => result.push(other),
        }
    }
    collapse_whitespace(&result)
}

/// Squeeze runs of spaces and the blank lines PDF extraction leaves behind
fn collapse_whitespace(text: &str) -> String {
    static SPACES: OnceLock<Regex> = OnceLock::new();
    static BLANK_LINES: OnceLock<Regex> = OnceLock::new();

    let spaces = SPACES.get_or_init(|| Regex::new(r"[ \t]+").expect("Invalid regex"));
    let blank_lines = BLANK_LINES.get_or_init(|| Regex::new(r"\n\s*\n").expect("Invalid regex"));

    let text = spaces.replace_all(text, " ");
    blank_lines.replace_all(&text, "\n\n").trim().to_string()
}

fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
