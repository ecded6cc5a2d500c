//! Ingested document records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Csv,
    Text,
    Markdown,
}

impl DocumentType {
    /// Detect type from the filename extension
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = filename.rsplit_once('.')?.1.to_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "csv" => Some(Self::Csv),
            "txt" => Some(Self::Text),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Csv => "csv",
            Self::Text => "text",
            Self::Markdown => "markdown",
        }
    }
}

/// Registry entry for an ingested document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub document_id: Uuid,
    pub filename: String,
    pub document_type: DocumentType,
    pub chunks: usize,
    /// SHA-256 of the uploaded bytes
    pub content_hash: String,
    pub upload_date: DateTime<Utc>,
}

/// Response of `POST /api/v1/documents/upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUploadResponse {
    pub document_id: Uuid,
    pub filename: String,
    pub document_type: DocumentType,
    pub chunks: usize,
}

impl From<&DocumentInfo> for DocumentUploadResponse {
    fn from(info: &DocumentInfo) -> Self {
        Self {
            document_id: info.document_id,
            filename: info.filename.clone(),
            document_type: info.document_type,
            chunks: info.chunks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_from_filename() {
        assert_eq!(DocumentType::from_filename("Manual.PDF"), Some(DocumentType::Pdf));
        assert_eq!(DocumentType::from_filename("orders.csv"), Some(DocumentType::Csv));
        assert_eq!(DocumentType::from_filename("notes.md"), Some(DocumentType::Markdown));
        assert_eq!(DocumentType::from_filename("archive.zip"), None);
        assert_eq!(DocumentType::from_filename("README"), None);
    }
}
