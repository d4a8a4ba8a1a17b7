//! Artifact record types and classification.

use crate::error::VaultError;
use crate::types::{RecordID, SessionID};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Classification tag derived from MIME type and path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Classification {
    Code,
    Image,
    Document,
    Data,
    Other,
}

const CODE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "ts", "tsx", "jsx", "swift", "go", "java", "kt", "c", "h", "cpp", "hpp",
    "cs", "rb", "php", "sh", "sql", "html", "css", "scss",
];
const DOCUMENT_EXTENSIONS: &[&str] = &["md", "txt", "pdf", "doc", "docx", "rtf"];
const DATA_EXTENSIONS: &[&str] = &["json", "csv", "xml", "yaml", "yml", "toml"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "bmp"];

impl Classification {
    /// Every tag, in display order
    pub const ALL: [Classification; 5] = [
        Classification::Code,
        Classification::Image,
        Classification::Document,
        Classification::Data,
        Classification::Other,
    ];

    /// Classify from MIME type first, falling back to the path extension
    pub fn classify(mime_type: Option<&str>, path: Option<&str>) -> Self {
        mime_type
            .and_then(Self::from_mime)
            .or_else(|| path.and_then(Self::from_path))
            .unwrap_or(Classification::Other)
    }

    fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        let essence = mime.split(';').next().unwrap_or("").trim();
        if essence.starts_with("image/") {
            return Some(Classification::Image);
        }
        match essence {
            "application/javascript" | "application/typescript" | "application/x-sh" => {
                Some(Classification::Code)
            }
            m if m.starts_with("text/x-") => Some(Classification::Code),
            "application/pdf"
            | "text/markdown"
            | "text/plain"
            | "application/msword"
            | "application/rtf" => Some(Classification::Document),
            m if m.starts_with("application/vnd.openxmlformats-officedocument")
                || m.starts_with("application/vnd.oasis.opendocument") =>
            {
                Some(Classification::Document)
            }
            "application/json" | "text/csv" | "application/xml" | "text/xml"
            | "application/yaml" => Some(Classification::Data),
            _ => None,
        }
    }

    fn from_path(path: &str) -> Option<Self> {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();
        let ext = ext.as_str();
        if CODE_EXTENSIONS.contains(&ext) {
            Some(Classification::Code)
        } else if IMAGE_EXTENSIONS.contains(&ext) {
            Some(Classification::Image)
        } else if DOCUMENT_EXTENSIONS.contains(&ext) {
            Some(Classification::Document)
        } else if DATA_EXTENSIONS.contains(&ext) {
            Some(Classification::Data)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Code => "code",
            Classification::Image => "image",
            Classification::Document => "document",
            Classification::Data => "data",
            Classification::Other => "other",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "code" => Ok(Classification::Code),
            "image" => Ok(Classification::Image),
            "document" | "doc" => Ok(Classification::Document),
            "data" => Ok(Classification::Data),
            "other" => Ok(Classification::Other),
            other => Err(VaultError::ConfigError(format!(
                "Invalid classification: {}. Must be code, image, document, data, or other",
                other
            ))),
        }
    }
}

/// How a body string should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyEncoding {
    #[default]
    Text,
    /// Binary content stored as standard base64
    Base64,
}

/// Load status of a single record. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadStatus {
    Unfetched,
    HeaderDecrypted,
    BodyLoaded,
}

/// Decrypted header payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHeader {
    pub title: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub session_ids: Vec<SessionID>,
}

impl RecordHeader {
    /// Deserialize header plaintext. The title must be non-empty.
    pub fn parse(id: &str, plaintext: &[u8]) -> Result<Self, VaultError> {
        let header: RecordHeader =
            serde_json::from_slice(plaintext).map_err(|e| VaultError::InvalidHeaderData {
                id: id.to_string(),
                reason: e.to_string(),
            })?;
        if header.title.trim().is_empty() {
            return Err(VaultError::InvalidHeaderData {
                id: id.to_string(),
                reason: "empty title".to_string(),
            });
        }
        Ok(header)
    }
}

/// Version, ordering, and timestamp fields supplied alongside the envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub header_version: u64,
    pub body_version: u64,
    pub seq: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Decrypted artifact record.
///
/// The body is private so that `is_body_loaded` always agrees with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: RecordID,
    pub title: String,
    pub path: Option<String>,
    pub mime_type: Option<String>,
    pub language: Option<String>,
    pub session_ids: BTreeSet<SessionID>,
    body: Option<String>,
    pub body_encoding: BodyEncoding,
    pub classification: Classification,
    pub header_version: u64,
    pub body_version: u64,
    pub seq: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_decrypted: bool,
}

impl Record {
    /// Build a header-decrypted record with no body
    pub fn new(id: impl Into<RecordID>, header: RecordHeader, meta: RecordMeta) -> Self {
        let classification =
            Classification::classify(header.mime_type.as_deref(), header.path.as_deref());
        Self {
            id: id.into(),
            title: header.title,
            path: header.path,
            mime_type: header.mime_type,
            language: header.language,
            session_ids: header.session_ids.into_iter().collect(),
            body: None,
            body_encoding: BodyEncoding::Text,
            classification,
            header_version: meta.header_version,
            body_version: meta.body_version,
            seq: meta.seq,
            created_at: meta.created_at,
            updated_at: meta.updated_at,
            is_decrypted: true,
        }
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn is_body_loaded(&self) -> bool {
        self.body.as_ref().is_some_and(|b| !b.is_empty())
    }

    /// Attach body content. Empty content is rejected.
    pub fn set_body(&mut self, body: String, encoding: BodyEncoding) -> Result<(), VaultError> {
        if body.is_empty() {
            return Err(VaultError::NoBodyContent(self.id.clone()));
        }
        self.body = Some(body);
        self.body_encoding = encoding;
        Ok(())
    }

    pub fn load_status(&self) -> LoadStatus {
        if self.is_body_loaded() {
            LoadStatus::BodyLoaded
        } else if self.is_decrypted {
            LoadStatus::HeaderDecrypted
        } else {
            LoadStatus::Unfetched
        }
    }

    pub fn meta(&self) -> RecordMeta {
        RecordMeta {
            header_version: self.header_version,
            body_version: self.body_version,
            seq: self.seq,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn header(&self) -> RecordHeader {
        RecordHeader {
            title: self.title.clone(),
            path: self.path.clone(),
            mime_type: self.mime_type.clone(),
            language: self.language.clone(),
            session_ids: self.session_ids.iter().cloned().collect(),
        }
    }

    /// Approximate in-memory footprint, used for cache statistics
    pub fn approximate_size(&self) -> usize {
        self.id.len()
            + self.title.len()
            + self.path.as_ref().map_or(0, |p| p.len())
            + self.mime_type.as_ref().map_or(0, |m| m.len())
            + self.language.as_ref().map_or(0, |l| l.len())
            + self.session_ids.iter().map(|s| s.len()).sum::<usize>()
            + self.body.as_ref().map_or(0, |b| b.len())
    }
}

/// Interpret decrypted body bytes as text, or base64 when not UTF-8.
pub fn decode_body_plaintext(
    id: &str,
    plaintext: Vec<u8>,
) -> Result<(String, BodyEncoding), VaultError> {
    if plaintext.is_empty() {
        return Err(VaultError::NoBodyContent(id.to_string()));
    }
    match String::from_utf8(plaintext) {
        Ok(text) => Ok((text, BodyEncoding::Text)),
        Err(e) => Ok((STANDARD.encode(e.into_bytes()), BodyEncoding::Base64)),
    }
}
