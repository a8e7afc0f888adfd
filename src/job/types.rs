//! Job types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{JobError, Result};

/// Mime type of every packed result, single PDF or ZIP of PDFs
pub const BINARY_MIME_TYPE: &str = "application/pdf";

// ============================================================================
// Request ID
// ============================================================================

/// Correlation id of one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Mint a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for RequestId {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| JobError::InvalidRequest(format!("malformed request id '{}'", s)))
    }
}

impl From<Uuid> for RequestId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// Archive (input)
// ============================================================================

/// Raw upload as received at the boundary
#[derive(Debug, Clone, Default)]
pub struct ArchiveFields {
    /// Form field name the upload arrived under
    pub logical_name: String,
    /// File name given by the client
    pub original_name: String,
    pub mime_type: String,
    /// Size announced by the client, checked against the payload when present
    pub declared_size: Option<u64>,
    pub bytes: Vec<u8>,
}

/// Validated input archive
#[derive(Debug, Clone)]
pub struct Archive {
    logical_name: String,
    original_name: String,
    mime_type: String,
    size: u64,
    bytes: Vec<u8>,
}

impl Archive {
    pub fn new(fields: ArchiveFields) -> Result<Self> {
        for (value, field) in [
            (&fields.logical_name, "logical name"),
            (&fields.original_name, "original name"),
            (&fields.mime_type, "mime type"),
        ] {
            if value.trim().is_empty() {
                return Err(JobError::InvalidRequest(format!("archive {} is empty", field)));
            }
        }

        if fields.bytes.is_empty() {
            return Err(JobError::InvalidRequest("archive is empty".to_string()));
        }

        let size = fields.bytes.len() as u64;
        if let Some(declared) = fields.declared_size {
            if declared != size {
                return Err(JobError::InvalidRequest(format!(
                    "archive size mismatch: declared {} bytes, received {}",
                    declared, size
                )));
            }
        }

        Ok(Self {
            logical_name: fields.logical_name,
            original_name: fields.original_name,
            mime_type: fields.mime_type,
            size,
            bytes: fields.bytes,
        })
    }

    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

// ============================================================================
// Binary (output)
// ============================================================================

/// Packaged job result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    mime_type: String,
    name: String,
    payload: Vec<u8>,
}

impl Binary {
    /// Returns `None` when any field is empty
    pub fn new(
        mime_type: impl Into<String>,
        name: impl Into<String>,
        payload: Vec<u8>,
    ) -> Option<Self> {
        let mime_type = mime_type.into();
        let name = name.into();

        if mime_type.is_empty() || name.is_empty() || payload.is_empty() {
            return None;
        }

        Some(Self {
            mime_type,
            name,
            payload,
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

// ============================================================================
// Request / Response
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct GeneratePdfRequest {
    /// Client supplied correlation id; a fresh one is minted when absent
    pub request_id: Option<String>,
    pub archive: ArchiveFields,
}

#[derive(Debug)]
pub struct GeneratePdfResponse {
    /// Always set, even when the supplied id was rejected
    pub request_id: RequestId,
    pub outcome: Result<Binary>,
}
