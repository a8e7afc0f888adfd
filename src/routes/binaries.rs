//! Binary generation routes
//!
//! `POST /binaries` takes a multipart upload whose `file` part is a ZIP of
//! DITA sources and answers with the rendered PDF (or a ZIP of PDFs).

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::job::{ArchiveFields, Binary, GeneratePdfRequest, JobError, RequestId};
use crate::state::AppState;

/// Name of the multipart part carrying the archive
pub const FILE_PART: &str = "file";

const DEFAULT_ARCHIVE_MIME: &str = "application/zip";
const DEFAULT_REQUEST_ID_HEADER: &str = "x-request-id";

// ============================================================================
// Error Response
// ============================================================================

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

impl IntoResponse for JobError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(code = self.code(), "Job error: {}", self);
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        });

        (status, body).into_response()
    }
}

fn upload_error(e: MultipartError) -> Response {
    tracing::warn!("Failed to read multipart upload: {}", e);

    let body = Json(ErrorResponse {
        error: format!("Failed to read upload: {}", e.body_text()),
        code: "INVALID_UPLOAD".to_string(),
    });

    (e.status(), body).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /binaries
pub async fn create_binary(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let header_name = request_id_header(&state);
    let supplied_id = headers
        .get(&header_name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

    let (request_id, response) = match read_upload(multipart).await {
        Ok(Some(archive)) => {
            // Cancel the job when the client goes away
            let cancel = CancellationToken::new();
            let _guard = cancel.clone().drop_guard();

            let response = state
                .generator()
                .handle(
                    GeneratePdfRequest {
                        request_id: supplied_id,
                        archive,
                    },
                    cancel,
                )
                .await;

            let body = match response.outcome {
                Ok(binary) => binary_response(binary),
                Err(e) => e.into_response(),
            };
            (response.request_id, body)
        }
        Ok(None) => (
            fallback_id(supplied_id.as_deref()),
            JobError::InvalidRequest(format!("missing '{}' part", FILE_PART)).into_response(),
        ),
        Err(e) => (fallback_id(supplied_id.as_deref()), upload_error(e)),
    };

    with_request_id(response, header_name, request_id)
}

/// Read the first `file` part; other parts are skipped
async fn read_upload(mut multipart: Multipart) -> Result<Option<ArchiveFields>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        if name != FILE_PART {
            tracing::debug!(field = %name, "Skipping multipart field");
            continue;
        }

        let original_name = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("{}.zip", name));

        let mime_type = field
            .content_type()
            .map(str::to_string)
            .filter(|m| !m.trim().is_empty())
            .or_else(|| {
                mime_guess::from_path(&original_name)
                    .first()
                    .map(|m| m.essence_str().to_string())
            })
            .unwrap_or_else(|| DEFAULT_ARCHIVE_MIME.to_string());

        let bytes = field.bytes().await?;

        return Ok(Some(ArchiveFields {
            logical_name: name,
            original_name,
            mime_type,
            declared_size: None,
            bytes: bytes.to_vec(),
        }));
    }

    Ok(None)
}

fn binary_response(binary: Binary) -> Response {
    let mut headers = HeaderMap::new();

    if let Ok(value) = HeaderValue::from_str(binary.mime_type()) {
        headers.insert(header::CONTENT_TYPE, value);
    }

    let filename = binary.name().replace(['"', '\\'], "_");
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    (StatusCode::OK, headers, binary.into_payload()).into_response()
}

fn request_id_header(state: &AppState) -> HeaderName {
    HeaderName::from_bytes(state.config().server.request_id_header.as_bytes())
        .unwrap_or_else(|_| HeaderName::from_static(DEFAULT_REQUEST_ID_HEADER))
}

/// Id reported when the upload never reached the job entry point
fn fallback_id(supplied: Option<&str>) -> RequestId {
    supplied
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default()
}

fn with_request_id(mut response: Response, name: HeaderName, id: RequestId) -> Response {
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(name, value);
    }
    response
}
