
use std::path::Path;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::Html;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::service::{ChatReply, RagService};

/// Multipart field carrying the uploaded document
pub const UPLOAD_FIELD: &str = "file";

static INDEX_HTML: &str = include_str!("../../../static/index.html");

#[derive(Debug, Default, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

/// Body of every `/upload` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResponse {
    fn saved(filename: String) -> Self {
        Self {
            ok: true,
            filename: Some(filename),
            error: None,
        }
    }

    fn rejected(error: &str) -> Self {
        Self {
            ok: false,
            filename: None,
            error: Some(error.to_string()),
        }
    }

    fn failed(filename: String, error: String) -> Self {
        Self {
            ok: false,
            filename: Some(filename),
            error: Some(error),
        }
    }
}

#[inline]
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[inline]
pub async fn health() -> &'static str {
    "OK"
}

/// POST /chat. Bodies that are not a JSON object with a string `message` count as empty.
#[inline]
pub async fn chat(State(service): State<Arc<RagService>>, body: Bytes) -> Json<ChatReply> {
    let request = serde_json::from_slice::<ChatRequest>(&body).unwrap_or_else(|e| {
        debug!("Unreadable chat body, treating as empty: {}", e);
        ChatRequest::default()
    });

    Json(service.chat(&request.message).await)
}

/// POST /upload. Saves the `file` field into the uploads directory and re-indexes.
#[inline]
pub async fn upload(
    State(service): State<Arc<RagService>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<UploadResponse> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!("Upload is not a multipart request: {}", rejection);
            return Json(UploadResponse::rejected("No file part"));
        }
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Json(UploadResponse::rejected("No file part")),
            Err(e) => {
                warn!("Malformed upload: {}", e);
                return Json(UploadResponse::rejected(&format!(
                    "Failed to read upload: {}",
                    e
                )));
            }
        };

        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        // A plain form value under the same name is not a file part
        let Some(raw_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if raw_name.is_empty() {
            return Json(UploadResponse::rejected("No selected file"));
        }

        let Some(filename) = sanitize_file_name(&raw_name) else {
            return Json(UploadResponse::failed(
                raw_name,
                "Invalid file name".to_string(),
            ));
        };

        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to read upload {}: {}", filename, e);
                return Json(UploadResponse::failed(
                    filename,
                    format!("Failed to read upload: {}", e),
                ));
            }
        };

        return Json(store_and_reindex(&service, filename, &data).await);
    }
}

async fn store_and_reindex(service: &RagService, filename: String, data: &[u8]) -> UploadResponse {
    let uploads_dir = service.config().uploads_dir();

    if let Err(e) = save_upload(&uploads_dir, &filename, data).await {
        error!("Failed to save upload {}: {}", filename, e);
        return UploadResponse::failed(filename, format!("Failed to save file: {}", e));
    }
    info!("Saved upload {} ({} bytes)", filename, data.len());

    match service.rebuild().await {
        Ok(report) => {
            info!(
                "Re-indexed after upload: {} documents, {} chunks",
                report.documents, report.chunks
            );
            UploadResponse::saved(filename)
        }
        Err(e) => UploadResponse::failed(filename, format!("Indexing failed: {:#}", e)),
    }
}

/// Write to a temporary file next to the destination, then rename over it
async fn save_upload(uploads_dir: &Path, filename: &str, data: &[u8]) -> std::io::Result<()> {
    fs::create_dir_all(uploads_dir).await?;

    let destination = uploads_dir.join(filename);
    let temporary = uploads_dir.join(format!(".upload-{}.tmp", Uuid::new_v4()));

    fs::write(&temporary, data).await?;
    if let Err(e) = fs::rename(&temporary, &destination).await {
        let _ = fs::remove_file(&temporary).await;
        return Err(e);
    }
    Ok(())
}

/// Reduce a client-supplied name to a bare file name. Returns `None` when nothing usable remains.
#[inline]
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." || name.contains('\0') {
        return None;
    }
    Some(name.to_string())
}
