// src/file_store.rs
//
// GridFS-backed blob store for uploaded images, plus the /api/files
// handlers. Entities reference blobs by the hex ObjectId string; deleting
// a blob never cascades into the documents that mention it.

use actix_multipart::Multipart;
use actix_web::{http::header, web, HttpRequest, HttpResponse, Responder};
use futures_util::io::{AsyncReadExt, AsyncWriteExt};
use futures_util::{Stream, StreamExt, TryStreamExt};
use log::{error, info, warn};
use mongodb::bson::{doc, oid::ObjectId, Bson};
use mongodb::gridfs::{GridFsBucket, GridFsDownloadStream};
use mongodb::Database;
use serde_json::json;
use thiserror::Error;

use crate::app_state::AppState;
use crate::auth::require_auth;

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DOWNLOAD_CHUNK_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum FileStoreError {
    /// The identifier is not a valid ObjectId. Routes map this to 400,
    /// as opposed to a well-formed id with no object behind it (404).
    #[error("malformed file id")]
    MalformedId,
    #[error(transparent)]
    Backend(#[from] mongodb::error::Error),
}

#[derive(Debug, Clone)]
pub struct StoredFileMeta {
    pub filename: String,
    pub content_type: String,
    pub length: u64,
}

#[derive(Clone)]
pub struct FileStore {
    bucket: GridFsBucket,
}

impl FileStore {
    pub fn new(db: &Database) -> Self {
        Self {
            bucket: db.gridfs_bucket(None),
        }
    }

    pub fn parse_id(id: &str) -> Result<ObjectId, FileStoreError> {
        ObjectId::parse_str(id).map_err(|_| FileStoreError::MalformedId)
    }

    /// Opens a streamed upload; the caller pipes chunks in and closes the
    /// stream. The object only becomes retrievable after a successful
    /// close, so no partial state is ever observable.
    pub async fn open_upload(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<mongodb::gridfs::GridFsUploadStream, FileStoreError> {
        let stream = self
            .bucket
            .open_upload_stream(filename)
            .metadata(doc! { "contentType": content_type })
            .await?;
        Ok(stream)
    }

    /// Metadata plus a readable byte stream, or `None` for a valid id
    /// with no object behind it.
    pub async fn retrieve(
        &self,
        id: &str,
    ) -> Result<Option<(StoredFileMeta, GridFsDownloadStream)>, FileStoreError> {
        let oid = Self::parse_id(id)?;
        let mut cursor = self.bucket.find(doc! { "_id": oid }).await?;
        let file = match cursor.try_next().await? {
            Some(file) => file,
            None => return Ok(None),
        };
        let meta = StoredFileMeta {
            filename: file.filename.clone().unwrap_or_else(|| "file".to_string()),
            content_type: file
                .metadata
                .as_ref()
                .and_then(|m| m.get_str("contentType").ok())
                .unwrap_or("application/octet-stream")
                .to_string(),
            length: file.length,
        };
        let stream = self.bucket.open_download_stream(Bson::ObjectId(oid)).await?;
        Ok(Some((meta, stream)))
    }

    /// Idempotent-safe delete: removing an id that no longer exists
    /// reports `false` instead of failing.
    pub async fn remove(&self, id: &str) -> Result<bool, FileStoreError> {
        let oid = Self::parse_id(id)?;
        match self.bucket.delete(Bson::ObjectId(oid)).await {
            Ok(()) => Ok(true),
            Err(e) if is_file_not_found(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn is_file_not_found(e: &mongodb::error::Error) -> bool {
    matches!(
        *e.kind,
        mongodb::error::ErrorKind::GridFs(mongodb::error::GridFsErrorKind::FileNotFound { .. })
    )
}

fn download_body(
    stream: GridFsDownloadStream,
) -> impl Stream<Item = Result<web::Bytes, std::io::Error>> {
    futures_util::stream::try_unfold(stream, |mut stream| async move {
        let mut buf = vec![0u8; DOWNLOAD_CHUNK_BYTES];
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            Ok(None)
        } else {
            buf.truncate(n);
            Ok(Some((web::Bytes::from(buf), stream)))
        }
    })
}

/// POST /api/files: multipart upload, piped chunk by chunk into GridFS.
pub async fn upload_file(
    req: HttpRequest,
    data: web::Data<AppState>,
    mut payload: Multipart,
) -> impl Responder {
    if let Err(resp) = require_auth(&req) {
        return resp;
    }

    while let Some(field_result) = payload.next().await {
        let mut field = match field_result {
            Ok(field) => field,
            Err(e) => {
                warn!("Failed to read multipart field: {}", e);
                return HttpResponse::BadRequest()
                    .json(json!({ "error": "Data multipart tidak valid" }));
            }
        };

        let filename = match field.content_disposition().and_then(|cd| cd.get_filename()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let content_type = field
            .content_type()
            .map(|mime| mime.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        if !content_type.starts_with("image/") {
            return HttpResponse::BadRequest()
                .json(json!({ "error": "Hanya file gambar yang diizinkan" }));
        }

        let mut upload = match data.files.open_upload(&filename, &content_type).await {
            Ok(upload) => upload,
            Err(e) => {
                error!("Error opening upload stream: {}", e);
                return HttpResponse::InternalServerError()
                    .json(json!({ "error": "Gagal menyimpan file" }));
            }
        };
        let file_id = upload.id().as_object_id().map(|oid| oid.to_hex());

        let mut written: usize = 0;
        while let Some(chunk_result) = field.next().await {
            let chunk = match chunk_result {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!("Failed to read multipart chunk: {}", e);
                    let _ = upload.abort().await;
                    return HttpResponse::BadRequest()
                        .json(json!({ "error": "Upload terputus" }));
                }
            };
            written += chunk.len();
            if written > MAX_UPLOAD_BYTES {
                let _ = upload.abort().await;
                return HttpResponse::BadRequest()
                    .json(json!({ "error": "Ukuran file melebihi batas 10 MB" }));
            }
            if let Err(e) = upload.write_all(&chunk).await {
                error!("Error writing to GridFS: {}", e);
                let _ = upload.abort().await;
                return HttpResponse::InternalServerError()
                    .json(json!({ "error": "Gagal menyimpan file" }));
            }
        }

        if written == 0 {
            let _ = upload.abort().await;
            return HttpResponse::BadRequest().json(json!({ "error": "File kosong" }));
        }
        if let Err(e) = upload.close().await {
            error!("Error closing GridFS upload: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({ "error": "Gagal menyimpan file" }));
        }

        let id = file_id.unwrap_or_default();
        info!("Stored file {} ({}, {} bytes)", id, content_type, written);
        return HttpResponse::Created().json(json!({
            "id": id,
            "filename": filename,
            "contentType": content_type,
            "length": written,
        }));
    }

    HttpResponse::BadRequest().json(json!({ "error": "Tidak ada file pada permintaan" }))
}

/// GET /api/files/{id}: streams the blob with inline disposition and a
/// long-lived immutable cache header. Blob ids never get reused, so the
/// aggressive caching is safe.
pub async fn fetch_file(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = path.into_inner();
    match data.files.retrieve(&id).await {
        Ok(Some((meta, stream))) => HttpResponse::Ok()
            .content_type(meta.content_type.clone())
            .insert_header((
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", meta.filename),
            ))
            .insert_header((header::CACHE_CONTROL, "public, max-age=31536000, immutable"))
            .no_chunking(meta.length)
            .streaming(download_body(stream)),
        Ok(None) => HttpResponse::NotFound().json(json!({ "error": "File tidak ditemukan" })),
        Err(FileStoreError::MalformedId) => {
            HttpResponse::BadRequest().json(json!({ "error": "ID file tidak valid" }))
        }
        Err(FileStoreError::Backend(e)) => {
            error!("Error fetching file {}: {}", id, e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal mengambil file" }))
        }
    }
}

/// DELETE /api/files/{id}
pub async fn delete_file(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    if let Err(resp) = require_auth(&req) {
        return resp;
    }
    let id = path.into_inner();
    match data.files.remove(&id).await {
        Ok(true) => HttpResponse::Ok().json(json!({ "success": true })),
        Ok(false) => HttpResponse::NotFound().json(json!({ "error": "File tidak ditemukan" })),
        Err(FileStoreError::MalformedId) => {
            HttpResponse::BadRequest().json(json!({ "error": "ID file tidak valid" }))
        }
        Err(FileStoreError::Backend(e)) => {
            error!("Error deleting file {}: {}", id, e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal menghapus file" }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_valid_object_id() {
        let oid = ObjectId::new();
        assert_eq!(FileStore::parse_id(&oid.to_hex()).unwrap(), oid);
    }

    #[test]
    fn parse_id_rejects_malformed_input() {
        assert!(matches!(
            FileStore::parse_id("not-an-object-id"),
            Err(FileStoreError::MalformedId)
        ));
        assert!(matches!(
            FileStore::parse_id(""),
            Err(FileStoreError::MalformedId)
        ));
        // Right length, wrong alphabet.
        assert!(matches!(
            FileStore::parse_id("zzzzzzzzzzzzzzzzzzzzzzzz"),
            Err(FileStoreError::MalformedId)
        ));
    }
}
