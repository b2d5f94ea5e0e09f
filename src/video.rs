// src/video.rs

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::NaiveDate;
use futures::stream::TryStreamExt;
use log::{error, info};
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::OnceLock;

use crate::app_state::AppState;
use crate::auth::require_auth;

pub const YOUTUBE_URL_ERROR: &str =
    "URL YouTube tidak valid. Gunakan format embed: https://www.youtube.com/embed/VIDEO_ID";

fn embed_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https://www\.youtube\.com/embed/[A-Za-z0-9_-]+(\?[^\s]*)?$")
            .expect("embed URL regex is valid")
    })
}

pub fn is_valid_embed_url(url: &str) -> bool {
    embed_url_regex().is_match(url)
}

pub fn is_valid_date(date: &str) -> bool {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Video {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Field name kept as the public site expects it.
    #[serde(rename = "titleVidio")]
    pub title_vidio: String,
    /// `YYYY-MM-DD`, strict.
    pub date: String,
    #[serde(rename = "youtubeUrl")]
    pub youtube_url: String,
    #[serde(rename = "createdAt")]
    pub created_at: BsonDateTime,
    #[serde(rename = "updatedAt")]
    pub updated_at: BsonDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CreateVideoRequest {
    #[serde(rename = "titleVidio")]
    pub title_vidio: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "youtubeUrl")]
    pub youtube_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVideoRequest {
    #[serde(rename = "titleVidio")]
    pub title_vidio: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "youtubeUrl")]
    pub youtube_url: Option<String>,
}

pub fn validate_create(payload: &CreateVideoRequest) -> Vec<String> {
    let mut details = Vec::new();
    if payload
        .title_vidio
        .as_deref()
        .map_or(true, |v| v.trim().is_empty())
    {
        details.push("titleVidio wajib diisi".to_string());
    }
    match payload.date.as_deref() {
        None => details.push("date wajib diisi".to_string()),
        Some(date) if !is_valid_date(date.trim()) => {
            details.push("date harus berformat YYYY-MM-DD".to_string());
        }
        Some(_) => {}
    }
    match payload.youtube_url.as_deref() {
        None => details.push("youtubeUrl wajib diisi".to_string()),
        Some(url) if !is_valid_embed_url(url.trim()) => {
            details.push(YOUTUBE_URL_ERROR.to_string());
        }
        Some(_) => {}
    }
    details
}

/// GET /api/videos
pub async fn list_videos(data: web::Data<AppState>) -> impl Responder {
    let collection = data.mongodb.db.collection::<Video>("videos");
    let result = match collection.find(doc! {}).sort(doc! { "date": -1 }).await {
        Ok(cursor) => cursor.try_collect::<Vec<Video>>().await,
        Err(e) => Err(e),
    };
    match result {
        Ok(videos) => HttpResponse::Ok().json(videos),
        Err(e) => {
            error!("Error fetching videos: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal mengambil video" }))
        }
    }
}

/// GET /api/videos/{id}
pub async fn get_video(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let oid = match ObjectId::parse_str(path.as_str()) {
        Ok(oid) => oid,
        Err(_) => return HttpResponse::BadRequest().json(json!({ "error": "ID video tidak valid" })),
    };
    let collection = data.mongodb.db.collection::<Video>("videos");
    match collection.find_one(doc! { "_id": oid }).await {
        Ok(Some(video)) => HttpResponse::Ok().json(video),
        Ok(None) => HttpResponse::NotFound().json(json!({ "error": "Video tidak ditemukan" })),
        Err(e) => {
            error!("Error fetching video: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal mengambil video" }))
        }
    }
}

/// POST /api/videos: URL pattern and date format enforced at write time.
pub async fn create_video(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<CreateVideoRequest>,
) -> impl Responder {
    if let Err(resp) = require_auth(&req) {
        return resp;
    }
    let details = validate_create(&payload);
    if !details.is_empty() {
        return HttpResponse::BadRequest()
            .json(json!({ "error": "Validasi gagal", "details": details }));
    }

    let now = BsonDateTime::now();
    let video = Video {
        id: None,
        title_vidio: payload.title_vidio.clone().unwrap_or_default().trim().to_string(),
        date: payload.date.clone().unwrap_or_default().trim().to_string(),
        youtube_url: payload.youtube_url.clone().unwrap_or_default().trim().to_string(),
        created_at: now,
        updated_at: now,
    };

    let collection = data.mongodb.db.collection::<Video>("videos");
    match collection.insert_one(&video).await {
        Ok(result) => {
            info!("Video created: {}", video.title_vidio);
            HttpResponse::Created()
                .json(json!({ "id": result.inserted_id, "titleVidio": video.title_vidio }))
        }
        Err(e) => {
            error!("Error inserting video: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal menyimpan video" }))
        }
    }
}

/// PUT /api/videos/{id}
pub async fn update_video(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UpdateVideoRequest>,
) -> impl Responder {
    if let Err(resp) = require_auth(&req) {
        return resp;
    }
    let oid = match ObjectId::parse_str(path.as_str()) {
        Ok(oid) => oid,
        Err(_) => return HttpResponse::BadRequest().json(json!({ "error": "ID video tidak valid" })),
    };

    let mut update_doc = doc! {};
    if let Some(title) = &payload.title_vidio {
        if title.trim().is_empty() {
            return HttpResponse::BadRequest()
                .json(json!({ "error": "titleVidio tidak boleh kosong" }));
        }
        update_doc.insert("titleVidio", title.trim());
    }
    if let Some(date) = &payload.date {
        if !is_valid_date(date.trim()) {
            return HttpResponse::BadRequest()
                .json(json!({ "error": "date harus berformat YYYY-MM-DD" }));
        }
        update_doc.insert("date", date.trim());
    }
    if let Some(url) = &payload.youtube_url {
        if !is_valid_embed_url(url.trim()) {
            return HttpResponse::BadRequest().json(json!({ "error": YOUTUBE_URL_ERROR }));
        }
        update_doc.insert("youtubeUrl", url.trim());
    }
    if update_doc.is_empty() {
        return HttpResponse::BadRequest().json(json!({ "error": "Tidak ada field untuk diubah" }));
    }
    update_doc.insert("updatedAt", BsonDateTime::now());

    let collection = data.mongodb.db.collection::<Video>("videos");
    match collection
        .update_one(doc! { "_id": oid }, doc! { "$set": update_doc })
        .await
    {
        Ok(result) if result.matched_count == 0 => {
            HttpResponse::NotFound().json(json!({ "error": "Video tidak ditemukan" }))
        }
        Ok(_) => HttpResponse::Ok().json(json!({ "message": "Video berhasil diperbarui" })),
        Err(e) => {
            error!("Error updating video: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal memperbarui video" }))
        }
    }
}

/// DELETE /api/videos/{id}
pub async fn delete_video(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    if let Err(resp) = require_auth(&req) {
        return resp;
    }
    let oid = match ObjectId::parse_str(path.as_str()) {
        Ok(oid) => oid,
        Err(_) => return HttpResponse::BadRequest().json(json!({ "error": "ID video tidak valid" })),
    };
    let collection = data.mongodb.db.collection::<Video>("videos");
    match collection.delete_one(doc! { "_id": oid }).await {
        Ok(result) if result.deleted_count == 0 => {
            HttpResponse::NotFound().json(json!({ "error": "Video tidak ditemukan" }))
        }
        Ok(_) => HttpResponse::Ok().json(json!({ "message": "Video berhasil dihapus" })),
        Err(e) => {
            error!("Error deleting video: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal menghapus video" }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_url_accepted() {
        assert!(is_valid_embed_url(
            "https://www.youtube.com/embed/dQw4w9WgXcQ"
        ));
        assert!(is_valid_embed_url(
            "https://www.youtube.com/embed/dQw4w9WgXcQ?start=30"
        ));
    }

    #[test]
    fn non_embed_urls_rejected() {
        assert!(!is_valid_embed_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(!is_valid_embed_url(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        ));
        assert!(!is_valid_embed_url(
            "http://www.youtube.com/embed/dQw4w9WgXcQ"
        ));
        assert!(!is_valid_embed_url(""));
    }

    #[test]
    fn date_must_be_iso() {
        assert!(is_valid_date("2024-01-15"));
        assert!(!is_valid_date("15-01-2024"));
        assert!(!is_valid_date("2024-13-01"));
    }

    #[test]
    fn create_validation_flags_watch_url() {
        let payload = CreateVideoRequest {
            title_vidio: Some("Profil RPTRA".to_string()),
            date: Some("2024-01-15".to_string()),
            youtube_url: Some("https://youtu.be/dQw4w9WgXcQ".to_string()),
        };
        let details = validate_create(&payload);
        assert_eq!(details, vec![YOUTUBE_URL_ERROR.to_string()]);
    }

    #[test]
    fn create_validation_passes_embed_url() {
        let payload = CreateVideoRequest {
            title_vidio: Some("Profil RPTRA".to_string()),
            date: Some("2024-01-15".to_string()),
            youtube_url: Some("https://www.youtube.com/embed/dQw4w9WgXcQ".to_string()),
        };
        assert!(validate_create(&payload).is_empty());
    }
}
