// src/news.rs

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use futures::stream::TryStreamExt;
use log::{error, info};
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::{require_auth, AuthUser};

#[derive(Debug, Serialize, Deserialize)]
pub struct News {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Blob-store ids; deleting a blob does not cascade here.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(rename = "createdAt")]
    pub created_at: BsonDateTime,
    #[serde(rename = "updatedAt")]
    pub updated_at: BsonDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CreateNewsRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub published: Option<bool>,
    pub featured: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNewsRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub published: Option<bool>,
    pub featured: Option<bool>,
}

pub fn validate_create(payload: &CreateNewsRequest) -> Vec<String> {
    let mut details = Vec::new();
    if payload.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
        details.push("title wajib diisi".to_string());
    }
    if payload
        .content
        .as_deref()
        .map_or(true, |c| c.trim().is_empty())
    {
        details.push("content wajib diisi".to_string());
    }
    details
}

fn parse_object_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

/// GET /api/news: drafts stay hidden from unauthenticated visitors.
pub async fn list_news(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let filter = if req.extensions().get::<AuthUser>().is_some() {
        doc! {}
    } else {
        doc! { "published": true }
    };

    let collection = data.mongodb.db.collection::<News>("news");
    let cursor = match collection.find(filter).sort(doc! { "createdAt": -1 }).await {
        Ok(cursor) => cursor,
        Err(e) => {
            error!("Error fetching news: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({ "error": "Gagal mengambil berita" }));
        }
    };
    match cursor.try_collect::<Vec<News>>().await {
        Ok(items) => HttpResponse::Ok().json(items),
        Err(e) => {
            error!("Error reading news cursor: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal mengambil berita" }))
        }
    }
}

/// GET /api/news/{id}
pub async fn get_news(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let oid = match parse_object_id(&path.into_inner()) {
        Some(oid) => oid,
        None => {
            return HttpResponse::BadRequest().json(json!({ "error": "ID berita tidak valid" }))
        }
    };
    let collection = data.mongodb.db.collection::<News>("news");
    match collection.find_one(doc! { "_id": oid }).await {
        Ok(Some(news)) => HttpResponse::Ok().json(news),
        Ok(None) => HttpResponse::NotFound().json(json!({ "error": "Berita tidak ditemukan" })),
        Err(e) => {
            error!("Error fetching news item: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal mengambil berita" }))
        }
    }
}

/// POST /api/news
pub async fn create_news(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<CreateNewsRequest>,
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
    let news = News {
        id: None,
        title: payload.title.clone().unwrap_or_default().trim().to_string(),
        content: payload.content.clone().unwrap_or_default().trim().to_string(),
        tags: payload.tags.clone().unwrap_or_default(),
        images: payload.images.clone().unwrap_or_default(),
        published: payload.published.unwrap_or(false),
        featured: payload.featured.unwrap_or(false),
        created_at: now,
        updated_at: now,
    };

    let collection = data.mongodb.db.collection::<News>("news");
    match collection.insert_one(&news).await {
        Ok(result) => {
            info!("News created: {}", news.title);
            HttpResponse::Created().json(json!({ "id": result.inserted_id, "title": news.title }))
        }
        Err(e) => {
            error!("Error inserting news: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal menyimpan berita" }))
        }
    }
}

/// PUT /api/news/{id}: partial field replacement.
pub async fn update_news(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UpdateNewsRequest>,
) -> impl Responder {
    if let Err(resp) = require_auth(&req) {
        return resp;
    }
    let oid = match parse_object_id(&path.into_inner()) {
        Some(oid) => oid,
        None => {
            return HttpResponse::BadRequest().json(json!({ "error": "ID berita tidak valid" }))
        }
    };

    let mut update_doc = doc! {};
    if let Some(title) = &payload.title {
        if title.trim().is_empty() {
            return HttpResponse::BadRequest().json(json!({ "error": "title tidak boleh kosong" }));
        }
        update_doc.insert("title", title.trim());
    }
    if let Some(content) = &payload.content {
        if content.trim().is_empty() {
            return HttpResponse::BadRequest()
                .json(json!({ "error": "content tidak boleh kosong" }));
        }
        update_doc.insert("content", content.trim());
    }
    if let Some(tags) = &payload.tags {
        update_doc.insert("tags", tags.clone());
    }
    if let Some(images) = &payload.images {
        update_doc.insert("images", images.clone());
    }
    if let Some(published) = payload.published {
        update_doc.insert("published", published);
    }
    if let Some(featured) = payload.featured {
        update_doc.insert("featured", featured);
    }
    if update_doc.is_empty() {
        return HttpResponse::BadRequest().json(json!({ "error": "Tidak ada field untuk diubah" }));
    }
    update_doc.insert("updatedAt", BsonDateTime::now());

    let collection = data.mongodb.db.collection::<News>("news");
    match collection
        .update_one(doc! { "_id": oid }, doc! { "$set": update_doc })
        .await
    {
        Ok(result) if result.matched_count == 0 => {
            HttpResponse::NotFound().json(json!({ "error": "Berita tidak ditemukan" }))
        }
        Ok(_) => HttpResponse::Ok().json(json!({ "message": "Berita berhasil diperbarui" })),
        Err(e) => {
            error!("Error updating news: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal memperbarui berita" }))
        }
    }
}

/// DELETE /api/news/{id}
pub async fn delete_news(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    if let Err(resp) = require_auth(&req) {
        return resp;
    }
    let oid = match parse_object_id(&path.into_inner()) {
        Some(oid) => oid,
        None => {
            return HttpResponse::BadRequest().json(json!({ "error": "ID berita tidak valid" }))
        }
    };
    let collection = data.mongodb.db.collection::<News>("news");
    match collection.delete_one(doc! { "_id": oid }).await {
        Ok(result) if result.deleted_count == 0 => {
            HttpResponse::NotFound().json(json!({ "error": "Berita tidak ditemukan" }))
        }
        Ok(_) => HttpResponse::Ok().json(json!({ "message": "Berita berhasil dihapus" })),
        Err(e) => {
            error!("Error deleting news: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal menghapus berita" }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_title_and_content() {
        let payload = CreateNewsRequest {
            title: None,
            content: Some("   ".to_string()),
            tags: None,
            images: None,
            published: None,
            featured: None,
        };
        let details = validate_create(&payload);
        assert_eq!(details.len(), 2);
        assert!(details.iter().any(|d| d.contains("title")));
        assert!(details.iter().any(|d| d.contains("content")));
    }

    #[test]
    fn create_accepts_complete_payload() {
        let payload = CreateNewsRequest {
            title: Some("Kegiatan Posyandu".to_string()),
            content: Some("Posyandu bulanan berjalan lancar.".to_string()),
            tags: None,
            images: None,
            published: Some(true),
            featured: None,
        };
        assert!(validate_create(&payload).is_empty());
    }
}
