// src/gallery.rs

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use futures::stream::TryStreamExt;
use log::{error, info};
use mongodb::bson::{doc, oid::ObjectId, to_bson, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::require_auth;
use crate::video::is_valid_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GalleryStatus {
    Draft,
    Published,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GalleryItem {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub category: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub status: GalleryStatus,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: BsonDateTime,
    #[serde(rename = "updatedAt")]
    pub updated_at: BsonDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CreateGalleryRequest {
    pub title: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub status: Option<GalleryStatus>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGalleryRequest {
    pub title: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub status: Option<GalleryStatus>,
    pub images: Option<Vec<String>>,
}

pub fn validate_create(payload: &CreateGalleryRequest) -> Vec<String> {
    let mut details = Vec::new();
    if payload.title.as_deref().map_or(true, |v| v.trim().is_empty()) {
        details.push("title wajib diisi".to_string());
    }
    if payload
        .category
        .as_deref()
        .map_or(true, |v| v.trim().is_empty())
    {
        details.push("category wajib diisi".to_string());
    }
    match payload.date.as_deref() {
        None => details.push("date wajib diisi".to_string()),
        Some(date) if !is_valid_date(date.trim()) => {
            details.push("date harus berformat YYYY-MM-DD".to_string());
        }
        Some(_) => {}
    }
    details
}

/// GET /api/gallery
pub async fn list_gallery(data: web::Data<AppState>) -> impl Responder {
    let collection = data.mongodb.db.collection::<GalleryItem>("gallery");
    let result = match collection.find(doc! {}).sort(doc! { "date": -1 }).await {
        Ok(cursor) => cursor.try_collect::<Vec<GalleryItem>>().await,
        Err(e) => Err(e),
    };
    match result {
        Ok(items) => HttpResponse::Ok().json(items),
        Err(e) => {
            error!("Error fetching gallery: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal mengambil galeri" }))
        }
    }
}

/// GET /api/gallery/{id}
pub async fn get_gallery_item(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let oid = match ObjectId::parse_str(path.as_str()) {
        Ok(oid) => oid,
        Err(_) => {
            return HttpResponse::BadRequest().json(json!({ "error": "ID galeri tidak valid" }))
        }
    };
    let collection = data.mongodb.db.collection::<GalleryItem>("gallery");
    match collection.find_one(doc! { "_id": oid }).await {
        Ok(Some(item)) => HttpResponse::Ok().json(item),
        Ok(None) => HttpResponse::NotFound().json(json!({ "error": "Galeri tidak ditemukan" })),
        Err(e) => {
            error!("Error fetching gallery item: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal mengambil galeri" }))
        }
    }
}

/// POST /api/gallery
pub async fn create_gallery_item(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<CreateGalleryRequest>,
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
    let item = GalleryItem {
        id: None,
        title: payload.title.clone().unwrap_or_default().trim().to_string(),
        category: payload.category.clone().unwrap_or_default().trim().to_string(),
        date: payload.date.clone().unwrap_or_default().trim().to_string(),
        status: payload.status.unwrap_or(GalleryStatus::Draft),
        images: payload.images.clone().unwrap_or_default(),
        created_at: now,
        updated_at: now,
    };

    let collection = data.mongodb.db.collection::<GalleryItem>("gallery");
    match collection.insert_one(&item).await {
        Ok(result) => {
            info!("Gallery item created: {}", item.title);
            HttpResponse::Created().json(json!({ "id": result.inserted_id, "title": item.title }))
        }
        Err(e) => {
            error!("Error inserting gallery item: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal menyimpan galeri" }))
        }
    }
}

/// PUT /api/gallery/{id}
pub async fn update_gallery_item(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UpdateGalleryRequest>,
) -> impl Responder {
    if let Err(resp) = require_auth(&req) {
        return resp;
    }
    let oid = match ObjectId::parse_str(path.as_str()) {
        Ok(oid) => oid,
        Err(_) => {
            return HttpResponse::BadRequest().json(json!({ "error": "ID galeri tidak valid" }))
        }
    };

    let mut update_doc = doc! {};
    if let Some(title) = &payload.title {
        update_doc.insert("title", title.trim());
    }
    if let Some(category) = &payload.category {
        update_doc.insert("category", category.trim());
    }
    if let Some(date) = &payload.date {
        if !is_valid_date(date.trim()) {
            return HttpResponse::BadRequest()
                .json(json!({ "error": "date harus berformat YYYY-MM-DD" }));
        }
        update_doc.insert("date", date.trim());
    }
    if let Some(status) = payload.status {
        match to_bson(&status) {
            Ok(value) => {
                update_doc.insert("status", value);
            }
            Err(e) => {
                error!("Error serializing gallery status: {}", e);
                return HttpResponse::InternalServerError()
                    .json(json!({ "error": "Gagal memperbarui galeri" }));
            }
        }
    }
    if let Some(images) = &payload.images {
        update_doc.insert("images", images.clone());
    }
    if update_doc.is_empty() {
        return HttpResponse::BadRequest().json(json!({ "error": "Tidak ada field untuk diubah" }));
    }
    update_doc.insert("updatedAt", BsonDateTime::now());

    let collection = data.mongodb.db.collection::<GalleryItem>("gallery");
    match collection
        .update_one(doc! { "_id": oid }, doc! { "$set": update_doc })
        .await
    {
        Ok(result) if result.matched_count == 0 => {
            HttpResponse::NotFound().json(json!({ "error": "Galeri tidak ditemukan" }))
        }
        Ok(_) => HttpResponse::Ok().json(json!({ "message": "Galeri berhasil diperbarui" })),
        Err(e) => {
            error!("Error updating gallery item: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal memperbarui galeri" }))
        }
    }
}

/// DELETE /api/gallery/{id}
pub async fn delete_gallery_item(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    if let Err(resp) = require_auth(&req) {
        return resp;
    }
    let oid = match ObjectId::parse_str(path.as_str()) {
        Ok(oid) => oid,
        Err(_) => {
            return HttpResponse::BadRequest().json(json!({ "error": "ID galeri tidak valid" }))
        }
    };
    let collection = data.mongodb.db.collection::<GalleryItem>("gallery");
    match collection.delete_one(doc! { "_id": oid }).await {
        Ok(result) if result.deleted_count == 0 => {
            HttpResponse::NotFound().json(json!({ "error": "Galeri tidak ditemukan" }))
        }
        Ok(_) => HttpResponse::Ok().json(json!({ "message": "Galeri berhasil dihapus" })),
        Err(e) => {
            error!("Error deleting gallery item: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Gagal menghapus galeri" }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_title_date_category() {
        let payload = CreateGalleryRequest {
            title: None,
            category: Some("".to_string()),
            date: Some("bukan-tanggal".to_string()),
            status: None,
            images: None,
        };
        let details = validate_create(&payload);
        assert_eq!(details.len(), 3);
    }

    #[test]
    fn status_defaults_handled_by_enum() {
        assert_eq!(
            serde_json::to_string(&GalleryStatus::Draft).unwrap(),
            "\"draft\""
        );
        let parsed: GalleryStatus = serde_json::from_str("\"published\"").unwrap();
        assert_eq!(parsed, GalleryStatus::Published);
    }
}
